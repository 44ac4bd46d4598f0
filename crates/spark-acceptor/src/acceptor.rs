//! # Acceptor：控制面路由受理器
//!
//! ## 核心意图（Why）
//! - 受理 `ROUTE`/`UNROUTE` 控制命令：规范化请求、在需要时生成来源引用、组合匹配谓词，
//!   把安装/移除委托给 [`Router`]，并通过 [`Conductor`] 回报结果；
//! - 按来源名惰性维护单来源受理器，并把就绪事件分派给它们。
//!
//! ## 行为契约（What）
//! - 每个请求恰好触发一次 `on_routed`/`on_unrouted`/`on_error`，故障路径也不例外；
//! - 结构化拒绝（未知来源、Router 拒绝）以 `Ok(RouteOutcome::Rejected)` 返回；
//!   未知角色与内部故障先通知 `on_error`，再以 `Err` 交给调用方升级；
//! - 不允许零引用的角色在 `source_ref == 0` 时获得自动引用，并以“引用类别 == 角色类别”的默认谓词
//!   与宿主谓词做逻辑与（默认谓词先求值）；
//! - 撤销路由只使用宿主谓词或恒真谓词，不组合默认谓词。
//!
//! ## 并发约定（Trade-offs）
//! - 受理协议以 `&mut self` 运行，单个控制通道上的调用需由宿主串行化；
//! - 计数器与预算账本可被单来源受理器跨线程共享，其余状态只属于本实例。

use std::{
    any::Any,
    borrow::Cow,
    collections::{HashMap, hash_map::Entry},
    fmt,
    path::Path,
    sync::Arc,
};

use tracing::{debug, error, warn};

use crate::{
    budget::GroupBudgetManager,
    config::AcceptorConfig,
    contract::{
        AcceptableWiring, BufferPoolSupplier, Conductor, Router, SourceAcceptor,
        SourceAcceptorFactory, StreamFactoryResolver,
    },
    counters::AcceptorCounters,
    error::AcceptorError,
    predicate::RoutePredicate,
    role::{Role, RolePolicy},
    route::{Route, Unroute},
};

/// 就绪资源名中分隔来源名与分区后缀的保留字符。
pub const SOURCE_DELIMITER: char = '#';

/// 按角色提供宿主内容谓词。
pub type RouteHandlerSupplier = Arc<dyn Fn(Role) -> Option<RoutePredicate> + Send + Sync>;

/// 单个控制请求的终态结果。
#[derive(Debug)]
pub enum RouteOutcome {
    /// 路由已安装，携带最终的来源引用。
    Routed { correlation_id: u64, source_ref: u64 },
    /// 路由已移除。
    Unrouted { correlation_id: u64 },
    /// 请求被拒绝，已通过 `on_error` 告知控制面，无需升级。
    Rejected {
        correlation_id: u64,
        reason: AcceptorError,
    },
}

impl RouteOutcome {
    /// 请求的关联号。
    pub fn correlation_id(&self) -> u64 {
        match self {
            RouteOutcome::Routed { correlation_id, .. }
            | RouteOutcome::Unrouted { correlation_id }
            | RouteOutcome::Rejected { correlation_id, .. } => *correlation_id,
        }
    }
}

/// 控制面路由受理器。
pub struct Acceptor {
    config: AcceptorConfig,
    acceptables: HashMap<Arc<str>, Box<dyn SourceAcceptor>>,
    counters: AcceptorCounters,
    budgets: GroupBudgetManager,
    router: Arc<dyn Router>,
    conductor: Arc<dyn Conductor>,
    factory: Arc<dyn SourceAcceptorFactory>,
    role_policy: Arc<dyn RolePolicy>,
    route_handlers: RouteHandlerSupplier,
    buffer_pool: BufferPoolSupplier,
    stream_factories: StreamFactoryResolver,
}

impl Acceptor {
    /// 以必需的协作方开始装配受理器。
    pub fn builder(
        router: Arc<dyn Router>,
        conductor: Arc<dyn Conductor>,
        factory: Arc<dyn SourceAcceptorFactory>,
    ) -> AcceptorBuilder {
        AcceptorBuilder {
            config: AcceptorConfig::default(),
            router,
            conductor,
            factory,
            counters: None,
            budgets: None,
            role_policy: None,
            route_handlers: None,
            buffer_pool: None,
            stream_factories: None,
        }
    }

    /// 组件名。
    pub fn name(&self) -> &'static str {
        "acceptor"
    }

    /// 受理一条路由请求。
    pub fn accept_route(&mut self, route: &Route) -> Result<RouteOutcome, AcceptorError> {
        let correlation_id = route.correlation_id();
        self.acceptable_mut(route.source());

        match self.install(route) {
            Ok(Some(source_ref)) => {
                self.conductor.on_routed(correlation_id, source_ref);
                debug!(
                    correlation_id,
                    source = route.source(),
                    source_ref,
                    "route installed"
                );
                Ok(RouteOutcome::Routed {
                    correlation_id,
                    source_ref,
                })
            }
            Ok(None) => {
                self.conductor.on_error(correlation_id);
                let reason = AcceptorError::RouterRejected {
                    correlation_id,
                    source_name: route.source().to_owned(),
                };
                warn!(correlation_id, code = reason.code(), "route rejected by router");
                Ok(RouteOutcome::Rejected {
                    correlation_id,
                    reason,
                })
            }
            Err(err) => {
                self.conductor.on_error(correlation_id);
                error!(correlation_id, code = err.code(), error = %err, "route request failed");
                Err(err)
            }
        }
    }

    /// 受理一条撤销路由请求。
    pub fn accept_unroute(&mut self, unroute: &Unroute) -> Result<RouteOutcome, AcceptorError> {
        let correlation_id = unroute.correlation_id();

        if !self.acceptables.contains_key(unroute.source()) {
            self.conductor.on_error(correlation_id);
            let reason = AcceptorError::UnknownSource {
                correlation_id,
                source_name: unroute.source().to_owned(),
            };
            warn!(correlation_id, code = reason.code(), "unroute for unknown source");
            return Ok(RouteOutcome::Rejected {
                correlation_id,
                reason,
            });
        }

        match self.remove(unroute) {
            Ok(true) => {
                self.conductor.on_unrouted(correlation_id);
                debug!(correlation_id, source = unroute.source(), "route removed");
                Ok(RouteOutcome::Unrouted { correlation_id })
            }
            Ok(false) => {
                self.conductor.on_error(correlation_id);
                let reason = AcceptorError::RouterRejected {
                    correlation_id,
                    source_name: unroute.source().to_owned(),
                };
                warn!(correlation_id, code = reason.code(), "unroute rejected by router");
                Ok(RouteOutcome::Rejected {
                    correlation_id,
                    reason,
                })
            }
            Err(err) => {
                self.conductor.on_error(correlation_id);
                error!(correlation_id, code = err.code(), error = %err, "unroute request failed");
                Err(err)
            }
        }
    }

    /// 就绪事件：按文件名推导来源，惰性创建单来源受理器并分派分区名。
    pub fn on_readable(&mut self, path: &Path) -> Result<(), AcceptorError> {
        let (source, partition) = source_name(path)
            .zip(path.file_name().and_then(|name| name.to_str()))
            .ok_or_else(|| AcceptorError::MalformedSourcePath {
                path: path.to_path_buf(),
            })?;

        self.acceptable_mut(source).on_readable(partition);
        Ok(())
    }

    /// 驱动全部单来源受理器执行一轮工作，返回工作量总和。
    pub fn process(&mut self) -> usize {
        self.acceptables
            .values_mut()
            .map(|acceptable| acceptable.process())
            .sum()
    }

    /// 关闭全部单来源受理器。
    pub fn close(&mut self) {
        for acceptable in self.acceptables.values_mut() {
            debug!(source = acceptable.source_name(), "closing source acceptor");
            acceptable.close();
        }
    }

    /// 是否已存在该来源的单来源受理器。
    pub fn contains_source(&self, source: &str) -> bool {
        self.acceptables.contains_key(source)
    }

    /// 已创建的单来源受理器数量。
    pub fn source_count(&self) -> usize {
        self.acceptables.len()
    }

    /// 共享预算账本。
    pub fn budgets(&self) -> &GroupBudgetManager {
        &self.budgets
    }

    /// 共享计数器。
    pub fn counters(&self) -> &AcceptorCounters {
        &self.counters
    }

    /// 当前配置。
    pub fn config(&self) -> &AcceptorConfig {
        &self.config
    }

    fn install(&self, route: &Route) -> Result<Option<u64>, AcceptorError> {
        let role = route.role().ok_or(AcceptorError::UnknownRole {
            correlation_id: route.correlation_id(),
            ordinal: route.role_ordinal(),
        })?;
        let handler = (self.route_handlers)(role);

        let (route, predicate) = if self.role_policy.allows_zero_source_ref(role) {
            (
                Cow::Borrowed(route),
                handler.unwrap_or(RoutePredicate::Always),
            )
        } else {
            let route = self.generate_source_ref_if_necessary(route, role)?;
            let default = RoutePredicate::reference_kind(
                route.source_ref(),
                self.role_policy.reference_kind(role),
            );
            let predicate = match handler {
                Some(handler) => default.and(handler),
                None => default,
            };
            (route, predicate)
        };

        let installed = self.router.install_route(&route, predicate)?;
        Ok(installed.then(|| route.source_ref()))
    }

    fn remove(&self, unroute: &Unroute) -> Result<bool, AcceptorError> {
        let role = unroute.role().ok_or(AcceptorError::UnknownRole {
            correlation_id: unroute.correlation_id(),
            ordinal: unroute.role_ordinal(),
        })?;
        let predicate = (self.route_handlers)(role).unwrap_or(RoutePredicate::Always);

        Ok(self.router.remove_route(unroute, predicate)?)
    }

    fn generate_source_ref_if_necessary<'r>(
        &self,
        route: &'r Route,
        role: Role,
    ) -> Result<Cow<'r, Route>, AcceptorError> {
        if route.source_ref() != 0 {
            return Ok(Cow::Borrowed(route));
        }

        let kind = self.role_policy.reference_kind(role);
        let source_ref = self.counters.next_route_ref(kind)?;
        let rebuilt = route.with_source_ref(source_ref);

        let required = rebuilt.encoded_len();
        let limit = self.config.max_control_command_length;
        if required > limit {
            return Err(AcceptorError::RouteTooLarge {
                correlation_id: route.correlation_id(),
                required,
                limit,
            });
        }

        debug!(
            correlation_id = route.correlation_id(),
            role = role.as_str(),
            source_ref,
            "generated source reference"
        );
        Ok(Cow::Owned(rebuilt))
    }

    fn acceptable_mut(&mut self, source: &str) -> &mut Box<dyn SourceAcceptor> {
        let Self {
            config,
            acceptables,
            counters,
            budgets,
            router,
            factory,
            buffer_pool,
            stream_factories,
            ..
        } = self;

        match acceptables.entry(Arc::from(source)) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let wiring = AcceptableWiring {
                    source: Arc::clone(entry.key()),
                    router: Arc::clone(router),
                    counters: counters.clone(),
                    budgets: budgets.clone(),
                    buffer_pool: Arc::clone(buffer_pool),
                    stream_factories: Arc::clone(stream_factories),
                    abort_type_id: config.abort_type_id,
                };
                debug!(source, "creating source acceptor");
                entry.insert(factory.create(wiring))
            }
        }
    }
}

impl fmt::Debug for Acceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acceptor")
            .field("config", &self.config)
            .field("sources", &self.acceptables.keys().collect::<Vec<_>>())
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

/// 从就绪资源路径推导来源名：取最后一段文件名中首个 `#` 之前的部分。
///
/// 文件名缺失、非 UTF-8 或前缀为空时返回 `None`。
pub fn source_name(path: &Path) -> Option<&str> {
    let file_name = path.file_name()?.to_str()?;
    let source = file_name
        .split(SOURCE_DELIMITER)
        .next()
        .unwrap_or(file_name);
    (!source.is_empty()).then_some(source)
}

/// [`Acceptor`] 装配器。
///
/// # 教案式说明
/// - **意图 (Why)**：所有配置在首次使用前一次性注入，装配完成后受理器不再暴露 setter；
/// - **契约 (What)**：Router、Conductor 与单来源受理器工厂为必需项；其余缺省时：
///   计数器与账本新建，角色策略取自配置，宿主谓词为空，缓冲池与流工厂解析返回占位值；
/// - **错误 (What)**：`build` 只在配置校验失败时返回错误。
pub struct AcceptorBuilder {
    config: AcceptorConfig,
    router: Arc<dyn Router>,
    conductor: Arc<dyn Conductor>,
    factory: Arc<dyn SourceAcceptorFactory>,
    counters: Option<AcceptorCounters>,
    budgets: Option<GroupBudgetManager>,
    role_policy: Option<Arc<dyn RolePolicy>>,
    route_handlers: Option<RouteHandlerSupplier>,
    buffer_pool: Option<BufferPoolSupplier>,
    stream_factories: Option<StreamFactoryResolver>,
}

impl AcceptorBuilder {
    pub fn config(mut self, config: AcceptorConfig) -> Self {
        self.config = config;
        self
    }

    /// 与其它组件共享同一组计数器。
    pub fn counters(mut self, counters: AcceptorCounters) -> Self {
        self.counters = Some(counters);
        self
    }

    /// 与其它组件共享同一份预算账本。
    pub fn budgets(mut self, budgets: GroupBudgetManager) -> Self {
        self.budgets = Some(budgets);
        self
    }

    /// 覆盖配置派生的角色策略。
    pub fn role_policy(mut self, policy: Arc<dyn RolePolicy>) -> Self {
        self.role_policy = Some(policy);
        self
    }

    pub fn route_handlers(
        mut self,
        supplier: impl Fn(Role) -> Option<RoutePredicate> + Send + Sync + 'static,
    ) -> Self {
        self.route_handlers = Some(Arc::new(supplier));
        self
    }

    pub fn buffer_pool(mut self, supplier: BufferPoolSupplier) -> Self {
        self.buffer_pool = Some(supplier);
        self
    }

    pub fn stream_factories(mut self, resolver: StreamFactoryResolver) -> Self {
        self.stream_factories = Some(resolver);
        self
    }

    pub fn build(self) -> Result<Acceptor, AcceptorError> {
        self.config.validate()?;

        let role_policy = self
            .role_policy
            .unwrap_or_else(|| Arc::new(self.config.role_policy()));

        Ok(Acceptor {
            acceptables: HashMap::new(),
            counters: self.counters.unwrap_or_default(),
            budgets: self.budgets.unwrap_or_default(),
            router: self.router,
            conductor: self.conductor,
            factory: self.factory,
            role_policy,
            route_handlers: self
                .route_handlers
                .unwrap_or_else(|| Arc::new(|_: Role| -> Option<RoutePredicate> { None })),
            buffer_pool: self
                .buffer_pool
                .unwrap_or_else(|| Arc::new(|| -> Arc<dyn Any + Send + Sync> { Arc::new(()) })),
            stream_factories: self.stream_factories.unwrap_or_else(|| {
                Arc::new(|_: Role| -> Option<Arc<dyn Any + Send + Sync>> { None })
            }),
            config: self.config,
        })
    }
}

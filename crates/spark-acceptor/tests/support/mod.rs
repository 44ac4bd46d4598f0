//! 受理器契约测试支撑模块。
//!
//! # 模块定位（Why）
//! - 以记录型替身实现 `Router`、`Conductor` 与单来源受理器工厂，断言受理协议与协作方之间的交互顺序与次数；
//! - Router 替身可被切换为“接受/拒绝/故障”三种模式，覆盖全部结果分支。
//!
//! # 契约说明（What）
//! - 替身内部使用 `Mutex` 收集调用记录，测试结束后通过快照函数读取；
//! - 替身不实现任何匹配逻辑，谓词原样保存，由测试自行求值。

#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use spark_acceptor::{
    AcceptableWiring, Acceptor, AcceptorConfig, AcceptorCounters, Conductor, Role, Route, RouteHandlerSupplier,
    RoutePredicate, Router, RouterError, SourceAcceptor, SourceAcceptorFactory, Unroute,
};

/// 控制面通知。
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Notification {
    Routed { correlation_id: u64, source_ref: u64 },
    Unrouted { correlation_id: u64 },
    Error { correlation_id: u64 },
}

/// 记录全部通知的 Conductor。
#[derive(Debug, Default)]
pub struct RecordingConductor {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingConductor {
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().expect("conductor lock").clone()
    }
}

impl Conductor for RecordingConductor {
    fn on_routed(&self, correlation_id: u64, source_ref: u64) {
        self.notifications
            .lock()
            .expect("conductor lock")
            .push(Notification::Routed {
                correlation_id,
                source_ref,
            });
    }

    fn on_unrouted(&self, correlation_id: u64) {
        self.notifications
            .lock()
            .expect("conductor lock")
            .push(Notification::Unrouted { correlation_id });
    }

    fn on_error(&self, correlation_id: u64) {
        self.notifications
            .lock()
            .expect("conductor lock")
            .push(Notification::Error { correlation_id });
    }
}

/// Router 替身的应答模式。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RouterMode {
    Accept,
    Reject,
    Fault,
}

/// 记录安装/移除调用的 Router。
#[derive(Debug)]
pub struct RecordingRouter {
    mode: Mutex<RouterMode>,
    installed: Mutex<Vec<(Route, RoutePredicate)>>,
    removed: Mutex<Vec<(Unroute, RoutePredicate)>>,
}

impl RecordingRouter {
    pub fn new(mode: RouterMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            installed: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
        }
    }

    pub fn set_mode(&self, mode: RouterMode) {
        *self.mode.lock().expect("router lock") = mode;
    }

    pub fn installed(&self) -> Vec<(Route, RoutePredicate)> {
        self.installed.lock().expect("router lock").clone()
    }

    pub fn removed(&self) -> Vec<(Unroute, RoutePredicate)> {
        self.removed.lock().expect("router lock").clone()
    }

    fn answer(&self, operation: &'static str) -> Result<bool, RouterError> {
        match *self.mode.lock().expect("router lock") {
            RouterMode::Accept => Ok(true),
            RouterMode::Reject => Ok(false),
            RouterMode::Fault => Err(RouterError::new(operation, "injected fault")),
        }
    }
}

impl Router for RecordingRouter {
    fn install_route(&self, route: &Route, predicate: RoutePredicate) -> Result<bool, RouterError> {
        self.installed
            .lock()
            .expect("router lock")
            .push((route.clone(), predicate));
        self.answer("install_route")
    }

    fn remove_route(
        &self,
        unroute: &Unroute,
        predicate: RoutePredicate,
    ) -> Result<bool, RouterError> {
        self.removed
            .lock()
            .expect("router lock")
            .push((unroute.clone(), predicate));
        self.answer("remove_route")
    }
}

/// 单来源受理器替身，把收到的分区名写入共享日志。
pub struct RecordingAcceptable {
    wiring: AcceptableWiring,
    readable: Arc<Mutex<Vec<String>>>,
}

impl SourceAcceptor for RecordingAcceptable {
    fn source_name(&self) -> &str {
        &self.wiring.source
    }

    fn on_readable(&mut self, partition: &str) {
        self.readable
            .lock()
            .expect("readable lock")
            .push(format!("{}:{partition}", self.wiring.source));
    }

    fn process(&mut self) -> usize {
        1
    }

    fn close(&mut self) {
        self.readable
            .lock()
            .expect("readable lock")
            .push(format!("{}:closed", self.wiring.source));
    }
}

/// 统计创建次数的工厂。
#[derive(Default)]
pub struct CountingFactory {
    created: AtomicUsize,
    sources: Mutex<Vec<String>>,
    wirings: Mutex<Vec<AcceptableWiring>>,
    readable: Arc<Mutex<Vec<String>>>,
}

impl CountingFactory {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn sources(&self) -> Vec<String> {
        self.sources.lock().expect("factory lock").clone()
    }

    pub fn wirings(&self) -> Vec<AcceptableWiring> {
        self.wirings.lock().expect("factory lock").clone()
    }

    pub fn readable(&self) -> Vec<String> {
        self.readable.lock().expect("readable lock").clone()
    }
}

impl SourceAcceptorFactory for CountingFactory {
    fn create(&self, wiring: AcceptableWiring) -> Box<dyn SourceAcceptor> {
        self.created.fetch_add(1, Ordering::SeqCst);
        self.sources
            .lock()
            .expect("factory lock")
            .push(wiring.source.to_string());
        self.wirings
            .lock()
            .expect("factory lock")
            .push(wiring.clone());
        Box::new(RecordingAcceptable {
            wiring,
            readable: Arc::clone(&self.readable),
        })
    }
}

/// 测试夹具：受理器及其全部替身。
pub struct Harness {
    pub acceptor: Acceptor,
    pub router: Arc<RecordingRouter>,
    pub conductor: Arc<RecordingConductor>,
    pub factory: Arc<CountingFactory>,
}

/// 以给定配置与宿主谓词装配受理器。
pub fn harness(config: AcceptorConfig, handlers: Option<RouteHandlerSupplier>) -> Harness {
    harness_with_counters(config, handlers, AcceptorCounters::new())
}

/// 以外部提供的计数器装配受理器，用于构造计数器临界状态。
pub fn harness_with_counters(
    config: AcceptorConfig,
    handlers: Option<RouteHandlerSupplier>,
    counters: AcceptorCounters,
) -> Harness {
    let router = Arc::new(RecordingRouter::new(RouterMode::Accept));
    let conductor = Arc::new(RecordingConductor::default());
    let factory = Arc::new(CountingFactory::default());

    let mut builder = Acceptor::builder(
        Arc::clone(&router) as Arc<dyn Router>,
        Arc::clone(&conductor) as Arc<dyn Conductor>,
        Arc::clone(&factory) as Arc<dyn SourceAcceptorFactory>,
    )
    .config(config)
    .counters(counters);
    if let Some(handlers) = handlers {
        builder = builder.route_handlers(move |role| handlers(role));
    }
    let acceptor = builder.build().expect("valid acceptor configuration");

    Harness {
        acceptor,
        router,
        conductor,
        factory,
    }
}

/// 允许指定角色零引用直通的配置。
pub fn config_allowing_zero(roles: &[Role]) -> AcceptorConfig {
    AcceptorConfig {
        zero_source_ref_roles: roles.to_vec(),
        ..AcceptorConfig::default()
    }
}

/// 构造一条来源为 `source`、角色为 `role` 的路由请求。
pub fn route(correlation_id: u64, role: Role, source: &str, source_ref: u64) -> Route {
    Route::builder()
        .correlation_id(correlation_id)
        .role(role)
        .source(source)
        .source_ref(source_ref)
        .target("target")
        .target_ref(11)
        .authorization(0)
        .build()
}

//! 外部协作方契约。
//!
//! # 模块结构（How）
//! - [`Router`]：路由表的安装/移除入口，返回 `Ok(false)` 表示拒绝，`Err` 表示 Router 自身故障；
//! - [`Conductor`]：控制面关联器，每个请求恰好收到一次 `on_routed`/`on_unrouted`/`on_error`；
//! - [`SourceAcceptor`] 与 [`SourceAcceptorFactory`]：按来源名惰性创建的单来源受理器；
//! - [`AcceptableWiring`]：创建单来源受理器时注入的共享资源。
//!
//! # 设计权衡（Trade-offs）
//! - 缓冲池与流工厂构建器对本层完全不透明，以 `dyn Any` 形式透传，由宿主自行向下转型。

use std::{any::Any, fmt, sync::Arc};

use crate::{
    budget::{GroupBudgetManager, GroupClaim, GroupRelease},
    counters::AcceptorCounters,
    error::RouterError,
    predicate::RoutePredicate,
    role::Role,
    route::{Route, Unroute},
};

/// 路由表。
pub trait Router: Send + Sync {
    /// 安装路由；`Ok(false)` 表示重复或内容不被接受。
    fn install_route(&self, route: &Route, predicate: RoutePredicate) -> Result<bool, RouterError>;

    /// 移除路由；`Ok(false)` 表示没有可移除的匹配项。
    fn remove_route(&self, unroute: &Unroute, predicate: RoutePredicate)
    -> Result<bool, RouterError>;
}

/// 控制面关联器，所有通知均为即发即弃。
pub trait Conductor: Send + Sync {
    fn on_routed(&self, correlation_id: u64, source_ref: u64);

    fn on_unrouted(&self, correlation_id: u64);

    fn on_error(&self, correlation_id: u64);
}

/// 单来源受理器。
///
/// - **意图 (Why)**：每个来源名对应一个实例，持有该来源的流工厂与预算接线；
/// - **契约 (What)**：`on_readable` 接收分区名（就绪资源的完整文件名），
///   `process` 返回本轮处理的工作量，`close` 在宿主关闭时调用一次。
pub trait SourceAcceptor: Send {
    /// 来源名。
    fn source_name(&self) -> &str;

    /// 某个分区变为可读。
    fn on_readable(&mut self, partition: &str);

    /// 执行一次工作循环。
    fn process(&mut self) -> usize {
        0
    }

    /// 释放资源。
    fn close(&mut self) {}
}

/// 单来源受理器工厂。
pub trait SourceAcceptorFactory: Send + Sync {
    fn create(&self, wiring: AcceptableWiring) -> Box<dyn SourceAcceptor>;
}

impl<F> SourceAcceptorFactory for F
where
    F: Fn(AcceptableWiring) -> Box<dyn SourceAcceptor> + Send + Sync,
{
    fn create(&self, wiring: AcceptableWiring) -> Box<dyn SourceAcceptor> {
        self(wiring)
    }
}

/// 缓冲池供给函数，产物对本层不透明。
pub type BufferPoolSupplier = Arc<dyn Fn() -> Arc<dyn Any + Send + Sync> + Send + Sync>;

/// 按路由类别解析流工厂构建器，产物对本层不透明。
pub type StreamFactoryResolver =
    Arc<dyn Fn(Role) -> Option<Arc<dyn Any + Send + Sync>> + Send + Sync>;

/// 创建单来源受理器时注入的资源。
#[derive(Clone)]
pub struct AcceptableWiring {
    /// 来源名。
    pub source: Arc<str>,
    /// 共享路由表。
    pub router: Arc<dyn Router>,
    /// 共享计数器（路由引用、关联号、分组号）。
    pub counters: AcceptorCounters,
    /// 分组预算账本。
    pub budgets: GroupBudgetManager,
    /// 缓冲池供给。
    pub buffer_pool: BufferPoolSupplier,
    /// 流工厂构建器解析。
    pub stream_factories: StreamFactoryResolver,
    /// 中止信号类型号。
    pub abort_type_id: i32,
}

impl AcceptableWiring {
    /// 分组领取句柄。
    pub fn claim(&self, group_id: u64) -> GroupClaim {
        self.budgets.claim(group_id)
    }

    /// 分组归还句柄。
    pub fn release(&self, group_id: u64) -> GroupRelease {
        self.budgets.release(group_id)
    }

    /// 分配新的分组号。
    pub fn next_group_id(&self) -> u64 {
        self.counters.next_group_id()
    }
}

impl fmt::Debug for AcceptableWiring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcceptableWiring")
            .field("source", &self.source)
            .field("counters", &self.counters)
            .field("budgets", &self.budgets)
            .field("abort_type_id", &self.abort_type_id)
            .finish_non_exhaustive()
    }
}

//! 共享单调计数器。
//!
//! # 教案式说明
//! - **意图 (Why)**：路由引用、关联号与分组号需要在提交控制命令的线程与执行受理协议的线程之间共享，
//!   且不能引入锁或阻塞；
//! - **契约 (What)**：每个计数器都是独立的 `Arc<AtomicU64>`，克隆 [`AcceptorCounters`] 共享同一组计数器；
//!   所有递增均返回自增后的值，首个取值为 1；
//! - **设计权衡 (Trade-offs)**：递增使用 `Relaxed` 顺序，唯一性只依赖原子读改写本身，不承载跨线程数据发布。

#[cfg(not(all(any(loom, spark_loom), feature = "loom-model")))]
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[cfg(all(any(loom, spark_loom), feature = "loom-model"))]
use loom::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::{error::AcceptorError, role::ReferenceKind};

/// 受理器运行实例级别的计数器集合。
#[derive(Clone, Debug)]
pub struct AcceptorCounters {
    routes: Arc<AtomicU64>,
    correlations: Arc<AtomicU64>,
    groups: Arc<AtomicU64>,
}

impl Default for AcceptorCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl AcceptorCounters {
    /// 创建全部从零开始的计数器。
    pub fn new() -> Self {
        Self {
            routes: Arc::new(AtomicU64::new(0)),
            correlations: Arc::new(AtomicU64::new(0)),
            groups: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 以外部提供的路由引用计数器构造，便于宿主在多个组件间共享同一引用空间。
    pub fn with_route_refs(routes: Arc<AtomicU64>) -> Self {
        Self {
            routes,
            ..Self::new()
        }
    }

    /// 为指定类别生成下一个自动引用。
    ///
    /// # 契约 (What)
    /// - 返回值非零，且与同一计数器此前产出的任何引用都不相同；
    /// - `ReferenceKind::resolve(返回值) == kind`；
    /// - 计数器越过 [`ReferenceKind::MAX_COUNTER`] 时返回
    ///   [`AcceptorError::ReferenceSpaceExhausted`]。
    pub fn next_route_ref(&self, kind: ReferenceKind) -> Result<u64, AcceptorError> {
        let counter = increment(&self.routes);
        kind.encode(counter)
            .ok_or(AcceptorError::ReferenceSpaceExhausted { counter })
    }

    /// 下一个关联号，供单来源受理器内部使用。
    pub fn next_correlation_id(&self) -> u64 {
        increment(&self.correlations)
    }

    /// 下一个分组号。
    pub fn next_group_id(&self) -> u64 {
        increment(&self.groups)
    }

    /// 当前路由引用计数器的取值。
    pub fn route_refs(&self) -> u64 {
        self.routes.load(Ordering::Relaxed)
    }
}

fn increment(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
}

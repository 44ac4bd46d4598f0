//! # spark-router：基于 `ArcSwap` 的内存路由表
//!
//! ## 定位（Why）
//! - 为 [`spark_acceptor::Router`] 提供开箱即用的实现，供测试、嵌入式宿主与单进程部署直接使用；
//! - 读路径只做一次 `load` 加顺序遍历，不持锁；写路径复制整表后原子替换。
//!
//! ## 契约（What）
//! - `install_route`：标识（角色、来源、来源引用、目标、目标引用、授权）已存在时拒绝；
//! - `remove_route`：移除标识一致且扩展负载满足撤销谓词的全部条目，未移除任何条目时返回 `false`；
//! - [`MemoryRouter::resolve`]：按安装顺序返回第一条来源与来源引用一致、谓词接受消息的路由。

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use arc_swap::ArcSwap;
use spark_acceptor::{Route, RoutePredicate, Router, RouterError, Unroute};

/// 撤销时对已存扩展负载求值谓词所用的消息类型号。
pub const EXTENSION_MSG_TYPE_ID: i32 = 0;

/// 内存路由表。
///
/// # 教案级说明
/// - **意图 (Why)**：控制面写入稀疏、数据面查询频繁，采用整表替换换取无锁读取；
/// - **逻辑 (How)**：写操作通过 `ArcSwap::rcu` 在最新快照上重算新表，并发写者冲突时重试闭包，
///   因此闭包内只依据快照计算结果，不产生外部副作用；
/// - **契约 (What)**：`revision` 在每次成功修改后递增，可用于观测表是否变化。
#[derive(Debug)]
pub struct MemoryRouter {
    table: ArcSwap<RouteTable>,
    revision: AtomicU64,
}

impl MemoryRouter {
    /// 构建空路由表。
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(RouteTable::default()),
            revision: AtomicU64::new(0),
        }
    }

    /// 查找接受该消息的第一条路由。
    pub fn resolve(
        &self,
        source: &str,
        source_ref: u64,
        msg_type_id: i32,
        payload: &[u8],
    ) -> Option<Route> {
        let table = self.table.load();
        table
            .entries
            .iter()
            .find(|entry| {
                entry.route.source() == source
                    && entry.route.source_ref() == source_ref
                    && entry.predicate.test(msg_type_id, payload)
            })
            .map(|entry| entry.route.clone())
    }

    /// 当前全部路由的快照，按安装顺序排列。
    pub fn routes(&self) -> Vec<Route> {
        self.table
            .load()
            .entries
            .iter()
            .map(|entry| entry.route.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.table.load().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.load().entries.is_empty()
    }

    /// 成功修改的次数。
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.revision.fetch_add(1, Ordering::AcqRel);
    }
}

impl Default for MemoryRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Router for MemoryRouter {
    fn install_route(&self, route: &Route, predicate: RoutePredicate) -> Result<bool, RouterError> {
        if route.source().is_empty() {
            return Err(RouterError::new("install_route", "route source must not be empty"));
        }

        let mut installed = false;
        self.table.rcu(|current| {
            installed = !current
                .entries
                .iter()
                .any(|entry| same_identity(&entry.route, route));
            if !installed {
                return Arc::clone(current);
            }

            let mut entries = current.entries.clone();
            entries.push(RouteEntry {
                route: route.clone(),
                predicate: predicate.clone(),
            });
            Arc::new(RouteTable { entries })
        });

        if installed {
            self.bump();
        }
        Ok(installed)
    }

    fn remove_route(
        &self,
        unroute: &Unroute,
        predicate: RoutePredicate,
    ) -> Result<bool, RouterError> {
        let mut removed = false;
        self.table.rcu(|current| {
            let entries: Vec<RouteEntry> = current
                .entries
                .iter()
                .filter(|entry| {
                    !(unroute.identifies(&entry.route)
                        && predicate.test(EXTENSION_MSG_TYPE_ID, entry.route.extension()))
                })
                .cloned()
                .collect();
            removed = entries.len() != current.entries.len();
            if removed {
                Arc::new(RouteTable { entries })
            } else {
                Arc::clone(current)
            }
        });

        if removed {
            self.bump();
        }
        Ok(removed)
    }
}

/// `ArcSwap` 的载荷：按安装顺序排列的条目。
#[derive(Debug, Default)]
struct RouteTable {
    entries: Vec<RouteEntry>,
}

#[derive(Clone, Debug)]
struct RouteEntry {
    route: Route,
    predicate: RoutePredicate,
}

fn same_identity(left: &Route, right: &Route) -> bool {
    left.role_ordinal() == right.role_ordinal()
        && left.source() == right.source()
        && left.source_ref() == right.source_ref()
        && left.target() == right.target()
        && left.target_ref() == right.target_ref()
        && left.authorization() == right.authorization()
}

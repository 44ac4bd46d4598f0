//! # GroupBudgetManager：分组流控预算账本
//!
//! ## 核心意图（Why）
//! - 同一分组（例如复用同一传输连接）内的流共享一份字节预算，发送前按预算领取，确认后归还补充；
//! - 分组号 `0` 表示“不分组”，领取与归还都走显式的特殊分支，不在账本里落任何条目。
//!
//! ## 行为契约（What）
//! - `claim(g).grant(r)`：授予 `min(余额, r)`，扣减余额，余额恰为零时删除条目；未知分组余额视为 `0`；
//!   调用方必须接受部分授予，`0` 表示“当前无可用预算”而非错误；
//! - 非正请求同样套用该公式：`grant(-n)` 返回 `-n` 且余额增加 `n`，行为与归还相当，
//!   调用方不应依赖这一点，但账本保持该语义不变；
//! - `release(g).deposit(b)`：余额加 `b`，仅当结果为正时写回，但无论是否写回都返回计算结果；
//!   结果非正时既有条目保持原值，返回值与账本状态不一致，调用方不得依赖该返回值；
//! - `claim(0)` 原样授予请求量，`release(0)` 恒返回 `i32::MAX`。
//!
//! ## 数值约定（How）
//! - 账本内部以 `i64` 饱和累加，对外交换 `i32` 授予量；
//! - `deposit` 的返回值超出 `i32` 范围时饱和到边界并记录 `warn!`。
//!
//! ## 风险提示（Trade-offs）
//! - 账本以 `Arc<DashMap>` 共享给所有单来源受理器，每次操作只锁定所在分片；
//!   同一分组的领取顺序仍需由调用方串行化，账本只保证单次操作的原子性。

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tracing::warn;

/// 不分组哨兵。
pub const UNGROUPED: u64 = 0;

/// 可克隆的共享预算账本。
#[derive(Clone, Debug, Default)]
pub struct GroupBudgetManager {
    budgets: Arc<DashMap<u64, i64>>,
}

impl GroupBudgetManager {
    /// 创建空账本。
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回指定分组的领取句柄。
    pub fn claim(&self, group_id: u64) -> GroupClaim {
        if group_id == UNGROUPED {
            GroupClaim::Ungrouped
        } else {
            GroupClaim::Grouped {
                group_id,
                budgets: Arc::clone(&self.budgets),
            }
        }
    }

    /// 返回指定分组的归还句柄。
    pub fn release(&self, group_id: u64) -> GroupRelease {
        if group_id == UNGROUPED {
            GroupRelease::Ungrouped
        } else {
            GroupRelease::Grouped {
                group_id,
                budgets: Arc::clone(&self.budgets),
            }
        }
    }

    /// 当前余额；不存在的条目即余额为零，返回 `None`。
    pub fn budget(&self, group_id: u64) -> Option<i64> {
        self.budgets.get(&group_id).map(|entry| *entry.value())
    }

    /// 账本中的分组数量。
    pub fn len(&self) -> usize {
        self.budgets.len()
    }

    /// 账本是否为空。
    pub fn is_empty(&self) -> bool {
        self.budgets.is_empty()
    }
}

/// 领取句柄。
#[derive(Clone, Debug)]
pub enum GroupClaim {
    /// 不分组：原样授予。
    Ungrouped,
    /// 分组：按余额部分授予。
    Grouped {
        group_id: u64,
        budgets: Arc<DashMap<u64, i64>>,
    },
}

impl GroupClaim {
    /// 请求 `requested` 字节，返回实际授予量。
    pub fn grant(&self, requested: i32) -> i32 {
        match self {
            GroupClaim::Ungrouped => requested,
            GroupClaim::Grouped { group_id, budgets } => claim(budgets, *group_id, requested),
        }
    }
}

/// 归还句柄。
#[derive(Clone, Debug)]
pub enum GroupRelease {
    /// 不分组：恒报告最大可授予量。
    Ungrouped,
    /// 分组：累加余额。
    Grouped {
        group_id: u64,
        budgets: Arc<DashMap<u64, i64>>,
    },
}

impl GroupRelease {
    /// 归还 `bytes` 字节，返回计算后的余额。
    pub fn deposit(&self, bytes: i32) -> i32 {
        match self {
            GroupRelease::Ungrouped => i32::MAX,
            GroupRelease::Grouped { group_id, budgets } => release(budgets, *group_id, bytes),
        }
    }
}

fn claim(budgets: &DashMap<u64, i64>, group_id: u64, requested: i32) -> i32 {
    let requested = i64::from(requested);
    let claimed = match budgets.entry(group_id) {
        Entry::Occupied(mut entry) => {
            let budget = *entry.get();
            let claimed = budget.min(requested);
            let remaining = budget.saturating_sub(claimed);
            if remaining == 0 {
                entry.remove();
            } else {
                *entry.get_mut() = remaining;
            }
            claimed
        }
        Entry::Vacant(entry) => {
            // 缺失条目即余额为零；负请求使余额变为 -requested。
            let claimed = requested.min(0);
            if claimed != 0 {
                entry.insert(-claimed);
            }
            claimed
        }
    };

    // 余额恒为正，claimed 要么等于 requested，要么小于它且为正。
    i32::try_from(claimed).unwrap_or(i32::MAX)
}

fn release(budgets: &DashMap<u64, i64>, group_id: u64, bytes: i32) -> i32 {
    let new_budget = match budgets.entry(group_id) {
        Entry::Occupied(mut entry) => {
            let new_budget = entry.get().saturating_add(i64::from(bytes));
            if new_budget > 0 {
                *entry.get_mut() = new_budget;
            }
            new_budget
        }
        Entry::Vacant(entry) => {
            let new_budget = i64::from(bytes);
            if new_budget > 0 {
                entry.insert(new_budget);
            }
            new_budget
        }
    };

    match i32::try_from(new_budget) {
        Ok(exposed) => exposed,
        Err(_) => {
            let exposed = if new_budget > 0 { i32::MAX } else { i32::MIN };
            warn!(
                group_id,
                budget = new_budget,
                exposed,
                "group budget exceeds 32-bit grant range, saturating"
            );
            exposed
        }
    }
}

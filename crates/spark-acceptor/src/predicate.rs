//! 路由匹配谓词。
//!
//! # 教案式说明
//! - **意图 (Why)**：受理器为每条路由组合一个谓词交给 Router，在匹配阶段对路由内容求值；
//!   组合子集合是封闭的，测试可以直接断言谓词结构；
//! - **契约 (What)**：
//!   - `Always`：无条件命中；
//!   - `ReferenceKind`：仅当 `source_ref` 的低位类别等于期望类别时命中，与消息内容无关；
//!   - `Content`：宿主按角色提供的内容谓词；
//!   - `And`：左侧先求值，左侧失败时短路，右侧不会被调用；
//! - **求值接口 (How)**：已切好负载的 Router 调用 [`RoutePredicate::test`]；
//!   持有共享缓冲区的 Router 以 `(msg_type_id, buffer, offset, length)` 调用 [`RoutePredicate::matches`]，
//!   越界的窗口一律视为不命中。

use std::{fmt, sync::Arc};

use crate::role::ReferenceKind;

/// 宿主提供的内容谓词。
pub trait MessagePredicate: Send + Sync {
    /// 对消息类型与负载求值。
    fn test(&self, msg_type_id: i32, payload: &[u8]) -> bool;
}

impl<F> MessagePredicate for F
where
    F: Fn(i32, &[u8]) -> bool + Send + Sync,
{
    fn test(&self, msg_type_id: i32, payload: &[u8]) -> bool {
        self(msg_type_id, payload)
    }
}

/// 路由谓词组合子。
#[derive(Clone)]
pub enum RoutePredicate {
    /// 无条件命中。
    Always,
    /// 引用类别校验。
    ReferenceKind {
        source_ref: u64,
        expected: ReferenceKind,
    },
    /// 内容匹配。
    Content(Arc<dyn MessagePredicate>),
    /// 逻辑与，左侧优先求值。
    And(Box<RoutePredicate>, Box<RoutePredicate>),
}

impl RoutePredicate {
    /// 包装宿主内容谓词。
    pub fn content(predicate: impl MessagePredicate + 'static) -> Self {
        RoutePredicate::Content(Arc::new(predicate))
    }

    /// 以 `source_ref` 的类别构造默认谓词。
    pub fn reference_kind(source_ref: u64, expected: ReferenceKind) -> Self {
        RoutePredicate::ReferenceKind {
            source_ref,
            expected,
        }
    }

    /// 与另一谓词组合，`self` 先求值。
    pub fn and(self, other: RoutePredicate) -> Self {
        RoutePredicate::And(Box::new(self), Box::new(other))
    }

    /// 按 `(buffer, offset, length)` 窗口求值。
    pub fn matches(&self, msg_type_id: i32, buffer: &[u8], offset: usize, length: usize) -> bool {
        offset
            .checked_add(length)
            .and_then(|end| buffer.get(offset..end))
            .is_some_and(|payload| self.test(msg_type_id, payload))
    }

    /// 直接对负载切片求值。
    pub fn test(&self, msg_type_id: i32, payload: &[u8]) -> bool {
        match self {
            RoutePredicate::Always => true,
            RoutePredicate::ReferenceKind {
                source_ref,
                expected,
            } => ReferenceKind::resolve(*source_ref) == *expected,
            RoutePredicate::Content(predicate) => predicate.test(msg_type_id, payload),
            RoutePredicate::And(left, right) => {
                left.test(msg_type_id, payload) && right.test(msg_type_id, payload)
            }
        }
    }
}

impl fmt::Debug for RoutePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutePredicate::Always => f.write_str("Always"),
            RoutePredicate::ReferenceKind {
                source_ref,
                expected,
            } => f
                .debug_struct("ReferenceKind")
                .field("source_ref", source_ref)
                .field("expected", expected)
                .finish(),
            RoutePredicate::Content(_) => f.write_str("Content(..)"),
            RoutePredicate::And(left, right) => f.debug_tuple("And").field(left).field(right).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn and_short_circuits_on_left_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&calls);
        let content = RoutePredicate::content(move |_: i32, _: &[u8]| {
            observed.fetch_add(1, Ordering::SeqCst);
            true
        });
        let server_ref = ReferenceKind::Server.encode(3).expect("fits");
        let predicate =
            RoutePredicate::reference_kind(server_ref, ReferenceKind::Client).and(content);

        assert!(!predicate.test(1, b"payload"));
        assert_eq!(calls.load(Ordering::SeqCst), 0, "右侧谓词不应被求值");
    }

    #[test]
    fn matches_rejects_out_of_range_windows() {
        let predicate = RoutePredicate::content(|_: i32, payload: &[u8]| payload == b"bc");
        let buffer = b"abcd";
        assert!(predicate.matches(0, buffer, 1, 2));
        assert!(!predicate.matches(0, buffer, 3, 2));
        assert!(!predicate.matches(0, buffer, usize::MAX, 2));
        assert!(RoutePredicate::Always.matches(0, buffer, 4, 0));
    }
}

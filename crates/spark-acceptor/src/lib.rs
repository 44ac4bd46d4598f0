//! # spark-acceptor
//!
//! ## 定位与职责（Why）
//! - 控制面路由受理器：把 `ROUTE`/`UNROUTE` 控制命令规范化为路由表条目，
//!   在调用方未提供来源引用时生成带角色类别标记的唯一引用，并向控制面关联器回报结果；
//! - 分组流控预算账本：同一分组内的流共享一份字节预算，支持部分授予的领取与溢出安全的归还。
//!
//! ## 架构嵌入（Where）
//! - `acceptor`：受理协议编排与单来源受理器的惰性创建；
//! - `budget`：分组预算账本；
//! - `counters`、`role`：共享计数器与引用类别策略；
//! - `route`、`predicate`：控制面记录与匹配谓词组合子；
//! - `contract`：Router、Conductor 与单来源受理器等外部协作方契约；
//! - `config`、`error`：配置与错误域。
//!
//! ## 边界（What）
//! - 不定义路由记录的线上编码，不负责 I/O 多路复用，不实现路由表匹配引擎；
//!   这些由宿主通过 `contract` 中的接口接入。

pub mod acceptor;
pub mod budget;
pub mod config;
pub mod contract;
pub mod counters;
pub mod error;
pub mod predicate;
pub mod role;
pub mod route;

pub use acceptor::{Acceptor, AcceptorBuilder, RouteHandlerSupplier, RouteOutcome, source_name};
pub use budget::{GroupBudgetManager, GroupClaim, GroupRelease, UNGROUPED};
pub use config::AcceptorConfig;
pub use contract::{AcceptableWiring, Conductor, Router, SourceAcceptor, SourceAcceptorFactory};
pub use counters::AcceptorCounters;
pub use error::{AcceptorError, ConfigError, RouterError};
pub use predicate::{MessagePredicate, RoutePredicate};
pub use role::{ConfiguredRolePolicy, ReferenceKind, Role, RolePolicy};
pub use route::{Route, RouteBuilder, Unroute, UnrouteBuilder};

//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义受理器对外暴露的错误语义，区分“已通知控制面即可结束”的拒绝与“需向宿主升级”的故障；
//! - 为每个变体提供稳定错误码，便于日志检索与告警聚合。
//!
//! ## 设计要求（What）
//! - 所有错误类型派生 `thiserror::Error`，可直接交给宿主的故障策略处理；
//! - [`AcceptorError::escalates`] 决定故障是否在 `on_error` 之后继续向上传播；
//! - 预算账本不产生错误，所有输入均映射为确定的数值结果。

use std::{io, path::PathBuf};

use thiserror::Error;

/// 受理器错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：覆盖路由受理协议的全部失败路径：未知角色、未知来源、Router 拒绝、内部故障；
/// - **契约 (What)**：
///   - `UnknownSource` 与 `RouterRejected` 属于结构化拒绝，只通过 `on_error` 告知控制面；
///   - 其余变体属于故障，先通知控制面，再以 `Err` 形式交给调用方升级；
/// - **设计权衡 (Trade-offs)**：变体字段避免命名为 `source`，防止与 `thiserror` 的错误链推断冲突。
#[derive(Debug, Error)]
pub enum AcceptorError {
    /// 角色序号无法解析为已知变体。
    #[error("request #{correlation_id} carries unknown role ordinal {ordinal}")]
    UnknownRole { correlation_id: u64, ordinal: u8 },

    /// 撤销路由时来源从未被受理过。
    #[error("unroute request #{correlation_id} targets unknown source `{source_name}`")]
    UnknownSource {
        correlation_id: u64,
        source_name: String,
    },

    /// Router 拒绝安装或移除路由（重复、内容不符或策略不匹配）。
    #[error("router rejected request #{correlation_id} for source `{source_name}`")]
    RouterRejected {
        correlation_id: u64,
        source_name: String,
    },

    /// 共享计数器已无法再嵌入引用类别标记。
    #[error("route reference space exhausted at counter value {counter}")]
    ReferenceSpaceExhausted { counter: u64 },

    /// 重建后的路由超出控制命令长度上限。
    #[error(
        "rebuilt route #{correlation_id} needs {required} bytes, control command limit is {limit}"
    )]
    RouteTooLarge {
        correlation_id: u64,
        required: usize,
        limit: usize,
    },

    /// Router 在安装/移除过程中抛出的内部故障。
    #[error(transparent)]
    Router(#[from] RouterError),

    /// 就绪路径的文件名无法映射为来源名称，属于致命配置错误。
    #[error("readable path `{}` does not name a source", path.display())]
    MalformedSourcePath { path: PathBuf },

    /// 配置加载或校验失败。
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AcceptorError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            AcceptorError::UnknownRole { .. } => "acceptor.role.unknown",
            AcceptorError::UnknownSource { .. } => "acceptor.source.unknown",
            AcceptorError::RouterRejected { .. } => "acceptor.router.rejected",
            AcceptorError::ReferenceSpaceExhausted { .. } => "acceptor.reference.exhausted",
            AcceptorError::RouteTooLarge { .. } => "acceptor.route.too_large",
            AcceptorError::Router(_) => "acceptor.router.fault",
            AcceptorError::MalformedSourcePath { .. } => "acceptor.source.malformed_path",
            AcceptorError::Config(_) => "acceptor.config.invalid",
        }
    }

    /// 是否需要在通知控制面之后继续升级给宿主。
    ///
    /// - `UnknownSource`、`RouterRejected` 是正常的拒绝结果，不升级；
    /// - 其余变体均视为故障。
    pub fn escalates(&self) -> bool {
        !matches!(
            self,
            AcceptorError::UnknownSource { .. } | AcceptorError::RouterRejected { .. }
        )
    }
}

/// Router 内部故障。
///
/// - **意图 (Why)**：区分 “Router 返回 `false`（拒绝）” 与 “Router 自身出错”，后者按内部故障处理；
/// - **契约 (What)**：`operation` 为失败环节（如 `install_route`），`detail` 为可读说明。
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("router failure during `{operation}`: {detail}")]
pub struct RouterError {
    operation: &'static str,
    detail: String,
}

impl RouterError {
    /// 构造 Router 故障。
    pub fn new(operation: &'static str, detail: impl Into<String>) -> Self {
        Self {
            operation,
            detail: detail.into(),
        }
    }

    /// 失败环节。
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// 可读说明。
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// 配置加载错误。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败。
    #[error("failed to read acceptor configuration `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        cause: io::Error,
    },

    /// TOML 解析失败。
    #[error("failed to parse acceptor configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// 字段取值不合法。
    #[error("invalid acceptor configuration `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

//! 受理器配置。
//!
//! # 教案式说明
//! - **意图 (Why)**：将控制命令长度上限、中止信号类型号与零引用角色集合从代码中剥离，
//!   由宿主以 TOML 形式注入；
//! - **契约 (What)**：所有字段均有默认值，键名采用 kebab-case；[`AcceptorConfig::validate`]
//!   拒绝无法工作的取值；
//! - **示例**：
//!
//! ```toml
//! max-control-command-length = 65536
//! abort-type-id = 4
//! zero-source-ref-roles = ["client", "proxy-forward"]
//! ```

use std::{fs, path::Path};

use serde::Deserialize;

use crate::{
    error::ConfigError,
    role::{ConfiguredRolePolicy, Role},
};

/// 默认控制命令长度上限。
pub const DEFAULT_MAX_CONTROL_COMMAND_LENGTH: usize = 64 * 1024;

/// 默认中止信号类型号。
pub const DEFAULT_ABORT_TYPE_ID: i32 = 0x0000_0004;

/// 受理器配置。
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct AcceptorConfig {
    /// 重建路由编码后的最大字节数。
    pub max_control_command_length: usize,
    /// 交给单来源受理器的中止信号类型号。
    pub abort_type_id: i32,
    /// 允许 `source_ref == 0` 原样安装的角色。
    pub zero_source_ref_roles: Vec<Role>,
}

impl Default for AcceptorConfig {
    fn default() -> Self {
        Self {
            max_control_command_length: DEFAULT_MAX_CONTROL_COMMAND_LENGTH,
            abort_type_id: DEFAULT_ABORT_TYPE_ID,
            zero_source_ref_roles: Vec::new(),
        }
    }
}

impl AcceptorConfig {
    /// 从 TOML 文本解析并校验。
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: AcceptorConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 读取 TOML 文件并校验。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|cause| ConfigError::Io {
            path: path.to_path_buf(),
            cause,
        })?;
        Self::from_toml_str(&text)
    }

    /// 校验字段取值。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_control_command_length == 0 {
            return Err(ConfigError::Invalid {
                field: "max-control-command-length",
                reason: "must be greater than zero".to_owned(),
            });
        }
        Ok(())
    }

    /// 按配置构造角色策略。
    pub fn role_policy(&self) -> ConfiguredRolePolicy {
        ConfiguredRolePolicy::new(self.zero_source_ref_roles.iter().copied())
    }
}

//! 角色与引用类别策略。
//!
//! # 设计总览（Why）
//! - 路由的 `role` 在控制面边界以序号传输，受理器需要双向映射 “序号 ↔ 角色”；
//! - 自动生成的 `source_ref` 在低两位嵌入引用类别，事后仅凭引用值即可还原角色，
//!   供默认匹配谓词校验 “引用类别 == 路由角色”。
//!
//! # 位布局（What）
//! - `reference = (counter << 2) | kind.ordinal()`，`counter` 为共享计数器自增后的值（≥ 1），
//!   因而结果恒非零，且同一计数器产出的引用全局唯一；
//! - `ReferenceKind::resolve` 取低两位还原类别。

use serde::Deserialize;

/// 控制面角色。
///
/// 序号固定，作为控制面编码与引用类别的共同基准。
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum Role {
    /// 入站受理侧。
    Server = 0,
    /// 出站连接侧。
    Client = 1,
    /// 正向代理。
    ProxyForward = 2,
    /// 反向代理。
    ProxyReverse = 3,
}

impl Role {
    /// 全部角色，按序号排列。
    pub const ALL: [Role; 4] = [
        Role::Server,
        Role::Client,
        Role::ProxyForward,
        Role::ProxyReverse,
    ];

    /// 由序号解析角色，未知序号返回 `None`。
    pub fn from_ordinal(ordinal: u8) -> Option<Role> {
        Self::ALL.get(usize::from(ordinal)).copied()
    }

    /// 角色序号。
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// 便于日志输出的短名称。
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Server => "server",
            Role::Client => "client",
            Role::ProxyForward => "proxy-forward",
            Role::ProxyReverse => "proxy-reverse",
        }
    }
}

/// 引用类别，决定自动引用的标记方式。
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum ReferenceKind {
    Server = 0,
    Client = 1,
    ProxyForward = 2,
    ProxyReverse = 3,
}

impl ReferenceKind {
    const TAG_BITS: u32 = 2;
    const TAG_MASK: u64 = (1 << Self::TAG_BITS) - 1;

    /// 计数器可用的最大取值，超过后左移会丢失高位。
    pub const MAX_COUNTER: u64 = u64::MAX >> Self::TAG_BITS;

    /// 角色对应的引用类别。
    pub fn of(role: Role) -> ReferenceKind {
        match role {
            Role::Server => ReferenceKind::Server,
            Role::Client => ReferenceKind::Client,
            Role::ProxyForward => ReferenceKind::ProxyForward,
            Role::ProxyReverse => ReferenceKind::ProxyReverse,
        }
    }

    /// 从引用值的低位还原类别。
    pub fn resolve(reference: u64) -> ReferenceKind {
        match reference & Self::TAG_MASK {
            0 => ReferenceKind::Server,
            1 => ReferenceKind::Client,
            2 => ReferenceKind::ProxyForward,
            _ => ReferenceKind::ProxyReverse,
        }
    }

    /// 类别序号，与 [`Role::ordinal`] 对齐。
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// 将计数器值编码为带类别标记的引用。
    ///
    /// 计数器为零或超出 [`Self::MAX_COUNTER`] 时返回 `None`。
    pub fn encode(self, counter: u64) -> Option<u64> {
        if counter == 0 || counter > Self::MAX_COUNTER {
            return None;
        }
        Some((counter << Self::TAG_BITS) | u64::from(self.ordinal()))
    }
}

/// 角色策略，由宿主注入。
///
/// - `allows_zero_source_ref`：该角色是否允许 `source_ref == 0` 原样安装；
/// - `reference_kind`：该角色自动生成引用时使用的类别。
pub trait RolePolicy: Send + Sync {
    /// 该角色是否允许零引用直通。
    fn allows_zero_source_ref(&self, role: Role) -> bool;

    /// 该角色的引用类别。
    fn reference_kind(&self, role: Role) -> ReferenceKind {
        ReferenceKind::of(role)
    }
}

/// 由配置驱动的默认策略：列出的角色允许零引用，其余角色一律自动生成。
#[derive(Clone, Debug, Default)]
pub struct ConfiguredRolePolicy {
    zero_ref_roles: Vec<Role>,
}

impl ConfiguredRolePolicy {
    /// 以允许零引用的角色集合构造策略。
    pub fn new(zero_ref_roles: impl IntoIterator<Item = Role>) -> Self {
        let mut zero_ref_roles: Vec<Role> = zero_ref_roles.into_iter().collect();
        zero_ref_roles.sort();
        zero_ref_roles.dedup();
        Self { zero_ref_roles }
    }
}

impl RolePolicy for ConfiguredRolePolicy {
    fn allows_zero_source_ref(&self, role: Role) -> bool {
        self.zero_ref_roles.binary_search(&role).is_ok()
    }
}

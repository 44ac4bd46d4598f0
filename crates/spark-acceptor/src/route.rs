//! 控制面路由记录。
//!
//! # 教案式说明
//! - **意图 (Why)**：`Route`/`Unroute` 是控制面边界上交换的不可变记录，受理器只读取、从不原地修改；
//!   需要改写 `source_ref` 时通过 [`Route::with_source_ref`] 复制全部字段并覆盖单一字段；
//! - **契约 (What)**：`role` 以原始序号保存，是否可解析由受理器判定；`target_ref`、`authorization`
//!   与 `extension` 对受理器不透明，原样转交 Router；
//! - **设计权衡 (Trade-offs)**：字符串使用 `Arc<str>`、扩展负载使用 [`Bytes`]，复制记录只增加引用计数。

use std::sync::Arc;

use bytes::Bytes;

use crate::role::Role;

/// 编码后路由记录的固定头部长度：
/// 关联号 8 + 角色 1 + 来源长度前缀 1 + 来源引用 8 + 目标长度前缀 1 + 目标引用 8 + 授权 8 + 扩展长度前缀 4。
const ENCODED_HEADER_LEN: usize = 39;

/// 路由请求。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Route {
    correlation_id: u64,
    role: u8,
    source: Arc<str>,
    source_ref: u64,
    target: Arc<str>,
    target_ref: u64,
    authorization: u64,
    extension: Bytes,
}

impl Route {
    /// 创建路由构建器。
    pub fn builder() -> RouteBuilder {
        RouteBuilder::default()
    }

    pub fn correlation_id(&self) -> u64 {
        self.correlation_id
    }

    /// 原始角色序号。
    pub fn role_ordinal(&self) -> u8 {
        self.role
    }

    /// 解析后的角色，未知序号返回 `None`。
    pub fn role(&self) -> Option<Role> {
        Role::from_ordinal(self.role)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn source_ref(&self) -> u64 {
        self.source_ref
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn target_ref(&self) -> u64 {
        self.target_ref
    }

    pub fn authorization(&self) -> u64 {
        self.authorization
    }

    pub fn extension(&self) -> &Bytes {
        &self.extension
    }

    /// 复制全部字段并替换 `source_ref`，原记录保持不变。
    pub fn with_source_ref(&self, source_ref: u64) -> Route {
        Route {
            source_ref,
            ..self.clone()
        }
    }

    /// 按控制命令编码规则估算的字节长度。
    pub fn encoded_len(&self) -> usize {
        ENCODED_HEADER_LEN + self.source.len() + self.target.len() + self.extension.len()
    }
}

/// [`Route`] 构建器，未设置的字段取零值。
#[derive(Clone, Debug, Default)]
pub struct RouteBuilder {
    correlation_id: u64,
    role: u8,
    source: Option<Arc<str>>,
    source_ref: u64,
    target: Option<Arc<str>>,
    target_ref: u64,
    authorization: u64,
    extension: Bytes,
}

impl RouteBuilder {
    pub fn correlation_id(mut self, correlation_id: u64) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role.ordinal();
        self
    }

    /// 直接写入角色序号，用于还原线上收到的原始值。
    pub fn role_ordinal(mut self, ordinal: u8) -> Self {
        self.role = ordinal;
        self
    }

    pub fn source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn source_ref(mut self, source_ref: u64) -> Self {
        self.source_ref = source_ref;
        self
    }

    pub fn target(mut self, target: impl Into<Arc<str>>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn target_ref(mut self, target_ref: u64) -> Self {
        self.target_ref = target_ref;
        self
    }

    pub fn authorization(mut self, authorization: u64) -> Self {
        self.authorization = authorization;
        self
    }

    pub fn extension(mut self, extension: impl Into<Bytes>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn build(self) -> Route {
        Route {
            correlation_id: self.correlation_id,
            role: self.role,
            source: self.source.unwrap_or_else(|| Arc::from("")),
            source_ref: self.source_ref,
            target: self.target.unwrap_or_else(|| Arc::from("")),
            target_ref: self.target_ref,
            authorization: self.authorization,
            extension: self.extension,
        }
    }
}

/// 撤销路由请求，镜像 [`Route`] 的标识字段，不触发引用生成。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Unroute {
    route: Route,
}

impl Unroute {
    /// 创建撤销请求构建器。
    pub fn builder() -> UnrouteBuilder {
        UnrouteBuilder::default()
    }

    pub fn correlation_id(&self) -> u64 {
        self.route.correlation_id
    }

    pub fn role_ordinal(&self) -> u8 {
        self.route.role
    }

    pub fn role(&self) -> Option<Role> {
        self.route.role()
    }

    pub fn source(&self) -> &str {
        &self.route.source
    }

    pub fn source_ref(&self) -> u64 {
        self.route.source_ref
    }

    pub fn target(&self) -> &str {
        &self.route.target
    }

    pub fn target_ref(&self) -> u64 {
        self.route.target_ref
    }

    pub fn authorization(&self) -> u64 {
        self.route.authorization
    }

    pub fn extension(&self) -> &Bytes {
        &self.route.extension
    }

    /// 判断某条已安装路由是否与本请求的标识字段一致。
    pub fn identifies(&self, route: &Route) -> bool {
        self.route.role == route.role
            && self.route.source == route.source
            && self.route.source_ref == route.source_ref
            && self.route.target == route.target
            && self.route.target_ref == route.target_ref
            && self.route.authorization == route.authorization
    }
}

/// [`Unroute`] 构建器。
#[derive(Clone, Debug, Default)]
pub struct UnrouteBuilder {
    inner: RouteBuilder,
}

impl UnrouteBuilder {
    pub fn correlation_id(mut self, correlation_id: u64) -> Self {
        self.inner = self.inner.correlation_id(correlation_id);
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.inner = self.inner.role(role);
        self
    }

    pub fn role_ordinal(mut self, ordinal: u8) -> Self {
        self.inner = self.inner.role_ordinal(ordinal);
        self
    }

    pub fn source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.inner = self.inner.source(source);
        self
    }

    pub fn source_ref(mut self, source_ref: u64) -> Self {
        self.inner = self.inner.source_ref(source_ref);
        self
    }

    pub fn target(mut self, target: impl Into<Arc<str>>) -> Self {
        self.inner = self.inner.target(target);
        self
    }

    pub fn target_ref(mut self, target_ref: u64) -> Self {
        self.inner = self.inner.target_ref(target_ref);
        self
    }

    pub fn authorization(mut self, authorization: u64) -> Self {
        self.inner = self.inner.authorization(authorization);
        self
    }

    pub fn extension(mut self, extension: impl Into<Bytes>) -> Self {
        self.inner = self.inner.extension(extension);
        self
    }

    pub fn build(self) -> Unroute {
        Unroute {
            route: self.inner.build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Route {
        Route::builder()
            .correlation_id(7)
            .role(Role::Server)
            .source("tcp")
            .target("http")
            .target_ref(9)
            .authorization(0xff)
            .extension(Bytes::from_static(b"ext"))
            .build()
    }

    #[test]
    fn with_source_ref_copies_every_other_field() {
        let route = sample();
        let rebuilt = route.with_source_ref(44);

        assert_eq!(route.source_ref(), 0, "原记录不得被修改");
        assert_eq!(rebuilt.source_ref(), 44);
        assert_eq!(rebuilt.correlation_id(), route.correlation_id());
        assert_eq!(rebuilt.role(), Some(Role::Server));
        assert_eq!(rebuilt.source(), "tcp");
        assert_eq!(rebuilt.target(), "http");
        assert_eq!(rebuilt.target_ref(), 9);
        assert_eq!(rebuilt.authorization(), 0xff);
        assert_eq!(rebuilt.extension().as_ref(), b"ext");
    }

    #[test]
    fn encoded_len_counts_variable_fields() {
        assert_eq!(sample().encoded_len(), ENCODED_HEADER_LEN + 3 + 4 + 3);
    }

    #[test]
    fn unroute_identifies_matching_route_only() {
        let route = sample().with_source_ref(4);
        let unroute = Unroute::builder()
            .correlation_id(99)
            .role(Role::Server)
            .source("tcp")
            .source_ref(4)
            .target("http")
            .target_ref(9)
            .authorization(0xff)
            .build();
        assert!(unroute.identifies(&route));
        assert!(!unroute.identifies(&sample()));
    }
}

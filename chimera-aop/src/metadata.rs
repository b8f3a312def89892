//! 注解元数据
//!
//! 以显式数据结构描述调用点的注解、参数和拦截器绑定，匹配算法只依赖这些结构，
//! 不做任何运行时反射

use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;

use chimera_core::{contains_placeholder, PropertyResolver};

use crate::error::AopResult;
use crate::interceptor::InterceptorKind;

/// Adapter 构造型注解名
pub const ADAPTER: &str = "Adapter";
/// Adapter 成员：被适配的 bean 类型
pub const ADAPTED_BEAN: &str = "adapted_bean";
/// Adapter 成员：被适配的方法名
pub const ADAPTED_METHOD: &str = "adapted_method";
/// Adapter 成员：被适配 bean 的限定符
pub const ADAPTED_QUALIFIER: &str = "adapted_qualifier";
/// Adapter 成员：被适配方法的参数类型（逗号分隔）
pub const ADAPTED_ARGUMENT_TYPES: &str = "adapted_argument_types";

/// 单个注解及其成员值
///
/// 注解自身可以声明构造型（元注解），例如 `EventListener` 声明 `Adapter`，
/// 此时构造型的成员值由该注解携带
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationValue {
    name: String,
    members: BTreeMap<String, String>,
    stereotypes: Vec<String>,
}

impl AnnotationValue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: BTreeMap::new(),
            stereotypes: Vec::new(),
        }
    }

    pub fn with_member(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.members.insert(key.into(), value.into());
        self
    }

    /// 声明该注解带有的构造型
    pub fn with_stereotype(mut self, stereotype: impl Into<String>) -> Self {
        self.stereotypes.push(stereotype.into());
        self
    }

    pub fn stereotypes(&self) -> &[String] {
        &self.stereotypes
    }

    /// 是该注解本身，或由它声明的构造型
    pub fn is_stereotype(&self, name: &str) -> bool {
        self.name == name || self.stereotypes.iter().any(|s| s == name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member(&self, key: &str) -> Option<&str> {
        self.members.get(key).map(String::as_str)
    }

    pub fn members(&self) -> &BTreeMap<String, String> {
        &self.members
    }

    fn has_property_expressions(&self) -> bool {
        contains_placeholder(&self.name) || self.members.values().any(|v| contains_placeholder(v))
    }

    fn bind(&self, resolver: &dyn PropertyResolver) -> AopResult<Self> {
        Ok(Self {
            name: resolver.resolve_placeholders(&self.name)?,
            members: bind_members(&self.members, resolver)?,
            stereotypes: self.stereotypes.clone(),
        })
    }
}

/// 绑定目标：按注解名或按具体拦截器类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingTarget {
    /// 引用一个注解名，候选拦截器自身声明了同名绑定时匹配
    Annotation(String),
    /// 直接指定拦截器类型，候选实例为该类型时匹配
    Type {
        type_id: TypeId,
        type_name: &'static str,
    },
}

/// 拦截器绑定声明
///
/// 同一结构既用于调用点（“此处需要哪些拦截器”），
/// 也用于候选拦截器自身（“我响应哪些绑定”）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptorBinding {
    target: BindingTarget,
    kind: InterceptorKind,
    members: BTreeMap<String, String>,
}

impl InterceptorBinding {
    /// 按注解名绑定，默认类型为 AROUND
    pub fn annotation(name: impl Into<String>) -> Self {
        Self {
            target: BindingTarget::Annotation(name.into()),
            kind: InterceptorKind::Around,
            members: BTreeMap::new(),
        }
    }

    /// 按拦截器类型绑定，默认类型为 AROUND
    pub fn of_type<T: 'static>() -> Self {
        Self {
            target: BindingTarget::Type {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
            },
            kind: InterceptorKind::Around,
            members: BTreeMap::new(),
        }
    }

    pub fn with_kind(mut self, kind: InterceptorKind) -> Self {
        self.kind = kind;
        self
    }

    /// 添加绑定成员；调用点带成员时，只匹配成员值相同的候选绑定
    pub fn with_member(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.members.insert(key.into(), value.into());
        self
    }

    pub fn target(&self) -> &BindingTarget {
        &self.target
    }

    pub fn kind(&self) -> InterceptorKind {
        self.kind
    }

    pub fn members(&self) -> &BTreeMap<String, String> {
        &self.members
    }

    /// 注解名（按类型绑定时为 None）
    pub fn annotation_name(&self) -> Option<&str> {
        match &self.target {
            BindingTarget::Annotation(name) => Some(name),
            BindingTarget::Type { .. } => None,
        }
    }

    fn has_property_expressions(&self) -> bool {
        self.annotation_name().is_some_and(contains_placeholder)
            || self.members.values().any(|v| contains_placeholder(v))
    }

    fn bind(&self, resolver: &dyn PropertyResolver) -> AopResult<Self> {
        let target = match &self.target {
            BindingTarget::Annotation(name) => {
                BindingTarget::Annotation(resolver.resolve_placeholders(name)?)
            }
            other => other.clone(),
        };
        Ok(Self {
            target,
            kind: self.kind,
            members: bind_members(&self.members, resolver)?,
        })
    }
}

impl fmt::Display for InterceptorBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            BindingTarget::Annotation(name) => write!(f, "@{}", name)?,
            BindingTarget::Type { type_name, .. } => write!(f, "type {}", type_name)?,
        }
        write!(f, " ({})", self.kind)
    }
}

fn bind_members(
    members: &BTreeMap<String, String>,
    resolver: &dyn PropertyResolver,
) -> AopResult<BTreeMap<String, String>> {
    members
        .iter()
        .map(|(k, v)| Ok((k.clone(), resolver.resolve_placeholders(v)?)))
        .collect()
}

/// 调用点或 bean 类型上的注解元数据
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationMetadata {
    annotations: Vec<AnnotationValue>,
    stereotypes: Vec<String>,
    bindings: Vec<InterceptorBinding>,
}

impl AnnotationMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_annotation(mut self, annotation: AnnotationValue) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// 声明构造型（元注解），例如 `Adapter`
    pub fn with_stereotype(mut self, stereotype: impl Into<String>) -> Self {
        self.stereotypes.push(stereotype.into());
        self
    }

    pub fn with_binding(mut self, binding: InterceptorBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.name == name)
    }

    /// 直接注解、注解声明的构造型或调用点构造型中包含该名称
    pub fn has_stereotype(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.is_stereotype(name))
            || self.stereotypes.iter().any(|s| s == name)
    }

    /// 携带该构造型成员值的注解：优先同名注解，其次声明了该构造型的注解
    pub fn stereotype_annotation(&self, name: &str) -> Option<&AnnotationValue> {
        self.annotation(name)
            .or_else(|| self.annotations.iter().find(|a| a.is_stereotype(name)))
    }

    /// 调用点级别的构造型
    pub fn stereotypes(&self) -> &[String] {
        &self.stereotypes
    }

    pub fn annotation(&self, name: &str) -> Option<&AnnotationValue> {
        self.annotations.iter().find(|a| a.name == name)
    }

    pub fn annotations(&self) -> &[AnnotationValue] {
        &self.annotations
    }

    pub fn bindings(&self) -> &[InterceptorBinding] {
        &self.bindings
    }

    /// 指定拦截类型的绑定
    pub fn bindings_for(&self, kind: InterceptorKind) -> impl Iterator<Item = &InterceptorBinding> {
        self.bindings.iter().filter(move |b| b.kind == kind)
    }

    /// 是否包含尚未解析的 `${...}` 属性表达式
    pub fn has_property_expressions(&self) -> bool {
        self.annotations.iter().any(AnnotationValue::has_property_expressions)
            || self.bindings.iter().any(InterceptorBinding::has_property_expressions)
    }

    /// 生成一份所有属性表达式都已按当前环境解析的副本
    pub fn bind_environment(&self, resolver: &dyn PropertyResolver) -> AopResult<Self> {
        Ok(Self {
            annotations: self
                .annotations
                .iter()
                .map(|a| a.bind(resolver))
                .collect::<AopResult<_>>()?,
            stereotypes: self.stereotypes.clone(),
            bindings: self
                .bindings
                .iter()
                .map(|b| b.bind(resolver))
                .collect::<AopResult<_>>()?,
        })
    }
}

/// 形参描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    name: String,
    type_name: String,
    annotation_metadata: AnnotationMetadata,
}

impl Argument {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            annotation_metadata: AnnotationMetadata::default(),
        }
    }

    /// 以 Rust 类型名作为参数类型
    pub fn of<T: ?Sized>(name: impl Into<String>) -> Self {
        Self::new(name, std::any::type_name::<T>())
    }

    pub fn with_annotation_metadata(mut self, metadata: AnnotationMetadata) -> Self {
        self.annotation_metadata = metadata;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn annotation_metadata(&self) -> &AnnotationMetadata {
        &self.annotation_metadata
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.type_name)
    }
}

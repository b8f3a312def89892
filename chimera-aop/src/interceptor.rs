//! 拦截器（Interceptor）定义
//!
//! 拦截器 trait、拦截类型以及候选拦截器的注册信息

use std::any::TypeId;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chain::InterceptorChain;
use crate::error::AopResult;
use crate::metadata::{BindingTarget, InterceptorBinding};
use crate::value::Value;

/// 拦截类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterceptorKind {
    /// 环绕已有实现的方法
    Around,
    /// 环绕对象构造
    AroundConstruct,
    /// 为没有实现的抽象方法提供实现
    Introduction,
    /// 构造完成后的生命周期回调
    PostConstruct,
    /// 销毁前的生命周期回调
    PreDestroy,
}

impl InterceptorKind {
    /// 是否作用于构造过程（而非方法调用）
    pub fn is_constructor_kind(&self) -> bool {
        matches!(self, InterceptorKind::AroundConstruct)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InterceptorKind::Around => "AROUND",
            InterceptorKind::AroundConstruct => "AROUND_CONSTRUCT",
            InterceptorKind::Introduction => "INTRODUCTION",
            InterceptorKind::PostConstruct => "POST_CONSTRUCT",
            InterceptorKind::PreDestroy => "PRE_DESTROY",
        }
    }
}

impl fmt::Display for InterceptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterceptorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "AROUND" => Ok(InterceptorKind::Around),
            "AROUND_CONSTRUCT" => Ok(InterceptorKind::AroundConstruct),
            "INTRODUCTION" => Ok(InterceptorKind::Introduction),
            "POST_CONSTRUCT" => Ok(InterceptorKind::PostConstruct),
            "PRE_DESTROY" => Ok(InterceptorKind::PreDestroy),
            _ => Err(format!("Invalid interceptor kind: {}", s)),
        }
    }
}

/// 拦截器 Trait
///
/// `intercept` 收到当前拦截链。调用 [`InterceptorChain::proceed`] 继续执行后续拦截器
/// 及最终动作；不调用则短路，直接以本拦截器的返回值作为整条链的结果。
///
/// ```ignore
/// struct Uppercase;
///
/// impl Interceptor for Uppercase {
///     fn intercept(&self, chain: &InterceptorChain) -> AopResult<Value> {
///         let result = chain.proceed()?;
///         let text = result.downcast_ref::<String>().cloned().unwrap_or_default();
///         Ok(Value::of(text.to_uppercase()))
///     }
/// }
/// ```
pub trait Interceptor: Send + Sync {
    /// 执行通知逻辑
    fn intercept(&self, chain: &InterceptorChain) -> AopResult<Value>;

    /// 拦截器名称（用于日志）
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// 显式顺序，数字越小越靠外层
    fn order(&self) -> Option<i32> {
        None
    }

    /// 是否能拦截方法调用（AROUND / INTRODUCTION / 生命周期）
    fn is_method_interceptor(&self) -> bool {
        true
    }

    /// 是否能拦截构造过程（AROUND_CONSTRUCT）
    fn is_constructor_interceptor(&self) -> bool {
        false
    }
}

impl fmt::Debug for dyn Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interceptor({})", self.name())
    }
}

/// 候选拦截器
///
/// 拦截器实例加上其 bean 元数据：具体类型、自身声明的绑定以及可选的显式顺序
#[derive(Clone)]
pub struct InterceptorRegistration {
    interceptor: Arc<dyn Interceptor>,
    type_id: TypeId,
    type_name: &'static str,
    bindings: Vec<InterceptorBinding>,
    order: Option<i32>,
}

impl InterceptorRegistration {
    pub fn new<I: Interceptor + 'static>(interceptor: I) -> Self {
        Self::from_arc(Arc::new(interceptor))
    }

    /// 注册一个已共享的拦截器实例
    pub fn from_arc<I: Interceptor + 'static>(interceptor: Arc<I>) -> Self {
        Self {
            interceptor,
            type_id: TypeId::of::<I>(),
            type_name: std::any::type_name::<I>(),
            bindings: Vec::new(),
            order: None,
        }
    }

    /// 声明该拦截器响应的绑定
    pub fn with_binding(mut self, binding: InterceptorBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// bean 定义上的显式顺序，优先于拦截器自身的 `order()`
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn interceptor(&self) -> &Arc<dyn Interceptor> {
        &self.interceptor
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn bindings(&self) -> &[InterceptorBinding] {
        &self.bindings
    }

    /// 生效的顺序值
    pub fn effective_order(&self, default_order: i32) -> i32 {
        self.order
            .or_else(|| self.interceptor.order())
            .unwrap_or(default_order)
    }

    /// 实例是否为指定类型
    pub fn is_instance_of(&self, type_id: TypeId) -> bool {
        self.type_id == type_id
    }

    /// 自身是否声明了与调用点绑定相匹配的注解绑定
    ///
    /// 注解名与拦截类型都必须一致；调用点携带成员时，成员值也必须一致
    pub fn declares_binding(&self, call_site: &InterceptorBinding) -> bool {
        let Some(name) = call_site.annotation_name() else {
            return false;
        };

        self.bindings.iter().any(|declared| {
            declared.annotation_name() == Some(name)
                && declared.kind() == call_site.kind()
                && call_site
                    .members()
                    .iter()
                    .all(|(k, v)| declared.members().get(k) == Some(v))
        })
    }

    /// 调用点绑定是否适用于该候选
    pub fn matches(&self, call_site: &InterceptorBinding) -> bool {
        match call_site.target() {
            BindingTarget::Type { type_id, .. } => self.is_instance_of(*type_id),
            BindingTarget::Annotation(_) => self.declares_binding(call_site),
        }
    }
}

impl fmt::Debug for InterceptorRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorRegistration")
            .field("type_name", &self.type_name)
            .field("bindings", &self.bindings)
            .field("order", &self.order)
            .finish()
    }
}

/// 编译期提交的拦截器
///
/// ```ignore
/// chimera_aop::inventory::submit! {
///     chimera_aop::InterceptorSubmission {
///         create: || InterceptorRegistration::new(LoggingInterceptor)
///             .with_binding(InterceptorBinding::annotation("Logged")),
///     }
/// }
/// ```
pub struct InterceptorSubmission {
    pub create: fn() -> InterceptorRegistration,
}

inventory::collect!(InterceptorSubmission);

/// 加载所有通过 inventory 提交的拦截器，作为候选池
pub fn load_registered_interceptors() -> Vec<InterceptorRegistration> {
    let registrations: Vec<InterceptorRegistration> = inventory::iter::<InterceptorSubmission>
        .into_iter()
        .map(|submission| (submission.create)())
        .collect();

    tracing::info!("Loaded {} interceptor(s) from registry", registrations.len());
    for registration in &registrations {
        tracing::debug!(
            "  ├─ {} bound to [{}]",
            registration.type_name(),
            registration
                .bindings()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    registrations
}

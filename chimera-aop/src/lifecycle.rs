//! 生命周期拦截
//!
//! 构造、初始化回调和销毁回调都走同一套拦截链：
//! 构造走构造链，POST_CONSTRUCT / PRE_DESTROY 走显式指定类型的方法链。
//! 链的结果必须非空，否则视为框架内部错误。

use std::fmt;
use std::sync::Arc;

use crate::chain::{InterceptorChain, Target};
use crate::error::{AopError, AopResult};
use crate::interceptor::{InterceptorKind, InterceptorRegistration};
use crate::metadata::{AnnotationMetadata, Argument};
use crate::method::{BeanConstructor, ExecutableMethod};
use crate::registry::InterceptorRegistry;
use crate::value::Value;

/// Bean 自身的生命周期回调
pub type LifecycleCallback = Arc<dyn Fn(&Value) -> AopResult<()> + Send + Sync>;

/// Bean 类型的生命周期描述
#[derive(Clone, Default)]
pub struct BeanLifecycle {
    bean_type: String,
    annotation_metadata: AnnotationMetadata,
    post_construct: Option<LifecycleCallback>,
    pre_destroy: Option<LifecycleCallback>,
}

impl BeanLifecycle {
    pub fn new(bean_type: impl Into<String>) -> Self {
        Self {
            bean_type: bean_type.into(),
            ..Self::default()
        }
    }

    /// bean 类型上的注解元数据，POST_CONSTRUCT / PRE_DESTROY 绑定从这里读取
    pub fn with_annotation_metadata(mut self, metadata: AnnotationMetadata) -> Self {
        self.annotation_metadata = metadata;
        self
    }

    pub fn on_post_construct<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Value) -> AopResult<()> + Send + Sync + 'static,
    {
        self.post_construct = Some(Arc::new(callback));
        self
    }

    pub fn on_pre_destroy<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Value) -> AopResult<()> + Send + Sync + 'static,
    {
        self.pre_destroy = Some(Arc::new(callback));
        self
    }

    pub fn bean_type(&self) -> &str {
        &self.bean_type
    }

    fn callback_method(&self, kind: InterceptorKind) -> LifecycleMethod {
        let (name, callback) = match kind {
            InterceptorKind::PreDestroy => ("pre_destroy", self.pre_destroy.clone()),
            _ => ("post_construct", self.post_construct.clone()),
        };
        LifecycleMethod {
            declaring_type: self.bean_type.clone(),
            name,
            annotation_metadata: self.annotation_metadata.clone(),
            callback,
        }
    }
}

impl fmt::Debug for BeanLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanLifecycle")
            .field("bean_type", &self.bean_type)
            .field("post_construct", &self.post_construct.is_some())
            .field("pre_destroy", &self.pre_destroy.is_some())
            .finish()
    }
}

/// 生命周期链的执行句柄：运行 bean 自己的回调（如有）并返回 bean 本身
struct LifecycleMethod {
    declaring_type: String,
    name: &'static str,
    annotation_metadata: AnnotationMetadata,
    callback: Option<LifecycleCallback>,
}

impl ExecutableMethod for LifecycleMethod {
    fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    fn method_name(&self) -> &str {
        self.name
    }

    fn arguments(&self) -> &[Argument] {
        &[]
    }

    fn annotation_metadata(&self) -> &AnnotationMetadata {
        &self.annotation_metadata
    }

    fn invoke(&self, target: &Value, _arguments: &[Value]) -> AopResult<Value> {
        if let Some(callback) = &self.callback {
            callback(target)?;
        }
        Ok(target.clone())
    }
}

/// 经 AROUND_CONSTRUCT 拦截器创建 bean 实例
pub fn instantiate(
    registry: &dyn InterceptorRegistry,
    constructor: Arc<dyn BeanConstructor>,
    candidates: &[InterceptorRegistration],
    parameters: Vec<Value>,
) -> AopResult<Value> {
    instantiate_advised(registry, constructor, candidates, 0, parameters)
}

/// 创建被代理类型的实例
///
/// 末尾 `additional_count` 个框架内部参数对拦截器不可见，原样传给真实构造函数
pub fn instantiate_advised(
    registry: &dyn InterceptorRegistry,
    constructor: Arc<dyn BeanConstructor>,
    candidates: &[InterceptorRegistration],
    additional_count: usize,
    parameters: Vec<Value>,
) -> AopResult<Value> {
    let interceptors = registry.resolve_constructor_interceptors(constructor.as_ref(), candidates)?;
    let declaring_type = constructor.declaring_type().to_string();
    let chain = InterceptorChain::for_advised_constructor(
        interceptors,
        constructor,
        additional_count,
        parameters,
    )?;

    non_null(
        chain.proceed()?,
        format!("Constructor interceptor chain for {} returned null", declaring_type),
    )
}

/// 经 POST_CONSTRUCT 拦截器执行初始化回调，返回（可能被替换的）bean
pub fn post_construct(
    registry: &dyn InterceptorRegistry,
    lifecycle: &BeanLifecycle,
    candidates: &[InterceptorRegistration],
    bean: Value,
) -> AopResult<Value> {
    intercept_lifecycle(registry, lifecycle, candidates, bean, InterceptorKind::PostConstruct)
}

/// 经 PRE_DESTROY 拦截器执行销毁回调
pub fn pre_destroy(
    registry: &dyn InterceptorRegistry,
    lifecycle: &BeanLifecycle,
    candidates: &[InterceptorRegistration],
    bean: Value,
) -> AopResult<Value> {
    intercept_lifecycle(registry, lifecycle, candidates, bean, InterceptorKind::PreDestroy)
}

fn intercept_lifecycle(
    registry: &dyn InterceptorRegistry,
    lifecycle: &BeanLifecycle,
    candidates: &[InterceptorRegistration],
    bean: Value,
    kind: InterceptorKind,
) -> AopResult<Value> {
    let method = Arc::new(lifecycle.callback_method(kind));
    let interceptors = registry.resolve_interceptors(method.as_ref(), candidates, kind)?;
    tracing::trace!(
        "Running {} interceptor(s) of kind {} for {}",
        interceptors.len(),
        kind,
        lifecycle.bean_type()
    );

    let chain =
        InterceptorChain::for_method_with_kind(interceptors, Target::Bean(bean), method, kind, Vec::new());
    non_null(
        chain.proceed()?,
        format!("{} interceptor chain for {} returned null", kind, lifecycle.bean_type()),
    )
}

fn non_null(result: Value, message: String) -> AopResult<Value> {
    if result.is_null() {
        tracing::error!("{}", message);
        return Err(AopError::NullResult { message });
    }
    Ok(result)
}

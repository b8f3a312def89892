//! Adapter 引入
//!
//! 调用点带有 `Adapter` 构造型却没有任何引入拦截器时，合成一个把调用转发给
//! 另一个 bean 方法的拦截器。它总是链上的最后一个拦截器，从不调用 `proceed`。

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::chain::InterceptorChain;
use crate::error::{AopError, AopResult};
use crate::interceptor::Interceptor;
use crate::metadata::{
    AnnotationMetadata, AnnotationValue, ADAPTED_ARGUMENT_TYPES, ADAPTED_BEAN, ADAPTED_METHOD,
    ADAPTED_QUALIFIER, ADAPTER,
};
use crate::method::ExecutableMethod;
use crate::value::Value;

/// 已解析的“bean 实例 + 方法”调用句柄
#[derive(Clone)]
pub struct ExecutionHandle {
    target: Value,
    method: Arc<dyn ExecutableMethod>,
}

impl ExecutionHandle {
    pub fn new(target: Value, method: Arc<dyn ExecutableMethod>) -> Self {
        Self { target, method }
    }

    pub fn target(&self) -> &Value {
        &self.target
    }

    pub fn method(&self) -> &Arc<dyn ExecutableMethod> {
        &self.method
    }

    pub fn invoke(&self, arguments: &[Value]) -> AopResult<Value> {
        self.method.invoke(&self.target, arguments)
    }
}

impl fmt::Debug for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionHandle")
            .field("method", &self.method.signature())
            .finish()
    }
}

/// Bean 方法查找
///
/// 由 bean 上下文实现：按 bean 类型、可选限定符、方法名和参数类型定位方法
pub trait BeanLocator: Send + Sync {
    fn find_execution_handle(
        &self,
        bean_type: &str,
        qualifier: Option<&str>,
        method_name: &str,
        argument_types: &[String],
    ) -> Option<ExecutionHandle>;
}

struct LocatedBean {
    bean_type: String,
    qualifier: Option<String>,
    instance: Value,
    methods: Vec<Arc<dyn ExecutableMethod>>,
}

/// 内存中的 BeanLocator 实现
#[derive(Default)]
pub struct DefaultBeanLocator {
    beans: RwLock<Vec<LocatedBean>>,
}

impl DefaultBeanLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个 bean 实例及其可执行方法
    pub fn register(
        &self,
        bean_type: impl Into<String>,
        qualifier: Option<&str>,
        instance: Value,
        methods: Vec<Arc<dyn ExecutableMethod>>,
    ) {
        let bean_type = bean_type.into();
        tracing::debug!(
            "Registering bean '{}' ({} method(s)) for adapter lookup",
            bean_type,
            methods.len()
        );
        self.beans.write().push(LocatedBean {
            bean_type,
            qualifier: qualifier.map(str::to_string),
            instance,
            methods,
        });
    }
}

impl BeanLocator for DefaultBeanLocator {
    fn find_execution_handle(
        &self,
        bean_type: &str,
        qualifier: Option<&str>,
        method_name: &str,
        argument_types: &[String],
    ) -> Option<ExecutionHandle> {
        let beans = self.beans.read();
        beans
            .iter()
            .filter(|bean| bean.bean_type == bean_type)
            .filter(|bean| qualifier.is_none() || bean.qualifier.as_deref() == qualifier)
            .find_map(|bean| {
                bean.methods
                    .iter()
                    .find(|method| {
                        method.method_name() == method_name
                            && method.arguments().len() == argument_types.len()
                            && method
                                .arguments()
                                .iter()
                                .zip(argument_types)
                                .all(|(argument, expected)| argument.type_name() == expected)
                    })
                    .map(|method| ExecutionHandle::new(bean.instance.clone(), Arc::clone(method)))
            })
    }
}

/// 携带 `adapted_*` 成员的注解
///
/// 调用点只有裸的 `Adapter` 构造型时，成员由声明了被适配 bean 的注解携带
fn adapter_annotation(metadata: &AnnotationMetadata) -> Option<&AnnotationValue> {
    metadata.stereotype_annotation(ADAPTER).or_else(|| {
        if !metadata.has_stereotype(ADAPTER) {
            return None;
        }
        metadata
            .annotations()
            .iter()
            .find(|a| a.member(ADAPTED_BEAN).is_some() || a.member(ADAPTED_METHOD).is_some())
    })
}

/// 把引入调用转发给被适配 bean 方法的拦截器
pub struct AdapterIntroduction {
    execution: ExecutionHandle,
}

impl AdapterIntroduction {
    /// 从调用点的 `Adapter` 注解解析委托方法
    pub fn new(locator: &dyn BeanLocator, method: &dyn ExecutableMethod) -> AopResult<Self> {
        Self::with_metadata(locator, method, method.annotation_metadata())
    }

    /// 使用给定的（通常已按环境解析过的）注解元数据解析委托方法
    ///
    /// 参数类型默认取调用点自身的形参类型
    pub fn with_metadata(
        locator: &dyn BeanLocator,
        method: &dyn ExecutableMethod,
        metadata: &AnnotationMetadata,
    ) -> AopResult<Self> {
        let invalid = |reason: &str| AopError::InvalidAdapter {
            method: method.signature(),
            reason: reason.to_string(),
        };

        let adapter =
            adapter_annotation(metadata).ok_or_else(|| invalid("missing Adapter annotation"))?;
        let bean_type = adapter
            .member(ADAPTED_BEAN)
            .ok_or_else(|| invalid("no adapted bean declared"))?;
        let method_name = adapter
            .member(ADAPTED_METHOD)
            .ok_or_else(|| invalid("no adapted method declared"))?;
        let qualifier = adapter.member(ADAPTED_QUALIFIER);
        let argument_types: Vec<String> = match adapter.member(ADAPTED_ARGUMENT_TYPES) {
            Some(types) => types
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            None => method
                .arguments()
                .iter()
                .map(|a| a.type_name().to_string())
                .collect(),
        };

        let execution = locator
            .find_execution_handle(bean_type, qualifier, method_name, &argument_types)
            .ok_or_else(|| AopError::AdaptedMethodNotFound {
                bean_type: bean_type.to_string(),
                method: method_name.to_string(),
                argument_types: argument_types.join(", "),
                qualifier: qualifier
                    .map(|q| format!(" with qualifier [{}]", q))
                    .unwrap_or_default(),
            })?;

        tracing::debug!(
            "Adapter for {} delegates to {}",
            method.signature(),
            execution.method().signature()
        );

        Ok(Self { execution })
    }

    pub fn execution(&self) -> &ExecutionHandle {
        &self.execution
    }
}

impl Interceptor for AdapterIntroduction {
    fn intercept(&self, chain: &InterceptorChain) -> AopResult<Value> {
        self.execution.invoke(&chain.parameter_values().snapshot())
    }

    fn name(&self) -> &str {
        "AdapterIntroduction"
    }
}

impl fmt::Debug for AdapterIntroduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterIntroduction")
            .field("execution", &self.execution)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Argument;
    use crate::method::MethodDescriptor;

    fn locator() -> DefaultBeanLocator {
        let locator = DefaultBeanLocator::new();
        let on_message: Arc<dyn ExecutableMethod> = Arc::new(
            MethodDescriptor::new("MessageHandler", "on_message")
                .with_argument(Argument::new("text", "String"))
                .with_body(|target, args| {
                    let prefix = target.downcast_ref::<String>().cloned().unwrap_or_default();
                    let text = args[0].downcast_ref::<String>().cloned().unwrap_or_default();
                    Ok(Value::of(format!("{}{}", prefix, text)))
                }),
        );
        locator.register(
            "MessageHandler",
            Some("primary"),
            Value::of(String::from("primary:")),
            vec![Arc::clone(&on_message)],
        );
        locator.register(
            "MessageHandler",
            Some("backup"),
            Value::of(String::from("backup:")),
            vec![on_message],
        );
        locator
    }

    fn adapter_method(annotation: AnnotationValue) -> MethodDescriptor {
        MethodDescriptor::new("MessageListener", "receive")
            .with_argument(Argument::new("message", "String"))
            .with_annotation_metadata(AnnotationMetadata::new().with_annotation(annotation))
    }

    #[test]
    fn test_resolves_by_qualifier() {
        let method = adapter_method(
            AnnotationValue::new(ADAPTER)
                .with_member(ADAPTED_BEAN, "MessageHandler")
                .with_member(ADAPTED_METHOD, "on_message")
                .with_member(ADAPTED_QUALIFIER, "backup"),
        );
        let adapter = AdapterIntroduction::new(&locator(), &method).unwrap();
        let result = adapter
            .execution()
            .invoke(&[Value::of(String::from("hi"))])
            .unwrap();
        assert_eq!(result.downcast_ref::<String>().map(String::as_str), Some("backup:hi"));
    }

    #[test]
    fn test_explicit_argument_types_must_match() {
        let method = adapter_method(
            AnnotationValue::new(ADAPTER)
                .with_member(ADAPTED_BEAN, "MessageHandler")
                .with_member(ADAPTED_METHOD, "on_message")
                .with_member(ADAPTED_ARGUMENT_TYPES, "i64"),
        );
        let err = AdapterIntroduction::new(&locator(), &method).unwrap_err();
        assert!(matches!(err, AopError::AdaptedMethodNotFound { ref argument_types, .. } if argument_types == "i64"));
    }

    #[test]
    fn test_members_read_from_stereotyped_annotation() {
        let method = adapter_method(
            AnnotationValue::new("MessageListener")
                .with_stereotype(ADAPTER)
                .with_member(ADAPTED_BEAN, "MessageHandler")
                .with_member(ADAPTED_METHOD, "on_message")
                .with_member(ADAPTED_QUALIFIER, "primary"),
        );
        let adapter = AdapterIntroduction::new(&locator(), &method).unwrap();
        let result = adapter
            .execution()
            .invoke(&[Value::of(String::from("hi"))])
            .unwrap();
        assert_eq!(result.downcast_ref::<String>().map(String::as_str), Some("primary:hi"));
    }

    #[test]
    fn test_missing_members_are_invalid() {
        let method = adapter_method(
            AnnotationValue::new(ADAPTER).with_member(ADAPTED_BEAN, "MessageHandler"),
        );
        let err = AdapterIntroduction::new(&locator(), &method).unwrap_err();
        assert!(matches!(err, AopError::InvalidAdapter { .. }));
        assert!(err.is_configuration_error());
    }
}

//! 可执行句柄
//!
//! 真实方法与真实构造函数的调用抽象，由生成的调用点提供

use std::fmt;
use std::sync::Arc;

use crate::error::{AopError, AopResult};
use crate::metadata::{AnnotationMetadata, Argument};
use crate::value::Value;

/// 方法体函数类型
pub type MethodBody = Arc<dyn Fn(&Value, &[Value]) -> AopResult<Value> + Send + Sync>;

/// 构造函数体类型
pub type ConstructorBody = Arc<dyn Fn(&[Value]) -> AopResult<Value> + Send + Sync>;

/// 可执行方法
pub trait ExecutableMethod: Send + Sync {
    /// 声明该方法的类型名
    fn declaring_type(&self) -> &str;

    fn method_name(&self) -> &str;

    /// 形参描述（声明顺序）
    fn arguments(&self) -> &[Argument];

    fn annotation_metadata(&self) -> &AnnotationMetadata;

    /// 是否没有方法体
    fn is_abstract(&self) -> bool {
        false
    }

    /// 在目标对象上调用真实实现
    fn invoke(&self, target: &Value, arguments: &[Value]) -> AopResult<Value>;

    /// 完整签名，例如 `Greeter::greet(name: String)`
    fn signature(&self) -> String {
        let arguments: Vec<String> = self.arguments().iter().map(ToString::to_string).collect();
        format!(
            "{}::{}({})",
            self.declaring_type(),
            self.method_name(),
            arguments.join(", ")
        )
    }
}

/// Bean 构造函数
pub trait BeanConstructor: Send + Sync {
    fn declaring_type(&self) -> &str;

    /// 用户可见的形参描述
    fn arguments(&self) -> &[Argument];

    fn annotation_metadata(&self) -> &AnnotationMetadata;

    /// 调用真实构造函数
    fn instantiate(&self, arguments: &[Value]) -> AopResult<Value>;
}

/// 基于闭包的方法描述
///
/// 没有设置方法体时视为抽象方法
#[derive(Clone)]
pub struct MethodDescriptor {
    declaring_type: String,
    name: String,
    arguments: Vec<Argument>,
    annotation_metadata: AnnotationMetadata,
    body: Option<MethodBody>,
}

impl MethodDescriptor {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            arguments: Vec::new(),
            annotation_metadata: AnnotationMetadata::default(),
            body: None,
        }
    }

    pub fn with_argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_annotation_metadata(mut self, metadata: AnnotationMetadata) -> Self {
        self.annotation_metadata = metadata;
        self
    }

    pub fn with_body<F>(mut self, body: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> AopResult<Value> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }
}

impl ExecutableMethod for MethodDescriptor {
    fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    fn method_name(&self) -> &str {
        &self.name
    }

    fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    fn annotation_metadata(&self) -> &AnnotationMetadata {
        &self.annotation_metadata
    }

    fn is_abstract(&self) -> bool {
        self.body.is_none()
    }

    fn invoke(&self, target: &Value, arguments: &[Value]) -> AopResult<Value> {
        match &self.body {
            Some(body) => body(target, arguments),
            None => Err(AopError::AbstractMethodInvocation {
                method: self.signature(),
            }),
        }
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("signature", &self.signature())
            .field("abstract", &self.body.is_none())
            .finish()
    }
}

/// 基于闭包的构造函数描述
#[derive(Clone)]
pub struct ConstructorDescriptor {
    declaring_type: String,
    arguments: Vec<Argument>,
    annotation_metadata: AnnotationMetadata,
    body: ConstructorBody,
}

impl ConstructorDescriptor {
    pub fn new<F>(declaring_type: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value]) -> AopResult<Value> + Send + Sync + 'static,
    {
        Self {
            declaring_type: declaring_type.into(),
            arguments: Vec::new(),
            annotation_metadata: AnnotationMetadata::default(),
            body: Arc::new(body),
        }
    }

    pub fn with_argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_annotation_metadata(mut self, metadata: AnnotationMetadata) -> Self {
        self.annotation_metadata = metadata;
        self
    }
}

impl BeanConstructor for ConstructorDescriptor {
    fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    fn annotation_metadata(&self) -> &AnnotationMetadata {
        &self.annotation_metadata
    }

    fn instantiate(&self, arguments: &[Value]) -> AopResult<Value> {
        (self.body)(arguments)
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("declaring_type", &self.declaring_type)
            .field("arguments", &self.arguments)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature() {
        let method = MethodDescriptor::new("Greeter", "greet")
            .with_argument(Argument::new("name", "String"))
            .with_argument(Argument::new("times", "u32"));
        assert_eq!(method.signature(), "Greeter::greet(name: String, times: u32)");
    }

    #[test]
    fn test_abstract_method_invocation() {
        let method = MethodDescriptor::new("Greeter", "greet");
        assert!(method.is_abstract());
        let err = method.invoke(&Value::null(), &[]).unwrap_err();
        assert!(matches!(err, AopError::AbstractMethodInvocation { .. }));
    }

    #[test]
    fn test_concrete_method_invocation() {
        let method = MethodDescriptor::new("Calculator", "add").with_body(|_, args| {
            let a = args[0].downcast_ref::<i64>().copied().unwrap_or_default();
            let b = args[1].downcast_ref::<i64>().copied().unwrap_or_default();
            Ok(Value::of(a + b))
        });
        assert!(!method.is_abstract());
        let result = method
            .invoke(&Value::null(), &[Value::of(2_i64), Value::of(3_i64)])
            .unwrap();
        assert_eq!(result.downcast_ref::<i64>(), Some(&5));
    }
}

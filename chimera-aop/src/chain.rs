//! 拦截链（InterceptorChain）
//!
//! 共享同一个游标状态机，按目标不同有两种最终动作：
//! - 方法链：在目标对象上调用真实方法（引入代理上的抽象方法则报错）
//! - 构造链：调用真实构造函数，必要时在参数末尾拼回内部参数
//!
//! Adapter 引入不需要单独的最终动作，它作为最后一个拦截器直接调用委托方法。

use std::fmt;
use std::sync::Arc;

use crate::context::{ArgumentValues, Attributes, InterceptorArray, InvocationContext, ParameterValues};
use crate::error::{AopError, AopResult};
use crate::interceptor::{Interceptor, InterceptorKind};
use crate::metadata::{AnnotationMetadata, Argument};
use crate::method::{BeanConstructor, ExecutableMethod};
use crate::value::Value;

/// 方法调用的接收者
#[derive(Clone, Debug)]
pub enum Target {
    /// 有真实实现的普通 bean
    Bean(Value),
    /// 由引入代理合成的实现，抽象方法没有方法体
    Introduced(Value),
}

impl Target {
    pub fn value(&self) -> &Value {
        match self {
            Target::Bean(value) | Target::Introduced(value) => value,
        }
    }

    pub fn is_introduced(&self) -> bool {
        matches!(self, Target::Introduced(_))
    }
}

enum ChainTarget {
    Method {
        target: Target,
        method: Arc<dyn ExecutableMethod>,
        kind: Option<InterceptorKind>,
    },
    Constructor {
        constructor: Arc<dyn BeanConstructor>,
        internal_parameters: Vec<Value>,
    },
}

impl ChainTarget {
    fn describe(&self) -> &'static str {
        match self {
            ChainTarget::Method { .. } => "method",
            ChainTarget::Constructor { .. } => "constructor",
        }
    }
}

/// 拦截链
///
/// 每次逻辑调用新建一条链，`proceed` 在调用线程上同步递归执行剩余的拦截器
/// 和最终动作。拦截器数组本身在多次调用间共享。
pub struct InterceptorChain {
    context: InvocationContext,
    target: ChainTarget,
}

impl InterceptorChain {
    /// 方法拦截链，拦截类型由目标推断
    pub fn for_method(
        interceptors: InterceptorArray,
        target: Target,
        method: Arc<dyn ExecutableMethod>,
        parameters: Vec<Value>,
    ) -> Self {
        Self {
            context: InvocationContext::new(interceptors, parameters),
            target: ChainTarget::Method {
                target,
                method,
                kind: None,
            },
        }
    }

    /// 方法拦截链，显式指定拦截类型（例如生命周期回调）
    pub fn for_method_with_kind(
        interceptors: InterceptorArray,
        target: Target,
        method: Arc<dyn ExecutableMethod>,
        kind: InterceptorKind,
        parameters: Vec<Value>,
    ) -> Self {
        Self {
            context: InvocationContext::new(interceptors, parameters),
            target: ChainTarget::Method {
                target,
                method,
                kind: Some(kind),
            },
        }
    }

    /// 构造拦截链
    pub fn for_constructor(
        interceptors: InterceptorArray,
        constructor: Arc<dyn BeanConstructor>,
        parameters: Vec<Value>,
    ) -> Self {
        Self {
            context: InvocationContext::new(interceptors, parameters),
            target: ChainTarget::Constructor {
                constructor,
                internal_parameters: Vec::new(),
            },
        }
    }

    /// 被代理类型的构造拦截链
    ///
    /// 代理构造函数在声明参数之后还接收 `additional_count` 个框架内部参数。
    /// 拦截器只能看到前面的声明参数，内部参数原样拼回给真实构造函数。
    pub fn for_advised_constructor(
        interceptors: InterceptorArray,
        constructor: Arc<dyn BeanConstructor>,
        additional_count: usize,
        mut parameters: Vec<Value>,
    ) -> AopResult<Self> {
        if additional_count > parameters.len() {
            return Err(AopError::InvalidParameterCount {
                declaring_type: constructor.declaring_type().to_string(),
                actual: parameters.len(),
                additional: additional_count,
            });
        }

        let internal_parameters = parameters.split_off(parameters.len() - additional_count);
        Ok(Self {
            context: InvocationContext::new(interceptors, parameters),
            target: ChainTarget::Constructor {
                constructor,
                internal_parameters,
            },
        })
    }

    /// 继续执行下一个拦截器；链已走完时执行最终动作
    pub fn proceed(&self) -> AopResult<Value> {
        match self.context.advance() {
            Some((position, interceptor)) => {
                tracing::trace!(
                    "Proceeding to interceptor {} ({}/{}) for {}",
                    interceptor.name(),
                    position + 1,
                    self.context.interceptors().len(),
                    self.declaring_type()
                );
                interceptor.intercept(self)
            }
            None => self.terminal(),
        }
    }

    /// 从指定拦截器之后继续执行，无论当前游标在哪里
    ///
    /// `from` 按实例身份在链中查找，不在链中时立即失败且不改变游标
    pub fn proceed_from(&self, from: &dyn Interceptor) -> AopResult<Value> {
        let position = self.context.position_of(from)?;
        self.context.reset_to(position + 1);
        self.proceed()
    }

    /// 以新的目标和参数重新执行同一方法的完整拦截链
    pub fn invoke(&self, target: Target, parameters: Vec<Value>) -> AopResult<Value> {
        match &self.target {
            ChainTarget::Method { method, kind, .. } => {
                let chain = Self {
                    context: InvocationContext::new(
                        Arc::clone(self.context.interceptors()),
                        parameters,
                    ),
                    target: ChainTarget::Method {
                        target,
                        method: Arc::clone(method),
                        kind: *kind,
                    },
                };
                chain.proceed()
            }
            ChainTarget::Constructor { .. } => Err(self.unsupported("invoke")),
        }
    }

    fn terminal(&self) -> AopResult<Value> {
        match &self.target {
            ChainTarget::Method { target, method, .. } => {
                if target.is_introduced() && method.is_abstract() {
                    tracing::error!(
                        "No introduction advice implements abstract method {}",
                        method.signature()
                    );
                    return Err(AopError::UnimplementedAdvice {
                        method: method.signature(),
                    });
                }
                tracing::trace!("Invoking target method {}", method.signature());
                method.invoke(target.value(), &self.context.parameter_values().snapshot())
            }
            ChainTarget::Constructor {
                constructor,
                internal_parameters,
            } => {
                let mut arguments = self.context.parameter_values().snapshot();
                arguments.extend(internal_parameters.iter().cloned());
                tracing::trace!(
                    "Instantiating {} with {} argument(s)",
                    constructor.declaring_type(),
                    arguments.len()
                );
                constructor.instantiate(&arguments)
            }
        }
    }

    fn unsupported(&self, operation: &'static str) -> AopError {
        AopError::UnsupportedOperation {
            operation,
            chain: self.target.describe(),
        }
    }

    /// 拦截类型
    ///
    /// 方法链未显式指定时：引入代理为 INTRODUCTION，否则为 AROUND
    pub fn kind(&self) -> InterceptorKind {
        match &self.target {
            ChainTarget::Method {
                kind: Some(kind), ..
            } => *kind,
            ChainTarget::Method { target, .. } if target.is_introduced() => {
                InterceptorKind::Introduction
            }
            ChainTarget::Method { .. } => InterceptorKind::Around,
            ChainTarget::Constructor { .. } => InterceptorKind::AroundConstruct,
        }
    }

    /// 方法链的接收者
    pub fn target(&self) -> AopResult<&Value> {
        match &self.target {
            ChainTarget::Method { target, .. } => Ok(target.value()),
            ChainTarget::Constructor { .. } => Err(self.unsupported("target")),
        }
    }

    /// 方法链的执行句柄
    pub fn executable_method(&self) -> AopResult<&Arc<dyn ExecutableMethod>> {
        match &self.target {
            ChainTarget::Method { method, .. } => Ok(method),
            ChainTarget::Constructor { .. } => Err(self.unsupported("executable_method")),
        }
    }

    /// 构造链的构造函数
    pub fn constructor(&self) -> AopResult<&Arc<dyn BeanConstructor>> {
        match &self.target {
            ChainTarget::Constructor { constructor, .. } => Ok(constructor),
            ChainTarget::Method { .. } => Err(self.unsupported("constructor")),
        }
    }

    pub fn declaring_type(&self) -> &str {
        match &self.target {
            ChainTarget::Method { method, .. } => method.declaring_type(),
            ChainTarget::Constructor { constructor, .. } => constructor.declaring_type(),
        }
    }

    /// 拦截器可见的形参描述
    pub fn arguments(&self) -> &[Argument] {
        match &self.target {
            ChainTarget::Method { method, .. } => method.arguments(),
            ChainTarget::Constructor { constructor, .. } => constructor.arguments(),
        }
    }

    pub fn annotation_metadata(&self) -> &AnnotationMetadata {
        match &self.target {
            ChainTarget::Method { method, .. } => method.annotation_metadata(),
            ChainTarget::Constructor { constructor, .. } => constructor.annotation_metadata(),
        }
    }

    pub fn interceptors(&self) -> &InterceptorArray {
        self.context.interceptors()
    }

    /// 共享的参数值数组
    pub fn parameter_values(&self) -> &ParameterValues {
        self.context.parameter_values()
    }

    /// 形参名到参数槽位的视图（声明顺序）
    pub fn parameters(&self) -> &ArgumentValues {
        self.context.parameters(self.arguments())
    }

    pub fn attributes(&self) -> &Attributes {
        self.context.attributes()
    }

    pub fn context(&self) -> &InvocationContext {
        &self.context
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("kind", &self.kind())
            .field("declaring_type", &self.declaring_type())
            .field("context", &self.context)
            .finish()
    }
}

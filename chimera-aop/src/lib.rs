//! Chimera AOP - 拦截链执行核心
//!
//! 为框架托管对象上的方法调用、构造和生命周期回调提供有序拦截：
//! - AROUND：环绕已有实现的方法
//! - INTRODUCTION：为抽象方法提供实现（含 Adapter 委托）
//! - AROUND_CONSTRUCT / POST_CONSTRUCT / PRE_DESTROY：构造与生命周期拦截
//!
//! 调用点代码先通过 [`InterceptorRegistry`] 解析出拦截器数组（每个调用点解析一次），
//! 然后每次调用新建一条 [`InterceptorChain`] 并调用 `proceed`。

pub mod adapter;
pub mod chain;
pub mod config;
pub mod context;
pub mod error;
pub mod interceptor;
pub mod lifecycle;
pub mod metadata;
pub mod method;
pub mod registry;
pub mod resolution;
pub mod value;

// 重新导出核心类型
pub use adapter::{AdapterIntroduction, BeanLocator, DefaultBeanLocator, ExecutionHandle};
pub use chain::{InterceptorChain, Target};
pub use config::AopProperties;
pub use context::{
    zero_interceptors, ArgumentValues, Attributes, InterceptorArray, InvocationContext,
    MutableArgumentValue, ParameterValues,
};
pub use error::{AopError, AopResult};
pub use interceptor::{
    load_registered_interceptors, Interceptor, InterceptorKind, InterceptorRegistration,
    InterceptorSubmission,
};
pub use lifecycle::{BeanLifecycle, LifecycleCallback};
pub use metadata::{AnnotationMetadata, AnnotationValue, Argument, BindingTarget, InterceptorBinding};
pub use method::{BeanConstructor, ConstructorDescriptor, ExecutableMethod, MethodDescriptor};
pub use registry::{DefaultInterceptorRegistry, InterceptorRegistry};
pub use value::Value;

// 导出 inventory 供拦截器提交使用
pub use inventory;

/// 预导入模块
pub mod prelude {
    pub use crate::adapter::{BeanLocator, DefaultBeanLocator};
    pub use crate::chain::{InterceptorChain, Target};
    pub use crate::error::{AopError, AopResult};
    pub use crate::interceptor::{
        Interceptor, InterceptorKind, InterceptorRegistration, InterceptorSubmission,
    };
    pub use crate::lifecycle::BeanLifecycle;
    pub use crate::metadata::{AnnotationMetadata, AnnotationValue, Argument, InterceptorBinding};
    pub use crate::method::{ConstructorDescriptor, ExecutableMethod, MethodDescriptor};
    pub use crate::registry::{DefaultInterceptorRegistry, InterceptorRegistry};
    pub use crate::value::Value;
}

//! 拦截错误定义
//!
//! 配置错误、未实现的通知以及用户错误的统一载体

use thiserror::Error;

/// 拦截核心错误
#[derive(Debug, Error)]
pub enum AopError {
    /// `proceed_from` 传入的拦截器不在当前拦截链中
    #[error("Argument [from] is not within the interceptor chain: {interceptor}")]
    InterceptorNotInChain { interceptor: String },

    /// 需要引入拦截器但一个都没有解析到
    #[error(
        "At least one introduction method interceptor required, but missing for method: {method}. \
         Check that the introduction binding names an interceptor type or an annotation declared \
         by a registered interceptor, or do not load introduction beans whose interceptors are missing"
    )]
    MissingIntroductionInterceptor { method: String },

    /// 当前拦截链变体不支持该操作
    #[error("Operation [{operation}] is not supported by a {chain} interceptor chain")]
    UnsupportedOperation {
        operation: &'static str,
        chain: &'static str,
    },

    /// 引入代理上的抽象方法没有任何通知提供实现
    #[error("Abstract method [{method}] has no introduction advice that implements it")]
    UnimplementedAdvice { method: String },

    /// 直接调用了没有方法体的方法
    #[error("Method [{method}] is abstract and cannot be invoked directly")]
    AbstractMethodInvocation { method: String },

    /// 构造或生命周期拦截链返回了 null
    #[error("{message}")]
    NullResult { message: String },

    /// Adapter 注解缺少必需的成员
    #[error("Invalid adapter declaration on method [{method}]: {reason}")]
    InvalidAdapter { method: String, reason: String },

    /// Adapter 指向的方法不存在
    #[error("No method [{method}({argument_types})] found on adapted bean [{bean_type}]{qualifier}")]
    AdaptedMethodNotFound {
        bean_type: String,
        method: String,
        argument_types: String,
        qualifier: String,
    },

    /// 参数下标越界
    #[error("Parameter index {index} out of bounds for {len} parameter(s)")]
    ParameterIndexOutOfBounds { index: usize, len: usize },

    /// 代理构造函数的参数数量与内部参数数量不符
    #[error("Constructor of [{declaring_type}] received {actual} parameter(s) but expects at least {additional} internal parameter(s)")]
    InvalidParameterCount {
        declaring_type: String,
        actual: usize,
        additional: usize,
    },

    /// 注解元数据中的占位符无法解析
    #[error(transparent)]
    Environment(#[from] chimera_core::CoreError),

    /// 拦截器或目标方法抛出的用户错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AopError {
    /// 是否为配置类错误（启动期即应失败，不应重试）
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            AopError::InterceptorNotInChain { .. }
                | AopError::MissingIntroductionInterceptor { .. }
                | AopError::UnsupportedOperation { .. }
                | AopError::InvalidAdapter { .. }
                | AopError::AdaptedMethodNotFound { .. }
                | AopError::Environment(_)
        )
    }
}

/// 拦截核心结果类型
pub type AopResult<T> = std::result::Result<T, AopError>;

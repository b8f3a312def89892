//! 核心错误类型
//!
//! 配置、占位符解析和日志初始化共用的错误定义

use thiserror::Error;

/// 核心错误
#[derive(Debug, Error)]
pub enum CoreError {
    /// 占位符无法解析且未提供默认值
    #[error("Could not resolve placeholder ${{{placeholder}}} in value \"{text}\"")]
    UnresolvablePlaceholder { placeholder: String, text: String },

    /// 配置文件读取或解析失败
    #[error("Failed to load configuration: {0}")]
    ConfigParse(String),

    /// 日志系统初始化失败
    #[error("Failed to initialize logging: {0}")]
    LoggingInitFailed(String),
}

/// 核心结果类型
pub type CoreResult<T> = std::result::Result<T, CoreError>;

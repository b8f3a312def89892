// chimera-core: Chimera 框架的基础设施
//
// 为拦截器核心提供：
// - 分层配置（环境变量 / TOML / 内存配置源）
// - `${...}` 占位符解析
// - 基于 tracing 的日志初始化

pub mod config;
pub mod error;
pub mod logging;

// 重新导出常用类型
pub use config::{
    contains_placeholder, ConfigValue, Environment, EnvironmentPropertySource,
    MapPropertySource, PropertyResolver, PropertySource, TomlPropertySource,
};
pub use error::{CoreError, CoreResult};
pub use logging::{LogFormat, LogLevel, LoggingConfig};

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::config::{
        ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource,
        PropertyResolver, PropertySource, TomlPropertySource,
    };
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
}

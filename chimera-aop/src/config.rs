//! AOP 配置属性
//!
//! 可通过配置文件的 `chimera.aop` 前缀配置

use chimera_core::prelude::Environment;
use serde::{Deserialize, Serialize};

/// 未显式声明顺序的拦截器使用的默认顺序
pub const AOP_DEFAULT_ORDER: &str = "chimera.aop.default-order";

/// 解析前是否按环境解析注解中的 `${...}` 占位符
pub const AOP_BIND_ENVIRONMENT: &str = "chimera.aop.bind-environment";

/// 拦截器解析配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AopProperties {
    #[serde(default)]
    pub default_order: i32,

    #[serde(default = "default_bind_environment")]
    pub bind_environment: bool,
}

fn default_bind_environment() -> bool {
    true
}

impl Default for AopProperties {
    fn default() -> Self {
        Self {
            default_order: 0,
            bind_environment: default_bind_environment(),
        }
    }
}

impl AopProperties {
    /// 从 Environment 加载配置
    pub fn from_environment(env: &Environment) -> Self {
        Self {
            default_order: env
                .get_i64(AOP_DEFAULT_ORDER)
                .and_then(|v| i32::try_from(v).ok())
                .unwrap_or(0),
            bind_environment: env.get_bool_or(AOP_BIND_ENVIRONMENT, default_bind_environment()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chimera_core::{ConfigValue, MapPropertySource};

    #[test]
    fn test_defaults() {
        let properties = AopProperties::from_environment(&Environment::new());
        assert_eq!(properties, AopProperties::default());
        assert!(properties.bind_environment);
    }

    #[test]
    fn test_from_environment() {
        let env = Environment::new().with_property_source(Box::new(
            MapPropertySource::new("test")
                .with_property(AOP_DEFAULT_ORDER, ConfigValue::Int(100))
                .with_property(AOP_BIND_ENVIRONMENT, ConfigValue::Bool(false)),
        ));
        let properties = AopProperties::from_environment(&env);
        assert_eq!(properties.default_order, 100);
        assert!(!properties.bind_environment);
    }

    #[test]
    fn test_deserialize_toml_table() {
        let properties: AopProperties = toml::from_str("default-order = -10\n").unwrap();
        assert_eq!(properties.default_order, -10);
        assert!(properties.bind_environment);
    }
}

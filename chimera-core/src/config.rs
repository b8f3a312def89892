use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;

use crate::error::{CoreError, CoreResult};

/// 占位符语法：`${key}` 或 `${key:default}`
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([^}:]+)(?::([^}]*))?\}").expect("placeholder pattern is valid")
});

/// 配置值类型
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<ConfigValue>),
    Object(HashMap<String, ConfigValue>),
}

impl ConfigValue {
    /// 转换为字符串
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 转换为整数
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            ConfigValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// 转换为布尔值
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => write!(f, "{}", s),
            ConfigValue::Int(i) => write!(f, "{}", i),
            ConfigValue::Float(v) => write!(f, "{}", v),
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Array(items) => {
                let joined: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "{}", joined.join(","))
            }
            ConfigValue::Object(_) => write!(f, "{{...}}"),
        }
    }
}

/// 配置源 trait
pub trait PropertySource: Send + Sync {
    /// 获取配置源名称
    fn name(&self) -> &str;

    /// 获取配置值
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// 配置源优先级（数字越大优先级越高）
    fn priority(&self) -> i32 {
        0
    }
}

/// 属性解析器
///
/// 负责把文本中的 `${...}` 占位符替换为当前环境中的值。
/// 拦截器解析阶段依赖它来绑定注解元数据中的属性表达式。
pub trait PropertyResolver: Send + Sync {
    /// 按键查找原始字符串值
    fn get_property(&self, key: &str) -> Option<String>;

    /// 解析文本中的所有占位符
    ///
    /// `${key:default}` 在键缺失时使用默认值；没有默认值的缺失键返回错误。
    fn resolve_placeholders(&self, text: &str) -> CoreResult<String> {
        if !contains_placeholder(text) {
            return Ok(text.to_string());
        }

        let mut resolved = String::with_capacity(text.len());
        let mut last = 0;
        for captures in PLACEHOLDER.captures_iter(text) {
            let whole = match captures.get(0) {
                Some(m) => m,
                None => continue,
            };
            let key = captures.get(1).map(|m| m.as_str().trim()).unwrap_or_default();

            resolved.push_str(&text[last..whole.start()]);
            match (self.get_property(key), captures.get(2)) {
                (Some(value), _) => resolved.push_str(&value),
                (None, Some(default)) => resolved.push_str(default.as_str()),
                (None, None) => {
                    return Err(CoreError::UnresolvablePlaceholder {
                        placeholder: key.to_string(),
                        text: text.to_string(),
                    })
                }
            }
            last = whole.end();
        }
        resolved.push_str(&text[last..]);

        Ok(resolved)
    }
}

/// 检查文本是否包含 `${...}` 占位符
pub fn contains_placeholder(text: &str) -> bool {
    text.contains("${") && PLACEHOLDER.is_match(text)
}

/// Environment - 配置管理器
///
/// 类似 Spring Boot 的 Environment，提供统一的配置访问接口
pub struct Environment {
    /// 配置源列表（按优先级排序）
    sources: RwLock<Vec<Box<dyn PropertySource>>>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources = self.sources.read();
        let names: Vec<&str> = sources.iter().map(|s| s.name()).collect();
        f.debug_struct("Environment")
            .field("sources", &names)
            .finish()
    }
}

impl Environment {
    /// 创建新的环境
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
        }
    }

    /// 添加配置源
    pub fn add_property_source(&self, source: Box<dyn PropertySource>) {
        let mut sources = self.sources.write();
        tracing::debug!(
            "Adding property source '{}' (priority {})",
            source.name(),
            source.priority()
        );
        sources.push(source);
        // 按优先级降序排序
        sources.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// 链式添加配置源
    pub fn with_property_source(self, source: Box<dyn PropertySource>) -> Self {
        self.add_property_source(source);
        self
    }

    /// 获取配置值
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        let sources = self.sources.read();
        for source in sources.iter() {
            if let Some(value) = source.get(key) {
                tracing::trace!("Config '{}' found in source '{}'", key, source.name());
                return Some(value);
            }
        }
        tracing::trace!("Config '{}' not found in any source", key);
        None
    }

    /// 获取字符串配置
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string())
    }

    /// 获取整数配置
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    /// 获取布尔值配置
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// 获取布尔值配置（带默认值）
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyResolver for Environment {
    fn get_property(&self, key: &str) -> Option<String> {
        self.get_string(key)
    }
}

// ========== Property Sources ==========

/// 环境变量配置源
pub struct EnvironmentPropertySource {
    prefix: String,
    priority: i32,
}

impl EnvironmentPropertySource {
    /// 创建环境变量配置源
    ///
    /// # 参数
    /// * `prefix` - 环境变量前缀，例如 "APP_"
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            priority: 100, // 环境变量优先级较高
        }
    }

    /// 将配置键转换为环境变量名
    /// 例如: chimera.aop.default-order -> APP_CHIMERA_AOP_DEFAULT_ORDER
    fn key_to_env(&self, key: &str) -> String {
        format!(
            "{}{}",
            self.prefix,
            key.replace(['.', '-'], "_").to_uppercase()
        )
    }
}

impl PropertySource for EnvironmentPropertySource {
    fn name(&self) -> &str {
        "environment"
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        std::env::var(self.key_to_env(key))
            .ok()
            .map(ConfigValue::String)
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// TOML 配置源
pub struct TomlPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl TomlPropertySource {
    /// 从文件加载 TOML 配置
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| CoreError::ConfigParse(format!("{:?}: {}", path, e)))?;

        Self::parse(&content, path.to_string_lossy().to_string())
    }

    /// 从字符串解析 TOML 配置
    pub fn parse(content: &str, name: impl Into<String>) -> CoreResult<Self> {
        let value: toml::Value =
            toml::from_str(content).map_err(|e| CoreError::ConfigParse(e.to_string()))?;

        let mut properties = HashMap::new();
        Self::flatten_toml(&value, String::new(), &mut properties);

        Ok(Self {
            name: name.into(),
            properties,
            priority: 0, // 文件配置优先级最低
        })
    }

    /// 展平 TOML 结构
    /// 例如: { chimera: { aop: { default-order: 5 } } } -> { "chimera.aop.default-order": 5 }
    fn flatten_toml(value: &toml::Value, prefix: String, result: &mut HashMap<String, ConfigValue>) {
        match value {
            toml::Value::Table(table) => {
                for (key, val) in table {
                    let new_prefix = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    Self::flatten_toml(val, new_prefix, result);
                }
            }
            other => {
                result.insert(prefix, Self::toml_value_to_config(other));
            }
        }
    }

    /// 转换 TOML 值为 ConfigValue
    fn toml_value_to_config(value: &toml::Value) -> ConfigValue {
        match value {
            toml::Value::String(s) => ConfigValue::String(s.clone()),
            toml::Value::Integer(i) => ConfigValue::Int(*i),
            toml::Value::Float(f) => ConfigValue::Float(*f),
            toml::Value::Boolean(b) => ConfigValue::Bool(*b),
            toml::Value::Array(arr) => {
                ConfigValue::Array(arr.iter().map(Self::toml_value_to_config).collect())
            }
            toml::Value::Table(table) => ConfigValue::Object(
                table
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::toml_value_to_config(v)))
                    .collect(),
            ),
            toml::Value::Datetime(dt) => ConfigValue::String(dt.to_string()),
        }
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl PropertySource for TomlPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// 内存配置源（用于测试或运行时配置）
pub struct MapPropertySource {
    name: String,
    properties: HashMap<String, ConfigValue>,
    priority: i32,
}

impl MapPropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: HashMap::new(),
            priority: 50,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: ConfigValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl PropertySource for MapPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.properties.get(key).cloned()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment() -> Environment {
        Environment::new().with_property_source(Box::new(
            MapPropertySource::new("test")
                .with_property("cache.name", ConfigValue::String("users".into()))
                .with_property("cache.size", ConfigValue::Int(64)),
        ))
    }

    #[test]
    fn test_resolve_placeholders() {
        let env = environment();
        assert_eq!(env.resolve_placeholders("Cached-${cache.name}").unwrap(), "Cached-users");
        assert_eq!(
            env.resolve_placeholders("${cache.name}:${cache.size}").unwrap(),
            "users:64"
        );
        assert_eq!(env.resolve_placeholders("plain").unwrap(), "plain");
    }

    #[test]
    fn test_resolve_placeholder_default() {
        let env = environment();
        assert_eq!(env.resolve_placeholders("${missing:fallback}").unwrap(), "fallback");
        assert_eq!(env.resolve_placeholders("${missing:}").unwrap(), "");
    }

    #[test]
    fn test_unresolvable_placeholder() {
        let env = environment();
        let err = env.resolve_placeholders("${missing}").unwrap_err();
        assert!(matches!(
            err,
            CoreError::UnresolvablePlaceholder { ref placeholder, .. } if placeholder == "missing"
        ));
    }

    #[test]
    fn test_source_priority() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("low")
                .with_property("key", ConfigValue::String("low".into()))
                .with_priority(1),
        ));
        env.add_property_source(Box::new(
            MapPropertySource::new("high")
                .with_property("key", ConfigValue::String("high".into()))
                .with_priority(10),
        ));
        assert_eq!(env.get_string("key").as_deref(), Some("high"));
    }

    #[test]
    fn test_toml_flatten() {
        let source = TomlPropertySource::parse(
            r#"
            [chimera.aop]
            default-order = 7
            bind-environment = false
            "#,
            "inline",
        )
        .unwrap();
        let env = Environment::new().with_property_source(Box::new(source));
        assert_eq!(env.get_i64("chimera.aop.default-order"), Some(7));
        assert_eq!(env.get_bool("chimera.aop.bind-environment"), Some(false));
    }
}

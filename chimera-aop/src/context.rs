//! 调用上下文（InvocationContext）
//!
//! 单次调用的可变状态：参数值、属性以及拦截链游标。
//! 每次逻辑调用都会新建一个上下文，调用结束后丢弃。

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;

use crate::error::{AopError, AopResult};
use crate::interceptor::Interceptor;
use crate::metadata::Argument;
use crate::value::Value;

/// 已解析的拦截器数组，按调用点解析一次后在多次调用间共享
pub type InterceptorArray = Arc<[Arc<dyn Interceptor>]>;

static ZERO_INTERCEPTORS: Lazy<InterceptorArray> =
    Lazy::new(|| Arc::from(Vec::<Arc<dyn Interceptor>>::new()));

/// 共享的空拦截器数组
pub fn zero_interceptors() -> InterceptorArray {
    Arc::clone(&ZERO_INTERCEPTORS)
}

/// 参数值数组
///
/// 被整条拦截链共享：任何拦截器写入的值对后续拦截器和最终调用都可见
pub struct ParameterValues {
    slots: Box<[RwLock<Value>]>,
}

impl ParameterValues {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            slots: values.into_iter().map(RwLock::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.slots.get(index).map(|slot| slot.read().clone())
    }

    /// 覆盖指定位置的参数值，返回旧值
    pub fn set(&self, index: usize, value: Value) -> AopResult<Value> {
        let slot = self
            .slots
            .get(index)
            .ok_or(AopError::ParameterIndexOutOfBounds {
                index,
                len: self.slots.len(),
            })?;
        Ok(std::mem::replace(&mut *slot.write(), value))
    }

    /// 当前所有参数值（按位置）
    pub fn snapshot(&self) -> Vec<Value> {
        self.slots.iter().map(|slot| slot.read().clone()).collect()
    }
}

impl fmt::Debug for ParameterValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.snapshot()).finish()
    }
}

/// 绑定到参数槽位的形参
///
/// 读写的就是 [`ParameterValues`] 中对应下标的同一个槽位
#[derive(Clone)]
pub struct MutableArgumentValue {
    argument: Argument,
    index: usize,
    values: Arc<ParameterValues>,
}

impl MutableArgumentValue {
    pub fn argument(&self) -> &Argument {
        &self.argument
    }

    pub fn name(&self) -> &str {
        self.argument.name()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn value(&self) -> Value {
        self.values.get(self.index).unwrap_or_default()
    }

    pub fn set_value(&self, value: Value) -> AopResult<()> {
        self.values.set(self.index, value).map(|_| ())
    }
}

impl fmt::Debug for MutableArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableArgumentValue")
            .field("argument", &self.argument)
            .field("value", &self.value())
            .finish()
    }
}

/// 按声明顺序排列的形参名 -> 参数槽位视图
///
/// 包含全部声明的形参。参数值少于形参时，缺失的槽位读作 null，
/// 写入返回 [`AopError::ParameterIndexOutOfBounds`]
#[derive(Debug)]
pub struct ArgumentValues {
    entries: Vec<MutableArgumentValue>,
    positions: HashMap<String, usize>,
}

impl ArgumentValues {
    fn bind(arguments: &[Argument], values: &Arc<ParameterValues>) -> Self {
        if arguments.len() != values.len() {
            tracing::warn!(
                "{} declared argument(s) bound to {} parameter value(s)",
                arguments.len(),
                values.len()
            );
        }

        let entries: Vec<MutableArgumentValue> = arguments
            .iter()
            .enumerate()
            .map(|(index, argument)| MutableArgumentValue {
                argument: argument.clone(),
                index,
                values: Arc::clone(values),
            })
            .collect();
        let positions = entries
            .iter()
            .map(|entry| (entry.name().to_string(), entry.index))
            .collect();

        Self { entries, positions }
    }

    pub fn get(&self, name: &str) -> Option<&MutableArgumentValue> {
        self.positions.get(name).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MutableArgumentValue> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(MutableArgumentValue::name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 调用期间拦截器之间共享的属性
#[derive(Debug, Default)]
pub struct Attributes {
    values: RwLock<HashMap<String, Value>>,
}

impl Attributes {
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    pub fn put(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.write().insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.write().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

/// 所有拦截链变体共享的调用状态
pub struct InvocationContext {
    interceptors: InterceptorArray,
    values: Arc<ParameterValues>,
    /// 下一个要执行的拦截器，取值范围 [0, N]
    index: AtomicUsize,
    attributes: OnceCell<Attributes>,
    parameters: OnceCell<ArgumentValues>,
}

impl InvocationContext {
    pub(crate) fn new(interceptors: InterceptorArray, values: Vec<Value>) -> Self {
        Self {
            interceptors,
            values: Arc::new(ParameterValues::new(values)),
            index: AtomicUsize::new(0),
            attributes: OnceCell::new(),
            parameters: OnceCell::new(),
        }
    }

    pub fn interceptors(&self) -> &InterceptorArray {
        &self.interceptors
    }

    /// 共享的参数值数组（非副本）
    pub fn parameter_values(&self) -> &ParameterValues {
        &self.values
    }

    /// 属性表，首次访问时创建，并发首次访问也只会创建一次
    pub fn attributes(&self) -> &Attributes {
        self.attributes.get_or_init(Attributes::default)
    }

    /// 形参名到参数槽位的视图，只构建一次
    pub(crate) fn parameters(&self, arguments: &[Argument]) -> &ArgumentValues {
        self.parameters
            .get_or_init(|| ArgumentValues::bind(arguments, &self.values))
    }

    /// 当前游标
    pub fn index(&self) -> usize {
        self.index.load(Ordering::Acquire)
    }

    /// 取出游标处的拦截器并前移游标；已到末尾时返回 None
    pub(crate) fn advance(&self) -> Option<(usize, Arc<dyn Interceptor>)> {
        let position = self.index.load(Ordering::Acquire);
        let interceptor = self.interceptors.get(position)?;
        self.index.store(position + 1, Ordering::Release);
        Some((position, Arc::clone(interceptor)))
    }

    /// 按实例身份查找拦截器位置
    pub(crate) fn position_of(&self, from: &dyn Interceptor) -> AopResult<usize> {
        self.interceptors
            .iter()
            .position(|candidate| std::ptr::addr_eq(Arc::as_ptr(candidate), from))
            .ok_or_else(|| AopError::InterceptorNotInChain {
                interceptor: from.name().to_string(),
            })
    }

    pub(crate) fn reset_to(&self, position: usize) {
        self.index.store(position, Ordering::Release);
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("interceptors", &self.interceptors.len())
            .field("index", &self.index())
            .field("parameter_values", &self.values)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::InterceptorChain;

    struct Noop;

    impl Interceptor for Noop {
        fn intercept(&self, chain: &InterceptorChain) -> AopResult<Value> {
            chain.proceed()
        }
    }

    fn context(values: Vec<Value>) -> InvocationContext {
        InvocationContext::new(zero_interceptors(), values)
    }

    fn arguments() -> Vec<Argument> {
        vec![Argument::new("first", "String"), Argument::new("second", "i64")]
    }

    #[test]
    fn test_parameter_values_are_shared() {
        let ctx = context(vec![Value::of(String::from("a")), Value::of(1_i64)]);
        let parameters = ctx.parameters(&arguments());

        ctx.parameter_values().set(1, Value::of(2_i64)).unwrap();
        assert_eq!(parameters.get("second").unwrap().value().downcast_ref::<i64>(), Some(&2));

        parameters
            .get("first")
            .unwrap()
            .set_value(Value::of(String::from("b")))
            .unwrap();
        assert_eq!(
            ctx.parameter_values().get(0).unwrap().downcast_ref::<String>().map(String::as_str),
            Some("b")
        );
    }

    #[test]
    fn test_parameters_built_once_in_declaration_order() {
        let ctx = context(vec![Value::of(String::from("a")), Value::of(1_i64)]);
        let first = ctx.parameters(&arguments());
        let second = ctx.parameters(&[]);

        assert!(std::ptr::eq(first, second));
        assert_eq!(first.names().collect::<Vec<_>>(), vec!["first", "second"]);
    }

    #[test]
    fn test_parameters_keep_arguments_without_values() {
        let ctx = context(vec![Value::of(String::from("a"))]);
        let parameters = ctx.parameters(&arguments());

        assert_eq!(parameters.len(), 2);
        let second = parameters.get("second").unwrap();
        assert!(second.value().is_null());
        assert!(matches!(
            second.set_value(Value::of(1_i64)),
            Err(AopError::ParameterIndexOutOfBounds { index: 1, len: 1 })
        ));
        assert_eq!(ctx.parameter_values().len(), 1);
    }

    #[test]
    fn test_set_out_of_bounds() {
        let ctx = context(vec![Value::null()]);
        let err = ctx.parameter_values().set(3, Value::null()).unwrap_err();
        assert!(matches!(err, AopError::ParameterIndexOutOfBounds { index: 3, len: 1 }));
    }

    #[test]
    fn test_attributes_initialized_once_across_threads() {
        let ctx = context(Vec::new());
        let addresses: Vec<usize> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| ctx.attributes() as *const Attributes as usize))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(addresses.windows(2).all(|w| w[0] == w[1]));
        ctx.attributes().put("key", Value::of(1_i64));
        assert!(ctx.attributes().contains("key"));
    }

    #[test]
    fn test_position_of_uses_identity() {
        let first: Arc<dyn Interceptor> = Arc::new(Noop);
        let second: Arc<dyn Interceptor> = Arc::new(Noop);
        let stranger = Noop;
        let ctx = InvocationContext::new(
            Arc::from(vec![Arc::clone(&first), Arc::clone(&second)]),
            Vec::new(),
        );

        assert_eq!(ctx.position_of(second.as_ref()).unwrap(), 1);
        assert!(matches!(
            ctx.position_of(&stranger),
            Err(AopError::InterceptorNotInChain { .. })
        ));
    }

    #[test]
    fn test_advance_stops_at_end() {
        let ctx = InvocationContext::new(
            Arc::from(vec![Arc::new(Noop) as Arc<dyn Interceptor>]),
            Vec::new(),
        );
        assert_eq!(ctx.advance().map(|(i, _)| i), Some(0));
        assert!(ctx.advance().is_none());
        assert_eq!(ctx.index(), 1);
    }
}

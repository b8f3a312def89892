//! 类型擦除的调用值
//!
//! 目标对象、参数、属性和返回值都以 [`Value`] 在拦截链中传递

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 可为空、可廉价克隆的类型擦除值
#[derive(Clone, Default)]
pub struct Value(Option<Arc<dyn Any + Send + Sync>>);

impl Value {
    /// 包装一个具体值
    pub fn of<T: Any + Send + Sync>(value: T) -> Self {
        Self(Some(Arc::new(value)))
    }

    /// 包装一个已共享的值（保持同一实例）
    pub fn from_arc(value: Arc<dyn Any + Send + Sync>) -> Self {
        Self(Some(value))
    }

    /// 空值，相当于无返回值的方法结果
    pub const fn null() -> Self {
        Self(None)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// 尝试按具体类型借用
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_deref()?.downcast_ref::<T>()
    }

    /// 尝试取得具体类型的共享引用
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.0.clone()?.downcast::<T>().ok()
    }

    /// 是否与另一个值指向同一实例
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => f.write_str("Value(null)"),
            Some(_) => {
                if let Some(s) = self.downcast_ref::<String>() {
                    write!(f, "Value({:?})", s)
                } else if let Some(s) = self.downcast_ref::<&'static str>() {
                    write!(f, "Value({:?})", s)
                } else if let Some(i) = self.downcast_ref::<i64>() {
                    write!(f, "Value({})", i)
                } else {
                    f.write_str("Value(..)")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downcast() {
        let value = Value::of(String::from("Ada"));
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("Ada"));
        assert!(value.downcast_ref::<i64>().is_none());
        assert_eq!(value.downcast::<String>().as_deref().map(String::as_str), Some("Ada"));
    }

    #[test]
    fn test_null() {
        let value = Value::null();
        assert!(value.is_null());
        assert!(value.downcast_ref::<String>().is_none());
        assert_eq!(format!("{:?}", value), "Value(null)");
    }

    #[test]
    fn test_identity() {
        let value = Value::of(42_i64);
        let same = value.clone();
        let other = Value::of(42_i64);
        assert!(value.ptr_eq(&same));
        assert!(!value.ptr_eq(&other));
        assert!(Value::null().ptr_eq(&Value::null()));
    }
}

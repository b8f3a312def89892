//! 拦截器注册表
//!
//! 调用点生成代码的入口：按调用点元数据从候选池中解析出有序的拦截器数组。
//! 在纯解析算法之上负责环境占位符绑定、Adapter 引入合成，以及缺失引入拦截器时的快速失败。

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use chimera_core::prelude::{Environment, PropertyResolver};

use crate::adapter::{AdapterIntroduction, BeanLocator};
use crate::config::AopProperties;
use crate::context::{zero_interceptors, InterceptorArray};
use crate::error::{AopError, AopResult};
use crate::interceptor::{Interceptor, InterceptorKind, InterceptorRegistration};
use crate::metadata::{AnnotationMetadata, ADAPTER};
use crate::method::{BeanConstructor, ExecutableMethod};
use crate::resolution;

/// 拦截器解析入口
pub trait InterceptorRegistry: Send + Sync {
    /// 解析方法调用点上指定类型的拦截器
    fn resolve_interceptors(
        &self,
        method: &dyn ExecutableMethod,
        candidates: &[InterceptorRegistration],
        kind: InterceptorKind,
    ) -> AopResult<InterceptorArray>;

    /// 解析构造函数上的 AROUND_CONSTRUCT 拦截器
    fn resolve_constructor_interceptors(
        &self,
        constructor: &dyn BeanConstructor,
        candidates: &[InterceptorRegistration],
    ) -> AopResult<InterceptorArray>;

    fn resolve_around_interceptors(
        &self,
        method: &dyn ExecutableMethod,
        candidates: &[InterceptorRegistration],
    ) -> AopResult<InterceptorArray> {
        self.resolve_interceptors(method, candidates, InterceptorKind::Around)
    }

    /// 引入方法的完整拦截器数组：AROUND 在前，INTRODUCTION 在后
    fn resolve_introduction_interceptors(
        &self,
        method: &dyn ExecutableMethod,
        candidates: &[InterceptorRegistration],
    ) -> AopResult<InterceptorArray> {
        let around = self.resolve_interceptors(method, candidates, InterceptorKind::Around)?;
        let introduction =
            self.resolve_interceptors(method, candidates, InterceptorKind::Introduction)?;
        Ok(around.iter().chain(introduction.iter()).cloned().collect())
    }
}

/// 默认拦截器注册表
#[derive(Default)]
pub struct DefaultInterceptorRegistry {
    bean_locator: Option<Arc<dyn BeanLocator>>,
    property_resolver: Option<Arc<dyn PropertyResolver>>,
    properties: AopProperties,
}

impl DefaultInterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用 Environment 作为占位符解析器，并从中加载 AOP 配置
    pub fn from_environment(environment: Arc<Environment>) -> Self {
        let properties = AopProperties::from_environment(&environment);
        let resolver: Arc<dyn PropertyResolver> = environment;
        Self {
            bean_locator: None,
            property_resolver: Some(resolver),
            properties,
        }
    }

    /// 设置 Adapter 引入使用的 bean 查找器
    pub fn with_bean_locator(mut self, locator: Arc<dyn BeanLocator>) -> Self {
        self.bean_locator = Some(locator);
        self
    }

    pub fn with_property_resolver(mut self, resolver: Arc<dyn PropertyResolver>) -> Self {
        self.property_resolver = Some(resolver);
        self
    }

    pub fn with_properties(mut self, properties: AopProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn properties(&self) -> &AopProperties {
        &self.properties
    }

    /// 匹配前先按环境解析元数据中的占位符
    fn bind_environment<'a>(
        &self,
        metadata: &'a AnnotationMetadata,
    ) -> AopResult<Cow<'a, AnnotationMetadata>> {
        match &self.property_resolver {
            Some(resolver)
                if self.properties.bind_environment && metadata.has_property_expressions() =>
            {
                Ok(Cow::Owned(metadata.bind_environment(resolver.as_ref())?))
            }
            _ => Ok(Cow::Borrowed(metadata)),
        }
    }

    fn adapter_introduction(
        &self,
        method: &dyn ExecutableMethod,
        metadata: &AnnotationMetadata,
    ) -> AopResult<InterceptorArray> {
        let locator = self.bean_locator.as_ref().ok_or_else(|| AopError::InvalidAdapter {
            method: method.signature(),
            reason: "no bean locator is available to resolve the adapted method".to_string(),
        })?;
        let adapter = AdapterIntroduction::with_metadata(locator.as_ref(), method, metadata)?;
        tracing::debug!("Synthesized adapter introduction for {}", method.signature());
        Ok(Arc::from(vec![Arc::new(adapter) as Arc<dyn Interceptor>]))
    }
}

fn into_array(resolved: Vec<Arc<dyn Interceptor>>) -> InterceptorArray {
    if resolved.is_empty() {
        zero_interceptors()
    } else {
        Arc::from(resolved)
    }
}

impl InterceptorRegistry for DefaultInterceptorRegistry {
    fn resolve_interceptors(
        &self,
        method: &dyn ExecutableMethod,
        candidates: &[InterceptorRegistration],
        kind: InterceptorKind,
    ) -> AopResult<InterceptorArray> {
        let metadata = self.bind_environment(method.annotation_metadata())?;
        let resolved = resolution::resolve_method_interceptors(
            &metadata,
            candidates,
            kind,
            self.properties.default_order,
        );

        tracing::debug!(
            "Resolved {} {} interceptors out of a possible {} for {}",
            resolved.len(),
            kind,
            candidates.len(),
            method.signature()
        );

        if kind == InterceptorKind::Introduction && resolved.is_empty() {
            if metadata.has_stereotype(ADAPTER) {
                return self.adapter_introduction(method, &metadata);
            }
            tracing::error!(
                "At least one introduction method interceptor required, but missing for method: {}",
                method.signature()
            );
            return Err(AopError::MissingIntroductionInterceptor {
                method: method.signature(),
            });
        }

        Ok(into_array(resolved))
    }

    fn resolve_constructor_interceptors(
        &self,
        constructor: &dyn BeanConstructor,
        candidates: &[InterceptorRegistration],
    ) -> AopResult<InterceptorArray> {
        let metadata = self.bind_environment(constructor.annotation_metadata())?;
        let resolved = resolution::resolve_constructor_interceptors(
            &metadata,
            candidates,
            self.properties.default_order,
        );

        tracing::debug!(
            "Resolved {} {} interceptors out of a possible {} for {}",
            resolved.len(),
            InterceptorKind::AroundConstruct,
            candidates.len(),
            constructor.declaring_type()
        );

        Ok(into_array(resolved))
    }
}

impl fmt::Debug for DefaultInterceptorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultInterceptorRegistry")
            .field("bean_locator", &self.bean_locator.is_some())
            .field("property_resolver", &self.property_resolver.is_some())
            .field("properties", &self.properties)
            .finish()
    }
}

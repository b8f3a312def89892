//! 拦截器解析
//!
//! 从候选池中选出适用于某个调用点的拦截器并排序。这里只做纯计算：
//! 不处理环境绑定，也不合成 Adapter 引入，这些由注册表负责。

use std::sync::Arc;

use crate::interceptor::{Interceptor, InterceptorKind, InterceptorRegistration};
use crate::metadata::{AnnotationMetadata, InterceptorBinding};

/// 候选是否被调用点的任意一个绑定选中
///
/// 按类型（候选是绑定声明的具体类型）或按注解（候选自身声明了同名同类型绑定）
pub fn is_applicable(candidate: &InterceptorRegistration, bindings: &[&InterceptorBinding]) -> bool {
    bindings.iter().any(|binding| candidate.matches(binding))
}

/// 解析方法调用点上指定类型的拦截器
///
/// 只考虑具备方法拦截能力的候选；按顺序值升序（稳定排序，同序保持候选池顺序）
pub fn resolve_method_interceptors(
    metadata: &AnnotationMetadata,
    candidates: &[InterceptorRegistration],
    kind: InterceptorKind,
    default_order: i32,
) -> Vec<Arc<dyn Interceptor>> {
    if kind.is_constructor_kind() {
        return resolve_constructor_interceptors(metadata, candidates, default_order);
    }

    resolve(metadata, candidates, kind, default_order, |candidate| {
        candidate.interceptor().is_method_interceptor()
    })
}

/// 解析构造函数上的 AROUND_CONSTRUCT 拦截器
pub fn resolve_constructor_interceptors(
    metadata: &AnnotationMetadata,
    candidates: &[InterceptorRegistration],
    default_order: i32,
) -> Vec<Arc<dyn Interceptor>> {
    resolve(
        metadata,
        candidates,
        InterceptorKind::AroundConstruct,
        default_order,
        |candidate| candidate.interceptor().is_constructor_interceptor(),
    )
}

fn resolve<F>(
    metadata: &AnnotationMetadata,
    candidates: &[InterceptorRegistration],
    kind: InterceptorKind,
    default_order: i32,
    capable: F,
) -> Vec<Arc<dyn Interceptor>>
where
    F: Fn(&InterceptorRegistration) -> bool,
{
    let bindings: Vec<&InterceptorBinding> = metadata.bindings_for(kind).collect();
    if bindings.is_empty() || candidates.is_empty() {
        return Vec::new();
    }

    let mut applicable: Vec<&InterceptorRegistration> = candidates
        .iter()
        .filter(|&candidate| capable(candidate) && is_applicable(candidate, &bindings))
        .collect();
    applicable.sort_by_key(|candidate| candidate.effective_order(default_order));

    applicable
        .into_iter()
        .map(|candidate| Arc::clone(candidate.interceptor()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::InterceptorChain;
    use crate::error::AopResult;
    use crate::value::Value;

    struct Named(&'static str);

    impl Interceptor for Named {
        fn intercept(&self, chain: &InterceptorChain) -> AopResult<Value> {
            chain.proceed()
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    struct ConstructorOnly;

    impl Interceptor for ConstructorOnly {
        fn intercept(&self, chain: &InterceptorChain) -> AopResult<Value> {
            chain.proceed()
        }

        fn is_method_interceptor(&self) -> bool {
            false
        }

        fn is_constructor_interceptor(&self) -> bool {
            true
        }
    }

    struct Both;

    impl Interceptor for Both {
        fn intercept(&self, chain: &InterceptorChain) -> AopResult<Value> {
            chain.proceed()
        }

        fn is_constructor_interceptor(&self) -> bool {
            true
        }
    }

    fn names(resolved: &[Arc<dyn Interceptor>]) -> Vec<String> {
        resolved.iter().map(|i| i.name().to_string()).collect()
    }

    #[test]
    fn test_sorted_by_order() {
        let candidates = vec![
            InterceptorRegistration::new(Named("uppercase"))
                .with_binding(InterceptorBinding::annotation("Uppercase"))
                .with_order(10),
            InterceptorRegistration::new(Named("logging"))
                .with_binding(InterceptorBinding::annotation("Logged"))
                .with_order(0),
            InterceptorRegistration::new(Named("unbound"))
                .with_binding(InterceptorBinding::annotation("Other")),
        ];
        let metadata = AnnotationMetadata::new()
            .with_binding(InterceptorBinding::annotation("Uppercase"))
            .with_binding(InterceptorBinding::annotation("Logged"));

        let resolved =
            resolve_method_interceptors(&metadata, &candidates, InterceptorKind::Around, 0);
        assert_eq!(names(&resolved), vec!["logging", "uppercase"]);
    }

    #[test]
    fn test_default_order_keeps_pool_order_for_ties() {
        let candidates = vec![
            InterceptorRegistration::new(Named("first"))
                .with_binding(InterceptorBinding::annotation("Traced")),
            InterceptorRegistration::new(Named("early"))
                .with_binding(InterceptorBinding::annotation("Traced"))
                .with_order(-5),
            InterceptorRegistration::new(Named("second"))
                .with_binding(InterceptorBinding::annotation("Traced")),
        ];
        let metadata =
            AnnotationMetadata::new().with_binding(InterceptorBinding::annotation("Traced"));

        let resolved =
            resolve_method_interceptors(&metadata, &candidates, InterceptorKind::Around, 0);
        assert_eq!(names(&resolved), vec!["early", "first", "second"]);
    }

    #[test]
    fn test_match_by_type_binding() {
        let candidates = vec![
            InterceptorRegistration::new(Named("typed")),
            InterceptorRegistration::new(Both),
        ];
        let metadata = AnnotationMetadata::new().with_binding(InterceptorBinding::of_type::<Named>());

        let resolved =
            resolve_method_interceptors(&metadata, &candidates, InterceptorKind::Around, 0);
        assert_eq!(names(&resolved), vec!["typed"]);
    }

    #[test]
    fn test_kind_filtering() {
        let candidates = vec![InterceptorRegistration::new(Named("destroy")).with_binding(
            InterceptorBinding::annotation("Audited").with_kind(InterceptorKind::PreDestroy),
        )];
        let metadata = AnnotationMetadata::new()
            .with_binding(InterceptorBinding::annotation("Audited"))
            .with_binding(
                InterceptorBinding::annotation("Audited").with_kind(InterceptorKind::PreDestroy),
            );

        let around =
            resolve_method_interceptors(&metadata, &candidates, InterceptorKind::Around, 0);
        assert!(around.is_empty());

        let destroy =
            resolve_method_interceptors(&metadata, &candidates, InterceptorKind::PreDestroy, 0);
        assert_eq!(names(&destroy), vec!["destroy"]);
    }

    #[test]
    fn test_capability_filtering() {
        let binding = |kind| InterceptorBinding::annotation("Managed").with_kind(kind);
        let candidates = vec![
            InterceptorRegistration::new(ConstructorOnly)
                .with_binding(binding(InterceptorKind::Around))
                .with_binding(binding(InterceptorKind::AroundConstruct)),
            InterceptorRegistration::new(Both)
                .with_binding(binding(InterceptorKind::Around))
                .with_binding(binding(InterceptorKind::AroundConstruct)),
            InterceptorRegistration::new(Named("method"))
                .with_binding(binding(InterceptorKind::Around))
                .with_binding(binding(InterceptorKind::AroundConstruct)),
        ];
        let metadata = AnnotationMetadata::new()
            .with_binding(binding(InterceptorKind::Around))
            .with_binding(binding(InterceptorKind::AroundConstruct));

        let methods =
            resolve_method_interceptors(&metadata, &candidates, InterceptorKind::Around, 0);
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[1].name(), "method");

        let constructors = resolve_constructor_interceptors(&metadata, &candidates, 0);
        assert_eq!(constructors.len(), 2);
        assert!(constructors.iter().all(|i| i.name() != "method"));
    }

    #[test]
    fn test_no_bindings_resolves_to_none() {
        let candidates = vec![InterceptorRegistration::new(Named("logging"))
            .with_binding(InterceptorBinding::annotation("Logged"))];
        let resolved = resolve_method_interceptors(
            &AnnotationMetadata::new(),
            &candidates,
            InterceptorKind::Around,
            0,
        );
        assert!(resolved.is_empty());
    }
}

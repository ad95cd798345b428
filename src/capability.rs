//! One-time capability binding and the adapter factory.

use log::{debug, error};
use once_cell::sync::OnceCell;

use crate::adapter::StreamAdapter;
use crate::boundary::{DEFAULT_SOURCE_TYPE, ForeignSource, MethodId, Operation, TypeResolver};
use crate::error::{AdapterError, BindError};
use crate::rewind::RewindableStream;

/// Relay buffer capacity used when none is configured.
pub const DEFAULT_RELAY_CAPACITY: usize = 1024;

/// The operations bound on a declared source type.
///
/// `read` is always present; the optional operations are `None` when the
/// declared type does not provide them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitySet {
    type_name: String,
    read: MethodId,
    skip: Option<MethodId>,
    reset: Option<MethodId>,
    mark: Option<MethodId>,
    mark_supported: Option<MethodId>,
}

impl CapabilitySet {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn read(&self) -> MethodId {
        self.read
    }

    pub fn skip(&self) -> Option<MethodId> {
        self.skip
    }

    pub fn reset(&self) -> Option<MethodId> {
        self.reset
    }

    pub fn mark(&self) -> Option<MethodId> {
        self.mark
    }

    pub fn mark_supported(&self) -> Option<MethodId> {
        self.mark_supported
    }

    pub fn supports(&self, operation: Operation) -> bool {
        match operation {
            Operation::Read => true,
            Operation::Skip => self.skip.is_some(),
            Operation::Reset => self.reset.is_some(),
            Operation::Mark => self.mark.is_some(),
            Operation::MarkSupported => self.mark_supported.is_some(),
        }
    }
}

/// Resolves the operations of `type_name` through `resolver`.
///
/// Fails if the type is unknown or `read` cannot be resolved. Missing
/// optional operations are recorded, not treated as errors.
pub fn bind_capabilities<R>(resolver: &R, type_name: &str) -> Result<CapabilitySet, BindError>
where
    R: TypeResolver + ?Sized,
{
    let ty = resolver
        .resolve_type(type_name)
        .ok_or_else(|| BindError::TypeNotFound(type_name.to_string()))?;

    let lookup = |op: Operation| resolver.resolve_method(&ty, op.name(), op.signature());

    let read = lookup(Operation::Read).ok_or_else(|| BindError::MethodNotFound {
        type_name: type_name.to_string(),
        method: Operation::Read.name(),
        signature: Operation::Read.signature(),
    })?;

    Ok(CapabilitySet {
        type_name: type_name.to_string(),
        read,
        skip: lookup(Operation::Skip),
        reset: lookup(Operation::Reset),
        mark: lookup(Operation::Mark),
        mark_supported: lookup(Operation::MarkSupported),
    })
}

/// Settings for adapters built by an [`AdapterFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Capacity of each adapter's relay buffer.
    pub relay_capacity: usize,
    /// Declared type the source handles are bound against.
    pub source_type: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            relay_capacity: DEFAULT_RELAY_CAPACITY,
            source_type: DEFAULT_SOURCE_TYPE.to_string(),
        }
    }
}

/// Binds capabilities once and builds adapters around source handles.
///
/// The binding result, success or failure, is cached on first use. Every
/// adapter built by the factory borrows the same [`CapabilitySet`].
pub struct AdapterFactory<R: TypeResolver> {
    resolver: R,
    config: AdapterConfig,
    bindings: OnceCell<Result<CapabilitySet, BindError>>,
}

impl<R: TypeResolver> AdapterFactory<R> {
    pub fn new(resolver: R) -> Self {
        Self::with_config(resolver, AdapterConfig::default())
    }

    pub fn with_config(resolver: R, config: AdapterConfig) -> Self {
        Self {
            resolver,
            config,
            bindings: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Returns the bound capabilities, binding them on first use.
    pub fn capabilities(&self) -> Result<&CapabilitySet, BindError> {
        self.bindings
            .get_or_init(|| {
                let result = bind_capabilities(&self.resolver, &self.config.source_type);
                match &result {
                    Ok(caps) => debug!(
                        "bound {}: skip={} reset={} mark={} markSupported={}",
                        caps.type_name(),
                        caps.skip.is_some(),
                        caps.reset.is_some(),
                        caps.mark.is_some(),
                        caps.mark_supported.is_some()
                    ),
                    Err(e) => error!("capability binding failed: {}", e),
                }
                result
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Builds an adapter with the configured relay capacity.
    pub fn create<S: ForeignSource>(&self, source: S) -> Result<StreamAdapter<'_, S>, AdapterError> {
        self.create_with_capacity(source, self.config.relay_capacity)
    }

    pub fn create_with_capacity<S: ForeignSource>(
        &self,
        source: S,
        capacity: usize,
    ) -> Result<StreamAdapter<'_, S>, AdapterError> {
        let caps = self.capabilities()?;
        StreamAdapter::new(source, caps, capacity)
    }

    /// Builds an adapter that can also be rewound.
    ///
    /// Fails with [`AdapterError::RewindUnsupported`] when the declared type
    /// has no reset operation.
    pub fn create_rewindable<S: ForeignSource>(
        &self,
        source: S,
    ) -> Result<RewindableStream<'_, S>, AdapterError> {
        let adapter = self.create(source)?;
        RewindableStream::new(adapter).map_err(|_| AdapterError::RewindUnsupported)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::boundary::TypeRef;

    /// Declares a fixed set of operations and counts lookups.
    struct CountingResolver {
        declared: Vec<Operation>,
        known_type: bool,
        type_lookups: AtomicUsize,
    }

    impl CountingResolver {
        fn new(declared: &[Operation]) -> Self {
            Self {
                declared: declared.to_vec(),
                known_type: true,
                type_lookups: AtomicUsize::new(0),
            }
        }
    }

    impl TypeResolver for CountingResolver {
        fn resolve_type(&self, name: &str) -> Option<TypeRef> {
            self.type_lookups.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            self.known_type.then(|| TypeRef::new(name, 7))
        }

        fn resolve_method(&self, ty: &TypeRef, name: &str, signature: &str) -> Option<MethodId> {
            assert_eq!(ty.slot(), 7);
            self.declared
                .iter()
                .position(|op| op.name() == name && op.signature() == signature)
                .map(|i| MethodId::new(self.declared[i], i as u32))
        }
    }

    #[test]
    fn binds_all_declared_operations() {
        let resolver = CountingResolver::new(&Operation::ALL);
        let caps = bind_capabilities(&resolver, DEFAULT_SOURCE_TYPE).unwrap();
        for op in Operation::ALL {
            assert!(caps.supports(op), "{op} should be bound");
        }
        assert_eq!(caps.read().operation(), Operation::Read);
        assert_eq!(caps.type_name(), DEFAULT_SOURCE_TYPE);
    }

    #[test]
    fn optional_operations_may_be_missing() {
        let resolver = CountingResolver::new(&[Operation::Read, Operation::Reset]);
        let caps = bind_capabilities(&resolver, DEFAULT_SOURCE_TYPE).unwrap();
        assert!(caps.skip().is_none());
        assert!(caps.mark().is_none());
        assert!(caps.mark_supported().is_none());
        assert_eq!(caps.reset().map(MethodId::operation), Some(Operation::Reset));
    }

    #[test]
    fn missing_read_fails_binding() {
        let resolver = CountingResolver::new(&[Operation::Skip, Operation::Reset]);
        let err = bind_capabilities(&resolver, DEFAULT_SOURCE_TYPE).unwrap_err();
        assert!(matches!(err, BindError::MethodNotFound { method: "read", .. }));
    }

    #[test]
    fn unknown_type_fails_binding() {
        let mut resolver = CountingResolver::new(&Operation::ALL);
        resolver.known_type = false;
        let err = bind_capabilities(&resolver, "x/Missing").unwrap_err();
        assert_eq!(err, BindError::TypeNotFound("x/Missing".to_string()));
    }

    #[test]
    fn factory_binds_once() {
        let factory = AdapterFactory::new(CountingResolver::new(&Operation::ALL));
        let first = factory.capabilities().unwrap().clone();
        let second = factory.capabilities().unwrap();
        assert_eq!(&first, second);
        assert_eq!(factory.resolver.type_lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn factory_failure_is_permanent() {
        let factory = AdapterFactory::new(CountingResolver::new(&[Operation::Skip]));
        assert!(factory.capabilities().is_err());
        assert!(factory.capabilities().is_err());
        assert_eq!(factory.resolver.type_lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_first_use_binds_once() {
        let factory = AdapterFactory::new(CountingResolver::new(&Operation::ALL));
        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let caps = factory.capabilities().unwrap();
                    assert!(caps.supports(Operation::Reset));
                });
            }
        });
        assert_eq!(factory.resolver.type_lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_config() {
        let config = AdapterConfig::default();
        assert_eq!(config.relay_capacity, DEFAULT_RELAY_CAPACITY);
        assert_eq!(config.source_type, DEFAULT_SOURCE_TYPE);
    }
}

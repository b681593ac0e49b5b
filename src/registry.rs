//! Element Type Registry
//!
//! Two tables are involved in resolving a stored type key:
//!
//! - [`ElementTypeRegistry`] maps a type key (`"text"`) to an implementation
//!   identifier (`"certforge::elements::text"`).
//! - [`ImplementationCatalog`] maps implementation identifiers to
//!   descriptors carrying the constructor and version requirements.
//!
//! [`RegistryBootstrap`] fills a registry with the built-in keys and then
//! asks an injected [`DiscoveryProvider`] for third-party candidates. What a
//! provider yields is memoized per provider identity for the lifetime of the
//! bootstrap value.

use semver::{Version, VersionReq};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::element::Element;
use crate::elements::builtin_descriptors;
use crate::error::{CoreError, CoreResult, ElementError};
use crate::legacy::LegacyElement;
use crate::model::ElementRecord;

pub type ImplementationId = String;

pub type RecordConstructor = fn(ElementRecord) -> Result<Box<dyn Element>, ElementError>;
pub type LegacyConstructor = fn(ElementRecord) -> Result<Box<dyn LegacyElement>, ElementError>;

#[derive(Debug, Clone, Copy)]
pub enum Constructor {
    /// Current contract, built straight from a stored row.
    FromRecord(RecordConstructor),
    /// Old contract; the factory wraps the result in a legacy adapter.
    Legacy(LegacyConstructor),
}

#[derive(Debug, Clone)]
pub struct ImplementationDescriptor {
    pub id: ImplementationId,
    pub version: Version,
    /// Core versions this implementation works with.
    pub supports: VersionReq,
    pub constructor: Constructor,
}

impl ImplementationDescriptor {
    pub fn from_record(
        id: impl Into<ImplementationId>,
        version: Version,
        constructor: RecordConstructor,
    ) -> Self {
        Self {
            id: id.into(),
            version,
            supports: VersionReq::STAR,
            constructor: Constructor::FromRecord(constructor),
        }
    }

    pub fn legacy(
        id: impl Into<ImplementationId>,
        version: Version,
        constructor: LegacyConstructor,
    ) -> Self {
        Self {
            id: id.into(),
            version,
            supports: VersionReq::STAR,
            constructor: Constructor::Legacy(constructor),
        }
    }

    pub fn supporting(mut self, supports: VersionReq) -> Self {
        self.supports = supports;
        self
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No implementation registered as {0}")]
    Missing(ImplementationId),

    #[error("{id} {version} requires core {supports}, running {core}")]
    Incompatible {
        id: ImplementationId,
        version: Version,
        supports: VersionReq,
        core: Version,
    },
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Discovery provider {provider} failed: {reason}")]
    Failed { provider: String, reason: String },
}

/// Every implementation the host has loaded, built-in or not.
#[derive(Debug, Clone)]
pub struct ImplementationCatalog {
    entries: HashMap<ImplementationId, ImplementationDescriptor>,
    core_version: Version,
}

impl ImplementationCatalog {
    pub fn new(core_version: Version) -> Self {
        Self {
            entries: HashMap::new(),
            core_version,
        }
    }

    pub fn with_builtins() -> Self {
        let mut catalog = Self::new(crate::core_version());
        for (_, descriptor) in builtin_descriptors() {
            catalog.register(descriptor);
        }
        catalog
    }

    pub fn register(&mut self, descriptor: ImplementationDescriptor) {
        self.entries.insert(descriptor.id.clone(), descriptor);
    }

    pub fn core_version(&self) -> &Version {
        &self.core_version
    }

    /// A descriptor is resolvable when present and compatible with this core.
    pub fn resolve(&self, id: &str) -> Result<&ImplementationDescriptor, ResolveError> {
        let descriptor = self
            .entries
            .get(id)
            .ok_or_else(|| ResolveError::Missing(id.to_string()))?;
        if !descriptor.supports.matches(&self.core_version) {
            return Err(ResolveError::Incompatible {
                id: descriptor.id.clone(),
                version: descriptor.version.clone(),
                supports: descriptor.supports.clone(),
                core: self.core_version.clone(),
            });
        }
        Ok(descriptor)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ElementTypeRegistry {
    entries: BTreeMap<String, ImplementationId>,
}

impl ElementTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last registration for a key wins.
    pub fn register(
        &mut self,
        key: impl Into<String>,
        implementation: impl Into<ImplementationId>,
    ) {
        self.entries.insert(key.into(), implementation.into());
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> CoreResult<&ImplementationId> {
        self.entries
            .get(key)
            .ok_or_else(|| CoreError::not_found("element type", key))
    }

    pub fn all(&self) -> &BTreeMap<String, ImplementationId> {
        &self.entries
    }
}

/// Source of third-party element type names.
pub trait DiscoveryProvider: Send + Sync {
    /// Stable name used to memoize this provider's results.
    fn identity(&self) -> &str;
    fn list_candidate_types(&self) -> Result<BTreeSet<String>, DiscoveryError>;
}

/// Provider backed by a fixed list of type names.
#[derive(Debug, Clone)]
pub struct StaticDiscovery {
    identity: String,
    names: BTreeSet<String>,
}

impl StaticDiscovery {
    pub fn new<I, S>(identity: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identity: identity.into(),
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl DiscoveryProvider for StaticDiscovery {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn list_candidate_types(&self) -> Result<BTreeSet<String>, DiscoveryError> {
        Ok(self.names.clone())
    }
}

/// Conventional identifier of the implementation behind a discovered key.
pub fn third_party_implementation_id(key: &str) -> ImplementationId {
    format!("certforge_element_{key}::element")
}

pub fn is_valid_type_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

type Discovered = Vec<(String, ImplementationId)>;

/// Builds registries and owns the discovery memo.
#[derive(Debug, Default)]
pub struct RegistryBootstrap {
    discovered: Mutex<HashMap<String, Discovered>>,
}

impl RegistryBootstrap {
    pub fn new() -> Self {
        Self::default()
    }

    fn memo(&self) -> MutexGuard<'_, HashMap<String, Discovered>> {
        self.discovered.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn build(
        &self,
        catalog: &ImplementationCatalog,
        provider: Option<&dyn DiscoveryProvider>,
        diagnostics: &Diagnostics,
    ) -> ElementTypeRegistry {
        let mut registry = ElementTypeRegistry::new();
        for (key, descriptor) in builtin_descriptors() {
            registry.register(key, descriptor.id);
        }

        if let Some(provider) = provider {
            for (key, implementation) in self.discover(&registry, catalog, provider, diagnostics) {
                registry.register(key, implementation);
            }
        }
        registry
    }

    /// Forget memoized discovery results.
    pub fn reset(&self) {
        self.memo().clear();
    }

    fn discover(
        &self,
        builtins: &ElementTypeRegistry,
        catalog: &ImplementationCatalog,
        provider: &dyn DiscoveryProvider,
        diagnostics: &Diagnostics,
    ) -> Discovered {
        let identity = provider.identity().to_string();
        if let Some(found) = self.memo().get(&identity) {
            return found.clone();
        }

        // Two threads may both get here on first use; registering twice is harmless.
        let found = Self::run_discovery(builtins, catalog, provider, diagnostics);
        self.memo().insert(identity, found.clone());
        found
    }

    fn run_discovery(
        builtins: &ElementTypeRegistry,
        catalog: &ImplementationCatalog,
        provider: &dyn DiscoveryProvider,
        diagnostics: &Diagnostics,
    ) -> Discovered {
        let candidates = match provider.list_candidate_types() {
            Ok(candidates) => candidates,
            Err(e) => {
                diagnostics.emit(Diagnostic::new(
                    DiagnosticKind::Discovery,
                    provider.identity(),
                    format!("{e}; continuing with built-in element types only"),
                ));
                return Vec::new();
            }
        };

        let mut found = Vec::new();
        for key in candidates {
            if builtins.has(&key) {
                tracing::debug!(key = %key, "discovered type shadows a built-in; skipping");
                continue;
            }
            if !is_valid_type_key(&key) {
                diagnostics.emit(Diagnostic::new(
                    DiagnosticKind::Discovery,
                    key.as_str(),
                    format!("'{key}' is not a valid element type key"),
                ));
                continue;
            }
            let implementation = third_party_implementation_id(&key);
            match catalog.resolve(&implementation) {
                Ok(_) => found.push((key, implementation)),
                Err(e) => diagnostics.emit(Diagnostic::new(
                    DiagnosticKind::Discovery,
                    key.as_str(),
                    format!("cannot register element type '{key}': {e}"),
                )),
            }
        }
        tracing::debug!(
            provider = provider.identity(),
            count = found.len(),
            "element type discovery finished"
        );
        found
    }
}

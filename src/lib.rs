//! CertForge Core - Certificate Layout Engine
//!
//! # Ground Rules
//! 1. Stored `data` is a JSON object or nothing
//! 2. Element types evolve independently of stored rows
//! 3. An unknown type never breaks a page
//! 4. Sequences are 1..N within every parent
//! 5. Template-wide changes are all or nothing

pub mod config;
pub mod diagnostics;
pub mod element;
pub mod elements;
pub mod envelope;
pub mod error;
pub mod factory;
pub mod hashing;
pub mod legacy;
pub mod migration;
pub mod model;
pub mod persistence;
pub mod registry;
pub mod render;
pub mod repository;
pub mod service;
pub mod storage;
pub mod validation;

pub use config::{CoreConfig, UnknownTypePolicy};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use element::{Element, FormInput, FormNormalizer, RestoreContext};
pub use envelope::Envelope;
pub use error::{CoreError, CoreResult, ElementError};
pub use factory::ElementFactory;
pub use hashing::{canonical_json, layout_fingerprint};
pub use legacy::{LegacyAdapter, LegacyElement};
pub use migration::{migrate, migrate_border, migrate_record, RecordMigration};
pub use model::{ElementRecord, PageRecord, PageSpec, TemplateContext, TemplateRecord};
pub use persistence::to_json_data;
pub use registry::{
    DiscoveryProvider, ElementTypeRegistry, ImplementationCatalog, ImplementationDescriptor,
    RegistryBootstrap, StaticDiscovery,
};
pub use render::{render_html, render_pdf, DocumentContext, RenderCapability};
pub use repository::Direction;
pub use service::{EventSink, MigrationReport, TemplateEvent, TemplateService};
pub use storage::{MemoryStore, Store, StorageError};
pub use validation::{ValidationResult, ValidationRule, ValidationViolation, ViolationSeverity};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version element implementations are checked against.
pub fn core_version() -> semver::Version {
    semver::Version::parse(ENGINE_VERSION).unwrap_or_else(|_| semver::Version::new(0, 0, 0))
}

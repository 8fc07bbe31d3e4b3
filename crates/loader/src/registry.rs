//! File loader/exporter registry and the loader context.
//!
//! Import and export components are external. They are registered here by
//! file extension and looked up by [`TableDataLoader`](crate::loader::TableDataLoader)
//! when a file is imported or exported.

use anyhow::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::config::LoaderConfig;
use crate::params::ParamBag;
use crate::request::RequestDescriptor;
use crate::response::ImportResult;

// ---------------------------------------------------------------------------
// Component traits
// ---------------------------------------------------------------------------

/// Uploaded file handed to a [`FileLoader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Original file name, including its extension.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Normalised extension of the file name.
    pub fn extension(&self) -> String {
        normalize_extension(extension_of(&self.file_name))
    }
}

/// Imports one file into storage.
pub trait FileLoader: Send + Sync {
    /// Import `file` on behalf of `user_id`.
    fn import_file(
        &self,
        file: &InputFile,
        entity: Option<&str>,
        user_id: Option<i64>,
        params: &ParamBag,
    ) -> Result<ImportResult>;
}

/// Serialises rows into a downloadable file.
pub trait FileExporter: Send + Sync {
    /// Produce the file body for `rows`.
    fn export(&self, rows: &[Value]) -> Result<Vec<u8>>;

    /// Name the produced file will be served under.
    fn full_file_name(&self, file_name: &str) -> String {
        file_name.to_string()
    }
}

/// Pre-fills every new request descriptor, e.g. with the caller's identity.
pub trait ParamProvider: Send + Sync {
    fn fill(&self, request: &mut RequestDescriptor);
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// Kind of a registered component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Loader,
    Exporter,
}

/// A registrable component.
#[derive(Clone)]
pub enum Component {
    Loader(Arc<dyn FileLoader>),
    Exporter(Arc<dyn FileExporter>),
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Loader(_) => ComponentKind::Loader,
            Component::Exporter(_) => ComponentKind::Exporter,
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component::{:?}", self.kind())
    }
}

/// A component plus the file extensions it handles.
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    pub extensions: Vec<String>,
    pub component: Component,
}

impl ComponentDescriptor {
    pub fn loader<E: Into<String>>(
        extensions: impl IntoIterator<Item = E>,
        loader: Arc<dyn FileLoader>,
    ) -> Self {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
            component: Component::Loader(loader),
        }
    }

    pub fn exporter<E: Into<String>>(
        extensions: impl IntoIterator<Item = E>,
        exporter: Arc<dyn FileExporter>,
    ) -> Self {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
            component: Component::Exporter(exporter),
        }
    }

    pub fn kind(&self) -> ComponentKind {
        self.component.kind()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Lowercase an extension and strip dots (`".CSV"` becomes `"csv"`).
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().replace('.', "").to_lowercase()
}

/// Text after the last dot of `file_name`, or `""`.
pub fn extension_of(file_name: &str) -> &str {
    file_name
        .rfind('.')
        .map(|i| &file_name[i + 1..])
        .unwrap_or("")
}

#[derive(Default)]
struct Components {
    loaders: HashMap<String, Arc<dyn FileLoader>>,
    exporters: HashMap<String, Arc<dyn FileExporter>>,
}

impl Components {
    fn register(&mut self, descriptor: ComponentDescriptor, warnings: &mut Vec<String>) {
        for raw in &descriptor.extensions {
            let ext = normalize_extension(raw);
            if ext.is_empty() {
                warnings.push(format!(
                    "{:?} descriptor has an empty extension '{}'",
                    descriptor.kind(),
                    raw
                ));
                continue;
            }
            let replaced = match &descriptor.component {
                Component::Loader(loader) => {
                    self.loaders.insert(ext.clone(), loader.clone()).is_some()
                }
                Component::Exporter(exporter) => {
                    self.exporters.insert(ext.clone(), exporter.clone()).is_some()
                }
            };
            if replaced {
                warnings.push(format!(
                    "{:?} for extension '{}' overwrites existing registration",
                    descriptor.kind(),
                    ext
                ));
            }
        }
    }
}

/// Registry of loaders and exporters keyed by normalised extension.
///
/// Registration is rare and lookups frequent, so both maps sit behind one
/// coarse read-write lock.
#[derive(Default)]
pub struct LoaderRegistry {
    inner: RwLock<Components>,
}

impl fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("loaders", &self.loader_extensions())
            .field("exporters", &self.exporter_extensions())
            .finish()
    }
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry populated from `descriptors`.
    pub fn with_descriptors(descriptors: impl IntoIterator<Item = ComponentDescriptor>) -> Self {
        let registry = Self::new();
        registry.refresh(descriptors);
        registry
    }

    pub fn register_loader(&self, extension: &str, loader: Arc<dyn FileLoader>) {
        self.register(ComponentDescriptor::loader([extension], loader));
    }

    pub fn register_exporter(&self, extension: &str, exporter: Arc<dyn FileExporter>) {
        self.register(ComponentDescriptor::exporter([extension], exporter));
    }

    /// Add one descriptor. Returns warnings for skipped or replaced entries.
    pub fn register(&self, descriptor: ComponentDescriptor) -> Vec<String> {
        let mut warnings = Vec::new();
        let kind = descriptor.kind();
        let extensions = descriptor.extensions.clone();
        self.inner.write().register(descriptor, &mut warnings);
        tracing::info!(?kind, ?extensions, "registered file component");
        for warning in &warnings {
            tracing::warn!("{warning}");
        }
        warnings
    }

    /// Drop every registration and re-register from `descriptors`.
    ///
    /// The swap happens under one write lock; readers see either the old or
    /// the new set, never a mix.
    pub fn refresh(
        &self,
        descriptors: impl IntoIterator<Item = ComponentDescriptor>,
    ) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut fresh = Components::default();
        for descriptor in descriptors {
            fresh.register(descriptor, &mut warnings);
        }
        let (loaders, exporters) = (fresh.loaders.len(), fresh.exporters.len());
        *self.inner.write() = fresh;

        tracing::info!(loaders, exporters, "file component registry refreshed");
        for warning in &warnings {
            tracing::warn!("{warning}");
        }
        warnings
    }

    pub fn loader(&self, extension: &str) -> Option<Arc<dyn FileLoader>> {
        self.inner
            .read()
            .loaders
            .get(&normalize_extension(extension))
            .cloned()
    }

    pub fn exporter(&self, extension: &str) -> Option<Arc<dyn FileExporter>> {
        self.inner
            .read()
            .exporters
            .get(&normalize_extension(extension))
            .cloned()
    }

    pub fn loader_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.inner.read().loaders.keys().cloned().collect();
        extensions.sort();
        extensions
    }

    pub fn exporter_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.inner.read().exporters.keys().cloned().collect();
        extensions.sort();
        extensions
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Configuration, registry and parameter provider shared by loaders.
#[derive(Clone, Default)]
pub struct LoaderContext {
    config: LoaderConfig,
    registry: Arc<LoaderRegistry>,
    provider: Option<Arc<dyn ParamProvider>>,
}

static GLOBAL_CONTEXT: LazyLock<LoaderContext> = LazyLock::new(|| {
    let config = LoaderConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "invalid loader configuration; using defaults");
        LoaderConfig::default()
    });
    LoaderContext::new(config)
});

impl fmt::Debug for LoaderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderContext")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("provider", &self.provider.is_some())
            .finish()
    }
}

impl LoaderContext {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            registry: Arc::new(LoaderRegistry::new()),
            provider: None,
        }
    }

    /// Process-wide default context, configured from the environment on first use.
    pub fn global() -> &'static LoaderContext {
        &GLOBAL_CONTEXT
    }

    pub fn with_registry(mut self, registry: Arc<LoaderRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn ParamProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn registry(&self) -> &LoaderRegistry {
        &self.registry
    }

    pub fn provider(&self) -> Option<&dyn ParamProvider> {
        self.provider.as_deref()
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    struct RowCount;

    impl FileExporter for RowCount {
        fn export(&self, rows: &[Value]) -> Result<Vec<u8>> {
            Ok(format!("{}", rows.len()).into_bytes())
        }
    }

    struct Counting;

    impl FileLoader for Counting {
        fn import_file(
            &self,
            file: &InputFile,
            _entity: Option<&str>,
            _user_id: Option<i64>,
            _params: &ParamBag,
        ) -> Result<ImportResult> {
            Ok(ImportResult::new(0, file.size() as u64))
        }
    }

    #[test]
    fn extensions_are_normalised() {
        assert_eq!(normalize_extension(".CSV"), "csv");
        assert_eq!(extension_of("report.2024.xlsx"), "xlsx");
        assert_eq!(extension_of("README"), "");
        assert_eq!(InputFile::new("a.TXT", vec![]).extension(), "txt");
    }

    #[test]
    fn lookup_ignores_case_and_dots() {
        let registry = LoaderRegistry::new();
        registry.register_exporter("CSV", Arc::new(RowCount));
        registry.register_loader(".zip", Arc::new(Counting));

        assert!(registry.exporter(".csv").is_some());
        assert!(registry.exporter("xlsx").is_none());
        assert!(registry.loader("ZIP").is_some());
        assert!(registry.loader("csv").is_none());
    }

    #[test]
    fn refresh_replaces_everything() {
        let registry = LoaderRegistry::new();
        registry.register_exporter("csv", Arc::new(RowCount));

        let warnings = registry.refresh([
            ComponentDescriptor::loader(["txt", "TSV"], Arc::new(Counting)),
            ComponentDescriptor::exporter([""], Arc::new(RowCount)),
        ]);

        assert_eq!(warnings.len(), 1);
        assert!(registry.exporter("csv").is_none());
        assert_eq!(registry.loader_extensions(), vec!["tsv", "txt"]);
    }

    #[test]
    fn duplicate_registration_warns() {
        let registry = LoaderRegistry::new();
        registry.register_exporter("csv", Arc::new(RowCount));
        let warnings =
            registry.register(ComponentDescriptor::exporter(["csv"], Arc::new(RowCount)));
        assert_eq!(warnings.len(), 1);
        assert_eq!(registry.exporter_extensions(), vec!["csv"]);
    }

    #[test]
    fn context_exposes_parts() {
        struct Fixed;
        impl ParamProvider for Fixed {
            fn fill(&self, request: &mut RequestDescriptor) {
                request.params_mut().set_user_id(1);
            }
        }

        let context = LoaderContext::new(LoaderConfig::default()).with_provider(Arc::new(Fixed));
        let mut request = RequestDescriptor::new();
        context.provider().unwrap().fill(&mut request);
        assert_eq!(request.params().user_id(), Some(1));
        assert_eq!(context.config().max_per_page, 500);
    }

    #[test]
    fn global_context_is_shared() {
        let first = LoaderContext::global();
        assert!(std::ptr::eq(first, LoaderContext::global()));
    }
}

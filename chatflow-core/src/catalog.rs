//! Link-time table of step functions addressable by qualified reference.
//!
//! A reference is `module.path.function_name`; `::` is accepted in place of
//! `.` so Rust module paths can be used verbatim. Entries come from the
//! [`step`](https://docs.rs/chatflow-macros) attribute, collected with
//! `inventory`, or from explicit [`HandlerCatalog::insert`] calls.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::handler::StepHandler;
use crate::CatalogError;

/// One step function submitted at link time.
pub struct CatalogEntry {
    module: &'static str,
    name: &'static str,
    constructor: fn() -> Arc<dyn StepHandler>,
}

impl CatalogEntry {
    pub const fn new(
        module: &'static str,
        name: &'static str,
        constructor: fn() -> Arc<dyn StepHandler>,
    ) -> Self {
        Self {
            module,
            name,
            constructor,
        }
    }

    pub fn path(&self) -> String {
        format!("{}.{}", normalize_module(self.module), self.name)
    }
}

inventory::collect!(CatalogEntry);

#[derive(Default, Clone)]
pub struct HandlerCatalog {
    modules: BTreeMap<String, HashMap<String, Arc<dyn StepHandler>>>,
}

impl std::fmt::Debug for HandlerCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerCatalog")
            .field("paths", &self.paths())
            .finish()
    }
}

impl HandlerCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every [`CatalogEntry`] linked into the binary.
    pub fn collected() -> Self {
        let mut catalog = Self::new();
        for entry in inventory::iter::<CatalogEntry>() {
            catalog.insert_parts(
                normalize_module(entry.module),
                entry.name.to_string(),
                (entry.constructor)(),
            );
        }
        catalog
    }

    pub fn insert(
        &mut self,
        reference: &str,
        handler: Arc<dyn StepHandler>,
    ) -> Result<(), CatalogError> {
        let (module, name) = split_reference(reference)?;
        self.insert_parts(module, name, handler);
        Ok(())
    }

    pub fn with_handler(
        mut self,
        reference: &str,
        handler: Arc<dyn StepHandler>,
    ) -> Result<Self, CatalogError> {
        self.insert(reference, handler)?;
        Ok(self)
    }

    fn insert_parts(&mut self, module: String, name: String, handler: Arc<dyn StepHandler>) {
        self.modules.entry(module).or_default().insert(name, handler);
    }

    pub fn resolve(&self, reference: &str) -> Result<Arc<dyn StepHandler>, CatalogError> {
        let (module, name) = split_reference(reference)?;
        let functions = self
            .modules
            .get(&module)
            .ok_or_else(|| CatalogError::ModuleNotFound {
                module: module.clone(),
            })?;
        functions
            .get(&name)
            .cloned()
            .ok_or(CatalogError::FunctionNotFound { module, name })
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.resolve(reference).is_ok()
    }

    /// All qualified paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .modules
            .iter()
            .flat_map(|(module, functions)| {
                functions.keys().map(move |name| format!("{module}.{name}"))
            })
            .collect();
        paths.sort();
        paths
    }
}

fn normalize_module(module: &str) -> String {
    module.trim().replace("::", ".")
}

fn split_reference(reference: &str) -> Result<(String, String), CatalogError> {
    let normalized = normalize_module(reference);
    let malformed = || CatalogError::MalformedReference {
        reference: reference.to_string(),
    };
    let (module, name) = normalized.rsplit_once('.').ok_or_else(malformed)?;
    let valid_segment = |segment: &str| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    if !valid_segment(name) || !module.split('.').all(valid_segment) {
        return Err(malformed());
    }
    Ok((module.to_string(), name.to_string()))
}

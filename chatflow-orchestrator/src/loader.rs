use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chatflow_core::{ChatflowError, HandlerCatalog, StepHandler};
use regex::Regex;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::error::LoadError;

const INLINE_MARKER: &str = r"\bfn\s+[A-Za-z_][A-Za-z0-9_]*\s*\(";

/// Ordered `state_id -> reference` pairs, as read from a declaration document.
///
/// A reference is either a qualified `module.function_name` path resolved
/// through a [`HandlerCatalog`], or inline step-script source defining a
/// single four-argument function.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepDeclarations {
    entries: Vec<(String, String)>,
}

impl StepDeclarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a declaration. A replaced entry keeps its position.
    pub fn insert(&mut self, state_id: impl Into<String>, reference: impl Into<String>) {
        let state_id = state_id.into();
        let reference = reference.into();
        match self.entries.iter_mut().find(|(id, _)| *id == state_id) {
            Some(entry) => entry.1 = reference,
            None => self.entries.push((state_id, reference)),
        }
    }

    pub fn with(mut self, state_id: impl Into<String>, reference: impl Into<String>) -> Self {
        self.insert(state_id, reference);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(id, reference)| (id.as_str(), reference.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_json_str(raw: &str) -> Result<Self, LoadError> {
        serde_json::from_str(raw).map_err(|err| LoadError::Declarations {
            reason: err.to_string(),
        })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let raw = read_source(path)?;
        serde_json::from_str(&raw).map_err(|err| LoadError::Source {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(raw: &str) -> Result<Self, LoadError> {
        serde_yaml::from_str(raw).map_err(|err| LoadError::Declarations {
            reason: err.to_string(),
        })
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let raw = read_source(path)?;
        serde_yaml::from_str(&raw).map_err(|err| LoadError::Source {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }
}

fn read_source(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|err| LoadError::Source {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StepDeclarations {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut declarations = Self::new();
        for (state_id, reference) in iter {
            declarations.insert(state_id, reference);
        }
        declarations
    }
}

impl<'de> Deserialize<'de> for StepDeclarations {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DeclarationsVisitor;

        impl<'de> Visitor<'de> for DeclarationsVisitor {
            type Value = StepDeclarations;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of state ids to handler references")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut declarations = StepDeclarations::new();
                while let Some((state_id, reference)) = map.next_entry::<String, String>()? {
                    declarations.insert(state_id, reference);
                }
                Ok(declarations)
            }
        }

        deserializer.deserialize_map(DeclarationsVisitor)
    }
}

/// Turns declaration references into handlers.
pub(crate) struct StepLoader<'c> {
    catalog: &'c HandlerCatalog,
    inline_marker: Regex,
}

impl<'c> StepLoader<'c> {
    pub(crate) fn new(catalog: &'c HandlerCatalog) -> Result<Self, ChatflowError> {
        let inline_marker =
            Regex::new(INLINE_MARKER).map_err(|e| ChatflowError::InvalidConfig(e.to_string()))?;
        Ok(Self {
            catalog,
            inline_marker,
        })
    }

    pub(crate) fn is_inline(&self, reference: &str) -> bool {
        self.inline_marker.is_match(reference)
    }

    pub(crate) fn load(
        &self,
        state_id: &str,
        reference: &str,
    ) -> Result<Arc<dyn StepHandler>, LoadError> {
        if self.is_inline(reference) {
            let step = chatflow_script::compile_step(reference).map_err(|source| {
                LoadError::Inline {
                    state_id: state_id.to_string(),
                    source,
                }
            })?;
            tracing::debug!(state_id, function = step.function_name(), "compiled inline step");
            return Ok(Arc::new(step));
        }

        self.catalog
            .resolve(reference.trim())
            .map_err(|reason| LoadError::Unresolved {
                state_id: state_id.to_string(),
                reference: reference.to_string(),
                reason,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_order_is_preserved_and_duplicates_replace_in_place() {
        let declarations =
            StepDeclarations::from_json_str(r#"{"b": "m.one", "a": "m.two", "b": "m.three"}"#)
                .unwrap();
        let pairs: Vec<_> = declarations.iter().collect();
        assert_eq!(pairs, vec![("b", "m.three"), ("a", "m.two")]);
    }

    #[test]
    fn non_string_references_are_rejected() {
        let err = StepDeclarations::from_json_str(r#"{"start": 3}"#).unwrap_err();
        assert!(matches!(err, LoadError::Declarations { .. }));
        assert!(StepDeclarations::from_json_str("[]").is_err());
    }

    #[test]
    fn inline_marker_requires_a_function_definition() {
        let catalog = HandlerCatalog::new();
        let loader = StepLoader::new(&catalog).unwrap();
        assert!(loader.is_inline("fn handle(a, b, c, d) {}"));
        assert!(loader.is_inline("// step\n  fn\tgo (a, b, c, d) {}"));
        assert!(!loader.is_inline("flows.greeting.fn_start"));
        assert!(!loader.is_inline("defn handle("));
    }
}

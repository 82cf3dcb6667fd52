//! Compiler configuration.

use serde::{Deserialize, Serialize};

use crate::diagnostics::CompileError;

pub const DEFAULT_RUNTIME_MODULE: &str = "@zenithbuild/reactive";
pub const DEFAULT_COMPONENT_EXTENSION: &str = ".zen";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Path of the component source, used for naming and diagnostics.
    pub file_path: String,
    /// Class name of the generated component. Derived from the file stem
    /// when absent.
    pub component_name: Option<String>,
    /// Module the runtime base classes and helpers are imported from.
    pub runtime_module: String,
    /// Extension of component imports; rewritten to `.js` in the output.
    pub component_extension: String,
    /// Identifiers accepted as globals in addition to the built-in list.
    pub extra_globals: Vec<String>,
    /// Emit TypeScript annotations and the props interface.
    pub emit_types: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            file_path: "Component.zen".to_string(),
            component_name: None,
            runtime_module: DEFAULT_RUNTIME_MODULE.to_string(),
            component_extension: DEFAULT_COMPONENT_EXTENSION.to_string(),
            extra_globals: vec![],
            emit_types: true,
        }
    }
}

impl CompileOptions {
    pub fn for_file(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CompileError> {
        Ok(serde_json::from_str(json)?)
    }

    /// `src/lib/counter-button.zen` → `CounterButton`.
    pub fn resolved_component_name(&self) -> String {
        if let Some(name) = &self.component_name {
            return name.clone();
        }
        let file = self
            .file_path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.file_path);
        let stem = file.split('.').next().unwrap_or(file);
        let mut name = String::new();
        for part in stem.split(|c: char| !c.is_ascii_alphanumeric()) {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                name.push(first.to_ascii_uppercase());
                name.extend(chars);
            }
        }
        if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
            name.insert_str(0, "Component");
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_name_from_path() {
        assert_eq!(
            CompileOptions::for_file("src/lib/counter-button.zen").resolved_component_name(),
            "CounterButton"
        );
        assert_eq!(
            CompileOptions::for_file("C:\\app\\Card.zen").resolved_component_name(),
            "Card"
        );
        assert_eq!(
            CompileOptions::for_file("404.zen").resolved_component_name(),
            "Component404"
        );
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let options =
            CompileOptions::from_json(r#"{ "filePath": "App.zen", "emitTypes": false }"#).unwrap();
        assert_eq!(options.file_path, "App.zen");
        assert!(!options.emit_types);
        assert_eq!(options.runtime_module, DEFAULT_RUNTIME_MODULE);
        assert_eq!(options.component_extension, ".zen");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            CompileOptions::from_json("{ nope"),
            Err(CompileError::InvalidOptions(_))
        ));
    }
}

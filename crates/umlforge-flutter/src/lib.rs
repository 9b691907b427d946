//! Generate a Flutter CRUD client for every class of a diagram.
//!
//! [`generate_project_files`] is pure: the same diagram always yields the
//! same path → content map. [`write_project`] puts that map on disk.

mod detail_screen;
mod form_screen;
mod list_screen;
mod model;
pub mod naming;
mod scaffold;
mod service;
mod template;

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use umlforge_core::names::to_snake_case;
use umlforge_core::Diagram;

pub use naming::{plan_entities, DartType, EntityPlan};

pub const DEFAULT_PROJECT_NAME: &str = "uml_flutter_ui";

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Dart package name for `pubspec.yaml`; normalized to snake case.
    pub project_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            project_name: DEFAULT_PROJECT_NAME.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("refusing to write outside the project directory: {0}")]
    UnsafePath(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Every file of the project keyed by its path relative to the project root.
pub fn generate_project_files(diagram: &Diagram, options: &ExportOptions) -> BTreeMap<String, String> {
    let plans = plan_entities(diagram);
    let mut files = BTreeMap::new();

    files.insert("pubspec.yaml".to_string(), scaffold::pubspec_yaml(&package_name(&options.project_name)));
    files.insert("lib/main.dart".to_string(), scaffold::main_dart(&plans));
    files.insert("lib/services/api_config.dart".to_string(), scaffold::API_CONFIG.to_string());
    files.insert("lib/services/api_service.dart".to_string(), scaffold::api_service_dart());

    for plan in &plans {
        let snake = &plan.snake;
        files.insert(format!("lib/models/{snake}_model.dart"), model::model_dart(plan));
        files.insert(format!("lib/services/{snake}_service.dart"), service::service_dart(plan));
        files.insert(
            format!("lib/screens/{snake}/{snake}_list_screen.dart"),
            list_screen::list_screen_dart(plan),
        );
        files.insert(
            format!("lib/screens/{snake}/{snake}_form_screen.dart"),
            form_screen::form_screen_dart(plan),
        );
        files.insert(
            format!("lib/screens/{snake}/{snake}_detail_screen.dart"),
            detail_screen::detail_screen_dart(plan),
        );
    }

    debug!(entities = plans.len(), files = files.len(), "generated flutter project");
    files
}

/// Lower snake case, falling back to the default when nothing usable is left.
fn package_name(raw: &str) -> String {
    let name = to_snake_case(raw);
    match name.chars().next() {
        Some(c) if c.is_ascii_lowercase() => name,
        _ => DEFAULT_PROJECT_NAME.to_string(),
    }
}

/// Write `files` under `root`, creating directories as needed. Returns the
/// number of files written. Absolute paths and `..` components are rejected
/// before anything touches the disk.
pub fn write_project(root: &Path, files: &BTreeMap<String, String>) -> Result<usize, ExportError> {
    for relative in files.keys() {
        let path = Path::new(relative);
        let safe = path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || relative.is_empty() {
            return Err(ExportError::UnsafePath(relative.clone()));
        }
    }

    for (relative, content) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ExportError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, content).map_err(|source| ExportError::Io { path, source })?;
    }

    info!(root = %root.display(), files = files.len(), "flutter project written");
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use umlforge_core::sanitize;

    fn sample() -> Diagram {
        sanitize(&json!({
            "id": "d1",
            "name": "Tienda",
            "entities": [
                {"id": "e1", "name": "Cliente", "attributes": [
                    {"name": "nombre", "type": "String"},
                    {"name": "número", "type": "Integer"}
                ]},
                {"id": "e2", "name": "Orden Compra", "attributes": [
                    {"name": "id", "type": "Long"},
                    {"name": "fecha", "type": "Date"}
                ]}
            ],
            "relations": [],
            "metadata": {"created": "2024-01-01T00:00:00Z", "modified": "2024-01-01T00:00:00Z", "version": "1.0.0"}
        }))
    }

    #[test]
    fn file_layout() {
        let files = generate_project_files(&sample(), &ExportOptions::default());
        let paths: Vec<&str> = files.keys().map(String::as_str).collect();
        assert_eq!(
            paths,
            vec![
                "lib/main.dart",
                "lib/models/cliente_model.dart",
                "lib/models/orden_compra_model.dart",
                "lib/screens/cliente/cliente_detail_screen.dart",
                "lib/screens/cliente/cliente_form_screen.dart",
                "lib/screens/cliente/cliente_list_screen.dart",
                "lib/screens/orden_compra/orden_compra_detail_screen.dart",
                "lib/screens/orden_compra/orden_compra_form_screen.dart",
                "lib/screens/orden_compra/orden_compra_list_screen.dart",
                "lib/services/api_config.dart",
                "lib/services/api_service.dart",
                "lib/services/cliente_service.dart",
                "lib/services/orden_compra_service.dart",
                "pubspec.yaml",
            ]
        );
        assert!(files["pubspec.yaml"].starts_with("name: uml_flutter_ui\n"));
    }

    #[test]
    fn output_is_deterministic() {
        let diagram = sample();
        let options = ExportOptions::default();
        assert_eq!(
            generate_project_files(&diagram, &options),
            generate_project_files(&diagram, &options)
        );
    }

    #[test]
    fn no_placeholder_survives() {
        for (path, content) in generate_project_files(&sample(), &ExportOptions::default()) {
            assert!(!content.contains("{{"), "{path} has an unfilled placeholder");
        }
    }

    #[test]
    fn brace_names_stay_literal() {
        let diagram = sanitize(&json!({
            "entities": [{"name": "Nota", "attributes": [
                {"name": "{{to_json}}", "type": "String"},
                {"name": "{{build}}", "type": "String"}
            ]}]
        }));
        let files = generate_project_files(&diagram, &ExportOptions::default());
        let model = &files["lib/models/nota_model.dart"];
        assert!(model.contains("json['{{to_json}}']"), "{model}");
        assert!(model.contains("'{{build}}': "), "{model}");
        assert_eq!(model.matches("toJson()").count(), 1);
    }

    #[test]
    fn empty_diagram_still_has_a_shell() {
        let files = generate_project_files(&sanitize(&json!({})), &ExportOptions::default());
        assert_eq!(files.len(), 4);
        assert!(files.contains_key("lib/main.dart"));
    }

    #[test]
    fn project_name_is_normalized() {
        assert_eq!(package_name("Mi Tienda"), "mi_tienda");
        assert_eq!(package_name("123"), DEFAULT_PROJECT_NAME);
        assert_eq!(package_name(""), DEFAULT_PROJECT_NAME);
    }

    #[test]
    fn writes_project_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let files = generate_project_files(&sample(), &ExportOptions::default());
        let written = write_project(dir.path(), &files).unwrap();
        assert_eq!(written, files.len());
        let model = std::fs::read_to_string(dir.path().join("lib/models/cliente_model.dart")).unwrap();
        assert_eq!(model, files["lib/models/cliente_model.dart"]);
    }

    #[test]
    fn rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = BTreeMap::new();
        files.insert("../evil.dart".to_string(), String::new());
        assert!(matches!(
            write_project(dir.path(), &files),
            Err(ExportError::UnsafePath(_))
        ));
    }
}

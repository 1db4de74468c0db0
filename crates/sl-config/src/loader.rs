//! Scenario document loader
//!
//! Documents are read as YAML (JSON is a subset), tag-processed, and then
//! deserialized into a [`ScenarioDocument`].

use crate::document::ScenarioDocument;
use crate::error::{ConfigError, ConfigResult};
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// YAML loader resolving `!include` and `!include_dir_named` tags
pub struct DocumentLoader {
    /// Base directory for relative paths
    base_dir: PathBuf,
    /// Files currently being loaded, to detect circular includes
    include_stack: HashSet<PathBuf>,
}

impl DocumentLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            include_stack: HashSet::new(),
        }
    }

    /// Load and process a YAML file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> ConfigResult<Value> {
        let path = self.resolve_path(path.as_ref());
        self.load_path(path)
    }

    fn load_path(&mut self, path: PathBuf) -> ConfigResult<Value> {
        debug!("Loading document file: {:?}", path);

        if self.include_stack.contains(&path) {
            return Err(ConfigError::CircularInclude { path });
        }

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::ReadFile {
            path: path.clone(),
            source: e,
        })?;

        self.include_stack.insert(path.clone());
        let result = self.load_string(&content, &path);
        self.include_stack.remove(&path);

        result
    }

    /// Load and process YAML text
    ///
    /// `source_path` names the text in errors and anchors relative includes.
    pub fn load_string(&mut self, content: &str, source_path: &Path) -> ConfigResult<Value> {
        let value: Value = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
            path: source_path.to_path_buf(),
            source: e,
        })?;

        self.process_value(value, source_path)
    }

    /// Load a file and deserialize it as a scenario document
    pub fn load_document(&mut self, path: impl AsRef<Path>) -> ConfigResult<ScenarioDocument> {
        let path = self.resolve_path(path.as_ref());
        let value = self.load_path(path.clone())?;
        into_document(value, &path)
    }

    fn process_value(&mut self, value: Value, source_path: &Path) -> ConfigResult<Value> {
        match value {
            Value::Tagged(tagged) => self.process_tagged(*tagged, source_path),
            Value::Mapping(map) => {
                let mut result = Mapping::new();
                for (k, v) in map {
                    let processed = self.process_value(v, source_path)?;
                    result.insert(k, processed);
                }
                Ok(Value::Mapping(result))
            }
            Value::Sequence(seq) => {
                let result: ConfigResult<Vec<Value>> = seq
                    .into_iter()
                    .map(|v| self.process_value(v, source_path))
                    .collect();
                Ok(Value::Sequence(result?))
            }
            _ => Ok(value),
        }
    }

    fn process_tagged(
        &mut self,
        tagged: serde_yaml::value::TaggedValue,
        source_path: &Path,
    ) -> ConfigResult<Value> {
        let tag = tagged.tag.to_string();
        trace!("Processing tag '{}'", tag);

        match tag.as_str() {
            "!include" => {
                let path = self.value_to_path(&tagged.value, source_path)?;
                debug!("Including file: {:?}", path);
                self.load_path(path)
            }
            "!include_dir_named" => {
                let dir = self.value_to_path(&tagged.value, source_path)?;
                self.include_dir_named(&dir)
            }
            _ => {
                warn!(tag = %tag, "Unknown tag, using untagged value");
                self.process_value(tagged.value, source_path)
            }
        }
    }

    /// Mapping of file stem to content for every YAML file in `dir`
    fn include_dir_named(&mut self, dir: &Path) -> ConfigResult<Value> {
        debug!("Including directory as mapping: {:?}", dir);

        let mut result = Mapping::new();
        for file in yaml_files(dir)? {
            let Some(name) = file.file_stem().and_then(|s| s.to_str()).map(String::from) else {
                continue;
            };
            let content = self.load_path(file)?;
            result.insert(Value::String(name), content);
        }

        Ok(Value::Mapping(result))
    }

    /// Resolve an include operand relative to the including file
    fn value_to_path(&self, value: &Value, source_path: &Path) -> ConfigResult<PathBuf> {
        let Value::String(path) = value else {
            return Err(ConfigError::InvalidIncludePath {
                path: format!("{:?}", value),
                reason: "path must be a string".to_string(),
            });
        };
        if path.is_empty() {
            return Err(ConfigError::InvalidIncludePath {
                path: path.clone(),
                reason: "path must not be empty".to_string(),
            });
        }

        let base_dir: &Path = match source_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => self.base_dir.as_path(),
        };
        Ok(base_dir.join(path))
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// YAML files in a directory, sorted by name
fn yaml_files(dir: &Path) -> ConfigResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ConfigError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| ConfigError::ReadFile {
            path: dir.to_path_buf(),
            source: e,
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml" || ext == "json")
        })
        .collect();

    files.sort();
    Ok(files)
}

fn into_document(value: Value, path: &Path) -> ConfigResult<ScenarioDocument> {
    let document: ScenarioDocument =
        serde_yaml::from_value(value).map_err(|e| ConfigError::InvalidDocument {
            path: path.to_path_buf(),
            source: e,
        })?;
    document.validate()?;

    debug!(
        steps = document.scenario.len(),
        blocks = document.blocks.len(),
        "Loaded scenario document"
    );
    Ok(document)
}

/// Load a scenario document from a file
///
/// Includes resolve relative to the file's directory.
pub fn load_document(path: impl AsRef<Path>) -> ConfigResult<ScenarioDocument> {
    let path = path.as_ref();
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    DocumentLoader::new(base_dir).load_document(path.file_name().map(Path::new).unwrap_or(path))
}

/// Load a scenario document from YAML or JSON text
///
/// Includes resolve relative to the current directory.
pub fn load_document_str(content: &str) -> ConfigResult<ScenarioDocument> {
    let source = Path::new("<string>");
    let value = DocumentLoader::new(".").load_string(content, source)?;
    into_document(value, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sl_machine::RunMode;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_document_str_json() {
        let doc = load_document_str(
            r#"{
                "config": {"loop": false, "vibrationMode": "once", "mode": "manual"},
                "initialValues": {"opacity": 0},
                "scenario": [{"type": "move", "target": "opacity", "to": 1, "duration": 500}]
            }"#,
        )
        .unwrap();

        assert_eq!(doc.config.mode, RunMode::Manual);
        assert_eq!(doc.initial_values.get("opacity"), Some(&0.0));
        assert_eq!(doc.scenario.len(), 1);
    }

    #[test]
    fn test_load_document_str_parse_error() {
        let err = load_document_str("scenario: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::ParseYaml { .. }));
    }

    #[test]
    fn test_load_document_str_wrong_shape() {
        let err = load_document_str("scenario: 5").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDocument { .. }));
    }

    #[test]
    fn test_include_file() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "pulse.yaml",
            "- { type: move, target: scale, to: 1.2, duration: 100 }\n",
        );
        let main = write(
            dir.path(),
            "main.yaml",
            "blocks:\n  pulse: !include pulse.yaml\nscenario:\n  - { type: use, block: pulse }\n",
        );

        let doc = load_document(&main).unwrap();
        assert_eq!(doc.blocks.get("pulse").map(|b| b.len()), Some(1));
    }

    #[test]
    fn test_include_dir_named() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "blocks/fade.yaml", "- { type: delay, duration: 10 }\n");
        write(
            dir.path(),
            "blocks/pulse.yml",
            "- { type: vibrate }\n- { type: delay, duration: 10 }\n",
        );
        write(dir.path(), "blocks/notes.txt", "ignored");
        let main = write(
            dir.path(),
            "main.yaml",
            "blocks: !include_dir_named blocks\nscenario: []\n",
        );

        let doc = load_document(&main).unwrap();
        let names: Vec<_> = doc.blocks.names().collect();
        assert_eq!(names, vec!["fade", "pulse"]);
        assert_eq!(doc.blocks.get("pulse").map(|b| b.len()), Some(2));
    }

    #[test]
    fn test_circular_include() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.yaml", "next: !include b.yaml\n");
        write(dir.path(), "b.yaml", "next: !include a.yaml\n");

        let mut loader = DocumentLoader::new(dir.path());
        let err = loader.load_file("a.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::CircularInclude { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_document(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_missing_include_dir() {
        let dir = TempDir::new().unwrap();
        let main = write(dir.path(), "main.yaml", "blocks: !include_dir_named nope\n");

        let err = load_document(&main).unwrap_err();
        assert!(matches!(err, ConfigError::DirectoryNotFound { .. }));
    }

    #[test]
    fn test_include_path_must_be_string() {
        let mut loader = DocumentLoader::new(".");
        let err = loader
            .load_string("blocks: !include [1, 2]", Path::new("inline.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIncludePath { .. }));
    }
}

use std::{fmt, path::PathBuf, str::FromStr};

use serde::Deserialize;
use shapegen_model::Protocol;

use crate::error::Error;

fn default_namespace() -> String {
    "crate".to_string()
}

/// Contents of `codegen.toml`
#[derive(Debug, Deserialize)]
pub struct CodegenConfig {
    /// model inputs
    #[serde(default)]
    pub models: Vec<ModelSource>,

    /// path prefix of generated native types
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Output directory. One folder per model is created below it.
    pub output_dir: PathBuf,

    /// Operations to generate. Empty means every operation in the model.
    #[serde(default)]
    pub operations: Vec<String>,

    /// Generate every operation with this protocol instead of the model's
    #[serde(default)]
    pub protocol: Option<Protocol>,

    /// The directory containing the codegen.toml file, and the base_dir
    /// used for evaluating all relative paths in the file.
    /// This is not set inside the toml file but is set by the file reader.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Service definition file, or a directory of them.
/// `files` is optional if `path` directly references a model file.
#[derive(Debug, Deserialize)]
pub struct ModelSource {
    pub path: PathBuf,
    #[serde(default)]
    pub files: Vec<String>,
}

impl ModelSource {
    /// convenience function to create a ModelSource for a single file path
    pub fn from_file<P: Into<PathBuf>>(path: P) -> ModelSource {
        ModelSource { path: path.into(), files: Vec::default() }
    }

    /// Model files this source names, resolved against `base_dir`
    pub fn paths(&self, base_dir: &std::path::Path) -> std::io::Result<Vec<PathBuf>> {
        let root = base_dir.join(&self.path);
        if !self.files.is_empty() {
            return Ok(self.files.iter().map(|f| root.join(f)).collect());
        }
        if !root.is_dir() {
            return Ok(vec![root]);
        }
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&root)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "path({})", self.path.display())
    }
}

impl FromStr for CodegenConfig {
    type Err = Error;

    fn from_str(content: &str) -> std::result::Result<CodegenConfig, Self::Err> {
        let config = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codegen_toml() {
        let config: CodegenConfig = r#"
            output_dir = "gen"
            operations = ["Publish"]
            protocol = "rest-json"

            [[models]]
            path = "models"
            files = ["sns.json"]
        "#
        .parse()
        .unwrap();
        assert_eq!(config.namespace, "crate");
        assert_eq!(config.output_dir, PathBuf::from("gen"));
        assert_eq!(config.protocol, Some(Protocol::RestJson));
        assert_eq!(config.models[0].to_string(), "path(models)");
        assert_eq!(
            config.models[0].paths(std::path::Path::new("/base")).unwrap(),
            vec![PathBuf::from("/base/models/sns.json")]
        );
    }

    #[test]
    fn missing_output_dir_is_a_config_error() {
        let err = "namespace = \"aws\"".parse::<CodegenConfig>().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn directory_sources_list_json_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        let source = ModelSource::from_file(".");
        let paths = source.paths(dir.path()).unwrap();
        let names: Vec<_> = paths.iter().filter_map(|p| p.file_name()?.to_str()).collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }
}

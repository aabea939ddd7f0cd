//! Configuration for kiln projects.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (KILN_OUTPUT_PATH, KILN_ENVIRONMENT, KILN_INSTRUMENTATION)
//! 2. Config file (.kiln/config.yaml)
//! 3. Defaults (output to ./dist, development environment)
//!
//! Config file discovery:
//! - Searches the start directory and parents for .kiln/config.yaml
//! - Paths in the config file are relative to the project root (parent of .kiln/)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::errors::SilentError;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

pub const CONFIG_DIR: &str = ".kiln";
pub const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_OUTPUT_PATH: &str = "dist";
const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_INSTRUMENTATION_DIR: &str = ".kiln/instrumentation";

/// Config written by `kiln new` and `kiln init`
pub const DEFAULT_CONFIG_YAML: &str = r#"version: "1"
build:
  # Command that produces the build; {output} is replaced with the output path
  command: ["npm", "run", "build", "--", "--outDir", "{output}"]
  output_path: dist
instrumentation:
  enabled: false
addons: []
"#;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub instrumentation: InstrumentationConfig,
    #[serde(default)]
    pub addons: Vec<AddonConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildConfig {
    /// Engine command line
    #[serde(default)]
    pub command: Vec<String>,
    /// Run by `cleanup()` when present
    pub cleanup_command: Option<Vec<String>>,
    /// Output directory (relative to project root)
    pub output_path: Option<String>,
    pub environment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstrumentationConfig {
    pub enabled: Option<bool>,
    pub directory: Option<String>,
}

/// A declarative addon: lifecycle name -> command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonConfig {
    pub name: String,
    #[serde(default)]
    pub hooks: BTreeMap<String, Vec<String>>,
}

/// Values read from the environment
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub output_path: Option<String>,
    pub environment: Option<String>,
    pub instrumentation: Option<bool>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            output_path: std::env::var("KILN_OUTPUT_PATH").ok(),
            environment: std::env::var("KILN_ENVIRONMENT").ok(),
            instrumentation: std::env::var("KILN_INSTRUMENTATION")
                .ok()
                .map(|v| is_truthy(&v)),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Project root
    pub root: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub build_command: Vec<String>,
    pub cleanup_command: Option<Vec<String>>,
    /// Absolute output directory
    pub output_path: PathBuf,
    pub environment: String,
    pub instrumentation: InstrumentationSettings,
    pub addons: Vec<AddonConfig>,
}

#[derive(Debug, Clone)]
pub struct InstrumentationSettings {
    pub enabled: bool,
    pub directory: PathBuf,
}

impl ResolvedConfig {
    /// Apply command-line overrides
    pub fn with_overrides(mut self, output_path: Option<PathBuf>, environment: Option<String>) -> Self {
        if let Some(path) = output_path {
            self.output_path = if path.is_absolute() {
                path
            } else {
                self.root.join(path)
            };
        }
        if let Some(env) = environment {
            self.environment = env;
        }
        self
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Merge a config file (if any) with environment overrides
fn resolve(start: &Path, file: Option<(PathBuf, ConfigFile)>, env: &EnvOverrides) -> ResolvedConfig {
    let (root, config_file, config) = match file {
        Some((path, config)) => {
            // Root is the parent of .kiln/ (i.e., grandparent of config.yaml)
            let root = path
                .parent()
                .and_then(|p| p.parent())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| start.to_path_buf());
            (root, Some(path), Some(config))
        }
        None => (start.to_path_buf(), None, None),
    };

    let build = config.as_ref().map(|c| c.build.clone()).unwrap_or_default();
    let instrumentation = config
        .as_ref()
        .map(|c| c.instrumentation.clone())
        .unwrap_or_default();

    let output_path = env
        .output_path
        .clone()
        .or(build.output_path)
        .unwrap_or_else(|| DEFAULT_OUTPUT_PATH.to_string());

    let environment = env
        .environment
        .clone()
        .or(build.environment)
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

    let instrumentation = InstrumentationSettings {
        enabled: env
            .instrumentation
            .or(instrumentation.enabled)
            .unwrap_or(false),
        directory: resolve_path(
            &root,
            instrumentation
                .directory
                .as_deref()
                .unwrap_or(DEFAULT_INSTRUMENTATION_DIR),
        ),
    };

    ResolvedConfig {
        output_path: resolve_path(&root, &output_path),
        config_file,
        build_command: build.command,
        cleanup_command: build.cleanup_command,
        environment,
        instrumentation,
        addons: config.map(|c| c.addons).unwrap_or_default(),
        root,
    }
}

/// Load configuration for a project containing `start` (uncached)
pub fn load_from(start: &Path) -> Result<ResolvedConfig> {
    let file = match find_config_file(start) {
        Some(path) => {
            let config = load_config_file(&path)?;
            Some((path, config))
        }
        None => None,
    };

    Ok(resolve(start, file, &EnvOverrides::from_env()))
}

fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    load_from(&cwd)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Write the default config into `root/.kiln/config.yaml`
///
/// Refuses to overwrite an existing file.
pub fn write_default_config(root: &Path) -> Result<PathBuf> {
    let dir = root.join(CONFIG_DIR);
    let path = dir.join(CONFIG_FILE);

    if path.exists() {
        return Err(SilentError::new(format!(
            "Config already exists at {}",
            path.display()
        ))
        .into());
    }

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    std::fs::write(&path, DEFAULT_CONFIG_YAML)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(root: &Path, yaml: &str) -> PathBuf {
        let dir = root.join(CONFIG_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", yaml).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file() {
        let temp = TempDir::new().unwrap();

        let config = resolve(temp.path(), None, &EnvOverrides::default());

        assert_eq!(config.root, temp.path());
        assert_eq!(config.output_path, temp.path().join("dist"));
        assert_eq!(config.environment, "development");
        assert!(config.build_command.is_empty());
        assert!(!config.instrumentation.enabled);
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            r#"
version: "1"
build:
  command: ["vite", "build", "--outDir", "{output}"]
  cleanup_command: ["rm", "-rf", "tmp"]
  output_path: public
  environment: production
instrumentation:
  enabled: true
addons:
  - name: lint
    hooks:
      preBuild: ["npm", "run", "lint"]
"#,
        );

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.version, "1");
        assert_eq!(config.build.command[0], "vite");
        assert_eq!(config.build.output_path, Some("public".to_string()));
        assert_eq!(config.addons.len(), 1);
        assert_eq!(
            config.addons[0].hooks.get("preBuild"),
            Some(&vec!["npm".to_string(), "run".to_string(), "lint".to_string()])
        );
    }

    #[test]
    fn test_discovery_from_nested_directory() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "version: \"1\"\nbuild:\n  output_path: out\n");
        let nested = temp.path().join("app/components");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_config_file(&nested).unwrap();
        let config = resolve(
            &nested,
            Some((found.clone(), load_config_file(&found).unwrap())),
            &EnvOverrides::default(),
        );

        assert_eq!(config.root, temp.path());
        assert_eq!(config.output_path, temp.path().join("out"));
        assert_eq!(config.config_file, Some(found));
    }

    #[test]
    fn test_env_overrides_file() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            "version: \"1\"\nbuild:\n  output_path: out\n  environment: production\n",
        );
        let env = EnvOverrides {
            output_path: Some("/tmp/kiln-out".to_string()),
            environment: Some("test".to_string()),
            instrumentation: Some(true),
        };

        let config = resolve(temp.path(), Some((path.clone(), load_config_file(&path).unwrap())), &env);

        assert_eq!(config.output_path, PathBuf::from("/tmp/kiln-out"));
        assert_eq!(config.environment, "test");
        assert!(config.instrumentation.enabled);
        assert_eq!(
            config.instrumentation.directory,
            temp.path().join(".kiln/instrumentation")
        );
    }

    #[test]
    fn test_cli_overrides() {
        let temp = TempDir::new().unwrap();
        let config = resolve(temp.path(), None, &EnvOverrides::default())
            .with_overrides(Some(PathBuf::from("build")), Some("production".to_string()));

        assert_eq!(config.output_path, temp.path().join("build"));
        assert_eq!(config.environment, "production");
    }

    #[cfg(unix)]
    #[test]
    fn test_cli_override_keeps_non_utf8_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = TempDir::new().unwrap();
        let raw = OsStr::from_bytes(b"out\xff");
        let config = resolve(temp.path(), None, &EnvOverrides::default())
            .with_overrides(Some(PathBuf::from(raw)), None);

        assert_eq!(config.output_path, temp.path().join(raw));
        assert_eq!(config.output_path.file_name(), Some(raw));
    }

    #[test]
    fn test_truthy_values() {
        assert!(is_truthy("1"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy(" yes "));
        assert!(!is_truthy("0"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn test_default_config_parses() {
        let config: ConfigFile = serde_yaml::from_str(DEFAULT_CONFIG_YAML).unwrap();
        assert_eq!(config.build.output_path, Some("dist".to_string()));
        assert!(config.build.command.contains(&"{output}".to_string()));
        assert!(config.addons.is_empty());
    }

    #[test]
    fn test_write_default_config_refuses_overwrite() {
        let temp = TempDir::new().unwrap();

        let path = write_default_config(temp.path()).unwrap();
        assert!(path.exists());

        let err = write_default_config(temp.path()).unwrap_err();
        assert!(crate::errors::is_silent(&err));
    }
}

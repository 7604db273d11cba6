//! Configuration types for toolbelt.
//!
//! [`Config::load`] layers, lowest priority first: the built-in defaults,
//! `~/.config/toolbelt/config.toml` (created with the defaults if it does not
//! exist yet), an optional explicit file, and `TOOLBELT_<SECTION>__<KEY>`
//! environment variables. Command-line flags are applied on top by the binary.
//! [`Config::defaults`] returns the built-in defaults without touching the
//! filesystem (useful in tests).

use serde::Deserialize;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[archive]
output_dir = "."
# source   = "build/windows/x64/runner/Release"

[combine]
output_file            = "combined_code.txt"
include_file_structure = true
include_extensions     = [".dart", ".yaml", ".json", ".cpp", ".h", ".txt"]
exclude_dirs           = [".git", "node_modules", "build", "bin", "obj", "dist", "__pycache__", "venv", ".vscode", ".idea"]
# recursive_folders    = ["lib"]
# flat_folders         = []
# include_files        = ["pubspec.yaml"]

[migrate]
tenant_id  = "default_tenant"
collection = "tenants/{tenant}/organizations/hierarchy/nodes"
name_field = "name"
id_field   = "id"
batch_size = 400
base_url   = "https://firestore.googleapis.com"
# project_id          = "my-project"
# service_account_key = "service-account.json"
"#;

/// Upper bound on writes per commit accepted by Firestore.
pub const MAX_BATCH_SIZE: usize = 500;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level configuration, one section per subcommand.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub combine: CombineConfig,
    #[serde(default)]
    pub migrate: MigrateConfig,
}

/// `[archive]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    /// Folder to compress. No default; must come from config or `--source`.
    #[serde(default)]
    pub source: Option<PathBuf>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf { PathBuf::from(".") }

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            source: None,
            output_dir: default_output_dir(),
        }
    }
}

/// `[combine]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CombineConfig {
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
    /// Prepend a visual tree of every recursive folder.
    #[serde(default = "default_include_file_structure")]
    pub include_file_structure: bool,
    /// Scanned fully; display paths are relative to the folder's parent.
    #[serde(default)]
    pub recursive_folders: Vec<PathBuf>,
    /// Only direct children are read; display paths are absolute.
    #[serde(default)]
    pub flat_folders: Vec<PathBuf>,
    #[serde(default)]
    pub include_files: Vec<PathBuf>,
    /// Empty means every file is included.
    #[serde(default)]
    pub include_extensions: Vec<String>,
    /// Directory (and file) names skipped while walking.
    #[serde(default)]
    pub exclude_dirs: Vec<String>,
}

fn default_output_file() -> PathBuf { PathBuf::from("combined_code.txt") }
fn default_include_file_structure() -> bool { true }

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            output_file: default_output_file(),
            include_file_structure: default_include_file_structure(),
            recursive_folders: Vec::new(),
            flat_folders: Vec::new(),
            include_files: Vec::new(),
            include_extensions: Vec::new(),
            exclude_dirs: Vec::new(),
        }
    }
}

impl CombineConfig {
    /// Whether `path` passes the extension filter.
    ///
    /// Only the final extension counts (`a.tar.gz` is `gz`). Configured
    /// extensions match case-insensitively, with or without a leading dot.
    pub fn accepts_extension(&self, path: &Path) -> bool {
        if self.include_extensions.is_empty() {
            return true;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.include_extensions
            .iter()
            .any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude_dirs.iter().any(|d| d == name)
    }
}

/// `[migrate]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MigrateConfig {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_tenant_id")]
    pub tenant_id: String,
    /// Collection path; `{tenant}` is replaced with `tenant_id`.
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_name_field")]
    pub name_field: String,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub service_account_key: Option<PathBuf>,
    /// Pre-issued bearer token; takes precedence over the service account.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Skip the interactive confirmation.
    #[serde(default)]
    pub assume_yes: bool,
    /// Compute and log every id but write nothing.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_tenant_id() -> String { "default_tenant".to_string() }
fn default_collection() -> String { "tenants/{tenant}/organizations/hierarchy/nodes".to_string() }
fn default_name_field() -> String { "name".to_string() }
fn default_id_field() -> String { "id".to_string() }
fn default_batch_size() -> usize { 400 }
fn default_base_url() -> String { "https://firestore.googleapis.com".to_string() }

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            tenant_id: default_tenant_id(),
            collection: default_collection(),
            name_field: default_name_field(),
            id_field: default_id_field(),
            batch_size: default_batch_size(),
            service_account_key: None,
            access_token: None,
            base_url: default_base_url(),
            assume_yes: false,
            dry_run: false,
        }
    }
}

/// A configuration value that cannot be used as given.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("batch_size must be between 1 and {max}, got {0}", max = MAX_BATCH_SIZE)]
    BatchSize(usize),
    #[error("collection path is empty")]
    EmptyCollection,
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("no project id: set migrate.project_id or pass --project")]
    MissingProjectId,
}

impl MigrateConfig {
    /// The collection path with `{tenant}` substituted.
    pub fn collection_path(&self) -> String {
        self.collection
            .replace("{tenant}", &self.tenant_id)
            .trim_matches('/')
            .to_string()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::BatchSize(self.batch_size));
        }
        if self.collection_path().is_empty() {
            return Err(ConfigError::EmptyCollection);
        }
        if self.name_field.is_empty() {
            return Err(ConfigError::EmptyField("name_field"));
        }
        if self.id_field.is_empty() {
            return Err(ConfigError::EmptyField("id_field"));
        }
        Ok(())
    }

    pub fn require_project_id(&self) -> Result<&str, ConfigError> {
        self.project_id
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingProjectId)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load the layered configuration. `explicit`, when given, must exist.
    /// Creates the user file with defaults if it does not exist.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = config_path();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, DEFAULT_CONFIG.trim_start())?;
        }

        Self::layered(Some(&path), explicit)
    }

    /// Build from the defaults plus the given files and the environment,
    /// without creating anything on disk.
    pub fn layered(user: Option<&Path>, explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml));
        if let Some(user) = user {
            builder = builder.add_source(config::File::from(user).required(false));
        }
        if let Some(explicit) = explicit {
            builder = builder.add_source(config::File::from(explicit).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix("TOOLBELT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("toolbelt")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

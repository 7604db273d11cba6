//! Test builders: configuration values with test-friendly defaults.
//!
//! These start from the built-in defaults so harnesses only spell out what
//! they actually exercise.

use std::path::{Path, PathBuf};
use toolbelt_core::config::{CombineConfig, Config, MigrateConfig};

/// Combine settings rooted at `root`: output in `root/out/combined.txt`,
/// default extensions and exclusions, no folders selected yet.
pub fn combine_config(root: &Path) -> CombineConfig {
    CombineConfig {
        output_file: root.join("out").join("combined.txt"),
        ..Config::defaults().combine
    }
}

/// Fluent builder for [`MigrateConfig`] pointed at a fake server.
pub struct MigrateConfigBuilder {
    cfg: MigrateConfig,
}

impl MigrateConfigBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            cfg: MigrateConfig {
                project_id: Some("walld".into()),
                base_url: base_url.into(),
                assume_yes: true,
                ..Config::defaults().migrate
            },
        }
    }

    pub fn tenant(mut self, tenant: &str) -> Self {
        self.cfg.tenant_id = tenant.into();
        self
    }

    pub fn token(mut self, token: &str) -> Self {
        self.cfg.access_token = Some(token.into());
        self
    }

    pub fn key(mut self, path: PathBuf) -> Self {
        self.cfg.service_account_key = Some(path);
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.cfg.batch_size = n;
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.cfg.dry_run = true;
        self
    }

    pub fn build(self) -> MigrateConfig {
        self.cfg
    }
}

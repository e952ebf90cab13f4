//! Configuration loaders for success and failure paths.

use std::ffi::OsString;
use std::fs;
use std::sync::Arc;

use camino::Utf8PathBuf;
use hostbridge_config::Config;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use crate::bootstrap::ConfigLoader;

/// Loader for an ephemeral loopback port with an optional registry file in
/// a temporary directory.
pub struct TestConfigLoader {
    dir: TempDir,
    commands_file: Option<Utf8PathBuf>,
}

impl TestConfigLoader {
    /// Exposes every built-in command.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temporary directory"),
            commands_file: None,
        }
    }

    /// Points the configuration at a registry file holding `contents`.
    #[must_use]
    pub fn with_registry(mut self, contents: &str) -> Self {
        let path = self.registry_path();
        fs::write(&path, contents).expect("write registry file");
        self.commands_file = Some(path);
        self
    }

    /// Returns where the registry file lives.
    #[must_use]
    pub fn registry_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().join("commands.json"))
            .expect("temporary path is UTF-8")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            listen_port: 0,
            log_filter: String::from("warn"),
            commands_file: self.commands_file.clone(),
            ..Config::default()
        })
    }
}

/// Loader that fails by passing an invalid port on the command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("hostbridged"),
            OsString::from("--listen-port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}

//! Immutable command descriptors.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use hostbridge_config::{CommandConfig, DeveloperInfo};

/// Placeholder replaced by the host version in module paths.
pub const VERSION_PLACEHOLDER: &str = "{VERSION}";

/// Where a command implementation comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSource {
    /// The compiled-in catalogue.
    Builtin,
    /// A plugin manifest on disk.
    Manifest(Utf8PathBuf),
}

/// Registration metadata for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    name: String,
    enabled: bool,
    supported_host_versions: Vec<String>,
    module_path: String,
    description: String,
    developer: DeveloperInfo,
    timeout: Option<Duration>,
}

impl CommandDescriptor {
    /// Describes an enabled built-in command available on every host version.
    pub fn builtin(name: impl Into<String>) -> Self {
        Self::from(CommandConfig::new(name, hostbridge_config::BUILTIN_MODULE))
    }

    /// Returns the command name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether the command should be loaded.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the host versions the command declares support for.
    #[must_use]
    pub fn supported_host_versions(&self) -> &[String] {
        &self.supported_host_versions
    }

    /// Returns `true` when the command can run on `host_version`. An empty
    /// version list supports every host.
    #[must_use]
    pub fn supports(&self, host_version: &str) -> bool {
        self.supported_host_versions.is_empty()
            || self
                .supported_host_versions
                .iter()
                .any(|version| version == host_version)
    }

    /// Returns the raw module path, placeholders included.
    #[must_use]
    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    /// Resolves the module path for a host version.
    ///
    /// `{VERSION}` is replaced by `host_version`; relative paths are joined
    /// onto `commands_dir` when one is given.
    #[must_use]
    pub fn module_source(&self, host_version: &str, commands_dir: Option<&Utf8Path>) -> ModuleSource {
        let trimmed = self.module_path.trim();
        if trimmed.eq_ignore_ascii_case(hostbridge_config::BUILTIN_MODULE) {
            return ModuleSource::Builtin;
        }
        let substituted = Utf8PathBuf::from(trimmed.replace(VERSION_PLACEHOLDER, host_version));
        let resolved = match commands_dir {
            Some(dir) if substituted.is_relative() => dir.join(substituted),
            _ => substituted,
        };
        ModuleSource::Manifest(resolved)
    }

    /// Returns the free-form description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the developer provenance.
    #[must_use]
    pub const fn developer(&self) -> &DeveloperInfo {
        &self.developer
    }

    /// Returns the per-command timeout override.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Overrides the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl From<CommandConfig> for CommandDescriptor {
    fn from(config: CommandConfig) -> Self {
        Self {
            name: config.command_name.trim().to_owned(),
            enabled: config.enabled,
            supported_host_versions: config.supported_host_versions,
            module_path: config.module_path,
            description: config.description,
            developer: config.developer,
            timeout: config.timeout_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn descriptor(module_path: &str) -> CommandDescriptor {
        CommandDescriptor::from(CommandConfig::new("create_wall", module_path))
    }

    #[test]
    fn builtin_paths_resolve_to_catalogue() {
        assert_eq!(
            descriptor(" builtin ").module_source("2025", None),
            ModuleSource::Builtin
        );
    }

    #[rstest]
    #[case("plugins/{VERSION}/walls.json", Some("/opt/cmds"), "/opt/cmds/plugins/2025/walls.json")]
    #[case("/abs/{VERSION}.json", Some("/opt/cmds"), "/abs/2025.json")]
    #[case("walls.json", None, "walls.json")]
    fn substitutes_version_and_resolves_relative_paths(
        #[case] module_path: &str,
        #[case] commands_dir: Option<&str>,
        #[case] expected: &str,
    ) {
        let source = descriptor(module_path).module_source("2025", commands_dir.map(Utf8Path::new));
        assert_eq!(source, ModuleSource::Manifest(Utf8PathBuf::from(expected)));
    }

    #[rstest]
    #[case(&[], "2025", true)]
    #[case(&["2024", "2025"], "2025", true)]
    #[case(&["2023"], "2025", false)]
    fn checks_host_version_support(
        #[case] versions: &[&str],
        #[case] host: &str,
        #[case] expected: bool,
    ) {
        let mut config = CommandConfig::new("x", "builtin");
        config.supported_host_versions = versions.iter().map(|v| (*v).to_owned()).collect();
        assert_eq!(CommandDescriptor::from(config).supports(host), expected);
    }

    #[test]
    fn converts_timeout_overrides() {
        let mut config = CommandConfig::new("x", "builtin");
        config.timeout_ms = Some(2_500);
        let descriptor = CommandDescriptor::from(config);
        assert_eq!(descriptor.timeout(), Some(Duration::from_millis(2_500)));
    }
}

//! Unit tests for the command loader.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::document::Document;
use crate::plugin::PluginResponse;
use crate::tests::{MockExecutor, StubCommand};

struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    fn write(&self, relative: &str, contents: &str) -> Utf8PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directories");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    fn registry(&self, commands: serde_json::Value) -> Utf8PathBuf {
        self.write("commands.json", &json!({ "commands": commands }).to_string())
    }

    fn loader(&self, registry: &Utf8Path) -> CommandLoader {
        CommandLoader::new(catalog(), HostHandle::new("2025"))
            .with_commands_file(Some(registry.to_path_buf()))
            .with_commands_dir(Some(self.root.clone()))
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
    Workspace { _dir: dir, root }
}

fn catalog() -> BuiltinCatalog {
    BuiltinCatalog::new()
        .with("say_hello", || Box::new(StubCommand::new("say_hello")))
        .with("slow", || {
            Box::new(StubCommand::with_timeout("slow", Duration::from_secs(2)))
        })
        .with("broken", || Box::new(StubCommand::failing_initialise("broken")))
        .with("twice", || Box::new(StubCommand::new("twice")))
        .with("twice", || Box::new(StubCommand::new("twice")))
}

fn wall_manifest(commands: &[&str]) -> String {
    let declared: Vec<_> = commands.iter().map(|name| json!({ "name": name })).collect();
    json!({
        "name": "walls",
        "version": "1.0.0",
        "executable": "bin/walls",
        "commands": declared,
    })
    .to_string()
}

#[test]
fn without_a_registry_file_every_builtin_is_described() {
    let loader = CommandLoader::new(catalog(), HostHandle::new("2025"));
    let names: Vec<_> = loader
        .descriptors()
        .expect("descriptors")
        .iter()
        .map(|descriptor| descriptor.name().to_owned())
        .collect();
    assert_eq!(names, ["say_hello", "slow", "broken", "twice", "twice"]);
}

#[rstest]
fn missing_registry_file_loads_nothing(workspace: Workspace) {
    let loader = workspace.loader(&workspace.root.join("absent.json"));
    let (table, report) = loader.build_table().expect("build");
    assert!(table.is_empty());
    assert_eq!(report, LoadReport::default());
}

#[rstest]
fn malformed_registry_file_fails_the_load(workspace: Workspace) {
    let path = workspace.write("commands.json", "{ not json");
    let loader = workspace.loader(&path);
    let error = loader.build_table().expect_err("parse failure");
    assert!(matches!(error, LoadError::RegistryFile(_)));
}

#[rstest]
fn builtin_commands_are_initialised_with_the_host(workspace: Workspace) {
    let path = workspace.registry(json!([
        { "commandName": "say_hello", "modulePath": "builtin" }
    ]));
    let (table, report) = workspace.loader(&path).build_table().expect("build");
    assert_eq!(report.loaded, ["say_hello"]);

    let entry = table.get("say_hello").expect("registered");
    let job = entry.command().prepare(None, None).expect("prepare");
    let result = job(&mut Document::default()).expect("run");
    assert_eq!(result["host"], json!("2025"));
}

#[rstest]
fn disabled_and_incompatible_entries_are_skipped(workspace: Workspace) {
    let path = workspace.registry(json!([
        { "commandName": "say_hello", "modulePath": "builtin", "enabled": false },
        { "commandName": "slow", "modulePath": "builtin", "supportedHostVersions": ["2023"] },
    ]));
    let (table, report) = workspace.loader(&path).build_table().expect("build");
    assert!(table.is_empty());
    assert_eq!(report.disabled, ["say_hello"]);
    assert_eq!(report.incompatible, ["slow"]);
}

#[rstest]
fn descriptor_timeout_is_carried_into_the_table(workspace: Workspace) {
    let path = workspace.registry(json!([
        { "commandName": "slow", "modulePath": "builtin", "timeoutMs": 250 }
    ]));
    let (table, _) = workspace.loader(&path).build_table().expect("build");
    let entry = table.get("slow").expect("registered");
    assert_eq!(entry.descriptor().timeout(), Some(Duration::from_millis(250)));
    assert_eq!(entry.command().default_timeout(), Some(Duration::from_secs(2)));
}

#[rstest]
#[case::unknown_builtin("missing", "builtin", "is not declared")]
#[case::ambiguous_builtin("twice", "builtin", "declared 2 times")]
#[case::initialise_failure("broken", "builtin", "failed to initialise")]
#[case::missing_manifest("create_wall", "plugins/absent.json", "create_wall")]
fn failing_entries_are_reported_and_skipped(
    workspace: Workspace,
    #[case] name: &str,
    #[case] module: &str,
    #[case] reason: &str,
) {
    let path = workspace.registry(json!([
        { "commandName": name, "modulePath": module },
        { "commandName": "say_hello", "modulePath": "builtin" },
    ]));
    let (table, report) = workspace.loader(&path).build_table().expect("build");

    assert_eq!(table.names().into_iter().collect::<Vec<_>>(), ["say_hello"]);
    let [failed] = report.failed.as_slice() else {
        panic!("expected one failure, got {:?}", report.failed);
    };
    assert_eq!(failed.name, name);
    assert!(
        failed.reason.contains(reason),
        "reason '{}' should mention '{reason}'",
        failed.reason
    );
}

#[rstest]
fn plugin_paths_substitute_the_host_version(workspace: Workspace) {
    workspace.write("plugins/2025/walls.json", &wall_manifest(&["create_wall"]));
    let path = workspace.registry(json!([
        { "commandName": "create_wall", "modulePath": "plugins/{VERSION}/walls.json" }
    ]));

    let mut executor = MockExecutor::new();
    executor
        .expect_execute()
        .once()
        .returning(|manifest, request| {
            assert!(manifest.executable().ends_with("plugins/2025/bin/walls"));
            assert_eq!(request.host_version, "2025");
            Ok(PluginResponse::success(json!({ "created": 1 })))
        });
    let loader = workspace.loader(&path).with_executor(Arc::new(executor));

    let (table, report) = loader.build_table().expect("build");
    assert_eq!(report.loaded, ["create_wall"]);
    let job = table
        .get("create_wall")
        .expect("registered")
        .command()
        .prepare(None, None)
        .expect("prepare");
    assert_eq!(job(&mut Document::default()), Ok(json!({ "created": 1 })));
}

#[rstest]
#[case::undeclared(&["create_floor"], "is not declared")]
#[case::ambiguous(&["create_wall", "create_wall"], "declared 2 times")]
fn manifest_must_declare_the_command_once(
    workspace: Workspace,
    #[case] declared: &[&str],
    #[case] reason: &str,
) {
    workspace.write("walls.json", &wall_manifest(declared));
    let path = workspace.registry(json!([
        { "commandName": "create_wall", "modulePath": "walls.json" }
    ]));
    let (table, report) = workspace.loader(&path).build_table().expect("build");
    assert!(table.is_empty());
    assert!(report.failed[0].reason.contains(reason));
}

#[rstest]
fn duplicate_names_keep_the_later_entry(workspace: Workspace) {
    let path = workspace.registry(json!([
        { "commandName": "say_hello", "modulePath": "builtin", "description": "first" },
        { "commandName": "say_hello", "modulePath": "builtin", "description": "second" },
    ]));
    let (table, report) = workspace.loader(&path).build_table().expect("build");
    assert_eq!(table.len(), 1);
    assert_eq!(report.replaced, ["say_hello"]);
    let entry = table.get("say_hello").expect("registered");
    assert_eq!(entry.descriptor().description(), "second");
}

#[rstest]
fn reload_publishes_new_table(workspace: Workspace) {
    let path = workspace.registry(json!([
        { "commandName": "say_hello", "modulePath": "builtin" }
    ]));
    let loader = workspace.loader(&path);
    let registry = CommandRegistry::new();
    loader.reload(&registry).expect("initial load");
    assert!(registry.resolve("say_hello").is_ok());

    workspace.registry(json!([
        { "commandName": "slow", "modulePath": "builtin" }
    ]));
    let report = loader.reload(&registry).expect("reload");
    assert_eq!(report.loaded, ["slow"]);
    assert!(registry.resolve("say_hello").is_err());
    assert!(registry.resolve("slow").is_ok());
}

#[rstest]
fn reload_keeps_current_table_when_file_is_malformed(workspace: Workspace) {
    let path = workspace.registry(json!([
        { "commandName": "say_hello", "modulePath": "builtin" }
    ]));
    let loader = workspace.loader(&path);
    let registry = CommandRegistry::new();
    loader.reload(&registry).expect("initial load");

    workspace.write("commands.json", "[");
    assert!(loader.reload(&registry).is_err());
    assert!(registry.resolve("say_hello").is_ok());
}

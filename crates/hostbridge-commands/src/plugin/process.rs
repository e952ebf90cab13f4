//! Process-based plugin execution.
//!
//! [`ProcessExecutor`] implements [`PluginExecutor`] by spawning the
//! plugin executable with piped stdio, writing the request as a single
//! JSONL line, reading one response line, and enforcing the manifest's
//! process budget. A plugin that overruns its budget is killed.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStderr, Command, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::PluginExecutor;
use super::error::PluginError;
use super::manifest::PluginManifest;
use super::protocol::{PluginRequest, PluginResponse};

/// Tracing target for plugin process operations.
const PLUGIN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::plugin::process");

/// Interval between exit-status polls.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Executes plugins by spawning child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl PluginExecutor for ProcessExecutor {
    fn execute(
        &self,
        manifest: &PluginManifest,
        request: &PluginRequest,
    ) -> Result<PluginResponse, PluginError> {
        execute_process(manifest, request)
    }
}

/// Spawns the plugin process, writes the request, reads the response.
fn execute_process(
    manifest: &PluginManifest,
    request: &PluginRequest,
) -> Result<PluginResponse, PluginError> {
    let name = manifest.name();
    let started = Instant::now();
    let budget = Duration::from_secs(manifest.timeout_secs());

    debug!(
        target: PLUGIN_TARGET,
        plugin = name,
        executable = %manifest.executable().display(),
        command = %request.command,
        "spawning plugin process"
    );

    let mut child = Command::new(manifest.executable())
        .args(manifest.args())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| spawn_error(manifest, err))?;

    let stderr = child.stderr.take().map(collect_stderr);
    let outcome = exchange(manifest, &mut child, request, started, budget);
    if outcome.is_err() {
        // Grandchildren may still hold stderr open, so the collector is
        // left to finish on its own.
        terminate(&mut child);
        return outcome;
    }
    drain_stderr(name, stderr);
    outcome
}

fn exchange(
    manifest: &PluginManifest,
    child: &mut Child,
    request: &PluginRequest,
    started: Instant,
    budget: Duration,
) -> Result<PluginResponse, PluginError> {
    let name = manifest.name();
    let stdin = child.stdin.take().ok_or_else(|| PluginError::SpawnFailed {
        name: name.to_owned(),
        message: String::from("failed to capture stdin"),
        source: None,
    })?;
    let stdout = child.stdout.take().ok_or_else(|| PluginError::SpawnFailed {
        name: name.to_owned(),
        message: String::from("failed to capture stdout"),
        source: None,
    })?;

    write_request(name, stdin, request)?;
    let line = read_response(manifest, stdout, budget)?;
    wait_for_exit(manifest, child, budget.saturating_sub(started.elapsed()))?;
    parse_response(name, &line)
}

fn spawn_error(manifest: &PluginManifest, err: std::io::Error) -> PluginError {
    if err.kind() == std::io::ErrorKind::NotFound {
        return PluginError::ExecutableNotFound {
            name: manifest.name().to_owned(),
            path: manifest.executable().to_path_buf(),
        };
    }
    PluginError::SpawnFailed {
        name: manifest.name().to_owned(),
        message: err.to_string(),
        source: Some(Arc::new(err)),
    }
}

/// Writes the serialised request to the plugin's stdin and closes it.
fn write_request(
    name: &str,
    mut stdin: impl Write,
    request: &PluginRequest,
) -> Result<(), PluginError> {
    let json =
        serde_json::to_string(request).map_err(|err| PluginError::SerializeRequest(Arc::new(err)))?;

    debug!(
        target: PLUGIN_TARGET,
        plugin = name,
        request_bytes = json.len(),
        "writing request to plugin stdin"
    );

    let io_error = |err| PluginError::Io {
        name: name.to_owned(),
        source: Arc::new(err),
    };
    stdin.write_all(json.as_bytes()).map_err(io_error)?;
    stdin.write_all(b"\n").map_err(io_error)?;
    stdin.flush().map_err(io_error)?;
    // Dropping stdin closes the pipe so the plugin sees end of input.
    Ok(())
}

/// Reads a single JSONL line from stdout within the budget.
fn read_response(
    manifest: &PluginManifest,
    stdout: impl Read + Send + 'static,
    budget: Duration,
) -> Result<String, PluginError> {
    let name = manifest.name();
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        let result = reader.read_line(&mut line).map(|bytes| (bytes, line));
        drop(sender.send(result));
    });

    let (bytes_read, line) = match receiver.recv_timeout(budget) {
        Ok(Ok(read)) => read,
        Ok(Err(err)) => {
            return Err(PluginError::Io {
                name: name.to_owned(),
                source: Arc::new(err),
            });
        }
        Err(RecvTimeoutError::Timeout) => return Err(timeout_error(manifest)),
        Err(RecvTimeoutError::Disconnected) => {
            return Err(PluginError::InvalidOutput {
                name: name.to_owned(),
                message: String::from("stdout reader stopped unexpectedly"),
            });
        }
    };

    debug!(
        target: PLUGIN_TARGET,
        plugin = name,
        bytes_read,
        "read response from plugin stdout"
    );

    if bytes_read == 0 {
        return Err(PluginError::InvalidOutput {
            name: name.to_owned(),
            message: String::from("plugin produced no output on stdout"),
        });
    }
    Ok(line)
}

/// Waits for the child process to exit within the remaining budget.
fn wait_for_exit(
    manifest: &PluginManifest,
    child: &mut Child,
    remaining: Duration,
) -> Result<(), PluginError> {
    let name = manifest.name();
    let deadline = Instant::now() + remaining;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!(target: PLUGIN_TARGET, plugin = name, ?status, "plugin process exited");
                if status.success() {
                    return Ok(());
                }
                return Err(PluginError::NonZeroExit {
                    name: name.to_owned(),
                    status: status.code().unwrap_or(-1),
                });
            }
            Ok(None) if Instant::now() >= deadline => return Err(timeout_error(manifest)),
            Ok(None) => thread::sleep(EXIT_POLL_INTERVAL),
            Err(err) => {
                return Err(PluginError::Io {
                    name: name.to_owned(),
                    source: Arc::new(err),
                });
            }
        }
    }
}

fn timeout_error(manifest: &PluginManifest) -> PluginError {
    warn!(
        target: PLUGIN_TARGET,
        plugin = manifest.name(),
        timeout_secs = manifest.timeout_secs(),
        "plugin exceeded its budget, killing process"
    );
    PluginError::Timeout {
        name: manifest.name().to_owned(),
        timeout_secs: manifest.timeout_secs(),
    }
}

/// Kills and reaps a child that failed or overran.
fn terminate(child: &mut Child) {
    drop(child.kill());
    drop(child.wait());
}

/// Reads stderr on a helper thread so the child never blocks on a full pipe.
fn collect_stderr(pipe: ChildStderr) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buffer = String::new();
        drop(BufReader::new(pipe).read_to_string(&mut buffer));
        buffer
    })
}

fn drain_stderr(name: &str, handle: Option<JoinHandle<String>>) {
    let Some(reader) = handle else {
        return;
    };
    if let Ok(buffer) = reader.join() {
        if !buffer.trim().is_empty() {
            debug!(
                target: PLUGIN_TARGET,
                plugin = name,
                stderr = %buffer.trim(),
                "plugin stderr output"
            );
        }
    }
}

/// Parses a JSONL response line into a [`PluginResponse`].
fn parse_response(name: &str, line: &str) -> Result<PluginResponse, PluginError> {
    serde_json::from_str(line.trim()).map_err(|err| PluginError::DeserializeResponse {
        name: name.to_owned(),
        source: Arc::new(err),
    })
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    use serde_json::{Value, json};
    use tempfile::TempDir;

    use super::*;

    fn script(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("plugin.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        let mut permissions = fs::metadata(&path).expect("metadata").permissions();
        permissions.set_mode(0o755);
        fs::set_permissions(&path, permissions).expect("chmod");
        path
    }

    fn request() -> PluginRequest {
        PluginRequest {
            command: "create_wall".into(),
            params: Value::Null,
            request_id: Some("1".into()),
            host_version: "2025".into(),
        }
    }

    #[test]
    fn runs_plugin_and_parses_response() {
        let dir = TempDir::new().expect("temp dir");
        let executable = script(
            &dir,
            r#"read line; echo '{"success":true,"result":{"walls":1}}'"#,
        );
        let manifest = PluginManifest::new("walls", "1", executable);
        let response = ProcessExecutor
            .execute(&manifest, &request())
            .expect("execute");
        assert_eq!(response.into_result("walls"), Ok(json!({"walls": 1})));
    }

    #[test]
    fn plugin_sees_the_request_line() {
        let dir = TempDir::new().expect("temp dir");
        let executable = script(
            &dir,
            r#"read line; case "$line" in *'"hostVersion":"2025"'*) echo '{"success":true}';; *) echo '{"success":false}';; esac"#,
        );
        let manifest = PluginManifest::new("echo", "1", executable);
        let response = ProcessExecutor
            .execute(&manifest, &request())
            .expect("execute");
        assert!(response.success);
    }

    #[test]
    fn non_zero_exit_is_reported() {
        let dir = TempDir::new().expect("temp dir");
        let executable = script(&dir, r#"read line; echo '{"success":true}'; exit 3"#);
        let manifest = PluginManifest::new("failing", "1", executable);
        let error = ProcessExecutor
            .execute(&manifest, &request())
            .expect_err("must fail");
        assert!(matches!(error, PluginError::NonZeroExit { status: 3, .. }));
    }

    #[test]
    fn silent_plugin_is_invalid_output() {
        let dir = TempDir::new().expect("temp dir");
        let executable = script(&dir, "read line");
        let manifest = PluginManifest::new("silent", "1", executable);
        let error = ProcessExecutor
            .execute(&manifest, &request())
            .expect_err("must fail");
        assert!(matches!(error, PluginError::InvalidOutput { .. }));
    }

    #[test]
    fn slow_plugin_is_killed_after_budget() {
        let dir = TempDir::new().expect("temp dir");
        let executable = script(&dir, "read line; exec sleep 30");
        let manifest = PluginManifest::new("slow", "1", executable).with_timeout_secs(1);
        let started = Instant::now();
        let error = ProcessExecutor
            .execute(&manifest, &request())
            .expect_err("must time out");
        assert!(matches!(error, PluginError::Timeout { timeout_secs: 1, .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn missing_executable_is_reported() {
        let manifest = PluginManifest::new("ghost", "1", PathBuf::from("/nonexistent/ghost"));
        let error = ProcessExecutor
            .execute(&manifest, &request())
            .expect_err("must fail");
        assert!(matches!(error, PluginError::ExecutableNotFound { .. }));
    }
}

//! Launch orchestration: pin the app root, run pre-flight checks, resolve an
//! interpreter, spawn the server, and block until it exits.

pub mod error;

use std::io::BufRead;
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;

use crate::config::LauncherConfig;
use crate::python_env;
use crate::workdir;
use error::LauncherError;

pub struct Launcher {
    config: LauncherConfig,
}

impl Launcher {
    pub fn new(config: LauncherConfig) -> Self {
        Self { config }
    }

    /// Full launch sequence. Returns once the server process has exited (or
    /// was never spawned). The child's exit status is logged, never acted on.
    pub async fn run(&self) -> Result<(), LauncherError> {
        let root = self.resolve_root()?;

        let entry = root.join(&self.config.entry_point);
        if !entry.is_file() {
            return Err(LauncherError::EntryPointMissing {
                script: self.config.entry_point.clone(),
                dir: root.display().to_string(),
            });
        }

        // Working directory is pinned before any resolution step so relative
        // probes and the server itself see the same sibling files. Pre-flight
        // failures above return without touching process state.
        std::env::set_current_dir(&root)
            .map_err(|e| anyhow::anyhow!("cannot enter {}: {}", root.display(), e))?;
        tracing::info!("Application root: {}", root.display());

        if check_server_running(self.config.port) {
            tracing::warn!(
                "A server is already listening on port {} — not starting a second one",
                self.config.port
            );
            return Ok(());
        }

        let interpreter = python_env::resolve(&root, &self.config.venv_dir).await?;
        tracing::info!(
            "Resolved interpreter ({}): {}{}",
            interpreter.source.describe(),
            interpreter.command.display(),
            interpreter
                .version
                .as_deref()
                .map(|v| format!(" [{}]", v))
                .unwrap_or_default()
        );

        self.spawn_and_wait(&root, &interpreter).await
    }

    /// App root: explicit config/env override, else marker search.
    pub fn resolve_root(&self) -> Result<PathBuf, LauncherError> {
        workdir::find_app_root(&self.config.entry_point, self.config.app_dir.as_deref())
            .ok_or_else(|| LauncherError::AppRootNotFound(self.config.entry_point.clone()))
    }

    /// Spawn the server and block until it exits. Ctrl+C terminates the child
    /// so the console comes back cleanly instead of orphaning the server.
    async fn spawn_and_wait(
        &self,
        root: &Path,
        interpreter: &python_env::Interpreter,
    ) -> Result<(), LauncherError> {
        let venv_dir = root.join(&self.config.venv_dir);

        let mut cmd = Command::new(&interpreter.command);
        cmd.arg(&self.config.entry_point).current_dir(root);
        for (key, value) in interpreter.child_env(&venv_dir) {
            cmd.env(key, value);
        }

        tracing::info!(
            "Starting server: {} {}",
            interpreter.command.display(),
            self.config.entry_point
        );
        let mut child = cmd.spawn().map_err(LauncherError::SpawnFailed)?;
        if let Some(pid) = child.id() {
            tracing::info!("Server running (pid: {}) — press Ctrl+C to stop", pid);
        }

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = tokio::signal::ctrl_c() => None,
        };

        match waited {
            Some(Ok(status)) => tracing::info!("Server exited: {}", status),
            Some(Err(e)) => tracing::warn!("Failed to observe server exit: {}", e),
            None => {
                tracing::info!("Ctrl+C received, stopping server...");
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to stop server process: {}", e);
                }
                let _ = child.wait().await;
            }
        }

        Ok(())
    }
}

/// True when something already accepts connections on the server port.
/// TCP connect only — no protocol is spoken.
pub fn check_server_running(port: u16) -> bool {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    TcpStream::connect_timeout(&addr, Duration::from_millis(500)).is_ok()
}

/// Interactive variant: hold the console open until the user acknowledges.
pub fn wait_for_ack() {
    println!("Press Enter to close...");
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
}

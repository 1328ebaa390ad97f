//! Python interpreter resolution.
//!
//! Mirrors the resolution order of the original `start_server` shell scripts,
//! first match wins:
//! 1. Virtual environment next to the app (`venv/`) — detected by its
//!    activation script, invoked via its own interpreter binary.
//! 2. Bundled portable Python (`python/` next to the app), invoked by
//!    absolute path.
//! 3. The `py` launcher command on PATH.
//! 4. A generic `python` / `python3` command on PATH.
//!
//! Exactly one step is taken per launch. Filesystem candidates that exist but
//! fail the version probe are skipped with a warning instead of being handed
//! a server they cannot start.

use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::launcher::error::LauncherError;
use crate::utils::apply_creation_flags;

/// PATH-based candidates, probed in order after the filesystem steps.
const PATH_CANDIDATES: &[(&str, InterpreterSource)] = &[
    ("py", InterpreterSource::PyLauncher),
    ("python", InterpreterSource::System),
    ("python3", InterpreterSource::System),
];

/// Which resolution step produced the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterSource {
    /// Virtual environment under the app root.
    Venv,
    /// Portable Python bundled next to the app.
    Bundled,
    /// The `py` launcher on PATH.
    PyLauncher,
    /// Generic `python` / `python3` on PATH.
    System,
}

impl InterpreterSource {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Venv => "virtual environment",
            Self::Bundled => "bundled interpreter",
            Self::PyLauncher => "py launcher",
            Self::System => "system python",
        }
    }
}

/// Outcome of resolution: what to invoke and where it came from.
#[derive(Debug, Clone)]
pub struct Interpreter {
    pub source: InterpreterSource,
    /// Absolute path (venv/bundled) or bare command name (PATH steps).
    pub command: PathBuf,
    /// `python --version` output, when the probe returned one.
    pub version: Option<String>,
}

impl Interpreter {
    /// Extra environment for the child process. For a venv interpreter this
    /// is the native equivalent of sourcing the activation script: set
    /// `VIRTUAL_ENV` and put the venv's bin directory first on PATH so
    /// subprocesses of the server resolve the same interpreter.
    pub fn child_env(&self, venv_dir: &Path) -> Vec<(String, String)> {
        if self.source != InterpreterSource::Venv {
            return Vec::new();
        }
        let bin = venv_bin_dir(venv_dir);
        let sep = if cfg!(target_os = "windows") { ';' } else { ':' };
        let path = std::env::var("PATH").unwrap_or_default();
        vec![
            ("VIRTUAL_ENV".to_string(), venv_dir.to_string_lossy().into_owned()),
            (
                "PATH".to_string(),
                format!("{}{}{}", bin.to_string_lossy(), sep, path),
            ),
        ]
    }
}

// ═══════════════════════════════════════════════════════════════
//  Resolution
// ═══════════════════════════════════════════════════════════════

/// Resolve an interpreter for the app at `root`. Steps are attempted strictly
/// in order and only the first usable one is taken.
pub async fn resolve(root: &Path, venv_dir_name: &str) -> Result<Interpreter, LauncherError> {
    let mut probed: Vec<String> = Vec::new();
    let venv_dir = root.join(venv_dir_name);

    // ── Step 1: virtual environment ──
    let activate = activation_script(&venv_dir);
    if activate.exists() {
        let exe = venv_python_exe(&venv_dir);
        if exe.is_file() && verify_python(&exe).await {
            tracing::info!("Using virtual environment: {}", venv_dir.display());
            return Ok(finish(InterpreterSource::Venv, exe).await);
        }
        tracing::warn!(
            "Activation script present but venv interpreter unusable, skipping: {}",
            exe.display()
        );
    }
    probed.push(format!("venv at {}", venv_dir.display()));

    // ── Step 2: bundled portable Python ──
    let bundled = bundled_python_exe(root);
    if bundled.is_file() {
        if verify_python(&bundled).await {
            tracing::info!("Using bundled interpreter: {}", bundled.display());
            return Ok(finish(InterpreterSource::Bundled, bundled).await);
        }
        tracing::warn!("Bundled interpreter unusable, skipping: {}", bundled.display());
    }
    probed.push(format!("bundled at {}", bundled.display()));

    // ── Steps 3–4: PATH commands ──
    for (name, source) in PATH_CANDIDATES {
        if probe_command(name).await {
            tracing::info!("Using {} from PATH: {}", source.describe(), name);
            return Ok(finish(*source, PathBuf::from(name)).await);
        }
        probed.push(format!("'{}' on PATH", name));
    }

    Err(LauncherError::NoInterpreter {
        probed: probed.join(", "),
    })
}

async fn finish(source: InterpreterSource, command: PathBuf) -> Interpreter {
    let version = get_version(&command).await.ok();
    if let Some(ver) = &version {
        if let Some((major, minor)) = parse_python_version(ver) {
            tracing::debug!("Resolved interpreter reports Python {}.{}", major, minor);
        }
    }
    Interpreter {
        source,
        command,
        version,
    }
}

/// Diagnostic report of every resolution candidate on this machine. Printed
/// when nothing resolves, so the user sees what was looked for and where.
pub async fn status(root: &Path, venv_dir_name: &str) -> serde_json::Value {
    let venv_dir = root.join(venv_dir_name);
    let activate = activation_script(&venv_dir);
    let venv_exe = venv_python_exe(&venv_dir);
    let bundled = bundled_python_exe(root);

    let mut info = serde_json::json!({
        "app_root": root.to_string_lossy(),
        "venv_activation_script": activate.to_string_lossy(),
        "venv_activation_present": activate.exists(),
        "venv_python": venv_exe.to_string_lossy(),
        "venv_python_present": venv_exe.is_file(),
        "bundled_python": bundled.to_string_lossy(),
        "bundled_python_present": bundled.is_file(),
    });

    for (name, _) in PATH_CANDIDATES {
        info[format!("{}_on_path", name)] = serde_json::json!(probe_command(name).await);
    }

    info
}

// ═══════════════════════════════════════════════════════════════
//  Conventional paths
// ═══════════════════════════════════════════════════════════════

/// Activation script the shell launchers sourced. Its presence is the venv
/// detection signal; the launcher never actually sources it.
pub fn activation_script(venv_dir: &Path) -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        venv_dir.join("Scripts").join("activate.bat")
    }
    #[cfg(not(target_os = "windows"))]
    {
        venv_dir.join("bin").join("activate")
    }
}

/// Interpreter binary inside a venv.
pub fn venv_python_exe(venv_dir: &Path) -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        venv_dir.join("Scripts").join("python.exe")
    }
    #[cfg(not(target_os = "windows"))]
    {
        venv_dir.join("bin").join("python")
    }
}

/// Scripts/bin directory of a venv, for PATH prepending.
pub fn venv_bin_dir(venv_dir: &Path) -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        venv_dir.join("Scripts")
    }
    #[cfg(not(target_os = "windows"))]
    {
        venv_dir.join("bin")
    }
}

/// Portable Python laid out next to the app.
/// Layout: `<root>/python/python.exe` (Windows) or `<root>/python/bin/python3`.
pub fn bundled_python_exe(root: &Path) -> PathBuf {
    let base = root.join("python");
    #[cfg(target_os = "windows")]
    {
        base.join("python.exe")
    }
    #[cfg(not(target_os = "windows"))]
    {
        base.join("bin").join("python3")
    }
}

// ═══════════════════════════════════════════════════════════════
//  Probes
// ═══════════════════════════════════════════════════════════════

/// True when `name --version` runs and exits successfully.
pub async fn probe_command(name: &str) -> bool {
    let mut cmd = Command::new(name);
    cmd.arg("--version");
    apply_creation_flags(&mut cmd);
    matches!(cmd.output().await, Ok(o) if o.status.success())
}

/// Check a filesystem interpreter actually executes before committing to it.
async fn verify_python(exe: &Path) -> bool {
    let mut cmd = Command::new(exe);
    cmd.args([
        "-c",
        "import sys; v=sys.version_info; print(f'{v.major}.{v.minor}.{v.micro}')",
    ]);
    apply_creation_flags(&mut cmd);
    matches!(cmd.output().await, Ok(o) if o.status.success())
}

/// `--version` output of the resolved interpreter, trimmed.
async fn get_version(command: &Path) -> anyhow::Result<String> {
    let mut cmd = Command::new(command);
    cmd.arg("--version");
    apply_creation_flags(&mut cmd);
    let output = cmd.output().await?;
    // Python 2 wrote the version banner to stderr; tolerate both streams.
    let text = if output.stdout.is_empty() {
        String::from_utf8_lossy(&output.stderr).trim().to_string()
    } else {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    };
    Ok(text)
}

/// "Python 3.12.8" → (3, 12)
pub fn parse_python_version(s: &str) -> Option<(u32, u32)> {
    let s = s.trim();
    let ver_part = s
        .strip_prefix("Python ")
        .or_else(|| s.strip_prefix("python "))
        .unwrap_or(s);
    let parts: Vec<&str> = ver_part.split('.').collect();
    if parts.len() >= 2 {
        let major = parts[0].trim().parse().ok()?;
        let minor = parts[1].trim().parse().ok()?;
        Some((major, minor))
    } else {
        None
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_python_version() {
        assert_eq!(parse_python_version("Python 3.12.8"), Some((3, 12)));
        assert_eq!(parse_python_version("Python 3.10.0"), Some((3, 10)));
        assert_eq!(parse_python_version("Python 2.7.18"), Some((2, 7)));
        assert_eq!(parse_python_version("  Python 3.11.5  "), Some((3, 11)));
        assert_eq!(parse_python_version("3.12.1"), Some((3, 12)));
        assert_eq!(parse_python_version("garbage"), None);
        assert_eq!(parse_python_version(""), None);
    }

    #[test]
    fn test_activation_script_path() {
        let venv = PathBuf::from(if cfg!(target_os = "windows") {
            "C:\\app\\venv"
        } else {
            "/srv/app/venv"
        });
        let script = activation_script(&venv);
        #[cfg(target_os = "windows")]
        assert!(script.to_string_lossy().ends_with("Scripts\\activate.bat"));
        #[cfg(not(target_os = "windows"))]
        assert!(script.to_string_lossy().ends_with("bin/activate"));
    }

    #[test]
    fn test_venv_python_exe_path() {
        let venv = PathBuf::from(if cfg!(target_os = "windows") {
            "C:\\app\\venv"
        } else {
            "/srv/app/venv"
        });
        let exe = venv_python_exe(&venv);
        #[cfg(target_os = "windows")]
        assert!(exe.to_string_lossy().contains("Scripts\\python.exe"));
        #[cfg(not(target_os = "windows"))]
        assert!(exe.to_string_lossy().ends_with("bin/python"));
    }

    #[test]
    fn test_bundled_python_exe_path() {
        let root = PathBuf::from(if cfg!(target_os = "windows") {
            "C:\\app"
        } else {
            "/srv/app"
        });
        let exe = bundled_python_exe(&root);
        let s = exe.to_string_lossy();
        assert!(s.contains("python"));
        #[cfg(not(target_os = "windows"))]
        assert!(s.ends_with("python/bin/python3"));
    }

    #[test]
    fn test_path_candidates_order() {
        // The py launcher is tried before the generic names.
        assert_eq!(PATH_CANDIDATES[0].0, "py");
        assert_eq!(PATH_CANDIDATES[1].0, "python");
        assert_eq!(PATH_CANDIDATES[2].0, "python3");
    }

    #[test]
    fn test_child_env_only_for_venv() {
        let venv = PathBuf::from("/srv/app/venv");
        let system = Interpreter {
            source: InterpreterSource::System,
            command: PathBuf::from("python3"),
            version: None,
        };
        assert!(system.child_env(&venv).is_empty());

        let from_venv = Interpreter {
            source: InterpreterSource::Venv,
            command: venv_python_exe(&venv),
            version: None,
        };
        let env = from_venv.child_env(&venv);
        let virtual_env = env.iter().find(|(k, _)| k == "VIRTUAL_ENV").unwrap();
        assert_eq!(virtual_env.1, venv.to_string_lossy());
        let path = env.iter().find(|(k, _)| k == "PATH").unwrap();
        assert!(path.1.starts_with(&venv_bin_dir(&venv).to_string_lossy().into_owned()));
    }

    #[tokio::test]
    async fn test_probe_missing_command_is_false() {
        assert!(!probe_command("definitely-not-a-python-3141").await);
    }

    #[tokio::test]
    async fn test_status_reports_all_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let s = status(dir.path(), "venv").await;
        assert_eq!(s["venv_activation_present"], false);
        assert_eq!(s["bundled_python_present"], false);
        assert!(s.get("py_on_path").is_some());
        assert!(s.get("python_on_path").is_some());
        assert!(s.get("python3_on_path").is_some());
    }
}

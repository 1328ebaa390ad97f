use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_ENTRY_POINT: &str = "app.py";
pub const DEFAULT_VENV_DIR: &str = "venv";
/// Flask default port — app.py binds 0.0.0.0:5000.
pub const DEFAULT_PORT: u16 = 5000;

const CONFIG_PATH: &str = "config/launcher.toml";

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LauncherConfig {
    /// Script the resolved interpreter is handed as its single argument.
    pub entry_point: String,
    /// Virtual-environment directory name, relative to the app root.
    pub venv_dir: String,
    /// Port the server binds; probed to refuse a duplicate launch.
    pub port: u16,
    /// Interactive variant: wait for a keypress after the server exits.
    pub pause_on_exit: bool,
    /// Explicit app root. When set, marker-based discovery is skipped.
    pub app_dir: Option<PathBuf>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            venv_dir: DEFAULT_VENV_DIR.to_string(),
            port: DEFAULT_PORT,
            pause_on_exit: false,
            app_dir: None,
        }
    }
}

impl LauncherConfig {
    /// Load `config/launcher.toml` (optional) and layer `CONVSRV_*` env
    /// overrides on top. A missing or corrupt file never blocks launch.
    pub fn load() -> Self {
        let mut cfg = Self::load_file(CONFIG_PATH);
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg
    }

    fn load_file(path: &str) -> Self {
        let s = std::fs::read_to_string(path).unwrap_or_default();
        match toml::from_str::<Self>(&s) {
            Ok(cfg) => cfg,
            Err(e) => {
                if !s.is_empty() {
                    tracing::warn!("Ignoring unparsable {}: {}", path, e);
                }
                Self::default()
            }
        }
    }

    /// Env overrides beat file values. Injectable lookup keeps tests off the
    /// process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CONVSRV_ENTRY_POINT") {
            self.entry_point = v;
        }
        if let Some(v) = lookup("CONVSRV_VENV_DIR") {
            self.venv_dir = v;
        }
        if let Some(v) = lookup("CONVSRV_PORT") {
            match v.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => tracing::warn!("Ignoring invalid CONVSRV_PORT: {}", v),
            }
        }
        if let Some(v) = lookup("CONVSRV_PAUSE") {
            self.pause_on_exit = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(v) = lookup("CONVSRV_APP_DIR") {
            self.app_dir = Some(PathBuf::from(v));
        }
    }
}

//! Launcher error taxonomy — one variant per distinct pre-flight failure so
//! the binary can print a targeted diagnostic instead of a generic message.

/// Errors that stop the server from being launched.
#[derive(thiserror::Error, Debug)]
pub enum LauncherError {
    #[error("application root not found: no directory containing '{0}' near the current directory")]
    AppRootNotFound(String),

    #[error("entry point '{script}' not found in {dir}")]
    EntryPointMissing { script: String, dir: String },

    #[error("no usable Python interpreter found (probed: {probed})")]
    NoInterpreter { probed: String },

    #[error("failed to start server process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_interpreter_message_lists_probes() {
        let err = LauncherError::NoInterpreter {
            probed: "venv at /srv/app/venv, 'python' on PATH".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("no usable Python interpreter"));
        assert!(msg.contains("'python' on PATH"));
    }

    #[test]
    fn test_entry_point_message_names_script_and_dir() {
        let err = LauncherError::EntryPointMissing {
            script: "app.py".to_string(),
            dir: "/srv/app".to_string(),
        };
        assert_eq!(err.to_string(), "entry point 'app.py' not found in /srv/app");
    }
}

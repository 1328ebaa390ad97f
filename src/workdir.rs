//! Application-root discovery.
//!
//! The launcher may be invoked from anywhere; sibling resources (the entry
//! point, the venv, the bundled interpreter) are located relative to the app
//! root, so the root is pinned down before any interpreter resolution runs.

use std::path::{Path, PathBuf};

/// How far up from the invocation directory the marker search walks.
const MAX_WALK_UP: usize = 5;

/// Locate the directory containing `entry_point`.
///
/// An explicit `override_dir` (config/env) always wins, even if the entry
/// point is missing there — the caller surfaces that as its own error rather
/// than silently searching elsewhere.
pub fn find_app_root(entry_point: &str, override_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = override_dir {
        return Some(dir.to_path_buf());
    }

    if let Ok(cwd) = std::env::current_dir() {
        if let Some(root) = search_upwards(&cwd, entry_point, MAX_WALK_UP) {
            return Some(root);
        }
    }

    // Double-clicked / symlinked invocations: try the binary's own directory.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            if exe_dir.join(entry_point).is_file() {
                return Some(exe_dir.to_path_buf());
            }
        }
    }

    None
}

/// Walk up from `start` looking for a directory that contains `marker`.
pub fn search_upwards(start: &Path, marker: &str, max_depth: usize) -> Option<PathBuf> {
    let mut candidate = start.to_path_buf();
    for _ in 0..=max_depth {
        if candidate.join(marker).is_file() {
            return Some(candidate);
        }
        match candidate.parent() {
            Some(p) => candidate = p.to_path_buf(),
            None => break,
        }
    }
    None
}

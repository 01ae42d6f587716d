use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Marker file identifying the root of the project being built.
pub const PROJECT_MARKER: &str = "CMakeLists.txt";

fn find_upwards(start: &Path, filename: &str) -> Option<PathBuf> {
    let mut dir = if start.is_dir() {
        start.to_path_buf()
    } else {
        start.parent().unwrap_or(start).to_path_buf()
    };

    loop {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }

        if !dir.pop() {
            break;
        }
    }

    None
}

/// Nearest ancestor of `start` (inclusive) that holds a `CMakeLists.txt`.
pub fn project_root_from(start: &Path) -> Result<PathBuf> {
    let marker = find_upwards(start, PROJECT_MARKER).ok_or_else(|| {
        Error::Config(format!(
            "{PROJECT_MARKER} not found above {} (run from within the project or pass --root)",
            start.display()
        ))
    })?;

    Ok(marker.parent().unwrap_or(marker.as_path()).to_path_buf())
}

pub fn project_root() -> Result<PathBuf> {
    let cwd = std::env::current_dir().map_err(|e| Error::io("reading current directory", e))?;
    project_root_from(&cwd)
}

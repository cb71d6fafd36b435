use crate::error::{Result, ScanError};
use std::path::{Path, PathBuf};

/// Where GitHub Actions keeps workflow files inside a repository.
pub const WORKFLOWS_DIR: &str = ".github/workflows";

/// Find workflow files to scan.
///
/// A file is returned as-is. A repository root (a directory with `.github/`)
/// yields the top-level `*.yml` / `*.yaml` of `.github/workflows`, or nothing
/// when that directory is missing. The workflows directory itself is searched
/// the same way. Any other directory is searched recursively.
pub fn discover_workflow_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        return Err(ScanError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "path does not exist"),
        });
    }

    let (search_root, recursive) = if path.join(".github").is_dir() {
        let workflows = path.join(WORKFLOWS_DIR);
        if !workflows.is_dir() {
            log::debug!("'{}' has no {} directory", path.display(), WORKFLOWS_DIR);
            return Ok(Vec::new());
        }
        (workflows, false)
    } else if path.ends_with(WORKFLOWS_DIR) {
        (path.to_path_buf(), false)
    } else {
        (path.to_path_buf(), true)
    };

    let escaped = glob::Pattern::escape(&search_root.to_string_lossy());
    let depth = if recursive { "**/" } else { "" };
    let mut files = Vec::new();
    for ext in ["yml", "yaml"] {
        let pattern = format!("{}/{}*.{}", escaped, depth, ext);
        let entries = glob::glob(&pattern).map_err(|e| ScanError::Discovery {
            path: search_root.clone(),
            message: e.to_string(),
        })?;
        for entry in entries {
            match entry {
                Ok(file) if file.is_file() => files.push(file),
                Ok(_) => {}
                Err(e) => log::warn!("skipping unreadable path: {}", e),
            }
        }
    }

    files.sort();
    files.dedup();
    log::debug!(
        "discovered {} workflow file(s) under '{}'",
        files.len(),
        search_root.display()
    );
    Ok(files)
}

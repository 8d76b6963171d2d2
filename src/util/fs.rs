//! Filesystem utilities.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::core::error::{BerthError, BerthResult};

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> BerthResult<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| BerthError::io(path, e))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> BerthResult<String> {
    fs::read_to_string(path).map_err(|e| BerthError::io(path, e))
}

/// Read a file if it exists.
pub fn read_optional(path: &Path) -> BerthResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(BerthError::io(path, e)),
    }
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> BerthResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).map_err(|e| BerthError::io(path, e))
}

/// Replace a file's contents atomically.
///
/// The new contents are written to a temporary file in the same directory
/// and renamed over the target, so readers see either the old or the new
/// document, never a truncated one.
pub fn write_atomic(path: &Path, contents: &str) -> BerthResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(dir)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| BerthError::io(dir, e))?;
    tmp.write_all(contents.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| BerthError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| BerthError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_replaces_contents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Berth.toml");

        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let entries: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_read_optional() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing.env");
        assert!(read_optional(&path).unwrap().is_none());

        write_string(&path, "A=1").unwrap();
        assert_eq!(read_optional(&path).unwrap().as_deref(), Some("A=1"));
    }
}

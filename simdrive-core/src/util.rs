//! Contains a collection of useful utility functions.

use std::fs::read;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::Result;

/// Create a static deser object from given path using serde.
///
/// Format is picked based on the file extension, defaulting to toml.
pub fn deser_struct_from_path<T>(file_path: &Path) -> Result<T>
where
    for<'de> T: serde::Deserialize<'de>,
{
    let bytes = read(file_path).map_err(|e| {
        Error::IoError(format!("{}: {}", file_path.to_string_lossy(), e))
    })?;
    let d: T = match file_path.extension().and_then(|e| e.to_str()) {
        #[cfg(feature = "yaml")]
        Some("yaml") | Some("yml") => serde_yaml::from_slice(&bytes)?,
        _ => toml::from_slice(&bytes)?,
    };
    Ok(d)
}

/// Resolves a possibly relative path against the given base directory.
pub fn resolve_against(base: Option<&Path>, path: &Path) -> PathBuf {
    match base {
        Some(dir) if path.is_relative() && !path.as_os_str().is_empty() => dir.join(path),
        _ => path.to_path_buf(),
    }
}

#[test]
fn resolve_relative_paths() {
    let base = Path::new("/data/batches");
    assert_eq!(
        resolve_against(Some(base), Path::new("line.spp")),
        PathBuf::from("/data/batches/line.spp")
    );
    assert_eq!(
        resolve_against(Some(base), Path::new("/models/line.spp")),
        PathBuf::from("/models/line.spp")
    );
    assert_eq!(
        resolve_against(None, Path::new("line.spp")),
        PathBuf::from("line.spp")
    );
}

//! Artifact directory scanning helpers.

use std::path::{Path, PathBuf};

use crate::error::DlrResult;

/// List the regular files directly under `dir` (non-recursive), sorted by path.
pub fn list_files_in_directory(dir: impl AsRef<Path>) -> DlrResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir.as_ref())? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// List the regular files of several directories, in directory order.
pub fn list_files_in_directories<P: AsRef<Path>>(dirs: &[P]) -> DlrResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for dir in dirs {
        files.extend(list_files_in_directory(dir)?);
    }
    Ok(files)
}

/// File name component of `path` as UTF-8, or `""`.
pub fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// Whether the file name of `path` ends with `suffix`.
pub fn file_name_ends_with(path: &Path, suffix: &str) -> bool {
    file_name(path).ends_with(suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_only_regular_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.so"), b"").unwrap();
        std::fs::write(dir.path().join("a.json"), b"{}").unwrap();
        std::fs::create_dir(dir.path().join("nested.so")).unwrap();
        std::fs::write(dir.path().join("nested.so").join("c.so"), b"").unwrap();

        let files = list_files_in_directory(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["a.json", "b.so"]);
    }

    #[test]
    fn test_multiple_directories() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(first.path().join("x.so"), b"").unwrap();
        std::fs::write(second.path().join("y.so"), b"").unwrap();

        let files = list_files_in_directories(&[first.path(), second.path()]).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(file_name(&files[1]), "y.so");
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let err = list_files_in_directory("/definitely/not/here").unwrap_err();
        assert!(matches!(err, crate::DlrError::Io(_)));
    }

    #[test]
    fn test_suffix_matching() {
        assert!(file_name_ends_with(
            Path::new("/m/resnet_hexagon_model.so"),
            "_hexagon_model.so"
        ));
        assert!(!file_name_ends_with(Path::new("/m/_hexagon_model.so.bak"), "_hexagon_model.so"));
    }
}

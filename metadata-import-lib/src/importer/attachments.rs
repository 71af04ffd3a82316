use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::ImportError;

/// Finds the first file under `root` (searched recursively, in file-name
/// order) whose trailing path components equal `filename`.
pub fn find_file_path(root: &Path, filename: &str) -> Result<PathBuf, ImportError> {
    let wanted = Path::new(filename.trim());
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && entry.path().ends_with(wanted) {
                    tracing::debug!("Found attachment {} at {}", filename, entry.path().display());
                    return Ok(entry.into_path());
                }
            }
            Err(e) => {
                tracing::warn!("Error accessing entry: {}", e);
            }
        }
    }

    Err(ImportError::MissingAttachment {
        filename: filename.to_string(),
        root: root.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("animals")).unwrap();
        fs::write(dir.path().join("darlingtonia.png"), b"png").unwrap();
        fs::write(dir.path().join("animals").join("cat.png"), b"png").unwrap();
        dir
    }

    #[test]
    fn finds_files_in_subdirectories() {
        let dir = fixture();
        let found = find_file_path(dir.path(), "cat.png").unwrap();
        assert_eq!(found, dir.path().join("animals").join("cat.png"));
    }

    #[test]
    fn accepts_relative_subpaths() {
        let dir = fixture();
        let found = find_file_path(dir.path(), "animals/cat.png").unwrap();
        assert!(found.ends_with("animals/cat.png"));
    }

    #[test]
    fn missing_files_are_errors() {
        let dir = fixture();
        let result = find_file_path(dir.path(), "foo.png");
        assert!(matches!(
            result,
            Err(ImportError::MissingAttachment { filename, .. }) if filename == "foo.png"
        ));
    }

    #[test]
    fn directories_do_not_match() {
        let dir = fixture();
        assert!(find_file_path(dir.path(), "animals").is_err());
    }
}

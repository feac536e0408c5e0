use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const MSG_EXTENSION: &str = "msg";

/// Turns command line arguments into the list of items to process.
///
/// File arguments are kept as given, even when they do not exist, so that
/// the failure is reported for that item. Directory arguments are replaced by
/// the `.msg` files they contain, sorted by path.
#[derive(Debug, Clone, Default)]
pub struct InputScanner {
    recursive: bool,
}

impl InputScanner {
    pub fn new(recursive: bool) -> Self {
        Self { recursive }
    }

    pub fn expand<P: AsRef<Path>>(&self, arguments: &[P]) -> Vec<PathBuf> {
        let mut items = Vec::new();

        for argument in arguments {
            let path = argument.as_ref();
            if path.is_dir() {
                let found = self.scan_directory(path);
                tracing::debug!(directory = %path.display(), files = found.len(), "Expanded directory");
                items.extend(found);
            } else {
                items.push(path.to_path_buf());
            }
        }

        items
    }

    fn scan_directory(&self, root: &Path) -> Vec<PathBuf> {
        let max_depth = if self.recursive { usize::MAX } else { 1 };

        let walker = WalkDir::new(root)
            .max_depth(max_depth)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "Skipping unreadable directory entry");
                    continue;
                }
            };

            if is_msg_file(&entry) {
                files.push(entry.into_path());
            }
        }

        files
    }
}

fn is_msg_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file()
        && entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(MSG_EXTENSION))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_files_are_kept_in_order() {
        let items = InputScanner::new(false).expand(&["b.msg", "missing.msg", "a.msg"]);
        assert_eq!(
            items,
            vec![
                PathBuf::from("b.msg"),
                PathBuf::from("missing.msg"),
                PathBuf::from("a.msg")
            ]
        );
    }

    #[test]
    fn test_directory_expansion() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        touch(&root.join("b.msg"));
        touch(&root.join("a.MSG"));
        touch(&root.join("notes.txt"));
        touch(&root.join("nested/c.msg"));

        let flat = InputScanner::new(false).expand(&[root]);
        assert_eq!(flat, vec![root.join("a.MSG"), root.join("b.msg")]);

        let deep = InputScanner::new(true).expand(&[root]);
        assert_eq!(
            deep,
            vec![root.join("a.MSG"), root.join("b.msg"), root.join("nested/c.msg")]
        );
    }

    #[test]
    fn test_mixed_arguments_keep_argument_order() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("inbox");
        touch(&dir.join("one.msg"));

        let items = InputScanner::new(false).expand(&[PathBuf::from("first.msg"), dir.clone()]);
        assert_eq!(items, vec![PathBuf::from("first.msg"), dir.join("one.msg")]);
    }
}

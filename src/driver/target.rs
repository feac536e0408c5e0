use crate::error::{MsgExtractError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Destination as requested on the command line, before resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationRequest {
    pub path: Option<PathBuf>,
    pub archive: bool,
}

impl DestinationRequest {
    pub fn new(path: Option<PathBuf>, archive: bool) -> Self {
        Self { path, archive }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum TargetKind {
    #[default]
    Directory,
    Archive,
    /// One `<folder>.zip` per message inside the target directory.
    ArchivePerMessage,
}

/// Where the outputs of every item in a batch go.
///
/// Paths are absolute once resolved, so later changes to the process working
/// directory do not move the outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputTarget {
    path: PathBuf,
    kind: TargetKind,
}

impl OutputTarget {
    /// Resolves a request once per run.
    ///
    /// Relative paths are joined onto `initial_dir`, the working directory
    /// captured at startup. Directory targets are created (with parents)
    /// before returning.
    pub fn resolve(request: &DestinationRequest, initial_dir: &Path) -> Result<Self> {
        let requested = request.path.as_ref().map(|path| initial_dir.join(path));

        if request.archive {
            let target = match requested {
                Some(path) => Self::archive(path),
                None => Self::archive_per_message(initial_dir),
            };
            tracing::debug!(path = %target.path.display(), "Using archive output");
            return Ok(target);
        }

        let path = match requested {
            Some(path) => {
                fs::create_dir_all(&path).map_err(|e| MsgExtractError::OutputDirectory {
                    path: path.display().to_string(),
                    source: e,
                })?;
                tracing::debug!(path = %path.display(), "Using output directory");
                path
            }
            None => initial_dir.to_path_buf(),
        };

        Ok(Self::directory(path))
    }

    pub fn directory<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            kind: TargetKind::Directory,
        }
    }

    pub fn archive<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            kind: TargetKind::Archive,
        }
    }

    /// Archive output with no archive name: each message gets `<folder>.zip`
    /// inside `dir`.
    pub fn archive_per_message<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            path: dir.into(),
            kind: TargetKind::ArchivePerMessage,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_archive(&self) -> bool {
        self.kind != TargetKind::Directory
    }

    /// The zip file a message saved under `folder` goes into, or `None` for
    /// directory output.
    pub fn archive_file(&self, folder: &str) -> Option<PathBuf> {
        match self.kind {
            TargetKind::Directory => None,
            TargetKind::Archive => Some(self.path.clone()),
            TargetKind::ArchivePerMessage => Some(self.path.join(format!("{}.zip", folder))),
        }
    }
}

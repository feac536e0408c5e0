use crate::driver::target::OutputTarget;
use crate::error::Result;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Destination for the files of one saved message.
///
/// Directory sinks write into `<target>/<folder>/`, archive sinks into
/// `<folder>/` inside a zip file. File names are made unique within the folder.
pub struct OutputSink {
    kind: SinkKind,
    names: HashSet<String>,
}

enum SinkKind {
    Directory {
        folder: PathBuf,
    },
    Archive {
        path: PathBuf,
        prefix: String,
        writer: ZipWriter<File>,
    },
}

impl OutputSink {
    pub fn open(target: &OutputTarget, folder: &str) -> Result<Self> {
        let kind = match target.archive_file(folder) {
            Some(path) => open_archive(path, folder)?,
            None => {
                let folder = unique_directory(target.path(), folder);
                fs::create_dir_all(&folder)?;
                SinkKind::Directory { folder }
            }
        };

        Ok(Self {
            kind,
            names: HashSet::new(),
        })
    }

    /// Writes one file and returns the name it was stored under.
    pub fn write_file(&mut self, name: &str, data: &[u8]) -> Result<String> {
        let name = unique_name(&self.names, name);

        match self.kind {
            SinkKind::Directory { ref folder } => {
                fs::write(folder.join(&name), data)?;
            }
            SinkKind::Archive {
                ref prefix,
                ref mut writer,
                ..
            } => {
                writer.start_file(format!("{}/{}", prefix, name), SimpleFileOptions::default())?;
                writer.write_all(data)?;
            }
        }

        self.names.insert(name.clone());
        Ok(name)
    }

    /// Flushes the sink and returns the folder or archive that was written.
    pub fn finish(self) -> Result<PathBuf> {
        match self.kind {
            SinkKind::Directory { folder } => Ok(folder),
            SinkKind::Archive { path, writer, .. } => {
                writer.finish()?;
                Ok(path)
            }
        }
    }
}

fn open_archive(path: PathBuf, folder: &str) -> Result<SinkKind> {
    if path.exists() {
        let existing = existing_folders(&path)?;
        let prefix = unique_name(&existing, folder);
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let writer = ZipWriter::new_append(file)?;
        tracing::debug!(archive = %path.display(), prefix = %prefix, "Appending to archive");
        Ok(SinkKind::Archive {
            path,
            prefix,
            writer,
        })
    } else {
        let writer = ZipWriter::new(File::create(&path)?);
        Ok(SinkKind::Archive {
            path,
            prefix: folder.to_string(),
            writer,
        })
    }
}

fn existing_folders(path: &Path) -> Result<HashSet<String>> {
    let archive = ZipArchive::new(File::open(path)?)?;
    Ok(archive
        .file_names()
        .filter_map(|name| name.split('/').next())
        .map(str::to_string)
        .collect())
}

const MAX_NAME_CHARS: usize = 100;

/// Makes a subject or attachment name safe to use as a single path component.
pub fn sanitize_filename(name: &str, fallback: &str) -> String {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|ch| match ch {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(MAX_NAME_CHARS)
        .collect();

    // Windows rejects names ending in dots or spaces.
    let sanitized = sanitized.trim_end_matches(&['.', ' '][..]);

    if sanitized.is_empty() {
        fallback.to_string()
    } else {
        sanitized.to_string()
    }
}

fn unique_directory(root: &Path, folder: &str) -> PathBuf {
    let mut candidate = root.join(folder);
    let mut counter = 1;

    while candidate.exists() {
        candidate = root.join(format!("{} ({})", folder, counter));
        counter += 1;
    }

    candidate
}

fn unique_name(taken: &HashSet<String>, name: &str) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }

    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
        _ => (name, ""),
    };

    (1..)
        .map(|n| format!("{} ({}){}", stem, n, extension))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

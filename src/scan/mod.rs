// Directory scan producing the flat file list the analyzers consume

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use walkdir::{DirEntry, WalkDir};

use crate::constants::PATH_SEPARATOR;
use crate::error::{ReelMapError, Result};
use crate::text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Directory,
}

/// One node from a directory scan. `path` is the node's full `/`-separated
/// path (including its own name), rooted at the scanned folder's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl FileRecord {
    pub fn file(path: &str, size: u64) -> Self {
        Self::new(path, FileKind::File, size)
    }

    pub fn directory(path: &str) -> Self {
        Self::new(path, FileKind::Directory, 0)
    }

    fn new(path: &str, kind: FileKind, size: u64) -> Self {
        let name = path.rsplit(PATH_SEPARATOR).next().unwrap_or(path).to_string();
        Self {
            name,
            path: path.to_string(),
            kind,
            size,
            last_modified: None,
        }
    }

    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.last_modified = Some(modified);
        self
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Directory containing this node.
    pub fn dir(&self) -> &str {
        text::parent_dir(&self.path)
    }

    pub fn stem(&self) -> &str {
        text::strip_extension(&self.name)
    }

    pub fn extension(&self) -> Option<String> {
        text::extension(&self.name)
    }

    pub fn has_extension(&self, exts: &[&str]) -> bool {
        self.extension().is_some_and(|ext| exts.contains(&ext.as_str()))
    }
}

/// Walk `root` and return every file and directory below it, sorted by path.
/// Hidden entries are skipped and symlinks are not followed.
pub fn scan_directory(root: &Path) -> Result<Vec<FileRecord>> {
    if !root.is_dir() {
        return Err(ReelMapError::InvalidPath(format!("{} is not a directory", root.display())));
    }

    let root_name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "root".to_string());

    log::info!("Scanning {}", root.display());

    let mut records = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        let relative = match entry.path().strip_prefix(root) {
            Ok(r) => r,
            Err(_) => continue,
        };
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        let path = format!("/{}/{}", root_name, parts.join("/"));

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                log::warn!("Failed to read metadata for {}: {}", entry.path().display(), e);
                continue;
            }
        };

        let mut record = if metadata.is_dir() {
            FileRecord::directory(&path)
        } else if metadata.is_file() {
            FileRecord::file(&path, metadata.len())
        } else {
            continue;
        };
        if let Ok(modified) = metadata.modified() {
            record = record.with_modified(DateTime::<Utc>::from(modified));
        }
        records.push(record);
    }

    records.sort_by(|a, b| a.path.cmp(&b.path));

    log::info!(
        "Scan found {} files and {} directories",
        records.iter().filter(|r| r.is_file()).count(),
        records.iter().filter(|r| r.is_directory()).count()
    );

    Ok(records)
}

/// Map a scanned record path back onto disk below `root`.
pub fn disk_path(root: &Path, record_path: &str) -> PathBuf {
    let mut parts = text::segments(record_path).into_iter();
    // first segment is the scanned folder's own name
    parts.next();
    parts.fold(root.to_path_buf(), |acc, part| acc.join(part))
}

/// Direct children of the directory at `dir_path`.
pub fn children_of<'a>(records: &'a [FileRecord], dir_path: &str) -> Vec<&'a FileRecord> {
    records.iter().filter(|r| r.dir() == dir_path).collect()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_record_helpers() {
        let rec = FileRecord::file("/Shoot/A001/A001_C001_000.R3D", 42);
        assert_eq!(rec.name, "A001_C001_000.R3D");
        assert_eq!(rec.dir(), "/Shoot/A001");
        assert_eq!(rec.stem(), "A001_C001_000");
        assert_eq!(rec.extension().as_deref(), Some("r3d"));
        assert!(rec.has_extension(&["r3d", "braw"]));
    }

    #[test]
    fn test_scan_directory_emits_rooted_paths() {
        let dir = TempDir::new().unwrap();
        let shoot = dir.path().join("Shoot");
        fs::create_dir_all(shoot.join("A001")).unwrap();
        fs::write(shoot.join("A001").join("clip.mov"), b"data").unwrap();
        fs::write(shoot.join(".DS_Store"), b"x").unwrap();

        let records = scan_directory(&shoot).unwrap();
        let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();

        assert_eq!(paths, vec!["/Shoot/A001", "/Shoot/A001/clip.mov"]);
        assert!(records[0].is_directory());
        assert_eq!(records[1].size, 4);
        assert!(records[1].last_modified.is_some());
    }

    #[test]
    fn test_scan_rejects_file_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("clip.mov");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(scan_directory(&file), Err(ReelMapError::InvalidPath(_))));
    }

    #[test]
    fn test_disk_path_round_trip() {
        let root = Path::new("/mnt/cards/Shoot");
        assert_eq!(
            disk_path(root, "/Shoot/A001/clip.mov"),
            PathBuf::from("/mnt/cards/Shoot/A001/clip.mov")
        );
    }
}

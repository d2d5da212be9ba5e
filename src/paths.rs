use crate::error::{Error, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Encoding of a per-user dump file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileKind {
    Plain, // <user>.jsonl
    Zstd,  // <user>.jsonl.zst
    Gzip,  // <user>.jsonl.gz
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserFile {
    pub username: String,
    pub kind: FileKind,
    pub path: PathBuf,
}

/// Per-user files directly under `root`, ordered by (username, kind) so that every
/// traversal sees the same storage order. Anything else in the directory is ignored.
pub fn discover_user_files(root: &Path) -> Result<Vec<UserFile>> {
    if !root.is_dir() {
        return Err(Error::config(format!("dataset root {} is not a directory", root.display())));
    }
    let re = Regex::new(r"^(.+)\.jsonl(\.zst|\.gz)?$").map_err(|e| Error::config(e.to_string()))?;

    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let ent = entry.map_err(std::io::Error::from)?;
        if !ent.file_type().is_file() {
            continue;
        }
        let Some(name) = ent.file_name().to_str() else { continue };
        if let Some(caps) = re.captures(name) {
            let kind = match caps.get(2).map(|m| m.as_str()) {
                Some(".zst") => FileKind::Zstd,
                Some(_) => FileKind::Gzip,
                None => FileKind::Plain,
            };
            files.push(UserFile { username: caps[1].to_string(), kind, path: ent.path().to_path_buf() });
        }
    }
    files.sort_by(|a, b| (&a.username, a.kind).cmp(&(&b.username, b.kind)));
    tracing::debug!(root = %root.display(), files = files.len(), "discovered user files");
    Ok(files)
}

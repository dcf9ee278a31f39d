//! # Export Archive
//!
//! Packages a generated unit into a zip holding a single source file.

use crate::error::Result;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;

/// A downloadable archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArchive {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ExportArchive {
    /// Write the archive into `dir` under its file name
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        tracing::info!("[GOBLOCKS] Wrote {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

/// Download name for a package: `github.com/me/app` becomes
/// `github.com.me.app.zip`.
pub fn archive_file_name(package_name: &str) -> String {
    let name = package_name
        .trim()
        .trim_matches('/')
        .replace(|c: char| c == '/' || c == '\\', ".");
    if name.is_empty() {
        "main.zip".to_string()
    } else {
        format!("{}.zip", name)
    }
}

/// Zip bytes with `source` stored (deflated) at `entry_path`
pub fn build_archive(source: &str, entry_path: &str) -> Result<Vec<u8>> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file(entry_path, opts)?;
    zip.write_all(source.as_bytes())?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

pub fn package_archive(source: &str, package_name: &str, entry_path: &str) -> Result<ExportArchive> {
    Ok(ExportArchive {
        file_name: archive_file_name(package_name),
        bytes: build_archive(source, entry_path)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_file_names() {
        assert_eq!(archive_file_name("github.com/me/app"), "github.com.me.app.zip");
        assert_eq!(archive_file_name("  "), "main.zip");
        assert_eq!(archive_file_name("app/"), "app.zip");
    }

    #[test]
    fn test_archive_contains_single_entry() {
        let source = "package main\n\nfunc main() {\n}\n";
        let archive = package_archive(source, "example/app", "cmd/main.go").unwrap();
        assert_eq!(archive.file_name, "example.app.zip");

        let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes)).unwrap();
        assert_eq!(zip.len(), 1);

        let mut entry = zip.by_name("cmd/main.go").unwrap();
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, source);
    }

    #[test]
    fn test_write_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let archive = package_archive("package main\n", "demo", "cmd/main.go").unwrap();
        let path = archive.write_to(dir.path().join("out")).unwrap();
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("demo.zip"));
        assert_eq!(std::fs::read(&path).unwrap(), archive.bytes);
    }
}

//! Attachment collector: binary file payloads held in memory until the
//! owning form submits them.
//!
//! Reads are serial, so collection order always matches the order paths were
//! given. An unreadable file is reported to the caller and logged, never
//! silently dropped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::WireAttachment;

/// Files above this size still upload, but get a log warning first.
pub const SIZE_WARN_BYTES: u64 = 25 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum AttachError {
    #[error("cannot read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no attachment at index {0}")]
    BadIndex(usize),
}

/// Coarse file classification by extension, for list rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Word,
    Excel,
    Image,
    Script,
    Markup,
    Other,
}

impl FileKind {
    pub fn from_name(name: &str) -> Self {
        let ext = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => FileKind::Pdf,
            "doc" | "docx" => FileKind::Word,
            "xls" | "xlsx" => FileKind::Excel,
            "jpg" | "jpeg" | "png" | "gif" => FileKind::Image,
            "js" | "ts" => FileKind::Script,
            "html" | "css" => FileKind::Markup,
            _ => FileKind::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Pdf => "PDF",
            FileKind::Word => "Word",
            FileKind::Excel => "Excel",
            FileKind::Image => "Image",
            FileKind::Script => "Script",
            FileKind::Markup => "Markup",
            FileKind::Other => "File",
        }
    }
}

/// One collected file: original name plus the full content in memory.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub size: u64,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn kind(&self) -> FileKind {
        FileKind::from_name(&self.name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttachmentCollector {
    files: Vec<Attachment>,
}

impl AttachmentCollector {
    pub fn new() -> Self {
        AttachmentCollector::default()
    }

    pub fn files(&self) -> &[Attachment] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Read one file fully into memory and append it.
    pub fn add_path(&mut self, path: &Path) -> Result<(), AttachError> {
        let data = fs::read(path).map_err(|source| AttachError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let size = data.len() as u64;
        if size > SIZE_WARN_BYTES {
            log::warn!("attachment {name} is {size} bytes, upload may be slow");
        }
        self.files.push(Attachment { name, size, data });
        Ok(())
    }

    /// Read several files in order. Failures are logged and returned; the
    /// readable files are still collected.
    pub fn add_paths(&mut self, paths: &[PathBuf]) -> Vec<AttachError> {
        let mut failures = Vec::new();
        for path in paths {
            if let Err(err) = self.add_path(path) {
                log::warn!("{err}");
                failures.push(err);
            }
        }
        failures
    }

    pub fn remove(&mut self, index: usize) -> Option<Attachment> {
        if index < self.files.len() {
            Some(self.files.remove(index))
        } else {
            None
        }
    }

    /// Write an attachment back to disk under its original name. An existing
    /// file with that name is kept; the copy gets a numeric suffix.
    pub fn save_to(&self, dir: &Path, index: usize) -> Result<PathBuf, AttachError> {
        let file = self.files.get(index).ok_or(AttachError::BadIndex(index))?;
        let target = free_path(dir, &file.name);
        fs::write(&target, &file.data).map_err(|source| AttachError::Write {
            path: target.clone(),
            source,
        })?;
        Ok(target)
    }

    /// The collection in its submission form.
    pub fn wire_attachments(&self) -> Vec<WireAttachment> {
        self.files
            .iter()
            .map(|f| WireAttachment {
                name: f.name.clone(),
                data: f.data.clone(),
            })
            .collect()
    }
}

fn free_path(dir: &Path, name: &str) -> PathBuf {
    let first = dir.join(name);
    if !first.exists() {
        return first;
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    let mut n = 1u32;
    loop {
        let candidate = match ext {
            Some(ext) => dir.join(format!("{stem}-{n}.{ext}")),
            None => dir.join(format!("{stem}-{n}")),
        };
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Human-readable size: bytes below 1 KB, otherwise one decimal.
pub fn format_file_size(size: u64) -> String {
    if size < 1024 {
        format!("{size} B")
    } else if size < 1024 * 1024 {
        format!("{:.1} KB", size as f64 / 1024.0)
    } else {
        format!("{:.1} MB", size as f64 / 1024.0 / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(data).unwrap();
        path
    }

    #[test]
    fn test_add_path_reads_bytes_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let data: Vec<u8> = (0u8..=255).cycle().take(70_000).collect();
        let path = write_file(dir.path(), "rapor.pdf", &data);

        let mut collector = AttachmentCollector::new();
        collector.add_path(&path).unwrap();

        assert_eq!(collector.len(), 1);
        let file = &collector.files()[0];
        assert_eq!(file.name, "rapor.pdf");
        assert_eq!(file.size, 70_000);
        assert_eq!(file.data, data);
        assert_eq!(file.kind(), FileKind::Pdf);
    }

    #[test]
    fn test_zero_byte_file_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "bos.txt", b"");

        let mut collector = AttachmentCollector::new();
        collector.add_path(&path).unwrap();
        assert_eq!(collector.files()[0].size, 0);
        assert_eq!(collector.total_size(), 0);
    }

    #[test]
    fn test_unreadable_file_is_reported_not_dropped_silently() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_file(dir.path(), "a.txt", b"ok");
        let missing = dir.path().join("yok.txt");

        let mut collector = AttachmentCollector::new();
        let failures = collector.add_paths(&[missing.clone(), good]);

        assert_eq!(failures.len(), 1);
        match &failures[0] {
            AttachError::Read { path, .. } => assert_eq!(path, &missing),
            other => panic!("unexpected error: {other}"),
        }
        // The readable file still made it in, in input order.
        assert_eq!(collector.len(), 1);
        assert_eq!(collector.files()[0].name, "a.txt");
    }

    #[test]
    fn test_remove_by_index() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a.txt", b"1");
        let b = write_file(dir.path(), "b.txt", b"2");

        let mut collector = AttachmentCollector::new();
        collector.add_paths(&[a, b]);
        assert!(collector.remove(5).is_none());
        let removed = collector.remove(0).unwrap();
        assert_eq!(removed.name, "a.txt");
        assert_eq!(collector.files()[0].name, "b.txt");
    }

    #[test]
    fn test_save_to_round_trip_and_collision_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_file(dir.path(), "veri.bin", &[0, 155, 255, 1]);
        let out = tempfile::tempdir().unwrap();

        let mut collector = AttachmentCollector::new();
        collector.add_path(&src).unwrap();

        let first = collector.save_to(out.path(), 0).unwrap();
        assert_eq!(first.file_name().unwrap(), "veri.bin");
        assert_eq!(fs::read(&first).unwrap(), vec![0, 155, 255, 1]);

        let second = collector.save_to(out.path(), 0).unwrap();
        assert_eq!(second.file_name().unwrap(), "veri-1.bin");

        assert!(matches!(
            collector.save_to(out.path(), 9),
            Err(AttachError::BadIndex(9))
        ));
    }

    #[test]
    fn test_wire_form() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "n.txt", b"abc");
        let mut collector = AttachmentCollector::new();
        collector.add_path(&path).unwrap();

        let wire = collector.wire_attachments();
        assert_eq!(wire[0].name, "n.txt");
        assert_eq!(wire[0].data, b"abc");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(2048), "2.0 KB");
        assert_eq!(format_file_size(1024 * 1024 * 5 + 1024 * 512), "5.5 MB");
    }

    #[test]
    fn test_file_kind_groups() {
        assert_eq!(FileKind::from_name("x.DOCX"), FileKind::Word);
        assert_eq!(FileKind::from_name("foto.jpeg"), FileKind::Image);
        assert_eq!(FileKind::from_name("app.ts"), FileKind::Script);
        assert_eq!(FileKind::from_name("tablo.xls"), FileKind::Excel);
        assert_eq!(FileKind::from_name("serbest"), FileKind::Other);
    }
}

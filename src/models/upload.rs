use std::path::Path;

use crate::models::partner::Partner;

/// Coarse file classification used by partner file policies.
///
/// Detection is by file-name extension only; contents are never sniffed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Spreadsheet,
    Other,
}

impl FileKind {
    pub fn from_file_name(name: &str) -> Self {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("pdf") => FileKind::Pdf,
            Some("xls" | "xlsx" | "xlsm" | "csv") => FileKind::Spreadsheet,
            _ => FileKind::Other,
        }
    }

    /// Classification from a MIME type, as reported for chat attachments.
    pub fn from_mime(mime: &str) -> Self {
        if mime == "application/pdf" {
            FileKind::Pdf
        } else if mime.contains("spreadsheet") || mime == "application/vnd.ms-excel" || mime == "text/csv" {
            FileKind::Spreadsheet
        } else {
            FileKind::Other
        }
    }
}

/// An invoice file picked by the user, held in memory until upload.
#[derive(Debug, Clone)]
pub struct FileHandle {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping only its final path component as name.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_file_name(&self.name)
    }

    /// MIME type for the multipart part, guessed from the extension.
    pub fn mime(&self) -> String {
        mime_guess::from_path(&self.name)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

/// Files chosen for one partner, in the order the user picked them.
#[derive(Debug, Clone)]
pub struct UploadSelection {
    pub partner: Partner,
    pub files: Vec<FileHandle>,
}

impl UploadSelection {
    pub fn new(partner: Partner) -> Self {
        Self {
            partner,
            files: Vec::new(),
        }
    }

    pub fn add(&mut self, file: FileHandle) {
        self.files.push(file);
    }

    /// Remove the file at `index`; out-of-range indices are ignored.
    pub fn remove(&mut self, index: usize) -> Option<FileHandle> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    pub fn has_kind(&self, kind: FileKind) -> bool {
        self.files.iter().any(|f| f.kind() == kind)
    }
}

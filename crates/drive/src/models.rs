//! Provider models.
//!
//! Snapshots of provider state at fetch time. Nothing here is mutated
//! locally; a fresher view means fetching again.

use serde::Deserialize;

/// Well-known mime types.
pub mod mime {
    pub const FOLDER: &str = "application/vnd.google-apps.folder";
    /// Prefix shared by provider-native formats (Docs, Sheets, Slides, ...).
    pub const NATIVE_PREFIX: &str = "application/vnd.google-apps";
    pub const PDF: &str = "application/pdf";

    /// Provider-native documents can only be exported, never downloaded as-is.
    pub fn is_native_document(mime: &str) -> bool {
        mime.contains(NATIVE_PREFIX) && !mime.contains("folder")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Folder,
    File,
}
impl EntryKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime == mime::FOLDER { Self::Folder } else { Self::File }
    }
}

/// A child of a folder, as returned by listing and search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Globally unique within the provider.
    pub id: String,
    pub name: String,
    pub kind: EntryKind,
    pub mime_type: String,
    pub size: Option<u64>,
    pub parent_id: Option<String>,
}
impl RemoteEntry {
    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}

/// Everything the transfer pipeline needs to know about a single file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMetadata {
    pub name: String,
    pub size: Option<u64>,
    pub mime_type: String,
    /// Link to open the file in the provider's own UI.
    pub view_link: Option<String>,
    /// RFC 3339 timestamp, kept verbatim.
    pub modified_time: Option<String>,
    pub parents: Vec<String>,
}
impl FileMetadata {
    pub fn is_native_document(&self) -> bool {
        mime::is_native_document(&self.mime_type)
    }

    /// The name the file will carry once delivered. Native documents are
    /// exported as PDF so gain a `.pdf` suffix.
    pub fn display_name(&self) -> String {
        let name = if self.name.is_empty() { "File" } else { self.name.as_str() };
        if self.is_native_document() { format!("{name}.pdf") } else { name.to_string() }
    }

    pub fn download_format(&self) -> DownloadFormat {
        if self.is_native_document() { DownloadFormat::Export(mime::PDF) } else { DownloadFormat::Raw }
    }
}

/// How file contents are obtained from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadFormat {
    /// Raw bytes, fetched in ranged chunks.
    Raw,
    /// Server-side conversion to the given mime type.
    Export(&'static str),
}

/// One piece of a chunked download, with the provider's own progress signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadChunk {
    pub data: Vec<u8>,
    /// Bytes received so far, including this chunk.
    pub received: u64,
    /// Total size, when the provider reported one.
    pub total: Option<u64>,
}
impl DownloadChunk {
    /// Progress as a floored integer percentage, when the total is known.
    pub fn percent(&self) -> Option<u8> {
        self.total.map(|total| drivebot_asyncutils::percent_of(self.received, total))
    }
}

/// File resource as it appears on the wire (Drive v3 JSON). Sizes arrive as
/// decimal strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireFile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    pub size: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
    pub web_view_link: Option<String>,
    pub modified_time: Option<String>,
}
impl WireFile {
    fn size(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }
}
impl From<WireFile> for RemoteEntry {
    fn from(file: WireFile) -> Self {
        let size = file.size();
        Self {
            kind: EntryKind::from_mime(&file.mime_type),
            parent_id: file.parents.into_iter().next(),
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            size,
        }
    }
}
impl From<WireFile> for FileMetadata {
    fn from(file: WireFile) -> Self {
        let size = file.size();
        Self {
            name: file.name,
            size,
            mime_type: file.mime_type,
            view_link: file.web_view_link,
            modified_time: file.modified_time,
            parents: file.parents,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireFileList {
    #[serde(default)]
    pub files: Vec<WireFile>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("application/vnd.google-apps.document", true)]
    #[case("application/vnd.google-apps.spreadsheet", true)]
    #[case("application/vnd.google-apps.folder", false)]
    #[case("application/pdf", false)]
    #[case("video/mp4", false)]
    fn test_native_document_detection(#[case] mime: &str, #[case] expected: bool) {
        assert_eq!(mime::is_native_document(mime), expected);
    }

    #[test]
    fn test_display_name_gains_pdf_suffix() {
        let meta = FileMetadata {
            name: "Notes".to_string(),
            mime_type: "application/vnd.google-apps.document".to_string(),
            ..Default::default()
        };
        assert_eq!(meta.display_name(), "Notes.pdf");
        assert_eq!(meta.download_format(), DownloadFormat::Export(mime::PDF));

        let meta = FileMetadata {
            name: "Lecture.mp4".to_string(),
            mime_type: "video/mp4".to_string(),
            ..Default::default()
        };
        assert_eq!(meta.display_name(), "Lecture.mp4");
        assert_eq!(meta.download_format(), DownloadFormat::Raw);
    }

    #[test]
    fn test_wire_file_conversion() {
        let json = r#"{
            "id": "abc",
            "name": "Chapter 1.pdf",
            "mimeType": "application/pdf",
            "size": "2048",
            "parents": ["root-id", "other"]
        }"#;
        let wire: WireFile = serde_json::from_str(json).unwrap();
        let entry = RemoteEntry::from(wire);
        assert_eq!(entry.id, "abc");
        assert_eq!(entry.kind, EntryKind::File);
        assert_eq!(entry.size, Some(2048));
        assert_eq!(entry.parent_id.as_deref(), Some("root-id"));
    }

    #[test]
    fn test_wire_folder_without_size() {
        let json = r#"{"id": "f", "name": "Unit 1", "mimeType": "application/vnd.google-apps.folder"}"#;
        let entry = RemoteEntry::from(serde_json::from_str::<WireFile>(json).unwrap());
        assert!(entry.is_folder());
        assert_eq!(entry.size, None);
        assert_eq!(entry.parent_id, None);
    }

    #[rstest]
    #[case(50, Some(100), Some(50))]
    #[case(100, Some(100), Some(100))]
    #[case(1, Some(3), Some(33))]
    #[case(0, Some(0), Some(100))]
    #[case(250, Some(200), Some(100))]
    #[case(10, None, None)]
    fn test_chunk_percent(#[case] received: u64, #[case] total: Option<u64>, #[case] expected: Option<u8>) {
        let chunk = DownloadChunk { data: vec![], received, total };
        assert_eq!(chunk.percent(), expected);
    }
}

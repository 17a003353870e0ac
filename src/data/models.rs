//! Data models
//!
//! Meetings and recording files as parsed from the recordings catalog.
//! Nothing here outlives a run.

use serde::Deserialize;

/// File type accepted for backup
pub const ELIGIBLE_FILE_TYPE: &str = "MP4";

/// Status a file must reach before it is backed up
pub const ELIGIBLE_STATUS: &str = "completed";

// =============================================================================
// Meeting
// =============================================================================

/// One recorded meeting and its eligible files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meeting {
    /// Opaque meeting UUID, used for deletion
    pub id: String,
    /// Display topic (may be empty)
    pub topic: String,
    /// ISO-8601 start timestamp
    pub start_time: String,
    /// Files left after the eligibility filter, in catalog order
    pub files: Vec<RecordingFile>,
}

// =============================================================================
// Recording file
// =============================================================================

/// One media asset of a meeting
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecordingFile {
    #[serde(default)]
    pub recording_start: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub recording_type: String,
    #[serde(default)]
    pub status: String,
}

impl RecordingFile {
    /// Completed MP4 files are the only ones backed up
    pub fn is_eligible(&self) -> bool {
        self.status == ELIGIBLE_STATUS && self.file_type == ELIGIBLE_FILE_TYPE
    }

    /// `<recording_start>-<recording_type>.<lowercased file_type>`
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}.{}",
            self.recording_start,
            self.recording_type,
            self.file_type.to_lowercase()
        )
    }

    /// MIME type for the stored object
    pub fn content_type(&self) -> &'static str {
        if self.file_type == ELIGIBLE_FILE_TYPE {
            "video/mp4"
        } else {
            "application/octet-stream"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(file_type: &str, status: &str) -> RecordingFile {
        RecordingFile {
            recording_start: "2020-09-14T15:02:39Z".to_string(),
            file_type: file_type.to_string(),
            download_url: "https://example.com/rec/download/abc".to_string(),
            recording_type: "shared_screen_with_gallery_views".to_string(),
            status: status.to_string(),
        }
    }

    #[test]
    fn only_completed_mp4_files_are_eligible() {
        let cases = [
            ("MP4", "completed", true),
            ("MP4", "processing", false),
            ("M4A", "completed", false),
            ("mp4", "completed", false),
            ("CHAT", "processing", false),
            ("", "", false),
        ];

        for (file_type, status, expected) in cases {
            assert_eq!(
                file(file_type, status).is_eligible(),
                expected,
                "file_type={file_type} status={status}"
            );
        }
    }

    #[test]
    fn file_name_lowercases_extension() {
        assert_eq!(
            file("MP4", "completed").file_name(),
            "2020-09-14T15:02:39Z-shared_screen_with_gallery_views.mp4"
        );
    }

    #[test]
    fn content_type_follows_file_type() {
        assert_eq!(file("MP4", "completed").content_type(), "video/mp4");
        assert_eq!(
            file("TIMELINE", "completed").content_type(),
            "application/octet-stream"
        );
    }
}

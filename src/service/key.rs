//! Storage key derivation
//!
//! Keys are a pure function of meeting and file attributes, so a re-run
//! overwrites objects it already wrote instead of duplicating them.

use chrono::NaiveDate;

use crate::config::KeyLayout;
use crate::data::{Meeting, RecordingFile};
use crate::error::AppError;

/// Length of the `YYYY-MM-DD` prefix of a start time
const DATE_LENGTH: usize = 10;

/// Canonical key: `<folder>/<recording_start>-<recording_type>.<ext>`
///
/// # Errors
/// `Format` when the meeting start time does not begin with a valid date
///
/// # Example
/// ```ignore
/// // start_time "2020-09-14T15:02:39Z", topic ""
/// // => "09-14-2020/2020-09-14T15:02:39Z-shared_screen_with_gallery_views.mp4"
/// ```
pub fn derive_key(meeting: &Meeting, file: &RecordingFile) -> Result<String, AppError> {
    Ok(format!("{}/{}", meeting_folder(meeting)?, file.file_name()))
}

/// `<topic>-<MM-DD-YYYY>`, or just the date when the topic is empty
pub fn meeting_folder(meeting: &Meeting) -> Result<String, AppError> {
    let prefix = meeting.start_time.get(..DATE_LENGTH).ok_or_else(|| {
        AppError::Format(format!(
            "start time {:?} does not begin with a date",
            meeting.start_time
        ))
    })?;
    let date = NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
        .map_err(|e| AppError::Format(format!("failed to parse date {:?}: {}", prefix, e)))?;
    let date = date.format("%m-%d-%Y");

    if meeting.topic.is_empty() {
        Ok(date.to_string())
    } else {
        Ok(format!("{}-{}", meeting.topic, date))
    }
}

/// Deployment-level key layout: optional fixed prefix plus a layout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPolicy {
    layout: KeyLayout,
    prefix: Option<String>,
}

impl KeyPolicy {
    pub fn new(layout: KeyLayout, prefix: Option<&str>) -> Self {
        let prefix = prefix
            .map(|p| p.trim().trim_matches('/'))
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        Self { layout, prefix }
    }

    /// Key of `file` under this policy
    pub fn key_for(&self, meeting: &Meeting, file: &RecordingFile) -> Result<String, AppError> {
        let key = match self.layout {
            KeyLayout::Folder => derive_key(meeting, file)?,
            KeyLayout::Flat => file.file_name(),
        };

        Ok(match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix, key),
            None => key,
        })
    }
}

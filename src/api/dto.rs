//! Recordings API response DTOs
//!
//! Wire shapes of the cloud recordings list endpoint.

use serde::Deserialize;

use crate::data::{Meeting, RecordingFile};

/// Response of `GET /users/{userId}/recordings`
#[derive(Debug, Clone, Deserialize)]
pub struct RecordingListResponse {
    #[serde(default)]
    pub meetings: Vec<MeetingResponse>,
}

/// One meeting entry of the recordings list
#[derive(Debug, Clone, Deserialize)]
pub struct MeetingResponse {
    pub uuid: String,
    #[serde(default)]
    pub topic: String,
    pub start_time: String,
    #[serde(default)]
    pub recording_files: Vec<RecordingFile>,
}

impl RecordingListResponse {
    /// Convert to meetings, keeping only eligible files
    ///
    /// Meetings left without files are kept.
    pub fn into_meetings(self) -> Vec<Meeting> {
        self.meetings
            .into_iter()
            .map(|meeting| Meeting {
                id: meeting.uuid,
                topic: meeting.topic,
                start_time: meeting.start_time,
                files: meeting
                    .recording_files
                    .into_iter()
                    .filter(RecordingFile::is_eligible)
                    .collect(),
            })
            .collect()
    }
}

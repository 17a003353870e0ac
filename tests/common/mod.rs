//! Common test utilities for E2E tests
//!
//! Serves a fake recordings API on a random local port and records every
//! call the job makes against it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get},
};
use recsync::config::{self, AppConfig};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const TOKEN: &str = "test-token";
pub const USER_ID: &str = "user@example.com";
pub const BUCKET: &str = "recordings";

/// A recording file served by the fake API
#[derive(Debug, Clone)]
pub struct FakeFile {
    pub name: String,
    pub recording_start: String,
    pub recording_type: String,
    pub file_type: String,
    pub status: String,
    pub body: Vec<u8>,
}

impl FakeFile {
    /// A completed MP4 file
    pub fn mp4(name: &str, recording_type: &str, body: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            recording_start: "2020-09-14T15:02:39Z".to_string(),
            recording_type: recording_type.to_string(),
            file_type: "MP4".to_string(),
            status: "completed".to_string(),
            body: body.to_vec(),
        }
    }
}

/// A meeting served by the fake API
#[derive(Debug, Clone)]
pub struct FakeMeeting {
    pub uuid: String,
    pub topic: String,
    pub start_time: String,
    pub files: Vec<FakeFile>,
}

impl FakeMeeting {
    pub fn new(uuid: &str, topic: &str, files: Vec<FakeFile>) -> Self {
        Self {
            uuid: uuid.to_string(),
            topic: topic.to_string(),
            start_time: "2020-09-14T15:02:39Z".to_string(),
            files,
        }
    }
}

#[derive(Default)]
struct FakeState {
    base_url: String,
    meetings: Vec<FakeMeeting>,
    catalog_status: Option<StatusCode>,
    missing_files: HashSet<String>,
    download_delay: Option<Duration>,
    catalog_queries: Vec<HashMap<String, String>>,
    downloads: Vec<String>,
    deletions: Vec<String>,
    unauthorized: usize,
}

/// Fake recordings API
pub struct FakeApi {
    pub addr: String,
    state: Arc<Mutex<FakeState>>,
}

impl FakeApi {
    /// Start serving `meetings`
    pub async fn start(meetings: Vec<FakeMeeting>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        let state = Arc::new(Mutex::new(FakeState {
            base_url: addr.clone(),
            meetings,
            ..FakeState::default()
        }));

        let app = Router::new()
            .route("/users/:user_id/recordings", get(list_recordings))
            .route("/download/:file", get(download))
            .route("/meetings/:meeting_id/recordings", delete(delete_recordings))
            .with_state(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    /// Make the catalog endpoint answer with `status`
    pub fn fail_catalog(&self, status: StatusCode) {
        self.state.lock().unwrap().catalog_status = Some(status);
    }

    /// Make the download of `file` answer 404
    pub fn remove_file(&self, file: &str) {
        self.state.lock().unwrap().missing_files.insert(file.to_string());
    }

    /// Hold every download response for `delay`
    pub fn stall_downloads(&self, delay: Duration) {
        self.state.lock().unwrap().download_delay = Some(delay);
    }

    pub fn downloads(&self) -> Vec<String> {
        let mut downloads = self.state.lock().unwrap().downloads.clone();
        downloads.sort();
        downloads
    }

    pub fn deletions(&self) -> Vec<String> {
        let mut deletions = self.state.lock().unwrap().deletions.clone();
        deletions.sort();
        deletions
    }

    pub fn catalog_queries(&self) -> Vec<HashMap<String, String>> {
        self.state.lock().unwrap().catalog_queries.clone()
    }

    pub fn unauthorized(&self) -> usize {
        self.state.lock().unwrap().unauthorized
    }

    /// Job configuration pointing at this API
    pub fn config(&self) -> AppConfig {
        AppConfig {
            api: config::ApiConfig {
                base_url: self.addr.clone(),
                user_id: Some(USER_ID.to_string()),
                api_key: None,
                api_secret: None,
                token: Some(TOKEN.to_string()),
                token_ttl_seconds: 2100,
                lookback_months: 1,
            },
            storage: config::StorageConfig {
                bucket: Some(BUCKET.to_string()),
                prefix: None,
                layout: config::KeyLayout::Folder,
                endpoint: None,
                region: "us-east-1".to_string(),
                force_path_style: false,
                credentials_json: None,
                access_key_id: None,
                secret_access_key: None,
                part_size_mib: 8,
            },
            sync: config::SyncConfig {
                concurrency: 2,
                retention_policy: config::RetentionPolicy::Always,
                deadline_seconds: 30,
            },
            index: config::IndexConfig::default(),
            http: config::HttpConfig {
                connect_timeout_seconds: 5,
                request_timeout_seconds: 30,
                user_agent: "RecSync/test".to_string(),
            },
            metrics: config::MetricsConfig::default(),
            logging: config::LoggingConfig::default(),
        }
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {}", TOKEN))
}

async fn list_recordings(
    State(state): State<Arc<Mutex<FakeState>>>,
    Path(user_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let mut state = state.lock().unwrap();
    state.catalog_queries.push(query);

    if !authorized(&headers) || user_id != USER_ID {
        state.unauthorized += 1;
        return (StatusCode::UNAUTHORIZED, Json(json!({ "code": 124 })));
    }
    if let Some(status) = state.catalog_status {
        return (status, Json(json!({ "message": "unavailable" })));
    }

    let meetings: Vec<Value> = state
        .meetings
        .iter()
        .map(|meeting| {
            json!({
                "uuid": meeting.uuid,
                "topic": meeting.topic,
                "start_time": meeting.start_time,
                "recording_files": meeting.files.iter().map(|file| json!({
                    "recording_start": file.recording_start,
                    "file_type": file.file_type,
                    "download_url": format!("{}/download/{}", state.base_url, file.name),
                    "recording_type": file.recording_type,
                    "status": file.status,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();

    (StatusCode::OK, Json(json!({ "meetings": meetings })))
}

async fn download(
    State(state): State<Arc<Mutex<FakeState>>>,
    Path(file): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let delay = {
        let mut state = state.lock().unwrap();
        if query.get("access_token").map(String::as_str) != Some(TOKEN) {
            state.unauthorized += 1;
            return (StatusCode::UNAUTHORIZED, Vec::new());
        }
        state.downloads.push(file.clone());
        state.download_delay
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let state = state.lock().unwrap();
    if state.missing_files.contains(&file) {
        return (StatusCode::NOT_FOUND, Vec::new());
    }

    let body = state
        .meetings
        .iter()
        .flat_map(|meeting| meeting.files.iter())
        .find(|candidate| candidate.name == file)
        .map(|candidate| candidate.body.clone());
    match body {
        Some(body) => (StatusCode::OK, body),
        None => (StatusCode::NOT_FOUND, Vec::new()),
    }
}

async fn delete_recordings(
    State(state): State<Arc<Mutex<FakeState>>>,
    Path(meeting_id): Path<String>,
    headers: HeaderMap,
) -> StatusCode {
    let mut state = state.lock().unwrap();
    if !authorized(&headers) {
        state.unauthorized += 1;
        return StatusCode::UNAUTHORIZED;
    }
    state.deletions.push(meeting_id);
    StatusCode::NO_CONTENT
}

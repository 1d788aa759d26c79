use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::{Catalog, PLACEHOLDER_IMAGE, PLACEHOLDER_VIDEO};
use crate::config::Config;
use crate::readiness::Readiness;

pub const ANONYMOUS_AUTHOR: &str = "Anonymous";
pub const DEFAULT_DESCRIPTION: &str = "No description available";
pub const DEFAULT_COUNTER: &str = "0";
pub const DEFAULT_DURATION: &str = "0:00";

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}

fn default_counter() -> String {
    DEFAULT_COUNTER.to_string()
}

fn default_duration() -> String {
    DEFAULT_DURATION.to_string()
}

fn default_image() -> String {
    PLACEHOLDER_IMAGE.to_string()
}

fn default_video() -> String {
    PLACEHOLDER_VIDEO.to_string()
}

fn default_author() -> String {
    ANONYMOUS_AUTHOR.to_string()
}

/// A catalog entry as persisted in the data file and returned by the API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default = "default_image")]
    pub image: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_counter")]
    pub views: String,
    #[serde(default = "default_counter")]
    pub likes: String,
    #[serde(default = "default_duration")]
    pub duration: String,
    #[serde(default = "default_video")]
    pub video: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default = "default_author")]
    pub name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub timestamp: i64,
}

/// Projection served by `GET /videos` in summary mode.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub channel: String,
    pub image: String,
}

impl From<&Video> for VideoSummary {
    fn from(video: &Video) -> Self {
        Self {
            id: video.id.clone(),
            title: video.title.clone(),
            channel: video.channel.clone(),
            image: video.image.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VideoListing {
    Full(Vec<Video>),
    Summary(Vec<VideoSummary>),
}

impl VideoListing {
    pub fn len(&self) -> usize {
        match self {
            VideoListing::Full(videos) => videos.len(),
            VideoListing::Summary(videos) => videos.len(),
        }
    }
}

/// Text fields of a creation request, from either a JSON or a multipart body.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewVideo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Public paths of files saved from a creation request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UploadedAssets {
    pub video: Option<String>,
    pub poster: Option<String>,
}

#[derive(Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub comment: Option<serde_json::Value>,
}

pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub readiness: Readiness,
    pub config: Config,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub videos: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_optional_fields_take_defaults() {
        let raw = r#"{
            "id": "v1",
            "title": "T",
            "channel": "C",
            "image": "/images/a.jpg",
            "video": "/videos/a.mp4",
            "timestamp": 1700000000000,
            "comments": [{"id": "c1", "name": "N", "comment": "x", "timestamp": 1}]
        }"#;
        let video: Video = serde_json::from_str(raw).unwrap();
        assert_eq!(video.description, DEFAULT_DESCRIPTION);
        assert_eq!(video.views, "0");
        assert_eq!(video.likes, "0");
        assert_eq!(video.duration, "0:00");
        assert_eq!(video.comments[0].likes, 0);
    }

    #[test]
    fn sparse_records_still_deserialize() {
        let raw = r#"{"id": "old", "comments": [{"id": "c1"}]}"#;
        let video: Video = serde_json::from_str(raw).unwrap();
        assert_eq!(video.title, "");
        assert_eq!(video.image, PLACEHOLDER_IMAGE);
        assert_eq!(video.video, PLACEHOLDER_VIDEO);
        assert_eq!(video.timestamp, 0);
        assert_eq!(video.comments[0].name, ANONYMOUS_AUTHOR);
        assert_eq!(video.comments[0].timestamp, 0);
    }

    #[test]
    fn summary_listing_serializes_four_fields() {
        let video = Video {
            id: "v1".into(),
            title: "T".into(),
            channel: "C".into(),
            image: "/images/a.jpg".into(),
            description: "D".into(),
            views: "1".into(),
            likes: "2".into(),
            duration: "1:00".into(),
            video: "/videos/a.mp4".into(),
            timestamp: 1,
            comments: vec![],
        };
        let listing = VideoListing::Summary(vec![VideoSummary::from(&video)]);
        let value = serde_json::to_value(&listing).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{"id": "v1", "title": "T", "channel": "C", "image": "/images/a.jpg"}])
        );
    }
}

//! Seeds the catalog from the upstream video API.
//!
//! A run fetches the summary list, then the details of every listed video,
//! and only replaces the catalog once every fetch has succeeded. Any
//! failure aborts the run and leaves the stored collection untouched.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::catalog::{now_millis, Catalog};
use crate::config::ImporterSettings;
use crate::models::{
    Comment, Video, ANONYMOUS_AUTHOR, DEFAULT_COUNTER, DEFAULT_DESCRIPTION, DEFAULT_DURATION,
};
use crate::readiness::Readiness;

pub const PLACEHOLDER_REMOTE_VIDEO: &str = "https://www.example.com/video.mp4";

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to fetch {resource}: {source}")]
    Http {
        resource: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("upstream source error: {0}")]
    Upstream(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct RemoteVideoSummary {
    pub id: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RemoteVideo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub channel: Option<String>,
    pub image: Option<String>,
    pub description: Option<Value>,
    pub views: Option<Value>,
    pub likes: Option<Value>,
    pub duration: Option<Value>,
    pub video: Option<Value>,
    pub timestamp: Option<i64>,
    pub comments: Option<Vec<RemoteComment>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RemoteComment {
    pub id: Option<String>,
    pub name: Option<String>,
    pub comment: Option<String>,
    pub likes: Option<i64>,
    pub timestamp: Option<i64>,
}

#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn list_videos(&self) -> Result<Vec<RemoteVideoSummary>, ImportError>;

    async fn video_details(&self, id: &str) -> Result<RemoteVideo, ImportError>;
}

/// Talks to `GET {api_url}/videos` and `GET {api_url}/videos/{id}`.
pub struct HttpVideoSource {
    client: reqwest::Client,
    base_url: reqwest::Url,
    api_key: Option<String>,
}

impl HttpVideoSource {
    pub fn new(
        api_url: &str,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ImportError> {
        let base_url = reqwest::Url::parse(api_url)
            .map_err(|e| ImportError::Upstream(format!("invalid api url {:?}: {}", api_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ImportError::Upstream(format!(
                "invalid api url {:?}: not a base url",
                api_url
            )));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| ImportError::Http {
            resource: "http client".to_string(),
            source: e,
        })?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Appends `segments` to the base path, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> reqwest::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: reqwest::Url) -> Result<T, ImportError> {
        let resource = url.to_string();
        let wrap = |source: reqwest::Error| ImportError::Http {
            resource: resource.clone(),
            source: source.without_url(),
        };

        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key)]);
        }

        request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(wrap)?
            .json::<T>()
            .await
            .map_err(wrap)
    }
}

#[async_trait]
impl VideoSource for HttpVideoSource {
    async fn list_videos(&self) -> Result<Vec<RemoteVideoSummary>, ImportError> {
        self.get_json(self.endpoint(&["videos"])).await
    }

    async fn video_details(&self, id: &str) -> Result<RemoteVideo, ImportError> {
        self.get_json(self.endpoint(&["videos", id])).await
    }
}

pub struct Importer {
    source: Arc<dyn VideoSource>,
    catalog: Arc<Catalog>,
}

impl Importer {
    pub fn new(source: Arc<dyn VideoSource>, catalog: Arc<Catalog>) -> Self {
        Self { source, catalog }
    }

    /// Returns `None` when no upstream API is configured.
    pub fn from_settings(
        settings: &ImporterSettings,
        catalog: Arc<Catalog>,
    ) -> Result<Option<Self>, ImportError> {
        let Some(api_url) = settings.api_url.as_deref() else {
            return Ok(None);
        };
        let timeout = (settings.request_timeout_seconds > 0)
            .then(|| Duration::from_secs(settings.request_timeout_seconds));
        let source = HttpVideoSource::new(api_url, settings.api_key.clone(), timeout)?;
        Ok(Some(Self::new(Arc::new(source), catalog)))
    }

    /// Fetch everything, then replace the catalog. Returns the video count.
    pub async fn populate(&self) -> Result<usize, ImportError> {
        let summaries = self.source.list_videos().await?;
        info!("[import] 📥 Upstream lists {} videos", summaries.len());

        let mut videos = Vec::with_capacity(summaries.len());
        for summary in &summaries {
            let mut details = self.source.video_details(&summary.id).await.map_err(|e| {
                warn!("[import] Failed to fetch details for {}: {}", summary.id, e);
                e
            })?;
            if details.id.as_deref().map_or(true, str::is_empty) {
                details.id = Some(summary.id.clone());
            }
            videos.push(normalize(details, now_millis()));
        }

        let count = videos.len();
        self.catalog.replace_all(videos).await;
        Ok(count)
    }

    /// One logged run; failures never propagate.
    pub async fn run(&self) {
        let start = Instant::now();
        match self.populate().await {
            Ok(count) => info!(
                "[import] ✅ Populated catalog with {} videos in {:.2}s",
                count,
                start.elapsed().as_secs_f64()
            ),
            Err(e) => error!(
                "[import] ❌ Import aborted after {:.2}s, keeping stored catalog: {}",
                start.elapsed().as_secs_f64(),
                e
            ),
        }
    }
}

fn text_or(value: Option<Value>, default: &str) -> String {
    match value {
        Some(Value::String(s)) if !s.is_empty() => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => default.to_string(),
    }
}

fn normalize(details: RemoteVideo, now: i64) -> Video {
    Video {
        id: details.id.unwrap_or_default(),
        title: details.title.unwrap_or_default(),
        channel: details.channel.unwrap_or_default(),
        image: details.image.unwrap_or_default(),
        description: text_or(details.description, DEFAULT_DESCRIPTION),
        views: text_or(details.views, DEFAULT_COUNTER),
        likes: text_or(details.likes, DEFAULT_COUNTER),
        duration: text_or(details.duration, DEFAULT_DURATION),
        video: text_or(details.video, PLACEHOLDER_REMOTE_VIDEO),
        timestamp: details.timestamp.filter(|t| *t != 0).unwrap_or(now),
        comments: details
            .comments
            .unwrap_or_default()
            .into_iter()
            .map(|c| Comment {
                id: c.id.unwrap_or_default(),
                name: c.name.unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string()),
                comment: c.comment.unwrap_or_default(),
                likes: c.likes.unwrap_or_default(),
                timestamp: c.timestamp.unwrap_or_default(),
            })
            .collect(),
    }
}

/// Run the import once, open the readiness gate, then optionally keep
/// refreshing on an interval.
pub fn start_import_task(
    importer: Arc<Importer>,
    readiness: Readiness,
    refresh_interval: Option<Duration>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        importer.run().await;
        readiness.mark_ready();
        info!("[import] 🚦 Catalog is ready");

        let Some(period) = refresh_interval else {
            return;
        };

        info!(
            "[import] 🔁 Starting periodic refresh (interval: {:.1} min)",
            period.as_secs_f64() / 60.0
        );
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            importer.run().await;
        }
    })
}

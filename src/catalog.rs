//! CRUD over the video collection.
//!
//! Every mutation loads the whole collection from the store, edits it in
//! memory and saves it back. Mutations inside this process are serialized
//! with an async mutex; nothing coordinates with other processes sharing
//! the same data file.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{CatalogOptions, ListProjection};
use crate::models::{
    Comment, NewVideo, UploadedAssets, Video, VideoListing, VideoSummary, ANONYMOUS_AUTHOR,
    DEFAULT_COUNTER, DEFAULT_DESCRIPTION, DEFAULT_DURATION,
};
use crate::store::VideoStore;

pub const PLACEHOLDER_IMAGE: &str = "/images/placeholder.jpg";
pub const PLACEHOLDER_VIDEO: &str = "/videos/placeholder.mp4";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Video not found")]
    VideoNotFound,
    #[error("Comment not found")]
    CommentNotFound,
    #[error("Invalid comment")]
    InvalidComment,
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

pub struct Catalog {
    store: Arc<dyn VideoStore>,
    options: CatalogOptions,
    write_lock: Mutex<()>,
}

impl Catalog {
    pub fn new(store: Arc<dyn VideoStore>, options: CatalogOptions) -> Self {
        Self {
            store,
            options,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn list_videos(&self) -> VideoListing {
        let videos = self.store.load().await;
        match self.options.list_projection {
            ListProjection::Full => VideoListing::Full(videos),
            ListProjection::Summary => {
                VideoListing::Summary(videos.iter().map(VideoSummary::from).collect())
            }
        }
    }

    pub async fn get_video(&self, id: &str) -> Result<Video, CatalogError> {
        self.store
            .load()
            .await
            .into_iter()
            .find(|v| v.id == id)
            .ok_or(CatalogError::VideoNotFound)
    }

    pub async fn create_video(
        &self,
        fields: NewVideo,
        assets: UploadedAssets,
    ) -> Result<Video, CatalogError> {
        let title = present(fields.title);
        let channel = present(fields.channel);
        let description = present(fields.description);

        let mut missing = Vec::new();
        if title.is_none() {
            missing.push("title");
        }
        if channel.is_none() {
            missing.push("channel");
        }
        if self.options.require_description && description.is_none() {
            missing.push("description");
        }
        let (Some(title), Some(channel)) = (title, channel) else {
            return Err(CatalogError::MissingFields(missing));
        };
        if !missing.is_empty() {
            return Err(CatalogError::MissingFields(missing));
        }

        let _guard = self.write_lock.lock().await;
        let mut videos = self.store.load().await;

        let id = fresh_id(|candidate| videos.iter().any(|v| v.id == candidate));
        let video = Video {
            id,
            title,
            channel,
            image: assets.poster.unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            description: description.unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            views: DEFAULT_COUNTER.to_string(),
            likes: DEFAULT_COUNTER.to_string(),
            duration: DEFAULT_DURATION.to_string(),
            video: assets.video.unwrap_or_else(|| PLACEHOLDER_VIDEO.to_string()),
            timestamp: now_millis(),
            comments: Vec::new(),
        };

        videos.push(video.clone());
        self.store.save(&videos).await;

        info!("[catalog] ✅ Created video {} ({:?})", video.id, video.title);
        Ok(video)
    }

    /// `text` is `None` when the request carried no string comment at all.
    pub async fn add_comment(
        &self,
        video_id: &str,
        text: Option<&str>,
    ) -> Result<Comment, CatalogError> {
        let text = text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(CatalogError::InvalidComment)?;

        let _guard = self.write_lock.lock().await;
        let mut videos = self.store.load().await;
        let video = videos
            .iter_mut()
            .find(|v| v.id == video_id)
            .ok_or(CatalogError::VideoNotFound)?;

        let id = fresh_id(|candidate| video.comments.iter().any(|c| c.id == candidate));
        let comment = Comment {
            id,
            name: ANONYMOUS_AUTHOR.to_string(),
            comment: text.to_string(),
            likes: 0,
            timestamp: now_millis(),
        };
        video.comments.push(comment.clone());
        self.store.save(&videos).await;

        info!("[catalog] 💬 Added comment {} to video {}", comment.id, video_id);
        Ok(comment)
    }

    pub async fn delete_comment(
        &self,
        video_id: &str,
        comment_id: &str,
    ) -> Result<(), CatalogError> {
        let _guard = self.write_lock.lock().await;
        let mut videos = self.store.load().await;
        let video = videos
            .iter_mut()
            .find(|v| v.id == video_id)
            .ok_or(CatalogError::VideoNotFound)?;

        let index = video
            .comments
            .iter()
            .position(|c| c.id == comment_id)
            .ok_or(CatalogError::CommentNotFound)?;
        video.comments.remove(index);
        self.store.save(&videos).await;

        info!("[catalog] 🗑️  Deleted comment {} from video {}", comment_id, video_id);
        Ok(())
    }

    /// Replace the whole collection in one write.
    pub async fn replace_all(&self, videos: Vec<Video>) {
        let _guard = self.write_lock.lock().await;
        debug!("[catalog] Replacing collection with {} videos", videos.len());
        self.store.save(&videos).await;
    }

    pub async fn count(&self) -> usize {
        self.store.load().await.len()
    }
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn fresh_id(taken: impl Fn(&str) -> bool) -> String {
    loop {
        let candidate = Uuid::new_v4().to_string();
        if !taken(&candidate) {
            return candidate;
        }
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::sample_video;
    use crate::store::{JsonFileStore, MemoryStore};
    use std::collections::HashSet;

    fn catalog_with(videos: Vec<Video>, options: CatalogOptions) -> (Arc<MemoryStore>, Catalog) {
        let store = Arc::new(MemoryStore::new(videos));
        let catalog = Catalog::new(store.clone(), options);
        (store, catalog)
    }

    fn new_video(title: &str, channel: &str, description: Option<&str>) -> NewVideo {
        NewVideo {
            title: Some(title.to_string()),
            channel: Some(channel.to_string()),
            description: description.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn list_full_returns_records() {
        let (_store, catalog) = catalog_with(vec![sample_video("v1")], CatalogOptions::default());
        match catalog.list_videos().await {
            VideoListing::Full(videos) => assert_eq!(videos, vec![sample_video("v1")]),
            other => panic!("expected full listing, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn list_summary_projects_fields() {
        let options = CatalogOptions {
            list_projection: ListProjection::Summary,
            ..CatalogOptions::default()
        };
        let (_store, catalog) = catalog_with(vec![sample_video("v1")], options);
        match catalog.list_videos().await {
            VideoListing::Summary(videos) => {
                assert_eq!(videos.len(), 1);
                assert_eq!(videos[0].id, "v1");
                assert_eq!(videos[0].title, "Title v1");
            }
            other => panic!("expected summary listing, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn list_is_idempotent() {
        let (_store, catalog) =
            catalog_with(vec![sample_video("v1"), sample_video("v2")], CatalogOptions::default());
        assert_eq!(catalog.list_videos().await, catalog.list_videos().await);
    }

    #[tokio::test]
    async fn get_video_found_and_missing() {
        let (_store, catalog) = catalog_with(vec![sample_video("v1")], CatalogOptions::default());
        assert_eq!(catalog.get_video("v1").await.unwrap().id, "v1");
        assert_eq!(catalog.get_video("nope").await, Err(CatalogError::VideoNotFound));
    }

    #[tokio::test]
    async fn create_applies_defaults_and_persists() {
        let (store, catalog) = catalog_with(vec![], CatalogOptions::default());
        let video = catalog
            .create_video(new_video("T", "C", Some("D")), UploadedAssets::default())
            .await
            .unwrap();

        assert_eq!(video.views, "0");
        assert_eq!(video.likes, "0");
        assert_eq!(video.duration, "0:00");
        assert_eq!(video.image, PLACEHOLDER_IMAGE);
        assert_eq!(video.video, PLACEHOLDER_VIDEO);
        assert!(video.comments.is_empty());
        assert!(video.timestamp > 0);
        assert_eq!(store.load().await, vec![video]);
    }

    #[tokio::test]
    async fn create_uses_uploaded_assets() {
        let (_store, catalog) = catalog_with(vec![], CatalogOptions::default());
        let assets = UploadedAssets {
            video: Some("/videos/abc.mp4".to_string()),
            poster: Some("/images/abc.png".to_string()),
        };
        let video = catalog
            .create_video(new_video("T", "C", None), assets)
            .await
            .unwrap();
        assert_eq!(video.video, "/videos/abc.mp4");
        assert_eq!(video.image, "/images/abc.png");
        assert_eq!(video.description, DEFAULT_DESCRIPTION);
    }

    #[tokio::test]
    async fn create_ids_are_unique() {
        let (_store, catalog) =
            catalog_with(vec![sample_video("v1"), sample_video("v2")], CatalogOptions::default());
        let mut ids: HashSet<String> = ["v1".to_string(), "v2".to_string()].into();
        for i in 0..20 {
            let video = catalog
                .create_video(new_video(&format!("T{}", i), "C", None), UploadedAssets::default())
                .await
                .unwrap();
            assert!(ids.insert(video.id));
        }
        assert_eq!(catalog.count().await, 22);
    }

    #[tokio::test]
    async fn create_requires_title_and_channel() {
        let (store, catalog) = catalog_with(vec![], CatalogOptions::default());
        let err = catalog
            .create_video(
                NewVideo {
                    title: Some("  ".to_string()),
                    channel: None,
                    description: None,
                },
                UploadedAssets::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::MissingFields(vec!["title", "channel"]));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn create_requires_description_when_configured() {
        let options = CatalogOptions {
            require_description: true,
            ..CatalogOptions::default()
        };
        let (_store, catalog) = catalog_with(vec![], options);
        let err = catalog
            .create_video(new_video("T", "C", None), UploadedAssets::default())
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::MissingFields(vec!["description"]));
        assert_eq!(err.to_string(), "Missing required fields: description");
    }

    #[tokio::test]
    async fn add_comment_appends_anonymous_comment() {
        let (store, catalog) = catalog_with(vec![sample_video("v1")], CatalogOptions::default());
        let comment = catalog.add_comment("v1", Some("  hi  ")).await.unwrap();

        assert_eq!(comment.name, ANONYMOUS_AUTHOR);
        assert_eq!(comment.comment, "hi");
        assert_eq!(comment.likes, 0);

        let stored = store.load().await;
        let comments = &stored[0].comments;
        assert_eq!(comments.len(), 2);
        assert_eq!(comments.last(), Some(&comment));
    }

    #[tokio::test]
    async fn blank_comment_is_rejected_without_writing() {
        let (store, catalog) = catalog_with(vec![sample_video("v1")], CatalogOptions::default());
        assert_eq!(
            catalog.add_comment("v1", Some(" \t\n ")).await,
            Err(CatalogError::InvalidComment)
        );
        assert_eq!(catalog.add_comment("v1", None).await, Err(CatalogError::InvalidComment));
        assert_eq!(store.load().await, vec![sample_video("v1")]);
    }

    #[tokio::test]
    async fn invalid_comment_is_checked_before_video_lookup() {
        let (_store, catalog) = catalog_with(vec![], CatalogOptions::default());
        assert_eq!(
            catalog.add_comment("missing", Some("")).await,
            Err(CatalogError::InvalidComment)
        );
        assert_eq!(
            catalog.add_comment("missing", Some("hello")).await,
            Err(CatalogError::VideoNotFound)
        );
    }

    #[tokio::test]
    async fn delete_comment_preserves_order_of_the_rest() {
        let (store, catalog) = catalog_with(vec![sample_video("v1")], CatalogOptions::default());
        let second = catalog.add_comment("v1", Some("second")).await.unwrap();
        let third = catalog.add_comment("v1", Some("third")).await.unwrap();

        catalog.delete_comment("v1", &second.id).await.unwrap();

        let ids: Vec<_> = store.load().await[0]
            .comments
            .iter()
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(ids, vec!["v1-c1".to_string(), third.id]);
    }

    #[tokio::test]
    async fn delete_missing_comment_or_video_is_not_found() {
        let (store, catalog) = catalog_with(vec![sample_video("v1")], CatalogOptions::default());
        assert_eq!(
            catalog.delete_comment("v1", "missing-id").await,
            Err(CatalogError::CommentNotFound)
        );
        assert_eq!(
            catalog.delete_comment("nope", "v1-c1").await,
            Err(CatalogError::VideoNotFound)
        );
        assert_eq!(store.load().await, vec![sample_video("v1")]);
    }

    #[tokio::test]
    async fn concurrent_comments_are_not_lost() {
        let (store, catalog) = catalog_with(vec![sample_video("v1")], CatalogOptions::default());
        let catalog = Arc::new(catalog);

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let catalog = catalog.clone();
                tokio::spawn(async move {
                    let text = format!("c{}", i);
                    catalog.add_comment("v1", Some(&text)).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load().await[0].comments.len(), 11);
    }

    #[tokio::test]
    async fn create_keeps_sparse_records_on_disk() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("videos.json");
        let sparse = serde_json::json!([{"id": "legacy", "title": "Old", "channel": "C"}]);
        std::fs::write(&path, sparse.to_string()).unwrap();
        let store = Arc::new(JsonFileStore::new(&path));
        let catalog = Catalog::new(store.clone(), CatalogOptions::default());

        let created = catalog
            .create_video(new_video("T", "C", None), UploadedAssets::default())
            .await
            .unwrap();

        let ids: Vec<_> = store.load().await.into_iter().map(|v| v.id).collect();
        assert_eq!(ids, vec!["legacy".to_string(), created.id]);
    }

    #[tokio::test]
    async fn replace_all_overwrites_collection() {
        let (store, catalog) = catalog_with(vec![sample_video("v1")], CatalogOptions::default());
        catalog
            .replace_all(vec![sample_video("v2"), sample_video("v3")])
            .await;
        let ids: Vec<_> = store.load().await.into_iter().map(|v| v.id).collect();
        assert_eq!(ids, vec!["v2", "v3"]);
    }
}

use axum::{body::Body, http::StatusCode};
use multer::{Constraints, Multipart, SizeLimit};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{NewVideo, UploadedAssets};

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid multipart request: {0}")]
    Malformed(String),
    #[error("Only {expected} files are allowed for field '{field}'")]
    WrongContentType {
        field: &'static str,
        expected: &'static str,
    },
    #[error("File too large. Maximum file size is {limit_mb}MB.")]
    TooLarge { limit_mb: u64 },
    #[error("Failed to save file: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::Malformed(_) | UploadError::WrongContentType { .. } => {
                StatusCode::BAD_REQUEST
            }
            UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum AssetKind {
    Video,
    Poster,
}

impl AssetKind {
    fn from_field(name: &str) -> Option<Self> {
        match name {
            "video" => Some(AssetKind::Video),
            "poster" => Some(AssetKind::Poster),
            _ => None,
        }
    }

    fn field(self) -> &'static str {
        match self {
            AssetKind::Video => "video",
            AssetKind::Poster => "poster",
        }
    }

    fn mime_type(self) -> &'static str {
        match self {
            AssetKind::Video => "video",
            AssetKind::Poster => "image",
        }
    }

    /// URL prefix the asset is served under.
    fn prefix(self) -> &'static str {
        match self {
            AssetKind::Video => "/videos",
            AssetKind::Poster => "/images",
        }
    }
}

/// Where uploaded files go and how large they may be.
#[derive(Clone, Debug)]
pub struct UploadTarget {
    pub videos_dir: PathBuf,
    pub images_dir: PathBuf,
    pub max_file_size: u64,
    pub enabled: bool,
}

impl UploadTarget {
    pub fn from_config(config: &Config) -> Self {
        Self {
            videos_dir: config.videos_dir(),
            images_dir: config.images_dir(),
            max_file_size: config.max_file_size,
            enabled: config.catalog.uploads_enabled,
        }
    }

    fn dir(&self, kind: AssetKind) -> &Path {
        match kind {
            AssetKind::Video => &self.videos_dir,
            AssetKind::Poster => &self.images_dir,
        }
    }

    fn too_large(&self) -> UploadError {
        UploadError::TooLarge {
            limit_mb: self.max_file_size / 1024 / 1024,
        }
    }
}

/// Parse a `multipart/form-data` creation request, saving any files.
///
/// Files already written are removed again if the request fails part way.
pub async fn read_video_form(
    content_type: &str,
    body: Body,
    target: &UploadTarget,
) -> Result<(NewVideo, UploadedAssets), UploadError> {
    let boundary =
        multer::parse_boundary(content_type).map_err(|e| UploadError::Malformed(e.to_string()))?;

    let constraints =
        Constraints::new().size_limit(SizeLimit::new().per_field(target.max_file_size));
    let mut multipart = Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

    let mut saved = Vec::new();
    match read_fields(&mut multipart, target, &mut saved).await {
        Ok(form) => Ok(form),
        Err(e) => {
            for path in saved {
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    warn!("[upload] Failed to remove partial upload {:?}: {}", path, remove_err);
                }
            }
            Err(e)
        }
    }
}

/// Remove files saved for a request that was rejected afterwards.
pub async fn discard(assets: &UploadedAssets, target: &UploadTarget) {
    let saved = [
        (AssetKind::Video, assets.video.as_deref()),
        (AssetKind::Poster, assets.poster.as_deref()),
    ];
    for (kind, public_path) in saved {
        let Some(file_name) = public_path
            .and_then(|p| p.strip_prefix(kind.prefix()))
            .and_then(|p| p.strip_prefix('/'))
        else {
            continue;
        };
        let path = target.dir(kind).join(file_name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("[upload] Failed to remove discarded upload {:?}: {}", path, e);
        }
    }
}

async fn read_fields(
    multipart: &mut Multipart<'_>,
    target: &UploadTarget,
    saved: &mut Vec<PathBuf>,
) -> Result<(NewVideo, UploadedAssets), UploadError> {
    let mut fields = NewVideo::default();
    let mut assets = UploadedAssets::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multer_error(e, target))?
    {
        let name = field.name().unwrap_or("").to_string();

        let Some(kind) = AssetKind::from_field(&name).filter(|_| target.enabled) else {
            let slot = match name.as_str() {
                "title" => &mut fields.title,
                "channel" => &mut fields.channel,
                "description" => &mut fields.description,
                _ => {
                    drain(&mut field, target).await?;
                    continue;
                }
            };
            *slot = Some(field.text().await.map_err(|e| multer_error(e, target))?);
            continue;
        };

        let slot = match kind {
            AssetKind::Video => &mut assets.video,
            AssetKind::Poster => &mut assets.poster,
        };
        if slot.is_some() {
            drain(&mut field, target).await?;
            continue;
        }

        if let Some(mime) = field.content_type() {
            if !mime.essence_str().starts_with(&format!("{}/", kind.mime_type())) {
                return Err(UploadError::WrongContentType {
                    field: kind.field(),
                    expected: kind.mime_type(),
                });
            }
        }

        let extension = field
            .file_name()
            .and_then(|n| Path::new(n).extension())
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        let file_name = format!("{}{}", Uuid::new_v4(), extension);
        let path = target.dir(kind).join(&file_name);

        let mut file = tokio::fs::File::create(&path).await?;
        saved.push(path.clone());

        let mut written = 0u64;
        while let Some(chunk) = field.chunk().await.map_err(|e| multer_error(e, target))? {
            written += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        info!(
            "[upload] 📁 Saved {} ({:.2} MB) to {:?}",
            kind.field(),
            written as f64 / 1024.0 / 1024.0,
            path
        );
        *slot = Some(format!("{}/{}", kind.prefix(), file_name));
    }

    Ok((fields, assets))
}

async fn drain(field: &mut multer::Field<'_>, target: &UploadTarget) -> Result<(), UploadError> {
    while field
        .chunk()
        .await
        .map_err(|e| multer_error(e, target))?
        .is_some()
    {
        // Drain the field
    }
    Ok(())
}

fn multer_error(e: multer::Error, target: &UploadTarget) -> UploadError {
    match e {
        multer::Error::FieldSizeExceeded { .. } | multer::Error::StreamSizeExceeded { .. } => {
            target.too_large()
        }
        other => UploadError::Malformed(other.to_string()),
    }
}

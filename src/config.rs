use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: Option<u16>,
    pub data_file: Option<String>,
    pub public_dir: Option<String>,
    pub max_file_size: Option<u64>,
    pub log_level: Option<String>,
    pub storage: Option<StorageBackend>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub list_projection: Option<ListProjection>,
    pub uploads_enabled: Option<bool>,
    pub require_description: Option<bool>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ImporterConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub refresh_interval_seconds: Option<u64>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub importer: ImporterConfig,
}

/// Shape of the `GET /videos` response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListProjection {
    #[default]
    Full,
    Summary,
}

impl FromStr for ListProjection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(ListProjection::Full),
            "summary" => Ok(ListProjection::Summary),
            other => anyhow::bail!("unknown list projection: {}", other),
        }
    }
}

/// Where the collection lives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "memory" => Ok(StorageBackend::Memory),
            other => anyhow::bail!("unknown storage backend: {}", other),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CatalogOptions {
    pub list_projection: ListProjection,
    pub uploads_enabled: bool,
    pub require_description: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            list_projection: ListProjection::Full,
            uploads_enabled: true,
            require_description: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImporterSettings {
    /// `None` disables the importer entirely.
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    /// 0 = run once at startup only.
    pub refresh_interval_seconds: u64,
    /// 0 = transport default.
    pub request_timeout_seconds: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub data_file: PathBuf,
    pub public_dir: PathBuf,
    pub max_file_size: u64,
    pub log_level: String,
    pub storage: StorageBackend,
    pub catalog: CatalogOptions,
    pub importer: ImporterSettings,
}

impl Config {
    pub fn images_dir(&self) -> PathBuf {
        self.public_dir.join("images")
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.public_dir.join("videos")
    }

    pub fn from_env() -> Self {
        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::load_in(&base_dir, |key| std::env::var(key).ok())
    }

    /// Reads `config.toml` from `base_dir`. A file that cannot be read or
    /// parsed is reported and skipped; env vars still apply on top of the
    /// defaults.
    pub fn load_in(base_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Self {
        let config_file = read_config_file(base_dir).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config: {:#}. Using defaults.", e);
            None
        });
        Self::resolve(config_file, base_dir, env)
    }

    /// Env vars override config file values, which override defaults.
    pub fn resolve(
        config_file: Option<ConfigFile>,
        base_dir: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let file = config_file.unwrap_or_default();
        let defaults = Self::default_in(base_dir);

        let port = env("PORT")
            .and_then(|p| p.parse().ok())
            .or(file.server.port)
            .unwrap_or(defaults.port);

        let data_file = env("DATA_FILE")
            .or(file.server.data_file)
            .map(|p| resolve_path(base_dir, &p))
            .unwrap_or(defaults.data_file);

        let public_dir = env("PUBLIC_DIR")
            .or(file.server.public_dir)
            .map(|p| resolve_path(base_dir, &p))
            .unwrap_or(defaults.public_dir);

        let max_file_size = env("MAX_FILE_SIZE")
            .and_then(|v| v.parse().ok())
            .or(file.server.max_file_size)
            .unwrap_or(defaults.max_file_size);

        let log_level = env("LOG_LEVEL")
            .or(file.server.log_level)
            .unwrap_or(defaults.log_level);

        let storage = env("STORAGE_BACKEND")
            .and_then(|v| v.parse().ok())
            .or(file.server.storage)
            .unwrap_or(defaults.storage);

        let catalog = CatalogOptions {
            list_projection: env("LIST_PROJECTION")
                .and_then(|v| v.parse().ok())
                .or(file.catalog.list_projection)
                .unwrap_or(defaults.catalog.list_projection),
            uploads_enabled: env("UPLOADS_ENABLED")
                .and_then(|v| parse_bool(&v))
                .or(file.catalog.uploads_enabled)
                .unwrap_or(defaults.catalog.uploads_enabled),
            require_description: env("REQUIRE_DESCRIPTION")
                .and_then(|v| parse_bool(&v))
                .or(file.catalog.require_description)
                .unwrap_or(defaults.catalog.require_description),
        };

        let importer = ImporterSettings {
            api_url: env("CATALOG_API_URL")
                .or(file.importer.api_url)
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            api_key: env("CATALOG_API_KEY")
                .or(file.importer.api_key)
                .filter(|key| !key.is_empty()),
            refresh_interval_seconds: env("IMPORT_REFRESH_SECONDS")
                .and_then(|v| v.parse().ok())
                .or(file.importer.refresh_interval_seconds)
                .unwrap_or(0),
            request_timeout_seconds: env("IMPORT_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .or(file.importer.request_timeout_seconds)
                .unwrap_or(0),
        };

        Self {
            port,
            data_file,
            public_dir,
            max_file_size,
            log_level,
            storage,
            catalog,
            importer,
        }
    }

    fn default_in(base_dir: &Path) -> Self {
        Self {
            port: 5000,
            data_file: base_dir.join("data").join("videos.json"),
            public_dir: base_dir.join("public"),
            max_file_size: 500 * 1024 * 1024,
            log_level: "info".to_string(),
            storage: StorageBackend::File,
            catalog: CatalogOptions::default(),
            importer: ImporterSettings::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::default_in(&base_dir)
    }
}

fn read_config_file(base_dir: &Path) -> anyhow::Result<Option<ConfigFile>> {
    let config_path = base_dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("reading {:?}", config_path))?;
    let file = toml::from_str::<ConfigFile>(&content)
        .with_context(|| format!("parsing {:?}", config_path))?;
    Ok(Some(file))
}

fn resolve_path(base_dir: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

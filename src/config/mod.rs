// airtabletool/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_URL_EXPIRY_SECS: u64 = 3600;

// Structs for deserializing config.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonS3StorageConfig {
    pub bucket_name: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub folder_prefix: Option<String>,
    pub force_path_style: Option<bool>,
    pub url_expiry_secs: Option<u64>,
    pub public_url_base: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonLocalStorageConfig {
    pub root_dir: Option<PathBuf>,
    pub base_url: Option<String>,
    pub folder_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonRestoreOptions {
    pub check_integrity: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub table_dump_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub restore_options: Option<JsonRestoreOptions>,
    pub s3_storage: Option<JsonS3StorageConfig>,
    pub local_storage: Option<JsonLocalStorageConfig>,
}

// Application's internal configuration structs
#[derive(Debug, Clone)]
pub struct SpacesConfig {
    pub bucket_name: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub folder_prefix: Option<String>,
    pub force_path_style: bool,
    pub url_expiry_secs: u64,
    pub public_url_base: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LocalStorageConfig {
    pub root_dir: PathBuf,
    pub base_url: Option<String>,
    pub folder_prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub enum StorageConfig {
    S3(SpacesConfig),
    Local(LocalStorageConfig),
}

impl StorageConfig {
    pub fn folder_prefix(&self) -> Option<&str> {
        match self {
            StorageConfig::S3(cfg) => cfg.folder_prefix.as_deref(),
            StorageConfig::Local(cfg) => cfg.folder_prefix.as_deref(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestoreConfig {
    pub table_dump_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub check_integrity: bool,
    pub prefix: String,
    pub storage: Option<StorageConfig>,
}

/// Command-line values that take precedence over config.json.
#[derive(Debug, Clone, Default)]
pub struct RestoreOverrides {
    pub table_dump_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub skip_integrity_check: bool,
    pub no_storage: bool,
    pub prefix: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: Option<StorageConfig>,
    pub raw_json_config: RawJsonConfig, // Store the parsed raw config
}

impl AppConfig {
    /// Loads config.json. A missing file yields an empty configuration so that
    /// every setting can come from the command line instead.
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            warn!(path = %config_path.display(), "config file not found, using defaults");
            return Self::from_raw(RawJsonConfig::default());
        }
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        Self::from_json_str(&config_content).with_context(|| {
            format!(
                "Failed to load config file at {}",
                config_path.display()
            )
        })
    }

    pub fn from_json_str(config_content: &str) -> Result<Self> {
        let raw_json_config: RawJsonConfig =
            serde_json::from_str(config_content).context("Failed to parse JSON config")?;
        Self::from_raw(raw_json_config)
    }

    fn from_raw(raw_json_config: RawJsonConfig) -> Result<Self> {
        let spaces_config = raw_json_config
            .s3_storage
            .as_ref()
            .and_then(parse_spaces_config);
        let local_config = raw_json_config
            .local_storage
            .as_ref()
            .and_then(parse_local_config);

        let storage = match (spaces_config, local_config) {
            (Some(_), Some(_)) => anyhow::bail!(
                "Both s3_storage and local_storage are configured in config.json. Configure at most one attachment destination."
            ),
            (Some(s3), None) => Some(StorageConfig::S3(s3)),
            (None, Some(local)) => Some(StorageConfig::Local(local)),
            (None, None) => None,
        };

        Ok(AppConfig {
            storage,
            raw_json_config,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|s| !s.trim().is_empty())
}

fn parse_spaces_config(s3_raw: &JsonS3StorageConfig) -> Option<SpacesConfig> {
    let (Some(bucket_name), Some(region)) = (non_empty(&s3_raw.bucket_name), non_empty(&s3_raw.region))
    else {
        // Only warn if some S3 fields were provided but were incomplete/empty
        if s3_raw.bucket_name.is_some() || s3_raw.region.is_some() || s3_raw.endpoint_url.is_some() {
            warn!("S3 configuration is present in config.json but bucket_name or region is missing or empty. Attachment upload to S3 will be disabled.");
        }
        return None;
    };

    // Credentials may come from .env / the environment instead of config.json.
    let access_key_id = non_empty(&s3_raw.access_key_id).or_else(|| env::var("S3_ACCESS_KEY_ID").ok());
    let secret_access_key =
        non_empty(&s3_raw.secret_access_key).or_else(|| env::var("S3_SECRET_ACCESS_KEY").ok());
    if access_key_id.is_some() != secret_access_key.is_some() {
        warn!("Only one of access_key_id / secret_access_key is set. Falling back to the AWS default credential chain.");
    }

    Some(SpacesConfig {
        bucket_name,
        region,
        endpoint_url: non_empty(&s3_raw.endpoint_url),
        access_key_id,
        secret_access_key,
        folder_prefix: non_empty(&s3_raw.folder_prefix),
        force_path_style: s3_raw.force_path_style.unwrap_or(false),
        url_expiry_secs: s3_raw.url_expiry_secs.unwrap_or(DEFAULT_URL_EXPIRY_SECS),
        public_url_base: non_empty(&s3_raw.public_url_base),
    })
}

fn parse_local_config(local_raw: &JsonLocalStorageConfig) -> Option<LocalStorageConfig> {
    let Some(root_dir) = local_raw
        .root_dir
        .clone()
        .filter(|p| !p.as_os_str().is_empty())
    else {
        if local_raw.base_url.is_some() || local_raw.folder_prefix.is_some() {
            warn!("local_storage is present in config.json but root_dir is missing or empty. Local attachment storage will be disabled.");
        }
        return None;
    };

    Some(LocalStorageConfig {
        root_dir,
        base_url: non_empty(&local_raw.base_url),
        folder_prefix: local_raw.folder_prefix.clone(),
    })
}

pub fn load_restore_config(
    app_config: &AppConfig,
    overrides: &RestoreOverrides,
) -> Result<RestoreConfig> {
    let raw_config = &app_config.raw_json_config;
    let table_dump_path = overrides
        .table_dump_path
        .clone()
        .or_else(|| raw_config.table_dump_path.clone())
        .context("table_dump_path must be set in config.json or passed with --input for restore")?;

    if table_dump_path.as_os_str().is_empty() {
        return Err(anyhow::anyhow!(
            "table_dump_path cannot be empty."
        ));
    }

    let check_integrity = !overrides.skip_integrity_check
        && raw_config
            .restore_options
            .as_ref()
            .and_then(|opts| opts.check_integrity)
            .unwrap_or(true);

    let storage = if overrides.no_storage {
        None
    } else {
        app_config.storage.clone()
    };

    let prefix = overrides
        .prefix
        .clone()
        .or_else(|| storage.as_ref().and_then(|s| s.folder_prefix()).map(str::to_string))
        .unwrap_or_default();

    Ok(RestoreConfig {
        table_dump_path,
        output_path: overrides
            .output_path
            .clone()
            .or_else(|| raw_config.output_path.clone()),
        check_integrity,
        prefix,
        storage,
    })
}

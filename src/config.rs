use thiserror::Error;

use crate::gallery::{DEFAULT_PICK_ATTEMPTS, DEFAULT_PICK_LIMIT};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub admin: AdminConfig,
    pub gallery: GalleryConfig,
    pub metadata: MetadataConfig,
    pub node: NodeConfig,
    pub storage: StorageConfig,
    pub supabase: Option<SupabaseConfig>,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
    /// Base URL this service is reachable at; local public URLs are built on it.
    pub public_base_url: String,
}

#[derive(Clone)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
    /// HMAC secret for admin tokens. Random per process when unset.
    pub token_secret: Option<String>,
    pub token_ttl_secs: u64,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct GalleryConfig {
    /// Objects considered by the random picker
    pub random_list_limit: usize,
    /// Draws made to avoid repeating the caller's previous image
    pub random_attempts: usize,
    /// Store uploads under generated names instead of the client's file name
    pub randomize_keys: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Local,
    Supabase,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: Backend,
    pub bucket: String,
    /// Directory for the local storage backend
    pub local_storage_path: String,
    /// Page size used when walking bucket listings
    pub list_page_size: usize,
}

#[derive(Debug, Clone)]
pub struct MetadataConfig {
    pub backend: Backend,
    pub table: String,
}

#[derive(Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_key: String,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
        }
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            random_list_limit: DEFAULT_PICK_LIMIT,
            random_attempts: DEFAULT_PICK_ATTEMPTS,
            randomize_keys: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Local,
            bucket: "images".to_string(),
            local_storage_path: "./files".to_string(),
            list_page_size: 100,
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Local,
            table: "main".to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn parse_backend(name: &str) -> Result<Backend, ConfigError> {
    match std::env::var(name)
        .unwrap_or_else(|_| "local".to_string())
        .to_lowercase()
        .as_str()
    {
        "local" => Ok(Backend::Local),
        "supabase" => Ok(Backend::Supabase),
        other => Err(ConfigError::ValidationError(format!(
            "{name} must be 'local' or 'supabase', got '{other}'"
        ))),
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        let max_upload_size = env_parse("MAX_UPLOAD_SIZE", 50 * 1024 * 1024); // 50MB

        let supabase = match (
            std::env::var("SUPABASE_URL").ok(),
            std::env::var("SUPABASE_SERVICE_KEY").ok(),
        ) {
            (Some(url), Some(service_key)) => Some(SupabaseConfig { url, service_key }),
            _ => None,
        };

        let config = Config {
            admin: AdminConfig {
                username: std::env::var("ADMIN_USER").unwrap_or_default(),
                password: std::env::var("ADMIN_PASSWORD").unwrap_or_default(),
                token_secret: std::env::var("ADMIN_TOKEN_SECRET").ok(),
                token_ttl_secs: env_parse("ADMIN_TOKEN_TTL_SECS", 3600),
            },
            gallery: GalleryConfig {
                random_list_limit: env_parse("RANDOM_LIST_LIMIT", DEFAULT_PICK_LIMIT),
                randomize_keys: env_flag("RANDOMIZE_KEYS", true),
                ..Default::default()
            },
            metadata: MetadataConfig {
                backend: parse_backend("METADATA_BACKEND")?,
                table: std::env::var("METADATA_TABLE").unwrap_or_else(|_| "main".to_string()),
            },
            node: NodeConfig {
                bind_address,
                data_dir,
                public_base_url,
            },
            storage: StorageConfig {
                backend: parse_backend("STORAGE_BACKEND")?,
                bucket: std::env::var("BUCKET").unwrap_or_else(|_| "images".to_string()),
                local_storage_path: std::env::var("LOCAL_STORAGE_PATH")
                    .unwrap_or_else(|_| "./files".to_string()),
                list_page_size: env_parse("LIST_PAGE_SIZE", 100),
            },
            supabase,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.admin.username.is_empty() || self.admin.password.is_empty() {
            return Err(ConfigError::ValidationError(
                "ADMIN_USER and ADMIN_PASSWORD are required".to_string(),
            ));
        }

        if matches!(self.admin.token_secret.as_deref(), Some("")) {
            return Err(ConfigError::ValidationError(
                "ADMIN_TOKEN_SECRET must not be empty when set".to_string(),
            ));
        }

        if self.admin.token_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "ADMIN_TOKEN_TTL_SECS must be greater than 0".to_string(),
            ));
        }

        let needs_supabase = self.storage.backend == Backend::Supabase
            || self.metadata.backend == Backend::Supabase;
        if needs_supabase && self.supabase.is_none() {
            return Err(ConfigError::ValidationError(
                "SUPABASE_URL and SUPABASE_SERVICE_KEY are required for the supabase backend"
                    .to_string(),
            ));
        }

        if self.storage.bucket.is_empty() || self.metadata.table.is_empty() {
            return Err(ConfigError::ValidationError(
                "BUCKET and METADATA_TABLE must not be empty".to_string(),
            ));
        }

        if self.storage.list_page_size == 0 || self.gallery.random_list_limit == 0 {
            return Err(ConfigError::ValidationError(
                "LIST_PAGE_SIZE and RANDOM_LIST_LIMIT must be greater than 0".to_string(),
            ));
        }

        if self.storage.backend == Backend::Local && self.metadata.backend == Backend::Supabase {
            tracing::warn!(
                "Local storage with a Supabase metadata table: indexed URLs point at {}",
                self.node.public_base_url
            );
        }

        Ok(())
    }
}

use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Supabase,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(StorageBackend::Memory),
            "supabase" | "postgrest" => Ok(StorageBackend::Supabase),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub storage_backend: StorageBackend,
    pub allocation_lock_timeout_ms: u64,
    pub default_timezone: String,
    pub notification_webhook_url: Option<String>,
    pub reminder_interval_seconds: u64,
    pub bind_address: String,
    /// JSON file of facilities and subjects loaded into the in-memory directory.
    pub directory_seed_file: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            storage_backend: env::var("STORAGE_BACKEND")
                .ok()
                .and_then(|raw| match raw.parse() {
                    Ok(backend) => Some(backend),
                    Err(e) => {
                        warn!("{}, falling back to in-memory storage", e);
                        None
                    }
                })
                .unwrap_or(StorageBackend::Memory),
            allocation_lock_timeout_ms: parse_or_default("ALLOCATION_LOCK_TIMEOUT_MS", 5_000),
            default_timezone: env::var("DEFAULT_TIMEZONE")
                .unwrap_or_else(|_| "UTC".to_string()),
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            reminder_interval_seconds: parse_or_default("REMINDER_INTERVAL_SECONDS", 3_600),
            bind_address: env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            directory_seed_file: env::var("DIRECTORY_SEED_FILE")
                .ok()
                .filter(|path| !path.trim().is_empty()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    /// Minimal settings needed to authenticate callers and, when selected,
    /// reach the Supabase backend.
    pub fn is_configured(&self) -> bool {
        let storage_ready = match self.storage_backend {
            StorageBackend::Memory => true,
            StorageBackend::Supabase => {
                !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
            }
        };
        storage_ready && !self.supabase_jwt_secret.is_empty()
    }

    pub fn uses_supabase(&self) -> bool {
        self.storage_backend == StorageBackend::Supabase
    }
}

fn parse_or_default(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) if value > 0 => value,
            _ => {
                warn!("{} must be a positive number ({}), using {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

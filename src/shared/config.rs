//! Application configuration. Store selection, backend credentials, paths.

use crate::domain::DomainError;
use crate::usecases::reminder_service::DEFAULT_UPCOMING_LIMIT;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_EXPORT_DIR: &str = "./exports";

/// Which record store the binary wires up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    Sqlite,
    Postgrest,
}

impl FromStr for StoreKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" | "local" => Ok(StoreKind::Sqlite),
            "postgrest" | "supabase" | "remote" => Ok(StoreKind::Postgrest),
            other => Err(DomainError::Config(format!(
                "unknown store '{}', expected sqlite or postgrest",
                other
            ))),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Sqlite => f.write_str("sqlite"),
            StoreKind::Postgrest => f.write_str("postgrest"),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// `sqlite` (default) or `postgrest`. Read from PREGNANCY_STORE.
    #[serde(default)]
    pub store: Option<String>,

    /// Directory for the SQLite database. Read from PREGNANCY_DATA_DIR.
    #[serde(default)]
    pub data_dir: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Hosted backend (PostgREST / Supabase)
    // ─────────────────────────────────────────────────────────────────────────
    /// Project URL. Read from PREGNANCY_BACKEND_URL, falls back to SUPABASE_URL.
    #[serde(default)]
    pub backend_url: Option<String>,

    /// Anon API key. Read from PREGNANCY_BACKEND_ANON_KEY, falls back to SUPABASE_ANON_KEY.
    #[serde(default)]
    pub backend_anon_key: Option<String>,

    /// Signed-in user's JWT. Read from PREGNANCY_BACKEND_ACCESS_TOKEN.
    #[serde(default)]
    pub backend_access_token: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Application
    // ─────────────────────────────────────────────────────────────────────────
    /// User whose dashboard the binary shows. Read from PREGNANCY_OWNER_ID.
    #[serde(default)]
    pub owner_id: Option<String>,

    /// Size of the upcoming-reminders slice (default 5). Read from PREGNANCY_UPCOMING_LIMIT.
    #[serde(default)]
    pub upcoming_limit: Option<usize>,

    /// Where trend CSVs are written. Read from PREGNANCY_EXPORT_DIR.
    #[serde(default)]
    pub export_dir: Option<String>,
}

impl AppConfig {
    /// Reads the process environment and the optional PREGNANCY_CONFIG file.
    /// `.env` is not read here; the binary loads it once at startup.
    pub fn load() -> Result<Self, config::ConfigError> {
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("PREGNANCY"));
        if let Ok(path) = std::env::var("PREGNANCY_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        let mut cfg: Self = c.build()?.try_deserialize()?;
        // Frontend-style names, so an existing Supabase .env works unchanged
        if cfg.backend_url.is_none() {
            cfg.backend_url = std::env::var("SUPABASE_URL").ok();
        }
        if cfg.backend_anon_key.is_none() {
            cfg.backend_anon_key = std::env::var("SUPABASE_ANON_KEY").ok();
        }
        Ok(cfg)
    }

    /// Parsed store kind. Defaults to SQLite when unset.
    pub fn store_kind(&self) -> Result<StoreKind, DomainError> {
        match self.store.as_deref() {
            None => Ok(StoreKind::default()),
            Some(s) => s.parse(),
        }
    }

    pub fn data_dir_or_default(&self) -> String {
        self.data_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
    }

    pub fn export_dir_or_default(&self) -> String {
        self.export_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_EXPORT_DIR.to_string())
    }

    /// Returns the upcoming-reminders limit. Defaults to 5; zero counts as unset.
    pub fn upcoming_limit_or_default(&self) -> usize {
        self.upcoming_limit
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_UPCOMING_LIMIT)
    }

    /// Returns true if the hosted backend is fully configured.
    pub fn is_backend_configured(&self) -> bool {
        self.backend_url.as_deref().is_some_and(|s| !s.is_empty())
            && self.backend_anon_key.as_deref().is_some_and(|s| !s.is_empty())
    }
}

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// How the harvest deduplicator derives its per-listing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupStrategy {
    /// `name` + `address`, the only key the directory reliably renders.
    #[default]
    Composite,
    /// The structured payload's `contractor_id` when present, composite otherwise.
    ExternalId,
}

impl std::fmt::Display for DedupStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DedupStrategy::Composite => write!(f, "composite"),
            DedupStrategy::ExternalId => write!(f, "external-id"),
        }
    }
}

/// Header used to authenticate against the text-generation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsightsAuth {
    /// Azure OpenAI style: `api-key: <key>`.
    #[default]
    ApiKey,
    /// OpenAI style: `Authorization: Bearer <key>`.
    Bearer,
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,

    pub site_base_url: String,
    pub site_postal_code: String,
    pub site_country_code: String,
    pub site_distance: u32,
    pub site_profile_path: Option<PathBuf>,

    pub harvest_max_pages: u32,
    pub harvest_page_load_secs: u64,
    pub harvest_transition_secs: u64,
    pub harvest_scroll_step_px: u64,
    pub harvest_scroll_pause_ms: u64,
    pub harvest_settle_ms: u64,
    pub harvest_dedup_key: DedupStrategy,

    pub chrome_path: Option<PathBuf>,
    pub chrome_headless: bool,

    pub insights_api_url: Option<String>,
    pub insights_api_key: Option<String>,
    pub insights_auth: InsightsAuth,
    pub insights_model: String,
    pub insights_timeout_secs: u64,
    pub insights_delay_ms: u64,
    pub insights_max_tokens: u32,
}

impl AppConfig {
    /// Builds the directory search URL from the base path and the
    /// distance / postal code / country code query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidEnvVar`] if `site_base_url` is not
    /// an absolute URL.
    pub fn search_url(&self) -> Result<url::Url, crate::ConfigError> {
        let mut url = url::Url::parse(&self.site_base_url).map_err(|e| {
            crate::ConfigError::InvalidEnvVar {
                var: "CONDIR_SITE_BASE_URL".to_string(),
                reason: e.to_string(),
            }
        })?;
        url.query_pairs_mut()
            .append_pair("distance", &self.site_distance.to_string())
            .append_pair("postalCode", &self.site_postal_code)
            .append_pair("countryCode", &self.site_country_code);
        Ok(url)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("site_base_url", &self.site_base_url)
            .field("site_postal_code", &self.site_postal_code)
            .field("site_country_code", &self.site_country_code)
            .field("site_distance", &self.site_distance)
            .field("site_profile_path", &self.site_profile_path)
            .field("harvest_max_pages", &self.harvest_max_pages)
            .field("harvest_page_load_secs", &self.harvest_page_load_secs)
            .field("harvest_transition_secs", &self.harvest_transition_secs)
            .field("harvest_scroll_step_px", &self.harvest_scroll_step_px)
            .field("harvest_scroll_pause_ms", &self.harvest_scroll_pause_ms)
            .field("harvest_settle_ms", &self.harvest_settle_ms)
            .field("harvest_dedup_key", &self.harvest_dedup_key)
            .field("chrome_path", &self.chrome_path)
            .field("chrome_headless", &self.chrome_headless)
            .field("insights_api_url", &self.insights_api_url)
            .field(
                "insights_api_key",
                &self.insights_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("insights_auth", &self.insights_auth)
            .field("insights_model", &self.insights_model)
            .field("insights_timeout_secs", &self.insights_timeout_secs)
            .field("insights_delay_ms", &self.insights_delay_ms)
            .field("insights_max_tokens", &self.insights_max_tokens)
            .finish()
    }
}

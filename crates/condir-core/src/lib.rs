//! Shared types and configuration for the contractor directory harvester.

pub mod app_config;
pub mod config;
pub mod listing;
pub mod site_profile;

use thiserror::Error;

pub use app_config::{AppConfig, DedupStrategy, Environment, InsightsAuth};
pub use config::{load_app_config, load_app_config_from_env};
pub use listing::{ListingRecord, NormalizedContractor};
pub use site_profile::{
    load_site_profile, parse_site_profile, ControlLocator, FieldProbe, SiteProfile,
    StructuredPayload, PAGE_PLACEHOLDER,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read site profile {path}: {source}")]
    ProfileFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse site profile: {0}")]
    ProfileFileParse(#[from] serde_yaml::Error),

    #[error("site profile validation failed: {0}")]
    Validation(String),
}

//! Configuration module

use std::env;

use intruscan_core::PipelineConfig;

/// Default upload limit: 64 MiB
const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// CORS origin; any origin when unset
    pub allowed_origin: Option<String>,

    /// Largest accepted request body
    pub max_upload_bytes: usize,

    /// Environment (development, production)
    pub environment: String,

    /// Analysis engine settings
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),

            allowed_origin: env::var("ALLOWED_ORIGIN")
                .ok()
                .filter(|o| !o.trim().is_empty()),

            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|b| b.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),

            pipeline: PipelineConfig::from_env(),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            allowed_origin: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            environment: "development".to_string(),
            pipeline: PipelineConfig::default(),
        }
    }
}

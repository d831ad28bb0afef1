//! Configuration module

use std::env;

/// Collector configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Entries kept per slot timeline and in the raw log
    pub history_capacity: usize,

    /// Distinct slots tracked; messages for further slots are rejected
    pub max_slots: usize,

    /// Environment (development, production)
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            history_capacity: 2000,
            max_slots: 1000,
            environment: "development".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),

            history_capacity: env::var("HISTORY_CAPACITY")
                .ok()
                .and_then(|c| c.parse().ok())
                .filter(|&c: &usize| c > 0)
                .unwrap_or(defaults.history_capacity),

            max_slots: env::var("MAX_SLOTS")
                .ok()
                .and_then(|c| c.parse().ok())
                .filter(|&c: &usize| c > 0)
                .unwrap_or(defaults.max_slots),

            environment: env::var("ENVIRONMENT")
                .unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

use crate::components::google_calendar::aggregator::FailurePolicy;
use crate::error::{config_error, TabResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Calendar display names whose events are shown on the page
pub const CALENDAR_NAMES: &[&str] = &[
    "Privat",
    "Studier",
    "TimeEdit",
    "Kårstyrelsen",
    "S + FM: Möten och handlingar",
    "Jobb",
    "Tasks",
    "Alice sommar",
];

/// Background images, relative to the served images directory's parent
pub const BACKGROUND_IMAGES: &[&str] = &[
    "images/R1-04405-000A.JPG",
    "images/R1-04405-002A.JPG",
    "images/S24 Kodak Gold-15.jpg",
    "images/S24 Kodak Gold-19.jpg",
    "images/S24 Kodak Gold-22.jpg",
    "images/S24 Kodak Gold-37.jpg",
];

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_REDIRECT_PORT: u16 = 8080;

const COMPONENTS_FILE: &str = "config/components.toml";

/// IANA name of the host timezone, "UTC" when it can't be determined
pub fn system_timezone() -> String {
    match iana_time_zone::get_timezone() {
        Ok(name) if name.parse::<Tz>().is_ok() => name,
        Ok(name) => {
            warn!("Host timezone '{}' is not a known IANA zone, using UTC", name);
            String::from("UTC")
        }
        Err(e) => {
            warn!("Could not determine host timezone ({}), using UTC", e);
            String::from("UTC")
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Google OAuth client ID, needed for the interactive sign-in
    pub google_client_id: Option<String>,
    /// Google OAuth client secret
    pub google_client_secret: Option<String>,
    /// Pre-issued access token; skips the interactive sign-in when set
    pub google_access_token: Option<String>,
    /// Local port receiving the OAuth redirect
    pub oauth_redirect_port: u16,
    /// Calendar API base URL
    pub calendar_api_base: String,
    /// IANA timezone used for the week window, labels and the clock.
    /// `from_vars` falls back to the host zone when `TIMEZONE` is unset.
    pub timezone: String,
    /// Port the new-tab page is served on
    pub port: u16,
    /// What to do when some calendars fail to load
    pub failure_policy: FailurePolicy,
    /// Directory served under /images
    pub images_dir: String,
    /// Calendar display names to include
    pub calendar_names: Vec<String>,
    /// Candidate background images
    pub background_images: Vec<String>,
    /// Map of component names to their enabled status
    pub components: HashMap<String, bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            google_client_id: None,
            google_client_secret: None,
            google_access_token: None,
            oauth_redirect_port: DEFAULT_REDIRECT_PORT,
            calendar_api_base: DEFAULT_API_BASE.to_string(),
            timezone: String::from("UTC"),
            port: DEFAULT_PORT,
            failure_policy: FailurePolicy::default(),
            images_dir: String::from("images"),
            calendar_names: CALENDAR_NAMES.iter().map(|s| s.to_string()).collect(),
            background_images: BACKGROUND_IMAGES.iter().map(|s| s.to_string()).collect(),
            components: default_components(),
        }
    }
}

fn default_components() -> HashMap<String, bool> {
    let mut components = HashMap::new();
    components.insert("clock".to_string(), true);
    components.insert("google_calendar".to_string(), true);
    components
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> TabResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let mut config = Self::from_vars(|key| env::var(key).ok())?;

        if Path::new(COMPONENTS_FILE).exists() {
            let content = fs::read_to_string(COMPONENTS_FILE)?;
            config.merge_components(&content)?;
        }

        Ok(config)
    }

    /// Build a configuration from a variable lookup, falling back to defaults
    pub fn from_vars<F>(lookup: F) -> TabResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|_| config_error("Invalid PORT format"))?,
            None => defaults.port,
        };

        let oauth_redirect_port = match lookup("OAUTH_REDIRECT_PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|_| config_error("Invalid OAUTH_REDIRECT_PORT format"))?,
            None => defaults.oauth_redirect_port,
        };

        let failure_policy = match lookup("FETCH_FAILURE_POLICY") {
            Some(p) => p.parse::<FailurePolicy>()?,
            None => defaults.failure_policy,
        };

        let config = Config {
            google_client_id: lookup("GOOGLE_CLIENT_ID").filter(|v| !v.is_empty()),
            google_client_secret: lookup("GOOGLE_CLIENT_SECRET").filter(|v| !v.is_empty()),
            google_access_token: lookup("GOOGLE_ACCESS_TOKEN").filter(|v| !v.is_empty()),
            oauth_redirect_port,
            calendar_api_base: lookup("CALENDAR_API_BASE").unwrap_or(defaults.calendar_api_base),
            timezone: lookup("TIMEZONE")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(system_timezone),
            port,
            failure_policy,
            images_dir: lookup("IMAGES_DIR").unwrap_or(defaults.images_dir),
            ..defaults
        };

        // Fail early on a bad timezone rather than on the first render
        config.timezone()?;

        Ok(config)
    }

    /// Merge component toggles from TOML text over the defaults
    pub fn merge_components(&mut self, content: &str) -> TabResult<()> {
        let file_components = toml::from_str::<HashMap<String, bool>>(content)?;
        for (key, value) in file_components {
            self.components.insert(key, value);
        }
        Ok(())
    }

    /// Parsed display timezone
    pub fn timezone(&self) -> TabResult<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| config_error(&format!("Invalid TIMEZONE '{}': {}", self.timezone, e)))
    }

    /// Check if a component is enabled
    pub fn is_component_enabled(&self, name: &str) -> bool {
        *self.components.get(name).unwrap_or(&false)
    }
}

use std::{fs, io::ErrorKind, path::Path, time::Duration};

use anyhow::Context;
use client_core::FormSettings;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "bookcart.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base_url: String,
    pub upload_route_prefix: String,
    pub list_route: String,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let form = FormSettings::default();
        Self {
            api_base_url: "http://localhost:5000/".into(),
            upload_route_prefix: form.upload_route_prefix,
            list_route: form.list_route,
            request_timeout_secs: form.request_timeout.as_secs(),
        }
    }
}

impl Settings {
    pub fn form_settings(&self) -> FormSettings {
        FormSettings {
            upload_route_prefix: self.upload_route_prefix.clone(),
            list_route: self.list_route.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// Defaults, then `path` if it exists, then environment overrides.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => parse_settings(&raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(err) if err.kind() == ErrorKind::NotFound => Settings::default(),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    };
    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn parse_settings(raw: &str) -> Result<Settings, toml::de::Error> {
    toml::from_str(raw)
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("BOOKCART_API_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = var("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = var("APP__UPLOAD_ROUTE_PREFIX") {
        settings.upload_route_prefix = v;
    }

    if let Some(v) = var("APP__LIST_ROUTE") {
        settings.list_route = v;
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }
}

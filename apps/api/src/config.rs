use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::sponsors::catalog::TagCatalog;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Upsert the tag catalog into `sponsor_tags` before serving.
    pub seed_tags_on_startup: bool,
    /// JSON catalog replacing the built-in tag vocabulary.
    pub tag_catalog_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            seed_tags_on_startup: match std::env::var("SEED_TAGS_ON_STARTUP") {
                Ok(value) => parse_bool("SEED_TAGS_ON_STARTUP", &value)?,
                Err(_) => true,
            },
            tag_catalog_path: std::env::var_os("TAG_CATALOG_PATH").map(PathBuf::from),
        })
    }

    /// The configured tag catalog, or the built-in one.
    pub fn load_catalog(&self) -> Result<TagCatalog> {
        match &self.tag_catalog_path {
            Some(path) => TagCatalog::from_json_file(path),
            None => Ok(TagCatalog::builtin()),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{key} must be a boolean, got '{other}'"),
    }
}

use crate::{jobs, uploads};
use anyhow::Context;
use std::io::Read;

const CONFIG_FILE: &str = "./app-config.toml";

#[derive(serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bind_address: String,
    pub bind_port: u16,
    pub database: libportal_db::Config,
    #[serde(default)]
    pub pages: PagesConfig,
    pub uploads: uploads::Config,
    #[serde(default)]
    pub session: SessionConfig,
    pub jobs: jobs::Config,
    pub tracing: TracingConfig,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PagesConfig {
    pub per_page: i64,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self { per_page: 15 }
    }
}

/// Set `secure-cookie = false` only when serving plain HTTP during development.
#[derive(serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SessionConfig {
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secure_cookie: true,
        }
    }
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TracingConfig {
    pub console: bool,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    let mut configuration = String::with_capacity(4096);
    std::fs::File::open(CONFIG_FILE)
        .with_context(|| format!("unable to open configuration file {CONFIG_FILE}"))?
        .read_to_string(&mut configuration)
        .with_context(|| format!("unable to read configuration file {CONFIG_FILE}"))?;
    let mut config = parse(&configuration)
        .with_context(|| format!("unable to parse configuration file {CONFIG_FILE}"))?;
    if let Ok(db_url) = std::env::var(libportal_db::LOGIN_DATABASE_URL_VAR) {
        config.database.login.set_db_url(db_url);
    }
    if let Ok(db_url) = std::env::var(libportal_db::LIBRARY_DATABASE_URL_VAR) {
        config.database.library.set_db_url(db_url);
    }
    Ok(config)
}

pub fn parse(configuration: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(configuration)
}

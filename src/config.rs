use std::path::PathBuf;

use anyhow::{anyhow, Result};

pub const SITE_URL: &str = "https://www.idealist.org";
pub const SESSION_FILE: &str = "idealist_login.json";

/// Everything the scrape pipeline needs, read from the environment once at
/// startup and passed by reference from there on.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub email: String,
    pub password: String,
    pub query_api_key: String,
    pub table: TableConfig,
    pub base_url: String,
    pub session_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TableConfig {
    pub api_key: String,
    pub base_id: String,
    pub table_name: String,
}

impl ScrapeConfig {
    pub fn from_env() -> Result<Self> {
        Ok(ScrapeConfig {
            email: require("EMAIL")?,
            password: require("PASSWORD")?,
            query_api_key: require("AGENTQL_API_KEY")?,
            table: TableConfig {
                api_key: require("AIRTABLE_API_KEY")?,
                base_id: require("AIRTABLE_BASE_ID")?,
                table_name: require("AIRTABLE_TABLE_NAME")?,
            },
            base_url: SITE_URL.into(),
            session_file: PathBuf::from(SESSION_FILE),
        })
    }
}

/// Reader pipeline configuration. The API key and rendering mode are
/// optional; the output directory is not.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub api_key: Option<String>,
    pub browser_mode: Option<String>,
    pub output_dir: PathBuf,
}

impl ReaderConfig {
    pub fn from_env() -> Result<Self> {
        Ok(ReaderConfig {
            api_key: optional("JINA_API_KEY"),
            browser_mode: optional("JINA_BROWSER"),
            output_dir: PathBuf::from(require("OUTPUT_DIR")?),
        })
    }
}

fn require(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| anyhow!("required environment variable {} is not set", name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

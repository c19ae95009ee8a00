use anyhow::Result;
use serde_json::json;
use thiserror::Error;

use crate::{
    config::TableConfig,
    scraper::RecordSink,
    types::{JobPost, PushFailure, PushReport},
};

pub const TABLE_API_URL: &str = "https://api.airtable.com/v0";

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("table api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Pushes records to the hosted table store, one row-create call per
/// record. A failed record is reported, not fatal to the rest of the batch.
pub struct AirtableSink {
    client: reqwest::Client,
    api_key: String,
    base_id: String,
    table_name: String,
}

impl AirtableSink {
    pub fn new(cfg: &TableConfig) -> Self {
        AirtableSink {
            client: reqwest::Client::new(),
            api_key: cfg.api_key.clone(),
            base_id: cfg.base_id.clone(),
            table_name: cfg.table_name.clone(),
        }
    }

    async fn create_row(&self, post: &JobPost) -> Result<(), SinkError> {
        let url = format!("{}/{}/{}", TABLE_API_URL, self.base_id, self.table_name);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "fields": post }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SinkError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(())
    }
}

impl RecordSink for AirtableSink {
    async fn push_batch(&self, posts: &[JobPost]) -> Result<PushReport> {
        let mut report = PushReport::default();
        for (index, post) in posts.iter().enumerate() {
            match self.create_row(post).await {
                Ok(()) => report.pushed += 1,
                Err(e) => report.failures.push(PushFailure {
                    index,
                    error: e.to_string(),
                }),
            }
        }
        info!("{} records pushed to {}", report.pushed, self.table_name);
        Ok(report)
    }
}

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

pub const QUERY_API_URL: &str = "https://api.agentql.com/v1/query-data";

const QUERY_TIMEOUT_SECS: u64 = 60;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("query api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Client for the semantic page-query service: ship the current page HTML
/// plus a declarative shape description, get back typed data or per-field
/// element locators.
pub struct QueryClient {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    html: &'a str,
    params: QueryParams<'a>,
}

#[derive(Serialize)]
struct QueryParams<'a> {
    mode: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse<T> {
    data: T,
}

impl QueryClient {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(QUERY_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        QueryClient { client, api_key }
    }

    /// Structured extraction: the response data matches the record shape in
    /// the query, already typed and coerced.
    pub async fn extract<T: DeserializeOwned>(
        &self,
        html: &str,
        query: &str,
    ) -> Result<T, QueryError> {
        self.post(html, query, "standard").await
    }

    /// Element location: the response data carries a CSS selector per
    /// described field.
    pub async fn elements<T: DeserializeOwned>(
        &self,
        html: &str,
        query: &str,
    ) -> Result<T, QueryError> {
        self.post(html, query, "fast").await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        html: &str,
        query: &str,
        mode: &str,
    ) -> Result<T, QueryError> {
        let resp = self
            .client
            .post(QUERY_API_URL)
            .header("X-API-Key", &self.api_key)
            .json(&QueryRequest {
                query,
                html,
                params: QueryParams { mode },
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(QueryError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: QueryResponse<T> = resp.json().await?;
        Ok(parsed.data)
    }
}

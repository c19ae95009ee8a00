use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{json, Map, Value};
use tokio_retry::{strategy::ExponentialBackoff, Retry};

use crate::{config::ReaderConfig, types::ReadResult, utils::truncate_chars};

// Reader: prepend the reader host to the target URL.
// Search: the search host with ?q=QUERY returns aggregated cleaned content
// from the top results. A key is optional but raises the rate limits.
pub const READER_HOST: &str = "https://r.jina.ai";
pub const SEARCH_HOST: &str = "https://s.jina.ai/";

const READ_ATTEMPTS: usize = 3;
const READ_TIMEOUT_SECS: u64 = 45;
const ERROR_EXCERPT_CHARS: usize = 500;

/// Client for the hosted web-reader API. Transport failures are retried
/// with exponential backoff; HTTP-level failures are captured on the
/// returned result and never retried.
pub struct ReaderClient {
    client: reqwest::Client,
    api_key: Option<String>,
    browser_mode: Option<String>,
}

impl ReaderClient {
    pub fn new(cfg: &ReaderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .build()
            .context("could not build the reader http client")?;
        Ok(ReaderClient {
            client,
            api_key: cfg.api_key.clone(),
            browser_mode: cfg.browser_mode.clone(),
        })
    }

    // 1s, 2s, ... capped at 8s between attempts
    fn backoff() -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(2)
            .factor(500)
            .max_delay(Duration::from_secs(8))
            .take(READ_ATTEMPTS - 1)
    }

    /// Fetches cleaned content for `url` by prefixing the reader host.
    /// After exhausting retries the final transport error propagates.
    pub async fn read_url(&self, url: &str) -> Result<ReadResult> {
        Retry::spawn(Self::backoff(), || self.fetch_read(url))
            .await
            .context(format!(
                "reader request for {} failed after {} attempts",
                url, READ_ATTEMPTS
            ))
    }

    pub async fn read_bulk(&self, urls: &[String]) -> Result<Vec<ReadResult>> {
        let mut results = Vec::with_capacity(urls.len());
        for url in urls {
            results.push(self.read_url(url).await?);
        }
        Ok(results)
    }

    /// Searches the web and returns the aggregated cleaned content of the
    /// top results as a single record.
    pub async fn search_and_read(&self, query: &str, top_k: u32) -> Result<ReadResult> {
        Retry::spawn(Self::backoff(), || self.fetch_search(query, top_k))
            .await
            .context(format!(
                "search request for '{}' failed after {} attempts",
                query, READ_ATTEMPTS
            ))
    }

    async fn fetch_read(&self, url: &str) -> Result<ReadResult, reqwest::Error> {
        let requested = format!("{}/{}", READER_HOST, url);

        let mut params: Vec<(&str, String)> = vec![("format", "markdown".into())];
        if let Some(mode) = &self.browser_mode {
            params.push(("browser", mode.clone()));
        }

        let mut req = self.client.get(&requested).query(&params);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let ok = resp.status().is_success();
        let body = resp.text().await?;

        let mut meta = Map::new();
        meta.insert("requested_url".into(), json!(requested));
        meta.insert("params".into(), params_object(&params));

        Ok(Self::result_from_response(url.to_string(), status, ok, body, meta))
    }

    async fn fetch_search(&self, query: &str, top_k: u32) -> Result<ReadResult, reqwest::Error> {
        let params: Vec<(&str, String)> =
            vec![("q", query.to_string()), ("top_k", top_k.to_string())];

        let mut req = self.client.get(SEARCH_HOST).query(&params);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let ok = resp.status().is_success();
        let body = resp.text().await?;

        let mut meta = Map::new();
        meta.insert("params".into(), params_object(&params));

        Ok(Self::result_from_response(
            search_source_id(query),
            status,
            ok,
            body,
            meta,
        ))
    }

    fn result_from_response(
        url: String,
        status: u16,
        ok: bool,
        body: String,
        meta: Map<String, Value>,
    ) -> ReadResult {
        let (content, error) = if ok {
            (Some(body), None)
        } else {
            (None, Some(truncate_chars(&body, ERROR_EXCERPT_CHARS)))
        };
        ReadResult {
            url,
            status,
            fetched_at: Utc::now(),
            content,
            meta,
            error,
        }
    }
}

/// The pseudo-URL recorded as the source identifier of a search result.
pub fn search_source_id(query: &str) -> String {
    format!("s.jina.ai?q={}", urlencoding::encode(query))
}

fn params_object(params: &[(&str, String)]) -> Value {
    let mut obj = Map::new();
    for (k, v) in params {
        obj.insert((*k).into(), json!(v));
    }
    Value::Object(obj)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_retry::strategy::FixedInterval;

    macro_rules! aw {
        ($e:expr) => {
            tokio_test::block_on($e)
        };
    }

    #[test]
    fn backoff_doubles_from_one_second_and_caps_at_eight() {
        let delays: Vec<Duration> = ReaderClient::backoff().collect();
        assert_eq!(
            delays,
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );

        let uncapped: Vec<Duration> = ExponentialBackoff::from_millis(2)
            .factor(500)
            .max_delay(Duration::from_secs(8))
            .take(6)
            .collect();
        assert_eq!(uncapped[..4].to_vec(), vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(8),
        ]);
        assert!(uncapped.iter().all(|d| *d <= Duration::from_secs(8)));
    }

    #[test]
    fn transport_failures_retry_three_times_then_propagate() {
        let attempts = AtomicUsize::new(0);
        let result: Result<(), std::io::Error> = aw!(Retry::spawn(
            FixedInterval::from_millis(1).take(READ_ATTEMPTS - 1),
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        "connection reset",
                    ))
                }
            }
        ));
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), READ_ATTEMPTS);
    }

    #[test]
    fn non_success_status_is_captured_not_retried() {
        let body = "x".repeat(600);
        let res = ReaderClient::result_from_response(
            "https://example.com".into(),
            404,
            false,
            body,
            Map::new(),
        );
        assert_eq!(res.status, 404);
        assert!(res.content.is_none());
        let error = res.error.unwrap();
        assert_eq!(error.chars().count(), ERROR_EXCERPT_CHARS);
    }

    #[test]
    fn success_keeps_the_body_as_content() {
        let res = ReaderClient::result_from_response(
            "https://example.com".into(),
            200,
            true,
            "# Title\n\nbody".into(),
            Map::new(),
        );
        assert_eq!(res.status, 200);
        assert_eq!(res.content.as_deref(), Some("# Title\n\nbody"));
        assert!(res.error.is_none());
    }

    #[test]
    fn search_source_id_encodes_the_query() {
        assert_eq!(
            search_source_id("rust web scraping"),
            "s.jina.ai?q=rust%20web%20scraping"
        );
    }
}

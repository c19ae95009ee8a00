use std::sync::Arc;

use anyhow::{bail, Context, Result};
use headless_chrome::Tab;

use crate::{
    browser_controller::BrowserController,
    page_query::QueryClient,
    queries::{self, JobPostsData, PaginationData},
    types::{JobPost, PushReport, ScrapeOutcome},
};

/// One listing page the loop can drive. The production implementation is
/// [`BrowserListingPage`]; tests substitute scripted fakes.
pub trait ListingPage {
    async fn open(&mut self, url: &str) -> Result<()>;
    fn current_url(&self) -> String;
    async fn extract_posts(&mut self) -> Result<Vec<JobPost>>;
    /// Locate and click the next-page control. `Ok(false)` when no control
    /// is present on the page.
    async fn advance(&mut self) -> Result<bool>;
}

pub trait RecordSink {
    async fn push_batch(&self, posts: &[JobPost]) -> Result<PushReport>;
}

#[derive(Builder, Debug, Clone)]
#[builder(setter(into))]
pub struct ScrapeOptions {
    // safety bound on listing pages visited in one run
    #[builder(default = "50")]
    pub max_pages: usize,
    // browser timeout in seconds, also bounds readiness polling
    #[builder(default = "45")]
    pub browser_timeout: u64,
    #[builder(default = "true")]
    pub headless: bool,
}

impl ScrapeOptions {
    pub fn default_builder() -> ScrapeOptionsBuilder {
        ScrapeOptionsBuilder::default()
    }
}

enum State {
    NotStarted,
    PageLoaded,
    RecordsExtracted(Vec<JobPost>),
    PushedToSink,
    PaginationAttempted { url_before: String },
    Done(ScrapeOutcome),
}

/// The scrape-and-sync loop: extract the records on the current page, hand
/// the batch to the sink, advance pagination, and stop once the post-click
/// URL stops changing or the page safety bound is reached.
pub struct ScrapeSyncLoop<P, S> {
    page: P,
    sink: S,
    max_pages: usize,
    pages_visited: usize,
    records_pushed: usize,
}

impl<P: ListingPage, S: RecordSink> ScrapeSyncLoop<P, S> {
    pub fn new(page: P, sink: S, max_pages: usize) -> Self {
        ScrapeSyncLoop {
            page,
            sink,
            max_pages,
            pages_visited: 0,
            records_pushed: 0,
        }
    }

    pub async fn run(mut self, listing_url: &str) -> Result<ScrapeOutcome> {
        let mut state = State::NotStarted;
        loop {
            state = match state {
                State::NotStarted => {
                    self.page.open(listing_url).await?;
                    self.pages_visited = 1;
                    State::PageLoaded
                }
                State::PageLoaded => {
                    let posts = self.page.extract_posts().await?;
                    info!(
                        "{} job posts on {}",
                        posts.len(),
                        self.page.current_url()
                    );
                    State::RecordsExtracted(posts)
                }
                State::RecordsExtracted(posts) => {
                    if posts.is_empty() {
                        debug!("empty page, nothing to push");
                    } else {
                        let report = self.sink.push_batch(&posts).await?;
                        if report.pushed == 0 {
                            bail!(
                                "sink rejected the whole batch of {} records on {}",
                                posts.len(),
                                self.page.current_url()
                            );
                        }
                        for failure in &report.failures {
                            warn!("record {} not delivered: {}", failure.index, failure.error);
                        }
                        self.records_pushed += report.pushed;
                    }
                    State::PushedToSink
                }
                State::PushedToSink => {
                    if self.pages_visited >= self.max_pages {
                        State::Done(ScrapeOutcome::SafetyLimitHit {
                            pages_visited: self.pages_visited,
                            records_pushed: self.records_pushed,
                        })
                    } else {
                        let url_before = self.page.current_url();
                        if self.page.advance().await? {
                            State::PaginationAttempted { url_before }
                        } else {
                            debug!("no next-page control on {}", url_before);
                            State::Done(self.exhausted())
                        }
                    }
                }
                State::PaginationAttempted { url_before } => {
                    // an unchanged URL after the click means the listing has
                    // no further pages
                    if self.page.current_url() == url_before {
                        State::Done(self.exhausted())
                    } else {
                        self.pages_visited += 1;
                        State::PageLoaded
                    }
                }
                State::Done(outcome) => return Ok(outcome),
            };
        }
    }

    fn exhausted(&self) -> ScrapeOutcome {
        ScrapeOutcome::Exhausted {
            pages_visited: self.pages_visited,
            records_pushed: self.records_pushed,
        }
    }
}

/// Production [`ListingPage`]: a browser tab plus the page-query client.
pub struct BrowserListingPage {
    browser: BrowserController,
    tab: Arc<Tab>,
    query: QueryClient,
}

impl BrowserListingPage {
    pub fn new(browser: BrowserController, tab: Arc<Tab>, query: QueryClient) -> Self {
        BrowserListingPage {
            browser,
            tab,
            query,
        }
    }
}

impl ListingPage for BrowserListingPage {
    async fn open(&mut self, url: &str) -> Result<()> {
        self.browser.goto(&self.tab, url).await
    }

    fn current_url(&self) -> String {
        self.tab.get_url()
    }

    async fn extract_posts(&mut self) -> Result<Vec<JobPost>> {
        let html = self
            .tab
            .get_content()
            .context("could not read page content")?;
        let data: JobPostsData = self
            .query
            .extract(&html, queries::JOB_POSTS_QUERY)
            .await
            .context("job post extraction failed")?;
        Ok(data.job_posts)
    }

    async fn advance(&mut self) -> Result<bool> {
        let html = self
            .tab
            .get_content()
            .context("could not read page content")?;
        let data: PaginationData = self
            .query
            .elements(&html, queries::PAGINATION_QUERY)
            .await
            .context("pagination lookup failed")?;

        let next = match data.pagination.next_page_btn {
            Some(next) => next,
            None => return Ok(false),
        };
        self.browser
            .click(&self.tab, &next.selector)
            .context("could not click the next-page control")?;
        self.browser.wait_ready(&self.tab).await?;
        Ok(true)
    }
}

use anyhow::{Context, Result};
use headless_chrome::protocol::cdp::Network::{Cookie, CookieParam};
use headless_chrome::Tab;
use headless_chrome::{browser::default_executable, Browser, LaunchOptions};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{Pid, PidExt, ProcessExt, System, SystemExt};
use tokio::time::sleep;

use crate::utils::wait_for;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);
// settle window after navigation, in seconds
const MIN_SETTLE_SECS: u64 = 1;
const MAX_SETTLE_SECS: u64 = 3;

/// The cookie fields persisted between runs as the session file.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub expires: f64,
    pub http_only: bool,
    pub secure: bool,
}

impl From<&Cookie> for SessionCookie {
    fn from(c: &Cookie) -> Self {
        SessionCookie {
            name: c.name.clone(),
            value: c.value.clone(),
            domain: c.domain.clone(),
            path: c.path.clone(),
            expires: c.expires,
            http_only: c.http_only,
            secure: c.secure,
        }
    }
}

impl SessionCookie {
    fn to_param(&self) -> CookieParam {
        CookieParam {
            name: self.name.clone(),
            value: self.value.clone(),
            url: None,
            domain: Some(self.domain.clone()),
            path: Some(self.path.clone()),
            secure: Some(self.secure),
            http_only: Some(self.http_only),
            same_site: None,
            expires: Some(self.expires),
            priority: None,
            same_party: None,
            source_scheme: None,
            source_port: None,
            partition_key: None,
        }
    }
}

pub struct BrowserController {
    browser: Browser,
    ready_timeout: Duration,
}

impl BrowserController {
    pub fn new(timeout_secs: u64, headless: bool) -> Result<Self> {
        let is_docker = std::env::var("IN_DOCKER").is_ok();
        let options = LaunchOptions::default_builder()
            .path(Some(default_executable().map_err(anyhow::Error::msg)?))
            .headless(headless)
            .window_size(Some((1920, 1080)))
            .idle_browser_timeout(Duration::from_secs(timeout_secs))
            // warning only do this if in docker env
            .sandbox(!is_docker)
            .build()
            .context("could not assemble browser launch options")?;
        let browser = Browser::new(options).context("browser launching error")?;

        Ok(BrowserController {
            browser,
            ready_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn new_tab(&self) -> Result<Arc<Tab>> {
        // we create a new incognito window (no context)
        let ctx = self
            .browser
            .new_context()
            .context("could not create incognito context")?;
        let tab = ctx.new_tab().context("could not create new tab")?;
        Ok(tab)
    }

    pub async fn goto(&self, tab: &Arc<Tab>, url: &str) -> Result<()> {
        let nv = match tab.navigate_to(url) {
            Ok(t) => t,
            Err(e) => {
                error!("could not navigate to {} with error {}", url, e);
                tab.navigate_to(url)?
            }
        };
        if let Err(e) = nv.wait_until_navigated() {
            // we wait one more timeout
            warn!("error waiting for navigation, retrying {}", e);
            nv.wait_until_navigated()?;
        }

        let settle = {
            let mut rng = rand::thread_rng();
            rng.gen_range(MIN_SETTLE_SECS..=MAX_SETTLE_SECS)
        };
        debug!("letting {} settle for {} seconds", url, settle);
        sleep(Duration::from_secs(settle)).await;

        self.wait_ready(tab).await
    }

    /// Polls the document ready state until the page is stable for the next
    /// interaction, bounded by the browser timeout.
    pub async fn wait_ready(&self, tab: &Arc<Tab>) -> Result<()> {
        wait_for(self.ready_timeout, READY_POLL_INTERVAL, || {
            let state = tab.evaluate("document.readyState", false)?;
            Ok(matches!(
                state.value,
                Some(serde_json::Value::String(ref s)) if s == "complete"
            ))
        })
        .await
        .context(format!(
            "page {} did not reach a ready state",
            tab.get_url()
        ))
    }

    pub fn fill(&self, tab: &Arc<Tab>, selector: &str, text: &str) -> Result<()> {
        let element = tab
            .find_element(selector)
            .context(format!("no element matching {}", selector))?;
        element
            .click()
            .context(format!("could not focus {}", selector))?;
        tab.type_str(text)
            .context(format!("could not type into {}", selector))?;
        Ok(())
    }

    pub fn click(&self, tab: &Arc<Tab>, selector: &str) -> Result<()> {
        tab.find_element(selector)
            .context(format!("no element matching {}", selector))?
            .click()
            .context(format!("could not click {}", selector))?;
        Ok(())
    }

    pub fn save_session(&self, tab: &Arc<Tab>, path: &Path) -> Result<()> {
        let cookies = tab.get_cookies().context("could not read session cookies")?;
        let stored = cookies
            .iter()
            .map(SessionCookie::from)
            .collect::<Vec<SessionCookie>>();
        let json = serde_json::to_string_pretty(&stored)?;
        fs::write(path, json).context(format!("could not write session file {:?}", path))?;
        Ok(())
    }

    pub fn restore_session(&self, tab: &Arc<Tab>, path: &Path) -> Result<()> {
        let raw = fs::read_to_string(path)
            .context(format!("could not read session file {:?}", path))?;
        let stored: Vec<SessionCookie> =
            serde_json::from_str(&raw).context("session file is not valid cookie state")?;
        let params = stored
            .iter()
            .map(SessionCookie::to_param)
            .collect::<Vec<CookieParam>>();
        tab.set_cookies(params)
            .context("could not restore session cookies")?;
        debug!("restored {} cookies from {:?}", stored.len(), path);
        Ok(())
    }

    pub fn kill(&self) -> bool {
        let pid = match self.browser.get_process_id() {
            Some(pid) => pid,
            None => return false,
        };
        let s = System::new();
        if let Some(process) = s.process(Pid::from_u32(pid)) {
            debug!("killing process with id {}", pid);
            process.kill();
            return true;
        }
        false
    }
}

impl Drop for BrowserController {
    fn drop(&mut self) {
        debug!("killing browser process...");
        self.kill();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn session_cookie_round_trips_through_json() {
        let cookie = SessionCookie {
            name: "sid".into(),
            value: "abc123".into(),
            domain: ".example.org".into(),
            path: "/".into(),
            expires: 1_900_000_000.0,
            http_only: true,
            secure: true,
        };
        let json = serde_json::to_string(&vec![cookie]).unwrap();
        let back: Vec<SessionCookie> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].name, "sid");
        assert_eq!(back[0].domain, ".example.org");

        let param = back[0].to_param();
        assert_eq!(param.name, "sid");
        assert_eq!(param.domain.as_deref(), Some(".example.org"));
    }
}

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::sleep;

use crate::{
    browser_controller::BrowserController,
    config::ScrapeConfig,
    page_query::QueryClient,
    queries::{self, EmailFormData, PasswordFormData, VerifyFormData},
};

// fixed window for a human to clear the verification challenge
const VERIFY_CHALLENGE_WAIT: Duration = Duration::from_secs(10);

/// Drives the fixed login sequence and serializes the resulting session
/// cookies to the session file. Element-location failures are fatal.
pub async fn establish(
    cfg: &ScrapeConfig,
    browser: &BrowserController,
    query: &QueryClient,
) -> Result<()> {
    let tab = browser.new_tab()?;
    browser.goto(&tab, &cfg.base_url).await?;

    let html = tab.get_content().context("could not read the login page")?;
    let email_form: EmailFormData = query
        .elements(&html, queries::EMAIL_QUERY)
        .await
        .context("email field not found on the login page")?;
    browser.fill(&tab, &email_form.login_form.email_input.selector, &cfg.email)?;
    browser.wait_ready(&tab).await?;

    let html = tab
        .get_content()
        .context("could not re-read the login page")?;
    let verify: VerifyFormData = query
        .elements(&html, queries::VERIFY_QUERY)
        .await
        .context("verification checkbox not found")?;
    browser.click(
        &tab,
        &verify.login_form.verify_not_robot_checkbox.selector,
    )?;
    info!(
        "waiting {} seconds for the verification challenge",
        VERIFY_CHALLENGE_WAIT.as_secs()
    );
    sleep(VERIFY_CHALLENGE_WAIT).await;

    browser.click(&tab, &email_form.login_form.continue_btn.selector)?;
    browser.wait_ready(&tab).await?;

    let html = tab
        .get_content()
        .context("could not read the password step")?;
    let password_form: PasswordFormData = query
        .elements(&html, queries::PASSWORD_QUERY)
        .await
        .context("password field not found")?;
    browser.fill(
        &tab,
        &password_form.login_form.password_input.selector,
        &cfg.password,
    )?;
    browser.wait_ready(&tab).await?;
    browser.click(&tab, &password_form.login_form.continue_btn.selector)?;
    browser.wait_ready(&tab).await?;

    browser.save_session(&tab, &cfg.session_file)?;
    info!("session state saved to {:?}", cfg.session_file);
    Ok(())
}

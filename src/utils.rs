use rand::{distributions::Alphanumeric, thread_rng, Rng};
use std::{fs, path::PathBuf, time::Duration};

use anyhow::Result;
use tokio::time::{sleep, Instant};

/// Poll `predicate` every `interval` until it holds, erroring once `timeout`
/// has elapsed. A predicate error ends the wait immediately.
pub async fn wait_for<F>(timeout: Duration, interval: Duration, mut predicate: F) -> Result<()>
where
    F: FnMut() -> Result<bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if predicate()? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            anyhow::bail!("condition not met within {:?}", timeout);
        }
        sleep(interval).await;
    }
}

/// Turn a URL into a safe file base name.
/// `https://example.com/foo?bar=1` becomes `example_foo_bar_1`.
pub fn sanitize_filename(url: &str) -> String {
    let stripped = url
        .replace("https://", "")
        .replace("http://", "")
        .replace(".com", "");

    let mut out = String::with_capacity(stripped.len());
    let mut prev_underscore = false;
    for c in stripped.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            prev_underscore = false;
        } else if !prev_underscore {
            out.push('_');
            prev_underscore = true;
        }
    }
    out.trim_matches('_').to_string()
}

/// Char-safe truncation, for bounded error excerpts.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

pub fn get_random_string(len: i32) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len as usize)
        .map(char::from)
        .collect()
}

pub fn create_random_tmp_folder() -> Result<PathBuf> {
    let rand_folder_name: String = get_random_string(11);

    let path = PathBuf::from(format!("/tmp/jobsync-{}", rand_folder_name));
    fs::create_dir(&path)?;
    Ok(path)
}

#[cfg(test)]
mod test {
    use super::*;

    macro_rules! aw {
        ($e:expr) => {
            tokio_test::block_on($e)
        };
    }

    #[test]
    fn sanitizes_url_to_base_name() {
        assert_eq!(
            sanitize_filename("https://example.com/foo?bar=1"),
            "example_foo_bar_1"
        );
        assert_eq!(sanitize_filename("http://example.com/"), "example");
        assert_eq!(
            sanitize_filename("https://docs.example.org/a/b#frag"),
            "docs_example_org_a_b_frag"
        );
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("short", 500), "short");
    }

    #[test]
    fn wait_for_returns_once_predicate_holds() {
        let mut calls = 0;
        aw!(wait_for(
            Duration::from_millis(100),
            Duration::from_millis(1),
            || {
                calls += 1;
                Ok(calls >= 3)
            }
        ))
        .unwrap();
        assert_eq!(calls, 3);
    }

    #[test]
    fn wait_for_errors_after_timeout() {
        let res = aw!(wait_for(
            Duration::from_millis(10),
            Duration::from_millis(2),
            || Ok(false)
        ));
        assert!(res.is_err());
    }

    #[test]
    fn wait_for_propagates_predicate_errors() {
        let res = aw!(wait_for(
            Duration::from_millis(100),
            Duration::from_millis(1),
            || anyhow::bail!("evaluation failed")
        ));
        assert!(res.is_err());
    }

    #[test]
    fn creates_a_random_folder() {
        let p = create_random_tmp_folder().unwrap();
        assert!(p.exists());
        fs::remove_dir(p).unwrap();
    }
}

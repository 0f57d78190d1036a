//! Chrome DevTools Protocol plumbing for the uploader: browser launch and
//! bounded waits for elements, URLs and in-frame interactions.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launch a local Chrome and spawn its CDP handler task.
pub async fn launch(headless: bool) -> Result<(Browser, JoinHandle<()>)> {
    debug!("launching browser (headless={headless})");
    let mut builder = BrowserConfig::builder();
    if !headless {
        // with_head means NOT headless, confusingly
        builder = builder.with_head();
    }
    builder = builder
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-infobars")
        .arg("--disable-dev-shm-usage")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--no-sandbox")
        .arg("--disable-gpu");
    let config = builder
        .build()
        .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

    let (browser, mut handler) = Browser::launch(config)
        .await
        .context("failed to launch browser")?;

    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    Ok((browser, handler_task))
}

/// Wait until `selector` matches an element, polling up to `timeout`.
pub async fn wait_for_element(page: &Page, selector: &str, timeout: Duration) -> Result<Element> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Ok(element) = page.find_element(selector).await {
            return Ok(element);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(anyhow!("timed out waiting for element '{selector}'"));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Wait until the page URL satisfies `matches`, polling up to `timeout`.
pub async fn wait_for_url<F>(page: &Page, timeout: Duration, matches: F) -> Result<String>
where
    F: Fn(&str) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(url) = page.url().await? {
            if matches(&url) {
                return Ok(url);
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(anyhow!("timed out waiting for navigation"));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Poll a boolean script until it evaluates to `true`.
///
/// The script runs once per poll, so an expression with a side effect (a
/// click) fires exactly once, on the poll where it first succeeds.
pub async fn wait_for_script(page: &Page, expr: &str, timeout: Duration) -> Result<()> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let done = page
            .evaluate(expr.to_string())
            .await
            .ok()
            .and_then(|r| r.into_value::<bool>().ok())
            .unwrap_or(false);
        if done {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(anyhow!("timed out waiting for script '{expr}'"));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Click an element that lives inside an embedded frame, waiting for it to
/// appear first.
pub async fn click_in_frame(
    page: &Page,
    frame_selector: &str,
    selector: &str,
    timeout: Duration,
) -> Result<()> {
    let expr = format!(
        "(function() {{ \
           const f = document.querySelector(\"{frame_selector}\"); \
           const el = f && f.contentDocument && f.contentDocument.querySelector(\"{selector}\"); \
           if (!el) return false; \
           el.click(); \
           return true; \
         }})()"
    );
    wait_for_script(page, &expr, timeout)
        .await
        .with_context(|| format!("clicking '{selector}' in frame '{frame_selector}'"))
}

/// Inject a local file path into a native file input inside an embedded
/// frame via `DOM.setFileInputFiles`.
pub async fn set_frame_file_input(
    page: &Page,
    frame_selector: &str,
    input_selector: &str,
    file: &Path,
    timeout: Duration,
) -> Result<()> {
    let exists = format!(
        "(function() {{ \
           const f = document.querySelector(\"{frame_selector}\"); \
           return !!(f && f.contentDocument && f.contentDocument.querySelector(\"{input_selector}\")); \
         }})()"
    );
    wait_for_script(page, &exists, timeout)
        .await
        .with_context(|| format!("waiting for file input '{input_selector}'"))?;

    let expr = format!(
        "document.querySelector(\"{frame_selector}\").contentDocument\
         .querySelector(\"{input_selector}\")"
    );
    let result = page.evaluate(expr).await?;
    let object_id = result
        .object()
        .object_id
        .clone()
        .ok_or_else(|| anyhow!("file input '{input_selector}' did not resolve to a node"))?;

    let params = SetFileInputFilesParams::builder()
        .files(vec![file.to_string_lossy().into_owned()])
        .object_id(object_id)
        .build()
        .map_err(|e| anyhow!("building setFileInputFiles params: {e}"))?;
    page.execute(params).await?;
    Ok(())
}

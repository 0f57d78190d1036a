//! Uploader workflow: drive a browser through Endomondo's file-import flow
//! for every local FIT file, renaming consumed files to `<name>.fit.done`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::{Browser, Page};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::browser::{
    self, click_in_frame, set_frame_file_input, wait_for_element, wait_for_script, wait_for_url,
};

pub struct UploadConfig {
    pub base_url: String,
    pub directory: PathBuf,
    pub username: String,
    pub password: SecretString,
    pub headless: bool,
    pub step_timeout: Duration,
    pub pace_delay: Duration,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub total: usize,
    pub uploaded: usize,
    pub failed: usize,
}

/// Run the upload workflow.
///
/// Login and landing-page failures are fatal; a failed per-file upload is
/// logged, leaves the file un-renamed for the next run, and the loop
/// continues. The browser is closed on every exit path.
pub async fn run(config: UploadConfig) -> Result<UploadReport> {
    let files = scan_fit_files(&config.directory)
        .with_context(|| format!("scanning '{}'", config.directory.display()))?;
    if files.is_empty() {
        info!(
            "no FIT files found in '{}', nothing to upload",
            config.directory.display()
        );
        return Ok(UploadReport::default());
    }
    info!("found {} FIT file(s) to upload", files.len());

    let (mut browser, handler_task) = browser::launch(config.headless).await?;
    let result = drive(&mut browser, &config, &files).await;
    if let Err(e) = browser.close().await {
        warn!("failed to close the browser: {e}");
    }
    let _ = browser.wait().await;
    handler_task.abort();
    result
}

async fn drive(
    browser: &mut Browser,
    config: &UploadConfig,
    files: &[PathBuf],
) -> Result<UploadReport> {
    let page = browser
        .new_page(format!("{}/login", config.base_url))
        .await
        .context("opening the login page")?;

    login(&page, config).await?;

    wait_for_url(&page, config.step_timeout, |url| {
        url.trim_end_matches('/') == format!("{}/home", config.base_url)
    })
    .await
    .context("entering the landing page")?;

    // Close the premium ad, when there is one.
    match wait_for_element(&page, ".MonthTrialPopup-close", config.step_timeout).await {
        Ok(dismiss) => {
            dismiss.click().await.context("dismissing the popup")?;
        }
        Err(_) => debug!("no popup this time, good"),
    }

    let mut report = UploadReport {
        total: files.len(),
        ..Default::default()
    };
    for (index, file) in files.iter().enumerate() {
        info!(
            "uploading {}/{}: '{}'",
            index + 1,
            files.len(),
            file.display()
        );
        match upload_one(&page, config, file).await {
            Ok(()) => {
                let done = mark_done(file)?;
                info!("upload confirmed, renamed to '{}'", done.display());
                report.uploaded += 1;
            }
            Err(e) => {
                warn!("skipping '{}': {e:#}", file.display());
                report.failed += 1;
            }
        }
        // Fixed pacing between items to avoid overloading the remote UI.
        if index + 1 < files.len() {
            tokio::time::sleep(config.pace_delay).await;
        }
    }

    logout(&page, config).await;
    Ok(report)
}

async fn login(page: &Page, config: &UploadConfig) -> Result<()> {
    let email = wait_for_element(page, "input[name='email']", config.step_timeout)
        .await
        .context("waiting for the login form")?;
    email.click().await?;
    email.type_str(&config.username).await?;

    let password = page
        .find_element("input[name='password']")
        .await
        .context("finding the password field")?;
    password.click().await?;
    password.type_str(config.password.expose_secret()).await?;
    password.press_key("Enter").await?;
    Ok(())
}

async fn upload_one(page: &Page, config: &UploadConfig, file: &Path) -> Result<()> {
    page.goto(format!("{}/workouts/create", config.base_url))
        .await
        .context("opening the workout creation page")?;

    // The import button is the grandparent of the fileImport marker div.
    let open_import = "(function() { \
        const d = document.querySelector(\"div.fileImport\"); \
        const btn = d && d.parentElement && d.parentElement.parentElement; \
        if (!btn) return false; \
        btn.click(); \
        return true; \
    })()";
    wait_for_script(page, open_import, config.step_timeout)
        .await
        .context("opening the file-import dialog")?;

    let absolute = std::path::absolute(file)
        .with_context(|| format!("resolving '{}'", file.display()))?;
    set_frame_file_input(
        page,
        "iframe.iframed",
        "input[name='uploadFile']",
        &absolute,
        config.step_timeout,
    )
    .await?;

    click_in_frame(
        page,
        "iframe.iframed",
        "a[name='uploadSumbit']",
        config.step_timeout,
    )
    .await?;
    click_in_frame(
        page,
        "iframe.iframed",
        "a[name='reviewSumbit']",
        config.step_timeout,
    )
    .await?;

    wait_for_url(page, config.step_timeout, |url| {
        url.trim_end_matches('/').ends_with("/workouts/latest")
    })
    .await
    .context("waiting for the post-upload page")?;
    Ok(())
}

/// Log out via the avatar menu. Failures here are logged and ignored; the
/// session dies with the browser anyway.
async fn logout(page: &Page, config: &UploadConfig) {
    let result = async {
        let avatar = wait_for_element(page, ".header-member-profile", config.step_timeout).await?;
        avatar.hover().await?;
        let logout = wait_for_element(page, "a[ng-click='logout()']", config.step_timeout).await?;
        logout.click().await?;
        anyhow::Ok(())
    }
    .await;
    if let Err(e) = result {
        warn!("timed out while logging out: {e:#}");
    }
}

/// All `*.fit` files in `directory`, sorted by name. Files already renamed to
/// `.fit.done` no longer match and are skipped naturally.
pub fn scan_fit_files(directory: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(directory)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "fit"))
        .collect();
    files.sort();
    Ok(files)
}

/// Rename a consumed source file to `<name>.fit.done`.
pub fn mark_done(file: &Path) -> Result<PathBuf> {
    let mut renamed = file.as_os_str().to_os_string();
    renamed.push(".done");
    let renamed = PathBuf::from(renamed);
    std::fs::rename(file, &renamed)
        .with_context(|| format!("renaming '{}' after upload", file.display()))?;
    Ok(renamed)
}

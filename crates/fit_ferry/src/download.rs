//! Downloader workflow: list Sports Tracker workouts (cached to disk) and
//! export each one as a FIT file.

use std::path::Path;

use anyhow::Context;
use chrono::{Local, TimeZone};
use indicatif::{ProgressBar, ProgressStyle};
use sports_tracker_client::activity::workout_filename;
use sports_tracker_client::{SportsTrackerClient, WorkoutSummary};
use tracing::{error, info, warn};

/// Per-directory cache file holding the raw workout-list payload.
pub const WORKOUT_LIST_FILE: &str = "workouts.stdl";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub total: usize,
    pub downloaded: usize,
    pub failed: usize,
}

/// Run the download workflow against `directory`.
///
/// An existing cache file is reused unconditionally and skips the network
/// listing entirely; it is never refreshed or merged once present. Login or
/// list failures abort the run before any file is produced; a failed
/// per-workout export is logged and skipped.
pub async fn run(
    client: &dyn SportsTrackerClient,
    directory: &Path,
) -> anyhow::Result<DownloadReport> {
    let cache_path = directory.join(WORKOUT_LIST_FILE);

    if cache_path.exists() {
        info!(
            "workout list '{}' already exists, using it instead of downloading a new one",
            cache_path.display()
        );
    } else {
        client.login().await.context("logging in")?;
        let payload = client
            .fetch_workout_list()
            .await
            .context("fetching the workout list")?;
        let raw = serde_json::to_string(&payload).context("encoding the workout list")?;
        std::fs::write(&cache_path, raw)
            .with_context(|| format!("writing '{}'", cache_path.display()))?;
        info!(
            "workout list ({}) saved to '{}'",
            payload.as_array().map(|a| a.len()).unwrap_or(0),
            cache_path.display()
        );
    }

    let raw = std::fs::read_to_string(&cache_path)
        .with_context(|| format!("reading '{}'", cache_path.display()))?;
    let workouts: Vec<WorkoutSummary> =
        serde_json::from_str(&raw).context("parsing the cached workout list")?;

    let mut report = DownloadReport {
        total: workouts.len(),
        ..Default::default()
    };

    let pb = ProgressBar::new(workouts.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("static progress template")
            .progress_chars("#>-"),
    );

    for (index, workout) in workouts.iter().enumerate() {
        let output_path = directory.join(output_name(workout));
        info!(
            "workout {}/{}: {} -> '{}'",
            index + 1,
            workouts.len(),
            workout.workout_key,
            output_path.display()
        );
        match client.export_fit(&workout.workout_key, &output_path).await {
            Ok(()) => report.downloaded += 1,
            Err(e) => {
                warn!("skipping workout {}: {}", workout.workout_key, e);
                report.failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(report)
}

/// Output filename for one workout record. Unknown activity ids are logged
/// and fall back to the raw workout key.
fn output_name(workout: &WorkoutSummary) -> String {
    if sports_tracker_client::activity::activity_name(workout.activity_id).is_none() {
        error!(
            "activity {} not in the predefined list, using the workout key",
            workout.activity_id
        );
    }
    let timestamp = Local
        .timestamp_millis_opt(workout.start_time)
        .single()
        .map(|dt| dt.naive_local())
        .unwrap_or_default();
    workout_filename(timestamp, workout.activity_id, &workout.workout_key)
}

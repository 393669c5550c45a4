// src/main.rs
//
// Runs the ball pipeline over directories of extracted frames and writes a
// JSON report per run.
//
// video.input_dir either holds frame images directly (one stream) or one
// sub-directory of images per camera (one stream each).

use anyhow::{Context, Result};
use lbw_vision::frame_source::{stream_directories, ImageDirectorySource};
use lbw_vision::pipeline::{run_streams, CancellationFlag, StreamJob, StreamReport};
use lbw_vision::Config;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::var("LBW_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = if Path::new(&config_path).exists() {
        Config::load(&config_path).with_context(|| format!("loading {}", config_path))?
    } else {
        Config::default()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🏏 LBW Vision starting");
    if Path::new(&config_path).exists() {
        info!("✓ Configuration loaded from {}", config_path);
    } else {
        warn!("{} not found, using defaults", config_path);
    }

    let jobs = build_jobs(&config)?;
    if jobs.is_empty() {
        error!("No frame images found in {}", config.video.input_dir);
        return Ok(());
    }
    info!("Found {} stream(s) to process", jobs.len());

    let cancel = CancellationFlag::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight frames");
            ctrl_c.cancel();
        }
    });

    let results = run_streams(jobs, Arc::new(config.clone()), cancel).await;

    let mut reports: Vec<StreamReport> = Vec::with_capacity(results.len());
    for (name, result) in results {
        match result {
            Ok(report) => {
                print_summary(&report);
                reports.push(report);
            }
            Err(e) => error!("Stream '{}' failed: {}", name, e),
        }
    }

    let out_path = write_report(&config.video.output_dir, &reports)?;
    info!("📝 Report written to {}", out_path.display());
    Ok(())
}

fn build_jobs(config: &Config) -> Result<Vec<StreamJob>> {
    let root = Path::new(&config.video.input_dir);
    let fps = config.video.fps;

    let mut jobs = Vec::new();
    let dirs = stream_directories(root);
    if dirs.is_empty() {
        let source = ImageDirectorySource::open(root, fps)?;
        if !source.is_empty() {
            jobs.push(StreamJob::new(stream_name(root), Box::new(source)));
        }
    } else {
        for dir in dirs {
            let source = ImageDirectorySource::open(&dir, fps)?;
            jobs.push(StreamJob::new(stream_name(&dir), Box::new(source)));
        }
    }
    Ok(jobs)
}

fn stream_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stream".to_string())
}

fn print_summary(report: &StreamReport) {
    let stats = &report.statistics;
    info!("\n========================================");
    info!("Stream '{}'", report.name);
    info!("========================================");
    info!("  Frames: {} ok, {} skipped", report.frames_processed, report.frames_failed);
    info!("  Detection rate: {:.1}%", stats.detection_rate * 100.0);
    info!(
        "  Speed: {:.1} km/h avg, {:.1} km/h max",
        stats.average_velocity_kmh, stats.max_velocity_kmh
    );
    info!(
        "  Distance: {:.2} m over {:.2} s",
        stats.total_distance_m, stats.tracking_duration_s
    );
    if let Some(motion) = &report.motion {
        info!("  Verdict: {:?}", motion.verdict);
    }
    info!(
        "  LBW: {} ({:.1}){}",
        report.decision.decision.as_str(),
        report.decision.confidence,
        report
            .decision
            .reason
            .as_ref()
            .map(|r| format!(" - {}", r))
            .unwrap_or_default()
    );
}

#[derive(Serialize)]
struct RunReport<'a> {
    generated_at: String,
    streams: &'a [StreamReport],
}

fn write_report(output_dir: &str, reports: &[StreamReport]) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let now = chrono::Utc::now();
    let file_name = format!("lbw_report_{}.json", now.format("%Y%m%d_%H%M%S"));
    let path = Path::new(output_dir).join(file_name);
    let run = RunReport {
        generated_at: now.to_rfc3339(),
        streams: reports,
    };
    let json = serde_json::to_string_pretty(&run)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

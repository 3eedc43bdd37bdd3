//! `inspect` command implementation.

use anyhow::{Context, Result};
use contracts::ImuChannel;
use recorder::SessionBundle;
use serde::Serialize;
use tracing::info;

use crate::cli::InspectArgs;

/// Bundle report for JSON output
#[derive(Serialize)]
struct BundleInfo {
    id: String,
    files: Vec<String>,
    number_of_files: u32,
    video_frames: u64,
    depth_frames: usize,
    confidence_frames: usize,
    camera_records: usize,
    streams: Vec<StreamCount>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    issues: Vec<String>,
}

#[derive(Serialize)]
struct StreamCount {
    id: String,
    declared: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    on_disk: Option<u64>,
}

/// Execute the `inspect` command
pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    info!(path = %args.path.display(), "Inspecting session");

    let bundle = SessionBundle::open(&args.path)
        .with_context(|| format!("Failed to open session {}", args.path.display()))?;
    let report = inspect(&bundle)?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize bundle info")?;
        println!("{}", json);
    } else {
        print_bundle_info(&report);
    }

    if report.issues.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("Session has {} consistency issue(s)", report.issues.len())
    }
}

fn inspect(bundle: &SessionBundle) -> Result<BundleInfo> {
    let metadata = bundle.metadata().context("Failed to read metadata")?;
    let depth_frames = bundle.depth_frames().context("Failed to read depth")?.len();
    let confidence_frames = bundle
        .confidence_frames()
        .context("Failed to read confidence")?
        .len();
    let camera_records = bundle
        .camera_info()
        .context("Failed to read camera info")?
        .len();
    let video_frames = metadata
        .stream("color_back_1")
        .map(|s| s.number_of_frames)
        .unwrap_or_default();

    let mut issues = Vec::new();
    for (name, count) in [
        ("depth", depth_frames),
        ("confidence", confidence_frames),
        ("camera info", camera_records),
    ] {
        if count as u64 != video_frames {
            issues.push(format!("{name} has {count} frames, video has {video_frames}"));
        }
    }

    let mut streams = Vec::new();
    for stream in &metadata.streams {
        let channel = ImuChannel::ALL
            .into_iter()
            .find(|c| c.short_name() == stream.file_extension);
        let on_disk = match channel {
            Some(channel) => {
                let track = bundle
                    .imu_track(channel)
                    .with_context(|| format!("Failed to read {} samples", channel.id()))?;
                if track.header_count != Some(track.records.len() as u64) {
                    issues.push(format!(
                        "{} header declares {:?} records, file holds {}",
                        channel.id(),
                        track.header_count,
                        track.records.len()
                    ));
                }
                Some(track.records.len() as u64)
            }
            None => None,
        };
        streams.push(StreamCount {
            id: stream.id.clone(),
            declared: stream.number_of_frames,
            on_disk,
        });
    }

    let files = bundle
        .files()?
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect();

    Ok(BundleInfo {
        id: bundle.id().to_string(),
        files,
        number_of_files: metadata.number_of_files,
        video_frames,
        depth_frames,
        confidence_frames,
        camera_records,
        streams,
        issues,
    })
}

fn print_bundle_info(info: &BundleInfo) {
    println!("\n=== Session {} ===\n", info.id);
    println!("Files ({} declared):", info.number_of_files);
    for file in &info.files {
        println!("  - {}", file);
    }

    println!("\nCamera:");
    println!("  Video frames:      {}", info.video_frames);
    println!("  Depth frames:      {}", info.depth_frames);
    println!("  Confidence frames: {}", info.confidence_frames);
    println!("  Camera records:    {}", info.camera_records);

    println!("\nStreams:");
    for stream in &info.streams {
        match stream.on_disk {
            Some(on_disk) => println!("  {:<26} {:>8} ({} on disk)", stream.id, stream.declared, on_disk),
            None => println!("  {:<26} {:>8}", stream.id, stream.declared),
        }
    }

    if info.issues.is_empty() {
        println!("\n✓ Session is consistent");
    } else {
        println!("\n✗ Issues:");
        for issue in &info.issues {
            println!("  - {}", issue);
        }
    }
}

//! `record` command implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use capture_sources::{CountingVideoEncoder, MockImuConfig, MockImuSensor, SyntheticArRuntime};
use contracts::{
    CaptureConfig, FixedLocation, ImuChannel, SensorEventCallback, SensorKind, SensorSource,
    SessionRequest,
};
use recorder::{CaptureController, FrameOutcome, FrameRecorder, ReconcileReport};
use tracing::{info, warn};

use crate::cli::RecordArgs;

/// Execute the `record` command
pub async fn run_record(args: &RecordArgs) -> Result<()> {
    let config = build_config(args)?;
    info!(
        output_dir = %config.session.output_dir.display(),
        device_id = %config.device.device_id,
        channels = config.imu.channels.len(),
        debug = config.session.debug,
        "Configuration loaded"
    );

    let controller = CaptureController::new(config.clone(), Arc::new(FixedLocation::default()));
    let session = controller
        .start(SessionRequest {
            scene_type: args.scene_type.clone(),
            description: args.description.clone(),
        })
        .context("Failed to start session")?;
    info!(folder = %session.layout().dir().display(), "Recording");

    let imu = controller
        .imu_recorder()
        .context("Session ended before sensors started")?;
    let sensors = start_sensors(&config, args.imu_hz, imu.callback());

    let frames = controller
        .frame_recorder()
        .context("Session ended before rendering started")?;
    let encoder = Arc::new(CountingVideoEncoder::new());
    let stop = Arc::new(AtomicBool::new(false));

    let mut render = tokio::task::spawn_blocking({
        let runtime = SyntheticArRuntime::new(args.depth_width, args.depth_height)
            .with_depth_failures(args.drop_depth.iter().copied());
        let encoder = Arc::clone(&encoder);
        let stop = Arc::clone(&stop);
        let limit = (args.frames > 0).then_some(args.frames);
        let interval = Duration::from_secs_f64(1.0 / f64::from(args.fps.max(1)));
        move || render_loop(&runtime, &frames, &encoder, &stop, limit, interval)
    });

    let rendered = tokio::select! {
        result = &mut render => result,
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping capture...");
            stop.store(true, Ordering::Release);
            render.await
        }
    };
    let rendered = rendered
        .context("Render thread panicked")
        .and_then(|result| result);

    // finalize whatever was captured, even after a render failure
    for sensor in &sensors {
        sensor.stop();
    }
    encoder.finish();
    let report = controller
        .stop(encoder)
        .await
        .context("Failed to finalize session")?;

    let rendered = rendered?;
    info!(rendered, "Capture finished");
    print_report(&report);
    Ok(())
}

/// Load the configuration file (if any) and apply command line overrides
fn build_config(args: &RecordArgs) -> Result<CaptureConfig> {
    let mut config = match &args.config {
        Some(path) => config_loader::ConfigLoader::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => CaptureConfig::default(),
    };

    if let Some(ref dir) = args.output_dir {
        config.session.output_dir = dir.clone();
    }
    if let Some(ref id) = args.device_id {
        config.device.device_id = id.clone();
    }
    if args.debug {
        config.session.debug = true;
    }

    config_loader::ConfigLoader::validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// One synthetic sensor per configured channel, all feeding `callback`
fn start_sensors(
    config: &CaptureConfig,
    frequency_hz: f64,
    callback: SensorEventCallback,
) -> Vec<MockImuSensor> {
    let mut kinds: Vec<SensorKind> = config
        .imu
        .channels
        .iter()
        .map(|channel| match channel {
            ImuChannel::Accel if config.imu.uncalibrated_accel => {
                SensorKind::AccelerometerUncalibrated
            }
            ImuChannel::Accel => SensorKind::Accelerometer,
            ImuChannel::Gyro => SensorKind::Gyroscope,
            ImuChannel::Gravity => SensorKind::Gravity,
            ImuChannel::Magnet => SensorKind::MagneticField,
            ImuChannel::Orientation => SensorKind::Orientation,
        })
        .collect();
    // bias source
    if !kinds.contains(&SensorKind::AccelerometerUncalibrated) {
        kinds.push(SensorKind::AccelerometerUncalibrated);
    }

    kinds
        .into_iter()
        .map(|kind| {
            let sensor = MockImuSensor::new(
                kind,
                MockImuConfig {
                    frequency_hz,
                    max_events: None,
                },
            );
            sensor.listen(Arc::clone(&callback));
            sensor
        })
        .collect()
}

/// Render thread: one frame per tick until the limit or the stop flag
fn render_loop(
    runtime: &SyntheticArRuntime,
    recorder: &FrameRecorder,
    encoder: &CountingVideoEncoder,
    stop: &AtomicBool,
    limit: Option<u64>,
    interval: Duration,
) -> Result<u64> {
    let mut index = 0;
    while !stop.load(Ordering::Acquire) && limit.map_or(true, |limit| index < limit) {
        let tick = Instant::now();
        let frame = runtime.frame(index);

        encoder.encode_frame();
        match recorder.on_frame(&frame).context("Frame recording failed")? {
            FrameOutcome::NotRecording => break,
            FrameOutcome::Skipped(reason) => info!(index, reason = %reason, "Frame skipped"),
            FrameOutcome::Recorded(_) => {}
        }
        index += 1;

        if let Some(rest) = interval.checked_sub(tick.elapsed()) {
            std::thread::sleep(rest);
        }
    }
    Ok(index)
}

/// Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn print_report(report: &ReconcileReport) {
    println!("\n=== Session {} ===\n", report.folder_id);
    println!("Folder:          {}", report.dir.display());
    println!("Video frames:    {}", report.video_frames);
    println!("Depth recorded:  {}", report.recorded_frames);
    println!("Padded:          {}", report.padded_frames);
    println!("Depth final:     {}", report.depth_frames);
    println!("Files:           {}", report.metadata.number_of_files);
    for (channel, count) in &report.imu_samples {
        println!("IMU {:<12} {}", channel.id(), count);
    }
    println!("\n{}", report.summary);
}

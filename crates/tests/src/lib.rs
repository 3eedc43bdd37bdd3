//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约测试 (编解码、流注册表)
//! - 合成采集源驱动的端到端录制

#[cfg(test)]
mod contract_tests {
    use depth_codec::{decode, samples};
    use stream_registry::{Encoding, RegistryError, StreamRegistry};
    use tempfile::tempdir;

    /// register `depth`, append two packed samples, decode them back
    #[test]
    fn test_packed_samples_through_registry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.depth");
        let registry = StreamRegistry::new();
        registry.register("depth", &path, Encoding::Plain).unwrap();

        for sample in [0x2001u16, 0x0005] {
            registry.append("depth", &sample.to_le_bytes()).unwrap();
        }
        registry.close_all().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let decoded: Vec<_> = samples(&bytes).map(decode).collect();
        assert_eq!(decoded, vec![(1, 1), (5, 0)]);
    }

    #[test]
    fn test_append_before_register_fails_without_file() {
        let dir = tempdir().unwrap();
        let registry = StreamRegistry::new();

        let err = registry.append("confidence", &[0u8; 4]).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownStream(ref key) if key == "confidence"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        registry
            .register("confidence", dir.path().join("s.confidence.zlib"), Encoding::Deflate)
            .unwrap();
        registry.append("confidence", &[0u8; 4]).unwrap();
        registry.close_all().unwrap();
        registry.close_all().unwrap();
        assert!(registry.append("confidence", &[0u8; 4]).is_err());
    }

    #[test]
    fn test_config_round_trip() {
        let config = contracts::CaptureConfig::default();
        let toml = config_loader::ConfigLoader::to_toml(&config).unwrap();
        let parsed =
            config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        assert_eq!(parsed, config);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use capture_sources::{
        CountingVideoEncoder, FixedFrameCountVideo, MockImuConfig, MockImuSensor,
        SyntheticArRuntime, SyntheticFrame,
    };
    use contracts::{
        CaptureConfig, FixedLocation, GpsFix, ImuChannel, SensorKind, SensorSource,
        SessionRequest,
    };
    use recorder::{parse_header, CaptureController, FrameOutcome, PlyFormat, SessionBundle};
    use tempfile::tempdir;

    fn controller(dir: &std::path::Path, debug: bool) -> CaptureController {
        let mut config = CaptureConfig::default();
        config.session.output_dir = dir.to_path_buf();
        config.session.debug = debug;
        config.device.device_id = "e2e".into();
        config.device.name = "bench rig".into();
        CaptureController::new(
            config,
            Arc::new(FixedLocation(Some(GpsFix {
                latitude: 48.137,
                longitude: 11.575,
            }))),
        )
    }

    /// 10 frames, depth missing on frame 4, video holds 10
    #[tokio::test]
    async fn test_depth_drop_is_reconciled() {
        let dir = tempdir().unwrap();
        let controller = controller(dir.path(), false);
        controller
            .start(SessionRequest {
                scene_type: "room".into(),
                description: "kitchen".into(),
            })
            .unwrap();

        let frames = controller.frame_recorder().unwrap();
        let runtime = SyntheticArRuntime::new(16, 12).with_depth_failures([4]);
        let encoder = Arc::new(CountingVideoEncoder::new());
        for frame in runtime.frames(10) {
            encoder.encode_frame();
            frames.on_frame(&frame).unwrap();
        }
        let session = controller.active_session().unwrap();
        assert_eq!(session.frame_count(), 9);

        encoder.finish();
        let report = controller.stop(encoder).await.unwrap();
        assert_eq!(report.video_frames, 10);
        assert_eq!(report.recorded_frames, 9);
        assert_eq!(report.padded_frames, 1);
        assert_eq!(report.depth_frames, 10);

        let bundle = SessionBundle::open(&report.dir).unwrap();
        let depth = bundle.depth_frames().unwrap();
        assert_eq!(depth.len(), 10);
        // frame 9 was the last real one; ranges are the low 13 bits of the samples
        let expected: Vec<u16> = (0..16 * 12)
            .map(|pixel| SyntheticFrame::depth_sample(9, pixel) & 0x1FFF)
            .collect();
        assert_eq!(depth[8], expected);
        assert_eq!(depth[9], expected);

        let confidence = bundle.confidence_frames().unwrap();
        assert_eq!(confidence.len(), 10);
        assert_eq!(confidence[3][1], SyntheticFrame::confidence_value(3, 1));
        // slot 4 holds frame 5, the dropped frame left no gap
        assert_eq!(confidence[4][1], SyntheticFrame::confidence_value(5, 1));

        let records = bundle.camera_info().unwrap();
        assert_eq!(records.len(), 10);
        assert_eq!(records[9].restamped(records[8].timestamp), records[8]);

        let metadata = bundle.metadata().unwrap();
        assert_eq!(metadata.stream("depth_back_1").unwrap().resolution, Some([12, 16]));
        assert_eq!(metadata.stream("color_back_1").unwrap().number_of_frames, 10);
        assert_eq!(metadata.scene.gps_location, Some([48.137, 11.575]));
        assert_eq!(metadata.device.name, "bench rig");
    }

    /// accelerometer fires 50 times, gyroscope 30 times, from their own threads
    #[tokio::test]
    async fn test_imu_counts_independent_of_interleaving() {
        let dir = tempdir().unwrap();
        let controller = controller(dir.path(), false);
        controller.start(SessionRequest::default()).unwrap();
        let callback = controller.imu_recorder().unwrap().callback();

        let sensor = |kind, events| {
            MockImuSensor::new(
                kind,
                MockImuConfig {
                    frequency_hz: 2000.0,
                    max_events: Some(events),
                },
            )
        };
        let accel = sensor(SensorKind::Accelerometer, 50);
        let gyro = sensor(SensorKind::Gyroscope, 30);
        accel.listen(Arc::clone(&callback));
        gyro.listen(Arc::clone(&callback));

        while accel.sent() < 50 || gyro.sent() < 30 {
            thread::sleep(Duration::from_millis(1));
        }
        accel.stop();
        gyro.stop();

        let report = controller
            .stop(Arc::new(FixedFrameCountVideo(0)))
            .await
            .unwrap();
        let counts: std::collections::HashMap<_, _> = report.imu_samples.iter().copied().collect();
        assert_eq!(counts[&ImuChannel::Accel], 50);
        assert_eq!(counts[&ImuChannel::Gyro], 30);
        assert_eq!(counts[&ImuChannel::Gravity], 0);

        let bundle = SessionBundle::open(&report.dir).unwrap();
        let acce = bundle.imu_track(ImuChannel::Accel).unwrap();
        assert_eq!(acce.header_count, Some(50));
        assert_eq!(acce.records.len(), 50);
        assert!(acce
            .records
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
        assert_eq!(
            report.metadata.stream("acce_1").unwrap().number_of_frames,
            50
        );
    }

    /// events after stop never reach the files
    #[tokio::test]
    async fn test_late_events_are_ignored() {
        let dir = tempdir().unwrap();
        let controller = controller(dir.path(), false);
        let session = controller.start(SessionRequest::default()).unwrap();
        let frames = controller.frame_recorder().unwrap();
        let imu = controller.imu_recorder().unwrap();

        frames.on_frame(&SyntheticFrame::new(0, 4, 4)).unwrap();
        let report = controller
            .stop(Arc::new(FixedFrameCountVideo(1)))
            .await
            .unwrap();

        assert_eq!(
            frames.on_frame(&SyntheticFrame::new(1, 4, 4)).unwrap(),
            FrameOutcome::NotRecording
        );
        imu.on_event(&contracts::SensorEvent::new(
            SensorKind::Gyroscope,
            5,
            vec![0.0, 0.0, 0.0],
        ))
        .unwrap();
        assert_eq!(session.frame_count(), 1);
        assert_eq!(session.imu_count(ImuChannel::Gyro), Some(0));

        let bundle = SessionBundle::open(&report.dir).unwrap();
        assert_eq!(bundle.depth_frames().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_debug_bundle() {
        let dir = tempdir().unwrap();
        let controller = controller(dir.path(), true);
        controller.start(SessionRequest::default()).unwrap();

        let frames = controller.frame_recorder().unwrap();
        let imu = controller.imu_recorder().unwrap();
        for frame in SyntheticArRuntime::new(2, 2).frames(3) {
            frames.on_frame(&frame).unwrap();
        }
        for ts in 0..4 {
            imu.on_event(&contracts::SensorEvent::new(
                SensorKind::Orientation,
                ts,
                vec![0.5, 0.25, 1.0],
            ))
            .unwrap();
        }

        let report = controller
            .stop(Arc::new(FixedFrameCountVideo(3)))
            .await
            .unwrap();
        // 4 camera + 5 binary + 5 ascii + 2 text dumps, plus the video
        assert_eq!(report.metadata.number_of_files, 17);

        let bundle = SessionBundle::open(&report.dir).unwrap();
        let layout = bundle.layout();

        let ascii = std::fs::read(layout.imu_ascii_path(ImuChannel::Orientation)).unwrap();
        let header = parse_header(&ascii).unwrap();
        assert_eq!(header.format, PlyFormat::Ascii);
        assert_eq!(header.element, "attitude");
        assert_eq!(header.count, 4);
        let body = std::str::from_utf8(&ascii[header.body_offset..]).unwrap();
        assert_eq!(body.lines().count(), 4);
        assert_eq!(body.lines().next(), Some("0 0.5 0.25 1.0"));

        let depth_dump = std::fs::read_to_string(layout.depth_debug_path()).unwrap();
        assert_eq!(depth_dump.lines().count(), 3);
        assert!(depth_dump.starts_with('['));
        let classes = std::fs::read_to_string(layout.confidence_debug_path()).unwrap();
        assert_eq!(classes.lines().next(), Some("[0, 1, 2, 3]"));
    }
}

//! 采集指标模块
//!
//! `record_*` 函数写入 `metrics` 门面 (Prometheus 导出)，
//! `CaptureStatsAggregator` 在内存中聚合，用于会话结束时输出摘要。

use std::collections::BTreeMap;

use metrics::{counter, gauge, histogram};

/// 帧跳过原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    /// 深度图不可用
    DepthUnavailable,
    /// 置信度图不可用
    ConfidenceUnavailable,
    /// 写入失败
    Io,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DepthUnavailable => "depth_unavailable",
            Self::ConfidenceUnavailable => "confidence_unavailable",
            Self::Io => "io",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 记录一帧写入成功
pub fn record_frame_recorded(frame_index: u64) {
    counter!("scan_capture_frames_recorded_total").increment(1);
    gauge!("scan_capture_last_frame_index").set(frame_index as f64);
}

/// 记录一帧被跳过
pub fn record_frame_skipped(reason: SkipReason) {
    counter!(
        "scan_capture_frames_skipped_total",
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// 记录帧间隔 (毫秒)
pub fn record_frame_interval_ms(interval_ms: f64) {
    histogram!("scan_capture_frame_interval_ms").record(interval_ms);
}

/// 记录一条 IMU 采样
pub fn record_imu_sample(channel: &'static str) {
    counter!("scan_capture_imu_samples_total", "channel" => channel).increment(1);
}

/// 记录流写入失败
pub fn record_stream_append_failure(stream: &str) {
    counter!(
        "scan_capture_stream_append_failures_total",
        "stream" => stream.to_string()
    )
    .increment(1);
}

/// 记录补帧数量
pub fn record_padded_frames(count: u64) {
    counter!("scan_capture_padded_frames_total").increment(count);
}

/// 记录会话结束时的帧数对账
pub fn record_session_reconciled(depth_frames: u64, video_frames: u64) {
    counter!("scan_capture_sessions_total").increment(1);
    gauge!("scan_capture_session_depth_frames").set(depth_frames as f64);
    gauge!("scan_capture_session_video_frames").set(video_frames as f64);
}

/// 采集指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct CaptureStatsAggregator {
    /// 写入的帧数
    pub frames_recorded: u64,

    /// 各原因跳过的帧数
    pub frames_skipped: BTreeMap<SkipReason, u64>,

    /// 补帧数
    pub frames_padded: u64,

    /// 各通道 IMU 采样数
    pub imu_samples: BTreeMap<String, u64>,

    /// 帧间隔统计 (毫秒)
    pub interval_stats: RunningStats,

    last_timestamp_ns: Option<i64>,
}

impl CaptureStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 一帧写入成功
    pub fn on_frame(&mut self, timestamp_ns: i64) {
        self.frames_recorded += 1;
        if let Some(last) = self.last_timestamp_ns {
            let interval_ms = (timestamp_ns - last) as f64 / 1_000_000.0;
            self.interval_stats.push(interval_ms);
            record_frame_interval_ms(interval_ms);
        }
        self.last_timestamp_ns = Some(timestamp_ns);
    }

    /// 一帧被跳过
    pub fn on_skip(&mut self, reason: SkipReason) {
        *self.frames_skipped.entry(reason).or_insert(0) += 1;
    }

    /// 会话结束时补帧
    pub fn on_padding(&mut self, count: u64) {
        self.frames_padded += count;
    }

    /// 设置通道采样总数 (来自会话计数器)
    pub fn set_imu_samples(&mut self, channel: impl Into<String>, count: u64) {
        self.imu_samples.insert(channel.into(), count);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> CaptureSummary {
        let total_skipped = self.frames_skipped.values().sum::<u64>();
        let attempted = self.frames_recorded + total_skipped;
        CaptureSummary {
            frames_recorded: self.frames_recorded,
            frames_skipped: total_skipped,
            frames_padded: self.frames_padded,
            skip_rate: if attempted > 0 {
                total_skipped as f64 / attempted as f64 * 100.0
            } else {
                0.0
            },
            skipped_by_reason: self
                .frames_skipped
                .iter()
                .map(|(reason, count)| (reason.as_str().to_string(), *count))
                .collect(),
            imu_samples: self.imu_samples.clone(),
            frame_interval_ms: StatsSummary::from(&self.interval_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct CaptureSummary {
    pub frames_recorded: u64,
    pub frames_skipped: u64,
    pub frames_padded: u64,
    pub skip_rate: f64,
    pub skipped_by_reason: BTreeMap<String, u64>,
    pub imu_samples: BTreeMap<String, u64>,
    pub frame_interval_ms: StatsSummary,
}

impl std::fmt::Display for CaptureSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Capture Summary ===")?;
        writeln!(f, "Frames recorded: {}", self.frames_recorded)?;
        writeln!(
            f,
            "Frames skipped: {} ({:.2}%)",
            self.frames_skipped, self.skip_rate
        )?;
        for (reason, count) in &self.skipped_by_reason {
            writeln!(f, "  {}: {}", reason, count)?;
        }
        writeln!(f, "Frames padded: {}", self.frames_padded)?;
        writeln!(f, "Frame interval (ms): {}", self.frame_interval_ms)?;

        if !self.imu_samples.is_empty() {
            writeln!(f, "IMU samples:")?;
            for (channel, count) in &self.imu_samples {
                writeln!(f, "  {}: {}", channel, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

//! # Depth Codec
//!
//! 深度采样位域编解码。
//!
//! 每个采样为 16 位无符号数：
//! - 低 13 位: 距离 (毫米), 范围 [0, 8191]
//! - 高 3 位: 置信度等级, 范围 [0, 7]
//!
//! 运行时给出的深度图为小端 u16 紧密排列；落盘的深度流只保留距离，
//! 仍为小端 u16。
//!
//! # Example
//!
//! ```
//! use depth_codec::{decode, Confidence};
//!
//! let (range, class) = decode(0x2001);
//! assert_eq!((range, class), (1, 1));
//! assert_eq!(Confidence::new(class).fraction(), 0.0);
//! ```

use serde::{Deserialize, Serialize};

/// 距离位掩码
pub const RANGE_MASK: u16 = 0x1FFF;

/// 置信度等级位移
pub const CONFIDENCE_SHIFT: u32 = 13;

/// 置信度等级掩码 (位移后)
pub const CONFIDENCE_MASK: u16 = 0x7;

/// 每个采样的字节数
pub const SAMPLE_BYTES: usize = 2;

/// 拆分一个采样: (距离, 置信度等级)
#[inline]
pub fn decode(sample: u16) -> (u16, u8) {
    let range = sample & RANGE_MASK;
    let confidence = ((sample >> CONFIDENCE_SHIFT) & CONFIDENCE_MASK) as u8;
    (range, confidence)
}

/// 距离的落盘表示 (小端)
#[inline]
pub fn encode_range_for_storage(range: u16) -> [u8; SAMPLE_BYTES] {
    range.to_le_bytes()
}

/// 置信度等级 (3 位)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Confidence(u8);

impl Confidence {
    /// 超出 3 位的部分被丢弃
    pub fn new(class: u8) -> Self {
        Self(class & CONFIDENCE_MASK as u8)
    }

    pub fn class(&self) -> u8 {
        self.0
    }

    /// 等级对应的置信度: 0 -> 100%, 1 -> 0%, k -> (k-1)/7
    pub fn fraction(&self) -> f32 {
        match self.0 {
            0 => 1.0,
            k => f32::from(k - 1) / 7.0,
        }
    }
}

impl From<u16> for Confidence {
    fn from(sample: u16) -> Self {
        Self(decode(sample).1)
    }
}

/// 迭代小端紧密排列的采样；末尾不足两字节的部分被忽略
pub fn samples(packed: &[u8]) -> impl Iterator<Item = u16> + '_ {
    packed
        .chunks_exact(SAMPLE_BYTES)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
}

/// 将运行时深度图转为落盘距离流
pub fn repack_depth_image(packed: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(packed.len() - packed.len() % SAMPLE_BYTES);
    for sample in samples(packed) {
        out.extend_from_slice(&encode_range_for_storage(decode(sample).0));
    }
    out
}

/// 读回落盘距离流
pub fn decode_range_stream(stored: &[u8]) -> Vec<u16> {
    samples(stored).collect()
}

/// 拆分深度图为 (距离列表, 等级列表)，用于调试输出
pub fn split_depth_image(packed: &[u8]) -> (Vec<u16>, Vec<u8>) {
    samples(packed).map(decode).unzip()
}

/// `[a, b, c]` 形式的调试文本
pub fn format_list<T: std::fmt::Display>(values: &[T]) -> String {
    let mut out = String::with_capacity(values.len() * 5 + 2);
    out.push('[');
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&value.to_string());
    }
    out.push(']');
    out
}

//! 报文编解码模块
//!
//! 十六进制文本与数据包树之间的双向转换，包括帧分类、扰码与校验

pub mod bit_cursor;
pub mod checksum;
pub mod framing;
pub mod scramble;

use btel_core::schema_meta::CRC_BITS;
use btel_core::utils::u64_to_bits;
use btel_core::FramingTransform;

/// 默认帧变换：LFSR加性扰码 + 逐位CRC-16
#[derive(Debug, Default)]
pub struct BaliseTransform;

impl FramingTransform for BaliseTransform {
    fn scramble(&self, seed: u64, payload: &str) -> String {
        scramble::Scrambler::new(seed).apply(payload)
    }

    fn descramble(&self, seed: u64, payload: &str) -> String {
        // 加性扰码：解扰与加扰相同
        scramble::Scrambler::new(seed).apply(payload)
    }

    fn checksum(&self, bits: &str) -> String {
        u64_to_bits(checksum::crc16_bits(bits) as u64, CRC_BITS as u32)
    }
}

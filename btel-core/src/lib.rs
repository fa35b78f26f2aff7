//! BTEL Core Library
//!
//! This crate provides the core abstractions and data structures for the
//! BTEL (Balise Telegram Editing Library) system.

pub mod error;
pub mod schema_meta;
pub mod utils;

// 导出错误类型
pub use error::TelegramError;

// 导出模式元数据类型，便于其他模块使用
pub use schema_meta::*;

/// 帧变换接口 - 实现编解码流程与具体位级算法的分离
///
/// 校验和与扰码算法通过该接口注入，便于以权威信号规范中的
/// 变换替换默认实现而不改动编解码流程
pub trait FramingTransform: Send + Sync {
    /// 加扰载荷
    fn scramble(&self, seed: u64, payload: &str) -> String;

    /// 解扰载荷
    fn descramble(&self, seed: u64, payload: &str) -> String;

    /// 计算校验和，返回 CRC_BITS 宽度的位串
    fn checksum(&self, bits: &str) -> String;
}

//! BTEL 报文对象与编解码模块
//!
//! 实现应答器报文的层级位域模式与报文级编解码功能

pub mod codec;
pub mod schema;
pub mod snapshot;

// 导出主要类型
pub use btel_core::FramingTransform; // 修正：直接从btel_core导入
pub use codec::framing::{DecodeReport, PacketRegistry, TelegramCodec};
pub use codec::BaliseTransform;
pub use schema::field::{ChangeEvent, ChangeListener, Field};
pub use schema::node::{ConditionalField, PacketNode, RepeatingGroup};
pub use schema::packet::Packet;
pub use schema::telegram::Telegram;
pub use snapshot::TelegramSnapshot;

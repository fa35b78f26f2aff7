//! 报文模式运行时模块
//!
//! 字段、数据包与报文树的可变运行时状态及内置目录

pub mod catalog;
pub mod field;
pub mod node;
pub mod packet;
pub mod telegram;

//! 报文运行时实现
//!
//! 一条报文由帧头字段组与有序的内容数据包组成。帧级的类别、
//! 校验和与扰码由编解码器在位串层面处理，此处只负责用户位。

use btel_core::TelegramError;

use crate::schema::catalog;
use crate::schema::packet::Packet;
use crate::snapshot::TelegramSnapshot;

/// 报文运行时状态
#[derive(Debug, Clone, PartialEq)]
pub struct Telegram {
    header: Packet,
    packets: Vec<Packet>,
}

impl Telegram {
    /// 创建只含全零帧头的空报文
    pub fn new() -> Result<Self, TelegramError> {
        Ok(Self {
            header: Packet::from_spec(&catalog::header_spec())?,
            packets: Vec::new(),
        })
    }

    /// 由解码得到的帧头与数据包组装报文
    pub fn from_parts(header: Packet, packets: Vec<Packet>) -> Self {
        Self { header, packets }
    }

    pub fn header(&self) -> &Packet {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Packet {
        &mut self.header
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    pub fn packets_mut(&mut self) -> &mut [Packet] {
        &mut self.packets
    }

    pub fn push_packet(&mut self, packet: Packet) {
        self.packets.push(packet);
    }

    /// 报文的用户位：帧头与各数据包输出的顺序拼接
    ///
    /// 不含结束标志与填充，二者由编解码器补充
    pub fn user_bits(&self) -> String {
        let mut bits = self.header.contributed_bits();
        for packet in &self.packets {
            bits.push_str(&packet.contributed_bits());
        }
        bits
    }

    /// 只读解码快照，供图表等消费方使用
    pub fn snapshot(&self) -> TelegramSnapshot {
        TelegramSnapshot::capture(self)
    }
}

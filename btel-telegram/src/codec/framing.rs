//! 报文组帧与编解码
//!
//! 十六进制文本 → 位串 → 解扰 → 校验 → 按数据包标识逐包解码，
//! 以及对应的逆过程。分类规则：达到边界字符数的输入按长报文
//! 处理，低于最小长度的输入宽松地解码为空结果。

use regex::Regex;
use std::collections::HashMap;

use btel_core::schema_meta::{
    PacketSpec, TelegramClass, CLASS_BITS, CRC_BITS, MIN_HEX_CHARS, SEED_BITS,
};
use btel_core::utils::{bits_to_bytes, bits_to_u64, bytes_to_bits, u64_to_bits};
use btel_core::{FramingTransform, TelegramError};

use crate::codec::bit_cursor::BitCursor;
use crate::codec::BaliseTransform;
use crate::schema::catalog::{self, END_OF_INFORMATION};
use crate::schema::packet::Packet;
use crate::schema::telegram::Telegram;

/// 编码时使用的固定扰码种子
pub const DEFAULT_SCRAMBLER_SEED: u64 = 0xA5A;

/// 数据包定义注册表，解码时按标识分发
pub struct PacketRegistry {
    specs: HashMap<u8, PacketSpec>,
}

impl PacketRegistry {
    /// 空注册表
    pub fn empty() -> Self {
        Self {
            specs: HashMap::new(),
        }
    }

    /// 含全部内置数据包的标准注册表
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for spec in catalog::builtin_packets() {
            // 内置定义经过测试校验，注册不会失败
            let _ = registry.register(spec);
        }
        registry
    }

    /// 注册一个数据包定义
    pub fn register(&mut self, spec: PacketSpec) -> Result<(), TelegramError> {
        let id = spec.packet_id.ok_or_else(|| {
            TelegramError::SchemaConsistency(format!(
                "Packet {} has no identifier and cannot be registered",
                spec.name
            ))
        })?;
        btel_core::schema_meta::validate_packet_spec(&spec)?;
        self.specs.insert(id, spec);
        Ok(())
    }

    pub fn get(&self, id: u8) -> Option<&PacketSpec> {
        self.specs.get(&id)
    }
}

impl Default for PacketRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// 解码结果
///
/// 宽松策略：校验失败或部分解码失败时仍尽力返回已解出的数据包，
/// 问题记录在 warnings 中
#[derive(Debug)]
pub struct DecodeReport {
    pub telegram: Option<Telegram>,
    pub class: Option<TelegramClass>,
    pub checksum_ok: bool,
    pub warnings: Vec<TelegramError>,
}

impl DecodeReport {
    fn empty() -> Self {
        Self {
            telegram: None,
            class: None,
            checksum_ok: false,
            warnings: Vec::new(),
        }
    }

    fn rejected(warning: TelegramError) -> Self {
        Self {
            telegram: None,
            class: None,
            checksum_ok: false,
            warnings: vec![warning],
        }
    }

    /// 输入为空或不可解码时为真
    pub fn is_empty(&self) -> bool {
        self.telegram.is_none()
    }
}

/// 报文编解码器
pub struct TelegramCodec {
    registry: PacketRegistry,
    transform: Box<dyn FramingTransform>,
}

impl TelegramCodec {
    /// 标准注册表加默认帧变换
    pub fn new() -> Self {
        Self {
            registry: PacketRegistry::standard(),
            transform: Box::new(BaliseTransform),
        }
    }

    /// 自定义注册表与帧变换
    pub fn with_parts(registry: PacketRegistry, transform: Box<dyn FramingTransform>) -> Self {
        Self {
            registry,
            transform,
        }
    }

    pub fn registry(&self) -> &PacketRegistry {
        &self.registry
    }

    /// 去除十六进制文本中的空白与常见分隔符
    pub fn normalize_hex(text: &str) -> String {
        let separators = Regex::new(r"[\s.:_-]+").unwrap();
        separators.replace_all(text, "").to_string()
    }

    /// 解码十六进制文本
    pub fn decode(&self, hex_text: &str) -> DecodeReport {
        let mut normalized = Self::normalize_hex(hex_text);
        if normalized.is_empty() {
            return DecodeReport::empty();
        }
        let Some(class) = TelegramClass::classify_hex_len(normalized.len()) else {
            return DecodeReport::rejected(TelegramError::MalformedInput(format!(
                "Input of {} hex characters is below the minimum of {MIN_HEX_CHARS}",
                normalized.len()
            )));
        };
        if normalized.len() % 2 != 0 {
            // 奇数长度：补一个零半字节，分类已经确定，超出帧的位会被忽略
            normalized.push('0');
        }
        let raw = match hex::decode(&normalized) {
            Ok(bytes) => bytes,
            Err(err) => {
                return DecodeReport::rejected(TelegramError::MalformedInput(format!(
                    "Invalid hexadecimal input: {err}"
                )));
            }
        };

        let mut bits = bytes_to_bits(&raw);
        bits.truncate(class.padded_bits());

        let payload_len = class.payload_bits();
        let seed_bits = &bits[0..SEED_BITS];
        let seed = bits_to_u64(seed_bits);
        let marker = bits_to_u64(&bits[SEED_BITS..SEED_BITS + CLASS_BITS]);
        let scrambled = &bits[SEED_BITS + CLASS_BITS..SEED_BITS + CLASS_BITS + payload_len];
        let crc_start = SEED_BITS + CLASS_BITS + payload_len;
        let crc_wire = bits_to_u64(&bits[crc_start..crc_start + CRC_BITS]);

        let payload = self.transform.descramble(seed, scrambled);

        let mut warnings = Vec::new();
        let mut check_input = String::with_capacity(SEED_BITS + CLASS_BITS + payload_len);
        check_input.push_str(seed_bits);
        check_input.push_str(&bits[SEED_BITS..SEED_BITS + CLASS_BITS]);
        check_input.push_str(&payload);
        let crc_calc = bits_to_u64(&self.transform.checksum(&check_input));
        let checksum_ok = crc_calc == crc_wire;
        if !checksum_ok {
            warnings.push(TelegramError::Checksum(format!(
                "Checksum mismatch: computed {crc_calc:#06X}, telegram carries {crc_wire:#06X}"
            )));
        }
        if TelegramClass::from_marker(marker) != Some(class) {
            warnings.push(TelegramError::Parse(format!(
                "Class marker {marker:#05b} does not match {class:?} framing"
            )));
        }

        let telegram = self.decode_payload(&payload, &mut warnings);
        DecodeReport {
            telegram,
            class: Some(class),
            checksum_ok,
            warnings,
        }
    }

    /// 将解扰后的用户位走包解码，尽力而为
    fn decode_payload(&self, payload: &str, warnings: &mut Vec<TelegramError>) -> Option<Telegram> {
        let mut cursor = BitCursor::new(payload);
        let mut header = match Packet::from_spec(&catalog::header_spec()) {
            Ok(packet) => packet,
            Err(err) => {
                warnings.push(err);
                return None;
            }
        };
        if let Err(err) = header.consume(&mut cursor) {
            warnings.push(err);
            return None;
        }

        let mut packets = Vec::new();
        loop {
            let Some(id_bits) = cursor.peek(8) else {
                warnings.push(TelegramError::Parse(
                    "Telegram payload ended without end-of-information marker".to_string(),
                ));
                break;
            };
            let id = bits_to_u64(id_bits) as u8;
            if id == END_OF_INFORMATION {
                // 结束标志之后的位是填充，忽略
                let _ = cursor.skip(8);
                break;
            }
            match self.registry.get(id) {
                Some(spec) => {
                    let mut packet = match Packet::from_spec(spec) {
                        Ok(packet) => packet,
                        Err(err) => {
                            warnings.push(err);
                            break;
                        }
                    };
                    match packet.consume(&mut cursor) {
                        Ok(()) => {
                            check_declared_length(&packet, warnings);
                            packets.push(packet);
                        }
                        Err(err) => {
                            warnings.push(err);
                            break;
                        }
                    }
                }
                None => {
                    if !skip_unknown_packet(&mut cursor, id, warnings) {
                        break;
                    }
                }
            }
        }
        Some(Telegram::from_parts(header, packets))
    }

    /// 编码报文为十六进制文本
    ///
    /// 重算各数据包的 L_PACKET，按用户位长选择帧类别，补结束标志
    /// 与零填充后加扰、加校验和
    pub fn encode(&self, telegram: &mut Telegram) -> Result<String, TelegramError> {
        for packet in telegram.packets_mut() {
            packet.recompute_length()?;
        }
        let user = telegram.user_bits();
        let class = class_for_user_len(user.len())?;

        let mut payload = user;
        if payload.len() < class.payload_bits() {
            payload.push_str(&u64_to_bits(END_OF_INFORMATION as u64, 8));
        }
        while payload.len() < class.payload_bits() {
            payload.push('0');
        }

        let seed_bits = u64_to_bits(DEFAULT_SCRAMBLER_SEED, SEED_BITS as u32);
        let marker_bits = u64_to_bits(class.marker(), CLASS_BITS as u32);

        let mut check_input =
            String::with_capacity(SEED_BITS + CLASS_BITS + class.payload_bits());
        check_input.push_str(&seed_bits);
        check_input.push_str(&marker_bits);
        check_input.push_str(&payload);
        let crc_bits = self.transform.checksum(&check_input);

        let scrambled = self.transform.scramble(DEFAULT_SCRAMBLER_SEED, &payload);

        let mut frame = String::with_capacity(class.padded_bits());
        frame.push_str(&seed_bits);
        frame.push_str(&marker_bits);
        frame.push_str(&scrambled);
        frame.push_str(&crc_bits);
        while frame.len() < class.padded_bits() {
            frame.push('0');
        }

        Ok(hex::encode_upper(bits_to_bytes(&frame)))
    }
}

impl Default for TelegramCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// 按用户位长选择帧类别
///
/// 结束标志需要8位，除非用户位恰好占满载荷
fn class_for_user_len(len: usize) -> Result<TelegramClass, TelegramError> {
    for class in [TelegramClass::Short, TelegramClass::Long] {
        let capacity = class.payload_bits();
        if len == capacity || len + 8 <= capacity {
            return Ok(class);
        }
    }
    Err(TelegramError::Length(format!(
        "Telegram content of {len} bits exceeds the long telegram capacity of {} bits",
        TelegramClass::Long.payload_bits()
    )))
}

/// 利用 L_PACKET 跳过未知数据包，返回是否可以继续解码
fn skip_unknown_packet(
    cursor: &mut BitCursor<'_>,
    id: u8,
    warnings: &mut Vec<TelegramError>,
) -> bool {
    // NID_PACKET(8) + Q_DIR(2) 之后是13位的 L_PACKET
    if let Some(head) = cursor.peek(23) {
        let declared = bits_to_u64(&head[10..23]) as usize;
        if declared >= 23 && cursor.skip(declared).is_ok() {
            warnings.push(TelegramError::Parse(format!(
                "Unknown packet id {id}, skipped {declared} bits"
            )));
            return true;
        }
    }
    warnings.push(TelegramError::Parse(format!(
        "Unknown packet id {id}, decoding stopped"
    )));
    false
}

/// 解码后核对 L_PACKET 与实际位长
fn check_declared_length(packet: &Packet, warnings: &mut Vec<TelegramError>) {
    if let Some(field) = packet.find_field("L_PACKET") {
        let declared = field.decimal_value();
        let actual = packet.contributed_bits().len() as u64;
        if declared != actual {
            warnings.push(TelegramError::Length(format!(
                "Packet {:?}: L_PACKET declares {declared} bits but actual length is {actual} bits",
                packet.name()
            )));
        }
    }
}

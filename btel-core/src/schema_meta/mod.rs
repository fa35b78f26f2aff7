//! 报文模式元数据模块
//!
//! 定义字段、数据包与报文帧的声明式描述结构

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::TelegramError;

/// 扰码种子字段位宽
pub const SEED_BITS: usize = 12;
/// 帧类别标记位宽
pub const CLASS_BITS: usize = 3;
/// 校验和位宽
pub const CRC_BITS: usize = 16;
/// 可解码输入的最小十六进制字符数（一个完整短报文）
pub const MIN_HEX_CHARS: usize = 86;
/// 达到该十六进制字符数的输入按长报文处理
pub const LONG_HEX_BOUNDARY: usize = 256;

/// 给定位宽下可编码的最大值
pub fn max_value_for_width(width_bits: u32) -> u64 {
    if width_bits >= 64 {
        u64::MAX
    } else {
        (1u64 << width_bits) - 1
    }
}

/// 国家代码段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryBand {
    pub from: u64,
    pub to: u64,
    pub name: String,
}

/// 字段枚举种类
///
/// 每个种类对应一种"十进制值→显示标签"的映射规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    /// 每个值显示为其十进制文本
    Plain,
    /// 显式的值→标签表，表外的值回退为十进制文本
    Flag { labels: Vec<(u64, String)> },
    /// 速度：值 × 5 km/h，最大可编码值显示为无限制
    Speed,
    /// 加速度：值 × 0.05 m/s²
    Acceleration,
    /// 国家代码：连续数值段映射到国家名
    CountryCode { bands: Vec<CountryBand> },
    /// 普通编号加若干特殊值
    Sentinel { special: Vec<(u64, String)> },
}

impl FieldKind {
    /// 计算给定值在该种类下的显示标签
    pub fn label_for(&self, value: u64, width_bits: u32) -> String {
        match self {
            FieldKind::Plain => value.to_string(),
            FieldKind::Flag { labels } => labels
                .iter()
                .find(|(v, _)| *v == value)
                .map(|(_, label)| label.clone())
                .unwrap_or_else(|| value.to_string()),
            FieldKind::Speed => {
                if value == max_value_for_width(width_bits) {
                    "unlimited (∞)".to_string()
                } else {
                    format!("{} km/h", value * 5)
                }
            }
            FieldKind::Acceleration => format!("{:.2} m/s²", value as f64 * 0.05),
            FieldKind::CountryCode { bands } => bands
                .iter()
                .find(|b| b.from <= value && value <= b.to)
                .map(|b| format!("{} ({value})", b.name))
                .unwrap_or_else(|| value.to_string()),
            FieldKind::Sentinel { special } => special
                .iter()
                .find(|(v, _)| *v == value)
                .map(|(_, label)| label.clone())
                .unwrap_or_else(|| value.to_string()),
        }
    }
}

/// 字段定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub width_bits: u32,
    pub description: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(name: &str, width_bits: u32, description: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            width_bits,
            description: description.to_string(),
            kind,
        }
    }

    /// 该字段可编码的最大十进制值
    pub fn max_value(&self) -> u64 {
        max_value_for_width(self.width_bits)
    }

    /// 字段定义合法性校验
    pub fn validate(&self) -> Result<(), TelegramError> {
        if self.name.is_empty() {
            return Err(TelegramError::SchemaConsistency(
                "Field name must not be empty".to_string(),
            ));
        }
        if self.width_bits == 0 || self.width_bits > 64 {
            return Err(TelegramError::SchemaConsistency(format!(
                "Field {} has invalid width: {} bits (expected 1..=64)",
                self.name, self.width_bits
            )));
        }
        Ok(())
    }
}

/// 数据包节点定义
///
/// 递归的带标签变体：克隆即为值树的深拷贝，无需运行期类型查找
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeSpec {
    /// 普通字段
    Field(FieldSpec),
    /// 条件字段：仅当 condition_field 的十进制值等于 required_value 时出现在位流中
    Conditional {
        inner: Box<NodeSpec>,
        condition_field: String,
        #[serde(deserialize_with = "deserialize_value_lenient")]
        required_value: u64,
    },
    /// 重复组：count 字段的十进制值决定 template 的实例个数
    Group {
        count: FieldSpec,
        template: Vec<NodeSpec>,
    },
}

/// 自定义反序列化：支持数字或十六进制字符串
fn deserialize_value_lenient<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;
    use serde::Deserialize as _;

    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| de::Error::custom("number out of range")),
        serde_json::Value::String(s) => {
            let s = s.trim();
            if let Some(stripped) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                u64::from_str_radix(stripped, 16)
                    .map_err(|_| de::Error::custom(format!("invalid hex string: {s}")))
            } else {
                s.parse::<u64>()
                    .map_err(|_| de::Error::custom(format!("invalid number string: {s}")))
            }
        }
        _ => Err(de::Error::custom("expected number or string")),
    }
}

/// 数据包定义
///
/// packet_id 为 None 时表示无标识字段的帧头字段组
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketSpec {
    pub packet_id: Option<u8>,
    pub name: String,
    pub description: String,
    pub nodes: Vec<NodeSpec>,
}

/// 报文帧类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TelegramClass {
    Short,
    Long,
}

impl TelegramClass {
    /// 帧总位数（含种子、类别标记与校验和）
    pub fn total_bits(&self) -> usize {
        match self {
            TelegramClass::Short => 341,
            TelegramClass::Long => 1023,
        }
    }

    /// 载荷位数（帧头各字段之外的可用位数）
    pub fn payload_bits(&self) -> usize {
        self.total_bits() - SEED_BITS - CLASS_BITS - CRC_BITS
    }

    /// 补齐到字节边界后的位数（十六进制表示使用）
    pub fn padded_bits(&self) -> usize {
        self.total_bits().div_ceil(8) * 8
    }

    /// 十六进制表示的字符数
    pub fn hex_chars(&self) -> usize {
        self.padded_bits() / 4
    }

    /// 帧内类别标记值
    pub fn marker(&self) -> u64 {
        match self {
            TelegramClass::Short => 0b001,
            TelegramClass::Long => 0b010,
        }
    }

    /// 根据类别标记值反查类别
    pub fn from_marker(marker: u64) -> Option<TelegramClass> {
        match marker {
            0b001 => Some(TelegramClass::Short),
            0b010 => Some(TelegramClass::Long),
            _ => None,
        }
    }

    /// 按输入十六进制字符数分类
    ///
    /// 低于最小长度的输入不可解码；达到 LONG_HEX_BOUNDARY 的按长报文处理
    pub fn classify_hex_len(hex_len: usize) -> Option<TelegramClass> {
        if hex_len < MIN_HEX_CHARS {
            None
        } else if hex_len < LONG_HEX_BOUNDARY {
            Some(TelegramClass::Short)
        } else {
            Some(TelegramClass::Long)
        }
    }
}

/// 数据包定义合法性校验
///
/// 条件字段引用的字段必须在同一数据包或同一重复组模板中先行声明；
/// 同名字段后声明者在条件解析时覆盖先声明者（与位流顺序一致）
pub fn validate_packet_spec(spec: &PacketSpec) -> Result<(), TelegramError> {
    let mut scopes: Vec<HashSet<String>> = vec![HashSet::new()];
    validate_nodes(&spec.nodes, &mut scopes, &spec.name)
}

fn validate_nodes(
    nodes: &[NodeSpec],
    scopes: &mut Vec<HashSet<String>>,
    packet: &str,
) -> Result<(), TelegramError> {
    for node in nodes {
        validate_node(node, scopes, packet)?;
    }
    Ok(())
}

fn validate_node(
    node: &NodeSpec,
    scopes: &mut Vec<HashSet<String>>,
    packet: &str,
) -> Result<(), TelegramError> {
    match node {
        NodeSpec::Field(field) => {
            field.validate()?;
            declare(scopes, &field.name);
        }
        NodeSpec::Conditional {
            inner,
            condition_field,
            ..
        } => {
            if !scopes.iter().any(|frame| frame.contains(condition_field)) {
                return Err(TelegramError::SchemaConsistency(format!(
                    "Condition field {condition_field} is not declared before its conditional node in packet {packet}"
                )));
            }
            validate_node(inner, scopes, packet)?;
        }
        NodeSpec::Group { count, template } => {
            count.validate()?;
            declare(scopes, &count.name);
            scopes.push(HashSet::new());
            validate_nodes(template, scopes, packet)?;
            scopes.pop();
        }
    }
    Ok(())
}

fn declare(scopes: &mut [HashSet<String>], name: &str) {
    if let Some(frame) = scopes.last_mut() {
        frame.insert(name.to_string());
    }
}

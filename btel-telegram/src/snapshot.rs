//! 只读解码快照
//!
//! 供图表等消费方使用的序列化视图：数据包标识→有序字段值。
//! 条件存在性按字段当前值实时评估，与树的最新状态一致。

use serde::{Deserialize, Serialize};

use crate::schema::node::{PacketNode, ValueScope};
use crate::schema::packet::Packet;
use crate::schema::telegram::Telegram;

/// 单个字段的快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub name: String,
    pub bits: String,
    pub decimal: u64,
    pub label: String,
    /// 条件字段未出现在位流中时为 false
    pub present: bool,
}

/// 单个数据包的快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketSnapshot {
    pub packet_id: Option<u64>,
    pub name: String,
    pub fields: Vec<FieldSnapshot>,
}

/// 整条报文的快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramSnapshot {
    pub header: PacketSnapshot,
    pub packets: Vec<PacketSnapshot>,
}

impl TelegramSnapshot {
    pub fn capture(telegram: &Telegram) -> Self {
        Self {
            header: capture_packet(telegram.header()),
            packets: telegram.packets().iter().map(capture_packet).collect(),
        }
    }

    /// 序列化为JSON文本，供图表与持久化消费方使用
    pub fn to_json(&self) -> Result<String, btel_core::TelegramError> {
        serde_json::to_string_pretty(self)
            .map_err(|err| btel_core::TelegramError::Parse(format!("Cannot serialize snapshot: {err}")))
    }
}

fn capture_packet(packet: &Packet) -> PacketSnapshot {
    let mut fields = Vec::new();
    let mut scope = ValueScope::new();
    if let Some(id) = packet.id_field() {
        scope.record(id.name(), id.decimal_value());
        fields.push(FieldSnapshot {
            name: id.name().to_string(),
            bits: id.bits().to_string(),
            decimal: id.decimal_value(),
            label: id.label(),
            present: true,
        });
    }
    for node in packet.nodes() {
        collect_node(node, &mut scope, "", &mut fields);
    }
    PacketSnapshot {
        packet_id: packet.packet_id(),
        name: packet.name().to_string(),
        fields,
    }
}

fn collect_node(
    node: &PacketNode,
    scope: &mut ValueScope,
    suffix: &str,
    out: &mut Vec<FieldSnapshot>,
) {
    match node {
        PacketNode::Field(field) => {
            scope.record(field.name(), field.decimal_value());
            out.push(FieldSnapshot {
                name: format!("{}{suffix}", field.name()),
                bits: field.bits().to_string(),
                decimal: field.decimal_value(),
                label: field.label(),
                present: true,
            });
        }
        PacketNode::Conditional(conditional) => {
            if conditional.is_met(scope) {
                collect_node(conditional.inner(), scope, suffix, out);
            } else {
                collect_absent(conditional.inner(), suffix, out);
            }
        }
        PacketNode::Group(group) => {
            let count = group.count_field();
            scope.record(count.name(), count.decimal_value());
            out.push(FieldSnapshot {
                name: format!("{}{suffix}", count.name()),
                bits: count.bits().to_string(),
                decimal: count.decimal_value(),
                label: count.label(),
                present: true,
            });
            for (index, instance) in group.instances().iter().enumerate() {
                let instance_suffix = format!("{suffix}[{index}]");
                scope.push_frame();
                for child in instance {
                    collect_node(child, scope, &instance_suffix, out);
                }
                scope.pop_frame();
            }
        }
    }
}

/// 条件未满足的子树：字段以缺席状态出现在快照中，与值为零可区分
fn collect_absent(node: &PacketNode, suffix: &str, out: &mut Vec<FieldSnapshot>) {
    match node {
        PacketNode::Field(field) => {
            out.push(FieldSnapshot {
                name: format!("{}{suffix}", field.name()),
                bits: String::new(),
                decimal: 0,
                label: "absent".to_string(),
                present: false,
            });
        }
        PacketNode::Conditional(conditional) => collect_absent(conditional.inner(), suffix, out),
        PacketNode::Group(group) => {
            out.push(FieldSnapshot {
                name: format!("{}{suffix}", group.count_field().name()),
                bits: String::new(),
                decimal: 0,
                label: "absent".to_string(),
                present: false,
            });
        }
    }
}

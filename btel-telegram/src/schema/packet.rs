//! 数据包运行时实现
//!
//! 数据包是共享同一标识的有序节点序列，序列化顺序即声明顺序。
//! 帧头字段组作为无标识字段的退化数据包复用同一实现。

use btel_core::schema_meta::{validate_packet_spec, PacketSpec};
use btel_core::TelegramError;

use crate::codec::bit_cursor::BitCursor;
use crate::schema::catalog;
use crate::schema::field::{ChangeListener, Field};
use crate::schema::node::{PacketNode, ValueScope};

/// 数据包运行时状态
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    id_field: Option<Field>,
    name: String,
    description: String,
    nodes: Vec<PacketNode>,
}

impl Packet {
    /// 从声明式定义构建全零值的数据包，构建时校验模式一致性
    pub fn from_spec(spec: &PacketSpec) -> Result<Self, TelegramError> {
        validate_packet_spec(spec)?;
        let id_field = match spec.packet_id {
            Some(id) => {
                let mut field = Field::new(catalog::nid_packet());
                field.set_decimal_value(id as u64)?;
                Some(field)
            }
            None => None,
        };
        Ok(Self {
            id_field,
            name: spec.name.clone(),
            description: spec.description.clone(),
            nodes: spec.nodes.iter().map(PacketNode::from_spec).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// 数据包标识值，帧头字段组返回 None
    pub fn packet_id(&self) -> Option<u64> {
        self.id_field.as_ref().map(Field::decimal_value)
    }

    pub fn id_field(&self) -> Option<&Field> {
        self.id_field.as_ref()
    }

    pub fn nodes(&self) -> &[PacketNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [PacketNode] {
        &mut self.nodes
    }

    /// 数据包的线上表示：标识字段加各节点输出的顺序拼接
    pub fn contributed_bits(&self) -> String {
        let mut scope = ValueScope::new();
        let mut out = String::new();
        if let Some(id) = &self.id_field {
            scope.record(id.name(), id.decimal_value());
            out.push_str(id.bits());
        }
        for node in &self.nodes {
            out.push_str(&node.contributed_bits(&mut scope));
        }
        out
    }

    /// 先消费标识字段，再按声明顺序消费各节点
    pub fn consume(&mut self, cursor: &mut BitCursor<'_>) -> Result<(), TelegramError> {
        let mut scope = ValueScope::new();
        if let Some(id) = &mut self.id_field {
            let raw = cursor.take(id.width_bits() as usize)?;
            id.set_bits(raw)?;
            scope.record(id.name(), id.decimal_value());
        }
        for node in &mut self.nodes {
            node.consume(cursor, &mut scope)?;
        }
        Ok(())
    }

    /// 将 L_PACKET 字段更新为数据包的实际位长
    pub fn recompute_length(&mut self) -> Result<(), TelegramError> {
        let total = self.contributed_bits().len() as u64;
        if let Some(field) = self.find_field_mut("L_PACKET") {
            field.set_decimal_value(total)?;
        }
        Ok(())
    }

    /// 按名字查找首个匹配字段（深度优先，声明顺序）
    pub fn find_field(&self, name: &str) -> Option<&Field> {
        if let Some(id) = &self.id_field {
            if id.name() == name {
                return Some(id);
            }
        }
        for node in &self.nodes {
            if let Some(field) = node.find_field(name) {
                return Some(field);
            }
        }
        None
    }

    pub fn find_field_mut(&mut self, name: &str) -> Option<&mut Field> {
        if let Some(id) = &mut self.id_field {
            if id.name() == name {
                return Some(id);
            }
        }
        for node in &mut self.nodes {
            if let Some(field) = node.find_field_mut(name) {
                return Some(field);
            }
        }
        None
    }

    /// 设置字段值并维持重复组实例个数与计数一致
    pub fn set_field_value(&mut self, name: &str, value: u64) -> Result<(), TelegramError> {
        let field = self.find_field_mut(name).ok_or_else(|| {
            TelegramError::FieldNotFound(format!("Field not found: {name}"))
        })?;
        field.set_decimal_value(value)?;
        self.reconcile_groups();
        Ok(())
    }

    /// 订阅字段变更，供选择器界面刷新使用
    pub fn subscribe_field(
        &mut self,
        name: &str,
        listener: ChangeListener,
    ) -> Result<(), TelegramError> {
        let field = self.find_field_mut(name).ok_or_else(|| {
            TelegramError::FieldNotFound(format!("Field not found: {name}"))
        })?;
        field.subscribe(listener);
        Ok(())
    }

    /// 递归对齐所有重复组的实例个数
    pub fn reconcile_groups(&mut self) {
        for node in &mut self.nodes {
            node.reconcile_groups();
        }
    }
}

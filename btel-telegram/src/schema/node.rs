//! 数据包节点
//!
//! 字段、条件字段与重复组的带标签变体，构成可递归嵌套的数据包树。
//! 序列化顺序即声明顺序；条件字段通过名字查找先行字段的已解码值，
//! 不持有对象引用，克隆后无悬挂关联。

use btel_core::schema_meta::NodeSpec;
use btel_core::TelegramError;
use std::collections::HashMap;

use crate::codec::bit_cursor::BitCursor;
use crate::schema::field::Field;

/// 条件解析作用域
///
/// 名字→十进制值的帧栈：每进入一个重复组实例压入一帧，条件字段
/// 自内向外查找。同名字段以位流中最近一次赋值为准。
#[derive(Debug)]
pub struct ValueScope {
    frames: Vec<HashMap<String, u64>>,
}

impl Default for ValueScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueScope {
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    /// 记录一个字段的当前值到最内层帧
    pub fn record(&mut self, name: &str, value: u64) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), value);
        }
    }

    /// 自内向外查找字段值
    pub fn lookup(&self, name: &str) -> Option<u64> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).copied())
    }
}

/// 条件字段：仅当条件满足时其内部节点才出现在位流中
#[derive(Debug, Clone)]
pub struct ConditionalField {
    inner: Box<PacketNode>,
    condition_field: String,
    required_value: u64,
    present: bool,
}

impl ConditionalField {
    pub fn new(inner: PacketNode, condition_field: &str, required_value: u64) -> Self {
        Self {
            inner: Box::new(inner),
            condition_field: condition_field.to_string(),
            required_value,
            present: false,
        }
    }

    pub fn inner(&self) -> &PacketNode {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut PacketNode {
        &mut self.inner
    }

    pub fn condition_field(&self) -> &str {
        &self.condition_field
    }

    pub fn required_value(&self) -> u64 {
        self.required_value
    }

    /// 最近一次解码时条件是否满足
    pub fn present(&self) -> bool {
        self.present
    }

    /// 以作用域中的当前值评估条件
    pub fn is_met(&self, scope: &ValueScope) -> bool {
        scope
            .lookup(&self.condition_field)
            .map(|value| value == self.required_value)
            .unwrap_or(false)
    }

    pub fn contributed_bits(&self, scope: &mut ValueScope) -> String {
        if self.is_met(scope) {
            self.inner.contributed_bits(scope)
        } else {
            String::new()
        }
    }

    pub fn consume(
        &mut self,
        cursor: &mut BitCursor<'_>,
        scope: &mut ValueScope,
    ) -> Result<(), TelegramError> {
        if self.is_met(scope) {
            self.present = true;
            self.inner.consume(cursor, scope)
        } else {
            // 条件不满足：不消费任何位，内部节点保持上次的值
            self.present = false;
            Ok(())
        }
    }
}

impl PartialEq for ConditionalField {
    /// present 是解码痕迹，不参与值比较
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
            && self.condition_field == other.condition_field
            && self.required_value == other.required_value
    }
}

/// 重复组：计数字段的十进制值决定模板实例的个数
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatingGroup {
    count_field: Field,
    template: Vec<PacketNode>,
    instances: Vec<Vec<PacketNode>>,
}

impl RepeatingGroup {
    /// 模板保持全零值，作为新实例的原型被深拷贝
    pub fn new(count_field: Field, template: Vec<PacketNode>) -> Self {
        let mut group = Self {
            count_field,
            template,
            instances: Vec::new(),
        };
        group.reconcile();
        group
    }

    pub fn count_field(&self) -> &Field {
        &self.count_field
    }

    pub fn template(&self) -> &[PacketNode] {
        &self.template
    }

    pub fn instances(&self) -> &[Vec<PacketNode>] {
        &self.instances
    }

    pub fn instance_mut(&mut self, index: usize) -> Option<&mut Vec<PacketNode>> {
        self.instances.get_mut(index)
    }

    /// 设置计数并立即调整实例个数
    pub fn set_count(&mut self, count: u64) -> Result<(), TelegramError> {
        self.count_field.set_decimal_value(count)?;
        self.reconcile();
        Ok(())
    }

    /// 将实例个数对齐到计数字段的当前值
    ///
    /// 收缩从尾部丢弃，增长追加模板的全零深拷贝，已有实例不受影响
    pub fn reconcile(&mut self) {
        let target = self.count_field.decimal_value() as usize;
        if self.instances.len() > target {
            self.instances.truncate(target);
        }
        while self.instances.len() < target {
            self.instances.push(self.template.clone());
        }
    }

    pub fn contributed_bits(&self, scope: &mut ValueScope) -> String {
        let mut out = String::from(self.count_field.bits());
        scope.record(self.count_field.name(), self.count_field.decimal_value());
        for instance in &self.instances {
            scope.push_frame();
            for node in instance {
                out.push_str(&node.contributed_bits(scope));
            }
            scope.pop_frame();
        }
        out
    }

    /// 先消费计数字段，再按实例逐节点消费——总消费长度由数据决定
    pub fn consume(
        &mut self,
        cursor: &mut BitCursor<'_>,
        scope: &mut ValueScope,
    ) -> Result<(), TelegramError> {
        let raw = cursor.take(self.count_field.width_bits() as usize)?;
        self.count_field.set_bits(raw)?;
        scope.record(self.count_field.name(), self.count_field.decimal_value());
        self.reconcile();
        for instance in &mut self.instances {
            scope.push_frame();
            for node in instance.iter_mut() {
                node.consume(cursor, scope)?;
            }
            scope.pop_frame();
        }
        Ok(())
    }
}

/// 数据包树节点
#[derive(Debug, Clone, PartialEq)]
pub enum PacketNode {
    Field(Field),
    Conditional(ConditionalField),
    Group(RepeatingGroup),
}

impl PacketNode {
    /// 从声明式定义构建全零值的运行时节点
    pub fn from_spec(spec: &NodeSpec) -> PacketNode {
        match spec {
            NodeSpec::Field(field_spec) => PacketNode::Field(Field::new(field_spec.clone())),
            NodeSpec::Conditional {
                inner,
                condition_field,
                required_value,
            } => PacketNode::Conditional(ConditionalField::new(
                PacketNode::from_spec(inner),
                condition_field,
                *required_value,
            )),
            NodeSpec::Group { count, template } => PacketNode::Group(RepeatingGroup::new(
                Field::new(count.clone()),
                template.iter().map(PacketNode::from_spec).collect(),
            )),
        }
    }

    /// 节点贡献的位串，条件不满足的节点贡献空串
    pub fn contributed_bits(&self, scope: &mut ValueScope) -> String {
        match self {
            PacketNode::Field(field) => {
                scope.record(field.name(), field.decimal_value());
                field.bits().to_string()
            }
            PacketNode::Conditional(conditional) => conditional.contributed_bits(scope),
            PacketNode::Group(group) => group.contributed_bits(scope),
        }
    }

    /// 从游标按声明顺序消费本节点的位
    pub fn consume(
        &mut self,
        cursor: &mut BitCursor<'_>,
        scope: &mut ValueScope,
    ) -> Result<(), TelegramError> {
        match self {
            PacketNode::Field(field) => {
                let raw = cursor.take(field.width_bits() as usize)?;
                field.set_bits(raw)?;
                scope.record(field.name(), field.decimal_value());
                Ok(())
            }
            PacketNode::Conditional(conditional) => conditional.consume(cursor, scope),
            PacketNode::Group(group) => group.consume(cursor, scope),
        }
    }

    /// 递归对齐所有重复组的实例个数
    pub fn reconcile_groups(&mut self) {
        match self {
            PacketNode::Field(_) => {}
            PacketNode::Conditional(conditional) => conditional.inner_mut().reconcile_groups(),
            PacketNode::Group(group) => {
                group.reconcile();
                for instance in &mut group.instances {
                    for node in instance.iter_mut() {
                        node.reconcile_groups();
                    }
                }
            }
        }
    }

    /// 按名字查找首个匹配字段（深度优先，声明顺序）
    pub fn find_field(&self, name: &str) -> Option<&Field> {
        match self {
            PacketNode::Field(field) => {
                if field.name() == name {
                    Some(field)
                } else {
                    None
                }
            }
            PacketNode::Conditional(conditional) => conditional.inner().find_field(name),
            PacketNode::Group(group) => {
                if group.count_field().name() == name {
                    return Some(group.count_field());
                }
                for instance in group.instances() {
                    for node in instance {
                        if let Some(field) = node.find_field(name) {
                            return Some(field);
                        }
                    }
                }
                None
            }
        }
    }

    pub fn find_field_mut(&mut self, name: &str) -> Option<&mut Field> {
        match self {
            PacketNode::Field(field) => {
                if field.name() == name {
                    Some(field)
                } else {
                    None
                }
            }
            PacketNode::Conditional(conditional) => conditional.inner_mut().find_field_mut(name),
            PacketNode::Group(group) => {
                if group.count_field.name() == name {
                    return Some(&mut group.count_field);
                }
                for instance in &mut group.instances {
                    for node in instance.iter_mut() {
                        if let Some(field) = node.find_field_mut(name) {
                            return Some(field);
                        }
                    }
                }
                None
            }
        }
    }
}

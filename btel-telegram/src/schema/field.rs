//! 字段运行时实现
//!
//! 最小粒度的报文单元——定宽无符号位域，持有当前位串值并向
//! 订阅者同步推送变更通知

use btel_core::schema_meta::FieldSpec;
use btel_core::utils::{bits_to_u64, u64_to_bits};
use btel_core::TelegramError;
use std::fmt;

/// 字段变更事件，携带字段标识与新旧位串
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub field: String,
    pub old_bits: String,
    pub new_bits: String,
}

/// 变更监听器，在修改调用返回前于调用线程上同步执行
pub type ChangeListener = Box<dyn Fn(&ChangeEvent) + Send + Sync>;

/// 字段运行时状态
pub struct Field {
    spec: FieldSpec,
    value: String,
    listeners: Vec<ChangeListener>,
}

impl Field {
    /// 以全零值创建字段
    pub fn new(spec: FieldSpec) -> Self {
        let value = "0".repeat(spec.width_bits as usize);
        Self {
            spec,
            value,
            listeners: Vec::new(),
        }
    }

    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn width_bits(&self) -> u32 {
        self.spec.width_bits
    }

    pub fn description(&self) -> &str {
        &self.spec.description
    }

    /// 当前位串值，长度恒等于字段宽度
    pub fn bits(&self) -> &str {
        &self.value
    }

    /// 将位串解释为无符号整数
    pub fn decimal_value(&self) -> u64 {
        bits_to_u64(&self.value)
    }

    /// 按十进制值设置字段，越界拒绝而非截断
    pub fn set_decimal_value(&mut self, value: u64) -> Result<(), TelegramError> {
        if value > self.spec.max_value() {
            return Err(TelegramError::Range(format!(
                "Value {value} does not fit field {} ({} bits, maximum {})",
                self.spec.name,
                self.spec.width_bits,
                self.spec.max_value()
            )));
        }
        let new_bits = u64_to_bits(value, self.spec.width_bits);
        self.commit(new_bits);
        Ok(())
    }

    /// 按位串设置字段，长度必须与字段宽度一致
    pub fn set_bits(&mut self, bits: &str) -> Result<(), TelegramError> {
        if bits.len() != self.spec.width_bits as usize {
            return Err(TelegramError::Range(format!(
                "Bit string of length {} does not fit field {} ({} bits)",
                bits.len(),
                self.spec.name,
                self.spec.width_bits
            )));
        }
        if let Some(bad) = bits.chars().find(|c| *c != '0' && *c != '1') {
            return Err(TelegramError::Parse(format!(
                "Invalid bit character {bad:?} for field {}",
                self.spec.name
            )));
        }
        if bits != self.value {
            self.commit(bits.to_string());
        }
        Ok(())
    }

    fn commit(&mut self, new_bits: String) {
        let event = ChangeEvent {
            field: self.spec.name.clone(),
            old_bits: std::mem::replace(&mut self.value, new_bits),
            new_bits: self.value.clone(),
        };
        for listener in &self.listeners {
            listener(&event);
        }
    }

    /// 当前值的显示标签，按字段种类计算
    pub fn label(&self) -> String {
        self.spec
            .kind
            .label_for(self.decimal_value(), self.spec.width_bits)
    }

    /// 订阅字段变更
    pub fn subscribe(&mut self, listener: ChangeListener) {
        self.listeners.push(listener);
    }
}

impl Clone for Field {
    /// 深拷贝：复制定义与当前值，监听器不随克隆传播
    fn clone(&self) -> Self {
        Self {
            spec: self.spec.clone(),
            value: self.value.clone(),
            listeners: Vec::new(),
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.spec.name)
            .field("width_bits", &self.spec.width_bits)
            .field("bits", &self.value)
            .finish()
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.spec == other.spec && self.value == other.value
    }
}

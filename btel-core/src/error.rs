//! 报文错误定义

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TelegramError {
    /// 数值或位串超出字段声明宽度
    Range(String),
    /// 校验和不匹配
    Checksum(String),
    /// 输入格式非法（非十六进制字符、长度不足等）
    MalformedInput(String),
    /// 模式定义缺陷（条件字段引用未声明的字段等）
    SchemaConsistency(String),
    /// 字段未找到
    FieldNotFound(String),
    /// 长度错误
    Length(String),
    /// 解析错误
    Parse(String),
}

impl fmt::Display for TelegramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelegramError::Range(msg) => write!(f, "Range error: {msg}"),
            TelegramError::Checksum(msg) => write!(f, "Checksum error: {msg}"),
            TelegramError::MalformedInput(msg) => write!(f, "Malformed input: {msg}"),
            TelegramError::SchemaConsistency(msg) => {
                write!(f, "Schema consistency error: {msg}")
            }
            TelegramError::FieldNotFound(msg) => write!(f, "Field not found: {msg}"),
            TelegramError::Length(msg) => write!(f, "Length error: {msg}"),
            TelegramError::Parse(msg) => write!(f, "Parse error: {msg}"),
        }
    }
}

impl std::error::Error for TelegramError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl From<String> for TelegramError {
    fn from(s: String) -> Self {
        TelegramError::Parse(s)
    }
}

impl From<&str> for TelegramError {
    fn from(s: &str) -> Self {
        TelegramError::Parse(s.to_string())
    }
}

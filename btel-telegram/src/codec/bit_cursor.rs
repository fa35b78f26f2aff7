//! 位游标
//!
//! 在位串上顺序消费指定宽度的片段，供数据包解码使用

use btel_core::TelegramError;

/// 位串读取游标
#[derive(Debug)]
pub struct BitCursor<'a> {
    bits: &'a str,
    pos: usize,
}

impl<'a> BitCursor<'a> {
    pub fn new(bits: &'a str) -> Self {
        Self { bits, pos: 0 }
    }

    /// 消费接下来的 n 位
    pub fn take(&mut self, n: usize) -> Result<&'a str, TelegramError> {
        if self.pos + n > self.bits.len() {
            return Err(TelegramError::Length(format!(
                "Insufficient data: need {n} bits at offset {}, only {} remain",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.bits[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// 预览接下来的 n 位，不移动游标
    pub fn peek(&self, n: usize) -> Option<&'a str> {
        if self.pos + n > self.bits.len() {
            None
        } else {
            Some(&self.bits[self.pos..self.pos + n])
        }
    }

    /// 跳过接下来的 n 位
    pub fn skip(&mut self, n: usize) -> Result<(), TelegramError> {
        self.take(n).map(|_| ())
    }

    /// 剩余位数
    pub fn remaining(&self) -> usize {
        self.bits.len() - self.pos
    }

    /// 当前偏移
    pub fn position(&self) -> usize {
        self.pos
    }
}

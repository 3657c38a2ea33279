//! # 时间戳
//!
//! SPL 时间戳以整数毫秒表示。字面量语法为 `[分:]秒[.小数]`，
//! 小数部分 0 到 3 位，按十进制小数缩放（`.5` 即 500 毫秒）。

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::SplError;

/// 输出时间戳时使用的小数精度。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Precision {
    /// 两位小数，`mm:ss.xx`
    #[default]
    Centisecond,
    /// 三位小数，`mm:ss.xxx`
    Millisecond,
}

impl Precision {
    /// 由小数位数推断精度，仅 2 位和 3 位有对应的精度。
    #[must_use]
    pub const fn from_fraction_digits(digits: usize) -> Option<Self> {
        match digits {
            2 => Some(Self::Centisecond),
            3 => Some(Self::Millisecond),
            _ => None,
        }
    }
}

/// 以毫秒为单位的非负时间点。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// 零点。
    pub const ZERO: Self = Self(0);

    /// 由毫秒数构造。
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// 返回毫秒数。
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// 解析一个不带括号的时间戳字面量，例如 `01:23.45`。
    ///
    /// # Errors
    ///
    /// 字面量不符合 `[分:]秒[.小数]` 语法、小数超过 3 位或数值溢出时，
    /// 返回 [`SplError::InvalidTimestampLiteral`]。
    pub fn parse_literal(text: &str) -> Result<Self, SplError> {
        let invalid = || SplError::InvalidTimestampLiteral(text.to_string());

        let (clock, fraction) = match text.split_once('.') {
            Some((clock, fraction)) => (clock, Some(fraction)),
            None => (text, None),
        };
        let (minutes, seconds) = match clock.split_once(':') {
            Some((minutes, seconds)) => (Some(minutes), seconds),
            None => (None, clock),
        };

        let minutes = match minutes {
            Some(m) => parse_digits(m).ok_or_else(invalid)?,
            None => 0,
        };
        let seconds = parse_digits(seconds).ok_or_else(invalid)?;
        let fraction_ms = match fraction {
            Some(f) if f.len() > 3 => return Err(invalid()),
            Some("") | None => 0,
            Some(f) => {
                let value = parse_digits(f).ok_or_else(invalid)?;
                value * 10u64.pow(3 - u32::try_from(f.len()).map_err(|_| invalid())?)
            }
        };

        minutes
            .checked_mul(60_000)
            .and_then(|ms| ms.checked_add(seconds.checked_mul(1000)?))
            .and_then(|ms| ms.checked_add(fraction_ms))
            .map(Self)
            .ok_or_else(invalid)
    }

    /// 按给定精度格式化为不带括号的字面量。
    ///
    /// 分钟至少补齐两位。厘秒精度会截断不足 10 毫秒的部分。
    #[must_use]
    pub fn format(self, precision: Precision) -> String {
        let millis = self.0 % 1000;
        let total_seconds = self.0 / 1000;
        let seconds = total_seconds % 60;
        let minutes = total_seconds / 60;
        match precision {
            Precision::Centisecond => format!("{minutes:02}:{seconds:02}.{:02}", millis / 10),
            Precision::Millisecond => format!("{minutes:02}:{seconds:02}.{millis:03}"),
        }
    }

    /// 该时间点能否在厘秒精度下无损表示。
    #[must_use]
    pub const fn is_centisecond_aligned(self) -> bool {
        self.0 % 10 == 0
    }

    /// 加上一个有符号的毫秒偏移，结果为负或溢出时返回 `None`。
    #[must_use]
    pub const fn checked_add_signed(self, delta_ms: i64) -> Option<Self> {
        match self.0.checked_add_signed(delta_ms) {
            Some(ms) => Some(Self(ms)),
            None => None,
        }
    }
}

fn parse_digits(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(Precision::Millisecond))
    }
}

impl FromStr for Timestamp {
    type Err = SplError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_literal(s)
    }
}

impl From<u64> for Timestamp {
    fn from(ms: u64) -> Self {
        Self(ms)
    }
}

//! Amount cell parsing.
//!
//! Text amounts may carry a currency marker, grouping separators and either
//! `.` or `,` as the decimal mark:
//!   $1,234.50   R$ 1.234,50   1 234,50   (12.00)   -5

use anyhow::Result;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use tally_core::SkipReason;

use crate::types::CellValue;

pub struct AmountParser {
    money_re: Regex,
}

impl AmountParser {
    pub fn new() -> Result<Self> {
        let money_re = Regex::new(concat!(
            r"^(?P<lead>-)?(?:R\$|US\$|\$|€|£|EUR|USD|BRL)?",
            r"(?P<sign>-)?(?P<num>\d[\d.,]*)$"
        ))?;
        Ok(Self { money_re })
    }

    /// Coerce a cell into a non-negative amount
    pub fn parse_cell(&self, cell: &CellValue) -> Result<Decimal, SkipReason> {
        let value = match cell {
            CellValue::Empty => return Err(SkipReason::MissingAmount),
            CellValue::Int(i) => Decimal::from(*i),
            CellValue::Float(f) => float_to_decimal(*f)?,
            CellValue::Text(s) => self.parse_text(s)?,
            CellValue::Bool(_) | CellValue::Date(_) | CellValue::DateTime(_) => {
                return Err(SkipReason::InvalidAmount);
            }
        };
        non_negative(value)
    }

    /// Parse amount text; sign is preserved so callers can tell negative from garbage
    pub fn parse_text(&self, raw: &str) -> Result<Decimal, SkipReason> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
            .collect();
        if compact.is_empty() {
            return Err(SkipReason::MissingAmount);
        }

        // Accounting style: (12.00) means -12.00
        let (compact, parenthesized) = match compact
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
        {
            Some(inner) => (inner.to_string(), true),
            None => (compact, false),
        };

        let caps = self
            .money_re
            .captures(&compact)
            .ok_or(SkipReason::InvalidAmount)?;
        let negative =
            parenthesized || caps.name("lead").is_some() || caps.name("sign").is_some();

        let canonical = canonical_number(&caps["num"]).ok_or(SkipReason::InvalidAmount)?;
        let value = Decimal::from_str(&canonical).map_err(|_| SkipReason::InvalidAmount)?;
        Ok(if negative { -value } else { value })
    }
}

/// Rewrite grouped digits into `1234.56` form
fn canonical_number(num: &str) -> Option<String> {
    let commas = num.matches(',').count();
    let dots = num.matches('.').count();

    let decimal_mark = match (commas, dots) {
        (0, 0) => None,
        (_, 0) if commas > 1 => None,
        (1, 0) => (!lone_separator_groups(num, ',')).then_some(','),
        (0, _) if dots > 1 => None,
        (0, 1) => (!lone_separator_groups(num, '.')).then_some('.'),
        _ => {
            let last_comma = num.rfind(',')?;
            let last_dot = num.rfind('.')?;
            Some(if last_comma > last_dot { ',' } else { '.' })
        }
    };

    let mut out = String::with_capacity(num.len());
    let mut seen_mark = false;
    for (i, ch) in num.char_indices() {
        match ch {
            '0'..='9' => out.push(ch),
            ',' | '.' if Some(ch) == decimal_mark && num[i + 1..].find(ch).is_none() => {
                if seen_mark {
                    return None;
                }
                seen_mark = true;
                out.push('.');
            }
            ',' | '.' => {
                // grouping separators sit between a digit and a group of three
                let rest = &num[i + 1..];
                let full_group = rest.len() >= 3
                    && rest.as_bytes()[..3].iter().all(u8::is_ascii_digit)
                    && rest[3..].chars().next().is_none_or(|c| c == ',' || c == '.');
                if seen_mark || i == 0 || !full_group {
                    return None;
                }
            }
            _ => return None,
        }
    }
    if out.ends_with('.') {
        return None;
    }
    Some(out)
}

/// A single `,` or `.` followed by exactly three digits groups thousands
/// ("1.500", "1,500"), unless the digits before it cannot be a leading group
/// ("0.125", "1234.567").
fn lone_separator_groups(num: &str, sep: char) -> bool {
    match num.split_once(sep) {
        Some((int, frac)) => frac.len() == 3 && (1..=3).contains(&int.len()) && int != "0",
        None => false,
    }
}

/// Floats go through their shortest round-trip text form so that 49.9
/// becomes exactly 49.9 rather than its binary expansion.
pub(crate) fn float_to_decimal(f: f64) -> Result<Decimal, SkipReason> {
    if !f.is_finite() {
        return Err(SkipReason::InvalidAmount);
    }
    Decimal::from_str(&f.to_string()).map_err(|_| SkipReason::InvalidAmount)
}

fn non_negative(value: Decimal) -> Result<Decimal, SkipReason> {
    if value.is_sign_negative() && !value.is_zero() {
        Err(SkipReason::NegativeAmount)
    } else {
        Ok(value)
    }
}

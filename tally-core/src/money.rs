//! Locale-aware amount formatting ("1,234.56", "1.234,56", ...)

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator convention used when printing amounts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberLocale {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "de")]
    De,
}

impl NumberLocale {
    pub fn thousands_separator(&self) -> char {
        match self {
            NumberLocale::En => ',',
            NumberLocale::PtBr | NumberLocale::De => '.',
        }
    }

    pub fn decimal_separator(&self) -> char {
        match self {
            NumberLocale::En => '.',
            NumberLocale::PtBr | NumberLocale::De => ',',
        }
    }
}

impl FromStr for NumberLocale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "en-gb" => Ok(NumberLocale::En),
            "pt" | "pt-br" => Ok(NumberLocale::PtBr),
            "de" | "de-de" => Ok(NumberLocale::De),
            other => Err(format!("unsupported locale: {other} (expected en, pt-BR, de)")),
        }
    }
}

impl fmt::Display for NumberLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NumberLocale::En => "en",
            NumberLocale::PtBr => "pt-BR",
            NumberLocale::De => "de",
        })
    }
}

/// Fixed-precision, grouped number formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberFormat {
    pub locale: NumberLocale,
    pub precision: u32,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            locale: NumberLocale::En,
            precision: 2,
        }
    }
}

impl NumberFormat {
    pub fn new(locale: NumberLocale, precision: u32) -> Self {
        Self { locale, precision }
    }

    /// Format with the configured precision
    pub fn amount(&self, value: Decimal) -> String {
        self.with_precision(value, self.precision)
    }

    /// Format a chart axis tick: whole numbers stay whole
    pub fn axis(&self, value: f64) -> String {
        let value = Decimal::try_from(value).unwrap_or(Decimal::ZERO);
        let precision = if value.fract().is_zero() { 0 } else { self.precision };
        self.with_precision(value, precision)
    }

    pub fn with_precision(&self, value: Decimal, precision: u32) -> String {
        let rounded = value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);
        let plain = format!("{:.*}", precision as usize, rounded.abs());
        let (int_part, frac_part) = match plain.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (plain.as_str(), None),
        };

        let mut out = String::with_capacity(plain.len() + plain.len() / 3 + 1);
        if rounded.is_sign_negative() && !rounded.is_zero() {
            out.push('-');
        }
        let digits = int_part.len();
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (digits - i) % 3 == 0 {
                out.push(self.locale.thousands_separator());
            }
            out.push(ch);
        }
        if let Some(frac) = frac_part {
            out.push(self.locale.decimal_separator());
            out.push_str(frac);
        }
        out
    }
}

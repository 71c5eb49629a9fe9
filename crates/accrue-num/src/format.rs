//! Text conversion: lossless `Display`/`FromStr`, serde support, and the
//! human-facing formatters used by game displays.
//!
//! The lossless form is either a plain decimal (`"123"`, `"0.5"`) when the
//! value is exactly representable that way, or `"<mantissa>e<exponent>"`
//! (`"1.5e300"`, `"-4.2e-9"`). `"Infinity"`, `"-Infinity"` and `"NaN"` cover
//! the sentinels.
//!
//! # Example
//!
//! ```
//! use accrue_num::BigNum;
//!
//! assert_eq!(BigNum::from(1234567).format(2), "1,234,567");
//! assert_eq!(BigNum::from_parts(1.5, 12.0).format(2), "1.50e12");
//! assert_eq!(BigNum::from(3.14159).format(2), "3.14");
//! assert_eq!(BigNum::from(4.6).format_whole(), "5");
//! assert_eq!(BigNum::from(3725.0).format_time(), "1h 2m 5s");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{BigNum, ParseBigNumError};

/// Exponent at and above which [`BigNum::format`] switches to scientific
/// notation.
pub const SCIENTIFIC_THRESHOLD: f64 = 9.0;

/// Exponent at and above which the mantissa is dropped entirely.
const MANTISSA_HIDDEN_THRESHOLD: f64 = 10_000.0;

// ---------------------------------------------------------------------------
// Lossless text form
// ---------------------------------------------------------------------------

impl fmt::Display for BigNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nan() {
            return f.write_str("NaN");
        }
        if self.is_infinite() {
            return f.write_str(if self.is_positive() {
                "Infinity"
            } else {
                "-Infinity"
            });
        }
        if self.is_zero() {
            return f.write_str("0");
        }

        if self.exponent > -7.0 && self.exponent < 21.0 {
            let plain = self.to_f64();
            if BigNum::from(plain) == *self {
                return write!(f, "{plain}");
            }
        }
        if self.exponent.abs() < 1e16 {
            write!(f, "{}e{}", self.mantissa, self.exponent as i64)
        } else {
            write!(f, "{}e{:e}", self.mantissa, self.exponent)
        }
    }
}

impl FromStr for BigNum {
    type Err = ParseBigNumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseBigNumError::Empty);
        }
        let invalid = || ParseBigNumError::Invalid {
            input: trimmed.to_string(),
        };

        match trimmed.to_ascii_lowercase().as_str() {
            "nan" => return Ok(BigNum::NAN),
            "infinity" | "+infinity" | "inf" => return Ok(BigNum::INFINITY),
            "-infinity" | "-inf" => return Ok(BigNum::NEG_INFINITY),
            _ => {}
        }

        match trimmed.find(['e', 'E']) {
            Some(split) => {
                let mantissa: f64 = trimmed[..split].parse().map_err(|_| invalid())?;
                let exponent: f64 = trimmed[split + 1..].parse().map_err(|_| invalid())?;
                if !mantissa.is_finite() || exponent.is_nan() {
                    return Err(invalid());
                }
                Ok(BigNum::from_parts(mantissa, exponent))
            }
            None => {
                let value: f64 = trimmed.parse().map_err(|_| invalid())?;
                Ok(BigNum::from(value))
            }
        }
    }
}

impl Serialize for BigNum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct BigNumVisitor;

impl<'de> Visitor<'de> for BigNumVisitor {
    type Value = BigNum;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a big number as a decimal string or a number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<BigNum, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<BigNum, E> {
        Ok(BigNum::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<BigNum, E> {
        Ok(BigNum::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<BigNum, E> {
        Ok(BigNum::from(v))
    }
}

impl<'de> Deserialize<'de> for BigNum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(BigNumVisitor)
    }
}

// ---------------------------------------------------------------------------
// Display formatters
// ---------------------------------------------------------------------------

impl BigNum {
    /// Human-readable form with `precision` decimals.
    ///
    /// - below `1e3`: fixed decimals (`"3.14"`)
    /// - below `1e9`: whole number with thousands separators (`"12,345"`)
    /// - below `1e10000`: scientific (`"1.50e12"`)
    /// - beyond: exponent only (`"e12,345"`)
    pub fn format(self, precision: usize) -> String {
        if self.is_nan() {
            return "NaN".to_string();
        }
        if self.is_negative() {
            return format!("-{}", (-self).format(precision));
        }
        if self.is_infinite() {
            return "Infinity".to_string();
        }
        if self.is_zero() {
            return format!("{:.precision$}", 0.0);
        }

        if self.exponent >= MANTISSA_HIDDEN_THRESHOLD {
            return format!("e{}", comma_separated(self.exponent));
        }
        if self.exponent >= SCIENTIFIC_THRESHOLD {
            return scientific(self.mantissa, self.exponent, precision);
        }
        if self.exponent >= 3.0 {
            return comma_separated(self.to_f64().floor());
        }
        if self.exponent >= -3.0 {
            return format!("{:.precision$}", self.to_f64());
        }
        scientific(self.mantissa, self.exponent, precision)
    }

    /// Whole-number display: no decimals unless the value is large or a
    /// non-zero fraction below one.
    pub fn format_whole(self) -> String {
        if self.is_finite() && !self.is_zero() && self.abs() < BigNum::from(0.99) {
            return self.format(2);
        }
        if self.exponent >= SCIENTIFIC_THRESHOLD {
            return self.format(2);
        }
        self.format(0)
    }

    /// Treat the value as seconds and render it as `"1d 2h 3m 4s"`, omitting
    /// leading zero units.
    pub fn format_time(self) -> String {
        let seconds = self.to_f64();
        if !seconds.is_finite() {
            return format!("{}s", self.format(2));
        }
        let sign = if seconds < 0.0 { "-" } else { "" };
        let seconds = seconds.abs();

        let days = (seconds / 86_400.0).floor();
        let hours = ((seconds % 86_400.0) / 3_600.0).floor();
        let minutes = ((seconds % 3_600.0) / 60.0).floor();
        let secs = seconds % 60.0;

        let secs = if seconds < 60.0 {
            BigNum::from(secs).format(2)
        } else {
            BigNum::from(secs).format_whole()
        };
        let body = if days > 0.0 {
            format!(
                "{}d {}h {}m {}s",
                BigNum::from(days).format_whole(),
                hours,
                minutes,
                secs
            )
        } else if hours > 0.0 {
            format!("{hours}h {minutes}m {secs}s")
        } else if minutes > 0.0 {
            format!("{minutes}m {secs}s")
        } else {
            format!("{secs}s")
        };
        format!("{sign}{body}")
    }
}

fn scientific(mantissa: f64, exponent: f64, precision: usize) -> String {
    let scale = 10f64.powi(precision as i32);
    let mut m = (mantissa * scale).round() / scale;
    let mut e = exponent;
    if m.abs() >= 10.0 {
        m /= 10.0;
        e += 1.0;
    }
    let exp_text = if e.abs() >= 1_000.0 {
        comma_separated(e.abs())
    } else {
        format!("{}", e.abs())
    };
    let exp_sign = if e < 0.0 { "-" } else { "" };
    format!("{m:.precision$}e{exp_sign}{exp_text}")
}

/// Render a whole non-negative number with `,` thousands separators.
fn comma_separated(value: f64) -> String {
    let digits = format!("{:.0}", value.floor());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Human-readable duration strings
//!
//! Accepts the compact `1h30m` / `250ms` / `1.5h` style used in the relay's
//! environment variables and cache requests. A bare `0` is accepted; every
//! other component needs a unit.

use crate::error::{RelayError, Result};
use std::time::Duration;

const NANOS_PER_UNIT: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 3_600 * 1_000_000_000),
];

/// Parse a signed duration such as `"-1m"` or `"2h45m"`
pub fn parse_duration(input: &str) -> Result<chrono::Duration> {
    let invalid = |why: &str| RelayError::ConfigError(format!("invalid duration {:?}: {}", input, why));

    let (negative, mut rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    if rest == "0" {
        return Ok(chrono::Duration::zero());
    }
    if rest.is_empty() {
        return Err(invalid("empty"));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_digits, after_int) = rest.split_at(int_len);

        let (frac_digits, after_number) = match after_int.strip_prefix('.') {
            Some(tail) => {
                let frac_len = tail.bytes().take_while(u8::is_ascii_digit).count();
                tail.split_at(frac_len)
            }
            None => ("", after_int),
        };

        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(invalid("expected a number"));
        }

        let unit_len = after_number
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after_number.len());
        let (unit, tail) = after_number.split_at(unit_len);
        if unit.is_empty() {
            return Err(invalid("missing unit"));
        }
        let scale = NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, nanos)| *nanos)
            .ok_or_else(|| invalid(&format!("unknown unit {:?}", unit)))?;

        let whole: u128 = if int_digits.is_empty() {
            0
        } else {
            int_digits.parse().map_err(|_| invalid("number out of range"))?
        };
        let mut component = whole
            .checked_mul(scale)
            .ok_or_else(|| invalid("number out of range"))?;

        if !frac_digits.is_empty() {
            // Digits past nanosecond precision of an hour cannot change the result.
            let kept = &frac_digits[..frac_digits.len().min(18)];
            let numerator: u128 = kept.parse().map_err(|_| invalid("number out of range"))?;
            let denominator = 10u128.pow(kept.len() as u32);
            component += numerator * scale / denominator;
        }

        total = total
            .checked_add(component)
            .ok_or_else(|| invalid("number out of range"))?;
        rest = tail;
    }

    let nanos = i64::try_from(total).map_err(|_| invalid("number out of range"))?;
    let nanos = if negative { -nanos } else { nanos };
    Ok(chrono::Duration::nanoseconds(nanos))
}

/// Parse a duration that must be strictly positive
///
/// `what` names the value in the error message, e.g. `"TTL"`.
pub fn parse_positive_duration(what: &str, input: &str) -> Result<Duration> {
    let parsed = parse_duration(input)
        .map_err(|e| RelayError::ConfigError(format!("invalid {} format: {}", what, e)))?;

    if parsed <= chrono::Duration::zero() {
        return Err(RelayError::ConfigError(format!(
            "{} must be greater than zero, got {:?}",
            what, input
        )));
    }

    parsed
        .to_std()
        .map_err(|e| RelayError::ConfigError(format!("invalid {}: {}", what, e)))
}

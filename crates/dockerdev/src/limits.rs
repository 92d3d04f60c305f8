//! Container resource limits.

use crate::config::ResourceLimits;
use crate::error::ParseError;

/// Parsed limits, in the units the engine expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limits {
    /// Bytes.
    pub memory: Option<i64>,
    pub cpu_shares: Option<i64>,
}

impl Limits {
    pub fn from_config(limits: &ResourceLimits) -> Result<Self, ParseError> {
        let memory = limits.memory.as_deref().map(parse_human_size).transpose()?;
        let cpu_shares = limits
            .cpu
            .as_deref()
            .map(|cpu| {
                cpu.trim()
                    .parse::<i64>()
                    .map_err(|_| ParseError::InvalidCpu(cpu.to_string()))
            })
            .transpose()?;
        Ok(Self { memory, cpu_shares })
    }
}

/// Parses a human-readable size with decimal (SI) multipliers: `"512MB"`,
/// `"1.5g"`, `"64 kb"`, `"1024"`. Case-insensitive; a trailing `b` is optional.
pub fn parse_human_size(value: &str) -> Result<i64, ParseError> {
    let invalid = |reason: &str| ParseError::InvalidMemory {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, suffix) = trimmed.split_at(split);
    if number.is_empty() {
        return Err(invalid("missing number"));
    }

    let number: f64 = number.parse().map_err(|_| invalid("malformed number"))?;
    let multiplier: f64 = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1.0,
        "k" | "kb" => 1e3,
        "m" | "mb" => 1e6,
        "g" | "gb" => 1e9,
        "t" | "tb" => 1e12,
        "p" | "pb" => 1e15,
        _ => return Err(invalid("unknown unit")),
    };

    let bytes = number * multiplier;
    if !bytes.is_finite() || bytes > i64::MAX as f64 {
        return Err(invalid("size out of range"));
    }
    Ok(bytes as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_sizes() {
        assert_eq!(parse_human_size("1024"), Ok(1024));
        assert_eq!(parse_human_size("512MB"), Ok(512_000_000));
        assert_eq!(parse_human_size("1.5g"), Ok(1_500_000_000));
        assert_eq!(parse_human_size("64 kb"), Ok(64_000));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_human_size("lots").is_err());
        assert!(parse_human_size("12 parsecs").is_err());
        assert!(parse_human_size("1.2.3m").is_err());
    }

    #[test]
    fn rejects_sizes_beyond_i64() {
        let err = parse_human_size("99999999999pb").unwrap_err();
        assert!(matches!(err, ParseError::InvalidMemory { ref reason, .. } if reason == "size out of range"));
        assert_eq!(parse_human_size("9pb"), Ok(9_000_000_000_000_000));
    }

    #[test]
    fn limits_from_config() {
        let limits = Limits::from_config(&ResourceLimits {
            memory: Some("256mb".into()),
            cpu: Some("512".into()),
        })
        .unwrap();
        assert_eq!(limits.memory, Some(256_000_000));
        assert_eq!(limits.cpu_shares, Some(512));

        let err = Limits::from_config(&ResourceLimits {
            memory: None,
            cpu: Some("half".into()),
        })
        .unwrap_err();
        assert_eq!(err, ParseError::InvalidCpu("half".into()));
    }
}

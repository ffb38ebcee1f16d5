use std::io;
use std::process::Command;

#[derive(Debug)]
pub enum ConfigError {
    /// Couldn't parse string as number
    NumberParseError(String, std::num::ParseIntError),

    /// Number parsed, but does not fit the field it is meant for
    OutOfRange(String, u32),

    /// Generic IO Error
    IoError(io::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NumberParseError(s, e) => write!(f, "unable to parse \"{}\": {}", s, e),
            ConfigError::OutOfRange(s, max) => write!(f, "\"{}\" is larger than {:#x}", s, max),
            ConfigError::IoError(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl std::convert::From<io::Error> for ConfigError {
    fn from(e: io::Error) -> ConfigError { ConfigError::IoError(e) }
}

pub fn get_base(value: &str) -> (&str, u32) {
    if value.starts_with("0x") {
        (value.trim_start_matches("0x"), 16)
    } else if value.starts_with("0X") {
        (value.trim_start_matches("0X"), 16)
    } else if value.starts_with("0b") {
        (value.trim_start_matches("0b"), 2)
    } else if value.starts_with("0B") {
        (value.trim_start_matches("0B"), 2)
    } else if value.starts_with('0') && value != "0" {
        (value.trim_start_matches('0'), 8)
    } else {
        (value, 10)
    }
}

pub fn parse_u32(value: &str) -> Result<u32, ConfigError> {
    let (value, base) = get_base(value);
    u32::from_str_radix(value, base).map_err(|e| ConfigError::NumberParseError(value.to_owned(), e))
}

/// USB ids, release numbers and addresses are all 16 bits wide.
pub fn parse_u16(value: &str) -> Result<u16, ConfigError> {
    let parsed = parse_u32(value)?;
    if parsed > u16::MAX as u32 {
        return Err(ConfigError::OutOfRange(value.to_owned(), u16::MAX as u32));
    }
    Ok(parsed as u16)
}

/// `git describe` of the working directory, if there is one. The serial number string is
/// built from it.
pub fn git_describe() -> Option<String> {
    let output = Command::new("git").args(["describe", "--dirty", "--long", "--always"]).output().ok()?;
    if !output.status.success() {
        log::debug!("git describe failed: {}", String::from_utf8_lossy(&output.stderr).trim());
        return None;
    }
    let describe = String::from_utf8(output.stdout).ok()?;
    let describe = describe.trim();
    if describe.is_empty() { None } else { Some(describe.to_owned()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_select_the_base() {
        assert_eq!(parse_u32("0x403").unwrap(), 0x403);
        assert_eq!(parse_u32("0X6010").unwrap(), 0x6010);
        assert_eq!(parse_u32("0b101").unwrap(), 5);
        assert_eq!(parse_u32("0755").unwrap(), 0o755);
        assert_eq!(parse_u32("0").unwrap(), 0);
        assert_eq!(parse_u32("1027").unwrap(), 1027);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(matches!(parse_u32("0xfoo"), Err(ConfigError::NumberParseError(_, _))));
        assert!(matches!(parse_u32(""), Err(ConfigError::NumberParseError(_, _))));
    }

    #[test]
    fn sixteen_bit_fields_are_range_checked() {
        assert_eq!(parse_u16("0x3e00").unwrap(), 0x3E00);
        assert_eq!(parse_u16("65535").unwrap(), u16::MAX);
        assert!(matches!(parse_u16("0x10000"), Err(ConfigError::OutOfRange(_, 0xFFFF))));
    }
}

//! The string table: LANGID list at index 0, then the configured strings, with the serial
//! number always last.

use std::fmt;

use crate::ch9;
use crate::descriptor::{Descriptor, StringDescriptor};
use crate::Error;

/// Fixed prefix of every serial number; the firmware revision is appended to it.
pub const SERIAL_PREFIX: &str = "0123456789abcdef ";

/// Revision captured by the build script.
pub const GIT_DESCRIBE: &str = env!("FTDI_DESCRIPTORS_GIT_DESCRIBE");

pub const DEFAULT_MANUFACTURER: &str = "Open Hardware";
pub const DEFAULT_PRODUCT: &str = "Dual Channel Bulk Bridge";

pub fn serial_number(git_describe: &str) -> String { format!("{}{}", SERIAL_PREFIX, git_describe.trim()) }

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringTable {
    language: u16,
    strings: Vec<String>,
}

impl fmt::Display for StringTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "String table ({} entries):", self.len())?;
        writeln!(f, "    0: LANGID {:#06x}", self.language)?;
        for (index, s) in self.strings.iter().enumerate() {
            writeln!(f, "    {}: \"{}\"", index + 1, s)?;
        }
        Ok(())
    }
}

impl StringTable {
    /// `strings` become indices 1.., then `serial` is appended after them.
    pub fn new<S: AsRef<str>>(strings: &[S], serial: &str) -> Result<StringTable, Error> {
        let mut all: Vec<String> = strings.iter().map(|s| s.as_ref().trim().to_owned()).collect();
        all.push(serial.to_owned());
        // Index 0 is the LANGID list, so indices 1..=255 are all there is.
        if all.len() > u8::MAX as usize {
            return Err(Error::TooManyStrings(all.len()));
        }
        for (index, s) in all.iter().enumerate() {
            let units = s.encode_utf16().count();
            if units > ch9::STRING_MAX_UNITS {
                return Err(Error::StringTooLong { index: index + 1, units });
            }
        }
        Ok(StringTable { language: ch9::LANGID_ENGLISH_US, strings: all })
    }

    /// Manufacturer and product defaults, serial number from the build-time revision.
    pub fn with_defaults() -> Result<StringTable, Error> {
        StringTable::new(&[DEFAULT_MANUFACTURER, DEFAULT_PRODUCT], &serial_number(GIT_DESCRIBE))
    }

    pub fn language(&self) -> u16 { self.language }

    /// Number of string descriptors, counting the LANGID descriptor at index 0.
    pub fn len(&self) -> usize { self.strings.len() + 1 }

    pub fn is_empty(&self) -> bool { false }

    /// Index of the serial number string.
    pub fn serial_index(&self) -> u8 { self.strings.len() as u8 }

    pub fn get(&self, index: u8) -> Option<&str> {
        match index {
            0 => None,
            n => self.strings.get(n as usize - 1).map(|s| s.as_str()),
        }
    }

    /// Index zero is the LANGID list. Nonzero indices resolve to text.
    pub fn contains(&self, index: u8) -> bool { (index as usize) < self.len() }

    pub fn descriptor(&self, index: u8) -> Option<StringDescriptor> {
        match index {
            0 => Some(StringDescriptor::Languages(vec![self.language])),
            n => self.get(n).map(|s| StringDescriptor::Text(s.to_owned())),
        }
    }

    /// All descriptors in index order, as they are laid out in the table.
    pub fn descriptors(&self) -> impl Iterator<Item = StringDescriptor> + '_ {
        (0..self.len()).filter_map(move |index| self.descriptor(index as u8))
    }

    /// Total bytes the string block occupies.
    pub fn byte_len(&self) -> usize { self.descriptors().map(|d| d.length()).sum() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_is_appended_last() {
        let table = StringTable::new(&["Maker", "Widget"], &serial_number("v1.0-3-gabcdef0")).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(1), Some("Maker"));
        assert_eq!(table.get(2), Some("Widget"));
        assert_eq!(table.get(3), Some("0123456789abcdef v1.0-3-gabcdef0"));
        assert_eq!(table.serial_index(), 3);
        assert_eq!(table.get(4), None);
        assert!(table.contains(3));
        assert!(!table.contains(4));
    }

    #[test]
    fn index_zero_is_languages() {
        let table = StringTable::new(&["A"], "S").unwrap();
        assert_eq!(table.get(0), None);
        assert_eq!(table.descriptor(0), Some(StringDescriptor::Languages(vec![0x0409])));
        // 4 + (2 + 2) + (2 + 2)
        assert_eq!(table.byte_len(), 12);
    }

    #[test]
    fn input_lines_are_trimmed() {
        let table = StringTable::new(&["  Maker \n"], "S").unwrap();
        assert_eq!(table.get(1), Some("Maker"));
    }

    #[test]
    fn long_strings_are_refused() {
        let long = "y".repeat(127);
        assert!(matches!(
            StringTable::new(&[long.as_str()], "S"),
            Err(Error::StringTooLong { index: 1, units: 127 })
        ));
        assert!(StringTable::new(&["y".repeat(126)], "S").is_ok());
    }

    #[test]
    fn string_indices_stop_at_255() {
        let fits = vec![""; 254];
        let table = StringTable::new(&fits[..], "S").unwrap();
        assert_eq!(table.serial_index(), 255);
        assert_eq!(table.descriptors().count(), 256);
        assert_eq!(table.descriptors().filter(|d| matches!(d, StringDescriptor::Languages(_))).count(), 1);

        let too_many = vec![""; 300];
        assert!(matches!(StringTable::new(&too_many[..], "S"), Err(Error::TooManyStrings(301))));
    }

    #[test]
    fn defaults_resolve() {
        let table = StringTable::with_defaults().unwrap();
        assert_eq!(table.get(1), Some(DEFAULT_MANUFACTURER));
        assert!(table.get(3).unwrap().starts_with(SERIAL_PREFIX));
    }
}

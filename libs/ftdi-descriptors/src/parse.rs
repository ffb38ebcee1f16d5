//! A plain chapter 9 reader: walks descriptors by bLength, the way a host does, without
//! knowing anything about how the bytes were produced.

use std::fmt;

use crate::ch9;
use crate::descriptor::{
    ConfigurationDescriptor, DeviceDescriptor, EndpointDescriptor, InterfaceDescriptor, QualifierDescriptor,
    StringDescriptor,
};
use crate::table::{Block, Region};
use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedDescriptor {
    Device(DeviceDescriptor),
    Configuration(ConfigurationDescriptor),
    Interface(InterfaceDescriptor),
    Endpoint(EndpointDescriptor),
    Qualifier(QualifierDescriptor),
    String(StringDescriptor),
    Unknown { descriptor_type: u8, length: usize },
}

impl fmt::Display for ParsedDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedDescriptor::Device(d) => write!(f, "{}", d),
            ParsedDescriptor::Configuration(d) => write!(f, "{}", d),
            ParsedDescriptor::Interface(d) => write!(f, "{}", d),
            ParsedDescriptor::Endpoint(d) => write!(f, "{}", d),
            ParsedDescriptor::Qualifier(d) => write!(f, "{}", d),
            ParsedDescriptor::String(d) => write!(f, "String Descriptor: {}", d),
            ParsedDescriptor::Unknown { descriptor_type, length } => {
                writeln!(f, "Unknown descriptor type {:#04x} ({} bytes)", descriptor_type, length)
            }
        }
    }
}

/// Offsets in errors are relative to the start of whatever the caller handed in, so make
/// them absolute.
fn at(offset: usize, e: Error) -> Error {
    match e {
        Error::Truncated { offset: o, needed, available } => Error::Truncated { offset: offset + o, needed, available },
        Error::BadString { offset: o } => Error::BadString { offset: offset + o },
        other => other,
    }
}

/// Yields `(offset, descriptor)` for each descriptor in a byte run. The first string
/// descriptor seen is taken to be the LANGID list, as it is when a string table is walked
/// from index 0. Stops after the first error.
pub struct DescriptorIter<'a> {
    bytes: &'a [u8],
    offset: usize,
    base: usize,
    seen_string: bool,
}

impl<'a> DescriptorIter<'a> {
    pub fn new(bytes: &'a [u8]) -> DescriptorIter<'a> { DescriptorIter::with_base(bytes, 0) }

    /// `base` is added to reported offsets.
    pub fn with_base(bytes: &'a [u8], base: usize) -> DescriptorIter<'a> {
        DescriptorIter { bytes, offset: 0, base, seen_string: false }
    }

    pub fn offset(&self) -> usize { self.base + self.offset }

    fn parse_one(&mut self) -> Result<(usize, ParsedDescriptor), Error> {
        let rest = &self.bytes[self.offset..];
        let offset = self.base + self.offset;
        if rest.len() < 2 {
            return Err(Error::Truncated { offset, needed: 2, available: rest.len() });
        }
        let length = rest[0] as usize;
        let descriptor_type = rest[1];
        if length < 2 {
            return Err(Error::BadLength {
                descriptor_type,
                expected: ch9::fixed_length(descriptor_type).unwrap_or(2),
                found: length,
            });
        }
        if length > rest.len() {
            return Err(Error::Truncated { offset, needed: length, available: rest.len() });
        }
        let raw = &rest[..length];
        let parsed = match descriptor_type {
            ch9::DEVICE => DeviceDescriptor::from_bytes(raw).map(ParsedDescriptor::Device),
            ch9::CONFIGURATION => ConfigurationDescriptor::from_bytes(raw).map(ParsedDescriptor::Configuration),
            ch9::INTERFACE => InterfaceDescriptor::from_bytes(raw).map(ParsedDescriptor::Interface),
            ch9::ENDPOINT => EndpointDescriptor::from_bytes(raw).map(ParsedDescriptor::Endpoint),
            ch9::DEVICE_QUALIFIER => QualifierDescriptor::from_bytes(raw).map(ParsedDescriptor::Qualifier),
            ch9::STRING => {
                let languages = !self.seen_string;
                self.seen_string = true;
                StringDescriptor::from_bytes(raw, languages).map(ParsedDescriptor::String)
            }
            _ => Ok(ParsedDescriptor::Unknown { descriptor_type, length }),
        }
        .map_err(|e| at(offset, e))?;
        self.offset += length;
        Ok((offset, parsed))
    }
}

impl<'a> Iterator for DescriptorIter<'a> {
    type Item = Result<(usize, ParsedDescriptor), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.bytes.len() {
            return None;
        }
        let result = self.parse_one();
        if result.is_err() {
            self.offset = self.bytes.len();
        }
        Some(result)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceTree {
    pub interface: InterfaceDescriptor,
    pub endpoints: Vec<EndpointDescriptor>,
}

/// A configuration descriptor with everything nested under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationTree {
    pub configuration: ConfigurationDescriptor,
    pub interfaces: Vec<InterfaceTree>,
}

impl fmt::Display for ConfigurationTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.configuration)?;
        for interface in &self.interfaces {
            write!(f, "{}", interface.interface)?;
            for endpoint in &interface.endpoints {
                write!(f, "{}", endpoint)?;
            }
        }
        Ok(())
    }
}

impl ConfigurationTree {
    /// Parses exactly one configuration block. The block must be as long as wTotalLength
    /// says, and every byte of it must belong to a descriptor.
    pub fn parse(block: &[u8]) -> Result<ConfigurationTree, Error> { ConfigurationTree::parse_at(block, 0) }

    fn parse_at(block: &[u8], base: usize) -> Result<ConfigurationTree, Error> {
        let mut iter = DescriptorIter::with_base(block, base);
        let configuration = match iter.next() {
            Some(Ok((_, ParsedDescriptor::Configuration(c)))) => c,
            Some(Ok((_, other))) => {
                return Err(Error::UnexpectedType { expected: ch9::CONFIGURATION, found: type_of(&other) });
            }
            Some(Err(e)) => return Err(e),
            None => return Err(Error::Truncated { offset: base, needed: ch9::CONFIGURATION_SIZE, available: 0 }),
        };
        if configuration.total_length as usize != block.len() {
            return Err(Error::TotalLengthMismatch {
                declared: configuration.total_length as usize,
                actual: block.len(),
            });
        }

        let mut interfaces: Vec<InterfaceTree> = Vec::new();
        for item in iter {
            match item? {
                (_, ParsedDescriptor::Interface(interface)) => {
                    interfaces.push(InterfaceTree { interface, endpoints: Vec::new() })
                }
                (_, ParsedDescriptor::Endpoint(endpoint)) => match interfaces.last_mut() {
                    Some(tree) => tree.endpoints.push(endpoint),
                    None => return Err(Error::UnexpectedType { expected: ch9::INTERFACE, found: ch9::ENDPOINT }),
                },
                (_, other) => {
                    return Err(Error::UnexpectedType { expected: ch9::INTERFACE, found: type_of(&other) });
                }
            }
        }
        Ok(ConfigurationTree { configuration, interfaces })
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        self.interfaces.iter().flat_map(|tree| tree.endpoints.iter())
    }

    /// What wTotalLength ought to be for this tree, counted from the descriptors themselves.
    pub fn expected_total_length(&self) -> usize {
        ch9::CONFIGURATION_SIZE
            + self
                .interfaces
                .iter()
                .map(|tree| ch9::INTERFACE_SIZE + ch9::ENDPOINT_SIZE * tree.endpoints.len())
                .sum::<usize>()
    }
}

fn take(bytes: &[u8], offset: usize, length: usize) -> Result<&[u8], Error> {
    bytes.get(offset..offset + length).ok_or(Error::Truncated {
        offset,
        needed: length,
        available: bytes.len().saturating_sub(offset),
    })
}

fn type_of(descriptor: &ParsedDescriptor) -> u8 {
    match descriptor {
        ParsedDescriptor::Device(_) => ch9::DEVICE,
        ParsedDescriptor::Configuration(_) => ch9::CONFIGURATION,
        ParsedDescriptor::Interface(_) => ch9::INTERFACE,
        ParsedDescriptor::Endpoint(_) => ch9::ENDPOINT,
        ParsedDescriptor::Qualifier(_) => ch9::DEVICE_QUALIFIER,
        ParsedDescriptor::String(_) => ch9::STRING,
        ParsedDescriptor::Unknown { descriptor_type, .. } => *descriptor_type,
    }
}

/// A whole descriptor area read back from its bytes: device, high-speed configuration
/// (plus its pad byte, if any), qualifier, the empty other-speed word, then the string table to the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorImage {
    pub device: DeviceDescriptor,
    pub configuration: ConfigurationTree,
    pub qualifier: QualifierDescriptor,
    pub strings: Vec<StringDescriptor>,
    regions: [Region; Block::COUNT],
}

impl fmt::Display for DescriptorImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.device)?;
        write!(f, "{}", self.configuration)?;
        write!(f, "{}", self.qualifier)?;
        writeln!(f, "Other Speed Configuration: none")?;
        writeln!(f, "Strings:")?;
        for (index, s) in self.strings.iter().enumerate() {
            write!(f, "    {:3}: {}", index, s)?;
        }
        Ok(())
    }
}

impl DescriptorImage {
    pub fn parse(bytes: &[u8]) -> Result<DescriptorImage, Error> {
        let mut regions = [Region::default(); Block::COUNT];
        let mut offset = 0;

        let device = DeviceDescriptor::from_bytes(take(bytes, offset, ch9::DEVICE_SIZE)?).map_err(|e| at(offset, e))?;
        regions[Block::Device as usize] = Region { offset, length: ch9::DEVICE_SIZE };
        offset += ch9::DEVICE_SIZE;

        let header = take(bytes, offset, ch9::CONFIGURATION_SIZE)?;
        let total_length = u16::from_le_bytes([header[2], header[3]]) as usize;
        let configuration = ConfigurationTree::parse_at(take(bytes, offset, total_length)?, offset)?;
        regions[Block::HighSpeed as usize] = Region { offset, length: total_length };
        offset += total_length;

        // An odd wTotalLength leaves one zero byte ahead of the qualifier to keep it word aligned.
        if offset % 2 != 0 {
            if take(bytes, offset, 1)? != [0] {
                return Err(Error::Padding { offset });
            }
            offset += 1;
        }

        let qualifier =
            QualifierDescriptor::from_bytes(take(bytes, offset, ch9::QUALIFIER_SIZE)?).map_err(|e| at(offset, e))?;
        regions[Block::Qualifier as usize] = Region { offset, length: ch9::QUALIFIER_SIZE };
        offset += ch9::QUALIFIER_SIZE;

        // No full-speed personality: a single zero word stands where one would be.
        let placeholder = take(bytes, offset, 2)?;
        if placeholder != [0, 0] {
            return Err(Error::UnexpectedType { expected: ch9::OTHER_SPEED_CONFIGURATION, found: placeholder[1] });
        }
        regions[Block::OtherSpeed as usize] = Region { offset, length: 2 };
        offset += 2;

        let mut strings = Vec::new();
        for item in DescriptorIter::with_base(&bytes[offset..], offset) {
            match item? {
                (_, ParsedDescriptor::String(s)) => strings.push(s),
                (_, other) => return Err(Error::UnexpectedType { expected: ch9::STRING, found: type_of(&other) }),
            }
        }
        regions[Block::Strings as usize] = Region { offset, length: bytes.len() - offset };

        Ok(DescriptorImage { device, configuration, qualifier, strings, regions })
    }

    /// Where each block was found.
    pub fn region(&self, block: Block) -> Region { self.regions[block as usize] }

    /// String `index` as text; `None` for index 0 (LANGIDs) and for missing entries.
    pub fn string(&self, index: u8) -> Option<&str> {
        match self.strings.get(index as usize) {
            Some(StringDescriptor::Text(s)) if index != 0 => Some(s.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Descriptor;

    fn block(descriptors: &[&dyn Descriptor]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for d in descriptors {
            d.serialize(&mut bytes).unwrap();
        }
        bytes
    }

    fn interface(number: u8, endpoints: u8) -> InterfaceDescriptor {
        InterfaceDescriptor {
            interface_number: number,
            alternate_setting: 0,
            num_endpoints: endpoints,
            class: 0xff,
            subclass: 0xff,
            protocol: 0xff,
            interface_string: 0,
        }
    }

    fn config(total_length: u16, num_interfaces: u8) -> ConfigurationDescriptor {
        ConfigurationDescriptor {
            total_length,
            num_interfaces,
            configuration_value: 1,
            configuration_string: 0,
            attributes: 0x80,
            max_power: 50,
        }
    }

    #[test]
    fn tree_nests_endpoints_under_interfaces() {
        let bytes = block(&[
            &config(9 + 9 + 7 + 9, 2),
            &interface(0, 1),
            &EndpointDescriptor::bulk(0x81, 64),
            &interface(1, 0),
        ]);
        let tree = ConfigurationTree::parse(&bytes).unwrap();
        assert_eq!(tree.interfaces.len(), 2);
        assert_eq!(tree.interfaces[0].endpoints.len(), 1);
        assert!(tree.interfaces[1].endpoints.is_empty());
        assert_eq!(tree.expected_total_length(), bytes.len());
    }

    #[test]
    fn total_length_must_cover_block() {
        let bytes = block(&[&config(9 + 9, 1), &interface(0, 1), &EndpointDescriptor::bulk(0x81, 64)]);
        assert!(matches!(
            ConfigurationTree::parse(&bytes),
            Err(Error::TotalLengthMismatch { declared: 18, actual: 25 })
        ));
    }

    #[test]
    fn endpoint_before_interface_is_rejected() {
        let bytes = block(&[&config(9 + 7, 0), &EndpointDescriptor::bulk(0x81, 64)]);
        assert!(matches!(
            ConfigurationTree::parse(&bytes),
            Err(Error::UnexpectedType { expected: ch9::INTERFACE, found: ch9::ENDPOINT })
        ));
    }

    #[test]
    fn overrunning_length_is_truncation() {
        let mut bytes = block(&[&config(9 + 9, 1), &interface(0, 0)]);
        bytes.truncate(14);
        let results: Vec<_> = DescriptorIter::new(&bytes).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::Truncated { offset: 9, needed: 9, available: 5 })));
    }

    #[test]
    fn zero_length_does_not_spin() {
        let bytes = [0u8, 0, 0, 0];
        let results: Vec<_> = DescriptorIter::new(&bytes).collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn first_string_is_languages() {
        let bytes = block(&[
            &StringDescriptor::Languages(vec![0x0409]),
            &StringDescriptor::Text("A".to_owned()),
        ]);
        let parsed: Vec<_> = DescriptorIter::new(&bytes).map(|r| r.unwrap().1).collect();
        assert_eq!(parsed[0], ParsedDescriptor::String(StringDescriptor::Languages(vec![0x0409])));
        assert_eq!(parsed[1], ParsedDescriptor::String(StringDescriptor::Text("A".to_owned())));
    }

    #[test]
    fn pad_byte_after_configuration_is_skipped() {
        use crate::config::FT2232H_IDENTITY;
        use crate::strings::StringTable;
        use crate::table::DescriptorTable;

        let strings = StringTable::new(&["Maker", "Widget"], "serial").unwrap();
        let table = DescriptorTable::build(&FT2232H_IDENTITY, &strings).unwrap();
        let image = DescriptorImage::parse(table.as_bytes()).unwrap();
        assert_eq!(image.region(Block::HighSpeed), Region { offset: 18, length: 55 });
        assert_eq!(image.region(Block::Qualifier).offset, 74);

        let mut bytes = table.as_bytes().to_vec();
        bytes[73] = 0xAA;
        assert!(matches!(DescriptorImage::parse(&bytes), Err(Error::Padding { offset: 73 })));
    }
}

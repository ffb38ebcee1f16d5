//! The descriptor area: every descriptor the host can ask for, laid end to end in one
//! buffer, plus the offset of each block so the transfer engine can point straight at it.
//!
//! Layout, in order:
//!
//! | Block        | Contents                                                         |
//! |--------------|------------------------------------------------------------------|
//! | `Device`     | device descriptor                                                |
//! | `HighSpeed`  | configuration, interface 0, 2 endpoints, interface 1, 2 endpoints |
//! |              | one zero pad byte when wTotalLength is odd, outside wTotalLength |
//! | `Qualifier`  | device qualifier                                                 |
//! | `OtherSpeed` | one zero word: no full-speed configuration is offered            |
//! | `Strings`    | LANGID descriptor, then one string descriptor per index          |

use std::fmt;

use lazy_static::lazy_static;

use crate::ch9;
use crate::config::{DeviceIdentity, DEFAULT_DESCRIPTOR_AREA, FT2232H_IDENTITY};
use crate::descriptor::{
    ConfigurationDescriptor, Descriptor, DeviceDescriptor, EndpointDescriptor, InterfaceDescriptor,
    QualifierDescriptor,
};
use crate::parse::DescriptorImage;
use crate::strings::StringTable;
use crate::validate;
use crate::Error;

lazy_static! {
    /// The table the firmware serves. Built on first use from the compiled-in identity; a
    /// table that fails its consistency checks never gets served.
    pub static ref DESCRIPTORS: DescriptorTable = StringTable::with_defaults()
        .and_then(|strings| DescriptorTable::build(&FT2232H_IDENTITY, &strings))
        .expect("built-in descriptor table failed its self-check");
}

/// The sub-blocks of the table, in layout order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Block {
    Device = 0,
    HighSpeed = 1,
    Qualifier = 2,
    OtherSpeed = 3,
    Strings = 4,
}

impl Block {
    pub const COUNT: usize = 5;
    pub const ALL: [Block; Block::COUNT] =
        [Block::Device, Block::HighSpeed, Block::Qualifier, Block::OtherSpeed, Block::Strings];

    pub fn name(&self) -> &'static str {
        match self {
            Block::Device => "device",
            Block::HighSpeed => "highspeed",
            Block::Qualifier => "qualifier",
            Block::OtherSpeed => "fullspeed",
            Block::Strings => "strings",
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Region {
    /// Starting offset (in bytes) from the start of the table
    pub offset: usize,

    /// Length (in bytes)
    pub length: usize,
}

impl Region {
    pub fn end(&self) -> usize { self.offset + self.length }
}

/// Offset of every block, and the base address the table is loaded at.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OffsetTable {
    base: u16,
    regions: [Region; Block::COUNT],
}

impl fmt::Display for OffsetTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    descriptor area at {:04x}:", self.base)?;
        for block in Block::ALL.iter() {
            let region = self.region(*block);
            writeln!(
                f,
                "        {:<10} {:04x} - {:04x} (+{:3}, {:3} bytes)",
                block.name(),
                self.address(*block),
                self.address(*block) as usize + region.length,
                region.offset,
                region.length
            )?;
        }
        Ok(())
    }
}

impl OffsetTable {
    pub fn base(&self) -> u16 { self.base }

    pub fn region(&self, block: Block) -> Region { self.regions[block as usize] }

    pub fn offset(&self, block: Block) -> usize { self.regions[block as usize].offset }

    /// Absolute address of a block. Construction guarantees this does not overflow.
    pub fn address(&self, block: Block) -> u16 { self.base + self.offset(block) as u16 }
}

pub struct DescriptorTable {
    bytes: Vec<u8>,
    offsets: OffsetTable,
    /// Per string index, starting at the LANGID descriptor
    strings: Vec<Region>,
}

impl fmt::Display for DescriptorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Descriptor table, {} bytes", self.bytes.len())?;
        write!(f, "{}", self.offsets)?;
        writeln!(f, "    {} string descriptors", self.strings.len())
    }
}

/// Writes each descriptor in turn, making sure each one wrote what it said it would.
fn emit(bytes: &mut Vec<u8>, descriptors: &[&dyn Descriptor]) -> Result<Region, Error> {
    let offset = bytes.len();
    for descriptor in descriptors {
        let start = bytes.len();
        let advertised = descriptor.length();
        let written = descriptor.serialize(bytes)?;
        let actual = bytes.len() - start;
        if advertised != written || written != actual {
            return Err(Error::LengthMismatch { name: descriptor.name(), advertised, written: actual });
        }
    }
    Ok(Region { offset, length: bytes.len() - offset })
}

impl DescriptorTable {
    pub fn build(identity: &DeviceIdentity, strings: &StringTable) -> Result<DescriptorTable, Error> {
        DescriptorTable::build_at(identity, strings, DEFAULT_DESCRIPTOR_AREA)
    }

    /// Lays out the table for loading at `base`.
    pub fn build_at(identity: &DeviceIdentity, strings: &StringTable, base: u16) -> Result<DescriptorTable, Error> {
        // The serial number always goes last in the string table.
        if identity.serial_string != strings.serial_index() {
            return Err(Error::SerialIndex { declared: identity.serial_string, actual: strings.serial_index() });
        }

        let mut bytes = Vec::new();
        let mut regions = [Region::default(); Block::COUNT];

        let device = DeviceDescriptor {
            usb_version: ch9::BCD_USB_2_0,
            class: identity.class,
            subclass: identity.subclass,
            protocol: identity.protocol,
            max_packet_size0: identity.max_packet_size0,
            vendor_id: identity.vendor_id,
            product_id: identity.product_id,
            device_release: identity.device_release,
            manufacturer_string: identity.manufacturer_string,
            product_string: identity.product_string,
            serial_string: identity.serial_string,
            num_configurations: 1,
        };
        regions[Block::Device as usize] = emit(&mut bytes, &[&device])?;
        log::debug!("device descriptor: {:04x}:{:04x} rev {:04x}", device.vendor_id, device.product_id, device.device_release);

        regions[Block::HighSpeed as usize] = DescriptorTable::emit_configuration(&mut bytes, identity)?;
        if bytes.len() % 2 != 0 {
            bytes.push(0);
        }

        let qualifier = QualifierDescriptor {
            usb_version: ch9::BCD_USB_2_0,
            class: ch9::CLASS_PER_INTERFACE,
            subclass: 0,
            protocol: 0,
            max_packet_size0: identity.max_packet_size0,
            num_configurations: 1,
        };
        regions[Block::Qualifier as usize] = emit(&mut bytes, &[&qualifier])?;

        let offset = bytes.len();
        bytes.extend_from_slice(&0u16.to_le_bytes());
        regions[Block::OtherSpeed as usize] = Region { offset, length: 2 };

        let strings_offset = bytes.len();
        let mut string_regions = Vec::with_capacity(strings.len());
        for descriptor in strings.descriptors() {
            string_regions.push(emit(&mut bytes, &[&descriptor])?);
        }
        regions[Block::Strings as usize] = Region { offset: strings_offset, length: bytes.len() - strings_offset };
        log::debug!("{} string descriptors, {} bytes", string_regions.len(), bytes.len() - strings_offset);

        let blocks = Block::ALL.iter().map(|b| (b.name(), regions[*b as usize].offset));
        let entries = string_regions.iter().map(|r| ("string", r.offset));
        for (block, offset) in blocks.chain(entries) {
            // The transfer engine's descriptor pointer only takes even addresses.
            if (base as usize + offset) % 2 != 0 {
                return Err(Error::Misaligned { block, offset });
            }
        }
        if base as usize + bytes.len() > u16::MAX as usize + 1 {
            return Err(Error::AddressOverflow { block: Block::Strings.name(), offset: strings_offset });
        }

        let table = DescriptorTable { bytes, offsets: OffsetTable { base, regions }, strings: string_regions };
        table.self_check()?;
        log::info!("descriptor table built: {} bytes at {:04x}", table.bytes.len(), base);
        Ok(table)
    }

    /// Configuration descriptor followed by every interface and its endpoints. wTotalLength
    /// is written as zero, then patched with the size of what actually went out.
    fn emit_configuration(bytes: &mut Vec<u8>, identity: &DeviceIdentity) -> Result<Region, Error> {
        let configuration = ConfigurationDescriptor {
            total_length: 0,
            num_interfaces: identity.channels.len() as u8,
            configuration_value: identity.configuration_value,
            configuration_string: 0,
            attributes: identity.attributes,
            max_power: identity.max_power,
        };
        let start = bytes.len();
        let mut advertised = configuration.length();
        emit(bytes, &[&configuration])?;

        for (number, channel) in identity.channels.iter().enumerate() {
            let interface = InterfaceDescriptor {
                interface_number: number as u8,
                alternate_setting: 0,
                num_endpoints: channel.endpoints.len() as u8,
                class: channel.class,
                subclass: channel.subclass,
                protocol: channel.protocol,
                interface_string: channel.interface_string,
            };
            advertised += emit(bytes, &[&interface])?.length;
            for endpoint in channel.endpoints.iter() {
                let endpoint = EndpointDescriptor::bulk(endpoint.address(), endpoint.max_packet_size);
                advertised += emit(bytes, &[&endpoint])?.length;
            }
        }

        let total = bytes.len() - start;
        if total != advertised || total > u16::MAX as usize {
            return Err(Error::TotalLengthMismatch { declared: advertised, actual: total });
        }
        bytes[start + 2..start + 4].copy_from_slice(&(total as u16).to_le_bytes());
        log::debug!("high-speed configuration: {} interfaces, wTotalLength {}", identity.channels.len(), total);
        Ok(Region { offset: start, length: total })
    }

    /// Reads the finished table back as a host would and checks it against the rules the
    /// host and the emulated chip's driver enforce.
    fn self_check(&self) -> Result<(), Error> {
        let image = DescriptorImage::parse(&self.bytes)?;
        for block in Block::ALL.iter() {
            let found = image.region(*block);
            let built = self.offsets.region(*block);
            if found != built {
                return Err(Error::LengthMismatch { name: block.name(), advertised: built.length, written: found.length });
            }
        }
        validate::check_image(&image)
    }

    pub fn offsets(&self) -> &OffsetTable { &self.offsets }

    pub fn as_bytes(&self) -> &[u8] { &self.bytes }

    pub fn len(&self) -> usize { self.bytes.len() }

    pub fn is_empty(&self) -> bool { self.bytes.is_empty() }

    pub fn block(&self, block: Block) -> &[u8] {
        let region = self.offsets.region(block);
        &self.bytes[region.offset..region.end()]
    }

    pub fn device(&self) -> &[u8] { self.block(Block::Device) }

    /// The whole high-speed configuration block, wTotalLength bytes.
    pub fn configuration(&self) -> &[u8] { self.block(Block::HighSpeed) }

    pub fn qualifier(&self) -> &[u8] { self.block(Block::Qualifier) }

    /// The device refuses to run at full speed, so there is never an other-speed
    /// configuration to hand out.
    pub fn other_speed(&self) -> Option<&[u8]> { None }

    /// String descriptor `index`; 0 is the LANGID list.
    pub fn string(&self, index: u8) -> Option<&[u8]> {
        self.strings.get(index as usize).map(|region| &self.bytes[region.offset..region.end()])
    }

    pub fn string_count(&self) -> usize { self.strings.len() }

    pub fn parse(&self) -> Result<DescriptorImage, Error> { DescriptorImage::parse(&self.bytes) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;
    use crate::strings::serial_number;

    fn strings() -> StringTable { StringTable::new(&["Maker", "Widget"], &serial_number("v1.0-0-g0000000")).unwrap() }

    #[test]
    fn blocks_are_contiguous() {
        let table = DescriptorTable::build(&FT2232H_IDENTITY, &strings()).unwrap();
        let offsets = table.offsets();
        assert_eq!(offsets.offset(Block::Device), 0);
        assert_eq!(offsets.offset(Block::HighSpeed), 18);
        assert_eq!(offsets.region(Block::HighSpeed).length, 55);
        // 18 + 55 is odd, so one pad byte precedes the qualifier.
        assert_eq!(offsets.offset(Block::Qualifier), 18 + 55 + 1);
        assert_eq!(table.as_bytes()[18 + 55], 0);
        assert_eq!(offsets.offset(Block::OtherSpeed), 74 + 10);
        assert_eq!(offsets.offset(Block::Strings), 74 + 10 + 2);
        assert_eq!(offsets.region(Block::Strings).end(), table.len());
        assert_eq!(offsets.address(Block::Qualifier), DEFAULT_DESCRIPTOR_AREA + 74);
        for block in Block::ALL.iter() {
            assert_eq!(offsets.address(*block) % 2, 0);
        }
    }

    #[test]
    fn total_length_is_patched() {
        let table = DescriptorTable::build(&FT2232H_IDENTITY, &strings()).unwrap();
        let config = table.configuration();
        assert_eq!(config.len(), 55);
        assert_eq!(u16::from_le_bytes([config[2], config[3]]), 55);
    }

    #[test]
    fn strings_are_indexed() {
        let table = DescriptorTable::build(&FT2232H_IDENTITY, &strings()).unwrap();
        assert_eq!(table.string_count(), 4);
        assert_eq!(table.string(0), Some(&[4u8, 3, 0x09, 0x04][..]));
        assert_eq!(table.string(1), Some(&[12u8, 3, b'M', 0, b'a', 0, b'k', 0, b'e', 0, b'r', 0][..]));
        assert_eq!(table.string(4), None);
        assert!(table.other_speed().is_none());
    }

    #[test]
    fn serial_index_follows_string_count() {
        let three = StringTable::new(&["Maker", "Widget", "Extra"], "serial").unwrap();
        assert!(matches!(
            DescriptorTable::build(&FT2232H_IDENTITY, &three),
            Err(Error::SerialIndex { declared: 3, actual: 4 })
        ));

        let mut identity = FT2232H_IDENTITY;
        identity.serial_string = three.serial_index();
        let table = DescriptorTable::build(&identity, &three).unwrap();
        let image = table.parse().unwrap();
        assert_eq!(image.string(image.device.serial_string), Some("serial"));
        assert_eq!(image.string(3), Some("Extra"));
    }

    #[test]
    fn odd_base_is_refused() {
        assert!(matches!(
            DescriptorTable::build_at(&FT2232H_IDENTITY, &strings(), 0x3E01),
            Err(Error::Misaligned { block: "device", offset: 0 })
        ));
    }

    #[test]
    fn table_must_fit_the_address_space() {
        assert!(matches!(
            DescriptorTable::build_at(&FT2232H_IDENTITY, &strings(), 0xFFF0),
            Err(Error::AddressOverflow { .. })
        ));
    }

    #[test]
    fn uncapped_ep1_is_refused() {
        let mut identity = FT2232H_IDENTITY;
        identity.channels[0].endpoints[0].max_packet_size = 512;
        assert!(matches!(
            DescriptorTable::build(&identity, &strings()),
            Err(Error::PacketTooLarge { address: 0x81, size: 512, ceiling: 64 })
        ));
    }

    #[test]
    fn duplicate_endpoint_is_refused() {
        let mut identity = FT2232H_IDENTITY;
        let channel: ChannelConfig = identity.channels[0];
        identity.channels[1] = channel;
        assert!(matches!(DescriptorTable::build(&identity, &strings()), Err(Error::DuplicateEndpoint(0x81))));
    }

    #[test]
    fn dangling_string_index_is_refused() {
        let mut identity = FT2232H_IDENTITY;
        identity.manufacturer_string = 9;
        assert!(matches!(DescriptorTable::build(&identity, &strings()), Err(Error::MissingString(9))));
    }

    #[test]
    fn process_wide_table_is_built_once() {
        let first: *const DescriptorTable = &*DESCRIPTORS;
        let second: *const DescriptorTable = &*DESCRIPTORS;
        assert_eq!(first, second);
        assert_eq!(DESCRIPTORS.device()[0], 18);
    }
}

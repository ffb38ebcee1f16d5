//! Typed chapter 9 descriptors.
//!
//! Every descriptor knows how long it claims to be and how to write itself, field by field,
//! in wire order. Nothing here relies on in-memory struct layout: the bytes come from
//! `serialize`, and the table builder checks that what was written matches what was
//! advertised.

use std::fmt;
use std::io;

use crate::ch9;
use crate::Error;

pub trait Descriptor: fmt::Display {
    /// bDescriptorType
    fn descriptor_type(&self) -> u8;

    fn name(&self) -> &'static str { ch9::descriptor_type_name(self.descriptor_type()) }

    /// The number of bytes this descriptor will write, which is also its bLength.
    fn length(&self) -> usize;

    /// Write the descriptor to the specified writer.
    /// Return the number of bytes written.
    fn serialize(&self, output: &mut dyn io::Write) -> io::Result<usize>;

    /// Serializes into a fresh buffer, checking the advertised length.
    fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::with_capacity(self.length());
        let written = self.serialize(&mut bytes)?;
        if written != self.length() || bytes.len() != written {
            return Err(Error::LengthMismatch { name: self.name(), advertised: self.length(), written: bytes.len() });
        }
        Ok(bytes)
    }
}

/// Checks that `bytes` holds exactly one descriptor of the given type and fixed size.
fn check_header(bytes: &[u8], descriptor_type: u8, size: usize) -> Result<(), Error> {
    if bytes.len() < 2 {
        return Err(Error::Truncated { offset: 0, needed: 2, available: bytes.len() });
    }
    if bytes[1] != descriptor_type {
        return Err(Error::UnexpectedType { expected: descriptor_type, found: bytes[1] });
    }
    if bytes[0] as usize != size {
        return Err(Error::BadLength { descriptor_type, expected: size, found: bytes[0] as usize });
    }
    if bytes.len() < size {
        return Err(Error::Truncated { offset: 0, needed: size, available: bytes.len() });
    }
    Ok(())
}

fn le16(bytes: &[u8], at: usize) -> u16 { u16::from_le_bytes([bytes[at], bytes[at + 1]]) }

fn bcd(value: u16) -> String { format!("{:x}.{:02x}", value >> 8, value & 0xff) }

/// Standard device descriptor [USB 2.0§9.6.1]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub usb_version: u16,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub max_packet_size0: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub device_release: u16,
    pub manufacturer_string: u8,
    pub product_string: u8,
    pub serial_string: u8,
    pub num_configurations: u8,
}

impl DeviceDescriptor {
    pub fn from_bytes(bytes: &[u8]) -> Result<DeviceDescriptor, Error> {
        check_header(bytes, ch9::DEVICE, ch9::DEVICE_SIZE)?;
        Ok(DeviceDescriptor {
            usb_version: le16(bytes, 2),
            class: bytes[4],
            subclass: bytes[5],
            protocol: bytes[6],
            max_packet_size0: bytes[7],
            vendor_id: le16(bytes, 8),
            product_id: le16(bytes, 10),
            device_release: le16(bytes, 12),
            manufacturer_string: bytes[14],
            product_string: bytes[15],
            serial_string: bytes[16],
            num_configurations: bytes[17],
        })
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Device Descriptor:")?;
        writeln!(f, "    bcdUSB             {}", bcd(self.usb_version))?;
        writeln!(f, "    bDeviceClass       {:#04x}", self.class)?;
        writeln!(f, "    bDeviceSubClass    {:#04x}", self.subclass)?;
        writeln!(f, "    bDeviceProtocol    {:#04x}", self.protocol)?;
        writeln!(f, "    bMaxPacketSize0    {}", self.max_packet_size0)?;
        writeln!(f, "    idVendor           {:#06x}", self.vendor_id)?;
        writeln!(f, "    idProduct          {:#06x}", self.product_id)?;
        writeln!(f, "    bcdDevice          {}", bcd(self.device_release))?;
        writeln!(f, "    iManufacturer      {}", self.manufacturer_string)?;
        writeln!(f, "    iProduct           {}", self.product_string)?;
        writeln!(f, "    iSerial            {}", self.serial_string)?;
        writeln!(f, "    bNumConfigurations {}", self.num_configurations)
    }
}

impl Descriptor for DeviceDescriptor {
    fn descriptor_type(&self) -> u8 { ch9::DEVICE }

    fn length(&self) -> usize { ch9::DEVICE_SIZE }

    fn serialize(&self, output: &mut dyn io::Write) -> io::Result<usize> {
        output.write_all(&[self.length() as u8, self.descriptor_type()])?;
        output.write_all(&self.usb_version.to_le_bytes())?;
        output.write_all(&[self.class, self.subclass, self.protocol, self.max_packet_size0])?;
        output.write_all(&self.vendor_id.to_le_bytes())?;
        output.write_all(&self.product_id.to_le_bytes())?;
        output.write_all(&self.device_release.to_le_bytes())?;
        output.write_all(&[
            self.manufacturer_string,
            self.product_string,
            self.serial_string,
            self.num_configurations,
        ])?;
        Ok(ch9::DEVICE_SIZE)
    }
}

/// Standard configuration descriptor [USB 2.0§9.6.3]
///
/// `total_length` is filled in by the table builder from the bytes it actually wrote.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConfigurationDescriptor {
    pub total_length: u16,
    pub num_interfaces: u8,
    pub configuration_value: u8,
    pub configuration_string: u8,
    pub attributes: u8,
    /// In units of 2 mA
    pub max_power: u8,
}

impl ConfigurationDescriptor {
    pub fn from_bytes(bytes: &[u8]) -> Result<ConfigurationDescriptor, Error> {
        check_header(bytes, ch9::CONFIGURATION, ch9::CONFIGURATION_SIZE)?;
        Ok(ConfigurationDescriptor {
            total_length: le16(bytes, 2),
            num_interfaces: bytes[4],
            configuration_value: bytes[5],
            configuration_string: bytes[6],
            attributes: bytes[7],
            max_power: bytes[8],
        })
    }

    pub fn max_power_ma(&self) -> u32 { self.max_power as u32 * 2 }
}

impl fmt::Display for ConfigurationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration Descriptor:")?;
        writeln!(f, "    wTotalLength        {}", self.total_length)?;
        writeln!(f, "    bNumInterfaces      {}", self.num_interfaces)?;
        writeln!(f, "    bConfigurationValue {}", self.configuration_value)?;
        writeln!(f, "    iConfiguration      {}", self.configuration_string)?;
        write!(f, "    bmAttributes        {:#04x}", self.attributes)?;
        if self.attributes & ch9::CONFIG_ATTR_SELF_POWERED != 0 {
            write!(f, " +SELF_POWERED")?;
        } else {
            write!(f, " -self_powered")?;
        }
        if self.attributes & ch9::CONFIG_ATTR_REMOTE_WAKEUP != 0 {
            write!(f, " +REMOTE_WAKEUP")?;
        } else {
            write!(f, " -remote_wakeup")?;
        }
        writeln!(f)?;
        writeln!(f, "    MaxPower            {}mA", self.max_power_ma())
    }
}

impl Descriptor for ConfigurationDescriptor {
    fn descriptor_type(&self) -> u8 { ch9::CONFIGURATION }

    fn length(&self) -> usize { ch9::CONFIGURATION_SIZE }

    fn serialize(&self, output: &mut dyn io::Write) -> io::Result<usize> {
        output.write_all(&[self.length() as u8, self.descriptor_type()])?;
        output.write_all(&self.total_length.to_le_bytes())?;
        output.write_all(&[
            self.num_interfaces,
            self.configuration_value,
            self.configuration_string,
            self.attributes,
            self.max_power,
        ])?;
        Ok(ch9::CONFIGURATION_SIZE)
    }
}

/// Standard interface descriptor [USB 2.0§9.6.5]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub interface_number: u8,
    pub alternate_setting: u8,
    pub num_endpoints: u8,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub interface_string: u8,
}

impl InterfaceDescriptor {
    pub fn from_bytes(bytes: &[u8]) -> Result<InterfaceDescriptor, Error> {
        check_header(bytes, ch9::INTERFACE, ch9::INTERFACE_SIZE)?;
        Ok(InterfaceDescriptor {
            interface_number: bytes[2],
            alternate_setting: bytes[3],
            num_endpoints: bytes[4],
            class: bytes[5],
            subclass: bytes[6],
            protocol: bytes[7],
            interface_string: bytes[8],
        })
    }
}

impl fmt::Display for InterfaceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "    Interface Descriptor:")?;
        writeln!(f, "        bInterfaceNumber   {}", self.interface_number)?;
        writeln!(f, "        bAlternateSetting  {}", self.alternate_setting)?;
        writeln!(f, "        bNumEndpoints      {}", self.num_endpoints)?;
        writeln!(f, "        bInterfaceClass    {:#04x}", self.class)?;
        writeln!(f, "        bInterfaceSubClass {:#04x}", self.subclass)?;
        writeln!(f, "        bInterfaceProtocol {:#04x}", self.protocol)?;
        writeln!(f, "        iInterface         {}", self.interface_string)
    }
}

impl Descriptor for InterfaceDescriptor {
    fn descriptor_type(&self) -> u8 { ch9::INTERFACE }

    fn length(&self) -> usize { ch9::INTERFACE_SIZE }

    fn serialize(&self, output: &mut dyn io::Write) -> io::Result<usize> {
        output.write_all(&[
            self.length() as u8,
            self.descriptor_type(),
            self.interface_number,
            self.alternate_setting,
            self.num_endpoints,
            self.class,
            self.subclass,
            self.protocol,
            self.interface_string,
        ])?;
        Ok(ch9::INTERFACE_SIZE)
    }
}

/// Standard endpoint descriptor [USB 2.0§9.6.6]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub address: u8,
    pub attributes: u8,
    pub max_packet_size: u16,
    pub interval: u8,
}

impl EndpointDescriptor {
    pub fn bulk(address: u8, max_packet_size: u16) -> EndpointDescriptor {
        EndpointDescriptor {
            address,
            attributes: ch9::EndpointType::Bulk as u8,
            max_packet_size,
            interval: 0,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<EndpointDescriptor, Error> {
        check_header(bytes, ch9::ENDPOINT, ch9::ENDPOINT_SIZE)?;
        Ok(EndpointDescriptor {
            address: bytes[2],
            attributes: bytes[3],
            max_packet_size: le16(bytes, 4),
            interval: bytes[6],
        })
    }

    pub fn number(&self) -> u8 { self.address & ch9::ENDPOINT_NUMBER_MASK }

    pub fn direction(&self) -> ch9::UsbDirection { ch9::EndpointAddress::from(self.address).direction() }

    pub fn is_bulk(&self) -> bool {
        self.attributes & ch9::ENDPOINT_TRANSFER_TYPE_MASK == ch9::EndpointType::Bulk as u8
    }
}

impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "        Endpoint Descriptor:")?;
        writeln!(
            f,
            "            bEndpointAddress {:#04x}  EP {} {}",
            self.address,
            self.number(),
            ch9::direction_name(self.direction())
        )?;
        writeln!(
            f,
            "            bmAttributes     {:#04x}  {}",
            self.attributes,
            ch9::transfer_type_name(self.attributes)
        )?;
        writeln!(f, "            wMaxPacketSize   {}", self.max_packet_size)?;
        writeln!(f, "            bInterval        {}", self.interval)
    }
}

impl Descriptor for EndpointDescriptor {
    fn descriptor_type(&self) -> u8 { ch9::ENDPOINT }

    fn length(&self) -> usize { ch9::ENDPOINT_SIZE }

    fn serialize(&self, output: &mut dyn io::Write) -> io::Result<usize> {
        output.write_all(&[self.length() as u8, self.descriptor_type(), self.address, self.attributes])?;
        output.write_all(&self.max_packet_size.to_le_bytes())?;
        output.write_all(&[self.interval])?;
        Ok(ch9::ENDPOINT_SIZE)
    }
}

/// Device qualifier [USB 2.0§9.6.2]: what the device would look like at the other speed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct QualifierDescriptor {
    pub usb_version: u16,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub max_packet_size0: u8,
    pub num_configurations: u8,
}

impl QualifierDescriptor {
    pub fn from_bytes(bytes: &[u8]) -> Result<QualifierDescriptor, Error> {
        check_header(bytes, ch9::DEVICE_QUALIFIER, ch9::QUALIFIER_SIZE)?;
        Ok(QualifierDescriptor {
            usb_version: le16(bytes, 2),
            class: bytes[4],
            subclass: bytes[5],
            protocol: bytes[6],
            max_packet_size0: bytes[7],
            num_configurations: bytes[8],
        })
    }
}

impl fmt::Display for QualifierDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Device Qualifier:")?;
        writeln!(f, "    bcdUSB             {}", bcd(self.usb_version))?;
        writeln!(f, "    bDeviceClass       {:#04x}", self.class)?;
        writeln!(f, "    bDeviceSubClass    {:#04x}", self.subclass)?;
        writeln!(f, "    bDeviceProtocol    {:#04x}", self.protocol)?;
        writeln!(f, "    bMaxPacketSize0    {}", self.max_packet_size0)?;
        writeln!(f, "    bNumConfigurations {}", self.num_configurations)
    }
}

impl Descriptor for QualifierDescriptor {
    fn descriptor_type(&self) -> u8 { ch9::DEVICE_QUALIFIER }

    fn length(&self) -> usize { ch9::QUALIFIER_SIZE }

    fn serialize(&self, output: &mut dyn io::Write) -> io::Result<usize> {
        output.write_all(&[self.length() as u8, self.descriptor_type()])?;
        output.write_all(&self.usb_version.to_le_bytes())?;
        output.write_all(&[
            self.class,
            self.subclass,
            self.protocol,
            self.max_packet_size0,
            self.num_configurations,
            0, // bReserved
        ])?;
        Ok(ch9::QUALIFIER_SIZE)
    }
}

/// String descriptor [USB 2.0§9.6.7]. Index zero carries LANGIDs instead of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringDescriptor {
    Languages(Vec<u16>),
    Text(String),
}

impl StringDescriptor {
    fn units(&self) -> Vec<u16> {
        match self {
            StringDescriptor::Languages(ids) => ids.clone(),
            StringDescriptor::Text(s) => s.encode_utf16().collect(),
        }
    }

    pub fn unit_count(&self) -> usize {
        match self {
            StringDescriptor::Languages(ids) => ids.len(),
            StringDescriptor::Text(s) => s.encode_utf16().count(),
        }
    }

    /// Parses a string descriptor. Whether the payload is LANGIDs or text depends on the
    /// index it was fetched from, which only the caller knows.
    pub fn from_bytes(bytes: &[u8], languages: bool) -> Result<StringDescriptor, Error> {
        if bytes.len() < ch9::STRING_HEADER_SIZE {
            return Err(Error::Truncated { offset: 0, needed: ch9::STRING_HEADER_SIZE, available: bytes.len() });
        }
        if bytes[1] != ch9::STRING {
            return Err(Error::UnexpectedType { expected: ch9::STRING, found: bytes[1] });
        }
        let length = bytes[0] as usize;
        if length < ch9::STRING_HEADER_SIZE || length % 2 != 0 {
            return Err(Error::BadLength { descriptor_type: ch9::STRING, expected: length & !1, found: length });
        }
        if bytes.len() < length {
            return Err(Error::Truncated { offset: 0, needed: length, available: bytes.len() });
        }
        let units: Vec<u16> =
            bytes[ch9::STRING_HEADER_SIZE..length].chunks(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
        if languages {
            Ok(StringDescriptor::Languages(units))
        } else {
            String::from_utf16(&units).map(StringDescriptor::Text).map_err(|_| Error::BadString { offset: 0 })
        }
    }
}

impl fmt::Display for StringDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringDescriptor::Languages(ids) => {
                write!(f, "LANGID")?;
                for id in ids {
                    write!(f, " {:#06x}", id)?;
                }
                writeln!(f)
            }
            StringDescriptor::Text(s) => writeln!(f, "\"{}\"", s),
        }
    }
}

impl Descriptor for StringDescriptor {
    fn descriptor_type(&self) -> u8 { ch9::STRING }

    fn length(&self) -> usize { ch9::STRING_HEADER_SIZE + 2 * self.unit_count() }

    fn serialize(&self, output: &mut dyn io::Write) -> io::Result<usize> {
        let units = self.units();
        if units.len() > ch9::STRING_MAX_UNITS {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "string does not fit in one descriptor"));
        }
        let mut written = ch9::STRING_HEADER_SIZE;
        output.write_all(&[self.length() as u8, self.descriptor_type()])?;
        for unit in units {
            output.write_all(&unit.to_le_bytes())?;
            written += 2;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_descriptor_wire_order() {
        let device = DeviceDescriptor {
            usb_version: 0x0200,
            class: 0xef,
            subclass: 0x02,
            protocol: 0x01,
            max_packet_size0: 64,
            vendor_id: 0x0403,
            product_id: 0x6010,
            device_release: 0x0700,
            manufacturer_string: 1,
            product_string: 2,
            serial_string: 3,
            num_configurations: 1,
        };
        assert_eq!(
            device.to_bytes().unwrap(),
            vec![18, 1, 0x00, 0x02, 0xef, 0x02, 0x01, 64, 0x03, 0x04, 0x10, 0x60, 0x00, 0x07, 1, 2, 3, 1]
        );
    }

    #[test]
    fn endpoint_packs_little_endian() {
        let ep = EndpointDescriptor::bulk(0x82, 512);
        assert_eq!(ep.to_bytes().unwrap(), vec![7, 5, 0x82, 0x02, 0x00, 0x02, 0]);
        assert_eq!(ep.number(), 2);
        assert_eq!(ep.direction(), ch9::UsbDirection::In);
        assert!(ep.is_bulk());
    }

    #[test]
    fn qualifier_has_reserved_byte() {
        let q = QualifierDescriptor {
            usb_version: 0x0200,
            class: 0,
            subclass: 0,
            protocol: 0,
            max_packet_size0: 64,
            num_configurations: 1,
        };
        let bytes = q.to_bytes().unwrap();
        assert_eq!(bytes.len(), 10);
        assert_eq!(bytes[0..2], [10, 6]);
        assert_eq!(bytes[9], 0);
        assert_eq!(QualifierDescriptor::from_bytes(&bytes).unwrap(), q);
    }

    #[test]
    fn string_descriptor_is_utf16le() {
        let s = StringDescriptor::Text("Hi".to_owned());
        assert_eq!(s.to_bytes().unwrap(), vec![6, 3, b'H', 0, b'i', 0]);
        let lang = StringDescriptor::Languages(vec![ch9::LANGID_ENGLISH_US]);
        assert_eq!(lang.to_bytes().unwrap(), vec![4, 3, 0x09, 0x04]);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let mut bytes = EndpointDescriptor::bulk(0x01, 64).to_bytes().unwrap();
        bytes[0] = 9;
        assert!(matches!(
            EndpointDescriptor::from_bytes(&bytes),
            Err(Error::BadLength { descriptor_type: ch9::ENDPOINT, expected: 7, found: 9 })
        ));
        assert!(matches!(
            InterfaceDescriptor::from_bytes(&bytes),
            Err(Error::UnexpectedType { expected: ch9::INTERFACE, found: ch9::ENDPOINT })
        ));
    }

    #[test]
    fn oversized_string_does_not_serialize() {
        let s = StringDescriptor::Text("x".repeat(ch9::STRING_MAX_UNITS + 1));
        assert!(s.to_bytes().is_err());
    }
}

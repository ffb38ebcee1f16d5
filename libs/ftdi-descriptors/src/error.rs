use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    /// A descriptor's bLength disagrees with the size chapter 9 fixes for its type
    BadLength { descriptor_type: u8, expected: usize, found: usize },

    /// Expected one descriptor type, found another
    UnexpectedType { expected: u8, found: u8 },

    /// A descriptor said it would write one number of bytes and wrote another
    LengthMismatch { name: &'static str, advertised: usize, written: usize },

    /// wTotalLength does not cover exactly the configuration block
    TotalLengthMismatch { declared: usize, actual: usize },

    /// bNumInterfaces does not match the interfaces that follow
    InterfaceCountMismatch { declared: u8, actual: usize },

    /// Interface numbers must run 0, 1, 2, ...
    InterfaceNumbering { position: usize, found: u8 },

    /// Only the default alternate setting is offered
    AlternateSetting { interface: u8, found: u8 },

    /// bNumEndpoints does not match the endpoints that follow the interface
    EndpointCountMismatch { interface: u8, declared: u8, actual: usize },

    /// Two endpoints share a number and direction
    DuplicateEndpoint(u8),

    /// Endpoint zero is the control pipe and cannot be declared
    ControlEndpoint,

    /// Only bulk endpoints are offered
    NotBulk { address: u8, attributes: u8 },

    /// Bulk endpoints do not poll
    NonzeroInterval { address: u8, interval: u8 },

    /// wMaxPacketSize is over the bus limit or what the silicon can buffer
    PacketTooLarge { address: u8, size: u16, ceiling: u16 },

    /// A descriptor refers to a string index the string table does not have
    MissingString(u8),

    /// A string does not fit in a single string descriptor
    StringTooLong { index: usize, units: usize },

    /// Single-configuration device
    ConfigurationCount(u8),

    /// The device release does not name a chip the host driver knows
    UnknownChip(u16),

    /// The emulated chip has a different number of channels than the table has interfaces
    ChannelCountMismatch { expected: usize, actual: usize },

    /// A sub-block does not sit on a word boundary
    Misaligned { block: &'static str, offset: usize },

    /// A block would not be addressable from the descriptor area base
    AddressOverflow { block: &'static str, offset: usize },

    /// Ran off the end of the buffer while parsing
    Truncated { offset: usize, needed: usize, available: usize },

    /// The alignment byte after an odd-length configuration block is not zero
    Padding { offset: usize },

    /// iSerialNumber does not point at the serial number, which is always the last string
    SerialIndex { declared: u8, actual: u8 },

    /// More strings than a one-byte string index can address
    TooManyStrings(usize),

    /// A string descriptor held unpaired UTF-16
    BadString { offset: usize },

    /// Generic IO error while serializing
    IoError(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadLength { descriptor_type, expected, found } => write!(
                f,
                "{} descriptor has bLength {} (expected {})",
                crate::ch9::descriptor_type_name(*descriptor_type),
                found,
                expected
            ),
            Error::UnexpectedType { expected, found } => write!(
                f,
                "expected a {} descriptor, found type {:#04x}",
                crate::ch9::descriptor_type_name(*expected),
                found
            ),
            Error::LengthMismatch { name, advertised, written } => {
                write!(f, "{} advertised {} bytes but wrote {}", name, advertised, written)
            }
            Error::TotalLengthMismatch { declared, actual } => {
                write!(f, "wTotalLength is {} but the configuration block is {} bytes", declared, actual)
            }
            Error::InterfaceCountMismatch { declared, actual } => {
                write!(f, "bNumInterfaces is {} but {} interfaces follow", declared, actual)
            }
            Error::InterfaceNumbering { position, found } => {
                write!(f, "interface at position {} is numbered {}", position, found)
            }
            Error::AlternateSetting { interface, found } => {
                write!(f, "interface {} declares alternate setting {}", interface, found)
            }
            Error::EndpointCountMismatch { interface, declared, actual } => write!(
                f,
                "interface {} declares {} endpoints but {} follow",
                interface, declared, actual
            ),
            Error::DuplicateEndpoint(address) => write!(f, "endpoint {:#04x} is declared twice", address),
            Error::ControlEndpoint => write!(f, "endpoint 0 cannot be declared"),
            Error::NotBulk { address, attributes } => {
                write!(f, "endpoint {:#04x} has attributes {:#04x}, not bulk", address, attributes)
            }
            Error::NonzeroInterval { address, interval } => {
                write!(f, "bulk endpoint {:#04x} has bInterval {}", address, interval)
            }
            Error::PacketTooLarge { address, size, ceiling } => write!(
                f,
                "endpoint {:#04x} declares wMaxPacketSize {} but is limited to {}",
                address, size, ceiling
            ),
            Error::MissingString(index) => write!(f, "string index {} is not in the string table", index),
            Error::StringTooLong { index, units } => {
                write!(f, "string {} is {} UTF-16 units long", index, units)
            }
            Error::ConfigurationCount(count) => write!(f, "bNumConfigurations is {}, not 1", count),
            Error::UnknownChip(release) => write!(f, "bcdDevice {:#06x} names no known chip", release),
            Error::ChannelCountMismatch { expected, actual } => {
                write!(f, "emulated chip has {} channels but the table has {} interfaces", expected, actual)
            }
            Error::Misaligned { block, offset } => write!(f, "{} block at offset {} is not word aligned", block, offset),
            Error::AddressOverflow { block, offset } => {
                write!(f, "{} block at offset {} falls outside the address space", block, offset)
            }
            Error::Truncated { offset, needed, available } => write!(
                f,
                "descriptor at offset {} needs {} bytes but only {} remain",
                offset, needed, available
            ),
            Error::Padding { offset } => write!(f, "pad byte at offset {} is not zero", offset),
            Error::SerialIndex { declared, actual } => {
                write!(f, "iSerialNumber is {} but the serial number is string {}", declared, actual)
            }
            Error::TooManyStrings(count) => {
                write!(f, "{} string descriptors do not fit one-byte string indices", count)
            }
            Error::BadString { offset } => write!(f, "string descriptor at offset {} is not valid UTF-16", offset),
            Error::IoError(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl std::convert::From<io::Error> for Error {
    fn from(e: io::Error) -> Error { Error::IoError(e) }
}

//! USB descriptor table for a high-speed device that enumerates as a dual-channel FTDI
//! bridge, so that stock host drivers bind to it.
//!
//! The whole descriptor hierarchy (device, high-speed configuration with two vendor
//! interfaces and four bulk endpoints, device qualifier, an empty other-speed slot and the
//! string table) is serialized into one contiguous buffer. An [`OffsetTable`] tells the
//! transfer firmware where each block starts, and [`DescriptorTable::get_descriptor`]
//! answers GET_DESCRIPTOR requests straight out of it.
//!
//! Tables are checked before they are handed out: the builder reads its own output back
//! with a plain chapter 9 parser and refuses anything a host or the host driver would
//! trip over.

pub mod ch9;
pub mod config;
pub mod control;
pub mod descriptor;
mod error;
pub mod ftdi;
pub mod parse;
pub mod strings;
pub mod table;
pub mod validate;

pub use config::{DeviceIdentity, FT2232H_IDENTITY};
pub use control::{Response, SetupPacket};
pub use descriptor::Descriptor;
pub use error::Error;
pub use parse::DescriptorImage;
pub use strings::StringTable;
pub use table::{Block, DescriptorTable, OffsetTable, Region, DESCRIPTORS};

mod logging {
    pub use log::trace as trace_usb_control;
}

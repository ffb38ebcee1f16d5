//! The one control request this crate answers: GET_DESCRIPTOR. The transfer firmware hands
//! over the SETUP packet and gets back the bytes to stage, a stall, or a note that the
//! request belongs to someone else.

use std::fmt;

use num_traits::FromPrimitive;

use crate::ch9;
use crate::logging::trace_usb_control;
use crate::table::DescriptorTable;

/// bmRequestType bits 6:5
#[derive(num_derive::FromPrimitive, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RequestKind {
    Standard = 0,
    Class = 1,
    Vendor = 2,
    Reserved = 3,
}

pub const SETUP_PACKET_SIZE: usize = 8;

/// The 8-byte SETUP stage of a control transfer [USB 2.0§9.3]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl fmt::Display for SetupPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SETUP {:02x} {:02x} wValue={:04x} wIndex={:04x} wLength={}",
            self.request_type, self.request, self.value, self.index, self.length
        )
    }
}

impl SetupPacket {
    pub fn parse(bytes: &[u8; SETUP_PACKET_SIZE]) -> SetupPacket {
        SetupPacket {
            request_type: bytes[0],
            request: bytes[1],
            value: u16::from_le_bytes([bytes[2], bytes[3]]),
            index: u16::from_le_bytes([bytes[4], bytes[5]]),
            length: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }

    /// A standard, device-recipient GET_DESCRIPTOR as a host would send it.
    pub fn get_descriptor(descriptor_type: u8, index: u8, language: u16, length: u16) -> SetupPacket {
        SetupPacket {
            request_type: ch9::REQUEST_DIR_IN,
            request: ch9::REQUEST_GET_DESCRIPTOR,
            value: (descriptor_type as u16) << 8 | index as u16,
            index: language,
            length,
        }
    }

    pub fn to_bytes(&self) -> [u8; SETUP_PACKET_SIZE] {
        let value = self.value.to_le_bytes();
        let index = self.index.to_le_bytes();
        let length = self.length.to_le_bytes();
        [self.request_type, self.request, value[0], value[1], index[0], index[1], length[0], length[1]]
    }

    pub fn is_device_to_host(&self) -> bool { self.request_type & ch9::REQUEST_DIR_IN != 0 }

    pub fn kind(&self) -> RequestKind {
        FromPrimitive::from_u8((self.request_type & ch9::REQUEST_TYPE_MASK) >> 5).unwrap_or(RequestKind::Reserved)
    }

    pub fn recipient(&self) -> u8 { self.request_type & ch9::REQUEST_RECIPIENT_MASK }

    pub fn is_get_descriptor(&self) -> bool {
        self.is_device_to_host() && self.kind() == RequestKind::Standard && self.request == ch9::REQUEST_GET_DESCRIPTOR
    }

    /// wValue of a GET_DESCRIPTOR: descriptor type in the high byte, index in the low.
    pub fn descriptor_type_index(&self) -> (u8, u8) { ((self.value >> 8) as u8, self.value as u8) }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Response<'a> {
    /// Bytes for the data stage, already cut to wLength
    Data(&'a [u8]),
    Stall,
    /// Not a GET_DESCRIPTOR; the rest of the transfer firmware deals with it
    NotHandled,
}

impl DescriptorTable {
    /// Picks the block a GET_DESCRIPTOR asks for. The host may ask for less than a whole
    /// block, typically the 9-byte configuration header to learn wTotalLength, so the data
    /// is cut to wLength.
    pub fn get_descriptor(&self, setup: &SetupPacket) -> Response<'_> {
        if !setup.is_get_descriptor() {
            return Response::NotHandled;
        }
        let (descriptor_type, index) = setup.descriptor_type_index();
        let block = match descriptor_type {
            ch9::DEVICE => Some(self.device()),
            ch9::CONFIGURATION if index == 0 => Some(self.configuration()),
            ch9::DEVICE_QUALIFIER => Some(self.qualifier()),
            ch9::STRING => self.string(index),
            ch9::OTHER_SPEED_CONFIGURATION => self.other_speed(),
            _ => None,
        };
        match block {
            Some(bytes) => {
                let length = bytes.len().min(setup.length as usize);
                trace_usb_control!(
                    "GET_DESCRIPTOR {} {}: {} of {} bytes",
                    ch9::descriptor_type_name(descriptor_type),
                    index,
                    length,
                    bytes.len()
                );
                Response::Data(&bytes[..length])
            }
            None => {
                trace_usb_control!("GET_DESCRIPTOR {} {}: stall", ch9::descriptor_type_name(descriptor_type), index);
                Response::Stall
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_is_little_endian() {
        let setup = SetupPacket::parse(&[0x80, 0x06, 0x00, 0x02, 0x00, 0x00, 0x09, 0x00]);
        assert!(setup.is_get_descriptor());
        assert_eq!(setup.descriptor_type_index(), (ch9::CONFIGURATION, 0));
        assert_eq!(setup.length, 9);
        assert_eq!(setup, SetupPacket::get_descriptor(ch9::CONFIGURATION, 0, 0, 9));
        assert_eq!(setup.to_bytes(), [0x80, 0x06, 0x00, 0x02, 0x00, 0x00, 0x09, 0x00]);
    }

    #[test]
    fn request_kind_decodes() {
        let vendor = SetupPacket::parse(&[0xC0, 0x90, 0, 0, 0, 0, 2, 0]);
        assert_eq!(vendor.kind(), RequestKind::Vendor);
        assert!(vendor.is_device_to_host());
        assert!(!vendor.is_get_descriptor());

        let set_address = SetupPacket::parse(&[0x00, 0x05, 7, 0, 0, 0, 0, 0]);
        assert_eq!(set_address.kind(), RequestKind::Standard);
        assert!(!set_address.is_device_to_host());
        assert_eq!(set_address.recipient(), 0);
    }
}

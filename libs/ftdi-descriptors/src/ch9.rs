//! USB 2.0 chapter 9 vocabulary: descriptor type codes, fixed descriptor sizes and the
//! class codes this device presents.
//!
//! The codes that `usb-device` already names are re-exported from it; the two it does not
//! carry (device qualifier and other-speed configuration) are only meaningful to
//! high-speed capable devices and are defined here.

pub use usb_device::descriptor::descriptor_type::{CONFIGURATION, DEVICE, ENDPOINT, INTERFACE, STRING};
pub use usb_device::endpoint::{EndpointAddress, EndpointType};
pub use usb_device::UsbDirection;

/// Descriptor type of the device qualifier [USB 2.0§9.6.2]
pub const DEVICE_QUALIFIER: u8 = 6;
/// Descriptor type of the other-speed configuration [USB 2.0§9.6.4]
pub const OTHER_SPEED_CONFIGURATION: u8 = 7;

pub const DEVICE_SIZE: usize = 18;
pub const CONFIGURATION_SIZE: usize = 9;
pub const INTERFACE_SIZE: usize = 9;
pub const ENDPOINT_SIZE: usize = 7;
pub const QUALIFIER_SIZE: usize = 10;
/// bLength + bDescriptorType in front of the UTF-16 payload of a string descriptor
pub const STRING_HEADER_SIZE: usize = 2;

/// Longest string payload a one-byte bLength can describe, in UTF-16 code units.
pub const STRING_MAX_UNITS: usize = (u8::MAX as usize - STRING_HEADER_SIZE) / 2;

/// bcdUSB for USB 2.0
pub const BCD_USB_2_0: u16 = 0x0200;

/// Class is declared per interface
pub const CLASS_PER_INTERFACE: u8 = 0x00;
pub const CLASS_MISCELLANEOUS: u8 = 0xEF;
pub const CLASS_VENDOR_SPECIFIC: u8 = 0xFF;
pub const SUBCLASS_VENDOR_SPECIFIC: u8 = 0xFF;
pub const PROTOCOL_VENDOR_SPECIFIC: u8 = 0xFF;
/// UVC video-streaming subclass, borrowed for the device subclass field
pub const UVC_SUBCLASS_VIDEOSTREAMING: u8 = 0x02;

/// bmAttributes bit 7 is reserved and must always be set [USB 2.0§9.6.3]
pub const CONFIG_ATTR_ONE: u8 = 0x80;
pub const CONFIG_ATTR_SELF_POWERED: u8 = 0x40;
pub const CONFIG_ATTR_REMOTE_WAKEUP: u8 = 0x20;

/// Largest wMaxPacketSize a high-speed bulk endpoint may declare [USB 2.0§5.8.3]
pub const BULK_MAX_PACKET_SIZE_HS: u16 = 512;

/// bRequest of a standard GET_DESCRIPTOR [USB 2.0§9.4.3]
pub const REQUEST_GET_DESCRIPTOR: u8 = 0x06;
/// bmRequestType bit 7: data stage flows device-to-host
pub const REQUEST_DIR_IN: u8 = 0x80;
/// bmRequestType bits 6:5
pub const REQUEST_TYPE_MASK: u8 = 0x60;
/// bmRequestType bits 4:0
pub const REQUEST_RECIPIENT_MASK: u8 = 0x1F;

/// English (United States)
pub const LANGID_ENGLISH_US: u16 = 0x0409;

/// bEndpointAddress bits 3:0
pub const ENDPOINT_NUMBER_MASK: u8 = 0x0F;
/// bmAttributes bits 1:0
pub const ENDPOINT_TRANSFER_TYPE_MASK: u8 = 0x03;

/// Human-readable name of a descriptor type code, used by dumps and logs.
pub fn descriptor_type_name(descriptor_type: u8) -> &'static str {
    match descriptor_type {
        DEVICE => "Device",
        CONFIGURATION => "Configuration",
        STRING => "String",
        INTERFACE => "Interface",
        ENDPOINT => "Endpoint",
        DEVICE_QUALIFIER => "Device Qualifier",
        OTHER_SPEED_CONFIGURATION => "Other Speed Configuration",
        _ => "Unknown",
    }
}

/// The fixed bLength of a descriptor type, or `None` where it varies (strings) or is unknown.
pub fn fixed_length(descriptor_type: u8) -> Option<usize> {
    match descriptor_type {
        DEVICE => Some(DEVICE_SIZE),
        CONFIGURATION | OTHER_SPEED_CONFIGURATION => Some(CONFIGURATION_SIZE),
        INTERFACE => Some(INTERFACE_SIZE),
        ENDPOINT => Some(ENDPOINT_SIZE),
        DEVICE_QUALIFIER => Some(QUALIFIER_SIZE),
        _ => None,
    }
}

/// Packs an endpoint number and direction into a bEndpointAddress byte.
pub fn endpoint_address(number: u8, direction: UsbDirection) -> u8 {
    u8::from(EndpointAddress::from_parts((number & ENDPOINT_NUMBER_MASK) as usize, direction))
}

pub fn direction_name(direction: UsbDirection) -> &'static str {
    match direction {
        UsbDirection::In => "IN",
        UsbDirection::Out => "OUT",
    }
}

pub fn transfer_type_name(attributes: u8) -> &'static str {
    match attributes & ENDPOINT_TRANSFER_TYPE_MASK {
        0b00 => "Control",
        0b01 => "Isochronous",
        0b10 => "Bulk",
        _ => "Interrupt",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_address_packing() {
        assert_eq!(endpoint_address(1, UsbDirection::In), 0x81);
        assert_eq!(endpoint_address(2, UsbDirection::Out), 0x02);
        assert_eq!(endpoint_address(3, UsbDirection::In), 0x83);
        assert_eq!(endpoint_address(4, UsbDirection::Out), 0x04);
    }

    #[test]
    fn bulk_is_bulk() {
        assert_eq!(transfer_type_name(EndpointType::Bulk as u8), "Bulk");
        assert_eq!(EndpointType::Bulk as u8, 0b10);
    }

    #[test]
    fn string_ceiling() {
        assert_eq!(STRING_MAX_UNITS, 126);
        assert_eq!(STRING_HEADER_SIZE + 2 * STRING_MAX_UNITS, 254);
    }
}

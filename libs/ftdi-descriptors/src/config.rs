//! Compile-time identity of the device: what it tells the host it is, and which endpoints
//! back each channel.

use crate::ch9::{self, UsbDirection};
use crate::ftdi;

/// Where the transfer engine expects the descriptor area in its address space.
pub const DEFAULT_DESCRIPTOR_AREA: u16 = 0x3E00;

/// EP1 has a single 64 byte buffer on the FX2, whatever the bus speed.
pub const FX2_EP1_MAX_PACKET_SIZE: u16 = 64;
/// The large FIFO endpoints.
pub const FX2_FIFO_MAX_PACKET_SIZE: u16 = ch9::BULK_MAX_PACKET_SIZE_HS;

pub const EP0_MAX_PACKET_SIZE: u8 = 64;

/// bDeviceProtocol. Unverified: this value was carried over without a record of why it was
/// chosen. Check it against the host driver's match rules before relying on it.
pub const DEVICE_PROTOCOL_UNVERIFIED: u8 = 0x01;

/// bMaxPower in 2 mA units (500 mA). Provisional, not the result of a power budget.
pub const MAX_POWER_PROVISIONAL: u8 = 250;

/// Largest packet the silicon can buffer for a given endpoint number.
pub fn endpoint_ceiling(number: u8) -> u16 {
    match number {
        1 => FX2_EP1_MAX_PACKET_SIZE,
        _ => FX2_FIFO_MAX_PACKET_SIZE,
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub number: u8,
    pub direction: UsbDirection,
    pub max_packet_size: u16,
}

impl EndpointConfig {
    pub fn address(&self) -> u8 { ch9::endpoint_address(self.number, self.direction) }
}

/// One channel of the emulated chip: one vendor-specific interface with an IN and an OUT
/// bulk endpoint.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub interface_string: u8,
    pub endpoints: [EndpointConfig; 2],
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    pub device_release: u16,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub max_packet_size0: u8,
    pub configuration_value: u8,
    pub attributes: u8,
    pub max_power: u8,
    pub manufacturer_string: u8,
    pub product_string: u8,
    pub serial_string: u8,
    pub channels: [ChannelConfig; 2],
}

impl DeviceIdentity {
    pub fn chip_type(&self) -> Option<ftdi::ChipType> { ftdi::ChipType::from_release(self.device_release) }

    pub fn with_ids(mut self, vendor_id: u16, product_id: u16, device_release: u16) -> DeviceIdentity {
        self.vendor_id = vendor_id;
        self.product_id = product_id;
        self.device_release = device_release;
        self
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointConfig> {
        self.channels.iter().flat_map(|channel| channel.endpoints.iter())
    }
}

const VENDOR_CHANNEL: ChannelConfig = ChannelConfig {
    class: ch9::CLASS_VENDOR_SPECIFIC,
    subclass: ch9::SUBCLASS_VENDOR_SPECIFIC,
    protocol: ch9::PROTOCOL_VENDOR_SPECIFIC,
    interface_string: 2,
    endpoints: [
        EndpointConfig { number: 0, direction: UsbDirection::In, max_packet_size: 0 },
        EndpointConfig { number: 0, direction: UsbDirection::Out, max_packet_size: 0 },
    ],
};

/// Enumerates as an FT2232H. Channel A sits on EP1 IN / EP2 OUT, so its IN side is capped at
/// EP1's buffer size; channel B gets EP3 IN / EP4 OUT at full high-speed size.
pub const FT2232H_IDENTITY: DeviceIdentity = DeviceIdentity {
    vendor_id: ftdi::FTDI_VID,
    product_id: ftdi::FT2232_PID,
    device_release: ftdi::FT2232H_RELEASE,
    class: ch9::CLASS_MISCELLANEOUS,
    subclass: ch9::UVC_SUBCLASS_VIDEOSTREAMING,
    protocol: DEVICE_PROTOCOL_UNVERIFIED,
    max_packet_size0: EP0_MAX_PACKET_SIZE,
    configuration_value: 1,
    attributes: ch9::CONFIG_ATTR_ONE,
    max_power: MAX_POWER_PROVISIONAL,
    manufacturer_string: 1,
    product_string: 2,
    serial_string: 3,
    channels: [
        ChannelConfig {
            endpoints: [
                EndpointConfig { number: 1, direction: UsbDirection::In, max_packet_size: FX2_EP1_MAX_PACKET_SIZE },
                EndpointConfig { number: 2, direction: UsbDirection::Out, max_packet_size: FX2_FIFO_MAX_PACKET_SIZE },
            ],
            ..VENDOR_CHANNEL
        },
        ChannelConfig {
            endpoints: [
                EndpointConfig { number: 3, direction: UsbDirection::In, max_packet_size: FX2_FIFO_MAX_PACKET_SIZE },
                EndpointConfig { number: 4, direction: UsbDirection::Out, max_packet_size: FX2_FIFO_MAX_PACKET_SIZE },
            ],
            ..VENDOR_CHANNEL
        },
    ],
};

//! Identity of the emulated FTDI part, and the rules a stock host driver applies to that
//! identity when it binds.
//!
//! Only the values the descriptor table itself has to agree with live here. The serial
//! engine request codes are the business of the transfer firmware.

use num_traits::FromPrimitive;

/// Future Technology Devices International
pub const FTDI_VID: u16 = 0x0403;
/// FT2232C/D/H share this product id; the device release tells them apart.
pub const FT2232_PID: u16 = 0x6010;
pub const FT4232H_PID: u16 = 0x6011;
pub const FT232H_PID: u16 = 0x6014;
/// bcdDevice reported by an FT2232H
pub const FT2232H_RELEASE: u16 = 0x0700;

/// Chip families, numbered as the host library numbers them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChipType {
    Am = 0,
    Bm = 1,
    Ft2232C = 2,
    R = 3,
    Ft2232H = 4,
    Ft4232H = 5,
    Ft232H = 6,
}

impl ChipType {
    /// Works out the chip family from bcdDevice, the way the host driver does after reading
    /// the device descriptor.
    pub fn from_release(bcd_device: u16) -> Option<ChipType> {
        match bcd_device {
            0x0200 => Some(ChipType::Am),
            0x0400 => Some(ChipType::Bm),
            0x0500 => Some(ChipType::Ft2232C),
            0x0600 => Some(ChipType::R),
            0x0700 => Some(ChipType::Ft2232H),
            0x0800 => Some(ChipType::Ft4232H),
            0x0900 => Some(ChipType::Ft232H),
            _ => None,
        }
    }

    /// Number of independent serial engines, and so USB interfaces, the driver expects.
    pub fn channel_count(&self) -> usize {
        match self {
            ChipType::Ft2232C | ChipType::Ft2232H => 2,
            ChipType::Ft4232H => 4,
            _ => 1,
        }
    }

    /// Only the H parts are high-speed.
    pub fn is_high_speed(&self) -> bool {
        matches!(self, ChipType::Ft2232H | ChipType::Ft4232H | ChipType::Ft232H)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChipType::Am => "FT8U232AM",
            ChipType::Bm => "FT232BM",
            ChipType::Ft2232C => "FT2232C",
            ChipType::R => "FT232R",
            ChipType::Ft2232H => "FT2232H",
            ChipType::Ft4232H => "FT4232H",
            ChipType::Ft232H => "FT232H",
        }
    }
}

/// Channel selector as host software addresses it. USB interface 0 is channel A.
#[derive(num_derive::FromPrimitive, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Interface {
    Any = 0,
    A = 1,
    B = 2,
    C = 3,
    D = 4,
}

impl Interface {
    pub fn for_interface_number(number: u8) -> Option<Interface> {
        FromPrimitive::from_u8(number.checked_add(1)?)
    }

    pub fn letter(&self) -> Option<char> {
        match self {
            Interface::Any => None,
            Interface::A => Some('A'),
            Interface::B => Some('B'),
            Interface::C => Some('C'),
            Interface::D => Some('D'),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_selects_chip() {
        assert_eq!(ChipType::from_release(FT2232H_RELEASE), Some(ChipType::Ft2232H));
        assert_eq!(ChipType::from_release(0x0500), Some(ChipType::Ft2232C));
        assert_eq!(ChipType::from_release(0x0701), None);
    }

    #[test]
    fn ft2232h_is_dual_channel_high_speed() {
        let chip = ChipType::Ft2232H;
        assert_eq!(chip.channel_count(), 2);
        assert!(chip.is_high_speed());
        assert!(!ChipType::Ft2232C.is_high_speed());
    }

    #[test]
    fn interface_numbers_map_to_channels() {
        assert_eq!(Interface::for_interface_number(0), Some(Interface::A));
        assert_eq!(Interface::for_interface_number(1), Some(Interface::B));
        assert_eq!(Interface::for_interface_number(4), None);
        assert_eq!(Interface::for_interface_number(255), None);
        assert_eq!(Interface::B.letter(), Some('B'));
    }
}

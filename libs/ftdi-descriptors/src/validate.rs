//! Consistency checks run over a parsed table. Each one is a rule a host, or the host
//! driver for the emulated chip, relies on; a table that breaks any of them is refused
//! before it is ever served.

use std::collections::HashSet;

use crate::ch9;
use crate::config;
use crate::ftdi::{self, ChipType};
use crate::parse::{ConfigurationTree, DescriptorImage};
use crate::Error;

/// Runs every check over `image`, stopping at the first violation.
pub fn check_image(image: &DescriptorImage) -> Result<(), Error> {
    if image.device.num_configurations != 1 {
        return Err(Error::ConfigurationCount(image.device.num_configurations));
    }
    if image.qualifier.num_configurations != 1 {
        return Err(Error::ConfigurationCount(image.qualifier.num_configurations));
    }
    check_configuration(&image.configuration)?;
    check_strings(image)?;
    check_chip(image.device.vendor_id, image.device.device_release, image.configuration.interfaces.len())
}

/// Structure of one configuration block: counts, numbering and endpoint rules.
pub fn check_configuration(tree: &ConfigurationTree) -> Result<(), Error> {
    let expected = tree.expected_total_length();
    if tree.configuration.total_length as usize != expected {
        return Err(Error::TotalLengthMismatch { declared: tree.configuration.total_length as usize, actual: expected });
    }
    if tree.configuration.num_interfaces as usize != tree.interfaces.len() {
        return Err(Error::InterfaceCountMismatch {
            declared: tree.configuration.num_interfaces,
            actual: tree.interfaces.len(),
        });
    }

    let mut seen = HashSet::new();
    for (position, branch) in tree.interfaces.iter().enumerate() {
        let interface = &branch.interface;
        if interface.interface_number as usize != position {
            return Err(Error::InterfaceNumbering { position, found: interface.interface_number });
        }
        if interface.alternate_setting != 0 {
            return Err(Error::AlternateSetting {
                interface: interface.interface_number,
                found: interface.alternate_setting,
            });
        }
        if interface.num_endpoints as usize != branch.endpoints.len() {
            return Err(Error::EndpointCountMismatch {
                interface: interface.interface_number,
                declared: interface.num_endpoints,
                actual: branch.endpoints.len(),
            });
        }

        for endpoint in branch.endpoints.iter() {
            if endpoint.number() == 0 {
                return Err(Error::ControlEndpoint);
            }
            // The direction bit is part of the address, so this covers (number, direction).
            if !seen.insert(endpoint.address) {
                return Err(Error::DuplicateEndpoint(endpoint.address));
            }
            if !endpoint.is_bulk() {
                return Err(Error::NotBulk { address: endpoint.address, attributes: endpoint.attributes });
            }
            if endpoint.interval != 0 {
                return Err(Error::NonzeroInterval { address: endpoint.address, interval: endpoint.interval });
            }
            let ceiling = config::endpoint_ceiling(endpoint.number()).min(ch9::BULK_MAX_PACKET_SIZE_HS);
            if endpoint.max_packet_size > ceiling {
                return Err(Error::PacketTooLarge {
                    address: endpoint.address,
                    size: endpoint.max_packet_size,
                    ceiling,
                });
            }
        }
    }
    Ok(())
}

/// Every nonzero string index a descriptor names must be present.
fn check_strings(image: &DescriptorImage) -> Result<(), Error> {
    let device = &image.device;
    let configuration = &image.configuration.configuration;
    let indices = [device.manufacturer_string, device.product_string, device.serial_string, configuration.configuration_string]
        .into_iter()
        .chain(image.configuration.interfaces.iter().map(|branch| branch.interface.interface_string));
    for index in indices {
        if index != 0 && image.string(index).is_none() {
            return Err(Error::MissingString(index));
        }
    }
    Ok(())
}

/// When the table claims to be an FTDI part, the release number has to name a chip the
/// host driver knows, and that chip must have as many channels as there are interfaces.
pub fn check_chip(vendor_id: u16, device_release: u16, interfaces: usize) -> Result<(), Error> {
    if vendor_id != ftdi::FTDI_VID {
        return Ok(());
    }
    let chip = ChipType::from_release(device_release).ok_or(Error::UnknownChip(device_release))?;
    if chip.channel_count() != interfaces {
        return Err(Error::ChannelCountMismatch { expected: chip.channel_count(), actual: interfaces });
    }
    log::debug!("identity is coherent with an {} ({} channels)", chip.name(), interfaces);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FT2232H_IDENTITY;
    use crate::strings::StringTable;
    use crate::table::DescriptorTable;

    fn image() -> DescriptorImage {
        let strings = StringTable::new(&["Maker", "Widget"], "serial").unwrap();
        DescriptorTable::build(&FT2232H_IDENTITY, &strings).unwrap().parse().unwrap()
    }

    #[test]
    fn built_in_identity_passes() {
        check_image(&image()).unwrap();
    }

    #[test]
    fn interrupt_endpoint_is_refused() {
        let mut image = image();
        image.configuration.interfaces[1].endpoints[0].attributes = 0x03;
        assert!(matches!(check_image(&image), Err(Error::NotBulk { address: 0x83, attributes: 0x03 })));
    }

    #[test]
    fn polling_bulk_endpoint_is_refused() {
        let mut image = image();
        image.configuration.interfaces[0].endpoints[1].interval = 1;
        assert!(matches!(check_image(&image), Err(Error::NonzeroInterval { address: 0x02, interval: 1 })));
    }

    #[test]
    fn endpoint_zero_is_refused() {
        let mut image = image();
        image.configuration.interfaces[0].endpoints[1].address = 0x00;
        assert!(matches!(check_image(&image), Err(Error::ControlEndpoint)));
    }

    #[test]
    fn interface_numbers_are_dense() {
        let mut image = image();
        image.configuration.interfaces[1].interface.interface_number = 2;
        assert!(matches!(check_image(&image), Err(Error::InterfaceNumbering { position: 1, found: 2 })));
    }

    #[test]
    fn alternate_settings_are_refused() {
        let mut image = image();
        image.configuration.interfaces[0].interface.alternate_setting = 1;
        assert!(matches!(check_image(&image), Err(Error::AlternateSetting { interface: 0, found: 1 })));
    }

    #[test]
    fn endpoint_count_must_match() {
        let mut image = image();
        image.configuration.interfaces[0].interface.num_endpoints = 3;
        assert!(matches!(
            check_image(&image),
            Err(Error::EndpointCountMismatch { interface: 0, declared: 3, actual: 2 })
        ));
    }

    #[test]
    fn interface_count_must_match() {
        let mut image = image();
        image.configuration.configuration.num_interfaces = 1;
        assert!(matches!(check_image(&image), Err(Error::InterfaceCountMismatch { declared: 1, actual: 2 })));
    }

    #[test]
    fn single_configuration_only() {
        let mut image = image();
        image.qualifier.num_configurations = 2;
        assert!(matches!(check_image(&image), Err(Error::ConfigurationCount(2))));
    }

    #[test]
    fn chip_must_be_known() {
        assert!(matches!(check_chip(ftdi::FTDI_VID, 0x1234, 2), Err(Error::UnknownChip(0x1234))));
        assert!(matches!(
            check_chip(ftdi::FTDI_VID, 0x0800, 2),
            Err(Error::ChannelCountMismatch { expected: 4, actual: 2 })
        ));
        check_chip(0x1209, 0x1234, 2).unwrap();
    }
}

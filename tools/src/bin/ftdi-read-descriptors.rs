#[macro_use]
extern crate clap;

use std::error::Error;

use clap::{App, Arg};

use ftdi_descriptor_tools::image::{checksum, read_image};
use ftdi_descriptor_tools::utils::parse_u16;
use ftdi_descriptors::config::DEFAULT_DESCRIPTOR_AREA;
use ftdi_descriptors::ftdi::{ChipType, Interface};
use ftdi_descriptors::validate;
use ftdi_descriptors::{Block, DescriptorImage};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let matches = App::new("FTDI Descriptor Reader")
        .version(crate_version!())
        .about("Parse a descriptor area image the way a host would and check it")
        .arg(
            Arg::with_name("base")
                .short("b")
                .long("base")
                .takes_value(true)
                .value_name("ADDRESS")
                .help("Address the descriptor area is loaded at"),
        )
        .arg(
            Arg::with_name("input")
                .value_name("INPUT")
                .required(true)
                .help("Descriptor area image"),
        )
        .get_matches();

    let base = match matches.value_of("base") {
        Some(base) => parse_u16(base)?,
        None => DEFAULT_DESCRIPTOR_AREA,
    };
    let input = matches.value_of("input").unwrap_or("descriptors.bin");
    let bytes = read_image(input)?;
    println!("{}: {} bytes, CRC16 {:04x}", input, bytes.len(), checksum(&bytes));

    let image = DescriptorImage::parse(&bytes)?;
    print!("{}", image);

    println!("Blocks:");
    for block in Block::ALL.iter() {
        let region = image.region(*block);
        let address = base as usize + region.offset;
        let aligned = if address % 2 == 0 { "" } else { "  (misaligned)" };
        println!("    {:<10} {:04x} {:3} bytes{}", block.name(), address, region.length, aligned);
    }

    match ChipType::from_release(image.device.device_release) {
        Some(chip) => println!("bcdDevice {:04x} binds as {}", image.device.device_release, chip.name()),
        None => println!("bcdDevice {:04x} names no FTDI chip", image.device.device_release),
    }

    for branch in image.configuration.interfaces.iter() {
        let number = branch.interface.interface_number;
        match Interface::for_interface_number(number).and_then(|i| i.letter()) {
            Some(letter) => println!("    interface {} is channel {}", number, letter),
            None => println!("    interface {} has no channel", number),
        }
    }

    match validate::check_image(&image) {
        Ok(()) => println!("Consistency checks: OK"),
        Err(e) => {
            println!("Consistency checks: FAIL ({})", e);
            std::process::exit(1);
        }
    }
    Ok(())
}

#[macro_use]
extern crate clap;

use std::error::Error;

use clap::{App, Arg};

use ftdi_descriptor_tools::image::{checksum, write_image, HexDump};
use ftdi_descriptor_tools::utils::{git_describe, parse_u16};
use ftdi_descriptors::config::DEFAULT_DESCRIPTOR_AREA;
use ftdi_descriptors::strings::{serial_number, DEFAULT_MANUFACTURER, DEFAULT_PRODUCT, GIT_DESCRIBE};
use ftdi_descriptors::{DescriptorTable, StringTable, FT2232H_IDENTITY};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let matches = App::new("FTDI Descriptor Builder")
        .version(crate_version!())
        .about("Lay out the USB descriptor area for the dual-channel bulk bridge")
        .arg(
            Arg::with_name("vid")
                .long("vid")
                .takes_value(true)
                .value_name("VID")
                .help("idVendor (defaults to FTDI's)"),
        )
        .arg(
            Arg::with_name("pid")
                .long("pid")
                .takes_value(true)
                .value_name("PID")
                .help("idProduct (defaults to the FT2232 product id)"),
        )
        .arg(
            Arg::with_name("release")
                .long("release")
                .takes_value(true)
                .value_name("BCD_DEVICE")
                .help("bcdDevice; an FTDI host driver picks the chip type from this"),
        )
        .arg(
            Arg::with_name("base")
                .short("b")
                .long("base")
                .takes_value(true)
                .value_name("ADDRESS")
                .help("Address the descriptor area is loaded at"),
        )
        .arg(
            Arg::with_name("string")
                .short("s")
                .long("string")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .help("String descriptor, in index order starting at 1"),
        )
        .arg(
            Arg::with_name("serial")
                .long("serial")
                .takes_value(true)
                .conflicts_with("git-describe")
                .help("Serial number string, used verbatim"),
        )
        .arg(
            Arg::with_name("git-describe")
                .long("git-describe")
                .takes_value(true)
                .help("Revision to put in the serial number instead of asking git"),
        )
        .arg(
            Arg::with_name("output")
                .value_name("OUTPUT")
                .required(true)
                .help("File to write the descriptor area to"),
        )
        .get_matches();

    let mut identity = FT2232H_IDENTITY;
    if let Some(vid) = matches.value_of("vid") {
        identity.vendor_id = parse_u16(vid)?;
    }
    if let Some(pid) = matches.value_of("pid") {
        identity.product_id = parse_u16(pid)?;
    }
    if let Some(release) = matches.value_of("release") {
        identity.device_release = parse_u16(release)?;
    }
    let base = match matches.value_of("base") {
        Some(base) => parse_u16(base)?,
        None => DEFAULT_DESCRIPTOR_AREA,
    };

    let strings: Vec<&str> = match matches.values_of("string") {
        Some(values) => values.collect(),
        None => vec![DEFAULT_MANUFACTURER, DEFAULT_PRODUCT],
    };
    let serial = match matches.value_of("serial") {
        Some(serial) => serial.to_owned(),
        None => {
            let describe = match matches.value_of("git-describe") {
                Some(describe) => describe.to_owned(),
                None => git_describe().unwrap_or_else(|| GIT_DESCRIBE.to_owned()),
            };
            serial_number(&describe)
        }
    };
    let strings = StringTable::new(&strings[..], &serial)?;
    identity.serial_string = strings.serial_index();
    print!("{}", strings);

    let table = DescriptorTable::build_at(&identity, &strings, base)?;
    print!("{}", table);
    print!("{}", HexDump { base, bytes: table.as_bytes() });

    let output = matches.value_of("output").unwrap_or("descriptors.bin");
    write_image(output, table.as_bytes())?;
    println!("Wrote {} bytes to {} (CRC16 {:04x})", table.len(), output, checksum(table.as_bytes()));
    Ok(())
}

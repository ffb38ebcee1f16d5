extern crate log;

pub mod image;
pub mod utils;

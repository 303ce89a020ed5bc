pub mod driver;
pub mod error;
pub mod hid_report;
pub mod joystick;
pub mod rumble;
pub mod spi;
pub mod status;
pub mod subcommand;
pub mod transport;

#[cfg(test)]
pub(crate) mod hid_report_test;
#[cfg(test)]
pub(crate) mod spi_test;

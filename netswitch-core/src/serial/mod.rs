//! Serial link to the scanner board: device discovery, line framing and the
//! `serialport`-backed channel.

mod discovery;
mod framing;
mod port;

pub use discovery::find_device;
pub use framing::{FASTEST_PREFIX, SerialLine, encode_snapshot};
pub use port::SerialPortChannel;

#[cfg(test)]
pub(crate) use framing::decode_snapshot;

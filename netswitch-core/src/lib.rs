//! Core library for the fastest-network switcher.
//! This crate defines the data model, the traits (interfaces) for every host
//! collaborator, and the two loops that keep a serial-attached Wi-Fi scanner
//! in sync with the host: the credential reconciler and the switch listener.

pub mod backends;
pub mod config;
pub mod credentials;
pub mod listener;
pub mod reconciler;
pub mod serial;
pub mod session;
pub mod traits;

// Define a shared Error and Result type for the entire crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// No serial device, or nothing worth sending at startup.
    #[error("Discovery failed: {0}")]
    Discovery(String),

    #[error("Credential record '{record}' unusable: {reason}")]
    CredentialRead { record: String, reason: String },

    #[error("Serial transport error: {0}")]
    Transport(String),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Switch to '{ssid}' failed: {reason}")]
    Switch { ssid: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// A specialized `Result` type for this crate's operations.
pub type Result<T> = std::result::Result<T, Error>;

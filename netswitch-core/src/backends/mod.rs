pub mod keyfile;
pub mod nmcli;
pub mod utils;

#[cfg(test)]
pub mod mock;

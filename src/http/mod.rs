pub mod error;
pub mod server;

#[cfg(test)]
pub(crate) mod stub;

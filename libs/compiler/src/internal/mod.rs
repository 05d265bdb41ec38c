pub mod config;
pub mod errors;
pub mod path;
pub(crate) mod solc;

pub mod config;
pub mod errors;
pub mod path;
pub mod settings;
pub mod solc;

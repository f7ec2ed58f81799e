// File I/O operations

pub mod config;
pub mod error;
pub mod native;

pub use error::PersistError;

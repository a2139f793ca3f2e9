pub mod cli;
pub mod db;
pub mod settings;

mod error;

pub use error::Error;

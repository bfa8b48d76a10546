//! Indoor Route - Application Library
//!
//! This is the command-line crate that wires the routing library to argument
//! parsing, logging and output formatting.

mod app;
pub mod logging;

pub use app::settings::{QueryPoint, Settings};
pub use app::{CliError, execute, run, write_error};

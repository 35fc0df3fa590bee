//! Configuration loading and parsing.

mod reader;

pub use reader::{preprocess_line, Config, ConfigError};

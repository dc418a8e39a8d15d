pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod server;
pub mod worker;

pub use error::{Error, Result};

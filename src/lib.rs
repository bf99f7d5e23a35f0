#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/", "README.md"))]
#![deny(missing_docs)]

pub mod codec;
mod dither;
mod error;
pub mod pipeline;
pub mod transport;

pub use error::{Error, Result, TransportError};

#![doc = include_str!("../../README.md")]
#![forbid(unsafe_code)]
#![deny(missing_debug_implementations, nonstandard_style)]
#![warn(unreachable_pub)]

#[macro_use]
extern crate serde_derive;

pub mod builder;
pub mod cli;
pub mod config;
pub mod devbox;
pub mod error;
pub mod exec;
pub mod hardware;
pub mod keys;
pub mod observer;
pub mod remote;
pub mod scp;
pub mod software;
pub mod ssh;

#[cfg(test)]
mod testing;

pub use devbox::{DevBox, DevBoxError};
pub use error::BoxError;

//! Client for the local HTTP API of Remo infrared transceivers

pub mod config;
pub mod remo;
pub mod sim;

pub use remo::{Error, ErrorKind, IrSignal, LocalClient, Result};

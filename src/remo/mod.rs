//! Remo local API
//!
//! The device exposes a single resource, `/messages`, over plain HTTP on the
//! local network:
//!
//! - `GET /messages` returns the newest IR signal the device received
//! - `POST /messages` makes the device transmit the posted signal
//!
//! Both require `X-Requested-With` to be set or the firmware refuses the
//! request.

pub mod error;
pub mod local;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use local::LocalClient;
pub use types::IrSignal;

//! Bit-exact LoRaWAN PHYPayload and MAC command codec.
//!
//! The codec only moves bytes. MIC computation, key derivation and payload
//! encryption happen outside of it, on the buffers it produces and accepts.

pub mod config;
pub mod lorawan;

pub use lorawan::encoder::{marshal, FrameBuilder};
pub use lorawan::mac::{marshal_mac, unmarshal_mac, MacCommand};
pub use lorawan::version::{MacVersion, PhyVersion};
pub use lorawan::{unmarshal, Error, Message, Payload, Result};

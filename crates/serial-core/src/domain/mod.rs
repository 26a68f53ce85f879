//! Domain types shared by the serial reader and the bridge.
//!
//! Nothing in this module performs I/O.

pub mod reading;
pub mod settings;

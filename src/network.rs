//! Representation and handling of And-Inverter-Graphs

mod gate;
mod network;
mod signal;
pub mod stats;

pub use gate::{Gate, GateKind, GroupId};
pub use network::Network;
pub use signal::Signal;

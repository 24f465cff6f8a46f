//! Structural optimization of And-Inverter-Graphs
//!
//! Both passes work in place and keep the network consistent: consumers of a removed gate are
//! connected to its replacement before it is deleted.

mod rewrite;
mod strash;

pub use rewrite::{optimize, rewrite};
pub use strash::strash;

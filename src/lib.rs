//! Reduction of combinational And-Inverter-Graphs
//!
//! This crate removes redundancy from an And-Inverter-Graph read from an ASCII AIGER file, while
//! preserving the function of every output.
//!
//! # Usage
//!
//! Aigfraig features [structural hashing](https://en.wikipedia.org/wiki/And-inverter_graph),
//! constant propagation and functional reduction (FRAIG): random simulation groups the gates that may
//! be equivalent, and a SAT solver proves or refutes each candidate equivalence.
//!
//! ```bash
//! # Show available commands
//! # At the moment, only .aag files are supported
//! aigfraig help
//! # Show the statistics, undefined fanins and unused gates of a network
//! aigfraig show mydesign.aag
//! # Optimize the logic
//! aigfraig opt mydesign.aag -o optimized.aag
//! # Simulate patterns, and report the gates that are not distinguished
//! aigfraig sim optimized.aag -i patterns.txt --log sim.log
//! ```
//!
//! Logging is controlled with the `RUST_LOG` environment variable, for example `RUST_LOG=debug`
//! to show every merge.
//!
//! # Development
//!
//! ## Datastructures
//!
//! `Network` is an And-Inverter-Graph: its gates are primary inputs, primary outputs, two-input And
//! gates, and the constant. Inverters are implicit, occupying just one bit in `Signal`.
//! Gates are stored in an arena indexed by their id, and edges are stored on both ends.
//! Gates that are referenced but never defined are kept as placeholders.
//!
//! For example, here is an Xor built from And gates:
//! ```
//! # use aigfraig::Network;
//! let mut net = Network::new();
//! let i0 = net.add_input();
//! let i1 = net.add_input();
//! let a = net.and(i0, !i1);
//! let b = net.and(!i0, i1);
//! let x = net.or(a, b);
//! net.add_output(x);
//! net.rebuild_order();
//! net.check();
//! ```
//!
//! Unlike a hashed AIG, the network does not simplify gates when they are created: the passes in
//! [`optim`] and [`equiv`] are applied explicitly, and each rebuilds the topological order.

#![warn(missing_docs)]

pub mod equiv;
pub mod io;
pub mod network;
pub mod optim;
pub mod sim;

pub use network::{stats, Gate, GateKind, Network, Signal};

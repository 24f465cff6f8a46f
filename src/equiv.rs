//! Detection and merging of functionally equivalent gates
//!
//! Random simulation splits the gates into groups of candidate equivalences. Each candidate is
//! then proven or refuted with a SAT solver, refuted candidates giving new patterns to simulate.
//!
//! ```
//! # use aigfraig::Network;
//! use aigfraig::equiv::{fraig, random_simulation, FecPartition, FraigConfig, MinisatOracle, SimPolicy};
//! use rand::rngs::SmallRng;
//! use rand::SeedableRng;
//!
//! let mut aig = Network::new();
//! let a = aig.add_input();
//! let b = aig.add_input();
//! let x = aig.and(a, b);
//! let y = aig.or(!a, !b);
//! aig.add_output(x);
//! aig.add_output(y);
//! aig.rebuild_order();
//!
//! let mut partition = FecPartition::new();
//! let mut rng = SmallRng::seed_from_u64(0);
//! random_simulation(&mut aig, &mut partition, &SimPolicy::default(), &mut rng);
//! let mut oracle = MinisatOracle::new();
//! let stats = fraig(&mut aig, &mut partition, &mut oracle, &FraigConfig::default()).unwrap();
//! assert_eq!(stats.merges, 1);
//! assert_eq!(aig.output(1), !aig.output(0));
//! ```

mod fec;
mod fraig;
pub(crate) mod oracle;

pub use fec::{random_simulation, FecGroup, FecPartition, SimPolicy};
pub use fraig::{apply_merges, fraig, prove_equivalences, FraigConfig, FraigStats, MergeRecord};
pub use oracle::{KissatOracle, MinisatOracle, OracleError, ProofOracle};

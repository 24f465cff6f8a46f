//! Functionally equivalent candidate (FEC) groups, refined by simulation

use std::collections::VecDeque;
use std::fmt;

use fxhash::FxHashMap;
use itertools::Itertools;
use kdam::{tqdm, BarExt};
use rand::Rng;

use crate::network::GroupId;
use crate::sim::{random_words, simulate_words};
use crate::{Network, Signal};

/// A set of gates that had the same simulation values so far, up to complementation
///
/// The first member is the representative and is never inverted. The inversion of the other members
/// is relative to the representative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FecGroup {
    pub(crate) id: GroupId,
    pub(crate) members: Vec<Signal>,
}

impl FecGroup {
    /// Identifier of the group, as stored on its gates
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// Members of the group, representative first
    pub fn members(&self) -> &[Signal] {
        &self.members
    }

    /// Id of the representative gate
    pub fn representative(&self) -> u32 {
        self.members[0].gate()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the group has no member
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns true if there is nothing left to prove in this group
    pub fn is_resolved(&self) -> bool {
        self.members.len() < 2
    }
}

impl fmt::Display for FecGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.members.iter().join(" "))
    }
}

/// Partition of the gates into groups of candidate equivalences
///
/// Groups are kept in a queue: refinement pops every group from the front and pushes its
/// non-trivial parts to the back. Each member gate keeps the id of its group.
#[derive(Debug, Clone, Default)]
pub struct FecPartition {
    pub(crate) groups: VecDeque<FecGroup>,
    next_id: GroupId,
    pub(crate) fraiged: bool,
}

impl FecPartition {
    /// Create an empty partition
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of groups
    pub fn nb_groups(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if there are no groups
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterate over the groups, in queue order
    pub fn groups(&self) -> impl Iterator<Item = &FecGroup> {
        self.groups.iter()
    }

    /// Returns true once equivalences were proven and merged; the partition is not seeded again
    pub fn is_fraiged(&self) -> bool {
        self.fraiged
    }

    pub(crate) fn push_group(&mut self, members: Vec<Signal>) {
        let id = self.next_id;
        self.next_id += 1;
        self.groups.push_back(FecGroup { id, members });
    }

    /// Create the initial group with the constant and every And gate in topological order
    ///
    /// Does nothing if there are groups already or if the network was already fraiged.
    pub fn seed(&mut self, aig: &mut Network) {
        if !self.groups.is_empty() || self.fraiged {
            return;
        }
        let mut members = vec![Signal::zero()];
        members.extend(
            aig.order()
                .iter()
                .filter(|id| aig.gate(**id).is_and())
                .map(|id| Signal::from_gate(*id)),
        );
        self.push_group(members);
        self.update_back_refs(aig);
    }

    /// Split the groups according to the current simulation values
    ///
    /// Members are bucketed by their simulation word, a word and its complement falling in the same
    /// bucket. Buckets are pushed in the order they are first seen, and singletons are dropped.
    /// Returns the new number of groups.
    pub fn refine(&mut self, aig: &mut Network) -> usize {
        let nb = self.groups.len();
        for _ in 0..nb {
            let Some(group) = self.groups.pop_front() else {
                break;
            };
            let mut index = FxHashMap::<u64, usize>::default();
            let mut buckets: Vec<Vec<Signal>> = Vec::new();
            for m in group.members {
                let s = m.without_inversion();
                let w = aig.gate(s.gate()).value();
                if let Some(&b) = index.get(&w) {
                    buckets[b].push(s);
                } else if let Some(&b) = index.get(&!w) {
                    buckets[b].push(!s);
                } else {
                    index.insert(w, buckets.len());
                    buckets.push(vec![s]);
                }
            }
            for b in buckets {
                if b.len() >= 2 {
                    self.push_group(b);
                }
            }
        }
        self.update_back_refs(aig);
        self.groups.len()
    }

    /// Remove every group
    pub fn clear(&mut self, aig: &mut Network) {
        self.groups.clear();
        self.update_back_refs(aig);
    }

    /// Store on each gate the id of its group
    pub(crate) fn update_back_refs(&self, aig: &mut Network) {
        for g in aig.gates_mut() {
            g.fec = None;
        }
        for group in &self.groups {
            for m in &group.members {
                aig.gate_mut(m.gate()).fec = Some(group.id);
            }
        }
    }

    /// Get the group of a gate, if any
    pub fn group_of(&self, aig: &Network, id: u32) -> Option<&FecGroup> {
        let group_id = aig.get_gate(id)?.fec_group()?;
        self.groups.iter().find(|g| g.id == group_id)
    }

    /// Other members of the group of a gate, with their inversion relative to this gate
    pub fn equivalent_gates(&self, aig: &Network, id: u32) -> Vec<Signal> {
        let Some(group) = self.group_of(aig, id) else {
            return Vec::new();
        };
        let Some(own) = group.members.iter().find(|m| m.gate() == id) else {
            return Vec::new();
        };
        group
            .members
            .iter()
            .filter(|m| m.gate() != id)
            .map(|m| *m ^ own.is_inverted())
            .collect()
    }
}

impl fmt::Display for FecPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, g) in self.groups.iter().enumerate() {
            writeln!(f, "[{i}] {g}")?;
        }
        Ok(())
    }
}

/// Stopping rule for random simulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimPolicy {
    /// Minimum number of rounds of 64 patterns
    pub min_rounds: usize,
    /// Maximum number of rounds of 64 patterns
    pub max_rounds: usize,
    /// Rounds without change in the number of groups before stopping, as (input count bound, rounds)
    pub stability: [(usize, usize); 3],
    /// Rounds without change before stopping, for larger input counts
    pub max_stability: usize,
}

impl Default for SimPolicy {
    fn default() -> Self {
        SimPolicy {
            min_rounds: 4,
            max_rounds: 8192,
            stability: [(20, 3), (100, 10), (1000, 50)],
            max_stability: 100,
        }
    }
}

impl SimPolicy {
    /// Number of stable rounds required before stopping, for a given number of inputs
    pub fn stable_rounds(&self, nb_inputs: usize) -> usize {
        self.stability
            .iter()
            .find(|(bound, _)| nb_inputs < *bound)
            .map(|(_, rounds)| *rounds)
            .unwrap_or(self.max_stability)
    }
}

/// Refine the partition with random patterns until the number of groups stabilizes
///
/// The partition is seeded first if needed. Returns the number of rounds of 64 patterns simulated.
pub fn random_simulation<R: Rng>(
    aig: &mut Network,
    partition: &mut FecPartition,
    policy: &SimPolicy,
    rng: &mut R,
) -> usize {
    if partition.is_fraiged() {
        return 0;
    }
    partition.seed(aig);
    let max_same = policy.stable_rounds(aig.nb_inputs());
    let mut progress = tqdm!(total = policy.max_rounds);
    progress.set_description("Random simulation");
    let mut rounds = 0;
    let mut same = 0;
    let mut size = partition.nb_groups();
    while rounds < policy.min_rounds || (rounds < policy.max_rounds && same < max_same) {
        rounds += 1;
        let words = random_words(aig, rng);
        simulate_words(aig, &words);
        let prev_size = size;
        size = partition.refine(aig);
        if size == prev_size {
            same += 1;
        } else {
            same = 0;
        }
        progress.set_postfix(format!("groups={size}"));
        let _ = progress.update(1);
    }
    let _ = progress.write(format!(
        "{} patterns simulated, {} FEC groups",
        rounds * 64,
        size
    ));
    tracing::info!("Random simulation: {} patterns, {size} FEC groups", rounds * 64);
    rounds
}

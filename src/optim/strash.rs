//! Structural hashing: merge And gates that read the same pair of signals

use std::collections::hash_map::Entry;

use fxhash::FxHashMap;

use crate::{Network, Signal};

/// Order-independent key for the fanins of an And gate
///
/// Cantor pairing on the two literals, larger first, so that swapping the fanins gives the same key.
pub(crate) fn strash_key(a: Signal, b: Signal) -> u64 {
    let x = a.raw() as u64;
    let y = b.raw() as u64;
    let (hi, lo) = if x >= y { (x, y) } else { (y, x) };
    hi * (hi + 1) / 2 + lo
}

/// Merge structurally identical And gates
///
/// Gates are visited in topological order, and the first gate seen with a given pair of fanins is kept.
/// Since fanouts are rewired as the pass goes, duplicates of duplicates are merged in the same pass.
/// Returns the number of gates merged.
pub fn strash(aig: &mut Network) -> usize {
    let mut table = FxHashMap::<u64, u32>::default();
    let order = aig.order().to_vec();
    let mut merged = 0;
    for id in order {
        if !aig.contains(id) || !aig.gate(id).is_and() {
            continue;
        }
        let fanins = aig.gate(id).fanins();
        let key = strash_key(fanins[0], fanins[1]);
        match table.entry(key) {
            Entry::Occupied(e) => {
                let survivor = *e.get();
                tracing::debug!("Strashing: {survivor} merging {id}...");
                aig.replace(id, Signal::from_gate(survivor));
                merged += 1;
            }
            Entry::Vacant(e) => {
                e.insert(id);
            }
        }
    }
    if merged != 0 {
        aig.rebuild_order();
    }
    merged
}

//! Bit-parallel simulation of a network, 64 patterns at a time
//!
//! Simulation values are stored on the gates, where the equivalence engine reads them back.

mod parallel_sim;
mod patterns;

use crate::Network;

pub use parallel_sim::{output_words, random_words, simulate_words};
pub use patterns::{pack_patterns, read_patterns, write_sim_log, PatternBatch, PatternError};

/// Simulate a network on a list of patterns; return the output values for each pattern
pub fn simulate(aig: &mut Network, patterns: &[Vec<bool>]) -> Vec<Vec<bool>> {
    let mut ret = Vec::new();
    for batch in pack_patterns(patterns, aig.nb_inputs()) {
        simulate_words(aig, &batch.words);
        let outputs = output_words(aig);
        for k in 0..batch.count {
            ret.push(outputs.iter().map(|w| (w >> k) & 1 != 0).collect());
        }
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::simulate;
    use crate::Network;

    #[test]
    fn test_truth_table() {
        let mut aig = Network::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let x = aig.or(i0, !i1);
        aig.add_output(x);
        aig.add_output(!x);
        aig.rebuild_order();
        let patterns = vec![
            vec![false, false],
            vec![false, true],
            vec![true, false],
            vec![true, true],
        ];
        assert_eq!(
            simulate(&mut aig, &patterns),
            vec![
                vec![true, false],
                vec![false, true],
                vec![true, false],
                vec![true, false],
            ]
        );
    }

    #[test]
    fn test_many_patterns() {
        let mut aig = Network::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let x = aig.and(i0, i1);
        aig.add_output(x);
        aig.rebuild_order();
        let patterns: Vec<Vec<bool>> = (0..150).map(|i| vec![i % 3 == 0, i % 2 == 0]).collect();
        let res = simulate(&mut aig, &patterns);
        assert_eq!(res.len(), 150);
        for (i, r) in res.iter().enumerate() {
            assert_eq!(r[0], i % 6 == 0);
        }
    }
}

use rand::Rng;

use crate::network::GateKind;
use crate::{Network, Signal};

/// Convert the inversion to a word for bitwise operations
fn pol_to_word(s: Signal) -> u64 {
    let pol = s.raw() & 1;
    (!(pol as u64)).wrapping_add(1)
}

/// Simulation word of a signal, from the value stored on its gate
pub(crate) fn signal_value(aig: &Network, s: Signal) -> u64 {
    aig.gate(s.gate()).value ^ pol_to_word(s)
}

/// Simulate 64 patterns at once, storing one word per gate
///
/// Input words are given in input declaration order; bit k of each word belongs to pattern k.
/// Gates are evaluated in the cached topological order.
pub fn simulate_words(aig: &mut Network, input_words: &[u64]) {
    assert_eq!(
        input_words.len(),
        aig.nb_inputs(),
        "Expected one simulation word per input"
    );
    aig.gate_mut(0).value = 0;
    for (i, w) in input_words.iter().enumerate() {
        let id = aig.inputs()[i];
        aig.gate_mut(id).value = *w;
    }
    for i in 0..aig.order().len() {
        let id = aig.order()[i];
        let g = aig.gate(id);
        let value = match g.kind {
            GateKind::And => signal_value(aig, g.fanins[0]) & signal_value(aig, g.fanins[1]),
            GateKind::Output => signal_value(aig, g.fanins[0]),
            GateKind::Const | GateKind::Unresolved => 0,
            GateKind::Input => continue,
        };
        aig.gate_mut(id).value = value;
    }
}

/// Words currently stored on the outputs, in declaration order
pub fn output_words(aig: &Network) -> Vec<u64> {
    aig.outputs().iter().map(|o| aig.gate(*o).value).collect()
}

/// Generate one random word per input
pub fn random_words<R: Rng>(aig: &Network, rng: &mut R) -> Vec<u64> {
    (0..aig.nb_inputs()).map(|_| rng.gen::<u64>()).collect()
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::{output_words, random_words, simulate_words};
    use crate::{Network, Signal};

    #[test]
    fn test_basic() {
        let mut aig = Network::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let x0 = aig.and(i0, i1);
        let x1 = aig.and(!i0, i1);
        aig.add_output(x0);
        aig.add_output(!x1);
        aig.add_output(Signal::one());
        aig.rebuild_order();
        simulate_words(&mut aig, &[0b1100, 0b1010]);
        let out = output_words(&aig);
        assert_eq!(out[0], 0b1000);
        assert_eq!(out[1], !0b0010);
        assert_eq!(out[2], !0);
        assert_eq!(aig.gate(x1.gate()).value(), 0b0010);
    }

    #[test]
    fn test_deterministic() {
        let mut aig = Network::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let i2 = aig.add_input();
        let x0 = aig.and(i0, !i1);
        let x1 = aig.and(x0, i2);
        aig.add_output(!x1);
        aig.rebuild_order();

        let mut rng = SmallRng::seed_from_u64(1);
        let words = random_words(&aig, &mut rng);
        simulate_words(&mut aig, &words);
        let first: Vec<u64> = aig.gates().map(|g| g.value()).collect();

        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(random_words(&aig, &mut rng), words);
        simulate_words(&mut aig, &[0, 0, 0]);
        simulate_words(&mut aig, &words);
        let second: Vec<u64> = aig.gates().map(|g| g.value()).collect();
        assert_eq!(first, second);
        assert_eq!(output_words(&aig)[0], !(words[0] & !words[1] & words[2]));
    }
}

//! Local simplification of And gates using the constant gate

use crate::{Network, Signal};

/// Outcome of the local analysis of an And gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Simplification {
    /// Nothing to simplify
    Keep,
    /// The gate always evaluates to zero
    Zero,
    /// The gate computes the given signal
    Bypass(Signal),
}

/// Classify an And gate from its two fanins
///
/// Patterns are checked in this order: identical gates, constant first fanin, constant second fanin.
pub(crate) fn classify(a: Signal, b: Signal) -> Simplification {
    use Simplification::*;
    if a.gate() == b.gate() {
        if a == b {
            // x & x, including 1 & 1 and 0 & 0
            Bypass(a)
        } else {
            // x & !x
            Zero
        }
    } else if a.is_constant() {
        if a.is_inverted() {
            Bypass(b)
        } else {
            Zero
        }
    } else if b.is_constant() {
        if b.is_inverted() {
            Bypass(a)
        } else {
            Zero
        }
    } else {
        Keep
    }
}

/// Run one pass of constant propagation and trivial redundancy removal
///
/// Each And gate is visited once, in topological order. Simplified gates are removed and their
/// consumers are connected to the replacement signal. Returns the number of gates removed.
pub fn rewrite(aig: &mut Network) -> usize {
    let order = aig.order().to_vec();
    let original_ands = aig.nb_ands();
    for id in order {
        if !aig.contains(id) || !aig.gate(id).is_and() {
            continue;
        }
        let fanins = aig.gate(id).fanins();
        match classify(fanins[0], fanins[1]) {
            Simplification::Keep => (),
            Simplification::Zero => {
                tracing::debug!("Simplifying: 0 merging {id}...");
                aig.replace(id, Signal::zero());
            }
            Simplification::Bypass(s) => {
                tracing::debug!("Simplifying: {s} merging {id}...");
                aig.replace(id, s);
            }
        }
    }
    let removed = original_ands - aig.nb_ands();
    if removed != 0 {
        aig.rebuild_order();
    }
    aig.update_unused();
    aig.update_floating();
    removed
}

/// Run [`rewrite`] until no more gates can be simplified
///
/// Returns the total number of gates removed.
pub fn optimize(aig: &mut Network) -> usize {
    let mut total = 0;
    loop {
        let removed = rewrite(aig);
        if removed == 0 {
            break;
        }
        total += removed;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::{classify, optimize, rewrite, Simplification};
    use crate::network::GateKind;
    use crate::sim::simulate;
    use crate::{Network, Signal};

    #[test]
    fn test_classify() {
        use Simplification::*;
        let x = Signal::from_gate(3);
        let y = Signal::from_gate(4);
        let zero = Signal::zero();
        let one = Signal::one();
        assert_eq!(classify(x, x), Bypass(x));
        assert_eq!(classify(!x, !x), Bypass(!x));
        assert_eq!(classify(x, !x), Zero);
        assert_eq!(classify(!x, x), Zero);
        assert_eq!(classify(zero, x), Zero);
        assert_eq!(classify(x, zero), Zero);
        assert_eq!(classify(one, !x), Bypass(!x));
        assert_eq!(classify(y, one), Bypass(y));
        assert_eq!(classify(one, one), Bypass(one));
        assert_eq!(classify(zero, one), Zero);
        assert_eq!(classify(x, y), Keep);
    }

    #[test]
    fn test_complement_to_zero() {
        let mut aig = Network::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let x0 = aig.and(i0, !i0);
        let x1 = aig.and(x0, i1);
        let o0 = aig.add_output(!x0);
        aig.add_output(x1);
        aig.rebuild_order();
        assert_eq!(rewrite(&mut aig), 2);
        aig.check();
        assert_eq!(aig.nb_ands(), 0);
        assert_eq!(aig.output(0), Signal::one());
        assert_eq!(aig.output(1), Signal::zero());
        assert_eq!(aig.gate(0).fanouts().len(), 2);
        assert!(aig.gate(o0).fanins()[0].is_constant());
    }

    #[test]
    fn test_bypass_to_undefined() {
        let mut aig = Network::new();
        let i0 = aig.add_input();
        let u = Signal::from_gate(aig.create(GateKind::Unresolved, Vec::new()));
        let x0 = aig.and(u, u);
        let x1 = aig.and(x0, i0);
        aig.add_output(x1);
        aig.rebuild_order();
        aig.update_floating();
        assert_eq!(aig.floating_gates().iter().copied().collect::<Vec<_>>(), vec![x0.gate()]);
        assert_eq!(rewrite(&mut aig), 1);
        aig.check();
        assert_eq!(aig.gate(x1.gate()).fanins(), &[u, i0]);
        assert_eq!(aig.floating_gates().iter().copied().collect::<Vec<_>>(), vec![x1.gate()]);
    }

    #[test]
    fn test_bypass() {
        let mut aig = Network::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let x0 = aig.and(i0, i0);
        let x1 = aig.and(Signal::one(), !x0);
        let x2 = aig.and(x1, i1);
        aig.add_output(!x2);
        aig.rebuild_order();
        assert_eq!(rewrite(&mut aig), 2);
        aig.check();
        assert_eq!(aig.nb_ands(), 1);
        assert_eq!(aig.gate(x2.gate()).fanins(), &[!i0, i1]);
        assert_eq!(rewrite(&mut aig), 0);
    }

    #[test]
    fn test_preserves_function() {
        let mut aig = Network::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let x0 = aig.and(i0, Signal::one());
        let x1 = aig.and(x0, !i1);
        let x2 = aig.and(x1, x1);
        let x3 = aig.and(x2, Signal::zero());
        aig.add_output(x2);
        aig.add_output(!x3);
        aig.rebuild_order();
        let patterns = vec![
            vec![false, false],
            vec![true, false],
            vec![false, true],
            vec![true, true],
        ];
        let before = simulate(&mut aig, &patterns);
        rewrite(&mut aig);
        aig.check();
        assert_eq!(aig.nb_ands(), 1);
        assert_eq!(simulate(&mut aig, &patterns), before);
    }

    #[test]
    fn test_fixpoint() {
        let mut aig = Network::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let x0 = aig.and(i0, i1);
        let x1 = aig.and(x0, !x0);
        let x2 = aig.and(!x1, i1);
        aig.add_output(x2);
        aig.rebuild_order();
        assert_eq!(optimize(&mut aig), 2);
        aig.check();
        assert_eq!(aig.nb_ands(), 1);
        assert_eq!(aig.output(0), i1);
        assert_eq!(optimize(&mut aig), 0);
    }
}

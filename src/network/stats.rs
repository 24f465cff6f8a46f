//! Compute circuit statistics
//!
//! ```
//! # use aigfraig::Network;
//! # let aig = Network::new();
//! use aigfraig::network::stats::stats;
//! let stats = stats(&aig);
//!
//! // Check that there is no And gate
//! assert_eq!(stats.nb_and, 0);
//!
//! // Show the statistics
//! println!("{}", stats);
//! ```

use std::fmt;

use itertools::Itertools;

use crate::network::GateKind;
use crate::Network;

/// Number of inputs, outputs and gates in a network
#[derive(Clone, Debug)]
pub struct NetworkStats {
    /// Number of inputs
    pub nb_inputs: usize,
    /// Number of outputs
    pub nb_outputs: usize,
    /// Number of And gates
    pub nb_and: usize,
    /// Number of undefined placeholder gates
    pub nb_unresolved: usize,
    /// Gates with a floating fanin
    pub floating: Vec<u32>,
    /// Gates defined but not used
    pub unused: Vec<u32>,
}

impl NetworkStats {
    /// Total number of inputs, outputs and And gates
    pub fn nb_total(&self) -> usize {
        self.nb_inputs + self.nb_outputs + self.nb_and
    }
}

impl fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Circuit Statistics")?;
        writeln!(f, "==================")?;
        writeln!(f, "  PI{:>12}", self.nb_inputs)?;
        writeln!(f, "  PO{:>12}", self.nb_outputs)?;
        writeln!(f, "  AIG{:>11}", self.nb_and)?;
        writeln!(f, "------------------")?;
        writeln!(f, "  Total{:>9}", self.nb_total())?;
        if self.nb_unresolved != 0 {
            writeln!(f, "  Undefined gates: {}", self.nb_unresolved)?;
        }
        if !self.floating.is_empty() {
            writeln!(
                f,
                "Gates with floating fanin(s): {}",
                self.floating.iter().join(" ")
            )?;
        }
        if !self.unused.is_empty() {
            writeln!(
                f,
                "Gates defined but not used  : {}",
                self.unused.iter().join(" ")
            )?;
        }
        fmt::Result::Ok(())
    }
}

/// Compute the statistics of the network
pub fn stats(a: &Network) -> NetworkStats {
    NetworkStats {
        nb_inputs: a.nb_inputs(),
        nb_outputs: a.nb_outputs(),
        nb_and: a.nb_ands(),
        nb_unresolved: a
            .gates()
            .filter(|g| g.kind() == GateKind::Unresolved)
            .count(),
        floating: a.floating_gates().iter().copied().collect(),
        unused: a.unused_gates().iter().copied().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::stats;
    use crate::Network;

    #[test]
    fn test_stats() {
        let mut aig = Network::new();
        let i0 = aig.add_input();
        let i1 = aig.add_input();
        let i2 = aig.add_input();
        let x0 = aig.and(i0, i1);
        aig.add_output(x0);
        aig.rebuild_order();
        aig.update_unused();
        let s = stats(&aig);
        assert_eq!(s.nb_inputs, 3);
        assert_eq!(s.nb_outputs, 1);
        assert_eq!(s.nb_and, 1);
        assert_eq!(s.nb_total(), 5);
        assert_eq!(s.unused, vec![i2.gate()]);
        let text = s.to_string();
        assert!(text.contains("  AIG          1"));
        assert!(text.contains("Gates defined but not used  : 3"));
    }
}

//! Functionally reduced AIG: prove candidate equivalences with SAT and merge the equivalent gates

use std::fmt;

use fxhash::FxHashMap;
use kdam::{tqdm, BarExt};
use rustsat::types::Var;

use crate::equiv::{FecPartition, OracleError, ProofOracle};
use crate::network::GateKind;
use crate::sim::{pack_patterns, simulate_words};
use crate::{Network, Signal};

/// Limits of the prove and merge loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FraigConfig {
    /// Give up once this many counterexamples were found since the last merge
    pub effort_limit: usize,
    /// Maximum number of counterexamples collected before simulating them
    pub max_counterexamples: usize,
}

impl Default for FraigConfig {
    fn default() -> Self {
        FraigConfig {
            effort_limit: 2000,
            max_counterexamples: 64,
        }
    }
}

/// A proven equivalence: `casualty` computes `survivor`, inverted if `inverted` is set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRecord {
    /// Gate that is kept
    pub survivor: u32,
    /// Gate that is replaced
    pub casualty: u32,
    /// Whether the casualty is the complement of the survivor
    pub inverted: bool,
}

/// Statistics of a run of the prove and merge loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FraigStats {
    /// Number of rounds, each followed by a simulation of the counterexamples
    pub rounds: usize,
    /// Number of SAT queries
    pub queries: usize,
    /// Number of queries that found a counterexample
    pub sat: usize,
    /// Number of queries that proved an equivalence
    pub unsat: usize,
    /// Number of gates merged
    pub merges: usize,
    /// Whether the effort limit was reached before all groups were resolved
    pub gave_up: bool,
}

impl fmt::Display for FraigStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Fraig: {} merges in {} rounds, {} SAT queries ({} SAT, {} UNSAT)",
            self.merges, self.rounds, self.queries, self.sat, self.unsat
        )?;
        if self.gave_up {
            write!(f, ", gave up")?;
        }
        Ok(())
    }
}

/// Choose which gate of a proven pair is removed
///
/// The casualty must not be a direct fanin of the survivor, or the survivor would read itself
/// after the merge.
pub(crate) fn orient_merge(
    aig: &Network,
    survivor: u32,
    casualty: u32,
    inverted: bool,
) -> MergeRecord {
    if aig.has_fanin(survivor, casualty) {
        MergeRecord {
            survivor: casualty,
            casualty: survivor,
            inverted,
        }
    } else {
        MergeRecord {
            survivor,
            casualty,
            inverted,
        }
    }
}

/// Variables of the gates in the SAT encoding
struct ProofModel {
    vars: Vec<Option<Var>>,
}

impl ProofModel {
    /// Encode the constant, all inputs and the gates reachable from the outputs
    fn build<O: ProofOracle>(aig: &Network, oracle: &mut O) -> Result<ProofModel, OracleError> {
        let mut vars = vec![None; aig.id_bound()];
        let zero = oracle.new_var();
        oracle.add_and(zero, zero, false, zero, true)?;
        vars[0] = Some(zero);
        for &i in aig.inputs() {
            vars[i as usize] = Some(oracle.new_var());
        }
        let mut model = ProofModel { vars };
        for &id in aig.order() {
            let g = aig.gate(id);
            match g.kind() {
                GateKind::And => {
                    let v = oracle.new_var();
                    let f0 = g.fanins()[0];
                    let f1 = g.fanins()[1];
                    oracle.add_and(
                        v,
                        model.var(f0.gate()),
                        f0.is_inverted(),
                        model.var(f1.gate()),
                        f1.is_inverted(),
                    )?;
                    model.vars[id as usize] = Some(v);
                }
                GateKind::Unresolved => {
                    let v = oracle.new_var();
                    oracle.add_and(v, v, false, v, true)?;
                    model.vars[id as usize] = Some(v);
                }
                _ => (),
            }
        }
        Ok(model)
    }

    fn var(&self, id: u32) -> Var {
        match self.vars[id as usize] {
            Some(v) => v,
            None => panic!("Gate {id} is not part of the proof model"),
        }
    }

    /// Input values of the last satisfying assignment
    fn counterexample<O: ProofOracle>(&self, aig: &Network, oracle: &O) -> Vec<bool> {
        aig.inputs()
            .iter()
            .map(|i| oracle.value(self.var(*i)))
            .collect()
    }
}

/// Prove or refute the candidate equivalences of the partition, without modifying the gates
///
/// Groups are processed in queue order. Each query either proves a member equivalent to the
/// representative of its group, or finds a counterexample; counterexamples are simulated at the
/// end of each round to refine the partition. The loop ends when no group is left, or when the
/// effort limit is exceeded.
pub fn prove_equivalences<O: ProofOracle>(
    aig: &mut Network,
    partition: &mut FecPartition,
    oracle: &mut O,
    config: &FraigConfig,
) -> Result<(Vec<MergeRecord>, FraigStats), OracleError> {
    let mut records = Vec::new();
    let mut stats = FraigStats::default();
    if partition.is_empty() || partition.is_fraiged() {
        return Ok((records, stats));
    }
    let model = ProofModel::build(aig, oracle)?;
    let mut removed = vec![false; aig.id_bound()];
    let mut settled = vec![false; aig.id_bound()];
    let mut effort = 0;

    let mut progress = tqdm!();
    progress.set_description("Fraig rounds");
    while !partition.is_empty() {
        if effort > config.effort_limit {
            stats.gave_up = true;
            break;
        }
        stats.rounds += 1;
        settled.fill(false);
        let mut counterexamples: Vec<Vec<bool>> = Vec::new();
        'groups: for group in partition.groups.iter_mut() {
            if group.is_resolved() || removed[group.representative() as usize] {
                continue;
            }
            if group.representative() == 0 {
                let mut i = 1;
                while i < group.members.len() {
                    let m = group.members[i];
                    if settled[m.gate() as usize] {
                        i += 1;
                        continue;
                    }
                    // Can the member differ from its constant value?
                    oracle.clear_assumptions();
                    oracle.assume(model.var(m.gate()), !m.is_inverted());
                    stats.queries += 1;
                    if oracle.solve()? {
                        stats.sat += 1;
                        effort += 1;
                        counterexamples.push(model.counterexample(aig, oracle));
                        if counterexamples.len() >= config.max_counterexamples {
                            break 'groups;
                        }
                        break;
                    }
                    stats.unsat += 1;
                    tracing::debug!("Proved {m} = 0");
                    records.push(MergeRecord {
                        survivor: 0,
                        casualty: m.gate(),
                        inverted: m.is_inverted(),
                    });
                    removed[m.gate() as usize] = true;
                    group.members.remove(i);
                    aig.gate_mut(m.gate()).fec = None;
                    effort = 0;
                }
            } else {
                let mut i = 1;
                while i < group.members.len() {
                    let rep = group.members[0].gate();
                    let m = group.members[i];
                    if settled[m.gate() as usize] {
                        i += 1;
                        continue;
                    }
                    let diff = oracle.new_var();
                    oracle.add_xor(
                        diff,
                        model.var(rep),
                        false,
                        model.var(m.gate()),
                        m.is_inverted(),
                    )?;
                    oracle.clear_assumptions();
                    oracle.assume(diff, true);
                    stats.queries += 1;
                    if oracle.solve()? {
                        stats.sat += 1;
                        effort += 1;
                        counterexamples.push(model.counterexample(aig, oracle));
                        // The rest of the group waits for the next simulation
                        settled[rep as usize] = true;
                        settled[m.gate() as usize] = true;
                        if counterexamples.len() >= config.max_counterexamples {
                            break 'groups;
                        }
                        break;
                    }
                    stats.unsat += 1;
                    tracing::debug!("Proved {rep} = {m}");
                    let record = orient_merge(aig, rep, m.gate(), m.is_inverted());
                    records.push(record);
                    removed[record.casualty as usize] = true;
                    aig.gate_mut(record.casualty).fec = None;
                    if record.casualty == rep {
                        // The member becomes the representative
                        group.members.remove(0);
                        let pol = group.members[i - 1].is_inverted();
                        for s in group.members.iter_mut() {
                            *s = *s ^ pol;
                        }
                        group.members.swap(0, i - 1);
                        i = 1;
                    } else {
                        group.members.remove(i);
                    }
                    effort = 0;
                }
            }
        }

        if counterexamples.is_empty() {
            partition.clear(aig);
        } else {
            for batch in pack_patterns(&counterexamples, aig.nb_inputs()) {
                simulate_words(aig, &batch.words);
                partition.refine(aig);
            }
        }
        progress.set_postfix(format!(
            "groups={} merges={}",
            partition.nb_groups(),
            records.len()
        ));
        let _ = progress.update(1);
    }
    stats.merges = records.len();
    Ok((records, stats))
}

/// Apply proven equivalences to the network, in order
///
/// A survivor that was itself replaced earlier is followed to its own replacement.
/// Returns the number of gates removed.
pub fn apply_merges(aig: &mut Network, records: &[MergeRecord]) -> usize {
    let mut replaced = FxHashMap::<u32, Signal>::default();
    for r in records {
        let mut survivor = Signal::from_gate(r.survivor) ^ r.inverted;
        while let Some(s) = replaced.get(&survivor.gate()) {
            survivor = *s ^ survivor.is_inverted();
        }
        tracing::debug!(
            "Fraig: {} merging {}{}...",
            survivor.gate(),
            if survivor.is_inverted() { "!" } else { "" },
            r.casualty
        );
        aig.replace(r.casualty, survivor);
        replaced.insert(r.casualty, survivor);
    }
    if !records.is_empty() {
        aig.rebuild_order();
    }
    records.len()
}

/// Prove the candidate equivalences of the partition and merge the equivalent gates
///
/// The partition should have been refined by simulation beforehand. Afterwards it is empty and
/// marked as fraiged.
pub fn fraig<O: ProofOracle>(
    aig: &mut Network,
    partition: &mut FecPartition,
    oracle: &mut O,
    config: &FraigConfig,
) -> Result<FraigStats, OracleError> {
    if partition.is_empty() || partition.is_fraiged() {
        return Ok(FraigStats::default());
    }
    let (records, stats) = prove_equivalences(aig, partition, oracle, config)?;
    apply_merges(aig, &records);
    partition.clear(aig);
    partition.fraiged = true;
    aig.update_unused();
    aig.update_floating();
    tracing::info!("{stats}");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::{apply_merges, fraig, orient_merge, prove_equivalences, FraigConfig, MergeRecord};
    use crate::equiv::oracle::testing::EnumeratingOracle;
    use crate::equiv::{random_simulation, FecPartition, SimPolicy};
    use crate::sim::{output_words, simulate_words};
    use crate::{Network, Signal};

    /// Input words enumerating all patterns, for up to 6 inputs
    fn exhaustive_words(nb_inputs: usize) -> Vec<u64> {
        assert!(nb_inputs <= 6);
        (0..nb_inputs)
            .map(|i| {
                (0..64)
                    .filter(|k| (k >> i) & 1 != 0)
                    .fold(0u64, |w, k| w | (1 << k))
            })
            .collect()
    }

    fn truth_table(aig: &mut Network) -> Vec<u64> {
        let words = exhaustive_words(aig.nb_inputs());
        simulate_words(aig, &words);
        output_words(aig)
    }

    fn simulated_partition(aig: &mut Network, seed: u64) -> FecPartition {
        let mut partition = FecPartition::new();
        let mut rng = SmallRng::seed_from_u64(seed);
        random_simulation(aig, &mut partition, &SimPolicy::default(), &mut rng);
        partition
    }

    /// Several redundant cones over 4 inputs
    fn redundant_network() -> Network {
        let mut aig = Network::new();
        let a = aig.add_input();
        let b = aig.add_input();
        let c = aig.add_input();
        let d = aig.add_input();
        let x0 = aig.and(a, b);
        let x1 = !aig.or(!a, !b);
        let x2 = aig.and(x0, c);
        let x3 = aig.and(x1, c);
        let y = aig.and(a, c);
        let x4 = aig.and(y, b);
        let x5 = aig.and(x2, !x3);
        let x6 = aig.and(a, !d);
        aig.add_output(x2);
        aig.add_output(x3);
        aig.add_output(!x4);
        aig.add_output(x5);
        aig.add_output(x6);
        aig.rebuild_order();
        aig
    }

    #[test]
    fn test_and_or_merged() {
        let mut aig = Network::new();
        let a = aig.add_input();
        let b = aig.add_input();
        let x0 = aig.and(a, b);
        let x1 = !aig.or(!a, !b);
        aig.add_output(x0);
        aig.add_output(x1);
        aig.rebuild_order();
        let before = truth_table(&mut aig);

        let mut partition = simulated_partition(&mut aig, 0);
        assert_eq!(partition.nb_groups(), 1);
        let mut oracle = EnumeratingOracle::default();
        let stats = fraig(&mut aig, &mut partition, &mut oracle, &FraigConfig::default()).unwrap();
        aig.check();
        assert_eq!(stats.merges, 1);
        assert_eq!(stats.unsat, 1);
        assert!(!stats.gave_up);
        assert_eq!(aig.nb_ands(), 1);
        assert_eq!(aig.output(0), x0);
        assert_eq!(aig.output(1), x0);
        assert_eq!(truth_table(&mut aig), before);
        assert!(partition.is_fraiged());
        assert!(partition.is_empty());
        assert_eq!(aig.gate(x0.gate()).fec_group(), None);
    }

    #[test]
    fn test_constant_merged() {
        let mut aig = Network::new();
        let a = aig.add_input();
        let b = aig.add_input();
        let x0 = aig.and(a, b);
        let x1 = aig.and(x0, !a);
        aig.add_output(!x1);
        aig.add_output(x0);
        aig.rebuild_order();

        let mut partition = simulated_partition(&mut aig, 1);
        let mut oracle = EnumeratingOracle::default();
        let stats = fraig(&mut aig, &mut partition, &mut oracle, &FraigConfig::default()).unwrap();
        aig.check();
        assert_eq!(stats.merges, 1);
        assert!(!aig.contains(x1.gate()));
        assert_eq!(aig.output(0), Signal::one());
        assert_eq!(aig.output(1), x0);
        assert_eq!(aig.nb_ands(), 1);
    }

    #[test]
    fn test_sound_before_merge() {
        let mut aig = redundant_network();
        let mut partition = simulated_partition(&mut aig, 2);
        let mut oracle = EnumeratingOracle::default();
        let (records, stats) =
            prove_equivalences(&mut aig, &mut partition, &mut oracle, &FraigConfig::default())
                .unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(stats.merges, 4);
        assert_eq!(aig.nb_ands(), 8);

        // Check every record by exhaustive simulation, before modifying the network
        simulate_words(&mut aig, &exhaustive_words(4));
        for r in &records {
            let survivor = aig.gate(r.survivor).value();
            let casualty = aig.gate(r.casualty).value();
            let expected = if r.inverted { !survivor } else { survivor };
            assert_eq!(casualty, expected, "Invalid merge {r:?}");
        }

        let before = truth_table(&mut aig);
        assert_eq!(apply_merges(&mut aig, &records), 4);
        aig.check();
        assert_eq!(truth_table(&mut aig), before);
        assert_eq!(aig.nb_ands(), 4);
        assert_eq!(aig.output(1), aig.output(0));
        assert_eq!(aig.output(2), !aig.output(0));
        assert_eq!(aig.output(3), Signal::zero());
        assert_eq!(aig.sweep(), 1);
        assert_eq!(aig.nb_ands(), 3);
    }

    #[test]
    fn test_deterministic() {
        let run = || {
            let mut aig = redundant_network();
            let mut partition = simulated_partition(&mut aig, 7);
            let mut oracle = EnumeratingOracle::default();
            prove_equivalences(&mut aig, &mut partition, &mut oracle, &FraigConfig::default())
                .unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_effort_limit() {
        let mut aig = redundant_network();
        // A single all-zero pattern leaves every And gate with the constant
        let mut partition = FecPartition::new();
        partition.seed(&mut aig);
        simulate_words(&mut aig, &[0; 4]);
        partition.refine(&mut aig);
        assert_eq!(partition.nb_groups(), 1);

        let config = FraigConfig {
            effort_limit: 0,
            ..FraigConfig::default()
        };
        let mut oracle = EnumeratingOracle::default();
        let (records, stats) =
            prove_equivalences(&mut aig, &mut partition, &mut oracle, &config).unwrap();
        assert!(stats.gave_up);
        assert_eq!(stats.sat, 1);
        // Only the constant group was processed before the counterexample
        assert!(records.iter().all(|r| r.survivor == 0));
    }

    #[test]
    fn test_counterexample_limit() {
        let mut aig = redundant_network();
        let mut partition = FecPartition::new();
        partition.seed(&mut aig);
        simulate_words(&mut aig, &[0; 4]);
        partition.refine(&mut aig);
        let before = truth_table(&mut aig);

        let config = FraigConfig {
            max_counterexamples: 1,
            ..FraigConfig::default()
        };
        let mut oracle = EnumeratingOracle::default();
        let stats = fraig(&mut aig, &mut partition, &mut oracle, &config).unwrap();
        aig.check();
        assert_eq!(stats.merges, 4);
        assert!(stats.rounds >= stats.sat);
        assert_eq!(truth_table(&mut aig), before);
    }

    #[test]
    fn test_not_seeded_again() {
        let mut aig = redundant_network();
        let mut partition = simulated_partition(&mut aig, 3);
        let mut oracle = EnumeratingOracle::default();
        fraig(&mut aig, &mut partition, &mut oracle, &FraigConfig::default()).unwrap();
        assert!(partition.is_fraiged());
        partition.seed(&mut aig);
        assert!(partition.is_empty());
        let mut rng = SmallRng::seed_from_u64(3);
        let rounds = random_simulation(&mut aig, &mut partition, &SimPolicy::default(), &mut rng);
        assert_eq!(rounds, 0);
        let stats = fraig(&mut aig, &mut partition, &mut oracle, &FraigConfig::default()).unwrap();
        assert_eq!(stats.merges, 0);
    }

    #[test]
    fn test_orient_merge() {
        let mut aig = Network::new();
        let a = aig.add_input();
        let b = aig.add_input();
        let x0 = aig.and(a, b);
        let x1 = aig.and(x0, x0);
        aig.add_output(x1);
        aig.rebuild_order();
        assert_eq!(
            orient_merge(&aig, x1.gate(), x0.gate(), false),
            MergeRecord {
                survivor: x0.gate(),
                casualty: x1.gate(),
                inverted: false
            }
        );
        assert_eq!(
            orient_merge(&aig, x0.gate(), x1.gate(), true),
            MergeRecord {
                survivor: x0.gate(),
                casualty: x1.gate(),
                inverted: true
            }
        );
    }

    #[test]
    fn test_representative_replaced() {
        let mut aig = Network::new();
        let a = aig.add_input();
        let b = aig.add_input();
        let x0 = aig.and(a, b);
        let x1 = aig.and(x0, x0);
        let x2 = aig.and(!x0, !x0);
        aig.add_output(x1);
        aig.add_output(x2);
        aig.rebuild_order();
        let expected = truth_table(&mut aig);

        // The representative reads the next member, so the roles are swapped
        let mut partition = FecPartition::new();
        partition.push_group(vec![x1, x0, !x2]);
        partition.update_back_refs(&mut aig);
        let mut oracle = EnumeratingOracle::default();
        let (records, stats) =
            prove_equivalences(&mut aig, &mut partition, &mut oracle, &FraigConfig::default())
                .unwrap();
        assert_eq!(stats.unsat, 2);
        assert_eq!(stats.sat, 0);
        assert_eq!(
            records,
            vec![
                MergeRecord {
                    survivor: x0.gate(),
                    casualty: x1.gate(),
                    inverted: false
                },
                MergeRecord {
                    survivor: x0.gate(),
                    casualty: x2.gate(),
                    inverted: true
                },
            ]
        );
        assert!(partition.is_empty());

        assert_eq!(apply_merges(&mut aig, &records), 2);
        aig.check();
        assert_eq!(aig.nb_ands(), 1);
        assert_eq!(aig.output(0), x0);
        assert_eq!(aig.output(1), !x0);
        assert_eq!(truth_table(&mut aig), expected);
    }

    #[test]
    fn test_merge_chain() {
        let mut aig = Network::new();
        let a = aig.add_input();
        let b = aig.add_input();
        let x0 = aig.and(a, b);
        let x1 = aig.and(b, a);
        let x2 = !aig.or(!b, !a);
        aig.add_output(x0);
        aig.add_output(!x1);
        aig.add_output(x2);
        aig.rebuild_order();
        let records = [
            MergeRecord {
                survivor: x0.gate(),
                casualty: x1.gate(),
                inverted: false,
            },
            MergeRecord {
                survivor: x1.gate(),
                casualty: x2.gate(),
                inverted: false,
            },
        ];
        assert_eq!(apply_merges(&mut aig, &records), 2);
        aig.check();
        assert_eq!(aig.nb_ands(), 1);
        assert_eq!(aig.output(1), !x0);
        assert_eq!(aig.output(2), x0);
    }
}

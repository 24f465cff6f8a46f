use core::fmt;
use std::collections::BTreeSet;

use crate::network::gate::{Gate, GateKind};
use crate::network::signal::Signal;

/// Representation of a combinational And-Inverter-Graph, used as the main representation for all logic manipulations
///
/// Gates are owned by an arena indexed by their id. Edges are stored on both ends: the fanins of a gate
/// and the fanouts of the gates it reads are kept mirror-consistent by the mutation helpers.
/// The topological order is a cache: it only changes through [`Network::rebuild_order`].
#[derive(Debug, Clone)]
pub struct Network {
    max_var: u32,
    gates: Vec<Option<Gate>>,
    inputs: Vec<u32>,
    outputs: Vec<u32>,
    order: Vec<u32>,
    nb_ands: usize,
    floating: BTreeSet<u32>,
    unused: BTreeSet<u32>,
}

/// Visit state for the order traversal
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    /// Create a new network, containing only the constant gate
    pub fn new() -> Self {
        Network {
            max_var: 0,
            gates: vec![Some(Gate::new(0, GateKind::Const, Vec::new()))],
            inputs: Vec::new(),
            outputs: Vec::new(),
            order: Vec::new(),
            nb_ands: 0,
            floating: BTreeSet::new(),
            unused: BTreeSet::new(),
        }
    }

    /// Return the number of primary inputs
    pub fn nb_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Return the number of primary outputs
    pub fn nb_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Return the number of And gates
    pub fn nb_ands(&self) -> usize {
        self.nb_ands
    }

    /// Return the number of gates currently in the arena, including the constant
    pub fn nb_gates(&self) -> usize {
        self.gates.iter().filter(|g| g.is_some()).count()
    }

    /// Upper bound on gate ids, for tables indexed by id
    pub fn id_bound(&self) -> usize {
        self.gates.len()
    }

    /// Return the variable budget (maximum variable index), as declared in AIGER headers
    pub fn max_var(&self) -> u32 {
        self.max_var
    }

    /// Get the input at index i
    pub fn input(&self, i: usize) -> Signal {
        Signal::from_gate(self.inputs[i])
    }

    /// Get the signal driving the output at index i
    pub fn output(&self, i: usize) -> Signal {
        self.gate(self.outputs[i]).fanins[0]
    }

    /// Ids of the input gates, in declaration order
    pub fn inputs(&self) -> &[u32] {
        &self.inputs
    }

    /// Ids of the output gates, in declaration order
    pub fn outputs(&self) -> &[u32] {
        &self.outputs
    }

    /// Get the gate with the given id
    pub fn gate(&self, id: u32) -> &Gate {
        match self.get_gate(id) {
            Some(g) => g,
            None => panic!("Gate {id} does not exist"),
        }
    }

    pub(crate) fn gate_mut(&mut self, id: u32) -> &mut Gate {
        match self.gates.get_mut(id as usize).and_then(|g| g.as_mut()) {
            Some(g) => g,
            None => panic!("Gate {id} does not exist"),
        }
    }

    /// Get the gate with the given id, if it exists
    pub fn get_gate(&self, id: u32) -> Option<&Gate> {
        self.gates.get(id as usize).and_then(|g| g.as_ref())
    }

    /// Returns whether a gate with this id exists
    pub fn contains(&self, id: u32) -> bool {
        self.get_gate(id).is_some()
    }

    /// Iterate over all gates, by increasing id
    pub fn gates(&self) -> impl Iterator<Item = &Gate> {
        self.gates.iter().flatten()
    }

    pub(crate) fn gates_mut(&mut self) -> impl Iterator<Item = &mut Gate> {
        self.gates.iter_mut().flatten()
    }

    /// Cached topological order of the gates reachable from the outputs
    pub fn order(&self) -> &[u32] {
        &self.order
    }

    /// And and output gates with a fanin to an undefined gate
    pub fn floating_gates(&self) -> &BTreeSet<u32> {
        &self.floating
    }

    /// Gates that are not used by any other gate (outputs and constant excluded)
    pub fn unused_gates(&self) -> &BTreeSet<u32> {
        &self.unused
    }

    /// Add a new primary input
    pub fn add_input(&mut self) -> Signal {
        let id = self.create(GateKind::Input, Vec::new());
        Signal::from_gate(id)
    }

    /// Add a new primary output based on an existing signal; return the id of the output gate
    pub fn add_output(&mut self, s: Signal) -> u32 {
        self.create(GateKind::Output, vec![s])
    }

    /// Create an And2 gate. No simplification or deduplication is performed
    pub fn and(&mut self, a: Signal, b: Signal) -> Signal {
        Signal::from_gate(self.create(GateKind::And, vec![a, b]))
    }

    /// Create an Or2 gate, as an inverted And
    pub fn or(&mut self, a: Signal, b: Signal) -> Signal {
        !self.and(!a, !b)
    }

    /// Create a gate with the next free id and connect its fanins
    pub fn create(&mut self, kind: GateKind, fanins: Vec<Signal>) -> u32 {
        let id = self.gates.len() as u32;
        self.insert(Gate::new(id, kind, fanins));
        self.connect(id);
        id
    }

    /// Place a gate in the arena at its id, without connecting its fanins
    pub(crate) fn insert(&mut self, gate: Gate) {
        let id = gate.id as usize;
        if self.gates.len() <= id {
            self.gates.resize_with(id + 1, || None);
        }
        assert!(self.gates[id].is_none(), "Gate {id} is defined twice");
        match gate.kind {
            GateKind::Input => self.inputs.push(gate.id),
            GateKind::Output => self.outputs.push(gate.id),
            GateKind::And => self.nb_ands += 1,
            _ => (),
        }
        if gate.kind != GateKind::Output {
            self.max_var = self.max_var.max(gate.id);
        }
        self.gates[id] = Some(gate);
    }

    /// Mirror the fanins of a gate into the fanout sets of the gates it reads
    pub(crate) fn connect(&mut self, id: u32) {
        let fanins = self.gate(id).fanins.clone();
        for s in fanins {
            self.gate_mut(s.gate())
                .fanouts
                .push(Signal::from_gate(id) ^ s.is_inverted());
        }
    }

    pub(crate) fn set_max_var(&mut self, max_var: u32) {
        self.max_var = max_var;
    }

    pub(crate) fn set_name(&mut self, id: u32, name: String) {
        self.gate_mut(id).name = Some(name);
    }

    pub(crate) fn set_line(&mut self, id: u32, line: usize) {
        self.gate_mut(id).line = line;
    }

    /// Returns whether `fanin` is a direct fanin of `id`
    pub fn has_fanin(&self, id: u32, fanin: u32) -> bool {
        self.gate(id).fanins.iter().any(|s| s.gate() == fanin)
    }

    /// Redirect every consumer of `old` to `new`, inverting the edges if `inv` is set
    ///
    /// The fanout set of `old` is moved to `new`, and `old` is left without consumers.
    pub fn rewire_consumers(&mut self, old: u32, new: u32, inv: bool) {
        assert_ne!(old, new, "Cannot rewire gate {old} to itself");
        let fanouts = std::mem::take(&mut self.gate_mut(old).fanouts);
        for f in fanouts {
            let consumer = f.gate();
            assert_ne!(
                consumer, new,
                "Rewiring gate {old} to {new} would make {new} its own fanin"
            );
            let edge = Signal::from_gate(old) ^ f.is_inverted();
            let c = self.gate_mut(consumer);
            let Some(pos) = c.fanins.iter().position(|s| *s == edge) else {
                panic!("Gate {consumer} is a fanout of {old} but does not read it");
            };
            let pol = f.is_inverted() ^ inv;
            c.fanins[pos] = Signal::from_gate(new) ^ pol;
            self.gate_mut(new)
                .fanouts
                .push(Signal::from_gate(consumer) ^ pol);
        }
    }

    /// Remove a gate from the fanout sets of its fanins
    pub fn detach_fanins(&mut self, id: u32) {
        let fanins = self.gate(id).fanins.clone();
        for s in fanins {
            let edge = Signal::from_gate(id) ^ s.is_inverted();
            let g = self.gate_mut(s.gate());
            let Some(pos) = g.fanouts.iter().position(|f| *f == edge) else {
                panic!("Gate {id} reads {s} but is not in its fanouts");
            };
            g.fanouts.remove(pos);
        }
    }

    /// Delete a gate from the arena. It must not have any consumer left
    pub fn remove(&mut self, id: u32) {
        let g = self.gate(id);
        assert!(
            g.fanouts.is_empty(),
            "Cannot remove gate {id}: it still has {} consumers",
            g.fanouts.len()
        );
        assert!(
            matches!(g.kind, GateKind::And | GateKind::Unresolved),
            "Cannot remove gate {id} of kind {}",
            g.kind
        );
        if matches!(g.kind, GateKind::And) {
            self.nb_ands -= 1;
        }
        self.gates[id as usize] = None;
        self.floating.remove(&id);
        self.unused.remove(&id);
    }

    /// Replace a gate by another signal everywhere, then delete it
    ///
    /// This is the merge primitive shared by all passes; the order needs to be rebuilt afterwards.
    pub fn replace(&mut self, casualty: u32, by: Signal) {
        self.rewire_consumers(casualty, by.gate(), by.is_inverted());
        self.detach_fanins(casualty);
        self.remove(casualty);
    }

    /// Recompute the topological order from the outputs
    ///
    /// The traversal is iterative and visits the first fanin before the second, so that the
    /// order only depends on the structure of the graph.
    pub fn rebuild_order(&mut self) {
        let mut order = Vec::new();
        let mut marks = vec![Mark::Unvisited; self.gates.len()];
        let mut stack: Vec<(u32, bool)> = Vec::new();
        for &o in &self.outputs {
            stack.push((o, false));
            while let Some((id, expanded)) = stack.pop() {
                let i = id as usize;
                if expanded {
                    marks[i] = Mark::Done;
                    order.push(id);
                    continue;
                }
                match marks[i] {
                    Mark::Done => continue,
                    Mark::OnPath => panic!("Combinational loop through gate {id}"),
                    Mark::Unvisited => (),
                }
                marks[i] = Mark::OnPath;
                stack.push((id, true));
                for s in self.gate(id).fanins.iter().rev() {
                    match marks[s.gate() as usize] {
                        Mark::Done => (),
                        Mark::OnPath => panic!("Combinational loop through gate {}", s.gate()),
                        Mark::Unvisited => stack.push((s.gate(), false)),
                    }
                }
            }
        }
        self.order = order;
    }

    /// Remove And gates and placeholders that are not reachable from the outputs
    ///
    /// The order must be up-to-date. It is not modified, since only unreachable gates are removed.
    /// Returns the number of gates removed.
    pub fn sweep(&mut self) -> usize {
        let mut reachable = vec![false; self.gates.len()];
        for &id in &self.order {
            reachable[id as usize] = true;
        }
        let dead: Vec<u32> = self
            .gates()
            .filter(|g| matches!(g.kind, GateKind::And | GateKind::Unresolved))
            .filter(|g| !reachable[g.id as usize])
            .map(|g| g.id)
            .collect();
        // Unreachable gates only feed other unreachable gates
        for &id in &dead {
            self.detach_fanins(id);
        }
        for &id in &dead {
            tracing::debug!("Sweeping: {}({id}) removed", self.gate(id).kind);
            self.remove(id);
        }
        self.update_unused();
        dead.len()
    }

    /// Recompute the set of gates reading an undefined gate
    pub fn update_floating(&mut self) {
        let mut floating = BTreeSet::new();
        for g in self.gates() {
            if g.fanins
                .iter()
                .any(|s| self.gate(s.gate()).kind == GateKind::Unresolved)
            {
                floating.insert(g.id);
            }
        }
        self.floating = floating;
    }

    /// Recompute the set of gates without any consumer
    pub fn update_unused(&mut self) {
        self.unused = self
            .gates()
            .filter(|g| !matches!(g.kind, GateKind::Output | GateKind::Const))
            .filter(|g| g.fanouts.is_empty())
            .map(|g| g.id)
            .collect();
    }

    /// Fanin cone of a gate, up to `level` edges away, one gate per line
    ///
    /// Each line is indented by its depth. A gate whose cone was already printed is marked with
    /// `(*)` instead of being expanded again.
    pub fn fanin_report(&self, id: u32, level: usize) -> String {
        self.cone_report(id, level, Gate::fanins)
    }

    /// Fanout cone of a gate, up to `level` edges away
    ///
    /// Same format as [`Network::fanin_report`].
    pub fn fanout_report(&self, id: u32, level: usize) -> String {
        self.cone_report(id, level, Gate::fanouts)
    }

    fn cone_report(&self, id: u32, level: usize, edges: fn(&Gate) -> &[Signal]) -> String {
        use std::fmt::Write;

        let mut ret = String::new();
        let mut expanded = vec![false; self.gates.len()];
        let mut stack = vec![(Signal::from_gate(id), 0)];
        while let Some((s, depth)) = stack.pop() {
            let g = self.gate(s.gate());
            let inv = if s.is_inverted() { "!" } else { "" };
            let _ = write!(ret, "{:indent$}{inv}{} {}", "", g.kind, g.id, indent = 2 * depth);
            let next = edges(g);
            if depth < level && !next.is_empty() {
                if expanded[g.id as usize] {
                    ret.push_str(" (*)");
                } else {
                    expanded[g.id as usize] = true;
                    stack.extend(next.iter().rev().map(|t| (*t, depth + 1)));
                }
            }
            ret.push('\n');
        }
        ret
    }

    /// Check consistency of the datastructure
    ///
    /// Fanins and fanouts must mirror each other, and the order must be a valid topological order
    /// without duplicates.
    pub fn check(&self) {
        let mut nb_ands = 0;
        for g in self.gates() {
            assert_eq!(g.fanins.len(), g.kind.nb_fanins(), "Invalid arity for {g}");
            if g.kind == GateKind::And {
                nb_ands += 1;
            }
            for s in &g.fanins {
                let edge = Signal::from_gate(g.id) ^ s.is_inverted();
                let driver = self.gate(s.gate());
                let nb_fanins = g.fanins.iter().filter(|t| *t == s).count();
                let nb_fanouts = driver.fanouts.iter().filter(|f| **f == edge).count();
                assert_eq!(
                    nb_fanins, nb_fanouts,
                    "Edge {s} -> {} is not mirrored in the fanouts",
                    g.id
                );
            }
            for f in &g.fanouts {
                let edge = Signal::from_gate(g.id) ^ f.is_inverted();
                assert!(
                    self.gate(f.gate()).fanins.contains(&edge),
                    "Fanout {f} of gate {} does not read it",
                    g.id
                );
            }
        }
        assert_eq!(nb_ands, self.nb_ands, "Invalid And gate count");

        let mut position = vec![None; self.gates.len()];
        for (i, &id) in self.order.iter().enumerate() {
            assert!(self.contains(id), "Removed gate {id} is still in the order");
            assert!(position[id as usize].is_none(), "Gate {id} appears twice in the order");
            position[id as usize] = Some(i);
        }
        for (i, &id) in self.order.iter().enumerate() {
            for s in &self.gate(id).fanins {
                match position[s.gate() as usize] {
                    Some(j) => assert!(j < i, "Gate {id} appears before its fanin {s}"),
                    None => panic!("Fanin {s} of gate {id} is missing from the order"),
                }
            }
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut i = 0;
        for &id in &self.order {
            let g = self.gate(id);
            match g.kind {
                GateKind::Unresolved => continue,
                GateKind::Const => writeln!(f, "[{i}] CONST0")?,
                _ => {
                    write!(f, "[{i}] {:<4}{id}", g.kind.to_string())?;
                    for s in &g.fanins {
                        write!(f, " ")?;
                        if self.gate(s.gate()).kind == GateKind::Unresolved {
                            write!(f, "*")?;
                        }
                        write!(f, "{s}")?;
                    }
                    if let Some(n) = &g.name {
                        write!(f, " ({n})")?;
                    }
                    writeln!(f)?;
                }
            }
            i += 1;
        }
        Ok(())
    }
}

use std::fmt;

use crate::network::signal::Signal;

/// Identifier of an equivalence class, as stored in the gate back-reference
pub type GroupId = u32;

/// Kind of a gate in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateKind {
    /// The constant-false gate, always at id 0
    Const,
    /// Primary input
    Input,
    /// Primary output, with a single fanin
    Output,
    /// Two-input And gate
    And,
    /// Placeholder for a gate that is referenced but never defined
    Unresolved,
}

impl GateKind {
    /// Number of fanins required by this kind of gate
    pub fn nb_fanins(&self) -> usize {
        match self {
            GateKind::And => 2,
            GateKind::Output => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GateKind::Const => "CONST",
            GateKind::Input => "PI",
            GateKind::Output => "PO",
            GateKind::And => "AIG",
            GateKind::Unresolved => "UNDEF",
        };
        write!(f, "{s}")
    }
}

/// A gate record, owned by the [`Network`](crate::Network) arena
///
/// Edges are stored as signals: a fanin is the driving gate with the inversion of the edge,
/// a fanout is the consuming gate with the inversion of the same edge.
#[derive(Debug, Clone)]
pub struct Gate {
    pub(crate) id: u32,
    pub(crate) kind: GateKind,
    pub(crate) fanins: Vec<Signal>,
    pub(crate) fanouts: Vec<Signal>,
    pub(crate) value: u64,
    pub(crate) fec: Option<GroupId>,
    pub(crate) line: usize,
    pub(crate) name: Option<String>,
}

impl Gate {
    pub(crate) fn new(id: u32, kind: GateKind, fanins: Vec<Signal>) -> Gate {
        assert_eq!(
            fanins.len(),
            kind.nb_fanins(),
            "Gate {id} of kind {kind} has {} fanins",
            fanins.len()
        );
        Gate {
            id,
            kind,
            fanins,
            fanouts: Vec::new(),
            value: 0,
            fec: None,
            line: 0,
            name: None,
        }
    }

    /// Id of the gate
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Kind of the gate
    pub fn kind(&self) -> GateKind {
        self.kind
    }

    /// Fanin edges, empty except for And and Output gates
    pub fn fanins(&self) -> &[Signal] {
        &self.fanins
    }

    /// Fanout edges, one per consuming edge
    pub fn fanouts(&self) -> &[Signal] {
        &self.fanouts
    }

    /// Current simulation word, one bit per pattern
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Equivalence class the gate currently belongs to, if any
    pub fn fec_group(&self) -> Option<GroupId> {
        self.fec
    }

    /// Source line where the gate was defined, or 0
    pub fn line(&self) -> usize {
        self.line
    }

    /// Symbolic name, for inputs and outputs
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns whether the gate is an And gate
    pub fn is_and(&self) -> bool {
        self.kind == GateKind::And
    }

    /// Returns whether the gate is a primary output
    pub fn is_output(&self) -> bool {
        self.kind == GateKind::Output
    }

    /// Returns whether the gate is a primary input
    pub fn is_input(&self) -> bool {
        self.kind == GateKind::Input
    }

    /// Returns whether the gate is the constant gate
    pub fn is_const(&self) -> bool {
        self.kind == GateKind::Const
    }

    /// Returns whether the gate is an undefined placeholder
    pub fn is_unresolved(&self) -> bool {
        self.kind == GateKind::Unresolved
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.id)?;
        if let Some(n) = &self.name {
            write!(f, "\"{n}\"")?;
        }
        write!(f, ", line {}", self.line)
    }
}

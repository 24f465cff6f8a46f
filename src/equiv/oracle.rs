//! Interface to the SAT solver used to prove equivalences

use rustsat::solvers::{Solve, SolveIncremental, SolverResult};
use rustsat::types::{Clause, Lit, TernaryVal, Var};
use rustsat_kissat::Kissat;
use rustsat_minisat::core::Minisat;
use thiserror::Error;

/// Error returned by a proof oracle
///
/// A satisfiable or unsatisfiable query is a result, not an error.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The solver backend failed
    #[error("SAT backend failure: {0}")]
    Backend(String),
    /// The solver stopped before reaching a result
    #[error("SAT solver was interrupted")]
    Interrupted,
}

/// Incremental SAT interface used by the equivalence prover
///
/// Gates are encoded with their Tseitin clauses. Queries are made under assumptions, which are
/// cleared explicitly between queries. A single oracle is used for a whole run of the prover.
pub trait ProofOracle {
    /// Allocate a new variable
    fn new_var(&mut self) -> Var;

    /// Constrain `out` to be the And of two, possibly inverted, variables
    fn add_and(
        &mut self,
        out: Var,
        a: Var,
        a_inv: bool,
        b: Var,
        b_inv: bool,
    ) -> Result<(), OracleError>;

    /// Constrain `out` to be the Xor of two, possibly inverted, variables
    fn add_xor(
        &mut self,
        out: Var,
        a: Var,
        a_inv: bool,
        b: Var,
        b_inv: bool,
    ) -> Result<(), OracleError>;

    /// Remove all assumptions
    fn clear_assumptions(&mut self);

    /// Assume a value for a variable in the next query
    fn assume(&mut self, var: Var, value: bool);

    /// Solve under the current assumptions; returns true if satisfiable
    fn solve(&mut self) -> Result<bool, OracleError>;

    /// Value of a variable in the last satisfying assignment
    fn value(&self, var: Var) -> bool;
}

fn lit(v: Var, inv: bool) -> Lit {
    if inv {
        v.neg_lit()
    } else {
        v.pos_lit()
    }
}

/// Tseitin clauses for `out <=> a & b`
pub(crate) fn and_clauses(out: Lit, a: Lit, b: Lit) -> [Clause; 3] {
    [
        [a, !out].into_iter().collect(),
        [b, !out].into_iter().collect(),
        [!a, !b, out].into_iter().collect(),
    ]
}

/// Tseitin clauses for `out <=> a ^ b`
pub(crate) fn xor_clauses(out: Lit, a: Lit, b: Lit) -> [Clause; 4] {
    [
        [a, b, !out].into_iter().collect(),
        [!a, !b, !out].into_iter().collect(),
        [!a, b, out].into_iter().collect(),
        [a, !b, out].into_iter().collect(),
    ]
}

fn backend_error<E: std::fmt::Display>(e: E) -> OracleError {
    OracleError::Backend(e.to_string())
}

/// Proof oracle backed by a persistent, incremental Minisat session
///
/// Clauses are added to the solver once. Each query reuses everything learnt by the previous ones,
/// with the assumptions passed to the solver instead of being added as clauses.
#[derive(Default)]
pub struct MinisatOracle {
    solver: Minisat,
    nb_vars: u32,
    // Variables above this one were never given to the solver
    max_used: Option<u32>,
    assumptions: Vec<Lit>,
    nb_calls: usize,
}

impl MinisatOracle {
    /// Create an oracle without any variable
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queries made so far
    pub fn nb_calls(&self) -> usize {
        self.nb_calls
    }

    fn add_clauses<const N: usize>(&mut self, clauses: [Clause; N]) -> Result<(), OracleError> {
        for c in clauses {
            for l in c.iter() {
                let v = l.var().idx32();
                self.max_used = Some(self.max_used.map_or(v, |m| m.max(v)));
            }
            self.solver.add_clause(c).map_err(backend_error)?;
        }
        Ok(())
    }
}

impl ProofOracle for MinisatOracle {
    fn new_var(&mut self) -> Var {
        let v = Var::new(self.nb_vars);
        self.nb_vars += 1;
        v
    }

    fn add_and(
        &mut self,
        out: Var,
        a: Var,
        a_inv: bool,
        b: Var,
        b_inv: bool,
    ) -> Result<(), OracleError> {
        self.add_clauses(and_clauses(out.pos_lit(), lit(a, a_inv), lit(b, b_inv)))
    }

    fn add_xor(
        &mut self,
        out: Var,
        a: Var,
        a_inv: bool,
        b: Var,
        b_inv: bool,
    ) -> Result<(), OracleError> {
        self.add_clauses(xor_clauses(out.pos_lit(), lit(a, a_inv), lit(b, b_inv)))
    }

    fn clear_assumptions(&mut self) {
        self.assumptions.clear();
    }

    fn assume(&mut self, var: Var, value: bool) {
        self.assumptions.push(lit(var, !value));
    }

    fn solve(&mut self) -> Result<bool, OracleError> {
        self.nb_calls += 1;
        match self
            .solver
            .solve_assumps(&self.assumptions)
            .map_err(backend_error)?
        {
            SolverResult::Sat => Ok(true),
            SolverResult::Unsat => Ok(false),
            SolverResult::Interrupted => Err(OracleError::Interrupted),
        }
    }

    fn value(&self, var: Var) -> bool {
        if self.max_used.map_or(true, |m| var.idx32() > m) {
            return false;
        }
        matches!(self.solver.lit_val(var.pos_lit()), Ok(TernaryVal::True))
    }
}

/// Proof oracle running a fresh Kissat instance for each query
///
/// Kissat is not incremental: clauses are stored here, and each query loads all of them into a new
/// solver, with the assumptions added as unit clauses. This only suits runs with few queries; the
/// prove loop should use [`MinisatOracle`].
#[derive(Debug, Default)]
pub struct KissatOracle {
    nb_vars: u32,
    clauses: Vec<Clause>,
    assumptions: Vec<Lit>,
    model: Vec<bool>,
    nb_calls: usize,
}

impl KissatOracle {
    /// Create an oracle without any variable
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of clauses added so far
    pub fn nb_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// Number of queries made so far
    pub fn nb_calls(&self) -> usize {
        self.nb_calls
    }
}

impl ProofOracle for KissatOracle {
    fn new_var(&mut self) -> Var {
        let v = Var::new(self.nb_vars);
        self.nb_vars += 1;
        v
    }

    fn add_and(
        &mut self,
        out: Var,
        a: Var,
        a_inv: bool,
        b: Var,
        b_inv: bool,
    ) -> Result<(), OracleError> {
        self.clauses
            .extend(and_clauses(out.pos_lit(), lit(a, a_inv), lit(b, b_inv)));
        Ok(())
    }

    fn add_xor(
        &mut self,
        out: Var,
        a: Var,
        a_inv: bool,
        b: Var,
        b_inv: bool,
    ) -> Result<(), OracleError> {
        self.clauses
            .extend(xor_clauses(out.pos_lit(), lit(a, a_inv), lit(b, b_inv)));
        Ok(())
    }

    fn clear_assumptions(&mut self) {
        self.assumptions.clear();
    }

    fn assume(&mut self, var: Var, value: bool) {
        self.assumptions.push(lit(var, !value));
    }

    fn solve(&mut self) -> Result<bool, OracleError> {
        self.nb_calls += 1;
        let mut solver = Kissat::default();
        for c in &self.clauses {
            solver.add_clause(c.clone()).map_err(backend_error)?;
        }
        for l in &self.assumptions {
            solver
                .add_clause([*l].into_iter().collect())
                .map_err(backend_error)?;
        }
        match solver.solve().map_err(backend_error)? {
            SolverResult::Sat => {
                self.model = (0..self.nb_vars)
                    .map(|i| matches!(solver.lit_val(Var::new(i).pos_lit()), Ok(TernaryVal::True)))
                    .collect();
                Ok(true)
            }
            SolverResult::Unsat => Ok(false),
            SolverResult::Interrupted => Err(OracleError::Interrupted),
        }
    }

    fn value(&self, var: Var) -> bool {
        self.model.get(var.idx()).copied().unwrap_or(false)
    }
}

/// Deterministic oracle for tests, solving by enumeration
#[cfg(test)]
pub(crate) mod testing {
    use rustsat::types::Var;

    use super::{OracleError, ProofOracle};

    #[derive(Clone, Copy)]
    struct Constraint {
        out: usize,
        a: usize,
        a_inv: bool,
        b: usize,
        b_inv: bool,
        xor: bool,
    }

    impl Constraint {
        fn eval(&self, values: &[bool]) -> bool {
            let a = values[self.a] ^ self.a_inv;
            let b = values[self.b] ^ self.b_inv;
            if self.xor {
                a ^ b
            } else {
                a & b
            }
        }
    }

    /// Enumerates the free variables in counting order; variables defined from earlier ones are
    /// propagated. The first satisfying assignment is returned.
    #[derive(Default)]
    pub(crate) struct EnumeratingOracle {
        nb_vars: usize,
        constraints: Vec<Constraint>,
        definition: Vec<Option<usize>>,
        assumptions: Vec<(usize, bool)>,
        model: Vec<bool>,
        pub(crate) nb_calls: usize,
    }

    impl EnumeratingOracle {
        fn add(&mut self, c: Constraint) {
            if c.a < c.out && c.b < c.out && self.definition[c.out].is_none() {
                self.definition[c.out] = Some(self.constraints.len());
            }
            self.constraints.push(c);
        }
    }

    impl ProofOracle for EnumeratingOracle {
        fn new_var(&mut self) -> Var {
            self.nb_vars += 1;
            self.definition.push(None);
            Var::new(self.nb_vars as u32 - 1)
        }

        fn add_and(
        &mut self,
        out: Var,
        a: Var,
        a_inv: bool,
        b: Var,
        b_inv: bool,
    ) -> Result<(), OracleError> {
            self.add(Constraint {
                out: out.idx(),
                a: a.idx(),
                a_inv,
                b: b.idx(),
                b_inv,
                xor: false,
            });
            Ok(())
        }

        fn add_xor(
        &mut self,
        out: Var,
        a: Var,
        a_inv: bool,
        b: Var,
        b_inv: bool,
    ) -> Result<(), OracleError> {
            self.add(Constraint {
                out: out.idx(),
                a: a.idx(),
                a_inv,
                b: b.idx(),
                b_inv,
                xor: true,
            });
            Ok(())
        }

        fn clear_assumptions(&mut self) {
            self.assumptions.clear();
        }

        fn assume(&mut self, var: Var, value: bool) {
            self.assumptions.push((var.idx(), value));
        }

        fn solve(&mut self) -> Result<bool, OracleError> {
            self.nb_calls += 1;
            let free: Vec<usize> = (0..self.nb_vars)
                .filter(|v| self.definition[*v].is_none())
                .collect();
            assert!(free.len() < 24, "Too many free variables to enumerate");
            let mut values = vec![false; self.nb_vars];
            for assignment in 0u64..(1 << free.len()) {
                for (i, v) in free.iter().enumerate() {
                    values[*v] = (assignment >> i) & 1 != 0;
                }
                for v in 0..self.nb_vars {
                    if let Some(c) = self.definition[v] {
                        values[v] = self.constraints[c].eval(&values);
                    }
                }
                let sat = self.constraints.iter().all(|c| c.eval(&values) == values[c.out])
                    && self.assumptions.iter().all(|(v, b)| values[*v] == *b);
                if sat {
                    self.model = values;
                    return Ok(true);
                }
            }
            Ok(false)
        }

        fn value(&self, var: Var) -> bool {
            self.model[var.idx()]
        }
    }
}

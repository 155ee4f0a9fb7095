//! ## SAT Oracle
//! Propositional entailment is decided by handing a DIMACS CNF problem to a [SatOracle]. The
//! bundled [Dpll] oracle reads the text back and runs a plain DPLL search:
//! - unit propagation and pure literal assignment until a fixpoint,
//! - branching on the first unassigned variable of an open clause, `true` first,
//! - chronological backtracking over an assignment trail.

use bitvec::vec::BitVec;
use log::{debug, info};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SatAnswer {
    Sat,
    Unsat,
}

/// Anything able to decide satisfiability of a DIMACS CNF problem.
pub trait SatOracle {
    fn solve(&mut self, dimacs: &str) -> Result<SatAnswer>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SatLiteral {
    var: u32,
    positive: bool,
}

impl SatLiteral {
    fn of_dimacs(value: i64) -> Result<Self> {
        let var = u32::try_from(value.unsigned_abs())
            .map_err(|_| oracle_error(format!("literal {} out of range", value)))?;
        Ok(SatLiteral {
            var,
            positive: value > 0,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DimacsProblem {
    num_vars: u32,
    clauses: Vec<Vec<SatLiteral>>,
}

fn oracle_error(msg: impl Into<String>) -> Error {
    Error::Oracle(msg.into())
}

fn parse_dimacs(input: &str) -> Result<DimacsProblem> {
    let mut header: Option<(u32, usize)> = None;
    let mut clauses = Vec::new();
    let mut current = Vec::new();
    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('c') {
            continue;
        }
        if line.starts_with('p') {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let [_, "cnf", vars, count] = parts.as_slice() else {
                return Err(oracle_error(format!("malformed problem line '{}'", line)));
            };
            let vars = vars
                .parse()
                .map_err(|_| oracle_error(format!("invalid variable count '{}'", vars)))?;
            let count = count
                .parse()
                .map_err(|_| oracle_error(format!("invalid clause count '{}'", count)))?;
            header = Some((vars, count));
            continue;
        }
        let Some((num_vars, _)) = header else {
            return Err(oracle_error("clause before the problem line"));
        };
        for token in line.split_whitespace() {
            let value: i64 = token
                .parse()
                .map_err(|_| oracle_error(format!("invalid literal '{}'", token)))?;
            if value == 0 {
                clauses.push(std::mem::take(&mut current));
                continue;
            }
            let lit = SatLiteral::of_dimacs(value)?;
            if lit.var > num_vars {
                return Err(oracle_error(format!(
                    "variable {} exceeds the declared {}",
                    lit.var, num_vars
                )));
            }
            current.push(lit);
        }
    }

    let Some((num_vars, count)) = header else {
        return Err(oracle_error("missing problem line"));
    };
    if !current.is_empty() {
        return Err(oracle_error("last clause is not terminated by 0"));
    }
    if clauses.len() != count {
        return Err(oracle_error(format!(
            "expected {} clauses, found {}",
            count,
            clauses.len()
        )));
    }
    Ok(DimacsProblem { num_vars, clauses })
}

enum ClauseState {
    Satisfied,
    Conflict,
    Unit(SatLiteral),
    Open,
}

/// A DPLL oracle working on the DIMACS text it is given.
#[derive(Debug, Clone, Default)]
pub struct Dpll {
    clauses: Vec<Vec<SatLiteral>>,
    assigned: BitVec,
    value: BitVec,
    trail: Vec<u32>,
    decisions: usize,
}

impl Dpll {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decisions made by the last call to [SatOracle::solve].
    pub fn decisions(&self) -> usize {
        self.decisions
    }

    fn eval(&self, lit: SatLiteral) -> Option<bool> {
        let idx = lit.var as usize;
        if self.assigned[idx] {
            Some(self.value[idx] == lit.positive)
        } else {
            None
        }
    }

    fn assign(&mut self, lit: SatLiteral) {
        let idx = lit.var as usize;
        self.assigned.set(idx, true);
        self.value.set(idx, lit.positive);
        self.trail.push(lit.var);
    }

    fn backtrack(&mut self, mark: usize) {
        while self.trail.len() > mark {
            if let Some(var) = self.trail.pop() {
                self.assigned.set(var as usize, false);
            }
        }
    }

    fn clause_state(&self, clause: &[SatLiteral]) -> ClauseState {
        let mut unassigned = None;
        let mut open = 0;
        for lit in clause {
            match self.eval(*lit) {
                Some(true) => return ClauseState::Satisfied,
                Some(false) => {}
                None => {
                    open += 1;
                    unassigned = Some(*lit);
                }
            }
        }
        match (open, unassigned) {
            (0, _) => ClauseState::Conflict,
            (1, Some(lit)) => ClauseState::Unit(lit),
            _ => ClauseState::Open,
        }
    }

    /// Assign unit and pure literals until nothing changes, `false` on a conflict.
    fn propagate(&mut self) -> bool {
        loop {
            let mut changed = false;
            for idx in 0..self.clauses.len() {
                match self.clause_state(&self.clauses[idx]) {
                    ClauseState::Conflict => return false,
                    ClauseState::Unit(lit) => {
                        self.assign(lit);
                        changed = true;
                    }
                    ClauseState::Satisfied | ClauseState::Open => {}
                }
            }
            if !changed {
                changed = self.assign_pure_literals();
            }
            if !changed {
                return true;
            }
        }
    }

    fn assign_pure_literals(&mut self) -> bool {
        let len = self.assigned.len();
        let mut seen_pos: BitVec = BitVec::repeat(false, len);
        let mut seen_neg: BitVec = BitVec::repeat(false, len);
        for clause in self.clauses.iter() {
            if matches!(self.clause_state(clause), ClauseState::Satisfied) {
                continue;
            }
            for lit in clause.iter().filter(|lit| self.eval(**lit).is_none()) {
                if lit.positive {
                    seen_pos.set(lit.var as usize, true);
                } else {
                    seen_neg.set(lit.var as usize, true);
                }
            }
        }
        let mut changed = false;
        for var in 1..len {
            if seen_pos[var] != seen_neg[var] {
                self.assign(SatLiteral {
                    var: var as u32,
                    positive: seen_pos[var],
                });
                changed = true;
            }
        }
        changed
    }

    fn pick_branch_variable(&self) -> Option<u32> {
        self.clauses
            .iter()
            .filter(|clause| !matches!(self.clause_state(clause), ClauseState::Satisfied))
            .flat_map(|clause| clause.iter())
            .find(|lit| self.eval(**lit).is_none())
            .map(|lit| lit.var)
    }

    fn search(&mut self) -> bool {
        let mark = self.trail.len();
        if !self.propagate() {
            self.backtrack(mark);
            return false;
        }
        let Some(var) = self.pick_branch_variable() else {
            return true;
        };
        for positive in [true, false] {
            self.decisions += 1;
            let inner = self.trail.len();
            self.assign(SatLiteral { var, positive });
            if self.search() {
                return true;
            }
            self.backtrack(inner);
        }
        self.backtrack(mark);
        false
    }
}

impl SatOracle for Dpll {
    fn solve(&mut self, dimacs: &str) -> Result<SatAnswer> {
        let problem = parse_dimacs(dimacs)?;
        info!(
            "Solving {} clauses over {} variables",
            problem.clauses.len(),
            problem.num_vars
        );
        let len = problem.num_vars as usize + 1;
        self.clauses = problem.clauses;
        self.assigned = BitVec::repeat(false, len);
        self.value = BitVec::repeat(false, len);
        self.trail.clear();
        self.decisions = 0;

        let answer = if self.search() {
            SatAnswer::Sat
        } else {
            SatAnswer::Unsat
        };
        debug!("{:?} after {} decisions", answer, self.decisions);
        Ok(answer)
    }
}

//! ## First Order Unification
//! The naive rule based first order unification algorithm, applied to terms ([Term::unify]) and
//! to atoms ([Atom::unify]). Failure to unify is not an error, it is reported as `None`.

use log::debug;

use crate::{
    clause::Atom,
    pretty_print::pretty_print,
    subst::{Substitutable, Substitution},
    term_bank::{Term, TermBank},
};

struct UnificationProblem {
    equations: Vec<(Term, Term)>,
    substitution: Substitution,
}

enum UnificationState {
    Success,
    Failure,
    Next,
}

impl UnificationProblem {
    fn new(equations: Vec<(Term, Term)>) -> Self {
        Self {
            equations,
            substitution: Substitution::new(),
        }
    }

    fn step(&mut self, term_bank: &TermBank) -> UnificationState {
        let Some((lhs, rhs)) = self.equations.pop() else {
            return UnificationState::Success;
        };

        if lhs == rhs {
            // t = t, E => E
            return UnificationState::Next;
        }

        match (lhs.variable_id(), rhs.variable_id()) {
            (Some(var_id), _) => {
                if var_id.occurs_in(&rhs) {
                    // x = t, E => bot if x != t and x in var(t)
                    UnificationState::Failure
                } else {
                    // x = t, E => E {x |-> t}
                    let mut binding = Substitution::new();
                    binding.insert(var_id, rhs.clone());
                    for (l, r) in self.equations.iter_mut() {
                        *l = l.clone().subst_with(&binding, term_bank);
                        *r = r.clone().subst_with(&binding, term_bank);
                    }
                    self.substitution.compose_binding(var_id, rhs, term_bank);
                    UnificationState::Next
                }
            }
            (None, Some(_)) => {
                // t = x, E => x = t, E
                self.equations.push((rhs, lhs));
                UnificationState::Next
            }
            (None, None) => match (lhs.function_id(), rhs.function_id()) {
                (Some(f), Some(g)) if f == g => {
                    // f(s_1, ..., s_n) = f(t_1, ..., t_n), E => s_1 = t_1, ..., s_n = t_n, E
                    if let (Some(ss), Some(ts)) = (lhs.function_args(), rhs.function_args()) {
                        ss.iter()
                            .zip(ts)
                            .for_each(|(s, t)| self.equations.push((s.clone(), t.clone())));
                    }
                    UnificationState::Next
                }
                // f(...) = g(...), E => bot if f != g
                _ => UnificationState::Failure,
            },
        }
    }

    fn run(mut self, term_bank: &TermBank) -> Option<Substitution> {
        loop {
            match self.step(term_bank) {
                UnificationState::Success => return Some(self.substitution),
                UnificationState::Failure => return None,
                UnificationState::Next => continue,
            }
        }
    }
}

impl Term {
    /// Try to unify `self` and `other`, returning the most general unifier on success. If both
    /// terms are ground this is `O(1)`.
    pub fn unify(&self, other: &Self, term_bank: &TermBank) -> Option<Substitution> {
        if self.is_ground() && other.is_ground() {
            return (self == other).then(Substitution::new);
        }
        UnificationProblem::new(vec![(self.clone(), other.clone())]).run(term_bank)
    }
}

impl Atom {
    /// Try to unify two atoms argument by argument. Atoms on different predicates never unify.
    pub fn unify(&self, other: &Self, term_bank: &TermBank) -> Option<Substitution> {
        if self.predicate != other.predicate || self.args.len() != other.args.len() {
            return None;
        }
        let equations = self
            .args
            .iter()
            .cloned()
            .zip(other.args.iter().cloned())
            .rev()
            .collect();
        let res = UnificationProblem::new(equations).run(term_bank);
        debug!(
            "Unifying {} with {}: {}",
            pretty_print(self, term_bank),
            pretty_print(other, term_bank),
            if res.is_some() { "success" } else { "failure" }
        );
        res
    }
}

//! ## Skolemization
//! Removes the quantifiers of a first order formula in negation normal form. Universal binders
//! are dropped and their variables stay free (free variables of a clause are implicitly
//! universal). Every existential binder is replaced by a fresh Skolem function applied to the
//! universal variables in scope, where the free variables of the whole formula count as the
//! outermost universals.
//!
//! Removing `<=>` copies subformulas, so one binder variable may be bound by several quantifiers,
//! even of both kinds. Every universal binder is therefore renamed to a fresh variable and every
//! binding only holds inside the body of its quantifier.

use log::debug;

use crate::{
    clause::Atom,
    error::{Error, Result},
    formula::{Connective, Formula, Quantifier},
    subst::{Substitutable, Substitution},
    term_bank::{Term, TermBank, VariableIdentifier, VariableInformation},
};

struct Skolemizer<'a> {
    term_bank: &'a mut TermBank,
    universals: Vec<VariableIdentifier>,
    subst: Substitution,
}

impl Skolemizer<'_> {
    fn atom(&self, atom: Atom) -> Atom {
        atom.subst_with(&self.subst, &*self.term_bank)
    }

    fn run(&mut self, f: Formula<Atom>) -> Result<Formula<Atom>> {
        match f {
            Formula::Truth(_) => Ok(f),
            Formula::Atom(atom) => Ok(Formula::Atom(self.atom(atom))),
            Formula::Not(body) => match *body {
                Formula::Atom(atom) => Ok(Formula::not(Formula::Atom(self.atom(atom)))),
                _ => Err(Error::Invariant(
                    "Skolemization expects negation normal form".to_string(),
                )),
            },
            Formula::Binary(conn @ (Connective::And | Connective::Or), lhs, rhs) => {
                let lhs = self.run(*lhs)?;
                let rhs = self.run(*rhs)?;
                Ok(Formula::binary(conn, lhs, rhs))
            }
            Formula::Binary(conn, _, _) => Err(Error::Invariant(format!(
                "connective {} reached Skolemization",
                conn
            ))),
            Formula::Quantified(Quantifier::Forall, var, body) => {
                let name = self.term_bank.get_variable_info(var).name.clone();
                let fresh = self.term_bank.add_variable(VariableInformation { name });
                let renamed = self.term_bank.mk_variable(fresh);
                self.universals.push(fresh);
                let res = self.scoped(var, renamed, *body);
                self.universals.pop();
                res
            }
            Formula::Quantified(Quantifier::Exists, var, body) => {
                let skolem = self.term_bank.add_skolem_function(self.universals.len());
                let args = self
                    .universals
                    .iter()
                    .map(|v| self.term_bank.mk_variable(*v))
                    .collect();
                let witness = self.term_bank.mk_app(skolem, args);
                debug!(
                    "Skolemizing {} with {}",
                    self.term_bank.get_variable_info(var).name,
                    self.term_bank.get_function_info(skolem).name
                );
                self.scoped(var, witness, *body)
            }
        }
    }

    /// Run on `body` with `var` replaced by `term`, restoring the outer binding of `var` after.
    fn scoped(
        &mut self,
        var: VariableIdentifier,
        term: Term,
        body: Formula<Atom>,
    ) -> Result<Formula<Atom>> {
        let outer = self.subst.remove(var);
        self.subst.insert(var, term);
        let res = self.run(body);
        self.subst.remove(var);
        if let Some(outer) = outer {
            self.subst.insert(var, outer);
        }
        res
    }
}

/// Skolemize the NNF formula `f` whose free variables are `free`.
pub fn skolemize(
    f: Formula<Atom>,
    free: &[VariableIdentifier],
    term_bank: &mut TermBank,
) -> Result<Formula<Atom>> {
    let mut skolemizer = Skolemizer {
        term_bank,
        universals: free.to_vec(),
        subst: Substitution::new(),
    };
    skolemizer.run(f)
}

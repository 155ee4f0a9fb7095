//! ## Clausal Normal Form
//! The conversion of quantifier free formulas into sets of clauses. The pipeline is
//! 1. [remove_equivalence]: `a <=> b` becomes `(a => b) ^ (b => a)`,
//! 2. [remove_implication]: `a => b` becomes `~a | b`,
//! 3. [to_nnf]: negations are pushed down to the atoms,
//! 4. [distribute]: `|` is distributed over `^`, producing a [ClauseSet],
//! 5. [filter_tautologies]: clauses holding an atom and its negation are dropped.
//!
//! First order formulas are Skolemized between step 3 and step 4. The conversion makes no
//! attempt to avoid the exponential blowup of distribution.

use std::collections::BTreeSet;

use crate::{
    error::{Error, Result},
    formula::{Connective, Formula, Signed},
};

/// A disjunction of signed atoms, `∅` is `false`.
pub type CnfClause<A> = BTreeSet<Signed<A>>;

/// A conjunction of clauses, `∅` is `true`.
pub type ClauseSet<A> = BTreeSet<CnfClause<A>>;

/// Replace every `a <=> b` by `(a => b) ^ (b => a)`.
pub fn remove_equivalence<A: Clone>(f: Formula<A>) -> Formula<A> {
    match f {
        Formula::Truth(_) | Formula::Atom(_) => f,
        Formula::Not(body) => Formula::not(remove_equivalence(*body)),
        Formula::Binary(Connective::Equiv, lhs, rhs) => {
            let lhs = remove_equivalence(*lhs);
            let rhs = remove_equivalence(*rhs);
            Formula::and(
                Formula::implies(lhs.clone(), rhs.clone()),
                Formula::implies(rhs, lhs),
            )
        }
        Formula::Binary(conn, lhs, rhs) => {
            Formula::binary(conn, remove_equivalence(*lhs), remove_equivalence(*rhs))
        }
        Formula::Quantified(q, var, body) => Formula::quantified(q, var, remove_equivalence(*body)),
    }
}

/// Replace every `a => b` by `~a | b`.
pub fn remove_implication<A>(f: Formula<A>) -> Formula<A> {
    match f {
        Formula::Truth(_) | Formula::Atom(_) => f,
        Formula::Not(body) => Formula::not(remove_implication(*body)),
        Formula::Binary(Connective::Implies, lhs, rhs) => Formula::or(
            Formula::not(remove_implication(*lhs)),
            remove_implication(*rhs),
        ),
        Formula::Binary(conn, lhs, rhs) => {
            Formula::binary(conn, remove_implication(*lhs), remove_implication(*rhs))
        }
        Formula::Quantified(q, var, body) => Formula::quantified(q, var, remove_implication(*body)),
    }
}

/// Push negations down to the atoms, negating the whole formula if `invert` is set. Double
/// negations cancel on the way. Fails if an implication or equivalence is still present.
pub fn to_nnf<A>(f: Formula<A>, invert: bool) -> Result<Formula<A>> {
    match f {
        Formula::Truth(b) => Ok(Formula::Truth(b != invert)),
        Formula::Atom(atom) => {
            let atom = Formula::Atom(atom);
            Ok(if invert { Formula::not(atom) } else { atom })
        }
        Formula::Not(body) => to_nnf(*body, !invert),
        Formula::Binary(conn @ (Connective::And | Connective::Or), lhs, rhs) => {
            let conn = match (conn, invert) {
                (Connective::And, true) => Connective::Or,
                (Connective::Or, true) => Connective::And,
                (conn, _) => conn,
            };
            Ok(Formula::binary(conn, to_nnf(*lhs, invert)?, to_nnf(*rhs, invert)?))
        }
        Formula::Binary(conn, _, _) => Err(Error::Invariant(format!(
            "connective {} survived until negation normal form",
            conn
        ))),
        Formula::Quantified(q, var, body) => {
            let q = if invert { q.dual() } else { q };
            Ok(Formula::quantified(q, var, to_nnf(*body, invert)?))
        }
    }
}

/// Steps 1 to 3 of the pipeline.
pub fn normalize_to_nnf<A: Clone>(f: Formula<A>, invert: bool) -> Result<Formula<A>> {
    to_nnf(remove_implication(remove_equivalence(f)), invert)
}

/// Distribute `|` over `^` in a quantifier free NNF formula. `T` contributes no clause and `F`
/// contributes the empty clause.
pub fn distribute<A: Clone + Ord>(f: Formula<A>) -> Result<ClauseSet<A>> {
    match f {
        Formula::Truth(true) => Ok(ClauseSet::new()),
        Formula::Truth(false) => Ok(BTreeSet::from([CnfClause::new()])),
        Formula::Atom(atom) => Ok(BTreeSet::from([BTreeSet::from([Signed::pos(atom)])])),
        Formula::Not(body) => match *body {
            Formula::Atom(atom) => Ok(BTreeSet::from([BTreeSet::from([Signed::neg(atom)])])),
            _ => Err(Error::Invariant(
                "negation above a non atomic formula during distribution".to_string(),
            )),
        },
        Formula::Binary(Connective::And, lhs, rhs) => {
            let mut clauses = distribute(*lhs)?;
            clauses.append(&mut distribute(*rhs)?);
            Ok(clauses)
        }
        Formula::Binary(Connective::Or, lhs, rhs) => {
            let lhs = distribute(*lhs)?;
            let rhs = distribute(*rhs)?;
            let mut clauses = ClauseSet::new();
            for c1 in lhs.iter() {
                for c2 in rhs.iter() {
                    clauses.insert(c1.union(c2).cloned().collect());
                }
            }
            Ok(clauses)
        }
        Formula::Binary(conn, _, _) => Err(Error::Invariant(format!(
            "connective {} reached distribution",
            conn
        ))),
        Formula::Quantified(..) => Err(Error::Invariant(
            "quantifier reached distribution".to_string(),
        )),
    }
}

/// A clause containing some atom with both polarities.
pub fn is_tautology<A: Ord>(clause: &CnfClause<A>) -> bool {
    // Literals are ordered by atom first, so complementary ones are neighbours.
    let lits: Vec<&Signed<A>> = clause.iter().collect();
    lits.windows(2).any(|pair| pair[0].atom == pair[1].atom)
}

/// Drop all tautological clauses.
pub fn filter_tautologies<A: Ord>(clauses: ClauseSet<A>) -> ClauseSet<A> {
    clauses
        .into_iter()
        .filter(|clause| !is_tautology(clause))
        .collect()
}

/// The full pipeline for quantifier free formulas.
pub fn to_clauses<A: Clone + Ord>(f: Formula<A>) -> Result<ClauseSet<A>> {
    let nnf = normalize_to_nnf(f, false)?;
    Ok(filter_tautologies(distribute(nnf)?))
}

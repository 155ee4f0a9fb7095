//! ## Clauses
//! First order atoms, literals and clauses. The key exported data structures are:
//! - [Atom] a predicate applied to argument terms.
//! - [Literal] a signed [Atom].
//! - [Clause] a duplicate free disjunction of literals kept in a canonical order.
//! - [VariableRenamer] which standardizes clauses apart onto the canonical variables of a
//!   [TermBank].
//!
//! Unlike terms, clauses are compared and hashed structurally. Since terms are hash consed this
//! amounts to comparing a handful of pointers per literal.

use crate::{
    formula::{Polarity, Signed},
    subst::{Substitutable, Substitution},
    term_bank::{PredicateIdentifier, Term, TermBank, VariableIdentifier},
};

/// A predicate applied to terms, `p(t1, ..., tn)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Atom {
    pub predicate: PredicateIdentifier,
    pub args: Vec<Term>,
}

impl Atom {
    pub fn new(predicate: PredicateIdentifier, args: Vec<Term>) -> Self {
        Self { predicate, args }
    }

    pub fn is_ground(&self) -> bool {
        self.args.iter().all(|arg| arg.is_ground())
    }

    pub fn collect_vars_into(&self, acc: &mut Vec<VariableIdentifier>) {
        self.args.iter().for_each(|arg| arg.collect_vars_into(acc));
    }
}

pub type Literal = Signed<Atom>;

impl Literal {
    pub fn predicate(&self) -> PredicateIdentifier {
        self.atom.predicate
    }
}

/// An index of a literal within a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LiteralId(usize);

/// Identifies a clause inside a clause store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClauseId(pub(crate) usize);

/// A disjunction of literals. The literals are sorted, so those on one predicate are adjacent,
/// and contain no duplicates. The empty clause is `false`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Clause {
    literals: Vec<Literal>,
}

impl Clause {
    /// Build a clause from `literals`, sorting them (by predicate first) and dropping duplicates.
    pub fn new(mut literals: Vec<Literal>) -> Self {
        literals.sort();
        literals.dedup();
        Self { literals }
    }

    pub fn empty() -> Self {
        Self {
            literals: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn is_unit(&self) -> bool {
        self.len() == 1
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn iter(&self) -> impl Iterator<Item = (LiteralId, &Literal)> {
        self.literals
            .iter()
            .enumerate()
            .map(|(idx, lit)| (LiteralId(idx), lit))
    }

    /// The literals on `predicate` with the given polarity.
    pub fn iter_on(
        &self,
        predicate: PredicateIdentifier,
        polarity: Polarity,
    ) -> impl Iterator<Item = (LiteralId, &Literal)> {
        self.iter()
            .filter(move |(_, lit)| lit.predicate() == predicate && lit.polarity == polarity)
    }

    pub fn mentions(&self, predicate: PredicateIdentifier) -> bool {
        self.literals.iter().any(|lit| lit.predicate() == predicate)
    }

    pub fn has_literal_on(&self, predicate: PredicateIdentifier, polarity: Polarity) -> bool {
        self.iter_on(predicate, polarity).next().is_some()
    }

    /// The distinct predicates of the clause, in literal order.
    pub fn predicates(&self) -> Vec<PredicateIdentifier> {
        let mut preds = Vec::new();
        for lit in self.literals.iter() {
            if !preds.contains(&lit.predicate()) {
                preds.push(lit.predicate());
            }
        }
        preds
    }

    /// A clause containing an atom together with its negation.
    pub fn is_tautology(&self) -> bool {
        self.literals.iter().enumerate().any(|(idx, l1)| {
            self.literals[idx + 1..]
                .iter()
                .any(|l2| l1.is_complement_of(l2))
        })
    }

    pub fn is_ground(&self) -> bool {
        self.literals.iter().all(|lit| lit.atom.is_ground())
    }

    /// All variables of the clause in order of first occurrence.
    pub fn variables(&self) -> Vec<VariableIdentifier> {
        let mut vars = Vec::new();
        self.literals
            .iter()
            .for_each(|lit| lit.atom.collect_vars_into(&mut vars));
        vars
    }

    /// The clause without the literal `literal_id`.
    pub fn without(&self, literal_id: LiteralId) -> Vec<Literal> {
        self.iter()
            .filter(|(id, _)| *id != literal_id)
            .map(|(_, lit)| lit.clone())
            .collect()
    }

    /// Rename the clause variables onto the next canonical variables of `renamer`. Renaming two
    /// clauses with the same renamer leaves them without shared variables.
    pub fn standardize_apart(&self, renamer: &mut VariableRenamer, term_bank: &mut TermBank) -> Self {
        let subst = renamer.rename(&self.variables(), term_bank);
        self.clone().subst_with(&subst, term_bank)
    }

    /// The clause over canonical variables numbered from zero.
    pub fn canonical(&self, term_bank: &mut TermBank) -> Self {
        self.standardize_apart(&mut VariableRenamer::new(), term_bank)
    }
}

impl Substitutable for Atom {
    fn subst_with(self, subst: &Substitution, term_bank: &TermBank) -> Self {
        Self {
            predicate: self.predicate,
            args: self
                .args
                .into_iter()
                .map(|arg| arg.subst_with(subst, term_bank))
                .collect(),
        }
    }
}

impl Substitutable for Literal {
    fn subst_with(self, subst: &Substitution, term_bank: &TermBank) -> Self {
        Self {
            atom: self.atom.subst_with(subst, term_bank),
            polarity: self.polarity,
        }
    }
}

impl Substitutable for Clause {
    /// Substitution may identify literals, the result is normalized again.
    fn subst_with(self, subst: &Substitution, term_bank: &TermBank) -> Self {
        if subst.is_nop() {
            return self;
        }
        Clause::new(
            self.literals
                .into_iter()
                .map(|lit| lit.subst_with(subst, term_bank))
                .collect(),
        )
    }
}

/// Hands out canonical variables in order. A fresh renamer starts again at the first one, so
/// the renaming of a clause only depends on the clause itself.
#[derive(Debug, Default)]
pub struct VariableRenamer {
    next: usize,
}

impl VariableRenamer {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// Map each of `vars` to the next unused canonical variable.
    pub fn rename(&mut self, vars: &[VariableIdentifier], term_bank: &mut TermBank) -> Substitution {
        let mut subst = Substitution::new();
        for var in vars {
            let target = term_bank.canonical_variable(self.next);
            self.next += 1;
            if target.variable_id() != Some(*var) {
                subst.insert(*var, target);
            }
        }
        subst
    }
}

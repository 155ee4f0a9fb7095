//! ## Formulas
//! The formula tree shared by the propositional and the first order side of the prover. The key
//! exported data structures are:
//! - [Formula] a tree of connectives, quantifiers and truth constants over some atom type `A`.
//! - [Signed] an atom together with a [Polarity], the literal type produced by normalization.

use std::fmt::{self, Display};

use crate::term_bank::VariableIdentifier;

/// Whether a literal is the atom itself or its negation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Polarity {
    Pos,
    Neg,
}

impl Polarity {
    pub fn negate(self) -> Polarity {
        match self {
            Polarity::Pos => Polarity::Neg,
            Polarity::Neg => Polarity::Pos,
        }
    }

    /// [Polarity::Neg] if `invert` is set, [Polarity::Pos] otherwise.
    pub fn of_inversion(invert: bool) -> Polarity {
        if invert { Polarity::Neg } else { Polarity::Pos }
    }
}

/// An atom with a polarity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signed<A> {
    pub atom: A,
    pub polarity: Polarity,
}

impl<A> Signed<A> {
    pub fn new(atom: A, polarity: Polarity) -> Self {
        Self { atom, polarity }
    }

    pub fn pos(atom: A) -> Self {
        Self::new(atom, Polarity::Pos)
    }

    pub fn neg(atom: A) -> Self {
        Self::new(atom, Polarity::Neg)
    }

    pub fn negate(self) -> Self {
        Self {
            atom: self.atom,
            polarity: self.polarity.negate(),
        }
    }
}

impl<A: PartialEq> Signed<A> {
    /// Same atom, opposite polarity.
    pub fn is_complement_of(&self, other: &Self) -> bool {
        self.polarity != other.polarity && self.atom == other.atom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Connective {
    And,
    Or,
    Implies,
    Equiv,
}

impl Connective {
    fn as_str(&self) -> &'static str {
        match self {
            Connective::And => "^",
            Connective::Or => "|",
            Connective::Implies => "=>",
            Connective::Equiv => "<=>",
        }
    }
}

impl Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quantifier {
    Forall,
    Exists,
}

impl Quantifier {
    /// The quantifier `~Q x. ~phi` is equivalent to.
    pub fn dual(self) -> Quantifier {
        match self {
            Quantifier::Forall => Quantifier::Exists,
            Quantifier::Exists => Quantifier::Forall,
        }
    }
}

impl Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantifier::Forall => f.write_str("!A"),
            Quantifier::Exists => f.write_str("!E"),
        }
    }
}

/// A formula over atoms of type `A`. Equality and hashing are structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula<A> {
    Truth(bool),
    Atom(A),
    Not(Box<Formula<A>>),
    Binary(Connective, Box<Formula<A>>, Box<Formula<A>>),
    Quantified(Quantifier, VariableIdentifier, Box<Formula<A>>),
}

impl<A> Formula<A> {
    pub fn not(f: Formula<A>) -> Self {
        Formula::Not(Box::new(f))
    }

    pub fn binary(conn: Connective, lhs: Formula<A>, rhs: Formula<A>) -> Self {
        Formula::Binary(conn, Box::new(lhs), Box::new(rhs))
    }

    pub fn and(lhs: Formula<A>, rhs: Formula<A>) -> Self {
        Self::binary(Connective::And, lhs, rhs)
    }

    pub fn or(lhs: Formula<A>, rhs: Formula<A>) -> Self {
        Self::binary(Connective::Or, lhs, rhs)
    }

    pub fn implies(lhs: Formula<A>, rhs: Formula<A>) -> Self {
        Self::binary(Connective::Implies, lhs, rhs)
    }

    pub fn equiv(lhs: Formula<A>, rhs: Formula<A>) -> Self {
        Self::binary(Connective::Equiv, lhs, rhs)
    }

    pub fn quantified(quantifier: Quantifier, var: VariableIdentifier, body: Formula<A>) -> Self {
        Formula::Quantified(quantifier, var, Box::new(body))
    }

    /// Fold `terms` with `conn` to the right. Returns `None` for an empty list.
    fn fold(conn: Connective, terms: Vec<Formula<A>>) -> Option<Self> {
        terms
            .into_iter()
            .rev()
            .reduce(|acc, term| Self::binary(conn, term, acc))
    }

    /// `t1 ^ ... ^ tn`, `T` for no terms.
    pub fn conjunction(terms: Vec<Formula<A>>) -> Self {
        Self::fold(Connective::And, terms).unwrap_or(Formula::Truth(true))
    }

    /// `t1 | ... | tn`, `F` for no terms.
    pub fn disjunction(terms: Vec<Formula<A>>) -> Self {
        Self::fold(Connective::Or, terms).unwrap_or(Formula::Truth(false))
    }

    /// `t1 ^ ... ^ tn-1 => tn`, a single term is returned as is and no terms give `T`.
    pub fn implication(mut terms: Vec<Formula<A>>) -> Self {
        match terms.pop() {
            None => Formula::Truth(true),
            Some(consequent) if terms.is_empty() => consequent,
            Some(consequent) => Self::implies(Self::conjunction(terms), consequent),
        }
    }

    /// Visit every atom in the formula from left to right.
    pub fn for_each_atom<'a>(&'a self, f: &mut impl FnMut(&'a A)) {
        match self {
            Formula::Truth(_) => {}
            Formula::Atom(atom) => f(atom),
            Formula::Not(body) | Formula::Quantified(_, _, body) => body.for_each_atom(f),
            Formula::Binary(_, lhs, rhs) => {
                lhs.for_each_atom(f);
                rhs.for_each_atom(f);
            }
        }
    }

    /// Rebuild the formula with every atom replaced by `f(atom)`.
    pub fn map_atoms<B>(self, f: &mut impl FnMut(A) -> B) -> Formula<B> {
        match self {
            Formula::Truth(b) => Formula::Truth(b),
            Formula::Atom(atom) => Formula::Atom(f(atom)),
            Formula::Not(body) => Formula::not(body.map_atoms(f)),
            Formula::Binary(conn, lhs, rhs) => {
                let lhs = lhs.map_atoms(f);
                Formula::binary(conn, lhs, rhs.map_atoms(f))
            }
            Formula::Quantified(q, var, body) => Formula::quantified(q, var, body.map_atoms(f)),
        }
    }

    pub fn is_quantifier_free(&self) -> bool {
        match self {
            Formula::Truth(_) | Formula::Atom(_) => true,
            Formula::Not(body) => body.is_quantifier_free(),
            Formula::Binary(_, lhs, rhs) => lhs.is_quantifier_free() && rhs.is_quantifier_free(),
            Formula::Quantified(..) => false,
        }
    }
}

impl<A: Display> Display for Formula<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Truth(true) => f.write_str("T"),
            Formula::Truth(false) => f.write_str("F"),
            Formula::Atom(atom) => write!(f, "{}", atom),
            Formula::Not(body) => write!(f, "~{}", body),
            Formula::Binary(conn, lhs, rhs) => write!(f, "({} {} {})", lhs, conn, rhs),
            Formula::Quantified(q, var, body) => write!(f, "({} {:?} {})", q, var, body),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Connective, Formula, Polarity, Signed};

    fn atom(name: &str) -> Formula<String> {
        Formula::Atom(name.to_string())
    }

    #[test]
    fn folding_test() {
        assert_eq!(Formula::<String>::conjunction(vec![]), Formula::Truth(true));
        assert_eq!(Formula::<String>::disjunction(vec![]), Formula::Truth(false));
        assert_eq!(Formula::conjunction(vec![atom("a")]), atom("a"));
        assert_eq!(
            Formula::conjunction(vec![atom("a"), atom("b"), atom("c")]),
            Formula::and(atom("a"), Formula::and(atom("b"), atom("c")))
        );
        assert_eq!(
            Formula::implication(vec![atom("a"), atom("b"), atom("c"), atom("d")]),
            Formula::implies(
                Formula::and(atom("a"), Formula::and(atom("b"), atom("c"))),
                atom("d")
            )
        );
        assert_eq!(Formula::implication(vec![atom("a")]), atom("a"));
    }

    #[test]
    fn display_test() {
        let f = Formula::binary(
            Connective::Equiv,
            Formula::not(atom("a")),
            Formula::or(atom("b"), Formula::Truth(false)),
        );
        assert_eq!(f.to_string(), "(~a <=> (b | F))");
    }

    #[test]
    fn map_atoms_test() {
        let f = Formula::and(atom("a"), Formula::not(atom("bb")));
        let g = f.clone().map_atoms(&mut |a: String| a.len());
        let mut lens = Vec::new();
        g.for_each_atom(&mut |len| lens.push(*len));
        assert_eq!(lens, vec![1, 2]);
        assert!(g.is_quantifier_free());
    }

    #[test]
    fn signed_test() {
        let p = Signed::pos("p");
        let not_p = Signed::neg("p");
        assert!(p.is_complement_of(&not_p));
        assert!(!p.is_complement_of(&p));
        assert_eq!(p.clone().negate(), not_p);
        assert_eq!(Polarity::of_inversion(true), Polarity::Neg);
    }
}

//! # Kbres
//! This library contains a small resolution prover for knowledge bases. First order formulas are
//! converted to clauses ([normalizer], [skolem]) and queries are answered by bucket elimination
//! resolution ([resolution]) in an order chosen by [elimination]. Purely propositional knowledge
//! bases go through [propositional] instead, which hands DIMACS problems to a SAT oracle ([sat]).
//! Both kinds of knowledge base implement the query contract in [kb].

pub mod binding;
pub mod clause;
pub mod clause_store;
pub mod elimination;
pub mod error;
pub mod formula;
pub mod kb;
pub mod normalizer;
pub mod parser;
pub mod pretty_print;
pub mod proofs;
pub mod propositional;
pub mod resolution;
pub mod sat;
pub mod skolem;
pub mod subst;
pub mod term_bank;
pub mod term_manager;
pub mod unify;

//! ## Propositional Knowledge Base
//! [PropKb] keeps a propositional clause set and decides entailment through a [SatOracle]:
//! the negated query is converted to clauses, joined with the knowledge base, written out as
//! DIMACS and handed to the oracle. The query is entailed iff the result is unsatisfiable.
//!
//! Formulas are read by a level parser. Every parenthesized level may use a single kind of
//! connective, `a ^ b ^ c` is fine but `a ^ b | c` has to be written `(a ^ b) | c`. A chain
//! `a => b => c` reads as `a ^ b => c`, `<=>` takes exactly two operands. `T` and `F` are the
//! truth constants and may not appear inside literal names.

use std::{fmt, time::Instant};

use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::{
    binding::{BindingCollector, BindingSet},
    error::{Error, ParseErrorKind, Result},
    formula::{Connective, Formula, Polarity},
    kb::{Kb, QueryStats},
    normalizer::{ClauseSet, distribute, filter_tautologies, normalize_to_nnf, to_clauses},
    sat::{Dpll, SatAnswer, SatOracle},
};

/// Interns literal names to ids counting up from 1.
#[derive(Debug, Clone, Default)]
pub struct LiteralTable {
    ids: FxHashMap<String, u32>,
    names: Vec<String>,
}

impl LiteralTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        self.names.push(name.to_string());
        let id = self.names.len() as u32;
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        let idx = (id as usize).checked_sub(1)?;
        self.names.get(idx).map(|name| name.as_str())
    }

    /// The largest id handed out so far, `0` if none.
    pub fn max_id(&self) -> u32 {
        self.names.len() as u32
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All literals with their ids, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(idx, name)| (idx as u32 + 1, name.as_str()))
    }
}

#[derive(Debug, Default)]
struct Level {
    connective: Option<Connective>,
    operators: usize,
    terms: Vec<Formula<String>>,
    negate: bool,
    literal: Option<String>,
}

impl Level {
    fn push(&mut self, term: Formula<String>) {
        let term = if self.negate { Formula::not(term) } else { term };
        self.negate = false;
        self.terms.push(term);
    }

    /// End the literal currently being read, a pending `~` without one is an error.
    fn break_literal(&mut self, position: usize) -> Result<()> {
        match self.literal.take() {
            Some(name) => self.push(Formula::Atom(name)),
            None if self.negate => {
                return Err(Error::parse(position, ParseErrorKind::DanglingNegation));
            }
            None => {}
        }
        Ok(())
    }

    fn connective(&mut self, conn: Connective, position: usize) -> Result<()> {
        self.break_literal(position)?;
        match self.connective {
            Some(other) if other != conn => {
                Err(Error::parse(position, ParseErrorKind::MixedConnectives))
            }
            _ => {
                self.connective = Some(conn);
                self.operators += 1;
                Ok(())
            }
        }
    }

    fn finish(mut self, position: usize) -> Result<Formula<String>> {
        self.break_literal(position)?;
        let malformed = ParseErrorKind::MalformedSubformula {
            terms: self.terms.len(),
            operators: self.operators,
        };
        let Some(conn) = self.connective else {
            return match self.terms.pop() {
                Some(term) if self.terms.is_empty() => Ok(term),
                _ => Err(Error::parse(position, malformed)),
            };
        };
        if self.terms.len() != self.operators + 1 {
            return Err(Error::parse(position, malformed));
        }
        Ok(match conn {
            Connective::And => Formula::conjunction(self.terms),
            Connective::Or => Formula::disjunction(self.terms),
            Connective::Implies => Formula::implication(self.terms),
            Connective::Equiv => {
                let arity = self.terms.len();
                let mut terms = self.terms.into_iter();
                match (terms.next(), terms.next(), terms.next()) {
                    (Some(lhs), Some(rhs), None) => Formula::equiv(lhs, rhs),
                    _ => {
                        return Err(Error::parse(
                            position,
                            ParseErrorKind::EquivalenceArity(arity),
                        ));
                    }
                }
            }
        })
    }
}

struct LevelParser {
    chars: Vec<char>,
    pos: usize,
}

impl LevelParser {
    fn expect(&mut self, expected: char, kind: ParseErrorKind) -> Result<()> {
        if self.chars.get(self.pos) == Some(&expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(Error::parse(self.pos, kind))
        }
    }

    fn parse_level(&mut self, depth: usize) -> Result<Formula<String>> {
        let mut level = Level::default();
        while let Some(&c) = self.chars.get(self.pos) {
            let at = self.pos;
            self.pos += 1;
            match c {
                '(' => {
                    if level.literal.is_some() {
                        return Err(Error::parse(at, ParseErrorKind::UnexpectedChar(c)));
                    }
                    let sub = self.parse_level(depth + 1)?;
                    level.push(sub);
                }
                ')' => {
                    if depth == 0 {
                        return Err(Error::parse(at, ParseErrorKind::UnmatchedClose));
                    }
                    return level.finish(at);
                }
                'T' | 'F' => {
                    if level.literal.is_some() {
                        return Err(Error::parse(at, ParseErrorKind::TruthConstantInLiteral(c)));
                    }
                    level.push(Formula::Truth(c == 'T'));
                }
                '~' => {
                    if level.literal.is_some() {
                        return Err(Error::parse(at, ParseErrorKind::UnexpectedChar(c)));
                    }
                    level.negate = !level.negate;
                }
                '<' => {
                    self.expect('=', ParseErrorKind::MalformedEquivalence)?;
                    self.expect('>', ParseErrorKind::MalformedEquivalence)?;
                    level.connective(Connective::Equiv, at)?;
                }
                '=' => {
                    self.expect('>', ParseErrorKind::MalformedImplication)?;
                    level.connective(Connective::Implies, at)?;
                }
                '^' => level.connective(Connective::And, at)?,
                '|' => level.connective(Connective::Or, at)?,
                c if c.is_whitespace() => level.break_literal(at)?,
                c => level.literal.get_or_insert_with(String::new).push(c),
            }
        }
        if depth > 0 {
            return Err(Error::parse(self.pos, ParseErrorKind::UnclosedOpen));
        }
        level.finish(self.pos)
    }
}

/// Parse a propositional formula. Nothing is interned, so a failed parse has no effect.
pub fn parse_formula(input: &str) -> Result<Formula<String>> {
    let mut parser = LevelParser {
        chars: input.chars().collect(),
        pos: 0,
    };
    parser.parse_level(0)
}

/// A DIMACS CNF problem. Its [Display] implementation writes the problem line, one comment per
/// literal mapping its name to its id and one line per clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimacsProblem {
    pub num_vars: u32,
    pub literals: Vec<(u32, String)>,
    pub clauses: Vec<Vec<i64>>,
}

impl DimacsProblem {
    fn new(table: &LiteralTable, clauses: ClauseSet<u32>) -> Self {
        let clauses = clauses
            .into_iter()
            .map(|clause| {
                clause
                    .into_iter()
                    .map(|lit| match lit.polarity {
                        Polarity::Pos => i64::from(lit.atom),
                        Polarity::Neg => -i64::from(lit.atom),
                    })
                    .collect()
            })
            .collect();
        DimacsProblem {
            num_vars: table.max_id(),
            literals: table
                .iter()
                .map(|(id, name)| (id, name.to_string()))
                .collect(),
            clauses,
        }
    }
}

impl fmt::Display for DimacsProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "p cnf {} {}", self.num_vars, self.clauses.len())?;
        for (id, name) in self.literals.iter() {
            writeln!(f, "c {} -> #{}", name, id)?;
        }
        for clause in self.clauses.iter() {
            for lit in clause {
                write!(f, "{} ", lit)?;
            }
            writeln!(f, "0")?;
        }
        Ok(())
    }
}

/// A propositional knowledge base answering queries through a satisfiability oracle.
#[derive(Debug, Clone)]
pub struct PropKb<O = Dpll> {
    literals: LiteralTable,
    clauses: ClauseSet<u32>,
    oracle: O,
    stats: QueryStats,
}

impl PropKb<Dpll> {
    pub fn new() -> Self {
        Self::with_oracle(Dpll::new())
    }
}

impl Default for PropKb<Dpll> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: SatOracle> PropKb<O> {
    pub fn with_oracle(oracle: O) -> Self {
        PropKb {
            literals: LiteralTable::new(),
            clauses: ClauseSet::new(),
            oracle,
            stats: QueryStats::default(),
        }
    }

    pub fn literals(&self) -> &LiteralTable {
        &self.literals
    }

    pub fn clauses(&self) -> &ClauseSet<u32> {
        &self.clauses
    }

    /// Conjoin the formula `text` to the knowledge base.
    pub fn add_axiom(&mut self, text: &str) -> Result<()> {
        let formula = parse_formula(text)?;
        let literals = &mut self.literals;
        let formula = formula.map_atoms(&mut |name| literals.intern(&name));
        let clauses = to_clauses(formula)?;
        info!("Told {}: {} clause(s)", text, clauses.len());
        self.clauses.extend(clauses);
        Ok(())
    }

    /// The clauses of `~query` together with the knowledge base. Literals only the query
    /// mentions get ids in a scratch copy of the literal table.
    pub fn export_clauses(&self, query: &str) -> Result<DimacsProblem> {
        let formula = parse_formula(query)?;
        let mut scratch = self.literals.clone();
        let formula = formula.map_atoms(&mut |name| scratch.intern(&name));
        let mut clauses = filter_tautologies(distribute(normalize_to_nnf(formula, true)?)?);
        clauses.extend(self.clauses.iter().cloned());
        Ok(DimacsProblem::new(&scratch, clauses))
    }

    /// Whether the knowledge base entails `query`.
    pub fn entails(&mut self, query: &str) -> Result<bool> {
        let start = Instant::now();
        let problem = self.export_clauses(query)?;
        let dimacs = problem.to_string();
        debug!("Handing the oracle:\n{}", dimacs);
        let answer = self.oracle.solve(&dimacs)?;
        let entailed = answer == SatAnswer::Unsat;
        self.stats = QueryStats {
            query_time: start.elapsed(),
            clauses_generated: problem.clauses.len(),
            ..Default::default()
        };
        info!("Asked {}: {}", query, entailed);
        Ok(entailed)
    }
}

impl<O: SatOracle> Kb for PropKb<O> {
    fn tell(&mut self, text: &str) -> Result<()> {
        self.add_axiom(text)
    }

    fn ask(&mut self, text: &str) -> Result<bool> {
        self.entails(text)
    }

    /// Propositional queries have no variables: one empty answer if entailed, none otherwise.
    fn ask_bindings(&mut self, text: &str) -> Result<BindingSet> {
        let mut collector = BindingCollector::new(Vec::new());
        if self.entails(text)? {
            collector.add(Vec::new())?;
        }
        Ok(collector.seal())
    }

    fn stats(&self) -> &QueryStats {
        &self.stats
    }
}

#[cfg(test)]
mod test {
    use crate::{
        error::{Error, ParseErrorKind},
        formula::Formula,
        kb::Kb,
    };

    use super::{PropKb, parse_formula};

    fn parse_error(input: &str) -> ParseErrorKind {
        match parse_formula(input) {
            Err(Error::Parse { kind, .. }) => kind,
            other => panic!("expected a parse error for {}, got {:?}", input, other),
        }
    }

    #[test]
    fn parse_test() {
        let f = parse_formula("~a ^ (b | ~~c) ^ T").unwrap();
        assert_eq!(f.to_string(), "(~a ^ ((b | c) ^ T))");
        let f = parse_formula("a => b => c").unwrap();
        assert_eq!(f.to_string(), "((a ^ b) => c)");
        let f = parse_formula("  (long_name)  ").unwrap();
        assert_eq!(f, Formula::Atom("long_name".to_string()));
        let f = parse_formula("~(a <=> b)").unwrap();
        assert_eq!(f.to_string(), "~(a <=> b)");
    }

    #[test]
    fn parse_error_test() {
        assert_eq!(parse_error("p ^ | q"), ParseErrorKind::MixedConnectives);
        assert_eq!(parse_error("a ^ b | c"), ParseErrorKind::MixedConnectives);
        assert_eq!(parse_error("a = b"), ParseErrorKind::MalformedImplication);
        assert_eq!(parse_error("a <= b"), ParseErrorKind::MalformedEquivalence);
        assert_eq!(parse_error("~ a"), ParseErrorKind::DanglingNegation);
        assert_eq!(parse_error("aTb"), ParseErrorKind::TruthConstantInLiteral('T'));
        assert_eq!(
            parse_error("a b"),
            ParseErrorKind::MalformedSubformula {
                terms: 2,
                operators: 0
            }
        );
        assert_eq!(
            parse_error("a ^"),
            ParseErrorKind::MalformedSubformula {
                terms: 1,
                operators: 1
            }
        );
        assert_eq!(parse_error("(a ^ b"), ParseErrorKind::UnclosedOpen);
        assert_eq!(parse_error("a)"), ParseErrorKind::UnmatchedClose);
        assert_eq!(parse_error("a <=> b <=> c"), ParseErrorKind::EquivalenceArity(3));
    }

    #[test]
    fn entailment_test() {
        let mut kb = PropKb::new();
        kb.tell("p => q").unwrap();
        kb.tell("q => r").unwrap();
        kb.tell("p").unwrap();
        assert!(kb.ask("r").unwrap());
        assert!(!kb.ask("~r").unwrap());
        assert!(kb.ask("q ^ r").unwrap());
        assert!(!kb.ask("s").unwrap());
        assert_eq!(kb.literals().len(), 3);

        let bindings = kb.ask_bindings("r").unwrap();
        assert_eq!(bindings.len(), 1);
        assert!(bindings.variables().is_empty());
        assert!(kb.ask_bindings("~p").unwrap().is_empty());
    }

    #[test]
    fn malformed_tell_test() {
        let mut kb = PropKb::new();
        kb.tell("a | b").unwrap();
        let err = kb.tell("p ^ | q").unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(kb.literals().len(), 2);
        assert_eq!(kb.clauses().len(), 1);
    }

    #[test]
    fn dimacs_test() {
        let mut kb = PropKb::new();
        kb.tell("a | b").unwrap();
        let problem = kb.export_clauses("a").unwrap();
        assert_eq!(
            problem.to_string(),
            "p cnf 2 2\nc a -> #1\nc b -> #2\n1 2 0\n-1 0\n"
        );

        // Query literals do not enter the knowledge base.
        let problem = kb.export_clauses("c").unwrap();
        assert_eq!(problem.num_vars, 3);
        assert_eq!(kb.literals().len(), 2);
        assert!(!kb.ask("c").unwrap());
    }

    #[test]
    fn truth_constant_test() {
        let mut kb = PropKb::new();
        kb.tell("T").unwrap();
        kb.tell("a | ~a").unwrap();
        assert!(kb.clauses().is_empty());
        assert!(kb.ask("T").unwrap());
        assert!(!kb.ask("a").unwrap());

        kb.tell("F").unwrap();
        assert!(kb.export_clauses("a").unwrap().to_string().contains("\n0\n"));
        assert!(kb.ask("a").unwrap());
        assert!(kb.ask("~a").unwrap());
    }

    #[test]
    fn grouping_test() {
        let mut kb = PropKb::new();
        kb.tell("~(a ^ b)").unwrap();
        kb.tell("a").unwrap();
        kb.tell("(c ^ d) <=> a").unwrap();
        assert!(kb.ask("~b").unwrap());
        assert!(kb.ask("d").unwrap());
        assert!(kb.ask("(a ^ c) | b").unwrap());
    }
}

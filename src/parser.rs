//! ## First Order Formula Parser
//! Reads the infix first order syntax into a name based [SyntaxFormula] which is lowered into a
//! [Formula] over [Atom]s by [SyntaxFormula::lower]. Symbols are only interned during lowering,
//! so input that fails to parse leaves the [TermBank] untouched.
//!
//! The accepted syntax:
//! - variables `?x`, constants and function or predicate names `[A-Za-z0-9_]+`,
//! - atoms `p(t1,...,tn)` or `p`, equations `t1 = t2` and `t1 ~= t2`,
//! - `T` and `F` for the truth constants,
//! - `~`, `^`, `|`, `=>`, `<=>` from tightest to loosest binding, `=>` associates to the right
//!   and `<=>` takes exactly two operands,
//! - `!A ?x phi` and `!E ?x phi` where `phi` extends as far to the right as possible.

use std::fmt;

use crate::{
    clause::Atom,
    error::{Error, ParseErrorKind, Result},
    formula::{Connective, Formula, Quantifier},
    term_bank::{EQUALITY_PREDICATE, Term, TermBank, VariableIdentifier, VariableInformation},
};

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum SyntaxTerm {
    Variable(String),
    Function(String, Vec<SyntaxTerm>),
}

impl fmt::Display for SyntaxTerm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SyntaxTerm::Variable(name) => write!(f, "?{}", name),
            SyntaxTerm::Function(name, args) if args.is_empty() => write!(f, "{}", name),
            SyntaxTerm::Function(name, args) => write!(
                f,
                "{}({})",
                name,
                args.iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<String>>()
                    .join(",")
            ),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum SyntaxFormula {
    Truth(bool),
    Atom(String, Vec<SyntaxTerm>),
    Equal(SyntaxTerm, SyntaxTerm),
    Not(Box<SyntaxFormula>),
    Binary(Connective, Box<SyntaxFormula>, Box<SyntaxFormula>),
    Quantified(Quantifier, String, Box<SyntaxFormula>),
}

impl fmt::Display for SyntaxFormula {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SyntaxFormula::Truth(true) => write!(f, "T"),
            SyntaxFormula::Truth(false) => write!(f, "F"),
            SyntaxFormula::Atom(name, args) => {
                write!(f, "{}", SyntaxTerm::Function(name.clone(), args.clone()))
            }
            SyntaxFormula::Equal(lhs, rhs) => write!(f, "{} = {}", lhs, rhs),
            SyntaxFormula::Not(body) => write!(f, "~({})", body),
            SyntaxFormula::Binary(conn, lhs, rhs) => write!(f, "({} {} {})", lhs, conn, rhs),
            SyntaxFormula::Quantified(q, var, body) => write!(f, "{} ?{} {}", q, var, body),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    LParen,
    RParen,
    Comma,
    Not,
    NotEqual,
    And,
    Or,
    Implies,
    Equiv,
    Equal,
    Forall,
    Exists,
    Var(String),
    Ident(String),
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut tokens = Vec::new();
    let mut idx = 0;
    let peek = |idx: usize| chars.get(idx).map(|(_, c)| *c);

    while let Some(&(pos, c)) = chars.get(idx) {
        idx += 1;
        let token = match c {
            c if c.is_whitespace() => continue,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '^' => Token::And,
            '|' => Token::Or,
            '~' if peek(idx) == Some('=') => {
                idx += 1;
                Token::NotEqual
            }
            '~' => Token::Not,
            '=' if peek(idx) == Some('>') => {
                idx += 1;
                Token::Implies
            }
            '=' => Token::Equal,
            '<' => {
                if peek(idx) == Some('=') && peek(idx + 1) == Some('>') {
                    idx += 2;
                    Token::Equiv
                } else {
                    return Err(Error::parse(pos, ParseErrorKind::MalformedEquivalence));
                }
            }
            '!' => match peek(idx) {
                Some('A') => {
                    idx += 1;
                    Token::Forall
                }
                Some('E') => {
                    idx += 1;
                    Token::Exists
                }
                _ => return Err(Error::parse(pos, ParseErrorKind::UnexpectedChar('!'))),
            },
            '?' => {
                let start = idx;
                while peek(idx).is_some_and(is_ident_char) {
                    idx += 1;
                }
                if start == idx {
                    return Err(Error::parse(pos, ParseErrorKind::ExpectedVariable));
                }
                Token::Var(chars[start..idx].iter().map(|(_, c)| *c).collect())
            }
            c if is_ident_char(c) => {
                let start = idx - 1;
                while peek(idx).is_some_and(is_ident_char) {
                    idx += 1;
                }
                Token::Ident(chars[start..idx].iter().map(|(_, c)| *c).collect())
            }
            c => return Err(Error::parse(pos, ParseErrorKind::UnexpectedChar(c))),
        };
        tokens.push((pos, token));
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    idx: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.idx).map(|(_, t)| t)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.idx).map_or(self.end, |(pos, _)| *pos)
    }

    fn error(&self, kind: ParseErrorKind) -> Error {
        Error::parse(self.position(), kind)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.idx += 1;
            true
        } else {
            false
        }
    }

    fn next(&mut self) -> Result<Token> {
        match self.tokens.get(self.idx) {
            Some((_, token)) => {
                self.idx += 1;
                Ok(token.clone())
            }
            None => Err(self.error(ParseErrorKind::UnexpectedEnd)),
        }
    }

    fn unexpected(&self, token: &Token) -> Error {
        let kind = match token {
            Token::RParen => ParseErrorKind::UnmatchedClose,
            Token::Comma => ParseErrorKind::UnexpectedChar(','),
            _ => ParseErrorKind::ExpectedTerm,
        };
        Error::parse(self.tokens[self.idx - 1].0, kind)
    }

    /// The error for a token left over after a complete formula.
    fn trailing(&self) -> Error {
        match self.peek() {
            None => self.error(ParseErrorKind::UnclosedOpen),
            Some(Token::RParen) => self.error(ParseErrorKind::UnmatchedClose),
            Some(Token::Ident(_) | Token::Var(_) | Token::LParen) => {
                self.error(ParseErrorKind::MalformedSubformula {
                    terms: 2,
                    operators: 0,
                })
            }
            Some(_) => self.error(ParseErrorKind::MixedConnectives),
        }
    }

    fn parse_formula(&mut self) -> Result<SyntaxFormula> {
        let lhs = self.parse_implication()?;
        if !self.eat(&Token::Equiv) {
            return Ok(lhs);
        }
        let rhs = self.parse_implication()?;
        if self.peek() == Some(&Token::Equiv) {
            return Err(self.error(ParseErrorKind::EquivalenceArity(3)));
        }
        Ok(SyntaxFormula::Binary(
            Connective::Equiv,
            Box::new(lhs),
            Box::new(rhs),
        ))
    }

    fn parse_implication(&mut self) -> Result<SyntaxFormula> {
        let lhs = self.parse_disjunction()?;
        if self.eat(&Token::Implies) {
            let rhs = self.parse_implication()?;
            Ok(SyntaxFormula::Binary(
                Connective::Implies,
                Box::new(lhs),
                Box::new(rhs),
            ))
        } else {
            Ok(lhs)
        }
    }

    fn parse_disjunction(&mut self) -> Result<SyntaxFormula> {
        let mut lhs = self.parse_conjunction()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_conjunction()?;
            lhs = SyntaxFormula::Binary(Connective::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_conjunction(&mut self) -> Result<SyntaxFormula> {
        let mut lhs = self.parse_unary()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_unary()?;
            lhs = SyntaxFormula::Binary(Connective::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<SyntaxFormula> {
        match self.next()? {
            Token::Not => Ok(SyntaxFormula::Not(Box::new(self.parse_unary()?))),
            Token::Forall => self.parse_quantified(Quantifier::Forall),
            Token::Exists => self.parse_quantified(Quantifier::Exists),
            Token::LParen => {
                let inner = self.parse_formula()?;
                if self.eat(&Token::RParen) {
                    Ok(inner)
                } else {
                    Err(self.trailing())
                }
            }
            Token::Var(name) => self.parse_equation(SyntaxTerm::Variable(name)),
            Token::Ident(name) => {
                let args = self.parse_args()?;
                if matches!(self.peek(), Some(Token::Equal | Token::NotEqual)) {
                    return self.parse_equation(SyntaxTerm::Function(name, args));
                }
                match (name.as_str(), args.is_empty()) {
                    ("T", true) => Ok(SyntaxFormula::Truth(true)),
                    ("F", true) => Ok(SyntaxFormula::Truth(false)),
                    _ => Ok(SyntaxFormula::Atom(name, args)),
                }
            }
            Token::And | Token::Or | Token::Implies | Token::Equiv => {
                Err(Error::parse(self.tokens[self.idx - 1].0, ParseErrorKind::MixedConnectives))
            }
            token => Err(self.unexpected(&token)),
        }
    }

    fn parse_quantified(&mut self, quantifier: Quantifier) -> Result<SyntaxFormula> {
        match self.next() {
            Ok(Token::Var(name)) => {
                let body = self.parse_formula()?;
                Ok(SyntaxFormula::Quantified(quantifier, name, Box::new(body)))
            }
            _ => Err(Error::parse(
                self.tokens
                    .get(self.idx.saturating_sub(1))
                    .map_or(self.end, |(pos, _)| *pos),
                ParseErrorKind::ExpectedVariable,
            )),
        }
    }

    fn parse_equation(&mut self, lhs: SyntaxTerm) -> Result<SyntaxFormula> {
        let negated = match self.peek() {
            Some(Token::Equal) => false,
            Some(Token::NotEqual) => true,
            _ => return Err(self.error(ParseErrorKind::ExpectedTerm)),
        };
        self.idx += 1;
        let rhs = self.parse_term()?;
        let eq = SyntaxFormula::Equal(lhs, rhs);
        Ok(if negated {
            SyntaxFormula::Not(Box::new(eq))
        } else {
            eq
        })
    }

    fn parse_args(&mut self) -> Result<Vec<SyntaxTerm>> {
        let mut args = Vec::new();
        if !self.eat(&Token::LParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_term()?);
            if self.eat(&Token::RParen) {
                return Ok(args);
            }
            if !self.eat(&Token::Comma) {
                return Err(self.error(if self.peek().is_none() {
                    ParseErrorKind::UnclosedOpen
                } else {
                    ParseErrorKind::ExpectedTerm
                }));
            }
        }
    }

    fn parse_term(&mut self) -> Result<SyntaxTerm> {
        match self.peek().cloned() {
            Some(Token::Var(name)) => {
                self.idx += 1;
                Ok(SyntaxTerm::Variable(name))
            }
            Some(Token::Ident(name)) => {
                self.idx += 1;
                Ok(SyntaxTerm::Function(name, self.parse_args()?))
            }
            Some(_) => Err(self.error(ParseErrorKind::ExpectedTerm)),
            None => Err(self.error(ParseErrorKind::UnexpectedEnd)),
        }
    }
}

/// Parse a complete first order formula.
pub fn parse(input: &str) -> Result<SyntaxFormula> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        idx: 0,
        end: input.len(),
    };
    let formula = parser.parse_formula()?;
    if parser.peek().is_none() {
        Ok(formula)
    } else {
        Err(parser.trailing())
    }
}

/// A lowered formula together with its free variables in order of first occurrence.
#[derive(Debug, Clone)]
pub struct LoweredFormula {
    pub formula: Formula<Atom>,
    pub free_variables: Vec<(String, VariableIdentifier)>,
}

impl LoweredFormula {
    pub fn free_variable_ids(&self) -> Vec<VariableIdentifier> {
        self.free_variables.iter().map(|(_, id)| *id).collect()
    }
}

struct Lowering<'a> {
    term_bank: &'a mut TermBank,
    scope: Vec<(String, VariableIdentifier)>,
    free: Vec<(String, VariableIdentifier)>,
}

impl Lowering<'_> {
    fn variable(&mut self, name: &str) -> VariableIdentifier {
        let bound = self.scope.iter().rev().find(|(n, _)| n == name);
        if let Some((_, id)) = bound.or_else(|| self.free.iter().find(|(n, _)| n == name)) {
            return *id;
        }
        let id = self.term_bank.add_variable(VariableInformation {
            name: name.to_string(),
        });
        self.free.push((name.to_string(), id));
        id
    }

    fn term(&mut self, term: &SyntaxTerm) -> Term {
        match term {
            SyntaxTerm::Variable(name) => {
                let id = self.variable(name);
                self.term_bank.mk_variable(id)
            }
            SyntaxTerm::Function(name, args) => {
                let args: Vec<Term> = args.iter().map(|arg| self.term(arg)).collect();
                let id = self.term_bank.get_or_add_function(name, args.len());
                self.term_bank.mk_app(id, args)
            }
        }
    }

    fn atom(&mut self, name: &str, args: &[SyntaxTerm]) -> Atom {
        let args: Vec<Term> = args.iter().map(|arg| self.term(arg)).collect();
        let predicate = self.term_bank.get_or_add_predicate(name, args.len());
        Atom::new(predicate, args)
    }

    fn formula(&mut self, f: &SyntaxFormula) -> Formula<Atom> {
        match f {
            SyntaxFormula::Truth(b) => Formula::Truth(*b),
            SyntaxFormula::Atom(name, args) => Formula::Atom(self.atom(name, args)),
            SyntaxFormula::Equal(lhs, rhs) => {
                Formula::Atom(self.atom(EQUALITY_PREDICATE, &[lhs.clone(), rhs.clone()]))
            }
            SyntaxFormula::Not(body) => Formula::not(self.formula(body)),
            SyntaxFormula::Binary(conn, lhs, rhs) => {
                let lhs = self.formula(lhs);
                Formula::binary(*conn, lhs, self.formula(rhs))
            }
            SyntaxFormula::Quantified(q, name, body) => {
                // Every binder gets its own variable, shadowing outer ones of the same name.
                let id = self.term_bank.add_variable(VariableInformation { name: name.clone() });
                self.scope.push((name.clone(), id));
                let body = self.formula(body);
                self.scope.pop();
                Formula::quantified(*q, id, body)
            }
        }
    }
}

impl SyntaxFormula {
    /// Intern all symbols of the formula into `term_bank` and build the corresponding
    /// [Formula].
    pub fn lower(&self, term_bank: &mut TermBank) -> LoweredFormula {
        let mut lowering = Lowering {
            term_bank,
            scope: Vec::new(),
            free: Vec::new(),
        };
        let formula = lowering.formula(self);
        LoweredFormula {
            formula,
            free_variables: lowering.free,
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{
        error::{Error, ParseErrorKind},
        formula::{Connective, Quantifier},
        pretty_print::pretty_print,
        term_bank::TermBank,
    };

    use super::{SyntaxFormula, SyntaxTerm, parse};

    fn kind_of(input: &str) -> ParseErrorKind {
        match parse(input) {
            Err(Error::Parse { kind, .. }) => kind,
            other => panic!("expected a parse error for {}, got {:?}", input, other),
        }
    }

    #[test]
    fn precedence_test() {
        let f = parse("a ^ b | c => d").unwrap();
        assert_eq!(f.to_string(), "(((a ^ b) | c) => d)");
        let f = parse("a => b => c").unwrap();
        assert_eq!(f.to_string(), "(a => (b => c))");
        let f = parse("~a ^ b <=> c").unwrap();
        assert_eq!(f.to_string(), "((~(a) ^ b) <=> c)");
    }

    #[test]
    fn quantifier_test() {
        let f = parse("!A ?x (p(?x) => q(?x))").unwrap();
        match f {
            SyntaxFormula::Quantified(Quantifier::Forall, var, body) => {
                assert_eq!(var, "x");
                assert!(matches!(*body, SyntaxFormula::Binary(Connective::Implies, _, _)));
            }
            _ => panic!("expected a quantifier"),
        }
        // The body extends as far as possible
        let f = parse("!E ?y r(?y) ^ s(?y)").unwrap();
        assert_eq!(f.to_string(), "!E ?y (r(?y) ^ s(?y))");
    }

    #[test]
    fn equality_test() {
        let f = parse("hasHeart(?x,?h1) ^ hasHeart(?x,?h2) => ?h1=?h2").unwrap();
        assert_eq!(
            f.to_string(),
            "((hasHeart(?x,?h1) ^ hasHeart(?x,?h2)) => ?h1 = ?h2)"
        );
        let f = parse("f(a) ~= b").unwrap();
        assert_eq!(
            f,
            SyntaxFormula::Not(Box::new(SyntaxFormula::Equal(
                SyntaxTerm::Function(
                    "f".to_string(),
                    vec![SyntaxTerm::Function("a".to_string(), vec![])]
                ),
                SyntaxTerm::Function("b".to_string(), vec![])
            )))
        );
    }

    #[test]
    fn error_test() {
        assert_eq!(kind_of("p ^ | q"), ParseErrorKind::MixedConnectives);
        assert_eq!(kind_of("(p ^ q"), ParseErrorKind::UnclosedOpen);
        assert_eq!(kind_of("p ^ q)"), ParseErrorKind::UnmatchedClose);
        assert_eq!(kind_of("p < q"), ParseErrorKind::MalformedEquivalence);
        assert_eq!(kind_of("a <=> b <=> c"), ParseErrorKind::EquivalenceArity(3));
        assert_eq!(kind_of("!A p(?x)"), ParseErrorKind::ExpectedVariable);
        assert_eq!(kind_of("p(a,"), ParseErrorKind::UnexpectedEnd);
        assert_eq!(kind_of("?x"), ParseErrorKind::ExpectedTerm);
        assert_eq!(kind_of("p ^"), ParseErrorKind::UnexpectedEnd);
        assert!(matches!(
            kind_of("p q"),
            ParseErrorKind::MalformedSubformula { .. }
        ));
    }

    #[test]
    fn lowering_test() {
        let mut term_bank = TermBank::new();
        let f = parse("on(?b,?t) ^ (!E ?t tin(?t,?c)) ^ on(?b,?t)").unwrap();
        let lowered = f.lower(&mut term_bank);
        let names: Vec<&str> = lowered
            .free_variables
            .iter()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(names, vec!["b", "t", "c"]);
        assert_eq!(
            pretty_print(&lowered.formula, &term_bank),
            "((on(?b,?t) ^ !E ?t tin(?t,?c)) ^ on(?b,?t))"
        );
        // The bound ?t is a different variable than the free one
        let on = term_bank.find_predicate("on", 2).unwrap();
        let tin = term_bank.find_predicate("tin", 2).unwrap();
        assert_ne!(on, tin);
        assert_eq!(lowered.free_variable_ids().len(), 3);
    }
}

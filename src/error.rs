//! ## Errors
//! The crate wide [Error] type. Parse errors are recoverable and never touch the knowledge base,
//! [Error::Invariant] signals a broken internal consistency condition and should be treated as a
//! bug.

use thiserror::Error;

/// What exactly went wrong while reading a formula.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("`)` without matching `(`")]
    UnmatchedClose,
    #[error("`(` is never closed")]
    UnclosedOpen,
    #[error("`=` must be followed by `>`")]
    MalformedImplication,
    #[error("`<` must be followed by `=>`")]
    MalformedEquivalence,
    #[error("^, |, => and <=> mixed at the same level")]
    MixedConnectives,
    #[error("`~` must be followed directly by a literal or `(`")]
    DanglingNegation,
    #[error("truth constant `{0}` inside a literal name")]
    TruthConstantInLiteral(char),
    #[error("malformed subformula with {terms} operand(s) and {operators} connective(s)")]
    MalformedSubformula { terms: usize, operators: usize },
    #[error("<=> takes exactly two operands, found {0}")]
    EquivalenceArity(usize),
    #[error("expected a term")]
    ExpectedTerm,
    #[error("expected a variable after the quantifier")]
    ExpectedVariable,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("parse error at position {position}: {kind}")]
    Parse {
        position: usize,
        kind: ParseErrorKind,
    },
    #[error("internal invariant violated: {0}")]
    Invariant(String),
    #[error("satisfiability oracle failed: {0}")]
    Oracle(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn parse(position: usize, kind: ParseErrorKind) -> Self {
        Error::Parse { position, kind }
    }

    /// Return `true` for errors that leave the knowledge base untouched and may be retried with
    /// different input.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Parse { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use super::{Error, ParseErrorKind};

    #[test]
    fn display_test() {
        let err = Error::parse(3, ParseErrorKind::MixedConnectives);
        assert_eq!(
            err.to_string(),
            "parse error at position 3: ^, |, => and <=> mixed at the same level"
        );
        assert!(err.is_recoverable());
        assert!(!Error::Invariant("x".to_string()).is_recoverable());
    }
}

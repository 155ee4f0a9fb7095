//! ## Answer Bindings
//! Answers to a bindings query are collected into a [BindingCollector] while the refutation
//! runs and handed out as a sealed, read only [BindingSet] afterwards. Sealing consumes the
//! collector, so a set can not change once a caller sees it.

use std::{collections::BTreeSet, fmt};

use crate::error::{Error, Result};

/// Accumulates answer tuples for a fixed list of query variables.
#[derive(Debug, Clone)]
pub struct BindingCollector {
    variables: Vec<String>,
    tuples: BTreeSet<Vec<String>>,
}

impl BindingCollector {
    pub fn new(variables: Vec<String>) -> Self {
        Self {
            variables,
            tuples: BTreeSet::new(),
        }
    }

    pub fn arity(&self) -> usize {
        self.variables.len()
    }

    /// Record one answer, returning `false` if it was already known.
    pub fn add(&mut self, tuple: Vec<String>) -> Result<bool> {
        if tuple.len() != self.variables.len() {
            return Err(Error::Invariant(format!(
                "answer tuple of length {} for {} query variables",
                tuple.len(),
                self.variables.len()
            )));
        }
        Ok(self.tuples.insert(tuple))
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn seal(self) -> BindingSet {
        BindingSet {
            variables: self.variables,
            tuples: self.tuples.into_iter().collect(),
        }
    }
}

/// The answers of a bindings query: the query variables in order of first occurrence and one
/// tuple of printed terms per distinct answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingSet {
    variables: Vec<String>,
    tuples: Vec<Vec<String>>,
}

impl BindingSet {
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn tuples(&self) -> impl Iterator<Item = &[String]> {
        self.tuples.iter().map(|tuple| tuple.as_slice())
    }

    /// The value `variable` takes in answer number `row`.
    pub fn get(&self, row: usize, variable: &str) -> Option<&str> {
        let col = self.variables.iter().position(|v| v == variable)?;
        self.tuples.get(row).map(|tuple| tuple[col].as_str())
    }

    pub fn contains(&self, tuple: &[&str]) -> bool {
        self.tuples
            .iter()
            .any(|t| t.len() == tuple.len() && t.iter().zip(tuple).all(|(a, b)| a == b))
    }
}

impl fmt::Display for BindingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tuple in self.tuples.iter() {
            let pairs: Vec<String> = self
                .variables
                .iter()
                .zip(tuple)
                .map(|(var, value)| format!("?{}={}", var, value))
                .collect();
            writeln!(f, "{{{}}}", pairs.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::BindingCollector;

    #[test]
    fn collect_and_seal_test() {
        let mut collector = BindingCollector::new(vec!["b".to_string(), "t".to_string()]);
        assert_eq!(collector.arity(), 2);
        assert!(collector.add(vec!["b1".to_string(), "t1".to_string()]).unwrap());
        assert!(!collector.add(vec!["b1".to_string(), "t1".to_string()]).unwrap());
        assert!(collector.add(vec!["b1".to_string()]).is_err());
        assert!(collector.add(vec!["b2".to_string(), "t1".to_string()]).unwrap());

        let set = collector.seal();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&["b2", "t1"]));
        assert!(!set.contains(&["t1", "b2"]));
        assert_eq!(set.get(0, "b"), Some("b1"));
        assert_eq!(set.get(1, "t"), Some("t1"));
        assert_eq!(set.get(0, "c"), None);
        assert_eq!(set.to_string(), "{?b=b1, ?t=t1}\n{?b=b2, ?t=t1}\n");
    }
}

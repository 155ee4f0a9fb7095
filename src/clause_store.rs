//! ## Clause Store
//! The clause set of a first order knowledge base together with the predicate index used for
//! bucket elimination. The key exported data structures are:
//! - [ClauseStore] an arena of clauses indexed by [ClauseId] and by predicate.
//! - [ClauseList] the clauses with a positive and with a negative occurrence of one predicate.
//! - [Bucket] the clauses removed from a store for eliminating one predicate.
//!
//! A clause with several literals on the same predicate is listed once per polarity. Identical
//! clauses are stored once. Cloning a store is the per query snapshot.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;

use crate::{
    clause::{Clause, ClauseId},
    error::{Error, Result},
    formula::Polarity,
    term_bank::PredicateIdentifier,
};

/// The clauses containing some predicate positively (`pos`) and negatively (`neg`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClauseList {
    pub pos: Vec<ClauseId>,
    pub neg: Vec<ClauseId>,
}

impl ClauseList {
    pub fn is_empty(&self) -> bool {
        self.pos.is_empty() && self.neg.is_empty()
    }

    fn side_mut(&mut self, polarity: Polarity) -> &mut Vec<ClauseId> {
        match polarity {
            Polarity::Pos => &mut self.pos,
            Polarity::Neg => &mut self.neg,
        }
    }
}

/// The clauses taken out of a store to eliminate `predicate`.
#[derive(Debug, Clone)]
pub struct Bucket {
    pub predicate: PredicateIdentifier,
    pub pos: Vec<Clause>,
    pub neg: Vec<Clause>,
}

impl Bucket {
    pub fn len(&self) -> usize {
        self.pos.len() + self.neg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClauseStore {
    arena: Vec<Option<Clause>>,
    ids: FxHashMap<Clause, ClauseId>,
    index: BTreeMap<PredicateIdentifier, ClauseList>,
    live: usize,
}

impl ClauseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `clause`, returning `None` if an identical clause is already present.
    pub fn insert(&mut self, clause: Clause) -> Option<ClauseId> {
        if self.ids.contains_key(&clause) {
            return None;
        }
        let id = ClauseId(self.arena.len());
        for (_, lit) in clause.iter() {
            let list = self.index.entry(lit.predicate()).or_default().side_mut(lit.polarity);
            if list.last() != Some(&id) {
                list.push(id);
            }
        }
        self.ids.insert(clause.clone(), id);
        self.arena.push(Some(clause));
        self.live += 1;
        Some(id)
    }

    pub fn get(&self, id: ClauseId) -> Option<&Clause> {
        self.arena.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn contains(&self, clause: &Clause) -> bool {
        self.ids.contains_key(clause)
    }

    /// Whether the empty clause has been inserted, the store is unsatisfiable then.
    pub fn contains_empty(&self) -> bool {
        self.contains(&Clause::empty())
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClauseId, &Clause)> {
        self.arena
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|clause| (ClauseId(idx), clause)))
    }

    pub fn clause_list(&self, predicate: PredicateIdentifier) -> Option<&ClauseList> {
        self.index.get(&predicate)
    }

    /// Every predicate the store has indexed. Keys stay after their clauses are removed.
    pub fn predicate_keys(&self) -> BTreeSet<PredicateIdentifier> {
        self.index.keys().copied().collect()
    }

    /// Remove the clause `id` from the arena and from every list of the index.
    pub fn remove(&mut self, id: ClauseId) -> Result<Clause> {
        let clause = self
            .arena
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or_else(|| Error::Invariant(format!("clause {:?} is not in the store", id)))?;
        for predicate in clause.predicates() {
            let list = self.index.get_mut(&predicate).ok_or_else(|| {
                Error::Invariant(format!("predicate {:?} of clause {:?} not indexed", predicate, id))
            })?;
            let before = list.pos.len() + list.neg.len();
            list.pos.retain(|other| *other != id);
            list.neg.retain(|other| *other != id);
            if list.pos.len() + list.neg.len() == before {
                return Err(Error::Invariant(format!(
                    "clause {:?} appears in neither list of predicate {:?}",
                    id, predicate
                )));
            }
        }
        self.ids.remove(&clause);
        self.live -= 1;
        Ok(clause)
    }

    /// Remove every clause mentioning `predicate` and hand them out split by the polarity of
    /// their occurrences. A clause containing both polarities ends up on both sides.
    pub fn take_bucket(&mut self, predicate: PredicateIdentifier) -> Result<Bucket> {
        let list = self.index.get(&predicate).cloned().unwrap_or_default();
        let mut removed: FxHashMap<ClauseId, Clause> = FxHashMap::default();
        for id in list.pos.iter().chain(list.neg.iter()) {
            if !removed.contains_key(id) {
                let clause = self.remove(*id)?;
                removed.insert(*id, clause);
            }
        }
        let collect = |ids: &[ClauseId]| -> Vec<Clause> {
            ids.iter().filter_map(|id| removed.get(id).cloned()).collect()
        };
        Ok(Bucket {
            predicate,
            pos: collect(&list.pos),
            neg: collect(&list.neg),
        })
    }
}

#[cfg(test)]
mod test {
    use crate::{
        clause::{Atom, Clause},
        formula::Signed,
        term_bank::TermBank,
    };

    use super::ClauseStore;

    #[test]
    fn index_test() {
        let mut term_bank = TermBank::new();
        let p = term_bank.get_or_add_predicate("p", 1);
        let q = term_bank.get_or_add_predicate("q", 1);
        let a = term_bank.get_or_add_function("a", 0);
        let f = term_bank.get_or_add_function("f", 1);
        let a = term_bank.mk_const(a);
        let fa = term_bank.mk_app(f, vec![a.clone()]);

        let pa = Atom::new(p, vec![a.clone()]);
        let pfa = Atom::new(p, vec![fa.clone()]);
        let qa = Atom::new(q, vec![a.clone()]);

        let mut store = ClauseStore::new();
        let c1 = store
            .insert(Clause::new(vec![Signed::neg(pa.clone()), Signed::pos(qa.clone())]))
            .unwrap();
        let c2 = store
            .insert(Clause::new(vec![Signed::pos(pa.clone()), Signed::neg(pfa.clone())]))
            .unwrap();
        let c3 = store
            .insert(Clause::new(vec![Signed::pos(pa.clone()), Signed::pos(pfa.clone())]))
            .unwrap();
        assert!(store
            .insert(Clause::new(vec![Signed::pos(qa.clone()), Signed::neg(pa.clone())]))
            .is_none());
        assert_eq!(store.len(), 3);

        let list = store.clause_list(p).unwrap();
        assert_eq!(list.pos, vec![c2, c3]);
        assert_eq!(list.neg, vec![c1, c2]);
        assert_eq!(store.clause_list(q).unwrap().pos, vec![c1]);

        let bucket = store.take_bucket(p).unwrap();
        assert_eq!(bucket.pos.len(), 2);
        assert_eq!(bucket.neg.len(), 2);
        assert!(store.is_empty());
        assert!(store.clause_list(q).unwrap().is_empty());
        assert_eq!(store.predicate_keys().len(), 2);
        assert!(store.remove(c1).is_err());
    }

    #[test]
    fn snapshot_test() {
        let mut term_bank = TermBank::new();
        let p = term_bank.get_or_add_predicate("p", 0);
        let mut store = ClauseStore::new();
        store.insert(Clause::new(vec![Signed::pos(Atom::new(p, vec![]))]));
        let mut snapshot = store.clone();
        snapshot.insert(Clause::empty());
        assert!(snapshot.contains_empty());
        assert!(!store.contains_empty());
        assert_eq!(store.len(), 1);
        assert_eq!(snapshot.len(), 2);
    }
}

//! ## Elimination Ordering
//! Chooses the order in which predicates are eliminated. Two predicates interact when they occur
//! in a common clause; the order is picked greedily on that interaction graph, always
//! eliminating the predicate that adds the fewest new interactions (min fill), ties broken by
//! degree and then by identifier. The answer predicate of a bindings query is always last.
//!
//! [EliminationPlanner] caches the order and recomputes it only when the set of predicate keys
//! of the store changes.

use std::collections::BTreeSet;

use log::info;
use petgraph::graphmap::UnGraphMap;

use crate::{clause_store::ClauseStore, term_bank::PredicateIdentifier};

/// An elimination order together with the predicate keys it was computed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EliminationOrder {
    order: Vec<PredicateIdentifier>,
    keys: BTreeSet<PredicateIdentifier>,
    answer: Option<PredicateIdentifier>,
    width: usize,
}

impl EliminationOrder {
    /// Use `order` as is. Predicates missing from it are never eliminated.
    pub fn fixed(order: Vec<PredicateIdentifier>) -> Self {
        let keys = order.iter().copied().collect();
        Self {
            order,
            keys,
            answer: None,
            width: 0,
        }
    }

    pub fn predicates(&self) -> &[PredicateIdentifier] {
        &self.order
    }

    /// The largest number of neighbours a predicate had when it was eliminated.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// The predicate interaction graph of `store`: a node per predicate key, an edge between any
/// two predicates sharing a clause.
pub fn interaction_graph(store: &ClauseStore) -> UnGraphMap<PredicateIdentifier, ()> {
    let mut graph = UnGraphMap::new();
    for predicate in store.predicate_keys() {
        graph.add_node(predicate);
    }
    for (_, clause) in store.iter() {
        let preds = clause.predicates();
        for (idx, p) in preds.iter().enumerate() {
            for q in preds[idx + 1..].iter() {
                graph.add_edge(*p, *q, ());
            }
        }
    }
    graph
}

fn fill_in(graph: &UnGraphMap<PredicateIdentifier, ()>, node: PredicateIdentifier) -> usize {
    let neighbors: Vec<PredicateIdentifier> = graph.neighbors(node).collect();
    let mut missing = 0;
    for (idx, a) in neighbors.iter().enumerate() {
        for b in neighbors[idx + 1..].iter() {
            if !graph.contains_edge(*a, *b) {
                missing += 1;
            }
        }
    }
    missing
}

/// Greedy min fill elimination over `graph`, returning the order and its width.
pub fn min_fill_order(
    mut graph: UnGraphMap<PredicateIdentifier, ()>,
) -> (Vec<PredicateIdentifier>, usize) {
    let mut order = Vec::with_capacity(graph.node_count());
    let mut width = 0;
    loop {
        let Some(best) = graph
            .nodes()
            .min_by_key(|node| (fill_in(&graph, *node), graph.neighbors(*node).count(), *node))
        else {
            break;
        };
        let neighbors: Vec<PredicateIdentifier> = graph.neighbors(best).collect();
        width = width.max(neighbors.len());
        for (idx, a) in neighbors.iter().enumerate() {
            for b in neighbors[idx + 1..].iter() {
                graph.add_edge(*a, *b, ());
            }
        }
        graph.remove_node(best);
        order.push(best);
    }
    (order, width)
}

/// Compute a fresh elimination order for `store`, moving `answer` to the very end.
pub fn compute_order(store: &ClauseStore, answer: Option<PredicateIdentifier>) -> EliminationOrder {
    let (mut order, width) = min_fill_order(interaction_graph(store));
    if let Some(answer) = answer {
        if let Some(pos) = order.iter().position(|p| *p == answer) {
            order.remove(pos);
            order.push(answer);
        }
    }
    info!(
        "Computed elimination order over {} predicates, width {}",
        order.len(),
        width
    );
    EliminationOrder {
        order,
        keys: store.predicate_keys(),
        answer,
        width,
    }
}

/// Caches the elimination order between queries.
#[derive(Debug, Clone, Default)]
pub struct EliminationPlanner {
    cached: Option<EliminationOrder>,
    builds: usize,
}

impl EliminationPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The elimination order for `store`, recomputed only if the predicate keys or the answer
    /// predicate differ from the cached one.
    pub fn order_for(
        &mut self,
        store: &ClauseStore,
        answer: Option<PredicateIdentifier>,
    ) -> &EliminationOrder {
        let stale = match &self.cached {
            Some(cached) => cached.answer != answer || cached.keys != store.predicate_keys(),
            None => true,
        };
        if stale {
            self.builds += 1;
            self.cached = Some(compute_order(store, answer));
        }
        self.cached.get_or_insert_with(|| compute_order(store, answer))
    }
}

#[cfg(test)]
mod test {
    use crate::{
        clause::{Atom, Clause},
        clause_store::ClauseStore,
        formula::Signed,
        term_bank::{PredicateIdentifier, TermBank},
    };

    use super::{EliminationPlanner, compute_order, interaction_graph};

    fn unit(p: PredicateIdentifier) -> Signed<Atom> {
        Signed::pos(Atom::new(p, vec![]))
    }

    #[test]
    fn chain_test() {
        let mut term_bank = TermBank::new();
        let p = term_bank.get_or_add_predicate("p", 0);
        let q = term_bank.get_or_add_predicate("q", 0);
        let r = term_bank.get_or_add_predicate("r", 0);
        let mut store = ClauseStore::new();
        store.insert(Clause::new(vec![unit(p), unit(q).negate()]));
        store.insert(Clause::new(vec![unit(q), unit(r).negate()]));

        let graph = interaction_graph(&store);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(!graph.contains_edge(p, r));

        let order = compute_order(&store, None);
        assert_eq!(order.predicates(), &[p, q, r]);
        assert_eq!(order.width(), 1);

        let order = compute_order(&store, Some(p));
        assert_eq!(order.predicates().last(), Some(&p));
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn cache_test() {
        let mut term_bank = TermBank::new();
        let p = term_bank.get_or_add_predicate("p", 0);
        let q = term_bank.get_or_add_predicate("q", 0);
        let mut store = ClauseStore::new();
        store.insert(Clause::new(vec![unit(p), unit(q)]));

        let mut planner = EliminationPlanner::new();
        planner.order_for(&store, None);
        store.insert(Clause::new(vec![unit(p).negate()]));
        planner.order_for(&store, None);
        assert_eq!(planner.builds, 1);

        let s = term_bank.get_or_add_predicate("s", 0);
        store.insert(Clause::new(vec![unit(s)]));
        let order = planner.order_for(&store, None).clone();
        assert_eq!(planner.builds, 2);
        assert_eq!(order.len(), 3);

        planner.order_for(&store, Some(q));
        assert_eq!(planner.builds, 3);
    }
}

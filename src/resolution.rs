//! ## Bucket Elimination
//! The refutation engine. Predicates are eliminated one at a time in the order handed in by
//! the planner:
//! - every clause mentioning the predicate is taken out of the store,
//! - all resolvents on that predicate are generated, feeding resolvents that still mention it
//!   back into the bucket until nothing new appears or the per step cap is hit,
//! - the resolvents free of the predicate go back into the store.
//!
//! Deriving the empty clause refutes the clause set. In [ProofMode::All] the engine keeps going
//! after that to collect every answer to a bindings query. Only answers resolved from a single
//! answer literal are collected, resolvents left with several answer literals are dropped.

use std::time::{Duration, Instant};

use log::{debug, info};
use memory_stats::memory_stats;
use rustc_hash::FxHashSet;

use crate::{
    binding::{BindingCollector, BindingSet},
    clause::{Clause, VariableRenamer},
    clause_store::{Bucket, ClauseStore},
    elimination::EliminationOrder,
    error::Result,
    formula::Polarity,
    pretty_print::pretty_print,
    proofs::ProofIndex,
    subst::Substitutable,
    term_bank::{PredicateIdentifier, Term, TermBank},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResourceLimitConfig {
    pub duration: Option<Duration>,
    pub memory_limit: Option<usize>,
}

struct ResourceLimits {
    time_limit: Option<Instant>,
    memory_limit: Option<usize>,
}

impl ResourceLimits {
    fn of_config(config: &ResourceLimitConfig) -> Self {
        let time_limit = config.duration.map(|dur| Instant::now() + dur);
        let memory_limit = config.memory_limit;
        ResourceLimits {
            time_limit,
            memory_limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnknownReason {
    Timeout,
    OutOfMemory,
}

/// Which answer tuples a bindings query reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum AnswerFilter {
    /// Every tuple, even those still containing variables.
    Any,
    /// Tuples of ground terms.
    #[default]
    Ground,
    /// Tuples of constants only.
    #[value(name = "constants")]
    ConstantsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionConfig {
    /// Upper bound on the resolvents generated while eliminating a single predicate.
    pub max_resolutions_per_elimination: usize,
    pub answer_filter: AnswerFilter,
    pub track_proofs: bool,
    pub limits: ResourceLimitConfig,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        ResolutionConfig {
            max_resolutions_per_elimination: 100,
            answer_filter: AnswerFilter::Ground,
            track_proofs: false,
            limits: ResourceLimitConfig::default(),
        }
    }
}

/// Whether to stop at the first empty clause or to exhaust every elimination step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProofMode {
    Single,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefutationStatus {
    /// The empty clause was derived.
    Refuted,
    /// Every predicate was eliminated without deriving the empty clause.
    Exhausted,
    Unknown(UnknownReason),
}

/// The answer predicate of a bindings query and the collector its answers go into.
#[derive(Debug, Clone)]
pub struct AnswerQuery {
    pub predicate: PredicateIdentifier,
    pub collector: BindingCollector,
}

#[derive(Debug, Clone)]
pub struct RefutationResult {
    pub status: RefutationStatus,
    pub steps_generated: usize,
    /// Some elimination step hit the resolution cap, an `Exhausted` status is not conclusive then.
    pub truncated: bool,
    pub proof: ProofIndex,
    pub bindings: Option<BindingSet>,
}

impl RefutationResult {
    pub fn is_refuted(&self) -> bool {
        self.status == RefutationStatus::Refuted
    }
}

enum Interrupt {
    Refuted,
    Unknown(UnknownReason),
}

struct Elimination {
    resolvents: Vec<Clause>,
    interrupt: Option<Interrupt>,
}

struct ResolutionState<'a> {
    store: ClauseStore,
    term_bank: &'a mut TermBank,
    config: &'a ResolutionConfig,
    mode: ProofMode,
    answers: Option<AnswerQuery>,
    proof: ProofIndex,
    resource_limits: ResourceLimits,
    steps_generated: usize,
    truncated: bool,
    refuted: bool,
}

/// Resolution attempts between two resource checks.
const RESOURCE_CHECK_INTERVAL: usize = 64;

impl ResolutionState<'_> {
    fn resources_exhausted(&self) -> Option<UnknownReason> {
        if let Some(time_limit) = self.resource_limits.time_limit {
            let now = Instant::now();
            if now >= time_limit {
                return Some(UnknownReason::Timeout);
            }
        }

        if let Some(memory_limit) = self.resource_limits.memory_limit {
            if let Some(stats) = memory_stats() {
                if memory_limit < stats.physical_mem {
                    return Some(UnknownReason::OutOfMemory);
                }
            }
        }

        None
    }

    fn record_answer(&mut self, tuple: &[Term]) -> Result<()> {
        let Some(answers) = self.answers.as_mut() else {
            return Ok(());
        };
        let accepted = match self.config.answer_filter {
            AnswerFilter::Any => true,
            AnswerFilter::Ground => tuple.iter().all(|term| term.is_ground()),
            AnswerFilter::ConstantsOnly => tuple.iter().all(|term| term.is_constant()),
        };
        if !accepted {
            debug!("Answer tuple rejected by filter {:?}", self.config.answer_filter);
            return Ok(());
        }
        let printed: Vec<String> = tuple
            .iter()
            .map(|term| pretty_print(term, self.term_bank))
            .collect();
        if answers.collector.add(printed.clone())? {
            info!("Answer: ({})", printed.join(", "));
        }
        Ok(())
    }

    fn is_answer_predicate(&self, predicate: PredicateIdentifier) -> bool {
        self.answers
            .as_ref()
            .is_some_and(|answers| answers.predicate == predicate)
    }

    /// All resolvents of `c1` and `c2` on `predicate`, `c1` providing the positive literal.
    fn resolve_pair(
        &mut self,
        c1: &Clause,
        c2: &Clause,
        predicate: PredicateIdentifier,
    ) -> Result<Vec<Clause>> {
        let mut renamer = VariableRenamer::new();
        let c1_renamed = c1.standardize_apart(&mut renamer, self.term_bank);
        let c2_renamed = c2.standardize_apart(&mut renamer, self.term_bank);
        let is_answer = self.is_answer_predicate(predicate);

        let mut acc = Vec::new();
        for (id1, l1) in c1_renamed.iter_on(predicate, Polarity::Pos) {
            for (id2, l2) in c2_renamed.iter_on(predicate, Polarity::Neg) {
                let Some(subst) = l1.atom.unify(&l2.atom, self.term_bank) else {
                    continue;
                };
                let mut literals = c1_renamed.without(id1);
                literals.extend(c2_renamed.without(id2));
                let resolvent = Clause::new(literals).subst_with(&subst, self.term_bank);
                if resolvent.is_empty() && is_answer {
                    let answer = l1.atom.clone().subst_with(&subst, self.term_bank);
                    self.record_answer(&answer.args)?;
                }
                acc.push(resolvent.canonical(self.term_bank));
            }
        }
        Ok(acc)
    }

    fn eliminate(&mut self, bucket: Bucket) -> Result<Elimination> {
        let predicate = bucket.predicate;
        let is_answer = self.is_answer_predicate(predicate);
        let name = self.term_bank.get_predicate_info(predicate).name.clone();
        info!(
            "Eliminating {}: {} positive, {} negative clauses",
            name,
            bucket.pos.len(),
            bucket.neg.len()
        );

        let mut pos_seen: FxHashSet<Clause> = bucket.pos.iter().cloned().collect();
        let mut neg_seen: FxHashSet<Clause> = bucket.neg.iter().cloned().collect();
        let mut pos = bucket.pos;
        let mut neg = bucket.neg;
        let mut attempted: FxHashSet<(usize, usize)> = FxHashSet::default();
        let mut output = Vec::new();
        let mut output_seen: FxHashSet<Clause> = FxHashSet::default();
        let mut resolutions = 0;
        let mut attempts = 0;

        loop {
            let (pos_len, neg_len) = (pos.len(), neg.len());
            for i in 0..pos_len {
                for j in 0..neg_len {
                    if !attempted.insert((i, j)) || pos[i] == neg[j] {
                        continue;
                    }
                    attempts += 1;
                    if attempts % RESOURCE_CHECK_INTERVAL == 0 {
                        if let Some(reason) = self.resources_exhausted() {
                            return Ok(Elimination {
                                resolvents: output,
                                interrupt: Some(Interrupt::Unknown(reason)),
                            });
                        }
                    }

                    let c1 = pos[i].clone();
                    let c2 = neg[j].clone();
                    for resolvent in self.resolve_pair(&c1, &c2, predicate)? {
                        self.steps_generated += 1;
                        resolutions += 1;
                        self.proof.record(&resolvent, (&c1, &c2), self.term_bank);
                        debug!(
                            "Resolved {} and {} into {}",
                            pretty_print(&c1, self.term_bank),
                            pretty_print(&c2, self.term_bank),
                            pretty_print(&resolvent, self.term_bank)
                        );

                        if resolvent.is_empty() {
                            info!("Derived the empty clause while eliminating {}", name);
                            self.refuted = true;
                            if self.mode == ProofMode::Single {
                                return Ok(Elimination {
                                    resolvents: output,
                                    interrupt: Some(Interrupt::Refuted),
                                });
                            }
                        } else if resolvent.is_tautology() {
                            debug!("Discarding tautology");
                        } else if is_answer && resolvent.mentions(predicate) {
                            // A disjunction of answers does not prove any single one of them.
                            debug!("Dropping disjunctive answer");
                        } else if resolvent.mentions(predicate) {
                            if resolvent.has_literal_on(predicate, Polarity::Pos)
                                && pos_seen.insert(resolvent.clone())
                            {
                                pos.push(resolvent.clone());
                            }
                            if resolvent.has_literal_on(predicate, Polarity::Neg)
                                && neg_seen.insert(resolvent.clone())
                            {
                                neg.push(resolvent);
                            }
                        } else if output_seen.insert(resolvent.clone()) {
                            output.push(resolvent);
                        }

                        if resolutions >= self.config.max_resolutions_per_elimination {
                            info!(
                                "Eliminating {} stopped after {} resolutions",
                                name, resolutions
                            );
                            self.truncated = true;
                            return Ok(Elimination {
                                resolvents: output,
                                interrupt: None,
                            });
                        }
                    }
                }
            }
            if pos.len() == pos_len && neg.len() == neg_len {
                break;
            }
        }

        info!(
            "Eliminated {}: {} resolutions, {} resolvents kept",
            name,
            resolutions,
            output.len()
        );
        Ok(Elimination {
            resolvents: output,
            interrupt: None,
        })
    }

    fn finish(self, status: RefutationStatus) -> RefutationResult {
        RefutationResult {
            status,
            steps_generated: self.steps_generated,
            truncated: self.truncated,
            proof: self.proof,
            bindings: self.answers.map(|answers| answers.collector.seal()),
        }
    }

    fn run(mut self, order: &EliminationOrder) -> Result<RefutationResult> {
        if self.store.contains_empty() {
            info!("Clause set already contains the empty clause");
            self.refuted = true;
            if self.mode == ProofMode::Single {
                return Ok(self.finish(RefutationStatus::Refuted));
            }
        }

        for predicate in order.predicates() {
            if let Some(reason) = self.resources_exhausted() {
                return Ok(self.finish(RefutationStatus::Unknown(reason)));
            }
            let bucket = self.store.take_bucket(*predicate)?;
            if bucket.is_empty() {
                continue;
            }
            let elimination = self.eliminate(bucket)?;
            for resolvent in elimination.resolvents {
                self.store.insert(resolvent);
            }
            match elimination.interrupt {
                Some(Interrupt::Refuted) => return Ok(self.finish(RefutationStatus::Refuted)),
                Some(Interrupt::Unknown(reason)) => {
                    return Ok(self.finish(RefutationStatus::Unknown(reason)));
                }
                None => {}
            }
            self.term_bank.gc();
        }

        let status = if self.refuted {
            RefutationStatus::Refuted
        } else {
            RefutationStatus::Exhausted
        };
        Ok(self.finish(status))
    }
}

/// Try to refute the clauses of `store` by eliminating the predicates of `order` in turn.
/// Predicates missing from `order` are left alone.
pub fn refute(
    store: ClauseStore,
    order: &EliminationOrder,
    mode: ProofMode,
    answers: Option<AnswerQuery>,
    config: &ResolutionConfig,
    term_bank: &mut TermBank,
) -> Result<RefutationResult> {
    let state = ResolutionState {
        store,
        term_bank,
        config,
        mode,
        answers,
        proof: ProofIndex::new(config.track_proofs),
        resource_limits: ResourceLimits::of_config(&config.limits),
        steps_generated: 0,
        truncated: false,
        refuted: false,
    };
    state.run(order)
}

#[cfg(test)]
mod test {
    use crate::{
        binding::BindingCollector,
        clause::{Atom, Clause},
        clause_store::ClauseStore,
        elimination::{EliminationOrder, compute_order},
        formula::Signed,
        kb::clausify,
        parser::parse,
        term_bank::{PredicateIdentifier, TermBank},
    };

    use std::time::Duration;

    use super::{
        AnswerFilter, AnswerQuery, ProofMode, RefutationStatus, ResolutionConfig,
        ResourceLimitConfig, UnknownReason, refute,
    };

    fn store_of(formulas: &[&str], term_bank: &mut TermBank) -> ClauseStore {
        let mut store = ClauseStore::new();
        for formula in formulas {
            let lowered = parse(formula).unwrap().lower(term_bank);
            for clause in clausify(lowered, term_bank).unwrap() {
                store.insert(clause);
            }
        }
        store
    }

    #[test]
    fn modus_ponens_test() {
        let mut term_bank = TermBank::new();
        let store = store_of(&["p(a)", "p(?x) => q(?x)", "~q(a)"], &mut term_bank);
        let order = compute_order(&store, None);
        let config = ResolutionConfig {
            track_proofs: true,
            ..Default::default()
        };
        let result = refute(store, &order, ProofMode::Single, None, &config, &mut term_bank).unwrap();
        assert_eq!(result.status, RefutationStatus::Refuted);
        assert!(result.steps_generated >= 2);
        assert_eq!(result.proof.proof_length(), Some(2));
    }

    #[test]
    fn exhausted_test() {
        let mut term_bank = TermBank::new();
        let store = store_of(&["p(a) | q(a)", "~p(a)", "~q(b)"], &mut term_bank);
        let order = compute_order(&store, None);
        let result = refute(
            store,
            &order,
            ProofMode::Single,
            None,
            &ResolutionConfig::default(),
            &mut term_bank,
        )
        .unwrap();
        assert_eq!(result.status, RefutationStatus::Exhausted);
        assert!(!result.truncated);
    }

    #[test]
    fn empty_clause_given_test() {
        let mut term_bank = TermBank::new();
        let mut store = ClauseStore::new();
        store.insert(Clause::empty());
        let result = refute(
            store,
            &EliminationOrder::fixed(vec![]),
            ProofMode::Single,
            None,
            &ResolutionConfig::default(),
            &mut term_bank,
        )
        .unwrap();
        assert!(result.is_refuted());
        assert_eq!(result.steps_generated, 0);
    }

    #[test]
    fn repeated_predicate_test() {
        // Both literals of the first clause have to be resolved away.
        let mut term_bank = TermBank::new();
        let store = store_of(
            &["p(a) | p(b)", "p(?x) => q(?x)", "~q(a)", "~q(b)"],
            &mut term_bank,
        );
        let p = term_bank.find_predicate("p", 1).unwrap();
        let q = term_bank.find_predicate("q", 1).unwrap();
        for order in [vec![p, q], vec![q, p]] {
            let result = refute(
                store.clone(),
                &EliminationOrder::fixed(order),
                ProofMode::Single,
                None,
                &ResolutionConfig::default(),
                &mut term_bank,
            )
            .unwrap();
            assert_eq!(result.status, RefutationStatus::Refuted);
        }
    }

    #[test]
    fn cap_test() {
        let mut term_bank = TermBank::new();
        let store = store_of(
            &["p(a) | p(b)", "p(?x) => q(?x)", "~q(a)", "~q(b)"],
            &mut term_bank,
        );
        let p = term_bank.find_predicate("p", 1).unwrap();
        let q = term_bank.find_predicate("q", 1).unwrap();
        let config = ResolutionConfig {
            max_resolutions_per_elimination: 1,
            ..Default::default()
        };
        let result = refute(
            store,
            &EliminationOrder::fixed(vec![p, q]),
            ProofMode::Single,
            None,
            &config,
            &mut term_bank,
        )
        .unwrap();
        assert!(result.truncated);
        assert_eq!(result.status, RefutationStatus::Exhausted);
    }

    #[test]
    fn answer_test() {
        let mut term_bank = TermBank::new();
        let store = store_of(
            &[
                "on(b1, t1)",
                "on(b2, t2)",
                "tin(t1, c2)",
                "(on(?b, ?t) ^ tin(?t, ?c)) => answer(?b, ?t, ?c)",
                "~answer(?b, ?t, ?c)",
            ],
            &mut term_bank,
        );
        let answer = term_bank.find_predicate("answer", 3).unwrap();
        let order = compute_order(&store, Some(answer));
        let query = AnswerQuery {
            predicate: answer,
            collector: BindingCollector::new(vec!["b".into(), "t".into(), "c".into()]),
        };
        let result = refute(
            store,
            &order,
            ProofMode::All,
            Some(query),
            &ResolutionConfig::default(),
            &mut term_bank,
        )
        .unwrap();
        assert!(result.is_refuted());
        let bindings = result.bindings.unwrap();
        assert_eq!(bindings.len(), 1);
        assert!(bindings.contains(&["b1", "t1", "c2"]));
    }

    #[test]
    fn answer_filter_test() {
        let mut term_bank = TermBank::new();
        let store = store_of(&["p(?x) => answer(?x)", "p(?y)", "~answer(?z)"], &mut term_bank);
        let answer = term_bank.find_predicate("answer", 1).unwrap();
        let order = compute_order(&store, Some(answer));
        for (filter, expected) in [(AnswerFilter::Ground, 0), (AnswerFilter::Any, 1)] {
            let config = ResolutionConfig {
                answer_filter: filter,
                ..Default::default()
            };
            let query = AnswerQuery {
                predicate: answer,
                collector: BindingCollector::new(vec!["x".into()]),
            };
            let result = refute(
                store.clone(),
                &order,
                ProofMode::All,
                Some(query),
                &config,
                &mut term_bank,
            )
            .unwrap();
            assert!(result.is_refuted());
            assert_eq!(result.bindings.unwrap().len(), expected);
        }
    }

    #[test]
    fn disjunctive_answer_test() {
        let mut term_bank = TermBank::new();
        let store = store_of(
            &["p(a) | p(b)", "p(c)", "p(?x) => answer(?x)", "~answer(?z)"],
            &mut term_bank,
        );
        let answer = term_bank.find_predicate("answer", 1).unwrap();
        let order = compute_order(&store, Some(answer));
        let query = AnswerQuery {
            predicate: answer,
            collector: BindingCollector::new(vec!["x".into()]),
        };
        let result = refute(
            store,
            &order,
            ProofMode::All,
            Some(query),
            &ResolutionConfig::default(),
            &mut term_bank,
        )
        .unwrap();
        let bindings = result.bindings.unwrap();
        assert_eq!(bindings.len(), 1);
        assert!(bindings.contains(&["c"]));
        assert!(!bindings.contains(&["a"]));
        assert!(!bindings.contains(&["b"]));
    }

    #[test]
    fn timeout_test() {
        let mut term_bank = TermBank::new();
        let store = store_of(&["p(a)", "p(?x) => q(?x)", "~q(a)"], &mut term_bank);
        let order = compute_order(&store, None);
        let config = ResolutionConfig {
            limits: ResourceLimitConfig {
                duration: Some(Duration::ZERO),
                ..Default::default()
            },
            ..Default::default()
        };
        let result = refute(store, &order, ProofMode::Single, None, &config, &mut term_bank).unwrap();
        assert_eq!(result.status, RefutationStatus::Unknown(UnknownReason::Timeout));
        assert!(!result.is_refuted());
        assert_eq!(result.steps_generated, 0);
    }

    #[test]
    fn order_invariance_test() {
        let mut term_bank = TermBank::new();
        let store = store_of(
            &[
                "!A ?x (person(?x) => !E ?y parent(?y, ?x))",
                "parent(?p, ?c) => ancestor(?p, ?c)",
                "person(ann)",
                "~ancestor(?a, ann)",
            ],
            &mut term_bank,
        );
        let satisfiable = store_of(
            &[
                "!A ?x (person(?x) => !E ?y parent(?y, ?x))",
                "parent(?p, ?c) => ancestor(?p, ?c)",
                "person(bob)",
                "~ancestor(?a, ann)",
            ],
            &mut term_bank,
        );
        let preds: Vec<PredicateIdentifier> = [("person", 1), ("parent", 2), ("ancestor", 2)]
            .iter()
            .map(|(name, arity)| term_bank.find_predicate(name, *arity).unwrap())
            .collect();
        let permutations = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        for (clauses, expected) in [(store, true), (satisfiable, false)] {
            for perm in permutations.iter() {
                let order = EliminationOrder::fixed(perm.iter().map(|idx| preds[*idx]).collect());
                let result = refute(
                    clauses.clone(),
                    &order,
                    ProofMode::Single,
                    None,
                    &ResolutionConfig::default(),
                    &mut term_bank,
                )
                .unwrap();
                assert!(!result.truncated);
                assert_eq!(result.is_refuted(), expected, "order {:?}", perm);
            }
        }
    }

    /// Small deterministic generator for propositional clause sets.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: u64) -> u64 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (self.0 >> 33) % bound
        }
    }

    fn satisfiable(clauses: &[Vec<(usize, bool)>], atoms: usize) -> bool {
        (0..1u32 << atoms).any(|bits| {
            clauses.iter().all(|clause| {
                clause
                    .iter()
                    .any(|(atom, positive)| ((bits >> atom) & 1 == 1) == *positive)
            })
        })
    }

    #[test]
    fn propositional_agreement_test() {
        let mut term_bank = TermBank::new();
        let preds: Vec<PredicateIdentifier> = ["p", "q", "r", "s"]
            .iter()
            .map(|name| term_bank.get_or_add_predicate(name, 0))
            .collect();
        let config = ResolutionConfig {
            max_resolutions_per_elimination: 10_000,
            ..Default::default()
        };
        let mut rng = Lcg(7);
        for _ in 0..200 {
            let num_clauses = 3 + rng.next(5) as usize;
            let raw: Vec<Vec<(usize, bool)>> = (0..num_clauses)
                .map(|_| {
                    let len = 1 + rng.next(3) as usize;
                    (0..len)
                        .map(|_| (rng.next(4) as usize, rng.next(2) == 0))
                        .collect()
                })
                .collect();
            let mut store = ClauseStore::new();
            for clause in raw.iter() {
                let literals = clause
                    .iter()
                    .map(|(atom, positive)| {
                        let atom = Atom::new(preds[*atom], vec![]);
                        if *positive {
                            Signed::pos(atom)
                        } else {
                            Signed::neg(atom)
                        }
                    })
                    .collect();
                let clause = Clause::new(literals);
                if !clause.is_tautology() {
                    store.insert(clause);
                }
            }
            let expected = !satisfiable(&raw, 4);
            let mut reversed = preds.clone();
            reversed.reverse();
            for order in [preds.clone(), reversed] {
                let result = refute(
                    store.clone(),
                    &EliminationOrder::fixed(order),
                    ProofMode::Single,
                    None,
                    &config,
                    &mut term_bank,
                )
                .unwrap();
                assert!(!result.truncated);
                assert_eq!(result.is_refuted(), expected, "clauses {:?}", raw);
            }
        }
    }
}

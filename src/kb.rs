//! ## Knowledge Bases
//! The query contract shared by every knowledge base, [Kb], and the first order [ClauseKb].
//!
//! A [ClauseKb] turns every told formula into clauses right away. Queries work on a snapshot of
//! the clause store, so asking never changes what the knowledge base knows:
//! - `ask` closes the query universally, negates it and tries to refute the snapshot,
//! - `ask_bindings` adds `query => answer#(vars)` and `~answer#(vars)` instead and collects
//!   the instances of `answer#` every refutation passes through.

use std::{
    fmt,
    time::{Duration, Instant},
};

use log::{debug, info, warn};

use crate::{
    binding::{BindingCollector, BindingSet},
    clause::{Atom, Clause},
    clause_store::ClauseStore,
    elimination::EliminationPlanner,
    error::{Error, Result},
    formula::{Formula, Quantifier},
    normalizer::{distribute, filter_tautologies, normalize_to_nnf},
    parser::{LoweredFormula, parse},
    pretty_print::pretty_print,
    proofs::ProofIndex,
    resolution::{
        AnswerQuery, ProofMode, RefutationResult, RefutationStatus, ResolutionConfig, refute,
    },
    skolem::skolemize,
    term_bank::{Term, TermBank, VariableIdentifier},
};

/// Name of the synthetic predicate collecting the answers of a bindings query. `#` can not
/// occur in parsed names.
pub const ANSWER_PREDICATE: &str = "answer#";

/// Statistics of the last query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub query_time: Duration,
    pub clauses_generated: usize,
    pub proof_length: Option<usize>,
    pub status: Option<RefutationStatus>,
    pub truncated: bool,
}

impl QueryStats {
    pub fn query_time_seconds(&self) -> f64 {
        self.query_time.as_secs_f64()
    }
}

impl fmt::Display for QueryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.3}s, {} clauses generated",
            self.query_time_seconds(),
            self.clauses_generated
        )?;
        if let Some(length) = self.proof_length {
            write!(f, ", proof length {}", length)?;
        }
        if let Some(RefutationStatus::Unknown(reason)) = self.status {
            write!(f, ", gave up: {:?}", reason)?;
        }
        if self.truncated {
            write!(f, ", truncated")?;
        }
        Ok(())
    }
}

/// A knowledge base answering entailment queries.
pub trait Kb {
    /// Add the formula `text` as an axiom. On error the knowledge base is unchanged.
    fn tell(&mut self, text: &str) -> Result<()>;

    /// Whether `text` could be proven. `false` means "not proven", not "proven false".
    fn ask(&mut self, text: &str) -> Result<bool>;

    /// The instances of the free variables of `text` under which it could be proven.
    fn ask_bindings(&mut self, text: &str) -> Result<BindingSet>;

    fn stats(&self) -> &QueryStats;
}

/// Skolemize, distribute and filter an NNF formula, returning canonical clauses. `free` are the
/// variables treated as outermost universals.
fn clauses_of_nnf(
    nnf: Formula<Atom>,
    free: &[VariableIdentifier],
    term_bank: &mut TermBank,
) -> Result<Vec<Clause>> {
    let skolemized = skolemize(nnf, free, term_bank)?;
    let clauses = filter_tautologies(distribute(skolemized)?);
    Ok(clauses
        .into_iter()
        .map(|clause| Clause::new(clause.into_iter().collect()).canonical(term_bank))
        .collect())
}

/// The clauses of a lowered formula, its free variables read universally.
pub fn clausify(lowered: LoweredFormula, term_bank: &mut TermBank) -> Result<Vec<Clause>> {
    let free = lowered.free_variable_ids();
    let nnf = normalize_to_nnf(lowered.formula, false)?;
    clauses_of_nnf(nnf, &free, term_bank)
}

/// A first order knowledge base proving queries by bucket elimination resolution.
#[derive(Debug)]
pub struct ClauseKb {
    term_bank: TermBank,
    store: ClauseStore,
    planner: EliminationPlanner,
    config: ResolutionConfig,
    stats: QueryStats,
    last_proof: ProofIndex,
}

impl Default for ClauseKb {
    fn default() -> Self {
        Self::new()
    }
}

impl ClauseKb {
    pub fn new() -> Self {
        Self::with_config(ResolutionConfig::default())
    }

    pub fn with_config(config: ResolutionConfig) -> Self {
        ClauseKb {
            term_bank: TermBank::new(),
            store: ClauseStore::new(),
            planner: EliminationPlanner::new(),
            config,
            stats: QueryStats::default(),
            last_proof: ProofIndex::new(false),
        }
    }

    pub fn set_config(&mut self, config: ResolutionConfig) {
        self.config = config;
    }

    pub fn store(&self) -> &ClauseStore {
        &self.store
    }

    /// The proof recorded by the last query, empty unless proofs are tracked.
    pub fn last_proof(&self) -> &ProofIndex {
        &self.last_proof
    }

    fn record(&mut self, start: Instant, result: RefutationResult) -> Option<BindingSet> {
        if let RefutationStatus::Unknown(reason) = result.status {
            warn!("Query gave up: {:?}", reason);
        }
        self.stats = QueryStats {
            query_time: start.elapsed(),
            clauses_generated: result.steps_generated,
            proof_length: result.proof.proof_length(),
            status: Some(result.status),
            truncated: result.truncated,
        };
        self.last_proof = result.proof;
        result.bindings
    }
}

impl Kb for ClauseKb {
    fn tell(&mut self, text: &str) -> Result<()> {
        let lowered = parse(text)?.lower(&mut self.term_bank);
        let clauses = clausify(lowered, &mut self.term_bank)?;
        let total = clauses.len();
        let added = clauses
            .into_iter()
            .filter_map(|clause| self.store.insert(clause))
            .count();
        info!("Told {}: {} clause(s), {} new", text, total, added);
        Ok(())
    }

    fn ask(&mut self, text: &str) -> Result<bool> {
        let start = Instant::now();
        let lowered = parse(text)?.lower(&mut self.term_bank);
        let closed = lowered
            .free_variable_ids()
            .into_iter()
            .rev()
            .fold(lowered.formula, |body, var| {
                Formula::quantified(Quantifier::Forall, var, body)
            });
        let negated = normalize_to_nnf(closed, true)?;
        let mut snapshot = self.store.clone();
        for clause in clauses_of_nnf(negated, &[], &mut self.term_bank)? {
            debug!("Negated query clause {}", pretty_print(&clause, &self.term_bank));
            snapshot.insert(clause);
        }

        let order = self.planner.order_for(&snapshot, None).clone();
        let result = refute(
            snapshot,
            &order,
            ProofMode::Single,
            None,
            &self.config,
            &mut self.term_bank,
        )?;
        let proven = result.is_refuted();
        self.record(start, result);
        info!("Asked {}: {} ({})", text, proven, self.stats);
        Ok(proven)
    }

    fn ask_bindings(&mut self, text: &str) -> Result<BindingSet> {
        let start = Instant::now();
        let lowered = parse(text)?.lower(&mut self.term_bank);
        let free = lowered.free_variable_ids();
        let names: Vec<String> = lowered
            .free_variables
            .iter()
            .map(|(name, _)| name.clone())
            .collect();

        let answer = self
            .term_bank
            .get_or_add_predicate(ANSWER_PREDICATE, free.len());
        let args: Vec<Term> = free
            .iter()
            .map(|var| self.term_bank.mk_variable(*var))
            .collect();
        let answer_atom = Formula::Atom(Atom::new(answer, args));
        let rule = normalize_to_nnf(Formula::implies(lowered.formula, answer_atom.clone()), false)?;
        let goal = normalize_to_nnf(answer_atom, true)?;

        let mut snapshot = self.store.clone();
        for nnf in [rule, goal] {
            for clause in clauses_of_nnf(nnf, &free, &mut self.term_bank)? {
                snapshot.insert(clause);
            }
        }

        let order = self.planner.order_for(&snapshot, Some(answer)).clone();
        let query = AnswerQuery {
            predicate: answer,
            collector: BindingCollector::new(names),
        };
        let result = refute(
            snapshot,
            &order,
            ProofMode::All,
            Some(query),
            &self.config,
            &mut self.term_bank,
        )?;
        let bindings = self
            .record(start, result)
            .ok_or_else(|| Error::Invariant("bindings query produced no binding set".to_string()))?;
        info!(
            "Asked for bindings of {}: {} answer(s) ({})",
            text,
            bindings.len(),
            self.stats
        );
        Ok(bindings)
    }

    fn stats(&self) -> &QueryStats {
        &self.stats
    }
}

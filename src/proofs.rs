//! ## Proof Index
//! Records for every derived clause the parent pairs it was resolved from, so refutations can be
//! measured and printed afterwards. The key exports are:
//! - [ProofIndex] the recording itself, inactive indices record nothing.
//! - [GraphvizMode] selecting what [ProofIndex::to_graphviz] renders.
//!
//! Clauses are stored in printed form, a proof stays printable after the query ends.

use std::fmt::Display;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{clause::Clause, pretty_print::pretty_print, term_bank::TermBank};

/// What kind of graph to print
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum GraphvizMode {
    /// The clauses the refutation was derived from.
    Last,
    /// Every recorded clause.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofRule {
    Given,
    Resolution,
}

impl ProofRule {
    fn as_str(&self) -> &'static str {
        match self {
            ProofRule::Given => "given",
            ProofRule::Resolution => "res",
        }
    }
}

impl Display for ProofRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProofNodeId(usize);

#[derive(Debug, Clone)]
struct ProofNode {
    clause_str: String,
    rule: ProofRule,
    derivations: Vec<(ProofNodeId, ProofNodeId)>,
}

impl ProofNode {
    fn to_graphviz(&self, id: ProofNodeId, buf: &mut String) {
        buf.push_str(&format!(
            "{} [shape=box,label=\"{}\\ninference: {}\"]\n",
            id.0, self.clause_str, self.rule
        ));
        for (p1, p2) in self.derivations.iter() {
            buf.push_str(&format!("{} -> {}\n", p1.0, id.0));
            buf.push_str(&format!("{} -> {}\n", p2.0, id.0));
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProofIndex {
    nodes: Vec<ProofNode>,
    ids: FxHashMap<Clause, ProofNodeId>,
    active: bool,
}

impl ProofIndex {
    pub fn new(active: bool) -> Self {
        Self {
            nodes: Vec::new(),
            ids: FxHashMap::default(),
            active,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node_for(&mut self, clause: &Clause, rule: ProofRule, term_bank: &TermBank) -> ProofNodeId {
        if let Some(id) = self.ids.get(clause) {
            return *id;
        }
        let id = ProofNodeId(self.nodes.len());
        self.nodes.push(ProofNode {
            clause_str: pretty_print(clause, term_bank),
            rule,
            derivations: Vec::new(),
        });
        self.ids.insert(clause.clone(), id);
        id
    }

    /// Record that `resolvent` was derived from `parents`. Parents seen for the first time are
    /// recorded as given clauses.
    pub fn record(&mut self, resolvent: &Clause, parents: (&Clause, &Clause), term_bank: &TermBank) {
        if !self.active {
            return;
        }
        let p1 = self.node_for(parents.0, ProofRule::Given, term_bank);
        let p2 = self.node_for(parents.1, ProofRule::Given, term_bank);
        let id = self.node_for(resolvent, ProofRule::Resolution, term_bank);
        let node = &mut self.nodes[id.0];
        if !node.derivations.contains(&(p1, p2)) {
            node.derivations.push((p1, p2));
        }
    }

    /// The node of the empty clause, if a refutation was recorded.
    pub fn refutation(&self) -> Option<ProofNodeId> {
        self.ids.get(&Clause::empty()).copied()
    }

    /// The number of resolution steps in the first derivation tree of the empty clause,
    /// counting every derived clause once.
    pub fn proof_length(&self) -> Option<usize> {
        let root = self.refutation()?;
        let mut visited = FxHashSet::default();
        let mut worklist = vec![root];
        let mut length = 0;
        while let Some(id) = worklist.pop() {
            if !visited.insert(id) {
                continue;
            }
            if let Some((p1, p2)) = self.nodes[id.0].derivations.first() {
                length += 1;
                worklist.push(*p1);
                worklist.push(*p2);
            }
        }
        Some(length)
    }

    fn print_tree_into(
        &self,
        id: ProofNodeId,
        depth: usize,
        shown: &mut FxHashSet<ProofNodeId>,
        buf: &mut String,
    ) {
        let node = &self.nodes[id.0];
        buf.push_str(&"  ".repeat(depth));
        buf.push_str(&node.clause_str);
        if !shown.insert(id) {
            buf.push_str(" [ALREADY SHOWN]\n");
            return;
        }
        match node.derivations.first() {
            None => buf.push_str(" <- [GIVEN]\n"),
            Some((p1, p2)) => {
                buf.push_str(" <-\n");
                self.print_tree_into(*p1, depth + 1, shown, buf);
                self.print_tree_into(*p2, depth + 1, shown, buf);
            }
        }
    }

    /// An indented rendering of the refutation, each clause followed by its parents.
    pub fn print_tree(&self) -> Option<String> {
        let root = self.refutation()?;
        let mut buf = String::new();
        self.print_tree_into(root, 0, &mut FxHashSet::default(), &mut buf);
        Some(buf)
    }

    fn to_graphviz_prefix(&self, buf: &mut String) {
        buf.push_str("digraph proof {\n");
        buf.push_str("rankdir = TB\n");
        buf.push_str("graph [splines=true overlap=false];\n");
    }

    fn to_graphviz_all(&self) -> String {
        let mut buf = String::new();
        self.to_graphviz_prefix(&mut buf);
        for (idx, node) in self.nodes.iter().enumerate() {
            node.to_graphviz(ProofNodeId(idx), &mut buf);
        }
        buf.push('}');
        buf
    }

    fn to_graphviz_last(&self) -> String {
        let mut buf = String::new();
        self.to_graphviz_prefix(&mut buf);
        let mut visited = FxHashSet::default();
        let mut worklist: Vec<ProofNodeId> = self.refutation().into_iter().collect();
        while let Some(id) = worklist.pop() {
            if !visited.insert(id) {
                continue;
            }
            let node = &self.nodes[id.0];
            node.to_graphviz(id, &mut buf);
            for (p1, p2) in node.derivations.iter() {
                worklist.push(*p1);
                worklist.push(*p2);
            }
        }
        buf.push('}');
        buf
    }

    pub fn to_graphviz(&self, mode: GraphvizMode) -> String {
        match mode {
            GraphvizMode::Last => self.to_graphviz_last(),
            GraphvizMode::All => self.to_graphviz_all(),
        }
    }
}

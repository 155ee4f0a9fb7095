//! ## Term Bank
//! The symbol tables and term constructors shared by everything that works on first order
//! syntax. A [TermBank] owns:
//! - the hash consing table for [Term]s,
//! - the function symbols (constants are functions of arity `0`, Skolem functions are marked),
//! - the predicate symbols, interned by `(name, arity)` so a [PredicateIdentifier] doubles as the
//!   predicate key of a clause bucket,
//! - the variables, including a pool of canonical variables used to standardize clauses apart.

use std::hash::{DefaultHasher, Hash, Hasher};

use rustc_hash::FxHashMap;

use crate::term_manager::{HashConsed, Table};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionInformation {
    pub name: String,
    pub arity: usize,
    pub skolem: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PredicateInformation {
    pub name: String,
    pub arity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableInformation {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionIdentifier(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PredicateIdentifier(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableIdentifier(u32);

/// Name of the binary predicate `t1 = t2` is read into.
pub const EQUALITY_PREDICATE: &str = "=";

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TermData {
    hash: u64,
    ground: bool,
}

impl TermData {
    fn new(hash: u64, ground: bool) -> Self {
        Self { hash, ground }
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RawTerm {
    Var {
        id: VariableIdentifier,
        data: TermData,
    },
    App {
        id: FunctionIdentifier,
        args: Vec<Term>,
        data: TermData,
    },
}

pub type Term = HashConsed<RawTerm>;

impl Hash for RawTerm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.get_data().hash);
    }
}

impl RawTerm {
    fn get_data(&self) -> &TermData {
        match self {
            RawTerm::Var { data, .. } | RawTerm::App { data, .. } => data,
        }
    }

    pub fn is_ground(&self) -> bool {
        self.get_data().ground
    }
}

impl Term {
    pub fn variable_id(&self) -> Option<VariableIdentifier> {
        match &**self {
            RawTerm::Var { id, .. } => Some(*id),
            RawTerm::App { .. } => None,
        }
    }

    pub fn function_id(&self) -> Option<FunctionIdentifier> {
        match &**self {
            RawTerm::Var { .. } => None,
            RawTerm::App { id, .. } => Some(*id),
        }
    }

    pub fn function_args(&self) -> Option<&[Term]> {
        match &**self {
            RawTerm::Var { .. } => None,
            RawTerm::App { args, .. } => Some(args.as_slice()),
        }
    }

    /// A function application without arguments.
    pub fn is_constant(&self) -> bool {
        matches!(&**self, RawTerm::App { args, .. } if args.is_empty())
    }

    /// Push the variables of the term into `acc` in order of first occurrence, skipping the ones
    /// already present.
    pub fn collect_vars_into(&self, acc: &mut Vec<VariableIdentifier>) {
        if self.is_ground() {
            return;
        }
        match &**self {
            RawTerm::Var { id, .. } => {
                if !acc.contains(id) {
                    acc.push(*id);
                }
            }
            RawTerm::App { args, .. } => args.iter().for_each(|arg| arg.collect_vars_into(acc)),
        }
    }
}

impl VariableIdentifier {
    /// Check whether this variable occurs anywhere in `term`.
    pub fn occurs_in(&self, term: &Term) -> bool {
        if term.is_ground() {
            return false;
        }
        match &**term {
            RawTerm::Var { id, .. } => id == self,
            RawTerm::App { args, .. } => args.iter().any(|arg| self.occurs_in(arg)),
        }
    }
}

#[derive(Debug)]
pub struct TermBank {
    hash_cons_table: Table<RawTerm>,
    variable_bank: Vec<VariableInformation>,
    function_bank: Vec<FunctionInformation>,
    predicate_bank: Vec<PredicateInformation>,
    function_index: FxHashMap<(String, usize), FunctionIdentifier>,
    predicate_index: FxHashMap<(String, usize), PredicateIdentifier>,
    canonical_variables: Vec<VariableIdentifier>,
    skolem_count: usize,
}

impl TermBank {
    pub fn new() -> Self {
        Self {
            hash_cons_table: Table::new(),
            variable_bank: Vec::new(),
            function_bank: Vec::new(),
            predicate_bank: Vec::new(),
            function_index: FxHashMap::default(),
            predicate_index: FxHashMap::default(),
            canonical_variables: Vec::new(),
            skolem_count: 0,
        }
    }

    pub fn add_variable(&mut self, info: VariableInformation) -> VariableIdentifier {
        let id = VariableIdentifier(self.variable_bank.len() as u32);
        self.variable_bank.push(info);
        id
    }

    /// Intern the function symbol `name/arity`, returning the existing identifier if it is known.
    pub fn get_or_add_function(&mut self, name: &str, arity: usize) -> FunctionIdentifier {
        if let Some(id) = self.function_index.get(&(name.to_string(), arity)) {
            return *id;
        }
        let id = self.push_function(FunctionInformation {
            name: name.to_string(),
            arity,
            skolem: false,
        });
        self.function_index.insert((name.to_string(), arity), id);
        id
    }

    /// Create a brand new Skolem function `sk#N` of the given arity. The `#` keeps Skolem
    /// symbols apart from anything the parser can produce.
    pub fn add_skolem_function(&mut self, arity: usize) -> FunctionIdentifier {
        self.skolem_count += 1;
        let name = format!("sk#{}", self.skolem_count);
        let id = self.push_function(FunctionInformation {
            name: name.clone(),
            arity,
            skolem: true,
        });
        self.function_index.insert((name, arity), id);
        id
    }

    fn push_function(&mut self, info: FunctionInformation) -> FunctionIdentifier {
        let id = FunctionIdentifier(self.function_bank.len() as u32);
        self.function_bank.push(info);
        id
    }

    /// Intern the predicate `name/arity`. Predicates with the same name and different arities
    /// are distinct.
    pub fn get_or_add_predicate(&mut self, name: &str, arity: usize) -> PredicateIdentifier {
        if let Some(id) = self.find_predicate(name, arity) {
            return id;
        }
        let id = PredicateIdentifier(self.predicate_bank.len() as u32);
        self.predicate_bank.push(PredicateInformation {
            name: name.to_string(),
            arity,
        });
        self.predicate_index.insert((name.to_string(), arity), id);
        id
    }

    pub fn find_predicate(&self, name: &str, arity: usize) -> Option<PredicateIdentifier> {
        self.predicate_index.get(&(name.to_string(), arity)).copied()
    }

    pub fn get_variable_info(&self, id: VariableIdentifier) -> &VariableInformation {
        &self.variable_bank[id.0 as usize]
    }

    pub fn get_function_info(&self, id: FunctionIdentifier) -> &FunctionInformation {
        &self.function_bank[id.0 as usize]
    }

    pub fn get_predicate_info(&self, id: PredicateIdentifier) -> &PredicateInformation {
        &self.predicate_bank[id.0 as usize]
    }

    pub fn predicate_count(&self) -> usize {
        self.predicate_bank.len()
    }

    pub fn gc(&self) {
        self.hash_cons_table.gc();
    }

    pub fn mk_variable(&self, id: VariableIdentifier) -> Term {
        let mut hasher = DefaultHasher::new();
        hasher.write_u8(0);
        hasher.write_u32(id.0);
        let var = RawTerm::Var {
            id,
            data: TermData::new(hasher.finish(), false),
        };
        self.hash_cons_table.hashcons(var)
    }

    pub fn mk_fresh_variable(&mut self, info: VariableInformation) -> Term {
        let id = self.add_variable(info);
        self.mk_variable(id)
    }

    /// The `idx`-th canonical variable `?_{idx+1}`. Clauses in a store are kept over canonical
    /// variables numbered from zero in order of first occurrence.
    pub fn canonical_variable(&mut self, idx: usize) -> Term {
        while self.canonical_variables.len() <= idx {
            let name = format!("_{}", self.canonical_variables.len() + 1);
            let id = self.add_variable(VariableInformation { name });
            self.canonical_variables.push(id);
        }
        self.mk_variable(self.canonical_variables[idx])
    }

    pub fn mk_app(&self, id: FunctionIdentifier, args: Vec<Term>) -> Term {
        let mut hasher = DefaultHasher::new();
        hasher.write_u8(1);
        hasher.write_u32(id.0);
        args.iter().for_each(|arg| arg.hash(&mut hasher));
        let hash = hasher.finish();
        let ground = args.iter().all(|arg| arg.is_ground());
        debug_assert_eq!(self.get_function_info(id).arity, args.len());
        let app = RawTerm::App {
            id,
            args,
            data: TermData::new(hash, ground),
        };
        self.hash_cons_table.hashcons(app)
    }

    pub fn mk_const(&self, id: FunctionIdentifier) -> Term {
        self.mk_app(id, vec![])
    }
}

impl Default for TermBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::{TermBank, VariableInformation};

    #[test]
    fn interning_test() {
        let mut term_bank = TermBank::new();
        let f1 = term_bank.get_or_add_function("f", 1);
        let f2 = term_bank.get_or_add_function("f", 2);
        assert_ne!(f1, f2);
        assert_eq!(term_bank.get_or_add_function("f", 1), f1);

        let p1 = term_bank.get_or_add_predicate("p", 1);
        let p2 = term_bank.get_or_add_predicate("p", 2);
        assert_ne!(p1, p2);
        assert_eq!(term_bank.find_predicate("p", 2), Some(p2));
        assert_eq!(term_bank.find_predicate("q", 1), None);
        assert_eq!(term_bank.predicate_count(), 2);

        let sk = term_bank.add_skolem_function(0);
        assert!(term_bank.get_function_info(sk).skolem);
        assert_eq!(term_bank.get_function_info(sk).name, "sk#1");
    }

    #[test]
    fn term_sharing_test() {
        let mut term_bank = TermBank::new();
        let f = term_bank.get_or_add_function("f", 2);
        let a = term_bank.get_or_add_function("a", 0);
        let x = term_bank.mk_fresh_variable(VariableInformation {
            name: "x".to_string(),
        });
        let a = term_bank.mk_const(a);
        let t1 = term_bank.mk_app(f, vec![x.clone(), a.clone()]);
        let t2 = term_bank.mk_app(f, vec![x.clone(), a.clone()]);
        assert_eq!(t1.as_ptr(), t2.as_ptr());
        assert!(!t1.is_ground());
        assert!(a.is_ground());
        assert!(a.is_constant());
        assert!(!t1.is_constant());
        let x_id = x.variable_id().unwrap();
        assert!(x_id.occurs_in(&t1));
        assert!(!x_id.occurs_in(&a));

        let mut vars = Vec::new();
        t1.collect_vars_into(&mut vars);
        t2.collect_vars_into(&mut vars);
        assert_eq!(vars, vec![x_id]);
    }

    #[test]
    fn canonical_variable_test() {
        let mut term_bank = TermBank::new();
        let v1 = term_bank.canonical_variable(1);
        let v0 = term_bank.canonical_variable(0);
        assert_ne!(v0, v1);
        assert_eq!(term_bank.canonical_variable(1), v1);
        let id = v0.variable_id().unwrap();
        assert_eq!(term_bank.get_variable_info(id).name, "_1");
    }
}

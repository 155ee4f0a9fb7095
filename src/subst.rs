//! ## Substitutions
//! Substitutions on first order constructs, the key things exposed are:
//! - [Substitution] mapping variables to the terms replacing them.
//! - [Substitutable] for types that have some notion of substitution.
//!
//! A substitution is applied simultaneously, the terms it maps to are never substituted again.

use rustc_hash::FxHashMap;

use crate::term_bank::{
    RawTerm::{App, Var},
    Term, TermBank, VariableIdentifier,
};

/// A first order substitution, mapping variables to terms to replace them with.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    map: FxHashMap<VariableIdentifier, Term>,
}

impl Substitution {
    pub fn new() -> Self {
        Self {
            map: FxHashMap::default(),
        }
    }

    /// Associate `var` with `term` in the substitution.
    pub fn insert(&mut self, var: VariableIdentifier, term: Term) {
        self.map.insert(var, term);
    }

    /// Obtain the term associated with `var` if it exists.
    pub fn get(&self, var: VariableIdentifier) -> Option<Term> {
        self.map.get(&var).cloned()
    }

    /// Drop the binding of `var`, returning the term it was mapped to.
    pub fn remove(&mut self, var: VariableIdentifier) -> Option<Term> {
        self.map.remove(&var)
    }

    /// Return `true` if the substitution is the identity.
    pub fn is_nop(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Compose the current substitution with `{ var_id |-> term }`.
    pub fn compose_binding(&mut self, var_id: VariableIdentifier, term: Term, term_bank: &TermBank) {
        let mut new_subst = Substitution::new();
        new_subst.insert(var_id, term.clone());
        for value in self.map.values_mut() {
            *value = value.clone().subst_with(&new_subst, term_bank);
        }
        self.map.entry(var_id).or_insert(term);
    }
}

/// A type that has a substitution operation on itself.
pub trait Substitutable {
    /// Apply `subst` to `self`, hash consing terms using `term_bank`.
    fn subst_with(self, subst: &Substitution, term_bank: &TermBank) -> Self;
}

impl Term {
    fn subst_with_aux(
        self,
        subst: &Substitution,
        term_bank: &TermBank,
        cache: &mut FxHashMap<Term, Term>,
    ) -> Term {
        if self.is_ground() {
            self
        } else if let Some(hit) = cache.get(&self) {
            hit.clone()
        } else {
            let substituted = match self.as_ref() {
                Var { id, .. } => subst.get(*id).unwrap_or_else(|| self.clone()),
                App { id, args, .. } => {
                    let new_args = args
                        .iter()
                        .map(|arg| arg.clone().subst_with_aux(subst, term_bank, cache))
                        .collect();
                    term_bank.mk_app(*id, new_args)
                }
            };
            cache.insert(self, substituted.clone());
            substituted
        }
    }
}

impl Substitutable for Term {
    /// Constant time for the identity substitution and for ground terms, otherwise
    /// `O(dag_size(term))`.
    fn subst_with(self, subst: &Substitution, term_bank: &TermBank) -> Self {
        if subst.is_nop() {
            self
        } else {
            let mut cache = FxHashMap::default();
            self.subst_with_aux(subst, term_bank, &mut cache)
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{
        subst::Substitutable,
        term_bank::{TermBank, VariableInformation},
    };

    use super::Substitution;

    #[test]
    fn basic_test() {
        let mut term_bank = TermBank::new();
        let f = term_bank.get_or_add_function("f", 2);
        let g = term_bank.get_or_add_function("g", 1);
        let a = term_bank.get_or_add_function("a", 0);
        let b = term_bank.get_or_add_function("b", 0);
        let x_ident = term_bank.add_variable(VariableInformation {
            name: "x".to_string(),
        });
        let y_ident = term_bank.add_variable(VariableInformation {
            name: "y".to_string(),
        });
        let x = term_bank.mk_variable(x_ident);
        let y = term_bank.mk_variable(y_ident);

        let t1 = term_bank.mk_app(f, vec![x.clone(), term_bank.mk_app(g, vec![y.clone()])]);
        let a = term_bank.mk_const(a);
        let b = term_bank.mk_const(b);
        let t4 = term_bank.mk_app(f, vec![a.clone(), term_bank.mk_app(g, vec![a.clone()])]);
        let t5 = term_bank.mk_app(f, vec![a.clone(), term_bank.mk_app(g, vec![b.clone()])]);

        let mut sigma1 = Substitution::new();
        sigma1.insert(x_ident, a.clone());
        sigma1.insert(y_ident, a.clone());
        assert_eq!(t1.clone().subst_with(&sigma1, &term_bank), t4);

        let mut sigma2 = Substitution::new();
        sigma2.insert(x_ident, a.clone());
        sigma2.insert(y_ident, b.clone());
        assert_eq!(t1.clone().subst_with(&sigma2, &term_bank), t5);
        assert_eq!(t1.clone().subst_with(&Substitution::new(), &term_bank), t1);
    }

    #[test]
    fn simultaneous_test() {
        let mut term_bank = TermBank::new();
        let f = term_bank.get_or_add_function("f", 2);
        let x_ident = term_bank.add_variable(VariableInformation {
            name: "x".to_string(),
        });
        let y_ident = term_bank.add_variable(VariableInformation {
            name: "y".to_string(),
        });
        let x = term_bank.mk_variable(x_ident);
        let y = term_bank.mk_variable(y_ident);

        // Swapping two variables must not chain the bindings
        let mut sigma = Substitution::new();
        sigma.insert(x_ident, y.clone());
        sigma.insert(y_ident, x.clone());
        let t = term_bank.mk_app(f, vec![x.clone(), y.clone()]);
        let swapped = term_bank.mk_app(f, vec![y.clone(), x.clone()]);
        assert_eq!(t.subst_with(&sigma, &term_bank), swapped);
    }

    #[test]
    fn compose_test() {
        let mut term_bank = TermBank::new();
        let g = term_bank.get_or_add_function("g", 1);
        let a = term_bank.get_or_add_function("a", 0);
        let a = term_bank.mk_const(a);
        let x_ident = term_bank.add_variable(VariableInformation {
            name: "x".to_string(),
        });
        let y_ident = term_bank.add_variable(VariableInformation {
            name: "y".to_string(),
        });
        let y = term_bank.mk_variable(y_ident);

        let mut sigma = Substitution::new();
        sigma.insert(x_ident, term_bank.mk_app(g, vec![y.clone()]));
        sigma.compose_binding(y_ident, a.clone(), &term_bank);
        assert_eq!(sigma.get(x_ident), Some(term_bank.mk_app(g, vec![a.clone()])));
        assert_eq!(sigma.get(y_ident), Some(a));
        assert_eq!(sigma.len(), 2);
    }
}

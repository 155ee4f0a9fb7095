//! ## Pretty Printing
//! This module contains the [BankPrettyPrint] trait which can be implemented for types that may
//! be pretty printed given some information from a term bank. The output uses the same surface
//! syntax the parser reads.

use crate::{
    clause::{Atom, Clause, Literal},
    formula::{Formula, Polarity},
    term_bank::{EQUALITY_PREDICATE, RawTerm, Term, TermBank},
};

/// Types that can be pretty printed using information from a [TermBank]
pub trait BankPrettyPrint {
    /// Print the representation of `self` into `acc` using information from `term_bank`.
    fn print_into(&self, term_bank: &TermBank, acc: &mut String);
}

/// Pretty print some value that implements [BankPrettyPrint] to a string using information from
/// `term_bank`.
pub fn pretty_print<T: BankPrettyPrint>(t: &T, term_bank: &TermBank) -> String {
    let mut acc = String::new();
    t.print_into(term_bank, &mut acc);
    acc
}

fn print_args_into(args: &[Term], term_bank: &TermBank, acc: &mut String) {
    if args.is_empty() {
        return;
    }
    acc.push('(');
    for (idx, arg) in args.iter().enumerate() {
        if idx > 0 {
            acc.push(',');
        }
        arg.print_into(term_bank, acc);
    }
    acc.push(')');
}

impl BankPrettyPrint for Term {
    fn print_into(&self, term_bank: &TermBank, acc: &mut String) {
        match &**self {
            RawTerm::Var { id, .. } => {
                acc.push('?');
                acc.push_str(&term_bank.get_variable_info(*id).name);
            }
            RawTerm::App { id, args, .. } => {
                acc.push_str(&term_bank.get_function_info(*id).name);
                print_args_into(args, term_bank, acc);
            }
        }
    }
}

fn is_equation(atom: &Atom, term_bank: &TermBank) -> bool {
    atom.args.len() == 2 && term_bank.get_predicate_info(atom.predicate).name == EQUALITY_PREDICATE
}

impl BankPrettyPrint for Atom {
    fn print_into(&self, term_bank: &TermBank, acc: &mut String) {
        if is_equation(self, term_bank) {
            self.args[0].print_into(term_bank, acc);
            acc.push_str(" = ");
            self.args[1].print_into(term_bank, acc);
        } else {
            acc.push_str(&term_bank.get_predicate_info(self.predicate).name);
            print_args_into(&self.args, term_bank, acc);
        }
    }
}

impl BankPrettyPrint for Literal {
    fn print_into(&self, term_bank: &TermBank, acc: &mut String) {
        match self.polarity {
            Polarity::Pos => self.atom.print_into(term_bank, acc),
            Polarity::Neg if is_equation(&self.atom, term_bank) => {
                self.atom.args[0].print_into(term_bank, acc);
                acc.push_str(" ~= ");
                self.atom.args[1].print_into(term_bank, acc);
            }
            Polarity::Neg => {
                acc.push('~');
                self.atom.print_into(term_bank, acc);
            }
        }
    }
}

impl BankPrettyPrint for Clause {
    fn print_into(&self, term_bank: &TermBank, acc: &mut String) {
        if self.is_empty() {
            acc.push('⊥');
            return;
        }
        for (idx, lit) in self.literals().iter().enumerate() {
            if idx > 0 {
                acc.push_str(" | ");
            }
            lit.print_into(term_bank, acc);
        }
    }
}

impl BankPrettyPrint for Formula<Atom> {
    fn print_into(&self, term_bank: &TermBank, acc: &mut String) {
        match self {
            Formula::Truth(true) => acc.push('T'),
            Formula::Truth(false) => acc.push('F'),
            Formula::Atom(atom) => atom.print_into(term_bank, acc),
            Formula::Not(body) => {
                acc.push('~');
                let needs_parens = !matches!(**body, Formula::Atom(_) | Formula::Truth(_));
                if needs_parens {
                    acc.push('(');
                }
                body.print_into(term_bank, acc);
                if needs_parens {
                    acc.push(')');
                }
            }
            Formula::Binary(conn, lhs, rhs) => {
                acc.push('(');
                lhs.print_into(term_bank, acc);
                acc.push_str(&format!(" {} ", conn));
                rhs.print_into(term_bank, acc);
                acc.push(')');
            }
            Formula::Quantified(q, var, body) => {
                acc.push_str(&format!("{} ?{} ", q, term_bank.get_variable_info(*var).name));
                body.print_into(term_bank, acc);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{
        clause::{Atom, Clause},
        formula::{Formula, Signed},
        term_bank::{EQUALITY_PREDICATE, TermBank, VariableInformation},
    };

    use super::pretty_print;

    #[test]
    fn clause_test() {
        let mut term_bank = TermBank::new();
        let on = term_bank.get_or_add_predicate("on", 2);
        let eq = term_bank.get_or_add_predicate(EQUALITY_PREDICATE, 2);
        let f = term_bank.get_or_add_function("f", 1);
        let b1 = term_bank.get_or_add_function("b1", 0);
        let b1 = term_bank.mk_const(b1);
        let x = term_bank.mk_fresh_variable(VariableInformation {
            name: "x".to_string(),
        });
        let fx = term_bank.mk_app(f, vec![x.clone()]);

        let clause = Clause::new(vec![
            Signed::neg(Atom::new(on, vec![b1.clone(), fx.clone()])),
            Signed::neg(Atom::new(eq, vec![x.clone(), b1.clone()])),
        ]);
        assert_eq!(pretty_print(&clause, &term_bank), "~on(b1,f(?x)) | ?x ~= b1");
        assert_eq!(pretty_print(&Clause::empty(), &term_bank), "⊥");
    }

    #[test]
    fn formula_test() {
        let mut term_bank = TermBank::new();
        let p = term_bank.get_or_add_predicate("p", 1);
        let q = term_bank.get_or_add_predicate("q", 0);
        let x_id = term_bank.add_variable(VariableInformation {
            name: "x".to_string(),
        });
        let x = term_bank.mk_variable(x_id);
        let f = Formula::quantified(
            crate::formula::Quantifier::Forall,
            x_id,
            Formula::implies(
                Formula::Atom(Atom::new(p, vec![x])),
                Formula::not(Formula::Atom(Atom::new(q, vec![]))),
            ),
        );
        assert_eq!(pretty_print(&f, &term_bank), "!A ?x (p(?x) => ~q)");
    }
}

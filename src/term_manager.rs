//! ## Hash Consed Term Manager
//! A small [hash consing](https://en.wikipedia.org/wiki/Hash_consing) layer based on reference
//! counting. The key data structures are:
//! - [Table] which interns values and hands out [HashConsed] pointers via [Table::hashcons].
//! - [HashConsed] a shared pointer to an interned value.
//!
//! All [HashConsed] produced by the same [Table] for equal values point to the same allocation,
//! so comparing them is a pointer comparison. Values are hashed once when they are built, the
//! interned allocation is released by [Table::gc] after the last outside pointer is dropped.

use std::{
    cell::RefCell,
    cmp::Ordering,
    fmt::{Debug, Display},
    hash::{Hash, Hasher},
    ops::Deref,
    rc::Rc,
};

use rustc_hash::FxHashSet;

/// An interning table producing [HashConsed] pointers.
#[derive(Debug)]
pub struct Table<T>
where
    T: Eq + Hash,
{
    entries: Rc<RefCell<FxHashSet<Rc<T>>>>,
}

/// A pointer to a value interned in some [Table].
pub struct HashConsed<T>
where
    T: Eq + Hash,
{
    value: Rc<T>,
}

impl<T: Eq + Hash> Table<T> {
    pub fn new() -> Self {
        Self {
            entries: Rc::new(RefCell::new(FxHashSet::default())),
        }
    }

    /// Return the shared representative of `value`, creating it if this is the first time the
    /// table sees an equal value.
    pub fn hashcons(&self, value: T) -> HashConsed<T> {
        let mut entries = self.entries.borrow_mut();
        if let Some(existing) = entries.get(&value) {
            return HashConsed {
                value: Rc::clone(existing),
            };
        }
        let value = Rc::new(value);
        entries.insert(Rc::clone(&value));
        HashConsed { value }
    }

    /// Drop every interned value that is only referenced by the table itself. Dropping a value
    /// may release its children, so this repeats until nothing changes.
    pub fn gc(&self) {
        loop {
            let mut entries = self.entries.borrow_mut();
            let prev_len = entries.len();
            entries.retain(|value| Rc::strong_count(value) > 1);
            if entries.len() == prev_len {
                break;
            }
        }
    }

    /// Number of values currently interned, including ones [Table::gc] would release.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Eq + Hash> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Rc::clone(&self.entries),
        }
    }
}

impl<T: Eq + Hash> HashConsed<T> {
    pub fn as_ptr(&self) -> *const T {
        Rc::as_ptr(&self.value)
    }
}

impl<T: Eq + Hash> Hash for HashConsed<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T: Eq + Hash> PartialEq for HashConsed<T> {
    fn eq(&self, other: &Self) -> bool {
        // Values from one table are perfectly shared, the structural comparison only matters
        // for pointers coming from different tables.
        Rc::ptr_eq(&self.value, &other.value) || self.value == other.value
    }
}

impl<T: Eq + Hash> Eq for HashConsed<T> {}

impl<T: Eq + Hash> Clone for HashConsed<T> {
    fn clone(&self) -> Self {
        Self {
            value: Rc::clone(&self.value),
        }
    }
}

impl<T: Eq + Hash + Debug> Debug for HashConsed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.value, f)
    }
}

impl<T: Eq + Hash + Display> Display for HashConsed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.value, f)
    }
}

impl<T: Eq + Hash> Deref for HashConsed<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T: Eq + Hash> AsRef<T> for HashConsed<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

impl<T: Eq + Hash + PartialOrd> PartialOrd for HashConsed<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl<T: Eq + Hash + Ord> Ord for HashConsed<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

//! A branch: a named, mutable write head for a ledger. Multiple branches can
//! share immutable index segments; only the branch's own writer ever mutates
//! its head or its cuckoo filter chain.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::error::{Error, Result};
use crate::store::Address;

/// Compare-and-set pointer to the branch's latest commit. Readers take a
/// consistent snapshot via [`Branch::head`]; writers race through
/// [`Branch::advance`], and exactly one wins per attempted commit.
pub struct Branch {
    pub name: String,
    head: ArcSwapOption<Address>,
}

impl Branch {
    pub fn new(name: impl Into<String>, head: Option<Address>) -> Branch {
        Branch {
            name: name.into(),
            head: ArcSwapOption::new(head.map(Arc::new)),
        }
    }

    pub fn head(&self) -> Option<Address> {
        self.head.load_full().map(|a| (*a).clone())
    }

    /// Advance the branch head from `expected` to `next`, failing with a
    /// consistency error if another writer already moved it. The
    /// check-then-set is a single atomic `compare_and_swap`, so two
    /// concurrent callers racing on the same `expected` can't both succeed —
    /// exactly one wins and the other observes a conflict.
    pub fn advance(&self, expected: Option<&Address>, next: Address) -> Result<()> {
        let current = self.head.load_full();
        let matches = match (&current, expected) {
            (None, None) => true,
            (Some(cur), Some(exp)) => cur.as_ref() == exp,
            _ => false,
        };
        if !matches {
            return Err(Error::consistency(format!(
                "branch '{}' head moved concurrently; expected {:?}, found {:?}",
                self.name,
                expected,
                current.map(|a| (*a).clone())
            )));
        }

        let previous = self.head.compare_and_swap(&current, Some(Arc::new(next)));
        let swapped = match (&*previous, &current) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        if !swapped {
            let found: Option<Address> = match &*previous {
                Some(a) => Some((**a).clone()),
                None => None,
            };
            return Err(Error::consistency(format!(
                "branch '{}' head moved concurrently; expected {:?}, found {:?}",
                self.name, expected, found
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "branch_test.rs"]
mod branch_test;

//! Representation table
//!
//! Interns identifier spellings so that names compare as integers. Equal
//! spellings always map to the same [`ReprId`], and no handle is ever
//! invalidated.

use super::Item;
use rustc_hash::FxHashMap;
use std::fmt;

/// Handle of one unique spelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReprId(u32);

impl ReprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn to_item(self) -> Item {
        Item::from(self.0)
    }

    /// Recovers a handle stored in a descriptor slot
    pub fn from_item(item: Item) -> Self {
        match u32::try_from(item) {
            Ok(raw) => ReprId(raw),
            Err(_) => crate::errors::internal_error(format_args!(
                "slot {item} is not a representation handle"
            )),
        }
    }
}

impl fmt::Display for ReprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct ReprTable {
    spellings: Vec<Box<str>>,
    index: FxHashMap<Box<str>, ReprId>,
}

impl ReprTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for `spelling`, appending it on first sight.
    pub fn intern(&mut self, spelling: &str) -> ReprId {
        if let Some(&id) = self.index.get(spelling) {
            return id;
        }

        let id = ReprId(self.spellings.len() as u32);
        self.spellings.push(spelling.into());
        self.index.insert(spelling.into(), id);
        id
    }

    /// Looks a spelling up without interning it
    pub fn get(&self, spelling: &str) -> Option<ReprId> {
        self.index.get(spelling).copied()
    }

    pub fn spelling(&self, id: ReprId) -> &str {
        &self.spellings[id.index()]
    }

    pub fn len(&self) -> usize {
        self.spellings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spellings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_stable() {
        let mut reprs = ReprTable::new();
        let a = reprs.intern("alpha");
        let b = reprs.intern("beta");
        assert_ne!(a, b);
        assert_eq!(reprs.intern("alpha"), a);
        assert_eq!(reprs.spelling(b), "beta");
        assert_eq!(reprs.len(), 2);
    }

    #[test]
    fn test_get_does_not_intern() {
        let mut reprs = ReprTable::new();
        assert_eq!(reprs.get("x"), None);
        let x = reprs.intern("x");
        assert_eq!(reprs.get("x"), Some(x));
        assert_eq!(reprs.len(), 1);
    }

    #[test]
    fn test_cyrillic_spellings() {
        let mut reprs = ReprTable::new();
        let id = reprs.intern("счётчик");
        assert_eq!(reprs.spelling(id), "счётчик");
        assert_eq!(ReprId::from_item(id.to_item()), id);
    }
}

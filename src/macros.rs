use std::{collections::HashMap, fmt, rc::Rc};

use crate::{ast::Node, host::HostError};

pub type Expansion = Result<Node, HostError>;

/// A compile-time expander: takes the unevaluated argument nodes of a call
/// and returns the node to compile in its place.
#[derive(Clone)]
pub struct Macro(Rc<dyn Fn(&[Node]) -> Expansion>);

impl Macro {
    pub fn new(expander: impl Fn(&[Node]) -> Expansion + 'static) -> Macro {
        Macro(Rc::new(expander))
    }

    pub fn expand(&self, args: &[Node]) -> Expansion {
        (self.0)(args)
    }
}

impl fmt::Debug for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Macro({:p})", Rc::as_ptr(&self.0))
    }
}

/// Maps macro names to their expanders for one compilation session.
///
/// Entries are only ever added (or replaced by a later definition with the
/// same name).
#[derive(Clone, Debug, Default)]
pub struct MacroTable {
    map: HashMap<Box<str>, Macro>,
}

impl MacroTable {
    pub fn with_capacity(capacity: usize) -> MacroTable {
        MacroTable {
            map: HashMap::with_capacity(capacity),
        }
    }

    /// Registers `expander` under `name`, returning the replaced definition,
    /// if any.
    pub fn define(&mut self, name: &str, expander: Macro) -> Option<Macro> {
        self.map.insert(name.into(), expander)
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the defined names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.map.keys().map(AsRef::as_ref).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_expand() {
        let mut table = MacroTable::with_capacity(2);
        assert!(table.is_empty());

        let first = Macro::new(|args| Ok(Node::list(args.iter().cloned())));
        assert!(table.define("listify", first).is_none());
        assert!(table.contains("listify"));

        let args = [Node::Integer(1), Node::symbol("x")];
        let expanded = table.get("listify").unwrap().expand(&args);
        assert_eq!(expanded, Ok(Node::list(args.clone())));

        let second = Macro::new(|_| Err(HostError::Raised("boom".into())));
        assert!(table.define("listify", second).is_some());
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.get("listify").unwrap().expand(&[]),
            Err(HostError::Raised("boom".into()))
        );
    }

    #[test]
    fn test_names_are_sorted() {
        let mut table = MacroTable::default();
        for name in ["when", "defn", "cond"] {
            table.define(name, Macro::new(|_| Ok(Node::Nil)));
        }
        assert_eq!(table.names(), ["cond", "defn", "when"]);
    }
}

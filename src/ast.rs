// form ::= list | prefixed | atom
// list ::= '(' form* ')' | '[' form* ']'
// prefixed ::= "'" form | '`' form | ',' form | ',@' form
// atom ::= integer | float | string | symbol | true | false | nil
//
// Comments (';' up to the end of the line) may appear anywhere a form may,
// and never reach the tree.

use std::fmt;

/// Deepest list nesting the reader produces and the compiler accepts.
pub const MAX_NESTING_DEPTH: usize = 256;

/// A node of the symbolic tree produced by the reader.
///
/// Quote-family shorthands are not separate variants: `'x` reads as the list
/// `(quote x)`, and likewise for the other markers (see [`markers`]).
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Integer(i64),
    Float(f64),
    String(Box<str>),
    Bool(bool),
    Nil,
    Symbol(Box<str>),
    /// Ordered list of children. Order is program structure.
    List(Vec<Node>),
}

impl Node {
    pub fn symbol(name: &str) -> Node {
        Node::Symbol(name.into())
    }

    pub fn string(value: &str) -> Node {
        Node::String(value.into())
    }

    pub fn list(items: impl IntoIterator<Item = Node>) -> Node {
        Node::List(items.into_iter().collect())
    }

    /// Builds the two-element list `(marker operand)`.
    pub fn marked(marker: &str, operand: Node) -> Node {
        Node::List(vec![Node::symbol(marker), operand])
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Node::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Node]> {
        match self {
            Node::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_symbol(&self, name: &str) -> bool {
        self.as_symbol() == Some(name)
    }

    /// Returns the head symbol if this node is a non-empty list starting with
    /// a symbol.
    pub fn head_symbol(&self) -> Option<&str> {
        self.as_list()?.first()?.as_symbol()
    }

    /// Levels of list nesting, counted without recursion. Atoms have depth 0
    /// and `()` has depth 1.
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut pending = vec![(self, 0)];
        while let Some((node, depth)) = pending.pop() {
            if let Node::List(items) = node {
                let depth = depth + 1;
                max = max.max(depth);
                pending.extend(items.iter().map(|item| (item, depth)));
            }
        }
        max
    }

    /// If this node is `(marker operand)`, returns the operand.
    pub fn marked_operand(&self, marker: &str) -> Option<&Node> {
        match self.as_list()? {
            [head, operand] if head.is_symbol(marker) => Some(operand),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::printer::print_string(self))
    }
}

/// Symbols which the reader uses to tag quote-family shorthands, and which
/// the quasiquote expander produces.
pub mod markers {
    pub const QUOTE: &str = "quote";
    pub const QUASIQUOTE: &str = "quasiquote";
    pub const UNQUOTE: &str = "unquote";
    pub const SPLICE_UNQUOTE: &str = "splice_unquote";

    pub const CONS: &str = "cons";
    pub const CONCAT: &str = "concat";

    /// Separates the fixed parameters of a `fn` from the variadic one.
    pub const REST: &str = "&";
    pub const CATCH: &str = "catch";
}

/// Heads which the compiler recognizes structurally.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpecialForm {
    Apply,
    Block,
    Def,
    DefMacro,
    Do,
    Fn,
    If,
    Send,
    Quasiquote,
    Quote,
    Try,
}

impl SpecialForm {
    pub fn lookup(head: &str) -> Option<SpecialForm> {
        SPECIAL_FORMS.get(head).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            SpecialForm::Apply => "apply",
            SpecialForm::Block => "block",
            SpecialForm::Def => "def",
            SpecialForm::DefMacro => "defmacro",
            SpecialForm::Do => "do",
            SpecialForm::Fn => "fn",
            SpecialForm::If => "if",
            SpecialForm::Send => ".",
            SpecialForm::Quasiquote => "quasiquote",
            SpecialForm::Quote => "quote",
            SpecialForm::Try => "try",
        }
    }
}

impl fmt::Display for SpecialForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub static SPECIAL_FORMS: phf::Map<&'static str, SpecialForm> = phf::phf_map! {
    "apply" => SpecialForm::Apply,
    "block" => SpecialForm::Block,
    "def" => SpecialForm::Def,
    "defmacro" => SpecialForm::DefMacro,
    "do" => SpecialForm::Do,
    "fn" => SpecialForm::Fn,
    "if" => SpecialForm::If,
    "." => SpecialForm::Send,
    "quasiquote" => SpecialForm::Quasiquote,
    "quote" => SpecialForm::Quote,
    "try" => SpecialForm::Try,
};

/// Words which read as scalar literals rather than symbols.
pub static LITERAL_WORDS: phf::Map<&'static str, LiteralWord> = phf::phf_map! {
    "true" => LiteralWord::True,
    "false" => LiteralWord::False,
    "nil" => LiteralWord::Nil,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LiteralWord {
    True,
    False,
    Nil,
}

impl From<LiteralWord> for Node {
    fn from(value: LiteralWord) -> Self {
        match value {
            LiteralWord::True => Node::Bool(true),
            LiteralWord::False => Node::Bool(false),
            LiteralWord::Nil => Node::Nil,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marked_operand() {
        let quoted = Node::marked(markers::QUOTE, Node::symbol("x"));
        assert_eq!(quoted.marked_operand(markers::QUOTE), Some(&Node::symbol("x")));
        assert_eq!(quoted.marked_operand(markers::UNQUOTE), None);
        assert_eq!(quoted.head_symbol(), Some("quote"));

        let three = Node::list([Node::symbol("quote"), Node::Integer(1), Node::Integer(2)]);
        assert_eq!(three.marked_operand(markers::QUOTE), None);
        assert_eq!(Node::Integer(1).head_symbol(), None);
        assert_eq!(Node::list([]).head_symbol(), None);
    }

    #[test]
    fn test_depth() {
        assert_eq!(Node::Integer(1).depth(), 0);
        assert_eq!(Node::list([]).depth(), 1);
        let nested = Node::list([
            Node::symbol("a"),
            Node::list([Node::list([Node::Nil])]),
            Node::list([]),
        ]);
        assert_eq!(nested.depth(), 3);
    }

    #[test]
    fn test_special_form_names_round_trip() {
        for (name, form) in SPECIAL_FORMS.entries() {
            assert_eq!(form.name(), *name);
            assert_eq!(SpecialForm::lookup(name), Some(*form));
        }
        assert_eq!(SpecialForm::lookup("defn"), None);
    }
}

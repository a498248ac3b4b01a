use std::{
    fmt::Write as _,
    io::{self, Write},
};

use crate::ast::Node;

pub fn print_string(node: &Node) -> String {
    let mut buf = Vec::with_capacity(64);
    print(&mut buf, node).unwrap();
    String::from_utf8(buf).unwrap()
}

/// Renders a value back into S-expression text.
///
/// Lists render as quoted lists, so that the output reads back as data.
pub fn print(w: &mut impl Write, node: &Node) -> io::Result<()> {
    match node {
        Node::List(items) => {
            write!(w, "'(")?;
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    write!(w, " ")?;
                }
                print(w, item)?;
            }
            write!(w, ")")
        }
        Node::Symbol(name) => write!(w, "{name}"),
        Node::Integer(int) => write!(w, "{int}"),
        Node::Float(float) => write!(w, "{float:?}"),
        Node::String(string) => write!(w, "{}", quote_string(string)),
        Node::Bool(bool) => write!(w, "{bool}"),
        Node::Nil => write!(w, "nil"),
    }
}

/// Wraps the string in double quotes, escaping it with JSON rules.
pub fn quote_string(raw: &str) -> String {
    let mut buf = String::with_capacity(raw.len() + 2);
    buf.push('"');
    for char in raw.chars() {
        match char {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            '\x08' => buf.push_str("\\b"),
            '\x0c' => buf.push_str("\\f"),
            c if c < ' ' || c == '\x7f' => {
                // Infallible for `String`.
                _ = write!(buf, "\\u{:04x}", u32::from(c));
            }
            c => buf.push(c),
        }
    }
    buf.push('"');
    buf
}

use crate::ast::{markers, Node};

/// Rewrites the operand of a `quasiquote` into plain `quote`, `cons` and
/// `concat` calls.
///
/// - `(unquote x)` becomes `x`;
/// - a list whose first element is `(splice_unquote xs)` becomes
///   `(concat xs <rest>)`;
/// - any other non-empty list becomes `(cons <head> <rest>)`;
/// - anything else (including the empty list) is quoted as is.
pub fn expand(node: &Node) -> Result<Node, Error> {
    match node {
        Node::List(items) if !items.is_empty() => expand_list(items),
        other => Ok(quote(other.clone())),
    }
}

/// Builds the `cons`/`concat` chain from the right, so that long lists don't
/// recurse once per element. Elements are still checked left to right.
fn expand_list(items: &[Node]) -> Result<Node, Error> {
    let mut links = Vec::with_capacity(items.len());
    let mut rest = quote(Node::List(Vec::new()));
    for (i, item) in items.iter().enumerate() {
        if item.is_symbol(markers::UNQUOTE) {
            rest = match &items[i + 1..] {
                [operand] => operand.clone(),
                operands => {
                    return Err(Error::MalformedUnquote {
                        marker: markers::UNQUOTE,
                        operands: operands.len(),
                    })
                }
            };
            break;
        }
        links.push(link(item)?);
    }

    Ok(links
        .into_iter()
        .rev()
        .fold(rest, |rest, (function, head)| call(function, head, rest)))
}

/// The function and left operand that put `item` in front of the rest.
fn link(item: &Node) -> Result<(&'static str, Node), Error> {
    if let Some([marker, spliced @ ..]) = item.as_list() {
        if marker.is_symbol(markers::SPLICE_UNQUOTE) {
            let [operand] = spliced else {
                return Err(Error::MalformedUnquote {
                    marker: markers::SPLICE_UNQUOTE,
                    operands: spliced.len(),
                });
            };
            return Ok((markers::CONCAT, operand.clone()));
        }
    }
    Ok((markers::CONS, expand(item)?))
}

fn quote(node: Node) -> Node {
    Node::marked(markers::QUOTE, node)
}

fn call(function: &str, lhs: Node, rhs: Node) -> Node {
    Node::List(vec![Node::symbol(function), lhs, rhs])
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// An unquote marker with other than exactly one operand.
    MalformedUnquote {
        marker: &'static str,
        operands: usize,
    },
}

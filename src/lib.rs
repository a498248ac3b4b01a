/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The reader takes a sequence of tokens, mapping it into S-expression nodes.
pub mod reader;

/// Rewrites quasiquote templates into explicit list construction calls.
pub mod quasiquote;

/// The compiler expands macros and maps nodes into fragments of a target
/// language.
pub mod compiler;

pub mod codegen;

pub mod ast;
pub mod host;
pub mod macros;
pub mod names;
pub mod printer;
pub mod token;

pub mod util {
    pub mod fmt;
    #[cfg(test)]
    pub(crate) mod test_utils;
}

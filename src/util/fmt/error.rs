use std::fmt;

use crate::{
    ast::MAX_NESTING_DEPTH,
    codegen::{GenerateError, UnknownTarget},
    compiler,
    host::HostError,
    lexer::StringError,
    printer::print_string,
    quasiquote, reader,
    token::{Spanned, TokenKind},
};

impl<E> fmt::Display for Spanned<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Spanned { span, inner: error } = self;
        if f.alternate() {
            write!(f, "{span}: ")?;
        }
        error.fmt(f)
    }
}

impl fmt::Display for reader::Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use reader::Error::*;
        match self {
            UnbalancedParens => write!(f, "unbalanced parentheses"),
            MismatchedDelimiter { expected, actual } => {
                let expected = delimiter(*expected);
                let actual = delimiter(*actual);
                write!(f, "mismatched delimiter, expected `{expected}` but got `{actual}`")
            }
            UnexpectedCloser => write!(f, "unexpected closing delimiter"),
            UnexpectedEof => write!(f, "unexpected end of input after prefix"),
            NumberOutOfRange => write!(f, "number literal out of range"),
            InvalidString(error) => write!(f, "invalid string literal: {error}"),
            UnclosedString => write!(f, "unclosed string"),
            NestingTooDeep => write!(f, "forms nested deeper than {MAX_NESTING_DEPTH} levels"),
        }
    }
}

fn delimiter(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::LParen => "(",
        TokenKind::RParen => ")",
        TokenKind::LBracket => "[",
        TokenKind::RBracket => "]",
        TokenKind::Eof => "<eof>",
        _ => "<token>",
    }
}

impl fmt::Display for StringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringError::InvalidEscape(c) => write!(f, "invalid escape sequence \\{c}"),
            StringError::InvalidUnicodeEscape => write!(f, "invalid unicode escape sequence"),
            StringError::LoneSurrogate => write!(f, "unpaired surrogate in unicode escape"),
            StringError::ControlCharacter => write!(f, "unescaped control character"),
        }
    }
}

impl fmt::Display for quasiquote::Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            quasiquote::Error::MalformedUnquote { marker, operands } => {
                let arity = compiler::Arity::Exactly(1);
                write!(f, "`{marker}` expects {arity}, but got {operands}")
            }
        }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Detached => write!(f, "no execution environment attached"),
            HostError::Raised(message) => f.write_str(message),
            HostError::Process(message) => write!(f, "execution environment failed: {message}"),
        }
    }
}

impl fmt::Display for compiler::Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use compiler::Error::*;
        match self {
            Read(error) => write!(f, "{error:#}"),
            Quasiquote(error) => error.fmt(f),
            Arity {
                form,
                expected,
                actual,
            } => write!(f, "`{form}` expects {expected}, but got {actual}"),
            ExpectedSymbol { form, actual } => {
                let actual = print_string(actual);
                write!(f, "`{form}` expects a symbol as name, but got {actual}")
            }
            InvalidParameters(params) => {
                let params = print_string(params);
                write!(f, "invalid parameter list {params}")
            }
            MalformedCatch(clause) => {
                let clause = print_string(clause);
                write!(f, "expected (catch <symbol> <handler>), but got {clause}")
            }
            EmptyApplication => write!(f, "can't compile the empty list"),
            MacroDefinition { name, error } => {
                write!(f, "failed to define macro `{name}`: {error}")
            }
            MacroExpansion { name, error } => {
                write!(f, "failed to expand macro `{name}`: {error}")
            }
            ExpansionDepthExceeded { name } => write!(
                f,
                "maximum macro expansion depth ({}) exceeded while expanding `{name}`",
                compiler::MAX_EXPANSION_DEPTH
            ),
            NestingTooDeep => write!(
                f,
                "expression nested deeper than {MAX_NESTING_DEPTH} levels after expansion"
            ),
            Runtime(error) => write!(f, "runtime error: {error}"),
        }
    }
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::Compile(error) => error.fmt(f),
            GenerateError::Io(error) => write!(f, "failed to write output: {error}"),
        }
    }
}

impl fmt::Display for UnknownTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown target `{}`", self.0)
    }
}

impl std::error::Error for compiler::Error {}
impl std::error::Error for GenerateError {}
impl std::error::Error for UnknownTarget {}
impl std::error::Error for HostError {}

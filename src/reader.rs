use crate::{
    ast::{markers, Node, LITERAL_WORDS, MAX_NESTING_DEPTH},
    lexer::{self, extract, StringError},
    token::{Spanned, Token, TokenKind},
};

pub type ReadResult<T> = Result<T, Spanned<Error>>;

/// Reads exactly one form from the source.
///
/// Returns `None` if the first form is a comment or if there is no form at
/// all. Anything after the first form is left unread.
pub fn read(src: &str, tokens: &mut Vec<Token>) -> ReadResult<Option<Node>> {
    prepare(src, tokens);
    Reader::new(src, tokens).read_form()
}

/// Reads every top-level form of the source, in order. Comments are dropped.
pub fn read_all(src: &str, tokens: &mut Vec<Token>) -> ReadResult<Vec<Node>> {
    prepare(src, tokens);
    let mut reader = Reader::new(src, tokens);
    let mut forms = Vec::with_capacity(16);
    while !reader.is_at_end() {
        if let Some(form) = reader.read_form()? {
            log::trace!("read form {form}");
            forms.push(form);
        }
    }
    Ok(forms)
}

fn prepare(src: &str, tokens: &mut Vec<Token>) {
    assert!(tokens.is_empty(), "must pass clean tokens buffer");
    lexer::lex(src, tokens);
}

/// Recursive descent reader over an already lexed token buffer.
///
/// The token buffer itself is never mutated; a cursor tracks the current
/// position, and every read advances it. Lists and prefixes may nest at most
/// [`MAX_NESTING_DEPTH`] levels.
pub struct Reader<'src, 'tok> {
    src: &'src str,
    tokens: &'tok [Token],
    cursor: usize,
    depth: usize,
}

impl<'src, 'tok> Reader<'src, 'tok> {
    pub fn new(src: &'src str, tokens: &'tok [Token]) -> Reader<'src, 'tok> {
        Reader {
            src,
            tokens,
            cursor: 0,
            depth: 0,
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.peek().is_eof()
    }

    /// Reads the next form.
    ///
    /// A comment is consumed and yields `None`, so that list contexts may
    /// drop it. The end of input also yields `None` (see [`Reader::is_at_end`]).
    pub fn read_form(&mut self) -> ReadResult<Option<Node>> {
        let token = self.advance();
        let node = match token.kind {
            TokenKind::Eof | TokenKind::Comment => return Ok(None),
            TokenKind::LParen | TokenKind::LBracket => {
                self.nested(token, |reader| reader.read_list(token))?
            }
            TokenKind::RParen | TokenKind::RBracket => {
                return Err(token.span().wrap(Error::UnexpectedCloser));
            }
            TokenKind::Quote => self.read_prefixed(token, markers::QUOTE)?,
            TokenKind::Quasiquote => self.read_prefixed(token, markers::QUASIQUOTE)?,
            TokenKind::Unquote => self.read_prefixed(token, markers::UNQUOTE)?,
            TokenKind::SpliceUnquote => self.read_prefixed(token, markers::SPLICE_UNQUOTE)?,
            TokenKind::String | TokenKind::EscapedString => {
                let string = extract::string(token, self.src)
                    .map_err(|error| token.span().wrap(Error::InvalidString(error)))?;
                Node::String(string)
            }
            TokenKind::Word => self.read_atom(token)?,
            TokenKind::ErrorUnclosedString => {
                return Err(token.span().wrap(Error::UnclosedString));
            }
        };
        Ok(Some(node))
    }

    /// Reads children until the closer which balances `opener`. The opener
    /// must have been consumed already.
    fn read_list(&mut self, opener: Token) -> ReadResult<Node> {
        let closer = opener
            .kind
            .closer()
            .expect("read_list must be called with an opener");
        let mut items = Vec::new();
        loop {
            let token = self.peek();
            match token.kind {
                kind if kind == closer => {
                    self.advance();
                    return Ok(Node::List(items));
                }
                kind if kind.is_closer() => {
                    let error = Error::MismatchedDelimiter {
                        expected: closer,
                        actual: kind,
                    };
                    return Err(token.span().wrap(error));
                }
                TokenKind::Eof => return Err(opener.span().wrap(Error::UnbalancedParens)),
                _ => {
                    if let Some(item) = self.read_form()? {
                        items.push(item);
                    }
                }
            }
        }
    }

    /// Reads the operand of a quote-family prefix, skipping comments.
    fn read_prefixed(&mut self, prefix: Token, marker: &str) -> ReadResult<Node> {
        self.nested(prefix, |reader| reader.read_operand(prefix, marker))
    }

    fn read_operand(&mut self, prefix: Token, marker: &str) -> ReadResult<Node> {
        loop {
            if self.is_at_end() {
                return Err(prefix.span().wrap(Error::UnexpectedEof));
            }
            if let Some(operand) = self.read_form()? {
                return Ok(Node::marked(marker, operand));
            }
        }
    }

    fn read_atom(&self, token: Token) -> ReadResult<Node> {
        let text = token.text(self.src);
        if let Some(word) = LITERAL_WORDS.get(text) {
            return Ok(Node::from(*word));
        }
        let out_of_range = || token.span().wrap(Error::NumberOutOfRange);
        match classify_number(text) {
            Some(Number::Integer) => text.parse().map(Node::Integer).map_err(|_| out_of_range()),
            Some(Number::Float) => match text.parse::<f64>() {
                Ok(float) if float.is_finite() => Ok(Node::Float(float)),
                _ => Err(out_of_range()),
            },
            None => Ok(Node::symbol(text)),
        }
    }

    /// Runs `read` one nesting level below `opener`.
    fn nested<T>(
        &mut self,
        opener: Token,
        read: impl FnOnce(&mut Self) -> ReadResult<T>,
    ) -> ReadResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(opener.span().wrap(Error::NestingTooDeep));
        }
        self.depth += 1;
        let result = read(self);
        self.depth -= 1;
        result
    }
}

impl Reader<'_, '_> {
    /// Returns the current token without advancing.
    fn peek(&self) -> Token {
        match self.tokens.get(self.cursor) {
            Some(token) => *token,
            None => Token::eof_for(self.src),
        }
    }

    /// Returns the current token and advances. Never advances past the end.
    fn advance(&mut self) -> Token {
        let c = self.peek();
        if !c.is_eof() {
            self.cursor += 1;
        }
        c
    }
}

enum Number {
    Integer,
    Float,
}

/// Integers are `-?[0-9]+`, floats are `-?[0-9]+\.[0-9]+`.
fn classify_number(text: &str) -> Option<Number> {
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    match unsigned.split_once('.') {
        None if all_digits(unsigned) => Some(Number::Integer),
        Some((int, frac)) if all_digits(int) && all_digits(frac) => Some(Number::Float),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The input ended before the list (starting at the error span) closed.
    UnbalancedParens,
    MismatchedDelimiter {
        expected: TokenKind,
        actual: TokenKind,
    },
    UnexpectedCloser,
    /// The input ended right after a quote-family prefix.
    UnexpectedEof,
    /// Finite numbers only; `inf` has no source form.
    NumberOutOfRange,
    InvalidString(StringError),
    UnclosedString,
    /// A list or prefix opened below [`MAX_NESTING_DEPTH`] levels.
    NestingTooDeep,
}

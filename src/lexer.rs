use std::{iter::Peekable, str::Chars};

use crate::token::{Span, Token, TokenKind};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 8_192;

/// Lexes the provided string, producing the tokens into the provided buffer.
pub fn lex(src: &str, tokens: &mut Vec<Token>) {
    Lexer::new(src, tokens).lex();
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn lex_in_new(src: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    lex(src, &mut tokens);
    tokens
}

/// The S-expression lexer.
struct Lexer<'src, 'tok> {
    iter: Peekable<Chars<'src>>,
    cursor: usize,
    current_lo: usize,
    tokens: &'tok mut Vec<Token>,
}

impl Lexer<'_, '_> {
    /// Scans the source string until the input is exhausted.
    ///
    /// Tokens are written into the provided tokens buffer. Whitespace is
    /// skipped and never produces a token.
    fn lex(mut self) {
        assert_eq!(self.tokens.len(), 0, "must pass clean tokens buffer");
        loop {
            self.skip_whitespace();
            let next = self.scan_token_kind();
            let is_eof = matches!(next, TokenKind::Eof);
            self.produce(next);
            if is_eof {
                break;
            }
        }
    }

    /// Tries to scan the current character.
    fn scan_token_kind(&mut self) -> TokenKind {
        use TokenKind::*;
        let Some(c) = self.mark_advance() else {
            return Eof;
        };
        match c {
            '"' => self.string(),
            ';' => self.comment(),
            ',' => match self.peek() {
                Some('@') => self.advance_with(SpliceUnquote),
                _ => Unquote,
            },
            '(' => LParen,
            ')' => RParen,
            '[' => LBracket,
            ']' => RBracket,
            '\'' => Quote,
            '`' => Quasiquote,
            _ => self.word(),
        }
    }

    /// Finds the bounds of a string token.
    ///
    /// Like the rest of the lexer, no escaping is performed here. The escape
    /// sequences are only validated and resolved by [`extract::string`], which
    /// allows plain strings to skip the escaping buffer altogether.
    fn string(&mut self) -> TokenKind {
        // Whether any escaping did happen inside this string token
        let mut has_escaped = false;
        // Whether the current character is being escaped
        let mut is_escaping = false;
        loop {
            match (is_escaping, self.advance()) {
                // The input has exhausted before the closing quote.
                (_, None) => return TokenKind::ErrorUnclosedString,
                (false, Some('"')) => {
                    return if has_escaped {
                        TokenKind::EscapedString
                    } else {
                        TokenKind::String
                    };
                }
                (false, Some('\\')) => {
                    has_escaped = true;
                    is_escaping = true;
                }
                (_, Some(_)) => {
                    is_escaping = false;
                }
            }
        }
    }

    fn comment(&mut self) -> TokenKind {
        while !matches!(self.peek(), Some('\n') | None) {
            self.advance();
        }
        TokenKind::Comment
    }

    fn word(&mut self) -> TokenKind {
        while self.peek().is_some_and(is_word_char) {
            self.advance();
        }
        TokenKind::Word
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(is_whitespace) {
            self.advance();
        }
    }
}

impl Lexer<'_, '_> {
    /// Constructs a new lexer with the default state.
    fn new<'src, 'tok>(src: &'src str, tokens: &'tok mut Vec<Token>) -> Lexer<'src, 'tok> {
        Lexer {
            iter: src.chars().peekable(),
            cursor: 0,
            current_lo: 0,
            tokens,
        }
    }

    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> Option<char> {
        self.current_lo = self.cursor;
        self.advance()
    }

    /// Returns the next character and advances the iterator.
    fn advance(&mut self) -> Option<char> {
        self.iter
            .next()
            .inspect(|c| self.cursor += c.len_utf8())
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next character without advancing the iterator.
    fn peek(&mut self) -> Option<char> {
        self.iter.peek().copied()
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new_of_bounds(self.current_lo..self.cursor)
    }

    /// Produces a token using the marked bounds.
    fn produce(&mut self, kind: TokenKind) {
        self.tokens.push(Token::new(kind, self.span()));
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

fn is_word_char(c: char) -> bool {
    !is_whitespace(c) && !matches!(c, '(' | ')' | '[' | ']' | '"' | '\'' | '`' | ',')
}

/// Failure to decode a string literal under JSON string rules.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StringError {
    InvalidEscape(char),
    InvalidUnicodeEscape,
    LoneSurrogate,
    ControlCharacter,
}

pub mod extract {
    use super::*;

    /// Decodes the contents of a string token (either plain or escaped).
    pub fn string(token: Token, src: &str) -> Result<Box<str>, StringError> {
        debug_assert!(matches!(
            token.kind,
            TokenKind::String | TokenKind::EscapedString
        ));
        let raw = token.span().offset(1, -1).substr(src);
        if token.kind == TokenKind::String {
            if raw.chars().any(|c| c < ' ') {
                return Err(StringError::ControlCharacter);
            }
            return Ok(raw.into());
        }
        perform_escape(raw).map(String::into_boxed_str)
    }
}

fn perform_escape(raw: &str) -> Result<String, StringError> {
    let mut buf = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(char) = chars.next() {
        let char = match char {
            '\\' => match chars.next() {
                Some('"') => '"',
                Some('\\') => '\\',
                Some('/') => '/',
                Some('b') => '\x08', // backspace
                Some('f') => '\x0c', // form feed
                Some('n') => '\n',
                Some('r') => '\r',
                Some('t') => '\t',
                Some('u') => unicode_escape(&mut chars)?,
                Some(other) => return Err(StringError::InvalidEscape(other)),
                // The lexer never closes a string on an escaped quote.
                None => return Err(StringError::InvalidEscape('"')),
            },
            c if c < ' ' => return Err(StringError::ControlCharacter),
            c => c,
        };
        buf.push(char);
    }
    buf.shrink_to_fit();
    Ok(buf)
}

/// Decodes the four hex digits following `\u`, combining UTF-16 surrogate
/// pairs when needed.
fn unicode_escape(chars: &mut Chars<'_>) -> Result<char, StringError> {
    let high = hex4(chars)?;
    if !(0xD800..0xDC00).contains(&high) {
        // Lone low surrogates are rejected by `from_u32`.
        return char::from_u32(high).ok_or(StringError::LoneSurrogate);
    }
    if chars.next() != Some('\\') || chars.next() != Some('u') {
        return Err(StringError::LoneSurrogate);
    }
    let low = hex4(chars)?;
    if !(0xDC00..0xE000).contains(&low) {
        return Err(StringError::LoneSurrogate);
    }
    let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
    char::from_u32(code).ok_or(StringError::LoneSurrogate)
}

fn hex4(chars: &mut Chars<'_>) -> Result<u32, StringError> {
    let mut code = 0;
    for _ in 0..4 {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or(StringError::InvalidUnicodeEscape)?;
        code = code * 16 + digit;
    }
    Ok(code)
}

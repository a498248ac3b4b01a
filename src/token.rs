use std::{fmt, ops::Range};

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    lo: usize,
    len: u32,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Token {
        Token {
            kind,
            len: span.len,
            lo: span.lo,
        }
    }

    /// Returns a synthetic end of input token, positioned at the end of `src`.
    pub fn eof_for(src: &str) -> Token {
        Token::new(TokenKind::Eof, Span::new_of_bounds(src.len()..src.len()))
    }

    pub fn span(&self) -> Span {
        Span {
            len: self.len,
            lo: self.lo,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// Returns the source text covered by this token.
    pub fn text<'src>(&self, src: &'src str) -> &'src str {
        self.span().substr(src)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {})", self.kind, self.span())
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Span {
    pub len: u32,
    pub lo: usize,
}

impl Span {
    pub fn new_of_bounds(Range { start: lo, end: hi }: Range<usize>) -> Span {
        debug_assert!(hi >= lo);
        Self::new_of_length(lo, u32::try_from(hi - lo).expect("token longer than 4 GiB"))
    }

    pub fn new_of_length(lo: usize, len: u32) -> Span {
        Span { len, lo }
    }

    pub fn hi(&self) -> usize {
        self.lo + self.len as usize
    }

    /// Returns a span which starts at `self` and ends at `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new_of_bounds(self.lo..other.hi())
    }

    /// Shrinks (or grows) the span by the given offsets.
    pub fn offset(self, lo: isize, hi: isize) -> Span {
        let new_lo = self.lo.saturating_add_signed(lo);
        let new_hi = self.hi().saturating_add_signed(hi);
        Span::new_of_bounds(new_lo..new_hi.max(new_lo))
    }

    pub fn substr(self, src: &str) -> &str {
        &src[self.lo..self.hi()]
    }

    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned { span: self, inner }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, len: {})", self.len)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo = self.lo;
        let hi = self.hi();
        write!(f, "{lo}..{hi}")
    }
}

/// Some value paired with the source region it originates from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub inner: T,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `'`
    Quote,
    /// `` ` ``
    Quasiquote,
    /// `,`
    Unquote,
    /// `,@`
    SpliceUnquote,

    /// A double-quoted string without any escape sequence.
    String,
    /// A double-quoted string with at least one escape sequence.
    EscapedString,
    /// From `;` up to the end of the line.
    Comment,
    /// Any other run of non-structural characters: numbers, symbols.
    Word,

    Eof,
    ErrorUnclosedString,
}

impl TokenKind {
    pub fn is_error(&self) -> bool {
        matches!(self, TokenKind::ErrorUnclosedString)
    }

    pub fn is_opener(&self) -> bool {
        matches!(self, TokenKind::LParen | TokenKind::LBracket)
    }

    pub fn is_closer(&self) -> bool {
        matches!(self, TokenKind::RParen | TokenKind::RBracket)
    }

    /// Returns the closer which balances this opener, if any.
    pub fn closer(&self) -> Option<TokenKind> {
        match self {
            TokenKind::LParen => Some(TokenKind::RParen),
            TokenKind::LBracket => Some(TokenKind::RBracket),
            _ => None,
        }
    }
}

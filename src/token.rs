use std::fmt;

/// A point in the source. Lines are 1-based, columns and byte offsets are
/// 0-based.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl Position {
    pub const INITIAL: Position = Position {
        line: 1,
        column: 0,
        offset: 0,
    };

    pub fn new(line: u32, column: u32, offset: usize) -> Position {
        Position {
            line,
            column,
            offset,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::INITIAL
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Position({self}, offset: {})", self.offset)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A source range. `start` is inclusive and `end` is exclusive (in terms of
/// byte offsets).
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub start: Position,
    pub end: Position,
}

impl Location {
    pub fn new(start: Position, end: Position) -> Location {
        debug_assert!(end.offset >= start.offset);
        Location { start, end }
    }

    /// Returns a location which spans from the start of `self` to the end of
    /// `other`.
    pub fn to(self, other: Location) -> Location {
        Location::new(self.start, other.end)
    }

    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn substr(self, src: &str) -> &str {
        &src[self.start.offset..self.end.offset]
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Location({self}, {}..{})", self.start, self.end)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start.offset, self.end.offset)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// The verbatim source text of the token. String tokens keep their quotes
    /// and escape sequences.
    pub lexeme: Box<str>,
    pub location: Location,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<Box<str>>, location: Location) -> Token {
        Token {
            kind,
            lexeme: lexeme.into(),
            location,
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token({:?}, {:?}, {})",
            self.kind, self.lexeme, self.location
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    Colon,
    Dot,
    /// `...`
    Spread,
    /// `$`, which introduces an environment reference.
    Dollar,
    Int,
    Float,
    String,
    Bool,
    Ident,
    /// Unquoted path starting with `/` or `./`.
    Path,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::LBrace => "left brace",
            TokenKind::RBrace => "right brace",
            TokenKind::LBracket => "left bracket",
            TokenKind::RBracket => "right bracket",
            TokenKind::Colon => "colon",
            TokenKind::Dot => "dot",
            TokenKind::Spread => "spread",
            TokenKind::Dollar => "dollar",
            TokenKind::Int => "int",
            TokenKind::Float => "float",
            TokenKind::String => "string",
            TokenKind::Bool => "bool",
            TokenKind::Ident => "ident",
            TokenKind::Path => "path",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Formats a list of token kinds as `[a, b, c]`.
pub struct KindList<'a>(pub &'a [TokenKind]);

impl fmt::Display for KindList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, kind) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(kind.name())?;
        }
        f.write_str("]")
    }
}

/// Words which are lexed as literals instead of identifiers.
pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "true" => TokenKind::Bool,
    "false" => TokenKind::Bool,
};

use crate::token::{Location, Position, Token, TokenKind, KEYWORDS};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 1_024;

/// Lexes the provided string, producing the tokens into the provided buffer.
///
/// Whitespace, commas, line breaks and `//` comments are skipped; they only
/// advance the current location.
pub fn lex(src: &str, tokens: &mut Vec<Token>) -> Result<(), Error> {
    Lexer::new(src, tokens).lex()
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn lex_in_new(src: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    lex(src, &mut tokens)?;
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unexpected token at {position}")]
    UnexpectedToken { position: Position },
}

/// The config language lexer.
struct Lexer<'src, 'tok> {
    src: &'src str,
    cursor: Position,
    current_lo: Position,
    tokens: &'tok mut Vec<Token>,
}

impl Lexer<'_, '_> {
    /// Scans the source string until the input is exhausted.
    fn lex(mut self) -> Result<(), Error> {
        assert_eq!(self.tokens.len(), 0, "must pass clean tokens buffer");
        while let Some(c) = self.mark_advance() {
            if let Some(kind) = self.scan_token_kind(c)? {
                self.produce(kind);
            }
        }
        Ok(())
    }

    /// Tries to scan a token starting with the already consumed character.
    /// Returns `None` for trivia.
    fn scan_token_kind(&mut self, c: char) -> Result<Option<TokenKind>, Error> {
        use TokenKind::*;
        let kind = match c {
            ' ' | '\t' | '\r' | '\n' | ',' => return Ok(None),
            '/' => match self.peek() {
                Some('/') => {
                    self.line_comment();
                    return Ok(None);
                }
                Some(c) if is_path_char(c) => self.path(),
                _ => return Err(self.unexpected()),
            },
            '.' => match (self.peek(), self.peek_nth(1)) {
                (Some('/'), Some(c)) if is_path_char(c) => {
                    self.advance();
                    self.path()
                }
                (Some('.'), Some('.')) => {
                    self.advance();
                    self.advance_with(Spread)
                }
                _ => Dot,
            },
            '"' => self.string()?,
            '-' | '+' => match self.peek() {
                Some(c) if c.is_ascii_digit() => self.number(),
                _ => return Err(self.unexpected()),
            },
            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier_or_keyword(),
            '{' => LBrace,
            '}' => RBrace,
            '[' => LBracket,
            ']' => RBracket,
            ':' => Colon,
            '$' => Dollar,
            _ => return Err(self.unexpected()),
        };
        Ok(Some(kind))
    }

    /// Lexes a double-quoted string. Any character following a backslash is
    /// taken as part of the string, which covers both `\"` and `\\`.
    ///
    /// The token keeps its raw lexeme; unescaping happens in the parser.
    fn string(&mut self) -> Result<TokenKind, Error> {
        loop {
            match self.advance() {
                None => return Err(self.unexpected()),
                Some('"') => return Ok(TokenKind::String),
                Some('\\') => {
                    if self.advance().is_none() {
                        return Err(self.unexpected());
                    }
                }
                Some(_) => (),
            }
        }
    }

    /// Consumes the remainder of a path, whose prefix (`/` or `./`) has
    /// already been consumed. At least one path character must follow.
    fn path(&mut self) -> TokenKind {
        while self.peek().is_some_and(is_path_char) {
            self.advance();
        }
        TokenKind::Path
    }

    fn number(&mut self) -> TokenKind {
        self.digits();
        match (self.peek(), self.peek_nth(1)) {
            (Some('.'), Some(c)) if c.is_ascii_digit() => {
                self.advance();
                self.digits();
                TokenKind::Float
            }
            _ => TokenKind::Int,
        }
    }

    fn digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        let valid_identifier_suffix = |c: char| c.is_ascii_alphanumeric() || c == '_';
        while self.peek().is_some_and(valid_identifier_suffix) {
            self.advance();
        }
        KEYWORDS
            .get(self.substr())
            .copied()
            .unwrap_or(TokenKind::Ident)
    }

    /// Skips a `//` comment up to (but not including) the line break.
    fn line_comment(&mut self) {
        while !matches!(self.peek(), Some('\n') | None) {
            self.advance();
        }
    }
}

impl Lexer<'_, '_> {
    /// Constructs a new lexer with the default state.
    fn new<'src, 'tok>(src: &'src str, tokens: &'tok mut Vec<Token>) -> Lexer<'src, 'tok> {
        Lexer {
            src,
            cursor: Position::INITIAL,
            current_lo: Position::INITIAL,
            tokens,
        }
    }

    /// Starts a new token "mark" and advances.
    fn mark_advance(&mut self) -> Option<char> {
        self.current_lo = self.cursor;
        self.advance()
    }

    /// Returns the next character and advances the cursor, keeping line and
    /// column in sync.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        let len = c.len_utf8();
        self.cursor.offset += len;
        if c == '\n' {
            self.cursor.line += 1;
            self.cursor.column = 0;
        } else {
            // Columns count bytes, like offsets do.
            self.cursor.column += u32::try_from(len).unwrap_or(u32::MAX);
        }
        Some(c)
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next character without advancing.
    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Returns the `n`-th upcoming character; `peek_nth(0)` is `peek()`.
    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn rest(&self) -> &str {
        &self.src[self.cursor.offset..]
    }

    /// Returns the current location.
    fn location(&self) -> Location {
        Location::new(self.current_lo, self.cursor)
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &str {
        self.location().substr(self.src)
    }

    /// Produces a token using the marked bounds.
    fn produce(&mut self, kind: TokenKind) {
        let token = Token::new(kind, self.substr(), self.location());
        self.tokens.push(token);
    }

    fn unexpected(&self) -> Error {
        Error::UnexpectedToken {
            position: self.current_lo,
        }
    }
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '-')
}

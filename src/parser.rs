use crate::{
    ast::{Array, Entry, Env, Expr, File, Ident, Import, Kv, Literal, Object, Spread, Var},
    cursor::TokenCursor,
    token::{KindList, Location, Token, TokenKind},
};

type Result<T, E = Error> = std::result::Result<T, E>;

/// Token kinds which may start an expression.
const EXPRESSION_START: &[TokenKind] = &[
    TokenKind::Ident,
    TokenKind::LBrace,
    TokenKind::LBracket,
    TokenKind::Dollar,
    TokenKind::String,
    TokenKind::Int,
    TokenKind::Float,
    TokenKind::Bool,
];

/// Parses a whole file from the provided cursor. The cursor must hold every
/// token of the file; tokens left after the root object are an error.
pub fn parse(cursor: &mut TokenCursor) -> Result<File> {
    let mut p = Parser { cursor };
    p.parse_file().map_err(Error::harden)
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The production being tried does not apply here. Used to drive
    /// backtracking and never returned by [`parse`].
    #[error("{}: token mismatch, expected one of {}", .location.start, KindList(.expected))]
    TokenMismatch {
        expected: Box<[TokenKind]>,
        /// `None` if the input ended.
        actual: Option<TokenKind>,
        location: Location,
    },
    #[error("{}: expected one of {}, but got {actual}", .location.start, KindList(.expected))]
    UnexpectedToken {
        expected: Box<[TokenKind]>,
        actual: TokenKind,
        location: Location,
    },
    #[error("expected one of {}, but the input ended", KindList(.expected))]
    TokenNotExist { expected: Box<[TokenKind]> },
    #[error("{}: expected {name}", .location.start)]
    ExpectedNode {
        name: &'static str,
        location: Location,
    },
    #[error("{}: unexpected {actual} after the root object", .location.start)]
    TrailingToken {
        actual: TokenKind,
        location: Location,
    },
    #[error("{}: spread is only allowed as an object entry or an array element", .location.start)]
    MisplacedSpread { location: Location },
    #[error("{}: integer {lexeme} is out of bounds", .location.start)]
    InvalidInt { lexeme: Box<str>, location: Location },
    #[error("{}: float {lexeme} is out of bounds", .location.start)]
    InvalidFloat { lexeme: Box<str>, location: Location },
}

impl Error {
    pub fn is_mismatch(&self) -> bool {
        matches!(self, Error::TokenMismatch { .. })
    }

    /// Turns a soft mismatch into the hard error it means once no alternative
    /// is left to try.
    fn harden(self) -> Error {
        match self {
            Error::TokenMismatch {
                expected,
                actual: Some(actual),
                location,
            } => Error::UnexpectedToken {
                expected,
                actual,
                location,
            },
            Error::TokenMismatch {
                expected,
                actual: None,
                ..
            } => Error::TokenNotExist { expected },
            other => other,
        }
    }
}

struct Parser<'c> {
    cursor: &'c mut TokenCursor,
}

impl Parser<'_> {
    fn parse_file(&mut self) -> Result<File> {
        let imports = self.parse_imports()?;
        let object = self.parse_object()?;
        if let Some(token) = self.cursor.get() {
            return Err(Error::TrailingToken {
                actual: token.kind,
                location: token.location,
            });
        }
        Ok(File { imports, object })
    }

    fn parse_imports(&mut self) -> Result<Vec<Import>> {
        let mut imports = Vec::new();
        while self.is(TokenKind::Ident) {
            imports.push(self.parse_import()?);
        }
        Ok(imports)
    }

    fn parse_import(&mut self) -> Result<Import> {
        let name = self.parse_ident()?;
        let path = self.consume(TokenKind::Path)?;
        Ok(Import {
            name,
            path: Literal {
                value: path.lexeme,
                location: path.location,
            },
        })
    }

    fn parse_object(&mut self) -> Result<Object> {
        let open = self.consume(TokenKind::LBrace)?;
        let mut entries = Vec::new();
        while !self.is(TokenKind::RBrace) {
            if self.cursor.is_empty() {
                return Err(Error::TokenNotExist {
                    expected: Box::from([TokenKind::Ident, TokenKind::RBrace]),
                });
            }
            entries.push(self.parse_entry()?);
        }
        let close = self.consume(TokenKind::RBrace)?;
        Ok(Object {
            entries,
            location: open.location.to(close.location),
        })
    }

    /// Both entry forms start with an identifier, so the key-value form is
    /// tried first and the spread form after backtracking.
    fn parse_entry(&mut self) -> Result<Entry> {
        match self.attempt(Parser::parse_kv) {
            Ok(kv) => return Ok(Entry::Kv(kv)),
            Err(e) if e.is_mismatch() => (),
            Err(e) => return Err(e),
        }
        self.attempt(Parser::parse_spread)
            .map(Entry::Spread)
            .map_err(Error::harden)
    }

    fn parse_kv(&mut self) -> Result<Kv> {
        self.check(&[TokenKind::Ident])?;
        let key = self.parse_ident()?;
        self.check(&[TokenKind::Colon])?;
        let colon = self.advance();

        let value = self.parse_expr().map_err(|e| match e {
            Error::TokenMismatch { .. } => Error::ExpectedNode {
                name: "expression",
                location: colon.location,
            },
            other => other,
        })?;
        if let Expr::Spread(spread) = &value {
            return Err(Error::MisplacedSpread {
                location: spread.location,
            });
        }
        Ok(Kv { key, value })
    }

    fn parse_spread(&mut self) -> Result<Spread> {
        let var = self.parse_var()?;
        if !self.is(TokenKind::Spread) {
            return Err(self.mismatch(&[TokenKind::Spread]));
        }
        let dots = self.advance();
        Ok(Spread {
            location: var.location().to(dots.location),
            var,
        })
    }

    fn parse_var(&mut self) -> Result<Var> {
        self.check(&[TokenKind::Ident])?;
        let mut path = vec![self.parse_ident()?];
        while self.is(TokenKind::Dot) {
            let next = self.attempt(|p| {
                p.advance();
                p.check(&[TokenKind::Ident])?;
                p.parse_ident()
            });
            match next {
                Ok(ident) => path.push(ident),
                // The dot belongs to something else; leave it in place.
                Err(e) if e.is_mismatch() => break,
                Err(e) => return Err(e),
            }
        }
        Ok(Var { path })
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.require(EXPRESSION_START)?;
        match self.cursor.peek().kind {
            TokenKind::Ident => match self.attempt(Parser::parse_spread) {
                Ok(spread) => Ok(Expr::Spread(spread)),
                Err(e) if e.is_mismatch() => self.parse_var().map(Expr::Var),
                Err(e) => Err(e),
            },
            TokenKind::Dollar => self.parse_env().map(Expr::Env),
            TokenKind::LBrace => self.parse_object().map(Expr::Object),
            TokenKind::LBracket => self.parse_array().map(Expr::Array),
            TokenKind::String => {
                let token = self.advance();
                let raw = &token.lexeme[1..token.lexeme.len() - 1];
                Ok(Expr::String(Literal {
                    value: unescape(raw),
                    location: token.location,
                }))
            }
            TokenKind::Int => {
                let token = self.advance();
                let Ok(value) = token.lexeme.parse() else {
                    return Err(Error::InvalidInt {
                        lexeme: token.lexeme,
                        location: token.location,
                    });
                };
                Ok(Expr::Int(Literal {
                    value,
                    location: token.location,
                }))
            }
            TokenKind::Float => {
                let token = self.advance();
                let value = match token.lexeme.parse::<f64>() {
                    Ok(value) if value.is_finite() => value,
                    _ => {
                        return Err(Error::InvalidFloat {
                            lexeme: token.lexeme,
                            location: token.location,
                        })
                    }
                };
                Ok(Expr::Float(Literal {
                    value,
                    location: token.location,
                }))
            }
            TokenKind::Bool => {
                let token = self.advance();
                Ok(Expr::Bool(Literal {
                    value: &*token.lexeme == "true",
                    location: token.location,
                }))
            }
            _ => unreachable!("checked by require"),
        }
    }

    fn parse_env(&mut self) -> Result<Env> {
        let dollar = self.consume(TokenKind::Dollar)?;
        let name = self.parse_ident()?;
        Ok(Env {
            location: dollar.location.to(name.location),
            name,
        })
    }

    fn parse_array(&mut self) -> Result<Array> {
        let open = self.consume(TokenKind::LBracket)?;
        let mut elements = Vec::new();
        while !self.is(TokenKind::RBracket) {
            if self.cursor.is_empty() {
                let mut expected = EXPRESSION_START.to_vec();
                expected.push(TokenKind::RBracket);
                return Err(Error::TokenNotExist {
                    expected: expected.into_boxed_slice(),
                });
            }
            let location = self.cursor.peek().location;
            let element = self.parse_expr().map_err(|e| match e {
                Error::TokenMismatch { .. } => Error::ExpectedNode {
                    name: "expression",
                    location,
                },
                other => other,
            })?;
            elements.push(element);
        }
        let close = self.consume(TokenKind::RBracket)?;
        Ok(Array {
            elements,
            location: open.location.to(close.location),
        })
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.consume(TokenKind::Ident)?;
        Ok(Ident {
            name: token.lexeme,
            location: token.location,
        })
    }
}

impl Parser<'_> {
    /// Runs `f` from a save point. If `f` reports a mismatch, the cursor goes
    /// back to where it was before the call.
    fn attempt<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.cursor.save();
        let result = f(self);
        match result {
            Err(Error::TokenMismatch { .. }) => self.cursor.restore(),
            _ => self.cursor.drop_save(),
        }
        result
    }

    /// Checks whether the current token is of the given kind. False if the
    /// input ended.
    fn is(&self, kind: TokenKind) -> bool {
        self.cursor.get().is_some_and(|t| t.kind == kind)
    }

    /// Returns the current token and advances.
    fn advance(&mut self) -> Token {
        let token = self.cursor.peek().clone();
        self.cursor.advance();
        token
    }

    /// Soft check: a mismatch means the production does not apply.
    fn check(&self, expected: &[TokenKind]) -> Result<()> {
        match self.cursor.get() {
            None => Err(Error::TokenNotExist {
                expected: Box::from(expected),
            }),
            Some(t) if expected.contains(&t.kind) => Ok(()),
            Some(_) => Err(self.mismatch(expected)),
        }
    }

    /// Hard check: the production applies, so the token must be there.
    fn require(&self, expected: &[TokenKind]) -> Result<()> {
        match self.cursor.get() {
            None => Err(Error::TokenNotExist {
                expected: Box::from(expected),
            }),
            Some(t) if expected.contains(&t.kind) => Ok(()),
            Some(t) => Err(Error::UnexpectedToken {
                expected: Box::from(expected),
                actual: t.kind,
                location: t.location,
            }),
        }
    }

    /// Requires the current token to be of the given kind and advances.
    fn consume(&mut self, expected: TokenKind) -> Result<Token> {
        self.require(&[expected])?;
        Ok(self.advance())
    }

    fn mismatch(&self, expected: &[TokenKind]) -> Error {
        let (actual, location) = match self.cursor.get() {
            Some(t) => (Some(t.kind), t.location),
            None => {
                let end = self
                    .cursor
                    .previous()
                    .map(|t| Location::new(t.location.end, t.location.end))
                    .unwrap_or_default();
                (None, end)
            }
        };
        Error::TokenMismatch {
            expected: Box::from(expected),
            actual,
            location,
        }
    }
}

/// Resolves `\"` and `\\`. Any other backslash is kept verbatim.
fn unescape(raw: &str) -> Box<str> {
    if !raw.contains('\\') {
        return Box::from(raw);
    }
    let mut buf = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            buf.push(c);
            continue;
        }
        match chars.next() {
            Some(escaped @ ('"' | '\\')) => buf.push(escaped),
            Some(other) => {
                buf.push('\\');
                buf.push(other);
            }
            None => buf.push('\\'),
        }
    }
    buf.into_boxed_str()
}

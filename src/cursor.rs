use crate::token::Token;

/// A positional cursor over a token sequence.
///
/// Save points form a stack, so nested productions can each backtrack to
/// where they started.
pub struct TokenCursor {
    tokens: Vec<Token>,
    position: usize,
    saved: Vec<usize>,
}

impl TokenCursor {
    pub fn new(tokens: Vec<Token>) -> TokenCursor {
        TokenCursor {
            tokens,
            position: 0,
            saved: Vec::with_capacity(8),
        }
    }

    /// Returns whether all tokens were consumed.
    pub fn is_empty(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Returns the current token. Callers must check [`TokenCursor::is_empty`]
    /// first.
    pub fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    /// Returns the current token, if any.
    pub fn get(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    /// Moves to the next token.
    pub fn advance(&mut self) {
        assert!(!self.is_empty(), "advanced past the last token");
        self.position += 1;
    }

    /// Pushes the current position onto the save stack.
    pub fn save(&mut self) {
        self.saved.push(self.position);
    }

    /// Pops the last save point without moving.
    pub fn drop_save(&mut self) {
        self.saved.pop().expect("no save point to drop");
    }

    /// Pops the last save point and moves back to it.
    pub fn restore(&mut self) {
        self.position = self.saved.pop().expect("no save point to restore");
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the previously consumed token, if any.
    pub fn previous(&self) -> Option<&Token> {
        self.position
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
    }
}

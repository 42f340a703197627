use crate::diagnostic::Diagnostic;
use crate::span::{Span, Spanned};

/// Tokens of the `.kir` s-expression format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Token {
    LParen,
    RParen,
    /// Any run of characters other than whitespace, parentheses and `;`.
    Atom(String),
    Eof,
}

impl Token {
    pub(crate) fn description(&self) -> String {
        match self {
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Atom(text) => format!("'{}'", text),
            Token::Eof => "end of file".to_string(),
        }
    }
}

pub(crate) struct Lexer<'src> {
    source: &'src [u8],
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    pub(crate) fn new(source: &'src str) -> Self {
        Self {
            source: source.as_bytes(),
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn tokenize(mut self) -> (Vec<Spanned<Token>>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = tok.node == Token::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    fn next_token(&mut self) -> Spanned<Token> {
        loop {
            self.skip_whitespace_and_comments();

            if self.pos >= self.source.len() {
                return self.make_token(Token::Eof, self.pos, self.pos);
            }

            let start = self.pos;
            match self.source[self.pos] {
                b'(' => {
                    self.pos += 1;
                    return self.make_token(Token::LParen, start, self.pos);
                }
                b')' => {
                    self.pos += 1;
                    return self.make_token(Token::RParen, start, self.pos);
                }
                ch if ch.is_ascii_control() => {
                    self.pos += 1;
                    self.diagnostics.push(Diagnostic::error(
                        format!("unexpected control character 0x{:02x}", ch),
                        Span::new(start as u32, self.pos as u32),
                    ));
                    // Skip it and lex the next token.
                }
                _ => return self.scan_atom(),
            }
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.source.len() && self.source[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            if self.pos < self.source.len() && self.source[self.pos] == b';' {
                while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }
            break;
        }
    }

    fn scan_atom(&mut self) -> Spanned<Token> {
        let start = self.pos;
        while self.pos < self.source.len() && is_atom_byte(self.source[self.pos]) {
            self.pos += 1;
        }
        // Atom boundaries are ASCII, so the slice is valid UTF-8.
        let text = String::from_utf8_lossy(&self.source[start..self.pos]).into_owned();
        self.make_token(Token::Atom(text), start, self.pos)
    }

    fn make_token(&self, token: Token, start: usize, end: usize) -> Spanned<Token> {
        Spanned::new(token, Span::new(start as u32, end as u32))
    }
}

fn is_atom_byte(ch: u8) -> bool {
    !(ch.is_ascii_whitespace() || ch.is_ascii_control() || matches!(ch, b'(' | b')' | b';'))
}

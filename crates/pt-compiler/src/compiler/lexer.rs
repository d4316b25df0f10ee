//! Lexer for PT source files.

use crate::compiler::tokens::{keyword_or_ident, Span, Token, TokenKind};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexError {
    #[error("unexpected character '{ch}' at line {line}, col {col}")]
    UnexpectedChar { ch: char, line: usize, col: usize },
    #[error("unterminated block comment starting at line {line}, col {col}")]
    UnterminatedComment { line: usize, col: usize },
    #[error("invalid number at line {line}, col {col}")]
    InvalidNumber { line: usize, col: usize },
}

/// One pushed source file. The lexer keeps a stack of these so a driver can
/// compose multiple files (`spec.md` §4.1) even though imports are not
/// linked by this core.
struct Source {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    byte_offset: usize,
}

impl Source {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            byte_offset: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        self.byte_offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }
}

pub struct Lexer {
    stack: Vec<Source>,
    errors: Vec<LexError>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            stack: vec![Source::new(source)],
            errors: Vec::new(),
        }
    }

    /// Pushes an additional source onto the stack; tokens from it are
    /// consumed before the lexer returns to the source beneath it.
    pub fn push_source(&mut self, source: &str) {
        self.stack.push(Source::new(source));
    }

    pub fn errors(&self) -> &[LexError] {
        &self.errors
    }

    /// Scans the whole stack and returns the token stream, terminated by a
    /// single `Eof`. Never fails: unrecognized bytes become
    /// `TokenKind::Invalid` tokens so downstream passes stay total.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<LexError>) {
        let mut tokens = Vec::new();
        loop {
            match self.next_token() {
                Some(tok) => {
                    let is_eof = matches!(tok.kind, TokenKind::Eof);
                    tokens.push(tok);
                    if is_eof && self.stack.len() <= 1 {
                        break;
                    }
                }
                None => break,
            }
        }
        (tokens, self.errors)
    }

    fn span_at(&self, start_pos: (usize, usize, usize), end: (usize, usize, usize)) -> Span {
        let (start_off, start_line, start_col) = start_pos;
        let (end_off, end_line, end_col) = end;
        Span::new(start_off, end_off, start_line, start_col, end_line, end_col)
    }

    fn skip_trivia(&mut self) {
        loop {
            let src = match self.stack.last_mut() {
                Some(s) => s,
                None => return,
            };
            match src.current() {
                Some(c) if c.is_whitespace() => {
                    src.advance();
                }
                Some('/') if src.peek_at(1) == Some('/') => {
                    while let Some(c) = src.current() {
                        if c == '\n' {
                            break;
                        }
                        src.advance();
                    }
                }
                Some('/') if src.peek_at(1) == Some('*') => {
                    let start_line = src.line;
                    let start_col = src.col;
                    src.advance();
                    src.advance();
                    let mut closed = false;
                    while !src.at_end() {
                        if src.current() == Some('*') && src.peek_at(1) == Some('/') {
                            src.advance();
                            src.advance();
                            closed = true;
                            break;
                        }
                        src.advance();
                    }
                    if !closed {
                        self.errors.push(LexError::UnterminatedComment {
                            line: start_line,
                            col: start_col,
                        });
                    }
                }
                _ => return,
            }
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_trivia();

        if self.stack.last().map(|s| s.at_end()).unwrap_or(true) {
            // Pop exhausted pushed sources, but always report Eof at the
            // bottom of the stack so `tokenize` can terminate.
            if self.stack.len() > 1 {
                let src = self.stack.last().unwrap();
                let span = Span::new(src.byte_offset, src.byte_offset, src.line, src.col, src.line, src.col);
                self.stack.pop();
                return Some(Token::new(TokenKind::Eof, span));
            }
            let src = self.stack.last()?;
            let span = Span::new(src.byte_offset, src.byte_offset, src.line, src.col, src.line, src.col);
            return Some(Token::new(TokenKind::Eof, span));
        }

        let src = self.stack.last_mut()?;
        let start = (src.byte_offset, src.line, src.col);
        let ch = src.current()?;

        let kind = if ch.is_ascii_digit() {
            self.scan_number(start)
        } else if ch == '_' || ch.is_alphabetic() {
            self.scan_ident()
        } else {
            self.scan_punct(ch)
        };

        let src = self.stack.last().unwrap();
        let end = (src.byte_offset, src.line, src.col);
        Some(Token::new(kind, self.span_at(start, end)))
    }

    fn scan_ident(&mut self) -> TokenKind {
        let src = self.stack.last_mut().unwrap();
        let mut ident = String::new();
        while let Some(c) = src.current() {
            if c == '_' || c.is_alphanumeric() {
                ident.push(c);
                src.advance();
            } else {
                break;
            }
        }
        keyword_or_ident(ident)
    }

    fn scan_number(&mut self, start: (usize, usize, usize)) -> TokenKind {
        let src = self.stack.last_mut().unwrap();
        let mut text = String::new();
        while let Some(c) = src.current() {
            if c.is_ascii_digit() {
                text.push(c);
                src.advance();
            } else {
                break;
            }
        }

        let mut is_float = false;
        if src.current() == Some('.') && src.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false) {
            is_float = true;
            text.push('.');
            src.advance();
            while let Some(c) = src.current() {
                if c.is_ascii_digit() {
                    text.push(c);
                    src.advance();
                } else {
                    break;
                }
            }
        } else if src.current() == Some('.') {
            // `N.` with no trailing digits is still a valid float literal.
            is_float = true;
            text.push('.');
            src.advance();
        }

        if matches!(src.current(), Some('e') | Some('E')) {
            let mut lookahead = 1;
            if matches!(src.peek_at(lookahead), Some('+') | Some('-')) {
                lookahead += 1;
            }
            if src.peek_at(lookahead).map(|c| c.is_ascii_digit()).unwrap_or(false) {
                is_float = true;
                text.push(src.current().unwrap());
                src.advance();
                if matches!(src.current(), Some('+') | Some('-')) {
                    text.push(src.current().unwrap());
                    src.advance();
                }
                while let Some(c) = src.current() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        src.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        if is_float {
            match text.parse::<f64>() {
                Ok(v) => TokenKind::FloatLit(v),
                Err(_) => {
                    self.errors.push(LexError::InvalidNumber {
                        line: start.1,
                        col: start.2,
                    });
                    TokenKind::FloatLit(0.0)
                }
            }
        } else {
            match text.parse::<u64>() {
                Ok(v) => TokenKind::IntLit(v),
                Err(_) => {
                    self.errors.push(LexError::InvalidNumber {
                        line: start.1,
                        col: start.2,
                    });
                    TokenKind::IntLit(0)
                }
            }
        }
    }

    fn scan_punct(&mut self, ch: char) -> TokenKind {
        let src = self.stack.last_mut().unwrap();
        let line = src.line;
        let col = src.col;
        src.advance();
        match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            '=' => TokenKind::Assign,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '!' => TokenKind::Bang,
            '~' => TokenKind::Tilde,
            other => {
                self.errors.push(LexError::UnexpectedChar {
                    ch: other,
                    line,
                    col,
                });
                TokenKind::Invalid(other)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (tokens, errors) = Lexer::new(src).tokenize();
        assert!(errors.is_empty(), "unexpected lex errors: {errors:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_keywords_and_punctuation() {
        let k = kinds("uniform float g = 2.0;");
        assert_eq!(
            k,
            vec![
                TokenKind::Uniform,
                TokenKind::Float,
                TokenKind::Ident("g".into()),
                TokenKind::Assign,
                TokenKind::FloatLit(2.0),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn scans_int_and_float_literals() {
        let k = kinds("42 3.14 1e3 2.5e-2");
        assert_eq!(
            k,
            vec![
                TokenKind::IntLit(42),
                TokenKind::FloatLit(3.14),
                TokenKind::FloatLit(1e3),
                TokenKind::FloatLit(2.5e-2),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn skips_line_and_block_comments() {
        let k = kinds("// hello\nint x; /* block\ncomment */ int y;");
        assert_eq!(
            k,
            vec![
                TokenKind::Int,
                TokenKind::Ident("x".into()),
                TokenKind::Semicolon,
                TokenKind::Int,
                TokenKind::Ident("y".into()),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn reports_invalid_char_without_crashing() {
        let (tokens, errors) = Lexer::new("int x = 1 $ 2;").tokenize();
        assert!(!errors.is_empty());
        assert!(tokens
            .iter()
            .any(|t| matches!(t.kind, TokenKind::Invalid('$'))));
    }

    #[test]
    fn line_and_column_reset_on_newline() {
        let (tokens, _) = Lexer::new("int\nx;").tokenize();
        let x = tokens
            .iter()
            .find(|t| matches!(&t.kind, TokenKind::Ident(s) if s == "x"))
            .unwrap();
        assert_eq!(x.span.first_line, 2);
        assert_eq!(x.span.first_col, 1);
    }
}

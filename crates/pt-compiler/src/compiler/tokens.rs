use std::fmt;

/// Source location: 1-based inclusive line/column pair, plus byte offsets
/// for diagnostics that need to slice the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub first_line: usize,
    pub first_col: usize,
    pub last_line: usize,
    pub last_col: usize,
}

impl Span {
    pub fn new(
        start: usize,
        end: usize,
        first_line: usize,
        first_col: usize,
        last_line: usize,
        last_col: usize,
    ) -> Self {
        Self {
            start,
            end,
            first_line,
            first_col,
            last_line,
            last_col,
        }
    }

    pub fn dummy() -> Self {
        Self {
            start: 0,
            end: 0,
            first_line: 0,
            first_col: 0,
            last_line: 0,
            last_col: 0,
        }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        let (first_line, first_col) = if self.first_line < other.first_line
            || (self.first_line == other.first_line && self.first_col <= other.first_col)
        {
            (self.first_line, self.first_col)
        } else {
            (other.first_line, other.first_col)
        };
        let (last_line, last_col) = if self.last_line > other.last_line
            || (self.last_line == other.last_line && self.last_col >= other.last_col)
        {
            (self.last_line, self.last_col)
        } else {
            (other.last_line, other.last_col)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            first_line,
            first_col,
            last_line,
            last_col,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first_line == self.last_line {
            write!(f, "{}:{}", self.first_line, self.first_col)
        } else {
            write!(
                f,
                "{}:{} to {}:{}",
                self.first_line, self.first_col, self.last_line, self.last_col
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    IntLit(u64),
    FloatLit(f64),
    BoolLit(bool),
    Ident(String),

    // Keywords
    Module,
    Import,
    Export,
    Uniform,
    Varying,
    Void,
    Bool,
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Vec2i,
    Vec3i,
    Vec4i,
    Mat2,
    Mat3,
    Mat4,
    Break,
    Continue,
    Return,
    If,
    Else,
    For,
    While,
    True,
    False,
    Pi,
    Infinity,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Dot,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Tilde,

    Eof,
    /// An unrecognized byte; carried through as a token so the parser can
    /// turn it into a syntax diagnostic instead of the lexer aborting.
    Invalid(char),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::IntLit(n) => write!(f, "{n}"),
            TokenKind::FloatLit(n) => write!(f, "{n}"),
            TokenKind::BoolLit(b) => write!(f, "{b}"),
            TokenKind::Ident(s) => write!(f, "{s}"),
            TokenKind::Module => write!(f, "module"),
            TokenKind::Import => write!(f, "import"),
            TokenKind::Export => write!(f, "export"),
            TokenKind::Uniform => write!(f, "uniform"),
            TokenKind::Varying => write!(f, "varying"),
            TokenKind::Void => write!(f, "void"),
            TokenKind::Bool => write!(f, "bool"),
            TokenKind::Int => write!(f, "int"),
            TokenKind::Float => write!(f, "float"),
            TokenKind::Vec2 => write!(f, "vec2"),
            TokenKind::Vec3 => write!(f, "vec3"),
            TokenKind::Vec4 => write!(f, "vec4"),
            TokenKind::Vec2i => write!(f, "vec2i"),
            TokenKind::Vec3i => write!(f, "vec3i"),
            TokenKind::Vec4i => write!(f, "vec4i"),
            TokenKind::Mat2 => write!(f, "mat2"),
            TokenKind::Mat3 => write!(f, "mat3"),
            TokenKind::Mat4 => write!(f, "mat4"),
            TokenKind::Break => write!(f, "break"),
            TokenKind::Continue => write!(f, "continue"),
            TokenKind::Return => write!(f, "return"),
            TokenKind::If => write!(f, "if"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::For => write!(f, "for"),
            TokenKind::While => write!(f, "while"),
            TokenKind::True => write!(f, "true"),
            TokenKind::False => write!(f, "false"),
            TokenKind::Pi => write!(f, "pi"),
            TokenKind::Infinity => write!(f, "infinity"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Assign => write!(f, "="),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::Tilde => write!(f, "~"),
            TokenKind::Eof => write!(f, "end of file"),
            TokenKind::Invalid(c) => write!(f, "{c}"),
        }
    }
}

/// Maps a scanned identifier to a keyword token, or leaves it as `Ident`.
pub fn keyword_or_ident(ident: String) -> TokenKind {
    match ident.as_str() {
        "module" => TokenKind::Module,
        "import" => TokenKind::Import,
        "export" => TokenKind::Export,
        "uniform" => TokenKind::Uniform,
        "varying" => TokenKind::Varying,
        "void" => TokenKind::Void,
        "bool" => TokenKind::Bool,
        "int" => TokenKind::Int,
        "float" => TokenKind::Float,
        "vec2" => TokenKind::Vec2,
        "vec3" => TokenKind::Vec3,
        "vec4" => TokenKind::Vec4,
        "vec2i" => TokenKind::Vec2i,
        "vec3i" => TokenKind::Vec3i,
        "vec4i" => TokenKind::Vec4i,
        "mat2" => TokenKind::Mat2,
        "mat3" => TokenKind::Mat3,
        "mat4" => TokenKind::Mat4,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "return" => TokenKind::Return,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "for" => TokenKind::For,
        "while" => TokenKind::While,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "pi" => TokenKind::Pi,
        "infinity" => TokenKind::Infinity,
        _ => TokenKind::Ident(ident),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

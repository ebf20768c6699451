//! Lexer (tokenizer) for RuC source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! Identifiers are interned into the [`ReprTable`] as they are read, so the
//! parser compares names by handle. Keywords have English and Russian
//! spellings, both also accepted in upper case. `#` lines are skipped: the
//! preprocessor has already run by the time this lexer sees the text.

use crate::ast::{SourceLocation, Span};
use crate::tables::{ReprId, ReprTable};
use std::fmt;
use thiserror::Error;

/// Token kinds and their payloads
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    IntLiteral(i64),
    FloatLiteral(f64),
    CharLiteral(char),
    StringLiteral(String),

    Identifier(ReprId),

    // Keywords
    Int,
    Long,
    Char,
    Float,
    Double,
    Void,
    Struct,
    Enum,
    Typedef,
    If,
    Else,
    While,
    Do,
    For,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Goto,
    Null,
    Abs,
    Upb,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    // Comparison
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    AndAnd,
    OrOr,
    Bang,

    // Bitwise
    Amp,
    Pipe,
    Caret,
    Tilde,
    LtLt,
    GtGt,

    // Assignment
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    LtLtEq,
    GtGtEq,
    AmpEq,
    PipeEq,
    CaretEq,

    PlusPlus,
    MinusMinus,

    Dot,
    Arrow,

    Question,
    Colon,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,

    Eof,
}

/// One token with the source range it covers
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn location(&self) -> SourceLocation {
        self.span.start
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::IntLiteral(n) => return write!(f, "int literal {}", n),
            TokenKind::FloatLiteral(x) => return write!(f, "float literal {}", x),
            TokenKind::CharLiteral(c) => return write!(f, "char literal {:?}", c),
            TokenKind::StringLiteral(s) => return write!(f, "string literal {:?}", s),
            TokenKind::Identifier(_) => "identifier",
            TokenKind::Int => "'int'",
            TokenKind::Long => "'long'",
            TokenKind::Char => "'char'",
            TokenKind::Float => "'float'",
            TokenKind::Double => "'double'",
            TokenKind::Void => "'void'",
            TokenKind::Struct => "'struct'",
            TokenKind::Enum => "'enum'",
            TokenKind::Typedef => "'typedef'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::While => "'while'",
            TokenKind::Do => "'do'",
            TokenKind::For => "'for'",
            TokenKind::Switch => "'switch'",
            TokenKind::Case => "'case'",
            TokenKind::Default => "'default'",
            TokenKind::Break => "'break'",
            TokenKind::Continue => "'continue'",
            TokenKind::Return => "'return'",
            TokenKind::Goto => "'goto'",
            TokenKind::Null => "'NULL'",
            TokenKind::Abs => "'abs'",
            TokenKind::Upb => "'upb'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Le => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::Ge => "'>='",
            TokenKind::AndAnd => "'&&'",
            TokenKind::OrOr => "'||'",
            TokenKind::Bang => "'!'",
            TokenKind::Amp => "'&'",
            TokenKind::Pipe => "'|'",
            TokenKind::Caret => "'^'",
            TokenKind::Tilde => "'~'",
            TokenKind::LtLt => "'<<'",
            TokenKind::GtGt => "'>>'",
            TokenKind::Eq => "'='",
            TokenKind::PlusEq => "'+='",
            TokenKind::MinusEq => "'-='",
            TokenKind::StarEq => "'*='",
            TokenKind::SlashEq => "'/='",
            TokenKind::PercentEq => "'%='",
            TokenKind::LtLtEq => "'<<='",
            TokenKind::GtGtEq => "'>>='",
            TokenKind::AmpEq => "'&='",
            TokenKind::PipeEq => "'|='",
            TokenKind::CaretEq => "'^='",
            TokenKind::PlusPlus => "'++'",
            TokenKind::MinusMinus => "'--'",
            TokenKind::Dot => "'.'",
            TokenKind::Arrow => "'->'",
            TokenKind::Question => "'?'",
            TokenKind::Colon => "':'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Semicolon => "';'",
            TokenKind::Comma => "','",
            TokenKind::Eof => "end of file",
        };
        f.write_str(text)
    }
}

/// Malformed input the lexer cannot turn into a token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lexer error at line {}, column {}: {message}", location.line, location.column)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

/// Keyword for an identifier spelling, if any
fn keyword(spelling: &str) -> Option<TokenKind> {
    if spelling == "NULL" {
        return Some(TokenKind::Null);
    }
    let lowered;
    let spelling = if spelling.chars().any(char::is_lowercase) {
        spelling
    } else {
        lowered = spelling.to_lowercase();
        lowered.as_str()
    };

    let kind = match spelling {
        "int" | "цел" => TokenKind::Int,
        "long" | "длин" => TokenKind::Long,
        "char" | "литера" => TokenKind::Char,
        "float" | "вещ" => TokenKind::Float,
        "double" | "двойной" => TokenKind::Double,
        "void" | "пусто" => TokenKind::Void,
        "struct" | "структура" => TokenKind::Struct,
        "enum" | "перечень" => TokenKind::Enum,
        "typedef" | "опртипа" => TokenKind::Typedef,
        "if" | "если" => TokenKind::If,
        "else" | "иначе" => TokenKind::Else,
        "while" | "пока" => TokenKind::While,
        "do" | "цикл" => TokenKind::Do,
        "for" | "для" => TokenKind::For,
        "switch" | "выбор" => TokenKind::Switch,
        "case" | "случай" => TokenKind::Case,
        "default" | "умолчание" => TokenKind::Default,
        "break" | "выход" => TokenKind::Break,
        "continue" | "продолжить" => TokenKind::Continue,
        "return" | "возврат" => TokenKind::Return,
        "goto" | "переход" => TokenKind::Goto,
        "abs" | "абс" => TokenKind::Abs,
        "upb" | "кол_во" => TokenKind::Upb,
        _ => return None,
    };
    Some(kind)
}

/// Lexer for RuC source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input, interning identifiers into `reprs`.
    pub fn tokenize(&mut self, reprs: &mut ReprTable) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;

            if self.is_at_end() {
                let loc = self.current_location();
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    span: Span::new(loc, loc),
                });
                break;
            }

            if self.peek() == Some('#') {
                self.skip_line();
                continue;
            }

            let start = self.current_location();
            let kind = self.next_token(reprs)?;
            tokens.push(Token {
                kind,
                span: Span::new(start, self.current_location()),
            });
        }

        Ok(tokens)
    }

    fn next_token(&mut self, reprs: &mut ReprTable) -> Result<TokenKind, LexError> {
        let loc = self.current_location();
        let Some(ch) = self.advance() else {
            return Err(self.error("unexpected end of file", loc));
        };

        let kind = match ch {
            '"' => return self.string_literal(loc),
            '\'' => return self.char_literal(loc),
            '0'..='9' => return self.number_literal(ch, loc),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                return self.number_literal(ch, loc)
            }
            c if c.is_alphabetic() || c == '_' => return Ok(self.identifier_or_keyword(ch, reprs)),

            '+' => match self.peek() {
                Some('+') => self.take(TokenKind::PlusPlus),
                Some('=') => self.take(TokenKind::PlusEq),
                _ => TokenKind::Plus,
            },
            '-' => match self.peek() {
                Some('-') => self.take(TokenKind::MinusMinus),
                Some('=') => self.take(TokenKind::MinusEq),
                Some('>') => self.take(TokenKind::Arrow),
                _ => TokenKind::Minus,
            },
            '*' => self.with_eq(TokenKind::Star, TokenKind::StarEq),
            '/' => self.with_eq(TokenKind::Slash, TokenKind::SlashEq),
            '%' => self.with_eq(TokenKind::Percent, TokenKind::PercentEq),
            '=' => self.with_eq(TokenKind::Eq, TokenKind::EqEq),
            '!' => self.with_eq(TokenKind::Bang, TokenKind::NotEq),
            '^' => self.with_eq(TokenKind::Caret, TokenKind::CaretEq),
            '<' => match self.peek() {
                Some('=') => self.take(TokenKind::Le),
                Some('<') => {
                    self.advance();
                    self.with_eq(TokenKind::LtLt, TokenKind::LtLtEq)
                }
                _ => TokenKind::Lt,
            },
            '>' => match self.peek() {
                Some('=') => self.take(TokenKind::Ge),
                Some('>') => {
                    self.advance();
                    self.with_eq(TokenKind::GtGt, TokenKind::GtGtEq)
                }
                _ => TokenKind::Gt,
            },
            '&' => match self.peek() {
                Some('&') => self.take(TokenKind::AndAnd),
                Some('=') => self.take(TokenKind::AmpEq),
                _ => TokenKind::Amp,
            },
            '|' => match self.peek() {
                Some('|') => self.take(TokenKind::OrOr),
                Some('=') => self.take(TokenKind::PipeEq),
                _ => TokenKind::Pipe,
            },
            '~' => TokenKind::Tilde,
            '.' => TokenKind::Dot,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,

            _ => return Err(self.error(format!("unexpected character '{}'", ch), loc)),
        };
        Ok(kind)
    }

    /// Consumes the lookahead character and yields `kind`
    fn take(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// `plain`, or `with_eq` when an `=` follows
    fn with_eq(&mut self, plain: TokenKind, with_eq: TokenKind) -> TokenKind {
        if self.peek() == Some('=') {
            self.take(with_eq)
        } else {
            plain
        }
    }

    fn escape(&mut self) -> Result<char, LexError> {
        let loc = self.current_location();
        let Some(escaped) = self.advance() else {
            return Err(self.error("unexpected end of file in escape sequence", loc));
        };
        match escaped {
            'n' => Ok('\n'),
            't' => Ok('\t'),
            'r' => Ok('\r'),
            '0' => Ok('\0'),
            '\\' | '\'' | '"' => Ok(escaped),
            _ => Err(self.error(format!("unknown escape sequence \\{}", escaped), loc)),
        }
    }

    fn string_literal(&mut self, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let mut string = String::new();

        while let Some(ch) = self.advance() {
            match ch {
                '"' => return Ok(TokenKind::StringLiteral(string)),
                '\\' => string.push(self.escape()?),
                '\n' => break,
                _ => string.push(ch),
            }
        }

        Err(self.error("unterminated string literal", loc))
    }

    fn char_literal(&mut self, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let value = match self.advance() {
            Some('\\') => self.escape()?,
            Some('\'') | Some('\n') | None => {
                return Err(self.error("empty character literal", loc));
            }
            Some(ch) => ch,
        };

        if self.advance() != Some('\'') {
            return Err(self.error("expected closing quote in character literal", loc));
        }
        Ok(TokenKind::CharLiteral(value))
    }

    /// Decimal integer, or float with a fraction and/or an exponent
    fn number_literal(&mut self, first: char, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let mut text = String::new();
        text.push(first);
        let mut is_float = first == '.';

        self.digits(&mut text);
        if !is_float && self.peek() == Some('.') {
            is_float = true;
            text.push('.');
            self.advance();
            self.digits(&mut text);
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = self.peek_ahead(1);
            let exponent_digit = match sign {
                Some('+' | '-') => self.peek_ahead(2),
                other => other,
            };
            if exponent_digit.is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('e');
                self.advance();
                if let Some(sign @ ('+' | '-')) = sign {
                    text.push(sign);
                    self.advance();
                }
                self.digits(&mut text);
            }
        }

        if is_float {
            text.parse::<f64>()
                .map(TokenKind::FloatLiteral)
                .map_err(|_| self.error(format!("invalid float literal {}", text), loc))
        } else {
            text.parse::<i64>()
                .map(TokenKind::IntLiteral)
                .map_err(|_| self.error(format!("integer literal {} is too large", text), loc))
        }
    }

    fn digits(&mut self, text: &mut String) {
        while let Some(ch) = self.peek().filter(char::is_ascii_digit) {
            text.push(ch);
            self.advance();
        }
    }

    fn identifier_or_keyword(&mut self, first: char, reprs: &mut ReprTable) -> TokenKind {
        let mut ident = String::new();
        ident.push(first);

        while let Some(ch) = self.peek().filter(|&c| c.is_alphanumeric() || c == '_') {
            ident.push(ch);
            self.advance();
        }

        keyword(&ident).unwrap_or_else(|| TokenKind::Identifier(reprs.intern(&ident)))
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_ahead(1) == Some('/') => self.skip_line(),
                Some('/') if self.peek_ahead(1) == Some('*') => self.skip_block_comment()?,
                _ => break,
            }
        }
        Ok(())
    }

    /// Skips through the end of the line, used for `//` comments and `#` lines
    fn skip_line(&mut self) {
        while let Some(ch) = self.advance() {
            if ch == '\n' {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start = self.current_location();
        self.advance();
        self.advance();

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }

        Err(self.error("unterminated block comment", start))
    }

    fn error(&self, message: impl Into<String>, location: SourceLocation) -> LexError {
        LexError {
            message: message.into(),
            location,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

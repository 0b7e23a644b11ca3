use std::error::Error;
use std::fmt::{self, Display};

/// A tokenizer error: a message plus the character offset it occurred at.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizerError {
    pub message: String,
    pub pos: usize,
}

impl Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (at char {})", self.message, self.pos)
    }
}

impl Error for TokenizerError {}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    Splice(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64, bool), // value, is_integer
    String(String),
    TemplateString(Vec<TemplatePart>),
    Ident(String),
    True,
    False,
    Null,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Colon,
    Arrow, // =>
    Op(String),
    Eof,
}

/// Operates on a `Vec<char>` rather than raw bytes so multi-byte UTF-8
/// content inside string/template literals round-trips correctly.
pub struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
}

impl Tokenizer {
    pub fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    /// Tokenize the entire source eagerly into a flat token list. Small
    /// inputs (these are short formulas, not source files) make this
    /// simpler than a streaming lexer.
    pub fn tokenize(mut self) -> Result<Vec<(Token, usize)>, TokenizerError> {
        let mut out = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let Some(c) = self.peek() else {
                out.push((Token::Eof, start));
                break;
            };
            let tok = match c {
                '(' => {
                    self.pos += 1;
                    Token::LParen
                }
                ')' => {
                    self.pos += 1;
                    Token::RParen
                }
                '[' => {
                    self.pos += 1;
                    Token::LBracket
                }
                ']' => {
                    self.pos += 1;
                    Token::RBracket
                }
                '{' => {
                    self.pos += 1;
                    Token::LBrace
                }
                '}' => {
                    self.pos += 1;
                    Token::RBrace
                }
                ',' => {
                    self.pos += 1;
                    Token::Comma
                }
                '.' if !self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                    self.pos += 1;
                    Token::Dot
                }
                ':' => {
                    self.pos += 1;
                    Token::Colon
                }
                '\'' | '"' => self.read_string(c)?,
                '`' => self.read_template()?,
                '=' if self.peek_at(1) == Some('>') => {
                    self.pos += 2;
                    Token::Arrow
                }
                '=' if self.peek_at(1) == Some('=') => {
                    self.pos += 2;
                    Token::Op("==".into())
                }
                '!' if self.peek_at(1) == Some('=') => {
                    self.pos += 2;
                    Token::Op("!=".into())
                }
                '<' if self.peek_at(1) == Some('=') => {
                    self.pos += 2;
                    Token::Op("<=".into())
                }
                '>' if self.peek_at(1) == Some('=') => {
                    self.pos += 2;
                    Token::Op(">=".into())
                }
                '&' if self.peek_at(1) == Some('&') => {
                    self.pos += 2;
                    Token::Op("&&".into())
                }
                '|' if self.peek_at(1) == Some('|') => {
                    self.pos += 2;
                    Token::Op("||".into())
                }
                '+' | '-' | '*' | '/' | '%' | '^' | '<' | '>' | '!' | '&' => {
                    self.pos += 1;
                    Token::Op(c.to_string())
                }
                '0'..='9' => self.read_number(),
                c if c == '_' || c.is_alphabetic() => self.read_ident(),
                other => {
                    return Err(TokenizerError {
                        message: format!("unexpected character '{other}'"),
                        pos: start,
                    });
                }
            };
            out.push((tok, start));
        }
        Ok(out)
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let mut is_integer = true;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_integer = false;
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            is_integer = false;
            self.pos += 1;
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.pos += 1;
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        let n: f64 = text.parse().unwrap_or(f64::NAN);
        Token::Number(n, is_integer)
    }

    fn read_ident(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c == '_' || c.is_alphanumeric())
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        match text.as_str() {
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            _ => Token::Ident(text),
        }
    }

    fn read_string(&mut self, quote: char) -> Result<Token, TokenizerError> {
        let start = self.pos;
        self.pos += 1; // opening quote
        let mut s = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(TokenizerError {
                        message: "unterminated string literal".into(),
                        pos: start,
                    });
                }
                Some('\\') => match self.bump() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('\\') => s.push('\\'),
                    Some(c) if c == quote => s.push(c),
                    Some(c) => s.push(c),
                    None => {
                        return Err(TokenizerError {
                            message: "unterminated escape sequence".into(),
                            pos: start,
                        });
                    }
                },
                Some(c) if c == quote => break,
                Some(c) => s.push(c),
            }
        }
        Ok(Token::String(s))
    }

    /// Backtick strings with `${expr}` splices; `` \` `` and `` \${ ``
    /// escape sequences; newlines preserved.
    fn read_template(&mut self) -> Result<Token, TokenizerError> {
        let start = self.pos;
        self.pos += 1; // opening backtick
        let mut parts = Vec::new();
        let mut text = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(TokenizerError {
                        message: "unterminated template string".into(),
                        pos: start,
                    });
                }
                Some('`') => break,
                Some('\\') => match self.peek() {
                    Some('`') => {
                        text.push('`');
                        self.pos += 1;
                    }
                    Some('$') if self.peek_at(1) == Some('{') => {
                        text.push_str("${");
                        self.pos += 2;
                    }
                    Some('\\') => {
                        text.push('\\');
                        self.pos += 1;
                    }
                    Some(c) => {
                        text.push(c);
                        self.pos += 1;
                    }
                    None => {
                        return Err(TokenizerError {
                            message: "unterminated escape in template string".into(),
                            pos: start,
                        });
                    }
                },
                Some('$') if self.peek() == Some('{') => {
                    self.pos += 1; // consume '{'
                    if !text.is_empty() {
                        parts.push(TemplatePart::Text(std::mem::take(&mut text)));
                    }
                    let expr_start = self.pos;
                    let mut depth = 1usize;
                    while depth > 0 {
                        match self.bump() {
                            None => {
                                return Err(TokenizerError {
                                    message: "unterminated splice in template string".into(),
                                    pos: start,
                                });
                            }
                            Some('{') => depth += 1,
                            Some('}') => depth -= 1,
                            Some(_) => {}
                        }
                    }
                    let expr_src: String = self.chars[expr_start..self.pos - 1].iter().collect();
                    parts.push(TemplatePart::Splice(expr_src));
                }
                Some(c) => text.push(c),
            }
        }
        if !text.is_empty() || parts.is_empty() {
            parts.push(TemplatePart::Text(text));
        }
        Ok(Token::TemplateString(parts))
    }
}

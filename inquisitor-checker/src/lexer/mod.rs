use anyhow::{bail, Context, Result};

use crate::source::SourceFile;

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    fn new(kind: TokenKind, lexeme: String, line: usize, column: usize) -> Self {
        Self {
            kind,
            lexeme,
            line,
            column,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier,
    IntegerLiteral(i64),
    FloatLiteral(f64),
    ImaginaryLiteral(f64),
    StringLiteral(String),
    BytesLiteral(String),
    Keyword(Keyword),
    Newline,
    Indent,
    Dedent,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Ellipsis,
    Colon,
    ColonEqual,
    Semicolon,
    Equal,
    AugmentedAssign,
    DoubleEqual,
    BangEqual,
    Greater,
    GreaterEqual,
    GreaterGreater,
    Less,
    LessEqual,
    LessLess,
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    At,
    Pipe,
    Ampersand,
    Caret,
    Tilde,
    Arrow, // ->
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Def,
    Return,
    If,
    Elif,
    Else,
    Pass,
    And,
    Or,
    Not,
    In,
    Is,
    Lambda,
    For,
    While,
    Class,
    Try,
    Except,
    Finally,
    With,
    Import,
    From,
    Global,
    Nonlocal,
    Del,
    Assert,
    Raise,
    Break,
    Continue,
    Yield,
    Async,
    Await,
}

impl Keyword {
    /// Keywords that open statements the checker does not model.
    pub fn starts_unsupported_statement(self) -> bool {
        matches!(
            self,
            Keyword::For
                | Keyword::While
                | Keyword::Class
                | Keyword::Try
                | Keyword::Except
                | Keyword::Finally
                | Keyword::With
                | Keyword::Import
                | Keyword::From
                | Keyword::Global
                | Keyword::Nonlocal
                | Keyword::Del
                | Keyword::Assert
                | Keyword::Raise
                | Keyword::Break
                | Keyword::Continue
                | Keyword::Async
                | Keyword::Else
        )
    }
}

/// Operator spellings, longest first so that greedy matching works.
const OPERATORS: &[(&str, TokenKind)] = &[
    ("**=", TokenKind::AugmentedAssign),
    ("//=", TokenKind::AugmentedAssign),
    (">>=", TokenKind::AugmentedAssign),
    ("<<=", TokenKind::AugmentedAssign),
    ("...", TokenKind::Ellipsis),
    ("->", TokenKind::Arrow),
    (":=", TokenKind::ColonEqual),
    ("==", TokenKind::DoubleEqual),
    ("!=", TokenKind::BangEqual),
    (">=", TokenKind::GreaterEqual),
    ("<=", TokenKind::LessEqual),
    (">>", TokenKind::GreaterGreater),
    ("<<", TokenKind::LessLess),
    ("**", TokenKind::DoubleStar),
    ("//", TokenKind::DoubleSlash),
    ("+=", TokenKind::AugmentedAssign),
    ("-=", TokenKind::AugmentedAssign),
    ("*=", TokenKind::AugmentedAssign),
    ("/=", TokenKind::AugmentedAssign),
    ("%=", TokenKind::AugmentedAssign),
    ("@=", TokenKind::AugmentedAssign),
    ("&=", TokenKind::AugmentedAssign),
    ("|=", TokenKind::AugmentedAssign),
    ("^=", TokenKind::AugmentedAssign),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    (",", TokenKind::Comma),
    (".", TokenKind::Dot),
    (":", TokenKind::Colon),
    (";", TokenKind::Semicolon),
    ("=", TokenKind::Equal),
    (">", TokenKind::Greater),
    ("<", TokenKind::Less),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("@", TokenKind::At),
    ("|", TokenKind::Pipe),
    ("&", TokenKind::Ampersand),
    ("^", TokenKind::Caret),
    ("~", TokenKind::Tilde),
];

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    column: usize,
    indent_stack: Vec<usize>,
    bracket_depth: usize,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a SourceFile) -> Self {
        Self::from_str(&source.contents)
    }

    /// Lexes a fragment that is not backed by a file, such as a comment annotation.
    pub fn from_str(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            line: 1,
            column: 1,
            indent_stack: vec![0],
            bracket_depth: 0,
            at_line_start: true,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            if self.at_line_start {
                self.at_line_start = false;
                if self.bracket_depth == 0 && !self.lex_line_start(&mut tokens)? {
                    continue;
                }
            }

            let Some(ch) = self.peek_char() else {
                break;
            };

            match ch {
                ' ' | '\t' | '\x0c' => {
                    self.advance_char();
                }
                '\r' | '\n' => {
                    if self.bracket_depth > 0 {
                        self.advance_char();
                        continue;
                    }
                    tokens.push(self.make_newline_token());
                    self.advance_char();
                    self.at_line_start = true;
                }
                '#' => self.skip_comment(),
                '\\' => {
                    self.advance_char();
                    match self.peek_char() {
                        Some('\n') | Some('\r') => {
                            self.advance_char();
                        }
                        _ => bail!(
                            "Unexpected character after line continuation at line {}, column {}",
                            self.line,
                            self.column
                        ),
                    }
                }
                '"' | '\'' => {
                    let token = self.lex_string(self.position, self.line, self.column, "")?;
                    tokens.push(token);
                }
                '0'..='9' => {
                    let token = self.lex_number()?;
                    tokens.push(token);
                }
                '.' if matches!(self.peek_next_char(), Some('0'..='9')) => {
                    let token = self.lex_number()?;
                    tokens.push(token);
                }
                c if c.is_alphabetic() || c == '_' => {
                    let token = self.lex_identifier_or_keyword()?;
                    tokens.push(token);
                }
                other => {
                    let token = self.lex_operator().with_context(|| {
                        format!(
                            "Unexpected character '{}' at line {}, column {}",
                            other, self.line, self.column
                        )
                    })?;
                    match token.kind {
                        TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                            self.bracket_depth += 1;
                        }
                        TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                            self.bracket_depth = self.bracket_depth.saturating_sub(1);
                        }
                        _ => {}
                    }
                    tokens.push(token);
                }
            }
        }

        if !matches!(
            tokens.last().map(|token: &Token| &token.kind),
            None | Some(TokenKind::Newline) | Some(TokenKind::Dedent)
        ) {
            tokens.push(self.make_newline_token());
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            tokens.push(Token::new(
                TokenKind::Dedent,
                String::new(),
                self.line,
                self.column,
            ));
        }

        tokens.push(Token::new(
            TokenKind::Eof,
            String::new(),
            self.line,
            self.column,
        ));

        Ok(tokens)
    }

    /// Measures indentation at the start of a physical line. Returns `false` when the
    /// line was blank or comment-only and has been consumed entirely.
    fn lex_line_start(&mut self, tokens: &mut Vec<Token>) -> Result<bool> {
        let mut width = 0usize;
        while let Some(ch) = self.peek_char() {
            match ch {
                ' ' => width += 1,
                '\t' => width = (width / 8 + 1) * 8,
                '\x0c' => width = 0,
                _ => break,
            }
            self.advance_char();
        }

        match self.peek_char() {
            None => return Ok(true),
            Some('#') | Some('\n') | Some('\r') => {
                self.skip_comment();
                if self.peek_char().is_some() {
                    self.advance_char();
                }
                self.at_line_start = true;
                return Ok(false);
            }
            Some(_) => {}
        }

        let current = self.indent_stack.last().copied().unwrap_or(0);
        if width > current {
            self.indent_stack.push(width);
            tokens.push(Token::new(
                TokenKind::Indent,
                String::new(),
                self.line,
                self.column,
            ));
        } else if width < current {
            while self.indent_stack.last().copied().unwrap_or(0) > width {
                self.indent_stack.pop();
                tokens.push(Token::new(
                    TokenKind::Dedent,
                    String::new(),
                    self.line,
                    self.column,
                ));
            }
            if self.indent_stack.last().copied().unwrap_or(0) != width {
                bail!(
                    "Inconsistent dedent at line {}: indentation does not match any outer level",
                    self.line
                );
            }
        }
        Ok(true)
    }

    fn make_newline_token(&self) -> Token {
        Token::new(
            TokenKind::Newline,
            "\n".to_string(),
            self.line,
            self.column,
        )
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' || ch == '\r' {
                break;
            }
            self.advance_char();
        }
    }

    fn lex_string(
        &mut self,
        start: usize,
        start_line: usize,
        start_column: usize,
        prefix: &str,
    ) -> Result<Token> {
        let raw = prefix.contains('r');
        let bytes = prefix.contains('b');
        let quote = self
            .advance_char()
            .context("Expected quote to open string literal")?;
        let triple = self.peek_char() == Some(quote) && self.peek_next_char() == Some(quote);
        if triple {
            self.advance_char();
            self.advance_char();
        }

        let mut value = String::new();
        loop {
            let Some(ch) = self.peek_char() else {
                bail!(
                    "Unterminated string literal starting at line {}, column {}",
                    start_line,
                    start_column
                );
            };
            match ch {
                c if c == quote => {
                    if !triple {
                        self.advance_char();
                        break;
                    }
                    if self.remaining().starts_with(&quote.to_string().repeat(3)) {
                        self.advance_char();
                        self.advance_char();
                        self.advance_char();
                        break;
                    }
                    value.push(c);
                    self.advance_char();
                }
                '\n' | '\r' if !triple => {
                    bail!(
                        "Unterminated string literal starting at line {}, column {}",
                        start_line,
                        start_column
                    );
                }
                '\\' => {
                    self.advance_char();
                    let escaped = self
                        .advance_char()
                        .context("Unterminated escape sequence in string literal")?;
                    if raw {
                        value.push('\\');
                        value.push(escaped);
                        continue;
                    }
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '0' => value.push('\0'),
                        '\\' => value.push('\\'),
                        '\'' => value.push('\''),
                        '"' => value.push('"'),
                        '\n' | '\r' => {}
                        other => {
                            value.push('\\');
                            value.push(other);
                        }
                    }
                }
                other => {
                    value.push(other);
                    self.advance_char();
                }
            }
        }

        let lexeme = self.slice(start, self.position).to_string();
        let kind = if bytes {
            TokenKind::BytesLiteral(value)
        } else {
            TokenKind::StringLiteral(value)
        };
        Ok(Token::new(kind, lexeme, start_line, start_column))
    }

    fn lex_number(&mut self) -> Result<Token> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;

        if self.peek_char() == Some('0')
            && matches!(
                self.peek_next_char(),
                Some('x' | 'X' | 'o' | 'O' | 'b' | 'B')
            )
        {
            self.advance_char();
            let radix = match self.advance_char() {
                Some('x' | 'X') => 16,
                Some('o' | 'O') => 8,
                _ => 2,
            };
            while let Some(ch) = self.peek_char() {
                if ch.is_ascii_alphanumeric() || ch == '_' {
                    self.advance_char();
                } else {
                    break;
                }
            }
            let lexeme = self.slice(start, self.position).to_string();
            let digits = lexeme[2..].replace('_', "");
            let value = i64::from_str_radix(&digits, radix).with_context(|| {
                format!(
                    "Failed to parse integer literal '{}' at line {}, column {}",
                    lexeme, start_line, start_column
                )
            })?;
            return Ok(Token::new(
                TokenKind::IntegerLiteral(value),
                lexeme,
                start_line,
                start_column,
            ));
        }

        let mut is_float = false;
        while let Some(ch) = self.peek_char() {
            match ch {
                '0'..='9' | '_' => {
                    self.advance_char();
                }
                '.' if !is_float => {
                    is_float = true;
                    self.advance_char();
                }
                'e' | 'E' => {
                    let mut lookahead = self.remaining().chars().skip(1);
                    let next = lookahead.next();
                    let after_sign = lookahead.next();
                    let exponent_follows = match next {
                        Some('0'..='9') => true,
                        Some('+' | '-') => matches!(after_sign, Some('0'..='9')),
                        _ => false,
                    };
                    if !exponent_follows {
                        break;
                    }
                    is_float = true;
                    self.advance_char();
                    if matches!(self.peek_char(), Some('+' | '-')) {
                        self.advance_char();
                    }
                }
                _ => break,
            }
        }

        let lexeme = self.slice(start, self.position).replace('_', "");
        if matches!(self.peek_char(), Some('j' | 'J')) {
            self.advance_char();
            let value = lexeme.parse::<f64>().with_context(|| {
                format!(
                    "Failed to parse imaginary literal '{}' at line {}, column {}",
                    lexeme, start_line, start_column
                )
            })?;
            return Ok(Token::new(
                TokenKind::ImaginaryLiteral(value),
                self.slice(start, self.position).to_string(),
                start_line,
                start_column,
            ));
        }

        if is_float {
            let value = lexeme.parse::<f64>().with_context(|| {
                format!(
                    "Failed to parse float literal '{}' at line {}, column {}",
                    lexeme, start_line, start_column
                )
            })?;
            Ok(Token::new(
                TokenKind::FloatLiteral(value),
                self.slice(start, self.position).to_string(),
                start_line,
                start_column,
            ))
        } else {
            let value = lexeme.parse::<i64>().with_context(|| {
                format!(
                    "Failed to parse integer literal '{}' at line {}, column {}",
                    lexeme, start_line, start_column
                )
            })?;
            Ok(Token::new(
                TokenKind::IntegerLiteral(value),
                self.slice(start, self.position).to_string(),
                start_line,
                start_column,
            ))
        }
    }

    fn lex_identifier_or_keyword(&mut self) -> Result<Token> {
        let start = self.position;
        let start_line = self.line;
        let start_column = self.column;
        self.advance_char();

        while let Some(ch) = self.peek_char() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let lexeme = self.slice(start, self.position).to_string();
        if matches!(self.peek_char(), Some('"' | '\'')) && is_string_prefix(&lexeme) {
            let prefix = lexeme.to_ascii_lowercase();
            return self.lex_string(start, start_line, start_column, &prefix);
        }

        if let Some(keyword) = keyword_from_lexeme(&lexeme) {
            Ok(Token::new(
                TokenKind::Keyword(keyword),
                lexeme,
                start_line,
                start_column,
            ))
        } else {
            Ok(Token::new(
                TokenKind::Identifier,
                lexeme,
                start_line,
                start_column,
            ))
        }
    }

    fn lex_operator(&mut self) -> Result<Token> {
        let start_line = self.line;
        let start_column = self.column;
        let start = self.position;

        let (spelling, kind) = OPERATORS
            .iter()
            .find(|(spelling, _)| self.remaining().starts_with(spelling))
            .cloned()
            .context("no operator matches")?;

        for _ in 0..spelling.chars().count() {
            self.advance_char();
        }

        Ok(Token::new(
            kind,
            self.slice(start, self.position).to_string(),
            start_line,
            start_column,
        ))
    }

    fn remaining(&self) -> &str {
        &self.input[self.position..]
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.input[self.position..].chars();
        iter.next()?;
        iter.next()
    }

    fn advance_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += ch.len_utf8();
        if ch == '\r' || ch == '\n' {
            if ch == '\r' && self.peek_char() == Some('\n') {
                self.position += '\n'.len_utf8();
            }
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        &self.input[start..end]
    }
}

fn is_string_prefix(lexeme: &str) -> bool {
    matches!(
        lexeme.to_ascii_lowercase().as_str(),
        "r" | "b" | "f" | "u" | "rb" | "br" | "fr" | "rf"
    )
}

fn keyword_from_lexeme(lexeme: &str) -> Option<Keyword> {
    match lexeme {
        "def" => Some(Keyword::Def),
        "return" => Some(Keyword::Return),
        "if" => Some(Keyword::If),
        "elif" => Some(Keyword::Elif),
        "else" => Some(Keyword::Else),
        "pass" => Some(Keyword::Pass),
        "and" => Some(Keyword::And),
        "or" => Some(Keyword::Or),
        "not" => Some(Keyword::Not),
        "in" => Some(Keyword::In),
        "is" => Some(Keyword::Is),
        "lambda" => Some(Keyword::Lambda),
        "for" => Some(Keyword::For),
        "while" => Some(Keyword::While),
        "class" => Some(Keyword::Class),
        "try" => Some(Keyword::Try),
        "except" => Some(Keyword::Except),
        "finally" => Some(Keyword::Finally),
        "with" => Some(Keyword::With),
        "import" => Some(Keyword::Import),
        "from" => Some(Keyword::From),
        "global" => Some(Keyword::Global),
        "nonlocal" => Some(Keyword::Nonlocal),
        "del" => Some(Keyword::Del),
        "assert" => Some(Keyword::Assert),
        "raise" => Some(Keyword::Raise),
        "break" => Some(Keyword::Break),
        "continue" => Some(Keyword::Continue),
        "yield" => Some(Keyword::Yield),
        "async" => Some(Keyword::Async),
        "await" => Some(Keyword::Await),
        _ => None,
    }
}

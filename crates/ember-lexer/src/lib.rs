//! Lexer for EmberScript
//!
//! Turns a source buffer into a stream of [`Token`]s. The lexer is a single
//! forward-scanning pass: whitespace and comments are skipped between
//! tokens, and every recognized lexeme is classified by [`TokenKind`].
//!
//! Errors (unterminated strings, unknown characters, unknown escapes) are
//! not fatal to the lexer itself - they are reported as `TokenKind::Error`
//! tokens so that callers (the parser) can decide how to recover.

use std::fmt;

/// The classification of a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Operator,
    Keyword,
    Punctuation,
    Boolean,
    Null,
    Eof,
    Error,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Operator => "operator",
            TokenKind::Keyword => "keyword",
            TokenKind::Punctuation => "punctuation",
            TokenKind::Boolean => "boolean",
            TokenKind::Null => "null",
            TokenKind::Eof => "end of input",
            TokenKind::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// A lexeme together with its classification and source position.
///
/// `line` and `column` are 1-based, pointing at the first character of the
/// lexeme.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            line,
            column,
        }
    }
}

const KEYWORDS: &[&str] = &[
    "if", "else", "while", "for", "return", "break", "continue", "function", "var", "const",
    "let", "true", "false", "null",
];

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Scans a source buffer into tokens, one at a time.
///
/// The lexer owns its input as a `Vec<char>` rather than byte-indexing a
/// `&str` directly, since EmberScript source may contain multi-byte UTF-8
/// identifiers in string literals and we want column counts to track
/// characters, not bytes.
pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    /// Produces the next token from the source buffer.
    ///
    /// Returns a `TokenKind::Eof` token (never `None`) once the input is
    /// exhausted, so callers can always match on `token.kind`.
    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let (line, column) = (self.line, self.column);

        let Some(c) = self.peek() else {
            return Token::new(TokenKind::Eof, "", line, column);
        };

        if is_ident_start(c) {
            return self.scan_identifier(line, column);
        }
        if c.is_ascii_digit() {
            return self.scan_number(line, column);
        }
        if c == '"' {
            return self.scan_string(line, column);
        }
        if let Some(tok) = self.scan_operator_or_punctuation(line, column) {
            return tok;
        }

        self.advance();
        Token::new(
            TokenKind::Error,
            format!("unexpected character '{c}'"),
            line,
            column,
        )
    }

    /// Collects every token up to and including `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let done = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if done {
                break;
            }
        }
        tokens
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            None => break,
                            Some('*') if self.peek_at(1) == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            _ => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn scan_identifier(&mut self, line: usize, column: usize) -> Token {
        let mut lexeme = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                lexeme.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let kind = if lexeme == "true" || lexeme == "false" {
            TokenKind::Boolean
        } else if lexeme == "null" {
            TokenKind::Null
        } else if KEYWORDS.contains(&lexeme.as_str()) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };

        Token::new(kind, lexeme, line, column)
    }

    fn scan_number(&mut self, line: usize, column: usize) -> Token {
        let mut lexeme = String::new();
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                lexeme.push(c);
                self.advance();
            } else if c == '.' && !seen_dot && self.peek_at(1).is_some_and(|n| n.is_ascii_digit())
            {
                seen_dot = true;
                lexeme.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Token::new(TokenKind::Number, lexeme, line, column)
    }

    fn scan_string(&mut self, line: usize, column: usize) -> Token {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    return Token::new(
                        TokenKind::Error,
                        "unterminated string literal",
                        line,
                        column,
                    );
                }
                Some('"') => {
                    self.advance();
                    return Token::new(TokenKind::String, value, line, column);
                }
                Some('\\') => {
                    self.advance();
                    match self.peek() {
                        Some('n') => {
                            value.push('\n');
                            self.advance();
                        }
                        Some('t') => {
                            value.push('\t');
                            self.advance();
                        }
                        Some('\\') => {
                            value.push('\\');
                            self.advance();
                        }
                        Some('"') => {
                            value.push('"');
                            self.advance();
                        }
                        Some(other) => {
                            return Token::new(
                                TokenKind::Error,
                                format!("unknown escape sequence '\\{other}'"),
                                line,
                                column,
                            );
                        }
                        None => {
                            return Token::new(
                                TokenKind::Error,
                                "unterminated string literal",
                                line,
                                column,
                            );
                        }
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
    }

    fn scan_operator_or_punctuation(&mut self, line: usize, column: usize) -> Option<Token> {
        const TWO_CHAR: &[(&str, (char, char))] = &[
            ("==", ('=', '=')),
            ("!=", ('!', '=')),
            ("<=", ('<', '=')),
            (">=", ('>', '=')),
            ("&&", ('&', '&')),
            ("||", ('|', '|')),
        ];
        let c0 = self.peek()?;
        let c1 = self.peek_at(1);
        for (lexeme, (a, b)) in TWO_CHAR {
            if c0 == *a && c1 == Some(*b) {
                self.advance();
                self.advance();
                return Some(Token::new(TokenKind::Operator, *lexeme, line, column));
            }
        }

        const SINGLE_OPERATORS: &str = "+-*/%=<>!";
        const PUNCTUATION: &str = "(){}[],;.";

        if SINGLE_OPERATORS.contains(c0) {
            self.advance();
            return Some(Token::new(
                TokenKind::Operator,
                c0.to_string(),
                line,
                column,
            ));
        }
        if PUNCTUATION.contains(c0) {
            self.advance();
            return Some(Token::new(
                TokenKind::Punctuation,
                c0.to_string(),
                line,
                column,
            ));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn skips_whitespace_and_comments() {
        let toks = Lexer::new("  // a comment\n  /* block */ 42").tokenize();
        assert_eq!(toks[0].kind, TokenKind::Number);
        assert_eq!(toks[0].lexeme, "42");
    }

    #[test]
    fn classifies_keywords_booleans_and_null() {
        let toks = Lexer::new("if true null x").tokenize();
        assert_eq!(toks[0].kind, TokenKind::Keyword);
        assert_eq!(toks[1].kind, TokenKind::Boolean);
        assert_eq!(toks[2].kind, TokenKind::Null);
        assert_eq!(toks[3].kind, TokenKind::Identifier);
    }

    #[test]
    fn scans_number_with_single_decimal_point() {
        let toks = Lexer::new("3.14").tokenize();
        assert_eq!(toks[0].lexeme, "3.14");
    }

    #[test]
    fn scans_string_with_escapes() {
        let toks = Lexer::new(r#""a\nb\t\"c\\d""#).tokenize();
        assert_eq!(toks[0].kind, TokenKind::String);
        assert_eq!(toks[0].lexeme, "a\nb\t\"c\\d");
    }

    #[test]
    fn unterminated_string_is_error() {
        let toks = Lexer::new("\"abc").tokenize();
        assert_eq!(toks[0].kind, TokenKind::Error);
    }

    #[test]
    fn unknown_escape_is_error() {
        let toks = Lexer::new(r#""\q""#).tokenize();
        assert_eq!(toks[0].kind, TokenKind::Error);
    }

    #[test]
    fn prefers_multi_char_operators() {
        let toks = Lexer::new("== != <= >= && ||").tokenize();
        let lexemes: Vec<_> = toks.iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(&lexemes[..6], &["==", "!=", "<=", ">=", "&&", "||"]);
    }

    #[test]
    fn tracks_line_and_column() {
        let toks = Lexer::new("x\ny").tokenize();
        assert_eq!((toks[0].line, toks[0].column), (1, 1));
        assert_eq!((toks[1].line, toks[1].column), (2, 1));
    }

    #[test]
    fn terminates_with_eof() {
        assert_eq!(kinds("x").last(), Some(&TokenKind::Eof));
        assert_eq!(kinds("").last(), Some(&TokenKind::Eof));
    }
}

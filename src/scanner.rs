//! Streaming lexer.
//!
//! [`Scanner`] is an iterator of `Result<Token>`: it yields every token of
//! the source, reports a lexical error in place of the offending lexeme and
//! keeps going, and finishes with exactly one `EOF`. Lexemes borrow from the
//! source text.
//!
//! ```rust
//! use rox::scanner::Scanner;
//!
//! for result in Scanner::new("print 123; // example") {
//!     match result {
//!         Ok(token) => println!("{}", token),
//!         Err(err) => eprintln!("{}", err),
//!     }
//! }
//! ```

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// Reserved words, as a compile-time perfect hash.
static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

pub struct Scanner<'a> {
    text: &'a str,
    src: &'a [u8],

    /// First byte of the lexeme being scanned.
    start: usize,

    /// Next byte to examine.
    curr: usize,

    line: usize,
    line_start: usize,

    /// Where the current lexeme began; a string may end lines later.
    token_line: usize,
    token_column: usize,

    /// Kind of the lexeme just scanned, `None` for whitespace and comments.
    pending: Option<TokenType>,
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(text: &'a str) -> Self {
        info!("Scanner created over {} bytes", text.len());

        Self {
            text,
            src: text.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            line_start: 0,
            token_line: 1,
            token_column: 1,
            pending: None,
        }
    }

    #[inline(always)]
    const fn len(&self) -> usize {
        self.src.len()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Consume one byte. Only called when not at the end.
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Byte `ahead` positions past the cursor, `0` past the end.
    #[inline(always)]
    fn byte_at(&self, ahead: usize) -> u8 {
        self.src.get(self.curr + ahead).copied().unwrap_or(0)
    }

    #[inline(always)]
    fn peek(&self) -> u8 {
        self.byte_at(0)
    }

    /// `long` if the next byte is `second` (consuming it), else `short`.
    #[inline(always)]
    fn either(&mut self, second: u8, long: TokenType, short: TokenType) -> TokenType {
        if self.peek() == second {
            self.curr += 1;
            long
        } else {
            short
        }
    }

    #[inline(always)]
    fn newline(&mut self) {
        self.line += 1;
        self.line_start = self.curr;
    }

    /// Scan one lexeme starting at `self.start`, leaving its kind in
    /// `self.pending` (still `None` after whitespace or a comment).
    fn scan_token(&mut self) -> Result<()> {
        let tt = match self.advance() {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            b'!' => self.either(b'=', TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.either(b'=', TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.either(b'=', TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.either(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER),

            b' ' | b'\r' | b'\t' => return Ok(()),

            b'\n' => {
                self.newline();
                return Ok(());
            }

            b'/' if self.peek() == b'/' => {
                // stop on the newline so the next call counts it
                self.curr = match memchr(b'\n', &self.src[self.curr..]) {
                    Some(pos) => self.curr + pos,
                    None => self.len(),
                };
                return Ok(());
            }

            b'/' => TokenType::SLASH,

            b'"' => self.string()?,

            b'0'..=b'9' => self.number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            _ => {
                // Report the whole character, not a stray UTF‑8 lead byte.
                let ch = self.text[self.start..].chars().next().unwrap_or('\u{FFFD}');
                self.curr = self.start + ch.len_utf8();

                return Err(LoxError::lex(
                    self.token_line,
                    format!("Unexpected character: {}", ch),
                ));
            }
        };

        self.pending = Some(tt);
        Ok(())
    }

    /// Rest of a `"…"` literal; may span lines, has no escapes.
    fn string(&mut self) -> Result<TokenType> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.newline();
            }
        }

        if self.is_at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.curr += 1;

        // both quotes are ASCII, so this slice is on char boundaries
        let contents = &self.text[self.start + 1..self.curr - 1];
        Ok(TokenType::STRING(contents.to_owned()))
    }

    /// `123` or `3.14`. A trailing `.` is not part of the number.
    fn number(&mut self) -> TokenType {
        self.skip_digits();

        if self.peek() == b'.' && self.byte_at(1).is_ascii_digit() {
            self.curr += 1;
            self.skip_digits();
        }

        // only ASCII digits and one dot, so this never fails
        let value = self.text[self.start..self.curr].parse::<f64>().unwrap_or(0.0);
        TokenType::NUMBER(value)
    }

    fn skip_digits(&mut self) {
        while self.peek().is_ascii_digit() {
            self.curr += 1;
        }
    }

    fn identifier(&mut self) -> TokenType {
        while matches!(self.peek(), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.curr += 1;
        }

        KEYWORDS
            .get(&self.src[self.start..self.curr])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.curr <= self.len() {
            if self.curr == self.len() {
                // one past the end marks EOF as emitted
                self.curr += 1;
                let column = self.len() - self.line_start + 1;
                return Some(Ok(Token::new(TokenType::EOF, "", self.line, column)));
            }

            self.start = self.curr;
            self.token_line = self.line;
            self.token_column = self.start - self.line_start + 1;
            self.pending = None;

            if let Err(e) = self.scan_token() {
                debug!("Lexical error: {}", e);
                return Some(Err(e));
            }

            if let Some(tt) = self.pending.take() {
                let lexeme = &self.text[self.start..self.curr];
                return Some(Ok(Token::new(
                    tt,
                    lexeme,
                    self.token_line,
                    self.token_column,
                )));
            }
        }

        None
    }
}

impl<'a> FusedIterator for Scanner<'a> {}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::Rc;
use alloc::format;
use alloc::string::{String, ToString as _};
use alloc::vec;
use alloc::vec::Vec;
use core::cmp;
use core::fmt::{self, Debug, Formatter};
use core::iter::Peekable;
use core::str::CharIndices;

use anyhow::{anyhow, bail, Result};

#[derive(Clone)]
struct SourceInternal {
    pub file: String,
    pub contents: String,
    pub lines: Vec<(u32, u32)>,
}

/// A Jsonnet source file kept in memory.
///
/// Cloning a `Source` is cheap; all clones share the same underlying buffer.
#[derive(Clone)]
pub struct Source {
    src: Rc<SourceInternal>,
}

impl cmp::Ord for Source {
    fn cmp(&self, other: &Source) -> cmp::Ordering {
        Rc::as_ptr(&self.src).cmp(&Rc::as_ptr(&other.src))
    }
}

impl cmp::PartialOrd for Source {
    fn partial_cmp(&self, other: &Source) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl cmp::PartialEq for Source {
    fn eq(&self, other: &Source) -> bool {
        Rc::as_ptr(&self.src) == Rc::as_ptr(&other.src)
    }
}

impl cmp::Eq for Source {}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        self.src.file.fmt(f)
    }
}

/// A sub-string of a [`Source`], without the borrow.
#[derive(Clone)]
pub struct SourceStr {
    source: Source,
    start: u32,
    end: u32,
}

impl Debug for SourceStr {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        self.text().fmt(f)
    }
}

impl fmt::Display for SourceStr {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        fmt::Display::fmt(&self.text(), f)
    }
}

impl SourceStr {
    pub fn new(source: Source, start: u32, end: u32) -> Self {
        Self { source, start, end }
    }

    pub fn text(&self) -> &str {
        &self.source.contents()[self.start as usize..self.end as usize]
    }
}

impl cmp::PartialEq for SourceStr {
    fn eq(&self, other: &Self) -> bool {
        self.text().eq(other.text())
    }
}

impl cmp::Eq for SourceStr {}

impl cmp::PartialOrd for SourceStr {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl cmp::Ord for SourceStr {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.text().cmp(other.text())
    }
}

impl Source {
    pub fn from_contents(file: String, contents: String) -> Result<Source> {
        let max_size = u32::MAX as usize - 2; // Account for rows, cols possibly starting at 1, EOF etc.
        if contents.len() > max_size {
            bail!("{file} exceeds maximum allowed source file size {max_size}");
        }
        let mut lines = vec![];
        let mut prev_ch = ' ';
        let mut prev_pos = 0u32;
        let mut start = 0u32;
        for (i, ch) in contents.char_indices() {
            if ch == '\n' {
                let end = match prev_ch {
                    '\r' => prev_pos,
                    _ => i as u32,
                };
                lines.push((start, end));
                start = i as u32 + 1;
            }
            prev_ch = ch;
            prev_pos = i as u32;
        }

        if (start as usize) < contents.len() {
            lines.push((start, contents.len() as u32));
        } else if contents.is_empty() {
            lines.push((0, 0));
        } else {
            let s = (contents.len() - 1) as u32;
            lines.push((s, s));
        }
        Ok(Self {
            src: Rc::new(SourceInternal {
                file,
                contents,
                lines,
            }),
        })
    }

    #[cfg(feature = "std")]
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Source> {
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => bail!("Failed to read {}. {e}", path.as_ref().display()),
        };
        Self::from_contents(path.as_ref().to_string_lossy().to_string(), contents)
    }

    pub fn file(&self) -> &String {
        &self.src.file
    }

    pub fn contents(&self) -> &String {
        &self.src.contents
    }

    pub fn line(&self, idx: u32) -> &str {
        let idx = idx as usize;
        if idx < self.src.lines.len() {
            let (start, end) = self.src.lines[idx];
            &self.src.contents[start as usize..end as usize]
        } else {
            ""
        }
    }

    pub fn message(&self, line: u32, col: u32, kind: &str, msg: &str) -> String {
        if line as usize > self.src.lines.len() {
            return format!("{}: invalid line {} specified", self.src.file, line);
        }

        let line_str = format!("{line}");
        let line_num_width = line_str.len() + 1;
        let col_spaces = col as usize - 1;

        format!(
            "\n--> {}:{}:{}\n{:<line_num_width$}|\n\
		{:<line_num_width$}| {}\n\
		{:<line_num_width$}| {:<col_spaces$}^\n\
		{}: {}",
            self.src.file,
            line,
            col,
            "",
            line,
            self.line(line - 1),
            "",
            "",
            kind,
            msg
        )
    }

    pub fn error(&self, line: u32, col: u32, msg: &str) -> anyhow::Error {
        anyhow!(self.message(line, col, "error", msg))
    }
}

/// A span of text in a [`Source`], with its starting line and column.
#[derive(Clone)]
pub struct Span {
    pub source: Source,
    pub line: u32,
    pub col: u32,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn text(&self) -> &str {
        &self.source.contents()[self.start as usize..self.end as usize]
    }

    pub fn source_str(&self) -> SourceStr {
        SourceStr::new(self.source.clone(), self.start, self.end)
    }

    pub fn message(&self, kind: &str, msg: &str) -> String {
        self.source.message(self.line, self.col, kind, msg)
    }

    pub fn error(&self, msg: &str) -> anyhow::Error {
        self.source.error(self.line, self.col, msg)
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let t = self.text().escape_debug().to_string();
        let max = 32;
        let (txt, trailer) = if t.len() > max {
            (&t[0..max], "...")
        } else {
            (t.as_str(), "")
        };

        f.write_fmt(format_args!(
            "{}:{}:{}:{}, \"{}{}\"",
            self.line, self.col, self.start, self.end, txt, trailer
        ))
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenKind {
    Symbol,
    String,
    VerbatimString,
    Number,
    Ident,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token(pub TokenKind, pub Span);

#[derive(Clone)]
pub struct Lexer<'source> {
    source: Source,
    iter: Peekable<CharIndices<'source>>,
    line: u32,
    col: u32,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source Source) -> Self {
        Self {
            source: source.clone(),
            iter: source.contents().char_indices().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn peek(&mut self) -> (usize, char) {
        match self.iter.peek() {
            Some((index, chr)) => (*index, *chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn peekahead(&mut self, n: usize) -> (usize, char) {
        match self.iter.clone().nth(n) {
            Some((index, chr)) => (index, chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn span(&self, line: u32, col: u32, start: u32, end: u32) -> Span {
        Span {
            source: self.source.clone(),
            line,
            col,
            start,
            end,
        }
    }

    fn symbol(&mut self, start: usize, width: u32) -> Token {
        let col = self.col;
        for _ in 0..width {
            self.iter.next();
        }
        self.col += width;
        Token(
            TokenKind::Symbol,
            self.span(self.line, col, start as u32, start as u32 + width),
        )
    }

    fn read_ident(&mut self) -> Result<Token> {
        let start = self.peek().0;
        let col = self.col;
        loop {
            let ch = self.peek().1;
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.iter.next();
            } else {
                break;
            }
        }
        let end = self.peek().0;
        self.col += (end - start) as u32;
        Ok(Token(
            TokenKind::Ident,
            self.span(self.line, col, start as u32, end as u32),
        ))
    }

    fn read_digits(&mut self) {
        while self.peek().1.is_ascii_digit() {
            self.iter.next();
        }
    }

    // Jsonnet numbers follow the json grammar, without a leading sign:
    // https://www.json.org/json-en.html
    fn read_number(&mut self) -> Result<Token> {
        let (start, chr) = self.peek();
        let col = self.col;
        self.iter.next();

        // Read integer part.
        if chr != '0' {
            // Starts with 1.. or 9. Read digits.
            self.read_digits();
        }

        // Read fraction part
        // . must be followed by at least 1 digit.
        if self.peek().1 == '.' && self.peekahead(1).1.is_ascii_digit() {
            self.iter.next(); // .
            self.read_digits();
        }

        // Read exponent part
        let ch = self.peek().1;
        if ch == 'e' || ch == 'E' {
            self.iter.next();
            // e must be followed by an optional sign and digits
            if matches!(self.peek().1, '+' | '-') {
                self.iter.next();
            }
            self.read_digits();
        }

        let end = self.peek().0;
        self.col += (end - start) as u32;

        // Check for invalid number. A valid number cannot be followed by
        // these characters:
        let ch = self.peek().1;
        if ch == '_' || ch == '.' || ch.is_ascii_alphanumeric() {
            return Err(self.source.error(self.line, self.col, "invalid number"));
        }

        // Ensure that the number is parsable in Rust.
        match serde_json::from_str::<serde_json::Value>(&self.source.contents()[start..end]) {
            Ok(_) => (),
            Err(e) => {
                bail!(
                    "{} {e}",
                    self.source
                        .error(self.line, col, "invalid number. cannot parse number:")
                )
            }
        }

        Ok(Token(
            TokenKind::Number,
            self.span(self.line, col, start as u32, end as u32),
        ))
    }

    // Quoted string; `quote` is either ' or ". The returned span excludes
    // the quotes. Newlines are allowed inside strings.
    fn read_string(&mut self, quote: char) -> Result<Token> {
        let (line, col) = (self.line, self.col);
        self.iter.next();
        self.col += 1;
        let (start, _) = self.peek();
        loop {
            let (_, ch) = self.peek();
            match ch {
                '\x00' => {
                    return Err(self.source.error(line, col, "unterminated string"));
                }
                '\\' => {
                    self.iter.next();
                    self.col += 1;
                    let (_, ch) = self.peek();
                    self.iter.next();
                    self.col += 1;
                    match ch {
                        '"' | '\'' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' => (),
                        'u' => {
                            for _i in 0..4 {
                                let (_, ch) = self.peek();
                                if !ch.is_ascii_hexdigit() {
                                    return Err(self.source.error(
                                        self.line,
                                        self.col,
                                        "invalid hex escape sequence",
                                    ));
                                }
                                self.iter.next();
                                self.col += 1;
                            }
                        }
                        _ => {
                            return Err(self.source.error(
                                self.line,
                                self.col,
                                "invalid escape sequence",
                            ))
                        }
                    }
                }
                '\n' => {
                    self.iter.next();
                    self.line += 1;
                    self.col = 1;
                }
                _ if ch == quote => break,
                _ => {
                    self.iter.next();
                    self.col += 1;
                }
            }
        }

        let end = self.peek().0;
        self.iter.next(); // closing quote
        self.col += 1;
        Ok(Token(
            TokenKind::String,
            self.span(line, col + 1, start as u32, end as u32),
        ))
    }

    // Verbatim string @'..' or @".."; a doubled quote stands for the quote
    // itself. The span excludes the leading @ and the quotes.
    fn read_verbatim_string(&mut self) -> Result<Token> {
        let (line, col) = (self.line, self.col);
        self.iter.next(); // @
        self.col += 1;
        let quote = self.peek().1;
        if quote != '"' && quote != '\'' {
            return Err(self
                .source
                .error(line, col, "expected \" or ' after @ in verbatim string"));
        }
        self.iter.next();
        self.col += 1;
        let (start, _) = self.peek();
        loop {
            let (offset, ch) = self.peek();
            match ch {
                '\x00' => {
                    return Err(self.source.error(line, col, "unterminated verbatim string"));
                }
                '\n' => {
                    self.iter.next();
                    self.line += 1;
                    self.col = 1;
                }
                _ if ch == quote => {
                    if self.peekahead(1).1 == quote {
                        // Escaped quote.
                        self.iter.next();
                        self.iter.next();
                        self.col += 2;
                    } else {
                        let end = offset;
                        self.iter.next();
                        self.col += 1;
                        return Ok(Token(
                            TokenKind::VerbatimString,
                            self.span(line, col + 2, start as u32, end as u32),
                        ));
                    }
                }
                _ => {
                    self.iter.next();
                    self.col += 1;
                }
            }
        }
    }

    fn skip_ws(&mut self) -> Result<()> {
        // Whitespace and the three comment forms are skipped.
        // A tab is considered 4 space characters.
        loop {
            match self.peek().1 {
                ' ' => self.col += 1,
                '\t' => self.col += 4,
                '\r' => (),
                '\n' => {
                    self.col = 1;
                    self.line += 1;
                }
                '#' => {
                    self.iter.next();
                    loop {
                        match self.peek().1 {
                            '\n' | '\x00' => break,
                            _ => self.iter.next(),
                        };
                    }
                    continue;
                }
                '/' if self.peekahead(1).1 == '/' => {
                    self.iter.next();
                    loop {
                        match self.peek().1 {
                            '\n' | '\x00' => break,
                            _ => self.iter.next(),
                        };
                    }
                    continue;
                }
                '/' if self.peekahead(1).1 == '*' => {
                    let (line, col) = (self.line, self.col);
                    self.iter.next();
                    self.iter.next();
                    self.col += 2;
                    loop {
                        let ch = self.peek().1;
                        match ch {
                            '\x00' => {
                                return Err(self.source.error(line, col, "unterminated comment"));
                            }
                            '*' if self.peekahead(1).1 == '/' => {
                                self.iter.next();
                                self.iter.next();
                                self.col += 2;
                                break;
                            }
                            '\n' => {
                                self.iter.next();
                                self.line += 1;
                                self.col = 1;
                            }
                            '\t' => {
                                self.iter.next();
                                self.col += 4;
                            }
                            _ => {
                                self.iter.next();
                                self.col += 1;
                            }
                        }
                    }
                    continue;
                }
                _ => break,
            }
            self.iter.next();
        }
        Ok(())
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_ws()?;

        let (start, chr) = self.peek();

        match chr {
            // grouping and separators
            '{' | '}' | '[' | ']' | '(' | ')' | ',' | ';' | '.' | '$' |
            // single-char operators without a longer form
            '+' | '-' | '*' | '%' | '~' | '^' | '/' => Ok(self.symbol(start, 1)),
            ':' => {
                // : :: :::
                let mut width = 1;
                while width < 3 && self.peekahead(width as usize).1 == ':' {
                    width += 1;
                }
                Ok(self.symbol(start, width))
            }
            '<' | '>' => {
                // < <= << > >= >>
                let next = self.peekahead(1).1;
                if next == '=' || next == chr {
                    Ok(self.symbol(start, 2))
                } else {
                    Ok(self.symbol(start, 1))
                }
            }
            '=' if self.peekahead(1).1 == '=' => Ok(self.symbol(start, 2)),
            '=' => Ok(self.symbol(start, 1)),
            '!' if self.peekahead(1).1 == '=' => Ok(self.symbol(start, 2)),
            '!' => Ok(self.symbol(start, 1)),
            '&' if self.peekahead(1).1 == '&' => Ok(self.symbol(start, 2)),
            '&' => Ok(self.symbol(start, 1)),
            '|' if self.peekahead(1).1 == '|' && self.peekahead(2).1 == '|' => Err(self
                .source
                .error(self.line, self.col, "text blocks are not supported")),
            '|' if self.peekahead(1).1 == '|' => Ok(self.symbol(start, 2)),
            '|' => Ok(self.symbol(start, 1)),
            '"' | '\'' => self.read_string(chr),
            '@' => self.read_verbatim_string(),
            '\x00' => Ok(Token(
                TokenKind::Eof,
                self.span(self.line, self.col, start as u32, start as u32),
            )),
            _ if chr.is_ascii_digit() => self.read_number(),
            _ if chr.is_ascii_alphabetic() || chr == '_' => self.read_ident(),
            _ => Err(self.source.error(self.line, self.col, "invalid character")),
        }
    }
}

/// Decode the text of a string token into the string value it denotes.
///
/// `verbatim` selects the doubled-quote decoding used by `@'..'`/`@".."`
/// strings; otherwise the json escape set (plus `\'`) applies.
pub(crate) fn unescape(span: &Span, verbatim: bool) -> Result<String> {
    let text = span.text();
    let mut out = String::with_capacity(text.len());

    if verbatim {
        // The quote character sits right before the span.
        let quote = span.source.contents().as_bytes()[span.start as usize - 1] as char;
        let mut chars = text.chars();
        while let Some(ch) = chars.next() {
            out.push(ch);
            if ch == quote {
                // Skip the second quote of the doubled pair.
                chars.next();
            }
        }
        return Ok(out);
    }

    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let mut code = read_codepoint(&mut chars, span)?;
                if (0xD800..0xDC00).contains(&code) {
                    // High surrogate; must be followed by \uXXXX low surrogate.
                    match (chars.next(), chars.next()) {
                        (Some('\\'), Some('u')) => {
                            let low = read_codepoint(&mut chars, span)?;
                            if !(0xDC00..0xE000).contains(&low) {
                                bail!(span.error("invalid surrogate pair in string"));
                            }
                            code = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                        }
                        _ => bail!(span.error("truncated surrogate pair in string")),
                    }
                }
                match char::from_u32(code) {
                    Some(c) => out.push(c),
                    None => bail!(span.error("invalid unicode escape in string")),
                }
            }
            _ => bail!(span.error("invalid escape sequence in string")),
        }
    }
    Ok(out)
}

fn read_codepoint(chars: &mut core::str::Chars<'_>, span: &Span) -> Result<u32> {
    let mut code = 0u32;
    for _ in 0..4 {
        let d = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| span.error("invalid hex escape sequence in string"))?;
        code = code * 16 + d;
    }
    Ok(code)
}

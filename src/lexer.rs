use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ParseError;

/// Prefix run, optional `(path)`, the `$` marker, then a delimiter or the end
/// of the text. The delimiter is checked but not consumed.
static SELECTOR_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([!+\-]*)(?:\([ \t]*([A-Za-z_][A-Za-z0-9_.]*)[ \t]*\))?(\$)(?:[)\[\],+\-*/%><|\&!=\^ \t\\]|$)",
    )
    .expect("selector pattern is valid")
});

/// Modifier run in front of a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    None,
    Not(usize),
    Negate(usize),
    Plus(usize),
}

impl Prefix {
    fn scan(run: &str) -> Option<Prefix> {
        let Some(first) = run.chars().next() else {
            return Some(Prefix::None);
        };
        if run.chars().any(|c| c != first) {
            return None;
        }
        let count = run.len();
        Some(match first {
            '!' => Prefix::Not(count),
            '-' => Prefix::Negate(count),
            _ => Prefix::Plus(count),
        })
    }
}

/// A selector as written, before its sub-expressions are parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSelector<'s> {
    pub field: &'s str,
    pub prefix: Prefix,
    /// Text inside each trailing `[...]`, in order
    pub brackets: Vec<&'s str>,
}

/// Matches a selector at the start of `text`.
///
/// Returns the selector and the number of bytes it spans, or `None` when the
/// text does not start with a well-formed selector. Nothing is consumed on
/// failure, so callers can try other productions at the same offset.
pub fn find_selector(text: &str) -> Option<(RawSelector<'_>, usize)> {
    let caps = SELECTOR_HEAD.captures(text)?;
    let prefix = Prefix::scan(caps.get(1).map_or("", |m| m.as_str()))?;
    let field = caps.get(2).map_or("", |m| m.as_str());
    let mut consumed = caps.get(3)?.end();

    let mut brackets = Vec::new();
    while text[consumed..].starts_with('[') {
        let close = matching_close(&text[consumed..], '[', ']')?;
        let inner = &text[consumed + 1..consumed + close];
        let trimmed = inner.trim();
        if trimmed.is_empty() || trimmed.starts_with('[') {
            return None;
        }
        brackets.push(inner);
        consumed += close + 1;
    }

    Some((
        RawSelector {
            field,
            prefix,
            brackets,
        },
        consumed,
    ))
}

/// Byte offset of the `close` matching the `open` that starts `text`.
/// Quoted text is skipped.
pub fn matching_close(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            c if c == open => depth += 1,
            c if c == close => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits on `separator` outside quotes, parentheses and brackets.
pub fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, ch) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Byte cursor over one expression's text.
pub struct Lexer<'s> {
    input: &'s str,
    position: usize,
}

impl<'s> Lexer<'s> {
    pub fn new(input: &'s str) -> Self {
        Lexer { input, position: 0 }
    }

    pub fn input(&self) -> &'s str {
        self.input
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn rest(&self) -> &'s str {
        &self.input[self.position..]
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    pub fn current_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn peek_char(&self, offset: usize) -> Option<char> {
        self.rest().chars().nth(offset)
    }

    pub fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position += ch.len_utf8();
        }
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Consumes `token` if the remaining text starts with it.
    pub fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.position += token.len();
            true
        } else {
            false
        }
    }

    /// Error for whatever sits at the cursor.
    pub fn unexpected(&self) -> ParseError {
        match self.current_char() {
            Some(found) => ParseError::UnexpectedChar {
                expr: self.input.to_string(),
                offset: self.position,
                found,
            },
            None => ParseError::UnexpectedEnd(self.input.to_string()),
        }
    }

    pub fn read_identifier(&mut self) -> &'s str {
        let start = self.position;
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        &self.input[start..self.position]
    }

    /// Reads a quoted string. Unknown escapes keep their backslash so that
    /// regular expression classes such as `\d` survive.
    pub fn read_string(&mut self, quote: char) -> Result<String, ParseError> {
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some(c @ ('"' | '\'' | '\\')) => result.push(c),
                        Some(c) => {
                            result.push('\\');
                            result.push(c);
                        }
                        None => break,
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(ParseError::UnterminatedString(self.input.to_string()))
    }

    pub fn read_number(&mut self) -> Result<f64, ParseError> {
        let start = self.position;
        let mut seen_dot = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                self.advance();
            } else if ch == '.' && !seen_dot && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
                seen_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.input[start..self.position];
        text.parse()
            .map_err(|_| ParseError::InvalidNumber(text.to_string()))
    }

    /// Reads a balanced `open ... close` block and returns its inner text.
    pub fn read_paired(&mut self, open: char, close: char) -> Result<&'s str, ParseError> {
        let rest = self.rest();
        let end = matching_close(rest, open, close).ok_or_else(|| ParseError::Unbalanced {
            open,
            expr: self.input.to_string(),
        })?;
        self.position += end + close.len_utf8();
        Ok(&rest[open.len_utf8()..end])
    }

    /// Consumes a selector at the cursor. A text that looks like a selector
    /// but is malformed is an error rather than a miss.
    pub fn read_selector(&mut self) -> Result<Option<RawSelector<'s>>, ParseError> {
        let rest = self.rest();
        if let Some((selector, consumed)) = find_selector(rest) {
            self.position += consumed;
            return Ok(Some(selector));
        }
        match SELECTOR_HEAD.captures(rest) {
            Some(caps) if Prefix::scan(&caps[1]).is_none() => {
                Err(ParseError::MixedPrefix(self.input.to_string()))
            }
            Some(_) => Err(ParseError::InvalidSubSelector(self.input.to_string())),
            None => Ok(None),
        }
    }
}

#[test]
fn test_find_selector_plain() {
    let (sel, consumed) = find_selector("$>0").unwrap();
    assert_eq!(sel.field, "");
    assert_eq!(sel.prefix, Prefix::None);
    assert!(sel.brackets.is_empty());
    assert_eq!(consumed, 1);
}

#[test]
fn test_find_selector_path_and_brackets() {
    let (sel, consumed) = find_selector("!!( a.b_1 )$[0]['k'] == 1").unwrap();
    assert_eq!(sel.field, "a.b_1");
    assert_eq!(sel.prefix, Prefix::Not(2));
    assert_eq!(sel.brackets, vec!["0", "'k'"]);
    assert_eq!(consumed, "!!( a.b_1 )$[0]['k']".len());
}

#[test]
fn test_find_selector_rejects() {
    assert!(find_selector("$[]").is_none());
    assert!(find_selector("$[[x]]").is_none());
    assert!(find_selector("!-$").is_none());
    assert!(find_selector("$a").is_none());
    assert!(find_selector("len($)").is_none());
}

#[test]
fn test_matching_close_skips_quotes() {
    assert_eq!(matching_close("[']'][1]", '[', ']'), Some(4));
    assert_eq!(matching_close("(a(b))", '(', ')'), Some(5));
    assert_eq!(matching_close("(a", '(', ')'), None);
}

#[test]
fn test_split_top_level() {
    assert_eq!(
        split_top_level("$>0;msg:sprintf('a;b', $)", ';'),
        vec!["$>0", "msg:sprintf('a;b', $)"]
    );
    assert_eq!(
        split_top_level("$, 1, (a)$[0,1]", ','),
        vec!["$", " 1", " (a)$[0,1]"]
    );
}

#[test]
fn test_read_string_escapes() {
    let mut lexer = Lexer::new(r"'it\'s \d\n'");
    assert_eq!(lexer.read_string('\'').unwrap(), "it's \\d\n");
    assert!(lexer.is_eof());

    let mut open = Lexer::new("'abc");
    assert!(matches!(open.read_string('\''), Err(ParseError::UnterminatedString(_))));
}

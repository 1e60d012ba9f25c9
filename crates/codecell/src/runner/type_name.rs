//! Detecting the top-level type a Java-like source file must be named after
//!
//! A small tokenizer skips comments and literals so that `class` inside a
//! string, a comment or a `Foo.class` expression is never mistaken for a
//! declaration.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Ident(&'a str),
    Punct(char),
}

const TYPE_KEYWORDS: [&str; 4] = ["class", "interface", "enum", "record"];

/// Name of the type the source file must be named after
///
/// A `public` top-level type wins; otherwise the first top-level type
/// declared. Returns `None` when the source declares no type.
pub fn detect_type_name(source: &str) -> Option<String> {
    let tokens = tokenize(source);
    let mut depth = 0usize;
    let mut public = false;
    let mut first = None;

    for (index, token) in tokens.iter().enumerate() {
        match *token {
            Token::Punct('{') => {
                depth += 1;
                public = false;
            }
            Token::Punct('}') => {
                depth = depth.saturating_sub(1);
                public = false;
            }
            Token::Punct(';') => public = false,
            Token::Ident("public") if depth == 0 => public = true,
            Token::Ident(keyword) if depth == 0 && TYPE_KEYWORDS.contains(&keyword) => {
                // `Foo.class` literals and `@interface` annotation types
                if index > 0 && matches!(tokens[index - 1], Token::Punct('.' | '@')) {
                    continue;
                }
                let Some(Token::Ident(name)) = tokens.get(index + 1) else {
                    continue;
                };
                // `record` is only a keyword in front of a header
                if keyword == "record"
                    && !matches!(tokens.get(index + 2), Some(Token::Punct('(' | '<')))
                {
                    continue;
                }

                if public {
                    return Some((*name).to_owned());
                }
                first.get_or_insert_with(|| (*name).to_owned());
            }
            _ => {}
        }
    }

    first
}

struct Scanner<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_past(&mut self, end: &str) {
        match self.rest().find(end) {
            Some(index) => self.pos += index + end.len(),
            None => self.pos = self.source.len(),
        }
    }

    /// String or char literal; unterminated literals end at the line
    fn skip_quoted(&mut self, quote: char) {
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                '\n' => break,
                c if c == quote => break,
                _ => {}
            }
        }
    }

    fn skip_text_block(&mut self) {
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                '"' if self.rest().starts_with("\"\"") => {
                    self.pos += 2;
                    break;
                }
                _ => {}
            }
        }
    }

    fn skip_while(&mut self, keep: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&keep) {
            self.bump();
        }
    }
}

fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut scanner = Scanner { source, pos: 0 };
    let mut tokens = Vec::new();

    while let Some(c) = scanner.bump() {
        let start = scanner.pos - c.len_utf8();
        match c {
            '/' if scanner.rest().starts_with('/') => scanner.skip_past("\n"),
            '/' if scanner.rest().starts_with('*') => {
                scanner.pos += 1;
                scanner.skip_past("*/");
            }
            '"' if scanner.rest().starts_with("\"\"") => {
                scanner.pos += 2;
                scanner.skip_text_block();
            }
            '"' | '\'' => scanner.skip_quoted(c),
            c if c.is_ascii_digit() => {
                scanner.skip_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                scanner.skip_while(|c| c.is_alphanumeric() || c == '_' || c == '$');
                tokens.push(Token::Ident(&source[start..scanner.pos]));
            }
            c if c.is_whitespace() => {}
            c => tokens.push(Token::Punct(c)),
        }
    }

    tokens
}


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn never_panics(source in ".*") {
            let _ = detect_type_name(&source);
        }

        #[test]
        fn finds_declared_name(name in "[A-Z][A-Za-z0-9_]{0,12}") {
            let source = format!("public class {name} {{\n}}\n");
            prop_assert_eq!(detect_type_name(&source), Some(name));
        }
    }
}

//! `source-core-simple` - Simple (regex-based) parsers for `source-core`.
//!
//! This crate is intended for lightweight formats (JSON/INI/etc.) where a real grammar is
//! unnecessary. A [`RegexParser`] produces a shallow tree: one leaf per rule match, nested in
//! `group` nodes for matched bracket pairs. Unmatched closing brackets and unclosed opening
//! brackets become error nodes, so parsing never fails.

use regex::Regex;
use source_core::{Parser, SyntaxNode};
use std::ops::Range;

/// Kind of the root node produced by [`RegexParser`].
pub const ROOT_KIND: &str = "document";
/// Kind of bracket group nodes produced by [`RegexParser`].
pub const GROUP_KIND: &str = "group";

/// A single regex token rule.
#[derive(Debug, Clone)]
pub struct RegexRule {
    regex: Regex,
    kind: String,
    capture_group: Option<usize>,
}

impl RegexRule {
    /// Create a rule producing `kind` leaves for every match of `pattern`.
    pub fn new(pattern: &str, kind: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            kind: kind.into(),
            capture_group: None,
        })
    }

    /// Produce a leaf for a capture group of each match only.
    ///
    /// Example (INI key):
    /// - pattern: `^\\s*([^=\\s]+)\\s*=`
    /// - capture_group: `1` (the key)
    pub fn with_capture_group(mut self, group: usize) -> Self {
        self.capture_group = Some(group);
        self
    }

    /// Node kind of this rule's leaves.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    fn matches<'a>(&'a self, line: &'a str) -> Box<dyn Iterator<Item = Range<usize>> + 'a> {
        match self.capture_group {
            Some(group) => Box::new(
                self.regex
                    .captures_iter(line)
                    .filter_map(move |caps| caps.get(group))
                    .map(|m| m.range()),
            ),
            None => Box::new(self.regex.find_iter(line).map(|m| m.range())),
        }
    }
}

#[derive(Debug)]
struct Token<'a> {
    kind: &'a str,
    range: Range<usize>,
    rule: usize,
}

struct Frame {
    open: char,
    start: usize,
    children: Vec<SyntaxNode>,
}

/// A simple regex-based parser.
///
/// Designed for simple formats (JSON/INI/etc.). It is *not* intended to be a full parser.
#[derive(Debug, Clone)]
pub struct RegexParser {
    rules: Vec<RegexRule>,
    brackets: Vec<(char, char)>,
}

impl RegexParser {
    /// Create a parser from token rules. Earlier rules win when matches overlap.
    pub fn new(rules: Vec<RegexRule>) -> Self {
        Self {
            rules,
            brackets: Vec::new(),
        }
    }

    /// Nest tokens inside `open`/`close` bracket pairs.
    pub fn with_brackets(mut self, open: char, close: char) -> Self {
        if !self.brackets.contains(&(open, close)) {
            self.brackets.push((open, close));
        }
        self
    }

    /// Token rules.
    pub fn rules(&self) -> &[RegexRule] {
        &self.rules
    }

    /// A small default JSON grammar (strings, numbers, booleans, null; `{}` and `[]` groups).
    pub fn json_default() -> Result<Self, regex::Error> {
        Ok(Self::new(vec![
            // JSON string (single-line, handles escapes)
            RegexRule::new(r#""(?:\\.|[^"\\])*""#, "string")?,
            // JSON number
            RegexRule::new(r#"-?(?:0|[1-9]\d*)(?:\.\d+)?(?:[eE][+-]?\d+)?"#, "number")?,
            // JSON boolean / null
            RegexRule::new(r#"\b(?:true|false)\b"#, "boolean")?,
            RegexRule::new(r#"\bnull\b"#, "null")?,
        ])
        .with_brackets('{', '}')
        .with_brackets('[', ']'))
    }

    /// A small default INI grammar (section, key, comment).
    pub fn ini_default() -> Result<Self, regex::Error> {
        Ok(Self::new(vec![
            // Comment: ;... or #...
            RegexRule::new(r#"^\s*[;#].*$"#, "comment")?,
            // Section header: [section]
            RegexRule::new(r#"^\s*\[([^\]]+)\]\s*$"#, "section")?.with_capture_group(1),
            // Key: key = value
            RegexRule::new(r#"^\s*([^=\s]+)\s*="#, "key")?.with_capture_group(1),
        ]))
    }

    /// Run all rules line by line; returns non-overlapping tokens sorted by start (byte offsets).
    fn tokens(&self, source: &str) -> Vec<Token<'_>> {
        let mut tokens = Vec::new();
        let mut line_start = 0;
        for line in source.split_inclusive('\n') {
            let text = line.strip_suffix('\n').unwrap_or(line);
            let text = text.strip_suffix('\r').unwrap_or(text);
            for (rule_idx, rule) in self.rules.iter().enumerate() {
                for range in rule.matches(text) {
                    if range.is_empty() {
                        continue;
                    }
                    tokens.push(Token {
                        kind: &rule.kind,
                        range: line_start + range.start..line_start + range.end,
                        rule: rule_idx,
                    });
                }
            }
            line_start += line.len();
        }

        tokens.sort_by_key(|t| (t.range.start, t.rule));
        let mut kept: Vec<Token<'_>> = Vec::with_capacity(tokens.len());
        for token in tokens {
            if kept.last().is_some_and(|last| token.range.start < last.range.end) {
                continue;
            }
            kept.push(token);
        }
        kept
    }

    fn closing_for(&self, open: char) -> Option<char> {
        self.brackets
            .iter()
            .find(|(o, _)| *o == open)
            .map(|(_, c)| *c)
    }

    fn is_closing(&self, ch: char) -> bool {
        self.brackets.iter().any(|(_, c)| *c == ch)
    }
}

impl Parser for RegexParser {
    fn parse(&self, source: &str) -> SyntaxNode {
        let tokens = self.tokens(source);
        let mut stack = vec![Frame {
            open: '\0',
            start: 0,
            children: Vec::new(),
        }];

        let mut next_token = tokens.iter().peekable();
        let mut chars = source.char_indices().peekable();
        while let Some(&(pos, ch)) = chars.peek() {
            if let Some(token) = next_token.next_if(|t| t.range.start == pos) {
                if let Some(top) = stack.last_mut() {
                    top.children.push(SyntaxNode::new(token.kind, token.range.clone()));
                }
                while chars.next_if(|&(p, _)| p < token.range.end).is_some() {}
                continue;
            }
            chars.next();

            if self.closing_for(ch).is_some() {
                stack.push(Frame {
                    open: ch,
                    start: pos,
                    children: Vec::new(),
                });
            } else if self.is_closing(ch) {
                let end = pos + ch.len_utf8();
                let expected = stack.last().and_then(|f| self.closing_for(f.open));
                if stack.len() > 1
                    && expected == Some(ch)
                    && let Some(frame) = stack.pop()
                {
                    let range = frame.start..end;
                    let group = SyntaxNode::with_children(GROUP_KIND, range, frame.children);
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(group);
                    }
                } else if let Some(top) = stack.last_mut() {
                    let message = format!("unmatched `{ch}`");
                    top.children.push(SyntaxNode::error(message, pos..end));
                }
            }
        }

        while stack.len() > 1 {
            let Some(frame) = stack.pop() else {
                break;
            };
            let mut unclosed = SyntaxNode::error(
                format!("unclosed `{}`", frame.open),
                frame.start..source.len(),
            );
            for child in frame.children {
                unclosed.push_child(child);
            }
            if let Some(parent) = stack.last_mut() {
                parent.children.push(unclosed);
            }
        }

        let children = stack.pop().map(|root| root.children).unwrap_or_default();
        SyntaxNode::with_children(ROOT_KIND, 0..source.len(), children)
    }
}

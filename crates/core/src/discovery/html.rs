//! Page rendering for the two parsing modes.
//!
//! Structured-markup sources keep their markup (minus page chrome) so the
//! normalizer can restructure listing rows. Freeform sources are rendered
//! to Markdown-like text.

use std::iter::Peekable;
use std::str::Chars;

/// Elements whose whole subtree is dropped.
const SKIPPED: [&str; 9] = [
    "script", "style", "noscript", "iframe", "svg", "header", "footer", "nav", "form",
];

/// Elements that start on a fresh line in cleaned markup.
const LINE_STARTS: [&str; 6] = ["li", "tr", "p", "div", "br", "table"];

enum Token {
    Text(char),
    Tag(String),
}

/// Splits HTML into tags and text while dropping comments and skipped subtrees.
struct Tokens<'a> {
    chars: Peekable<Chars<'a>>,
    skipping: Vec<String>,
}

impl<'a> Tokens<'a> {
    fn new(html: &'a str) -> Self {
        Self {
            chars: html.chars().peekable(),
            skipping: Vec::new(),
        }
    }

    fn read_tag(&mut self) -> String {
        let mut tag = String::new();
        while let Some(c) = self.chars.next() {
            if c == '>' && (!tag.starts_with("!--") || tag.ends_with("--")) {
                break;
            }
            tag.push(c);
        }
        tag
    }
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let c = self.chars.next()?;
            if c != '<' {
                if self.skipping.is_empty() {
                    return Some(Token::Text(c));
                }
                continue;
            }

            let tag = self.read_tag();
            if tag.starts_with('!') {
                continue;
            }

            let (name, closing) = tag_name(&tag);
            if SKIPPED.contains(&name.as_str()) {
                if closing {
                    if let Some(pos) = self.skipping.iter().rposition(|t| *t == name) {
                        self.skipping.truncate(pos);
                    }
                } else if !tag.ends_with('/') {
                    self.skipping.push(name);
                }
                continue;
            }

            if self.skipping.is_empty() {
                return Some(Token::Tag(tag));
            }
        }
    }
}

fn tag_name(tag: &str) -> (String, bool) {
    let closing = tag.starts_with('/');
    let body = if closing { &tag[1..] } else { tag };
    let name = body
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    (name, closing)
}

/// Remove page chrome from HTML, keeping the remaining markup verbatim.
pub fn clean_html(html: &str) -> String {
    let mut output = String::with_capacity(html.len() / 2);

    for token in Tokens::new(html) {
        match token {
            Token::Text(c) => output.push(c),
            Token::Tag(tag) => {
                let (name, closing) = tag_name(&tag);
                if !closing && LINE_STARTS.contains(&name.as_str()) && !output.ends_with('\n') {
                    output.push('\n');
                }
                output.push('<');
                output.push_str(&tag);
                output.push('>');
            }
        }
    }

    output
}

/// Render HTML as Markdown-like text: links as `[text](href)`, table cells
/// separated by bars, list items as `- ` lines. Images are dropped.
pub fn html_to_markdown(html: &str) -> String {
    let mut output = String::with_capacity(html.len() / 3);
    let mut links: Vec<Option<String>> = Vec::new();
    let mut tokens = Tokens::new(html).peekable();

    while let Some(token) = tokens.next() {
        let tag = match token {
            Token::Text(c) => {
                push_text(c, &mut tokens, &mut output);
                continue;
            }
            Token::Tag(tag) => tag,
        };

        let (name, closing) = tag_name(&tag);
        match (name.as_str(), closing) {
            ("a", false) => {
                let href = attribute(&tag, "href");
                if href.is_some() {
                    output.push('[');
                }
                links.push(href);
            }
            ("a", true) => {
                if let Some(Some(href)) = links.pop() {
                    output.push_str("](");
                    output.push_str(&href);
                    output.push(')');
                }
            }
            ("tr", false) => output.push_str("\n|"),
            ("td" | "th", true) => output.push_str(" |"),
            ("td" | "th", false) => output.push(' '),
            ("li", false) => output.push_str("\n- "),
            ("br", _) | ("tr", true) => output.push('\n'),
            ("p" | "div" | "ul" | "ol" | "table" | "section" | "article" | "main", _) => {
                output.push_str("\n\n")
            }
            ("h1" | "h2" | "h3" | "h4" | "h5" | "h6", false) => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                output.push_str("\n\n");
                output.push_str(&"#".repeat(level));
                output.push(' ');
            }
            ("h1" | "h2" | "h3" | "h4" | "h5" | "h6", true) => output.push_str("\n\n"),
            _ => {}
        }
    }

    clean_whitespace(&output)
}

/// Push `c` to `output`, decoding an entity when `c` opens one.
///
/// Text that only looks like an entity (`AT&T`, `&copy;`, a trailing `&`)
/// is kept verbatim.
fn push_text<I>(c: char, tokens: &mut Peekable<I>, output: &mut String)
where
    I: Iterator<Item = Token>,
{
    if c != '&' {
        output.push(c);
        return;
    }

    let mut entity = String::new();
    let mut terminated = false;
    while let Some(Token::Text(next)) = tokens.peek() {
        let next = *next;
        if next == ';' {
            terminated = true;
            break;
        }
        if !(next.is_ascii_alphanumeric() || next == '#') || entity.len() >= 10 {
            break;
        }
        entity.push(next);
        tokens.next();
    }

    let decoded = if terminated { decode_entity(&entity) } else { None };
    match decoded {
        Some(decoded) => {
            tokens.next();
            output.push(decoded);
        }
        None => {
            output.push('&');
            output.push_str(&entity);
        }
    }
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some(' '),
        _ => entity
            .strip_prefix("#x")
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .or_else(|| entity.strip_prefix('#').and_then(|n| n.parse().ok()))
            .and_then(char::from_u32),
    }
}

fn attribute(tag: &str, name: &str) -> Option<String> {
    let pattern = format!("{}=", name);
    let start = tag.to_ascii_lowercase().find(&pattern)? + pattern.len();
    let rest = tag[start..].trim_start();

    let value = if let Some(rest) = rest.strip_prefix('"') {
        &rest[..rest.find('"')?]
    } else if let Some(rest) = rest.strip_prefix('\'') {
        &rest[..rest.find('\'')?]
    } else {
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '/')
            .unwrap_or(rest.len());
        &rest[..end]
    };
    Some(value.replace("&amp;", "&"))
}

/// Collapse runs of spaces, strip spaces around line breaks, keep at most
/// one blank line.
fn clean_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut newlines = 0;

    for c in s.chars() {
        if c == '\n' {
            while result.ends_with(' ') {
                result.pop();
            }
            newlines += 1;
            if newlines <= 2 {
                result.push('\n');
            }
        } else if c.is_whitespace() {
            if !result.ends_with(' ') && !result.ends_with('\n') && !result.is_empty() {
                result.push(' ');
            }
        } else {
            newlines = 0;
            result.push(c);
        }
    }

    result.trim().to_string()
}

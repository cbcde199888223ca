//! Single-pass markup tokenizer.
//!
//! Produces start tags, end tags and text runs. Comments, doctype and
//! processing instructions are skipped. The contents of `<style>` and
//! `<script>` are returned as one raw text run so selectors such as `a > b`
//! survive intact.

use std::collections::BTreeMap;

/// Attribute map of a start tag. Names are lowercase; later duplicates win.
pub type Attributes = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    StartTag {
        name: String,
        attrs: Attributes,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    /// Entity-decoded text. Whitespace is left untouched here.
    Text(String),
}

const RAW_TEXT_ELEMENTS: &[&str] = &["style", "script"];

/// Split `input` into tokens. Never fails: anything that does not look like
/// a tag is treated as text.
pub fn tokenize(input: &str) -> Vec<Token> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }

        let rest = &input[pos..];
        let skip_to = if rest.starts_with("<!--") {
            Some(find_from(input, pos + 4, "-->").map_or(input.len(), |end| end + 3))
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            Some(find_from(input, pos + 2, ">").map_or(input.len(), |end| end + 1))
        } else {
            None
        };
        if let Some(next) = skip_to {
            flush_text(input, text_start, pos, &mut tokens);
            pos = next;
            text_start = pos;
            continue;
        }

        match scan_tag(input, pos) {
            Some((token, end)) => {
                flush_text(input, text_start, pos, &mut tokens);
                pos = end;
                text_start = pos;

                let raw_text = match &token {
                    Token::StartTag {
                        name, self_closing, ..
                    } if !self_closing && RAW_TEXT_ELEMENTS.contains(&name.as_str()) => {
                        Some(name.clone())
                    }
                    _ => None,
                };
                tokens.push(token);

                if let Some(name) = raw_text {
                    let close = format!("</{}", name);
                    let body_end = find_from_ignore_case(input, pos, &close).unwrap_or(input.len());
                    let body = &input[pos..body_end];
                    if !body.trim().is_empty() {
                        tokens.push(Token::Text(body.to_string()));
                    }
                    pos = body_end;
                    text_start = pos;
                }
            }
            None => pos += 1,
        }
    }

    flush_text(input, text_start, input.len(), &mut tokens);
    tokens
}

fn flush_text(input: &str, start: usize, end: usize, tokens: &mut Vec<Token>) {
    if start < end {
        tokens.push(Token::Text(decode_entities(&input[start..end])));
    }
}

fn find_from(haystack: &str, from: usize, needle: &str) -> Option<usize> {
    haystack[from..].find(needle).map(|i| i + from)
}

fn find_from_ignore_case(haystack: &str, from: usize, needle: &str) -> Option<usize> {
    let needle = needle.to_ascii_lowercase();
    haystack[from..]
        .to_ascii_lowercase()
        .find(&needle)
        .map(|i| i + from)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == ':' || c == '-'
}

/// Try to read a tag starting at `start` (which points at `<`). Returns the
/// token and the byte offset just past the closing `>`.
fn scan_tag(input: &str, start: usize) -> Option<(Token, usize)> {
    let closing = input[start + 1..].starts_with('/');
    let name_start = start + 1 + usize::from(closing);

    let name_len = input[name_start..]
        .chars()
        .take_while(|c| is_name_char(*c))
        .map(char::len_utf8)
        .sum::<usize>();
    if name_len == 0 || !input[name_start..].starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return None;
    }
    let name = input[name_start..name_start + name_len].to_ascii_lowercase();

    // Find the closing '>' while honouring quoted attribute values.
    let body_start = name_start + name_len;
    let mut quote: Option<char> = None;
    let mut end = None;
    for (i, c) in input[body_start..].char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => {
                end = Some(body_start + i);
                break;
            }
            None => {}
        }
    }
    let end = end?;
    let body = &input[body_start..end];

    let token = if closing {
        Token::EndTag { name }
    } else {
        Token::StartTag {
            name,
            attrs: parse_attributes(body),
            self_closing: body.trim_end().ends_with('/'),
        }
    };
    Some((token, end + 1))
}

/// Parse `name="v"`, `name='v'`, `name=v` and bare `name` forms.
pub fn parse_attributes(body: &str) -> Attributes {
    let mut attrs = Attributes::new();
    let chars: Vec<char> = body.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_whitespace() || chars[i] == '/' {
            i += 1;
            continue;
        }
        let name_start = i;
        while i < chars.len()
            && !chars[i].is_whitespace()
            && !matches!(chars[i], '=' | '/' | '"' | '\'')
        {
            i += 1;
        }
        if i == name_start {
            // Stray quote: skip it.
            i += 1;
            continue;
        }
        let name: String = chars[name_start..i].iter().collect::<String>().to_ascii_lowercase();

        let mut j = i;
        while j < chars.len() && chars[j].is_whitespace() {
            j += 1;
        }
        let mut value = String::new();
        if j < chars.len() && chars[j] == '=' {
            j += 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == '"' || chars[j] == '\'') {
                let quote = chars[j];
                j += 1;
                let value_start = j;
                while j < chars.len() && chars[j] != quote {
                    j += 1;
                }
                value = chars[value_start..j].iter().collect();
                j += 1;
            } else {
                let value_start = j;
                while j < chars.len() && !chars[j].is_whitespace() {
                    j += 1;
                }
                value = chars[value_start..j].iter().collect();
            }
            i = j;
        }

        attrs.insert(name, decode_entities(&value));
    }

    attrs
}

/// Decode the handful of named references documents actually use, plus
/// numeric `&#N;` and `&#xH;` forms. Unknown references are left as-is.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let name = &after[..semi];
            let ch = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ if name.starts_with("#x") || name.starts_with("#X") => {
                    u32::from_str_radix(&name[2..], 16).ok().and_then(char::from_u32)
                }
                _ if name.starts_with('#') => name[1..].parse::<u32>().ok().and_then(char::from_u32),
                _ => None,
            };
            ch.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Collapse every whitespace run to one space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

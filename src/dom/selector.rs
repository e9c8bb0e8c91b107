//! A small CSS selector engine covering what player discovery needs:
//! type, universal, `#id`, `.class` and attribute selectors joined by
//! descendant or child combinators, plus comma-separated groups.

use std::str::FromStr;

use super::document::{Document, NodeId};
use crate::error::{Result, SkipperError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
    Prefix,
    Suffix,
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrCondition {
    name: String,
    op: AttrOp,
    value: String,
}

impl AttrCondition {
    fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == self.value,
            AttrOp::Contains => !self.value.is_empty() && actual.contains(&self.value),
            AttrOp::Prefix => !self.value.is_empty() && actual.starts_with(&self.value),
            AttrOp::Suffix => !self.value.is_empty() && actual.ends_with(&self.value),
            AttrOp::Word => actual.split_whitespace().any(|word| word == self.value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    /// Relation to the previous part; `None` for the leftmost one.
    combinator: Option<Combinator>,
    compound: Compound,
}

/// Parsed selector list (`a b, c > d`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    groups: Vec<Vec<Part>>,
}

impl SelectorList {
    pub fn parse(source: &str) -> Result<Self> {
        let groups = split_groups(source)?
            .into_iter()
            .map(|group| parse_chain(group, source))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { groups })
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        doc.element(node).is_some()
            && self
                .groups
                .iter()
                .any(|parts| !parts.is_empty() && matches_chain(doc, node, parts, parts.len() - 1))
    }
}

impl FromStr for SelectorList {
    type Err = SkipperError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn matches_chain(doc: &Document, node: NodeId, parts: &[Part], index: usize) -> bool {
    if !matches_compound(doc, node, &parts[index].compound) {
        return false;
    }
    if index == 0 {
        return true;
    }

    match parts[index].combinator.unwrap_or(Combinator::Descendant) {
        Combinator::Child => doc
            .parent(node)
            .is_some_and(|parent| matches_chain(doc, parent, parts, index - 1)),
        Combinator::Descendant => {
            let mut cursor = doc.parent(node);
            while let Some(ancestor) = cursor {
                if matches_chain(doc, ancestor, parts, index - 1) {
                    return true;
                }
                cursor = doc.parent(ancestor);
            }
            false
        }
    }
}

fn matches_compound(doc: &Document, node: NodeId, compound: &Compound) -> bool {
    let Some(element) = doc.element(node) else {
        return false;
    };

    if let Some(tag) = &compound.tag {
        if !element.is_tag(tag) {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if element.id.as_deref() != Some(id.as_str()) {
            return false;
        }
    }
    if !compound.classes.iter().all(|class| element.has_class(class)) {
        return false;
    }
    compound
        .attrs
        .iter()
        .all(|cond| cond.matches(element.attr(&cond.name).as_deref()))
}

fn invalid(source: &str, reason: &str) -> SkipperError {
    SkipperError::InvalidSelector(format!("{:?}: {}", source, reason))
}

/// Split on top-level commas, ignoring those inside brackets or quotes.
fn split_groups(source: &str) -> Result<Vec<&str>> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, ch) in source.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                groups.push(source[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    if quote.is_some() || depth != 0 {
        return Err(invalid(source, "unterminated attribute selector"));
    }
    groups.push(source[start..].trim());

    if groups.iter().any(|group| group.is_empty()) {
        return Err(invalid(source, "empty selector"));
    }
    Ok(groups)
}

fn parse_chain(group: &str, source: &str) -> Result<Vec<Part>> {
    let mut parts: Vec<Part> = Vec::new();
    let mut pending: Option<Combinator> = None;
    let mut current = String::new();
    let mut in_brackets = false;
    let mut quote: Option<char> = None;

    let flush = |current: &mut String,
                     pending: &mut Option<Combinator>,
                     parts: &mut Vec<Part>|
     -> Result<()> {
        let compound = parse_compound(current, source)?;
        let combinator = if parts.is_empty() {
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        parts.push(Part {
            combinator,
            compound,
        });
        current.clear();
        Ok(())
    };

    for ch in group.chars() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            current.push(ch);
            continue;
        }
        match ch {
            '"' | '\'' if in_brackets => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                in_brackets = true;
                current.push(ch);
            }
            ']' => {
                in_brackets = false;
                current.push(ch);
            }
            c if !in_brackets && (c.is_whitespace() || c == '>') => {
                if !current.is_empty() {
                    flush(&mut current, &mut pending, &mut parts)?;
                }
                if c == '>' {
                    if parts.is_empty() {
                        return Err(invalid(source, "combinator without left-hand side"));
                    }
                    pending = Some(Combinator::Child);
                } else if pending.is_none() && !parts.is_empty() {
                    pending = Some(Combinator::Descendant);
                }
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        flush(&mut current, &mut pending, &mut parts)?;
    } else if pending == Some(Combinator::Child) {
        return Err(invalid(source, "dangling child combinator"));
    }
    if parts.is_empty() {
        return Err(invalid(source, "empty selector"));
    }
    Ok(parts)
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-' || ch == '_'
}

fn read_ident(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() && is_ident_char(chars[end]) {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}

fn parse_compound(text: &str, source: &str) -> Result<Compound> {
    let chars: Vec<char> = text.chars().collect();
    let mut compound = Compound::default();
    let mut i = 0;

    if chars.first() == Some(&'*') {
        i = 1;
    } else if chars.first().copied().is_some_and(is_ident_char) {
        let (tag, next) = read_ident(&chars, 0);
        compound.tag = Some(tag.to_ascii_lowercase());
        i = next;
    }

    while i < chars.len() {
        match chars[i] {
            '.' | '#' => {
                let (name, next) = read_ident(&chars, i + 1);
                if name.is_empty() {
                    return Err(invalid(source, "missing class or id name"));
                }
                if chars[i] == '.' {
                    compound.classes.push(name);
                } else {
                    compound.id = Some(name);
                }
                i = next;
            }
            '[' => {
                let (cond, next) = parse_attr(&chars, i + 1, source)?;
                compound.attrs.push(cond);
                i = next;
            }
            other => {
                return Err(invalid(
                    source,
                    &format!("unsupported character {:?}", other),
                ))
            }
        }
    }
    Ok(compound)
}

/// Parse the inside of `[...]`, `start` pointing just past the opening bracket.
fn parse_attr(chars: &[char], start: usize, source: &str) -> Result<(AttrCondition, usize)> {
    let skip_ws = |mut i: usize| {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        i
    };

    let mut i = skip_ws(start);
    let (name, next) = read_ident(chars, i);
    if name.is_empty() {
        return Err(invalid(source, "missing attribute name"));
    }
    i = skip_ws(next);

    let op = match chars.get(i) {
        Some(']') => {
            return Ok((
                AttrCondition {
                    name: name.to_ascii_lowercase(),
                    op: AttrOp::Exists,
                    value: String::new(),
                },
                i + 1,
            ))
        }
        Some('=') => {
            i += 1;
            AttrOp::Equals
        }
        Some(c @ ('*' | '^' | '$' | '~')) if chars.get(i + 1) == Some(&'=') => {
            i += 2;
            match c {
                '*' => AttrOp::Contains,
                '^' => AttrOp::Prefix,
                '$' => AttrOp::Suffix,
                _ => AttrOp::Word,
            }
        }
        _ => return Err(invalid(source, "malformed attribute selector")),
    };

    i = skip_ws(i);
    let value = match chars.get(i) {
        Some(q @ ('"' | '\'')) => {
            let close = chars[i + 1..]
                .iter()
                .position(|c| c == q)
                .ok_or_else(|| invalid(source, "unterminated attribute value"))?;
            let value: String = chars[i + 1..i + 1 + close].iter().collect();
            i += close + 2;
            value
        }
        _ => {
            let (value, next) = read_ident(chars, i);
            i = next;
            value
        }
    };

    i = skip_ws(i);
    if chars.get(i) != Some(&']') {
        return Err(invalid(source, "missing closing bracket"));
    }

    Ok((
        AttrCondition {
            name: name.to_ascii_lowercase(),
            op,
            value,
        },
        i + 1,
    ))
}

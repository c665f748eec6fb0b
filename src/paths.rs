//! Element record construction from the raw extraction result
//!
//! The in-page script only reports what the DOM knows (tag, attributes,
//! effective value, children). XPath and CSS selectors are derived here by
//! walking the raw tree and counting same-tag preceding siblings, so the
//! addressing rules live in one testable place.

use serde::Deserialize;

use crate::types::ElementRecord;

/// Longest value preview kept on a record
pub const VALUE_PREVIEW_LEN: usize = 100;

/// Node shape returned by the extraction script
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDomNode {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub element_type: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub children: Option<Vec<RawDomNode>>,
}

/// Position of a node relative to its parent
struct Ancestry<'a> {
    xpath: &'a str,
    /// CSS segments from the nearest id-anchored ancestor (or the root) down to the parent
    css_chain: &'a [String],
}

/// Convert the raw tree rooted at `document.documentElement` into element records
pub fn build_records(root: &RawDomNode) -> ElementRecord {
    build_node(root, None, 1)
}

fn build_node(raw: &RawDomNode, parent: Option<&Ancestry<'_>>, nth: usize) -> ElementRecord {
    let tag = raw.tag.as_deref().unwrap_or("").to_ascii_lowercase();
    let id = raw.id.clone().unwrap_or_default();

    let xpath = xpath_segment(&tag, &id, parent, nth);

    let segment = css_segment(&tag, &id, nth);
    let css_chain: Vec<String> = match parent {
        Some(p) if id.is_empty() => {
            let mut chain = p.css_chain.to_vec();
            chain.push(segment);
            chain
        }
        _ => vec![segment],
    };
    let css = if id.is_empty() {
        css_chain.join(" > ")
    } else {
        css_id_selector(&id)
    };

    let children = {
        let ancestry = Ancestry {
            xpath: &xpath,
            css_chain: &css_chain,
        };
        let raw_children = raw.children.as_deref().unwrap_or(&[]);
        let mut seen: Vec<(String, usize)> = Vec::new();
        raw_children
            .iter()
            .map(|child| {
                let child_tag = child.tag.as_deref().unwrap_or("").to_ascii_lowercase();
                let nth = match seen.iter_mut().find(|(t, _)| *t == child_tag) {
                    Some((_, count)) => {
                        *count += 1;
                        *count
                    }
                    None => {
                        seen.push((child_tag, 1));
                        1
                    }
                };
                build_node(child, Some(&ancestry), nth)
            })
            .collect()
    };

    ElementRecord {
        tag,
        id,
        name: raw.name.clone().unwrap_or_default(),
        element_type: raw.element_type.clone().unwrap_or_default(),
        value: preview_value(raw.value.as_deref().unwrap_or("")),
        xpath,
        css,
        children,
    }
}

fn xpath_segment(tag: &str, id: &str, parent: Option<&Ancestry<'_>>, nth: usize) -> String {
    if !id.is_empty() {
        // XPath 1.0 literals have no escapes, only a choice of quote
        return if id.contains('"') {
            format!("//*[@id='{}']", id)
        } else {
            format!("//*[@id=\"{}\"]", id)
        };
    }
    match parent {
        _ if tag == "body" => "/html/body".to_string(),
        None => format!("/{}", tag),
        Some(p) => format!("{}/{}[{}]", p.xpath, tag, nth),
    }
}

/// One step of a CSS chain; `nth` of 1 is elided
fn css_segment(tag: &str, id: &str, nth: usize) -> String {
    if !id.is_empty() {
        if is_css_identifier(id) {
            format!("{}#{}", tag, id)
        } else {
            format!("{}[id=\"{}\"]", tag, escape_css_string(id))
        }
    } else if nth > 1 {
        format!("{}:nth-of-type({})", tag, nth)
    } else {
        tag.to_string()
    }
}

/// Selector matching an element by id alone
pub fn css_id_selector(id: &str) -> String {
    if is_css_identifier(id) {
        format!("#{}", id)
    } else {
        format!("[id=\"{}\"]", escape_css_string(id))
    }
}

fn is_css_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '-' => {}
        _ => return false,
    }
    if s == "-" || s.starts_with("--") || (s.starts_with('-') && s[1..].starts_with(|c: char| c.is_ascii_digit())) {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub(crate) fn escape_css_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Collapse whitespace and cap the length of a value preview
pub fn preview_value(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > VALUE_PREVIEW_LEN {
        let cut: String = collapsed.chars().take(VALUE_PREVIEW_LEN - 3).collect();
        format!("{}...", cut)
    } else {
        collapsed
    }
}

#[cfg(test)]
#[path = "paths_test.rs"]
mod paths_test;

//! Playwright (Python, sync API) code generation from element records

use crate::paths::{css_id_selector, escape_css_string};
use crate::types::ElementRecord;

/// Placeholder written into generated `fill` calls
pub const FILL_PLACEHOLDER: &str = "your_text_here";

/// Placeholder written into generated `select_option` calls
pub const OPTION_PLACEHOLDER: &str = "option_value";

/// Line in the setup stub where recorded steps belong
pub const STEPS_MARKER: &str = "# Add your test steps here";

/// Input types that accept free text
const TEXT_INPUT_TYPES: [&str; 8] = ["", "text", "password", "email", "search", "tel", "url", "number"];

/// Best available way to re-locate an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorChoice {
    Id(String),
    Name(String),
    XPath(String),
    Css(String),
}

impl SelectorChoice {
    /// Locator string understood by Playwright
    pub fn locator(&self) -> String {
        match self {
            SelectorChoice::Id(id) => css_id_selector(id),
            SelectorChoice::Name(name) => format!("[name=\"{}\"]", escape_css_string(name)),
            SelectorChoice::XPath(xpath) => format!("xpath={}", xpath),
            SelectorChoice::Css(css) => css.clone(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SelectorChoice::Id(_) => "id",
            SelectorChoice::Name(_) => "name",
            SelectorChoice::XPath(_) => "xpath",
            SelectorChoice::Css(_) => "css",
        }
    }
}

/// Pick a selector in strict id → name → xpath → css order
pub fn selector_for(record: &ElementRecord) -> Option<SelectorChoice> {
    if !record.id.is_empty() {
        Some(SelectorChoice::Id(record.id.clone()))
    } else if !record.name.is_empty() {
        Some(SelectorChoice::Name(record.name.clone()))
    } else if !record.xpath.is_empty() {
        Some(SelectorChoice::XPath(record.xpath.clone()))
    } else if !record.css.is_empty() {
        Some(SelectorChoice::Css(record.css.clone()))
    } else {
        None
    }
}

/// Interaction a snippet performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetKind {
    Fill,
    Check,
    Click,
    SelectOption,
    GenericClick,
}

impl SnippetKind {
    pub fn for_record(record: &ElementRecord) -> Self {
        let tag = record.tag.to_ascii_lowercase();
        let element_type = record.element_type.to_ascii_lowercase();

        match (tag.as_str(), element_type.as_str()) {
            ("input", t) if TEXT_INPUT_TYPES.contains(&t) => SnippetKind::Fill,
            ("input", "checkbox" | "radio") => SnippetKind::Check,
            ("textarea", _) => SnippetKind::Fill,
            ("button" | "a", _) => SnippetKind::Click,
            ("select", _) => SnippetKind::SelectOption,
            _ => SnippetKind::GenericClick,
        }
    }
}

/// Automation text for one interaction with `record`
pub fn snippet_for(record: &ElementRecord, selector: &SelectorChoice) -> String {
    let locator = py_str(&selector.locator());

    match SnippetKind::for_record(record) {
        SnippetKind::Fill => format!("page.fill({}, {})", locator, py_str(FILL_PLACEHOLDER)),
        SnippetKind::Check => format!("page.check({})", locator),
        SnippetKind::Click => format!("page.click({})", locator),
        SnippetKind::SelectOption => format!(
            "page.select_option({}, {})",
            locator,
            py_str(OPTION_PLACEHOLDER)
        ),
        SnippetKind::GenericClick => format!(
            "# Interact with <{}>\npage.click({})",
            record.tag, locator
        ),
    }
}

/// Visibility assertion for the assertions pane
pub fn assertion_for(selector: &SelectorChoice) -> String {
    format!(
        "expect(page.locator({})).to_be_visible()",
        py_str(&selector.locator())
    )
}

/// Script skeleton written when a page finishes loading
pub fn setup_stub(url: &str) -> String {
    format!(
        r#"from playwright.sync_api import sync_playwright, expect


def run(playwright):
    browser = playwright.chromium.launch(headless=False)
    context = browser.new_context()
    page = context.new_page()
    page.goto({url})

    {marker}

    browser.close()


with sync_playwright() as playwright:
    run(playwright)
"#,
        url = py_str(url),
        marker = STEPS_MARKER,
    )
}

/// Double-quoted Python string literal
fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Editable script text accumulated during a session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeBuffer {
    text: String,
}

impl CodeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }

    /// Append `snippet` after exactly one blank line
    pub fn append(&mut self, snippet: &str) {
        let snippet = snippet.trim_end_matches('\n');
        let base = self.text.trim_end_matches('\n');
        self.text = if base.is_empty() {
            format!("{}\n", snippet)
        } else {
            format!("{}\n\n{}\n", base, snippet)
        };
    }

    /// Insert `snippet` inside the stub's `run` body, after the steps marker
    /// and any steps already placed there, at the marker's indentation
    ///
    /// Falls back to [`append`](Self::append) and returns `false` when the
    /// buffer has no marker line.
    pub fn insert_at_marker(&mut self, snippet: &str) -> bool {
        let lines: Vec<&str> = self.text.lines().collect();
        let Some(marker) = lines.iter().position(|l| l.trim() == STEPS_MARKER) else {
            self.append(snippet);
            return false;
        };

        let indent: String = lines[marker]
            .chars()
            .take_while(|c| c.is_whitespace())
            .collect();
        let mut at = marker + 1;
        while at < lines.len() && !lines[at].trim().is_empty() {
            at += 1;
        }

        let mut text = String::with_capacity(self.text.len() + snippet.len() + 16);
        for line in &lines[..at] {
            text.push_str(line);
            text.push('\n');
        }
        for line in snippet.trim_end_matches('\n').lines() {
            text.push_str(&indent);
            text.push_str(line);
            text.push('\n');
        }
        for line in &lines[at..] {
            text.push_str(line);
            text.push('\n');
        }
        self.text = text;
        true
    }

    /// Replace the whole buffer
    pub fn replace(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }
}

/// Generated assertion lines, in the order they were requested
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssertionList {
    items: Vec<String>,
}

impl AssertionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, assertion: impl Into<String>) {
        self.items.push(assertion.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
#[path = "codegen_test.rs"]
mod codegen_test;

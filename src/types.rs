use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};

/// Output format for the non-interactive subcommands
#[derive(Clone, Copy, Debug, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format for programmatic consumption
    Json,
    /// Human-readable indented tree
    Simple,
}

/// One DOM element captured from a page load, plus its children
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    /// Lower-case tag name (e.g. "input", "div")
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tag: String,
    /// `id` attribute, empty when absent
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    /// `name` attribute, empty when absent
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    /// `type` attribute, empty when absent
    #[serde(rename = "type", default, deserialize_with = "null_as_empty")]
    pub element_type: String,
    /// Input value, falling back to text content
    #[serde(default, deserialize_with = "null_as_empty")]
    pub value: String,
    /// XPath that re-locates the element
    #[serde(default, deserialize_with = "null_as_empty")]
    pub xpath: String,
    /// CSS selector that re-locates the element
    #[serde(default, deserialize_with = "null_as_empty")]
    pub css: String,
    /// Element children in document order
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<ElementRecord>,
}

impl ElementRecord {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_type(mut self, element_type: impl Into<String>) -> Self {
        self.element_type = element_type.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_paths(mut self, xpath: impl Into<String>, css: impl Into<String>) -> Self {
        self.xpath = xpath.into();
        self.css = css.into();
        self
    }

    pub fn with_children(mut self, children: Vec<ElementRecord>) -> Self {
        self.children = children;
        self
    }

    /// Copy of this record without its subtree
    pub fn detached(&self) -> Self {
        Self {
            children: Vec::new(),
            ..self.clone()
        }
    }

    /// Check if element is a specific tag
    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// Number of records in this subtree, including this one
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ElementRecord::count).sum::<usize>()
    }

    /// Short opening-tag rendering used for status lines
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("<{}", self.tag)];

        if !self.id.is_empty() {
            parts.push(format!(" id=\"{}\"", self.id));
        }
        if !self.name.is_empty() {
            parts.push(format!(" name=\"{}\"", self.name));
        }
        if !self.element_type.is_empty() {
            parts.push(format!(" type=\"{}\"", self.element_type));
        }
        parts.push(">".to_string());

        if !self.value.is_empty() {
            parts.push(format!(" {}", self.value));
        }

        parts.join("")
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Browser viewport dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportSize {
    /// Viewport width in pixels
    pub width: u32,
    /// Viewport height in pixels
    pub height: u32,
}

impl ViewportSize {
    /// Parse viewport size from "WIDTHxHEIGHT" format (e.g., "1920x1080")
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('x').collect();
        if parts.len() != 2 {
            anyhow::bail!("Invalid viewport format. Use WIDTHxHEIGHT (e.g., 1920x1080)");
        }

        let width = parts[0]
            .parse::<u32>()
            .map_err(|_| anyhow::anyhow!("Invalid width in viewport size"))?;
        let height = parts[1]
            .parse::<u32>()
            .map_err(|_| anyhow::anyhow!("Invalid height in viewport size"))?;

        Ok(ViewportSize { width, height })
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

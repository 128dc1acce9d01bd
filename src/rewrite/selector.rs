//! Element selectors and matched elements.
//!
//! Only `tag` and `tag.class` are understood. Tag names compare
//! ASCII-case-insensitively; the class must appear as one of the
//! whitespace-separated tokens of the element's `class` attribute.

use std::fmt;

use crate::rewrite::RewriteError;

/// Tag name plus optional required class token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    tag: String,
    class: Option<String>,
}

impl Selector {
    pub fn new(tag: impl Into<String>, class: Option<String>) -> Result<Self, RewriteError> {
        let tag = tag.into().to_ascii_lowercase();
        let display = match &class {
            Some(class) => format!("{tag}.{class}"),
            None => tag.clone(),
        };

        if tag.is_empty() {
            return Err(invalid(&display, "missing tag name"));
        }
        if !tag.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(invalid(&display, "tag name must start with a letter"));
        }
        if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(invalid(&display, "tag name may only contain letters, digits and '-'"));
        }
        if let Some(class) = &class {
            if class.is_empty() {
                return Err(invalid(&display, "empty class name"));
            }
            if class.chars().any(|c| c.is_whitespace() || c == '.') {
                return Err(invalid(&display, "only a single class token is supported"));
            }
        }

        Ok(Self { tag, class })
    }

    /// Parse `tag` or `tag.class`.
    pub fn parse(selector: &str) -> Result<Self, RewriteError> {
        let selector = selector.trim();
        match selector.split_once('.') {
            Some((tag, class)) => Self::new(tag, Some(class.to_string())),
            None => Self::new(selector, None),
        }
        .map_err(|err| match err {
            RewriteError::InvalidSelector { reason, .. } => invalid(selector, reason),
            other => other,
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// `tag` must already be lowercase; attribute names likewise.
    pub fn matches(&self, tag: &str, attributes: &[(String, String)]) -> bool {
        if tag != self.tag {
            return false;
        }
        let Some(required) = &self.class else {
            return true;
        };
        attributes
            .iter()
            .filter(|(name, _)| name == "class")
            .any(|(_, value)| value.split_ascii_whitespace().any(|token| token == required))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.class {
            Some(class) => write!(f, "{}.{}", self.tag, class),
            None => f.write_str(&self.tag),
        }
    }
}

fn invalid(selector: &str, reason: &'static str) -> RewriteError {
    RewriteError::InvalidSelector {
        selector: selector.to_string(),
        reason,
    }
}

/// An element matched by a rule, handed to replacement functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub(crate) tag: String,
    pub(crate) attributes: Vec<(String, String)>,
    pub(crate) html: String,
}

impl Element {
    pub(crate) fn new(tag: String, attributes: Vec<(String, String)>, start_tag: &[u8]) -> Self {
        Self {
            tag,
            attributes,
            html: String::from_utf8_lossy(start_tag).into_owned(),
        }
    }

    /// Lowercase tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// First value of the attribute, matched case-insensitively.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .map(|value| value.split_ascii_whitespace().any(|token| token == class))
            .unwrap_or(false)
    }

    /// The element's original markup, from its start tag through its end
    /// tag (or just the start tag for void and self-closing elements).
    pub fn outer_html(&self) -> &str {
        &self.html
    }
}

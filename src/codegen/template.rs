//! `${name}` text substitution for kernel templates.
//!
//! A template is parsed once into literal and placeholder segments. Rendering
//! requires a value for every placeholder: an unbound key is a hard
//! [`GenError::MissingPlaceholder`], never an empty string. `$$` renders a
//! literal `$`; any other `$` not followed by `{` is copied through.

use crate::core::error::{GenError, GenResult};
use hashbrown::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'t> {
    Literal(&'t str),
    Dollar,
    Placeholder(&'t str),
}

/// A parsed template over borrowed source text.
#[derive(Debug, Clone)]
pub struct Template<'t> {
    segments: Vec<Segment<'t>>,
}

/// Values bound to placeholder names for one rendering.
#[derive(Debug, Default, Clone)]
pub struct Bindings<'a> {
    values: HashMap<&'a str, String>,
}

impl<'a> Bindings<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key`, replacing any previous value.
    pub fn set(&mut self, key: &'a str, value: impl Into<String>) -> &mut Self {
        self.values.insert(key, value.into());
        self
    }

    /// Builder form of [`Bindings::set`].
    pub fn with(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl<'t> Template<'t> {
    /// Parse template text.
    pub fn parse(text: &'t str) -> GenResult<Self> {
        let mut segments = Vec::new();
        let mut rest = text;

        while let Some(pos) = rest.find('$') {
            if pos > 0 {
                segments.push(Segment::Literal(&rest[..pos]));
            }
            let after = &rest[pos + 1..];
            if let Some(tail) = after.strip_prefix('$') {
                segments.push(Segment::Dollar);
                rest = tail;
            } else if let Some(body) = after.strip_prefix('{') {
                let end = body.find('}').ok_or_else(|| GenError::MalformedTemplate {
                    reason: format!("unterminated placeholder at byte {}", text.len() - rest.len() + pos),
                })?;
                let key = &body[..end];
                if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    return Err(GenError::MalformedTemplate {
                        reason: format!("invalid placeholder name `{key}`"),
                    });
                }
                segments.push(Segment::Placeholder(key));
                rest = &body[end + 1..];
            } else {
                segments.push(Segment::Literal("$"));
                rest = after;
            }
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest));
        }

        Ok(Self { segments })
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<&'t str> {
        let mut names: Vec<&'t str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder(key) = segment {
                if !names.contains(key) {
                    names.push(key);
                }
            }
        }
        names
    }

    /// Render with `bindings`. Every placeholder must be bound.
    pub fn substitute(&self, bindings: &Bindings<'_>) -> GenResult<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Dollar => out.push('$'),
                Segment::Placeholder(key) => {
                    let value = bindings.get(key).ok_or_else(|| GenError::MissingPlaceholder {
                        key: (*key).to_string(),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// Parse and render in one step.
pub fn render(text: &str, bindings: &Bindings<'_>) -> GenResult<String> {
    Template::parse(text)?.substitute(bindings)
}

//! Per-target content transformation.
//!
//! Steps run in a fixed order: strip the metadata block, prepend the header,
//! then replace everything with the wrap template. Header and wrap templates
//! are Tera templates with the variables `name`, `type`, `desc` and `content`
//! (the body without its metadata block). The result is always trimmed.

use tera::{Context as TeraContext, Tera};

use super::Target;
use crate::core::{CapmError, Item};
use crate::markdown;

/// Applies one target's transform rules.
#[derive(Debug, Clone, Copy)]
pub struct Transformer<'a> {
    target: &'a Target,
}

impl<'a> Transformer<'a> {
    #[must_use]
    pub const fn new(target: &'a Target) -> Self {
        Self {
            target,
        }
    }

    /// Transform `raw`, the full text of `item`'s source file.
    ///
    /// Items whose type is not recognized pass through with only trimming.
    pub fn transform(&self, item: &Item, raw: &str) -> Result<String, CapmError> {
        let body = markdown::strip_frontmatter(raw);
        let Some(item_type) = item.item_type() else {
            return Ok(raw.trim().to_string());
        };
        let rule = self.target.transform_rule(item_type);

        let mut context = TeraContext::new();
        context.insert("name", &item.name);
        context.insert("type", item_type.as_str());
        context.insert("desc", &item.desc);
        context.insert("content", body.trim());

        let mut output = if rule.strip_frontmatter {
            body
        } else {
            raw.to_string()
        };

        if let Some(header) = &rule.add_header {
            let rendered = render(header, &context, item)?;
            output = format!("{}\n\n{}", rendered.trim_end(), output.trim_start());
        }

        if let Some(wrap) = &rule.wrap_with {
            output = render(wrap, &context, item)?;
        }

        Ok(output.trim().to_string())
    }
}

fn render(template: &str, context: &TeraContext, item: &Item) -> Result<String, CapmError> {
    let mut tera = Tera::default();
    tera.render_str(template, context).map_err(|e| CapmError::TemplateError {
        item: item.label(),
        reason: format_tera_error(&e),
    })
}

/// Flatten a Tera error chain, dropping the internal one-off template name.
fn format_tera_error(error: &tera::Error) -> String {
    use std::error::Error;

    let mut messages = Vec::new();
    let mut current: Option<&dyn Error> = Some(error);
    while let Some(err) = current {
        let cleaned = err
            .to_string()
            .replace("while rendering '__tera_one_off'", "")
            .replace("Failed to render '__tera_one_off'", "")
            .replace("Failed to parse '__tera_one_off'", "")
            .replace("'__tera_one_off'", "template")
            .trim()
            .to_string();
        if !cleaned.is_empty() {
            messages.push(cleaned);
        }
        current = err.source();
    }

    if messages.is_empty() {
        "template syntax error".to_string()
    } else {
        messages.join(": ")
    }
}

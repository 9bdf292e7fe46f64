//! Markdown frontmatter handling for registry files.
//!
//! Registry items are markdown files whose first element is a YAML block
//! delimited by `---` lines. This module splits that block from the body,
//! parses it, and turns low-level YAML errors into hints that name the usual
//! mistakes (tabs, a missing colon, uneven indentation, an unclosed block).
//!
//! The block is extracted with `gray_matter` through an engine that keeps the
//! raw text, so it is available even when it is not valid YAML; parsing is
//! done with `serde_yaml`.
//!
//! # Example
//!
//! ```rust
//! use capm_cli::markdown::{split_frontmatter, strip_frontmatter};
//!
//! let text = "---\ncapsule:\n  type: doc\n---\n# Guide\n";
//! let doc = split_frontmatter(text).unwrap();
//! assert!(doc.frontmatter.unwrap().contains("type: doc"));
//! assert_eq!(strip_frontmatter(text).trim(), "# Guide");
//! ```

use gray_matter::{Matter, Pod, engine::Engine};
use std::path::Path;
use thiserror::Error;

/// A human-readable diagnosis of a malformed metadata block.
///
/// Line numbers are 1-based and count lines of the whole file, so they can be
/// shown next to the file path as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrontmatterProblem {
    /// Indentation uses tab characters
    #[error("line {line}: indentation uses tabs; YAML requires spaces")]
    TabIndentation {
        /// Offending line
        line: usize,
    },

    /// A `key value` pair lacks its colon
    #[error("line {line}: missing ':' after the key (expected `key: value`)")]
    MissingColon {
        /// Offending line
        line: usize,
    },

    /// Indentation does not line up with the enclosing block
    #[error("line {line}: inconsistent indentation; align keys of the same block")]
    InconsistentIndentation {
        /// Offending line
        line: usize,
    },

    /// The opening `---` has no closing `---`
    #[error("metadata block is not terminated; add a closing '---' line")]
    Unterminated,

    /// The file or directory could not be read
    #[error("cannot read: {message}")]
    Unreadable {
        /// I/O error message
        message: String,
    },

    /// The metadata is valid YAML but has the wrong shape
    #[error("invalid metadata: {message}")]
    InvalidMetadata {
        /// Deserializer message
        message: String,
    },

    /// Any other YAML syntax error
    #[error("{}", syntax_message(.line, .message))]
    InvalidSyntax {
        /// Offending line, when the parser knows it
        line: Option<usize>,
        /// Parser message
        message: String,
    },
}

fn syntax_message(line: &Option<usize>, message: &str) -> String {
    match line {
        Some(line) => format!("line {line}: invalid YAML: {message}"),
        None => format!("invalid YAML: {message}"),
    }
}

/// A markdown document split into its metadata block and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitDocument {
    /// Raw frontmatter text without delimiters, if the file has a block.
    pub frontmatter: Option<String>,
    /// Everything after the closing delimiter (the whole text when there is
    /// no block).
    pub body: String,
}

/// Frontmatter lines start after the opening delimiter.
const FRONTMATTER_LINE_OFFSET: usize = 1;

const DELIMITER: &str = "---";

/// gray_matter engine that hands back the block text unparsed, so malformed
/// YAML still reaches [`parse_yaml`] for diagnosis.
struct RawFrontmatter;

impl Engine for RawFrontmatter {
    fn parse(content: &str) -> Result<Pod, gray_matter::Error> {
        Ok(Pod::String(content.to_string()))
    }
}

/// Split a document into metadata block and body.
///
/// A file that does not open with `---` has no block. A file that opens one
/// but never closes it is an error.
pub fn split_frontmatter(text: &str) -> Result<SplitDocument, FrontmatterProblem> {
    let parsed = Matter::<RawFrontmatter>::new().parse::<String>(text).map_err(|err| {
        FrontmatterProblem::InvalidSyntax {
            line: None,
            message: err.to_string(),
        }
    })?;

    if parsed.data.is_none() && is_unterminated(text) {
        return Err(FrontmatterProblem::Unterminated);
    }

    Ok(SplitDocument {
        frontmatter: parsed.data.filter(|raw| !raw.trim().is_empty()),
        body: parsed.content,
    })
}

/// The first line opens a block and no later line closes it.
fn is_unterminated(text: &str) -> bool {
    let Some((first, rest)) = text.split_once('\n') else {
        return false;
    };
    first.trim_end() == DELIMITER && !rest.lines().any(|line| line.trim_end() == DELIMITER)
}

/// Return the body of a document, dropping a leading metadata block.
///
/// Text without a well-formed block is returned unchanged.
#[must_use]
pub fn strip_frontmatter(text: &str) -> String {
    match split_frontmatter(text) {
        Ok(doc) => doc.body,
        Err(_) => text.to_string(),
    }
}

/// Parse raw frontmatter as YAML, diagnosing common mistakes on failure.
pub fn parse_yaml(raw: &str) -> Result<serde_yaml::Value, FrontmatterProblem> {
    serde_yaml::from_str(raw).map_err(|err| diagnose(raw, &err))
}

/// Map a YAML error to the most specific [`FrontmatterProblem`].
fn diagnose(raw: &str, err: &serde_yaml::Error) -> FrontmatterProblem {
    let lines: Vec<&str> = raw.lines().collect();
    let to_file_line = |idx: usize| idx + 1 + FRONTMATTER_LINE_OFFSET;

    if let Some(idx) = lines.iter().position(|line| leading_whitespace(line).contains('\t')) {
        return FrontmatterProblem::TabIndentation {
            line: to_file_line(idx),
        };
    }

    let err_line = err.location().map(|loc| loc.line());
    if let Some(line) = err_line {
        // The parser usually reports the line after a missing colon.
        let current = line.saturating_sub(1);
        for idx in [current, current.saturating_sub(1)] {
            if lines.get(idx).is_some_and(|text| looks_like_missing_colon(text)) {
                return FrontmatterProblem::MissingColon {
                    line: to_file_line(idx),
                };
            }
        }
        if has_inconsistent_indent(&lines, current) {
            return FrontmatterProblem::InconsistentIndentation {
                line: to_file_line(current),
            };
        }
    }

    FrontmatterProblem::InvalidSyntax {
        line: err_line.map(|line| line + FRONTMATTER_LINE_OFFSET),
        message: err.to_string(),
    }
}

fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn looks_like_missing_colon(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && !trimmed.starts_with('#')
        && !trimmed.starts_with('-')
        && !trimmed.starts_with(['[', ']', '{', '}', '"', '\''])
        && !trimmed.contains(':')
}

fn has_inconsistent_indent(lines: &[&str], idx: usize) -> bool {
    let Some(current) = lines.get(idx) else {
        return false;
    };
    let indent = indent_of(current);
    let previous: Vec<&str> =
        lines[..idx].iter().copied().filter(|l| !l.trim().is_empty()).collect();
    let Some(prev) = previous.last() else {
        return indent > 0;
    };
    let prev_indent = indent_of(prev);

    if indent > prev_indent {
        let trimmed = prev.trim_end();
        return !trimmed.ends_with(':') && !trimmed.trim_start().starts_with('-');
    }
    if indent < prev_indent {
        return !previous.iter().any(|l| indent_of(l) == indent);
    }
    false
}

/// Check if a path has a markdown extension (`.md` or `.markdown`).
#[must_use]
pub fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown"))
}

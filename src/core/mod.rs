//! Core types and error handling for CAPM
//!
//! - [`ItemType`] / [`ItemCategory`] - the closed set of capsule types
//! - [`ItemId`] - structured `type:name` identity
//! - [`Item`] - a registry entry parsed from a markdown file
//! - [`CapmError`] / [`ErrorContext`] - typed errors and CLI-facing context

pub mod error;
mod item;
mod item_id;
mod item_type;

pub use error::{CapmError, ErrorContext, user_friendly_error};
pub use item::{Item, ItemStatus};
pub use item_id::{ItemId, is_path_safe_name};
pub use item_type::{ItemCategory, ItemType};

/// Up to three known identifiers closest to `wanted`, best first.
///
/// Used to enrich not-found errors.
#[must_use]
pub fn suggest_similar<'a, I>(wanted: &str, known: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a ItemId>,
{
    let mut scored: Vec<(f64, String)> = known
        .into_iter()
        .map(|id| {
            let candidate = id.to_string();
            (strsim::jaro_winkler(wanted, &candidate), candidate)
        })
        .filter(|(score, _)| *score >= 0.85)
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    scored.into_iter().take(3).map(|(_, id)| id).collect()
}

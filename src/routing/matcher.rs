//! Category slug resolution.
//!
//! # Design Decisions
//! - Exact key match first; slugs are case-sensitive keys
//! - Fallback compares the normalised request (lower-case, spaces → hyphens)
//!   against each key and each category label, and asks for a permanent
//!   redirect to the canonical slug
//! - Explicit NotFound rather than a silent default category

use std::collections::BTreeMap;

use crate::forms::field::{normalize_slug, CategoryConfig};

/// Result of resolving a requested slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryMatch<'a> {
    /// The slug is a category key.
    Found {
        slug: &'a str,
        category: &'a CategoryConfig,
    },
    /// The slug matched a label or a non-canonical spelling of a key.
    Redirect { slug: &'a str },
    NotFound,
}

/// Resolve `requested` against the configured categories.
pub fn resolve<'a>(
    categories: &'a BTreeMap<String, CategoryConfig>,
    requested: &str,
) -> CategoryMatch<'a> {
    if let Some((slug, category)) = categories.get_key_value(requested) {
        return CategoryMatch::Found { slug, category };
    }

    let normalized = normalize_slug(requested);
    if normalized.is_empty() {
        return CategoryMatch::NotFound;
    }

    if let Some((slug, _)) = categories.get_key_value(normalized.as_str()) {
        return CategoryMatch::Redirect { slug };
    }

    categories
        .iter()
        .find(|(_, category)| !category.label.is_empty() && category.label_slug() == normalized)
        .map(|(slug, _)| CategoryMatch::Redirect { slug })
        .unwrap_or(CategoryMatch::NotFound)
}

//! Markup sanitization for user-supplied text.
//!
//! Every tag is removed. The contents of `script` and `style` elements are
//! dropped entirely; text inside any other tag is kept. The result is
//! HTML-escaped text, safe to store and to render.

use std::collections::HashSet;

/// Strip executable and markup content from `input`.
pub fn sanitize_text(input: &str) -> String {
    ammonia::Builder::default()
        .tags(HashSet::new())
        .clean(input)
        .to_string()
}

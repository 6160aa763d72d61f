//! Drive query-language helpers.
//!
//! Values are embedded in single-quoted string literals, so backslashes and
//! single quotes must be escaped or a file name like `Newton's Laws` would
//! terminate the literal early.

/// Escapes a value for inclusion in a single-quoted query literal.
///
/// ```
/// use drivebot_drive::query::escape;
/// assert_eq!(escape("Newton's Laws"), r"Newton\'s Laws");
/// assert_eq!(escape(r"a\b"), r"a\\b");
/// ```
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Direct, non-trashed children of a folder.
pub fn children_of(folder_id: &str) -> String {
    format!("'{}' in parents and trashed = false", escape(folder_id))
}

/// Non-trashed files anywhere in the tree whose name contains `needle`.
pub fn name_contains(needle: &str) -> String {
    format!("name contains '{}' and trashed = false", escape(needle))
}

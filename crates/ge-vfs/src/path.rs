//! Virtual path normalization.
//!
//! Virtual paths are forward-slash separated and case-preserving. The
//! [`MountManager`](crate::MountManager) addresses them case-insensitively
//! through [`lookup_key`]; backends compare them exactly.

use std::borrow::Cow;
use std::path::{Component, Path};

/// Replace every `\` with `/`.
///
/// Borrows when the input already uses forward slashes only.
pub fn normalize_separators(path: &str) -> Cow<'_, str> {
    if path.contains('\\') {
        Cow::Owned(path.replace('\\', "/"))
    } else {
        Cow::Borrowed(path)
    }
}

/// Index key for case-insensitive lookup: separators normalized, lower-cased.
pub fn lookup_key(path: &str) -> String {
    normalize_separators(path).to_lowercase()
}

/// Render a relative filesystem path as a virtual path.
///
/// Only normal components are kept, joined with `/`, so the result is
/// identical on every platform.
pub fn to_virtual(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        if let Component::Normal(part) = component {
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(&part.to_string_lossy());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backslashes_become_slashes() {
        assert_eq!(normalize_separators("sub\\c.txt"), "sub/c.txt");
        assert_eq!(normalize_separators("a\\b\\c"), "a/b/c");
    }

    #[test]
    fn test_clean_path_is_borrowed() {
        assert!(matches!(normalize_separators("sub/c.txt"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_lookup_key_folds_case() {
        assert_eq!(lookup_key("Sub\\Hello.TXT"), "sub/hello.txt");
        assert_eq!(lookup_key("SUB/HELLO.TXT"), lookup_key("sub/hello.txt"));
        assert_eq!(lookup_key(""), "");
    }

    #[test]
    fn test_to_virtual() {
        assert_eq!(to_virtual(Path::new("textures/wall.png")), "textures/wall.png");
        assert_eq!(to_virtual(Path::new("./a/b.txt")), "a/b.txt");
        assert_eq!(to_virtual(Path::new("")), "");
    }
}

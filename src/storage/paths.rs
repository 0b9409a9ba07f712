//! Validation of untrusted relative paths

use std::path::PathBuf;

use thiserror::Error;

/// Reasons a client-supplied path is refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path must be relative: {0}")]
    Absolute(String),

    #[error("path contains an empty segment: {0}")]
    EmptySegment(String),

    #[error("path escapes its directory: {0}")]
    Traversal(String),

    #[error("path contains an invalid character: {0}")]
    InvalidCharacter(String),
}

/// Validate a POSIX-style relative path and convert it to a `PathBuf`.
///
/// Every `/`-separated segment must be a plain name. `.`, `..`, empty
/// segments, backslashes and NUL bytes are refused, so the result can be
/// joined onto a base directory without leaving it.
pub fn validate_relative_path(path: &str) -> Result<PathBuf, PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    if path.starts_with('/') {
        return Err(PathError::Absolute(path.to_string()));
    }
    if path.contains('\\') || path.contains('\0') {
        return Err(PathError::InvalidCharacter(path.to_string()));
    }

    let mut relative = PathBuf::new();
    for segment in path.split('/') {
        match segment {
            "" => return Err(PathError::EmptySegment(path.to_string())),
            "." | ".." => return Err(PathError::Traversal(path.to_string())),
            name => relative.push(name),
        }
    }

    Ok(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_accepts_nested_relative_paths() {
        assert_eq!(validate_relative_path("c.txt").unwrap(), Path::new("c.txt"));
        assert_eq!(
            validate_relative_path("a/b/c.txt").unwrap(),
            Path::new("a").join("b").join("c.txt")
        );
        assert!(validate_relative_path(".gitignore").is_ok());
    }

    #[test]
    fn test_rejects_escaping_paths() {
        assert_eq!(validate_relative_path(""), Err(PathError::Empty));
        assert!(matches!(validate_relative_path("/etc/passwd"), Err(PathError::Absolute(_))));
        assert!(matches!(validate_relative_path("../x"), Err(PathError::Traversal(_))));
        assert!(matches!(validate_relative_path("a/../../x"), Err(PathError::Traversal(_))));
        assert!(matches!(validate_relative_path("./x"), Err(PathError::Traversal(_))));
        assert!(matches!(validate_relative_path("a//b"), Err(PathError::EmptySegment(_))));
        assert!(matches!(validate_relative_path("a/"), Err(PathError::EmptySegment(_))));
        assert!(matches!(
            validate_relative_path("a\\..\\b"),
            Err(PathError::InvalidCharacter(_))
        ));
    }
}

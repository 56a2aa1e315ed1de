//! Identifier Grammar
//!
//! Names of parameters, processes, channels, directives and profiles end up
//! as bare identifiers in the generated Nextflow source, so they must be
//! valid there:
//!
//! - first character is an ASCII letter or `_`
//! - remaining characters are ASCII letters, digits or `_`
//! - the name is not a keyword of the workflow language
//!
//! Profile directive keys may additionally be dotted paths such as
//! `process.executor` or `docker.enabled`.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::error::{ModelError, Namespace, Result};

/// Keywords of Nextflow DSL2 and the underlying Groovy grammar.
static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Nextflow
        "process", "workflow", "params", "input", "output", "script", "shell", "exec", "when",
        "emit", "take", "main", "stub", "include", "nextflow", "channel", "Channel",
        // Groovy
        "abstract", "as", "assert", "boolean", "break", "case", "catch", "class", "const",
        "continue", "def", "default", "do", "else", "enum", "extends", "false", "final",
        "finally", "for", "goto", "if", "implements", "import", "in", "instanceof", "interface",
        "new", "null", "package", "return", "super", "switch", "this", "throw", "throws",
        "trait", "true", "try", "var", "void", "while",
    ]
    .into_iter()
    .collect()
});

/// Returns true if `name` matches the bare identifier grammar.
fn is_identifier_shape(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Returns true if `name` is a keyword of the target language.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.contains(name)
}

/// Returns true if `name` is usable as a bare identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    is_identifier_shape(name) && !is_reserved(name)
}

/// Returns true if `name` is a dot-separated path of identifier segments.
///
/// Segments are not checked against the reserved words: `process.executor`
/// is a legitimate configuration key.
pub fn is_valid_dotted_identifier(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_identifier_shape)
}

/// Validates `name` for the given namespace.
pub fn check_identifier(namespace: Namespace, name: &str) -> Result<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(ModelError::invalid_identifier(namespace, name))
    }
}

/// Validates a possibly dotted configuration key.
pub fn check_dotted_identifier(namespace: Namespace, name: &str) -> Result<()> {
    if is_valid_dotted_identifier(name) {
        Ok(())
    } else {
        Err(ModelError::invalid_identifier(namespace, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        for name in ["threads", "_tmp", "read_length", "Sample2", "x"] {
            assert!(is_valid_identifier(name), "{} should be valid", name);
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        for name in ["", "2fast", "read-length", "with space", "naïve", "a.b"] {
            assert!(!is_valid_identifier(name), "{} should be invalid", name);
        }
    }

    #[test]
    fn test_reserved_words_rejected() {
        assert!(!is_valid_identifier("process"));
        assert!(!is_valid_identifier("params"));
        assert!(!is_valid_identifier("true"));
        assert!(is_valid_identifier("processes"));
    }

    #[test]
    fn test_dotted_identifiers() {
        assert!(is_valid_dotted_identifier("process.executor"));
        assert!(is_valid_dotted_identifier("docker.enabled"));
        assert!(is_valid_dotted_identifier("queueSize"));
        assert!(!is_valid_dotted_identifier("process..executor"));
        assert!(!is_valid_dotted_identifier(".executor"));
        assert!(!is_valid_dotted_identifier(""));
    }

    #[test]
    fn test_check_identifier_error() {
        let err = check_identifier(Namespace::Process, "9lives").unwrap_err();
        assert!(matches!(
            err,
            ModelError::InvalidIdentifier {
                namespace: Namespace::Process,
                ..
            }
        ));
    }
}

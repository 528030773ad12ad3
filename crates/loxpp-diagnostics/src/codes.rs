// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Error code registry.
//!
//! Maps error codes (E0001, E0301, etc.) to titles and categories. The
//! category is the tag shown next to the code in JSON output.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Registry of all known error codes.
pub struct ErrorCodeRegistry {
    codes: HashMap<&'static str, ErrorCodeInfo>,
}

/// Information about a single error code.
pub struct ErrorCodeInfo {
    pub code: &'static str,
    pub title: &'static str,
    pub category: ErrorCategory,
}

/// Error category for grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Syntax,
    Resolution,
    Runtime,
    Protocol,
    Throw,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Syntax => write!(f, "Syntax"),
            ErrorCategory::Resolution => write!(f, "Resolution"),
            ErrorCategory::Runtime => write!(f, "Runtime"),
            ErrorCategory::Protocol => write!(f, "Protocol"),
            ErrorCategory::Throw => write!(f, "Throw"),
        }
    }
}

macro_rules! register_codes {
    ($($code:literal => ($title:literal, $cat:expr)),* $(,)?) => {{
        let mut map = HashMap::new();
        $(
            map.insert($code, ErrorCodeInfo {
                code: $code,
                title: $title,
                category: $cat,
            });
        )*
        map
    }};
}

impl Default for ErrorCodeRegistry {
    fn default() -> Self {
        use ErrorCategory::*;

        Self {
            codes: register_codes! {
                // Lexer errors (E00xx)
                "E0001" => ("unexpected character", Syntax),
                "E0002" => ("unterminated string literal", Syntax),
                "E0003" => ("invalid number literal", Syntax),

                // Parser errors (E01xx)
                "E0100" => ("invalid syntax", Syntax),
                "E0101" => ("expected token not found", Syntax),

                // Resolver errors (E02xx)
                "E0200" => ("variable read in its own initializer", Resolution),
                "E0201" => ("duplicate declaration", Resolution),
                "E0202" => ("return outside of function", Resolution),
                "E0203" => ("return value from initializer", Resolution),
                "E0204" => ("break outside of loop", Resolution),
                "E0205" => ("continue outside of loop", Resolution),
                "E0206" => ("invalid use of 'self'", Resolution),
                "E0207" => ("invalid use of 'super'", Resolution),
                "E0208" => ("class inherits from itself", Resolution),
                "E0209" => ("duplicate method", Resolution),

                // Runtime errors (E03xx)
                "E0300" => ("runtime error", Runtime),
                "E0301" => ("undefined variable", Runtime),
                "E0302" => ("undefined property", Runtime),
                "E0303" => ("type mismatch", Runtime),
                "E0304" => ("arity mismatch", Runtime),
                "E0305" => ("no such method", Runtime),
                "E0306" => ("index out of bounds", Runtime),
                "E0307" => ("invalid index", Runtime),
                "E0308" => ("stack overflow", Runtime),
                "E0309" => ("lazy value depends on itself", Runtime),
                "E0310" => ("assertion failed", Runtime),
                "E0311" => ("i/o failure", Runtime),
                "E0312" => ("undefined namespace member", Runtime),
                "E0313" => ("no such enum variant", Runtime),

                // Protocol and trait errors (E04xx)
                "E0400" => ("protocol not implemented", Protocol),
                "E0401" => ("missing abstract method", Protocol),
                "E0402" => ("conflicting trait methods", Protocol),
                "E0403" => ("method signature mismatch", Protocol),

                // User throws (E05xx)
                "E0500" => ("uncaught throw", Throw),
            },
        }
    }
}

/// The shared registry, built on first use.
pub fn registry() -> &'static ErrorCodeRegistry {
    static REGISTRY: OnceLock<ErrorCodeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(ErrorCodeRegistry::default)
}

impl ErrorCodeRegistry {
    pub fn get(&self, code: &str) -> Option<&ErrorCodeInfo> {
        self.codes.get(code)
    }

    pub fn all(&self) -> impl Iterator<Item = &ErrorCodeInfo> {
        self.codes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_prefix_matches_category() {
        for info in registry().all() {
            let expected = match &info.code[..3] {
                "E00" | "E01" => ErrorCategory::Syntax,
                "E02" => ErrorCategory::Resolution,
                "E03" => ErrorCategory::Runtime,
                "E04" => ErrorCategory::Protocol,
                "E05" => ErrorCategory::Throw,
                other => panic!("unexpected code range {other}"),
            };
            assert_eq!(info.category, expected, "{}", info.code);
        }
    }

    #[test]
    fn unknown_codes_are_absent() {
        let registry = registry();
        assert!(registry.get("E9999").is_none());
        assert_eq!(registry.get("E0500").map(|i| i.title), Some("uncaught throw"));
    }
}

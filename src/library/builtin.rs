//! Builtin (standard part) detection.
//!
//! A footprint is builtin when its name contains, case-insensitively, any
//! token from a fixed set of standard sizes and package families or any
//! footprinter string found in the input. The check is a plain substring
//! match, so a custom part whose name happens to contain a token (say
//! `my_0402_adapter`) is also treated as builtin.

use std::collections::BTreeSet;

use crate::circuit::CircuitIndex;
use crate::convert::parts::STANDARD_SYMBOLS;

/// Standard chip sizes and package families.
pub const STANDARD_FOOTPRINT_TOKENS: &[&str] = &[
    "01005", "0201", "0402", "0603", "0805", "1206", "1210", "1812", "2010", "2512",
    "axial", "bga", "dfn", "dip", "hc49", "lqfp", "msop", "pinrow", "qfn", "qfp", "radial",
    "sod123", "sod323", "sod523", "soic", "sop", "sot23", "sot223", "sot323", "sot363",
    "ssop", "to220", "to92", "tqfp", "tssop",
];

/// Decides whether a library entry name refers to a standard part.
#[derive(Debug, Clone, Default)]
pub struct BuiltinMatcher {
    tokens: BTreeSet<String>,
}

impl BuiltinMatcher {
    /// Matcher over the standard tokens only.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            tokens: STANDARD_FOOTPRINT_TOKENS
                .iter()
                .map(|t| (*t).to_string())
                .collect(),
        }
    }

    /// Matcher over the standard tokens plus `extra` ones.
    #[must_use]
    pub fn with_tokens<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut matcher = Self::standard();
        for token in extra {
            matcher.add_token(token.as_ref());
        }
        matcher
    }

    /// Matcher over the standard tokens plus every footprinter string in `circuit`.
    #[must_use]
    pub fn for_circuit(circuit: &CircuitIndex) -> Self {
        Self::with_tokens(circuit.footprinter_strings())
    }

    /// Adds a token; blank tokens are ignored.
    pub fn add_token(&mut self, token: &str) {
        let token = token.trim().to_lowercase();
        if !token.is_empty() {
            self.tokens.insert(token);
        }
    }

    /// Returns true if `name` contains any token.
    #[must_use]
    pub fn is_builtin(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.tokens.iter().any(|token| name.contains(token.as_str()))
    }

    /// Returns true if `name` is one of the standard symbols.
    #[must_use]
    pub fn is_builtin_symbol(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        STANDARD_SYMBOLS.contains(&name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_tokens_match_by_substring() {
        let matcher = BuiltinMatcher::standard();
        assert!(matcher.is_builtin("resistor_0402"));
        assert!(matcher.is_builtin("Chip_SOIC8"));
        assert!(!matcher.is_builtin("U1"));
    }

    #[test]
    fn footprinter_strings_extend_the_set() {
        let matcher = BuiltinMatcher::with_tokens(["my_pkg"]);
        assert!(matcher.is_builtin("chip_my_pkg"));
        assert!(!BuiltinMatcher::standard().is_builtin("chip_my_pkg"));
    }

    #[test]
    fn substring_false_positive_is_kept() {
        // A custom part that happens to contain a size token
        assert!(BuiltinMatcher::standard().is_builtin("my_0402_adapter"));
    }

    #[test]
    fn standard_symbols() {
        let matcher = BuiltinMatcher::standard();
        assert!(matcher.is_builtin_symbol("resistor"));
        assert!(!matcher.is_builtin_symbol("U1"));
    }
}

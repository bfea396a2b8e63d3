//! KiCad file format handling.
//!
//! This module provides the element tree shared by every KiCad file the
//! converters produce:
//!
//! - `.kicad_sch` — schematics
//! - `.kicad_pcb` — boards
//! - `.kicad_sym` — symbol libraries
//! - `.kicad_mod` — footprints (one per file inside a `.pretty` directory)
//! - `fp-lib-table` / `sym-lib-table` — library tables
//!
//! # Architecture
//!
//! Converters build a [`Sexpr`] tree; [`to_file_text`] turns it into text and
//! [`parse_sexpr`] turns text back into a tree. Nothing else in the crate
//! inspects raw KiCad text.

pub mod error;
pub mod lib_table;
pub mod naming;
pub mod parser;
pub mod sexpr;

pub use error::{ConvertError, ConvertResult, ParseError};
pub use lib_table::{LibTable, LibTableEntry, LibTableKind};
pub use parser::parse_sexpr;
pub use sexpr::{format_number, Sexpr};

/// Generator name written into every file.
pub const GENERATOR: &str = "circuit-to-kicad";

/// Generator version written into every file.
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// File format version for schematics.
pub const SCHEMATIC_VERSION: i64 = 20_250_114;

/// File format version for boards and footprints.
pub const PCB_VERSION: i64 = 20_241_229;

/// File format version for symbol libraries.
pub const SYMBOL_LIB_VERSION: i64 = 20_241_209;

/// Project path variable.
pub const PROJECT_PATH_VAR: &str = "${KIPRJMOD}";

/// Third-party (PCM) install path variable.
pub const THIRD_PARTY_PATH_VAR: &str = "${KICAD9_3RD_PARTY}";

/// Returns the `(version ..)`, `(generator ..)`, `(generator_version ..)` header.
#[must_use]
pub fn file_header(version: i64) -> [Sexpr; 3] {
    [
        Sexpr::list("version", [Sexpr::integer(version)]),
        Sexpr::string_field("generator", GENERATOR),
        Sexpr::string_field("generator_version", GENERATOR_VERSION),
    ]
}

/// Serialises a tree to file text (with a trailing newline).
#[must_use]
pub fn to_file_text(tree: &Sexpr) -> String {
    let mut text = tree.to_string();
    text.push('\n');
    text
}

/// Standard text effects: `(effects (font (size s s)))`, optionally hidden.
#[must_use]
pub fn effects(size: f64, hidden: bool) -> Sexpr {
    Sexpr::node("effects")
        .with(Sexpr::node("font").with(Sexpr::xy("size", size, size)))
        .with_opt(hidden.then(|| Sexpr::yes_no("hide", true)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_text_round_trips() {
        let mut root = Sexpr::node("kicad_symbol_lib");
        for item in file_header(SYMBOL_LIB_VERSION) {
            root.push(item);
        }
        let text = to_file_text(&root);
        assert!(text.ends_with(")\n"));
        let parsed = parse_sexpr(&text).unwrap();
        assert_eq!(parsed, root);
    }

    #[test]
    fn hidden_effects() {
        let text = effects(1.27, true).to_string();
        assert!(text.contains("(hide yes)"));
        assert!(!effects(1.27, false).to_string().contains("hide"));
    }
}

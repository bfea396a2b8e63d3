//! KiCad library tables (`fp-lib-table`, `sym-lib-table`).
//!
//! A table is an ordered list of `(name, type, uri, options, descr)` rows
//! telling KiCad which libraries to register and where they live.

use serde::Serialize;

use super::sexpr::Sexpr;

/// Library table format version written by KiCad 7 and later.
pub const LIB_TABLE_VERSION: i64 = 7;

/// Which of the two library tables this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LibTableKind {
    /// Footprint library table (`fp-lib-table`).
    Footprint,
    /// Symbol library table (`sym-lib-table`).
    Symbol,
}

impl LibTableKind {
    /// Root keyword of the table file.
    #[must_use]
    pub const fn root(self) -> &'static str {
        match self {
            Self::Footprint => "fp_lib_table",
            Self::Symbol => "sym_lib_table",
        }
    }

    /// Conventional file name of the table.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Footprint => "fp-lib-table",
            Self::Symbol => "sym-lib-table",
        }
    }
}

/// One library registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibTableEntry {
    /// Library nickname.
    pub name: String,
    /// Plugin type (`KiCad` for native libraries).
    pub lib_type: String,
    /// Location of the library, usually with a path variable.
    pub uri: String,
    /// Plugin options.
    pub options: String,
    /// Free-text description.
    pub description: String,
}

impl LibTableEntry {
    /// Creates a native KiCad library entry.
    #[must_use]
    pub fn kicad(name: impl Into<String>, uri: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lib_type: "KiCad".to_string(),
            uri: uri.into(),
            options: String::new(),
            description: description.into(),
        }
    }

    fn to_sexpr(&self) -> Sexpr {
        Sexpr::node("lib")
            .with(Sexpr::string_field("name", &self.name))
            .with(Sexpr::string_field("type", &self.lib_type))
            .with(Sexpr::string_field("uri", &self.uri))
            .with(Sexpr::string_field("options", &self.options))
            .with(Sexpr::string_field("descr", &self.description))
    }
}

/// A complete library table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibTable {
    /// Footprint or symbol table.
    pub kind: LibTableKind,
    /// Rows in registration order.
    pub entries: Vec<LibTableEntry>,
}

impl LibTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new(kind: LibTableKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    /// Adds a row unless one with the same name exists.
    pub fn add(&mut self, entry: LibTableEntry) {
        if !self.entries.iter().any(|e| e.name == entry.name) {
            self.entries.push(entry);
        }
    }

    /// Builds the element tree for the table.
    #[must_use]
    pub fn to_sexpr(&self) -> Sexpr {
        let mut root = Sexpr::node(self.kind.root()).with(Sexpr::list(
            "version",
            [Sexpr::integer(LIB_TABLE_VERSION)],
        ));
        for entry in &self.entries {
            root.push(entry.to_sexpr());
        }
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footprint_table_text() {
        let mut table = LibTable::new(LibTableKind::Footprint);
        table.add(LibTableEntry::kicad("my_lib", "${KIPRJMOD}/my_lib.pretty", ""));
        table.add(LibTableEntry::kicad("my_lib", "ignored", ""));

        let text = table.to_sexpr().to_string();
        assert_eq!(table.entries.len(), 1);
        assert!(text.starts_with("(fp_lib_table"));
        assert!(text.contains("(version 7)"));
        assert!(text.contains(r#"(uri "${KIPRJMOD}/my_lib.pretty")"#));
    }

    #[test]
    fn symbol_table_root() {
        let table = LibTable::new(LibTableKind::Symbol);
        assert!(table.to_sexpr().to_string().starts_with("(sym_lib_table"));
        assert_eq!(LibTableKind::Symbol.file_name(), "sym-lib-table");
    }
}

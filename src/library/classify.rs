//! Classification and deduplication of extracted entries.
//!
//! Every component contributes the footprints and symbols extracted from its
//! own conversion. Those entries are routed into one of two libraries:
//!
//! - the **user** library: entries unique to the component, renamed after it
//! - the **builtin** library: standard parts shared between components
//!
//! Names are unique within each collection. The first entry with a name wins
//! and later ones are dropped, on the assumption that the same name means
//! the same part.
//!
//! A symbol's `Footprint` property always names a footprint that exists in
//! the library it points at. Builtin symbols only ever point into the builtin
//! library.

use indexmap::IndexMap;
use tracing::debug;

use crate::kicad::naming::{lib_id, sanitize_name, split_lib_id, strip_lib_prefix};

use super::extract::{FootprintEntry, SymbolEntry};

/// Everything extracted from one component.
#[derive(Debug, Clone, Default)]
pub struct ComponentEntries {
    /// Component (export) name.
    pub component_name: String,
    /// Extracted footprints, in board order.
    pub footprints: Vec<FootprintEntry>,
    /// Extracted symbols, in schematic order.
    pub symbols: Vec<SymbolEntry>,
}

/// What classification decided for one component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationOutcome {
    /// Name of the component's primary footprint, if it has one.
    pub primary_footprint: Option<String>,
    /// Name of the component's user symbol, if it has one.
    pub user_symbol: Option<String>,
    /// Entries dropped as duplicates.
    pub dropped: usize,
}

/// The four library collections of one build.
#[derive(Debug, Clone)]
pub struct ClassificationContext {
    user_library: String,
    builtin_library: String,
    /// Symbols unique to a component.
    pub user_symbols: IndexMap<String, SymbolEntry>,
    /// Footprints unique to a component.
    pub user_footprints: IndexMap<String, FootprintEntry>,
    /// Shared standard symbols.
    pub builtin_symbols: IndexMap<String, SymbolEntry>,
    /// Shared standard footprints.
    pub builtin_footprints: IndexMap<String, FootprintEntry>,
}

impl ClassificationContext {
    /// Creates empty collections for the two named libraries.
    #[must_use]
    pub fn new(user_library: impl Into<String>, builtin_library: impl Into<String>) -> Self {
        Self {
            user_library: user_library.into(),
            builtin_library: builtin_library.into(),
            user_symbols: IndexMap::new(),
            user_footprints: IndexMap::new(),
            builtin_symbols: IndexMap::new(),
            builtin_footprints: IndexMap::new(),
        }
    }

    /// Name of the user library.
    #[must_use]
    pub fn user_library(&self) -> &str {
        &self.user_library
    }

    /// Name of the builtin library.
    #[must_use]
    pub fn builtin_library(&self) -> &str {
        &self.builtin_library
    }

    /// Returns true if nothing has been classified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user_symbols.is_empty()
            && self.user_footprints.is_empty()
            && self.builtin_symbols.is_empty()
            && self.builtin_footprints.is_empty()
    }

    /// Routes one component's entries into the collections.
    pub fn classify(&mut self, entries: ComponentEntries) -> ClassificationOutcome {
        let ComponentEntries {
            component_name,
            footprints,
            symbols,
        } = entries;
        let component_name = sanitize_name(&component_name);
        let mut outcome = ClassificationOutcome::default();

        for mut footprint in footprints {
            if footprint.is_builtin {
                let name = footprint.footprint_name.clone();
                outcome.dropped += usize::from(!insert_first(&mut self.builtin_footprints, name, footprint));
                continue;
            }
            if outcome.primary_footprint.is_none() {
                footprint.rename(&component_name);
                outcome.primary_footprint = Some(component_name.clone());
            }
            let name = footprint.footprint_name.clone();
            outcome.dropped += usize::from(!insert_first(&mut self.user_footprints, name, footprint));
        }

        let single_symbol = symbols.len() == 1;
        for mut symbol in symbols {
            let is_user = outcome.user_symbol.is_none()
                && (symbol.symbol_name.eq_ignore_ascii_case(&component_name)
                    || (single_symbol && outcome.primary_footprint.is_some()));

            if is_user {
                symbol.rename(&component_name);
                symbol.is_builtin = false;
                let footprint_ref = match &outcome.primary_footprint {
                    Some(primary) => Some(lib_id(&self.user_library, primary)),
                    None => self.relink(symbol.footprint_ref()),
                };
                apply_footprint_ref(&mut symbol, footprint_ref.as_deref());
                outcome.user_symbol = Some(component_name.clone());
                outcome.dropped += usize::from(!insert_first(
                    &mut self.user_symbols,
                    component_name.clone(),
                    symbol,
                ));
            } else {
                symbol.is_builtin = true;
                let footprint_ref = symbol
                    .footprint_ref()
                    .map(strip_lib_prefix)
                    .filter(|name| self.builtin_footprints.contains_key(*name))
                    .map(|name| lib_id(&self.builtin_library, name));
                apply_footprint_ref(&mut symbol, footprint_ref.as_deref());
                let name = symbol.symbol_name.clone();
                outcome.dropped += usize::from(!insert_first(&mut self.builtin_symbols, name, symbol));
            }
        }

        debug!(
            component = %component_name,
            primary = ?outcome.primary_footprint,
            symbol = ?outcome.user_symbol,
            dropped = outcome.dropped,
            "Classified component"
        );
        outcome
    }

    /// Points a footprint reference at the collection that holds it.
    fn relink(&self, reference: Option<&str>) -> Option<String> {
        let (_, name) = split_lib_id(reference?);
        if self.user_footprints.contains_key(name) {
            Some(lib_id(&self.user_library, name))
        } else if self.builtin_footprints.contains_key(name) {
            Some(lib_id(&self.builtin_library, name))
        } else {
            None
        }
    }

    /// Symbols whose `Footprint` property names a missing footprint.
    ///
    /// Returns `(symbol, reference)` pairs; empty when the collections are
    /// consistent.
    #[must_use]
    pub fn dangling_footprint_refs(&self) -> Vec<(String, String)> {
        let mut dangling = Vec::new();
        let checks = [
            (&self.user_symbols, true),
            (&self.builtin_symbols, false),
        ];
        for (symbols, user_allowed) in checks {
            for (name, symbol) in symbols {
                let Some(reference) = symbol.footprint_ref() else {
                    continue;
                };
                let (library, footprint) = split_lib_id(reference);
                let found = match library {
                    Some(lib) if lib == self.builtin_library => {
                        self.builtin_footprints.contains_key(footprint)
                    }
                    Some(lib) if lib == self.user_library && user_allowed => {
                        self.user_footprints.contains_key(footprint)
                    }
                    _ => false,
                };
                if !found {
                    dangling.push((name.clone(), reference.to_string()));
                }
            }
        }
        dangling
    }
}

/// Inserts unless the name is taken; returns false for a dropped duplicate.
fn insert_first<T>(collection: &mut IndexMap<String, T>, name: String, entry: T) -> bool {
    if collection.contains_key(&name) {
        debug!(name = %name, "Duplicate library entry, keeping the first");
        return false;
    }
    collection.insert(name, entry);
    true
}

fn apply_footprint_ref(symbol: &mut SymbolEntry, reference: Option<&str>) {
    match reference {
        Some(reference) => symbol.set_footprint_ref(reference),
        None => {
            if symbol.property("Footprint").is_some() {
                symbol.set_footprint_ref("");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kicad::Sexpr;

    fn footprint(name: &str, builtin: bool) -> FootprintEntry {
        FootprintEntry {
            footprint_name: name.to_string(),
            mod_data: Sexpr::list("footprint", [Sexpr::string(name)])
                .with(Sexpr::list("property", [Sexpr::string("Footprint"), Sexpr::string(name)]))
                .with(Sexpr::list("property", [Sexpr::string("Value"), Sexpr::string("")])),
            model_3d_source_paths: Vec::new(),
            is_builtin: builtin,
        }
    }

    fn symbol(name: &str, footprint_ref: &str) -> SymbolEntry {
        SymbolEntry {
            symbol_name: name.to_string(),
            symbol_data: Sexpr::list("symbol", [Sexpr::string(name)])
                .with(Sexpr::list("property", [Sexpr::string("Value"), Sexpr::string(name)]))
                .with(Sexpr::list(
                    "property",
                    [Sexpr::string("Footprint"), Sexpr::string(footprint_ref)],
                ))
                .with(Sexpr::list("symbol", [Sexpr::string(format!("{name}_0_1"))])),
            is_builtin: false,
        }
    }

    fn component(name: &str, footprints: Vec<FootprintEntry>, symbols: Vec<SymbolEntry>) -> ComponentEntries {
        ComponentEntries {
            component_name: name.to_string(),
            footprints,
            symbols,
        }
    }

    #[test]
    fn standard_resistor_and_custom_chip() {
        let mut ctx = ClassificationContext::new("mylib", "circuit_builtin");
        ctx.classify(component(
            "R1",
            vec![footprint("resistor_0402", true)],
            vec![symbol("resistor", "R1:resistor_0402")],
        ));
        let outcome = ctx.classify(component(
            "U1",
            vec![footprint("U1", false)],
            vec![symbol("U1", "U1:U1")],
        ));

        assert_eq!(outcome.primary_footprint.as_deref(), Some("U1"));
        assert!(ctx.builtin_footprints.contains_key("resistor_0402"));
        assert!(ctx.user_footprints.contains_key("U1"));
        assert_eq!(
            ctx.builtin_symbols["resistor"].footprint_ref(),
            Some("circuit_builtin:resistor_0402")
        );
        assert_eq!(ctx.user_symbols["U1"].footprint_ref(), Some("mylib:U1"));
        assert!(ctx.dangling_footprint_refs().is_empty());
    }

    #[test]
    fn primary_footprint_takes_component_name() {
        let mut ctx = ClassificationContext::new("mylib", "builtin");
        let outcome = ctx.classify(component(
            "Sensor Board",
            vec![footprint("custom_a", false), footprint("custom_b", false)],
            vec![symbol("box", "x:custom_a")],
        ));
        assert_eq!(outcome.primary_footprint.as_deref(), Some("Sensor_Board"));
        let names: Vec<&String> = ctx.user_footprints.keys().collect();
        assert_eq!(names, ["Sensor_Board", "custom_b"]);
        assert_eq!(
            ctx.user_footprints["Sensor_Board"].mod_data.property_value("Value"),
            Some("Sensor_Board")
        );

        // The only symbol follows the primary footprint
        let user = &ctx.user_symbols["Sensor_Board"];
        assert_eq!(user.footprint_ref(), Some("mylib:Sensor_Board"));
        assert_eq!(
            user.symbol_data.find("symbol").unwrap().arg_text(0),
            Some("Sensor_Board_0_1")
        );
    }

    #[test]
    fn builtin_symbol_never_points_at_user_footprint() {
        let mut ctx = ClassificationContext::new("mylib", "builtin");
        ctx.classify(component(
            "U2",
            vec![footprint("U2", false)],
            vec![symbol("U2", ""), symbol("led", "U2:U2")],
        ));
        assert_eq!(ctx.builtin_symbols["led"].footprint_ref(), None);
        assert!(ctx.dangling_footprint_refs().is_empty());
    }

    #[test]
    fn shared_custom_symbol_is_kept_once() {
        let mut ctx = ClassificationContext::new("mylib", "builtin");
        ctx.classify(component(
            "R1",
            vec![footprint("resistor_0402", true)],
            vec![symbol("my_symbol", "R1:resistor_0402")],
        ));
        let outcome = ctx.classify(component(
            "R2",
            vec![footprint("resistor_0402", true)],
            vec![symbol("my_symbol", "R2:resistor_0402")],
        ));
        assert_eq!(outcome.dropped, 2);
        assert_eq!(ctx.builtin_symbols.len(), 1);
        assert_eq!(ctx.builtin_footprints.len(), 1);
        assert_eq!(
            ctx.builtin_symbols["my_symbol"].footprint_ref(),
            Some("builtin:resistor_0402")
        );
    }

    #[test]
    fn user_symbol_without_primary_is_relinked() {
        let mut ctx = ClassificationContext::new("mylib", "builtin");
        ctx.classify(component(
            "D1",
            vec![footprint("diode_sod123", true)],
            vec![symbol("d1", "D1:diode_sod123")],
        ));
        assert_eq!(ctx.user_symbols["D1"].footprint_ref(), Some("builtin:diode_sod123"));
    }

    #[test]
    fn names_stay_unique_per_collection() {
        let mut ctx = ClassificationContext::new("mylib", "builtin");
        for _ in 0..3 {
            ctx.classify(component("U1", vec![footprint("U1", false)], vec![symbol("U1", "")]));
        }
        assert_eq!(ctx.user_footprints.len(), 1);
        assert_eq!(ctx.user_symbols.len(), 1);
    }
}

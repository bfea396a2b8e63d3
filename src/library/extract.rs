//! Footprint and symbol extraction.
//!
//! Placed footprints and schematic symbol definitions carry placement state
//! (positions, UUIDs, nets, lock flags) and `library:name` identifiers. A
//! library entry must carry none of that. Extraction pulls every distinct
//! entry out of a converted tree and sanitises it into the standalone form
//! KiCad expects inside `.pretty` directories and `.kicad_sym` files.
//!
//! Sanitising is idempotent: running it over its own output changes nothing.

use tracing::{debug, warn};

use crate::convert::transform::normalize_degrees;
use crate::kicad::naming::{rename_unit, strip_lib_prefix};
use crate::kicad::{file_header, parse_sexpr, to_file_text, Sexpr, PCB_VERSION, PROJECT_PATH_VAR};

use super::builtin::BuiltinMatcher;
use super::model_paths::{library_model_path, model_basename, ModelPathMode};

/// Value written into the Reference property of library footprints.
pub const FOOTPRINT_REFERENCE_PLACEHOLDER: &str = "REF**";

/// One footprint ready for a `.pretty` directory.
#[derive(Debug, Clone, PartialEq)]
pub struct FootprintEntry {
    /// Entry name (the `.kicad_mod` file stem).
    pub footprint_name: String,
    /// Sanitised `(footprint ...)` tree.
    pub mod_data: Sexpr,
    /// Model references as they appeared before rewriting.
    pub model_3d_source_paths: Vec<String>,
    /// True for standard parts.
    pub is_builtin: bool,
}

impl FootprintEntry {
    /// Renames the entry and its tree.
    pub fn rename(&mut self, name: &str) {
        self.footprint_name = name.to_string();
        self.mod_data.set_arg(0, Sexpr::string(name));
        self.mod_data.set_property_value("Footprint", name);
        if self
            .mod_data
            .property_value("Value")
            .is_some_and(|v| v.trim().is_empty())
        {
            self.mod_data.set_property_value("Value", name);
        }
    }

    /// The `.kicad_mod` file text.
    #[must_use]
    pub fn to_text(&self) -> String {
        to_file_text(&self.mod_data)
    }
}

/// One symbol ready for a `.kicad_sym` file.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolEntry {
    /// Entry name.
    pub symbol_name: String,
    /// Sanitised `(symbol ...)` tree.
    pub symbol_data: Sexpr,
    /// True for standard symbols.
    pub is_builtin: bool,
}

impl SymbolEntry {
    /// Value of a property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.symbol_data.property_value(key)
    }

    /// The Footprint property, if set and non-blank.
    #[must_use]
    pub fn footprint_ref(&self) -> Option<&str> {
        self.property("Footprint").filter(|v| !v.trim().is_empty())
    }

    /// Sets the Footprint property, adding it if missing.
    pub fn set_footprint_ref(&mut self, value: &str) {
        if !self.symbol_data.set_property_value("Footprint", value) {
            self.symbol_data.push(
                Sexpr::list("property", [Sexpr::string("Footprint"), Sexpr::string(value)])
                    .with(Sexpr::at(0.0, 0.0, 0.0))
                    .with(crate::kicad::effects(1.27, true)),
            );
        }
    }

    /// Renames the symbol together with its unit sub-symbols.
    pub fn rename(&mut self, name: &str) {
        let old = self.symbol_name.clone();
        self.symbol_data.set_arg(0, Sexpr::string(name));
        for unit in self.symbol_data.find_all_mut("symbol") {
            let renamed = unit
                .arg_text(0)
                .and_then(|unit_name| rename_unit(unit_name, &old, name));
            if let Some(renamed) = renamed {
                unit.set_arg(0, Sexpr::string(renamed));
            }
        }
        if self
            .property("Value")
            .is_some_and(|v| v.trim().is_empty() || v == old)
        {
            self.symbol_data.set_property_value("Value", name);
        }
        self.symbol_name = name.to_string();
    }
}

/// Settings for one extraction.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions<'a> {
    /// Library the entries will live in.
    pub library_name: &'a str,
    /// Standard part detection.
    pub matcher: &'a BuiltinMatcher,
}

/// Extracts every distinct footprint from a board tree.
///
/// A bare `(footprint ...)` root is treated as a board with one footprint.
/// The first footprint with a given name wins.
#[must_use]
pub fn extract_footprints(board: &Sexpr, options: ExtractOptions<'_>) -> Vec<FootprintEntry> {
    let candidates: Vec<&Sexpr> = if board.is("footprint") {
        vec![board]
    } else {
        board.find_all("footprint").collect()
    };

    let mut entries: Vec<FootprintEntry> = Vec::new();
    for node in candidates {
        let entry = sanitize_footprint(node, options);
        if entries.iter().any(|e| e.footprint_name == entry.footprint_name) {
            debug!(footprint = %entry.footprint_name, "Footprint already extracted, skipping");
            continue;
        }
        entries.push(entry);
    }
    entries
}

/// Parses board text and extracts its footprints.
///
/// Unparseable text yields no entries and a warning.
#[must_use]
pub fn extract_footprints_from_text(text: &str, options: ExtractOptions<'_>) -> Vec<FootprintEntry> {
    match parse_sexpr(text) {
        Ok(tree) => extract_footprints(&tree, options),
        Err(e) => {
            warn!(error = %e, "Could not re-read board output, no footprints extracted");
            Vec::new()
        }
    }
}

/// Extracts every symbol definition from a schematic tree.
///
/// Accepts a `kicad_sch` root (reads `lib_symbols`) or a `kicad_symbol_lib`
/// root. The first symbol with a given name wins.
#[must_use]
pub fn extract_symbols(schematic: &Sexpr, options: ExtractOptions<'_>) -> Vec<SymbolEntry> {
    let candidates: Vec<&Sexpr> = if schematic.is("kicad_symbol_lib") {
        schematic.find_all("symbol").collect()
    } else {
        schematic
            .find("lib_symbols")
            .map(|lib| lib.find_all("symbol").collect())
            .unwrap_or_default()
    };

    let mut entries: Vec<SymbolEntry> = Vec::new();
    for node in candidates {
        let entry = sanitize_symbol(node, options);
        if entries.iter().any(|e| e.symbol_name == entry.symbol_name) {
            debug!(symbol = %entry.symbol_name, "Symbol already extracted, skipping");
            continue;
        }
        entries.push(entry);
    }
    entries
}

/// Parses schematic text and extracts its symbols.
///
/// Unparseable text yields no entries and a warning.
#[must_use]
pub fn extract_symbols_from_text(text: &str, options: ExtractOptions<'_>) -> Vec<SymbolEntry> {
    match parse_sexpr(text) {
        Ok(tree) => extract_symbols(&tree, options),
        Err(e) => {
            warn!(error = %e, "Could not re-read schematic output, no symbols extracted");
            Vec::new()
        }
    }
}

/// Sanitises one placed footprint into a library entry.
#[must_use]
pub fn sanitize_footprint(node: &Sexpr, options: ExtractOptions<'_>) -> FootprintEntry {
    let mut footprint = node.clone();
    let name = strip_lib_prefix(footprint.arg_text(0).unwrap_or_default()).to_string();
    footprint.set_arg(0, Sexpr::string(name.as_str()));

    let placement_angle = footprint
        .find("at")
        .and_then(|at| at.arg_f64(2))
        .unwrap_or(0.0);
    footprint.remove_all("at");
    footprint.remove_recursive("uuid");
    for flag in ["locked", "placed"] {
        footprint.remove_flag(flag);
        footprint.remove_all(flag);
    }
    for head in ["version", "generator", "generator_version"] {
        footprint.remove_all(head);
    }
    for pad in footprint.find_all_mut("pad") {
        pad.remove_all("net");
    }
    if placement_angle != 0.0 {
        undo_placement_rotation(&mut footprint, placement_angle);
    }

    footprint.set_property_value("Reference", FOOTPRINT_REFERENCE_PLACEHOLDER);
    if footprint
        .property_value("Value")
        .is_some_and(|v| v.trim().is_empty())
    {
        footprint.set_property_value("Value", name.as_str());
    }
    footprint.set_property_value("Footprint", name.as_str());

    if let Some(items) = footprint.items_mut() {
        for (offset, item) in file_header(PCB_VERSION).into_iter().enumerate() {
            items.insert(2 + offset, item);
        }
    }

    let model_3d_source_paths = localise_models(&mut footprint, options.library_name);

    FootprintEntry {
        is_builtin: options.matcher.is_builtin(&name),
        footprint_name: name,
        mod_data: footprint,
        model_3d_source_paths,
    }
}

/// Sanitises one symbol definition into a library entry.
#[must_use]
pub fn sanitize_symbol(node: &Sexpr, options: ExtractOptions<'_>) -> SymbolEntry {
    let mut symbol = node.clone();
    let name = strip_lib_prefix(symbol.arg_text(0).unwrap_or_default()).to_string();
    symbol.set_arg(0, Sexpr::string(name.as_str()));
    for unit in symbol.find_all_mut("symbol") {
        let stripped = unit
            .arg_text(0)
            .map(|unit_name| strip_lib_prefix(unit_name).to_string());
        if let Some(stripped) = stripped {
            unit.set_arg(0, Sexpr::string(stripped));
        }
    }
    symbol.remove_recursive("uuid");
    if symbol
        .property_value("Value")
        .is_some_and(|v| v.trim().is_empty())
    {
        symbol.set_property_value("Value", name.as_str());
    }

    SymbolEntry {
        is_builtin: options.matcher.is_builtin_symbol(&name),
        symbol_name: name,
        symbol_data: symbol,
    }
}

/// Child `at` angles of a placed footprint include the placement angle.
fn undo_placement_rotation(footprint: &mut Sexpr, angle: f64) {
    let Some(items) = footprint.items_mut() else {
        return;
    };
    for item in items
        .iter_mut()
        .filter(|item| item.is("property") || item.is("fp_text") || item.is("pad"))
    {
        if let Some(at) = item.find_mut("at") {
            let local = at.arg_f64(2).map(|a| normalize_degrees(a - angle));
            if let Some(local) = local {
                at.set_arg(2, Sexpr::number(local));
            }
        }
    }
}

/// Points model references at the library's model directory.
///
/// Stock KiCad references (any `${VAR}` other than the project variable)
/// are left alone. Returns the original references that were rewritten.
fn localise_models(footprint: &mut Sexpr, library: &str) -> Vec<String> {
    let mut sources = Vec::new();
    for model in footprint.find_all_mut("model") {
        let Some(existing) = model.arg_text(0).map(str::to_string) else {
            continue;
        };
        if existing.starts_with("${") && !existing.starts_with(PROJECT_PATH_VAR) {
            continue;
        }
        let Some(basename) = model_basename(&existing) else {
            warn!(model = %existing, "Model reference has no file name, leaving it");
            continue;
        };
        let local = library_model_path(library, basename, &ModelPathMode::ProjectLocal);
        if local != existing {
            sources.push(existing);
        }
        model.set_arg(0, Sexpr::string(local));
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: &str = r#"(kicad_pcb
        (footprint "circuit:resistor_0402" (layer "F.Cu") (uuid "u1") (at 10 20 90) locked
            (property "Reference" "R1" (at 0 -1.5 90) (layer "F.SilkS"))
            (property "Value" "" (at 0 1.5 90) (layer "F.Fab"))
            (property "Footprint" "circuit:resistor_0402" (at 0 0 90) (layer "F.Fab"))
            (pad "1" smd rect (at -0.5 0 90) (size 0.5 0.6) (layers "F.Cu") (net 1 "VCC") (uuid "p1"))
            (model "https://models.example/r0402.step" (offset (xyz 0 0 0))))
        (footprint "circuit:resistor_0402" (layer "F.Cu") (uuid "u2") (at 30 20 0)))"#;

    fn options(matcher: &BuiltinMatcher) -> ExtractOptions<'_> {
        ExtractOptions {
            library_name: "mylib",
            matcher,
        }
    }

    #[test]
    fn footprint_is_stripped_of_placement_state() {
        let matcher = BuiltinMatcher::standard();
        let entries = extract_footprints_from_text(BOARD, options(&matcher));
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.footprint_name, "resistor_0402");
        assert!(entry.is_builtin);
        let text = entry.to_text();
        assert!(text.starts_with("(footprint \"resistor_0402\""));
        assert!(!text.contains("uuid"));
        assert!(!text.contains("locked"));
        assert!(!text.contains("(net "));
        assert!(!text.contains("(at 10 20"));
        assert_eq!(entry.mod_data.property_value("Reference"), Some("REF**"));
        assert_eq!(entry.mod_data.property_value("Value"), Some("resistor_0402"));
        assert_eq!(entry.mod_data.property_value("Footprint"), Some("resistor_0402"));
    }

    #[test]
    fn child_angles_become_local() {
        let matcher = BuiltinMatcher::standard();
        let entries = extract_footprints_from_text(BOARD, options(&matcher));
        let pad = entries[0].mod_data.find("pad").unwrap();
        assert_eq!(pad.find("at").unwrap().arg_f64(2), Some(0.0));
    }

    #[test]
    fn models_move_into_the_library() {
        let matcher = BuiltinMatcher::standard();
        let entries = extract_footprints_from_text(BOARD, options(&matcher));
        let entry = &entries[0];
        assert_eq!(
            entry.mod_data.find("model").unwrap().arg_text(0),
            Some("${KIPRJMOD}/mylib.3dshapes/r0402.step")
        );
        assert_eq!(entry.model_3d_source_paths, ["https://models.example/r0402.step"]);
    }

    #[test]
    fn stock_models_are_left_alone() {
        let matcher = BuiltinMatcher::standard();
        let board = r#"(footprint "x" (model "${KICAD9_3DMODEL_DIR}/R.3dshapes/R.step"))"#;
        let entries = extract_footprints_from_text(board, options(&matcher));
        assert!(entries[0].model_3d_source_paths.is_empty());
        assert_eq!(
            entries[0].mod_data.find("model").unwrap().arg_text(0),
            Some("${KICAD9_3DMODEL_DIR}/R.3dshapes/R.step")
        );
    }

    #[test]
    fn sanitising_twice_changes_nothing() {
        let matcher = BuiltinMatcher::standard();
        let once = extract_footprints_from_text(BOARD, options(&matcher));
        let twice = extract_footprints(&once[0].mod_data, options(&matcher));
        assert_eq!(twice[0].mod_data, once[0].mod_data);
    }

    #[test]
    fn unparseable_text_yields_nothing() {
        let matcher = BuiltinMatcher::standard();
        assert!(extract_footprints_from_text("(kicad_pcb", options(&matcher)).is_empty());
        assert!(extract_symbols_from_text("(kicad_sch", options(&matcher)).is_empty());
    }

    #[test]
    fn symbols_lose_prefix_and_uuid() {
        let matcher = BuiltinMatcher::standard();
        let sch = r#"(kicad_sch (lib_symbols
            (symbol "circuit:box" (uuid "s")
                (property "Value" "")
                (property "Footprint" "circuit:box")
                (symbol "box_0_1") (symbol "box_1_1"))))"#;
        let entries = extract_symbols_from_text(sch, options(&matcher));
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.symbol_name, "box");
        assert!(!entry.is_builtin);
        assert_eq!(entry.property("Value"), Some("box"));
        assert_eq!(entry.footprint_ref(), Some("circuit:box"));
        assert!(!entry.symbol_data.to_string().contains("uuid"));
    }

    #[test]
    fn symbol_rename_carries_units() {
        let matcher = BuiltinMatcher::standard();
        let sch = r#"(kicad_symbol_lib (symbol "box" (property "Value" "box")
            (symbol "box_0_1") (symbol "box_1_1")))"#;
        let mut entry = extract_symbols_from_text(sch, options(&matcher)).remove(0);
        entry.rename("U1");
        let units: Vec<&str> = entry
            .symbol_data
            .find_all("symbol")
            .filter_map(|u| u.arg_text(0))
            .collect();
        assert_eq!(units, ["U1_0_1", "U1_1_1"]);
        assert_eq!(entry.property("Value"), Some("U1"));
    }
}

//! Which symbol and footprint a component uses.
//!
//! The schematic and PCB converters must agree on names: a symbol's
//! `Footprint` property has to point at the footprint the board embeds for
//! the same component. Both sides call into this module.
//!
//! # Footprint names
//!
//! | Input                                   | Footprint name      |
//! |-----------------------------------------|---------------------|
//! | `kicad_footprint.footprint_name = "X"`  | `X`                 |
//! | `simple_resistor` + `footprinter "0402"`| `resistor_0402`     |
//! | neither                                 | component name      |
//!
//! # Symbol names
//!
//! An explicit schematic `symbol_name` wins, then the standard symbol for the
//! functional type, then the component name.

use crate::circuit::{SchematicComponent, SourceComponent};
use crate::kicad::naming::sanitize_name;

/// Standard symbol names, by functional type without the `simple_` prefix.
pub const STANDARD_SYMBOLS: &[&str] = &[
    "battery",
    "capacitor",
    "crystal",
    "diode",
    "fuse",
    "inductor",
    "led",
    "mosfet",
    "potentiometer",
    "push_button",
    "resistor",
    "switch",
    "transistor",
];

/// Functional kind of a component: its `ftype` without the `simple_` prefix.
#[must_use]
pub fn component_kind(component: &SourceComponent) -> String {
    component
        .ftype
        .as_deref()
        .map(|f| f.trim().trim_start_matches("simple_"))
        .filter(|f| !f.is_empty())
        .map_or_else(|| "component".to_string(), sanitize_name)
}

/// Footprint name the board uses for `component`.
#[must_use]
pub fn footprint_name(component: &SourceComponent) -> String {
    if let Some(name) = component
        .kicad_footprint
        .as_ref()
        .and_then(|m| m.footprint_name.as_deref())
        .filter(|n| !n.trim().is_empty())
    {
        return sanitize_name(name);
    }

    match component
        .footprinter_string
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
    {
        Some(footprinter) => sanitize_name(&format!(
            "{}_{}",
            component_kind(component),
            footprinter.to_lowercase()
        )),
        None => sanitize_name(&component.name),
    }
}

/// Symbol name the schematic uses for `component`.
#[must_use]
pub fn symbol_name(component: &SourceComponent, placement: Option<&SchematicComponent>) -> String {
    if let Some(name) = placement
        .and_then(|p| p.symbol_name.as_deref())
        .filter(|n| !n.trim().is_empty())
    {
        return sanitize_name(name);
    }

    let kind = component_kind(component);
    if STANDARD_SYMBOLS.contains(&kind.as_str()) {
        return kind;
    }
    sanitize_name(&component.name)
}

/// Reference designator prefix: the leading letters of the component name.
///
/// `R12` gives `R`, `LED3` gives `LED`; names without leading letters give `U`.
#[must_use]
pub fn reference_prefix(name: &str) -> String {
    let prefix: String = name
        .trim()
        .chars()
        .take_while(char::is_ascii_alphabetic)
        .collect();
    if prefix.is_empty() {
        "U".to_string()
    } else {
        prefix
    }
}

/// Value text for `component`: its display value, else its name.
#[must_use]
pub fn value_text(component: &SourceComponent) -> String {
    component
        .display_value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(&component.name)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{FootprintMetadata, Point, Size};

    fn component(name: &str, ftype: Option<&str>, footprinter: Option<&str>) -> SourceComponent {
        SourceComponent {
            source_component_id: "sc0".into(),
            name: name.into(),
            ftype: ftype.map(Into::into),
            footprinter_string: footprinter.map(Into::into),
            display_value: None,
            manufacturer_part_number: None,
            kicad_symbol: None,
            kicad_footprint: None,
        }
    }

    #[test]
    fn footprint_from_footprinter() {
        let r = component("R1", Some("simple_resistor"), Some("0402"));
        assert_eq!(footprint_name(&r), "resistor_0402");

        let u = component("U1", Some("simple_chip"), None);
        assert_eq!(footprint_name(&u), "U1");

        let odd = component("X1", None, Some("SOIC8"));
        assert_eq!(footprint_name(&odd), "component_soic8");
    }

    #[test]
    fn footprint_override_wins() {
        let mut r = component("R1", Some("simple_resistor"), Some("0402"));
        r.kicad_footprint = Some(FootprintMetadata {
            footprint_name: Some("My Pad".into()),
            ..FootprintMetadata::default()
        });
        assert_eq!(footprint_name(&r), "My_Pad");
    }

    #[test]
    fn symbol_naming_order() {
        let r = component("R1", Some("simple_resistor"), Some("0402"));
        assert_eq!(symbol_name(&r, None), "resistor");

        let u = component("U1", Some("simple_chip"), None);
        assert_eq!(symbol_name(&u, None), "U1");

        let placement = SchematicComponent {
            schematic_component_id: "s0".into(),
            source_component_id: "sc0".into(),
            center: Point::default(),
            size: Size::default(),
            rotation: 0.0,
            symbol_name: Some("shared_box".into()),
        };
        assert_eq!(symbol_name(&u, Some(&placement)), "shared_box");
    }

    #[test]
    fn reference_prefixes() {
        assert_eq!(reference_prefix("R12"), "R");
        assert_eq!(reference_prefix("LED3"), "LED");
        assert_eq!(reference_prefix("42"), "U");
    }
}

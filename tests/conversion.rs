//! End-to-end schematic and board conversion tests.

mod common;

use std::collections::BTreeSet;

use circuit_to_kicad::convert::{ConvertOptions, PcbConverter, SchematicConverter};
use circuit_to_kicad::kicad::{parse_sexpr, to_file_text, Sexpr};
use common::{chip, children, circuit, resistor, two_part_board};

fn board_tree() -> Sexpr {
    PcbConverter::convert(two_part_board(), ConvertOptions::default()).unwrap()
}

/// Net id declared for `name` at the board root.
fn net_id(board: &Sexpr, name: &str) -> String {
    children(board, "net")
        .into_iter()
        .find(|n| n.arg_text(1) == Some(name))
        .and_then(|n| n.arg_text(0))
        .map(str::to_string)
        .unwrap_or_else(|| panic!("net {name} not declared"))
}

/// Net id of pad `number` in the footprint whose Reference is `reference`.
fn pad_net_id(board: &Sexpr, reference: &str, number: &str) -> Option<String> {
    let footprint = children(board, "footprint")
        .into_iter()
        .find(|f| f.property_value("Reference") == Some(reference))?;
    let pad = footprint
        .find_all("pad")
        .find(|p| p.arg_text(0) == Some(number))?;
    pad.find("net")?.arg_text(0).map(str::to_string)
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn schematic_conversion_is_deterministic() {
    let first = SchematicConverter::convert(two_part_board(), ConvertOptions::default()).unwrap();
    let second = SchematicConverter::convert(two_part_board(), ConvertOptions::default()).unwrap();
    assert_eq!(to_file_text(&first), to_file_text(&second));
}

#[test]
fn board_conversion_is_deterministic() {
    assert_eq!(to_file_text(&board_tree()), to_file_text(&board_tree()));
}

#[test]
fn output_text_parses_back() {
    let board = board_tree();
    assert_eq!(parse_sexpr(&to_file_text(&board)).unwrap(), board);
}

// =============================================================================
// Schematic
// =============================================================================

#[test]
fn schematic_has_one_definition_per_symbol_and_one_instance_per_part() {
    let sch = SchematicConverter::convert(two_part_board(), ConvertOptions::default()).unwrap();
    assert!(sch.is("kicad_sch"));

    let definitions: Vec<&str> = sch
        .find("lib_symbols")
        .unwrap()
        .find_all("symbol")
        .filter_map(|s| s.arg_text(0))
        .collect();
    assert_eq!(definitions, ["circuit:resistor", "circuit:U1"]);

    let instances = children(&sch, "symbol");
    assert_eq!(instances.len(), 2);
    let references: BTreeSet<&str> = instances
        .iter()
        .filter_map(|s| s.property_value("Reference"))
        .collect();
    assert_eq!(references, BTreeSet::from(["R1", "U1"]));
}

#[test]
fn components_sharing_a_symbol_share_one_definition() {
    let mut elements = resistor("R1", -2.0);
    elements.extend(resistor("R2", 2.0));
    let sch = SchematicConverter::convert(circuit(elements), ConvertOptions::default()).unwrap();

    let lib_symbols = sch.find("lib_symbols").unwrap();
    assert_eq!(lib_symbols.find_all("symbol").count(), 1);
    for instance in children(&sch, "symbol") {
        assert_eq!(
            instance.find("lib_id").and_then(|l| l.arg_text(0)),
            Some("circuit:resistor")
        );
    }
}

#[test]
fn chips_naming_one_custom_symbol_share_its_definition() {
    let mut elements = Vec::new();
    for (name, x) in [("U1", -4.0), ("U2", 4.0)] {
        let mut chip = chip(name, x);
        for element in &mut chip {
            if element["type"] == "schematic_component" {
                element["symbol_name"] = "sensor".into();
            }
        }
        elements.extend(chip);
    }
    let sch = SchematicConverter::convert(circuit(elements), ConvertOptions::default()).unwrap();

    let definitions: Vec<&str> = sch
        .find("lib_symbols")
        .unwrap()
        .find_all("symbol")
        .filter_map(|s| s.arg_text(0))
        .collect();
    assert_eq!(definitions, ["circuit:sensor"]);

    let instances = children(&sch, "symbol");
    assert_eq!(instances.len(), 2);
    for instance in instances {
        assert_eq!(
            instance.find("lib_id").and_then(|l| l.arg_text(0)),
            Some("circuit:sensor")
        );
    }
}

// =============================================================================
// Board
// =============================================================================

#[test]
fn footprints_use_library_names() {
    let board = board_tree();
    let names: Vec<&str> = children(&board, "footprint")
        .into_iter()
        .filter_map(|f| f.arg_text(0))
        .collect();
    assert_eq!(names, ["circuit:resistor_0402", "circuit:U1"]);
}

#[test]
fn connected_pads_share_a_net() {
    let board = board_tree();
    let vcc = net_id(&board, "VCC");
    let gnd = net_id(&board, "GND");
    assert_ne!(vcc, gnd);

    assert_eq!(pad_net_id(&board, "R1", "2").as_deref(), Some(vcc.as_str()));
    assert_eq!(pad_net_id(&board, "U1", "1").as_deref(), Some(vcc.as_str()));
    assert_eq!(pad_net_id(&board, "R1", "1").as_deref(), Some(gnd.as_str()));
    assert_eq!(pad_net_id(&board, "U1", "2").as_deref(), Some(gnd.as_str()));
    // Unconnected pads carry no net
    assert_eq!(pad_net_id(&board, "U1", "3"), None);
}

#[test]
fn multilayer_route_gets_vias_and_segments_on_each_layer() {
    let board = board_tree();
    let vcc = net_id(&board, "VCC");

    let vias = children(&board, "via");
    assert_eq!(vias.len(), 2);
    let segments = children(&board, "segment");
    let layers: BTreeSet<&str> = segments
        .iter()
        .filter_map(|s| s.find("layer").and_then(|l| l.arg_text(0)))
        .collect();
    assert_eq!(layers, BTreeSet::from(["B.Cu", "F.Cu", "In1.Cu"]));

    for item in vias.iter().chain(segments.iter()) {
        assert_eq!(item.find("net").and_then(|n| n.arg_text(0)), Some(vcc.as_str()));
    }

    // Both vias stop short of one outer layer
    for via in &vias {
        assert!(via.items().iter().any(|i| i.as_text() == Some("blind")));
    }
}

#[test]
fn inner_layers_are_declared() {
    let board = board_tree();
    let layers = board.find("layers").unwrap();
    let copper: Vec<&str> = layers
        .args()
        .iter()
        .filter_map(|l| l.arg_text(0))
        .filter(|name| name.ends_with(".Cu"))
        .collect();
    assert_eq!(copper, ["F.Cu", "In1.Cu", "In2.Cu", "B.Cu"]);
}

#[test]
fn board_outline_is_on_edge_cuts() {
    let board = board_tree();
    let outline = children(&board, "gr_rect")
        .into_iter()
        .chain(children(&board, "gr_poly"))
        .find(|g| g.find("layer").and_then(|l| l.arg_text(0)) == Some("Edge.Cuts"));
    assert!(outline.is_some());
}

#[test]
fn stepping_reaches_the_same_result() {
    let mut converter = PcbConverter::new(two_part_board(), ConvertOptions::default());
    let mut steps = 0;
    while !converter.is_finished() {
        converter.step().unwrap();
        steps += 1;
    }
    assert!(steps > 6);
    assert_eq!(converter.output().unwrap(), &board_tree());
}

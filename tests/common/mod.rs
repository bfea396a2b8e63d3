//! Circuit-description fixtures shared by the integration tests.
//!
//! Element ids are prefixed with the component name so fixtures can be
//! combined into one circuit.

#![allow(dead_code)]

use circuit_to_kicad::circuit::CircuitIndex;
use circuit_to_kicad::kicad::Sexpr;
use serde_json::{json, Value};

/// A 0402 resistor with two pads, placed at `x`.
pub fn resistor(name: &str, x: f64) -> Vec<Value> {
    let mut elements = vec![
        json!({
            "type": "source_component", "source_component_id": format!("{name}_sc"),
            "name": name, "ftype": "simple_resistor", "footprinter_string": "0402",
            "display_value": "10k"
        }),
        json!({
            "type": "schematic_component", "schematic_component_id": format!("{name}_sch"),
            "source_component_id": format!("{name}_sc"),
            "center": {"x": x, "y": 0}, "size": {"width": 1.0, "height": 0.4}
        }),
        json!({
            "type": "pcb_component", "pcb_component_id": format!("{name}_pc"),
            "source_component_id": format!("{name}_sc"),
            "center": {"x": x, "y": 0}, "layer": "top", "width": 1.0, "height": 0.6
        }),
    ];
    for (pin, dx, facing) in [(1, -0.5, "left"), (2, 0.5, "right")] {
        elements.extend(port(name, pin, x + dx, 0.0, facing, 0.5, 0.6));
    }
    elements
}

/// A hand-made chip with four pads and a 3D model, placed at `x`.
pub fn chip(name: &str, x: f64) -> Vec<Value> {
    let mut elements = vec![
        json!({
            "type": "source_component", "source_component_id": format!("{name}_sc"),
            "name": name, "ftype": "simple_chip"
        }),
        json!({
            "type": "schematic_component", "schematic_component_id": format!("{name}_sch"),
            "source_component_id": format!("{name}_sc"),
            "center": {"x": x, "y": 0}, "size": {"width": 1.2, "height": 1.2}
        }),
        json!({
            "type": "pcb_component", "pcb_component_id": format!("{name}_pc"),
            "source_component_id": format!("{name}_sc"),
            "center": {"x": x, "y": 0}, "layer": "top", "rotation": 90, "width": 3.0, "height": 3.0
        }),
        json!({
            "type": "cad_component", "cad_component_id": format!("{name}_cad"),
            "pcb_component_id": format!("{name}_pc"), "source_component_id": format!("{name}_sc"),
            "position": {"x": x, "y": 0, "z": 0},
            "model_step_url": format!("https://models.example/{name}.step")
        }),
    ];
    let pins = [
        (1, -1.0, -0.5, "left"),
        (2, -1.0, 0.5, "left"),
        (3, 1.0, 0.5, "right"),
        (4, 1.0, -0.5, "right"),
    ];
    for (pin, dx, dy, facing) in pins {
        elements.extend(port(name, pin, x + dx, dy, facing, 0.6, 0.4));
    }
    elements
}

/// Source, schematic and PCB port of one pin plus its pad.
fn port(name: &str, pin: u32, x: f64, y: f64, facing: &str, width: f64, height: f64) -> Vec<Value> {
    vec![
        json!({
            "type": "source_port", "source_port_id": format!("{name}_sp{pin}"),
            "source_component_id": format!("{name}_sc"), "name": format!("pin{pin}"),
            "pin_number": pin
        }),
        json!({
            "type": "schematic_port", "schematic_port_id": format!("{name}_schp{pin}"),
            "schematic_component_id": format!("{name}_sch"),
            "source_port_id": format!("{name}_sp{pin}"),
            "center": {"x": x, "y": y}, "facing_direction": facing, "pin_number": pin
        }),
        json!({
            "type": "pcb_port", "pcb_port_id": format!("{name}_pp{pin}"),
            "source_port_id": format!("{name}_sp{pin}"),
            "pcb_component_id": format!("{name}_pc"), "x": x, "y": y, "layers": ["top"]
        }),
        json!({
            "type": "pcb_smtpad", "pcb_smtpad_id": format!("{name}_pad{pin}"),
            "pcb_component_id": format!("{name}_pc"), "pcb_port_id": format!("{name}_pp{pin}"),
            "shape": "rect", "x": x, "y": y, "width": width, "height": height, "layer": "top"
        }),
    ]
}

/// A named net joined to ports under one connectivity key.
pub fn net(id: &str, name: &str, key: &str, ports: &[&str]) -> Vec<Value> {
    vec![
        json!({
            "type": "source_net", "source_net_id": format!("{id}_net"), "name": name,
            "subcircuit_connectivity_map_key": key
        }),
        json!({
            "type": "source_trace", "source_trace_id": id,
            "connected_source_port_ids": ports,
            "connected_source_net_ids": [format!("{id}_net")],
            "subcircuit_connectivity_map_key": key
        }),
    ]
}

/// A four-point route: top wire, via to inner 1, via to bottom, bottom wire.
pub fn multilayer_route(id: &str, source_trace_id: &str) -> Value {
    json!({
        "type": "pcb_trace", "pcb_trace_id": id, "source_trace_id": source_trace_id,
        "route": [
            {"route_type": "wire", "x": -1.0, "y": 0.0, "width": 0.2, "layer": "top"},
            {"route_type": "via", "x": 0.0, "y": 0.0, "from_layer": "top", "to_layer": "inner1"},
            {"route_type": "via", "x": 0.0, "y": 1.0, "from_layer": "inner1", "to_layer": "bottom"},
            {"route_type": "wire", "x": 1.0, "y": 1.0, "width": 0.2, "layer": "bottom"}
        ]
    })
}

/// A 20 × 10 mm board centred on the origin.
pub fn board() -> Value {
    json!({
        "type": "pcb_board", "pcb_board_id": "board", "center": {"x": 0, "y": 0},
        "width": 20.0, "height": 10.0
    })
}

/// Indexes a list of elements.
pub fn circuit(elements: Vec<Value>) -> CircuitIndex {
    let json = Value::Array(elements).to_string();
    CircuitIndex::from_json(&json).expect("fixture is a valid circuit")
}

/// R1 and U1 joined by a VCC net routed across three copper layers.
pub fn two_part_board() -> CircuitIndex {
    let mut elements = vec![board()];
    elements.extend(resistor("R1", -4.0));
    elements.extend(chip("U1", 4.0));
    elements.extend(net("vcc", "VCC", "net_vcc", &["R1_sp2", "U1_sp1"]));
    elements.extend(net("gnd", "GND", "net_gnd", &["R1_sp1", "U1_sp2"]));
    elements.push(multilayer_route("route0", "vcc"));
    circuit(elements)
}

/// Direct children of `root` with head `head`.
pub fn children<'a>(root: &'a Sexpr, head: &'a str) -> Vec<&'a Sexpr> {
    root.find_all(head).collect()
}

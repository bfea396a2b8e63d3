//! Typed circuit description elements.
//!
//! A circuit description is a flat JSON array of objects discriminated by
//! their `"type"` field. Elements refer to each other through `*_id` foreign
//! keys (a PCB pad names its `pcb_component_id`, a port names its
//! `source_component_id`, ...). Unknown element types deserialise to
//! [`CircuitElement::Unknown`] and are ignored by the converters.
//!
//! Units: PCB geometry is in millimetres with the Y axis pointing up;
//! schematic geometry is in schematic units with the Y axis pointing up.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl Point {
    /// Creates a point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A 3D point or rotation triple.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    #[serde(default)]
    pub z: f64,
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// Direction a schematic port or label faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Facing up.
    Up,
    /// Facing down.
    Down,
    /// Facing left.
    #[default]
    Left,
    /// Facing right.
    Right,
}

/// One element of a circuit description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[allow(clippy::large_enum_variant)] // Elements are parsed once and stored
pub enum CircuitElement {
    /// Logical component.
    SourceComponent(SourceComponent),
    /// Logical pin of a component.
    SourcePort(SourcePort),
    /// Named net.
    SourceNet(SourceNet),
    /// Logical connection between ports and nets.
    SourceTrace(SourceTrace),
    /// Schematic placement of a component.
    SchematicComponent(SchematicComponent),
    /// Schematic pin location.
    SchematicPort(SchematicPort),
    /// Schematic wire route.
    SchematicTrace(SchematicTrace),
    /// Schematic net label.
    SchematicNetLabel(SchematicNetLabel),
    /// Board outline.
    PcbBoard(PcbBoard),
    /// PCB placement of a component.
    PcbComponent(PcbComponent),
    /// PCB pin location.
    PcbPort(PcbPort),
    /// Surface-mount pad.
    PcbSmtpad(PcbSmtPad),
    /// Plated through-hole pad.
    PcbPlatedHole(PcbPlatedHole),
    /// Non-plated hole.
    PcbHole(PcbHole),
    /// Copper route.
    PcbTrace(PcbTrace),
    /// Standalone via.
    PcbVia(PcbVia),
    /// Silkscreen text.
    PcbSilkscreenText(PcbSilkscreenText),
    /// Silkscreen polyline.
    PcbSilkscreenPath(PcbSilkscreenPath),
    /// 3D model reference.
    CadComponent(CadComponent),
    /// Any element type the converters do not use.
    #[serde(other)]
    Unknown,
}

/// Logical component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceComponent {
    /// Unique id.
    pub source_component_id: String,
    /// Reference designator or instance name (e.g. "R1").
    pub name: String,
    /// Functional type (e.g. `simple_resistor`, `simple_chip`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ftype: Option<String>,
    /// Standard footprint shorthand (e.g. "0402", "soic8").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footprinter_string: Option<String>,
    /// Human readable value (e.g. "10k").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
    /// Manufacturer part number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer_part_number: Option<String>,
    /// Symbol overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kicad_symbol: Option<SymbolMetadata>,
    /// Footprint overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kicad_footprint: Option<FootprintMetadata>,
}

/// Per-component symbol overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SymbolMetadata {
    /// Explicit property values (`Reference`, `Value`, `Description`, ...).
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Include in bill of materials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_bom: Option<bool>,
    /// Transfer to the board.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_board: Option<bool>,
    /// Exclude from simulation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_from_sim: Option<bool>,
    /// Embed fonts in the symbol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_fonts: Option<bool>,
}

/// Per-component footprint overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FootprintMetadata {
    /// Explicit footprint name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footprint_name: Option<String>,
    /// Explicit property values.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Attribute flag overrides.
    #[serde(default)]
    pub attributes: AttributeOverrides,
    /// Embed fonts in the footprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_fonts: Option<bool>,
}

/// Footprint attribute overrides; `None` keeps the derived value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct AttributeOverrides {
    /// Through-hole mounting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through_hole: Option<bool>,
    /// Surface mounting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smd: Option<bool>,
    /// Board-only (not in schematic).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_only: Option<bool>,
    /// Exclude from position files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_from_pos_files: Option<bool>,
    /// Exclude from bill of materials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_from_bom: Option<bool>,
    /// Allow a missing courtyard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_missing_courtyard: Option<bool>,
    /// Do not populate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dnp: Option<bool>,
}

/// Logical pin of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePort {
    /// Unique id.
    pub source_port_id: String,
    /// Owning component.
    pub source_component_id: String,
    /// Pin name.
    pub name: String,
    /// Pin number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_number: Option<u32>,
    /// Alternative names.
    #[serde(default)]
    pub port_hints: Vec<String>,
    /// Connectivity key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcircuit_connectivity_map_key: Option<String>,
}

/// Named net.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceNet {
    /// Unique id.
    pub source_net_id: String,
    /// Net name (e.g. "GND").
    pub name: String,
    /// Connectivity key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcircuit_connectivity_map_key: Option<String>,
    /// Ground net.
    #[serde(default)]
    pub is_ground: bool,
    /// Power net.
    #[serde(default)]
    pub is_power: bool,
}

/// Logical connection between ports and nets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTrace {
    /// Unique id.
    pub source_trace_id: String,
    /// Ports joined by this trace.
    #[serde(default)]
    pub connected_source_port_ids: Vec<String>,
    /// Nets joined by this trace.
    #[serde(default)]
    pub connected_source_net_ids: Vec<String>,
    /// Connectivity key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcircuit_connectivity_map_key: Option<String>,
}

/// Schematic placement of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchematicComponent {
    /// Unique id.
    pub schematic_component_id: String,
    /// Logical component.
    pub source_component_id: String,
    /// Body centre.
    pub center: Point,
    /// Body size.
    #[serde(default)]
    pub size: Size,
    /// Clockwise rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
    /// Shared symbol name; components with the same name share one definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_name: Option<String>,
}

/// Schematic pin location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchematicPort {
    /// Unique id.
    pub schematic_port_id: String,
    /// Owning schematic component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schematic_component_id: Option<String>,
    /// Logical port.
    pub source_port_id: String,
    /// Pin tip location.
    pub center: Point,
    /// Side of the body the pin sticks out of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facing_direction: Option<Direction>,
    /// Pin number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_number: Option<u32>,
}

/// A straight schematic wire piece.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchematicEdge {
    /// Start point.
    pub from: Point,
    /// End point.
    pub to: Point,
}

/// Schematic wire route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchematicTrace {
    /// Unique id.
    pub schematic_trace_id: String,
    /// Logical trace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_trace_id: Option<String>,
    /// Wire pieces.
    #[serde(default)]
    pub edges: Vec<SchematicEdge>,
    /// Junction dots.
    #[serde(default)]
    pub junctions: Vec<Point>,
}

/// Schematic net label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchematicNetLabel {
    /// Labelled net.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_net_id: Option<String>,
    /// Anchor point.
    pub center: Point,
    /// Label text.
    pub text: String,
    /// Side the label attaches on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_side: Option<Direction>,
}

/// Board outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbBoard {
    /// Unique id.
    pub pcb_board_id: String,
    /// Board centre.
    pub center: Point,
    /// Board width.
    pub width: f64,
    /// Board height.
    pub height: f64,
    /// Board thickness in mm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness: Option<f64>,
    /// Number of copper layers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_layers: Option<u32>,
    /// Polygon outline; overrides the rectangle when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Vec<Point>>,
}

/// PCB placement of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbComponent {
    /// Unique id.
    pub pcb_component_id: String,
    /// Logical component.
    pub source_component_id: String,
    /// Placement centre.
    pub center: Point,
    /// Placement layer (`top` or `bottom`).
    #[serde(default = "default_layer")]
    pub layer: String,
    /// Clockwise rotation in degrees.
    #[serde(default)]
    pub rotation: f64,
    /// Body width.
    #[serde(default)]
    pub width: f64,
    /// Body height.
    #[serde(default)]
    pub height: f64,
}

fn default_layer() -> String {
    "top".to_string()
}

/// PCB pin location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbPort {
    /// Unique id.
    pub pcb_port_id: String,
    /// Logical port.
    pub source_port_id: String,
    /// Owning component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_component_id: Option<String>,
    /// X position.
    pub x: f64,
    /// Y position.
    pub y: f64,
    /// Copper layers the port is reachable on.
    #[serde(default)]
    pub layers: Vec<String>,
}

/// Surface-mount pad. Which size fields are required depends on `shape`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbSmtPad {
    /// Unique id.
    pub pcb_smtpad_id: String,
    /// Owning component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_component_id: Option<String>,
    /// Port this pad realises.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_port_id: Option<String>,
    /// `rect`, `rotated_rect`, `circle` or `pill`.
    pub shape: String,
    /// X position.
    pub x: f64,
    /// Y position.
    pub y: f64,
    /// Width (rect, rotated rect, pill).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Height (rect, rotated rect, pill).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Radius (circle).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    /// Counter-clockwise rotation (rotated rect).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ccw_rotation: Option<f64>,
    /// Copper layer.
    #[serde(default = "default_layer")]
    pub layer: String,
    /// Pad names.
    #[serde(default)]
    pub port_hints: Vec<String>,
}

/// Plated through-hole pad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbPlatedHole {
    /// Unique id.
    pub pcb_plated_hole_id: String,
    /// Owning component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_component_id: Option<String>,
    /// Port this hole realises.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_port_id: Option<String>,
    /// `circle`, `oval` or `pill`.
    pub shape: String,
    /// X position.
    pub x: f64,
    /// Y position.
    pub y: f64,
    /// Copper diameter (circle).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_diameter: Option<f64>,
    /// Drill diameter (circle).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole_diameter: Option<f64>,
    /// Copper width (oval, pill).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_width: Option<f64>,
    /// Copper height (oval, pill).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_height: Option<f64>,
    /// Drill width (oval, pill).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole_width: Option<f64>,
    /// Drill height (oval, pill).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole_height: Option<f64>,
    /// Pad names.
    #[serde(default)]
    pub port_hints: Vec<String>,
}

/// Non-plated hole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbHole {
    /// Unique id.
    pub pcb_hole_id: String,
    /// Owning component; board-level holes have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_component_id: Option<String>,
    /// `circle`, `oval` or `pill`.
    #[serde(default = "default_hole_shape")]
    pub hole_shape: String,
    /// X position.
    pub x: f64,
    /// Y position.
    pub y: f64,
    /// Diameter (circle).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole_diameter: Option<f64>,
    /// Width (oval, pill).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole_width: Option<f64>,
    /// Height (oval, pill).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole_height: Option<f64>,
}

fn default_hole_shape() -> String {
    "circle".to_string()
}

/// Copper route made of wire and via points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbTrace {
    /// Unique id.
    pub pcb_trace_id: String,
    /// Logical trace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_trace_id: Option<String>,
    /// Route points in order.
    #[serde(default)]
    pub route: Vec<RoutePoint>,
}

/// One point of a copper route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "route_type", rename_all = "snake_case")]
pub enum RoutePoint {
    /// Point on a copper layer.
    Wire(WirePoint),
    /// Layer change.
    Via(ViaPoint),
}

/// Route point on a copper layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePoint {
    /// X position.
    pub x: f64,
    /// Y position.
    pub y: f64,
    /// Track width.
    pub width: f64,
    /// Copper layer.
    pub layer: String,
    /// Port where the route starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_pcb_port_id: Option<String>,
    /// Port where the route ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_pcb_port_id: Option<String>,
}

/// Route point where the route changes layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViaPoint {
    /// X position.
    pub x: f64,
    /// Y position.
    pub y: f64,
    /// Layer the route arrives on.
    pub from_layer: String,
    /// Layer the route leaves on.
    pub to_layer: String,
    /// Copper diameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via_diameter: Option<f64>,
    /// Drill diameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole_diameter: Option<f64>,
}

/// Standalone via.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbVia {
    /// Unique id.
    pub pcb_via_id: String,
    /// X position.
    pub x: f64,
    /// Y position.
    pub y: f64,
    /// Copper diameter.
    pub outer_diameter: f64,
    /// Drill diameter.
    pub hole_diameter: f64,
    /// Layers the via connects.
    #[serde(default)]
    pub layers: Vec<String>,
    /// Trace the via belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_trace_id: Option<String>,
}

/// Silkscreen text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbSilkscreenText {
    /// Unique id.
    pub pcb_silkscreen_text_id: String,
    /// Owning component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_component_id: Option<String>,
    /// Text content.
    #[serde(default)]
    pub text: String,
    /// Anchor point.
    pub anchor_position: Point,
    /// Font height in mm.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    /// `top` or `bottom`.
    #[serde(default = "default_layer")]
    pub layer: String,
    /// Counter-clockwise rotation.
    #[serde(default)]
    pub ccw_rotation: f64,
}

const fn default_font_size() -> f64 {
    1.0
}

/// Silkscreen polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbSilkscreenPath {
    /// Unique id.
    pub pcb_silkscreen_path_id: String,
    /// Owning component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pcb_component_id: Option<String>,
    /// Polyline points.
    #[serde(default)]
    pub route: Vec<Point>,
    /// Line width.
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f64,
    /// `top` or `bottom`.
    #[serde(default = "default_layer")]
    pub layer: String,
}

const fn default_stroke_width() -> f64 {
    0.12
}

/// 3D model reference for a placed component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadComponent {
    /// Unique id.
    pub cad_component_id: String,
    /// Placed component.
    pub pcb_component_id: String,
    /// Logical component.
    pub source_component_id: String,
    /// Model position (board coordinates, mm).
    #[serde(default)]
    pub position: Point3,
    /// Model rotation in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Point3>,
    /// STEP model location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_step_url: Option<String>,
    /// VRML model location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_wrl_url: Option<String>,
    /// OBJ model location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_obj_url: Option<String>,
    /// STL model location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_stl_url: Option<String>,
    /// Model units per millimetre.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_unit_to_mm_scale_factor: Option<f64>,
    /// Standard footprint shorthand the model was chosen for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footprinter_string: Option<String>,
}

impl CadComponent {
    /// Returns the model file KiCad can load, preferring STEP over VRML.
    #[must_use]
    pub fn kicad_model_url(&self) -> Option<&str> {
        self.model_step_url
            .as_deref()
            .or(self.model_wrl_url.as_deref())
            .filter(|url| !url.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tagged_elements() {
        let json = r#"[
            {"type": "source_component", "source_component_id": "sc0", "name": "R1",
             "ftype": "simple_resistor", "footprinter_string": "0402"},
            {"type": "pcb_smtpad", "pcb_smtpad_id": "p0", "shape": "rect",
             "x": 1.0, "y": 2.0, "width": 0.5, "height": 0.6, "layer": "top"},
            {"type": "pcb_trace", "pcb_trace_id": "t0", "route": [
                {"route_type": "wire", "x": 0, "y": 0, "width": 0.15, "layer": "top"},
                {"route_type": "via", "x": 0, "y": 0, "from_layer": "top", "to_layer": "bottom"}
            ]},
            {"type": "some_future_element", "foo": 1}
        ]"#;

        let elements: Vec<CircuitElement> = serde_json::from_str(json).unwrap();
        assert_eq!(elements.len(), 4);
        assert!(matches!(
            &elements[0],
            CircuitElement::SourceComponent(c) if c.footprinter_string.as_deref() == Some("0402")
        ));
        assert!(matches!(&elements[1], CircuitElement::PcbSmtpad(p) if p.width == Some(0.5)));
        assert!(matches!(&elements[2], CircuitElement::PcbTrace(t) if t.route.len() == 2));
        assert_eq!(elements[3], CircuitElement::Unknown);
    }

    #[test]
    fn metadata_defaults() {
        let json = r#"{"type": "source_component", "source_component_id": "sc0", "name": "U1",
            "kicad_footprint": {"attributes": {"exclude_from_bom": true}}}"#;
        let element: CircuitElement = serde_json::from_str(json).unwrap();
        let CircuitElement::SourceComponent(component) = element else {
            panic!("expected source component");
        };
        let metadata = component.kicad_footprint.unwrap();
        assert_eq!(metadata.attributes.exclude_from_bom, Some(true));
        assert!(metadata.footprint_name.is_none());
    }

    #[test]
    fn model_preference() {
        let mut cad = CadComponent {
            cad_component_id: "cad0".into(),
            pcb_component_id: "pc0".into(),
            source_component_id: "sc0".into(),
            position: Point3::default(),
            rotation: None,
            model_step_url: None,
            model_wrl_url: Some("a.wrl".into()),
            model_obj_url: Some("a.obj".into()),
            model_stl_url: None,
            model_unit_to_mm_scale_factor: None,
            footprinter_string: None,
        };
        assert_eq!(cad.kicad_model_url(), Some("a.wrl"));
        cad.model_step_url = Some("a.step".into());
        assert_eq!(cad.kicad_model_url(), Some("a.step"));
    }
}

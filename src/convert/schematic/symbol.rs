//! Symbol definitions and placed symbol instances.
//!
//! Every component is drawn as a box with one pin per schematic port:
//!
//! ```text
//!        ┌─────────┐
//!  1 ────┤         ├──── 2
//!        └─────────┘
//! ```
//!
//! Definitions live in symbol-library coordinates (millimetres, Y up,
//! relative to the body centre, unrotated). Graphics go in unit `_0_1`
//! (shared by all units), pins in unit `_1_1`.

use std::collections::BTreeMap;

use crate::circuit::{Direction, SchematicComponent, SchematicPort, SourceComponent, SourcePort};
use crate::convert::parts::{reference_prefix, value_text};
use crate::convert::transform::rotate_into_local;
use crate::kicad::{effects, Sexpr};

/// Pin length in millimetres.
pub const PIN_LENGTH: f64 = 2.54;

/// Default text size in millimetres.
pub const TEXT_SIZE: f64 = 1.27;

/// Smallest body edge in millimetres.
const MIN_BODY: f64 = 2.54;

/// One pin of a generated symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct PinSpec {
    /// Pin number text.
    pub number: String,
    /// Pin name text.
    pub name: String,
    /// Tip X in symbol coordinates.
    pub x: f64,
    /// Tip Y in symbol coordinates.
    pub y: f64,
    /// Angle from the tip towards the body.
    pub angle: f64,
}

/// Everything needed to draw one component.
pub struct SymbolSource<'a> {
    /// Logical component.
    pub component: &'a SourceComponent,
    /// Schematic placement.
    pub placement: &'a SchematicComponent,
    /// Placement ports paired with their logical ports.
    pub ports: Vec<(&'a SchematicPort, Option<&'a SourcePort>)>,
    /// Input units → millimetres.
    pub scale: f64,
}

impl SymbolSource<'_> {
    /// Pins in symbol coordinates, in port order.
    #[must_use]
    pub fn pins(&self) -> Vec<PinSpec> {
        self.ports
            .iter()
            .enumerate()
            .map(|(i, (port, source))| {
                let dx = (port.center.x - self.placement.center.x) * self.scale;
                let dy = (port.center.y - self.placement.center.y) * self.scale;
                // Placement rotation is clockwise in a Y-up frame; undo it
                let (x, y) = rotate_into_local(dx, dy, self.placement.rotation);
                let facing = port.facing_direction.unwrap_or_else(|| infer_facing(x, y));

                let number = source
                    .and_then(|s| s.pin_number)
                    .or(port.pin_number)
                    .map_or_else(|| (i + 1).to_string(), |n| n.to_string());
                let name = source.map_or_else(|| number.clone(), |s| s.name.clone());

                PinSpec {
                    number,
                    name,
                    x,
                    y,
                    angle: pin_angle(facing),
                }
            })
            .collect()
    }

    /// Half width and half height of the body rectangle.
    #[must_use]
    pub fn body_half_extents(&self, pins: &[PinSpec]) -> (f64, f64) {
        let size = self.placement.size;
        if size.width > 0.0 && size.height > 0.0 {
            return (
                (size.width * self.scale / 2.0).max(MIN_BODY / 2.0),
                (size.height * self.scale / 2.0).max(MIN_BODY / 2.0),
            );
        }

        let mut hw: f64 = MIN_BODY / 2.0;
        let mut hh: f64 = MIN_BODY / 2.0;
        for pin in pins {
            // Pin bases sit on the body edge
            let (bx, by) = pin_base(pin);
            hw = hw.max(bx.abs());
            hh = hh.max(by.abs());
        }
        (hw, hh)
    }
}

/// Side of the body a pin at `(x, y)` most likely sticks out of.
fn infer_facing(x: f64, y: f64) -> Direction {
    if x.abs() >= y.abs() {
        if x < 0.0 {
            Direction::Left
        } else {
            Direction::Right
        }
    } else if y > 0.0 {
        Direction::Up
    } else {
        Direction::Down
    }
}

/// Pin angle (pointing from tip to body) for a pin facing `direction`.
const fn pin_angle(direction: Direction) -> f64 {
    match direction {
        Direction::Left => 0.0,
        Direction::Right => 180.0,
        Direction::Up => 270.0,
        Direction::Down => 90.0,
    }
}

fn pin_base(pin: &PinSpec) -> (f64, f64) {
    let (sin, cos) = pin.angle.to_radians().sin_cos();
    (
        PIN_LENGTH.mul_add(cos, pin.x),
        PIN_LENGTH.mul_add(sin, pin.y),
    )
}

/// `(property "key" "value" (at x y 0) (effects ...))`
#[must_use]
pub fn property(key: &str, value: &str, x: f64, y: f64, angle: f64, hidden: bool) -> Sexpr {
    Sexpr::list("property", [Sexpr::string(key), Sexpr::string(value)])
        .with(Sexpr::at(x, y, angle))
        .with(effects(TEXT_SIZE, hidden))
}

/// Property values shared by the definition and its instances.
///
/// Explicit values from the component's symbol metadata win.
#[must_use]
pub fn base_properties(
    component: &SourceComponent,
    reference: &str,
    value: &str,
    footprint: &str,
) -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();
    props.insert("Reference".to_string(), reference.to_string());
    props.insert("Value".to_string(), value.to_string());
    props.insert("Footprint".to_string(), footprint.to_string());
    props.insert("Datasheet".to_string(), String::new());
    props.insert(
        "Description".to_string(),
        component.manufacturer_part_number.clone().unwrap_or_default(),
    );
    if let Some(metadata) = &component.kicad_symbol {
        for (key, value) in &metadata.properties {
            props.insert(key.clone(), value.clone());
        }
    }
    props
}

/// Emits properties in KiCad's order: the five standard fields, then extras.
fn push_properties(
    target: &mut Sexpr,
    props: &BTreeMap<String, String>,
    origin: (f64, f64),
    half_height: f64,
    angle: f64,
) {
    const STANDARD: [&str; 5] = ["Reference", "Value", "Footprint", "Datasheet", "Description"];
    let (ox, oy) = origin;
    for key in STANDARD {
        let value = props.get(key).map_or("", String::as_str);
        let (y, hidden) = match key {
            "Reference" => (oy - half_height - TEXT_SIZE, false),
            "Value" => (oy + half_height + TEXT_SIZE, false),
            _ => (oy, true),
        };
        target.push(property(key, value, ox, y, angle, hidden));
    }
    for (key, value) in props.iter().filter(|(k, _)| !STANDARD.contains(&k.as_str())) {
        target.push(property(key, value, ox, oy, angle, true));
    }
}

/// Builds the `lib_symbols` entry for a symbol.
#[must_use]
pub fn definition(lib_id: &str, symbol_name: &str, footprint: &str, source: &SymbolSource<'_>) -> Sexpr {
    let component = source.component;
    let metadata = component.kicad_symbol.clone().unwrap_or_default();
    let pins = source.pins();
    let (hw, hh) = source.body_half_extents(&pins);

    let mut symbol = Sexpr::list("symbol", [Sexpr::string(lib_id)])
        .with(Sexpr::yes_no("exclude_from_sim", metadata.exclude_from_sim.unwrap_or(false)))
        .with(Sexpr::yes_no("in_bom", metadata.in_bom.unwrap_or(true)))
        .with(Sexpr::yes_no("on_board", metadata.on_board.unwrap_or(true)));

    let mut props = base_properties(
        component,
        &reference_prefix(&component.name),
        symbol_name,
        footprint,
    );
    // A definition names its symbol, not one placement's reference
    if let Some(prefix) = metadata.properties.get("Reference") {
        props.insert("Reference".to_string(), reference_prefix(prefix));
    }
    // Symbol-library Y points up, so the Reference goes above with +Y
    push_properties(&mut symbol, &props, (0.0, 0.0), -hh, 0.0);

    let body = Sexpr::list("symbol", [Sexpr::string(format!("{symbol_name}_0_1"))]).with(
        Sexpr::node("rectangle")
            .with(Sexpr::xy("start", -hw, hh))
            .with(Sexpr::xy("end", hw, -hh))
            .with(
                Sexpr::node("stroke")
                    .with(Sexpr::number_field("width", 0.254))
                    .with(Sexpr::list("type", [Sexpr::atom("default")])),
            )
            .with(Sexpr::node("fill").with(Sexpr::list("type", [Sexpr::atom("background")]))),
    );
    symbol.push(body);

    let mut unit = Sexpr::list("symbol", [Sexpr::string(format!("{symbol_name}_1_1"))]);
    for pin in &pins {
        unit.push(
            Sexpr::list("pin", [Sexpr::atom("passive"), Sexpr::atom("line")])
                .with(Sexpr::at(pin.x, pin.y, pin.angle))
                .with(Sexpr::number_field("length", PIN_LENGTH))
                .with(Sexpr::list("name", [Sexpr::string(pin.name.clone())]).with(effects(TEXT_SIZE, false)))
                .with(Sexpr::list("number", [Sexpr::string(pin.number.clone())]).with(effects(TEXT_SIZE, false))),
        );
    }
    symbol.push(unit);
    symbol.push(Sexpr::yes_no(
        "embedded_fonts",
        metadata.embedded_fonts.unwrap_or(false),
    ));
    symbol
}

/// Placed instance fields not derived from the definition.
pub struct InstanceSpec<'a> {
    /// `lib:name` of the definition.
    pub lib_id: &'a str,
    /// Sheet position.
    pub x: f64,
    /// Sheet position.
    pub y: f64,
    /// KiCad angle.
    pub angle: f64,
    /// Instance UUID.
    pub uuid: String,
    /// `(pin number, uuid)` pairs.
    pub pin_uuids: Vec<(String, String)>,
    /// Project name for the instances block.
    pub project: &'a str,
    /// Root sheet UUID.
    pub sheet_uuid: &'a str,
    /// Half height of the body in millimetres, for property placement.
    pub half_height: f64,
}

/// Builds a placed `(symbol (lib_id ..) ...)` instance.
#[must_use]
pub fn instance(component: &SourceComponent, footprint: &str, placed: &InstanceSpec<'_>) -> Sexpr {
    let metadata = component.kicad_symbol.clone().unwrap_or_default();
    let dnp = component
        .kicad_footprint
        .as_ref()
        .and_then(|f| f.attributes.dnp)
        .unwrap_or(false);

    let mut symbol = Sexpr::node("symbol")
        .with(Sexpr::string_field("lib_id", placed.lib_id))
        .with(Sexpr::at(placed.x, placed.y, placed.angle))
        .with(Sexpr::list("unit", [Sexpr::integer(1)]))
        .with(Sexpr::yes_no("exclude_from_sim", metadata.exclude_from_sim.unwrap_or(false)))
        .with(Sexpr::yes_no("in_bom", metadata.in_bom.unwrap_or(true)))
        .with(Sexpr::yes_no("on_board", metadata.on_board.unwrap_or(true)))
        .with(Sexpr::yes_no("dnp", dnp))
        .with(Sexpr::string_field("uuid", placed.uuid.clone()));

    let props = base_properties(component, &component.name, &value_text(component), footprint);
    push_properties(&mut symbol, &props, (placed.x, placed.y), placed.half_height, 0.0);

    for (number, uuid) in &placed.pin_uuids {
        symbol.push(
            Sexpr::list("pin", [Sexpr::string(number.clone())])
                .with(Sexpr::string_field("uuid", uuid.clone())),
        );
    }

    let reference = props.get("Reference").map_or(component.name.as_str(), String::as_str);
    symbol.push(
        Sexpr::node("instances").with(
            Sexpr::list("project", [Sexpr::string(placed.project)]).with(
                Sexpr::list("path", [Sexpr::string(format!("/{}", placed.sheet_uuid))])
                    .with(Sexpr::string_field("reference", reference))
                    .with(Sexpr::list("unit", [Sexpr::integer(1)])),
            ),
        ),
    );
    symbol
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Point, Size};

    fn component() -> SourceComponent {
        SourceComponent {
            source_component_id: "sc0".into(),
            name: "U1".into(),
            ftype: Some("simple_chip".into()),
            footprinter_string: None,
            display_value: None,
            manufacturer_part_number: Some("NE555".into()),
            kicad_symbol: None,
            kicad_footprint: None,
        }
    }

    fn placement() -> SchematicComponent {
        SchematicComponent {
            schematic_component_id: "s0".into(),
            source_component_id: "sc0".into(),
            center: Point::new(0.0, 0.0),
            size: Size { width: 0.4, height: 0.2 },
            rotation: 0.0,
            symbol_name: None,
        }
    }

    fn port(id: &str, x: f64, facing: Option<Direction>) -> SchematicPort {
        SchematicPort {
            schematic_port_id: id.into(),
            schematic_component_id: Some("s0".into()),
            source_port_id: format!("sp_{id}"),
            center: Point::new(x, 0.0),
            facing_direction: facing,
            pin_number: None,
        }
    }

    #[test]
    fn pins_follow_port_offsets() {
        let c = component();
        let p = placement();
        let left = port("a", -0.4, Some(Direction::Left));
        let right = port("b", 0.4, None);
        let source = SymbolSource {
            component: &c,
            placement: &p,
            ports: vec![(&left, None), (&right, None)],
            scale: 15.0,
        };
        let pins = source.pins();
        assert_eq!(pins.len(), 2);
        assert!((pins[0].x + 6.0).abs() < 1e-9);
        assert!((pins[0].angle - 0.0).abs() < 1e-9);
        assert!((pins[1].angle - 180.0).abs() < 1e-9);
        assert_eq!(pins[0].number, "1");
        assert_eq!(pins[1].number, "2");
    }

    #[test]
    fn definition_has_units_and_properties() {
        let c = component();
        let p = placement();
        let a = port("a", -0.4, None);
        let source = SymbolSource {
            component: &c,
            placement: &p,
            ports: vec![(&a, None)],
            scale: 15.0,
        };
        let def = definition("lib:U1", "U1", "lib:U1", &source);
        let text = def.to_string();
        assert!(text.contains("(symbol \"U1_0_1\""));
        assert!(text.contains("(symbol \"U1_1_1\""));
        assert_eq!(def.property_value("Reference"), Some("U"));
        assert_eq!(def.property_value("Footprint"), Some("lib:U1"));
        assert_eq!(def.property_value("Description"), Some("NE555"));
    }
}

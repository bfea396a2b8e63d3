//! Footprints placed on the board.
//!
//! One placed component becomes one `(footprint ...)` node. Pad, text and
//! line positions are stored relative to the footprint origin in the
//! footprint's unrotated frame; pad angles are absolute, as KiCad stores them.
//!
//! Malformed geometry (missing or non-positive sizes, empty text, paths with
//! fewer than two points) is skipped with a warning; the rest of the
//! footprint is still emitted.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::circuit::{
    AttributeOverrides, CircuitIndex, PcbComponent, PcbHole, PcbPlatedHole, PcbSmtPad, Point,
    SourceComponent,
};
use crate::convert::ids::IdGenerator;
use crate::convert::nets::{NetInfo, NetTable};
use crate::convert::parts::{footprint_name, value_text};
use crate::convert::transform::{
    ccw_to_kicad_rotation, normalize_degrees, rotate_into_local, to_kicad_rotation, Matrix,
};
use crate::kicad::naming::lib_id;
use crate::kicad::Sexpr;

use super::layers::Side;

/// Footprint text size in millimetres.
const TEXT_SIZE: f64 = 1.0;

/// Footprint text stroke in millimetres.
const TEXT_THICKNESS: f64 = 0.15;

bitflags! {
    /// Footprint attribute flags written in `(attr ...)`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct FootprintAttributes: u16 {
        /// Through-hole mounting.
        const THROUGH_HOLE = 1 << 0;
        /// Surface mounting.
        const SMD = 1 << 1;
        /// Not part of the schematic.
        const BOARD_ONLY = 1 << 2;
        /// Left out of position files.
        const EXCLUDE_FROM_POS_FILES = 1 << 3;
        /// Left out of the bill of materials.
        const EXCLUDE_FROM_BOM = 1 << 4;
        /// Courtyard may be missing.
        const ALLOW_MISSING_COURTYARD = 1 << 5;
        /// Do not populate.
        const DNP = 1 << 6;
    }
}

impl FootprintAttributes {
    /// Token order KiCad writes.
    const TOKENS: [(Self, &'static str); 7] = [
        (Self::THROUGH_HOLE, "through_hole"),
        (Self::SMD, "smd"),
        (Self::BOARD_ONLY, "board_only"),
        (Self::EXCLUDE_FROM_POS_FILES, "exclude_from_pos_files"),
        (Self::EXCLUDE_FROM_BOM, "exclude_from_bom"),
        (Self::ALLOW_MISSING_COURTYARD, "allow_missing_courtyard"),
        (Self::DNP, "dnp"),
    ];

    /// Applies explicit overrides on top of derived flags.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &AttributeOverrides) -> Self {
        let pairs = [
            (Self::THROUGH_HOLE, overrides.through_hole),
            (Self::SMD, overrides.smd),
            (Self::BOARD_ONLY, overrides.board_only),
            (Self::EXCLUDE_FROM_POS_FILES, overrides.exclude_from_pos_files),
            (Self::EXCLUDE_FROM_BOM, overrides.exclude_from_bom),
            (Self::ALLOW_MISSING_COURTYARD, overrides.allow_missing_courtyard),
            (Self::DNP, overrides.dnp),
        ];
        for (flag, value) in pairs {
            if let Some(value) = value {
                self.set(flag, value);
            }
        }
        self
    }

    /// `(attr smd ...)`, or `None` when no flag is set.
    #[must_use]
    pub fn to_sexpr(self) -> Option<Sexpr> {
        if self.is_empty() {
            return None;
        }
        let tokens = Self::TOKENS
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, token)| Sexpr::atom(*token));
        Some(Sexpr::list("attr", tokens))
    }
}

/// Inputs for building one footprint.
pub struct FootprintBuilder<'a> {
    /// Input circuit.
    pub circuit: &'a CircuitIndex,
    /// Resolved nets.
    pub nets: &'a NetTable,
    /// Input → board transform.
    pub transform: Matrix,
    /// UUID source.
    pub ids: &'a IdGenerator,
    /// Library nickname for the `lib_id`.
    pub library: &'a str,
}

/// Placement frame of one footprint.
struct Frame {
    origin: Point,
    angle: f64,
}

impl Frame {
    /// Input point → footprint-local coordinates.
    fn local(&self, transform: &Matrix, p: Point) -> (f64, f64) {
        let board = transform.apply(p);
        rotate_into_local(board.x - self.origin.x, board.y - self.origin.y, self.angle)
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// KiCad shape, size and extra rotation of an SMT pad.
fn smt_geometry(pad: &PcbSmtPad) -> Option<(&'static str, (f64, f64), f64)> {
    match pad.shape.as_str() {
        "rect" => Some(("rect", (positive(pad.width)?, positive(pad.height)?), 0.0)),
        "rotated_rect" => Some((
            "rect",
            (positive(pad.width)?, positive(pad.height)?),
            ccw_to_kicad_rotation(pad.ccw_rotation.unwrap_or(0.0)),
        )),
        "circle" => {
            let d = positive(pad.radius)? * 2.0;
            Some(("circle", (d, d), 0.0))
        }
        "pill" | "oval" => Some(("oval", (positive(pad.width)?, positive(pad.height)?), 0.0)),
        _ => None,
    }
}

/// KiCad shape, copper size and drill of a plated hole.
fn plated_geometry(hole: &PcbPlatedHole) -> Option<(&'static str, (f64, f64), Sexpr)> {
    match hole.shape.as_str() {
        "circle" => {
            let outer = positive(hole.outer_diameter)?;
            let drill = positive(hole.hole_diameter)?;
            Some(("circle", (outer, outer), Sexpr::list("drill", [Sexpr::number(drill)])))
        }
        "oval" | "pill" => Some((
            "oval",
            (positive(hole.outer_width)?, positive(hole.outer_height)?),
            oval_drill(positive(hole.hole_width)?, positive(hole.hole_height)?),
        )),
        _ => None,
    }
}

/// KiCad shape, size and drill of a non-plated hole.
fn hole_geometry(hole: &PcbHole) -> Option<(&'static str, (f64, f64), Sexpr)> {
    match hole.hole_shape.as_str() {
        "circle" => {
            let d = positive(hole.hole_diameter)?;
            Some(("circle", (d, d), Sexpr::list("drill", [Sexpr::number(d)])))
        }
        "oval" | "pill" => {
            let w = positive(hole.hole_width)?;
            let h = positive(hole.hole_height)?;
            Some(("oval", (w, h), oval_drill(w, h)))
        }
        _ => None,
    }
}

fn oval_drill(width: f64, height: f64) -> Sexpr {
    Sexpr::list(
        "drill",
        [Sexpr::atom("oval"), Sexpr::number(width), Sexpr::number(height)],
    )
}

fn uuid_field(uuid: String) -> Sexpr {
    Sexpr::string_field("uuid", uuid)
}

fn text_effects(size: f64, mirror: bool) -> Sexpr {
    Sexpr::node("effects")
        .with(
            Sexpr::node("font")
                .with(Sexpr::xy("size", size, size))
                .with(Sexpr::number_field("thickness", size * TEXT_THICKNESS)),
        )
        .with_opt(mirror.then(|| Sexpr::list("justify", [Sexpr::atom("mirror")])))
}

impl FootprintBuilder<'_> {
    /// Builds the footprint for a placed component.
    ///
    /// Returns `None` if the placement has no source component.
    #[must_use]
    pub fn build(&self, placement: &PcbComponent) -> Option<Sexpr> {
        let Some(component) = self.circuit.source_component(&placement.source_component_id) else {
            warn!(
                pcb_component = %placement.pcb_component_id,
                "PCB component has no source component, skipping"
            );
            return None;
        };

        let side = Side::from_layer(&placement.layer);
        let frame = Frame {
            origin: self.transform.apply(placement.center),
            angle: to_kicad_rotation(placement.rotation),
        };
        let name = footprint_name(component);
        let id = placement.pcb_component_id.as_str();

        let mut footprint = Sexpr::list("footprint", [Sexpr::string(lib_id(self.library, &name))])
            .with(Sexpr::string_field("layer", side.copper()))
            .with(uuid_field(self.ids.uuid_for(&["footprint", id])))
            .with(Sexpr::at(frame.origin.x, frame.origin.y, frame.angle));

        self.push_properties(&mut footprint, component, placement, &frame, side, &name);

        let smtpads: Vec<&PcbSmtPad> = self.circuit.smtpads_of(id).collect();
        let plated: Vec<&PcbPlatedHole> = self.circuit.plated_holes_of(id).collect();
        let mut attributes = if !plated.is_empty() {
            FootprintAttributes::THROUGH_HOLE
        } else if !smtpads.is_empty() {
            FootprintAttributes::SMD
        } else {
            FootprintAttributes::empty()
        };
        if let Some(metadata) = &component.kicad_footprint {
            attributes = attributes.with_overrides(&metadata.attributes);
        }
        footprint = footprint.with_opt(attributes.to_sexpr());

        for (i, text) in self.circuit.silkscreen_texts_of(id).enumerate() {
            if text.text.trim().is_empty() || text.font_size <= 0.0 {
                warn!(pcb_component = %id, text = %text.pcb_silkscreen_text_id, "Skipping empty silkscreen text");
                continue;
            }
            let text_side = Side::from_layer(&text.layer);
            let (x, y) = frame.local(&self.transform, text.anchor_position);
            let angle = normalize_degrees(frame.angle + ccw_to_kicad_rotation(text.ccw_rotation));
            footprint.push(
                Sexpr::list("fp_text", [Sexpr::atom("user"), Sexpr::string(text.text.clone())])
                    .with(Sexpr::at(x, y, angle))
                    .with(Sexpr::string_field("layer", text_side.layer("SilkS")))
                    .with(uuid_field(self.ids.uuid_for(&["fp_text", id, &i.to_string()])))
                    .with(text_effects(text.font_size, text_side == Side::Back)),
            );
        }

        for path in self.circuit.silkscreen_paths_of(id) {
            if path.route.len() < 2 {
                warn!(pcb_component = %id, path = %path.pcb_silkscreen_path_id, "Skipping silkscreen path with fewer than two points");
                continue;
            }
            let path_side = Side::from_layer(&path.layer);
            for (i, pair) in path.route.windows(2).enumerate() {
                let (sx, sy) = frame.local(&self.transform, pair[0]);
                let (ex, ey) = frame.local(&self.transform, pair[1]);
                footprint.push(
                    Sexpr::node("fp_line")
                        .with(Sexpr::xy("start", sx, sy))
                        .with(Sexpr::xy("end", ex, ey))
                        .with(
                            Sexpr::node("stroke")
                                .with(Sexpr::number_field("width", path.stroke_width))
                                .with(Sexpr::list("type", [Sexpr::atom("solid")])),
                        )
                        .with(Sexpr::string_field("layer", path_side.layer("SilkS")))
                        .with(uuid_field(self.ids.uuid_for(&[
                            "fp_line",
                            &path.pcb_silkscreen_path_id,
                            &i.to_string(),
                        ]))),
                );
            }
        }

        for (i, pad) in smtpads.iter().enumerate() {
            if let Some(pad) = self.smt_pad(component, pad, i, &frame) {
                footprint.push(pad);
            }
        }
        for (i, hole) in plated.iter().enumerate() {
            if let Some(pad) = self.plated_hole(component, hole, smtpads.len() + i, &frame) {
                footprint.push(pad);
            }
        }
        for hole in self.circuit.holes_of(id) {
            if let Some(pad) = self.np_hole(hole, &frame) {
                footprint.push(pad);
            }
        }

        let embedded_fonts = component
            .kicad_footprint
            .as_ref()
            .and_then(|m| m.embedded_fonts)
            .unwrap_or(false);
        footprint.push(Sexpr::yes_no("embedded_fonts", embedded_fonts));

        footprint = footprint.with_opt(self.model(placement, &frame));
        Some(footprint)
    }

    fn push_properties(
        &self,
        footprint: &mut Sexpr,
        component: &SourceComponent,
        placement: &PcbComponent,
        frame: &Frame,
        side: Side,
        name: &str,
    ) {
        let offset = placement.height.abs() / 2.0 + TEXT_SIZE;
        let mut values: Vec<(String, String)> = vec![
            ("Reference".into(), component.name.clone()),
            ("Value".into(), value_text(component)),
            ("Footprint".into(), lib_id(self.library, name)),
            ("Datasheet".into(), String::new()),
            (
                "Description".into(),
                component.manufacturer_part_number.clone().unwrap_or_default(),
            ),
        ];
        if let Some(metadata) = &component.kicad_footprint {
            for (key, value) in &metadata.properties {
                match values.iter_mut().find(|(k, _)| k == key) {
                    Some(slot) => slot.1.clone_from(value),
                    None => values.push((key.clone(), value.clone())),
                }
            }
        }

        for (key, value) in values {
            let (y, layer, hidden) = match key.as_str() {
                "Reference" => (-offset, side.layer("SilkS"), false),
                "Value" => (offset, side.layer("Fab"), false),
                _ => (0.0, side.layer("Fab"), true),
            };
            footprint.push(
                Sexpr::list("property", [Sexpr::string(key.clone()), Sexpr::string(value)])
                    .with(Sexpr::at(0.0, y, frame.angle))
                    .with(Sexpr::string_field("layer", layer))
                    .with_opt(hidden.then(|| Sexpr::yes_no("hide", true)))
                    .with(uuid_field(self.ids.uuid_for(&[
                        "property",
                        &placement.pcb_component_id,
                        &key,
                    ])))
                    .with(text_effects(TEXT_SIZE, side == Side::Back)),
            );
        }
    }

    /// Pad number from the port's pin number, then numeric hints, then order.
    fn pad_number(&self, pcb_port_id: Option<&str>, hints: &[String], index: usize) -> String {
        if let Some(number) = pcb_port_id
            .and_then(|id| self.circuit.pcb_port(id))
            .and_then(|port| self.circuit.source_port(&port.source_port_id))
            .and_then(|sp| sp.pin_number)
        {
            return number.to_string();
        }
        hints
            .iter()
            .find_map(|h| {
                let h = h.trim();
                let digits = h.strip_prefix("pin").unwrap_or(h);
                digits.parse::<u32>().ok().map(|n| n.to_string())
            })
            .unwrap_or_else(|| (index + 1).to_string())
    }

    /// Net of a pad: through its port, else by matching hints to the component's ports.
    fn pad_net(&self, component: &SourceComponent, pcb_port_id: Option<&str>, hints: &[String]) -> &NetInfo {
        if let Some(id) = pcb_port_id {
            return self.nets.net_for_pcb_port(id);
        }
        let matched = self
            .circuit
            .source_ports_of(&component.source_component_id)
            .find(|port| {
                hints.iter().any(|hint| {
                    *hint == port.name
                        || port.port_hints.contains(hint)
                        || port.pin_number.is_some_and(|n| {
                            *hint == n.to_string() || *hint == format!("pin{n}")
                        })
                })
            });
        matched.map_or(self.nets.no_net(), |port| {
            self.nets.net_for_source_port(&port.source_port_id)
        })
    }

    fn pad_node(
        number: &str,
        kind: &str,
        shape: &str,
        at: (f64, f64, f64),
        size: (f64, f64),
    ) -> Sexpr {
        Sexpr::list(
            "pad",
            [Sexpr::string(number), Sexpr::atom(kind), Sexpr::atom(shape)],
        )
        .with(Sexpr::at(at.0, at.1, at.2))
        .with(Sexpr::xy("size", size.0, size.1))
    }

    fn smt_pad(&self, component: &SourceComponent, pad: &PcbSmtPad, index: usize, frame: &Frame) -> Option<Sexpr> {
        let Some((shape, size, rotation)) = smt_geometry(pad) else {
            warn!(pad = %pad.pcb_smtpad_id, shape = %pad.shape, "Malformed SMT pad, skipping");
            return None;
        };

        let side = Side::from_layer(&pad.layer);
        let (x, y) = frame.local(&self.transform, Point::new(pad.x, pad.y));
        let angle = normalize_degrees(frame.angle + rotation);
        let number = self.pad_number(pad.pcb_port_id.as_deref(), &pad.port_hints, index);
        let net = self.pad_net(component, pad.pcb_port_id.as_deref(), &pad.port_hints);

        Some(
            Self::pad_node(&number, "smd", shape, (x, y, angle), size)
                .with(Sexpr::list(
                    "layers",
                    [
                        Sexpr::string(side.copper()),
                        Sexpr::string(side.layer("Paste")),
                        Sexpr::string(side.layer("Mask")),
                    ],
                ))
                .with_opt((!net.is_none()).then(|| net.to_sexpr()))
                .with(uuid_field(self.ids.uuid_for(&["pad", &pad.pcb_smtpad_id]))),
        )
    }

    fn plated_hole(
        &self,
        component: &SourceComponent,
        hole: &PcbPlatedHole,
        index: usize,
        frame: &Frame,
    ) -> Option<Sexpr> {
        let Some((shape, size, drill)) = plated_geometry(hole) else {
            warn!(hole = %hole.pcb_plated_hole_id, shape = %hole.shape, "Malformed plated hole, skipping");
            return None;
        };

        let (x, y) = frame.local(&self.transform, Point::new(hole.x, hole.y));
        let number = self.pad_number(hole.pcb_port_id.as_deref(), &hole.port_hints, index);
        let net = self.pad_net(component, hole.pcb_port_id.as_deref(), &hole.port_hints);

        Some(
            Self::pad_node(&number, "thru_hole", shape, (x, y, frame.angle), size)
                .with(drill)
                .with(Sexpr::list(
                    "layers",
                    [Sexpr::string("*.Cu"), Sexpr::string("*.Mask")],
                ))
                .with(Sexpr::yes_no("remove_unused_layers", false))
                .with_opt((!net.is_none()).then(|| net.to_sexpr()))
                .with(uuid_field(self.ids.uuid_for(&["pad", &hole.pcb_plated_hole_id]))),
        )
    }

    fn np_hole(&self, hole: &PcbHole, frame: &Frame) -> Option<Sexpr> {
        let Some((shape, size, drill)) = hole_geometry(hole) else {
            warn!(hole = %hole.pcb_hole_id, shape = %hole.hole_shape, "Malformed hole, skipping");
            return None;
        };
        let (x, y) = frame.local(&self.transform, Point::new(hole.x, hole.y));
        Some(
            Self::pad_node("", "np_thru_hole", shape, (x, y, frame.angle), size)
                .with(drill)
                .with(Sexpr::list(
                    "layers",
                    [Sexpr::string("*.Cu"), Sexpr::string("*.Mask")],
                ))
                .with(uuid_field(self.ids.uuid_for(&["pad", &hole.pcb_hole_id]))),
        )
    }

    /// `(model ...)` for the component's 3D model, if it has one.
    ///
    /// The footprint already carries the placement rotation, so the model
    /// only gets the part of its Z rotation that differs from it.
    fn model(&self, placement: &PcbComponent, frame: &Frame) -> Option<Sexpr> {
        let cad = self.circuit.cad_component_for(&placement.pcb_component_id)?;
        let url = cad.kicad_model_url()?;

        let (lx, ly) = frame.local(&self.transform, Point::new(cad.position.x, cad.position.y));
        let rotation = cad.rotation.unwrap_or_default();
        let rz = if cad.rotation.is_some() {
            to_kicad_rotation(rotation.z - placement.rotation)
        } else {
            0.0
        };

        Some(
            Sexpr::list("model", [Sexpr::string(url)])
                // Model offsets are Y up
                .with(Sexpr::node("offset").with(Sexpr::xyz("xyz", lx, -ly, cad.position.z)))
                .with(Sexpr::node("scale").with(Sexpr::xyz("xyz", 1.0, 1.0, 1.0)))
                .with(Sexpr::node("rotate").with(Sexpr::xyz(
                    "xyz",
                    normalize_degrees(rotation.x),
                    normalize_degrees(rotation.y),
                    rz,
                ))),
        )
    }
}

//! PCB pipeline stages.

use tracing::{debug, warn};

use crate::circuit::{CircuitIndex, Point, RoutePoint};
use crate::convert::nets::{NetInfo, NetResolver};
use crate::convert::pipeline::{Stage, StageStatus};
use crate::convert::transform::{pcb_transform, Extent};
use crate::kicad::{file_header, ConvertResult, Sexpr, PCB_VERSION};

use super::footprint::FootprintBuilder;
use super::layers::{copper_layer, copper_layer_names, is_through, layer_table, stack_position, EDGE_CUTS};
use super::PcbContext;

/// Track width when a route point gives none.
pub const DEFAULT_TRACK_WIDTH: f64 = 0.15;

/// Via copper diameter when a route point gives none.
pub const DEFAULT_VIA_DIAMETER: f64 = 0.6;

/// Via drill when a route point gives none.
pub const DEFAULT_VIA_DRILL: f64 = 0.3;

/// Outline stroke width.
const EDGE_WIDTH: f64 = 0.05;

/// Copper layer count needed by the board and every route on it.
fn required_layer_count(circuit: &CircuitIndex) -> u32 {
    let declared = circuit.pcb_board().and_then(|b| b.num_layers).unwrap_or(2);
    let inner_index = |name: &str| -> u32 {
        let lower = name.trim().to_ascii_lowercase();
        lower
            .strip_prefix("inner")
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    };

    let mut deepest = 0;
    for trace in circuit.pcb_traces() {
        for point in &trace.route {
            let found = match point {
                RoutePoint::Wire(w) => inner_index(&w.layer),
                RoutePoint::Via(v) => inner_index(&v.from_layer).max(inner_index(&v.to_layer)),
            };
            deepest = deepest.max(found);
        }
    }
    for via in circuit.pcb_vias() {
        for layer in &via.layers {
            deepest = deepest.max(inner_index(layer));
        }
    }
    declared.max(deepest + 2)
}

fn stroke(width: f64) -> Sexpr {
    Sexpr::node("stroke")
        .with(Sexpr::number_field("width", width))
        .with(Sexpr::list("type", [Sexpr::atom("solid")]))
}

fn segment(start: Point, end: Point, width: f64, layer: &str, net: &NetInfo, uuid: String) -> Sexpr {
    Sexpr::node("segment")
        .with(Sexpr::xy("start", start.x, start.y))
        .with(Sexpr::xy("end", end.x, end.y))
        .with(Sexpr::number_field("width", width))
        .with(Sexpr::string_field("layer", layer))
        .with(net.id_sexpr())
        .with(Sexpr::string_field("uuid", uuid))
}

/// A via between two copper layers, written top layer first.
fn via(at: Point, diameter: f64, drill: f64, layers: (&str, &str), copper: &[String], net: &NetInfo, uuid: String) -> Sexpr {
    let (mut top, mut bottom) = layers;
    if stack_position(top, copper) > stack_position(bottom, copper) {
        std::mem::swap(&mut top, &mut bottom);
    }
    let mut node = Sexpr::node("via");
    if !is_through(top, bottom) {
        node.push(Sexpr::atom("blind"));
    }
    node.with(Sexpr::xy("at", at.x, at.y))
        .with(Sexpr::number_field("size", diameter))
        .with(Sexpr::number_field("drill", drill))
        .with(Sexpr::list("layers", [Sexpr::string(top), Sexpr::string(bottom)]))
        .with(net.id_sexpr())
        .with(Sexpr::string_field("uuid", uuid))
}

fn same_point(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
}

/// Creates the root node, layer stack and input → board transform.
pub struct InitializeStage;

impl Stage<PcbContext> for InitializeStage {
    fn name(&self) -> &'static str {
        "Initialize"
    }

    fn step(&mut self, ctx: &mut PcbContext) -> ConvertResult<StageStatus> {
        let circuit = &ctx.circuit;
        let mut extent = Extent::empty();
        if let Some(board) = circuit.pcb_board() {
            extent.include_rect(board.center, board.width, board.height);
            for p in board.outline.iter().flatten() {
                extent.include(*p);
            }
        } else {
            for c in circuit.pcb_components() {
                extent.include_rect(c.center, c.width, c.height);
            }
            for pad in circuit.smtpads() {
                extent.include(Point::new(pad.x, pad.y));
            }
            for hole in circuit.plated_holes() {
                extent.include(Point::new(hole.x, hole.y));
            }
            for trace in circuit.pcb_traces() {
                for point in &trace.route {
                    let (x, y) = match point {
                        RoutePoint::Wire(w) => (w.x, w.y),
                        RoutePoint::Via(v) => (v.x, v.y),
                    };
                    extent.include(Point::new(x, y));
                }
            }
        }

        let thickness = circuit
            .pcb_board()
            .and_then(|b| b.thickness)
            .filter(|t| *t > 0.0)
            .unwrap_or(ctx.options.board_thickness);
        let copper = copper_layer_names(required_layer_count(circuit));

        let mut root = Sexpr::node("kicad_pcb");
        for item in file_header(PCB_VERSION) {
            root.push(item);
        }
        root.push(
            Sexpr::node("general")
                .with(Sexpr::number_field("thickness", thickness))
                .with(Sexpr::yes_no("legacy_teardrops", false)),
        );
        root.push(Sexpr::string_field("paper", "A4"));
        root.push(layer_table(&copper));
        root.push(
            Sexpr::node("setup")
                .with(Sexpr::number_field("pad_to_mask_clearance", 0.0))
                .with(Sexpr::yes_no("allow_soldermask_bridges_in_footprints", false)),
        );

        debug!(copper_layers = copper.len(), thickness, "Board initialised");
        ctx.transform = Some(pcb_transform(&extent, ctx.options.pcb_origin));
        ctx.copper_layers = copper;
        ctx.root = Some(root);
        Ok(StageStatus::Finished)
    }
}

/// Resolves nets and declares them.
pub struct NetsStage;

impl Stage<PcbContext> for NetsStage {
    fn name(&self) -> &'static str {
        "Nets"
    }

    fn step(&mut self, ctx: &mut PcbContext) -> ConvertResult<StageStatus> {
        let nets = NetResolver::resolve(&ctx.circuit);
        let declarations: Vec<Sexpr> = nets.nets().iter().map(NetInfo::to_sexpr).collect();
        let root = ctx.root_mut()?;
        for declaration in declarations {
            root.push(declaration);
        }
        ctx.nets = Some(nets);
        Ok(StageStatus::Finished)
    }
}

/// Places one footprint per step.
#[derive(Default)]
pub struct FootprintsStage {
    next: usize,
}

impl Stage<PcbContext> for FootprintsStage {
    fn name(&self) -> &'static str {
        "Footprints"
    }

    fn step(&mut self, ctx: &mut PcbContext) -> ConvertResult<StageStatus> {
        let Some(placement) = ctx.circuit.pcb_components().get(self.next) else {
            return Ok(StageStatus::Finished);
        };
        self.next += 1;

        let builder = FootprintBuilder {
            circuit: &ctx.circuit,
            nets: ctx.nets()?,
            transform: ctx.transform()?,
            ids: &ctx.ids,
            library: &ctx.options.library_name,
        };
        if let Some(footprint) = builder.build(placement) {
            ctx.root_mut()?.push(footprint);
        }
        Ok(StageStatus::Continue)
    }
}

/// Emits the segments and vias of one routed trace per step.
#[derive(Default)]
pub struct TracesStage {
    next: usize,
}

impl Stage<PcbContext> for TracesStage {
    fn name(&self) -> &'static str {
        "Traces"
    }

    fn step(&mut self, ctx: &mut PcbContext) -> ConvertResult<StageStatus> {
        let Some(trace) = ctx.circuit.pcb_traces().get(self.next) else {
            return Ok(StageStatus::Finished);
        };
        self.next += 1;

        let transform = ctx.transform()?;
        let net = ctx.nets()?.net_for_pcb_trace(&trace.pcb_trace_id).clone();
        let id = trace.pcb_trace_id.clone();
        let copper = ctx.copper_layers.clone();

        let mut items = Vec::new();
        let mut vias_at = Vec::new();
        // Current pen position, copper layer and width
        let mut cursor: Option<(Point, String, f64)> = None;

        for (i, point) in trace.route.iter().enumerate() {
            let index = i.to_string();
            match point {
                RoutePoint::Wire(wire) => {
                    let at = transform.apply(Point::new(wire.x, wire.y));
                    let Some(layer) = copper_layer(&wire.layer, &copper) else {
                        warn!(trace = %id, layer = %wire.layer, "Route point on unknown copper layer, skipping");
                        continue;
                    };
                    let width = if wire.width > 0.0 { wire.width } else { DEFAULT_TRACK_WIDTH };
                    if let Some((from, from_layer, _)) = &cursor {
                        if *from_layer != layer {
                            warn!(trace = %id, from = %from_layer, to = %layer, "Layer change without a via");
                        }
                        if !same_point(*from, at) {
                            items.push(segment(
                                *from,
                                at,
                                width,
                                &layer,
                                &net,
                                ctx.ids.uuid_for(&["segment", &id, &index]),
                            ));
                        }
                    }
                    cursor = Some((at, layer, width));
                }
                RoutePoint::Via(v) => {
                    let at = transform.apply(Point::new(v.x, v.y));
                    let (Some(from_layer), Some(to_layer)) = (
                        copper_layer(&v.from_layer, &copper),
                        copper_layer(&v.to_layer, &copper),
                    ) else {
                        warn!(trace = %id, from = %v.from_layer, to = %v.to_layer, "Via on unknown copper layer, skipping");
                        continue;
                    };
                    let width = cursor.as_ref().map_or(DEFAULT_TRACK_WIDTH, |c| c.2);
                    if let Some((from, _, _)) = &cursor {
                        if !same_point(*from, at) {
                            items.push(segment(
                                *from,
                                at,
                                width,
                                &from_layer,
                                &net,
                                ctx.ids.uuid_for(&["segment", &id, &index]),
                            ));
                        }
                    }
                    items.push(via(
                        at,
                        v.via_diameter.filter(|d| *d > 0.0).unwrap_or(DEFAULT_VIA_DIAMETER),
                        v.hole_diameter.filter(|d| *d > 0.0).unwrap_or(DEFAULT_VIA_DRILL),
                        (&from_layer, &to_layer),
                        &copper,
                        &net,
                        ctx.ids.uuid_for(&["via", &id, &index]),
                    ));
                    vias_at.push(at);
                    cursor = Some((at, to_layer, width));
                }
            }
        }

        for at in vias_at {
            ctx.claim_via_position(at);
        }
        let root = ctx.root_mut()?;
        for item in items {
            root.push(item);
        }
        Ok(StageStatus::Continue)
    }
}

/// Emits standalone vias not already emitted by a trace.
pub struct ViasStage;

impl Stage<PcbContext> for ViasStage {
    fn name(&self) -> &'static str {
        "Vias"
    }

    fn step(&mut self, ctx: &mut PcbContext) -> ConvertResult<StageStatus> {
        let transform = ctx.transform()?;
        let nets = ctx.nets()?;
        let copper = &ctx.copper_layers;
        let mut pending = Vec::new();

        for standalone in ctx.circuit.pcb_vias() {
            let at = transform.apply(Point::new(standalone.x, standalone.y));
            let mut layers: Vec<String> = standalone
                .layers
                .iter()
                .filter_map(|l| copper_layer(l, copper))
                .collect();
            layers.sort_by_key(|l| stack_position(l, copper));
            let (top, bottom) = match (layers.first(), layers.last()) {
                (Some(a), Some(b)) if a != b => (a.clone(), b.clone()),
                _ => (
                    copper.first().cloned().unwrap_or_default(),
                    copper.last().cloned().unwrap_or_default(),
                ),
            };
            let net = standalone
                .pcb_trace_id
                .as_deref()
                .map_or(nets.no_net(), |t| nets.net_for_pcb_trace(t));
            let diameter = Some(standalone.outer_diameter).filter(|d| *d > 0.0);
            let drill = Some(standalone.hole_diameter).filter(|d| *d > 0.0);
            let node = via(
                at,
                diameter.unwrap_or(DEFAULT_VIA_DIAMETER),
                drill.unwrap_or(DEFAULT_VIA_DRILL),
                (&top, &bottom),
                copper,
                net,
                ctx.ids.uuid_for(&["via", &standalone.pcb_via_id]),
            );
            pending.push((standalone.pcb_via_id.clone(), at, node));
        }

        for (id, at, node) in pending {
            if !ctx.claim_via_position(at) {
                debug!(via = %id, "Via already emitted by a trace, skipping");
                continue;
            }
            ctx.root_mut()?.push(node);
        }
        Ok(StageStatus::Finished)
    }
}

/// Draws the board outline and board-level holes on `Edge.Cuts`.
pub struct BoardOutlineStage;

impl Stage<PcbContext> for BoardOutlineStage {
    fn name(&self) -> &'static str {
        "BoardOutline"
    }

    fn step(&mut self, ctx: &mut PcbContext) -> ConvertResult<StageStatus> {
        let transform = ctx.transform()?;
        let mut items = Vec::new();

        if let Some(board) = ctx.circuit.pcb_board() {
            let outline: Vec<Point> = board.outline.clone().unwrap_or_default();
            if outline.len() >= 3 {
                let mut pts = Sexpr::node("pts");
                for p in &outline {
                    let at = transform.apply(*p);
                    pts.push(Sexpr::xy("xy", at.x, at.y));
                }
                items.push(
                    Sexpr::node("gr_poly")
                        .with(pts)
                        .with(stroke(EDGE_WIDTH))
                        .with(Sexpr::yes_no("fill", false))
                        .with(Sexpr::string_field("layer", EDGE_CUTS))
                        .with(Sexpr::string_field("uuid", ctx.ids.uuid("outline"))),
                );
            } else if board.width > 0.0 && board.height > 0.0 {
                let a = transform.apply(Point::new(
                    board.center.x - board.width / 2.0,
                    board.center.y + board.height / 2.0,
                ));
                let b = transform.apply(Point::new(
                    board.center.x + board.width / 2.0,
                    board.center.y - board.height / 2.0,
                ));
                items.push(
                    Sexpr::node("gr_rect")
                        .with(Sexpr::xy("start", a.x, a.y))
                        .with(Sexpr::xy("end", b.x, b.y))
                        .with(stroke(EDGE_WIDTH))
                        .with(Sexpr::yes_no("fill", false))
                        .with(Sexpr::string_field("layer", EDGE_CUTS))
                        .with(Sexpr::string_field("uuid", ctx.ids.uuid("outline"))),
                );
            } else {
                warn!(board = %board.pcb_board_id, "Board has no usable outline");
            }
        } else {
            debug!("No board element, skipping outline");
        }

        for hole in ctx.circuit.holes().iter().filter(|h| h.pcb_component_id.is_none()) {
            let Some(d) = hole.hole_diameter.filter(|d| *d > 0.0 && hole.hole_shape == "circle") else {
                warn!(hole = %hole.pcb_hole_id, shape = %hole.hole_shape, "Board hole is not a drillable circle, skipping");
                continue;
            };
            let centre = transform.apply(Point::new(hole.x, hole.y));
            items.push(
                Sexpr::node("gr_circle")
                    .with(Sexpr::xy("center", centre.x, centre.y))
                    .with(Sexpr::xy("end", centre.x + d / 2.0, centre.y))
                    .with(stroke(EDGE_WIDTH))
                    .with(Sexpr::yes_no("fill", false))
                    .with(Sexpr::string_field("layer", EDGE_CUTS))
                    .with(Sexpr::string_field("uuid", ctx.ids.uuid_for(&["hole", &hole.pcb_hole_id]))),
            );
        }

        let root = ctx.root_mut()?;
        for item in items {
            root.push(item);
        }
        Ok(StageStatus::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_layers_raise_the_count() {
        let circuit = CircuitIndex::from_json(
            r#"[
            {"type": "pcb_trace", "pcb_trace_id": "t0", "route": [
                {"route_type": "wire", "x": 0, "y": 0, "width": 0.2, "layer": "inner2"}
            ]}
            ]"#,
        )
        .unwrap();
        assert_eq!(required_layer_count(&circuit), 4);
        assert_eq!(required_layer_count(&CircuitIndex::default()), 2);
    }

    #[test]
    fn via_kind_and_layer_order() {
        let copper = copper_layer_names(4);
        let net = NetInfo::none();
        let blind = via(Point::default(), 0.6, 0.3, ("In1.Cu", "F.Cu"), &copper, &net, "u".into());
        let text = blind.to_string();
        assert!(text.starts_with("(via blind"));
        assert!(text.contains("(layers \"F.Cu\" \"In1.Cu\")"));

        let through = via(Point::default(), 0.6, 0.3, ("B.Cu", "F.Cu"), &copper, &net, "u".into());
        assert!(!through.to_string().contains("blind"));
    }
}

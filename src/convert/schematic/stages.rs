//! Schematic pipeline stages.

use tracing::{debug, warn};

use crate::circuit::{CircuitIndex, Direction, SchematicComponent};
use crate::convert::parts::{footprint_name, symbol_name};
use crate::convert::pipeline::{Stage, StageStatus};
use crate::convert::transform::{schematic_transform, to_kicad_rotation, Extent};
use crate::kicad::naming::lib_id;
use crate::kicad::{effects, file_header, ConvertResult, Sexpr, SCHEMATIC_VERSION};

use super::symbol::{self, InstanceSpec, SymbolSource, TEXT_SIZE};
use super::SchematicContext;

/// Pairs a placement with its ports and logical component.
fn symbol_source<'a>(
    circuit: &'a CircuitIndex,
    placement: &'a SchematicComponent,
    scale: f64,
) -> Option<SymbolSource<'a>> {
    let component = circuit.source_component(&placement.source_component_id)?;
    let ports = circuit
        .schematic_ports()
        .iter()
        .filter(|port| match port.schematic_component_id.as_deref() {
            Some(id) => id == placement.schematic_component_id,
            None => circuit
                .source_port(&port.source_port_id)
                .is_some_and(|sp| sp.source_component_id == component.source_component_id),
        })
        .map(|port| (port, circuit.source_port(&port.source_port_id)))
        .collect();
    Some(SymbolSource {
        component,
        placement,
        ports,
        scale,
    })
}

/// Pin numbers of a symbol definition, in definition order.
fn definition_pin_numbers(definition: &Sexpr) -> Vec<String> {
    definition
        .find_all("symbol")
        .flat_map(|unit| unit.find_all("pin"))
        .filter_map(|pin| pin.find("number").and_then(|n| n.arg_text(0)))
        .map(str::to_string)
        .collect()
}

/// Creates the root node and the input → sheet transform.
pub struct InitializeStage;

impl Stage<SchematicContext> for InitializeStage {
    fn name(&self) -> &'static str {
        "Initialize"
    }

    fn step(&mut self, ctx: &mut SchematicContext) -> ConvertResult<StageStatus> {
        let mut extent = Extent::empty();
        for placement in ctx.circuit.schematic_components() {
            extent.include_rect(placement.center, placement.size.width, placement.size.height);
        }
        for port in ctx.circuit.schematic_ports() {
            extent.include(port.center);
        }
        for trace in ctx.circuit.schematic_traces() {
            for edge in &trace.edges {
                extent.include(edge.from);
                extent.include(edge.to);
            }
        }
        for label in ctx.circuit.schematic_net_labels() {
            extent.include(label.center);
        }

        ctx.transform = Some(schematic_transform(
            &extent,
            ctx.options.schematic_scale,
            ctx.options.schematic_origin,
        ));

        let mut root = Sexpr::node("kicad_sch");
        for item in file_header(SCHEMATIC_VERSION) {
            root.push(item);
        }
        root.push(Sexpr::string_field("uuid", ctx.sheet_uuid.clone()));
        root.push(Sexpr::string_field("paper", "A4"));
        ctx.root = Some(root);

        Ok(StageStatus::Finished)
    }
}

/// Builds one definition per distinct symbol name and adds `lib_symbols`.
pub struct LibrarySymbolsStage;

impl Stage<SchematicContext> for LibrarySymbolsStage {
    fn name(&self) -> &'static str {
        "LibrarySymbols"
    }

    fn step(&mut self, ctx: &mut SchematicContext) -> ConvertResult<StageStatus> {
        let scale = ctx.transform()?.length_scale();
        let library = ctx.options.library_name.clone();

        for placement in ctx.circuit.schematic_components() {
            let Some(source) = symbol_source(&ctx.circuit, placement, scale) else {
                warn!(
                    schematic_component = %placement.schematic_component_id,
                    "Schematic component has no source component, skipping"
                );
                continue;
            };

            let name = symbol_name(source.component, Some(placement));
            ctx.symbol_names
                .insert(placement.schematic_component_id.clone(), name.clone());

            if ctx.lib_symbols.contains_key(&name) {
                debug!(symbol = %name, "Symbol already defined, sharing definition");
                continue;
            }

            let footprint = lib_id(&library, &footprint_name(source.component));
            let definition = symbol::definition(&lib_id(&library, &name), &name, &footprint, &source);
            let half_height = source.body_half_extents(&source.pins()).1;
            ctx.body_half_heights.insert(name.clone(), half_height);
            ctx.lib_symbols.insert(name, definition);
        }

        let definitions: Vec<Sexpr> = ctx.lib_symbols.values().cloned().collect();
        ctx.root_mut()?.push(Sexpr::list("lib_symbols", definitions));
        Ok(StageStatus::Finished)
    }
}

/// Places one symbol instance per step.
#[derive(Default)]
pub struct SymbolInstancesStage {
    next: usize,
}

impl Stage<SchematicContext> for SymbolInstancesStage {
    fn name(&self) -> &'static str {
        "SymbolInstances"
    }

    fn step(&mut self, ctx: &mut SchematicContext) -> ConvertResult<StageStatus> {
        let Some(placement) = ctx.circuit.schematic_components().get(self.next) else {
            return Ok(StageStatus::Finished);
        };
        self.next += 1;

        let Some(name) = ctx.symbol_names.get(&placement.schematic_component_id) else {
            return Ok(StageStatus::Continue);
        };
        let Some(component) = ctx.circuit.source_component(&placement.source_component_id) else {
            return Ok(StageStatus::Continue);
        };

        let transform = ctx.transform()?;
        let at = transform.apply(placement.center);
        let library = &ctx.options.library_name;
        let symbol_lib_id = lib_id(library, name);
        let footprint = lib_id(library, &footprint_name(component));

        let pin_numbers = ctx
            .lib_symbols
            .get(name)
            .map(definition_pin_numbers)
            .unwrap_or_default();
        let pin_uuids = pin_numbers
            .into_iter()
            .map(|number| {
                let uuid = ctx
                    .ids
                    .uuid_for(&["pin", &placement.schematic_component_id, &number]);
                (number, uuid)
            })
            .collect();

        let placed = InstanceSpec {
            lib_id: &symbol_lib_id,
            x: at.x,
            y: at.y,
            angle: to_kicad_rotation(placement.rotation),
            uuid: ctx
                .ids
                .uuid_for(&["symbol", &placement.schematic_component_id]),
            pin_uuids,
            project: &ctx.options.project_name,
            sheet_uuid: &ctx.sheet_uuid,
            half_height: ctx.body_half_heights.get(name).copied().unwrap_or(TEXT_SIZE),
        };
        let instance = symbol::instance(component, &footprint, &placed);

        ctx.root_mut()?.push(instance);
        Ok(StageStatus::Continue)
    }
}

const fn label_angle(side: Option<Direction>) -> f64 {
    match side {
        None | Some(Direction::Left) => 0.0,
        Some(Direction::Up) => 90.0,
        Some(Direction::Right) => 180.0,
        Some(Direction::Down) => 270.0,
    }
}

/// Emits wires, junctions and net labels.
pub struct WiresStage;

impl Stage<SchematicContext> for WiresStage {
    fn name(&self) -> &'static str {
        "Wires"
    }

    fn step(&mut self, ctx: &mut SchematicContext) -> ConvertResult<StageStatus> {
        let transform = ctx.transform()?;
        let mut items = Vec::new();

        for trace in ctx.circuit.schematic_traces() {
            for (i, edge) in trace.edges.iter().enumerate() {
                let from = transform.apply(edge.from);
                let to = transform.apply(edge.to);
                let index = i.to_string();
                items.push(
                    Sexpr::node("wire")
                        .with(
                            Sexpr::node("pts")
                                .with(Sexpr::xy("xy", from.x, from.y))
                                .with(Sexpr::xy("xy", to.x, to.y)),
                        )
                        .with(
                            Sexpr::node("stroke")
                                .with(Sexpr::number_field("width", 0.0))
                                .with(Sexpr::list("type", [Sexpr::atom("default")])),
                        )
                        .with(Sexpr::string_field(
                            "uuid",
                            ctx.ids.uuid_for(&["wire", &trace.schematic_trace_id, &index]),
                        )),
                );
            }
            for (i, junction) in trace.junctions.iter().enumerate() {
                let at = transform.apply(*junction);
                let index = i.to_string();
                items.push(
                    Sexpr::node("junction")
                        .with(Sexpr::xy("at", at.x, at.y))
                        .with(Sexpr::number_field("diameter", 0.0))
                        .with(Sexpr::list(
                            "color",
                            [0.0, 0.0, 0.0, 0.0].map(Sexpr::number),
                        ))
                        .with(Sexpr::string_field(
                            "uuid",
                            ctx.ids
                                .uuid_for(&["junction", &trace.schematic_trace_id, &index]),
                        )),
                );
            }
        }

        for (i, label) in ctx.circuit.schematic_net_labels().iter().enumerate() {
            let at = transform.apply(label.center);
            let index = i.to_string();
            items.push(
                Sexpr::list("label", [Sexpr::string(label.text.clone())])
                    .with(Sexpr::at(at.x, at.y, label_angle(label.anchor_side)))
                    .with(
                        effects(TEXT_SIZE, false)
                            .with(Sexpr::list("justify", [Sexpr::atom("left"), Sexpr::atom("bottom")])),
                    )
                    .with(Sexpr::string_field("uuid", ctx.ids.uuid_for(&["label", &index]))),
            );
        }

        let root = ctx.root_mut()?;
        for item in items {
            root.push(item);
        }
        Ok(StageStatus::Finished)
    }
}

/// Closes the file with the sheet instance table.
pub struct SheetInstancesStage;

impl Stage<SchematicContext> for SheetInstancesStage {
    fn name(&self) -> &'static str {
        "SheetInstances"
    }

    fn step(&mut self, ctx: &mut SchematicContext) -> ConvertResult<StageStatus> {
        let root = ctx.root_mut()?;
        root.push(Sexpr::node("sheet_instances").with(
            Sexpr::list("path", [Sexpr::string("/")]).with(Sexpr::string_field("page", "1")),
        ));
        root.push(Sexpr::yes_no("embedded_fonts", false));
        Ok(StageStatus::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::pipeline::Pipeline;
    use crate::convert::ConvertOptions;
    use crate::kicad::ConvertError;

    #[test]
    fn stages_need_initialisation() {
        let ctx = SchematicContext::new(CircuitIndex::default(), ConvertOptions::default());
        let stages: Vec<Box<dyn Stage<SchematicContext>>> = vec![Box::new(LibrarySymbolsStage)];
        let err = Pipeline::new(ctx, stages).run_until_finished().unwrap_err();
        assert!(matches!(err, ConvertError::MissingPrecondition { .. }));
    }

    #[test]
    fn pin_numbers_from_definition() {
        let def = Sexpr::list("symbol", [Sexpr::string("lib:X")]).with(
            Sexpr::list("symbol", [Sexpr::string("X_1_1")])
                .with(Sexpr::list("pin", [Sexpr::atom("passive")]).with(Sexpr::string_field("number", "1")))
                .with(Sexpr::list("pin", [Sexpr::atom("passive")]).with(Sexpr::string_field("number", "2"))),
        );
        assert_eq!(definition_pin_numbers(&def), vec!["1", "2"]);
    }
}

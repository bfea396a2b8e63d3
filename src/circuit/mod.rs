//! Circuit description input.
//!
//! [`CircuitIndex`] wraps the flat element list and answers the queries the
//! converters need: elements by kind (in input order) and elements by
//! foreign key (component → ports → pads, component → 3D model, ...).

pub mod elements;

use std::collections::HashMap;

pub use elements::{
    AttributeOverrides, CadComponent, CircuitElement, Direction, FootprintMetadata, PcbBoard,
    PcbComponent, PcbHole, PcbPlatedHole, PcbPort, PcbSilkscreenPath, PcbSilkscreenText,
    PcbSmtPad, PcbTrace, PcbVia, Point, Point3, RoutePoint, SchematicComponent, SchematicEdge,
    SchematicNetLabel, SchematicPort, SchematicTrace, Size, SourceComponent, SourceNet,
    SourcePort, SourceTrace, SymbolMetadata, ViaPoint, WirePoint,
};

/// Indexed, read-only view of a circuit description.
#[derive(Debug, Clone, Default)]
pub struct CircuitIndex {
    element_count: usize,
    source_components: Vec<SourceComponent>,
    source_ports: Vec<SourcePort>,
    source_nets: Vec<SourceNet>,
    source_traces: Vec<SourceTrace>,
    schematic_components: Vec<SchematicComponent>,
    schematic_ports: Vec<SchematicPort>,
    schematic_traces: Vec<SchematicTrace>,
    schematic_net_labels: Vec<SchematicNetLabel>,
    pcb_boards: Vec<PcbBoard>,
    pcb_components: Vec<PcbComponent>,
    pcb_ports: Vec<PcbPort>,
    smtpads: Vec<PcbSmtPad>,
    plated_holes: Vec<PcbPlatedHole>,
    holes: Vec<PcbHole>,
    pcb_traces: Vec<PcbTrace>,
    pcb_vias: Vec<PcbVia>,
    silkscreen_texts: Vec<PcbSilkscreenText>,
    silkscreen_paths: Vec<PcbSilkscreenPath>,
    cad_components: Vec<CadComponent>,

    source_component_by_id: HashMap<String, usize>,
    source_port_by_id: HashMap<String, usize>,
    source_net_by_id: HashMap<String, usize>,
    source_trace_by_id: HashMap<String, usize>,
    pcb_component_by_id: HashMap<String, usize>,
    pcb_port_by_id: HashMap<String, usize>,
}

impl CircuitIndex {
    /// Builds an index over the given elements.
    #[must_use]
    pub fn new(elements: Vec<CircuitElement>) -> Self {
        let mut index = Self {
            element_count: elements.len(),
            ..Self::default()
        };

        for element in elements {
            match element {
                CircuitElement::SourceComponent(e) => {
                    index
                        .source_component_by_id
                        .entry(e.source_component_id.clone())
                        .or_insert(index.source_components.len());
                    index.source_components.push(e);
                }
                CircuitElement::SourcePort(e) => {
                    index
                        .source_port_by_id
                        .entry(e.source_port_id.clone())
                        .or_insert(index.source_ports.len());
                    index.source_ports.push(e);
                }
                CircuitElement::SourceNet(e) => {
                    index
                        .source_net_by_id
                        .entry(e.source_net_id.clone())
                        .or_insert(index.source_nets.len());
                    index.source_nets.push(e);
                }
                CircuitElement::SourceTrace(e) => {
                    index
                        .source_trace_by_id
                        .entry(e.source_trace_id.clone())
                        .or_insert(index.source_traces.len());
                    index.source_traces.push(e);
                }
                CircuitElement::SchematicComponent(e) => index.schematic_components.push(e),
                CircuitElement::SchematicPort(e) => index.schematic_ports.push(e),
                CircuitElement::SchematicTrace(e) => index.schematic_traces.push(e),
                CircuitElement::SchematicNetLabel(e) => index.schematic_net_labels.push(e),
                CircuitElement::PcbBoard(e) => index.pcb_boards.push(e),
                CircuitElement::PcbComponent(e) => {
                    index
                        .pcb_component_by_id
                        .entry(e.pcb_component_id.clone())
                        .or_insert(index.pcb_components.len());
                    index.pcb_components.push(e);
                }
                CircuitElement::PcbPort(e) => {
                    index
                        .pcb_port_by_id
                        .entry(e.pcb_port_id.clone())
                        .or_insert(index.pcb_ports.len());
                    index.pcb_ports.push(e);
                }
                CircuitElement::PcbSmtpad(e) => index.smtpads.push(e),
                CircuitElement::PcbPlatedHole(e) => index.plated_holes.push(e),
                CircuitElement::PcbHole(e) => index.holes.push(e),
                CircuitElement::PcbTrace(e) => index.pcb_traces.push(e),
                CircuitElement::PcbVia(e) => index.pcb_vias.push(e),
                CircuitElement::PcbSilkscreenText(e) => index.silkscreen_texts.push(e),
                CircuitElement::PcbSilkscreenPath(e) => index.silkscreen_paths.push(e),
                CircuitElement::CadComponent(e) => index.cad_components.push(e),
                CircuitElement::Unknown => {}
            }
        }

        index
    }

    /// Parses a JSON circuit description and indexes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not an array of circuit elements.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let elements: Vec<CircuitElement> = serde_json::from_str(json)?;
        Ok(Self::new(elements))
    }

    /// Number of elements in the input, including unknown ones.
    #[must_use]
    pub const fn element_count(&self) -> usize {
        self.element_count
    }

    /// All source components in input order.
    #[must_use]
    pub fn source_components(&self) -> &[SourceComponent] {
        &self.source_components
    }

    /// Looks up a source component by id.
    #[must_use]
    pub fn source_component(&self, id: &str) -> Option<&SourceComponent> {
        self.source_component_by_id
            .get(id)
            .map(|&i| &self.source_components[i])
    }

    /// All source ports in input order.
    #[must_use]
    pub fn source_ports(&self) -> &[SourcePort] {
        &self.source_ports
    }

    /// Looks up a source port by id.
    #[must_use]
    pub fn source_port(&self, id: &str) -> Option<&SourcePort> {
        self.source_port_by_id.get(id).map(|&i| &self.source_ports[i])
    }

    /// Ports belonging to a source component.
    pub fn source_ports_of<'a>(
        &'a self,
        source_component_id: &'a str,
    ) -> impl Iterator<Item = &'a SourcePort> + 'a {
        self.source_ports
            .iter()
            .filter(move |p| p.source_component_id == source_component_id)
    }

    /// All source nets in input order.
    #[must_use]
    pub fn source_nets(&self) -> &[SourceNet] {
        &self.source_nets
    }

    /// Looks up a source net by id.
    #[must_use]
    pub fn source_net(&self, id: &str) -> Option<&SourceNet> {
        self.source_net_by_id.get(id).map(|&i| &self.source_nets[i])
    }

    /// All source traces in input order.
    #[must_use]
    pub fn source_traces(&self) -> &[SourceTrace] {
        &self.source_traces
    }

    /// Looks up a source trace by id.
    #[must_use]
    pub fn source_trace(&self, id: &str) -> Option<&SourceTrace> {
        self.source_trace_by_id
            .get(id)
            .map(|&i| &self.source_traces[i])
    }

    /// All schematic components in input order.
    #[must_use]
    pub fn schematic_components(&self) -> &[SchematicComponent] {
        &self.schematic_components
    }

    /// All schematic ports in input order.
    #[must_use]
    pub fn schematic_ports(&self) -> &[SchematicPort] {
        &self.schematic_ports
    }

    /// Schematic ports belonging to a schematic component.
    pub fn schematic_ports_of<'a>(
        &'a self,
        schematic_component_id: &'a str,
    ) -> impl Iterator<Item = &'a SchematicPort> + 'a {
        self.schematic_ports
            .iter()
            .filter(move |p| p.schematic_component_id.as_deref() == Some(schematic_component_id))
    }

    /// All schematic traces in input order.
    #[must_use]
    pub fn schematic_traces(&self) -> &[SchematicTrace] {
        &self.schematic_traces
    }

    /// All schematic net labels in input order.
    #[must_use]
    pub fn schematic_net_labels(&self) -> &[SchematicNetLabel] {
        &self.schematic_net_labels
    }

    /// The board, if the description has one.
    #[must_use]
    pub fn pcb_board(&self) -> Option<&PcbBoard> {
        self.pcb_boards.first()
    }

    /// All placed PCB components in input order.
    #[must_use]
    pub fn pcb_components(&self) -> &[PcbComponent] {
        &self.pcb_components
    }

    /// Looks up a placed PCB component by id.
    #[must_use]
    pub fn pcb_component(&self, id: &str) -> Option<&PcbComponent> {
        self.pcb_component_by_id
            .get(id)
            .map(|&i| &self.pcb_components[i])
    }

    /// All PCB ports in input order.
    #[must_use]
    pub fn pcb_ports(&self) -> &[PcbPort] {
        &self.pcb_ports
    }

    /// Looks up a PCB port by id.
    #[must_use]
    pub fn pcb_port(&self, id: &str) -> Option<&PcbPort> {
        self.pcb_port_by_id.get(id).map(|&i| &self.pcb_ports[i])
    }

    /// All SMT pads in input order.
    #[must_use]
    pub fn smtpads(&self) -> &[PcbSmtPad] {
        &self.smtpads
    }

    /// SMT pads belonging to a placed component.
    pub fn smtpads_of<'a>(&'a self, pcb_component_id: &'a str) -> impl Iterator<Item = &'a PcbSmtPad> + 'a {
        self.smtpads
            .iter()
            .filter(move |p| p.pcb_component_id.as_deref() == Some(pcb_component_id))
    }

    /// All plated holes in input order.
    #[must_use]
    pub fn plated_holes(&self) -> &[PcbPlatedHole] {
        &self.plated_holes
    }

    /// Plated holes belonging to a placed component.
    pub fn plated_holes_of<'a>(
        &'a self,
        pcb_component_id: &'a str,
    ) -> impl Iterator<Item = &'a PcbPlatedHole> + 'a {
        self.plated_holes
            .iter()
            .filter(move |h| h.pcb_component_id.as_deref() == Some(pcb_component_id))
    }

    /// All non-plated holes in input order.
    #[must_use]
    pub fn holes(&self) -> &[PcbHole] {
        &self.holes
    }

    /// Non-plated holes belonging to a placed component.
    pub fn holes_of<'a>(&'a self, pcb_component_id: &'a str) -> impl Iterator<Item = &'a PcbHole> + 'a {
        self.holes
            .iter()
            .filter(move |h| h.pcb_component_id.as_deref() == Some(pcb_component_id))
    }

    /// All copper routes in input order.
    #[must_use]
    pub fn pcb_traces(&self) -> &[PcbTrace] {
        &self.pcb_traces
    }

    /// All standalone vias in input order.
    #[must_use]
    pub fn pcb_vias(&self) -> &[PcbVia] {
        &self.pcb_vias
    }

    /// Silkscreen text belonging to a placed component.
    pub fn silkscreen_texts_of<'a>(
        &'a self,
        pcb_component_id: &'a str,
    ) -> impl Iterator<Item = &'a PcbSilkscreenText> + 'a {
        self.silkscreen_texts
            .iter()
            .filter(move |t| t.pcb_component_id.as_deref() == Some(pcb_component_id))
    }

    /// Silkscreen paths belonging to a placed component.
    pub fn silkscreen_paths_of<'a>(
        &'a self,
        pcb_component_id: &'a str,
    ) -> impl Iterator<Item = &'a PcbSilkscreenPath> + 'a {
        self.silkscreen_paths
            .iter()
            .filter(move |p| p.pcb_component_id.as_deref() == Some(pcb_component_id))
    }

    /// The 3D model attached to a placed component.
    #[must_use]
    pub fn cad_component_for(&self, pcb_component_id: &str) -> Option<&CadComponent> {
        self.cad_components
            .iter()
            .find(|c| c.pcb_component_id == pcb_component_id)
    }

    /// Every non-empty footprinter string in the input, lowercased and deduplicated.
    #[must_use]
    pub fn footprinter_strings(&self) -> Vec<String> {
        let mut found: Vec<String> = self
            .source_components
            .iter()
            .filter_map(|c| c.footprinter_string.as_deref())
            .chain(
                self.cad_components
                    .iter()
                    .filter_map(|c| c.footprinter_string.as_deref()),
            )
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        found.sort();
        found.dedup();
        found
    }
}

//! Circuit description → KiCad conversion.
//!
//! Each artifact is produced by a [`Pipeline`] of stages sharing one context:
//!
//! - [`SchematicConverter`] → `.kicad_sch` tree
//! - [`PcbConverter`] → `.kicad_pcb` tree
//!
//! The library converter in [`crate::library`] runs both per component.
//!
//! # Shared Services
//!
//! - [`transform`] — input space → sheet / board space
//! - [`nets`] — connectivity keys → numbered nets
//! - [`parts`] — symbol and footprint naming
//! - [`ids`] — deterministic UUIDs

pub mod ids;
pub mod nets;
pub mod parts;
pub mod pcb;
pub mod pipeline;
pub mod schematic;
pub mod transform;

pub use ids::IdGenerator;
pub use nets::{NetInfo, NetResolver, NetTable};
pub use pcb::{PcbContext, PcbConverter};
pub use pipeline::{Pipeline, Stage, StageStatus, DEFAULT_MAX_STAGE_ITERATIONS};
pub use schematic::{SchematicContext, SchematicConverter};
pub use transform::{Extent, Matrix};

use crate::circuit::{CircuitIndex, Point};

/// Default schematic scale: input units → millimetres.
pub const DEFAULT_SCHEMATIC_SCALE: f64 = 15.0;

/// Default schematic origin: A4 sheet centre on the 1.27 mm grid.
pub const DEFAULT_SCHEMATIC_ORIGIN: Point = Point::new(148.59, 105.41);

/// Default board origin.
pub const DEFAULT_PCB_ORIGIN: Point = Point::new(148.5, 105.0);

/// Default board thickness in millimetres.
pub const DEFAULT_BOARD_THICKNESS: f64 = 1.6;

/// Options shared by the schematic and PCB converters.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// Library nickname used in `lib_id`s of embedded symbols and footprints.
    pub library_name: String,
    /// Project name written into symbol instance paths; also seeds UUIDs.
    pub project_name: String,
    /// Schematic input units → millimetres.
    pub schematic_scale: f64,
    /// Sheet point the schematic content is centred on.
    pub schematic_origin: Point,
    /// Board point the PCB content is centred on.
    pub pcb_origin: Point,
    /// Board thickness when the input does not give one.
    pub board_thickness: f64,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            library_name: "circuit".to_string(),
            project_name: "circuit".to_string(),
            schematic_scale: DEFAULT_SCHEMATIC_SCALE,
            schematic_origin: DEFAULT_SCHEMATIC_ORIGIN,
            pcb_origin: DEFAULT_PCB_ORIGIN,
            board_thickness: DEFAULT_BOARD_THICKNESS,
        }
    }
}

impl ConvertOptions {
    /// Sets the library nickname.
    #[must_use]
    pub fn with_library_name(mut self, name: impl Into<String>) -> Self {
        self.library_name = name.into();
        self
    }

    /// Sets the project name.
    #[must_use]
    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = name.into();
        self
    }
}

/// Iteration ceiling for a pipeline whose stages handle one element per step.
///
/// Never lower than [`DEFAULT_MAX_STAGE_ITERATIONS`].
#[must_use]
pub fn iteration_ceiling_for(circuit: &CircuitIndex) -> usize {
    DEFAULT_MAX_STAGE_ITERATIONS.max(circuit.element_count() + 1)
}

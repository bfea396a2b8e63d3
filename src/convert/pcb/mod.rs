//! PCB converter.
//!
//! Turns a circuit description into a `.kicad_pcb` tree:
//!
//! 1. [`stages::InitializeStage`] — root, general, layer stack, setup, transform
//! 2. [`stages::NetsStage`] — net resolution and declarations
//! 3. [`stages::FootprintsStage`] — one placed footprint per step
//! 4. [`stages::TracesStage`] — one routed trace per step
//! 5. [`stages::ViasStage`] — standalone vias
//! 6. [`stages::BoardOutlineStage`] — `Edge.Cuts` outline and board holes

pub mod footprint;
pub mod layers;
pub mod stages;

use crate::circuit::{CircuitIndex, Point};
use crate::convert::ids::IdGenerator;
use crate::convert::nets::NetTable;
use crate::convert::pipeline::{Pipeline, Stage};
use crate::convert::transform::Matrix;
use crate::convert::{iteration_ceiling_for, ConvertOptions};
use crate::kicad::{to_file_text, ConvertError, ConvertResult, Sexpr};

pub use footprint::FootprintAttributes;

/// State shared by the PCB stages for one run.
#[derive(Debug)]
pub struct PcbContext {
    /// Input circuit.
    pub circuit: CircuitIndex,
    /// Conversion options.
    pub options: ConvertOptions,
    /// UUID source.
    pub ids: IdGenerator,
    /// Input → board transform, set by the initialise stage.
    pub transform: Option<Matrix>,
    /// Output root, set by the initialise stage.
    pub root: Option<Sexpr>,
    /// Copper layers top to bottom, set by the initialise stage.
    pub copper_layers: Vec<String>,
    /// Resolved nets, set by the nets stage.
    pub nets: Option<NetTable>,
    /// Board positions of vias already emitted.
    pub via_positions: Vec<Point>,
}

impl PcbContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new(circuit: CircuitIndex, options: ConvertOptions) -> Self {
        let ids = IdGenerator::new(&format!("pcb/{}", options.project_name));
        Self {
            circuit,
            options,
            ids,
            transform: None,
            root: None,
            copper_layers: Vec::new(),
            nets: None,
            via_positions: Vec::new(),
        }
    }

    /// The active transform.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::MissingPrecondition`] before initialisation.
    pub fn transform(&self) -> ConvertResult<Matrix> {
        self.transform.ok_or_else(|| ConvertError::missing("board transform"))
    }

    /// The resolved nets.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::MissingPrecondition`] before the nets stage.
    pub fn nets(&self) -> ConvertResult<&NetTable> {
        self.nets.as_ref().ok_or_else(|| ConvertError::missing("net table"))
    }

    /// The output root, mutably.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::MissingPrecondition`] before initialisation.
    pub fn root_mut(&mut self) -> ConvertResult<&mut Sexpr> {
        self.root.as_mut().ok_or_else(|| ConvertError::missing("board root"))
    }

    /// Records a via position; returns false if one was already emitted there.
    pub fn claim_via_position(&mut self, at: Point) -> bool {
        const TOLERANCE: f64 = 1e-6;
        if self
            .via_positions
            .iter()
            .any(|p| (p.x - at.x).abs() < TOLERANCE && (p.y - at.y).abs() < TOLERANCE)
        {
            return false;
        }
        self.via_positions.push(at);
        true
    }
}

/// Runs the PCB stages over one circuit.
pub struct PcbConverter {
    pipeline: Pipeline<PcbContext>,
}

impl PcbConverter {
    /// Creates a converter; nothing runs until stepped.
    #[must_use]
    pub fn new(circuit: CircuitIndex, options: ConvertOptions) -> Self {
        let ceiling = iteration_ceiling_for(&circuit);
        let stages: Vec<Box<dyn Stage<PcbContext>>> = vec![
            Box::new(stages::InitializeStage),
            Box::new(stages::NetsStage),
            Box::new(stages::FootprintsStage::default()),
            Box::new(stages::TracesStage::default()),
            Box::new(stages::ViasStage),
            Box::new(stages::BoardOutlineStage),
        ];
        Self {
            pipeline: Pipeline::new(PcbContext::new(circuit, options), stages)
                .with_max_iterations(ceiling),
        }
    }

    /// Converts a circuit in one call.
    ///
    /// # Errors
    ///
    /// Returns the first stage error.
    pub fn convert(circuit: CircuitIndex, options: ConvertOptions) -> ConvertResult<Sexpr> {
        let mut converter = Self::new(circuit, options);
        converter.run_until_finished()?;
        converter.into_output()
    }

    /// Advances by one stage increment.
    ///
    /// # Errors
    ///
    /// Returns the stage error or an iteration ceiling error.
    pub fn step(&mut self) -> ConvertResult<()> {
        self.pipeline.step()
    }

    /// Returns true once every stage has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.pipeline.is_finished()
    }

    /// Steps until finished.
    ///
    /// # Errors
    ///
    /// Returns the first stage error.
    pub fn run_until_finished(&mut self) -> ConvertResult<()> {
        self.pipeline.run_until_finished()?;
        let ctx = self.pipeline.context();
        tracing::info!(
            project = %ctx.options.project_name,
            footprints = ctx.circuit.pcb_components().len(),
            nets = ctx.nets.as_ref().map_or(0, |n| n.len().saturating_sub(1)),
            "PCB conversion finished"
        );
        Ok(())
    }

    /// Shared context.
    #[must_use]
    pub const fn context(&self) -> &PcbContext {
        self.pipeline.context()
    }

    /// The finished board tree.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::MissingPrecondition`] if not yet finished.
    pub fn output(&self) -> ConvertResult<&Sexpr> {
        if !self.is_finished() {
            return Err(ConvertError::missing("finished board"));
        }
        self.context()
            .root
            .as_ref()
            .ok_or_else(|| ConvertError::missing("board root"))
    }

    /// The finished board as file text.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::MissingPrecondition`] if not yet finished.
    pub fn output_text(&self) -> ConvertResult<String> {
        self.output().map(to_file_text)
    }

    /// Consumes the converter and returns the finished tree.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::MissingPrecondition`] if not yet finished.
    pub fn into_output(self) -> ConvertResult<Sexpr> {
        if !self.is_finished() {
            return Err(ConvertError::missing("finished board"));
        }
        self.pipeline
            .into_context()
            .root
            .ok_or_else(|| ConvertError::missing("board root"))
    }
}

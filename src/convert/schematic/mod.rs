//! Schematic converter.
//!
//! Turns a circuit description into a `.kicad_sch` tree:
//!
//! 1. [`stages::InitializeStage`] — root node, sheet UUID, paper, transform
//! 2. [`stages::LibrarySymbolsStage`] — one definition per distinct symbol name
//! 3. [`stages::SymbolInstancesStage`] — one placed symbol per step
//! 4. [`stages::WiresStage`] — wires, junctions and net labels
//! 5. [`stages::SheetInstancesStage`] — sheet instances and trailer
//!
//! Components sharing a symbol name share one definition in `lib_symbols`.

pub mod stages;
pub mod symbol;

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::circuit::CircuitIndex;
use crate::convert::ids::IdGenerator;
use crate::convert::pipeline::{Pipeline, Stage};
use crate::convert::transform::Matrix;
use crate::convert::{iteration_ceiling_for, ConvertOptions};
use crate::kicad::{to_file_text, ConvertError, ConvertResult, Sexpr};

/// State shared by the schematic stages for one run.
#[derive(Debug)]
pub struct SchematicContext {
    /// Input circuit.
    pub circuit: CircuitIndex,
    /// Conversion options.
    pub options: ConvertOptions,
    /// UUID source.
    pub ids: IdGenerator,
    /// Input → sheet transform, set by the initialise stage.
    pub transform: Option<Matrix>,
    /// Output root, set by the initialise stage.
    pub root: Option<Sexpr>,
    /// Root sheet UUID.
    pub sheet_uuid: String,
    /// Symbol definitions by name, in first-use order.
    pub lib_symbols: IndexMap<String, Sexpr>,
    /// Symbol name per schematic component id.
    pub symbol_names: HashMap<String, String>,
    /// Body half height per symbol name, for property placement.
    pub body_half_heights: HashMap<String, f64>,
}

impl SchematicContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new(circuit: CircuitIndex, options: ConvertOptions) -> Self {
        let ids = IdGenerator::new(&format!("schematic/{}", options.project_name));
        let sheet_uuid = ids.uuid("sheet");
        Self {
            circuit,
            options,
            ids,
            transform: None,
            root: None,
            sheet_uuid,
            lib_symbols: IndexMap::new(),
            symbol_names: HashMap::new(),
            body_half_heights: HashMap::new(),
        }
    }

    /// The active transform.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::MissingPrecondition`] before initialisation.
    pub fn transform(&self) -> ConvertResult<Matrix> {
        self.transform
            .ok_or_else(|| ConvertError::missing("schematic transform"))
    }

    /// The output root, mutably.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::MissingPrecondition`] before initialisation.
    pub fn root_mut(&mut self) -> ConvertResult<&mut Sexpr> {
        self.root
            .as_mut()
            .ok_or_else(|| ConvertError::missing("schematic root"))
    }
}

/// Runs the schematic stages over one circuit.
pub struct SchematicConverter {
    pipeline: Pipeline<SchematicContext>,
}

impl SchematicConverter {
    /// Creates a converter; nothing runs until stepped.
    #[must_use]
    pub fn new(circuit: CircuitIndex, options: ConvertOptions) -> Self {
        let ceiling = iteration_ceiling_for(&circuit);
        let stages: Vec<Box<dyn Stage<SchematicContext>>> = vec![
            Box::new(stages::InitializeStage),
            Box::new(stages::LibrarySymbolsStage),
            Box::new(stages::SymbolInstancesStage::default()),
            Box::new(stages::WiresStage),
            Box::new(stages::SheetInstancesStage),
        ];
        Self {
            pipeline: Pipeline::new(SchematicContext::new(circuit, options), stages)
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
        tracing::info!(
            project = %self.pipeline.context().options.project_name,
            symbols = self.pipeline.context().lib_symbols.len(),
            "Schematic conversion finished"
        );
        Ok(())
    }

    /// Shared context.
    #[must_use]
    pub const fn context(&self) -> &SchematicContext {
        self.pipeline.context()
    }

    /// The finished schematic tree.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::MissingPrecondition`] if not yet finished.
    pub fn output(&self) -> ConvertResult<&Sexpr> {
        if !self.is_finished() {
            return Err(ConvertError::missing("finished schematic"));
        }
        self.context()
            .root
            .as_ref()
            .ok_or_else(|| ConvertError::missing("schematic root"))
    }

    /// The finished schematic as file text.
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
            return Err(ConvertError::missing("finished schematic"));
        }
        self.pipeline
            .into_context()
            .root
            .ok_or_else(|| ConvertError::missing("schematic root"))
    }
}

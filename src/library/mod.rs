//! Component library builds.
//!
//! A library build converts every component to a schematic and a board,
//! pulls the symbols and footprints back out of them, and sorts the results
//! into two KiCad libraries:
//!
//! - a **user** library holding each component's own symbol and footprint
//! - a **builtin** library holding the standard parts they share
//!
//! The stages run on the same [`Pipeline`] as the converters:
//!
//! 1. [`stages::ConvertComponentsStage`] — one component per step
//! 2. [`stages::ClassifyStage`] — one component per step
//! 3. [`stages::ResolveModelPathsStage`] — 3D model references and copies
//! 4. [`stages::AssembleFilesStage`] — the output file map
//!
//! # Example
//!
//! ```no_run
//! use circuit_to_kicad::circuit::CircuitIndex;
//! use circuit_to_kicad::library::{ComponentSource, LibraryConverter, LibraryOptions};
//!
//! let json = std::fs::read_to_string("U1.json")?;
//! let components = vec![ComponentSource::new("U1", CircuitIndex::from_json(&json)?)];
//! let output = LibraryConverter::convert(components, LibraryOptions::default())?;
//! output.write_to(std::path::Path::new("out"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod builtin;
pub mod classify;
pub mod extract;
pub mod layout;
pub mod model_paths;
pub mod source;
pub mod stages;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::convert::pipeline::{Pipeline, Stage, DEFAULT_MAX_STAGE_ITERATIONS};
use crate::convert::ConvertOptions;
use crate::kicad::{ConvertError, ConvertResult, LibTable, LibTableKind, PROJECT_PATH_VAR};

pub use builtin::BuiltinMatcher;
pub use classify::{ClassificationContext, ClassificationOutcome, ComponentEntries};
pub use extract::{FootprintEntry, SymbolEntry};
pub use layout::Layout;
pub use model_paths::ModelPathMode;
pub use source::{ComponentRenderer, ComponentSource, ExportEnumerator, JsonFileSource};

/// Default nickname of the builtin library.
pub const DEFAULT_BUILTIN_LIBRARY: &str = "circuit_builtin";

/// Options for one library build.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryOptions {
    /// Nickname of the user library.
    pub library_name: String,
    /// Nickname of the builtin library.
    pub builtin_library_name: String,
    /// How 3D model references are written.
    pub model_path_mode: ModelPathMode,
    /// Options for the per-component conversions.
    pub convert: ConvertOptions,
}

impl Default for LibraryOptions {
    fn default() -> Self {
        Self {
            library_name: "circuit".to_string(),
            builtin_library_name: DEFAULT_BUILTIN_LIBRARY.to_string(),
            model_path_mode: ModelPathMode::default(),
            convert: ConvertOptions::default(),
        }
    }
}

impl LibraryOptions {
    /// Sets the user library nickname.
    #[must_use]
    pub fn with_library_name(mut self, name: impl Into<String>) -> Self {
        self.library_name = name.into();
        self
    }

    /// Sets the model path mode.
    #[must_use]
    pub fn with_model_path_mode(mut self, mode: ModelPathMode) -> Self {
        self.model_path_mode = mode;
        self
    }
}

/// Content of one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// KiCad text files.
    Text(String),
    /// Embedded 3D model files.
    Binary(Vec<u8>),
}

impl FileContent {
    /// The bytes to write.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }
}

/// A 3D model file the library references but does not contain yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFileCopy {
    /// Reference as it appeared in the input.
    pub source: String,
    /// File map location of the copy.
    pub destination: String,
}

/// Result of a library build.
#[derive(Debug, Clone)]
pub struct LibraryOutput {
    /// Output files keyed by relative path.
    pub files: BTreeMap<String, FileContent>,
    /// Model files to copy into the library.
    pub model_copies: Vec<ModelFileCopy>,
    /// Footprint library registrations.
    pub footprint_table: LibTable,
    /// Symbol library registrations.
    pub symbol_table: LibTable,
    /// Problems that degraded the output without stopping it.
    pub warnings: Vec<String>,
}

impl LibraryOutput {
    /// Text of a file, if it is a text file in the map.
    #[must_use]
    pub fn text(&self, path: &str) -> Option<&str> {
        match self.files.get(path)? {
            FileContent::Text(text) => Some(text),
            FileContent::Binary(_) => None,
        }
    }

    /// Reads model copies available on the local file system into the map.
    ///
    /// Relative sources and `${KIPRJMOD}` sources resolve against
    /// `base_dir`. Remote (`http(s)://`) sources are left for the caller.
    /// Returns the number of embedded files.
    pub fn embed_local_models(&mut self, base_dir: &Path) -> usize {
        let mut embedded = 0;
        for copy in &self.model_copies {
            if self.files.contains_key(&copy.destination) {
                continue;
            }
            if copy.source.starts_with("http://") || copy.source.starts_with("https://") {
                continue;
            }
            let local = copy
                .source
                .strip_prefix(PROJECT_PATH_VAR)
                .map_or_else(|| base_dir.join(&copy.source), |rest| {
                    base_dir.join(rest.trim_start_matches(['/', '\\']))
                });
            match fs::read(&local) {
                Ok(bytes) => {
                    self.files
                        .insert(copy.destination.clone(), FileContent::Binary(bytes));
                    embedded += 1;
                }
                Err(e) => {
                    warn!(model = %local.display(), error = %e, "Cannot read 3D model");
                    self.warnings
                        .push(format!("Cannot read 3D model '{}': {e}", local.display()));
                }
            }
        }
        embedded
    }

    /// Writes every file in the map below `dir`.
    ///
    /// Returns the number of written files.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or file cannot be written.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<usize> {
        for (path, content) in &self.files {
            let target = dir.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, content.as_bytes())?;
        }
        Ok(self.files.len())
    }
}

/// State shared by the library stages for one build.
#[derive(Debug)]
pub struct LibraryContext {
    /// Components still to convert, in input order.
    pub components: Vec<ComponentSource>,
    /// Build options.
    pub options: LibraryOptions,
    /// Standard part detection over every component's footprinter strings.
    pub matcher: BuiltinMatcher,
    /// Entries per converted component, in input order.
    pub extracted: Vec<ComponentEntries>,
    /// The four library collections.
    pub classification: ClassificationContext,
    /// Model files to copy, set by the model path stage.
    pub model_copies: Vec<ModelFileCopy>,
    /// Problems collected along the way.
    pub warnings: Vec<String>,
    /// The file map, set by the assemble stage.
    pub output: Option<LibraryOutput>,
}

impl LibraryContext {
    /// Creates a context over `components`.
    #[must_use]
    pub fn new(components: Vec<ComponentSource>, options: LibraryOptions) -> Self {
        let mut matcher = BuiltinMatcher::standard();
        for component in &components {
            for token in component.circuit.footprinter_strings() {
                matcher.add_token(&token);
            }
        }
        let classification =
            ClassificationContext::new(&options.library_name, &options.builtin_library_name);
        Self {
            components,
            options,
            matcher,
            extracted: Vec::new(),
            classification,
            model_copies: Vec::new(),
            warnings: Vec::new(),
            output: None,
        }
    }

    /// The file layout for the configured mode.
    #[must_use]
    pub fn layout(&self) -> Layout {
        Layout::new(self.options.model_path_mode.clone())
    }

    /// Records a problem and logs it.
    pub fn warn(&mut self, message: String) {
        warn!("{message}");
        self.warnings.push(message);
    }
}

/// Runs the library stages over a list of components.
pub struct LibraryConverter {
    pipeline: Pipeline<LibraryContext>,
}

impl LibraryConverter {
    /// Creates a converter; nothing runs until stepped.
    #[must_use]
    pub fn new(components: Vec<ComponentSource>, options: LibraryOptions) -> Self {
        let ceiling = DEFAULT_MAX_STAGE_ITERATIONS.max(components.len() + 1);
        let stages: Vec<Box<dyn Stage<LibraryContext>>> = vec![
            Box::new(stages::ConvertComponentsStage::default()),
            Box::new(stages::ClassifyStage::default()),
            Box::new(stages::ResolveModelPathsStage),
            Box::new(stages::AssembleFilesStage),
        ];
        Self {
            pipeline: Pipeline::new(LibraryContext::new(components, options), stages)
                .with_max_iterations(ceiling),
        }
    }

    /// Builds a library in one call.
    ///
    /// # Errors
    ///
    /// Returns the first stage error.
    pub fn convert(components: Vec<ComponentSource>, options: LibraryOptions) -> ConvertResult<LibraryOutput> {
        let mut converter = Self::new(components, options);
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
            library = %ctx.options.library_name,
            components = ctx.extracted.len(),
            user_symbols = ctx.classification.user_symbols.len(),
            user_footprints = ctx.classification.user_footprints.len(),
            builtin_symbols = ctx.classification.builtin_symbols.len(),
            builtin_footprints = ctx.classification.builtin_footprints.len(),
            warnings = ctx.warnings.len(),
            "Library build finished"
        );
        Ok(())
    }

    /// Shared context.
    #[must_use]
    pub const fn context(&self) -> &LibraryContext {
        self.pipeline.context()
    }

    /// The finished output.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::MissingPrecondition`] if not yet finished.
    pub fn output(&self) -> ConvertResult<&LibraryOutput> {
        if !self.is_finished() {
            return Err(ConvertError::missing("finished library"));
        }
        self.context()
            .output
            .as_ref()
            .ok_or_else(|| ConvertError::missing("library file map"))
    }

    /// Consumes the converter and returns the finished output.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::MissingPrecondition`] if not yet finished.
    pub fn into_output(self) -> ConvertResult<LibraryOutput> {
        if !self.is_finished() {
            return Err(ConvertError::missing("finished library"));
        }
        self.pipeline
            .into_context()
            .output
            .ok_or_else(|| ConvertError::missing("library file map"))
    }
}

/// Empty footprint and symbol tables.
pub(crate) fn empty_tables() -> (LibTable, LibTable) {
    (
        LibTable::new(LibTableKind::Footprint),
        LibTable::new(LibTableKind::Symbol),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn output_with_copy(source: &str) -> LibraryOutput {
        let (footprint_table, symbol_table) = empty_tables();
        LibraryOutput {
            files: BTreeMap::from([("lib.kicad_sym".to_string(), FileContent::Text("(kicad_symbol_lib)\n".into()))]),
            model_copies: vec![ModelFileCopy {
                source: source.to_string(),
                destination: "lib.3dshapes/part.step".to_string(),
            }],
            footprint_table,
            symbol_table,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn local_models_are_embedded() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("part.step"), b"ISO-10303-21;").unwrap();

        let mut output = output_with_copy("${KIPRJMOD}/part.step");
        assert_eq!(output.embed_local_models(dir.path()), 1);
        assert_eq!(
            output.files["lib.3dshapes/part.step"],
            FileContent::Binary(b"ISO-10303-21;".to_vec())
        );
    }

    #[test]
    fn missing_models_become_warnings() {
        let dir = TempDir::new().unwrap();
        let mut output = output_with_copy("missing.step");
        assert_eq!(output.embed_local_models(dir.path()), 0);
        assert_eq!(output.warnings.len(), 1);

        let mut remote = output_with_copy("https://models.example/part.step");
        assert_eq!(remote.embed_local_models(dir.path()), 0);
        assert!(remote.warnings.is_empty());
    }

    #[test]
    fn file_map_is_written() {
        let dir = TempDir::new().unwrap();
        let output = output_with_copy("x.step");
        assert_eq!(output.write_to(dir.path()).unwrap(), 1);
        let text = fs::read_to_string(dir.path().join("lib.kicad_sym")).unwrap();
        assert_eq!(text, "(kicad_symbol_lib)\n");
    }
}

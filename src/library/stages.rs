//! Library build stages.

use tracing::{debug, warn};

use crate::convert::pipeline::{Stage, StageStatus};
use crate::convert::{PcbConverter, SchematicConverter};
use crate::kicad::naming::sanitize_name;
use crate::kicad::{file_header, to_file_text, ConvertResult, LibTableEntry, Sexpr, SYMBOL_LIB_VERSION};

use super::classify::{ClassificationContext, ComponentEntries};
use super::extract::{extract_footprints_from_text, extract_symbols_from_text, ExtractOptions, SymbolEntry};
use super::model_paths::{model_basename, model_destination, rewrite_footprint_models};
use super::{empty_tables, FileContent, LibraryContext, LibraryOutput, ModelFileCopy};

/// Converts one component per step and extracts its library entries.
///
/// A component whose schematic or board conversion fails is skipped with a
/// warning; the build carries on with the rest.
#[derive(Debug, Default)]
pub struct ConvertComponentsStage {
    next: usize,
}

impl Stage<LibraryContext> for ConvertComponentsStage {
    fn name(&self) -> &'static str {
        "ConvertComponents"
    }

    fn step(&mut self, ctx: &mut LibraryContext) -> ConvertResult<StageStatus> {
        let Some(component) = ctx.components.get_mut(self.next) else {
            return Ok(StageStatus::Finished);
        };
        self.next += 1;

        let name = component.name.clone();
        let circuit = std::mem::take(&mut component.circuit);
        let options = ctx
            .options
            .convert
            .clone()
            .with_library_name(&ctx.options.library_name)
            .with_project_name(sanitize_name(&name));

        let schematic = SchematicConverter::convert(circuit.clone(), options.clone());
        let board = PcbConverter::convert(circuit, options);
        let (schematic, board) = match (schematic, board) {
            (Ok(schematic), Ok(board)) => (schematic, board),
            (Err(e), _) | (_, Err(e)) => {
                ctx.warn(format!("Component '{name}' could not be converted: {e}"));
                return Ok(StageStatus::Continue);
            }
        };

        // Entries come from the serialised text so they match what is written
        let extract = ExtractOptions {
            library_name: &ctx.options.library_name,
            matcher: &ctx.matcher,
        };
        let symbols = extract_symbols_from_text(&to_file_text(&schematic), extract);
        let footprints = extract_footprints_from_text(&to_file_text(&board), extract);
        debug!(
            component = %name,
            symbols = symbols.len(),
            footprints = footprints.len(),
            "Extracted library entries"
        );
        if symbols.is_empty() && footprints.is_empty() {
            ctx.warn(format!("Component '{name}' produced no library entries"));
        }

        ctx.extracted.push(ComponentEntries {
            component_name: name,
            footprints,
            symbols,
        });
        Ok(StageStatus::Continue)
    }
}

/// Classifies one component's entries per step.
#[derive(Debug, Default)]
pub struct ClassifyStage {
    next: usize,
}

impl Stage<LibraryContext> for ClassifyStage {
    fn name(&self) -> &'static str {
        "Classify"
    }

    fn step(&mut self, ctx: &mut LibraryContext) -> ConvertResult<StageStatus> {
        let Some(entries) = ctx.extracted.get_mut(self.next) else {
            return Ok(StageStatus::Finished);
        };
        self.next += 1;

        // Keep the component name for the summary; the entries move into
        // the collections
        let entries = ComponentEntries {
            component_name: entries.component_name.clone(),
            footprints: std::mem::take(&mut entries.footprints),
            symbols: std::mem::take(&mut entries.symbols),
        };
        ctx.classification.classify(entries);
        Ok(StageStatus::Continue)
    }
}

/// Rewrites model references for the configured mode and lists the copies.
#[derive(Debug)]
pub struct ResolveModelPathsStage;

impl Stage<LibraryContext> for ResolveModelPathsStage {
    fn name(&self) -> &'static str {
        "ResolveModelPaths"
    }

    fn step(&mut self, ctx: &mut LibraryContext) -> ConvertResult<StageStatus> {
        let mode = ctx.options.model_path_mode.clone();
        let user = ctx.classification.user_library().to_string();
        let builtin = ctx.classification.builtin_library().to_string();
        let collections = [
            (user, &mut ctx.classification.user_footprints),
            (builtin, &mut ctx.classification.builtin_footprints),
        ];

        let mut copies: Vec<ModelFileCopy> = Vec::new();
        for (library, footprints) in collections {
            for entry in footprints.values_mut() {
                let rewritten = rewrite_footprint_models(entry, &library, &mode);
                if rewritten > 0 {
                    debug!(footprint = %entry.footprint_name, rewritten, "Rewrote model references");
                }
                for source in &entry.model_3d_source_paths {
                    let Some(basename) = model_basename(source) else {
                        continue;
                    };
                    let destination = model_destination(&library, &mode, basename);
                    if copies.iter().any(|c| c.destination == destination) {
                        continue;
                    }
                    copies.push(ModelFileCopy {
                        source: source.clone(),
                        destination,
                    });
                }
            }
        }

        ctx.model_copies = copies;
        Ok(StageStatus::Finished)
    }
}

/// Builds the output file map and library tables.
#[derive(Debug)]
pub struct AssembleFilesStage;

impl Stage<LibraryContext> for AssembleFilesStage {
    fn name(&self) -> &'static str {
        "AssembleFiles"
    }

    fn step(&mut self, ctx: &mut LibraryContext) -> ConvertResult<StageStatus> {
        for (symbol, reference) in ctx.classification.dangling_footprint_refs() {
            ctx.warn(format!(
                "Symbol '{symbol}' references missing footprint '{reference}'"
            ));
        }

        let layout = ctx.layout();
        let classification: &ClassificationContext = &ctx.classification;
        let user = classification.user_library();
        let builtin = classification.builtin_library();

        let mut output = LibraryOutput {
            files: std::collections::BTreeMap::new(),
            model_copies: ctx.model_copies.clone(),
            footprint_table: empty_tables().0,
            symbol_table: empty_tables().1,
            warnings: Vec::new(),
        };

        output.files.insert(
            layout.symbol_file(user),
            FileContent::Text(symbol_library_text(classification.user_symbols.values())),
        );
        output.symbol_table.add(LibTableEntry::kicad(
            user,
            layout.symbol_uri(user),
            "Component symbols",
        ));
        if !classification.builtin_symbols.is_empty() {
            output.files.insert(
                layout.symbol_file(builtin),
                FileContent::Text(symbol_library_text(classification.builtin_symbols.values())),
            );
            output.symbol_table.add(LibTableEntry::kicad(
                builtin,
                layout.symbol_uri(builtin),
                "Shared standard symbols",
            ));
        }

        for entry in classification.user_footprints.values() {
            output.files.insert(
                layout.footprint_file(user, &entry.footprint_name),
                FileContent::Text(entry.to_text()),
            );
        }
        output.footprint_table.add(LibTableEntry::kicad(
            user,
            layout.footprint_uri(user),
            "Component footprints",
        ));
        if !classification.builtin_footprints.is_empty() {
            for entry in classification.builtin_footprints.values() {
                output.files.insert(
                    layout.footprint_file(builtin, &entry.footprint_name),
                    FileContent::Text(entry.to_text()),
                );
            }
            output.footprint_table.add(LibTableEntry::kicad(
                builtin,
                layout.footprint_uri(builtin),
                "Shared standard footprints",
            ));
        }

        for table in [&output.footprint_table, &output.symbol_table] {
            output
                .files
                .insert(table.kind.file_name().to_string(), FileContent::Text(to_file_text(&table.to_sexpr())));
        }

        if classification.is_empty() {
            warn!(library = %user, "Library build produced no entries");
        }
        output.warnings = ctx.warnings.clone();
        ctx.output = Some(output);
        Ok(StageStatus::Finished)
    }
}

/// `.kicad_sym` text for a set of symbols.
fn symbol_library_text<'a>(symbols: impl Iterator<Item = &'a SymbolEntry>) -> String {
    let mut root = Sexpr::node("kicad_symbol_lib");
    for item in file_header(SYMBOL_LIB_VERSION) {
        root.push(item);
    }
    for symbol in symbols {
        root.push(symbol.symbol_data.clone());
    }
    to_file_text(&root)
}

//! circuit-to-kicad: convert circuit descriptions into KiCad files
//!
//! A circuit description is a flat list of typed elements (components,
//! ports, nets, placements, pads, traces, 3D models). This crate turns it
//! into KiCad 9 files:
//!
//! - **Schematics**: `.kicad_sch` with symbols, wires and labels
//! - **Boards**: `.kicad_pcb` with footprints, nets, tracks and vias
//! - **Libraries**: `.kicad_sym` and `.pretty` libraries with lib tables
//!
//! # Architecture
//!
//! Every artifact is built by a staged pipeline sharing one context per run.
//! Library builds run the schematic and board pipelines once per component,
//! extract the symbols and footprints they produced, and classify them into
//! a user library and a shared builtin library.
//!
//! # Modules
//!
//! - [`circuit`] — Input elements and their index
//! - [`config`] — Configuration loading and validation
//! - [`convert`] — Schematic and board converters
//! - [`error`] — Configuration error types
//! - [`kicad`] — KiCad element trees, naming and lib tables
//! - [`library`] — Library extraction, classification and assembly

pub mod circuit;
pub mod config;
pub mod convert;
pub mod error;
pub mod kicad;
pub mod library;

//! mrshim: resolve Go MapReduce structs into Hadoop shim descriptors.
//!
//! Structs marked `@mapper` or `@reducer` in their doc comments are checked
//! against a naming convention (`New<Struct>`, `Map`/`Reduce`, a context
//! interface with `Write` and `Next`) and turned into descriptors carrying
//! the Java, gobind and Hadoop Writable names a shim renderer needs.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;

pub use crate::core::engine::Engine;
pub use error::{Error, ResolutionError, Result};

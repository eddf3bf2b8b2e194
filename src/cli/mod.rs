//! MS-013: CLI subcommands (check, inspect, resolve).

use crate::config::{Settings, ValidationMode};
use crate::core::engine::Engine;
use crate::error::{Error, Result};
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and validate packages without resolving targets
    Check {
        /// Package directories, files or root-relative import paths
        #[arg(required = true)]
        paths: Vec<String>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print the extracted package models
    Inspect {
        #[arg(required = true)]
        paths: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Resolve @mapper/@reducer targets into shim descriptors
    Resolve {
        #[arg(required = true)]
        paths: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Write descriptors here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,
    },
}

/// Flags that override the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Primary search root for non-local paths (looked up under <root>/src)
    #[arg(long)]
    pub primary_root: Option<PathBuf>,

    /// Secondary search root, tried after the primary
    #[arg(long)]
    pub secondary_root: Option<PathBuf>,

    /// Semantic validator
    #[arg(long, value_enum)]
    pub validator: Option<ValidationMode>,

    /// `go` binary used by the go validator
    #[arg(long)]
    pub go_bin: Option<PathBuf>,
}

impl SourceArgs {
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(p) = &self.primary_root {
            settings.roots.primary = Some(p.clone());
        }
        if let Some(s) = &self.secondary_root {
            settings.roots.secondary = Some(s.clone());
        }
        if let Some(mode) = self.validator {
            settings.validation.mode = mode;
        }
        if let Some(bin) = &self.go_bin {
            settings.validation.go_bin = bin.clone();
        }
        settings
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands, settings: Settings) -> Result<()> {
    match cmd {
        Commands::Check { paths, source } => cmd_check(&paths, &source.apply(settings)),
        Commands::Inspect {
            paths,
            format,
            source,
        } => cmd_inspect(&paths, format, &source.apply(settings)),
        Commands::Resolve {
            paths,
            format,
            out,
            source,
        } => cmd_resolve(&paths, format, out.as_deref(), &source.apply(settings)),
    }
}

fn cmd_check(paths: &[String], settings: &Settings) -> Result<()> {
    let engine = Engine::from_settings(settings);
    for package in engine.load(paths)? {
        println!(
            "OK: {} ({} structs, {} interfaces, {} functions) at {}",
            package.name,
            package.structs.len(),
            package.interfaces.len(),
            package.functions.len(),
            package.dir.display()
        );
    }
    Ok(())
}

fn cmd_inspect(paths: &[String], format: OutputFormat, settings: &Settings) -> Result<()> {
    let packages = Engine::from_settings(settings).load(paths)?;
    print!("{}", render(&packages, format)?);
    Ok(())
}

fn cmd_resolve(
    paths: &[String],
    format: OutputFormat,
    out: Option<&Path>,
    settings: &Settings,
) -> Result<()> {
    let descriptors = Engine::from_settings(settings).run(paths)?;
    let text = render(&descriptors, format)?;
    match out {
        Some(path) => {
            std::fs::write(path, text).map_err(|source| Error::Write {
                path: path.to_path_buf(),
                source,
            })?;
            println!("Wrote {} descriptor(s) to {}", descriptors.len(), path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

/// Serialize `value` in the requested format, newline-terminated.
pub fn render<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map(|s| s + "\n")
            .map_err(|e| Error::Render(e.to_string())),
        OutputFormat::Yaml => {
            serde_yaml_ng::to_string(value).map_err(|e| Error::Render(e.to_string()))
        }
    }
}

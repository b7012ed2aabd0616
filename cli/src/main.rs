// Copyright (c) 2026 SeisCube Developers. MIT License.
// See LICENSE for details.

//! # SeisCube Command-Line Tool
//!
//! Entry point for the `seiscube` binary. Parses CLI arguments, initializes
//! logging and dispatches to one of the cube commands:
//!
//! - `info`            print the survey summary
//! - `init`            register every grid node in the store
//! - `attributes`      list stored attributes
//! - `add-attribute`   create an attribute table
//! - `drop-attribute`  remove an attribute table
//! - `to-world`        grid to world coordinates
//! - `to-grid`         world coordinates to the nearest grid node
//! - `export-flat`     flat column export
//! - `export-gslib`    GSLIB point export

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use seiscube::{Cdp, SeisCube};

use cli::{Commands, SeisCubeCli};
use logging::LogFormat;

fn main() -> Result<()> {
    let cli = SeisCubeCli::parse();
    logging::init_logging(logging::DEFAULT_FILTER, LogFormat::from_str_lossy(&cli.log_format));

    match cli.command {
        Commands::Info(args) => {
            let cube = open_cube(&args.config)?;
            println!("{cube}");
            Ok(())
        }
        Commands::Init(args) => init_cube(&args.config),
        Commands::Attributes(args) => {
            let cube = open_cube(&args.config)?;
            for name in cube.attributes() {
                println!("{name}");
            }
            Ok(())
        }
        Commands::AddAttribute(args) => {
            let cube = open_cube(&args.survey.config)?;
            cube.add_attribute(&args.name)
                .with_context(|| format!("failed to add attribute '{}'", args.name))?;
            tracing::info!(attribute = %args.name, "attribute added");
            Ok(())
        }
        Commands::DropAttribute(args) => {
            let cube = open_cube(&args.survey.config)?;
            let dropped = cube
                .drop_attribute(&args.name)
                .with_context(|| format!("failed to drop attribute '{}'", args.name))?;
            if dropped {
                tracing::info!(attribute = %args.name, "attribute dropped");
            } else {
                tracing::warn!(attribute = %args.name, "no such attribute");
            }
            Ok(())
        }
        Commands::ToWorld(args) => {
            let cube = open_cube(&args.survey.config)?;
            let (east, north) = cube.geometry().forward(args.inline, args.crline);
            println!("{east}\t{north}");
            Ok(())
        }
        Commands::ToGrid(args) => {
            let cube = open_cube(&args.survey.config)?;
            let Cdp { inline, crline } = cube
                .coord_to_line(args.east, args.north)
                .with_context(|| format!("failed to locate ({}, {})", args.east, args.north))?;
            println!("{inline}\t{crline}");
            Ok(())
        }
        Commands::ExportFlat(args) => {
            let cube = open_cube(&args.survey.config)?;
            let out = output(args.output.as_deref())?;
            cube.export_flat(&args.attribute, out)
                .with_context(|| format!("flat export of '{}' failed", args.attribute))?;
            log_export("flat", &args.attribute, args.output.as_ref());
            Ok(())
        }
        Commands::ExportGslib(args) => {
            let export = args.export;
            let cube = open_cube(&export.survey.config)?;
            let out = output(export.output.as_deref())?;
            cube.export_gslib(&export.attribute, out, args.title.as_deref())
                .with_context(|| format!("GSLIB export of '{}' failed", export.attribute))?;
            log_export("gslib", &export.attribute, export.output.as_ref());
            Ok(())
        }
    }
}

/// Opens the cube described by the JSON file at `config`.
fn open_cube(config: &Path) -> Result<SeisCube> {
    let cube = SeisCube::from_json_file(config)
        .with_context(|| format!("failed to open cube from {}", config.display()))?;
    tracing::debug!(config = %config.display(), "cube opened");
    Ok(cube)
}

/// Registers every grid node so that attribute writes have cells to land on.
fn init_cube(config: &Path) -> Result<()> {
    let cube = open_cube(config)?;
    let created = cube
        .populate_grid()
        .context("failed to register grid cells")?;
    let total = cube.store().cell_count().context("failed to count cells")?;

    tracing::info!(created, total, "grid cells registered");

    println!("Cube initialized successfully.");
    println!("  Survey         : {}", config.display());
    println!("  Cells created  : {created}");
    println!("  Cells total    : {total}");

    Ok(())
}

/// Export sink: the named file, or stdout when none is given.
fn output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout().lock()),
    })
}

fn log_export(format: &str, attribute: &str, path: Option<&PathBuf>) {
    match path {
        Some(path) => tracing::info!(format, attribute, path = %path.display(), "export written"),
        None => tracing::debug!(format, attribute, "export written to stdout"),
    }
}

//! # CLI Interface
//!
//! Command-line argument structure for `seiscube`, built with `clap`
//! derive. Every subcommand that touches a cube takes the survey description
//! through `--config` or the `SEISCUBE_CONFIG` environment variable.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// SeisCube seismic data cube tool.
///
/// Inspects a survey, manages its attribute tables, converts between grid
/// and world coordinates and exports attributes as flat or GSLIB text.
#[derive(Parser, Debug)]
#[command(
    name = "seiscube",
    about = "Seismic data cube tool",
    version,
    propagate_version = true
)]
pub struct SeisCubeCli {
    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "SEISCUBE_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the survey summary: axis ranges, bin sizes, store and attributes.
    Info(SurveyArgs),
    /// Register every grid node in the store so attributes can be written.
    Init(SurveyArgs),
    /// List the stored attributes.
    Attributes(SurveyArgs),
    /// Create an empty attribute table.
    AddAttribute(AttributeArgs),
    /// Remove an attribute table and all its values.
    DropAttribute(AttributeArgs),
    /// Convert an (inline, crossline) pair to world coordinates.
    ToWorld(ToWorldArgs),
    /// Convert world coordinates to the nearest grid node.
    ToGrid(ToGridArgs),
    /// Export one attribute in the flat column format.
    ExportFlat(ExportArgs),
    /// Export one attribute in the GSLIB point format.
    ExportGslib(GslibArgs),
}

/// Location of the survey description.
#[derive(Args, Debug)]
pub struct SurveyArgs {
    /// Path to the JSON survey description.
    #[arg(long, short = 'c', env = "SEISCUBE_CONFIG")]
    pub config: PathBuf,
}

/// Arguments for commands acting on one attribute by name.
#[derive(Args, Debug)]
pub struct AttributeArgs {
    #[command(flatten)]
    pub survey: SurveyArgs,

    /// Attribute name (`[A-Za-z][A-Za-z0-9_]*`).
    pub name: String,
}

/// Arguments for the `to-world` subcommand.
#[derive(Args, Debug)]
pub struct ToWorldArgs {
    #[command(flatten)]
    pub survey: SurveyArgs,

    /// Inline number (fractional values are allowed).
    #[arg(allow_negative_numbers = true)]
    pub inline: f64,

    /// Crossline number (fractional values are allowed).
    #[arg(allow_negative_numbers = true)]
    pub crline: f64,
}

/// Arguments for the `to-grid` subcommand.
#[derive(Args, Debug)]
pub struct ToGridArgs {
    #[command(flatten)]
    pub survey: SurveyArgs,

    /// Easting in world units.
    #[arg(allow_negative_numbers = true)]
    pub east: f64,

    /// Northing in world units.
    #[arg(allow_negative_numbers = true)]
    pub north: f64,
}

/// Arguments for the `export-flat` subcommand.
#[derive(Args, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub survey: SurveyArgs,

    /// Attribute to export.
    pub attribute: String,

    /// Output file. Writes to stdout when omitted.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Arguments for the `export-gslib` subcommand.
#[derive(Args, Debug)]
pub struct GslibArgs {
    #[command(flatten)]
    pub export: ExportArgs,

    /// Title line of the GSLIB file.
    #[arg(long)]
    pub title: Option<String>,
}

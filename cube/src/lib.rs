// Copyright (c) 2026 SeisCube Developers. MIT License.
// See LICENSE for details.

//! # SeisCube: Core Library
//!
//! A regularly sampled 3D seismic survey ("data cube") addressed by inline,
//! crossline and depth, with named scalar attributes stored per grid cell.
//!
//! ## Architecture
//!
//! - **geometry**: survey bounds and the affine grid ↔ world calibration.
//!   Pure math, no I/O.
//! - **storage**: one `position` table of cell identities
//!   plus one table per attribute, with slice and point access.
//! - **cube**: `SeisCube`, which composes the two, reshapes slices to the
//!   survey extents and drives exports.
//! - **export**: flat column and GSLIB point text formats.
//! - **config**: JSON survey description and crate-wide constants.
//! - **error**: the `CubeError` taxonomy.
//!
//! ## Quick Start
//!
//! ```no_run
//! use seiscube::{Cdp, SeisCube};
//!
//! # fn main() -> seiscube::CubeResult<()> {
//! let cube = SeisCube::from_json_file("survey.json")?;
//! cube.populate_grid()?;
//! cube.add_attribute("por")?;
//! cube.set_sample(Cdp::new(102, 201), 5.0, "por", 0.2)?;
//! let column = cube.cdp(Cdp::new(102, 201), "por")?;
//! assert_eq!(column.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod cube;
pub mod error;
pub mod export;
pub mod geometry;
pub mod storage;

pub use config::CubeConfig;
pub use cube::SeisCube;
pub use error::{CubeError, CubeResult, ErrorKind, ExistsReason};
pub use geometry::{Axis, Cdp, ControlPoint, Extent, GridGeometry, SurveyBounds};
pub use storage::{AttributeStore, CubeDb, Sample};

//! # Survey Configuration & Constants
//!
//! Every fixed name and tolerance used by SeisCube lives in the constants
//! section below. The second half of the module loads the JSON survey
//! description that supplies the grid bounds, the three calibration control
//! points and the location of the backing store.
//!
//! ## Document Layout
//!
//! ```json
//! {
//!   "db_file": "survey.db",
//!   "inline": [100, 104, 2],
//!   "crline": [200, 202, 1],
//!   "depth": [0, 10, 5],
//!   "Coordinate": [[100, 200, 1000, 5000],
//!                  [100, 202, 1000, 5100],
//!                  [104, 202, 1200, 5100]]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CubeError, CubeResult};
use crate::geometry::{ControlPoint, DepthAxis, LineAxis, SurveyBounds};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Name of the table holding cell identities. Never usable as an attribute.
pub const POSITION_TABLE: &str = "position";

/// Prefix of tables the store maintains for its own bookkeeping. Attribute
/// names must start with a letter, so they can never carry this prefix.
pub const INTERNAL_TABLE_PREFIX: &str = "__";

/// Name of the sled tree that indexes cells by `(inline, crline, twt)`.
pub const CELL_INDEX_TABLE: &str = "__cell_index";

/// Longest accepted attribute name, in bytes.
pub const MAX_ATTRIBUTE_NAME_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Bin sizes are reported with this many decimals.
pub const BIN_SIZE_DECIMALS: i32 = 2;

/// Relative slack applied when counting depth samples, so that a fractional
/// step such as 0.1 does not lose its last sample to float noise.
pub const DEPTH_COUNT_TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Number of columns in a GSLIB point export: x, y, z and the attribute.
pub const GSLIB_FIELD_COUNT: usize = 4;

/// Title line used when the caller does not supply one.
pub const DEFAULT_GSLIB_TITLE: &str = "seismic data";

// ---------------------------------------------------------------------------
// CubeConfig
// ---------------------------------------------------------------------------

/// The survey description as it appears on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeConfig {
    /// Location of the backing store directory.
    pub db_file: PathBuf,
    /// `[start, end, step]` of the inline axis.
    pub inline: [i64; 3],
    /// `[start, end, step]` of the crossline axis.
    pub crline: [i64; 3],
    /// `[start, end, step]` of the depth (two-way time) axis.
    pub depth: [f64; 3],
    /// Control points A, B, C as `[inline, crline, east, north]`.
    #[serde(rename = "Coordinate")]
    pub coordinate: [[f64; 4]; 3],
}

impl CubeConfig {
    /// Parse a configuration document.
    pub fn from_json_str(json: &str) -> CubeResult<Self> {
        serde_json::from_str(json).map_err(|e| CubeError::config(field_of(&e), e.to_string()))
    }

    /// Read and parse a configuration file. A relative `db_file` is resolved
    /// against the directory containing the file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> CubeResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CubeError::config(path.display().to_string(), e.to_string()))?;
        let mut config = Self::from_json_str(&text)?;
        if config.db_file.is_relative() {
            if let Some(dir) = path.parent() {
                config.db_file = dir.join(&config.db_file);
            }
        }
        tracing::debug!(path = %path.display(), db_file = %config.db_file.display(), "configuration loaded");
        Ok(config)
    }

    /// The grid bounds described by this document.
    pub fn bounds(&self) -> SurveyBounds {
        let [i0, i1, is] = self.inline;
        let [c0, c1, cs] = self.crline;
        let [d0, d1, ds] = self.depth;
        SurveyBounds {
            inline: LineAxis::new(i0, i1, is),
            crline: LineAxis::new(c0, c1, cs),
            depth: DepthAxis::new(d0, d1, ds),
        }
    }

    /// Control points A, B and C, in document order.
    pub fn control_points(&self) -> [ControlPoint; 3] {
        self.coordinate.map(|[inline, crline, east, north]| ControlPoint {
            inline,
            crline,
            east,
            north,
        })
    }
}

/// Best-effort extraction of the offending field from a serde message such
/// as "missing field `depth` at line 3 column 1".
fn field_of(err: &serde_json::Error) -> String {
    let msg = err.to_string();
    msg.split('`')
        .nth(1)
        .map(str::to_string)
        .unwrap_or_else(|| "document".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const SAMPLE: &str = r#"{
        "db_file": "survey.db",
        "inline": [100, 104, 2],
        "crline": [200, 202, 1],
        "depth": [0, 10, 5],
        "Coordinate": [[100, 200, 1000, 5000],
                       [100, 202, 1000, 5100],
                       [104, 202, 1200, 5100]]
    }"#;

    #[test]
    fn parses_sample_document() {
        let config = CubeConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.db_file, PathBuf::from("survey.db"));
        assert_eq!(config.inline, [100, 104, 2]);
        assert_eq!(config.depth, [0.0, 10.0, 5.0]);

        let [a, b, c] = config.control_points();
        assert_eq!((a.inline, a.crline, a.east, a.north), (100.0, 200.0, 1000.0, 5000.0));
        assert_eq!(b.north, 5100.0);
        assert_eq!(c.east, 1200.0);

        let bounds = config.bounds();
        assert_eq!(bounds.crline.step, 1);
        assert_eq!(bounds.depth.end, 10.0);
    }

    #[test]
    fn missing_field_names_the_field() {
        let err = CubeConfig::from_json_str(r#"{"db_file": "x", "inline": [1, 2, 1]}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        match err {
            CubeError::Configuration { field, .. } => assert_eq!(field, "crline"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_axis_is_configuration_error() {
        let bad = SAMPLE.replace("[100, 104, 2]", "[100, 104]");
        let err = CubeConfig::from_json_str(&bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn relative_db_file_resolves_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = CubeConfig::from_json_file(&path).unwrap();
        assert_eq!(config.db_file, dir.path().join("survey.db"));
    }

    #[test]
    fn unreadable_file_is_configuration_error() {
        let err = CubeConfig::from_json_file("/nonexistent/cube.json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}

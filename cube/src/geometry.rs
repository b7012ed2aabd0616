//! # Survey Geometry
//!
//! Pure calibration math: grid bounds, the affine map between grid indices
//! and projected world coordinates, and snapping of world coordinates back
//! onto grid nodes. Nothing in this module touches the store.
//!
//! ## Calibration
//!
//! Three control points `(inline, crline, east, north)` pin the affine map
//!
//! ```text
//! east  = alpha_x + beta_x * inline + gamma_x * crline
//! north = alpha_y + beta_y * inline + gamma_y * crline
//! ```
//!
//! The two grid-space differences `B - A` and `C - B` give a 2×2 system per
//! world axis. It is solvable exactly when the three points are not collinear
//! in grid space. The usual survey layout puts A and B on one inline and B and
//! C on one crossline, which reduces the system to the familiar ratios
//! `gamma = ΔAB / Δcrline` and `beta = ΔBC / Δinline`.
//!
//! ## Snapping
//!
//! `inverse` lands on real-valued line numbers. Each axis is snapped on its own
//! to `start + step * round((raw - start) / step)`, where `round` takes halves
//! away from zero (`f64::round`). A point exactly between two inlines therefore
//! snaps to the inline further from the axis origin.

use std::fmt;

use crate::config::{BIN_SIZE_DECIMALS, DEPTH_COUNT_TOLERANCE};
use crate::error::{CubeError, CubeResult};

// ---------------------------------------------------------------------------
// Axes
// ---------------------------------------------------------------------------

/// One of the three survey axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Inline,
    Crossline,
    Depth,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Inline => f.write_str("inline"),
            Axis::Crossline => f.write_str("crossline"),
            Axis::Depth => f.write_str("depth"),
        }
    }
}

/// An integer line axis (inline or crossline): `start, start + step, ..., end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAxis {
    pub start: i64,
    pub end: i64,
    pub step: i64,
}

impl LineAxis {
    pub const fn new(start: i64, end: i64, step: i64) -> Self {
        Self { start, end, step }
    }

    /// Number of lines, `(end - start) / step + 1`. Zero if the axis is
    /// malformed.
    pub fn count(&self) -> usize {
        self.checked_count().map_or(0, |n| n.max(0) as usize)
    }

    fn checked_count(&self) -> Option<i64> {
        self.end
            .checked_sub(self.start)?
            .checked_div(self.step)?
            .checked_add(1)
    }

    /// Whether `value` lies within `[start, end]`.
    pub fn contains(&self, value: f64) -> bool {
        self.start as f64 <= value && value <= self.end as f64
    }

    /// Snap a real-valued line number to the nearest node of this axis.
    ///
    /// `None` if `raw` is not finite or the node is not representable as an
    /// `i64` line number.
    pub fn snap(&self, raw: f64) -> Option<i64> {
        if !raw.is_finite() {
            return None;
        }
        let k = ((raw - self.start as f64) / self.step as f64).round();
        // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
        if !(k >= i64::MIN as f64 && k < i64::MAX as f64) {
            return None;
        }
        self.step.checked_mul(k as i64)?.checked_add(self.start)
    }

    fn validate(&self, field: &str) -> CubeResult<()> {
        if self.step == 0 {
            return Err(CubeError::config(field, "step must be non-zero"));
        }
        if self.end < self.start {
            return Err(CubeError::config(
                field,
                format!("end {} precedes start {}", self.end, self.start),
            ));
        }
        match self.checked_count() {
            None => return Err(CubeError::config(field, "axis count overflows")),
            Some(n) if n <= 0 => return Err(CubeError::config(field, "axis count must be positive")),
            Some(_) => {}
        }
        Ok(())
    }
}

/// The depth (two-way time) axis. Its step may be fractional, so the sample
/// count uses truncating division.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthAxis {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl DepthAxis {
    pub const fn new(start: f64, end: f64, step: f64) -> Self {
        Self { start, end, step }
    }

    /// Number of depth samples, `trunc((end - start) / step) + 1`.
    pub fn count(&self) -> usize {
        self.raw_count() as usize
    }

    fn raw_count(&self) -> f64 {
        ((self.end - self.start) / self.step + DEPTH_COUNT_TOLERANCE).floor() + 1.0
    }

    /// Depth value of sample `index`.
    pub fn value_at(&self, index: usize) -> f64 {
        self.start + self.step * index as f64
    }

    /// Sample index of `twt`, if it sits on a node of this axis.
    pub fn index_of(&self, twt: f64) -> Option<usize> {
        let k = (twt - self.start) / self.step;
        let nearest = k.round();
        if (k - nearest).abs() > 1e-6 || nearest < 0.0 || nearest as usize >= self.count() {
            return None;
        }
        Some(nearest as usize)
    }

    /// Whether `value` lies within `[start, end]`, allowing float noise on
    /// the last sample.
    pub fn contains(&self, value: f64) -> bool {
        let slack = self.step.abs() * DEPTH_COUNT_TOLERANCE;
        self.start - slack <= value && value <= self.end + slack
    }

    fn validate(&self) -> CubeResult<()> {
        if !(self.start.is_finite() && self.end.is_finite() && self.step.is_finite()) {
            return Err(CubeError::config("depth", "bounds must be finite"));
        }
        if self.step == 0.0 {
            return Err(CubeError::config("depth", "step must be non-zero"));
        }
        if self.end < self.start {
            return Err(CubeError::config(
                "depth",
                format!("end {} precedes start {}", self.end, self.start),
            ));
        }
        let n = self.raw_count();
        if !n.is_finite() || n >= i64::MAX as f64 {
            return Err(CubeError::config("depth", "axis count overflows"));
        }
        if n < 1.0 {
            return Err(CubeError::config("depth", "axis count must be positive"));
        }
        Ok(())
    }
}

/// Bounds of all three axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurveyBounds {
    pub inline: LineAxis,
    pub crline: LineAxis,
    pub depth: DepthAxis,
}

/// Axis counts: `n_east` inlines, `n_north` crosslines, `n_depth` samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub n_east: usize,
    pub n_north: usize,
    pub n_depth: usize,
}

/// A lazy, restartable walk over the nodes of one axis.
///
/// Each value is computed as `start + step * k` rather than accumulated, so
/// fractional depth steps do not drift.
#[derive(Debug, Clone)]
pub struct AxisRange {
    start: f64,
    step: f64,
    len: usize,
    pos: usize,
}

impl AxisRange {
    /// The same walk, yielding integer line numbers.
    pub fn lines(self) -> impl Iterator<Item = i64> + Clone {
        self.map(|v| v.round() as i64)
    }
}

impl Iterator for AxisRange {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.pos >= self.len {
            return None;
        }
        let value = self.start + self.step * self.pos as f64;
        self.pos += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for AxisRange {}

// ---------------------------------------------------------------------------
// Calibration
// ---------------------------------------------------------------------------

/// A known pairing of grid position and world coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    pub inline: f64,
    pub crline: f64,
    pub east: f64,
    pub north: f64,
}

/// A grid node, addressed by inline and crossline number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cdp {
    pub inline: i64,
    pub crline: i64,
}

impl Cdp {
    pub const fn new(inline: i64, crline: i64) -> Self {
        Self { inline, crline }
    }
}

/// The six coefficients of the grid → world map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub alpha_x: f64,
    pub beta_x: f64,
    pub gamma_x: f64,
    pub alpha_y: f64,
    pub beta_y: f64,
    pub gamma_y: f64,
}

impl AffineTransform {
    /// Solve the map from three control points.
    ///
    /// Fails with `Configuration` if the points are collinear in grid space.
    pub fn from_control_points(points: &[ControlPoint; 3]) -> CubeResult<Self> {
        if points
            .iter()
            .any(|p| !(p.inline.is_finite() && p.crline.is_finite() && p.east.is_finite() && p.north.is_finite()))
        {
            return Err(CubeError::config("Coordinate", "control points must be finite"));
        }

        let [a, b, c] = points;
        let (di1, dc1) = (b.inline - a.inline, b.crline - a.crline);
        let (di2, dc2) = (c.inline - b.inline, c.crline - b.crline);
        let det = di1 * dc2 - dc1 * di2;
        if det == 0.0 {
            return Err(CubeError::config(
                "Coordinate",
                "control points are collinear in grid space",
            ));
        }

        // Cramer's rule on [di1 dc1; di2 dc2] · [beta; gamma] = [dw1; dw2].
        let solve = |dw1: f64, dw2: f64| ((dw1 * dc2 - dc1 * dw2) / det, (di1 * dw2 - dw1 * di2) / det);
        let (beta_x, gamma_x) = solve(b.east - a.east, c.east - b.east);
        let (beta_y, gamma_y) = solve(b.north - a.north, c.north - b.north);

        Ok(Self {
            alpha_x: a.east - beta_x * a.inline - gamma_x * a.crline,
            beta_x,
            gamma_x,
            alpha_y: a.north - beta_y * a.inline - gamma_y * a.crline,
            beta_y,
            gamma_y,
        })
    }

    /// Determinant of `G = [[beta_x, gamma_x], [beta_y, gamma_y]]`.
    pub fn determinant(&self) -> f64 {
        self.beta_x * self.gamma_y - self.gamma_x * self.beta_y
    }

    /// Grid → world.
    pub fn apply(&self, inline: f64, crline: f64) -> (f64, f64) {
        (
            self.alpha_x + self.beta_x * inline + self.gamma_x * crline,
            self.alpha_y + self.beta_y * inline + self.gamma_y * crline,
        )
    }

    /// World → real-valued grid position, solving `G·m = d`.
    pub fn solve(&self, east: f64, north: f64) -> CubeResult<(f64, f64)> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(CubeError::SingularGeometry {
                operation: "inverse",
                determinant: det,
            });
        }
        let dx = east - self.alpha_x;
        let dy = north - self.alpha_y;
        Ok((
            (dx * self.gamma_y - self.gamma_x * dy) / det,
            (self.beta_x * dy - dx * self.beta_y) / det,
        ))
    }
}

/// Physical distance per line number along each grid axis, rounded to
/// centimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinSize {
    pub inline: f64,
    pub crline: f64,
}

// ---------------------------------------------------------------------------
// GridGeometry
// ---------------------------------------------------------------------------

/// Immutable survey geometry: bounds, extents and calibration.
#[derive(Debug, Clone, PartialEq)]
pub struct GridGeometry {
    bounds: SurveyBounds,
    transform: AffineTransform,
    extent: Extent,
    bin_size: BinSize,
}

impl GridGeometry {
    /// Validate the bounds and calibrate from three control points.
    pub fn new(bounds: SurveyBounds, points: [ControlPoint; 3]) -> CubeResult<Self> {
        bounds.inline.validate("inline")?;
        bounds.crline.validate("crline")?;
        bounds.depth.validate()?;

        let transform = AffineTransform::from_control_points(&points)?;
        let det = transform.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(CubeError::SingularGeometry {
                operation: "calibrate",
                determinant: det,
            });
        }

        let extent = Extent {
            n_east: bounds.inline.count(),
            n_north: bounds.crline.count(),
            n_depth: bounds.depth.count(),
        };
        let bin_size = BinSize {
            inline: round_to(transform.beta_x.hypot(transform.beta_y), BIN_SIZE_DECIMALS),
            crline: round_to(transform.gamma_x.hypot(transform.gamma_y), BIN_SIZE_DECIMALS),
        };

        tracing::debug!(
            n_east = extent.n_east,
            n_north = extent.n_north,
            n_depth = extent.n_depth,
            inline_bin = bin_size.inline,
            crline_bin = bin_size.crline,
            "geometry calibrated"
        );

        Ok(Self {
            bounds,
            transform,
            extent,
            bin_size,
        })
    }

    pub fn bounds(&self) -> &SurveyBounds {
        &self.bounds
    }

    pub fn transform(&self) -> &AffineTransform {
        &self.transform
    }

    pub fn bin_size(&self) -> BinSize {
        self.bin_size
    }

    /// `(n_east, n_north, n_depth)`.
    pub fn extent_counts(&self) -> Extent {
        self.extent
    }

    /// Grid → world, with no rounding.
    pub fn forward(&self, inline: f64, crline: f64) -> (f64, f64) {
        self.transform.apply(inline, crline)
    }

    /// World → nearest grid node. The result is snapped but not clamped, so
    /// coordinates outside the survey map to nodes outside the bounds.
    ///
    /// Fails with `OutOfRange` when a coordinate is not finite or lies so far
    /// off the survey that its line number does not fit in an `i64`.
    pub fn inverse(&self, east: f64, north: f64) -> CubeResult<Cdp> {
        let (inline, crline) = self.transform.solve(east, north)?;
        let snap = |axis: Axis, line: &LineAxis, raw: f64| {
            line.snap(raw).ok_or(CubeError::OutOfRange {
                operation: "inverse",
                axis,
                index: raw,
                start: line.start as f64,
                end: line.end as f64,
            })
        };
        Ok(Cdp {
            inline: snap(Axis::Inline, &self.bounds.inline, inline)?,
            crline: snap(Axis::Crossline, &self.bounds.crline, crline)?,
        })
    }

    /// Nodes of `axis` from start to end.
    pub fn axis_range(&self, axis: Axis) -> AxisRange {
        let (start, step, len) = match axis {
            Axis::Inline => (
                self.bounds.inline.start as f64,
                self.bounds.inline.step as f64,
                self.extent.n_east,
            ),
            Axis::Crossline => (
                self.bounds.crline.start as f64,
                self.bounds.crline.step as f64,
                self.extent.n_north,
            ),
            Axis::Depth => (self.bounds.depth.start, self.bounds.depth.step, self.extent.n_depth),
        };
        AxisRange {
            start,
            step,
            len,
            pos: 0,
        }
    }

    /// Whether `value` lies inside the bounds of `axis`.
    pub fn contains(&self, axis: Axis, value: f64) -> bool {
        match axis {
            Axis::Inline => self.bounds.inline.contains(value),
            Axis::Crossline => self.bounds.crline.contains(value),
            Axis::Depth => self.bounds.depth.contains(value),
        }
    }

    /// Fail with `OutOfRange` unless `value` lies inside the bounds of `axis`.
    pub fn check_range(&self, operation: &'static str, axis: Axis, value: f64) -> CubeResult<()> {
        if self.contains(axis, value) {
            return Ok(());
        }
        let (start, end) = match axis {
            Axis::Inline => (self.bounds.inline.start as f64, self.bounds.inline.end as f64),
            Axis::Crossline => (self.bounds.crline.start as f64, self.bounds.crline.end as f64),
            Axis::Depth => (self.bounds.depth.start, self.bounds.depth.end),
        };
        Err(CubeError::OutOfRange {
            operation,
            axis,
            index: value,
            start,
            end,
        })
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

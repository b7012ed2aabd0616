//! # The Cube-Level API
//!
//! Composes the survey geometry with the attribute store. Grid addresses are
//! range-checked against the geometry, slice results are reshaped to the
//! geometry's extents, and exports walk the grid through the geometry's axis
//! ranges.
//!
//! | Slice     | Shape                 |
//! |-----------|-----------------------|
//! | inline    | `(n_north, n_depth)`  |
//! | crossline | `(n_east, n_depth)`   |
//! | depth     | `(n_east, n_north)`   |
//!
//! A slice with no stored values comes back with zero rows. Any other count
//! that disagrees with the shape is a `DataIntegrity` error: the array is
//! never padded or truncated.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use ndarray::Array2;

use crate::config::{CubeConfig, DEFAULT_GSLIB_TITLE};
use crate::error::{CubeError, CubeResult};
use crate::export;
use crate::geometry::{Axis, AxisRange, Cdp, GridGeometry};
use crate::storage::{AttributeStore, CubeDb, PositionRow, Sample};

/// A seismic data cube backed by an attribute store.
#[derive(Debug, Clone)]
pub struct SeisCube {
    geometry: Arc<GridGeometry>,
    store: AttributeStore,
}

impl SeisCube {
    /// Open the cube described by `config`, with its store at `config.db_file`.
    pub fn open(config: &CubeConfig) -> CubeResult<Self> {
        Self::with_db(config, CubeDb::at_path(&config.db_file))
    }

    /// Load a configuration file and open the cube it describes.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> CubeResult<Self> {
        let config = CubeConfig::from_json_file(path)?;
        Self::open(&config)
    }

    /// A cube over an in-memory store, ignoring `config.db_file`.
    pub fn temporary(config: &CubeConfig) -> CubeResult<Self> {
        Self::with_db(config, CubeDb::open_temporary()?)
    }

    fn with_db(config: &CubeConfig, db: CubeDb) -> CubeResult<Self> {
        let geometry = Arc::new(GridGeometry::new(config.bounds(), config.control_points())?);
        let store = AttributeStore::new(db, Arc::clone(&geometry));
        Ok(Self { geometry, store })
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn store(&self) -> &AttributeStore {
        &self.store
    }

    // -- Cells & attributes -------------------------------------------------

    /// Register every node of the grid as a cell. Existing cells are kept.
    /// Returns the number of cells created.
    pub fn populate_grid(&self) -> CubeResult<usize> {
        let g = &self.geometry;
        let mut cells = Vec::new();
        for inline in g.axis_range(Axis::Inline).lines() {
            for crline in g.axis_range(Axis::Crossline).lines() {
                for twt in g.axis_range(Axis::Depth) {
                    cells.push(PositionRow { inline, crline, twt });
                }
            }
        }
        let created = self.store.register_cells(cells)?;
        tracing::info!(created, "grid populated");
        Ok(created)
    }

    /// Stored attribute names (best effort).
    pub fn attributes(&self) -> Vec<String> {
        self.store.list_attributes().into_iter().collect()
    }

    pub fn add_attribute(&self, name: &str) -> CubeResult<()> {
        self.store.create_attribute(name)
    }

    pub fn drop_attribute(&self, name: &str) -> CubeResult<bool> {
        self.store.drop_attribute(name)
    }

    // -- Coordinates --------------------------------------------------------

    /// World coordinate → nearest grid node.
    pub fn coord_to_line(&self, east: f64, north: f64) -> CubeResult<Cdp> {
        self.geometry.inverse(east, north)
    }

    /// Grid node → world coordinate.
    pub fn line_to_coord(&self, cdp: Cdp) -> (f64, f64) {
        self.geometry.forward(cdp.inline as f64, cdp.crline as f64)
    }

    /// Depth values of the survey, first to last.
    pub fn depth_values(&self) -> AxisRange {
        self.geometry.axis_range(Axis::Depth)
    }

    // -- Slices -------------------------------------------------------------

    pub fn inline(&self, inline: i64, attribute: &str) -> CubeResult<Array2<f64>> {
        let samples = self.store.read_slice(Axis::Inline, inline as f64, attribute)?;
        let e = self.geometry.extent_counts();
        reshape("inline", attribute, &samples, (e.n_north, e.n_depth))
    }

    pub fn crline(&self, crline: i64, attribute: &str) -> CubeResult<Array2<f64>> {
        let samples = self.store.read_slice(Axis::Crossline, crline as f64, attribute)?;
        let e = self.geometry.extent_counts();
        reshape("crline", attribute, &samples, (e.n_east, e.n_depth))
    }

    pub fn depth(&self, twt: f64, attribute: &str) -> CubeResult<Array2<f64>> {
        let samples = self.store.read_slice(Axis::Depth, twt, attribute)?;
        let e = self.geometry.extent_counts();
        reshape("depth", attribute, &samples, (e.n_east, e.n_north))
    }

    /// The stored samples of one column, by depth. Unwritten depths are absent.
    pub fn cdp(&self, cdp: Cdp, attribute: &str) -> CubeResult<Vec<Sample>> {
        self.store.read_point(cdp.inline, cdp.crline, attribute)
    }

    pub fn set_inline(&self, inline: i64, attribute: &str, data: &Array2<f64>) -> CubeResult<usize> {
        let e = self.geometry.extent_counts();
        let values = flatten("set_inline", attribute, data, (e.n_north, e.n_depth))?;
        self.store.write_slice(Axis::Inline, inline as f64, attribute, &values)
    }

    pub fn set_crline(&self, crline: i64, attribute: &str, data: &Array2<f64>) -> CubeResult<usize> {
        let e = self.geometry.extent_counts();
        let values = flatten("set_crline", attribute, data, (e.n_east, e.n_depth))?;
        self.store.write_slice(Axis::Crossline, crline as f64, attribute, &values)
    }

    pub fn set_depth(&self, twt: f64, attribute: &str, data: &Array2<f64>) -> CubeResult<usize> {
        let e = self.geometry.extent_counts();
        let values = flatten("set_depth", attribute, data, (e.n_east, e.n_north))?;
        self.store.write_slice(Axis::Depth, twt, attribute, &values)
    }

    /// Overwrite one column; `values` are aligned by depth.
    pub fn set_cdp(&self, cdp: Cdp, attribute: &str, values: &[f64]) -> CubeResult<usize> {
        self.store.write_point(cdp.inline, cdp.crline, attribute, values)
    }

    /// Write one value at `(cdp, twt)`. Returns 0 if no such cell is registered.
    pub fn set_sample(&self, cdp: Cdp, twt: f64, attribute: &str, value: f64) -> CubeResult<usize> {
        self.store.write_sample(cdp.inline, cdp.crline, twt, attribute, value)
    }

    // -- Export -------------------------------------------------------------

    pub fn export_flat<W: Write>(&self, attribute: &str, out: W) -> CubeResult<()> {
        let samples = self.store.read_all(attribute)?;
        export::write_flat(&self.geometry, attribute, &samples, out)
    }

    /// GSLIB export; `title` defaults to `"seismic data"`.
    pub fn export_gslib<W: Write>(&self, attribute: &str, out: W, title: Option<&str>) -> CubeResult<()> {
        let samples = self.store.read_all(attribute)?;
        let title = title.unwrap_or(DEFAULT_GSLIB_TITLE);
        export::write_gslib(&self.geometry, attribute, title, &samples, out)
    }
}

impl fmt::Display for SeisCube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.geometry.bounds();
        let bins = self.geometry.bin_size();
        let location = match self.store.db().path() {
            Some(path) => std::fs::canonicalize(path)
                .unwrap_or_else(|_| path.to_path_buf())
                .display()
                .to_string(),
            None => "(temporary)".to_string(),
        };
        writeln!(f, "A seismic Data Cube")?;
        writeln!(f, "In-line range: {} - {} - {}", b.inline.start, b.inline.end, b.inline.step)?;
        writeln!(f, "Cross-line range: {} - {} - {}", b.crline.start, b.crline.end, b.crline.step)?;
        writeln!(f, "Z range: {} - {} - {}", b.depth.start, b.depth.end, b.depth.step)?;
        writeln!(f, "Inl/Crl bin size (m/line): {}/{}", bins.inline, bins.crline)?;
        writeln!(f, "Store location: {location}")?;
        write!(f, "Stored attributes: {}", self.attributes().join(", "))
    }
}

fn reshape(
    operation: &'static str,
    attribute: &str,
    samples: &[Sample],
    shape: (usize, usize),
) -> CubeResult<Array2<f64>> {
    if samples.is_empty() {
        return Ok(Array2::zeros((0, shape.1)));
    }
    let integrity = || CubeError::DataIntegrity {
        operation,
        attribute: attribute.to_string(),
        expected: shape.0 * shape.1,
        found: samples.len(),
    };
    if samples.len() != shape.0 * shape.1 {
        return Err(integrity());
    }
    let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
    Array2::from_shape_vec(shape, values).map_err(|_| integrity())
}

fn flatten(
    operation: &'static str,
    attribute: &str,
    data: &Array2<f64>,
    shape: (usize, usize),
) -> CubeResult<Vec<f64>> {
    if data.dim() != shape {
        return Err(CubeError::DataIntegrity {
            operation,
            attribute: attribute.to_string(),
            expected: shape.0 * shape.1,
            found: data.len(),
        });
    }
    Ok(data.iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn config() -> CubeConfig {
        CubeConfig {
            db_file: "unused".into(),
            inline: [100, 104, 2],
            crline: [200, 202, 1],
            depth: [0.0, 10.0, 5.0],
            coordinate: [
                [100.0, 200.0, 1000.0, 5000.0],
                [100.0, 202.0, 1000.0, 5100.0],
                [104.0, 202.0, 1200.0, 5100.0],
            ],
        }
    }

    fn cube() -> SeisCube {
        let cube = SeisCube::temporary(&config()).unwrap();
        assert_eq!(cube.populate_grid().unwrap(), 27);
        cube
    }

    #[test]
    fn inline_slice_round_trips_through_array() {
        let cube = cube();
        cube.add_attribute("por").unwrap();
        let data = Array2::from_shape_fn((3, 3), |(c, d)| (c * 10 + d) as f64);
        assert_eq!(cube.set_inline(102, "por", &data).unwrap(), 9);

        let back = cube.inline(102, "por").unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn crossline_and_depth_slices_have_their_shapes() {
        let cube = cube();
        cube.add_attribute("por").unwrap();
        for inline in [100, 102, 104] {
            let data = Array2::from_elem((3, 3), inline as f64);
            cube.set_inline(inline, "por", &data).unwrap();
        }

        let crl = cube.crline(201, "por").unwrap();
        assert_eq!(crl.dim(), (3, 3));
        assert_eq!(crl.row(2).to_vec(), vec![104.0; 3]);

        let slice = cube.depth(5.0, "por").unwrap();
        assert_eq!(slice.dim(), (3, 3));
        assert_eq!(slice.column(0).to_vec(), vec![100.0, 102.0, 104.0]);
    }

    #[test]
    fn depth_slice_round_trips_inline_major() {
        let cube = cube();
        cube.add_attribute("amp").unwrap();
        let data = Array2::from_shape_fn((3, 3), |(e, n)| (e * 10 + n) as f64);
        assert_eq!(cube.set_depth(5.0, "amp", &data).unwrap(), 9);

        assert_eq!(cube.depth(5.0, "amp").unwrap(), data);
        assert_eq!(cube.depth(0.0, "amp").unwrap().dim(), (0, 3));

        // Row 1 is inline 102, column 2 is crossline 202.
        let column = cube.cdp(Cdp::new(102, 202), "amp").unwrap();
        assert_eq!(column.len(), 1);
        assert_eq!((column[0].twt, column[0].value), (5.0, 12.0));
    }

    #[test]
    fn coord_to_line_rejects_nan() {
        let err = cube().coord_to_line(f64::NAN, 5000.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);
    }

    #[test]
    fn partial_slice_is_integrity_error() {
        let cube = cube();
        cube.add_attribute("por").unwrap();
        cube.set_sample(Cdp::new(102, 201), 5.0, "por", 0.2).unwrap();
        let err = cube.inline(102, "por").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataIntegrity);
    }

    #[test]
    fn empty_slice_has_no_rows() {
        let cube = cube();
        cube.add_attribute("por").unwrap();
        assert_eq!(cube.inline(100, "por").unwrap().dim(), (0, 3));
        assert_eq!(cube.depth(0.0, "missing").unwrap().dim(), (0, 3));
    }

    #[test]
    fn wrong_array_shape_rejected_before_write() {
        let cube = cube();
        cube.add_attribute("por").unwrap();
        let err = cube.set_crline(200, "por", &Array2::zeros((2, 3))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataIntegrity);
        assert!(cube.store().read_all("por").unwrap().is_empty());
    }

    #[test]
    fn sparse_point_scenario() {
        let cube = cube();
        cube.add_attribute("por").unwrap();
        assert_eq!(cube.set_sample(Cdp::new(102, 201), 5.0, "por", 0.2).unwrap(), 1);

        let column = cube.cdp(Cdp::new(102, 201), "por").unwrap();
        assert_eq!(column.len(), 1);
        let depth_index = cube.geometry().bounds().depth.index_of(column[0].twt);
        assert_eq!(depth_index, Some(1));
        assert_eq!(column[0].value, 0.2);
    }

    #[test]
    fn set_cdp_writes_whole_column() {
        let cube = cube();
        cube.add_attribute("vel").unwrap();
        assert_eq!(cube.set_cdp(Cdp::new(100, 200), "vel", &[1.0, 2.0, 3.0]).unwrap(), 3);
        let values: Vec<f64> = cube.cdp(Cdp::new(100, 200), "vel").unwrap().iter().map(|s| s.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn coordinate_helpers_agree() {
        let cube = cube();
        assert_eq!(cube.line_to_coord(Cdp::new(100, 200)), (1000.0, 5000.0));
        assert_eq!(cube.coord_to_line(1100.0, 5050.0).unwrap(), Cdp::new(102, 201));
        let depths: Vec<f64> = cube.depth_values().collect();
        assert_eq!(depths, vec![0.0, 5.0, 10.0]);
    }

    #[test]
    fn summary_lists_ranges_and_attributes() {
        let cube = cube();
        cube.add_attribute("por").unwrap();
        cube.add_attribute("vel").unwrap();
        let text = cube.to_string();
        assert!(text.contains("In-line range: 100 - 104 - 2"));
        assert!(text.contains("Z range: 0 - 10 - 5"));
        assert!(text.contains("bin size (m/line): 50/50"));
        assert!(text.contains("(temporary)"));
        assert!(text.ends_with("Stored attributes: por, vel"));
    }

    #[test]
    fn invalid_geometry_fails_construction() {
        let mut cfg = config();
        cfg.inline = [100, 104, 0];
        let err = SeisCube::temporary(&cfg).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}

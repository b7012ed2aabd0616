//! # AttributeStore: Slice and Point Access
//!
//! Reads join the `position` identity of each cell (through the cell index)
//! with an attribute table on `id`. A cell with no row in the attribute
//! table is absent from the result; nothing is padded with zeros.
//!
//! ## Ordering
//!
//! | Selection      | Order of results                 |
//! |----------------|----------------------------------|
//! | inline slice   | crossline asc, then depth asc    |
//! | crossline slice| inline asc, then depth asc       |
//! | depth slice    | inline asc, then crossline asc   |
//! | point (column) | depth asc                        |
//!
//! All of them fall out of a single scan of `__cell_index`, whose keys sort by
//! inline, crossline, depth. Writes align their values with the same order,
//! taken over every registered cell of the selection.
//!
//! ## Failure model
//!
//! Range checks run before the store is touched. Reading or writing an
//! attribute that does not exist yields an empty result or writes nothing.
//! Each write lands as one atomic sled batch on the attribute table.

use std::collections::BTreeSet;
use std::sync::Arc;

use sled::{Batch, Tree};

use super::db::{Connection, CubeDb};
use super::schema::{self, AttributeName, PositionRow};
use crate::config::INTERNAL_TABLE_PREFIX;
use crate::error::{CubeError, CubeResult, ExistsReason};
use crate::geometry::{Axis, Cdp, GridGeometry, LineAxis};

/// One stored attribute value together with the cell it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub id: u64,
    pub inline: i64,
    pub crline: i64,
    pub twt: f64,
    pub value: f64,
}

impl Sample {
    pub fn cdp(&self) -> Cdp {
        Cdp::new(self.inline, self.crline)
    }
}

/// Which cells an operation addresses.
#[derive(Debug, Clone, Copy)]
enum Selection {
    Inline(i64),
    Crossline(i64),
    Depth(f64),
    Column(i64, i64),
    Cell(i64, i64, f64),
    All,
}

/// Per-attribute storage over a shared cell identity table.
#[derive(Debug, Clone)]
pub struct AttributeStore {
    db: CubeDb,
    geometry: Arc<GridGeometry>,
}

impl AttributeStore {
    pub fn new(db: CubeDb, geometry: Arc<GridGeometry>) -> Self {
        Self { db, geometry }
    }

    pub fn db(&self) -> &CubeDb {
        &self.db
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    // -- Schema -------------------------------------------------------------

    /// Names of every attribute table.
    ///
    /// Best effort: if the store cannot be opened the cause is logged and an
    /// empty set is returned.
    pub fn list_attributes(&self) -> BTreeSet<String> {
        match self.db.connect() {
            Ok(conn) => conn
                .table_names()
                .into_iter()
                .filter(|name| !name.starts_with(INTERNAL_TABLE_PREFIX))
                .filter(|name| AttributeName::parse(name).map(|n| !n.is_reserved()).unwrap_or(false))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "attribute listing unavailable");
                BTreeSet::new()
            }
        }
    }

    /// Create an empty attribute table.
    pub fn create_attribute(&self, name: &str) -> CubeResult<()> {
        if schema::is_reserved(name) {
            return Err(CubeError::AttributeExists {
                name: name.to_string(),
                reason: ExistsReason::Reserved,
            });
        }
        let name = AttributeName::parse(name)?;
        let conn = self.db.connect()?;
        if conn.has_table(name.as_str()) {
            return Err(CubeError::AttributeExists {
                name: name.to_string(),
                reason: ExistsReason::Duplicate,
            });
        }
        conn.create_table(&name)?;
        tracing::info!(attribute = %name, "attribute created");
        Ok(())
    }

    /// Drop an attribute table and its values. Returns whether it existed.
    pub fn drop_attribute(&self, name: &str) -> CubeResult<bool> {
        let name = AttributeName::parse(name)?;
        if name.is_reserved() {
            return Ok(false);
        }
        let conn = self.db.connect()?;
        let dropped = conn.drop_table(&name)?;
        if dropped {
            tracing::info!(attribute = %name, "attribute dropped");
        }
        Ok(dropped)
    }

    // -- Cells --------------------------------------------------------------

    /// Register cells in the `position` table, skipping those already
    /// present. Every cell must sit on a node of the grid; an off-grid cell
    /// fails with `OutOfRange` before anything is written. Depths are stored
    /// at the axis node they match, so `0.1 * 3` and `0.3` name one cell.
    ///
    /// Returns the number of cells created.
    pub fn register_cells<I>(&self, cells: I) -> CubeResult<usize>
    where
        I: IntoIterator<Item = PositionRow>,
    {
        let cells = cells
            .into_iter()
            .map(|cell| self.grid_node(&cell))
            .collect::<CubeResult<Vec<PositionRow>>>()?;

        let conn = self.db.connect()?;
        let positions = conn.positions()?;
        let index = conn.cell_index()?;

        let mut position_batch = Batch::default();
        let mut index_batch = Batch::default();
        let mut seen = BTreeSet::new();
        let mut created = 0usize;
        for cell in &cells {
            let key = schema::cell_key(cell);
            if !seen.insert(key) || index.contains_key(key)? {
                continue;
            }
            let id = conn.generate_id()?;
            position_batch.insert(&schema::id_key(id)[..], bincode::serialize(cell)?);
            index_batch.insert(&key[..], &schema::id_key(id)[..]);
            created += 1;
        }

        // Rows become visible through the index, so it lands last.
        positions.apply_batch(position_batch)?;
        index.apply_batch(index_batch)?;

        tracing::debug!(requested = cells.len(), created, "cells registered");
        Ok(created)
    }

    /// Number of rows in the `position` table.
    pub fn cell_count(&self) -> CubeResult<usize> {
        let conn = self.db.connect()?;
        Ok(conn.positions()?.len())
    }

    /// Look up the `position` row of a cell id.
    pub fn position(&self, id: u64) -> CubeResult<Option<PositionRow>> {
        let conn = self.db.connect()?;
        match conn.positions()?.get(schema::id_key(id))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    // -- Reads --------------------------------------------------------------

    /// Stored values of one slice, in the documented order.
    pub fn read_slice(&self, axis: Axis, index: f64, attribute: &str) -> CubeResult<Vec<Sample>> {
        self.geometry.check_range("read_slice", axis, index)?;
        let selection = slice_selection(axis, index);
        self.read("read_slice", selection, attribute)
    }

    /// Stored values of one `(inline, crline)` column, by depth.
    pub fn read_point(&self, inline: i64, crline: i64, attribute: &str) -> CubeResult<Vec<Sample>> {
        self.geometry.check_range("read_point", Axis::Inline, inline as f64)?;
        self.geometry.check_range("read_point", Axis::Crossline, crline as f64)?;
        self.read("read_point", Selection::Column(inline, crline), attribute)
    }

    /// Every stored value of an attribute, by inline, crossline, depth.
    pub fn read_all(&self, attribute: &str) -> CubeResult<Vec<Sample>> {
        self.read("read_all", Selection::All, attribute)
    }

    fn read(&self, operation: &'static str, selection: Selection, attribute: &str) -> CubeResult<Vec<Sample>> {
        let name = AttributeName::parse(attribute)?;
        let conn = self.db.connect()?;
        let Some(table) = conn.attribute_table(&name)? else {
            tracing::debug!(operation, attribute, "attribute missing, empty result");
            return Ok(Vec::new());
        };

        let mut samples = Vec::new();
        for (id, cell) in self.select(&conn, selection)? {
            if let Some(bytes) = table.get(schema::id_key(id))? {
                samples.push(Sample {
                    id,
                    inline: cell.inline,
                    crline: cell.crline,
                    twt: cell.twt,
                    value: schema::decode_value(&bytes)?,
                });
            }
        }
        tracing::debug!(operation, attribute, ?selection, rows = samples.len(), "read");
        Ok(samples)
    }

    // -- Writes -------------------------------------------------------------

    /// Overwrite one slice. `values` align with every registered cell of the
    /// slice in the read order; a length mismatch is a `DataIntegrity` error.
    ///
    /// Returns the number of rows written.
    pub fn write_slice(&self, axis: Axis, index: f64, attribute: &str, values: &[f64]) -> CubeResult<usize> {
        self.geometry.check_range("write_slice", axis, index)?;
        self.write("write_slice", slice_selection(axis, index), attribute, values)
    }

    /// Overwrite one `(inline, crline)` column, aligned by depth.
    pub fn write_point(&self, inline: i64, crline: i64, attribute: &str, values: &[f64]) -> CubeResult<usize> {
        self.geometry.check_range("write_point", Axis::Inline, inline as f64)?;
        self.geometry.check_range("write_point", Axis::Crossline, crline as f64)?;
        self.write("write_point", Selection::Column(inline, crline), attribute, values)
    }

    /// Write a single value. A cell with no `position` row is left alone and
    /// zero is returned.
    pub fn write_sample(&self, inline: i64, crline: i64, twt: f64, attribute: &str, value: f64) -> CubeResult<usize> {
        self.geometry.check_range("write_sample", Axis::Inline, inline as f64)?;
        self.geometry.check_range("write_sample", Axis::Crossline, crline as f64)?;
        self.geometry.check_range("write_sample", Axis::Depth, twt)?;

        let name = AttributeName::parse(attribute)?;
        let conn = self.db.connect()?;
        let Some(table) = conn.attribute_table(&name)? else {
            return Ok(0);
        };
        let cells = self.select(&conn, Selection::Cell(inline, crline, twt))?;
        let Some((id, _)) = cells.first() else {
            tracing::debug!(inline, crline, twt, attribute, "no cell registered, nothing written");
            return Ok(0);
        };
        table.insert(schema::id_key(*id), &schema::encode_value(value)[..])?;
        Ok(1)
    }

    fn write(&self, operation: &'static str, selection: Selection, attribute: &str, values: &[f64]) -> CubeResult<usize> {
        let name = AttributeName::parse(attribute)?;
        let conn = self.db.connect()?;
        let Some(table) = conn.attribute_table(&name)? else {
            tracing::debug!(operation, attribute, "attribute missing, nothing written");
            return Ok(0);
        };

        let cells = self.select(&conn, selection)?;
        if cells.len() != values.len() {
            return Err(CubeError::DataIntegrity {
                operation,
                attribute: attribute.to_string(),
                expected: cells.len(),
                found: values.len(),
            });
        }

        let mut batch = Batch::default();
        for ((id, _), value) in cells.iter().zip(values) {
            batch.insert(&schema::id_key(*id)[..], &schema::encode_value(*value)[..]);
        }
        table.apply_batch(batch)?;

        tracing::debug!(operation, attribute, ?selection, rows = cells.len(), "written");
        Ok(cells.len())
    }

    // -- Helpers ------------------------------------------------------------

    /// Registered cells matching `selection`, in index order.
    fn select(&self, conn: &Connection, selection: Selection) -> CubeResult<Vec<(u64, PositionRow)>> {
        let index = conn.cell_index()?;
        let depth = self.geometry.bounds().depth;
        let same_depth = |a: f64, b: f64| (a - b).abs() <= depth.step.abs() * 1e-6;

        let scan = |tree: &Tree, prefix: Vec<u8>| -> CubeResult<Vec<(u64, PositionRow)>> {
            let mut out = Vec::new();
            for entry in tree.scan_prefix(prefix) {
                let (key, id) = entry?;
                let cell = schema::decode_cell_key(&key)?;
                let keep = match selection {
                    Selection::Crossline(c) => cell.crline == c,
                    Selection::Depth(d) => same_depth(cell.twt, d),
                    Selection::Cell(_, _, d) => same_depth(cell.twt, d),
                    Selection::Inline(_) | Selection::Column(..) | Selection::All => true,
                };
                if keep {
                    out.push((schema::decode_id(&id)?, cell));
                }
            }
            Ok(out)
        };

        match selection {
            Selection::Inline(i) => scan(&index, schema::inline_prefix(i)),
            Selection::Column(i, c) | Selection::Cell(i, c, _) => scan(&index, schema::column_prefix(i, c)),
            Selection::Crossline(_) | Selection::Depth(_) | Selection::All => scan(&index, Vec::new()),
        }
    }

    /// The grid node `cell` sits on, with its depth snapped to the exact
    /// axis value.
    fn grid_node(&self, cell: &PositionRow) -> CubeResult<PositionRow> {
        let bounds = self.geometry.bounds();
        let off_grid = |axis, index, start, end| CubeError::OutOfRange {
            operation: "register_cells",
            axis,
            index,
            start,
            end,
        };
        let line_ok = |v: i64, axis: &LineAxis| {
            axis.contains(v as f64) && (v - axis.start) % axis.step == 0
        };
        if !line_ok(cell.inline, &bounds.inline) {
            return Err(off_grid(
                Axis::Inline,
                cell.inline as f64,
                bounds.inline.start as f64,
                bounds.inline.end as f64,
            ));
        }
        if !line_ok(cell.crline, &bounds.crline) {
            return Err(off_grid(
                Axis::Crossline,
                cell.crline as f64,
                bounds.crline.start as f64,
                bounds.crline.end as f64,
            ));
        }
        let Some(k) = bounds.depth.index_of(cell.twt) else {
            return Err(off_grid(Axis::Depth, cell.twt, bounds.depth.start, bounds.depth.end));
        };
        Ok(PositionRow {
            twt: bounds.depth.value_at(k),
            ..*cell
        })
    }
}

fn slice_selection(axis: Axis, index: f64) -> Selection {
    match axis {
        Axis::Inline => Selection::Inline(index.round() as i64),
        Axis::Crossline => Selection::Crossline(index.round() as i64),
        Axis::Depth => Selection::Depth(index),
    }
}

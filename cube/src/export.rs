//! # Text Exports
//!
//! Two plain-text renderings of one attribute, both walking the grid
//! inline-major (inline outer, crossline inner) and skipping columns that
//! hold no value.
//!
//! ## Flat
//!
//! ```text
//! stepInline\tstepCrline\tstepDepth
//! inline\tcrline\tvalue_1\t...\tvalue_nDepth
//! ```
//!
//! A populated column must hold a value at every depth sample, otherwise the
//! record would shift values onto the wrong depths; such a column fails with
//! `DataIntegrity`.
//!
//! ## GSLIB
//!
//! Point-data layout: title, field count, one field name per line, then one
//! `x\ty\tz\tvalue` line per stored sample, with `(x, y)` the world position
//! of the column and `z = startDepth + stepDepth * depthIndex`.
//!
//! Numbers use Rust's shortest round-trip formatting (`5`, `0.2`,
//! `1234.5`), so repeated exports are byte-identical.

use std::collections::BTreeMap;
use std::io::Write;

use crate::config::GSLIB_FIELD_COUNT;
use crate::error::{CubeError, CubeResult};
use crate::geometry::{Axis, Cdp, GridGeometry};
use crate::storage::Sample;

/// Group samples by column. Input order (depth ascending within a column)
/// is preserved.
fn columns(samples: &[Sample]) -> BTreeMap<Cdp, Vec<&Sample>> {
    let mut map: BTreeMap<Cdp, Vec<&Sample>> = BTreeMap::new();
    for sample in samples {
        map.entry(sample.cdp()).or_default().push(sample);
    }
    map
}

/// Write the flat column export of `attribute`.
pub fn write_flat<W: Write>(
    geometry: &GridGeometry,
    attribute: &str,
    samples: &[Sample],
    mut out: W,
) -> CubeResult<()> {
    let bounds = geometry.bounds();
    let n_depth = geometry.extent_counts().n_depth;
    let columns = columns(samples);

    writeln!(
        out,
        "{}\t{}\t{}",
        bounds.inline.step, bounds.crline.step, bounds.depth.step
    )?;

    let mut written = 0usize;
    for inline in geometry.axis_range(Axis::Inline).lines() {
        for crline in geometry.axis_range(Axis::Crossline).lines() {
            let Some(column) = columns.get(&Cdp::new(inline, crline)) else {
                continue;
            };
            if column.len() != n_depth {
                return Err(CubeError::DataIntegrity {
                    operation: "export_flat",
                    attribute: attribute.to_string(),
                    expected: n_depth,
                    found: column.len(),
                });
            }
            write!(out, "{inline}\t{crline}")?;
            for sample in column {
                write!(out, "\t{}", sample.value)?;
            }
            writeln!(out)?;
            written += 1;
        }
    }
    out.flush()?;

    tracing::debug!(attribute, columns = written, "flat export written");
    Ok(())
}

/// Write the GSLIB point export of `attribute`.
pub fn write_gslib<W: Write>(
    geometry: &GridGeometry,
    attribute: &str,
    title: &str,
    samples: &[Sample],
    mut out: W,
) -> CubeResult<()> {
    let depth = geometry.bounds().depth;
    let columns = columns(samples);

    writeln!(out, "{title}")?;
    writeln!(out, "{GSLIB_FIELD_COUNT}")?;
    for field in ["x", "y", "z", attribute] {
        writeln!(out, "{field}")?;
    }

    let mut written = 0usize;
    for inline in geometry.axis_range(Axis::Inline).lines() {
        for crline in geometry.axis_range(Axis::Crossline).lines() {
            let Some(column) = columns.get(&Cdp::new(inline, crline)) else {
                continue;
            };
            let (x, y) = geometry.forward(inline as f64, crline as f64);
            for sample in column {
                // Cells written by other tools may sit between nodes.
                let z = depth
                    .index_of(sample.twt)
                    .map(|k| depth.value_at(k))
                    .unwrap_or(sample.twt);
                writeln!(out, "{x}\t{y}\t{z}\t{}", sample.value)?;
                written += 1;
            }
        }
    }
    out.flush()?;

    tracing::debug!(attribute, samples = written, "gslib export written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::geometry::{ControlPoint, DepthAxis, LineAxis, SurveyBounds};

    fn geometry() -> GridGeometry {
        let bounds = SurveyBounds {
            inline: LineAxis::new(100, 104, 2),
            crline: LineAxis::new(200, 202, 1),
            depth: DepthAxis::new(0.0, 10.0, 5.0),
        };
        let points = [
            ControlPoint { inline: 100.0, crline: 200.0, east: 1000.0, north: 5000.0 },
            ControlPoint { inline: 100.0, crline: 202.0, east: 1000.0, north: 5100.0 },
            ControlPoint { inline: 104.0, crline: 202.0, east: 1200.0, north: 5100.0 },
        ];
        GridGeometry::new(bounds, points).unwrap()
    }

    fn sample(inline: i64, crline: i64, twt: f64, value: f64) -> Sample {
        Sample { id: 0, inline, crline, twt, value }
    }

    fn render<F: FnOnce(&mut Vec<u8>) -> CubeResult<()>>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn flat_export_layout() {
        let g = geometry();
        let samples = vec![
            sample(100, 201, 0.0, 1.0),
            sample(100, 201, 5.0, 2.0),
            sample(100, 201, 10.0, 3.0),
            sample(104, 200, 0.0, 0.25),
            sample(104, 200, 5.0, 0.5),
            sample(104, 200, 10.0, 0.75),
        ];
        let text = render(|buf| write_flat(&g, "por", &samples, buf));
        assert_eq!(text, "2\t1\t5\n100\t201\t1\t2\t3\n104\t200\t0.25\t0.5\t0.75\n");
    }

    #[test]
    fn flat_export_of_empty_attribute_is_header_only() {
        let text = render(|buf| write_flat(&geometry(), "por", &[], buf));
        assert_eq!(text, "2\t1\t5\n");
    }

    #[test]
    fn flat_export_rejects_partial_column() {
        let samples = vec![sample(102, 201, 5.0, 0.2)];
        let err = write_flat(&geometry(), "por", &samples, Vec::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataIntegrity);
    }

    #[test]
    fn gslib_export_layout() {
        let g = geometry();
        let samples = vec![sample(102, 201, 5.0, 0.2), sample(104, 202, 10.0, 7.5)];
        let text = render(|buf| write_gslib(&g, "por", "seismic data", &samples, buf));
        assert_eq!(
            text,
            "seismic data\n4\nx\ny\nz\npor\n1100\t5050\t5\t0.2\n1200\t5100\t10\t7.5\n"
        );
    }

    #[test]
    fn gslib_walks_grid_order_not_input_order() {
        let g = geometry();
        let samples = vec![sample(104, 200, 0.0, 2.0), sample(100, 202, 0.0, 1.0)];
        let text = render(|buf| write_gslib(&g, "v", "t", &samples, buf));
        let body: Vec<&str> = text.lines().skip(6).collect();
        assert_eq!(body, vec!["1000\t5100\t0\t1", "1200\t5000\t0\t2"]);
    }

    #[test]
    fn off_grid_columns_are_skipped() {
        let g = geometry();
        let samples = vec![sample(101, 200, 0.0, 9.0)];
        let text = render(|buf| write_gslib(&g, "v", "t", &samples, buf));
        assert_eq!(text.lines().count(), 6);
    }
}

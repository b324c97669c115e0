//! Rectangular puzzle grids and the exact-match equality oracle.

use serde::{Deserialize, Serialize};

/// Largest cell value in the grid palette (values run `0..=PALETTE_MAX`).
pub const PALETTE_MAX: u8 = 9;

/// A rectangular, non-empty grid of palette cells.
///
/// Construction validates every invariant; once built a grid is immutable.
/// Equality is structural — row by row, cell by cell — with no tolerance and
/// no normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct Grid(Vec<Vec<u8>>);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("grid has no rows")]
    Empty,
    #[error("row {row} is empty")]
    EmptyRow { row: usize },
    #[error("row {row} has {actual} cells, expected {expected}")]
    Jagged {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("cell ({row}, {col}) holds {value}, outside palette 0..={PALETTE_MAX}")]
    OutOfPalette { row: usize, col: usize, value: u8 },
}

impl Grid {
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Result<Self, GridError> {
        if rows.is_empty() {
            return Err(GridError::Empty);
        }
        let width = rows[0].len();
        for (row_idx, row) in rows.iter().enumerate() {
            if row.is_empty() {
                return Err(GridError::EmptyRow { row: row_idx });
            }
            if row.len() != width {
                return Err(GridError::Jagged {
                    row: row_idx,
                    expected: width,
                    actual: row.len(),
                });
            }
            for (col_idx, &value) in row.iter().enumerate() {
                if value > PALETTE_MAX {
                    return Err(GridError::OutOfPalette {
                        row: row_idx,
                        col: col_idx,
                        value,
                    });
                }
            }
        }
        Ok(Self(rows))
    }

    /// Validate a raw candidate of unknown shape into a well-formed grid.
    ///
    /// This is the single choke point between untrusted program output and
    /// the rest of the pipeline: malformed, jagged, non-numeric, out-of-range
    /// and absent candidates all collapse to `None` (the missing sentinel),
    /// never to a panic or an error.
    #[must_use]
    pub fn validate_and_convert(raw: Option<&serde_json::Value>) -> Option<Self> {
        let rows_value = raw?.as_array()?;
        let mut rows = Vec::with_capacity(rows_value.len());
        for row_value in rows_value {
            let cells_value = row_value.as_array()?;
            let mut cells = Vec::with_capacity(cells_value.len());
            for cell in cells_value {
                let cell = cell.as_u64()?;
                cells.push(u8::try_from(cell).ok()?);
            }
            rows.push(cells);
        }
        Self::from_rows(rows).ok()
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<u8>] {
        &self.0
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.0[0].len()
    }

    /// `(height, width)` of the grid.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!(self.0)
    }
}

impl TryFrom<Vec<Vec<u8>>> for Grid {
    type Error = GridError;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<Grid> for Vec<Vec<u8>> {
    fn from(grid: Grid) -> Self {
        grid.0
    }
}

/// Digits space-separated per row, rows newline-separated. Used when
/// formatting grids into synthesis prompts.
impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, row) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            for (col, cell) in row.iter().enumerate() {
                if col > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{cell}")?;
            }
        }
        Ok(())
    }
}

/// The equality oracle over possibly-missing grids.
///
/// A missing grid is unequal to everything, including another missing grid:
/// a prediction that never materialized is a hard failure, never vacuously
/// correct.
#[must_use]
pub fn grids_equal(a: Option<&Grid>, b: Option<&Grid>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

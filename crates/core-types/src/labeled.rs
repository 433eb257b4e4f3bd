use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// A small two-dimensional array with labeled rows and columns.
///
/// Cells are stored row-major. The type carries no rendering concerns; callers decide how
/// to present it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledArray<T> {
    rows: Vec<String>,
    columns: Vec<String>,
    cells: Vec<T>,
}

impl<T> LabeledArray<T> {
    /// Builds an array by evaluating `cell(row, column)` for every position.
    pub fn from_fn<F>(rows: Vec<String>, columns: Vec<String>, mut cell: F) -> Self
    where
        F: FnMut(usize, usize) -> T,
    {
        let mut cells = Vec::with_capacity(rows.len() * columns.len());
        for r in 0..rows.len() {
            for c in 0..columns.len() {
                cells.push(cell(r, c));
            }
        }
        Self {
            rows,
            columns,
            cells,
        }
    }

    pub fn from_cells(
        rows: Vec<String>,
        columns: Vec<String>,
        cells: Vec<T>,
    ) -> Result<Self, CoreError> {
        if cells.len() != rows.len() * columns.len() {
            return Err(CoreError::InvalidInput(
                "cells".to_string(),
                format!(
                    "expected {}x{} cells, found {}",
                    rows.len(),
                    columns.len(),
                    cells.len()
                ),
            ));
        }
        Ok(Self {
            rows,
            columns,
            cells,
        })
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&T> {
        if row >= self.rows.len() || column >= self.columns.len() {
            return None;
        }
        self.cells.get(row * self.columns.len() + column)
    }

    pub fn get_by_label(&self, row: &str, column: &str) -> Option<&T> {
        let r = self.rows.iter().position(|l| l == row)?;
        let c = self.columns.iter().position(|l| l == column)?;
        self.get(r, c)
    }

    /// All cells of one row, in column order.
    pub fn row(&self, row: usize) -> Option<&[T]> {
        let width = self.columns.len();
        if row >= self.rows.len() {
            return None;
        }
        Some(&self.cells[row * width..(row + 1) * width])
    }

    /// All cells of one column, in row order.
    pub fn column(&self, column: usize) -> Option<Vec<&T>> {
        if column >= self.columns.len() {
            return None;
        }
        Some(
            (0..self.rows.len())
                .filter_map(|r| self.get(r, column))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    #[test]
    fn indexes_row_major() {
        let array = LabeledArray::from_fn(labels("r", 2), labels("c", 3), |r, c| r * 10 + c);
        assert_eq!(array.get(1, 2), Some(&12));
        assert_eq!(array.get_by_label("r0", "c1"), Some(&1));
        assert_eq!(array.row(1), Some(&[10, 11, 12][..]));
        assert_eq!(array.column(2), Some(vec![&2, &12]));
        assert_eq!(array.get(2, 0), None);
    }

    #[test]
    fn rejects_mismatched_cells() {
        assert!(LabeledArray::from_cells(labels("r", 2), labels("c", 2), vec![1, 2, 3]).is_err());
    }
}

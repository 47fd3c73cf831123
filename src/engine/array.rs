//! Caller-facing sample arrays
//!
//! A `SampleArray` is how audio enters and leaves the FX engine: a dense,
//! row-major array of f32 with one or two dimensions. Orientation is not
//! known here; the contract layer decides which axis holds channels.

use serde::{Deserialize, Serialize};

use crate::error::{FxError, Result};

/// Dense row-major f32 array of rank 1 or 2
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleArray {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl SampleArray {
    /// One-dimensional array of shape `(T,)`
    pub fn from_vec(data: Vec<f32>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// Two-dimensional array from row-major data
    ///
    /// # Errors
    /// `Shape` if `rows * cols` does not match the data length.
    pub fn from_shape_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if rows * cols != data.len() {
            return Err(FxError::shape(
                &[rows, cols],
                format!("expected {} values, got {}", rows * cols, data.len()),
            ));
        }
        Ok(Self {
            shape: vec![rows, cols],
            data,
        })
    }

    /// Two-dimensional array from a list of equal-length rows
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let num_rows = rows.len();
        let num_cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != num_cols) {
            return Err(FxError::shape(&[num_rows, num_cols], "rows have different lengths"));
        }
        let data = rows.into_iter().flatten().collect();
        Self::from_shape_vec(num_rows, num_cols, data)
    }

    /// Array dimensions, numpy style
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions (1 or 2)
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of values
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw row-major values
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Value at `(row, col)`; for 1-D arrays `row` must be 0
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        match self.shape.as_slice() {
            [len] if row == 0 && col < *len => Some(self.data[col]),
            [rows, cols] if row < *rows && col < *cols => Some(self.data[row * cols + col]),
            _ => None,
        }
    }

    /// Rows of a 2-D array (a 1-D array is a single row)
    pub fn rows(&self) -> Vec<Vec<f32>> {
        match self.shape.as_slice() {
            [_] => vec![self.data.clone()],
            [_, cols] if *cols > 0 => self.data.chunks(*cols).map(<[f32]>::to_vec).collect(),
            [rows, _] => vec![Vec::new(); *rows],
            _ => Vec::new(),
        }
    }

    /// Columns of a 2-D array
    pub fn columns(&self) -> Vec<Vec<f32>> {
        match self.shape.as_slice() {
            [len] => (0..*len).map(|i| vec![self.data[i]]).collect(),
            [rows, cols] => (0..*cols)
                .map(|c| (0..*rows).map(|r| self.data[r * cols + c]).collect())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Transposed copy; 1-D arrays become a single column `(T, 1)`
    pub fn transpose(&self) -> Self {
        let (rows, cols) = match self.shape.as_slice() {
            [len] => (1, *len),
            [rows, cols] => (*rows, *cols),
            _ => (0, 0),
        };
        let mut data = Vec::with_capacity(self.data.len());
        for c in 0..cols {
            for r in 0..rows {
                data.push(self.data[r * cols + c]);
            }
        }
        Self {
            shape: vec![cols, rows],
            data,
        }
    }

    /// True when every value is finite
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Largest absolute value
    pub fn peak(&self) -> f32 {
        self.data.iter().fold(0.0_f32, |acc, v| acc.max(v.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_shape_vec_checks_length() {
        assert!(SampleArray::from_shape_vec(2, 3, vec![0.0; 6]).is_ok());
        assert!(matches!(
            SampleArray::from_shape_vec(2, 3, vec![0.0; 5]),
            Err(FxError::Shape { .. })
        ));
    }

    #[test]
    fn test_rows_and_columns() {
        let arr = SampleArray::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(arr.shape(), &[2, 3]);
        assert_eq!(arr.rows()[1], vec![4.0, 5.0, 6.0]);
        assert_eq!(arr.columns()[2], vec![3.0, 6.0]);
        assert_eq!(arr.get(1, 0), Some(4.0));
        assert_eq!(arr.get(2, 0), None);
    }

    #[test]
    fn test_transpose() {
        let arr = SampleArray::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let t = arr.transpose();
        assert_eq!(t.shape(), &[3, 2]);
        assert_eq!(t.as_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(t.transpose(), arr);
    }

    #[test]
    fn test_one_dimensional() {
        let arr = SampleArray::from_vec(vec![0.5, -0.25]);
        assert_eq!(arr.ndim(), 1);
        assert_eq!(arr.get(0, 1), Some(-0.25));
        assert_eq!(arr.rows(), vec![vec![0.5, -0.25]]);
        assert!((arr.peak() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = SampleArray::from_rows(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(result.is_err());
    }
}

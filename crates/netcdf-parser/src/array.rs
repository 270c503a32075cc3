//! Named-dimension arrays stored row-major.

use crate::error::{NetCdfError, NetCdfResult};

/// A variable's values together with its dimension names and lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArray {
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    pub values: Vec<f64>,
}

impl NamedArray {
    /// Build an array, checking that the value count matches the shape.
    pub fn new(dims: Vec<String>, shape: Vec<usize>, values: Vec<f64>) -> NetCdfResult<Self> {
        if dims.len() != shape.len() {
            return Err(NetCdfError::InvalidFormat(format!(
                "{} dimension names for {} axes",
                dims.len(),
                shape.len()
            )));
        }
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(NetCdfError::InvalidFormat(format!(
                "shape {:?} needs {} values, got {}",
                shape,
                expected,
                values.len()
            )));
        }
        Ok(Self { dims, shape, values })
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Position of a named dimension.
    pub fn axis_of(&self, name: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == name)
    }

    /// `(rows, cols)` for a 2-D array.
    pub fn shape2(&self) -> Option<(usize, usize)> {
        match self.shape.as_slice() {
            [rows, cols] => Some((*rows, *cols)),
            _ => None,
        }
    }

    /// Drop `axis` by keeping only index 0 along it.
    pub fn select_first(&self, axis: usize) -> NetCdfResult<Self> {
        if axis >= self.ndim() {
            return Err(NetCdfError::InvalidFormat(format!(
                "axis {} out of range for {} dimensions",
                axis,
                self.ndim()
            )));
        }
        let len = self.shape[axis];
        if len == 0 {
            return Err(NetCdfError::InvalidFormat(format!(
                "dimension '{}' is empty",
                self.dims[axis]
            )));
        }

        let outer: usize = self.shape[..axis].iter().product();
        let inner: usize = self.shape[axis + 1..].iter().product();

        let mut values = Vec::with_capacity(outer * inner);
        for o in 0..outer {
            let start = o * len * inner;
            values.extend_from_slice(&self.values[start..start + inner]);
        }

        let mut dims = self.dims.clone();
        dims.remove(axis);
        let mut shape = self.shape.clone();
        shape.remove(axis);

        Ok(Self { dims, shape, values })
    }

    /// Swap the two axes of a 2-D array.
    pub fn transpose(&self) -> NetCdfResult<Self> {
        let (rows, cols) = self.require_2d("transpose")?;
        let mut values = Vec::with_capacity(self.values.len());
        for c in 0..cols {
            for r in 0..rows {
                values.push(self.values[r * cols + c]);
            }
        }
        Ok(Self {
            dims: vec![self.dims[1].clone(), self.dims[0].clone()],
            shape: vec![cols, rows],
            values,
        })
    }

    /// Reverse the row order of a 2-D array in place.
    pub fn flip_rows(&mut self) -> NetCdfResult<()> {
        let (rows, cols) = self.require_2d("flip")?;
        for r in 0..rows / 2 {
            let (top, bottom) = self.values.split_at_mut((rows - 1 - r) * cols);
            top[r * cols..(r + 1) * cols].swap_with_slice(&mut bottom[..cols]);
        }
        Ok(())
    }

    /// Replace infinities with NaN. Returns how many samples changed.
    pub fn mask_non_finite(&mut self) -> usize {
        let mut masked = 0;
        for v in self.values.iter_mut().filter(|v| v.is_infinite()) {
            *v = f64::NAN;
            masked += 1;
        }
        masked
    }

    fn require_2d(&self, op: &str) -> NetCdfResult<(usize, usize)> {
        self.shape2().ok_or_else(|| {
            NetCdfError::InvalidFormat(format!("cannot {} a {}-D array", op, self.ndim()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_new_rejects_shape_mismatch() {
        let err = NamedArray::new(dims(&["a", "b"]), vec![2, 2], vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, NetCdfError::InvalidFormat(_)));
    }

    #[test]
    fn test_select_first_leading_axis() {
        // time=2, lat=2, lon=2
        let values: Vec<f64> = (0..8).map(|v| v as f64).collect();
        let arr = NamedArray::new(dims(&["time", "lat", "lon"]), vec![2, 2, 2], values).unwrap();
        let reduced = arr.select_first(0).unwrap();
        assert_eq!(reduced.dims, dims(&["lat", "lon"]));
        assert_eq!(reduced.values, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_select_first_middle_axis() {
        // lat=2, layer=3, lon=2
        let values: Vec<f64> = (0..12).map(|v| v as f64).collect();
        let arr = NamedArray::new(dims(&["lat", "layer", "lon"]), vec![2, 3, 2], values).unwrap();
        let reduced = arr.select_first(1).unwrap();
        assert_eq!(reduced.shape, vec![2, 2]);
        assert_eq!(reduced.values, vec![0.0, 1.0, 6.0, 7.0]);
    }

    #[test]
    fn test_transpose() {
        let arr = NamedArray::new(
            dims(&["lon", "lat"]),
            vec![2, 3],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .unwrap();
        let t = arr.transpose().unwrap();
        assert_eq!(t.dims, dims(&["lat", "lon"]));
        assert_eq!(t.shape, vec![3, 2]);
        assert_eq!(t.values, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_flip_rows_odd_height() {
        let mut arr = NamedArray::new(
            dims(&["lat", "lon"]),
            vec![3, 2],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .unwrap();
        arr.flip_rows().unwrap();
        assert_eq!(arr.values, vec![5.0, 6.0, 3.0, 4.0, 1.0, 2.0]);
    }
}

/////////////////////////////////////////////
// A generic 2-dimensional array structure //
/////////////////////////////////////////////

use std::io::Error;
use std::io::ErrorKind;
use std::ops::{AddAssign, Index, IndexMut, SubAssign};

/// A simple in-memory 2-D grid that is not connected to a file. Tools use it
/// for scratch layers (inflow counts, solved flags, horizon angles) that never
/// need to be written out. Reads outside of the grid return the nodata value.
///
/// Example:
///
/// ```
/// use lsp_tools::structures::Array2D;
/// let mut x: Array2D<f64> = Array2D::new(100, 500, 0f64, -999f64).unwrap();
/// x.set_value(50, 100, 1f64);
/// assert_eq!(x.get_value(50, 100), 1f64);
/// assert_eq!(x.get_value(-1, 100), -999f64);
/// ```
#[derive(Clone, Debug)]
pub struct Array2D<T: Copy + AddAssign + SubAssign> {
    pub columns: isize,
    pub rows: isize,
    data: Vec<T>,
    pub nodata: T,
}

impl<T> Array2D<T>
where
    T: Copy + AddAssign + SubAssign,
{
    pub fn new(rows: isize, columns: isize, initial_value: T, nodata: T) -> Result<Array2D<T>, Error> {
        if rows < 0 || columns < 0 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "Only non-negative rows and columns values accepted.",
            ));
        }
        Ok(Array2D {
            columns,
            rows,
            nodata,
            data: vec![initial_value; (rows * columns) as usize],
        })
    }

    pub fn set_value(&mut self, row: isize, column: isize, value: T) {
        if row >= 0 && column >= 0 && row < self.rows && column < self.columns {
            self.data[(row * self.columns + column) as usize] = value;
        }
    }

    pub fn get_value(&self, row: isize, column: isize) -> T {
        if row < 0 || column < 0 || row >= self.rows || column >= self.columns {
            return self.nodata;
        }
        self.data[(row * self.columns + column) as usize]
    }

    pub fn increment(&mut self, row: isize, column: isize, value: T) {
        if row >= 0 && column >= 0 && row < self.rows && column < self.columns {
            self.data[(row * self.columns + column) as usize] += value;
        }
    }

    pub fn decrement(&mut self, row: isize, column: isize, value: T) {
        if row >= 0 && column >= 0 && row < self.rows && column < self.columns {
            self.data[(row * self.columns + column) as usize] -= value;
        }
    }

    pub fn set_row_data(&mut self, row: isize, values: Vec<T>) {
        if row < 0 || row >= self.rows {
            return;
        }
        for (column, value) in values.into_iter().enumerate().take(self.columns as usize) {
            self.data[(row * self.columns) as usize + column] = value;
        }
    }

    pub fn get_row_data(&self, row: isize) -> Vec<T> {
        let columns = self.columns as usize;
        let mut values: Vec<T> = vec![self.nodata; columns];
        if row >= 0 && row < self.rows {
            let start = row as usize * columns;
            values.copy_from_slice(&self.data[start..start + columns]);
        }
        values
    }

    pub fn duplicate(&self) -> Array2D<T> {
        self.clone()
    }

    pub fn reinitialize_values(&mut self, value: T) {
        self.data = vec![value; (self.rows * self.columns) as usize];
    }

    pub fn nodata(&self) -> T {
        self.nodata
    }
}

impl<T> Index<(isize, isize)> for Array2D<T>
where
    T: Copy + AddAssign + SubAssign,
{
    type Output = T;

    fn index(&self, index: (isize, isize)) -> &T {
        let (row, column) = index;
        if row < 0 || column < 0 || row >= self.rows || column >= self.columns {
            return &self.nodata;
        }
        &self.data[(row * self.columns + column) as usize]
    }
}

impl<T> IndexMut<(isize, isize)> for Array2D<T>
where
    T: Copy + AddAssign + SubAssign,
{
    fn index_mut(&mut self, index: (isize, isize)) -> &mut T {
        let (row, column) = index;
        if row < 0 || column < 0 || row >= self.rows || column >= self.columns {
            return &mut self.nodata;
        }
        &mut self.data[(row * self.columns + column) as usize]
    }
}

#[cfg(test)]
mod test {
    use super::Array2D;

    #[test]
    fn test_out_of_range_reads_return_nodata() {
        let a: Array2D<i8> = Array2D::new(3, 4, 0i8, -1i8).unwrap();
        assert_eq!(a.get_value(3, 0), -1i8);
        assert_eq!(a.get_value(0, 4), -1i8);
        assert_eq!(a[(-1, -1)], -1i8);
        assert_eq!(a[(2, 3)], 0i8);
    }

    #[test]
    fn test_row_data() {
        let mut a: Array2D<f64> = Array2D::new(2, 3, 0f64, -999f64).unwrap();
        a.set_row_data(1, vec![1.0, 2.0, 3.0]);
        a.increment(1, 2, 0.5);
        assert_eq!(a.get_row_data(1), vec![1.0, 2.0, 3.5]);
        assert_eq!(a.get_row_data(5), vec![-999f64; 3]);
    }

    #[test]
    fn test_negative_dimensions_rejected() {
        assert!(Array2D::new(-1, 3, 0f32, -1f32).is_err());
    }
}

//! Tensor operations used by the host layers.
//!
//! All ops allocate a fresh result tensor; nothing here records gradients.

use super::tensor::Tensor;

impl Tensor {
    /// Element-wise addition.
    ///
    /// # Panics
    ///
    /// Panics if shapes differ.
    #[must_use]
    pub fn add(&self, other: &Tensor) -> Tensor {
        assert_eq!(
            self.shape(),
            other.shape(),
            "add: shape mismatch {:?} vs {:?}",
            self.shape(),
            other.shape()
        );
        let data: Vec<f32> = self
            .data()
            .iter()
            .zip(other.data().iter())
            .map(|(&a, &b)| a + b)
            .collect();

        Tensor::new(&data, self.shape())
    }

    /// Element-wise multiplication.
    ///
    /// # Panics
    ///
    /// Panics if shapes differ.
    #[must_use]
    pub fn mul(&self, other: &Tensor) -> Tensor {
        assert_eq!(
            self.shape(),
            other.shape(),
            "mul: shape mismatch {:?} vs {:?}",
            self.shape(),
            other.shape()
        );
        let data: Vec<f32> = self
            .data()
            .iter()
            .zip(other.data().iter())
            .map(|(&a, &b)| a * b)
            .collect();

        Tensor::new(&data, self.shape())
    }

    /// Matrix multiplication of two 2D tensors.
    ///
    /// # Panics
    ///
    /// Panics unless both tensors are 2D with matching inner dimensions.
    #[must_use]
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        assert_eq!(self.ndim(), 2, "matmul requires 2D tensors");
        assert_eq!(other.ndim(), 2, "matmul requires 2D tensors");

        let (m, k1) = (self.shape()[0], self.shape()[1]);
        let (k2, n) = (other.shape()[0], other.shape()[1]);
        assert_eq!(k1, k2, "matmul dimension mismatch: {k1} vs {k2}");

        let a = self.data();
        let b = other.data();
        let mut data = vec![0.0f32; m * n];
        for i in 0..m {
            for k in 0..k1 {
                let aik = a[i * k1 + k];
                if aik == 0.0 {
                    continue;
                }
                for j in 0..n {
                    data[i * n + j] += aik * b[k * n + j];
                }
            }
        }

        Tensor::new(&data, &[m, n])
    }

    /// Transpose a 2D tensor.
    ///
    /// # Panics
    ///
    /// Panics unless the tensor is 2D.
    #[must_use]
    pub fn transpose(&self) -> Tensor {
        assert_eq!(self.ndim(), 2, "transpose requires 2D tensor");

        let (rows, cols) = (self.shape()[0], self.shape()[1]);
        let mut data = vec![0.0; rows * cols];

        for i in 0..rows {
            for j in 0..cols {
                data[j * rows + i] = self.data()[i * cols + j];
            }
        }

        Tensor::new(&data, &[cols, rows])
    }

    /// Add a row vector to every row of a 2D matrix.
    ///
    /// # Panics
    ///
    /// Panics unless `self` is 2D, `other` is 1D, and the column counts match.
    #[must_use]
    pub fn broadcast_add(&self, other: &Tensor) -> Tensor {
        assert_eq!(self.ndim(), 2, "broadcast_add requires 2D matrix");
        assert_eq!(other.ndim(), 1, "broadcast_add requires 1D vector");
        assert_eq!(
            self.shape()[1],
            other.shape()[0],
            "Matrix columns {} must match vector length {}",
            self.shape()[1],
            other.shape()[0]
        );

        let cols = self.shape()[1];
        let vec_data = other.data();
        let data: Vec<f32> = self
            .data()
            .iter()
            .enumerate()
            .map(|(idx, &v)| v + vec_data[idx % cols])
            .collect();

        Tensor::new(&data, self.shape())
    }

    /// Reshape to a new shape with the same number of elements.
    ///
    /// # Panics
    ///
    /// Panics if the element counts differ.
    #[must_use]
    pub fn view(&self, new_shape: &[usize]) -> Tensor {
        let old_numel: usize = self.shape().iter().product();
        let new_numel: usize = new_shape.iter().product();
        assert_eq!(
            old_numel, new_numel,
            "view: number of elements must match ({old_numel} vs {new_numel})"
        );

        Tensor::new(self.data(), new_shape)
    }
}

//! Minimal dense parameter tensor consumed by the optimizers
//!
//! Optimizers in this crate only need element-wise arithmetic, gradient
//! access, and layout introspection, so the tensor is a flat `ndarray`
//! vector with an optional gradient. Gradients carry a layout flag so the
//! dense-only engines can reject sparse input up front.

use ndarray::Array1;

/// A dense f32 parameter with an optional gradient
#[derive(Debug, Clone)]
pub struct Tensor {
    data: Array1<f32>,
    grad: Option<Array1<f32>>,
    sparse_grad: bool,
}

impl Tensor {
    /// Create a tensor from a flat vector
    pub fn from_vec(data: Vec<f32>) -> Self {
        Self { data: Array1::from_vec(data), grad: None, sparse_grad: false }
    }

    /// Create a zero-initialized tensor of the given length
    pub fn zeros(len: usize) -> Self {
        Self { data: Array1::zeros(len), grad: None, sparse_grad: false }
    }

    /// Immutable view of the values
    pub fn data(&self) -> &Array1<f32> {
        &self.data
    }

    /// Mutable view of the values
    pub fn data_mut(&mut self) -> &mut Array1<f32> {
        &mut self.data
    }

    /// Current gradient, if one has been set since the last `zero_grad`
    pub fn grad(&self) -> Option<Array1<f32>> {
        self.grad.clone()
    }

    /// Set a dense gradient
    pub fn set_grad(&mut self, grad: Array1<f32>) {
        self.grad = Some(grad);
        self.sparse_grad = false;
    }

    /// Set a gradient whose storage layout is sparse
    ///
    /// The values are kept densified here; the flag records that the
    /// producer used a sparse layout, which the dense-only engines reject.
    pub fn set_sparse_grad(&mut self, grad: Array1<f32>) {
        self.grad = Some(grad);
        self.sparse_grad = true;
    }

    /// Whether the current gradient uses a sparse layout
    pub fn has_sparse_grad(&self) -> bool {
        self.grad.is_some() && self.sparse_grad
    }

    /// Clear the gradient
    pub fn zero_grad(&mut self) {
        self.grad = None;
        self.sparse_grad = false;
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor holds no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_from_vec_no_grad() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0]);
        assert_eq!(t.len(), 3);
        assert!(t.grad().is_none());
        assert!(!t.has_sparse_grad());
    }

    #[test]
    fn test_set_and_zero_grad() {
        let mut t = Tensor::zeros(2);
        t.set_grad(arr1(&[0.5, -0.5]));
        assert_eq!(t.grad().unwrap()[0], 0.5);

        t.zero_grad();
        assert!(t.grad().is_none());
    }

    #[test]
    fn test_sparse_flag_cleared_by_dense_grad() {
        let mut t = Tensor::zeros(2);
        t.set_sparse_grad(arr1(&[1.0, 0.0]));
        assert!(t.has_sparse_grad());

        t.set_grad(arr1(&[1.0, 0.0]));
        assert!(!t.has_sparse_grad());
    }

    #[test]
    fn test_data_mut_updates_values() {
        let mut t = Tensor::from_vec(vec![1.0, 1.0]);
        *t.data_mut() -= 0.5;
        assert_eq!(t.data()[0], 0.5);
    }
}

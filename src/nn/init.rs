//! Weight initialization functions.
//!
//! Initialization schemes from the literature:
//!
//! - Xavier/Glorot (Glorot & Bengio, 2010) - for tanh/sigmoid activations
//! - Kaiming/He (He et al., 2015) - for `ReLU` activations
//!
//! # References
//!
//! - Glorot, X., & Bengio, Y. (2010). Understanding the difficulty of training
//!   deep feedforward neural networks. AISTATS.
//! - He, K., et al. (2015). Delving deep into rectifiers: Surpassing human-level
//!   performance on `ImageNet` classification. ICCV.

use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Xavier uniform initialization (Glorot & Bengio, 2010).
///
/// Samples from U(-a, a) where a = sqrt(6 / (`fan_in` + `fan_out`)).
/// Suitable for tanh and sigmoid activations.
#[must_use]
pub fn xavier_uniform(shape: &[usize], fan_in: usize, fan_out: usize, seed: Option<u64>) -> Tensor {
    let a = (6.0 / (fan_in + fan_out) as f32).sqrt();
    uniform(shape, -a, a, seed)
}

/// Kaiming uniform initialization (He et al., 2015).
///
/// Samples from U(-bound, bound) where bound = sqrt(6 / `fan_in`).
/// Optimal for `ReLU` activations.
#[must_use]
pub fn kaiming_uniform(shape: &[usize], fan_in: usize, seed: Option<u64>) -> Tensor {
    let bound = (6.0 / fan_in as f32).sqrt();
    uniform(shape, -bound, bound, seed)
}

/// Uniform initialization in `[low, high)`.
#[must_use]
pub fn uniform(shape: &[usize], low: f32, high: f32, seed: Option<u64>) -> Tensor {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let len: usize = shape.iter().product();
    let data: Vec<f32> = (0..len).map(|_| rng.gen_range(low..high)).collect();
    Tensor::new(&data, shape)
}

/// All-zeros initialization (typical for biases).
#[must_use]
pub fn zeros(shape: &[usize]) -> Tensor {
    Tensor::zeros(shape)
}

/// Constant initialization.
#[must_use]
pub fn constant(shape: &[usize], value: f32) -> Tensor {
    let len: usize = shape.iter().product();
    Tensor::new(&vec![value; len], shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xavier_uniform_bounds() {
        let t = xavier_uniform(&[10, 10], 10, 10, Some(42));
        let a = (6.0f32 / 20.0).sqrt();
        assert!(t.data().iter().all(|&v| v >= -a && v < a));
    }

    #[test]
    fn test_kaiming_uniform_bounds() {
        let t = kaiming_uniform(&[10, 10], 10, Some(42));
        let bound = (6.0f32 / 10.0).sqrt();
        assert!(t.data().iter().all(|&v| v >= -bound && v < bound));
    }

    #[test]
    fn test_seeded_init_reproducible() {
        let a = uniform(&[4, 4], -1.0, 1.0, Some(7));
        let b = uniform(&[4, 4], -1.0, 1.0, Some(7));
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn test_zeros_and_constant() {
        assert!(zeros(&[3]).data().iter().all(|&v| v == 0.0));
        assert!(constant(&[3], 1.5).data().iter().all(|&v| v == 1.5));
    }
}

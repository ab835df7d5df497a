use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

/// Inverted dropout: in training, zeroes each activation with probability
/// `rate` and scales survivors by `1 / (1 - rate)`; identity at inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dropout {
    pub rate: f64,
    #[serde(skip)]
    mask: Option<Matrix>,
}

impl Dropout {
    pub fn new(rate: f64) -> Dropout {
        Dropout { rate, mask: None }
    }

    pub fn forward<R: Rng + ?Sized>(&mut self, input: &Matrix, rng: &mut R) -> Matrix {
        if self.rate <= 0.0 {
            self.mask = None;
            return input.clone();
        }
        let keep = 1.0 - self.rate;
        let data = (0..input.data.len())
            .map(|_| if rng.gen::<f64>() < keep { 1.0 / keep } else { 0.0 })
            .collect();
        let mask = Matrix::from_vec(input.rows, input.cols, data);
        let out = input.hadamard(&mask);
        self.mask = Some(mask);
        out
    }

    pub fn backward(&self, grad_out: &Matrix) -> Matrix {
        match &self.mask {
            Some(mask) => grad_out.hadamard(mask),
            None => grad_out.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn keeps_expected_scale() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut drop = Dropout::new(0.4);
        let input = Matrix::from_vec(1, 10_000, vec![1.0; 10_000]);
        let out = drop.forward(&input, &mut rng);
        let mean = out.data.iter().sum::<f64>() / 10_000.0;
        assert!((mean - 1.0).abs() < 0.05);
        assert!(out.data.iter().all(|&x| x == 0.0 || (x - 1.0 / 0.6).abs() < 1e-12));

        let grad = drop.backward(&input);
        assert_eq!(grad, out);
    }
}

use std::collections::HashMap;

use crate::math::matrix::Matrix;

/// Adam optimizer (Adaptive Moment Estimation).
///
/// Moments are keyed by parameter name (`dense_0/kernel`, ...). A fresh
/// optimizer is created for every training run, so fine-tuning restarts the
/// moment estimates while keeping the head's parameters.
pub struct Adam {
    pub learning_rate: f64,
    /// Decay rate of the first moment.
    pub beta1: f64,
    /// Decay rate of the second moment.
    pub beta2: f64,
    pub epsilon: f64,
    moments: HashMap<String, (Matrix, Matrix)>,
    t: i32,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Adam {
        Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            moments: HashMap::new(),
            t: 0,
        }
    }

    /// Advances the time step. Call once per mini-batch, before the `step`s
    /// of that batch.
    pub fn next_step(&mut self) {
        self.t += 1;
    }

    /// Applies one Adam update to `param` given its gradient.
    pub fn step(&mut self, name: &str, param: &mut Matrix, grad: &Matrix) {
        let t = self.t.max(1);
        let (beta1, beta2) = (self.beta1, self.beta2);
        let (m, v) = self
            .moments
            .entry(name.to_owned())
            .or_insert_with(|| (Matrix::zeros(param.rows, param.cols), Matrix::zeros(param.rows, param.cols)));

        let correction1 = 1.0 - beta1.powi(t);
        let correction2 = 1.0 - beta2.powi(t);
        for i in 0..param.data.len() {
            let g = grad.data[i];
            m.data[i] = beta1 * m.data[i] + (1.0 - beta1) * g;
            v.data[i] = beta2 * v.data[i] + (1.0 - beta2) * g * g;
            let m_hat = m.data[i] / correction1;
            let v_hat = v.data[i] / correction2;
            param.data[i] -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }

    pub fn steps_taken(&self) -> i32 {
        self.t
    }
}

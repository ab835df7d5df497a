/// Two-condition early-stopping guard.
///
/// Fires once the loss has failed to beat the best seen value for `patience`
/// consecutive epochs *and* the current epoch's accuracy exceeds
/// `min_accuracy`. Stalled loss at low accuracy keeps training going.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    best_loss: f64,
    counter: usize,
    patience: usize,
    min_accuracy: f64,
}

impl EarlyStopping {
    pub fn new(patience: usize, min_accuracy: f64) -> EarlyStopping {
        EarlyStopping { best_loss: f64::INFINITY, counter: 0, patience, min_accuracy }
    }

    /// Records one epoch; returns `true` when training should halt.
    pub fn observe(&mut self, loss: f64, accuracy: f64) -> bool {
        if loss < self.best_loss {
            self.best_loss = loss;
            self.counter = 0;
            false
        } else {
            self.counter += 1;
            self.counter >= self.patience && accuracy > self.min_accuracy
        }
    }

    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }
}

use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::config::TrainingConfig;
use crate::error::{GestureError, Result};
use crate::network::metadata::ModelMetadata;

/// Describes one stage of the head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSpec {
    Dense {
        units: usize,
        input_size: usize,
        activation: ActivationFunction,
        #[serde(default)]
        l2: f64,
    },
    Dropout { rate: f64 },
}

/// Serializable architecture of a classifier head.
///
/// Built only through `HeadSpec::for_classes`, so the architecture is a pure
/// function of the embedding size, the class count and the hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadSpec {
    /// Flattened embedding length.
    pub input_size: usize,
    /// Width of the softmax output.
    pub num_classes: usize,
    /// Ordered stages, input → output.
    pub layers: Vec<LayerSpec>,
    #[serde(default)]
    pub metadata: Option<ModelMetadata>,
}

impl HeadSpec {
    /// Flatten → [Dense(ReLU, L2) → Dropout]* → Dense(softmax, num_classes).
    pub fn for_classes(input_size: usize, num_classes: usize, config: &TrainingConfig) -> HeadSpec {
        let mut layers = Vec::new();
        let mut fan_in = input_size;
        for (i, &units) in config.hidden.iter().enumerate() {
            layers.push(LayerSpec::Dense {
                units,
                input_size: fan_in,
                activation: ActivationFunction::ReLU,
                l2: config.l2,
            });
            if let Some(&rate) = config.dropout.get(i) {
                if rate > 0.0 {
                    layers.push(LayerSpec::Dropout { rate });
                }
            }
            fan_in = units;
        }
        layers.push(LayerSpec::Dense {
            units: num_classes,
            input_size: fan_in,
            activation: ActivationFunction::Softmax,
            l2: 0.0,
        });
        HeadSpec { input_size, num_classes, layers, metadata: None }
    }

    pub fn with_metadata(mut self, metadata: ModelMetadata) -> HeadSpec {
        self.metadata = Some(metadata);
        self
    }

    /// Checks that each dense stage consumes what the previous one produces,
    /// starting at `input_size` and ending at `num_classes`.
    pub fn check_chain(&self) -> Result<()> {
        let malformed = |why: String| -> Result<()> {
            Err(GestureError::ModelStore(format!("malformed model: {}", why)))
        };
        let mut fan_in = self.input_size;
        let mut dense_layers = 0;
        for (i, layer) in self.layers.iter().enumerate() {
            match *layer {
                LayerSpec::Dense { units, input_size, .. } => {
                    if input_size != fan_in {
                        return malformed(format!("layer {} takes {} inputs but receives {}", i, input_size, fan_in));
                    }
                    if units == 0 {
                        return malformed(format!("layer {} has no units", i));
                    }
                    fan_in = units;
                    dense_layers += 1;
                }
                LayerSpec::Dropout { rate } => {
                    if !(0.0..1.0).contains(&rate) {
                        return malformed(format!("layer {} has dropout rate {}", i, rate));
                    }
                }
            }
        }
        if dense_layers == 0 {
            return malformed("no dense layers".into());
        }
        if fan_in != self.num_classes {
            return malformed(format!("head outputs {} values for {} classes", fan_in, self.num_classes));
        }
        Ok(())
    }

    /// Name and `[rows, cols]` of every trainable tensor, kernel before bias.
    pub fn parameter_shapes(&self) -> Vec<(String, [usize; 2])> {
        let mut shapes = Vec::new();
        for (i, layer) in self.layers.iter().enumerate() {
            if let LayerSpec::Dense { units, input_size, .. } = *layer {
                shapes.push((kernel_name(i), [input_size, units]));
                shapes.push((bias_name(i), [1, units]));
            }
        }
        shapes
    }
}

pub(crate) fn kernel_name(layer: usize) -> String {
    format!("dense_{}/kernel", layer)
}

pub(crate) fn bias_name(layer: usize) -> String {
    format!("dense_{}/bias", layer)
}

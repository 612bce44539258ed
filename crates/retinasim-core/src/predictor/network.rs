//! Learned predictor - a small dense network trained on synthetic data.
//!
//! Layout: `input_size` features, ReLU hidden layers, three sigmoid
//! outputs (progression, vitality, risk). Feature 0 is IOP divided by
//! [`IOP_SCALE`], feature 1 is the mortality rate; the remaining features
//! carry noise during training and are zero at prediction time.
//! Trained with mini-batch SGD on binary cross-entropy.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use super::{Prediction, Predictor, PredictorError};

/// Outputs: progression, vitality, risk
pub const OUTPUT_SIZE: usize = 3;

/// IOP is divided by this before entering the network
pub const IOP_SCALE: f64 = 50.0;

const LOG_EPSILON: f64 = 1e-7;

/// Network shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub input_size: usize,
    pub hidden_layers: Vec<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            input_size: 20,
            hidden_layers: vec![64, 32, 16],
        }
    }
}

/// Optimizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Fraction of samples used for training, the rest validates
    pub train_split: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 32,
            learning_rate: 0.05,
            train_split: 0.8,
        }
    }
}

/// One labelled example
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub features: Vec<f64>,
    pub targets: [f64; OUTPUT_SIZE],
}

/// Loss per epoch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub loss: Vec<f64>,
    pub val_loss: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub loss: f64,
    pub mse: f64,
    pub mae: f64,
}

/// Build the feature vector for one reading
pub fn features(iop: f64, mortality_rate: f64, input_size: usize) -> Vec<f64> {
    let mut x = vec![0.0; input_size];
    x[0] = iop / IOP_SCALE;
    x[1] = mortality_rate;
    x
}

/// Synthetic training set: IOP uniform in [10, 50), mortality uniform in
/// [0, 1), the other features standard normal noise.
///
/// Targets: progression = IOP / 50, vitality = 1 - mortality,
/// risk = (IOP - 21) / 30, all clamped to [0, 1].
pub fn generate_synthetic_data(num_samples: usize, input_size: usize, rng: &mut impl Rng) -> Vec<Sample> {
    let input_size = input_size.max(2);
    (0..num_samples)
        .map(|_| {
            let mut x: Vec<f64> = (0..input_size).map(|_| StandardNormal.sample(rng)).collect();
            let iop = rng.gen_range(10.0..50.0);
            let mortality: f64 = rng.gen_range(0.0..1.0);
            x[0] = iop / IOP_SCALE;
            x[1] = mortality;
            Sample {
                features: x,
                targets: [
                    (iop / 50.0).clamp(0.0, 1.0),
                    (1.0 - mortality).clamp(0.0, 1.0),
                    ((iop - 21.0) / 30.0).clamp(0.0, 1.0),
                ],
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DenseLayer {
    inputs: usize,
    outputs: usize,
    /// Row-major, one row per output
    weights: Vec<f64>,
    biases: Vec<f64>,
}

impl DenseLayer {
    fn random(inputs: usize, outputs: usize, rng: &mut impl Rng) -> Self {
        // He initialization suits the ReLU layers
        let std_dev = (2.0 / inputs.max(1) as f64).sqrt();
        Self {
            inputs,
            outputs,
            weights: (0..inputs * outputs)
                .map(|_| {
                    let z: f64 = StandardNormal.sample(rng);
                    std_dev * z
                })
                .collect(),
            biases: vec![0.0; outputs],
        }
    }

    fn zeros_like(&self) -> Self {
        Self {
            inputs: self.inputs,
            outputs: self.outputs,
            weights: vec![0.0; self.weights.len()],
            biases: vec![0.0; self.biases.len()],
        }
    }

    fn is_consistent(&self) -> bool {
        self.weights.len() == self.inputs * self.outputs && self.biases.len() == self.outputs
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .chunks(self.inputs)
            .zip(&self.biases)
            .map(|(row, bias)| bias + row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>())
            .collect()
    }
}

fn relu(x: f64) -> f64 {
    x.max(0.0)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Trained network predictor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedPredictor {
    input_size: usize,
    layers: Vec<DenseLayer>,
}

impl LearnedPredictor {
    /// Randomly initialized, untrained network
    pub fn new(config: &ModelConfig, rng: &mut impl Rng) -> Self {
        let input_size = config.input_size.max(2);
        let mut layers = Vec::with_capacity(config.hidden_layers.len() + 1);
        let mut fan_in = input_size;
        // Zero-width layers would block every signal
        for &width in config.hidden_layers.iter().filter(|&&w| w > 0) {
            layers.push(DenseLayer::random(fan_in, width, rng));
            fan_in = width;
        }
        layers.push(DenseLayer::random(fan_in, OUTPUT_SIZE, rng));
        Self { input_size, layers }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// Activations of every layer, input first
    fn forward_trace(&self, input: &[f64]) -> Vec<Vec<f64>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.to_vec());
        let last = self.layers.len() - 1;
        for (idx, layer) in self.layers.iter().enumerate() {
            let z = layer.forward(&activations[idx]);
            let a = if idx == last {
                z.into_iter().map(sigmoid).collect()
            } else {
                z.into_iter().map(relu).collect()
            };
            activations.push(a);
        }
        activations
    }

    /// Raw network output for a feature vector
    pub fn forward(&self, input: &[f64]) -> [f64; OUTPUT_SIZE] {
        let trace = self.forward_trace(input);
        let mut out = [0.0; OUTPUT_SIZE];
        if let Some(last) = trace.last() {
            for (slot, value) in out.iter_mut().zip(last) {
                *slot = *value;
            }
        }
        out
    }

    /// Train on `data`, returning per-epoch training and validation loss
    pub fn train(&mut self, data: &[Sample], config: &TrainingConfig, rng: &mut impl Rng) -> TrainingHistory {
        let split = ((data.len() as f64) * config.train_split.clamp(0.0, 1.0)).floor() as usize;
        let (train, validation) = data.split_at(split);
        let batch_size = config.batch_size.max(1);

        let mut order: Vec<usize> = (0..train.len()).collect();
        let mut history = TrainingHistory::default();

        for epoch in 0..config.epochs {
            order.shuffle(rng);
            for batch in order.chunks(batch_size) {
                let mut grads: Vec<DenseLayer> = self.layers.iter().map(DenseLayer::zeros_like).collect();
                for &idx in batch {
                    self.accumulate_gradients(&train[idx], &mut grads);
                }
                let step = config.learning_rate / batch.len() as f64;
                for (layer, grad) in self.layers.iter_mut().zip(&grads) {
                    for (w, g) in layer.weights.iter_mut().zip(&grad.weights) {
                        *w -= step * g;
                    }
                    for (b, g) in layer.biases.iter_mut().zip(&grad.biases) {
                        *b -= step * g;
                    }
                }
            }

            let loss = self.evaluate(train).loss;
            history.loss.push(loss);
            if !validation.is_empty() {
                history.val_loss.push(self.evaluate(validation).loss);
            }
            log::debug!("Epoch {}: loss={:.4}", epoch + 1, loss);
        }

        history
    }

    fn accumulate_gradients(&self, sample: &Sample, grads: &mut [DenseLayer]) {
        let trace = self.forward_trace(&sample.features);

        // Sigmoid + cross-entropy: output delta is (prediction - target)
        let mut delta: Vec<f64> = trace[self.layers.len()]
            .iter()
            .zip(&sample.targets)
            .map(|(a, t)| (a - t) / OUTPUT_SIZE as f64)
            .collect();

        for idx in (0..self.layers.len()).rev() {
            let layer = &self.layers[idx];
            let input = &trace[idx];
            let grad = &mut grads[idx];

            for (o, d) in delta.iter().enumerate() {
                grad.biases[o] += d;
                let row = &mut grad.weights[o * layer.inputs..(o + 1) * layer.inputs];
                for (g, x) in row.iter_mut().zip(input) {
                    *g += d * x;
                }
            }

            if idx > 0 {
                let mut previous = vec![0.0; layer.inputs];
                for (o, d) in delta.iter().enumerate() {
                    let row = &layer.weights[o * layer.inputs..(o + 1) * layer.inputs];
                    for (p, w) in previous.iter_mut().zip(row) {
                        *p += w * d;
                    }
                }
                // ReLU derivative on the layer below
                for (p, a) in previous.iter_mut().zip(input) {
                    if *a <= 0.0 {
                        *p = 0.0;
                    }
                }
                delta = previous;
            }
        }
    }

    /// Cross-entropy loss plus MSE and MAE over `data`
    pub fn evaluate(&self, data: &[Sample]) -> Evaluation {
        if data.is_empty() {
            return Evaluation {
                loss: 0.0,
                mse: 0.0,
                mae: 0.0,
            };
        }
        let (mut loss, mut mse, mut mae) = (0.0, 0.0, 0.0);
        for sample in data {
            let out = self.forward(&sample.features);
            for (a, t) in out.iter().zip(&sample.targets) {
                let a = a.clamp(LOG_EPSILON, 1.0 - LOG_EPSILON);
                loss -= t * a.ln() + (1.0 - t) * (1.0 - a).ln();
                mse += (a - t) * (a - t);
                mae += (a - t).abs();
            }
        }
        let n = (data.len() * OUTPUT_SIZE) as f64;
        Evaluation {
            loss: loss / n,
            mse: mse / n,
            mae: mae / n,
        }
    }

    pub fn save<W: Write>(&self, writer: W) -> Result<(), PredictorError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load<R: Read>(reader: R) -> Result<Self, PredictorError> {
        let model: LearnedPredictor = serde_json::from_reader(reader)?;
        model.check_shapes()?;
        Ok(model)
    }

    fn check_shapes(&self) -> Result<(), PredictorError> {
        if self.layers.is_empty() {
            return Err(PredictorError::Empty);
        }
        if self.input_size < 2 {
            return Err(PredictorError::Shape {
                expected: 2,
                found: self.input_size,
            });
        }
        let mut expected = self.input_size;
        for layer in &self.layers {
            if layer.inputs == 0 || layer.outputs == 0 {
                return Err(PredictorError::Shape {
                    expected,
                    found: 0,
                });
            }
            if layer.inputs != expected || !layer.is_consistent() {
                return Err(PredictorError::Shape {
                    expected,
                    found: layer.inputs,
                });
            }
            expected = layer.outputs;
        }
        if expected != OUTPUT_SIZE {
            return Err(PredictorError::Shape {
                expected: OUTPUT_SIZE,
                found: expected,
            });
        }
        Ok(())
    }
}

impl Predictor for LearnedPredictor {
    fn name(&self) -> &str {
        "learned"
    }

    fn predict(&self, iop: f64, mortality_rate: f64) -> Prediction {
        let [progression, vitality, risk] = self.forward(&features(iop, mortality_rate, self.input_size));
        Prediction::clamped(progression, vitality, risk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_model(rng: &mut StdRng) -> LearnedPredictor {
        LearnedPredictor::new(
            &ModelConfig {
                input_size: 4,
                hidden_layers: vec![8],
            },
            rng,
        )
    }

    #[test]
    fn test_outputs_are_bounded() {
        let mut rng = StdRng::seed_from_u64(11);
        let model = LearnedPredictor::new(&ModelConfig::default(), &mut rng);
        for iop in [0.0, 15.0, 35.0, 80.0, 500.0] {
            let p = model.predict(iop, 0.3);
            for v in [p.glaucoma_progression, p.cell_vitality, p.risk_level] {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_synthetic_targets() {
        let mut rng = StdRng::seed_from_u64(12);
        let data = generate_synthetic_data(200, 6, &mut rng);
        assert_eq!(data.len(), 200);
        for sample in &data {
            assert_eq!(sample.features.len(), 6);
            let iop = sample.features[0] * IOP_SCALE;
            assert!((10.0..50.0).contains(&iop));
            assert!((sample.targets[1] - (1.0 - sample.features[1])).abs() < 1e-12);
            if iop <= 21.0 {
                assert_eq!(sample.targets[2], 0.0);
            }
        }
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut rng = StdRng::seed_from_u64(13);
        let data = generate_synthetic_data(400, 4, &mut rng);
        let mut model = small_model(&mut rng);

        let before = model.evaluate(&data).loss;
        let history = model.train(
            &data,
            &TrainingConfig {
                epochs: 30,
                batch_size: 16,
                learning_rate: 0.1,
                train_split: 0.8,
            },
            &mut rng,
        );
        let after = model.evaluate(&data).loss;

        assert_eq!(history.loss.len(), 30);
        assert_eq!(history.val_loss.len(), 30);
        assert!(after < before, "loss went from {} to {}", before, after);
        assert!(history.loss.iter().all(|l| l.is_finite()));
    }

    #[test]
    fn test_zero_width_hidden_layers_are_skipped() {
        let mut rng = StdRng::seed_from_u64(15);
        let model = LearnedPredictor::new(
            &ModelConfig {
                input_size: 4,
                hidden_layers: vec![0, 8, 0],
            },
            &mut rng,
        );

        let mut buffer = Vec::new();
        model.save(&mut buffer).unwrap();
        let loaded = LearnedPredictor::load(&buffer[..]).expect("skipped layers keep shapes valid");
        let p = loaded.predict(20.0, 0.1);
        assert!((0.0..=1.0).contains(&p.risk_level));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let mut rng = StdRng::seed_from_u64(14);
        let model = small_model(&mut rng);

        let mut buffer = Vec::new();
        model.save(&mut buffer).expect("save failed");
        let loaded = LearnedPredictor::load(&buffer[..]).expect("load failed");

        let a = model.predict(27.0, 0.2);
        let b = loaded.predict(27.0, 0.2);
        assert!((a.risk_level - b.risk_level).abs() < 1e-12);
        assert_eq!(loaded.input_size(), 4);
    }

    #[test]
    fn test_load_rejects_bad_shapes() {
        let json = r#"{"input_size":4,"layers":[{"inputs":5,"outputs":3,"weights":[],"biases":[0,0,0]}]}"#;
        assert!(matches!(
            LearnedPredictor::load(json.as_bytes()),
            Err(PredictorError::Shape { expected: 4, .. })
        ));

        let zero_width = r#"{"input_size":2,"layers":[
            {"inputs":2,"outputs":0,"weights":[],"biases":[]},
            {"inputs":0,"outputs":3,"weights":[],"biases":[0,0,0]}]}"#;
        assert!(matches!(
            LearnedPredictor::load(zero_width.as_bytes()),
            Err(PredictorError::Shape { found: 0, .. })
        ));

        let empty = r#"{"input_size":4,"layers":[]}"#;
        assert!(matches!(LearnedPredictor::load(empty.as_bytes()), Err(PredictorError::Empty)));
    }
}

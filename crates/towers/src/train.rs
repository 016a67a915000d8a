//! Mini-batch Adam training of [`TwoTowerModel`] on binary cross-entropy.

use std::time::Instant;

use ndarray::{Array, Array1, Array2, Axis, Dimension, Zip};
use pairs::{PairSet, TrainingPair};
use recommend::Scorer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn, Level};

use crate::config::{TrainConfig, TrainError};
use crate::model::{Forward, TwoTowerModel};

/// Probability clipping used by the loss, matching the usual framework epsilon.
const LOSS_EPSILON: f32 = 1e-7;

/// Fits a scorer to labeled pairs.
pub trait Trainer {
    type Model: Scorer;

    fn train(&self, pairs: &PairSet) -> Result<TrainOutcome<Self::Model>, TrainError>;
}

/// A trained model together with its per-epoch metrics.
#[derive(Debug, Clone)]
pub struct TrainOutcome<M> {
    pub model: M,
    pub history: TrainingHistory,
}

/// Metrics for one epoch. Training figures are running means over the
/// epoch's batches; validation figures use the weights at epoch end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub loss: f32,
    pub accuracy: f32,
    pub val_loss: Option<f32>,
    pub val_accuracy: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
    pub train_samples: usize,
    pub validation_samples: usize,
}

impl TrainingHistory {
    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }

    pub fn first(&self) -> Option<&EpochMetrics> {
        self.epochs.first()
    }
}

/// The in-tree trainer for [`TwoTowerModel`].
#[derive(Debug, Clone, Default)]
pub struct TwoTowerTrainer {
    cfg: TrainConfig,
}

impl TwoTowerTrainer {
    pub fn new(cfg: TrainConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &TrainConfig {
        &self.cfg
    }
}

impl Trainer for TwoTowerTrainer {
    type Model = TwoTowerModel;

    fn train(&self, pairs: &PairSet) -> Result<TrainOutcome<TwoTowerModel>, TrainError> {
        let start = Instant::now();
        let span = tracing::span!(
            Level::INFO,
            "towers.train",
            pairs = pairs.len(),
            dimension = pairs.dimension(),
            epochs = self.cfg.epochs
        );
        let _guard = span.enter();

        match train_inner(&self.cfg, pairs) {
            Ok(outcome) => {
                let last = outcome.history.last();
                info!(
                    loss = ?last.map(|m| m.loss),
                    accuracy = ?last.map(|m| m.accuracy),
                    val_loss = ?last.and_then(|m| m.val_loss),
                    val_accuracy = ?last.and_then(|m| m.val_accuracy),
                    parameters = outcome.model.parameter_count(),
                    elapsed_micros = start.elapsed().as_micros(),
                    "train_success"
                );
                Ok(outcome)
            }
            Err(err) => {
                warn!(
                    error = %err,
                    elapsed_micros = start.elapsed().as_micros(),
                    "train_failure"
                );
                Err(err)
            }
        }
    }
}

fn train_inner(
    cfg: &TrainConfig,
    set: &PairSet,
) -> Result<TrainOutcome<TwoTowerModel>, TrainError> {
    cfg.validate()?;
    if set.is_empty() {
        return Err(TrainError::EmptyDataset);
    }
    let dim = set.dimension();
    check_dimensions(set.pairs(), dim)?;

    let pairs = set.pairs();
    let train_len = ((pairs.len() as f64) * (1.0 - f64::from(cfg.validation_split))) as usize;
    if train_len == 0 {
        return Err(TrainError::EmptyDataset);
    }
    let (train, validation) = pairs.split_at(train_len);

    let mut rng = fastrand::Rng::with_seed(cfg.seed);
    let mut model = TwoTowerModel::init(dim, cfg.embedding_dim, &mut rng);
    let mut adam = Adam::new(cfg, &model);
    let mut order: Vec<usize> = (0..train.len()).collect();

    let mut history = TrainingHistory {
        epochs: Vec::with_capacity(cfg.epochs),
        train_samples: train.len(),
        validation_samples: validation.len(),
    };

    for epoch in 0..cfg.epochs {
        if cfg.shuffle {
            rng.shuffle(&mut order);
        }

        let mut loss_sum = 0.0f64;
        let mut correct = 0usize;
        for batch in order.chunks(cfg.batch_size) {
            let (users, dests, labels) = batch_matrices(train, batch, dim);
            let fwd = model.forward(&users, &dests);
            loss_sum += f64::from(bce_loss(&fwd.prob, &labels)) * batch.len() as f64;
            correct += count_correct(&fwd.prob, &labels);

            let grads = backward(&model, &users, &dests, &labels, &fwd);
            adam.step(&mut model, &grads);
        }

        let loss = (loss_sum / train.len() as f64) as f32;
        if !loss.is_finite() {
            return Err(TrainError::NonFinite { epoch: epoch + 1 });
        }
        let accuracy = correct as f32 / train.len() as f32;
        let (val_loss, val_accuracy) = match evaluate(&model, validation, dim) {
            Some((l, a)) => (Some(l), Some(a)),
            None => (None, None),
        };

        info!(
            epoch = epoch + 1,
            loss,
            accuracy,
            val_loss = ?val_loss,
            val_accuracy = ?val_accuracy,
            "epoch_complete"
        );
        history.epochs.push(EpochMetrics {
            epoch: epoch + 1,
            loss,
            accuracy,
            val_loss,
            val_accuracy,
        });
    }

    Ok(TrainOutcome { model, history })
}

fn check_dimensions(pairs: &[TrainingPair], dim: usize) -> Result<(), TrainError> {
    for (index, pair) in pairs.iter().enumerate() {
        for actual in [pair.user.len(), pair.destination.len()] {
            if actual != dim {
                return Err(TrainError::Dimension {
                    index,
                    expected: dim,
                    actual,
                });
            }
        }
    }
    Ok(())
}

/// Mean loss and accuracy over `pairs`, or `None` for an empty slice.
pub fn evaluate(model: &TwoTowerModel, pairs: &[TrainingPair], dim: usize) -> Option<(f32, f32)> {
    if pairs.is_empty() {
        return None;
    }
    let rows: Vec<usize> = (0..pairs.len()).collect();
    let (users, dests, labels) = batch_matrices(pairs, &rows, dim);
    let prob = model.predict_batch(&users, &dests);
    let loss = bce_loss(&prob, &labels);
    let accuracy = count_correct(&prob, &labels) as f32 / pairs.len() as f32;
    debug!(samples = pairs.len(), loss, accuracy, "evaluate");
    Some((loss, accuracy))
}

fn batch_matrices(
    pairs: &[TrainingPair],
    rows: &[usize],
    dim: usize,
) -> (Array2<f32>, Array2<f32>, Array1<f32>) {
    let users = Array2::from_shape_fn((rows.len(), dim), |(r, c)| pairs[rows[r]].user[c]);
    let dests = Array2::from_shape_fn((rows.len(), dim), |(r, c)| pairs[rows[r]].destination[c]);
    let labels = rows.iter().map(|&r| f32::from(pairs[r].label)).collect();
    (users, dests, labels)
}

/// Mean binary cross-entropy with probabilities clipped away from 0 and 1.
pub(crate) fn bce_loss(prob: &Array1<f32>, labels: &Array1<f32>) -> f32 {
    let n = labels.len().max(1) as f32;
    let total: f32 = prob
        .iter()
        .zip(labels.iter())
        .map(|(&p, &y)| {
            let p = p.clamp(LOSS_EPSILON, 1.0 - LOSS_EPSILON);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    total / n
}

fn count_correct(prob: &Array1<f32>, labels: &Array1<f32>) -> usize {
    prob.iter()
        .zip(labels.iter())
        .filter(|&(&p, &y)| (p > 0.5) == (y > 0.5))
        .count()
}

/// Gradients with the same layout as [`TwoTowerModel`].
#[derive(Debug, Clone)]
pub(crate) struct Gradients {
    pub(crate) user_kernel: Array2<f32>,
    pub(crate) user_bias: Array1<f32>,
    pub(crate) dest_kernel: Array2<f32>,
    pub(crate) dest_bias: Array1<f32>,
    pub(crate) out_weight: f32,
    pub(crate) out_bias: f32,
}

impl Gradients {
    fn zeros_like(model: &TwoTowerModel) -> Self {
        Self {
            user_kernel: Array2::zeros(model.user_kernel.raw_dim()),
            user_bias: Array1::zeros(model.user_bias.raw_dim()),
            dest_kernel: Array2::zeros(model.dest_kernel.raw_dim()),
            dest_bias: Array1::zeros(model.dest_bias.raw_dim()),
            out_weight: 0.0,
            out_bias: 0.0,
        }
    }
}

/// Gradient of the mean BCE loss with respect to every parameter.
pub(crate) fn backward(
    model: &TwoTowerModel,
    users: &Array2<f32>,
    dests: &Array2<f32>,
    labels: &Array1<f32>,
    fwd: &Forward,
) -> Gradients {
    let n = labels.len().max(1) as f32;
    // d(loss)/d(logit) for sigmoid + BCE.
    let d_logit = (&fwd.prob - labels) / n;
    let out_weight = d_logit.dot(&fwd.dot);
    let out_bias = d_logit.sum();

    let d_dot = (&d_logit * model.out_weight).insert_axis(Axis(1));
    let mut d_user = &fwd.dest_act * &d_dot;
    d_user.zip_mut_with(&fwd.user_pre, |g, &pre| {
        if pre <= 0.0 {
            *g = 0.0;
        }
    });
    let mut d_dest = &fwd.user_act * &d_dot;
    d_dest.zip_mut_with(&fwd.dest_pre, |g, &pre| {
        if pre <= 0.0 {
            *g = 0.0;
        }
    });

    Gradients {
        user_kernel: users.t().dot(&d_user),
        user_bias: d_user.sum_axis(Axis(0)),
        dest_kernel: dests.t().dot(&d_dest),
        dest_bias: d_dest.sum_axis(Axis(0)),
        out_weight,
        out_bias,
    }
}

/// Adam with bias correction folded into the step size.
struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: i32,
    m: Gradients,
    v: Gradients,
}

impl Adam {
    fn new(cfg: &TrainConfig, model: &TwoTowerModel) -> Self {
        Self {
            lr: cfg.learning_rate,
            beta1: cfg.beta1,
            beta2: cfg.beta2,
            epsilon: cfg.epsilon,
            t: 0,
            m: Gradients::zeros_like(model),
            v: Gradients::zeros_like(model),
        }
    }

    fn step(&mut self, model: &mut TwoTowerModel, g: &Gradients) {
        self.t = self.t.saturating_add(1);
        let correction1 = 1.0 - self.beta1.powi(self.t);
        let correction2 = 1.0 - self.beta2.powi(self.t);
        let step = AdamStep {
            lr_t: self.lr * correction2.sqrt() / correction1,
            b1: self.beta1,
            b2: self.beta2,
            eps: self.epsilon,
        };
        let (m, v) = (&mut self.m, &mut self.v);

        step.tensor(
            &mut model.user_kernel,
            &mut m.user_kernel,
            &mut v.user_kernel,
            &g.user_kernel,
        );
        step.tensor(&mut model.user_bias, &mut m.user_bias, &mut v.user_bias, &g.user_bias);
        step.tensor(
            &mut model.dest_kernel,
            &mut m.dest_kernel,
            &mut v.dest_kernel,
            &g.dest_kernel,
        );
        step.tensor(&mut model.dest_bias, &mut m.dest_bias, &mut v.dest_bias, &g.dest_bias);
        step.scalar(
            &mut model.out_weight,
            &mut m.out_weight,
            &mut v.out_weight,
            g.out_weight,
        );
        step.scalar(&mut model.out_bias, &mut m.out_bias, &mut v.out_bias, g.out_bias);
    }
}

#[derive(Clone, Copy)]
struct AdamStep {
    lr_t: f32,
    b1: f32,
    b2: f32,
    eps: f32,
}

impl AdamStep {
    fn tensor<D: Dimension>(
        self,
        param: &mut Array<f32, D>,
        m: &mut Array<f32, D>,
        v: &mut Array<f32, D>,
        grad: &Array<f32, D>,
    ) {
        Zip::from(param)
            .and(m)
            .and(v)
            .and(grad)
            .for_each(|p, m, v, &g| self.scalar(p, m, v, g));
    }

    #[inline]
    fn scalar(self, p: &mut f32, m: &mut f32, v: &mut f32, g: f32) {
        *m = self.b1 * *m + (1.0 - self.b1) * g;
        *v = self.b2 * *v + (1.0 - self.b2) * g * g;
        *p -= self.lr_t * *m / (v.sqrt() + self.eps);
    }
}

//! The two-tower network.
//!
//! ```text
//! user ──► Dense(D, relu) ──┐
//!                           ├─► dot ──► Dense(1, sigmoid) ──► score
//! dest ──► Dense(D, relu) ──┘
//! ```
//!
//! Towers do not share weights. Inputs are vocabulary feature vectors.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use recommend::Scorer;

use crate::config::TrainError;

/// Trained (or freshly initialized) two-tower parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoTowerModel {
    pub(crate) user_kernel: Array2<f32>,
    pub(crate) user_bias: Array1<f32>,
    pub(crate) dest_kernel: Array2<f32>,
    pub(crate) dest_bias: Array1<f32>,
    pub(crate) out_weight: f32,
    pub(crate) out_bias: f32,
}

/// Intermediate activations of a batch forward pass, kept for backprop.
#[derive(Debug)]
pub(crate) struct Forward {
    pub(crate) user_pre: Array2<f32>,
    pub(crate) user_act: Array2<f32>,
    pub(crate) dest_pre: Array2<f32>,
    pub(crate) dest_act: Array2<f32>,
    pub(crate) dot: Array1<f32>,
    pub(crate) prob: Array1<f32>,
}

impl TwoTowerModel {
    /// Glorot-uniform kernels and zero biases.
    pub fn new(input_dim: usize, embedding_dim: usize, seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        Self::init(input_dim, embedding_dim, &mut rng)
    }

    pub(crate) fn init(input_dim: usize, embedding_dim: usize, rng: &mut fastrand::Rng) -> Self {
        let user_kernel = glorot_uniform(input_dim, embedding_dim, rng);
        let dest_kernel = glorot_uniform(input_dim, embedding_dim, rng);
        let out_weight = glorot_uniform(1, 1, rng)[[0, 0]];
        Self {
            user_kernel,
            user_bias: Array1::zeros(embedding_dim),
            dest_kernel,
            dest_bias: Array1::zeros(embedding_dim),
            out_weight,
            out_bias: 0.0,
        }
    }

    /// Assemble a model from raw parameters, checking that shapes agree.
    pub fn from_parts(
        user_kernel: Array2<f32>,
        user_bias: Array1<f32>,
        dest_kernel: Array2<f32>,
        dest_bias: Array1<f32>,
        out_weight: f32,
        out_bias: f32,
    ) -> Result<Self, TrainError> {
        let (input_dim, embedding_dim) = user_kernel.dim();
        check_shape("user_bias", user_bias.shape(), &[embedding_dim])?;
        check_shape("dest_kernel", dest_kernel.shape(), &[input_dim, embedding_dim])?;
        check_shape("dest_bias", dest_bias.shape(), &[embedding_dim])?;
        Ok(Self {
            user_kernel,
            user_bias,
            dest_kernel,
            dest_bias,
            out_weight,
            out_bias,
        })
    }

    /// Vocabulary size the model was built for.
    pub fn input_dim(&self) -> usize {
        self.user_kernel.nrows()
    }

    pub fn embedding_dim(&self) -> usize {
        self.user_kernel.ncols()
    }

    pub fn parameter_count(&self) -> usize {
        self.user_kernel.len()
            + self.user_bias.len()
            + self.dest_kernel.len()
            + self.dest_bias.len()
            + 2
    }

    pub fn user_kernel(&self) -> &Array2<f32> {
        &self.user_kernel
    }

    pub fn user_bias(&self) -> &Array1<f32> {
        &self.user_bias
    }

    pub fn dest_kernel(&self) -> &Array2<f32> {
        &self.dest_kernel
    }

    pub fn dest_bias(&self) -> &Array1<f32> {
        &self.dest_bias
    }

    /// `(weight, bias)` of the final scalar dense layer.
    pub fn output_layer(&self) -> (f32, f32) {
        (self.out_weight, self.out_bias)
    }

    pub fn embed_user(&self, user: &[f32]) -> Array1<f32> {
        (ArrayView1::from(user).dot(&self.user_kernel) + &self.user_bias).mapv(relu)
    }

    pub fn embed_destination(&self, destination: &[f32]) -> Array1<f32> {
        (ArrayView1::from(destination).dot(&self.dest_kernel) + &self.dest_bias).mapv(relu)
    }

    pub(crate) fn forward(&self, users: &Array2<f32>, dests: &Array2<f32>) -> Forward {
        let user_pre = users.dot(&self.user_kernel) + &self.user_bias;
        let user_act = user_pre.mapv(relu);
        let dest_pre = dests.dot(&self.dest_kernel) + &self.dest_bias;
        let dest_act = dest_pre.mapv(relu);
        let dot = (&user_act * &dest_act).sum_axis(Axis(1));
        let prob = dot.mapv(|s| sigmoid(self.out_weight * s + self.out_bias));
        Forward {
            user_pre,
            user_act,
            dest_pre,
            dest_act,
            dot,
            prob,
        }
    }

    /// Scores for row-aligned user and destination matrices.
    pub fn predict_batch(&self, users: &Array2<f32>, dests: &Array2<f32>) -> Array1<f32> {
        self.forward(users, dests).prob
    }
}

impl Scorer for TwoTowerModel {
    /// Returns `NaN` when either vector does not match [`input_dim`](TwoTowerModel::input_dim).
    fn score(&self, user: &[f32], destination: &[f32]) -> f32 {
        if user.len() != self.input_dim() || destination.len() != self.input_dim() {
            return f32::NAN;
        }
        let u = self.embed_user(user);
        let d = self.embed_destination(destination);
        sigmoid(self.out_weight * u.dot(&d) + self.out_bias)
    }

    fn score_batch(&self, user: &[f32], destinations: &[Vec<f32>]) -> Vec<f32> {
        let dim = self.input_dim();
        if user.len() != dim || destinations.iter().any(|d| d.len() != dim) {
            return destinations.iter().map(|d| self.score(user, d)).collect();
        }
        let u = self.embed_user(user);
        let dests = Array2::from_shape_fn((destinations.len(), dim), |(r, c)| destinations[r][c]);
        let d = (dests.dot(&self.dest_kernel) + &self.dest_bias).mapv(relu);
        d.dot(&u)
            .iter()
            .map(|&s| sigmoid(self.out_weight * s + self.out_bias))
            .collect()
    }
}

fn check_shape(
    tensor: &'static str,
    actual: &[usize],
    expected: &[usize],
) -> Result<(), TrainError> {
    if actual == expected {
        return Ok(());
    }
    Err(TrainError::Shape {
        tensor,
        expected: expected.to_vec(),
        actual: actual.to_vec(),
    })
}

#[inline]
pub(crate) fn relu(x: f32) -> f32 {
    x.max(0.0)
}

#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

fn glorot_uniform(fan_in: usize, fan_out: usize, rng: &mut fastrand::Rng) -> Array2<f32> {
    let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
    Array2::from_shape_simple_fn((fan_in, fan_out), || (rng.f32() * 2.0 - 1.0) * limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn tiny() -> TwoTowerModel {
        TwoTowerModel::from_parts(
            array![[1.0, 0.0], [0.0, 1.0], [0.5, -1.0]],
            array![0.0, 0.0],
            array![[1.0, 0.0], [0.0, 1.0], [-0.5, 1.0]],
            array![0.0, 0.1],
            2.0,
            -1.0,
        )
        .unwrap()
    }

    #[test]
    fn new_model_has_expected_shapes() {
        let model = TwoTowerModel::new(5, 8, 7);
        assert_eq!(model.input_dim(), 5);
        assert_eq!(model.embedding_dim(), 8);
        assert_eq!(model.parameter_count(), 5 * 8 * 2 + 8 * 2 + 2);
        assert!(model.user_bias().iter().all(|&b| b == 0.0));
        let limit = (6.0f32 / 13.0).sqrt();
        assert!(model.user_kernel().iter().all(|w| w.abs() <= limit));
    }

    #[test]
    fn same_seed_same_init() {
        assert_eq!(TwoTowerModel::new(4, 3, 11), TwoTowerModel::new(4, 3, 11));
        assert_ne!(TwoTowerModel::new(4, 3, 11), TwoTowerModel::new(4, 3, 12));
    }

    #[test]
    fn score_matches_hand_computation() {
        let model = tiny();
        // user [1,0,0] -> [1,0]; dest [1,0,0] -> relu([1,0.1]) = [1,0.1]
        // dot = 1.0, z = 2*1 - 1 = 1
        let s = model.score(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]);
        assert!((s - sigmoid(1.0)).abs() < 1e-6);
    }

    #[test]
    fn relu_clips_negative_preactivations() {
        let model = tiny();
        let emb = model.embed_user(&[0.0, 0.0, 1.0]);
        assert_eq!(emb, array![0.5, 0.0]);
    }

    #[test]
    fn score_is_probability() {
        let model = TwoTowerModel::new(6, 16, 3);
        for bits in 0..64u32 {
            let v: Vec<f32> = (0..6).map(|i| ((bits >> i) & 1) as f32).collect();
            let s = model.score(&v, &v);
            assert!((0.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn score_dimension_mismatch_is_nan() {
        assert!(tiny().score(&[1.0], &[1.0, 0.0, 0.0]).is_nan());
    }

    #[test]
    fn batch_scoring_matches_single() {
        let model = TwoTowerModel::new(3, 4, 9);
        let user = [1.0, 0.0, 1.0];
        let dests = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 1.0], vec![0.0, 0.0, 0.0]];
        let batch = model.score_batch(&user, &dests);
        for (d, b) in dests.iter().zip(&batch) {
            assert!((model.score(&user, d) - b).abs() < 1e-6);
        }
    }

    #[test]
    fn predict_batch_matches_single() {
        let model = TwoTowerModel::new(3, 4, 5);
        let users = array![[1.0, 0.0, 0.0], [0.0, 1.0, 1.0]];
        let dests = array![[0.0, 1.0, 0.0], [0.0, 1.0, 1.0]];
        let probs = model.predict_batch(&users, &dests);
        for r in 0..2 {
            let single = model.score(
                users.row(r).as_slice().unwrap(),
                dests.row(r).as_slice().unwrap(),
            );
            assert!((probs[r] - single).abs() < 1e-6);
        }
    }

    #[test]
    fn from_parts_rejects_mismatched_shapes() {
        let err = TwoTowerModel::from_parts(
            Array2::zeros((3, 2)),
            Array1::zeros(3),
            Array2::zeros((3, 2)),
            Array1::zeros(2),
            1.0,
            0.0,
        );
        assert_eq!(
            err.unwrap_err(),
            TrainError::Shape {
                tensor: "user_bias",
                expected: vec![2],
                actual: vec![3],
            }
        );

        let err = TwoTowerModel::from_parts(
            Array2::zeros((3, 2)),
            Array1::zeros(2),
            Array2::zeros((4, 2)),
            Array1::zeros(2),
            1.0,
            0.0,
        );
        assert!(matches!(
            err,
            Err(TrainError::Shape { tensor: "dest_kernel", .. })
        ));
    }

    #[test]
    fn sigmoid_is_stable_at_extremes() {
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert_eq!(sigmoid(1000.0), 1.0);
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-7);
    }
}

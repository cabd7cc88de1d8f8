//! Per-track constant-velocity trajectory estimator
//!
//! One estimator instance per track. State is `[x, vx, y, vy]`; only the 2-D
//! position is observed, velocity is inferred through the filter. All
//! arithmetic is double precision and unbounded: predicted positions may go
//! negative or leave the frame during occlusion, and it is the caller's job
//! to clamp for drawing purposes.

use nalgebra::{Matrix2, Matrix2x4, Matrix4, Matrix4x2, Vector2, Vector4};

/// Noise parameters for the trajectory estimator
#[derive(Clone, Debug)]
pub struct EstimatorConfig {
    /// Process noise - how much the true state can drift per tick
    pub process_noise: f64,
    /// Measurement noise - detector center-point jitter. Kept small relative
    /// to process noise so observations dominate over blind prediction.
    pub measurement_noise: f64,
    /// Initial state covariance. Large: the estimator has no prior belief
    /// about velocity.
    pub initial_covariance: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            process_noise: 1.0,
            measurement_noise: 0.1,
            initial_covariance: 1000.0,
        }
    }
}

/// Linear Kalman estimator over `[x, vx, y, vy]` with position-only updates
#[derive(Clone, Debug)]
pub struct TrajectoryEstimator {
    /// State vector: [x, vx, y, vy]
    state: Vector4<f64>,
    /// State covariance matrix
    covariance: Matrix4<f64>,
    /// State transition matrix (constant velocity, one tick per frame)
    transition: Matrix4<f64>,
    /// Observation matrix (position only)
    observation: Matrix2x4<f64>,
    /// Process noise covariance
    process_noise: Matrix4<f64>,
    /// Measurement noise covariance
    measurement_noise: Matrix2<f64>,
}

impl TrajectoryEstimator {
    /// Create an estimator seeded at the first observed position with zero
    /// velocity and large uncertainty.
    pub fn new(position: (f64, f64), config: &EstimatorConfig) -> Self {
        let state = Vector4::new(position.0, 0.0, position.1, 0.0);

        // x' = x + vx, y' = y + vy
        #[rustfmt::skip]
        let transition = Matrix4::new(
            1.0, 1.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 1.0,
            0.0, 0.0, 0.0, 1.0,
        );

        // We observe position, not velocity
        #[rustfmt::skip]
        let observation = Matrix2x4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
        );

        Self {
            state,
            covariance: Matrix4::identity() * config.initial_covariance,
            transition,
            observation,
            process_noise: Matrix4::identity() * config.process_noise,
            measurement_noise: Matrix2::identity() * config.measurement_noise,
        }
    }

    /// Advance the state by one frame tick and return the predicted position.
    /// Called exactly once per tick before any [`update`](Self::update).
    pub fn predict(&mut self) -> (f64, f64) {
        // x = F * x
        self.state = self.transition * self.state;
        // P = F * P * F^T + Q
        self.covariance =
            self.transition * self.covariance * self.transition.transpose() + self.process_noise;
        self.position()
    }

    /// Correct the state toward an observed position and return the corrected
    /// position. Safe to call before any `predict`: the first observation is
    /// then blended against the seed state as an identity prediction.
    pub fn update(&mut self, observed: (f64, f64)) -> (f64, f64) {
        let z = Vector2::new(observed.0, observed.1);

        // Residual: y = z - H * x
        let residual = z - self.observation * self.state;

        // Innovation covariance: S = H * P * H^T + R
        let innovation =
            self.observation * self.covariance * self.observation.transpose()
                + self.measurement_noise;

        // S is positive definite for any positive measurement noise; if the
        // inversion still fails the correction is skipped for this tick.
        let Some(innovation_inv) = innovation.try_inverse() else {
            log::warn!("Innovation covariance not invertible, skipping correction");
            return self.position();
        };

        // Kalman gain: K = P * H^T * S^-1
        let gain: Matrix4x2<f64> =
            self.covariance * self.observation.transpose() * innovation_inv;

        // x = x + K * y
        self.state += gain * residual;
        // P = (I - K * H) * P
        self.covariance = (Matrix4::identity() - gain * self.observation) * self.covariance;

        self.position()
    }

    /// Current position estimate
    pub fn position(&self) -> (f64, f64) {
        (self.state[0], self.state[2])
    }

    /// Current velocity estimate (units per frame tick)
    pub fn velocity(&self) -> (f64, f64) {
        (self.state[1], self.state[3])
    }
}

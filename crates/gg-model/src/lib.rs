//! # GreyGoose Model
//!
//! The regressor being tuned: an MLP behind the vehicle preprocessing,
//! k-fold cross-validation, test-set metrics, and the adapter that exposes
//! cross-validated RMSE to the optimizer.

pub mod cv;
pub mod metrics;
pub mod mlp;
pub mod objective;
pub mod pipeline;

pub use cv::*;
pub use metrics::*;
pub use mlp::*;
pub use objective::*;
pub use pipeline::*;

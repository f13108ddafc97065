//! Optimizers and the capability interface the wrapper drives them through

mod adabelief;
mod adamw;
mod optimizer;
mod sgd;

pub use adabelief::{AdaBelief, AdaBeliefConfig};
pub use adamw::AdamW;
pub use optimizer::{OptimError, Optimizer, Result};
pub use sgd::SGD;

//! Prodigio: preset-driven configuration and dispatch for gradient-based
//! optimizers
//!
//! The crate resolves an optimizer id plus a use-case preset label to a
//! working engine: presets come from a [`config::PresetStore`], caller
//! overrides win per key, and the [`registry::OptimizerRegistry`] picks a
//! locally installed enhanced variant over the standard implementation for
//! the same id. The [`OptimizerWrapper`] ties it together and records each
//! construction to a pluggable [`history`] backend.
//!
//! # Example
//!
//! ```
//! use ndarray::arr1;
//! use prodigio::config::PresetStore;
//! use prodigio::registry::OptimizerRegistry;
//! use prodigio::{OptimizerWrapper, Tensor};
//!
//! # fn main() -> Result<(), prodigio::WrapperError> {
//! let registry = OptimizerRegistry::builtin();
//! let store = PresetStore::builtin();
//!
//! let mut optimizer = OptimizerWrapper::builder("AdaBelief")
//!     .preset("consumer")
//!     .lr(0.01)
//!     .build(&registry, &store)?;
//! assert!(optimizer.is_enhanced());
//!
//! let mut params = vec![Tensor::zeros(2)];
//! params[0].set_grad(arr1(&[1.0, 1.0]));
//! optimizer.step(&mut params).expect("dense gradients");
//! optimizer.zero_grad(&mut params);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod history;
pub mod optim;
pub mod registry;
mod tensor;
pub mod wrapper;

pub use tensor::Tensor;
pub use wrapper::{OptimizerWrapper, WrapperBuilder, WrapperError};

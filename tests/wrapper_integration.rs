//! End-to-end tests: preset resolution, two-tier dispatch, and the update
//! rule driven through the public wrapper API.

use ndarray::arr1;
use prodigio::config::{get_f32, PresetStore};
use prodigio::history::{HistoryBackend, InMemoryHistory, JsonFileHistory};
use prodigio::registry::{OptimizerRegistry, RegistryError};
use prodigio::{OptimizerWrapper, Tensor, WrapperError};
use serde_json::json;

fn builtin() -> (OptimizerRegistry, PresetStore) {
    (OptimizerRegistry::builtin(), PresetStore::builtin())
}

#[test]
fn two_parameter_linear_model_single_step() {
    // Two parameters initialized at zero, identical gradients of 1.0, the
    // enhanced AdaBelief variant with rectification, AMS-bound and AdaNorm
    // disabled: after one step both values are strictly negative and equal
    // in magnitude.
    let (registry, store) = builtin();
    let mut optimizer = OptimizerWrapper::builder("AdaBelief")
        .preset("consumer")
        .lr(0.01)
        .override_param("rectify", json!(false))
        .override_param("ams_bound", json!(false))
        .override_param("adanorm", json!(false))
        .override_param("weight_decay", json!(0.0))
        .build(&registry, &store)
        .unwrap();
    assert!(optimizer.is_enhanced());

    let mut params = vec![Tensor::zeros(1), Tensor::zeros(1)];
    params[0].set_grad(arr1(&[1.0]));
    params[1].set_grad(arr1(&[1.0]));
    optimizer.step(&mut params).unwrap();

    let a = params[0].data()[0];
    let b = params[1].data()[0];
    assert!(a < 0.0, "first parameter must move against the gradient, got {a}");
    assert!(b < 0.0, "second parameter must move against the gradient, got {b}");
    assert!((a - b).abs() < 1e-9, "identical gradients must give identical updates");
}

#[test]
fn explicit_lr_wins_over_preset_lr() {
    // Preset carries lr 1e-4; the explicit 0.001 must be the one in effect
    // and the one recorded to history.
    let (registry, store) = builtin();
    let history = InMemoryHistory::new();
    let optimizer = OptimizerWrapper::builder("AdaBelief")
        .lr(0.001)
        .history(&history)
        .build(&registry, &store)
        .unwrap();

    assert_eq!(optimizer.lr(), 0.001);

    let entries = history.load("adabelief").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(get_f32(&entries[0].params, "lr", 0.0), 0.001);
}

#[test]
fn standard_tier_resolution_is_not_enhanced() {
    let (registry, store) = builtin();
    for id in ["AdamW", "SGD"] {
        let optimizer =
            OptimizerWrapper::builder(id).build(&registry, &store).unwrap();
        assert!(!optimizer.is_enhanced(), "{id} has no enhanced variant");
    }
}

#[test]
fn unknown_optimizer_reports_not_found() {
    let registry = OptimizerRegistry::builtin();
    let err = registry.resolve_implementation("totallyUnknownOptimizer").unwrap_err();
    assert!(matches!(err, RegistryError::OptimizerNotFound(_)));
}

#[test]
fn reserved_enhanced_name_surfaces_through_wrapper() {
    let (mut registry, store) = builtin();
    registry.reserve_enhanced("sgd_plus", "vetting incomplete");

    let err = OptimizerWrapper::builder("SGD").build(&registry, &store).unwrap_err();
    assert!(matches!(
        err,
        WrapperError::Registry(RegistryError::InvalidOptimizerDefinition { .. })
    ));
}

#[test]
fn sparse_gradient_fails_without_partial_updates() {
    let (registry, store) = builtin();
    let mut optimizer = OptimizerWrapper::builder("AdaBelief")
        .lr(0.01)
        .override_param("weight_decay", json!(0.0))
        .build(&registry, &store)
        .unwrap();

    let mut params = vec![Tensor::from_vec(vec![1.0]), Tensor::from_vec(vec![1.0])];
    params[0].set_grad(arr1(&[1.0]));
    params[1].set_sparse_grad(arr1(&[1.0]));

    assert!(optimizer.step(&mut params).is_err());
    // Fail-fast policy: the dense parameter processed "before" the sparse
    // one is left untouched.
    assert_eq!(params[0].data()[0], 1.0);
    assert_eq!(params[1].data()[0], 1.0);
}

#[test]
fn training_loop_converges_through_wrapper() {
    // Linear regression y = w*x on a fixed point (x=1, y=2): the wrapper's
    // closure-driven step should walk w from 0 toward 2.
    let (registry, store) = builtin();
    let mut optimizer = OptimizerWrapper::builder("AdaBelief")
        .preset("low_memory")
        .lr(0.02)
        .override_param("weight_decay", json!(0.0))
        .build(&registry, &store)
        .unwrap();

    let mut params = vec![Tensor::zeros(1)];
    let mut last_loss = f32::INFINITY;
    for _ in 0..500 {
        let w = params[0].data()[0];
        let err = w - 2.0;
        params[0].set_grad(arr1(&[2.0 * err]));
        last_loss = optimizer.step_with(&mut params, || err * err).unwrap();
        optimizer.zero_grad(&mut params);
    }

    assert!(last_loss < 0.01, "loss did not fall: {last_loss}");
    assert!((params[0].data()[0] - 2.0).abs() < 0.1);
}

#[test]
fn history_round_trips_through_json_files() {
    let dir = tempfile::TempDir::new().unwrap();
    let backend = JsonFileHistory::new(dir.path()).unwrap();
    let (registry, store) = builtin();

    for _ in 0..2 {
        let _ = OptimizerWrapper::builder("AdamW")
            .lr(0.001)
            .history(&backend)
            .build(&registry, &store)
            .unwrap();
    }

    let entries = backend.load("adamw").unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.preset_label == "consumer"));
}

#![warn(missing_debug_implementations)]
#![allow(clippy::new_without_default)]
#![allow(clippy::too_many_arguments)]

//! Microbenchmarks for individual cuDNN/cuBLAS layer primitives.
//!
//! Each benchmark *case* binds one operation (GEMM, activation backward,
//! batchnorm forward, convolution backward-data/bias, dropout forward,
//! pooling backward, tensor scale) to one element kind, one algorithm variant
//! and one problem shape, runs it through a timed iteration loop and reports
//! derived counters: shape parameters, workspace size, predicted FLOPs,
//! achieved vs. library-advised algorithm, items per second.
//!
//! The vendor math library is reached through the [Device](device::Device)
//! trait. The real backend lives in [cuda] behind the `cuda` cargo feature;
//! [TrackingDevice](device::tracking::TrackingDevice) is an in-memory
//! stand-in that records every allocation and launch, used by the test suite
//! and by `layerbench --dry-run`.

/// The [ElementKind](dtype::ElementKind) enum.
pub mod dtype;
/// Problem-shape tuples and the convolution output-size formula.
pub mod shape;
/// Predicted arithmetic-operation counts per algorithm variant.
pub mod flops;
/// Named numeric counters published per case.
pub mod metrics;

/// The vendor capability boundary and resource wrappers.
pub mod device;

/// The case runner: availability guard, measured loop, outcome mapping.
pub mod runner;
/// One adapter module per benchmarked operation.
pub mod cases;
/// Report sinks consuming finished cases.
pub mod report;

/// The cuDNN/cuBLAS backend.
#[cfg(feature = "cuda")]
pub mod cuda;

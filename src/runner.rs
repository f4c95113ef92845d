use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use tracing::{debug, warn};

use crate::device::{Device, DeviceError, OpCall};
use crate::metrics::MetricSet;
use crate::shape::ArgError;

/// Process-wide benchmark context, constructed once at startup and passed by
/// reference into every case. Owning the device here (instead of a global
/// handle) keeps device detection explicit and lets tests substitute a
/// double.
pub struct BenchContext {
    device: Option<Box<dyn Device>>,
}

impl BenchContext {
    pub fn new(device: Option<Box<dyn Device>>) -> Self {
        BenchContext { device }
    }

    /// Probe for a capable compute device. With the `cuda` feature this
    /// attempts to bring up device 0; otherwise there is never a device and
    /// every case reports a skip.
    pub fn detect() -> Self {
        #[cfg(feature = "cuda")]
        {
            match crate::cuda::CudaApi::new(0) {
                Ok(api) => {
                    tracing::info!(device = %api.name(), "compute device detected");
                    return BenchContext::new(Some(Box::new(api)));
                }
                Err(e) => warn!("no usable compute device: {}", e),
            }
        }
        BenchContext::new(None)
    }

    pub fn device(&self) -> Option<&dyn Device> {
        self.device.as_deref()
    }
}

impl std::fmt::Debug for BenchContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchContext")
            .field("device", &self.device.as_ref().map(|d| d.name()))
            .finish()
    }
}

/// How iteration durations are obtained.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Timing {
    /// Device-side event pair around the call, synchronized per iteration.
    DeviceEvents,
    /// Host wall clock around the call plus an explicit synchronize.
    Host,
}

/// Choices owned by the surrounding harness, not by the case.
#[derive(Debug, Copy, Clone)]
pub struct RunOptions {
    pub iterations: u64,
    pub timing: Timing,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            iterations: 10,
            timing: Timing::DeviceEvents,
        }
    }
}

/// A failure local to one case. Nothing of this type ever propagates past
/// [run_case]; it is folded into the case's [Outcome].
#[derive(Debug, Clone, PartialEq)]
pub enum CaseError {
    InvalidArgs(ArgError),
    Setup { step: &'static str, source: DeviceError },
    Operation { iteration: u64, source: DeviceError },
}

impl Display for CaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseError::InvalidArgs(e) => write!(f, "invalid arguments: {}", e),
            CaseError::Setup { step, source } => write!(f, "setup step {} failed: {}", step, source),
            CaseError::Operation { iteration, source } => {
                write!(f, "operation failed at iteration {}: {}", iteration, source)
            }
        }
    }
}

impl Error for CaseError {}

impl From<ArgError> for CaseError {
    fn from(e: ArgError) -> Self {
        CaseError::InvalidArgs(e)
    }
}

pub type CaseResult<T> = Result<T, CaseError>;

/// Attach the failing setup step to a device error.
pub trait SetupStep {
    type T;
    fn step(self, step: &'static str) -> CaseResult<Self::T>;
}

impl<T> SetupStep for Result<T, DeviceError> {
    type T = T;
    fn step(self, step: &'static str) -> CaseResult<T> {
        self.map_err(|source| CaseError::Setup { step, source })
    }
}

/// Per-case mutable state handed to the operation adapters: the device, the
/// harness options, the counter set and the collected iteration durations.
pub struct CaseState<'a> {
    device: &'a dyn Device,
    options: RunOptions,
    metrics: MetricSet,
    items_per_iteration: u64,
    samples_ms: Vec<f32>,
}

impl std::fmt::Debug for CaseState<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaseState")
            .field("options", &self.options)
            .field("metrics", &self.metrics)
            .field("items_per_iteration", &self.items_per_iteration)
            .field("samples_ms", &self.samples_ms)
            .finish()
    }
}

impl<'a> CaseState<'a> {
    fn new(device: &'a dyn Device, options: RunOptions) -> Self {
        CaseState {
            device,
            options,
            metrics: MetricSet::new(),
            items_per_iteration: 0,
            samples_ms: Vec::with_capacity(options.iterations as usize),
        }
    }

    pub fn device(&self) -> &'a dyn Device {
        self.device
    }

    pub fn iterations(&self) -> u64 {
        self.options.iterations
    }

    pub fn counter(&mut self, name: &'static str, value: f64) {
        self.metrics.insert(name, value);
    }

    /// Logical elements this case touches per iteration, the basis of the
    /// items-per-second metric.
    pub fn set_items_per_iteration(&mut self, items: u64) {
        self.items_per_iteration = items;
    }

    /// The measured region: run the prepared call once per harness-chosen
    /// iteration and record each duration. A non-success status aborts the
    /// remaining iterations; one failed iteration fails the whole case.
    pub fn measure(&mut self, call: &OpCall) -> CaseResult<()> {
        let fail = |iteration, source| CaseError::Operation { iteration, source };

        for iteration in 0..self.options.iterations {
            let elapsed_ms = match self.options.timing {
                Timing::DeviceEvents => {
                    self.device.begin_sample().map_err(|e| fail(iteration, e))?;
                    self.device.launch(call).map_err(|e| fail(iteration, e))?;
                    self.device.end_sample().map_err(|e| fail(iteration, e))?
                }
                Timing::Host => {
                    let start = Instant::now();
                    self.device.launch(call).map_err(|e| fail(iteration, e))?;
                    self.device.synchronize().map_err(|e| fail(iteration, e))?;
                    start.elapsed().as_secs_f32() * 1e3
                }
            };
            self.samples_ms.push(elapsed_ms);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Pass,
    Skip(String),
    Fail(String),
}

impl Outcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Pass)
    }
}

/// Everything a finished case publishes to the reporting sink.
#[derive(Debug, Clone)]
pub struct CaseReport {
    pub name: String,
    pub outcome: Outcome,
    pub iterations: u64,
    pub items_processed: u64,
    pub total_seconds: f64,
    pub metrics: MetricSet,
}

impl CaseReport {
    fn empty(name: &str, outcome: Outcome) -> Self {
        CaseReport {
            name: name.to_owned(),
            outcome,
            iterations: 0,
            items_processed: 0,
            total_seconds: 0.0,
            metrics: MetricSet::new(),
        }
    }
}

/// Run one case body inside the case boundary.
///
/// The boundary owns the availability guard, converts every [CaseError] and
/// every panic escaping the body into a failed outcome, and derives the
/// timing metrics on success. No fault crosses from a case into the driver.
pub fn run_case(
    ctx: &BenchContext,
    name: &str,
    options: RunOptions,
    body: impl FnOnce(&mut CaseState) -> CaseResult<()>,
) -> CaseReport {
    let Some(device) = ctx.device() else {
        debug!(case = name, "skipped, no compute device found");
        return CaseReport::empty(name, Outcome::Skip("no compute device found".to_owned()));
    };

    let result = catch_unwind(AssertUnwindSafe(|| {
        let mut state = CaseState::new(device, options);
        body(&mut state).map(|()| state)
    }));

    let state = match result {
        Ok(Ok(state)) => state,
        Ok(Err(e)) => {
            warn!(case = name, "failed: {}", e);
            return CaseReport::empty(name, Outcome::Fail(e.to_string()));
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(case = name, "panicked: {}", message);
            return CaseReport::empty(name, Outcome::Fail(format!("panic: {}", message)));
        }
    };

    let mut metrics = state.metrics;
    let total_seconds = state.samples_ms.iter().map(|&ms| ms as f64 / 1e3).sum::<f64>();
    let items_processed = options.iterations * state.items_per_iteration;

    if total_seconds > 0.0 {
        metrics.insert("items_per_second", items_processed as f64 / total_seconds);
        match metrics.get("predicted_flops_count") {
            Some(count) if count >= 0.0 => {
                metrics.insert(
                    "predicted_flops_per_second",
                    count * options.iterations as f64 / total_seconds,
                );
            }
            _ => {}
        }
    }

    debug!(case = name, items = items_processed, seconds = total_seconds, "pass");
    CaseReport {
        name: name.to_owned(),
        outcome: Outcome::Pass,
        iterations: options.iterations,
        items_processed,
        total_seconds,
        metrics,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(&message) = payload.downcast_ref::<&'static str>() {
        message.to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

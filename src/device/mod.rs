use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use crate::dtype::ElementKind;

pub mod scoped;
pub mod tracking;

/// Opaque handle to one device allocation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferId(pub u64);

/// Opaque handle to one vendor descriptor (tensor, filter, convolution,
/// activation, pooling or dropout configuration).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DescriptorId(pub u64);

/// A failed vendor call: the entry point and its status translated to text.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeviceError {
    pub call: &'static str,
    pub message: String,
}

impl DeviceError {
    pub fn new(call: &'static str, message: impl Into<String>) -> Self {
        DeviceError {
            call,
            message: message.into(),
        }
    }
}

impl Display for DeviceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.call, self.message)
    }
}

impl Error for DeviceError {}

pub type DeviceResult<T> = Result<T, DeviceError>;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MathMode {
    Default,
    TensorOp,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ActivationMode {
    Sigmoid,
    Relu,
    Tanh,
    ClippedRelu,
    Elu,
    Identity,
}

impl ActivationMode {
    pub const ALL: [ActivationMode; 6] = [
        ActivationMode::Sigmoid,
        ActivationMode::Relu,
        ActivationMode::Tanh,
        ActivationMode::ClippedRelu,
        ActivationMode::Elu,
        ActivationMode::Identity,
    ];

    /// The vendor enum value, used for reporting.
    pub fn index(self) -> i64 {
        match self {
            ActivationMode::Sigmoid => 0,
            ActivationMode::Relu => 1,
            ActivationMode::Tanh => 2,
            ActivationMode::ClippedRelu => 3,
            ActivationMode::Elu => 4,
            ActivationMode::Identity => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ActivationMode::Sigmoid => "sigmoid",
            ActivationMode::Relu => "relu",
            ActivationMode::Tanh => "tanh",
            ActivationMode::ClippedRelu => "clipped_relu",
            ActivationMode::Elu => "elu",
            ActivationMode::Identity => "identity",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PoolingMode {
    Max,
    AverageIncludePadding,
    AverageExcludePadding,
    MaxDeterministic,
}

impl PoolingMode {
    pub const ALL: [PoolingMode; 4] = [
        PoolingMode::Max,
        PoolingMode::AverageIncludePadding,
        PoolingMode::AverageExcludePadding,
        PoolingMode::MaxDeterministic,
    ];

    /// The vendor enum value, used for reporting.
    pub fn index(self) -> i64 {
        match self {
            PoolingMode::Max => 0,
            PoolingMode::AverageIncludePadding => 1,
            PoolingMode::AverageExcludePadding => 2,
            PoolingMode::MaxDeterministic => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PoolingMode::Max => "max",
            PoolingMode::AverageIncludePadding => "avg_include_pad",
            PoolingMode::AverageExcludePadding => "avg_exclude_pad",
            PoolingMode::MaxDeterministic => "max_deterministic",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BatchNormMode {
    PerActivation,
    Spatial,
    SpatialPersistent,
}

impl BatchNormMode {
    pub const ALL: [BatchNormMode; 3] = [
        BatchNormMode::PerActivation,
        BatchNormMode::Spatial,
        BatchNormMode::SpatialPersistent,
    ];

    /// The vendor enum value, used for reporting.
    pub fn index(self) -> i64 {
        match self {
            BatchNormMode::PerActivation => 0,
            BatchNormMode::Spatial => 1,
            BatchNormMode::SpatialPersistent => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BatchNormMode::PerActivation => "per_activation",
            BatchNormMode::Spatial => "spatial",
            BatchNormMode::SpatialPersistent => "spatial_persistent",
        }
    }
}

/// Convolution backward-data algorithm variants, mirroring the vendor enum.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ConvBwdDataAlgo {
    Algo0,
    Algo1,
    Fft,
    FftTiling,
    Winograd,
    WinogradNonfused,
}

impl ConvBwdDataAlgo {
    pub const ALL: [ConvBwdDataAlgo; 6] = [
        ConvBwdDataAlgo::Algo0,
        ConvBwdDataAlgo::Algo1,
        ConvBwdDataAlgo::Fft,
        ConvBwdDataAlgo::FftTiling,
        ConvBwdDataAlgo::Winograd,
        ConvBwdDataAlgo::WinogradNonfused,
    ];

    /// The vendor enum value, used for reporting.
    pub fn index(self) -> i64 {
        match self {
            ConvBwdDataAlgo::Algo0 => 0,
            ConvBwdDataAlgo::Algo1 => 1,
            ConvBwdDataAlgo::Fft => 2,
            ConvBwdDataAlgo::FftTiling => 3,
            ConvBwdDataAlgo::Winograd => 4,
            ConvBwdDataAlgo::WinogradNonfused => 5,
        }
    }

    pub fn from_index(index: i64) -> Option<ConvBwdDataAlgo> {
        ConvBwdDataAlgo::ALL.into_iter().find(|algo| algo.index() == index)
    }

    pub fn name(self) -> &'static str {
        match self {
            ConvBwdDataAlgo::Algo0 => "algo0",
            ConvBwdDataAlgo::Algo1 => "algo1",
            ConvBwdDataAlgo::Fft => "fft",
            ConvBwdDataAlgo::FftTiling => "fft_tiling",
            ConvBwdDataAlgo::Winograd => "winograd",
            ConvBwdDataAlgo::WinogradNonfused => "winograd_nonfused",
        }
    }
}

/// Parameters of a convolution descriptor. Constructed once per case and
/// never mutated afterwards; the math mode is part of the construction even
/// though the vendor API sets it through a separate in-place update.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ConvSettings {
    pub pad_height: i32,
    pub pad_width: i32,
    pub stride_height: i32,
    pub stride_width: i32,
    pub dilation_height: i32,
    pub dilation_width: i32,
    pub group_count: i32,
    pub math: MathMode,
}

/// One entry of the library's find-algorithm measurement.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConvBwdDataPerf {
    pub algo: ConvBwdDataAlgo,
    pub time_ms: f32,
    pub memory_bytes: usize,
    pub deterministic: bool,
}

/// The single vendor call a case launches per measured iteration.
///
/// `alpha` and `beta` are the coefficients of the vendor accumulation
/// contract `output = alpha * op(inputs) + beta * output`.
#[derive(Debug, Clone, PartialEq)]
pub enum OpCall {
    Gemm {
        kind: ElementKind,
        math: MathMode,
        m: i32,
        n: i32,
        k: i32,
        trans_a: bool,
        trans_b: bool,
        alpha: f32,
        beta: f32,
        lda: i32,
        ldb: i32,
        a: BufferId,
        b: BufferId,
        c: BufferId,
    },
    ActivationBackward {
        activation: DescriptorId,
        alpha: f32,
        beta: f32,
        data: DescriptorId,
        y: BufferId,
        dy: BufferId,
        x: BufferId,
        dx: BufferId,
    },
    BatchNormForward {
        mode: BatchNormMode,
        training: bool,
        alpha: f32,
        beta: f32,
        data: DescriptorId,
        param: DescriptorId,
        x: BufferId,
        y: BufferId,
        scale: BufferId,
        bias: BufferId,
        mean: BufferId,
        variance: BufferId,
        saved_mean: Option<BufferId>,
        saved_variance: Option<BufferId>,
        average_factor: f64,
        epsilon: f64,
    },
    ConvBackwardBias {
        alpha: f32,
        beta: f32,
        diff: DescriptorId,
        dy: BufferId,
        bias: DescriptorId,
        db: BufferId,
    },
    ConvBackwardData {
        alpha: f32,
        beta: f32,
        algo: ConvBwdDataAlgo,
        conv: DescriptorId,
        filter: DescriptorId,
        w: BufferId,
        diff: DescriptorId,
        dy: BufferId,
        grad: DescriptorId,
        dx: BufferId,
        workspace: BufferId,
        workspace_bytes: usize,
    },
    DropoutForward {
        dropout: DescriptorId,
        data: DescriptorId,
        x: BufferId,
        y: BufferId,
        reserve: BufferId,
        reserve_bytes: usize,
    },
    PoolingBackward {
        pooling: DescriptorId,
        alpha: f32,
        beta: f32,
        output: DescriptorId,
        y: BufferId,
        dy: BufferId,
        input: DescriptorId,
        x: BufferId,
        dx: BufferId,
    },
    ScaleTensor {
        data: DescriptorId,
        buffer: BufferId,
        alpha: f32,
    },
}

impl OpCall {
    pub fn name(&self) -> &'static str {
        match self {
            OpCall::Gemm { .. } => "gemm",
            OpCall::ActivationBackward { .. } => "activation_backward",
            OpCall::BatchNormForward { .. } => "batchnorm_forward",
            OpCall::ConvBackwardBias { .. } => "conv_backward_bias",
            OpCall::ConvBackwardData { .. } => "conv_backward_data",
            OpCall::DropoutForward { .. } => "dropout_forward",
            OpCall::PoolingBackward { .. } => "pooling_backward",
            OpCall::ScaleTensor { .. } => "scale_tensor",
        }
    }
}

/// The vendor math library, reduced to the calls the benchmark cases need.
///
/// Implementations: the real cuDNN/cuBLAS backend (`cuda` feature) and the
/// in-memory [tracking::TrackingDevice]. Cases never talk to the vendor API
/// directly; everything goes through this trait so a case owns its resources
/// through [scoped](scoped) wrappers and tests can account for every
/// acquisition.
pub trait Device {
    fn name(&self) -> String;

    // memory
    fn alloc(&self, len_bytes: usize) -> DeviceResult<BufferId>;
    fn free(&self, buffer: BufferId);
    fn upload(&self, buffer: BufferId, data: &[u8]) -> DeviceResult<()>;

    // descriptor construction
    fn create_tensor(&self, kind: ElementKind, dims: [i32; 4]) -> DeviceResult<DescriptorId>;
    fn create_filter(&self, kind: ElementKind, dims: [i32; 4]) -> DeviceResult<DescriptorId>;
    fn create_conv(&self, kind: ElementKind, settings: &ConvSettings) -> DeviceResult<DescriptorId>;
    fn create_activation(&self, mode: ActivationMode, coef: f64) -> DeviceResult<DescriptorId>;
    fn create_pooling(
        &self,
        mode: PoolingMode,
        window: [i32; 2],
        padding: [i32; 2],
        stride: [i32; 2],
    ) -> DeviceResult<DescriptorId>;
    fn create_dropout(
        &self,
        rate: f32,
        seed: u64,
        states: BufferId,
        states_bytes: usize,
    ) -> DeviceResult<DescriptorId>;
    fn destroy(&self, descriptor: DescriptorId);

    // shape inference and size queries, authoritative over host-side formulas
    fn conv_output_dims(
        &self,
        conv: DescriptorId,
        input: DescriptorId,
        filter: DescriptorId,
    ) -> DeviceResult<[i32; 4]>;
    fn pooling_output_dims(&self, pooling: DescriptorId, input: DescriptorId) -> DeviceResult<[i32; 4]>;
    fn batchnorm_param_dims(&self, input: DescriptorId, mode: BatchNormMode) -> DeviceResult<[i32; 4]>;
    fn dropout_states_bytes(&self) -> DeviceResult<usize>;
    fn dropout_reserve_bytes(&self, input: DescriptorId) -> DeviceResult<usize>;
    fn conv_bwd_data_workspace_bytes(
        &self,
        algo: ConvBwdDataAlgo,
        conv: DescriptorId,
        filter: DescriptorId,
        diff: DescriptorId,
        grad: DescriptorId,
    ) -> DeviceResult<usize>;

    // algorithm heuristics, queried for reporting only
    fn advise_conv_bwd_data_algo(
        &self,
        conv: DescriptorId,
        filter: DescriptorId,
        diff: DescriptorId,
        grad: DescriptorId,
    ) -> DeviceResult<Option<ConvBwdDataAlgo>>;
    fn find_conv_bwd_data_algos(
        &self,
        conv: DescriptorId,
        filter: DescriptorId,
        diff: DescriptorId,
        grad: DescriptorId,
    ) -> DeviceResult<Vec<ConvBwdDataPerf>>;

    // execution and timing
    fn launch(&self, call: &OpCall) -> DeviceResult<()>;
    fn synchronize(&self) -> DeviceResult<()>;
    /// Record the device-side start timestamp of one measured iteration.
    fn begin_sample(&self) -> DeviceResult<()>;
    /// Record the stop timestamp, synchronize, and return the elapsed
    /// milliseconds since [begin_sample](Device::begin_sample).
    fn end_sample(&self) -> DeviceResult<f32>;
}

/// Shared ownership of a device, so a caller can keep a handle for
/// inspection after handing the device to a context.
impl<D: Device + ?Sized> Device for Rc<D> {
    fn name(&self) -> String {
        (**self).name()
    }

    fn alloc(&self, len_bytes: usize) -> DeviceResult<BufferId> {
        (**self).alloc(len_bytes)
    }

    fn free(&self, buffer: BufferId) {
        (**self).free(buffer)
    }

    fn upload(&self, buffer: BufferId, data: &[u8]) -> DeviceResult<()> {
        (**self).upload(buffer, data)
    }

    fn create_tensor(&self, kind: ElementKind, dims: [i32; 4]) -> DeviceResult<DescriptorId> {
        (**self).create_tensor(kind, dims)
    }

    fn create_filter(&self, kind: ElementKind, dims: [i32; 4]) -> DeviceResult<DescriptorId> {
        (**self).create_filter(kind, dims)
    }

    fn create_conv(&self, kind: ElementKind, settings: &ConvSettings) -> DeviceResult<DescriptorId> {
        (**self).create_conv(kind, settings)
    }

    fn create_activation(&self, mode: ActivationMode, coef: f64) -> DeviceResult<DescriptorId> {
        (**self).create_activation(mode, coef)
    }

    fn create_pooling(
        &self,
        mode: PoolingMode,
        window: [i32; 2],
        padding: [i32; 2],
        stride: [i32; 2],
    ) -> DeviceResult<DescriptorId> {
        (**self).create_pooling(mode, window, padding, stride)
    }

    fn create_dropout(
        &self,
        rate: f32,
        seed: u64,
        states: BufferId,
        states_bytes: usize,
    ) -> DeviceResult<DescriptorId> {
        (**self).create_dropout(rate, seed, states, states_bytes)
    }

    fn destroy(&self, descriptor: DescriptorId) {
        (**self).destroy(descriptor)
    }

    fn conv_output_dims(
        &self,
        conv: DescriptorId,
        input: DescriptorId,
        filter: DescriptorId,
    ) -> DeviceResult<[i32; 4]> {
        (**self).conv_output_dims(conv, input, filter)
    }

    fn pooling_output_dims(&self, pooling: DescriptorId, input: DescriptorId) -> DeviceResult<[i32; 4]> {
        (**self).pooling_output_dims(pooling, input)
    }

    fn batchnorm_param_dims(&self, input: DescriptorId, mode: BatchNormMode) -> DeviceResult<[i32; 4]> {
        (**self).batchnorm_param_dims(input, mode)
    }

    fn dropout_states_bytes(&self) -> DeviceResult<usize> {
        (**self).dropout_states_bytes()
    }

    fn dropout_reserve_bytes(&self, input: DescriptorId) -> DeviceResult<usize> {
        (**self).dropout_reserve_bytes(input)
    }

    fn conv_bwd_data_workspace_bytes(
        &self,
        algo: ConvBwdDataAlgo,
        conv: DescriptorId,
        filter: DescriptorId,
        diff: DescriptorId,
        grad: DescriptorId,
    ) -> DeviceResult<usize> {
        (**self).conv_bwd_data_workspace_bytes(algo, conv, filter, diff, grad)
    }

    fn advise_conv_bwd_data_algo(
        &self,
        conv: DescriptorId,
        filter: DescriptorId,
        diff: DescriptorId,
        grad: DescriptorId,
    ) -> DeviceResult<Option<ConvBwdDataAlgo>> {
        (**self).advise_conv_bwd_data_algo(conv, filter, diff, grad)
    }

    fn find_conv_bwd_data_algos(
        &self,
        conv: DescriptorId,
        filter: DescriptorId,
        diff: DescriptorId,
        grad: DescriptorId,
    ) -> DeviceResult<Vec<ConvBwdDataPerf>> {
        (**self).find_conv_bwd_data_algos(conv, filter, diff, grad)
    }

    fn launch(&self, call: &OpCall) -> DeviceResult<()> {
        (**self).launch(call)
    }

    fn synchronize(&self) -> DeviceResult<()> {
        (**self).synchronize()
    }

    fn begin_sample(&self) -> DeviceResult<()> {
        (**self).begin_sample()
    }

    fn end_sample(&self) -> DeviceResult<f32> {
        (**self).end_sample()
    }
}

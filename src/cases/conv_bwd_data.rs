//! Convolution backward-data: scatter the output gradient `dy` back through
//! the filter into the input gradient `dx`, for one fixed algorithm variant.
//!
//! Besides the measured call this case interrogates the library twice for
//! reporting only: the heuristic's advised algorithm, and the find-algorithm
//! measurements for the variant under test.

use crate::cases::{ones_buffer, record_input_dims, record_output_dims, zeros_buffer, NCHW_LAYOUT};
use crate::device::scoped::{ScopedBuffer, ScopedDescriptor};
use crate::device::{ConvBwdDataAlgo, ConvSettings, MathMode, OpCall};
use crate::dtype::ElementKind;
use crate::flops;
use crate::runner::{CaseResult, CaseState, SetupStep};
use crate::shape::ConvShape;

/// Used when the workspace-size query fails. 1 GiB is enough for every
/// problem in the suite.
const WORKSPACE_FALLBACK_BYTES: usize = 1 << 30;

pub(crate) fn run(
    state: &mut CaseState,
    element: ElementKind,
    algo: ConvBwdDataAlgo,
    args: &[i64],
) -> CaseResult<()> {
    let shape = ConvShape::from_args(args)?;
    let exec = element.execution_kind();
    let math = match exec {
        ElementKind::F16 => MathMode::TensorOp,
        _ => MathMode::Default,
    };

    let device = state.device();
    let grad = ScopedDescriptor::tensor(device, exec, shape.input_shape().dims())
        .step("create dx descriptor")?;
    let filter =
        ScopedDescriptor::filter(device, exec, shape.filter_dims()).step("create filter descriptor")?;
    let settings = ConvSettings {
        pad_height: shape.pad_height as i32,
        pad_width: shape.pad_width as i32,
        stride_height: shape.stride_height as i32,
        stride_width: shape.stride_width as i32,
        dilation_height: shape.dilation_height as i32,
        dilation_width: shape.dilation_width as i32,
        group_count: shape.group as i32,
        math,
    };
    let conv =
        ScopedDescriptor::conv(device, exec, &settings).step("create convolution descriptor")?;

    // the gradient flowing in has the forward output extent, as the library
    // infers it
    let output_dims = device
        .conv_output_dims(conv.id(), grad.id(), filter.id())
        .step("infer output dims")?;
    let diff = ScopedDescriptor::tensor(device, exec, output_dims).step("create dy descriptor")?;

    let workspace_bytes = device
        .conv_bwd_data_workspace_bytes(algo, conv.id(), filter.id(), diff.id(), grad.id())
        .unwrap_or(WORKSPACE_FALLBACK_BYTES);
    let advised = device
        .advise_conv_bwd_data_algo(conv.id(), filter.id(), diff.id(), grad.id())
        .unwrap_or(None);

    record_input_dims(state, shape.input_shape().dims());
    state.counter("num_filters", shape.num_filters as f64);
    state.counter("filter_height", shape.filter_height as f64);
    state.counter("filter_width", shape.filter_width as f64);
    state.counter("pad_height", shape.pad_height as f64);
    state.counter("pad_width", shape.pad_width as f64);
    state.counter("stride_height", shape.stride_height as f64);
    state.counter("stride_width", shape.stride_width as f64);
    state.counter("dilation_height", shape.dilation_height as f64);
    state.counter("dilation_width", shape.dilation_width as f64);
    record_output_dims(state, output_dims);
    state.counter("workspace_bytes", workspace_bytes as f64);
    state.counter("workspace_megabytes", workspace_bytes as f64 / 1048576.0);
    state.counter("convolution_algorithm", algo.index() as f64);
    state.counter(
        "advised_convolution_algorithm",
        advised.map_or(-1.0, |a| a.index() as f64),
    );
    state.counter("x_tensor_layout", NCHW_LAYOUT);
    state.counter("y_tensor_layout", NCHW_LAYOUT);
    state.counter("w_filter_layout", NCHW_LAYOUT);
    state.counter("math_type", (math == MathMode::TensorOp) as i64 as f64);

    state.counter(
        "predicted_flops_count",
        flops::conv_backward_data(algo, &shape, output_dims),
    );
    if let Some(advised) = advised {
        state.counter(
            "predicted_advised_flops_count",
            flops::conv_backward_data(advised, &shape, output_dims),
        );
    }

    // find-algorithm measurements for the variant under test; missing entries
    // leave the counters absent
    let perfs = device
        .find_conv_bwd_data_algos(conv.id(), filter.id(), diff.id(), grad.id())
        .step("find convolution algorithms")?;
    if let Some(perf) = perfs.iter().find(|perf| perf.algo == algo) {
        state.counter("advised_time", perf.time_ms as f64);
        state.counter("advised_memory", perf.memory_bytes as f64);
        state.counter("advised_determinism", perf.deterministic as i64 as f64);
    }

    let items = shape.batch_size * shape.num_filters * shape.channels * shape.height * shape.width;
    state.set_items_per_iteration(items as u64);

    let filter_elements = (shape.num_filters * shape.channels * shape.filter_height * shape.filter_width) as usize;
    let output_elements = output_dims.iter().map(|&d| d as usize).product::<usize>();
    let w = ones_buffer(device, exec, filter_elements).step("allocate filter")?;
    let dy = ones_buffer(device, exec, output_elements).step("allocate dy")?;
    let dx = zeros_buffer(device, exec, shape.input_shape().element_count() as usize)
        .step("allocate dx")?;
    let workspace = ScopedBuffer::alloc(device, workspace_bytes).step("allocate workspace")?;

    state.measure(&OpCall::ConvBackwardData {
        alpha: 1.0,
        beta: 0.0,
        algo,
        conv: conv.id(),
        filter: filter.id(),
        w: w.id(),
        diff: diff.id(),
        dy: dy.id(),
        grad: grad.id(),
        dx: dx.id(),
        workspace: workspace.id(),
        workspace_bytes,
    })
}

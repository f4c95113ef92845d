//! Dense matrix-matrix multiply through the BLAS handle,
//! `C = alpha * op(A) * op(B) + beta * C`.

use crate::cases::{ones_buffer, zeros_buffer};
use crate::device::{MathMode, OpCall};
use crate::dtype::ElementKind;
use crate::flops;
use crate::runner::{CaseResult, CaseState, SetupStep};
use crate::shape::GemmShape;

pub(crate) fn run(state: &mut CaseState, element: ElementKind, args: &[i64]) -> CaseResult<()> {
    let shape = GemmShape::from_args(args)?;
    let exec = element.execution_kind();
    // half precision goes through the extended entry point with tensor ops
    let math = match exec {
        ElementKind::F16 => MathMode::TensorOp,
        _ => MathMode::Default,
    };

    state.counter("M", shape.m as f64);
    state.counter("N", shape.n as f64);
    state.counter("K", shape.k as f64);
    state.counter("alpha", shape.alpha as f64);
    state.counter("beta", shape.beta as f64);
    state.counter("lda", shape.lda() as f64);
    state.counter("ldb", shape.ldb() as f64);
    state.counter("transA", shape.trans_a as i64 as f64);
    state.counter("transB", shape.trans_b as i64 as f64);
    state.counter("predicted_flops_count", flops::gemm(&shape));
    state.set_items_per_iteration((shape.m * shape.n * shape.k) as u64);

    let device = state.device();
    let a = ones_buffer(device, exec, (shape.m * shape.k) as usize).step("allocate matrix a")?;
    let b = ones_buffer(device, exec, (shape.k * shape.n) as usize).step("allocate matrix b")?;
    let c = zeros_buffer(device, exec, (shape.m * shape.n) as usize).step("allocate matrix c")?;

    state.measure(&OpCall::Gemm {
        kind: exec,
        math,
        m: shape.m as i32,
        n: shape.n as i32,
        k: shape.k as i32,
        trans_a: shape.trans_a,
        trans_b: shape.trans_b,
        alpha: shape.alpha,
        beta: shape.beta,
        lda: shape.lda() as i32,
        ldb: shape.ldb() as i32,
        a: a.id(),
        b: b.id(),
        c: c.id(),
    })
}

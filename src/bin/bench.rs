use std::io::stdout;
use std::process::ExitCode;

use clap::Parser;
use itertools::iproduct;
use tracing::info;

use layerbench::cases::{CaseConfig, OpKind};
use layerbench::device::tracking::TrackingDevice;
use layerbench::device::{ActivationMode, BatchNormMode, ConvBwdDataAlgo, PoolingMode};
use layerbench::dtype::ElementKind;
use layerbench::report::{JsonSink, ReportSink, TextSink};
use layerbench::runner::{BenchContext, Outcome, RunOptions, Timing};

/// Microbenchmarks for individual cuDNN/cuBLAS layer primitives.
#[derive(Debug, Parser)]
#[command(name = "layerbench")]
struct Args {
    /// Only run cases whose name contains this substring.
    #[arg(long)]
    filter: Option<String>,

    /// Measured iterations per case.
    #[arg(long, default_value_t = 10)]
    iterations: u64,

    /// Time with the host clock instead of device events.
    #[arg(long)]
    host_timing: bool,

    /// Emit one JSON object per case instead of text.
    #[arg(long)]
    json: bool,

    /// Run the whole suite against the in-memory tracking device.
    #[arg(long)]
    dry_run: bool,
}

/// Inference-server style convolution problems:
/// batch, channels, height, width, num_filters, filter_w, filter_h,
/// pad_w, pad_h, stride_w, stride_h, dilation_h, dilation_w, group.
const CONV_PROBLEMS: &[[i64; 14]] = &[
    [1, 3, 224, 224, 64, 7, 7, 3, 3, 2, 2, 1, 1, 1],
    [1, 64, 56, 56, 64, 3, 3, 1, 1, 1, 1, 1, 1, 1],
    [1, 128, 28, 28, 128, 3, 3, 1, 1, 1, 1, 1, 1, 1],
    [1, 256, 14, 14, 256, 3, 3, 1, 1, 1, 1, 1, 1, 1],
    [1, 512, 7, 7, 512, 1, 1, 0, 0, 1, 1, 1, 1, 1],
];

/// m, n, k, trans_a, trans_b, alpha, beta.
const GEMM_PROBLEMS: &[[i64; 7]] = &[
    [128, 128, 128, 0, 0, 1, 0],
    [512, 512, 512, 0, 0, 1, 0],
    [1024, 1024, 1024, 0, 0, 1, 0],
    [512, 2048, 512, 1, 0, 1, 0],
];

/// n, c, h, w; -1 marks an absent spatial extent.
const TENSOR_PROBLEMS: &[[i64; 4]] = &[
    [1, 64, 112, 112],
    [16, 32, 28, 28],
    [32, 1000, -1, -1],
];

/// n, c, h, w, window_h, window_w, pad_v, pad_h, stride_v, stride_h.
const POOLING_PROBLEMS: &[[i64; 10]] = &[
    [1, 64, 112, 112, 3, 3, 1, 1, 2, 2],
    [1, 3, 8, 8, 2, 2, 0, 0, 2, 2],
];

const GEMM_ELEMENTS: &[ElementKind] = &[
    ElementKind::F16,
    ElementKind::F32,
    ElementKind::F64,
    ElementKind::I8,
];

fn suite() -> Vec<CaseConfig> {
    let mut cases = Vec::new();

    for (&element, problem) in iproduct!(GEMM_ELEMENTS, GEMM_PROBLEMS) {
        cases.push(CaseConfig {
            op: OpKind::Gemm,
            element,
            args: problem.to_vec(),
        });
    }

    for (mode, problem) in iproduct!(ActivationMode::ALL, TENSOR_PROBLEMS) {
        cases.push(CaseConfig {
            op: OpKind::ActivationBackward(mode),
            element: ElementKind::F32,
            args: problem.to_vec(),
        });
    }

    for (mode, &training, problem) in iproduct!(BatchNormMode::ALL, &[true, false], TENSOR_PROBLEMS) {
        cases.push(CaseConfig {
            op: OpKind::BatchNormForward { mode, training },
            element: ElementKind::F32,
            args: problem.to_vec(),
        });
    }

    for problem in CONV_PROBLEMS {
        cases.push(CaseConfig {
            op: OpKind::ConvBackwardBias,
            element: ElementKind::F32,
            args: problem.to_vec(),
        });
    }

    for (algo, problem) in iproduct!(ConvBwdDataAlgo::ALL, CONV_PROBLEMS) {
        cases.push(CaseConfig {
            op: OpKind::ConvBackwardData(algo),
            element: ElementKind::F32,
            args: problem.to_vec(),
        });
    }

    for problem in TENSOR_PROBLEMS {
        cases.push(CaseConfig {
            op: OpKind::DropoutForward,
            element: ElementKind::F32,
            args: problem.to_vec(),
        });
    }

    for (mode, problem) in iproduct!(PoolingMode::ALL, POOLING_PROBLEMS) {
        cases.push(CaseConfig {
            op: OpKind::PoolingBackward(mode),
            element: ElementKind::F32,
            args: problem.to_vec(),
        });
    }

    for problem in TENSOR_PROBLEMS {
        let mut args = problem.to_vec();
        args.push(2);
        cases.push(CaseConfig {
            op: OpKind::ScaleTensor,
            element: ElementKind::F32,
            args,
        });
    }

    cases
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let ctx = if args.dry_run {
        BenchContext::new(Some(Box::new(TrackingDevice::new())))
    } else {
        BenchContext::detect()
    };
    let options = RunOptions {
        iterations: args.iterations,
        timing: if args.host_timing {
            Timing::Host
        } else {
            Timing::DeviceEvents
        },
    };

    let mut sink: Box<dyn ReportSink> = if args.json {
        Box::new(JsonSink::new(stdout()))
    } else {
        Box::new(TextSink::new(stdout()))
    };

    let cases: Vec<CaseConfig> = suite()
        .into_iter()
        .filter(|case| {
            args.filter
                .as_deref()
                .map_or(true, |filter| case.name().contains(filter))
        })
        .collect();
    info!(cases = cases.len(), iterations = options.iterations, "starting run");

    let (mut passed, mut skipped, mut failed) = (0u32, 0u32, 0u32);
    for case in &cases {
        let report = case.run(&ctx, options);
        match report.outcome {
            Outcome::Pass => passed += 1,
            Outcome::Skip(_) => skipped += 1,
            Outcome::Fail(_) => failed += 1,
        }
        if let Err(e) = sink.publish(&report) {
            eprintln!("failed to write report: {}", e);
            return ExitCode::FAILURE;
        }
    }

    info!(passed, skipped, failed, "run finished");
    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

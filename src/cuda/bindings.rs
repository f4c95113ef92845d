//! Hand-maintained FFI subset of the cudart, cuDNN and cuBLAS entry points
//! this crate actually calls. Constants carry the vendor header values.

#![allow(non_camel_case_types, non_upper_case_globals, dead_code)]

use std::os::raw::{c_char, c_double, c_float, c_int, c_ulonglong, c_void};

// ---- cudart ----

pub type cudaError_t = c_int;
pub const cudaSuccess: cudaError_t = 0;

pub type cudaMemcpyKind = c_int;
pub const cudaMemcpyHostToDevice: cudaMemcpyKind = 1;
pub const cudaMemcpyDeviceToHost: cudaMemcpyKind = 2;

#[repr(C)]
pub struct CUevent_st {
    _private: [u8; 0],
}
pub type cudaEvent_t = *mut CUevent_st;

#[repr(C)]
pub struct CUstream_st {
    _private: [u8; 0],
}
pub type cudaStream_t = *mut CUstream_st;

#[link(name = "cudart")]
extern "C" {
    pub fn cudaGetDeviceCount(count: *mut c_int) -> cudaError_t;
    pub fn cudaSetDevice(device: c_int) -> cudaError_t;
    pub fn cudaDeviceSynchronize() -> cudaError_t;
    pub fn cudaMalloc(ptr: *mut *mut c_void, size: usize) -> cudaError_t;
    pub fn cudaFree(ptr: *mut c_void) -> cudaError_t;
    pub fn cudaMemcpy(dst: *mut c_void, src: *const c_void, count: usize, kind: cudaMemcpyKind) -> cudaError_t;
    pub fn cudaEventCreate(event: *mut cudaEvent_t) -> cudaError_t;
    pub fn cudaEventDestroy(event: cudaEvent_t) -> cudaError_t;
    pub fn cudaEventRecord(event: cudaEvent_t, stream: cudaStream_t) -> cudaError_t;
    pub fn cudaEventSynchronize(event: cudaEvent_t) -> cudaError_t;
    pub fn cudaEventElapsedTime(ms: *mut c_float, start: cudaEvent_t, end: cudaEvent_t) -> cudaError_t;
    pub fn cudaGetErrorString(error: cudaError_t) -> *const c_char;
}

// ---- cuDNN ----

pub type cudnnStatus_t = c_int;
pub const CUDNN_STATUS_SUCCESS: cudnnStatus_t = 0;

#[repr(C)]
pub struct cudnnContext {
    _private: [u8; 0],
}
pub type cudnnHandle_t = *mut cudnnContext;

macro_rules! opaque_descriptor {
    ($struct_name:ident, $type_name:ident) => {
        #[repr(C)]
        pub struct $struct_name {
            _private: [u8; 0],
        }
        pub type $type_name = *mut $struct_name;
    };
}

opaque_descriptor!(cudnnTensorStruct, cudnnTensorDescriptor_t);
opaque_descriptor!(cudnnFilterStruct, cudnnFilterDescriptor_t);
opaque_descriptor!(cudnnConvolutionStruct, cudnnConvolutionDescriptor_t);
opaque_descriptor!(cudnnActivationStruct, cudnnActivationDescriptor_t);
opaque_descriptor!(cudnnPoolingStruct, cudnnPoolingDescriptor_t);
opaque_descriptor!(cudnnDropoutStruct, cudnnDropoutDescriptor_t);

pub type cudnnDataType_t = c_int;
pub const CUDNN_DATA_FLOAT: cudnnDataType_t = 0;
pub const CUDNN_DATA_DOUBLE: cudnnDataType_t = 1;
pub const CUDNN_DATA_HALF: cudnnDataType_t = 2;
pub const CUDNN_DATA_INT8: cudnnDataType_t = 3;
pub const CUDNN_DATA_INT32: cudnnDataType_t = 4;

pub type cudnnTensorFormat_t = c_int;
pub const CUDNN_TENSOR_NCHW: cudnnTensorFormat_t = 0;

pub type cudnnNanPropagation_t = c_int;
pub const CUDNN_NOT_PROPAGATE_NAN: cudnnNanPropagation_t = 0;
pub const CUDNN_PROPAGATE_NAN: cudnnNanPropagation_t = 1;

pub type cudnnActivationMode_t = c_int;
pub type cudnnPoolingMode_t = c_int;
pub type cudnnBatchNormMode_t = c_int;

pub type cudnnConvolutionMode_t = c_int;
pub const CUDNN_CROSS_CORRELATION: cudnnConvolutionMode_t = 1;

pub type cudnnMathType_t = c_int;
pub const CUDNN_DEFAULT_MATH: cudnnMathType_t = 0;
pub const CUDNN_TENSOR_OP_MATH: cudnnMathType_t = 1;

pub type cudnnConvolutionBwdDataAlgo_t = c_int;
pub type cudnnDeterminism_t = c_int;

#[repr(C)]
pub struct cudnnConvolutionBwdDataAlgoPerf_t {
    pub algo: cudnnConvolutionBwdDataAlgo_t,
    pub status: cudnnStatus_t,
    pub time: c_float,
    pub memory: usize,
    pub determinism: cudnnDeterminism_t,
    pub mathType: cudnnMathType_t,
    pub reserved: [c_int; 3],
}

#[link(name = "cudnn")]
extern "C" {
    pub fn cudnnCreate(handle: *mut cudnnHandle_t) -> cudnnStatus_t;
    pub fn cudnnDestroy(handle: cudnnHandle_t) -> cudnnStatus_t;
    pub fn cudnnGetErrorString(status: cudnnStatus_t) -> *const c_char;

    pub fn cudnnCreateTensorDescriptor(desc: *mut cudnnTensorDescriptor_t) -> cudnnStatus_t;
    pub fn cudnnSetTensor4dDescriptor(
        desc: cudnnTensorDescriptor_t,
        format: cudnnTensorFormat_t,
        data_type: cudnnDataType_t,
        n: c_int,
        c: c_int,
        h: c_int,
        w: c_int,
    ) -> cudnnStatus_t;
    pub fn cudnnGetTensor4dDescriptor(
        desc: cudnnTensorDescriptor_t,
        data_type: *mut cudnnDataType_t,
        n: *mut c_int,
        c: *mut c_int,
        h: *mut c_int,
        w: *mut c_int,
        n_stride: *mut c_int,
        c_stride: *mut c_int,
        h_stride: *mut c_int,
        w_stride: *mut c_int,
    ) -> cudnnStatus_t;
    pub fn cudnnDestroyTensorDescriptor(desc: cudnnTensorDescriptor_t) -> cudnnStatus_t;

    pub fn cudnnCreateFilterDescriptor(desc: *mut cudnnFilterDescriptor_t) -> cudnnStatus_t;
    pub fn cudnnSetFilter4dDescriptor(
        desc: cudnnFilterDescriptor_t,
        data_type: cudnnDataType_t,
        format: cudnnTensorFormat_t,
        k: c_int,
        c: c_int,
        h: c_int,
        w: c_int,
    ) -> cudnnStatus_t;
    pub fn cudnnDestroyFilterDescriptor(desc: cudnnFilterDescriptor_t) -> cudnnStatus_t;

    pub fn cudnnCreateConvolutionDescriptor(desc: *mut cudnnConvolutionDescriptor_t) -> cudnnStatus_t;
    pub fn cudnnSetConvolution2dDescriptor(
        desc: cudnnConvolutionDescriptor_t,
        pad_h: c_int,
        pad_w: c_int,
        stride_h: c_int,
        stride_w: c_int,
        dilation_h: c_int,
        dilation_w: c_int,
        mode: cudnnConvolutionMode_t,
        compute_type: cudnnDataType_t,
    ) -> cudnnStatus_t;
    pub fn cudnnSetConvolutionGroupCount(desc: cudnnConvolutionDescriptor_t, group_count: c_int) -> cudnnStatus_t;
    pub fn cudnnSetConvolutionMathType(desc: cudnnConvolutionDescriptor_t, math_type: cudnnMathType_t)
        -> cudnnStatus_t;
    pub fn cudnnDestroyConvolutionDescriptor(desc: cudnnConvolutionDescriptor_t) -> cudnnStatus_t;
    pub fn cudnnGetConvolution2dForwardOutputDim(
        conv: cudnnConvolutionDescriptor_t,
        input: cudnnTensorDescriptor_t,
        filter: cudnnFilterDescriptor_t,
        n: *mut c_int,
        c: *mut c_int,
        h: *mut c_int,
        w: *mut c_int,
    ) -> cudnnStatus_t;

    pub fn cudnnCreateActivationDescriptor(desc: *mut cudnnActivationDescriptor_t) -> cudnnStatus_t;
    pub fn cudnnSetActivationDescriptor(
        desc: cudnnActivationDescriptor_t,
        mode: cudnnActivationMode_t,
        relu_nan_opt: cudnnNanPropagation_t,
        coef: c_double,
    ) -> cudnnStatus_t;
    pub fn cudnnDestroyActivationDescriptor(desc: cudnnActivationDescriptor_t) -> cudnnStatus_t;

    pub fn cudnnCreatePoolingDescriptor(desc: *mut cudnnPoolingDescriptor_t) -> cudnnStatus_t;
    pub fn cudnnSetPooling2dDescriptor(
        desc: cudnnPoolingDescriptor_t,
        mode: cudnnPoolingMode_t,
        nan_opt: cudnnNanPropagation_t,
        window_h: c_int,
        window_w: c_int,
        pad_h: c_int,
        pad_w: c_int,
        stride_h: c_int,
        stride_w: c_int,
    ) -> cudnnStatus_t;
    pub fn cudnnDestroyPoolingDescriptor(desc: cudnnPoolingDescriptor_t) -> cudnnStatus_t;
    pub fn cudnnGetPooling2dForwardOutputDim(
        desc: cudnnPoolingDescriptor_t,
        input: cudnnTensorDescriptor_t,
        n: *mut c_int,
        c: *mut c_int,
        h: *mut c_int,
        w: *mut c_int,
    ) -> cudnnStatus_t;

    pub fn cudnnCreateDropoutDescriptor(desc: *mut cudnnDropoutDescriptor_t) -> cudnnStatus_t;
    pub fn cudnnSetDropoutDescriptor(
        desc: cudnnDropoutDescriptor_t,
        handle: cudnnHandle_t,
        dropout: c_float,
        states: *mut c_void,
        states_bytes: usize,
        seed: c_ulonglong,
    ) -> cudnnStatus_t;
    pub fn cudnnDestroyDropoutDescriptor(desc: cudnnDropoutDescriptor_t) -> cudnnStatus_t;
    pub fn cudnnDropoutGetStatesSize(handle: cudnnHandle_t, size: *mut usize) -> cudnnStatus_t;
    pub fn cudnnDropoutGetReserveSpaceSize(input: cudnnTensorDescriptor_t, size: *mut usize) -> cudnnStatus_t;

    pub fn cudnnDeriveBNTensorDescriptor(
        derived: cudnnTensorDescriptor_t,
        input: cudnnTensorDescriptor_t,
        mode: cudnnBatchNormMode_t,
    ) -> cudnnStatus_t;

    pub fn cudnnGetConvolutionBackwardDataWorkspaceSize(
        handle: cudnnHandle_t,
        filter: cudnnFilterDescriptor_t,
        diff: cudnnTensorDescriptor_t,
        conv: cudnnConvolutionDescriptor_t,
        grad: cudnnTensorDescriptor_t,
        algo: cudnnConvolutionBwdDataAlgo_t,
        size: *mut usize,
    ) -> cudnnStatus_t;
    pub fn cudnnGetConvolutionBackwardDataAlgorithm_v7(
        handle: cudnnHandle_t,
        filter: cudnnFilterDescriptor_t,
        diff: cudnnTensorDescriptor_t,
        conv: cudnnConvolutionDescriptor_t,
        grad: cudnnTensorDescriptor_t,
        requested: c_int,
        returned: *mut c_int,
        results: *mut cudnnConvolutionBwdDataAlgoPerf_t,
    ) -> cudnnStatus_t;
    pub fn cudnnFindConvolutionBackwardDataAlgorithm(
        handle: cudnnHandle_t,
        filter: cudnnFilterDescriptor_t,
        diff: cudnnTensorDescriptor_t,
        conv: cudnnConvolutionDescriptor_t,
        grad: cudnnTensorDescriptor_t,
        requested: c_int,
        returned: *mut c_int,
        results: *mut cudnnConvolutionBwdDataAlgoPerf_t,
    ) -> cudnnStatus_t;

    pub fn cudnnActivationBackward(
        handle: cudnnHandle_t,
        activation: cudnnActivationDescriptor_t,
        alpha: *const c_void,
        y_desc: cudnnTensorDescriptor_t,
        y: *const c_void,
        dy_desc: cudnnTensorDescriptor_t,
        dy: *const c_void,
        x_desc: cudnnTensorDescriptor_t,
        x: *const c_void,
        beta: *const c_void,
        dx_desc: cudnnTensorDescriptor_t,
        dx: *mut c_void,
    ) -> cudnnStatus_t;
    pub fn cudnnBatchNormalizationForwardTraining(
        handle: cudnnHandle_t,
        mode: cudnnBatchNormMode_t,
        alpha: *const c_void,
        beta: *const c_void,
        x_desc: cudnnTensorDescriptor_t,
        x: *const c_void,
        y_desc: cudnnTensorDescriptor_t,
        y: *mut c_void,
        param_desc: cudnnTensorDescriptor_t,
        scale: *const c_void,
        bias: *const c_void,
        average_factor: c_double,
        running_mean: *mut c_void,
        running_variance: *mut c_void,
        epsilon: c_double,
        saved_mean: *mut c_void,
        saved_inv_variance: *mut c_void,
    ) -> cudnnStatus_t;
    pub fn cudnnBatchNormalizationForwardInference(
        handle: cudnnHandle_t,
        mode: cudnnBatchNormMode_t,
        alpha: *const c_void,
        beta: *const c_void,
        x_desc: cudnnTensorDescriptor_t,
        x: *const c_void,
        y_desc: cudnnTensorDescriptor_t,
        y: *mut c_void,
        param_desc: cudnnTensorDescriptor_t,
        scale: *const c_void,
        bias: *const c_void,
        estimated_mean: *const c_void,
        estimated_variance: *const c_void,
        epsilon: c_double,
    ) -> cudnnStatus_t;
    pub fn cudnnConvolutionBackwardBias(
        handle: cudnnHandle_t,
        alpha: *const c_void,
        dy_desc: cudnnTensorDescriptor_t,
        dy: *const c_void,
        beta: *const c_void,
        db_desc: cudnnTensorDescriptor_t,
        db: *mut c_void,
    ) -> cudnnStatus_t;
    pub fn cudnnConvolutionBackwardData(
        handle: cudnnHandle_t,
        alpha: *const c_void,
        filter_desc: cudnnFilterDescriptor_t,
        w: *const c_void,
        dy_desc: cudnnTensorDescriptor_t,
        dy: *const c_void,
        conv: cudnnConvolutionDescriptor_t,
        algo: cudnnConvolutionBwdDataAlgo_t,
        workspace: *mut c_void,
        workspace_bytes: usize,
        beta: *const c_void,
        dx_desc: cudnnTensorDescriptor_t,
        dx: *mut c_void,
    ) -> cudnnStatus_t;
    pub fn cudnnDropoutForward(
        handle: cudnnHandle_t,
        dropout: cudnnDropoutDescriptor_t,
        x_desc: cudnnTensorDescriptor_t,
        x: *const c_void,
        y_desc: cudnnTensorDescriptor_t,
        y: *mut c_void,
        reserve: *mut c_void,
        reserve_bytes: usize,
    ) -> cudnnStatus_t;
    pub fn cudnnPoolingBackward(
        handle: cudnnHandle_t,
        pooling: cudnnPoolingDescriptor_t,
        alpha: *const c_void,
        y_desc: cudnnTensorDescriptor_t,
        y: *const c_void,
        dy_desc: cudnnTensorDescriptor_t,
        dy: *const c_void,
        x_desc: cudnnTensorDescriptor_t,
        x: *const c_void,
        beta: *const c_void,
        dx_desc: cudnnTensorDescriptor_t,
        dx: *mut c_void,
    ) -> cudnnStatus_t;
    pub fn cudnnScaleTensor(
        handle: cudnnHandle_t,
        desc: cudnnTensorDescriptor_t,
        y: *mut c_void,
        alpha: *const c_void,
    ) -> cudnnStatus_t;
}

// ---- cuBLAS ----

pub type cublasStatus_t = c_int;
pub const CUBLAS_STATUS_SUCCESS: cublasStatus_t = 0;

#[repr(C)]
pub struct cublasContext {
    _private: [u8; 0],
}
pub type cublasHandle_t = *mut cublasContext;

pub type cublasOperation_t = c_int;
pub const CUBLAS_OP_N: cublasOperation_t = 0;
pub const CUBLAS_OP_T: cublasOperation_t = 1;

pub type cublasMath_t = c_int;
pub const CUBLAS_DEFAULT_MATH: cublasMath_t = 0;
pub const CUBLAS_TENSOR_OP_MATH: cublasMath_t = 1;

pub type cudaDataType_t = c_int;
pub const CUDA_R_32F: cudaDataType_t = 0;
pub const CUDA_R_64F: cudaDataType_t = 1;
pub const CUDA_R_16F: cudaDataType_t = 2;

pub type cublasGemmAlgo_t = c_int;
pub const CUBLAS_GEMM_DFALT: cublasGemmAlgo_t = -1;
pub const CUBLAS_GEMM_DFALT_TENSOR_OP: cublasGemmAlgo_t = 99;

#[link(name = "cublas")]
extern "C" {
    pub fn cublasCreate_v2(handle: *mut cublasHandle_t) -> cublasStatus_t;
    pub fn cublasDestroy_v2(handle: cublasHandle_t) -> cublasStatus_t;
    pub fn cublasSetMathMode(handle: cublasHandle_t, mode: cublasMath_t) -> cublasStatus_t;
    pub fn cublasSgemm_v2(
        handle: cublasHandle_t,
        trans_a: cublasOperation_t,
        trans_b: cublasOperation_t,
        m: c_int,
        n: c_int,
        k: c_int,
        alpha: *const c_float,
        a: *const c_void,
        lda: c_int,
        b: *const c_void,
        ldb: c_int,
        beta: *const c_float,
        c: *mut c_void,
        ldc: c_int,
    ) -> cublasStatus_t;
    pub fn cublasDgemm_v2(
        handle: cublasHandle_t,
        trans_a: cublasOperation_t,
        trans_b: cublasOperation_t,
        m: c_int,
        n: c_int,
        k: c_int,
        alpha: *const c_double,
        a: *const c_void,
        lda: c_int,
        b: *const c_void,
        ldb: c_int,
        beta: *const c_double,
        c: *mut c_void,
        ldc: c_int,
    ) -> cublasStatus_t;
    pub fn cublasGemmEx(
        handle: cublasHandle_t,
        trans_a: cublasOperation_t,
        trans_b: cublasOperation_t,
        m: c_int,
        n: c_int,
        k: c_int,
        alpha: *const c_void,
        a: *const c_void,
        a_type: cudaDataType_t,
        lda: c_int,
        b: *const c_void,
        b_type: cudaDataType_t,
        ldb: c_int,
        beta: *const c_void,
        c: *mut c_void,
        c_type: cudaDataType_t,
        ldc: c_int,
        compute_type: cudaDataType_t,
        algo: cublasGemmAlgo_t,
    ) -> cublasStatus_t;
}

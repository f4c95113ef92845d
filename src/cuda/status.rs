//! Vendor status translation. Every raw call site goes through one of the
//! `check_*` functions so a failure always carries the entry point name and
//! the library's own message.

use std::ffi::CStr;

use crate::cuda::bindings::{
    cudaError_t, cudaGetErrorString, cudaSuccess, cublasStatus_t, cudnnGetErrorString, cudnnStatus_t,
    CUBLAS_STATUS_SUCCESS, CUDNN_STATUS_SUCCESS,
};
use crate::device::{DeviceError, DeviceResult};

pub fn check_cuda(call: &'static str, status: cudaError_t) -> DeviceResult<()> {
    if status == cudaSuccess {
        Ok(())
    } else {
        let message = unsafe { CStr::from_ptr(cudaGetErrorString(status)) };
        Err(DeviceError::new(call, message.to_string_lossy().into_owned()))
    }
}

pub fn check_cudnn(call: &'static str, status: cudnnStatus_t) -> DeviceResult<()> {
    if status == CUDNN_STATUS_SUCCESS {
        Ok(())
    } else {
        let message = unsafe { CStr::from_ptr(cudnnGetErrorString(status)) };
        Err(DeviceError::new(call, message.to_string_lossy().into_owned()))
    }
}

pub fn check_cublas(call: &'static str, status: cublasStatus_t) -> DeviceResult<()> {
    if status == CUBLAS_STATUS_SUCCESS {
        Ok(())
    } else {
        // cublas has no error-string entry point in the versions we target
        Err(DeviceError::new(call, format!("status {}", status)))
    }
}

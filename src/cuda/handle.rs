//! RAII owners of the per-device library handles.

use std::ptr::null_mut;

use crate::cuda::bindings::{
    cublasCreate_v2, cublasDestroy_v2, cublasHandle_t, cudaGetDeviceCount, cudaSetDevice, cudnnCreate,
    cudnnDestroy, cudnnHandle_t,
};
use crate::cuda::status::{check_cublas, check_cuda, check_cudnn};
use crate::device::{DeviceError, DeviceResult};

/// Number of visible compute devices, zero when the runtime itself is
/// unavailable.
pub fn device_count() -> i32 {
    let mut count = 0;
    let status = unsafe { cudaGetDeviceCount(&mut count) };
    if check_cuda("cudaGetDeviceCount", status).is_ok() {
        count
    } else {
        0
    }
}

/// Bind the calling thread to one device ordinal.
pub fn bind_device(ordinal: i32) -> DeviceResult<()> {
    if ordinal < 0 || ordinal >= device_count() {
        return Err(DeviceError::new(
            "cudaSetDevice",
            format!("device ordinal {} out of range", ordinal),
        ));
    }
    check_cuda("cudaSetDevice", unsafe { cudaSetDevice(ordinal) })
}

pub struct CudnnHandle {
    inner: cudnnHandle_t,
}

impl CudnnHandle {
    pub fn new() -> DeviceResult<Self> {
        let mut inner = null_mut();
        check_cudnn("cudnnCreate", unsafe { cudnnCreate(&mut inner) })?;
        Ok(CudnnHandle { inner })
    }

    pub fn raw(&self) -> cudnnHandle_t {
        self.inner
    }
}

impl Drop for CudnnHandle {
    fn drop(&mut self) {
        unsafe {
            cudnnDestroy(self.inner);
        }
    }
}

impl std::fmt::Debug for CudnnHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudnnHandle").field("inner", &self.inner).finish()
    }
}

pub struct CublasHandle {
    inner: cublasHandle_t,
}

impl CublasHandle {
    pub fn new() -> DeviceResult<Self> {
        let mut inner = null_mut();
        check_cublas("cublasCreate", unsafe { cublasCreate_v2(&mut inner) })?;
        Ok(CublasHandle { inner })
    }

    pub fn raw(&self) -> cublasHandle_t {
        self.inner
    }
}

impl Drop for CublasHandle {
    fn drop(&mut self) {
        unsafe {
            cublasDestroy_v2(self.inner);
        }
    }
}

impl std::fmt::Debug for CublasHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CublasHandle").field("inner", &self.inner).finish()
    }
}

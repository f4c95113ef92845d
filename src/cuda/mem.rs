//! Raw device allocations. Ownership bookkeeping happens one level up in
//! [CudaApi](crate::cuda::CudaApi); this type just pairs the pointer with its
//! length and frees on drop.

use std::os::raw::c_void;
use std::ptr::null_mut;

use crate::cuda::bindings::{cudaFree, cudaMalloc, cudaMemcpy, cudaMemcpyHostToDevice};
use crate::cuda::status::check_cuda;
use crate::device::{DeviceError, DeviceResult};

pub struct DeviceMemory {
    ptr: *mut c_void,
    len_bytes: usize,
}

impl DeviceMemory {
    pub fn alloc(len_bytes: usize) -> DeviceResult<Self> {
        let mut ptr = null_mut();
        check_cuda("cudaMalloc", unsafe { cudaMalloc(&mut ptr, len_bytes.max(1)) })?;
        Ok(DeviceMemory { ptr, len_bytes })
    }

    pub fn ptr(&self) -> *mut c_void {
        self.ptr
    }

    pub fn len_bytes(&self) -> usize {
        self.len_bytes
    }

    pub fn upload(&self, data: &[u8]) -> DeviceResult<()> {
        if data.len() > self.len_bytes {
            return Err(DeviceError::new(
                "cudaMemcpy",
                format!("upload of {} bytes into {} byte buffer", data.len(), self.len_bytes),
            ));
        }
        check_cuda("cudaMemcpy", unsafe {
            cudaMemcpy(self.ptr, data.as_ptr() as *const c_void, data.len(), cudaMemcpyHostToDevice)
        })
    }
}

impl Drop for DeviceMemory {
    fn drop(&mut self) {
        unsafe {
            cudaFree(self.ptr);
        }
    }
}

impl std::fmt::Debug for DeviceMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceMemory")
            .field("ptr", &self.ptr)
            .field("len_bytes", &self.len_bytes)
            .finish()
    }
}

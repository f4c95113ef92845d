//! The real cuDNN/cuBLAS backend, compiled only with the `cuda` feature.
//! Everything above this module talks to [Device](crate::device::Device);
//! nothing outside it sees a raw pointer.

pub mod api;
pub mod bindings;
pub mod descriptor;
pub mod event;
pub mod handle;
pub mod mem;
pub mod status;

pub use api::CudaApi;
pub use handle::device_count;

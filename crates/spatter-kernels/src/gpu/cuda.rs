//! CUDA gather/scatter engine using cudarc 0.17.
//!
//! Pattern, dense and sparse arrays are mirrored on the device once at
//! construction and stay resident for the engine's lifetime. Launches are
//! issued on the context's default stream without host synchronization;
//! timed launches are bracketed by a pair of CUDA events and the host waits
//! only on the stop event. Device memory is released when the engine drops.

use std::sync::Arc;
use std::time::Duration;

use cudarc::driver::sys::{CUdevice_attribute, CUevent_flags};
use cudarc::driver::{
    CudaContext, CudaEvent, CudaFunction, CudaModule, CudaSlice, CudaStream, LaunchConfig,
    PushKernelArg,
};
use cudarc::nvrtc::compile_ptx;
use spatter_common::{ELEMENT_SIZE, Kernel, Result, SpatterError};
use spatter_pattern::Pattern;

use crate::buffers::HostBuffers;

// ---------------------------------------------------------------------------
// PTX source (compiled at runtime via NVRTC)
// ---------------------------------------------------------------------------

/// Inline CUDA C source for the two kernels, `spatter_gather` and
/// `spatter_scatter`. Both use grid-stride loops over `n` pattern positions.
pub const SPATTER_KERNEL_SRC: &str = r#"
extern "C" __global__ void spatter_gather(
    const unsigned long long* __restrict__ pattern,
    double* __restrict__ dense,
    const double* __restrict__ sparse,
    unsigned long long n)
{
    unsigned long long idx = (unsigned long long)blockIdx.x * blockDim.x + threadIdx.x;
    unsigned long long stride = (unsigned long long)blockDim.x * gridDim.x;
    for (unsigned long long i = idx; i < n; i += stride) {
        dense[i] = sparse[pattern[i]];
    }
}

extern "C" __global__ void spatter_scatter(
    const unsigned long long* __restrict__ pattern,
    const double* __restrict__ dense,
    double* sparse,
    unsigned long long n)
{
    unsigned long long idx = (unsigned long long)blockIdx.x * blockDim.x + threadIdx.x;
    unsigned long long stride = (unsigned long long)blockDim.x * gridDim.x;
    for (unsigned long long i = idx; i < n; i += stride) {
        sparse[pattern[i]] = dense[i];
    }
}
"#;

const THREADS_PER_BLOCK: u32 = 256;
const MAX_BLOCKS: u32 = 65_535;

fn kernel_name(kernel: Kernel) -> &'static str {
    match kernel {
        Kernel::Gather => "spatter_gather",
        Kernel::Scatter => "spatter_scatter",
    }
}

fn launch_config(n: usize) -> LaunchConfig {
    let blocks = u32::try_from(n.div_ceil(THREADS_PER_BLOCK as usize)).unwrap_or(MAX_BLOCKS);
    LaunchConfig {
        grid_dim: (blocks.clamp(1, MAX_BLOCKS), 1, 1),
        block_dim: (THREADS_PER_BLOCK, 1, 1),
        shared_mem_bytes: 0,
    }
}

fn device_err(what: &str) -> impl FnOnce(cudarc::driver::DriverError) -> SpatterError + '_ {
    move |e| SpatterError::device(format!("{what}: {e:?}"))
}

// ---------------------------------------------------------------------------
// Device properties
// ---------------------------------------------------------------------------

/// Properties logged at setup and shown in the verbose setup banner.
#[derive(Debug, Clone, PartialEq)]
pub struct CudaDeviceInfo {
    pub device_index: usize,
    pub name: String,
    pub memory_clock_khz: i32,
    pub bus_width_bits: i32,
}

impl CudaDeviceInfo {
    fn query(ctx: &CudaContext, device_index: usize) -> Result<Self> {
        let name = ctx.name().map_err(device_err("failed to query device name"))?;
        let memory_clock_khz = ctx
            .attribute(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MEMORY_CLOCK_RATE)
            .map_err(device_err("failed to query memory clock"))?;
        let bus_width_bits = ctx
            .attribute(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_GLOBAL_MEMORY_BUS_WIDTH)
            .map_err(device_err("failed to query memory bus width"))?;
        Ok(Self { device_index, name, memory_clock_khz, bus_width_bits })
    }

    /// Theoretical peak in GB/s: `2 * clock_kHz * (bus_bits / 8) / 1e6`.
    pub fn peak_bandwidth_gbs(&self) -> f64 {
        2.0 * f64::from(self.memory_clock_khz) * (f64::from(self.bus_width_bits) / 8.0) / 1.0e6
    }
}

/// Renders the device block of the verbose setup banner.
impl std::fmt::Display for CudaDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Device Number: {}", self.device_index)?;
        writeln!(f, "\tDevice Name: {}", self.name)?;
        writeln!(f, "\tMemory Clock Rate (KHz): {}", self.memory_clock_khz)?;
        writeln!(f, "\tMemory Bus Width (bits): {}", self.bus_width_bits)?;
        writeln!(f, "\tPeak Memory Bandwidth (GB/s): {}", self.peak_bandwidth_gbs())
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Persistent device state for one execution context.
pub struct CudaEngine {
    _ctx: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    _module: Arc<CudaModule>,
    gather_fn: CudaFunction,
    scatter_fn: CudaFunction,
    pattern_dev: CudaSlice<u64>,
    dense_dev: CudaSlice<f64>,
    sparse_dev: CudaSlice<f64>,
    start: CudaEvent,
    stop: CudaEvent,
    len: usize,
    info: CudaDeviceInfo,
}

impl std::fmt::Debug for CudaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaEngine").field("info", &self.info).field("len", &self.len).finish()
    }
}

impl CudaEngine {
    /// Create the context on `device_index`, compile the kernels and copy
    /// `pattern` and `buffers` to the device.
    ///
    /// Anything acquired before a failing step is released on return.
    pub fn new(device_index: usize, pattern: &Pattern, buffers: &HostBuffers) -> Result<Self> {
        let ctx = CudaContext::new(device_index).map_err(|e| {
            SpatterError::device(format!(
                "failed to create CUDA context for device {device_index}: {e:?}"
            ))
        })?;
        let stream = ctx.default_stream();

        let info = CudaDeviceInfo::query(&ctx, device_index)?;
        log::info!("device {}: {}", info.device_index, info.name);
        log::info!("memory clock rate: {} kHz", info.memory_clock_khz);
        log::info!("memory bus width: {} bits", info.bus_width_bits);
        log::info!("peak memory bandwidth: {:.2} GB/s", info.peak_bandwidth_gbs());

        let ptx = compile_ptx(SPATTER_KERNEL_SRC)
            .map_err(|e| SpatterError::device(format!("failed to compile PTX: {e:?}")))?;
        let module = ctx.load_module(ptx).map_err(device_err("failed to load CUDA module"))?;
        let gather_fn = module
            .load_function(kernel_name(Kernel::Gather))
            .map_err(device_err("failed to load gather kernel"))?;
        let scatter_fn = module
            .load_function(kernel_name(Kernel::Scatter))
            .map_err(device_err("failed to load scatter kernel"))?;

        let start = ctx
            .new_event(Some(CUevent_flags::CU_EVENT_DEFAULT))
            .map_err(device_err("failed to create start event"))?;
        let stop = ctx
            .new_event(Some(CUevent_flags::CU_EVENT_DEFAULT))
            .map_err(device_err("failed to create stop event"))?;

        let indices: Vec<u64> = pattern.as_slice().iter().map(|&i| i as u64).collect();
        let pattern_dev = upload(&stream, "pattern", &indices, std::mem::size_of::<u64>())?;
        let dense_dev = upload(&stream, "dense buffer", &buffers.dense, ELEMENT_SIZE)?;
        let sparse_dev = upload(&stream, "sparse buffer", &buffers.sparse, ELEMENT_SIZE)?;
        stream.synchronize().map_err(device_err("stream synchronize failed"))?;

        Ok(Self {
            _ctx: ctx,
            stream,
            _module: module,
            gather_fn,
            scatter_fn,
            pattern_dev,
            dense_dev,
            sparse_dev,
            start,
            stop,
            len: pattern.len(),
            info,
        })
    }

    pub fn info(&self) -> &CudaDeviceInfo {
        &self.info
    }

    /// Launch `kernel` once. Returns the event-measured kernel time when
    /// `timed`, otherwise returns immediately after enqueueing.
    pub fn run(&mut self, kernel: Kernel, timed: bool) -> Result<Option<Duration>> {
        if timed {
            self.start.record(&self.stream).map_err(device_err("failed to record start event"))?;
        }
        self.launch(kernel)?;
        if !timed {
            return Ok(None);
        }
        self.stop.record(&self.stream).map_err(device_err("failed to record stop event"))?;
        self.stop.synchronize().map_err(device_err("failed to wait on stop event"))?;
        let ms = self.start.elapsed_ms(&self.stop).map_err(device_err("failed to read event time"))?;
        Ok(Some(Duration::from_secs_f64(f64::from(ms.max(0.0)) / 1000.0)))
    }

    fn launch(&mut self, kernel: Kernel) -> Result<()> {
        let func = match kernel {
            Kernel::Gather => &self.gather_fn,
            Kernel::Scatter => &self.scatter_fn,
        };
        let n = self.len as u64;
        let mut builder = self.stream.launch_builder(func);
        builder.arg(&self.pattern_dev);
        builder.arg(&mut self.dense_dev);
        builder.arg(&mut self.sparse_dev);
        builder.arg(&n);

        // Safety: argument order and types match the kernel signatures in
        // SPATTER_KERNEL_SRC; every pattern index is below the sparse length.
        unsafe { builder.launch(launch_config(self.len)) }.map_err(|e| {
            SpatterError::device(format!("{} launch failed: {e:?}", kernel_name(kernel)))
        })?;
        Ok(())
    }

    /// Wait for the device and copy both value arrays back to the host.
    pub fn read_back(&self, buffers: &mut HostBuffers) -> Result<()> {
        self.stream.synchronize().map_err(device_err("device synchronize failed"))?;
        self.stream
            .memcpy_dtoh(&self.dense_dev, &mut buffers.dense)
            .map_err(device_err("failed to copy dense buffer from device"))?;
        self.stream
            .memcpy_dtoh(&self.sparse_dev, &mut buffers.sparse)
            .map_err(device_err("failed to copy sparse buffer from device"))?;
        self.stream.synchronize().map_err(device_err("stream synchronize failed"))?;
        log::debug!("copied {} bytes device to host", buffers.bytes());
        Ok(())
    }
}

fn upload<T: cudarc::driver::DeviceRepr>(
    stream: &Arc<CudaStream>,
    name: &'static str,
    host: &[T],
    elem_size: usize,
) -> Result<CudaSlice<T>> {
    let bytes = host.len().saturating_mul(elem_size);
    let dev = stream.memcpy_stod(host).map_err(|e| SpatterError::Allocation {
        buffer: name,
        bytes,
        reason: format!("device allocation or copy failed: {e:?}"),
    })?;
    log::debug!("copied {name} host to device ({bytes} bytes)");
    Ok(dev)
}

/// True when a CUDA context can be created on device 0.
pub fn is_cuda_available() -> bool {
    CudaContext::new(0).is_ok()
}

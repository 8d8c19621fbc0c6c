//! Backend-parametrized execution context.
//!
//! Lifecycle: [`ExecutionContext::configure`] validates and records the run
//! without allocating; [`ExecutionContext::setup`] allocates and seeds the
//! buffers (and mirrors them on the device for CUDA); [`ExecutionContext::run`]
//! executes one kernel call; [`ExecutionContext::teardown`] performs the final
//! readback and releases everything. Dropping a context at any stage releases
//! whatever it holds.

use std::fmt;
use std::io::{self, Write};
use std::time::Duration;

use spatter_common::{Backend, Kernel, Result, SpatterError};
use spatter_pattern::Pattern;

use crate::Capabilities;
use crate::buffers::HostBuffers;
use crate::cpu::{HostKernel, SerialKernel};
use crate::distributed::Coordinator;
use crate::report::Report;
use crate::timer::Timer;

/// What to run: kernel name, compiled pattern and run parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSpec {
    /// Kernel name, parsed case-insensitively at configure time.
    pub kernel: String,
    pub pattern: Pattern,
    /// Timed runs the report accounts for.
    pub nruns: u64,
    pub verbosity: u8,
    /// Parallel backend worker count; `None` uses every CPU.
    pub threads: Option<usize>,
    pub device_index: usize,
}

impl RunSpec {
    pub fn new(kernel: impl Into<String>, pattern: Pattern) -> Self {
        Self { kernel: kernel.into(), pattern, nruns: 1, verbosity: 0, threads: None, device_index: 0 }
    }

    pub fn with_nruns(mut self, nruns: u64) -> Self {
        self.nruns = nruns;
        self
    }

    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_device_index(mut self, device_index: usize) -> Self {
        self.device_index = device_index;
        self
    }
}

/// Accumulated measurement over timed runs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunResult {
    /// Sum of the elapsed time of every timed run.
    pub seconds: f64,
    pub timed_runs: u64,
}

impl RunResult {
    fn record(&mut self, elapsed: Duration) {
        self.seconds += elapsed.as_secs_f64();
        self.timed_runs += 1;
    }
}

enum Engine {
    Host(Box<dyn HostKernel>),
    #[cfg(feature = "cuda")]
    Cuda(Box<crate::gpu::CudaEngine>),
}

impl Engine {
    fn create(backend: Backend, spec: &RunSpec, buffers: &HostBuffers) -> Result<Self> {
        match backend {
            Backend::Serial => Ok(Self::Host(Box::new(SerialKernel))),
            #[cfg(feature = "parallel")]
            Backend::Parallel => {
                Ok(Self::Host(Box::new(crate::cpu::ParallelKernel::new(spec.threads)?)))
            }
            #[cfg(feature = "cuda")]
            Backend::Cuda => Ok(Self::Cuda(Box::new(crate::gpu::CudaEngine::new(
                spec.device_index,
                &spec.pattern,
                buffers,
            )?))),
            #[allow(unreachable_patterns)]
            other => {
                let _ = (spec, buffers);
                Err(not_compiled(other))
            }
        }
    }
}

struct Prepared {
    buffers: HostBuffers,
    engine: Engine,
}

fn not_compiled(backend: Backend) -> SpatterError {
    SpatterError::config(format!(
        "backend '{backend}' is not compiled in (enable the `{backend}` feature)"
    ))
}

/// One benchmark configuration and the buffers it runs against.
pub struct ExecutionContext {
    backend: Backend,
    kernel: Kernel,
    spec: RunSpec,
    coordinator: Coordinator,
    timer: Timer,
    result: RunResult,
    prepared: Option<Prepared>,
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("backend", &self.backend)
            .field("kernel", &self.kernel)
            .field("pattern_len", &self.spec.pattern.len())
            .field("ready", &self.prepared.is_some())
            .field("result", &self.result)
            .finish()
    }
}

impl ExecutionContext {
    /// Validate `spec` for `backend` and record it. Allocates nothing.
    ///
    /// # Errors
    ///
    /// [`SpatterError::Configuration`] for an unknown kernel name, a backend
    /// this build does not carry, or a zero thread count.
    pub fn configure(backend: Backend, spec: RunSpec) -> Result<Self> {
        let kernel: Kernel = spec.kernel.parse()?;
        if !Capabilities::compiled().supports(backend) {
            return Err(not_compiled(backend));
        }
        if spec.threads == Some(0) {
            return Err(SpatterError::config("thread count must be at least 1"));
        }
        log::debug!(
            "configured {} {} over {} indices (nruns={})",
            backend,
            kernel,
            spec.pattern.len(),
            spec.nruns
        );
        Ok(Self {
            backend,
            kernel,
            spec,
            coordinator: Coordinator::local(),
            timer: Timer::new(),
            result: RunResult::default(),
            prepared: None,
        })
    }

    /// Replace the default single-process coordinator.
    pub fn with_coordinator(mut self, coordinator: Coordinator) -> Self {
        self.coordinator = coordinator;
        self
    }

    /// Allocate and seed the buffers, then bring up the backend.
    ///
    /// # Errors
    ///
    /// [`SpatterError::Configuration`] if called twice, [`SpatterError::Allocation`]
    /// when memory cannot be acquired, [`SpatterError::Device`] for device
    /// bring-up failures.
    pub fn setup(&mut self, seed: u64) -> Result<()> {
        if self.prepared.is_some() {
            return Err(SpatterError::config("setup called twice on the same context"));
        }
        let buffers = HostBuffers::allocate(&self.spec.pattern, seed)?;
        log::info!(
            "allocated dense ({} elements) and sparse ({} elements) buffers, seed {seed}",
            buffers.dense.len(),
            buffers.sparse.len()
        );
        let engine = Engine::create(self.backend, &self.spec, &buffers)?;
        if self.backend == Backend::Parallel
            && self.kernel == Kernel::Scatter
            && self.spec.pattern.has_duplicates()
        {
            log::warn!("pattern repeats sparse indices; parallel scatter leaves an unspecified writer in each repeated slot");
        }
        log::debug!("{}", self.size_summary());
        self.prepared = Some(Prepared { buffers, engine });
        Ok(())
    }

    /// Run the kernel once. Timed runs add their elapsed time to the
    /// accumulated result.
    ///
    /// # Errors
    ///
    /// [`SpatterError::Configuration`] before [`ExecutionContext::setup`];
    /// coordinator and device failures otherwise.
    pub fn run(&mut self, timed: bool) -> Result<RunResult> {
        let Some(prepared) = self.prepared.as_mut() else {
            return Err(SpatterError::config("run called before setup"));
        };
        self.coordinator.barrier()?;
        let elapsed = match &mut prepared.engine {
            Engine::Host(host) => {
                self.timer.start();
                host.execute(self.kernel, &self.spec.pattern, &mut prepared.buffers);
                self.timer.stop();
                log::trace!("{} {} took {:.6} s", host.name(), self.kernel, self.timer.seconds());
                Some(self.timer.elapsed())
            }
            #[cfg(feature = "cuda")]
            Engine::Cuda(device) => device.run(self.kernel, timed)?,
        };
        if let Some(elapsed) = elapsed.filter(|_| timed) {
            self.result.record(elapsed);
        }
        Ok(self.result)
    }

    /// Bring host buffers up to date with the backend. A no-op for host
    /// backends and before setup.
    pub fn synchronize(&mut self) -> Result<()> {
        match self.prepared.as_mut() {
            #[cfg(feature = "cuda")]
            Some(Prepared { buffers, engine: Engine::Cuda(device) }) => device.read_back(buffers),
            _ => Ok(()),
        }
    }

    /// Write the setup banner (verbosity ≥1) and, for CUDA, the device
    /// properties. Writes nothing before setup.
    pub fn write_setup(&self, out: &mut dyn Write) -> io::Result<()> {
        let Some(prepared) = self.prepared.as_ref().filter(|_| self.spec.verbosity >= 1) else {
            return Ok(());
        };
        writeln!(out, "Spatter {} Setup", self.backend.display_name())?;
        match &prepared.engine {
            Engine::Host(_) => Ok(()),
            #[cfg(feature = "cuda")]
            Engine::Cuda(device) => write!(out, "{}", device.info()),
        }
    }

    /// Write the report. Verbosity adds a header (≥1) and the buffer size
    /// summary (≥3) around the four fixed lines.
    pub fn report(&self, out: &mut dyn Write) -> io::Result<()> {
        if self.spec.verbosity >= 1 {
            writeln!(out, "Spatter {} Report", self.backend.display_name())?;
        }
        if self.spec.verbosity >= 3 {
            writeln!(out, "{}", self.size_summary())?;
        }
        write!(out, "{}", self.measurement())
    }

    /// Figures for the accumulated result over the configured run count.
    pub fn measurement(&self) -> Report {
        Report::new(self.spec.nruns, self.spec.pattern.len(), self.result.seconds)
    }

    /// Final readback, then release every resource.
    pub fn teardown(mut self) -> Result<RunResult> {
        self.synchronize()?;
        let result = self.result;
        drop(self.prepared.take());
        log::debug!("context torn down after {} timed runs", result.timed_runs);
        Ok(result)
    }

    fn size_summary(&self) -> String {
        let pattern = &self.spec.pattern;
        format!(
            "Pattern Array Size: {}\tDense Array Size: {}\tSparse Array Size: {}\tMax Pattern Val: {}",
            pattern.len(),
            pattern.len(),
            pattern.sparse_len(),
            pattern.max_index()
        )
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    pub fn pattern(&self) -> &Pattern {
        &self.spec.pattern
    }

    pub fn nruns(&self) -> u64 {
        self.spec.nruns
    }

    pub fn verbosity(&self) -> u8 {
        self.spec.verbosity
    }

    pub fn result(&self) -> RunResult {
        self.result
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn is_ready(&self) -> bool {
        self.prepared.is_some()
    }

    /// Host dense buffer; empty before setup. Device results land here only
    /// after [`ExecutionContext::synchronize`].
    pub fn dense(&self) -> &[f64] {
        self.prepared.as_ref().map(|p| p.buffers.dense.as_slice()).unwrap_or_default()
    }

    /// Host sparse buffer; empty before setup.
    pub fn sparse(&self) -> &[f64] {
        self.prepared.as_ref().map(|p| p.buffers.sparse.as_slice()).unwrap_or_default()
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.spec.verbosity >= 1 {
            writeln!(f, "Kernel: {}", self.kernel)?;
        }
        if self.spec.verbosity >= 2 {
            writeln!(f, "Pattern: {}", self.spec.pattern)?;
        }
        Ok(())
    }
}

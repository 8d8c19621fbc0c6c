//! End-to-end lifecycle tests for `ExecutionContext` across host backends.

use spatter_common::{Backend, Kernel};
use spatter_kernels::{Bandwidth, ExecutionContext, Report, RunSpec, host_allocation_count};
use spatter_pattern::{Pattern, PatternCompiler, compile};

fn context(backend: Backend, kernel: &str, spec: &str) -> ExecutionContext {
    let pattern = compile(spec).unwrap();
    let mut ctx = ExecutionContext::configure(backend, RunSpec::new(kernel, pattern).with_nruns(10)).unwrap();
    ctx.setup(1).unwrap();
    ctx
}

fn host_backends() -> Vec<Backend> {
    let mut backends = vec![Backend::Serial];
    if cfg!(feature = "parallel") {
        backends.push(Backend::Parallel);
    }
    backends
}

// -- gather / scatter semantics --

#[test]
fn gather_identity_pattern_copies_prefix() {
    for backend in host_backends() {
        let mut ctx = context(backend, "gather", "0,1,2,3");
        ctx.run(true).unwrap();
        assert_eq!(ctx.dense(), &ctx.sparse()[..4], "{backend}");
    }
}

#[test]
fn gather_ms1_reads_expected_slots() {
    for backend in host_backends() {
        let mut ctx = context(backend, "gather", "MS1:8:4:32");
        ctx.run(false).unwrap();
        let expected: Vec<f64> = [0, 1, 2, 3, 35, 36, 37, 38].iter().map(|&i| ctx.sparse()[i]).collect();
        assert_eq!(ctx.dense(), expected.as_slice(), "{backend}");
    }
}

#[test]
fn serial_scatter_duplicates_last_write_wins() {
    let mut ctx = context(Backend::Serial, "scatter", "2,0,2,2,1");
    let dense = ctx.dense().to_vec();
    ctx.run(false).unwrap();
    assert_eq!(ctx.sparse()[2], dense[3]);
    assert_eq!(ctx.sparse()[0], dense[1]);
    assert_eq!(ctx.sparse()[1], dense[4]);
}

#[cfg(feature = "parallel")]
#[test]
fn parallel_scatter_duplicates_store_one_candidate() {
    let mut ctx = context(Backend::Parallel, "scatter", "UNIFORM:64:0");
    let dense = ctx.dense().to_vec();
    ctx.run(false).unwrap();
    assert!(dense.contains(&ctx.sparse()[0]));
}

#[cfg(feature = "parallel")]
#[test]
fn openmp_alias_selects_parallel() {
    let backend: Backend = "OpenMP".parse().unwrap();
    let ctx = context(backend, "gather", "0,1");
    assert_eq!(ctx.backend(), Backend::Parallel);
}

// -- timing and reporting --

#[test]
fn accumulation_sums_timed_runs() {
    let mut ctx = context(Backend::Serial, "gather", "UNIFORM:4096:3");
    let mut last = 0.0;
    for n in 1..=5 {
        let result = ctx.run(true).unwrap();
        assert_eq!(result.timed_runs, n);
        assert!(result.seconds >= last);
        last = result.seconds;
    }
    ctx.run(false).unwrap();
    assert_eq!(ctx.result().seconds, last);
    assert_eq!(ctx.result().timed_runs, 5);
}

#[test]
fn measurement_uses_configured_nruns() {
    let mut ctx = context(Backend::Serial, "gather", "0,1,2,3");
    for _ in 0..10 {
        ctx.run(true).unwrap();
    }
    let report = ctx.measurement();
    assert_eq!(report.total_bytes(), 320);
    assert_eq!(report.bytes_per_run(), 32);
    assert_eq!(report.seconds, ctx.result().seconds);
}

#[test]
fn reference_report_figures() {
    let report = Report::new(10, 4, 1.0);
    assert_eq!(report.total_bytes(), 320);
    assert_eq!(report.bandwidth(), Bandwidth::MbPerSec(0.00032));
    assert_eq!(Report::new(10, 4, 0.0).bandwidth(), Bandwidth::Undefined);
}

// -- configuration errors --

#[test]
fn empty_pattern_fails_without_allocating() {
    let before = host_allocation_count();
    let err = compile("").unwrap_err();
    assert!(err.is_configuration());
    assert!(Pattern::from_indices(Vec::new()).is_err());
    assert_eq!(host_allocation_count(), before);
}

#[test]
fn largest_index_fails_before_setup() {
    let before = host_allocation_count();
    let err = compile("18446744073709551615").unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert_eq!(host_allocation_count(), before);
}

#[test]
fn near_largest_index_is_allocation_error() {
    let pattern = compile("18446744073709551614").unwrap();
    let mut ctx = ExecutionContext::configure(Backend::Serial, RunSpec::new("gather", pattern)).unwrap();
    let err = ctx.setup(1).unwrap_err();
    assert_eq!(err.exit_code(), 3, "{err}");
    assert!(!ctx.is_ready());
}

#[test]
fn invalid_kernel_never_reaches_setup() {
    let before = host_allocation_count();
    let pattern = compile("0,1").unwrap();
    let err = ExecutionContext::configure(Backend::Serial, RunSpec::new("gatherr", pattern)).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert_eq!(host_allocation_count(), before);
}

#[test]
fn delta_and_count_grow_the_sparse_buffer() {
    let pattern = PatternCompiler::new().with_delta(16).with_count(3).compile("MS1:4:2:8").unwrap();
    let mut ctx = ExecutionContext::configure(Backend::Serial, RunSpec::new("gather", pattern)).unwrap();
    ctx.setup(3).unwrap();
    assert_eq!(ctx.dense().len(), 12);
    assert_eq!(ctx.sparse().len(), 10 + 2 * 16 + 1);
    assert_eq!(ctx.kernel(), Kernel::Gather);
}

#[test]
fn teardown_after_partial_lifecycle() {
    let ctx = ExecutionContext::configure(Backend::Serial, RunSpec::new("gather", compile("5").unwrap())).unwrap();
    let result = ctx.teardown().unwrap();
    assert_eq!(result.timed_runs, 0);
}

#[cfg(feature = "cuda")]
#[test]
#[ignore = "requires a CUDA device"]
fn cuda_round_trip_matches_host() {
    let mut ctx = context(Backend::Cuda, "gather", "0,1,2,3");
    ctx.run(true).unwrap();
    ctx.synchronize().unwrap();
    assert_eq!(ctx.dense(), &ctx.sparse()[..4]);
    assert_eq!(ctx.teardown().unwrap().timed_runs, 1);
}

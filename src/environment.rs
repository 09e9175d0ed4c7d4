//! Process-wide environment applied once before any conversion work.
//!
//! Native numeric backends (OpenMP, OpenBLAS, MKL, Accelerate, numexpr) spin
//! up their own thread pools and have been seen to crash when several of them
//! coexist in one process. The batch pins all of them to one thread and hides
//! every GPU device. The values are fixed; they override whatever the parent
//! shell exported.
//!
//! [`ProcessEnvironment::apply`] mutates the process environment, so it must
//! run at the top of `main`, before a runtime or any other thread starts.

use tracing::debug;

/// Thread-count variables pinned to `1`.
pub const THREAD_LIMIT_VARS: [&str; 5] = [
    "OMP_NUM_THREADS",
    "OPENBLAS_NUM_THREADS",
    "MKL_NUM_THREADS",
    "VECLIB_MAXIMUM_THREADS",
    "NUMEXPR_NUM_THREADS",
];

/// GPU visibility variable, set to the empty string.
pub const GPU_VISIBILITY_VAR: &str = "CUDA_VISIBLE_DEVICES";

/// An immutable set of environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEnvironment {
    vars: Vec<(&'static str, String)>,
}

impl ProcessEnvironment {
    /// Single-threaded numeric backends, no visible GPU.
    pub fn single_threaded() -> Self {
        let mut vars: Vec<(&'static str, String)> = THREAD_LIMIT_VARS
            .iter()
            .map(|name| (*name, "1".to_string()))
            .collect();
        vars.push((GPU_VISIBILITY_VAR, String::new()));
        Self { vars }
    }

    /// The `(name, value)` pairs in application order.
    pub fn vars(&self) -> &[(&'static str, String)] {
        &self.vars
    }

    /// Write every override into the process environment.
    pub fn apply(&self) {
        for (name, value) in &self.vars {
            std::env::set_var(name, value);
            debug!("env {}={:?}", name, value);
        }
    }
}

impl Default for ProcessEnvironment {
    fn default() -> Self {
        Self::single_threaded()
    }
}

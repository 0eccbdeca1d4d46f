pub mod runner;

pub use runner::{run, run_blocking, RunError, RunOptions, StressInputs, StressRunner};

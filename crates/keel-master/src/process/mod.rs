//! Process lifecycle for the `keel-master` binary.

mod errors;
mod launch;
mod shutdown;

pub use errors::LaunchError;
pub use launch::{run_master, run_master_with};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = "keel_master::process";

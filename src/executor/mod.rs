//! Test execution engine
//!
//! Capability pools, the round reporter and the retry loop.

mod launcher;
mod pool;
mod reporter;
mod retry;
mod runner;

pub use launcher::{CommandLauncher, Launcher};
pub use pool::PoolManager;
pub use runner::TestRunner;

#[cfg(test)]
pub(crate) use launcher::scripted::ScriptedLauncher;

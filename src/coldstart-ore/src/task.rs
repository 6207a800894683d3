//! Named task spawning.
//!
//! A thin wrapper around [`tokio::spawn`] that requires callers to name
//! every background task. The name shows up in logs emitted from inside
//! the task and makes `tokio-console` output (and stack traces) legible
//! when a dozen scrape/decide/housekeep loops are all running at once.

use std::future::Future;

use tokio::task::JoinHandle;

/// Spawns a named, `'static` future onto the current runtime.
pub fn spawn<Name, Fut>(name: impl FnOnce() -> Name, future: Fut) -> JoinHandle<Fut::Output>
where
    Name: Into<String>,
    Fut: Future + Send + 'static,
    Fut::Output: Send + 'static,
{
    let name = name().into();
    tracing::debug!(task = %name, "spawning task");
    tokio::spawn(future)
}

// adapters/online/runtime.rs

use crate::domain::error::{TrustError, TrustResult};

/// Drive `fut` to completion from synchronous code.
///
/// Trust evaluation is called from whatever thread performs the handshake,
/// which may or may not be inside a Tokio runtime.
pub fn run_on_current_thread<F, T>(fut: F) -> TrustResult<T>
where
  F: std::future::Future<Output = TrustResult<T>> + Send,
  T: Send,
{
  use tokio::runtime::{Handle, RuntimeFlavor};

  if let Ok(handle) = Handle::try_current() {
    // Inside a multi-thread runtime, block_in_place keeps the other workers going.
    if handle.runtime_flavor() == RuntimeFlavor::MultiThread {
      return tokio::task::block_in_place(|| handle.block_on(fut));
    }
    // A current-thread runtime cannot be blocked from its own thread; run the
    // future on a scoped helper thread with its own runtime instead.
    return std::thread::scope(|s| {
      s.spawn(|| new_runtime()?.block_on(fut))
        .join()
        .map_err(|_| TrustError::Panic("fetch worker panicked".into()))?
    });
  }

  // Otherwise, create a lightweight current-thread runtime just for this call.
  new_runtime()?.block_on(fut)
}

fn new_runtime() -> TrustResult<tokio::runtime::Runtime> {
  tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .map_err(|e| TrustError::Config(format!("Failed to create tokio runtime: {}", e)))
}

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const CACHE_FILE_EXTENSION: &str = "p7";
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

// One lock per cache file: load/verify/evict and removal never interleave for
// the same path, across every store instance in the process.
pub static CACHE_LOCKS: once_cell::sync::Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
  once_cell::sync::Lazy::new(|| Mutex::new(HashMap::new()));

pub fn cache_lock(path: &Path) -> Arc<Mutex<()>> {
  let mut locks = CACHE_LOCKS.lock().unwrap_or_else(|p| p.into_inner());
  locks.entry(path.to_path_buf()).or_default().clone()
}

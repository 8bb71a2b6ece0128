pub mod paths;

/// Returns true when the process runs with an effective uid of root.
///
/// Privileged commands skip the `sudo` wrapper in that case.
#[cfg(unix)]
pub fn is_elevated() -> bool {
  rustix::process::geteuid().is_root()
}

#[cfg(not(unix))]
pub fn is_elevated() -> bool {
  false
}

/// Available parallelism for `make -j`, falling back to 2.
pub fn available_jobs() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(2)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn available_jobs_is_positive() {
    assert!(available_jobs() >= 1);
  }
}

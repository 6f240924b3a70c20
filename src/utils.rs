use std::sync::atomic::{AtomicBool, Ordering};

pub trait ResultExt<T, E> {
    /// Raises the shared cancellation flag if this result is an error, so sibling tasks can bail
    /// out early.
    fn cancel(self, cancelled: &AtomicBool) -> Result<T, E>;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn cancel(self, cancelled: &AtomicBool) -> Result<T, E> {
        if self.is_err() {
            cancelled.store(true, Ordering::Release);
        }
        self
    }
}

/// Returns the last `/`-separated component of a pack-relative path.
pub fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    &trimmed[trimmed.rfind('/').map_or(0, |i| i + 1)..]
}

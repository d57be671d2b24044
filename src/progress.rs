//! Phase timing for progress output.

use std::time::Instant;

/// Logs `"<name>..."` on creation and the elapsed time when dropped.
///
/// ```
/// use pack3d::progress::Timed;
///
/// {
///     let _t = Timed::start("building layout");
///     // work
/// }
/// ```
#[must_use = "the phase ends when the guard is dropped"]
pub struct Timed {
    name: String,
    start: Instant,
}

impl Timed {
    pub fn start(name: impl Into<String>) -> Self {
        let name = name.into();
        log::info!("{name}...");
        Self {
            name,
            start: Instant::now(),
        }
    }
}

impl Drop for Timed {
    fn drop(&mut self) {
        log::info!("{} done in {:?}", self.name, self.start.elapsed());
    }
}

use anyhow::{Context, Result};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

/// Runs `f` inside a dedicated pool of `cores` threads, or on the calling
/// thread when no core count is given.
pub fn run_in_pool<T, F>(cores: Option<usize>, context: &'static str, f: F) -> Result<T>
where
    F: FnOnce() -> T + Send,
    T: Send,
{
    if let Some(cores) = cores {
        let pool = ThreadPoolBuilder::new()
            .num_threads(cores)
            .build()
            .context(context)?;
        Ok(pool.install(f))
    } else {
        Ok(f())
    }
}

/// Maps `f` over `items`, in parallel when `parallel` is set. Output order
/// always follows input order.
pub fn map_ordered<I, T, F>(items: &[I], parallel: bool, f: F) -> Vec<T>
where
    I: Sync,
    T: Send,
    F: Fn(&I) -> T + Sync + Send,
{
    if parallel {
        items.par_iter().map(f).collect()
    } else {
        items.iter().map(f).collect()
    }
}

pub fn resolve_threads(cores: Option<usize>, tasks: usize) -> Option<usize> {
    if let Some(cores) = cores {
        let capped = cores.min(tasks.max(1));
        if cores > capped {
            tracing::warn!(
                "Provided cores ({cores}) greater than number of files ({tasks}); using {capped}"
            );
        }
        Some(capped)
    } else {
        None
    }
}

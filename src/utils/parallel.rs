/// Parallel processing utilities

pub fn resolve_thread_count(threads: usize) -> usize {
    if threads == 0 {
        num_cpus::get()
    } else {
        threads
    }
}

pub fn configure_thread_pool(threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(resolve_thread_count(threads))
        .build_global()
}

/// Number of records to hand to the pool at once.
///
/// Aims for at least 10 records per thread and never below `min_batch`, so
/// short inputs are not split into many tiny parallel jobs.
pub fn batch_size_for_parallelism(min_batch: usize, threads: usize) -> usize {
    let threads = if threads == 0 {
        rayon::current_num_threads()
    } else {
        threads
    };

    (threads * 10).max(min_batch).max(1)
}

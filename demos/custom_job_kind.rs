//! Example: defining a custom set of job kinds
//!
//! A storage engine defers three kinds of housekeeping. Compaction gets two
//! workers, the others one each, and index rebuilds run through a handler that
//! receives opaque arguments.
//!
//! Run with: `cargo run --example custom_job_kind`

use bio_dispatch::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Housekeeping kinds of a storage engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum StorageJob {
    Compaction,
    IndexRebuild,
    Checkpoint,
}

impl JobKind for StorageJob {
    fn all_variants() -> &'static [Self] {
        &[Self::Compaction, Self::IndexRebuild, Self::Checkpoint]
    }

    fn name(&self) -> String {
        match self {
            Self::Compaction => "compaction",
            Self::IndexRebuild => "index_rebuild",
            Self::Checkpoint => "checkpoint",
        }
        .to_string()
    }
}

fn main() -> Result<()> {
    env_logger::init();
    println!("=== bio_dispatch - Custom Job Kind Example ===\n");

    let rebuilt = Arc::new(AtomicUsize::new(0));
    let rebuilt_clone = Arc::clone(&rebuilt);

    let config = DispatcherConfig::new()
        .workers_for(StorageJob::Compaction, 2)
        .with_thread_name_prefix("storage")
        .handler_for(
            StorageJob::IndexRebuild,
            move |kind: StorageJob, mut args: JobArgs| -> Result<()> {
                let table = args
                    .take::<String>(0)
                    .ok_or_else(|| DispatchError::other("missing table name"))?;
                let rows = args.take::<u64>(1).unwrap_or(0);
                println!(
                    "  [{}] {} rebuilding {} ({} rows)",
                    kind.name(),
                    thread::current().name().unwrap_or("?"),
                    table,
                    rows
                );
                rebuilt_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        );

    let dispatcher = Dispatcher::new(config)?;
    dispatcher.initialize_all()?;
    println!("Started {} workers\n", dispatcher.num_workers());

    for segment in 0..4 {
        dispatcher.execute(StorageJob::Compaction, move || {
            thread::sleep(Duration::from_millis(30));
            println!("  [compaction] merged segment {}", segment);
            Ok(())
        })?;
    }

    for (table, rows) in [("users", 1_200u64), ("orders", 48_000), ("events", 310_000)] {
        dispatcher.submit_args(
            StorageJob::IndexRebuild,
            JobArgs::new().arg(table.to_string()).arg(rows),
        )?;
    }

    // A checkpoint has no handler, so argument-only jobs are refused.
    match dispatcher.submit_args(StorageJob::Checkpoint, JobArgs::new()) {
        Err(e) => println!("  checkpoint without handler rejected: {}", e),
        Ok(()) => println!("  checkpoint unexpectedly accepted"),
    }

    // Wait for compaction one step at a time.
    while dispatcher.pending_count(StorageJob::Compaction)? > 0 {
        let remaining = dispatcher.wait_step(StorageJob::Compaction)?;
        println!("  compaction jobs remaining: {}", remaining);
    }
    dispatcher.wait_until_drained(StorageJob::IndexRebuild)?;

    println!("\nIndexes rebuilt: {}", rebuilt.load(Ordering::SeqCst));
    for (kind, stats) in dispatcher.all_stats() {
        println!(
            "  {:<14} completed={} success_rate={:.0}%",
            kind.name(),
            stats.jobs_completed,
            stats.success_rate()
        );
    }

    dispatcher.shutdown()?;
    println!("\nDispatcher shut down");
    Ok(())
}

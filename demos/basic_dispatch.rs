//! Basic dispatcher usage example
//!
//! Demonstrates initialization, fire-and-forget submission of the three
//! built-in job kinds, draining, statistics and shutdown.
//!
//! Run with: cargo run --example basic_dispatch

use bio_dispatch::prelude::*;
use std::io::Write;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    env_logger::init();
    println!("=== bio_dispatch - Basic Dispatch Example ===\n");

    let dispatcher = Dispatcher::new(DispatcherConfig::<BackgroundJobKind>::new())?;
    dispatcher.initialize_all()?;
    println!("1. Started {} workers", dispatcher.num_workers());

    println!("\n2. Deferring slow work:");

    // Large allocations are freed off the caller thread.
    for i in 0..5 {
        let buffer = vec![i as u8; 8 * 1024 * 1024];
        dispatcher.execute(BackgroundJobKind::FreeMemory, move || {
            drop(buffer);
            Ok(())
        })?;
    }
    println!("   Queued 5 deferred frees");

    // Flush and close a scratch file in the background.
    let path = std::env::temp_dir().join("bio_dispatch_demo.log");
    let mut file = std::fs::File::create(&path).map_err(|e| DispatchError::other(e.to_string()))?;
    writeln!(file, "written on the caller thread").map_err(|e| DispatchError::other(e.to_string()))?;

    dispatcher.execute(BackgroundJobKind::Fsync, {
        let file = file.try_clone().map_err(|e| DispatchError::other(e.to_string()))?;
        move || file.sync_all().map_err(|e| DispatchError::other(e.to_string()))
    })?;
    dispatcher.execute(BackgroundJobKind::CloseFile, move || {
        thread::sleep(Duration::from_millis(20));
        drop(file);
        Ok(())
    })?;
    println!("   Queued fsync and close of {}", path.display());

    println!("\n3. Pending jobs:");
    for kind in BackgroundJobKind::all_variants() {
        println!("   {:<12} {}", kind.name(), dispatcher.pending_count(*kind)?);
    }

    dispatcher.wait_all_drained();
    println!("\n4. All kinds drained");

    println!("\n5. Statistics:");
    for kind in BackgroundJobKind::all_variants() {
        let stats = dispatcher.kind_stats(*kind)?;
        println!(
            "   {:<12} completed={} failed={} avg_latency={:?}",
            stats.kind, stats.jobs_completed, stats.jobs_failed, stats.avg_latency
        );
    }

    dispatcher.shutdown()?;
    let _ = std::fs::remove_file(&path);
    println!("\n6. Dispatcher shut down");

    Ok(())
}

//! Process-wide dispatcher lifecycle.
//!
//! The global dispatcher can be installed only once per process, so the whole
//! lifecycle runs as a single test.

use bio_dispatch::{global, BackgroundJobKind, DispatchError, DispatcherConfig, JobArgs, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_global_lifecycle() {
    let _ = env_logger::builder().is_test(true).try_init();

    assert!(!global::is_initialized());
    assert!(matches!(
        global::execute(BackgroundJobKind::Fsync, || Ok(())),
        Err(DispatchError::NotInitialized)
    ));
    assert!(matches!(
        global::pending_jobs(BackgroundJobKind::Fsync),
        Err(DispatchError::NotInitialized)
    ));

    let freed = Arc::new(AtomicUsize::new(0));
    let freed_clone = Arc::clone(&freed);
    let config = DispatcherConfig::new().handler_for(
        BackgroundJobKind::FreeMemory,
        move |_kind: BackgroundJobKind, mut args: JobArgs| -> Result<()> {
            let buffer = args
                .take::<Vec<u8>>(0)
                .ok_or_else(|| DispatchError::other("missing buffer"))?;
            freed_clone.fetch_add(buffer.len(), Ordering::SeqCst);
            Ok(())
        },
    );
    global::init(config).expect("Failed to initialize global dispatcher");
    assert!(global::is_initialized());

    assert!(matches!(
        global::init(DispatcherConfig::new()),
        Err(DispatchError::AlreadyInitialized { .. })
    ));

    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..10 {
        let counter = Arc::clone(&counter);
        global::execute(BackgroundJobKind::CloseFile, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .expect("Failed to submit job");
    }
    global::submit_args(BackgroundJobKind::FreeMemory, JobArgs::new().arg(vec![0u8; 512]))
        .expect("Failed to submit job");

    global::wait_until_drained(BackgroundJobKind::CloseFile).expect("drain");
    global::wait_until_drained(BackgroundJobKind::FreeMemory).expect("drain");
    assert_eq!(counter.load(Ordering::SeqCst), 10);
    assert_eq!(freed.load(Ordering::SeqCst), 512);
    assert_eq!(global::pending_jobs(BackgroundJobKind::CloseFile).unwrap(), 0);
    assert_eq!(global::wait_step(BackgroundJobKind::CloseFile).unwrap(), 0);

    global::shutdown().expect("Failed to shutdown");
    assert!(matches!(
        global::execute(BackgroundJobKind::CloseFile, || Ok(())),
        Err(DispatchError::ShuttingDown { .. })
    ));
    global::shutdown().expect("second shutdown");
}

// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use confluence_core::{Dispatcher, MergeError, SerialDispatcher, SynchronousDispatcher};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Shared log of the order in which tasks ran.
#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<usize>>>);

impl Recorder {
    fn push(&self, value: usize) {
        self.0.lock().expect("recorder poisoned").push(value);
    }

    fn snapshot(&self) -> Vec<usize> {
        self.0.lock().expect("recorder poisoned").clone()
    }
}

#[test]
fn test_synchronous_dispatcher_runs_inline() -> anyhow::Result<()> {
    // Arrange
    let dispatcher = SynchronousDispatcher;
    let recorder = Recorder::default();
    let caller = thread::current().id();
    let seen = Arc::new(Mutex::new(None));

    // Act
    let task_recorder = recorder.clone();
    let task_seen = Arc::clone(&seen);
    dispatcher.dispatch(Box::new(move || {
        task_recorder.push(1);
        *task_seen.lock().expect("poisoned") = Some(thread::current().id());
    }))?;

    // Assert
    assert_eq!(recorder.snapshot(), vec![1]);
    assert_eq!(*seen.lock().expect("poisoned"), Some(caller));
    assert_eq!(dispatcher.name(), "synchronous");

    Ok(())
}

#[tokio::test]
async fn test_serial_dispatcher_preserves_submission_order() -> anyhow::Result<()> {
    // Arrange
    let dispatcher = SerialDispatcher::new("serial")?;
    let recorder = Recorder::default();

    // Act
    for index in 0..100 {
        let recorder = recorder.clone();
        dispatcher.dispatch(Box::new(move || recorder.push(index)))?;
    }

    // Assert
    for _ in 0..100 {
        if recorder.snapshot().len() == 100 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(recorder.snapshot(), (0..100).collect::<Vec<_>>());
    assert_eq!(dispatcher.name(), "serial");

    Ok(())
}

#[test]
fn test_serial_dispatcher_requires_runtime() {
    let result = SerialDispatcher::new("orphan");

    assert!(matches!(result, Err(MergeError::Dispatch { .. })));
}

#[test]
fn test_serial_dispatcher_rejects_after_runtime_shutdown() -> anyhow::Result<()> {
    // Arrange
    let runtime = tokio::runtime::Runtime::new()?;
    let dispatcher = SerialDispatcher::with_handle("short-lived", runtime.handle());

    // Act
    drop(runtime);
    let result = dispatcher.dispatch(Box::new(|| {}));

    // Assert
    assert!(matches!(result, Err(MergeError::Dispatch { .. })));

    Ok(())
}

// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use confluence_core::{Dispatcher, Environment, MergeError, SynchronousDispatcher, UNBOUNDED};
use std::sync::Arc;

#[test]
fn test_default_environment_is_synchronous_and_unbounded() {
    let env = Environment::default();

    assert_eq!(env.name(), "default");
    assert_eq!(env.capacity(), UNBOUNDED);
    assert_eq!(env.dispatcher().name(), "synchronous");
}

#[test]
fn test_builders_override_fields() {
    let dispatcher: Arc<dyn Dispatcher> = Arc::new(SynchronousDispatcher);
    let env = Environment::default()
        .with_name("orders")
        .with_capacity(32)
        .with_dispatcher(Arc::clone(&dispatcher));

    assert_eq!(env.name(), "orders");
    assert_eq!(env.capacity(), 32);
    assert!(Arc::ptr_eq(env.dispatcher(), &dispatcher));
}

#[test]
fn test_equality_tracks_dispatcher_identity() {
    let env = Environment::default().with_capacity(4);

    assert_eq!(env.clone(), env);
    assert_ne!(Environment::default(), Environment::default());
    assert_ne!(env.clone().with_capacity(5), env);
}

#[tokio::test]
async fn test_tokio_environment_inside_runtime() -> anyhow::Result<()> {
    // Act
    let env = Environment::tokio()?;

    // Assert
    assert_eq!(env.name(), "tokio");
    assert_eq!(env.dispatcher().name(), "tokio");
    assert_eq!(env.capacity(), UNBOUNDED);

    Ok(())
}

#[test]
fn test_tokio_environment_outside_runtime_fails() {
    let result = Environment::tokio();

    assert!(matches!(result, Err(MergeError::Dispatch { .. })));
}

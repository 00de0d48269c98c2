//! Tests for error types

use parallel_mapper::{MapError, ParallelMapper};
use std::error::Error as _;

#[test]
fn test_shutdown_error() {
    assert_eq!(MapError::Shutdown.to_string(), "mapper has been shut down");
}

#[test]
fn test_cancelled_error() {
    assert_eq!(
        MapError::Cancelled.to_string(),
        "map call cancelled while waiting for results"
    );
}

#[test]
fn test_internal_error() {
    let err = MapError::Internal("join failed".to_string());
    assert_eq!(err.to_string(), "internal error: join failed");
}

#[test]
fn test_computation_error_chain() {
    let mapper = ParallelMapper::with_workers(1).unwrap();
    let err = mapper
        .try_map(
            |x: u32| {
                if x >= 2 {
                    Err(std::io::Error::other(format!("io failure {x}")))
                } else {
                    Ok(x)
                }
            },
            0..4,
        )
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "computation failed: input 2 failed: io failure 2 (and 1 more error)"
    );

    // MapError -> AggregateError -> primary ComputationError -> io::Error
    let aggregate = err.source().expect("aggregate");
    let primary = aggregate.source().expect("primary");
    assert_eq!(primary.to_string(), "input 2 failed: io failure 2");
    let io = primary.source().expect("io error");
    assert_eq!(io.to_string(), "io failure 2");
}

#[test]
fn test_aggregate_into_parts() {
    let mapper = ParallelMapper::with_workers(1).unwrap();
    let err = mapper
        .try_map(|x: u8| Err::<u8, _>(anyhow::anyhow!("bad {x}")), vec![9, 8, 7])
        .unwrap_err();
    let MapError::Computation(aggregate) = err else {
        panic!("expected computation error");
    };
    let (primary, secondary) = aggregate.into_parts();
    assert_eq!(primary.index(), 0);
    assert_eq!(secondary.len(), 2);
}

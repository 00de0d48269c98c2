//! Tests for map outcomes

use parallel_mapper::{MapError, MapOutcome};

#[test]
fn test_complete_outcome() {
    let outcome = MapOutcome::Complete(vec![1, 2, 3]);
    assert!(outcome.is_complete());
    assert_eq!(outcome.len(), 3);
    assert_eq!(outcome.completed(), 3);
    assert_eq!(outcome.clone().into_slots(), vec![Some(1), Some(2), Some(3)]);
    assert_eq!(outcome.into_complete().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_partial_outcome() {
    let outcome: MapOutcome<&str> = MapOutcome::Partial(vec![None, Some("b"), None, None]);
    assert!(!outcome.is_complete());
    assert!(!outcome.is_empty());
    assert_eq!(outcome.completed(), 1);
    assert!(matches!(
        outcome.into_complete(),
        Err(MapError::Closed {
            completed: 1,
            total: 4
        })
    ));
}

#[test]
fn test_empty_complete_outcome() {
    let outcome: MapOutcome<u8> = MapOutcome::Complete(Vec::new());
    assert!(outcome.is_empty());
    assert!(outcome.is_complete());
}

use std::sync::atomic::{AtomicBool, Ordering};

use handoff::guard::{observe_race, run_guarded_increment, run_unguarded_increment};
use handoff::marshal::{
    describe_by_reference, describe_by_value, nudge_by_reference, nudge_by_value,
};
use handoff::{
    BoundaryError, CopyProbe, OwnedObject, Record, invoke_with_callback, print_by_value,
    print_by_view,
};
use handoff_abi::object_abi::{
    HANDOFF_STATE_RELEASED, handoff_object_set_counter, handoff_object_state,
};
use handoff_abi::object_registry;
use handoff_membrane::global_metrics;

static TEST_GUARD_HELD: AtomicBool = AtomicBool::new(false);

struct TestGuard;

impl Drop for TestGuard {
    fn drop(&mut self) {
        TEST_GUARD_HELD.store(false, Ordering::Release);
    }
}

fn acquire_test_guard() -> TestGuard {
    loop {
        if TEST_GUARD_HELD
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return TestGuard;
        }
        std::thread::yield_now();
    }
}

#[test]
fn double_value_wraps_across_the_range() {
    for x in (i32::MIN..=i32::MAX).step_by(65_537) {
        assert_eq!(handoff::marshal::double_value(x), x.wrapping_mul(2));
    }
    assert_eq!(handoff::marshal::double_value(i32::MIN), 0);
}

#[test]
fn by_value_and_by_reference_differ_only_in_mode() {
    let record = Record::new(-4, 9);
    assert_eq!(
        describe_by_value(record).unwrap(),
        "record by value: x=-4, y=9"
    );
    assert_eq!(
        describe_by_reference(&record).unwrap(),
        "record by reference: x=-4, y=9"
    );

    let mut original = Record::new(1, 1);
    let _ = nudge_by_value(original);
    assert_eq!(original, Record::new(1, 1));
    nudge_by_reference(&mut original).unwrap();
    assert_eq!(original, Record::new(2, 1));
}

#[test]
fn callback_fires_once_before_return() {
    let _guard = acquire_test_guard();
    let mut counter = 0;
    invoke_with_callback(|value| {
        assert_eq!(value, 42);
        counter += 1;
    })
    .unwrap();
    assert_eq!(counter, 1);
}

#[test]
fn owned_object_round() {
    let _guard = acquire_test_guard();
    let before = global_metrics().snapshot();

    let mut obj = OwnedObject::create().unwrap();
    assert_eq!(obj.counter(), Ok(1));
    obj.set_counter(5).unwrap();
    let lines = obj.say_hello().unwrap();
    assert_eq!(lines.len(), 5);
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(line, &format!("Hello from native object run ({i})"));
    }
    obj.release().unwrap();

    let delta = global_metrics().snapshot().since(&before);
    assert_eq!(delta.objects_created, 1);
    assert_eq!(delta.objects_destroyed, 1);
    assert_eq!(delta.releases, 1);
}

#[test]
fn end_of_scope_destroys_exactly_once() {
    let _guard = acquire_test_guard();
    let before = global_metrics().snapshot();
    let live_before = object_registry().len();

    {
        let first = OwnedObject::create().unwrap();
        let _second = OwnedObject::create().unwrap();
        assert_eq!(object_registry().len(), live_before + 2);
        drop(first);
        assert_eq!(object_registry().len(), live_before + 1);
    }
    assert_eq!(object_registry().len(), live_before);

    let delta = global_metrics().snapshot().since(&before);
    assert_eq!(delta.objects_created, 2);
    assert_eq!(delta.objects_destroyed, 2);
}

#[test]
fn copied_handle_faults_after_release() {
    let _guard = acquire_test_guard();
    let obj = OwnedObject::create().unwrap();
    let handle = obj.handle();
    obj.release().unwrap();

    assert_eq!(handoff_object_state(handle.as_raw()), HANDOFF_STATE_RELEASED);
    let rc = handoff_object_set_counter(handle.as_raw(), 1);
    assert_eq!(
        BoundaryError::from_errno(rc, handle),
        BoundaryError::UseAfterRelease { handle }
    );
}

#[test]
fn construction_callback_and_rollback() {
    let _guard = acquire_test_guard();
    let before = global_metrics().snapshot();

    let mut seen = 0;
    let obj = OwnedObject::create_with(|value| {
        assert_eq!(value, 42);
        seen += 1;
    })
    .unwrap();
    assert_eq!(seen, 1);
    drop(obj);

    let err = OwnedObject::try_create_with(|_| false).unwrap_err();
    assert_eq!(err.contract(), "callback-failed");

    let panicked = std::panic::catch_unwind(|| {
        let _ = OwnedObject::create_with(|_| panic!("constructor hook failed"));
    });
    assert!(panicked.is_err());

    let delta = global_metrics().snapshot().since(&before);
    assert_eq!(delta.objects_created, 3);
    assert_eq!(delta.objects_destroyed, 3);
    assert_eq!(delta.callbacks_dispatched, 3);
}

#[test]
fn ownership_handoff_reclaims_once() {
    let _guard = acquire_test_guard();
    let before = global_metrics().snapshot();

    let mut obj = OwnedObject::create().unwrap();
    obj.set_counter(4).unwrap();
    let handle = obj.into_raw().unwrap();

    let back = OwnedObject::from_raw(handle).unwrap();
    assert_eq!(back.counter(), Ok(4));
    assert_eq!(
        OwnedObject::from_raw(handle).unwrap_err(),
        BoundaryError::OwnershipConflict { handle }
    );
    drop(back);

    let delta = global_metrics().snapshot().since(&before);
    assert_eq!(delta.transfers, 2);
    assert_eq!(delta.ownership_conflicts, 1);
    assert_eq!(delta.live_objects(), 0);
}

#[test]
fn guarded_counter_is_exact() {
    for _ in 0..3 {
        assert_eq!(run_guarded_increment(3, 100_000), Ok(300_000));
    }
}

#[test]
fn unguarded_counter_is_bounded() {
    let value = run_unguarded_increment(3, 100_000).unwrap();
    assert!(value > 0 && value <= 300_000, "{value}");
    assert!(observe_race(3, 100_000).unwrap().within_bounds());
}

#[test]
fn views_never_copy() {
    let probe = CopyProbe::new("Hello World");
    for _ in 0..3 {
        assert_eq!(print_by_view(&probe), "Hello World");
    }
    assert_eq!(probe.copies(), 0);
    assert_eq!(print_by_value(probe.clone()), "Hello World");
    assert_eq!(probe.copies(), 1);
}

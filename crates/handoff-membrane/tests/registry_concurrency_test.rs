use std::collections::HashSet;

use handoff_membrane::{
    BoundaryError, HandleRegistry, HandleState, ObjectHandle, Owner, RegistryConfig,
};

fn churn(registry: &HandleRegistry<u64>, threads: u64, rounds: u64) -> Vec<ObjectHandle> {
    std::thread::scope(|scope| {
        let workers: Vec<_> = (0..threads)
            .map(|worker| {
                scope.spawn(move || {
                    let mut released = Vec::new();
                    for round in 0..rounds {
                        let value = worker * 1_000_000 + round;
                        let handle = registry.insert(value, Owner::Host);
                        assert_eq!(registry.with(handle, |v| *v), Ok(value));
                        assert_eq!(registry.remove(handle), Ok(value));
                        released.push(handle);
                    }
                    released
                })
            })
            .collect();
        workers
            .into_iter()
            .flat_map(|w| w.join().unwrap_or_default())
            .collect()
    })
}

#[test]
fn concurrent_churn_leaves_every_handle_stale() {
    for config in [RegistryConfig::strict(), RegistryConfig::hardened(8)] {
        let registry = HandleRegistry::new(config);
        let released = churn(&registry, 4, 500);

        assert_eq!(released.len(), 2_000);
        assert!(registry.is_empty());

        let unique: HashSet<_> = released.iter().copied().collect();
        assert_eq!(unique.len(), released.len(), "handle minted twice");

        for handle in released {
            assert_eq!(registry.state(handle), HandleState::Released);
            assert_eq!(
                registry.with_mut(handle, |v| *v += 1),
                Err(BoundaryError::UseAfterRelease { handle })
            );
        }
    }
}

#[test]
fn hardened_quarantine_is_bounded() {
    let registry = HandleRegistry::new(RegistryConfig::hardened(3));
    let handles: Vec<_> = (0..10_u64).map(|v| registry.insert(v, Owner::Native)).collect();
    for handle in &handles {
        registry.remove(*handle).unwrap();
        assert!(registry.quarantined() <= 3);
    }
    assert_eq!(registry.quarantined(), 3);
    assert!(registry.is_empty());
}

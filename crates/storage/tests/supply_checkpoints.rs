use kaia_storage::{MemoryStorage, SledStorage, SupplyCheckpoint, SupplyStore};
use tempfile::TempDir;

fn exercise_store<S: SupplyStore>(storage: &S) {
    assert_eq!(storage.read_last_supply_checkpoint_number().unwrap(), None);
    assert_eq!(storage.read_supply_checkpoint(0).unwrap(), None);

    let genesis = SupplyCheckpoint::new(10_000_000_000_000_000_000_000_000_000, 0);
    let later = SupplyCheckpoint::new(genesis.minted + 128 * 6_400_000_000_000_000_000, 42);
    storage.write_supply_checkpoint(0, &genesis).unwrap();
    storage.write_supply_checkpoint(128, &later).unwrap();
    storage.write_last_supply_checkpoint_number(128).unwrap();

    assert_eq!(storage.read_supply_checkpoint(0).unwrap(), Some(genesis));
    assert_eq!(storage.read_supply_checkpoint(128).unwrap(), Some(later));
    assert_eq!(storage.read_supply_checkpoint(64).unwrap(), None);
    assert_eq!(storage.read_last_supply_checkpoint_number().unwrap(), Some(128));

    // Rewinding the pointer leaves records above it in place.
    storage.write_last_supply_checkpoint_number(0).unwrap();
    assert_eq!(storage.read_last_supply_checkpoint_number().unwrap(), Some(0));
    assert_eq!(storage.read_supply_checkpoint(128).unwrap(), Some(later));
}

#[test]
fn memory_storage_round_trips_checkpoints() {
    exercise_store(&MemoryStorage::new());
}

#[test]
fn sled_storage_round_trips_checkpoints() {
    let dir = TempDir::new().unwrap();
    let storage = SledStorage::new(dir.path()).unwrap();
    exercise_store(&storage);
}

#[test]
fn sled_storage_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let storage = SledStorage::new(dir.path()).unwrap();
        storage
            .write_supply_checkpoint(256, &SupplyCheckpoint::new(5, 3))
            .unwrap();
        storage.write_last_supply_checkpoint_number(256).unwrap();
        storage.flush().unwrap();
    }

    let storage = SledStorage::new(dir.path()).unwrap();
    assert_eq!(storage.read_last_supply_checkpoint_number().unwrap(), Some(256));
    assert_eq!(
        storage.read_supply_checkpoint(256).unwrap(),
        Some(SupplyCheckpoint::new(5, 3))
    );
}

use simfs::{Filesystem, Flusher, FsConfig, FsError, Identity, Mode, Store, UserDb, VfsPath};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn path(s: &str) -> VfsPath {
    VfsPath::parse(s).unwrap()
}

fn store() -> (TempDir, Store) {
    let dir = TempDir::new().unwrap();
    let store = Store::create(dir.path()).unwrap();

    (dir, store)
}

fn top_level(fs: &Filesystem) -> Vec<String> {
    fs.list(&VfsPath::root(), &Identity::root())
        .unwrap()
        .into_iter()
        .map(|entry| entry.name)
        .collect()
}

#[test]
fn save_then_boot() {
    let (_dir, store) = store();
    let config = FsConfig::default();
    let root = Identity::root();

    let fs = Filesystem::new(&config);

    fs.mkdir(&path("/etc/app"), Mode::new(0o750), &root).unwrap();
    fs.touch(&path("/etc/app/conf"), Mode::new(0o600), &root)
        .unwrap();
    fs.write(&path("/etc/app/conf"), b"key = value\n", &root)
        .unwrap();
    fs.chown(&path("/etc/app"), 1000, None, &root).unwrap();

    store.save(&fs).unwrap();

    let booted = store.boot(&config);

    assert_eq!(booted.snapshot().unwrap(), fs.snapshot().unwrap());
    assert_eq!(booted.usage(), fs.usage());
    assert_eq!(
        booted.read(&path("/etc/app/conf"), &root).unwrap(),
        b"key = value\n"
    );

    let app = booted.lookup(&path("/etc/app"), &root).unwrap();

    assert_eq!(app.uid, 1000);
    assert_eq!(app.gid, 0);
    assert_eq!(app.mode, Mode::new(0o750));
}

#[test]
fn boot_without_snapshot_starts_fresh() {
    let (_dir, store) = store();
    let fs = store.boot(&FsConfig::default());

    assert_eq!(top_level(&fs), FsConfig::TOP_LEVEL_DIRS);
    assert_eq!(fs.usage().0, 0);
}

#[test]
fn boot_with_corrupted_snapshot_starts_fresh() {
    let (dir, store) = store();

    fs::write(dir.path().join("fs.json"), b"{\"version\": 2, \"root\": ").unwrap();

    let fs = store.boot(&FsConfig::default());

    assert_eq!(top_level(&fs), FsConfig::TOP_LEVEL_DIRS);
    assert!(matches!(
        fs.lookup(&path("/etc/app"), &Identity::root()),
        Err(FsError::NotFound(_))
    ));
}

#[test]
fn corrupted_snapshot_is_set_aside() {
    let (dir, store) = store();
    let corrupted = b"{\"version\": 2, \"capacity\": 1024, \"root\": ";

    fs::write(dir.path().join("fs.json"), corrupted).unwrap();

    let fs = store.boot(&FsConfig::default());
    store.save(&fs).unwrap();

    assert_eq!(
        fs::read(dir.path().join("fs.json.discarded")).unwrap(),
        corrupted
    );
    assert!(store.boot(&FsConfig::default()).snapshot().is_ok());
}

#[test]
fn capacity_is_fixed_at_creation() {
    let (_dir, store) = store();
    let root = Identity::root();

    let fs = Filesystem::new(&FsConfig::default().with_capacity(2048));

    fs.touch(&path("/var/log"), Mode::FILE_DEFAULT, &root).unwrap();
    fs.write(&path("/var/log"), &[b'x'; 1024], &root).unwrap();
    store.save(&fs).unwrap();

    let booted = store.boot(&FsConfig::default().with_capacity(512));

    assert_eq!(booted.usage(), (1024, 2048));
    assert_eq!(booted.read(&path("/var/log"), &root).unwrap().len(), 1024);

    // flushing the rebooted namespace mustn't lose anything either
    store.save(&booted).unwrap();

    let rebooted = store.boot(&FsConfig::default());

    assert_eq!(rebooted.usage(), (1024, 2048));
    assert!(rebooted.lookup(&path("/var/log"), &root).is_ok());
}

#[test]
fn failed_save_keeps_previous_snapshot() {
    let (dir, store) = store();
    let config = FsConfig::default();

    let fs = Filesystem::new(&config);
    fs.mkdir(&path("/opt/v1"), Mode::DIR_DEFAULT, &Identity::root())
        .unwrap();
    store.save(&fs).unwrap();

    // a directory squatting on the temporary file's name makes the next
    // flush fail before anything is renamed
    fs::create_dir(dir.path().join(".fs.json.tmp")).unwrap();

    fs.mkdir(&path("/opt/v2"), Mode::DIR_DEFAULT, &Identity::root())
        .unwrap();
    assert!(store.save(&fs).is_err());

    let booted = store.boot(&config);

    assert!(booted.lookup(&path("/opt/v1"), &Identity::root()).is_ok());
    assert!(booted.lookup(&path("/opt/v2"), &Identity::root()).is_err());
}

#[test]
fn users_survive_restart() {
    let (_dir, store) = store();

    assert_eq!(store.load_users(), UserDb::default());

    let mut users = UserDb::default();
    users.add_user("alice", None, Some("hunter2")).unwrap();
    store.save_users(&users).unwrap();

    let loaded = store.load_users();

    assert_eq!(loaded, users);
    assert_eq!(loaded.authenticate("alice", "hunter2").unwrap().uid, 1000);
}

#[test]
fn flusher_checkpoints_on_stop() {
    let (_dir, store) = store();
    let config = FsConfig::default();
    let fs = Arc::new(Filesystem::new(&config));

    let flusher = Flusher::spawn(Arc::clone(&fs), store.clone(), Duration::from_secs(3600));

    fs.mkdir(&path("/mnt/usb"), Mode::DIR_DEFAULT, &Identity::root())
        .unwrap();

    flusher.stop();

    let booted = store.boot(&config);

    assert!(booted.lookup(&path("/mnt/usb"), &Identity::root()).is_ok());
}

#[test]
fn flusher_checkpoints_periodically() {
    let (_dir, store) = store();
    let config = FsConfig::default();
    let fs = Arc::new(Filesystem::new(&config));

    fs.mkdir(&path("/mnt/usb"), Mode::DIR_DEFAULT, &Identity::root())
        .unwrap();

    let _flusher = Flusher::spawn(Arc::clone(&fs), store.clone(), Duration::from_millis(10));

    let mut flushed = false;

    for _ in 0..200 {
        std::thread::sleep(Duration::from_millis(10));

        if store.boot(&config).lookup(&path("/mnt/usb"), &Identity::root()).is_ok() {
            flushed = true;
            break;
        }
    }

    assert!(flushed);
}

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use slotpool::{BuildError, Pool};

struct Conn {
    dropped: Arc<AtomicUsize>,
}

impl Drop for Conn {
    fn drop(&mut self) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
struct Manager {
    created: Arc<AtomicUsize>,
    fail_at: Option<usize>,
    dropped: Arc<AtomicUsize>,
}

impl Manager {
    fn new(fail_at: Option<usize>) -> Self {
        Self {
            created: Arc::new(AtomicUsize::new(0)),
            fail_at,
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl slotpool::Manager for Manager {
    type Type = Conn;
    type Error = &'static str;

    fn create(&self) -> Result<Conn, &'static str> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        if Some(n) == self.fail_at {
            Err("connection refused")
        } else {
            Ok(Conn {
                dropped: self.dropped.clone(),
            })
        }
    }
}

#[test]
fn create_once_per_slot() {
    let manager = Manager::new(None);
    let pool = Pool::builder(manager.clone()).max_size(5).build().unwrap();

    assert_eq!(manager.created.load(Ordering::SeqCst), 5);
    assert_eq!(pool.size(), 5);
    assert_eq!(pool.status().available, 5);
}

#[test]
fn create_failure_aborts_build() {
    let manager = Manager::new(Some(2));
    let result = Pool::builder(manager.clone()).max_size(4).build();

    match result {
        Err(BuildError::Backend { index, source }) => {
            assert_eq!(index, 2);
            assert_eq!(source, "connection refused");
        }
        other => panic!("unexpected result: {:?}", other.map(|p| p.size())),
    }
    // Nothing is created past the failure and nothing created before it
    // survives.
    assert_eq!(manager.created.load(Ordering::SeqCst), 3);
    assert_eq!(manager.dropped.load(Ordering::SeqCst), 2);
}

#[test]
fn zero_size_is_rejected() {
    let manager = Manager::new(None);
    let result = Pool::builder(manager.clone()).max_size(0).build();

    assert!(matches!(result, Err(BuildError::InvalidSize)));
    assert_eq!(manager.created.load(Ordering::SeqCst), 0);
}

#[test]
fn empty_object_list_is_rejected() {
    let result = Pool::<String>::from_objects(Vec::new());
    assert!(matches!(result, Err(BuildError::InvalidSize)));
}

#[test]
fn teardown_drops_leased_objects_too() {
    let manager = Manager::new(None);
    let pool = Pool::builder(manager.clone()).max_size(3).build().unwrap();

    let _a = pool.acquire();
    let _b = pool.acquire();
    assert_eq!(pool.status().leased, 2);

    drop(pool);
    assert_eq!(manager.dropped.load(Ordering::SeqCst), 3);
}

#[test]
fn closures_are_managers() {
    let pool = Pool::builder(|| Ok::<_, std::io::Error>(Vec::<u8>::new()))
        .max_size(2)
        .build()
        .unwrap();
    assert_eq!(pool.size(), 2);
}

#[test]
fn build_error_display() {
    let err = BuildError::Backend {
        index: 1,
        source: "connection refused",
    };
    assert_eq!(
        err.to_string(),
        "Error occurred while creating the object for slot 1: connection refused"
    );
    assert_eq!(
        BuildError::<&str>::InvalidSize.to_string(),
        "Pool size must be at least 1"
    );
}

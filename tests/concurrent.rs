use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    thread,
    time::Duration,
};

use slotpool::Pool;

const ITERATIONS: usize = 500;

/// One flag per slot, flipped while a thread believes it owns the slot.
struct Ownership {
    held: Vec<AtomicBool>,
    overlaps: AtomicUsize,
}

impl Ownership {
    fn new(size: usize) -> Self {
        Self {
            held: (0..size).map(|_| AtomicBool::new(false)).collect(),
            overlaps: AtomicUsize::new(0),
        }
    }

    fn enter(&self, index: usize) {
        if self.held[index].swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn leave(&self, index: usize) {
        if !self.held[index].swap(false, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[test]
fn no_two_threads_hold_the_same_slot() {
    let pool = Pool::from_objects(vec![AtomicUsize::new(0), AtomicUsize::new(0)]).unwrap();
    let ownership = Ownership::new(2);
    let workers = 8;

    thread::scope(|s| {
        for _ in 0..workers {
            let _ = s.spawn(|| {
                for _ in 0..ITERATIONS {
                    let index = pool.acquire();
                    ownership.enter(index);
                    pool.at(index).unwrap().fetch_add(1, Ordering::Relaxed);
                    thread::yield_now();
                    ownership.leave(index);
                    pool.release(index).unwrap();
                }
            });
        }
    });

    assert_eq!(ownership.overlaps.load(Ordering::SeqCst), 0);
    let total: usize = (0..2)
        .map(|i| pool.at(i).unwrap().load(Ordering::Relaxed))
        .sum();
    assert_eq!(total, workers * ITERATIONS);
    assert_eq!(pool.status().available, 2);
}

#[test]
fn mixed_acquire_styles_keep_ownership_disjoint() {
    let pool = Pool::from_objects(vec![(), ()]).unwrap();
    let ownership = Ownership::new(2);

    thread::scope(|s| {
        for worker in 0..6_usize {
            let pool = &pool;
            let ownership = &ownership;
            let _ = s.spawn(move || {
                for i in 0..ITERATIONS {
                    let index = match (worker + i) % 3 {
                        0 => Some(pool.acquire()),
                        1 => pool.try_acquire(Duration::from_millis(1)),
                        _ => {
                            let target = worker % 2;
                            pool.try_acquire_at(target, Duration::from_millis(1))
                                .unwrap()
                                .then_some(target)
                        }
                    };
                    if let Some(index) = index {
                        ownership.enter(index);
                        thread::yield_now();
                        ownership.leave(index);
                        pool.release(index).unwrap();
                    }
                }
            });
        }
    });

    assert_eq!(ownership.overlaps.load(Ordering::SeqCst), 0);
    let status = pool.status();
    assert_eq!(status.available, 2);
    assert_eq!(status.waiting, 0);
    assert_eq!(pool.metrics().contract_violations(), 0);
}

#[test]
fn guards_keep_ownership_disjoint() {
    let pool = Pool::from_objects(vec![(), (), ()]).unwrap();
    let ownership = Ownership::new(3);

    thread::scope(|s| {
        for _ in 0..8 {
            let _ = s.spawn(|| {
                for _ in 0..ITERATIONS {
                    let obj = pool.get().unwrap();
                    let index = slotpool::Object::index(&obj);
                    ownership.enter(index);
                    thread::yield_now();
                    ownership.leave(index);
                }
            });
        }
    });

    assert_eq!(ownership.overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(pool.status().available, 3);
}

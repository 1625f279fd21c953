use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use shared_handle::SharedPtr;

struct DropCounter(&'static AtomicUsize);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn drop_counter() -> &'static AtomicUsize {
    Box::leak(Box::new(AtomicUsize::new(0)))
}

#[test]
fn create_with_obj_parallel_copy() {
    let pointer = SharedPtr::new(1usize);

    let mut first = Vec::with_capacity(222);
    let mut second = Vec::with_capacity(333);

    thread::scope(|s| {
        s.spawn(|| {
            while first.len() < 222 {
                first.push(pointer.clone());
            }
        });
        s.spawn(|| {
            while second.len() < 333 {
                second.push(pointer.clone());
            }
        });
    });

    assert_eq!(pointer.use_count(), first.len() + second.len() + 1);

    second.clear();
    assert_eq!(pointer.use_count(), first.len() + 1);

    first.clear();
    assert_eq!(pointer.use_count(), 1);
}

#[test]
fn racing_releases_destroy_once() {
    for _ in 0..200 {
        let drops = drop_counter();
        let root = SharedPtr::new(DropCounter(drops));
        let clones : Vec<_> = (0..8).map(|_| root.clone()).collect();
        drop(root);

        thread::scope(|s| {
            for clone in clones {
                s.spawn(move || drop(clone));
            }
        });

        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}

#[test]
fn clone_and_drop_churn_keeps_count() {
    let drops = drop_counter();
    let root = SharedPtr::new(DropCounter(drops));

    thread::scope(|s| {
        for _ in 0..4 {
            let root = &root;
            s.spawn(move || {
                let mut held = Vec::new();
                for i in 0..1000 {
                    held.push(root.clone());
                    assert!(root.use_count() >= 2);
                    if i % 3 == 0 {
                        held.clear();
                    }
                }
            });
        }
    });

    assert_eq!(root.use_count(), 1);
    assert_eq!(drops.load(Ordering::SeqCst), 0);
    drop(root);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn resets_on_separate_handles_race() {
    let drops = drop_counter();
    let root = SharedPtr::new(DropCounter(drops));
    let handles : Vec<_> = (0..6).map(|_| root.clone()).collect();
    drop(root);

    thread::scope(|s| {
        for mut handle in handles {
            s.spawn(move || {
                let extra = handle.clone();
                handle.reset();
                assert!(handle.is_empty());
                drop(extra);
            });
        }
    });

    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

//! A single-producer observer primitive with lazy compaction.
//!
//! Callbacks register with [`Observable::add_observer`] and are invoked in
//! insertion order on every [`Observable::notify`]. Removal goes through the
//! returned handle and only flips a shared tombstone, so removing an
//! observer from within its own callback is legal; the slot is reclaimed
//! lazily once stale entries pile up. [`SyncObservable`] is the same with a
//! read-write lock and atomic tombstones, safe to share between threads.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

const TOMBSTONE: isize = -1;

struct Slot<T> {
    ix: Rc<Cell<isize>>,
    observer: Box<dyn Fn(&T)>,
}

/// An observable value for single-threaded use.
pub struct Observable<T> {
    observers: RefCell<Vec<Slot<T>>>,
    removed: Rc<Cell<usize>>,
}

/// Allows removing a callback from the [`Observable`] it was added to.
pub struct ObserverHandle {
    ix: Rc<Cell<isize>>,
    removed: Rc<Cell<usize>>,
}

impl ObserverHandle {
    /// Removes the underlying callback. Subsequent notifications will skip
    /// it; calling this more than once has no further effect.
    pub fn remove_observer(&self) {
        if self.ix.get() != TOMBSTONE {
            self.ix.set(TOMBSTONE);
            self.removed.set(self.removed.get() + 1);
        }
    }
}

impl<T> Observable<T> {
    pub fn new() -> Self {
        Observable {
            observers: RefCell::new(Vec::new()),
            removed: Rc::new(Cell::new(0)),
        }
    }

    /// Adds a new callback, returning the handle that removes it.
    pub fn add_observer(&self, observer: impl Fn(&T) + 'static) -> ObserverHandle {
        let mut observers = self.observers.borrow_mut();
        let ix = Rc::new(Cell::new(observers.len() as isize));
        observers.push(Slot {
            ix: ix.clone(),
            observer: Box::new(observer),
        });
        ObserverHandle {
            ix,
            removed: self.removed.clone(),
        }
    }

    /// Executes all live callbacks with the provided data, in insertion
    /// order. Callbacks removed mid-notification are skipped for the rest
    /// of it.
    pub fn notify(&self, data: &T) {
        self.fit_to_size();
        let observers = self.observers.borrow();
        for slot in observers.iter() {
            if slot.ix.get() != TOMBSTONE {
                (slot.observer)(data);
            }
        }
    }

    fn fit_to_size(&self) {
        if self.removed.get() == 0 {
            return;
        }
        let mut observers = self.observers.borrow_mut();
        observers.retain(|slot| slot.ix.get() != TOMBSTONE);
        for (ix, slot) in observers.iter().enumerate() {
            slot.ix.set(ix as isize);
        }
        self.removed.set(0);
    }
}

impl<T> Default for Observable<T> {
    fn default() -> Self {
        Observable::new()
    }
}

struct SyncSlot<T> {
    ix: Arc<AtomicIsize>,
    observer: Box<dyn Fn(&T) + Send + Sync>,
}

/// An observable value that can be used safely from multiple threads.
pub struct SyncObservable<T> {
    observers: RwLock<Vec<SyncSlot<T>>>,
    removed: Arc<AtomicUsize>,
}

/// Allows removing a callback from the [`SyncObservable`] it was added to.
pub struct SyncObserverHandle {
    ix: Arc<AtomicIsize>,
    removed: Arc<AtomicUsize>,
}

impl SyncObserverHandle {
    /// Removes the underlying callback. Only touches the shared tombstone,
    /// so it can be called from within the callback itself without
    /// deadlocking.
    pub fn remove_observer(&self) {
        if self.ix.swap(TOMBSTONE, Ordering::AcqRel) != TOMBSTONE {
            self.removed.fetch_add(1, Ordering::AcqRel);
        }
    }
}

impl<T> SyncObservable<T> {
    pub fn new() -> Self {
        SyncObservable {
            observers: RwLock::new(Vec::new()),
            removed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Adds a new callback, returning the handle that removes it.
    pub fn add_observer(
        &self,
        observer: impl Fn(&T) + Send + Sync + 'static,
    ) -> SyncObserverHandle {
        let mut observers = self.observers.write().unwrap();
        let ix = Arc::new(AtomicIsize::new(observers.len() as isize));
        observers.push(SyncSlot {
            ix: ix.clone(),
            observer: Box::new(observer),
        });
        SyncObserverHandle {
            ix,
            removed: self.removed.clone(),
        }
    }

    /// Executes all live callbacks with the provided data, in insertion
    /// order. Stale slots are compacted before notification when any have
    /// accumulated.
    pub fn notify(&self, data: &T) {
        if self.removed.load(Ordering::Acquire) > 0 {
            self.fit_to_size();
        }
        let observers = self.observers.read().unwrap();
        for slot in observers.iter() {
            if slot.ix.load(Ordering::Acquire) != TOMBSTONE {
                (slot.observer)(data);
            }
        }
    }

    fn fit_to_size(&self) {
        let mut observers = self.observers.write().unwrap();
        observers.retain(|slot| slot.ix.load(Ordering::Acquire) != TOMBSTONE);
        for (ix, slot) in observers.iter().enumerate() {
            slot.ix.store(ix as isize, Ordering::Release);
        }
        self.removed.store(0, Ordering::Release);
    }
}

impl<T> Default for SyncObservable<T> {
    fn default() -> Self {
        SyncObservable::new()
    }
}

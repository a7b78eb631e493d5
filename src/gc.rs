//! Mark-and-sweep garbage collection for object graphs.
//!
//! Objects live in reference-counted boxes. A collection cycle finds the
//! objects that are still referenced from outside the heap (Rust locals,
//! guards, realm fields) by subtracting the heap-internal edges reported by
//! [`Traceable::trace`] from each box's strong count, marks everything
//! reachable from those roots, and resets the rest. Resetting drops the
//! references a dead object holds, which breaks cycles so the boxes are freed.

use std::any::Any;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use hashbrown::{HashMap, HashSet};
use rustc_hash::FxHashMap;

// ============================================================================
// Gc - shared handle to a heap object
// ============================================================================

/// A smart pointer to a GC-managed object.
///
/// Cloning is cheap (a reference count increment). Identity is the object id,
/// which is never reused within one heap.
pub struct Gc<T> {
    inner: Rc<GcBox<T>>,
}

struct GcBox<T> {
    /// Unique object ID (allocation order within the heap)
    id: usize,
    data: RefCell<T>,
    /// Cleared when the collector reclaims the object
    alive: Cell<bool>,
}

impl<T> Gc<T> {
    /// Borrow the inner data immutably
    pub fn borrow(&self) -> Ref<'_, T> {
        self.inner.data.borrow()
    }

    /// Borrow the inner data mutably
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.inner.data.borrow_mut()
    }

    /// Borrow immutably unless the object is currently borrowed mutably
    pub fn try_borrow(&self) -> Option<Ref<'_, T>> {
        self.inner.data.try_borrow().ok()
    }

    /// Get the object's unique ID
    pub fn id(&self) -> usize {
        self.inner.id
    }

    /// Check if two Gc pointers point to the same object
    pub fn ptr_eq(a: &Gc<T>, b: &Gc<T>) -> bool {
        a.inner.id == b.inner.id
    }

    /// False once the collector has reclaimed the object. A reclaimed object
    /// has been reset and must not be used for anything but identity.
    pub fn is_alive(&self) -> bool {
        self.inner.alive.get()
    }

    /// Create a weak handle that does not keep the object alive.
    pub fn downgrade(&self) -> WeakGc<T> {
        WeakGc {
            id: self.inner.id,
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl<T> Clone for Gc<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for Gc<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<T> Eq for Gc<T> {}

impl<T> std::hash::Hash for Gc<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl<T> std::fmt::Debug for Gc<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gc").field("id", &self.inner.id).finish()
    }
}

// ============================================================================
// WeakGc / WeakRegistry - ephemeral observation without ownership
// ============================================================================

/// A weak handle. Upgrading fails once the object has been reclaimed, even
/// if some stale strong handle still keeps the box itself allocated.
pub struct WeakGc<T> {
    id: usize,
    inner: Weak<GcBox<T>>,
}

impl<T> WeakGc<T> {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn upgrade(&self) -> Option<Gc<T>> {
        let inner = self.inner.upgrade()?;
        if !inner.alive.get() {
            return None;
        }
        Some(Gc { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.alive.get())
    }
}

impl<T> Clone for WeakGc<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for WeakGc<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakGc").field("id", &self.id).finish()
    }
}

/// Side table keyed by object identity.
///
/// Entries never keep their key object alive; every read checks liveness and
/// dead entries are dropped lazily or by [`WeakRegistry::prune`].
pub struct WeakRegistry<T, V> {
    entries: FxHashMap<usize, (WeakGc<T>, V)>,
}

impl<T, V> WeakRegistry<T, V> {
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    pub fn insert(&mut self, key: &Gc<T>, value: V) -> Option<V> {
        self.entries
            .insert(key.id(), (key.downgrade(), value))
            .map(|(_, old)| old)
    }

    /// Look up the value for a live key.
    pub fn get(&self, key: &Gc<T>) -> Option<&V> {
        match self.entries.get(&key.id()) {
            Some((weak, value)) if weak.is_alive() => Some(value),
            _ => None,
        }
    }

    pub fn remove(&mut self, key: &Gc<T>) -> Option<V> {
        self.entries.remove(&key.id()).map(|(_, value)| value)
    }

    /// Drop entries whose key has been reclaimed. Returns how many were dropped.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, (weak, _)| weak.is_alive());
        before - self.entries.len()
    }

    /// Number of entries, including ones whose key died since the last prune
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T, V> Default for WeakRegistry<T, V> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Traceable / Reset - the contract heap objects implement
// ============================================================================

/// Trait for types that can be traced by the garbage collector.
///
/// Implementations report every `Gc<Self>` they own. Weak references must
/// not be reported.
pub trait Traceable: Sized {
    fn trace(&self, tracer: &mut Tracer<'_, Self>);
}

/// Release owned references before the object is reclaimed.
///
/// Called exactly once per dead object, possibly after other members of the
/// same dead cycle were already reset.
pub trait Reset {
    fn reset(&mut self);
}

enum TraceMode<'a, T> {
    /// Count heap-internal references per object id
    Count(&'a mut HashMap<usize, usize>),
    /// Push children onto the mark stack
    Mark(&'a mut Vec<Gc<T>>),
}

/// Edge visitor handed to [`Traceable::trace`].
pub struct Tracer<'a, T> {
    mode: TraceMode<'a, T>,
    shared_seen: &'a mut HashSet<usize>,
}

impl<T> Tracer<'_, T> {
    /// Report one owned reference.
    pub fn visit(&mut self, gc: &Gc<T>) {
        match &mut self.mode {
            TraceMode::Count(incoming) => {
                *incoming.entry(gc.id()).or_insert(0) += 1;
            }
            TraceMode::Mark(stack) => stack.push(gc.clone()),
        }
    }

    /// Report the edges of a node shared by many objects (such as a shape)
    /// exactly once per phase. `address` identifies the node. Returns false
    /// when the node was already reported.
    pub fn visit_shared(&mut self, address: usize, edges: impl FnOnce(&mut Self)) -> bool {
        if self.shared_seen.insert(address) {
            edges(self);
            return true;
        }
        false
    }
}

// ============================================================================
// Heap
// ============================================================================

/// Default threshold: collect after this many net allocations
pub const DEFAULT_GC_THRESHOLD: usize = 256;

struct Space<T> {
    boxes: Vec<Weak<GcBox<T>>>,
    next_id: usize,
    net_allocs: usize,
    gc_threshold: usize,
    collections: usize,
}

/// Statistics about the garbage collector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcStats {
    /// Objects still allocated and not yet reclaimed
    pub live_objects: usize,
    /// Completed collection cycles
    pub collections: usize,
    /// Objects ever allocated in this heap
    pub allocated_total: usize,
}

/// Owner of all objects of type `T` for one realm.
pub struct Heap<T> {
    inner: Rc<RefCell<Space<T>>>,
}

impl<T: Traceable + Reset> Heap<T> {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_GC_THRESHOLD)
    }

    pub fn with_threshold(gc_threshold: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Space {
                boxes: Vec::new(),
                next_id: 0,
                net_allocs: 0,
                gc_threshold,
                collections: 0,
            })),
        }
    }

    /// Allocate a new object. May run a collection first when the
    /// allocation threshold is reached.
    pub fn alloc(&self, data: T) -> Gc<T> {
        let should_collect = {
            let space = self.inner.borrow();
            space.gc_threshold > 0 && space.net_allocs >= space.gc_threshold
        };
        if should_collect {
            self.collect();
        }

        let mut space = self.inner.borrow_mut();
        let id = space.next_id;
        space.next_id += 1;
        space.net_allocs += 1;
        let inner = Rc::new(GcBox {
            id,
            data: RefCell::new(data),
            alive: Cell::new(true),
        });
        space.boxes.push(Rc::downgrade(&inner));
        Gc { inner }
    }

    /// Create a new guard rooting objects for as long as it lives
    pub fn create_guard(&self) -> Guard<T> {
        Guard {
            roots: RefCell::new(Vec::new()),
        }
    }

    /// Set the GC threshold (0 = disable automatic collection)
    pub fn set_gc_threshold(&self, threshold: usize) {
        self.inner.borrow_mut().gc_threshold = threshold;
    }

    pub fn stats(&self) -> GcStats {
        let space = self.inner.borrow();
        let live_objects = space
            .boxes
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|b| b.alive.get())
            .count();
        GcStats {
            live_objects,
            collections: space.collections,
            allocated_total: space.next_id,
        }
    }

    /// Run a full collection. Returns the number of reclaimed objects.
    ///
    /// Collection only happens at a safepoint: if any object is currently
    /// borrowed the cycle is skipped and 0 is returned.
    pub fn collect(&self) -> usize {
        let live: Vec<Rc<GcBox<T>>> = {
            let space = self.inner.borrow();
            space
                .boxes
                .iter()
                .filter_map(Weak::upgrade)
                .filter(|b| b.alive.get())
                .collect()
        };

        let marked = {
            let mut views = Vec::with_capacity(live.len());
            for gc_box in &live {
                match gc_box.data.try_borrow() {
                    Ok(data) => views.push(data),
                    Err(_) => {
                        log::debug!("gc: skipping collection, object {} is borrowed", gc_box.id);
                        return 0;
                    }
                }
            }

            // Count heap-internal references
            let mut incoming: HashMap<usize, usize> = HashMap::new();
            let mut shared_seen = HashSet::new();
            for data in &views {
                let mut tracer = Tracer {
                    mode: TraceMode::Count(&mut incoming),
                    shared_seen: &mut shared_seen,
                };
                data.trace(&mut tracer);
            }

            // Roots hold more strong references than the heap accounts for.
            // The `live` vector itself contributes one.
            let mut stack: Vec<Gc<T>> = live
                .iter()
                .filter(|b| {
                    let internal = incoming.get(&b.id).copied().unwrap_or(0);
                    Rc::strong_count(b).saturating_sub(1) > internal
                })
                .map(|b| Gc {
                    inner: Rc::clone(b),
                })
                .collect();

            let index_of: HashMap<usize, usize> =
                live.iter().enumerate().map(|(i, b)| (b.id, i)).collect();
            let mut marked: HashSet<usize> = HashSet::new();
            let mut shared_seen = HashSet::new();
            while let Some(gc) = stack.pop() {
                if !marked.insert(gc.id()) {
                    continue;
                }
                let Some(data) = index_of.get(&gc.id()).and_then(|&i| views.get(i)) else {
                    continue;
                };
                let mut tracer = Tracer {
                    mode: TraceMode::Mark(&mut stack),
                    shared_seen: &mut shared_seen,
                };
                data.trace(&mut tracer);
            }
            marked
        };

        let mut collected = 0;
        for gc_box in &live {
            if !marked.contains(&gc_box.id) {
                gc_box.alive.set(false);
                gc_box.data.borrow_mut().reset();
                collected += 1;
            }
        }
        drop(live);

        let mut space = self.inner.borrow_mut();
        space
            .boxes
            .retain(|w| w.upgrade().is_some_and(|b| b.alive.get()));
        space.net_allocs = 0;
        space.collections += 1;
        log::debug!(
            "gc: cycle {} reclaimed {} objects, {} remain",
            space.collections,
            collected,
            space.boxes.len()
        );
        collected
    }
}

impl<T: Traceable + Reset> Default for Heap<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Flat teardown
// ============================================================================

thread_local! {
    /// Parts released while a teardown is already running on this thread.
    /// `None` when no teardown is active.
    static PENDING_RELEASES: RefCell<Option<Vec<Box<dyn Any>>>> = const { RefCell::new(None) };
}

/// Drop `parts` without recursing through the objects they own.
///
/// A heap object's `Drop` moves its outgoing handles into one box and hands
/// it here. The outermost call drains a worklist; nested calls (a handle in
/// that box was the last one to its object) only enqueue, so dropping a long
/// chain uses constant native stack.
pub fn release_flat(parts: Box<dyn Any>) {
    let mut parts = Some(parts);
    let started = PENDING_RELEASES.try_with(|pending| {
        let mut pending = pending.borrow_mut();
        match pending.as_mut() {
            Some(queue) => {
                queue.extend(parts.take());
                false
            }
            None => {
                *pending = Some(Vec::new());
                true
            }
        }
    });
    // Not started: queued for the running teardown, or the thread is exiting
    // and `parts` is simply dropped here
    if started != Ok(true) {
        return;
    }
    drop(parts);
    loop {
        let next = PENDING_RELEASES
            .try_with(|pending| pending.borrow_mut().as_mut().and_then(Vec::pop))
            .ok()
            .flatten();
        match next {
            Some(parts) => drop(parts),
            None => break,
        }
    }
    let _ = PENDING_RELEASES.try_with(|pending| pending.borrow_mut().take());
}

// ============================================================================
// Guard - explicit root set
// ============================================================================

/// A root anchor that keeps objects alive until it is dropped or cleared.
pub struct Guard<T> {
    roots: RefCell<Vec<Gc<T>>>,
}

impl<T> Guard<T> {
    /// Add an existing object to this guard's roots.
    pub fn guard(&self, obj: &Gc<T>) {
        self.roots.borrow_mut().push(obj.clone());
    }

    /// Remove an object from this guard's roots.
    /// Returns true if the object was found and removed.
    pub fn unguard(&self, obj: &Gc<T>) -> bool {
        let mut roots = self.roots.borrow_mut();
        if let Some(pos) = roots.iter().position(|r| Gc::ptr_eq(r, obj)) {
            roots.swap_remove(pos);
            return true;
        }
        false
    }

    pub fn clear(&self) {
        self.roots.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.roots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.borrow().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Transactional memory cells
//!
//! A [`TCell`] is a typed handle to one versioned value. Handles are cheap to
//! clone and all clones refer to the same cell; identity is the cell, never
//! the value. The committed value can only change through a transaction
//! commit (see [`crate::TransactionManager::commit`]).

use parking_lot::RwLock;
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tinsel_core::{CellId, StmId, Version};

/// Committed value together with the version that wrote it
///
/// Kept under one lock so a reader always sees a matching pair.
struct Committed<T> {
    version: Version,
    value: T,
}

pub(crate) struct CellInner<T> {
    id: CellId,
    owner: StmId,
    slot: RwLock<Committed<T>>,
}

/// Type-erased view of a cell
///
/// Read sets, write sets and the manager's registry hold cells of many
/// payload types side by side through this trait.
pub(crate) trait VersionedCell: Send + Sync {
    fn id(&self) -> CellId;

    fn version(&self) -> Version;

    /// Install a staged value. Returns false if the payload type does not
    /// match the cell, which would be an engine bug.
    fn install(&self, value: Box<dyn Any + Send>, version: Version) -> bool;
}

impl<T: Send + Sync + 'static> VersionedCell for CellInner<T> {
    fn id(&self) -> CellId {
        self.id
    }

    fn version(&self) -> Version {
        self.slot.read().version
    }

    fn install(&self, value: Box<dyn Any + Send>, version: Version) -> bool {
        match value.downcast::<T>() {
            Ok(value) => {
                let mut slot = self.slot.write();
                slot.value = *value;
                slot.version = version;
                true
            }
            Err(_) => false,
        }
    }
}

/// A transactional memory cell holding a `T`
///
/// Created with `Stm::allocate` (or `TransactionContext::allocate` from
/// inside a transaction). Read and written through a
/// [`TransactionContext`](crate::TransactionContext).
///
/// Equality is identity: two handles are equal when they refer to the same
/// cell, regardless of the values inside.
pub struct TCell<T> {
    inner: Arc<CellInner<T>>,
}

impl<T: Send + Sync + 'static> TCell<T> {
    pub(crate) fn new(owner: StmId, id: CellId, value: T) -> Self {
        Self {
            inner: Arc::new(CellInner {
                id,
                owner,
                slot: RwLock::new(Committed {
                    version: Version::ZERO,
                    value,
                }),
            }),
        }
    }

    /// Identifier of this cell
    pub fn id(&self) -> CellId {
        self.inner.id
    }

    /// Engine instance that allocated this cell
    pub fn owner(&self) -> StmId {
        self.inner.owner
    }

    /// Version of the last commit that wrote this cell
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub(crate) fn erased(&self) -> Arc<dyn VersionedCell> {
        self.inner.clone()
    }
}

impl<T: Clone + Send + Sync + 'static> TCell<T> {
    /// Committed value, read outside of any transaction
    ///
    /// Useful for diagnostics and assertions. Two `peek`s of different cells
    /// are not a consistent snapshot; use a transaction for that.
    pub fn peek(&self) -> T {
        self.inner.slot.read().value.clone()
    }

    /// Committed `(version, value)` pair
    pub(crate) fn load(&self) -> (Version, T) {
        let slot = self.inner.slot.read();
        (slot.version, slot.value.clone())
    }
}

impl<T> Clone for TCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for TCell<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for TCell<T> {}

impl<T> Hash for TCell<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl<T> fmt::Debug for TCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TCell")
            .field("id", &self.inner.id)
            .field("owner", &self.inner.owner)
            .finish()
    }
}

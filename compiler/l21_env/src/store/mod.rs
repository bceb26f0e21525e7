//! The mutable store: a growable table of value cells indexed by address.
//!
//! The store only grows. `extend` appends a cell and hands back its
//! address; that address names the same cell for the lifetime of the
//! store. Cells are overwritten in place by `set` and read by `apply`.
//!
//! # Illegal writes
//!
//! `apply` reports an out-of-bounds address as
//! [`EnvStoreError::IllegalAddress`], but `set` silently ignores one.
//! Callers rely on that asymmetry, so it is kept, and every write goes
//! through [`Store::slot_mut`] so that the swallowing happens in exactly
//! one place.

use std::fmt;

use tracing::{debug, warn};

use crate::errors::{illegal_address, EnvStoreError, EnvStoreResult};
use crate::value::Value;

/// Opaque key naming one store cell.
///
/// Addresses are only produced by [`Store::extend`] and
/// [`Store::address_of`]. Callers pass them back unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(usize);

impl Address {
    /// Raw cell index.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }

    /// Widen to `i64` for error reporting.
    fn as_i64(self) -> i64 {
        i64::try_from(self.0).unwrap_or(i64::MAX)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Raw integers from outside the interpreter (e.g. a debugger prompt).
///
/// Negative integers can never name a cell.
impl TryFrom<i64> for Address {
    type Error = EnvStoreError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        usize::try_from(raw)
            .map(Address)
            .map_err(|_| illegal_address(raw))
    }
}

/// Growable table of mutable value cells.
#[derive(Clone, Debug, PartialEq)]
pub struct Store<V = Value> {
    cells: Vec<V>,
}

impl<V> Store<V> {
    /// Create a store with zero cells.
    pub fn new() -> Self {
        Store { cells: Vec::new() }
    }

    /// Create an empty store with room for `capacity` cells.
    pub fn with_capacity(capacity: usize) -> Self {
        Store {
            cells: Vec::with_capacity(capacity),
        }
    }

    /// Number of allocated cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Allocate a new cell holding `value` and return its address.
    ///
    /// This is the only way the store grows. The returned address equals
    /// the store length before the call.
    pub fn extend(&mut self, value: V) -> Address {
        let address = Address(self.cells.len());
        self.cells.push(value);
        debug!(%address, size = self.cells.len(), "store extended");
        address
    }

    /// Read the value at `address`.
    ///
    /// Fails with [`EnvStoreError::IllegalAddress`] unless
    /// `address < len`. Never mutates the store.
    pub fn apply(&self, address: Address) -> EnvStoreResult<&V> {
        self.cells
            .get(address.index())
            .ok_or_else(|| illegal_address(address.as_i64()))
    }

    /// Overwrite the value at `address`.
    ///
    /// Does nothing when `apply(address)` would fail. The failure is
    /// logged, not returned.
    pub fn set(&mut self, address: Address, value: V) {
        if let Some(slot) = self.slot_mut(address) {
            *slot = value;
        }
    }

    /// The single write path. `None` means the write is dropped.
    fn slot_mut(&mut self, address: Address) -> Option<&mut V> {
        let size = self.cells.len();
        let slot = self.cells.get_mut(address.index());
        if slot.is_none() {
            warn!(%address, size, "ignoring store write to illegal address");
        }
        slot
    }
}

impl<V: PartialEq> Store<V> {
    /// Reverse lookup: the address of the most recently allocated cell
    /// whose current value equals `value`.
    pub fn address_of(&self, value: &V) -> Option<Address> {
        self.cells.iter().rposition(|cell| cell == value).map(Address)
    }
}

impl<V> Default for Store<V> {
    fn default() -> Self {
        Self::new()
    }
}

//! Lexical environments mapping names to store addresses.
//!
//! An environment is a chain of frames ending in the global frame:
//!
//! - [`GlobalFrame`]: the outermost scope. It is mutable and accretes
//!   bindings over time; a later binding for a name shadows, but does
//!   not erase, an earlier one.
//! - [`ExtensionFrame`]: one nested scope (a function application, a
//!   `let`). Its bindings are fixed at construction.
//!
//! Frames hold addresses, not values. Two frames binding the same
//! address alias one store cell, so a `set` through either is visible
//! through both.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::{FxBuildHasher, FxHashMap};
use smallvec::SmallVec;
use tracing::debug;

use crate::errors::{arity_mismatch, var_not_found, EnvStoreResult};
use crate::store::Address;

/// Handle to the global frame, shared by every chain rooted in it.
///
/// Wraps `Rc<RefCell<T>>`: chains read the frame through `borrow` while
/// the session appends through `borrow_mut`. Identity, not contents,
/// decides whether two chains share a root (see [`LocalScope::ptr_eq`]).
/// It is `!Send`, so a frame cannot leak to another thread.
#[repr(transparent)]
pub struct LocalScope<T>(Rc<RefCell<T>>);

impl<T> LocalScope<T> {
    #[inline]
    pub fn new(value: T) -> Self {
        LocalScope(Rc::new(RefCell::new(value)))
    }

    /// Borrow the inner value immutably.
    #[inline]
    pub fn borrow(&self) -> std::cell::Ref<'_, T> {
        self.0.borrow()
    }

    /// Borrow the inner value mutably.
    #[inline]
    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Whether both handles point at the same allocation.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for LocalScope<T> {
    #[inline]
    fn clone(&self) -> Self {
        LocalScope(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for LocalScope<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LocalScope").field(&self.0).finish()
    }
}

impl<T: Default> Default for LocalScope<T> {
    fn default() -> Self {
        LocalScope::new(T::default())
    }
}

/// The outermost, mutable scope.
///
/// `names` and `addresses` are parallel and in insertion order, oldest
/// first. `newest` maps each name to its latest address so lookup does
/// not scan the history.
#[derive(Clone, Debug, Default)]
pub struct GlobalFrame {
    names: Vec<String>,
    addresses: Vec<Address>,
    newest: FxHashMap<String, Address>,
}

impl GlobalFrame {
    /// Create a global frame with no bindings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        GlobalFrame {
            names: Vec::with_capacity(capacity),
            addresses: Vec::with_capacity(capacity),
            newest: FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher),
        }
    }

    /// Number of bindings ever added, shadowed ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Add `(name, address)` as the newest binding.
    ///
    /// Earlier bindings of `name` are kept; closures that captured their
    /// addresses still see them.
    pub fn add_binding(&mut self, name: impl Into<String>, address: Address) {
        let name = name.into();
        debug!(%name, %address, shadows = self.newest.contains_key(&name), "global binding added");
        self.newest.insert(name.clone(), address);
        self.names.push(name);
        self.addresses.push(address);
    }

    /// Address of the most recent binding of `name`.
    pub fn lookup(&self, name: &str) -> EnvStoreResult<Address> {
        self.newest
            .get(name)
            .copied()
            .ok_or_else(|| var_not_found(name))
    }

    /// Every binding, newest first.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, Address)> + '_ {
        self.names
            .iter()
            .zip(&self.addresses)
            .rev()
            .map(|(name, address)| (name.as_str(), *address))
    }
}

/// One nested scope with a fixed binding list.
#[derive(Debug)]
pub struct ExtensionFrame {
    bindings: SmallVec<[(String, Address); 4]>,
    enclosing: Env,
}

impl ExtensionFrame {
    /// Bound names, in parameter order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.bindings.iter().map(|(name, _)| name.as_str())
    }

    /// Bound addresses, paired with [`ExtensionFrame::names`].
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.bindings.iter().map(|(_, address)| *address)
    }

    /// The scope this frame was created in.
    #[inline]
    pub fn enclosing(&self) -> &Env {
        &self.enclosing
    }

    /// First pairing for `name` in this frame only.
    fn lookup_local(&self, name: &str) -> Option<Address> {
        self.bindings
            .iter()
            .find(|(bound, _)| bound == name)
            .map(|(_, address)| *address)
    }
}

thread_local! {
    /// Root swapped into frames being torn down, so unlinking allocates nothing.
    static DETACHED_ROOT: LocalScope<GlobalFrame> = LocalScope::new(GlobalFrame::new());
}

/// Unlink the chain in a loop. Frames only reachable through this one
/// are freed here instead of by nested drops, which would exhaust the
/// stack on long chains. A frame still shared elsewhere stops the walk.
impl Drop for ExtensionFrame {
    fn drop(&mut self) {
        if self.enclosing.is_global() {
            return;
        }
        let Ok(detached) = DETACHED_ROOT.try_with(|root| Env::Global(root.clone())) else {
            return;
        };

        let mut next = std::mem::replace(&mut self.enclosing, detached.clone());
        while let Env::Extension(frame) = next {
            match Rc::try_unwrap(frame) {
                Ok(mut frame) => {
                    next = std::mem::replace(&mut frame.enclosing, detached.clone());
                }
                Err(_) => break,
            }
        }
    }
}

/// An environment: the innermost frame of a scope chain.
///
/// Cloning is cheap and shares the frames.
#[derive(Clone, Debug)]
pub enum Env {
    /// The global frame itself.
    Global(LocalScope<GlobalFrame>),
    /// A nested frame linked to its enclosing environment.
    Extension(Rc<ExtensionFrame>),
}

impl Env {
    /// A fresh, empty global environment.
    pub fn global() -> Self {
        Env::Global(LocalScope::new(GlobalFrame::new()))
    }

    #[inline]
    pub fn is_global(&self) -> bool {
        matches!(self, Env::Global(_))
    }

    #[inline]
    pub fn is_extension(&self) -> bool {
        matches!(self, Env::Extension(_))
    }

    /// The global frame at the root of this chain.
    pub fn global_frame(&self) -> LocalScope<GlobalFrame> {
        let mut current = self;
        loop {
            match current {
                Env::Global(frame) => return frame.clone(),
                Env::Extension(frame) => current = &frame.enclosing,
            }
        }
    }

    /// Number of extension frames between this environment and the root.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self;
        while let Env::Extension(frame) = current {
            depth += 1;
            current = &frame.enclosing;
        }
        depth
    }

    /// Whether both environments are the same frame.
    pub fn ptr_eq(&self, other: &Env) -> bool {
        match (self, other) {
            (Env::Global(a), Env::Global(b)) => a.ptr_eq(b),
            (Env::Extension(a), Env::Extension(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// See [`resolve`].
    #[inline]
    pub fn resolve(&self, name: &str) -> EnvStoreResult<Address> {
        resolve(self, name)
    }

    /// See [`make_extension`].
    pub fn extend<S: Into<String>>(
        &self,
        names: impl IntoIterator<Item = S>,
        addresses: impl IntoIterator<Item = Address>,
    ) -> EnvStoreResult<Env> {
        make_extension(names, addresses, self)
    }
}

/// Build an extension frame on top of `enclosing`.
///
/// `names` and `addresses` pair up positionally and must be the same
/// length. Duplicate names are allowed; the first one wins on lookup.
pub fn make_extension<S: Into<String>>(
    names: impl IntoIterator<Item = S>,
    addresses: impl IntoIterator<Item = Address>,
    enclosing: &Env,
) -> EnvStoreResult<Env> {
    let names: SmallVec<[String; 4]> = names.into_iter().map(Into::into).collect();
    let addresses: SmallVec<[Address; 4]> = addresses.into_iter().collect();
    if names.len() != addresses.len() {
        return Err(arity_mismatch(names.len(), addresses.len()));
    }

    Ok(Env::Extension(Rc::new(ExtensionFrame {
        bindings: names.into_iter().zip(addresses).collect(),
        enclosing: enclosing.clone(),
    })))
}

/// Resolve `name` to an address, innermost frame first.
///
/// Extension frames are searched in list order, then their enclosing
/// environment. The walk ends at the global frame, whose
/// [`EnvStoreError::VarNotFound`](crate::EnvStoreError::VarNotFound)
/// propagates unchanged.
#[tracing::instrument(level = "trace", skip(env))]
pub fn resolve(env: &Env, name: &str) -> EnvStoreResult<Address> {
    let mut current = env;
    loop {
        match current {
            Env::Global(frame) => return frame.borrow().lookup(name),
            Env::Extension(frame) => {
                if let Some(address) = frame.lookup_local(name) {
                    return Ok(address);
                }
                current = &frame.enclosing;
            }
        }
    }
}

//! Interpreter session: one store plus one global environment.
//!
//! A `Session` is what an evaluator threads through evaluation in place
//! of process-wide globals. Independent sessions share nothing, so tests
//! and embedded interpreters can run side by side.

use tracing::debug;

use crate::environment::{make_extension, resolve, Env, GlobalFrame, LocalScope};
use crate::errors::{arity_mismatch, foreign_env, EnvStoreResult};
use crate::store::{Address, Store};
use crate::value::Value;

/// Configuration for a new session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Cells to reserve in the store up front.
    pub store_capacity: usize,
    /// Bindings to reserve in the global frame up front.
    pub global_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            store_capacity: 64,
            global_capacity: 32,
        }
    }
}

/// The store and global frame of one interpreter instance.
#[derive(Debug)]
pub struct Session<V = Value> {
    store: Store<V>,
    global: LocalScope<GlobalFrame>,
}

impl<V> Session<V> {
    /// Create a session with the default config.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        debug!(?config, "session created");
        Session {
            store: Store::with_capacity(config.store_capacity),
            global: LocalScope::new(GlobalFrame::with_capacity(config.global_capacity)),
        }
    }

    #[inline]
    pub fn store(&self) -> &Store<V> {
        &self.store
    }

    #[inline]
    pub fn store_mut(&mut self) -> &mut Store<V> {
        &mut self.store
    }

    /// The global frame as an environment, the root of every chain built
    /// in this session.
    pub fn global_env(&self) -> Env {
        Env::Global(self.global.clone())
    }

    /// Add `(name, address)` as the newest global binding.
    ///
    /// The only way new names enter the global scope.
    pub fn add_global_binding(&self, name: impl Into<String>, address: Address) {
        self.global.borrow_mut().add_binding(name, address);
    }

    /// Allocate `value` and bind `name` to it globally.
    pub fn define_global(&mut self, name: impl Into<String>, value: V) -> Address {
        let address = self.store.extend(value);
        self.add_global_binding(name, address);
        address
    }

    /// Allocate one cell per value, left to right, and bind them in a new
    /// frame on top of `enclosing`.
    ///
    /// Nothing is allocated when the lengths differ or `enclosing` is
    /// rooted in another session.
    pub fn extend_env<S: Into<String>>(
        &mut self,
        names: impl IntoIterator<Item = S>,
        values: impl IntoIterator<Item = V>,
        enclosing: &Env,
    ) -> EnvStoreResult<Env> {
        self.check_root(enclosing)?;
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let values: Vec<V> = values.into_iter().collect();
        if names.len() != values.len() {
            return Err(arity_mismatch(names.len(), values.len()));
        }
        let addresses: Vec<Address> = values
            .into_iter()
            .map(|value| self.store.extend(value))
            .collect();
        make_extension(names, addresses, enclosing)
    }

    /// Current value bound to `name` in `env`.
    pub fn lookup(&self, env: &Env, name: &str) -> EnvStoreResult<&V> {
        self.check_root(env)?;
        let address = resolve(env, name)?;
        self.store.apply(address)
    }

    /// Overwrite the value bound to `name` in `env`.
    ///
    /// Fails when `name` is unbound or `env` belongs to another session.
    /// The store write follows [`Store::set`].
    pub fn assign(&mut self, env: &Env, name: &str, value: V) -> EnvStoreResult<()> {
        self.check_root(env)?;
        let address = resolve(env, name)?;
        self.store.set(address, value);
        Ok(())
    }

    /// Addresses from a foreign chain would index the wrong store.
    fn check_root(&self, env: &Env) -> EnvStoreResult<()> {
        if env.global_frame().ptr_eq(&self.global) {
            Ok(())
        } else {
            Err(foreign_env())
        }
    }
}

impl<V> Default for Session<V> {
    fn default() -> Self {
        Self::new()
    }
}

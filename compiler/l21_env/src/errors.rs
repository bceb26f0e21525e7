//! Error types for store access and scope-chain resolution.
//!
//! Only the reading operations fail: `Store::apply` with
//! [`EnvStoreError::IllegalAddress`] and `resolve` with
//! [`EnvStoreError::VarNotFound`]. Constructors live here so callers
//! build errors through one import point.

use thiserror::Error;

/// Result of a store or environment operation.
pub type EnvStoreResult<T> = Result<T, EnvStoreError>;

/// Failure raised by the store or the environment.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EnvStoreError {
    /// Store access outside `[0, len)`.
    #[error("illegal address: {address}")]
    IllegalAddress {
        /// The rejected address, widened so negative inputs survive.
        address: i64,
    },

    /// Name absent from every frame of the chain, global included.
    #[error("var not found: {name}")]
    VarNotFound { name: String },

    /// An environment rooted in another session's global frame.
    #[error("environment belongs to a different session")]
    ForeignEnv,

    /// An extension frame was built from unequal name and address lists.
    #[error("extension frame needs one address per name: got {names} names and {addresses} addresses")]
    ArityMismatch { names: usize, addresses: usize },
}

impl EnvStoreError {
    /// Returns `true` for [`EnvStoreError::IllegalAddress`].
    #[inline]
    pub fn is_illegal_address(&self) -> bool {
        matches!(self, EnvStoreError::IllegalAddress { .. })
    }

    /// Returns `true` for [`EnvStoreError::VarNotFound`].
    #[inline]
    pub fn is_var_not_found(&self) -> bool {
        matches!(self, EnvStoreError::VarNotFound { .. })
    }
}

/// Store access out of bounds.
#[cold]
pub fn illegal_address(address: i64) -> EnvStoreError {
    EnvStoreError::IllegalAddress { address }
}

/// Name not bound anywhere in the scope chain.
#[cold]
pub fn var_not_found(name: &str) -> EnvStoreError {
    EnvStoreError::VarNotFound {
        name: name.to_string(),
    }
}

/// Environment not rooted in the session's own global frame.
#[cold]
pub fn foreign_env() -> EnvStoreError {
    EnvStoreError::ForeignEnv
}

/// Name and address lists of different lengths.
#[cold]
pub fn arity_mismatch(names: usize, addresses: usize) -> EnvStoreError {
    EnvStoreError::ArityMismatch { names, addresses }
}

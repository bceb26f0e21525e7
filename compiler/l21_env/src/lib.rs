//! L21 Env - Binding environment and mutable store for the L21 interpreter.
//!
//! This crate implements the environment model of evaluation:
//!
//! - `Store`: a growable table of mutable value cells, indexed by `Address`
//! - `Env`: a chain of lexical frames mapping names to addresses, rooted
//!   in a mutable global frame
//! - `Session`: one store plus one global frame, owned by an interpreter
//!
//! Variables are resolved in two steps: `resolve` walks the scope chain to
//! find an address, then `Store::apply` reads the cell. Because frames
//! hold addresses, every binding of the same address observes a `set`.
//!
//! # Tracing
//!
//! Enable with environment variables:
//! - `RUST_LOG=l21_env=debug` - store growth and global bindings
//! - `RUST_LOG=l21_env=trace` - every scope-chain resolution

mod environment;
pub mod errors;
mod session;
mod store;
mod value;

use std::sync::Once;

pub use environment::{make_extension, resolve, Env, ExtensionFrame, GlobalFrame, LocalScope};
pub use errors::{EnvStoreError, EnvStoreResult};
pub use session::{Session, SessionConfig};
pub use store::{Address, Store};
pub use value::Value;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Does nothing unless `RUST_LOG` is set,
/// and leaves an already-installed global subscriber in place.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            let installed = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
            if installed.is_err() {
                tracing::debug!("global subscriber already set; keeping it");
            }
        }
    });
}

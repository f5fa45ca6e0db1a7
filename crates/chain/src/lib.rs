#![warn(missing_docs, unreachable_pub)]
#![deny(unused_must_use, rust_2018_idioms)]
//! Chain specification and the read-only facade over the canonical chain that
//! the wire protocol and the block assembly loop consume.

pub mod clique;
mod mem;
mod notifications;
mod spec;
mod traits;

pub use mem::InMemoryChain;
pub use notifications::{
    CanonStateNotification, CanonStateNotificationSender, CanonStateNotifications,
    CanonStateSubscriptions,
};
pub use spec::{ChainSpec, ChainSpecBuilder, CliqueConfig};
pub use traits::{BlockImport, BlockImportError, ChainReader, CliqueReader};

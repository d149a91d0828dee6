//! Store abstraction for proxylink.
//!
//! The controller never owns the resource store; it talks to it through
//! the [`ResourceStore`] trait and receives level-triggered change
//! notifications through the watch channel.

pub mod error;
pub mod events;
pub mod traits;

pub use error::{ErrorCategory, StoreError};
pub use events::StoreEvent;
pub use traits::ResourceStore;

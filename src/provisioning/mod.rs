//! Collection routing and provisioning policy.
//!
//! # Data Flow
//! ```text
//! collection template + clock
//!     → naming.rs (rolling name substitution)
//!     → router.rs (exists? create, capped via units.rs)
//!     → collection name ready for inserts
//! ```

pub mod naming;
pub mod router;
pub mod units;

pub use naming::{resolve_collection_name, DEFAULT_COLLECTION};
pub use router::{CappedOptions, CollectionRouter};

//! Log event shaping.
//!
//! # Data Flow
//! ```text
//! LogEvent
//!     → layout.rs (one FieldValue per configured field)
//!     → value.rs (native BSON, or structural fallback)
//!     → builder.rs (ordered Document, or the fixed shape)
//! ```

pub mod builder;
pub mod event;
pub mod layout;
pub mod value;

pub use builder::{build_document, fixed_document, DocumentBuilder, FieldSpec, TIMESTAMP_FIELD};
pub use event::{ExceptionInfo, Location, LogEvent, ProcessContext};
pub use layout::{Layout, LayoutError, PatternLayout, StandardLayout};
pub use value::FieldValue;

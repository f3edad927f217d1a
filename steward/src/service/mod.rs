//! Service-side contract: the trait every supervised entity implements and
//! the self-reported health types it produces.
//!
//! The supervisor only ever sees a service through [`Service`]'s three
//! operations; business logic, isolation mechanics, and transport are the
//! implementer's concern. [`FnService`] offers a closure-based implementation
//! for embedders that do not want a dedicated type.

// Module declarations
pub mod fn_service;
pub mod traits;
pub mod types;

// Re-exports for convenient access
pub use fn_service::FnService;
pub use traits::{BoxError, Service};
pub use types::{HealthDetails, ServiceCondition, ServiceHealth};

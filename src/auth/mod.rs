//! Authentication module — YourMembership social backend
//!
//! Provides:
//! - XML request/response envelopes (`envelope` submodule)
//! - Host contract traits and in-memory session storage (`strategy` submodule)
//! - HTTP transport abstraction (`transport` submodule, in-memory mock under test)
//! - The login flow itself (`yourmembership` submodule)

pub mod envelope;
#[cfg(test)]
pub(crate) mod mock;
pub mod strategy;
pub mod transport;
pub mod yourmembership;

pub use envelope::ApiResponse;
pub use strategy::{Authenticator, MemorySessionStore, SessionStore, SocialBackend, UserDetails};
pub use transport::{HttpTransport, ReqwestTransport};
pub use yourmembership::YourMembershipBackend;

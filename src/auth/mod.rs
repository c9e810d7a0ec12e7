//! Authentication and session reconciliation
//!
//! - `validator`: remote token check (fail-closed)
//! - `store`: persisted local token + user record
//! - `session`: session framework adapter (signed cookie)
//! - `identity`: decision table merging the two sources
//! - `context`: lifecycle, write-through and logout paths

pub mod context;
pub mod identity;
pub mod mock;
pub mod session;
pub mod store;
pub mod validator;

pub use context::{AuthContext, ValidationOutcome};
pub use identity::{derive_identity, resolve_source, IdentityInputs, IdentitySource, UnifiedIdentity};
pub use mock::{MockSession, MockValidator};
pub use session::{JwtSessionProvider, SessionCookie, SessionProvider, SessionState, SessionStatus};
pub use store::{AuthStorage, FileStorage, LocalAuthStore, MemoryStorage, TOKEN_KEY, USER_KEY};
pub use validator::{HttpTokenValidator, TokenValidator};

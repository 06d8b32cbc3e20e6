//! Stateless, claims-based identity layer: signed session tokens, typed
//! principals, and per-route-group authorization policies.

pub mod claims;
pub mod clock;
pub mod codec;
pub mod config;
pub mod directory;
pub mod error;
pub mod extractors;
pub mod mapper;
pub mod pipeline;
pub mod policy;
pub mod principal;

pub use claims::{Audience, RawClaims};
pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{check_structure, IssuedToken, TokenCodec, TOKEN_TTL_SECONDS};
pub use config::{parse_algorithm, TokenConfig, ALLOWED_ALGORITHMS, MIN_HMAC_KEY_LENGTH};
pub use directory::{
    DirectoryError, InMemoryUserDirectory, NewAccount, StoredCredentials, UserDirectory,
};
pub use error::{AuthError, AuthResult};
pub use extractors::{bearer_token, CurrentPrincipal};
pub use mapper::ClaimsMapper;
pub use pipeline::{AuthPipeline, PipelineFailure, PipelineStage};
pub use policy::{
    AuthorizationDecision, AuthorizationPolicy, LogLine, ManagerPolicy, ProtectedArea,
    TrainerPolicy,
};
pub use principal::{Principal, Role, SCOPE_PREFIX};

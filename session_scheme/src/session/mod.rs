mod binding;
mod id;
mod scheme;
mod types;
mod unauthenticated;
mod validator;

pub use binding::{CookieChange, RequestContext, SessionHandle};
pub use id::{RandomIdGenerator, SessionIdGenerator};
pub use scheme::SessionScheme;
pub use types::{
    AuthMode, AuthOutcome, SessionId, Unauthenticated, UnauthenticatedReason,
    UnauthenticatedResponse,
};
pub use validator::{SessionValidator, Validation, ValidatorError};

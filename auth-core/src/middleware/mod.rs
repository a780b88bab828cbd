pub mod auth;

pub use auth::{
    authenticate_request, identity_middleware, AuthenticatedUser, Identity, RequestIdentity,
};

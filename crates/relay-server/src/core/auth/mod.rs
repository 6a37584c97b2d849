//! Caller identity
//!
//! Authentication happens upstream; the authenticating proxy forwards the
//! verified username in a header which the middleware turns into a [`Ctx`].
//!
//! [`Ctx`]: crate::core::ctx::Ctx

pub mod middleware;

pub use middleware::{mw_require_user, USER_HEADER};

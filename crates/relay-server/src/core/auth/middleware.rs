use crate::core::ctx::Ctx;
use crate::core::error::{Error, Result};
use axum::{extract::Request, middleware::Next, response::Response};
use tracing::debug;

/// Header carrying the username verified by the upstream proxy
pub const USER_HEADER: &str = "x-authenticated-user";

pub async fn mw_require_user(mut req: Request, next: Next) -> Result<Response> {
    debug!("MIDDLEWARE: require_user");

    let username = match req.headers().get(USER_HEADER) {
        Some(h) => h.to_str().map_err(|_| Error::AuthFailNoUser)?.trim().to_string(),
        None => return Err(Error::AuthFailNoUser),
    };

    if username.is_empty() {
        return Err(Error::AuthFailNoUser);
    }

    req.extensions_mut().insert(Ctx::new(username));

    Ok(next.run(req).await)
}

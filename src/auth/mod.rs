use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    RequestPartsExt,
};
use hyper::http::request::Parts;
use serde::{Deserialize, Serialize};

use crate::errors::GatewayError;

/// A verified identity, established once per connection by the external
/// authentication layer and immutable for the connection's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Identity {
    pub id: String,
    pub username: String,
}

#[derive(Deserialize)]
struct IdentityQuery {
    user_id: String,
    username: String,
}

/// Extracts the identity the auth layer attached to the request, either as
/// `x-auth-user-id`/`x-auth-username` headers or as query parameters (the
/// only option available to browser WebSocket clients).
#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let in_query = parts
            .extract::<Query<IdentityQuery>>()
            .await
            .ok()
            .map(|Query(query)| Identity {
                id: query.user_id,
                username: query.username,
            });

        let in_headers = header_identity(parts);

        in_query.or(in_headers).ok_or(GatewayError::Unauthenticated)
    }
}

fn header_identity(parts: &Parts) -> Option<Identity> {
    let id = parts.headers.get("x-auth-user-id")?.to_str().ok()?;
    let username = parts.headers.get("x-auth-username")?.to_str().ok()?;

    Some(Identity {
        id: id.to_string(),
        username: username.to_string(),
    })
}

#[cfg(test)]
impl Identity {
    pub fn mock(name: &str) -> Self {
        Self {
            id: format!("user-{}", name),
            username: name.to_string(),
        }
    }
}

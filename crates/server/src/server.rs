use axum::{
    Router,
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
};

use std::sync::Arc;

use crate::{friends, profiles};
use engine::Engine;

static USER_ID_HEADER: axum::http::HeaderName = axum::http::HeaderName::from_static("x-user-id");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// The authenticated caller, inserted by the auth middleware.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub String);

/// `TypedHeader` for the caller id
///
/// The authenticating gateway in front of the server sets "x-user-id".
#[derive(Debug)]
struct UserIdHeader(String);

impl Header for UserIdHeader {
    fn name() -> &'static axum::http::HeaderName {
        &USER_ID_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };

        Ok(UserIdHeader(value.trim().to_string()))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        match axum::http::HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-user-id header"),
        }
    }
}

async fn auth(
    user_header: Option<TypedHeader<UserIdHeader>>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(UserIdHeader(user_id))) = user_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if user_id.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    request.extensions_mut().insert(CurrentUser(user_id));
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/users/search", get(profiles::search))
        .route("/profile", get(profiles::get).put(profiles::upsert))
        .route("/friends", get(friends::list_friends))
        .route("/friends/{friend_id}", delete(friends::remove_friend))
        .route("/requests", post(friends::send_request))
        .route("/requests/{direction}", get(friends::list_requests))
        .route("/requests/{friend_id}/accept", post(friends::accept_request))
        .route("/requests/{friend_id}/reject", post(friends::reject_request))
        .route_layer(middleware::from_fn(auth))
        .with_state(state)
}

/// The full router over `engine`, without binding a listener.
pub fn app(engine: Arc<Engine>) -> Router {
    router(ServerState { engine })
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(Arc::new(engine))).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

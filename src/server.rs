// HTTP surface: auction draw/sale plus the registration-side endpoints.
//
// Handlers hold no state of their own; the store and registry arrive as
// injected trait handles through axum state, so the same handlers run
// against SQLite in production and against fakes or in-memory databases in
// tests.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::auction::draw::{self, Draw};
use crate::auction::sale::{self, SaleError};
use crate::player::PlayerProfile;
use crate::store::{DrawRegistry, RecordStore};

/// Staff login for the auction page, taken from credentials.toml.
#[derive(Debug, Clone)]
pub struct StaffCredentials {
    pub username: String,
    pub password: String,
}

/// Shared per-process state, constructed once in main and passed by
/// reference into every handler.
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub registry: Arc<dyn DrawRegistry>,
    /// `None` disables the auth endpoint (every attempt is rejected).
    pub auth: Option<StaffCredentials>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/get-random-player", get(get_random_player))
        .route("/api/sell-player", post(sell_player))
        .route("/api/player-registration", post(register_player))
        .route("/api/auth", post(auth))
        .route("/api/get-player-by-email", get(get_player_by_email))
        .with_state(state)
}

type Reply = (StatusCode, Json<Value>);

fn message(status: StatusCode, text: &str) -> Reply {
    (status, Json(json!({ "message": text })))
}

fn server_error() -> Reply {
    message(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Something went wrong. Please try again.",
    )
}

// ---------------------------------------------------------------------------
// Auction endpoints
// ---------------------------------------------------------------------------

async fn get_random_player(State(state): State<Arc<AppState>>) -> Reply {
    // Re-read the player count on every draw; registrations may have been
    // appended since the last request.
    let player_count = match state.store.count().await {
        Ok(n) => n,
        Err(e) => {
            error!("failed to read player count: {e}");
            return server_error();
        }
    };

    let mut rng = StdRng::from_os_rng();
    match draw::draw_next(
        player_count,
        state.registry.as_ref(),
        state.store.as_ref(),
        &mut rng,
    )
    .await
    {
        Ok(Draw::Candidate(player)) => {
            info!(id = player.id, "drew player for auction");
            (StatusCode::OK, Json(json!({ "player": player })))
        }
        Ok(Draw::Exhausted) => message(StatusCode::OK, "All players sold!"),
        Err(e) => {
            error!("draw failed: {e}");
            server_error()
        }
    }
}

#[derive(Debug, Deserialize)]
struct SellRequest {
    team: Option<String>,
    amount: Option<String>,
    id: Option<usize>,
}

async fn sell_player(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SellRequest>,
) -> Reply {
    let (Some(team), Some(amount), Some(id)) = (
        request.team.filter(|t| !t.trim().is_empty()),
        request.amount.filter(|a| !a.trim().is_empty()),
        request.id,
    ) else {
        warn!("sell-player request missing required fields");
        return message(
            StatusCode::BAD_REQUEST,
            "Please provide all the required fields.",
        );
    };

    match sale::finalize_sale(
        id,
        &team,
        &amount,
        state.store.as_ref(),
        state.registry.as_ref(),
    )
    .await
    {
        Ok(()) => message(StatusCode::OK, "Done"),
        Err(SaleError::Conflict) => {
            warn!(id, "sale rejected: record already sold or write lost a race");
            server_error()
        }
        Err(SaleError::Store(e)) => {
            error!(id, "sale failed against the store: {e}");
            server_error()
        }
    }
}

// ---------------------------------------------------------------------------
// Registration-side endpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RegistrationRequest {
    #[serde(flatten)]
    profile: PlayerProfile,
    terms: Option<String>,
}

async fn register_player(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegistrationRequest>,
) -> Reply {
    if request.terms.as_deref() != Some("on") {
        return message(
            StatusCode::BAD_REQUEST,
            "You must accept the terms and conditions",
        );
    }

    match state.store.append(&request.profile).await {
        Ok(id) => {
            info!(id, "player registered");
            message(StatusCode::OK, "Registration successful")
        }
        Err(e) => {
            error!("registration failed: {e}");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
        }
    }
}

#[derive(Debug, Deserialize)]
struct AuthRequest {
    username: Option<String>,
    password: Option<String>,
}

async fn auth(State(state): State<Arc<AppState>>, Json(request): Json<AuthRequest>) -> Reply {
    let (Some(username), Some(password)) = (
        request.username.filter(|u| !u.is_empty()),
        request.password.filter(|p| !p.is_empty()),
    ) else {
        return message(StatusCode::BAD_REQUEST, "No username or password provided");
    };

    match &state.auth {
        Some(creds) if creds.username == username && creds.password == password => {
            message(StatusCode::OK, "Success")
        }
        Some(_) => message(
            StatusCode::UNAUTHORIZED,
            "username and password doesn't match",
        ),
        None => {
            warn!("auth attempt while no staff credentials are configured");
            message(
                StatusCode::UNAUTHORIZED,
                "username and password doesn't match",
            )
        }
    }
}

#[derive(Debug, Deserialize)]
struct EmailQuery {
    email: Option<String>,
}

async fn get_player_by_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EmailQuery>,
) -> Reply {
    let Some(email) = query.email.filter(|e| !e.is_empty()) else {
        return message(StatusCode::BAD_REQUEST, "Email is required");
    };

    match state.store.get_all().await {
        Ok(records) => {
            let registered = records.iter().any(|r| r.profile.email == email);
            if registered {
                message(StatusCode::OK, "Player is registered")
            } else {
                message(StatusCode::OK, "Player not found")
            }
        }
        Err(e) => {
            error!("email lookup failed: {e}");
            server_error()
        }
    }
}

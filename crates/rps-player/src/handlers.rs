//! HTTP API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rps_core::crypto::CommitError;
use rps_core::engine::{EngineError, ErrorKind, GameView};
use rps_core::games::Move;
use rps_core::protocol::GameId;
use rps_core::RpsContract;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::models::*;
use crate::state::PlayerState;

/// Application error type
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    kind: Option<ErrorKind>,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message,
            kind: self.kind,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        let kind = e.kind();
        let status = match (&e, kind) {
            (EngineError::UnknownGame(_), _) => StatusCode::NOT_FOUND,
            (EngineError::Store(_), _) => StatusCode::INTERNAL_SERVER_ERROR,
            (_, ErrorKind::Input) => StatusCode::BAD_REQUEST,
            (_, ErrorKind::Transaction) => StatusCode::BAD_GATEWAY,
            (_, ErrorKind::Desync) => StatusCode::CONFLICT,
        };
        Self {
            status,
            kind: Some(kind),
            message: e.to_string(),
        }
    }
}

impl From<rps_core::ContractError> for AppError {
    fn from(e: rps_core::ContractError) -> Self {
        EngineError::from(e).into()
    }
}

type ApiResult<T> = Result<Json<T>, AppError>;

pub fn create_router(state: Arc<PlayerState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/player", get(get_player_info))
        .route("/api/games/latest", get(get_latest_game))
        .route("/api/game/create", post(create_game))
        .route("/api/game/join", post(join_game))
        .route("/api/game/:game_id/status", get(get_game_status))
        .route("/api/game/:game_id/move", post(select_move))
        .route("/api/game/:game_id/commit", post(commit))
        .route("/api/game/:game_id/reveal", post(reveal))
        .route("/api/game/:game_id/abandon", post(abandon))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn get_player_info(State(state): State<Arc<PlayerState>>) -> Json<PlayerInfoResponse> {
    let engine = state.engine();
    Json(PlayerInfoResponse {
        address: engine.player(),
        backend: state.backend(),
        chain_id: state.chain_id(),
        entry_fee_wei: engine.entry_fee().to_string(),
        active_game: engine.active_game(),
        tracked_games: engine.tracked_games(),
        watched_games: state.watched_games(),
    })
}

async fn get_latest_game(State(state): State<Arc<PlayerState>>) -> ApiResult<LatestGameResponse> {
    let engine = state.engine();
    let Some(game_id) = engine.latest_game().await? else {
        return Ok(Json(LatestGameResponse {
            game_id: None,
            game: None,
        }));
    };
    let game = engine.contract().get_game(game_id).await?;
    Ok(Json(LatestGameResponse {
        game_id: Some(game_id),
        game: Some(game),
    }))
}

async fn create_game(State(state): State<Arc<PlayerState>>) -> ApiResult<CreateGameResponse> {
    let game_id = state.engine().create_game().await?;
    state.watch_game(game_id);
    Ok(Json(CreateGameResponse { game_id }))
}

async fn join_game(
    State(state): State<Arc<PlayerState>>,
    Json(req): Json<JoinGameRequest>,
) -> ApiResult<CreateGameResponse> {
    state.engine().join_game(req.game_id).await?;
    state.watch_game(req.game_id);
    Ok(Json(CreateGameResponse {
        game_id: req.game_id,
    }))
}

async fn get_game_status(
    State(state): State<Arc<PlayerState>>,
    Path(game_id): Path<GameId>,
) -> ApiResult<GameView> {
    Ok(Json(state.engine().view(game_id).await?))
}

async fn select_move(
    State(state): State<Arc<PlayerState>>,
    Path(game_id): Path<GameId>,
    Json(req): Json<SelectMoveRequest>,
) -> ApiResult<PhaseResponse> {
    let engine = state.engine();
    let phase = match req.mv {
        MoveInput::Raw(raw) => engine.select_raw_move(game_id, raw).await?,
        MoveInput::Name(name) => {
            let mv: Move = name
                .parse()
                .map_err(|e| EngineError::from(CommitError::from(e)))?;
            engine.select_move(game_id, mv).await?
        }
    };
    Ok(Json(PhaseResponse { game_id, phase }))
}

async fn commit(
    State(state): State<Arc<PlayerState>>,
    Path(game_id): Path<GameId>,
) -> ApiResult<CommitResponse> {
    let commitment = state.engine().commit(game_id).await?;
    state.watch_game(game_id);
    Ok(Json(CommitResponse {
        game_id,
        commitment,
    }))
}

async fn reveal(
    State(state): State<Arc<PlayerState>>,
    Path(game_id): Path<GameId>,
) -> ApiResult<PhaseResponse> {
    let engine = state.engine();
    engine.reveal(game_id).await?;
    Ok(Json(PhaseResponse {
        game_id,
        phase: engine.phase(game_id),
    }))
}

async fn abandon(
    State(state): State<Arc<PlayerState>>,
    Path(game_id): Path<GameId>,
) -> ApiResult<AbandonResponse> {
    let removed = state.engine().abandon(game_id).await?;
    if state.stop_watching(game_id) {
        info!("Game {}: watcher stopped", game_id);
    }
    Ok(Json(AbandonResponse {
        game_id,
        had_session: removed.is_some(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Backend;
    use axum::body::Body;
    use axum::http::Request;
    use rps_core::contract::{ContractError, MockRpsContract};
    use rps_core::engine::{CommitmentEngine, SessionStore};
    use rps_core::protocol::{Address, DEFAULT_ENTRY_FEE};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    fn alice() -> Address {
        Address::repeat_byte(0xA1)
    }

    fn bob() -> Address {
        Address::repeat_byte(0xB0)
    }

    fn engine(contract: &MockRpsContract, player: Address) -> CommitmentEngine {
        CommitmentEngine::new(
            Arc::new(contract.clone()),
            player,
            DEFAULT_ENTRY_FEE,
            SessionStore::in_memory(),
        )
    }

    fn player_app(contract: &MockRpsContract, player: Address) -> (Router, Arc<PlayerState>) {
        let state = Arc::new(PlayerState::new(
            engine(contract, player),
            Backend::Mock,
            None,
            Duration::from_millis(50),
        ));
        (create_router(Arc::clone(&state)), state)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health_and_player_info() {
        let contract = MockRpsContract::default();
        let (app, _) = player_app(&contract, alice());

        let (status, _) = send(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "GET", "/api/player", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["address"], json!(alice()));
        assert_eq!(body["backend"], "mock");
        assert_eq!(body["entry_fee_wei"], "10000000000000000");
        assert_eq!(body["active_game"], Value::Null);
    }

    #[tokio::test]
    async fn test_full_game_over_http() {
        let contract = MockRpsContract::default();
        let (app, state) = player_app(&contract, alice());
        let opponent = engine(&contract, bob());

        let (status, body) = send(&app, "POST", "/api/game/create", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["game_id"], 1);
        assert_eq!(state.watched_games(), vec![GameId::new(1)]);

        let (_, body) = send(&app, "GET", "/api/games/latest", None).await;
        assert_eq!(body["game_id"], 1);
        assert_eq!(body["game"]["player1"], json!(alice()));

        opponent.join_game(GameId::new(1)).await.unwrap();

        let (status, body) = send(
            &app,
            "POST",
            "/api/game/1/move",
            Some(json!({ "move": "rock" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "MoveSelected");

        let (status, body) = send(&app, "POST", "/api/game/1/commit", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["commitment"].as_str().unwrap().starts_with("0x"));

        let (status, body) = send(&app, "POST", "/api/game/1/reveal", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "Input");

        opponent.select_move(GameId::new(1), Move::Scissors).await.unwrap();
        opponent.commit(GameId::new(1)).await.unwrap();

        let (status, body) = send(&app, "GET", "/api/game/1/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["next_step"], "Reveal");
        assert_eq!(body["role"], "Player1");

        let (status, body) = send(&app, "POST", "/api/game/1/reveal", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "Revealed");
        opponent.reveal(GameId::new(1)).await.unwrap();

        let (_, body) = send(&app, "GET", "/api/game/1/status", None).await;
        assert_eq!(body["next_step"], "Finished");
        assert_eq!(body["result"]["winner"], json!(alice()));
    }

    #[tokio::test]
    async fn test_input_errors_are_bad_request() {
        let contract = MockRpsContract::default();
        let (app, _) = player_app(&contract, alice());
        send(&app, "POST", "/api/game/create", None).await;
        let writes = contract.write_count();

        let (status, body) = send(&app, "POST", "/api/game/1/commit", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "Input");

        for mv in [json!(0), json!(4), json!("lizard")] {
            let body = json!({ "move": mv });
            let (status, _) = send(&app, "POST", "/api/game/1/move", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        let join = json!({ "game_id": 1 });
        let (status, _) = send(&app, "POST", "/api/game/join", Some(join)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(contract.write_count(), writes);
    }

    #[tokio::test]
    async fn test_unknown_game_is_not_found() {
        let contract = MockRpsContract::default();
        let (app, _) = player_app(&contract, alice());

        let (status, _) = send(&app, "GET", "/api/game/42/status", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_transaction_failure_is_bad_gateway() {
        let contract = MockRpsContract::default();
        let (app, _) = player_app(&contract, alice());
        contract.fail_next_write(ContractError::Rejected("User denied".to_string()));

        let (status, body) = send(&app, "POST", "/api/game/create", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "Transaction");

        let (_, body) = send(&app, "GET", "/api/player", None).await;
        assert_eq!(body["active_game"], Value::Null);
    }

    #[tokio::test]
    async fn test_lost_secret_is_conflict() {
        let contract = MockRpsContract::default();
        let (app, _) = player_app(&contract, alice());
        let opponent = engine(&contract, bob());
        let id = GameId::new(1);

        send(&app, "POST", "/api/game/create", None).await;
        opponent.join_game(id).await.unwrap();
        send(&app, "POST", "/api/game/1/move", Some(json!({ "move": 2 }))).await;
        send(&app, "POST", "/api/game/1/commit", None).await;
        opponent.select_move(id, Move::Rock).await.unwrap();
        opponent.commit(id).await.unwrap();

        let (restarted, _) = player_app(&contract, alice());
        let (status, body) = send(&restarted, "POST", "/api/game/1/reveal", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "Desync");
    }

    #[tokio::test]
    async fn test_abandon_stops_watcher() {
        let contract = MockRpsContract::default();
        let (app, state) = player_app(&contract, alice());
        send(&app, "POST", "/api/game/create", None).await;
        send(&app, "POST", "/api/game/1/move", Some(json!({ "move": "paper" }))).await;

        let (status, body) = send(&app, "POST", "/api/game/1/abandon", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["had_session"], true);
        assert!(state.watched_games().is_empty());

        let (_, body) = send(&app, "GET", "/api/player", None).await;
        assert_eq!(body["active_game"], Value::Null);
    }
}

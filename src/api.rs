//! HTTP/WebSocket transport. Thin by design: every handler resolves
//! the caller's session, calls straight into the facade, and maps
//! `EngineError` to a status code via the `err(StatusCode, &str)`
//! helper below.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, warn};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        FromRequest, Path, Request, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
    routing::{delete, get},
};
use uuid::Uuid;

use crate::account::AccountSnapshot;
use crate::bus::Event;
use crate::errors::EngineError;
use crate::ids::OrderId;
use crate::order::{AmendRequest, NewOrderRequest, Order, OrderKind, Side};
use crate::orderbook::BookSnapshot;
use crate::state::AppState;
use crate::trade::Trade;

const SESSION_COOKIE: &str = "session_id";

type ApiErr = (StatusCode, Json<serde_json::Value>);

fn err(status: StatusCode, msg: impl std::fmt::Display) -> ApiErr {
    (status, Json(json!({ "error": msg.to_string() })))
}

impl From<EngineError> for ApiErr {
    fn from(e: EngineError) -> Self {
        let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        err(status, e)
    }
}

/// A `Json`-like extractor that logs a warning with a bounded preview
/// on rejection, instead of silently returning a bare 422.
pub struct LoggedJson<T>(pub T);

impl<S, T> FromRequest<S> for LoggedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiErr;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let method = req.method().clone();
        let uri = req.uri().clone();
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| err(StatusCode::BAD_REQUEST, e))?;

        match serde_json::from_slice::<T>(&bytes) {
            Ok(val) => Ok(LoggedJson(val)),
            Err(e) => {
                let preview = String::from_utf8_lossy(&bytes);
                let preview = &preview[..preview.len().min(4096)];
                warn!(
                    error = %e,
                    %method,
                    %uri,
                    body_preview = %preview,
                    "request body rejected: JSON deserialization failed"
                );
                Err(err(StatusCode::UNPROCESSABLE_ENTITY, e))
            }
        }
    }
}

fn session_id_from_cookies(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').map(str::trim).find_map(|kv| {
        kv.strip_prefix(SESSION_COOKIE)
            .and_then(|rest| rest.strip_prefix('='))
            .map(str::to_string)
    })
}

/// Empty unless a brand-new session was just minted, in which case it
/// carries a `Set-Cookie` header for the response.
fn session_headers(is_new: bool, session_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if is_new {
        let value = format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax");
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(header::SET_COOKIE, value);
        }
    }
    headers
}

#[derive(Deserialize)]
pub struct NewOrderPayload {
    pub side: Side,
    pub kind: OrderKind,
    pub quantity: u64,
    pub price: Option<i64>,
}

#[derive(Deserialize, Default)]
pub struct AmendOrderPayload {
    pub quantity: Option<u64>,
    pub price: Option<i64>,
}

#[derive(Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: Uuid,
    pub status: crate::order::OrderStatus,
    pub trades: Vec<Trade>,
}

/// `GET /` — health check.
pub async fn health() -> &'static str {
    "trading-sim order book engine"
}

/// `GET /api/user`
pub async fn get_user(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let (session, account, is_new) = state.facade.resolve_session(session_id_from_cookies(&headers).as_deref());
    let snapshot: AccountSnapshot = state
        .facade
        .get_user(account)
        .expect("resolve_session always seeds the ledger");
    (session_headers(is_new, &session), Json(snapshot))
}

/// `GET /api/orderbook`
pub async fn get_orderbook(State(state): State<AppState>) -> Json<BookSnapshot> {
    Json(state.facade.get_book())
}

/// `GET /api/orders`
pub async fn get_orders(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let (session, account, is_new) = state.facade.resolve_session(session_id_from_cookies(&headers).as_deref());
    let orders: Vec<Order> = state.facade.get_orders(account);
    (session_headers(is_new, &session), Json(orders))
}

/// `GET /api/trades`
pub async fn get_trades(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let (session, account, is_new) = state.facade.resolve_session(session_id_from_cookies(&headers).as_deref());
    let trades: Vec<Trade> = state.facade.get_trades(account);
    (session_headers(is_new, &session), Json(trades))
}

/// `POST /api/orders`
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    LoggedJson(payload): LoggedJson<NewOrderPayload>,
) -> Result<impl IntoResponse, ApiErr> {
    let (session, account, is_new) = state.facade.resolve_session(session_id_from_cookies(&headers).as_deref());
    let req = NewOrderRequest {
        side: payload.side,
        kind: payload.kind,
        qty: crate::money::Qty(payload.quantity),
        price: payload.price.map(crate::money::Price),
    };
    let outcome = state.facade.place_order(account, req)?;
    let ack = OrderAck {
        order_id: outcome.order_id.0,
        status: outcome.status,
        trades: outcome.trades,
    };
    Ok((session_headers(is_new, &session), Json(ack)))
}

/// `DELETE /api/orders/{id}`
pub async fn cancel_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiErr> {
    let (session, account, is_new) = state.facade.resolve_session(session_id_from_cookies(&headers).as_deref());
    state.facade.cancel_order(account, OrderId(order_id))?;
    Ok((
        session_headers(is_new, &session),
        Json(json!({ "status": "cancelled" })),
    ))
}

/// `PUT /api/orders/{id}` — amend (cancel-then-replace).
pub async fn amend_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(order_id): Path<Uuid>,
    LoggedJson(payload): LoggedJson<AmendOrderPayload>,
) -> Result<impl IntoResponse, ApiErr> {
    let (session, account, is_new) = state.facade.resolve_session(session_id_from_cookies(&headers).as_deref());
    let req = AmendRequest {
        price: payload.price.map(crate::money::Price),
        qty: payload.quantity.map(crate::money::Qty),
    };
    let outcome = state.facade.amend_order(account, OrderId(order_id), req)?;
    let ack = OrderAck {
        order_id: outcome.order_id.0,
        status: outcome.status,
        trades: outcome.trades,
    };
    Ok((session_headers(is_new, &session), Json(ack)))
}

/// `GET /ws` — upgrades and streams every event the caller's account
/// (plus book-wide broadcasts) is subscribed to.
pub async fn ws_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let (session, account, is_new) = state.facade.resolve_session(session_id_from_cookies(&headers).as_deref());
    let response_headers = session_headers(is_new, &session);
    (response_headers, ws.on_upgrade(move |socket| handle_socket(socket, state, account)))
}

async fn send_event(socket: &mut WebSocket, event: &Event) -> Result<(), axum::Error> {
    let text = serde_json::to_string(event).expect("Event serialization never fails");
    socket.send(Message::Text(text.into())).await
}

async fn handle_socket(mut socket: WebSocket, state: AppState, account: crate::ids::AccountId) {
    let sub = state.facade.subscribe(account);

    if send_event(&mut socket, &Event::OrderBook(state.facade.get_book())).await.is_err() {
        return;
    }
    if let Ok(user) = state.facade.get_user(account) {
        if send_event(&mut socket, &Event::UserInfo(user)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = sub.recv() => {
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
                if sub.take_lag() {
                    warn!(%account, "subscriber lagged, resending snapshots");
                    if send_event(&mut socket, &Event::OrderBook(state.facade.get_book())).await.is_err() {
                        break;
                    }
                    if let Ok(user) = state.facade.get_user(account) {
                        if send_event(&mut socket, &Event::UserInfo(user)).await.is_err() {
                            break;
                        }
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        error!(error = %e, "websocket recv error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
    state.facade.bus().remove(sub.id);
}

/// Constructs the application's `Router` with all routes and shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/user", get(get_user))
        .route("/api/orderbook", get(get_orderbook))
        .route("/api/orders", get(get_orders).post(create_order))
        .route("/api/orders/{id}", delete(cancel_order).put(amend_order))
        .route("/api/trades", get(get_trades))
        .route("/ws", get(ws_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(false).level(tracing::Level::TRACE))
                .on_response(DefaultOnResponse::new().level(tracing::Level::TRACE)),
        )
        .with_state(state)
}

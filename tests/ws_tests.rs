use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures_util::StreamExt;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;

use trading_sim::{api::router, config::EngineConfig, session_facade::TradingSessionFacade, state::AppState};

async fn spawn_server() -> (String, tokio::task::JoinHandle<()>) {
    let facade = Arc::new(TradingSessionFacade::new(EngineConfig::default()));
    let app: Router = router(AppState::new(facade));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let ok = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Ok(r) = client.get(format!("{base}/api/orderbook")).send().await {
                if r.status().is_success() {
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    })
    .await
    .is_ok();
    assert!(ok, "server did not become ready in time");

    (base, handle)
}

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn next_frame(ws: &mut WsStream) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("ws recv timeout")
        .expect("ws closed")
        .expect("ws error");
    match msg {
        tokio_tungstenite::tungstenite::Message::Text(t) => serde_json::from_str(&t).expect("parse frame"),
        other => panic!("expected text frame, got {other:?}"),
    }
}

#[tokio::test]
async fn websocket_streams_order_book_and_own_fill_events() {
    let (http_base, server) = spawn_server().await;
    let client = reqwest::Client::new();

    // Mint a session up front so we can reuse its cookie both on the WS
    // upgrade and on the taker order below, making the socket's account
    // the buyer in the eventual trade.
    let user_res = client.get(format!("{http_base}/api/user")).send().await.unwrap();
    let cookie = user_res
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .expect("first contact sets a session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let ws_url = http_base.replace("http://", "ws://") + "/ws";
    let mut request = ws_url.as_str().into_client_request().unwrap();
    request.headers_mut().insert("Cookie", cookie.parse().unwrap());
    let (mut ws, _resp) = connect_async(request).await.expect("ws connect");

    let first = next_frame(&mut ws).await;
    assert_eq!(first["type"], "order_book");

    let second = next_frame(&mut ws).await;
    assert_eq!(second["type"], "user_info");
    assert_eq!(second["data"]["cash_cents"], 1_000_000);

    // A different (anonymous) session rests a sell order — the book
    // broadcast should still reach our socket.
    let resting = json!({ "side": "sell", "kind": "limit", "price": 48_000, "quantity": 5_000_000 });
    let r = client.post(format!("{http_base}/api/orders")).json(&resting).send().await.unwrap();
    assert!(r.status().is_success());

    let update = next_frame(&mut ws).await;
    assert_eq!(update["type"], "order_book_update");
    assert_eq!(update["data"]["asks"][0][0], 48_000);

    // Our own session takes it as a market buy — we should see our fill.
    let taker = json!({ "side": "buy", "kind": "market", "quantity": 2_000_000 });
    let r = client
        .post(format!("{http_base}/api/orders"))
        .header(reqwest::header::COOKIE, &cookie)
        .json(&taker)
        .send()
        .await
        .unwrap();
    assert!(r.status().is_success());

    let fill = loop {
        let frame = next_frame(&mut ws).await;
        if frame["type"] == "fill" {
            break frame;
        }
    };
    assert_eq!(fill["data"]["price"], 48_000);
    assert_eq!(fill["data"]["qty"], 2_000_000);

    server.abort();
}

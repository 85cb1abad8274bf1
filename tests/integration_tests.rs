//! Integration tests for the tag server and client
//!
//! These tests run the real server on an ephemeral port and talk to it over
//! real WebSockets, the way browsers and native clients do.

use client::network::Client;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use server::config::{ServerConfig, SessionConfig};
use server::network::Server;
use shared::{AbilityKind, Encoding, PlayerId};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(3);

fn test_config() -> ServerConfig {
    ServerConfig {
        addr: "127.0.0.1:0".to_string(),
        seed: Some(7),
        ..ServerConfig::default()
    }
}

async fn start_server(config: ServerConfig) -> SocketAddr {
    let server = Server::bind(config).await.expect("server binds");
    let addr = server.local_addr().expect("bound address");
    tokio::spawn(server.run());
    addr
}

async fn connect(addr: SocketAddr) -> Ws {
    let (ws, _) = connect_async(format!("ws://{}", addr))
        .await
        .expect("websocket handshake");
    ws
}

async fn send(ws: &mut Ws, message: Value) {
    ws.send(Message::Text(message.to_string())).await.unwrap();
}

/// Next JSON message, skipping control frames
async fn recv(ws: &mut Ws) -> Value {
    loop {
        let message = timeout(WAIT, ws.next())
            .await
            .expect("message before timeout")
            .expect("stream still open")
            .expect("valid frame");
        match message {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Binary(_) => panic!("expected a JSON text frame"),
            Message::Close(_) => panic!("connection closed unexpectedly"),
            _ => continue,
        }
    }
}

/// Skips messages until one named `kind` arrives and returns its body
async fn recv_until(ws: &mut Ws, kind: &str) -> Value {
    loop {
        let message = recv(ws).await;
        if let Some(body) = message.get(kind) {
            return body.clone();
        }
    }
}

async fn assert_silent(ws: &mut Ws) {
    let next = timeout(Duration::from_millis(200), ws.next()).await;
    if let Ok(Some(Ok(Message::Text(text)))) = next {
        panic!("unexpected message {}", text);
    }
}

/// Connects and consumes the welcome, returning the assigned id
async fn connect_player(addr: SocketAddr) -> (Ws, PlayerId) {
    let mut ws = connect(addr).await;
    let connected = recv_until(&mut ws, "connected").await;
    recv_until(&mut ws, "initialPlayers").await;
    let id = connected["id"].as_u64().unwrap() as PlayerId;
    (ws, id)
}

async fn join(ws: &mut Ws, name: &str) {
    send(
        ws,
        json!({"joinGame": {"name": name, "skin": "red", "specialMoves": ["1", "5"]}}),
    )
    .await;
}

async fn update_position(ws: &mut Ws, x: f32, z: f32) {
    send(
        ws,
        json!({"updatePosition": {
            "position": {"x": x, "y": 1.6, "z": z},
            "rotation": {"x": 0.0, "y": 0.0, "z": 0.0}
        }}),
    )
    .await;
}

/// Two joined players with a running game, plus who is "it"
async fn running_game(addr: SocketAddr) -> ((Ws, PlayerId), (Ws, PlayerId), PlayerId) {
    let (mut a, a_id) = connect_player(addr).await;
    let (mut b, b_id) = connect_player(addr).await;
    join(&mut a, "Ada").await;
    recv_until(&mut a, "playerJoined").await;
    join(&mut b, "Bob").await;

    let started_a = recv_until(&mut a, "gameStarted").await;
    let started_b = recv_until(&mut b, "gameStarted").await;
    assert_eq!(started_a, started_b);
    let tagger = started_a["taggerId"].as_u64().unwrap() as PlayerId;
    ((a, a_id), (b, b_id), tagger)
}

mod session_tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_is_sent_on_connect() {
        let addr = start_server(test_config()).await;

        let mut first = connect(addr).await;
        let connected = recv(&mut first).await;
        assert!(connected["connected"]["id"].is_u64());
        assert_eq!(recv(&mut first).await, json!({"initialPlayers": {"players": []}}));

        join(&mut first, "Ada").await;
        let joined = recv_until(&mut first, "playerJoined").await;
        assert_eq!(joined["player"]["name"], "Ada");

        let mut second = connect(addr).await;
        recv_until(&mut second, "connected").await;
        let snapshot = recv_until(&mut second, "initialPlayers").await;
        let players = snapshot["players"].as_array().unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0]["name"], "Ada");
        assert_eq!(players[0]["team"], "runner");
        assert_eq!(players[0]["specialMoves"], json!(["1", "5"]));
        assert_eq!(players[0]["tags"], 0);
    }

    #[tokio::test]
    async fn single_player_waits_and_second_join_starts_game() {
        let addr = start_server(test_config()).await;
        let (mut a, a_id) = connect_player(addr).await;
        let (mut b, b_id) = connect_player(addr).await;

        join(&mut a, "Ada").await;
        recv_until(&mut a, "playerJoined").await;
        assert_silent(&mut a).await;

        join(&mut b, "Bob").await;
        let joined = recv_until(&mut a, "playerJoined").await;
        assert_eq!(joined["player"]["id"].as_u64().unwrap() as PlayerId, b_id);

        let started = recv_until(&mut a, "gameStarted").await;
        assert_eq!(started["gameTime"], 300);
        let tagger = started["taggerId"].as_u64().unwrap() as PlayerId;
        assert!(tagger == a_id || tagger == b_id);
    }

    #[tokio::test]
    async fn movement_is_relayed_to_everyone_but_the_sender() {
        let addr = start_server(test_config()).await;
        let ((mut a, a_id), (mut b, _), _) = running_game(addr).await;

        update_position(&mut a, 3.0, -4.0).await;

        let moved = recv_until(&mut b, "playerMoved").await;
        assert_eq!(moved["id"].as_u64().unwrap() as PlayerId, a_id);
        assert_eq!(moved["position"]["x"], 3.0);
        assert_eq!(moved["position"]["z"], -4.0);
        assert_silent(&mut a).await;
    }

    #[tokio::test]
    async fn tag_in_range_ends_the_game() {
        let addr = start_server(test_config()).await;
        let ((a, a_id), (b, b_id), tagger) = running_game(addr).await;
        let ((mut tagger_ws, tagger_name), (mut runner_ws, runner_id)) = if tagger == a_id {
            ((a, "Ada"), (b, b_id))
        } else {
            ((b, "Bob"), (a, a_id))
        };

        // Too far away: dropped without a reply
        update_position(&mut tagger_ws, 10.0, 0.0).await;
        send(&mut tagger_ws, json!({"tagPlayer": {"taggedId": runner_id}})).await;
        recv_until(&mut runner_ws, "playerMoved").await;

        update_position(&mut tagger_ws, 0.5, 0.0).await;
        send(&mut tagger_ws, json!({"tagPlayer": {"taggedId": runner_id}})).await;

        let moved = recv(&mut runner_ws).await;
        assert_eq!(moved["playerMoved"]["position"]["x"], 0.5);

        for ws in [&mut tagger_ws, &mut runner_ws] {
            let tagged = recv_until(ws, "playerTagged").await;
            assert_eq!(tagged["taggerId"].as_u64().unwrap() as PlayerId, tagger);
            assert_eq!(tagged["taggedId"].as_u64().unwrap() as PlayerId, runner_id);

            let ended = recv(ws).await;
            assert_eq!(
                ended,
                json!({"gameEnded": {
                    "result": "All players tagged",
                    "stats": {"totalPlayers": 2, "taggers": 2, "runners": 0, "topTagger": tagger_name}
                }})
            );
        }
    }

    #[tokio::test]
    async fn countdown_runs_out_with_runners_left() {
        let config = ServerConfig {
            tick_interval: Duration::from_millis(20),
            session: SessionConfig {
                game_duration_secs: 3,
                min_players: 3,
                ..SessionConfig::default()
            },
            ..test_config()
        };
        let addr = start_server(config).await;
        let (mut a, _) = connect_player(addr).await;
        let (mut b, _) = connect_player(addr).await;
        let (mut c, _) = connect_player(addr).await;
        join(&mut a, "Ada").await;
        recv_until(&mut a, "playerJoined").await;
        join(&mut b, "Bob").await;
        recv_until(&mut b, "playerJoined").await;
        join(&mut c, "Cy").await;

        let started = recv_until(&mut a, "gameStarted").await;
        assert_eq!(started["gameTime"], 3);

        let ended = recv_until(&mut a, "gameEnded").await;
        assert_eq!(ended["result"], "Time up");
        assert_eq!(ended["stats"]["totalPlayers"], 3);
        assert_eq!(ended["stats"]["taggers"], 1);
        assert_eq!(ended["stats"]["runners"], 2);
        assert_silent(&mut a).await;
    }

    #[tokio::test]
    async fn special_moves_are_echoed_to_the_sender() {
        let addr = start_server(test_config()).await;
        let ((mut a, a_id), (mut b, _), _) = running_game(addr).await;

        send(&mut a, json!({"useSpecialMove": {"moveType": "3"}})).await;
        for ws in [&mut a, &mut b] {
            let used = recv_until(ws, "playerUsedSpecialMove").await;
            assert_eq!(used["id"].as_u64().unwrap() as PlayerId, a_id);
            assert_eq!(used["moveType"], "3");
        }
    }
}

mod connection_tests {
    use super::*;

    #[tokio::test]
    async fn disconnect_mid_game_ends_it() {
        let addr = start_server(test_config()).await;
        let ((mut a, _), (b, b_id), _) = running_game(addr).await;

        drop(b);

        let left = recv_until(&mut a, "playerLeft").await;
        assert_eq!(left["id"].as_u64().unwrap() as PlayerId, b_id);
        let ended = recv(&mut a).await;
        assert_eq!(ended["gameEnded"]["result"], "Not enough players");
        assert_eq!(ended["gameEnded"]["stats"]["totalPlayers"], 1);
    }

    #[tokio::test]
    async fn garbage_frames_are_ignored() {
        let addr = start_server(test_config()).await;
        let (mut a, _) = connect_player(addr).await;

        a.send(Message::Text("{\"nonsense\": true}".into()))
            .await
            .unwrap();
        a.send(Message::Binary(vec![0xff, 0xff, 0xff, 0xff]))
            .await
            .unwrap();
        join(&mut a, "Ada").await;

        let joined = recv_until(&mut a, "playerJoined").await;
        assert_eq!(joined["player"]["name"], "Ada");
    }

    #[tokio::test]
    async fn full_server_refuses_new_connections() {
        let config = ServerConfig {
            max_connections: 1,
            ..test_config()
        };
        let addr = start_server(config).await;
        let (_first, _) = connect_player(addr).await;

        let mut second = connect(addr).await;
        let refused = recv(&mut second).await;
        assert_eq!(refused, json!({"disconnected": {"reason": "Server full"}}));

        let rest = timeout(WAIT, second.next()).await.expect("socket closes");
        assert!(matches!(rest, None | Some(Ok(Message::Close(_))) | Some(Err(_))));
    }

    #[tokio::test]
    async fn native_client_speaks_bincode() {
        let addr = start_server(test_config()).await;
        let (mut browser, _) = connect_player(addr).await;
        join(&mut browser, "Ada").await;
        recv_until(&mut browser, "playerJoined").await;

        let url = format!("ws://{}", addr);
        let mut native = Client::connect(&url, Encoding::Binary)
            .await
            .expect("native client connects");
        native.mirror().join("Nat", "blue", &[AbilityKind::Decoy]);

        timeout(WAIT, async {
            while !native.mirror().roster().game_started() {
                assert!(native.recv().await.expect("clean read"));
            }
        })
        .await
        .expect("game starts for the native client");

        let mirror = native.mirror();
        assert_eq!(mirror.player_count(), 2);
        let local = mirror.roster().local_player().expect("own player mirrored");
        assert_eq!(local.name, "Nat");
        let native_id = local.id;

        let joined = recv_until(&mut browser, "playerJoined").await;
        assert_eq!(joined["player"]["name"], "Nat");
        assert_eq!(joined["player"]["specialMoves"], json!(["6"]));
        recv_until(&mut browser, "gameStarted").await;

        native.close().await;
        let left = recv_until(&mut browser, "playerLeft").await;
        assert_eq!(left["id"].as_u64().unwrap() as PlayerId, native_id);
        let ended = recv(&mut browser).await;
        assert_eq!(ended["gameEnded"]["result"], "Not enough players");
    }
}

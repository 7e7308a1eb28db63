//! HTTP and WebSocket test clients for protocol testing
//!
//! Note: Some methods may appear unused because they're only used in specific
//! test files and clippy checks each test independently.

use std::net::SocketAddr;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use reqwest::StatusCode;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::http;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Create a session over REST, returns the session ID
#[allow(dead_code)]
pub async fn create_session(addr: SocketAddr, owner: &str) -> String {
    let response = reqwest::Client::new()
        .post(format!("http://{}/api/collab", addr))
        .json(&serde_json::json!({ "uid": owner }))
        .send()
        .await
        .expect("Failed to send create request");

    assert_eq!(response.status(), StatusCode::CREATED);
    response.text().await.unwrap()
}

/// Participant connection to a session
pub struct Participant {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

impl Participant {
    /// Join a session, panicking if the upgrade is refused
    #[allow(dead_code)]
    pub async fn join(addr: SocketAddr, session_id: &str, uid: &str) -> Self {
        Self::try_join(addr, session_id, uid)
            .await
            .unwrap_or_else(|status| panic!("Join refused with status {}", status))
    }

    /// Join a session, returning the HTTP status if the upgrade is refused
    #[allow(dead_code)]
    pub async fn try_join(
        addr: SocketAddr,
        session_id: &str,
        uid: &str,
    ) -> Result<Self, http::StatusCode> {
        let url = format!("ws://{}/api/collab/{}/join?uid={}", addr, session_id, uid);
        match tokio_tungstenite::connect_async(&url).await {
            Ok((ws, _)) => {
                let (sink, stream) = ws.split();
                Ok(Self { sink, stream })
            }
            Err(tokio_tungstenite::tungstenite::Error::Http(response)) => Err(response.status()),
            Err(e) => panic!("WebSocket connect failed: {}", e),
        }
    }

    /// Send a text message
    #[allow(dead_code)]
    pub async fn send(&mut self, msg: &str) {
        self.sink
            .send(Message::Text(msg.to_string().into()))
            .await
            .unwrap();
    }

    /// Receive the next text message, `None` once the server closed
    #[allow(dead_code)]
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(text.as_str().to_owned()),
                Some(Ok(Message::Close(_))) | None => return None,
                Some(Ok(_)) => continue,
                Some(Err(_)) => return None,
            }
        }
    }

    /// Receive with timeout, returns None if timeout
    #[allow(dead_code)]
    pub async fn recv_timeout(&mut self, duration: Duration) -> Option<String> {
        tokio::time::timeout(duration, self.recv()).await.ok().flatten()
    }

    /// Whether the server ends the stream within `duration`
    ///
    /// Text frames that arrive first are skipped.
    #[allow(dead_code)]
    pub async fn closed_within(&mut self, duration: Duration) -> bool {
        tokio::time::timeout(duration, async {
            while self.recv().await.is_some() {}
        })
        .await
        .is_ok()
    }

    /// Send a close frame and drop the connection
    #[allow(dead_code)]
    pub async fn close(mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}

// ============================================================================
// Outils de test partagés par les sources
// ============================================================================
// - un mini serveur HTTP local (TcpListener) qui répond une réponse fixe
// - des flux temps réel en mémoire
// ============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use super::error::LoadError;
use super::live_feed::{LiveFeed, Subscription};

/// Serveur lancé en tâche de fond, avec compteur de requêtes reçues
pub struct FakeServer {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl FakeServer {
    /// Répond `response` (octets HTTP bruts) à chaque connexion.
    /// `keep_open` garde la socket ouverte après l'écriture (flux SSE).
    pub async fn start(response: String, keep_open: bool) -> Self {
        Self::start_parts(vec![response.into_bytes()], keep_open).await
    }

    /// Comme `start`, mais écrit la réponse en plusieurs morceaux séparés
    /// par une courte pause, pour que le client les reçoive un par un.
    pub async fn start_parts(parts: Vec<Vec<u8>>, keep_open: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let parts = parts.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    for (i, part) in parts.iter().enumerate() {
                        if i > 0 {
                            tokio::time::sleep(Duration::from_millis(50)).await;
                        }
                        let _ = socket.write_all(part).await;
                        let _ = socket.flush().await;
                    }
                    if keep_open {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            hits,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Réponse HTTP/1.1 complète avec Content-Length
pub fn http_response(status_line: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        content_type,
        body.len(),
        body
    )
}

/// En-tête d'un flux SSE suivi des événements, sans longueur (flux ouvert)
pub fn sse_response(events: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\n\r\n{}",
        events
    )
}

/// Flux en mémoire : chaque abonnement reçoit les payloads donnés, puis
/// reste ouvert sans jamais rien envoyer d'autre.
///
/// Les émetteurs sont conservés pour vérifier le désabonnement
/// (`is_closed()` devient vrai quand la Subscription est détruite).
#[derive(Default)]
pub struct MemoryFeed {
    payloads: Vec<Value>,
    senders: Mutex<Vec<mpsc::Sender<Value>>>,
    paths: Mutex<Vec<String>>,
}

impl MemoryFeed {
    /// Flux qui ne publie jamais rien
    pub fn silent() -> Self {
        Self::default()
    }

    /// Flux qui publie `payload` dès l'abonnement
    pub fn publishing(payload: Value) -> Self {
        Self {
            payloads: vec![payload],
            ..Self::default()
        }
    }

    /// Vrai si tous les abonnements ouverts ont été fermés
    pub fn all_unsubscribed(&self) -> bool {
        self.senders.lock().unwrap().iter().all(|tx| tx.is_closed())
    }

    pub fn subscriptions(&self) -> usize {
        self.senders.lock().unwrap().len()
    }

    pub fn subscribed_paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

#[async_trait]
impl LiveFeed for MemoryFeed {
    async fn subscribe(&self, path: &str) -> Result<Subscription, LoadError> {
        let (tx, rx) = mpsc::channel(8);
        for payload in &self.payloads {
            let _ = tx.try_send(payload.clone());
        }
        self.senders.lock().unwrap().push(tx);
        self.paths.lock().unwrap().push(path.to_string());
        Ok(Subscription::from_receiver(rx))
    }
}

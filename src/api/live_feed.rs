// ============================================================================
// Source 1 : flux temps réel
// ============================================================================
// Abonnement au flux de cours du bureau (Firebase Realtime Database, API REST
// en streaming "text/event-stream"). Le premier payload reçu décide :
// un tableau non vide de devises = succès, tout le reste = échec.
//
// CONCEPTS RUST :
// 1. RAII : Subscription implémente Drop, le désabonnement est garanti
//    sur tous les chemins (succès, erreur, délai dépassé)
// 2. tokio::time::timeout : borne l'attente sur une Future quelconque
// 3. Tâche de fond + mpsc : la lecture du flux HTTP vit dans une tâche tokio,
//    les payloads arrivent par un channel
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};

use super::error::LoadError;
use super::source::{RateOrigin, RateSource};
use crate::models::{CurrencyList, CurrencyRecord};

const SOURCE_ID: &str = "live_feed";

/// Taille du channel entre la tâche de lecture et l'abonné
const PAYLOAD_BUFFER: usize = 4;

// ============================================================================
// Trait : LiveFeed
// ============================================================================

/// Client d'un flux temps réel : `subscribe(path)` retourne un flux de payloads
#[async_trait]
pub trait LiveFeed: Send + Sync {
    async fn subscribe(&self, path: &str) -> Result<Subscription, LoadError>;
}

/// Abonnement actif à un flux
///
/// Détruire la valeur ferme le channel et arrête la tâche de lecture.
pub struct Subscription {
    receiver: mpsc::Receiver<Value>,
    reader: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Abonnement alimenté par une tâche de lecture
    pub fn new(receiver: mpsc::Receiver<Value>, reader: JoinHandle<()>) -> Self {
        Self {
            receiver,
            reader: Some(reader),
        }
    }

    /// Abonnement sans tâche associée (flux en mémoire)
    pub fn from_receiver(receiver: mpsc::Receiver<Value>) -> Self {
        Self {
            receiver,
            reader: None,
        }
    }

    /// Attend le prochain payload ; None si le flux est terminé
    pub async fn next_payload(&mut self) -> Option<Value> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.receiver.close();
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        trace!("Live feed subscription dropped");
    }
}

// ============================================================================
// Client Firebase (Server-Sent Events)
// ============================================================================

/// Client du flux Firebase : `GET <base>/<path>.json` en text/event-stream
pub struct FirebaseFeed {
    client: reqwest::Client,
    base_url: String,
}

impl FirebaseFeed {
    /// Construit le client
    ///
    /// Pas de timeout global sur le client : la connexion reste ouverte
    /// tant que l'abonnement vit. Seule la connexion TCP est bornée.
    pub fn new(base_url: &str) -> Result<Self, LoadError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(LoadError::unavailable(SOURCE_ID, "URL du flux vide"));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| LoadError::unavailable(SOURCE_ID, e))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }
}

#[async_trait]
impl LiveFeed for FirebaseFeed {
    #[instrument(skip(self))]
    async fn subscribe(&self, path: &str) -> Result<Subscription, LoadError> {
        let url = self.url_for(path);
        debug!(url = %url, "Opening live feed stream");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?
            .error_for_status()?;

        let (tx, rx) = mpsc::channel(PAYLOAD_BUFFER);
        let reader = tokio::spawn(pump_events(response, tx));

        Ok(Subscription::new(rx, reader))
    }
}

/// Lit le flux HTTP morceau par morceau et publie les payloads complets
///
/// S'arrête quand le flux se termine, quand le serveur annule l'abonnement,
/// quand un bloc dépasse MAX_PENDING_BYTES, ou quand l'abonné ferme son côté
/// du channel.
async fn pump_events(mut response: reqwest::Response, tx: mpsc::Sender<Value>) {
    let mut buffer = SseBuffer::default();

    loop {
        let chunk = match response.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => {
                debug!("Live feed stream ended");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Live feed stream failed");
                return;
            }
        };

        buffer.push(&chunk);

        while let Some(block) = buffer.next_block() {
            let block = match block {
                Ok(block) => block,
                Err(e) => {
                    warn!(error = %e, "Live feed event is not valid UTF-8, ignored");
                    continue;
                }
            };

            match parse_sse_block(&block).map(interpret_event) {
                Some(FeedEvent::Payload(payload)) => {
                    if tx.send(payload).await.is_err() {
                        return;
                    }
                }
                Some(FeedEvent::Cancelled(reason)) => {
                    warn!(reason = %reason, "Live feed cancelled by server");
                    return;
                }
                Some(FeedEvent::Ignored) | None => {}
            }
        }

        if buffer.pending_len() > MAX_PENDING_BYTES {
            warn!(
                pending = buffer.pending_len(),
                limit = MAX_PENDING_BYTES,
                "Live feed event exceeds size limit, closing stream"
            );
            return;
        }
    }
}

/// Octets d'un bloc SSE pas encore terminé, au-delà desquels on abandonne
const MAX_PENDING_BYTES: usize = 1024 * 1024;

/// Accumulateur d'octets du flux, découpé en blocs terminés par "\n\n"
///
/// CONCEPT : le décodage UTF-8 se fait sur un bloc complet, jamais sur un
/// morceau HTTP isolé : un caractère cyrillique coupé entre deux morceaux
/// est recollé avant d'être décodé.
#[derive(Debug, Default)]
struct SseBuffer {
    bytes: Vec<u8>,
}

impl SseBuffer {
    /// Ajoute un morceau ; les "\r" sont retirés ("\r\n" devient "\n")
    fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend(chunk.iter().copied().filter(|byte| *byte != b'\r'));
    }

    /// Extrait le prochain bloc complet, décodé en UTF-8
    fn next_block(&mut self) -> Option<Result<String, std::string::FromUtf8Error>> {
        let end = self.bytes.windows(2).position(|pair| pair == b"\n\n")?;
        let block: Vec<u8> = self.bytes.drain(..end + 2).collect();
        Some(String::from_utf8(block))
    }

    fn pending_len(&self) -> usize {
        self.bytes.len()
    }
}

/// Un événement SSE brut (champs "event:" et "data:")
#[derive(Debug, Clone, PartialEq)]
struct SseEvent {
    event: String,
    data: String,
}

/// Ce que l'abonné doit faire d'un événement
#[derive(Debug, Clone, PartialEq)]
enum FeedEvent {
    Payload(Value),
    Cancelled(String),
    Ignored,
}

/// Corps d'un événement "put" / "patch" de Firebase
#[derive(Debug, Deserialize)]
struct FirebaseUpdate {
    path: String,
    data: Value,
}

/// Découpe un bloc SSE ; les lignes de commentaire (":") sont ignorées
fn parse_sse_block(block: &str) -> Option<SseEvent> {
    let mut event = String::new();
    let mut data_lines: Vec<&str> = Vec::new();

    for line in block.lines() {
        if line.starts_with(':') {
            continue;
        }
        if let Some(value) = line.strip_prefix("event:") {
            event = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.strip_prefix(' ').unwrap_or(value));
        }
    }

    if event.is_empty() && data_lines.is_empty() {
        return None;
    }

    Some(SseEvent {
        event: if event.is_empty() { "message".to_string() } else { event },
        data: data_lines.join("\n"),
    })
}

/// Interprète un événement selon le protocole Firebase
///
/// Seules les mises à jour de la racine ("path": "/") portent la liste
/// complète ; les mises à jour partielles sont ignorées.
fn interpret_event(event: SseEvent) -> FeedEvent {
    match event.event.as_str() {
        "put" | "patch" => match serde_json::from_str::<FirebaseUpdate>(&event.data) {
            Ok(update) if update.path == "/" => FeedEvent::Payload(update.data),
            Ok(update) => {
                trace!(path = %update.path, "Ignoring partial live feed update");
                FeedEvent::Ignored
            }
            Err(e) => {
                warn!(error = %e, "Unreadable live feed event");
                FeedEvent::Ignored
            }
        },
        "cancel" | "auth_revoked" => FeedEvent::Cancelled(event.data),
        _ => FeedEvent::Ignored,
    }
}

// ============================================================================
// RateSource : flux temps réel borné dans le temps
// ============================================================================

/// Source "flux temps réel" de la chaîne
pub struct LiveFeedSource {
    feed: Option<Arc<dyn LiveFeed>>,
    path: String,
    wait: Duration,
}

impl LiveFeedSource {
    /// `feed == None` : flux non configuré, la source échoue sans attendre
    pub fn new(feed: Option<Arc<dyn LiveFeed>>, path: &str, wait: Duration) -> Self {
        Self {
            feed,
            path: path.to_string(),
            wait,
        }
    }
}

#[async_trait]
impl RateSource for LiveFeedSource {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn origin(&self) -> RateOrigin {
        RateOrigin::LiveFeed
    }

    #[instrument(skip(self), fields(path = %self.path, wait_ms = self.wait.as_millis() as u64))]
    async fn attempt_load(&self) -> Result<CurrencyList, LoadError> {
        let feed = self
            .feed
            .as_ref()
            .ok_or_else(|| LoadError::unavailable(SOURCE_ID, "flux non configuré"))?;

        // CONCEPT : la Subscription vit dans le bloc async
        // - succès : détruite à la fin du bloc, après le premier payload
        // - délai dépassé : timeout() détruit la Future, donc le bloc et la Subscription
        let first = tokio::time::timeout(self.wait, async {
            let mut subscription = feed.subscribe(&self.path).await?;
            Ok::<_, LoadError>(subscription.next_payload().await)
        })
        .await
        .map_err(|_| LoadError::SourceTimeout {
            source_name: SOURCE_ID,
            waited: self.wait,
        })??;

        let payload =
            first.ok_or_else(|| LoadError::malformed(SOURCE_ID, "flux fermé sans données"))?;

        let list = parse_feed_payload(payload)?;
        info!(currencies = list.len(), "Live feed delivered currencies");
        Ok(list)
    }
}

/// Valide le premier payload du flux : un tableau non vide de devises
///
/// Les trous d'un tableau Firebase (éléments `null`) sont ignorés.
pub fn parse_feed_payload(payload: Value) -> Result<CurrencyList, LoadError> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Null => return Err(LoadError::malformed(SOURCE_ID, "payload vide")),
        other => {
            return Err(LoadError::malformed(
                SOURCE_ID,
                format!("tableau attendu, reçu {}", json_kind(&other)),
            ))
        }
    };

    let records = items
        .into_iter()
        .filter(|item| !item.is_null())
        .map(serde_json::from_value::<CurrencyRecord>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| LoadError::malformed(SOURCE_ID, e))?;

    // Cours inversés : affichés tels quels, mais signalés
    for record in &records {
        if let Some(spread) = record.spread().filter(|spread| *spread < 0.0) {
            warn!(code = %record.code, spread, "Live feed record sells below its buy rate");
        }
    }

    CurrencyList::new(records).map_err(|e| LoadError::malformed(SOURCE_ID, e))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "booléen",
        Value::Number(_) => "nombre",
        Value::String(_) => "chaîne",
        Value::Array(_) => "tableau",
        Value::Object(_) => "objet",
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

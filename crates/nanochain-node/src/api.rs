use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use nanochain_core::{consensus, pow, Block, Ledger, LedgerError, NodeRegistry, PeerAddr};

/// Process-wide shared state: the single ledger and peer registry behind
/// their synchronization boundaries, injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<Ledger>>,
    pub registry: Arc<RwLock<NodeRegistry>>,
    pub http: reqwest::Client,
    /// This process's identity; mining rewards are credited to it.
    pub node_id: String,
    /// Set on shutdown to abort any in-flight proof search.
    pub cancel: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(node_id: String) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(Ledger::new())),
            registry: Arc::new(RwLock::new(NodeRegistry::new())),
            http: reqwest::Client::new(),
            node_id,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/mine", get(mine))
        .route("/transactions/new", post(new_transaction))
        .route("/chain", get(chain))
        .route("/nodes/register", post(register_nodes))
        .route("/nodes/resolve", get(resolve_conflicts))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Deserialize)]
struct TxIn {
    sender: String,
    recipient: String,
    amount: u64,
}

#[derive(Serialize)]
struct TxQueued {
    message: String,
    index: u64,
}

/// The `/chain` payload, and equally the wire format fetched from peers
/// during conflict resolution.
#[derive(Serialize, Deserialize)]
pub struct ChainEnvelope {
    pub chain: Vec<Block>,
    pub length: usize,
}

#[derive(Deserialize)]
struct RegisterIn {
    nodes: Vec<String>,
}

#[derive(Serialize)]
struct RegisterOut {
    message: &'static str,
    total_nodes: Vec<PeerAddr>,
}

#[derive(Serialize)]
struct MineOut {
    message: &'static str,
    #[serde(flatten)]
    block: Block,
}

#[derive(Serialize)]
struct ResolveOut {
    message: &'static str,
    replaced: bool,
    chain: Vec<Block>,
}

enum ApiError {
    Ledger(LedgerError),
    MiningCancelled,
    Worker(String),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Ledger(err) => {
                let status = match err {
                    LedgerError::InvalidAddress(_) | LedgerError::InvalidChain(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    LedgerError::PeerUnreachable { .. } => StatusCode::BAD_GATEWAY,
                    LedgerError::StaleTip => StatusCode::CONFLICT,
                };
                (status, err.to_string())
            }
            Self::MiningCancelled => (
                StatusCode::SERVICE_UNAVAILABLE,
                "mining aborted by shutdown".to_string(),
            ),
            Self::Worker(reason) => (StatusCode::INTERNAL_SERVER_ERROR, reason),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// Forge a new block. The proof search runs on a blocking worker off the
/// ledger lock, so reads and submissions keep flowing while it grinds;
/// the commit re-checks the tip and re-mines if another writer beat us.
async fn mine(State(state): State<AppState>) -> Result<Json<MineOut>, ApiError> {
    let mut reward_queued = false;
    loop {
        let template = state.ledger.read().await.mining_template();
        let cancel = state.cancel.clone();
        let proof =
            tokio::task::spawn_blocking(move || pow::mine_cancellable(template.last_proof, &cancel))
                .await
                .map_err(|err| ApiError::Worker(err.to_string()))?;
        let Some(proof) = proof else {
            return Err(ApiError::MiningCancelled);
        };

        let mut ledger = state.ledger.write().await;
        if !reward_queued {
            // Sender "0" marks the freshly minted reward for finding the proof.
            ledger.new_transaction("0", state.node_id.as_str(), 1);
            reward_queued = true;
        }
        match ledger.commit_block(proof, template.previous_hash) {
            Ok(block) => {
                info!(index = block.index, proof = block.proof, "forged new block");
                return Ok(Json(MineOut {
                    message: "New block forged",
                    block,
                }));
            }
            Err(LedgerError::StaleTip) => {
                warn!("chain tip moved during proof search, re-mining");
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

async fn new_transaction(
    State(state): State<AppState>,
    Json(tx): Json<TxIn>,
) -> (StatusCode, Json<TxQueued>) {
    let index = state
        .ledger
        .write()
        .await
        .new_transaction(tx.sender, tx.recipient, tx.amount);
    (
        StatusCode::CREATED,
        Json(TxQueued {
            message: format!("Transaction will be added to block {index}"),
            index,
        }),
    )
}

async fn chain(State(state): State<AppState>) -> Json<ChainEnvelope> {
    let ledger = state.ledger.read().await;
    Json(ChainEnvelope {
        chain: ledger.chain().to_vec(),
        length: ledger.chain().len(),
    })
}

async fn register_nodes(
    State(state): State<AppState>,
    Json(input): Json<RegisterIn>,
) -> Result<(StatusCode, Json<RegisterOut>), ApiError> {
    let mut registry = state.registry.write().await;
    for address in &input.nodes {
        let peer = registry.register(address)?;
        info!(peer = %peer, "registered peer");
    }
    Ok((
        StatusCode::CREATED,
        Json(RegisterOut {
            message: "New nodes have been added",
            total_nodes: registry.peers().cloned().collect(),
        }),
    ))
}

/// Fetch every registered peer's chain and apply the longest-valid-chain
/// rule. Unreachable peers are skipped for the round, never fatal; an
/// empty registry resolves to a no-op.
async fn resolve_conflicts(State(state): State<AppState>) -> Json<ResolveOut> {
    let peers: Vec<PeerAddr> = state.registry.read().await.peers().cloned().collect();
    let mut candidates = Vec::with_capacity(peers.len());
    for peer in peers {
        match fetch_chain(&state.http, &peer).await {
            Ok(chain) => candidates.push((peer, chain)),
            Err(err) => warn!(error = %err, "skipping peer for this round"),
        }
    }

    let mut ledger = state.ledger.write().await;
    let outcome = consensus::resolve(ledger.chain(), &candidates);
    let message = if outcome.replaced {
        "Our chain was replaced"
    } else {
        "Our chain is authoritative"
    };
    if outcome.replaced {
        ledger.replace_chain(outcome.chain.clone());
    }
    Json(ResolveOut {
        message,
        replaced: outcome.replaced,
        chain: outcome.chain,
    })
}

async fn fetch_chain(http: &reqwest::Client, peer: &PeerAddr) -> Result<Vec<Block>, LedgerError> {
    let unreachable = |reason: String| LedgerError::PeerUnreachable {
        peer: peer.to_string(),
        reason,
    };
    let response = http
        .get(format!("http://{peer}/chain"))
        .send()
        .await
        .map_err(|err| unreachable(err.to_string()))?
        .error_for_status()
        .map_err(|err| unreachable(err.to_string()))?;
    let envelope: ChainEnvelope = response
        .json()
        .await
        .map_err(|err| unreachable(err.to_string()))?;
    Ok(envelope.chain)
}

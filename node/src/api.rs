//! # REST API
//!
//! Builds the axum router that exposes the ledger over HTTP. All
//! endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                       | Description                           |
//! |--------|----------------------------|---------------------------------------|
//! | GET    | `/health`                  | Liveness probe                        |
//! | GET    | `/status`                  | Ledger summary                        |
//! | POST   | `/transactions`            | Submit a signed vault transaction     |
//! | GET    | `/transactions/:signature` | Receipt of a processed transaction    |
//! | GET    | `/accounts/:address`       | Raw account state                     |
//! | GET    | `/vaults/:owner`           | Fungible and native vaults of owner   |
//! | GET    | `/lockups/:owner`          | Outstanding lockups of owner          |
//! | GET    | `/holdings/:owner`         | Token balances labelled from the list |
//! | POST   | `/faucet`                  | Pay coin out of the operator balance  |
//! | POST   | `/mints`                   | New mint under the operator authority |
//! | POST   | `/mints/:mint/issue`       | Mint units into an owner's account    |
//!
//! The last three spend the operator key's balance and mint authority.
//! They answer 503 when the node runs without an operator key.
//!
//! Ledger errors come back as `{ error, code, kind, class }`. The HTTP
//! status follows the error class: transient → 409, internal → 500,
//! caller errors → 404 for missing vaults/lockups/accounts and 400 otherwise.

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use hodl_protocol::crypto::keys::Signature;
use hodl_protocol::derivation::associated_token_address;
use hodl_protocol::metadata::{AssetRegistry, DisplayHolding};
use hodl_protocol::records::{
    Account, LockupRecord, Mint, NativeVaultRecord, Record, TokenAccount, VaultRecord,
};
use hodl_protocol::{Address, ErrorClass, Ledger, LedgerError, Receipt, Transaction};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone. The ledger is a handle over a shared sled database.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    pub ledger: Ledger,
    /// Token list used to label `/holdings`.
    pub assets: Arc<AssetRegistry>,
    pub metrics: SharedMetrics,
    /// Operator key address, funded at genesis. `None` disables the
    /// faucet and mint routes.
    pub operator: Option<Address>,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/transactions", post(submit_handler))
        .route("/transactions/:signature", get(receipt_handler))
        .route("/accounts/:address", get(account_handler))
        .route("/vaults/:owner", get(vaults_handler))
        .route("/lockups/:owner", get(lockups_handler))
        .route("/holdings/:owner", get(holdings_handler))
        .route("/faucet", post(faucet_handler))
        .route("/mints", post(create_mint_handler))
        .route("/mints/:mint/issue", post(issue_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: String,
    /// Vault program id all addresses are derived under.
    pub program_id: Address,
    /// Ledger time used for maturity checks, in Unix seconds.
    pub ledger_time: i64,
    pub accounts: usize,
    /// Number of processed transactions.
    pub transactions: usize,
    pub outstanding_lockups: i64,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /accounts/:address`.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub address: Address,
    pub lamports: u64,
    /// Program that controls the account data.
    pub owner: Address,
    pub data_len: usize,
    /// Record name when the data carries a known discriminator.
    pub record: Option<&'static str>,
}

/// A record together with the address it lives at.
#[derive(Debug, Serialize)]
pub struct Located<T> {
    pub address: Address,
    #[serde(flatten)]
    pub record: T,
}

/// Response payload for `GET /vaults/:owner`.
#[derive(Debug, Serialize)]
pub struct VaultsResponse {
    pub owner: Address,
    pub vaults: Vec<Located<VaultRecord>>,
    pub native_vaults: Vec<Located<NativeVaultRecord>>,
}

/// One entry of `GET /lockups/:owner`.
#[derive(Debug, Serialize)]
pub struct LockupView {
    pub address: Address,
    #[serde(flatten)]
    pub lockup: LockupRecord,
    /// Whether the release time has passed at ledger time.
    pub mature: bool,
}

/// Response payload for `GET /holdings/:owner`.
#[derive(Debug, Serialize)]
pub struct HoldingsResponse {
    pub owner: Address,
    pub holdings: Vec<DisplayHolding>,
}

/// Request body for `POST /faucet`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FaucetRequest {
    pub to: Address,
    pub lamports: u64,
}

/// Response payload for `POST /faucet`.
#[derive(Debug, Serialize)]
pub struct FaucetResponse {
    pub to: Address,
    /// Recipient balance after the payout.
    pub balance: u64,
}

/// Request body for `POST /mints`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateMintRequest {
    pub decimals: u8,
}

/// Response payload for `POST /mints`.
#[derive(Debug, Serialize)]
pub struct CreateMintResponse {
    pub mint: Address,
    pub mint_authority: Address,
}

/// Request body for `POST /mints/:mint/issue`.
#[derive(Debug, Serialize, Deserialize)]
pub struct IssueRequest {
    pub owner: Address,
    pub amount: u64,
}

/// Response payload for `POST /mints/:mint/issue`.
#[derive(Debug, Serialize)]
pub struct IssueResponse {
    pub token_account: Address,
    pub balance: u64,
}

/// Error body returned by every endpoint on failure.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<ErrorClass>,
}

/// A failed request, rendered as [`ErrorResponse`].
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn plain(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: message.into(),
                code: None,
                kind: None,
                class: None,
            },
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::plain(StatusCode::BAD_REQUEST, message)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self {
            status: status_for(&err),
            body: ErrorResponse {
                error: err.to_string(),
                code: Some(err.code()),
                kind: Some(err.kind()),
                class: Some(err.class()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// HTTP status for a ledger error.
pub fn status_for(err: &LedgerError) -> StatusCode {
    match err.class() {
        ErrorClass::Transient => StatusCode::CONFLICT,
        ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorClass::CallerError => match err {
            LedgerError::VaultNotFound { .. }
            | LedgerError::LockupNotFound { .. }
            | LedgerError::AccountNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        },
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("invalid address: {raw}")))
}

fn operator(state: &AppState) -> Result<Address, ApiError> {
    state
        .operator
        .ok_or_else(|| ApiError::plain(StatusCode::SERVICE_UNAVAILABLE, "no operator key loaded"))
}

fn record_name(account: &Account) -> Option<&'static str> {
    let data = &account.data;
    if VaultRecord::matches(data) {
        Some(VaultRecord::NAME)
    } else if NativeVaultRecord::matches(data) {
        Some(NativeVaultRecord::NAME)
    } else if LockupRecord::matches(data) {
        Some(LockupRecord::NAME)
    } else if TokenAccount::matches(data) {
        Some(TokenAccount::NAME)
    } else if Mint::matches(data) {
        Some(Mint::NAME)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` - returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` - ledger summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db = state.ledger.db();
    Json(StatusResponse {
        version: state.version.clone(),
        program_id: *state.ledger.program_id(),
        ledger_time: state.ledger.now(),
        accounts: db.account_count(),
        transactions: db.signature_count(),
        outstanding_lockups: state.metrics.outstanding_lockups.get(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `POST /transactions` - verify and apply a signed transaction.
async fn submit_handler(
    State(state): State<AppState>,
    Json(tx): Json<Transaction>,
) -> ApiResult<Receipt> {
    let started = Instant::now();
    match state.ledger.process(&tx) {
        Ok(receipt) => {
            state.metrics.observe_commit(receipt.kind, started.elapsed());
            Ok(Json(receipt))
        }
        Err(err) => {
            state.metrics.observe_rejection(&err, started.elapsed());
            Err(err.into())
        }
    }
}

/// `GET /transactions/:signature` - receipt lookup.
async fn receipt_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<Receipt>, ApiError> {
    let signature: Signature = raw
        .parse()
        .map_err(|_| ApiError::bad_request(format!("invalid signature: {raw}")))?;
    match state.ledger.receipt(&signature)? {
        Some(receipt) => Ok(Json(receipt)),
        None => Err(ApiError::plain(
            StatusCode::NOT_FOUND,
            format!("transaction not found: {signature}"),
        )),
    }
}

/// `GET /accounts/:address` - raw account state.
async fn account_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<AccountResponse> {
    let address = parse_address(&raw)?;
    let account = state
        .ledger
        .account(&address)?
        .ok_or(LedgerError::AccountNotFound(address))?;
    Ok(Json(AccountResponse {
        address,
        lamports: account.lamports,
        owner: account.owner,
        data_len: account.data.len(),
        record: record_name(&account),
    }))
}

/// `GET /vaults/:owner` - every vault opened by `owner`.
async fn vaults_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<VaultsResponse> {
    let owner = parse_address(&raw)?;
    let vaults = state
        .ledger
        .vaults_of(&owner)?
        .into_iter()
        .map(|(address, record)| Located { address, record })
        .collect();
    let native_vaults = state
        .ledger
        .native_vaults_of(&owner)?
        .into_iter()
        .map(|(address, record)| Located { address, record })
        .collect();
    Ok(Json(VaultsResponse {
        owner,
        vaults,
        native_vaults,
    }))
}

/// `GET /lockups/:owner` - outstanding lockups, with maturity at ledger time.
async fn lockups_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<Vec<LockupView>> {
    let owner = parse_address(&raw)?;
    let now = state.ledger.now();
    let lockups = state
        .ledger
        .lockups_of(&owner)?
        .into_iter()
        .map(|(address, lockup)| LockupView {
            address,
            mature: lockup.is_mature(now),
            lockup,
        })
        .collect();
    Ok(Json(lockups))
}

/// `GET /holdings/:owner` - token balances joined with the asset list.
async fn holdings_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> ApiResult<HoldingsResponse> {
    let owner = parse_address(&raw)?;
    let balances = state
        .ledger
        .token_accounts_of(&owner)?
        .into_iter()
        .map(|(_, account)| (account.mint, account.amount));
    Ok(Json(HoldingsResponse {
        owner,
        holdings: state.assets.annotate(balances),
    }))
}

/// `POST /faucet` - pay coin from the operator balance, capped per request.
async fn faucet_handler(
    State(state): State<AppState>,
    Json(req): Json<FaucetRequest>,
) -> ApiResult<FaucetResponse> {
    let operator = operator(&state)?;
    let limit = state.ledger.config().faucet_limit;
    if req.lamports > limit {
        return Err(ApiError::bad_request(format!(
            "faucet payout {} exceeds limit {limit}",
            req.lamports
        )));
    }
    state.ledger.transfer(&operator, &req.to, req.lamports)?;
    tracing::info!(to = %req.to, lamports = req.lamports, "faucet payout");
    Ok(Json(FaucetResponse {
        to: req.to,
        balance: state.ledger.lamports(&req.to)?,
    }))
}

/// `POST /mints` - new mint paid for and controlled by the operator.
async fn create_mint_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateMintRequest>,
) -> ApiResult<CreateMintResponse> {
    let operator = operator(&state)?;
    let mint = state.ledger.create_mint(&operator, &operator, req.decimals)?;
    tracing::info!(%mint, decimals = req.decimals, "mint created");
    Ok(Json(CreateMintResponse {
        mint,
        mint_authority: operator,
    }))
}

/// `POST /mints/:mint/issue` - mint into the owner's associated token
/// account, creating it first if needed.
async fn issue_handler(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Json(req): Json<IssueRequest>,
) -> ApiResult<IssueResponse> {
    let operator = operator(&state)?;
    let mint = parse_address(&raw)?;
    if req.amount == 0 {
        return Err(LedgerError::InvalidAmount.into());
    }
    let (token_account, _) =
        associated_token_address(&req.owner, &mint).map_err(LedgerError::from)?;
    if state.ledger.account(&token_account)?.is_none() {
        state.ledger.create_token_account(&operator, &req.owner, &mint)?;
    }
    state.ledger.mint_to(&mint, &operator, &req.owner, req.amount)?;
    Ok(Json(IssueResponse {
        token_account,
        balance: state.ledger.token_balance(&req.owner, &mint)?,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use hodl_protocol::config::{LedgerConfig, DEFAULT_VAULT_PROGRAM_ID, LAMPORTS_PER_COIN};
    use hodl_protocol::crypto::keys::Keypair;
    use hodl_protocol::metadata::AssetMetadata;
    use hodl_protocol::{Instruction, ManualClock};

    use crate::metrics::NodeMetrics;

    const NOW: i64 = 1_700_000_000;

    struct Fixture {
        router: Router,
        state: AppState,
        clock: Arc<ManualClock>,
        alice: Keypair,
        mint: Address,
        unlisted_mint: Address,
    }

    impl Fixture {
        fn program(&self) -> Address {
            *self.state.ledger.program_id()
        }

        fn signed(&self, ix: Instruction, nonce: u64) -> Transaction {
            Transaction::new_signed(ix, &self.alice, nonce).unwrap()
        }
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(NOW));
        let ledger = Ledger::open_temporary(LedgerConfig::default(), clock.clone()).unwrap();

        let issuer = Keypair::generate();
        let alice = Keypair::generate();
        ledger.airdrop(&issuer.address(), 10 * LAMPORTS_PER_COIN).unwrap();
        ledger.airdrop(&alice.address(), 10 * LAMPORTS_PER_COIN).unwrap();

        let mint = ledger.create_mint(&issuer.address(), &issuer.address(), 6).unwrap();
        ledger.create_token_account(&issuer.address(), &alice.address(), &mint).unwrap();
        ledger.mint_to(&mint, &issuer.address(), &alice.address(), 2_500_000).unwrap();

        let unlisted_mint = ledger.create_mint(&issuer.address(), &issuer.address(), 0).unwrap();
        ledger
            .create_token_account(&issuer.address(), &alice.address(), &unlisted_mint)
            .unwrap();
        ledger
            .mint_to(&unlisted_mint, &issuer.address(), &alice.address(), 7)
            .unwrap();

        let assets: AssetRegistry = [AssetMetadata {
            address: mint,
            symbol: "USDC".into(),
            name: "USD Coin".into(),
            decimals: 6,
            logo_uri: None,
        }]
        .into_iter()
        .collect();

        let state = AppState {
            version: "test".into(),
            ledger,
            assets: Arc::new(assets),
            metrics: Arc::new(NodeMetrics::new().unwrap()),
            operator: None,
        };
        Fixture {
            router: create_router(state.clone()),
            state,
            clock,
            alice,
            mint,
            unlisted_mint,
        }
    }

    async fn get(router: &Router, path: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post_tx(router: &Router, tx: &Transaction) -> (StatusCode, serde_json::Value) {
        post_json(router, "/transactions", tx).await
    }

    async fn post_json<T: Serialize>(
        router: &Router,
        path: &str,
        body: &T,
    ) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let f = fixture();
        let (status, body) = get(&f.router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn status_reports_program_and_time() {
        let f = fixture();
        let (status, body) = get(&f.router, "/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["program_id"], f.program().to_string());
        assert_eq!(body["ledger_time"], NOW);
        assert_eq!(body["transactions"], 0);
        assert!(body["accounts"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn lock_then_list_vaults_and_lockups() {
        let f = fixture();
        let program = f.program();
        let owner = f.alice.address();

        let init = f.signed(Instruction::initialize_vault(&program, &owner, &f.mint).unwrap(), 1);
        let (status, receipt) = post_tx(&f.router, &init).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["kind"], "initialize_vault");
        assert_eq!(receipt["signature"], init.signature.to_string());

        let lock = f.signed(
            Instruction::lock(&program, &owner, &f.mint, 1_000, NOW + 60).unwrap(),
            2,
        );
        let (status, _) = post_tx(&f.router, &lock).await;
        assert_eq!(status, StatusCode::OK);

        let (status, vaults) = get(&f.router, &format!("/vaults/{owner}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(vaults["vaults"].as_array().unwrap().len(), 1);
        assert_eq!(vaults["vaults"][0]["asset"], f.mint.to_string());
        assert!(vaults["native_vaults"].as_array().unwrap().is_empty());

        let (status, lockups) = get(&f.router, &format!("/lockups/{owner}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(lockups[0]["amount"], 1_000);
        assert_eq!(lockups[0]["release_time"], NOW + 60);
        assert_eq!(lockups[0]["mature"], false);

        f.clock.advance(60);
        let (_, lockups) = get(&f.router, &format!("/lockups/{owner}")).await;
        assert_eq!(lockups[0]["mature"], true);
        assert_eq!(f.state.metrics.outstanding_lockups.get(), 1);

        let (status, fetched) = get(&f.router, &format!("/transactions/{}", lock.signature)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["kind"], "lock");
    }

    #[tokio::test]
    async fn early_unlock_is_conflict() {
        let f = fixture();
        let program = f.program();
        let owner = f.alice.address();

        post_tx(&f.router, &f.signed(Instruction::initialize_native_vault(&program, &owner).unwrap(), 1)).await;
        post_tx(
            &f.router,
            &f.signed(Instruction::lock_native(&program, &owner, LAMPORTS_PER_COIN, NOW + 10).unwrap(), 2),
        )
        .await;

        let unlock = f.signed(Instruction::unlock_native(&program, &owner).unwrap(), 3);
        let (status, body) = post_tx(&f.router, &unlock).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "NotYetMatured");
        assert_eq!(body["class"], "transient");
        assert!(body["code"].as_u64().unwrap() >= 6000);

        f.clock.advance(10);
        let retry = f.signed(Instruction::unlock_native(&program, &owner).unwrap(), 4);
        let (status, _) = post_tx(&f.router, &retry).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(f.state.metrics.outstanding_lockups.get(), 0);
        assert_eq!(f.state.metrics.transactions_rejected_total.get(), 1);
    }

    #[tokio::test]
    async fn missing_vault_is_not_found() {
        let f = fixture();
        let lock = f.signed(
            Instruction::lock(&f.program(), &f.alice.address(), &f.mint, 5, NOW + 1).unwrap(),
            1,
        );
        let (status, body) = post_tx(&f.router, &lock).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "VaultNotFound");
        assert_eq!(body["class"], "caller_error");
    }

    #[tokio::test]
    async fn replayed_transaction_is_bad_request() {
        let f = fixture();
        let init = f.signed(
            Instruction::initialize_native_vault(&f.program(), &f.alice.address()).unwrap(),
            9,
        );
        let (first, _) = post_tx(&f.router, &init).await;
        assert_eq!(first, StatusCode::OK);
        let (second, body) = post_tx(&f.router, &init).await;
        assert_eq!(second, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "DuplicateTransaction");
    }

    #[tokio::test]
    async fn tampered_signature_is_rejected() {
        let f = fixture();
        let mut tx = f.signed(
            Instruction::initialize_native_vault(&f.program(), &f.alice.address()).unwrap(),
            1,
        );
        tx.nonce += 1;
        let (status, body) = post_tx(&f.router, &tx).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "InvalidSignature");
    }

    #[tokio::test]
    async fn account_endpoint() {
        let f = fixture();
        let (status, body) = get(&f.router, &format!("/accounts/{}", f.alice.address())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["record"], serde_json::Value::Null);
        assert!(body["lamports"].as_u64().unwrap() > 0);

        let (status, body) = get(&f.router, &format!("/accounts/{}", f.mint)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["record"], "Mint");

        let unknown = Address::new_unique();
        let (status, body) = get(&f.router, &format!("/accounts/{unknown}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "AccountNotFound");

        let (status, _) = get(&f.router, "/accounts/not-an-address").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn holdings_are_labelled_and_filtered() {
        let f = fixture();
        let (status, body) = get(&f.router, &format!("/holdings/{}", f.alice.address())).await;
        assert_eq!(status, StatusCode::OK);
        let holdings = body["holdings"].as_array().unwrap();
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0]["symbol"], "USDC");
        assert_eq!(holdings[0]["ui_amount"], "2.5");
        assert!(holdings
            .iter()
            .all(|h| h["mint"] != f.unlisted_mint.to_string()));
    }

    #[tokio::test]
    async fn unknown_receipt_is_not_found() {
        let f = fixture();
        let tx = f.signed(
            Instruction::initialize_native_vault(&f.program(), &f.alice.address()).unwrap(),
            1,
        );
        let (status, _) = get(&f.router, &format!("/transactions/{}", tx.signature)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    /// A node as `run` starts it on an empty database: nothing but the
    /// operator's genesis allocation.
    fn fresh_node(with_operator: bool) -> (Router, Address) {
        let config = LedgerConfig::default();
        let allocation = config.operator_allocation;
        let ledger = Ledger::open_temporary(config, Arc::new(ManualClock::new(NOW))).unwrap();
        let operator = Keypair::generate().address();
        ledger.initialize_genesis(&operator, allocation).unwrap();
        let state = AppState {
            version: "test".into(),
            ledger,
            assets: Arc::new(AssetRegistry::default()),
            metrics: Arc::new(NodeMetrics::new().unwrap()),
            operator: with_operator.then_some(operator),
        };
        (create_router(state), operator)
    }

    #[tokio::test]
    async fn fresh_node_commits_after_faucet() {
        let (router, _) = fresh_node(true);
        let alice = Keypair::generate();
        let program = DEFAULT_VAULT_PROGRAM_ID;
        let init = |nonce| {
            Transaction::new_signed(
                Instruction::initialize_native_vault(&program, &alice.address()).unwrap(),
                &alice,
                nonce,
            )
            .unwrap()
        };

        let (status, body) = post_tx(&router, &init(1)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "InsufficientFunds");

        let faucet = FaucetRequest {
            to: alice.address(),
            lamports: LAMPORTS_PER_COIN,
        };
        let (status, body) = post_json(&router, "/faucet", &faucet).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balance"], LAMPORTS_PER_COIN);

        let (status, receipt) = post_tx(&router, &init(2)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["kind"], "initialize_native_vault");
    }

    #[tokio::test]
    async fn operator_mint_then_lock() {
        let (router, operator) = fresh_node(true);
        let alice = Keypair::generate();
        let owner = alice.address();
        let program = DEFAULT_VAULT_PROGRAM_ID;

        let faucet = FaucetRequest {
            to: owner,
            lamports: LAMPORTS_PER_COIN,
        };
        post_json(&router, "/faucet", &faucet).await;

        let (status, body) = post_json(&router, "/mints", &CreateMintRequest { decimals: 6 }).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mint_authority"], operator.to_string());
        let mint: Address = body["mint"].as_str().unwrap().parse().unwrap();

        let issue = IssueRequest { owner, amount: 500 };
        let path = format!("/mints/{mint}/issue");
        let (status, body) = post_json(&router, &path, &issue).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balance"], 500);
        let (_, body) = post_json(&router, &path, &issue).await;
        assert_eq!(body["balance"], 1_000);

        let init = Transaction::new_signed(
            Instruction::initialize_vault(&program, &owner, &mint).unwrap(),
            &alice,
            1,
        )
        .unwrap();
        let (status, _) = post_tx(&router, &init).await;
        assert_eq!(status, StatusCode::OK);

        let lock = Transaction::new_signed(
            Instruction::lock(&program, &owner, &mint, 750, NOW + 60).unwrap(),
            &alice,
            2,
        )
        .unwrap();
        let (status, _) = post_tx(&router, &lock).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn faucet_is_capped_and_needs_operator() {
        let (router, _) = fresh_node(true);
        let over = FaucetRequest {
            to: Keypair::generate().address(),
            lamports: LedgerConfig::default().faucet_limit + 1,
        };
        let (status, _) = post_json(&router, "/faucet", &over).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (router, _) = fresh_node(false);
        let ok = FaucetRequest {
            to: Keypair::generate().address(),
            lamports: 1,
        };
        let (status, _) = post_json(&router, "/faucet", &ok).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, _) = post_json(&router, "/mints", &CreateMintRequest { decimals: 0 }).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}

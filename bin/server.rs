// Agroreal - API Server
// JSON API over the ledger, with axum

use agroreal::config::Config;
use agroreal::logging::init_logger;
use agroreal::{
    build_dashboard, Client, ClientUpdate, CurrencyFormatter, Ledger, LedgerError, NewClient,
    NewPayment, NewPurchase, Page, Payment, PaymentUpdate, Purchase, PurchaseFilter,
    PurchaseUpdate, RegistryCard,
};
use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
struct AppState {
    ledger: Arc<Mutex<Ledger>>,
    formatter: CurrencyFormatter,
    recent: u32,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn message(message: &str) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.to_string()),
            error: None,
        }
    }

    fn error(error: String) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
enum ApiError {
    Ledger(LedgerError),
    BadRequest(String),
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Ledger(LedgerError::NotFound(m)) => (StatusCode::NOT_FOUND, m),
            ApiError::Ledger(LedgerError::Validation(m)) => (StatusCode::BAD_REQUEST, m),
            ApiError::Ledger(LedgerError::BusinessRule(m)) => (StatusCode::CONFLICT, m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Ledger(err) => {
                error!(%err, "ledger failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            ApiError::Internal(m) => {
                error!(reason = %m, "internal failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(ApiResponse::error(message))).into_response()
    }
}

/// Run `f` with the ledger locked
fn with_ledger<T>(
    state: &AppState,
    f: impl FnOnce(&mut Ledger) -> agroreal::Result<T>,
) -> Result<T, ApiError> {
    let mut ledger = state
        .ledger
        .lock()
        .map_err(|_| ApiError::Internal("ledger lock poisoned".to_string()))?;

    Ok(f(&mut *ledger)?)
}

// ============================================================================
// Query parameters
// ============================================================================

fn yes() -> bool {
    true
}

#[derive(Deserialize)]
struct ClientQuery {
    limit: Option<u32>,
    #[serde(default)]
    offset: u32,
    #[serde(default = "yes")]
    only_active: bool,
}

#[derive(Deserialize)]
struct PurchaseQuery {
    limit: Option<u32>,
    #[serde(default)]
    offset: u32,
    #[serde(default)]
    filter: PurchaseFilter,
}

#[derive(Deserialize)]
struct ActiveQuery {
    #[serde(default = "yes")]
    only_active: bool,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/dashboard - Registry cards for the home screen
async fn get_dashboard(State(state): State<AppState>) -> ApiResult<Vec<RegistryCard>> {
    let cards = with_ledger(&state, |ledger| {
        build_dashboard(ledger, &state.formatter, state.recent)
    })?;
    Ok(Json(ApiResponse::ok(cards)))
}

// --- Clients -----------------------------------------------------------------

/// GET /api/clients
async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<ClientQuery>,
) -> ApiResult<Vec<Client>> {
    let page = Page {
        limit: query.limit,
        offset: query.offset,
    };
    let clients = with_ledger(&state, |ledger| ledger.list_clients(page, query.only_active))?;
    Ok(Json(ApiResponse::ok(clients)))
}

/// GET /api/clients/:id
async fn get_client(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Client> {
    let client = with_ledger(&state, |ledger| ledger.client(id))?;
    Ok(Json(ApiResponse::ok(client)))
}

/// POST /api/clients
async fn create_client(
    State(state): State<AppState>,
    payload: Result<Json<NewClient>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Client>>), ApiError> {
    let Json(new) = payload?;
    let client = with_ledger(&state, |ledger| ledger.create_client(new))?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(client))))
}

/// PUT /api/clients/:id
async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<ClientUpdate>, JsonRejection>,
) -> ApiResult<Client> {
    let Json(update) = payload?;
    let client = with_ledger(&state, |ledger| ledger.update_client(id, update))?;
    Ok(Json(ApiResponse::ok(client)))
}

/// DELETE /api/clients/:id - Soft delete, cascading to purchases and payments
async fn deactivate_client(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    with_ledger(&state, |ledger| ledger.deactivate_client(id))?;
    Ok(Json(ApiResponse::message("Client deactivated.")))
}

/// GET /api/clients/:id/purchases
async fn list_client_purchases(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<ActiveQuery>,
) -> ApiResult<Vec<Purchase>> {
    let purchases = with_ledger(&state, |ledger| ledger.client_purchases(id, query.only_active))?;
    Ok(Json(ApiResponse::ok(purchases)))
}

/// POST /api/clients/:id/purchases - Optionally with a first payment
async fn create_purchase(
    State(state): State<AppState>,
    Path(client_id): Path<i64>,
    payload: Result<Json<NewPurchase>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Purchase>>), ApiError> {
    let Json(new) = payload?;
    let purchase = with_ledger(&state, |ledger| ledger.create_purchase(client_id, new))?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(purchase))))
}

// --- Purchases ---------------------------------------------------------------

/// GET /api/purchases?filter=all|active|outstanding
async fn list_purchases(
    State(state): State<AppState>,
    Query(query): Query<PurchaseQuery>,
) -> ApiResult<Vec<Purchase>> {
    let page = Page {
        limit: query.limit,
        offset: query.offset,
    };
    let purchases = with_ledger(&state, |ledger| ledger.list_purchases(page, query.filter))?;
    Ok(Json(ApiResponse::ok(purchases)))
}

/// GET /api/purchases/:id
async fn get_purchase(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Purchase> {
    let purchase = with_ledger(&state, |ledger| ledger.purchase(id))?;
    Ok(Json(ApiResponse::ok(purchase)))
}

/// GET /api/purchases/by-note/:note_number
async fn get_purchase_by_note(
    State(state): State<AppState>,
    Path(note_number): Path<String>,
) -> ApiResult<Purchase> {
    let purchase = with_ledger(&state, |ledger| ledger.purchase_by_note(&note_number))?;
    Ok(Json(ApiResponse::ok(purchase)))
}

/// PUT /api/purchases/:id
async fn update_purchase(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<PurchaseUpdate>, JsonRejection>,
) -> ApiResult<Purchase> {
    let Json(update) = payload?;
    let purchase = with_ledger(&state, |ledger| ledger.update_purchase(id, update))?;
    Ok(Json(ApiResponse::ok(purchase)))
}

/// DELETE /api/purchases/:id
async fn deactivate_purchase(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    with_ledger(&state, |ledger| ledger.deactivate_purchase(id))?;
    Ok(Json(ApiResponse::message("Purchase deactivated.")))
}

/// POST /api/purchases/:id/activate
async fn activate_purchase(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Purchase> {
    let purchase = with_ledger(&state, |ledger| ledger.activate_purchase(id))?;
    Ok(Json(ApiResponse::ok(purchase)))
}

// --- Payments ----------------------------------------------------------------

/// GET /api/purchases/:id/payments - Includes deactivated payments
async fn list_purchase_payments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(page): Query<Page>,
) -> ApiResult<Vec<Payment>> {
    let payments = with_ledger(&state, |ledger| ledger.purchase_payments(id, page))?;
    Ok(Json(ApiResponse::ok(payments)))
}

/// POST /api/purchases/:id/payments
async fn create_payment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<NewPayment>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Payment>>), ApiError> {
    let Json(new) = payload?;
    let payment = with_ledger(&state, |ledger| ledger.create_payment(id, new))?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(payment))))
}

/// PUT /api/purchases/:id/payments/:payment_id
async fn update_payment(
    State(state): State<AppState>,
    Path((id, payment_id)): Path<(i64, i64)>,
    payload: Result<Json<PaymentUpdate>, JsonRejection>,
) -> ApiResult<Payment> {
    let Json(update) = payload?;
    let payment = with_ledger(&state, |ledger| ledger.update_payment(id, payment_id, update))?;
    Ok(Json(ApiResponse::ok(payment)))
}

/// DELETE /api/purchases/:id/payments/:payment_id
async fn deactivate_payment(
    State(state): State<AppState>,
    Path((id, payment_id)): Path<(i64, i64)>,
) -> ApiResult<()> {
    with_ledger(&state, |ledger| ledger.deactivate_payment(id, payment_id))?;
    Ok(Json(ApiResponse::message("Payment deactivated.")))
}

/// POST /api/purchases/:id/payments/:payment_id/activate
async fn activate_payment(
    State(state): State<AppState>,
    Path((id, payment_id)): Path<(i64, i64)>,
) -> ApiResult<Payment> {
    let payment = with_ledger(&state, |ledger| ledger.activate_payment(id, payment_id))?;
    Ok(Json(ApiResponse::ok(payment)))
}

/// GET /api/payments - Active payments only
async fn list_payments(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> ApiResult<Vec<Payment>> {
    let payments = with_ledger(&state, |ledger| ledger.list_payments(page))?;
    Ok(Json(ApiResponse::ok(payments)))
}

/// GET /api/payments/:id
async fn get_payment(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Payment> {
    let payment = with_ledger(&state, |ledger| ledger.payment(id))?;
    Ok(Json(ApiResponse::ok(payment)))
}

// ============================================================================
// Router
// ============================================================================

fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/dashboard", get(get_dashboard))
        .route("/clients", get(list_clients).post(create_client))
        .route(
            "/clients/:id",
            get(get_client).put(update_client).delete(deactivate_client),
        )
        .route(
            "/clients/:id/purchases",
            get(list_client_purchases).post(create_purchase),
        )
        .route("/purchases", get(list_purchases))
        .route("/purchases/by-note/:note_number", get(get_purchase_by_note))
        .route(
            "/purchases/:id",
            get(get_purchase).put(update_purchase).delete(deactivate_purchase),
        )
        .route("/purchases/:id/activate", post(activate_purchase))
        .route(
            "/purchases/:id/payments",
            get(list_purchase_payments).post(create_payment),
        )
        .route(
            "/purchases/:id/payments/:payment_id",
            put(update_payment).delete(deactivate_payment),
        )
        .route(
            "/purchases/:id/payments/:payment_id/activate",
            post(activate_payment),
        )
        .route("/payments", get(list_payments))
        .route("/payments/:id", get(get_payment))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger(false);

    println!("🌐 Agroreal - API Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = Config::from_env().context("Invalid configuration")?;

    let ledger = Ledger::open(&config.db_path)
        .with_context(|| format!("Failed to open {}", config.db_path.display()))?;
    println!("✓ Database opened: {}", config.db_path.display());

    // Create shared state
    let state = AppState {
        ledger: Arc::new(Mutex::new(ledger)),
        formatter: config.formatter()?,
        recent: config.recent_limit,
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "server listening");
    println!("\n🚀 Server running on http://{}", config.bind_addr);
    println!("   API: http://{}/api/dashboard", config.bind_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app(state))
        .await
        .context("Server stopped")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> Router {
        app(AppState {
            ledger: Arc::new(Mutex::new(Ledger::in_memory().unwrap())),
            formatter: CurrencyFormatter::default(),
            recent: 5,
        })
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(&test_app(), Method::GET, "/api/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_purchase_flow() {
        let app = test_app();

        let (status, client) = call(
            &app,
            Method::POST,
            "/api/clients",
            Some(json!({ "name": "João Silva", "nickname": "joao" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let client_id = client["data"]["id"].as_i64().unwrap();

        let (status, purchase) = call(
            &app,
            Method::POST,
            &format!("/api/clients/{}/purchases", client_id),
            Some(json!({
                "description": "Compra de sementes",
                "total_value": 100.0,
                "note_number": "NF-0001",
                "payment": { "amount": 50.0, "method": "Pix" }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(purchase["data"]["status"], "partial");
        let purchase_id = purchase["data"]["id"].as_i64().unwrap();

        let (status, payment) = call(
            &app,
            Method::POST,
            &format!("/api/purchases/{}/payments", purchase_id),
            Some(json!({ "amount": 50.0, "method": "Pix" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let payment_id = payment["data"]["id"].as_i64().unwrap();

        let (_, by_note) = call(&app, Method::GET, "/api/purchases/by-note/NF-0001", None).await;
        assert_eq!(by_note["data"]["status"], "paid");

        let (status, _) = call(
            &app,
            Method::DELETE,
            &format!("/api/purchases/{}/payments/{}", purchase_id, payment_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, payments) = call(
            &app,
            Method::GET,
            &format!("/api/purchases/{}/payments", purchase_id),
            None,
        )
        .await;
        assert_eq!(payments["data"].as_array().unwrap().len(), 2);

        let (_, dashboard) = call(&app, Method::GET, "/api/dashboard", None).await;
        assert_eq!(dashboard["data"][1]["route"], "/purchases");
        assert_eq!(dashboard["data"][1]["actionLabel"], "See all purchases");
        assert_eq!(dashboard["data"][1]["recentRegistries"][0]["valueColor"], "yellow");
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let app = test_app();

        let (status, body) = call(&app, Method::GET, "/api/clients/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Client not found.");

        let (status, _) = call(&app, Method::POST, "/api/clients", Some(json!({ "name": "R2-D2" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/clients",
            Some(json!({ "name": "Ana", "status": "vip" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        call(&app, Method::POST, "/api/clients", Some(json!({ "name": "Ana", "nickname": "ana" }))).await;
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/clients",
            Some(json!({ "name": "Ana Maria", "nickname": "ana" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_client_deactivation_cascades() {
        let app = test_app();
        let (_, client) = call(&app, Method::POST, "/api/clients", Some(json!({ "name": "Maria Souza" }))).await;
        let client_id = client["data"]["id"].as_i64().unwrap();

        call(
            &app,
            Method::POST,
            &format!("/api/clients/{}/purchases", client_id),
            Some(json!({ "description": "Compra de adubo", "total_value": 200.0 })),
        )
        .await;

        let (status, body) = call(&app, Method::DELETE, &format!("/api/clients/{}", client_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Client deactivated.");

        let (_, active) = call(&app, Method::GET, "/api/purchases?filter=active", None).await;
        assert!(active["data"].as_array().unwrap().is_empty());

        let (_, all) = call(&app, Method::GET, "/api/purchases?filter=all", None).await;
        assert_eq!(all["data"][0]["is_active"], false);

        let (status, _) = call(&app, Method::DELETE, &format!("/api/clients/{}", client_id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

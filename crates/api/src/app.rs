use axum::{
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::routes::{admin, auth, emails, health, payments, registrations};
use crate::services::auth::AuthService;
use crate::services::cookies::CookieHelper;
use crate::services::email::EmailService;
use crate::services::payment::PaymentGateway;
use crate::services::registration::RegistrationWorkflow;
use shared::jwt::JwtConfig;

/// Shared application state: the connection pool and the explicitly
/// constructed service handles, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub cookies: CookieHelper,
    pub email: EmailService,
    pub payments: PaymentGateway,
    pub workflow: RegistrationWorkflow,
    pub auth: AuthService,
    pub metrics: Option<PrometheusHandle>,
}

/// Builds the application state and router.
pub fn create_app(config: Config, pool: PgPool) -> anyhow::Result<Router> {
    let config = Arc::new(config);

    let jwt = Arc::new(JwtConfig::new(
        &normalize_pem_key(&config.jwt.private_key),
        &normalize_pem_key(&config.jwt.public_key),
        config.jwt.session_expiry_secs,
        config.jwt.leeway_secs,
    )?);

    let cookies = CookieHelper::new(config.cookie.clone(), config.jwt.session_expiry_secs);
    let email = EmailService::from_config(&config.email, pool.clone());
    let payments = PaymentGateway::new(config.payment.clone(), pool.clone());
    let workflow = RegistrationWorkflow::new(pool.clone(), email.clone());
    let auth = AuthService::new(pool.clone(), jwt.clone(), config.google.clone());

    // The recorder is process-global; a second create_app (tests) reuses none
    let metrics = PrometheusBuilder::new().install_recorder().ok();

    let state = AppState {
        pool,
        config: config.clone(),
        jwt,
        cookies,
        email,
        payments,
        workflow,
        auth,
        metrics,
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let api_routes = Router::new()
        // Participant-facing registration routes
        .route("/participant/register", post(registrations::register))
        .route("/participant/events", get(registrations::list_events))
        .route(
            "/participant/registrations",
            get(registrations::list_registrations),
        )
        .route(
            "/participant/registration/:id",
            get(registrations::get_registration),
        )
        .route(
            "/participant/registration/:id/status",
            post(registrations::update_status),
        )
        .route(
            "/participant/registration/:id/note",
            post(registrations::add_note),
        )
        .route(
            "/participant/registration/:id/resend-email",
            post(registrations::resend_email),
        )
        .route(
            "/participant/registration/:id/payment",
            post(registrations::update_payment_info),
        )
        .route("/participant/bulk-action", post(registrations::bulk_action))
        // Payment routes
        .route("/payment/initiate", post(payments::initiate))
        .route("/payment/initiate-test", post(payments::initiate_test))
        .route(
            "/payment/verify",
            get(payments::verify_redirect).post(payments::verify_callback_query),
        )
        .route(
            "/payment/verify/:transaction_id",
            get(payments::verify_redirect_path).post(payments::verify_callback),
        )
        .route(
            "/payment/test/verify/:transaction_id",
            post(payments::verify_test),
        )
        .route("/payment/status/:transaction_id", get(payments::status))
        .route(
            "/payment/status/:transaction_id/live",
            get(payments::status_live),
        )
        // Email routes (admin-gated via extractors)
        .route(
            "/email/templates",
            get(emails::list_templates).post(emails::create_template),
        )
        .route("/email/templates/:id", put(emails::update_template))
        .route("/email/send", post(emails::send))
        .route("/email/send-bulk", post(emails::send_bulk))
        .route("/email/logs", get(emails::list_logs))
        // Auth routes
        .route("/auth/google", get(auth::google_auth))
        .route("/auth/google/callback", get(auth::google_callback))
        .route("/auth/login", post(auth::admin_login))
        .route("/auth/request-otp", post(auth::request_otp))
        .route("/auth/verify-otp", post(auth::verify_otp))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", get(auth::logout))
        // Admin user management
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:id/toggle-admin", post(admin::toggle_admin));

    let router = Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/metrics", get(health::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state);

    Ok(router)
}

/// Converts literal `\n` sequences in PEM keys to newlines, for environment
/// variable compatibility.
fn normalize_pem_key(key: &str) -> String {
    key.replace("\\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pem_key() {
        let key = "-----BEGIN KEY-----\\nabc\\n-----END KEY-----";
        let normalized = normalize_pem_key(key);
        assert!(normalized.contains("\n"));
        assert!(!normalized.contains("\\n"));
    }

    #[test]
    fn test_normalize_pem_key_noop_on_real_newlines() {
        let key = "-----BEGIN KEY-----\nabc\n-----END KEY-----";
        assert_eq!(normalize_pem_key(key), key);
    }
}

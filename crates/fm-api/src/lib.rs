use std::net::{IpAddr, SocketAddr};
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::connect_info::ConnectInfo,
    extract::DefaultBodyLimit,
    extract::State,
    http::header::{HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    http::Method,
    http::Request,
    middleware,
    middleware::Next,
    response::Response,
    routing::get,
    Router,
};
use chrono::{TimeZone, Utc};
use clap::Parser;
use dotenvy::dotenv;
use governor::{
    clock::DefaultClock, middleware::NoOpMiddleware, state::keyed::DashMapStateStore, Quota,
    RateLimiter,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

use fm_common::db::{migrate_url, PgProfileRepository};
use fm_common::logging::{init_tracing_subscriber, install_tracing_panic_hook};
use fm_common::matching::pipeline::DEFAULT_SHARD_THRESHOLD;
use fm_common::matching::{MatchingEngine, MatchingEngineConfig, RankerConfig, SynonymTable};
use fm_common::repository::{Fixtures, InMemoryRepository, ProfileRepository};
use fm_common::skill_normalizer::normalize;
use fm_common::{run_id, CandidateProfile, JobPosting, JobStatus};

pub mod auth;
pub mod error;
pub mod handlers;

use auth::{AuthConfig, AuthMode};
use error::ApiError;
use handlers::{health, matches};

const SHUTDOWN_DRAIN_GRACE: Duration = Duration::from_millis(200);
const DEFAULT_METRICS_PORT: u16 = 9100;

#[derive(Debug, Clone, Parser)]
#[command(name = "fm-api", about = "HTTP API for job/talent match rankings")]
struct Cli {
    /// PostgreSQL connection string; profiles are read from fixtures when unset
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// JSON fixtures `{"candidates": [...], "jobs": [...]}` for the in-memory repository
    #[arg(long, env = "FM_FIXTURES_PATH")]
    fixtures_path: Option<PathBuf>,

    /// JSON skill synonym table
    #[arg(long, env = "FM_SYNONYMS_PATH")]
    synonyms_path: Option<PathBuf>,

    /// Server port
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// API key for X-API-Key authentication
    #[arg(long, env = "FM_API_KEY")]
    api_key: Option<String>,

    /// Authentication mode: api_key | jwt
    #[arg(long, env = "AUTH_MODE", default_value = "api_key", value_enum)]
    auth_mode: AuthMode,

    /// HS256 secret for AUTH_MODE=jwt
    #[arg(long, env = "JWT_SECRET")]
    jwt_secret: Option<String>,

    /// Comma separated list of allowed CORS origins
    #[arg(long, env = "FM_CORS_ORIGINS", default_value = "http://localhost:3000")]
    cors_origins: String,

    /// Pools larger than this are ranked on several threads
    #[arg(long, env = "FM_SHARD_THRESHOLD", default_value_t = DEFAULT_SHARD_THRESHOLD)]
    shard_threshold: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub fixtures_path: Option<PathBuf>,
    pub synonyms_path: Option<PathBuf>,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub auth: AuthConfig,
    pub engine: MatchingEngineConfig,
}

type IpRateLimiter = RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock, NoOpMiddleware>;

#[derive(Clone)]
pub struct RateLimits {
    global: Arc<IpRateLimiter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub per_sec: u32,
    pub burst: u32,
}

impl RateLimitConfig {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            lookup(name)
                .and_then(|value| value.trim().parse::<u32>().ok())
                .filter(|value| *value > 0)
        };

        Self {
            per_sec: read("FM_RATE_LIMIT_PER_SEC").unwrap_or(20),
            burst: read("FM_RATE_LIMIT_BURST").unwrap_or(40),
        }
    }

    fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

fn parse_cors_origins(raw: &str) -> Result<Vec<String>, ApiError> {
    let origins = raw
        .split(',')
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect::<Vec<_>>();

    if origins.iter().any(|origin| origin == "*") {
        return Err(ApiError::Configuration(
            "FM_CORS_ORIGINS must list explicit origins when credentials are enabled".into(),
        ));
    }
    Ok(origins)
}

impl AppConfig {
    fn from_cli(cli: Cli) -> Result<Self, ApiError> {
        let cors_origins = parse_cors_origins(&cli.cors_origins)?;

        let auth = AuthConfig {
            mode: cli.auth_mode,
            api_key: cli.api_key,
            jwt_secret: cli.jwt_secret,
        };
        auth.validate()?;

        let ranker = RankerConfig::from_env()?;

        Ok(Self {
            database_url: cli.database_url,
            fixtures_path: cli.fixtures_path,
            synonyms_path: cli.synonyms_path,
            port: cli.port,
            cors_origins,
            auth,
            engine: MatchingEngineConfig {
                ranker,
                shard_threshold: cli.shard_threshold,
                ..MatchingEngineConfig::default()
            },
        })
    }

    pub fn for_tests(auth: AuthConfig) -> Self {
        Self {
            database_url: None,
            fixtures_path: None,
            synonyms_path: None,
            port: 3001,
            cors_origins: vec!["http://localhost:3000".into()],
            auth,
            engine: MatchingEngineConfig {
                shards: NonZeroUsize::MIN,
                ..MatchingEngineConfig::default()
            },
        }
    }
}

pub struct AppState {
    pub engine: Arc<MatchingEngine>,
    pub config: AppConfig,
    pub(crate) rate_limits: RateLimits,
    pub readiness: Arc<AtomicBool>,
}

pub type SharedState = Arc<AppState>;

impl axum::extract::FromRef<SharedState> for AuthConfig {
    fn from_ref(input: &SharedState) -> AuthConfig {
        input.config.auth.clone()
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-api-key"),
        ])
        .allow_credentials(true)
}

fn build_ip_limiter(config: &RateLimitConfig) -> Arc<IpRateLimiter> {
    let per_second = NonZeroU32::new(config.per_sec).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(config.burst).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::per_second(per_second).allow_burst(burst);

    Arc::new(RateLimiter::keyed(quota))
}

const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

impl RateLimits {
    /// Drops per-IP entries whose quota has fully recovered.
    pub fn prune(&self) {
        self.global.retain_recent();
        self.global.shrink_to_fit();
    }

    pub fn tracked_clients(&self) -> usize {
        self.global.len()
    }
}

fn spawn_rate_limit_pruner(rate_limits: RateLimits, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            rate_limits.prune();
            debug!(clients = rate_limits.tracked_clients(), "pruned rate limiter state");
        }
    })
}

pub fn default_rate_limits() -> RateLimits {
    RateLimits {
        global: build_ip_limiter(&RateLimitConfig::from_env()),
    }
}

fn request_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
}

fn enforce_rate_limit(limiter: &IpRateLimiter, ip: Option<IpAddr>) -> Result<(), ApiError> {
    if let Some(client_ip) = ip {
        if limiter.check_key(&client_ip).is_err() {
            return Err(ApiError::TooManyRequests("rate limit exceeded".into()));
        }
    }

    Ok(())
}

async fn global_rate_limit(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    enforce_rate_limit(&state.rate_limits.global, request_ip(&req))?;
    Ok(next.run(req).await)
}

async fn attach_request_id_context(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    Ok(error::with_request_id(request_id, next.run(req)).await)
}

pub fn create_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let request_id_header = HeaderName::from_static("x-request-id");
    let trace_header = request_id_header.clone();

    let trace = TraceLayer::new_for_http().make_span_with(move |request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(&trace_header)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
            status = tracing::field::Empty,
        )
    });

    let api_routes = Router::new()
        .route("/match/top-jobs", get(matches::top_jobs))
        .route("/match/top-talents", get(matches::top_talents));

    Router::new()
        .route("/health", get(health::readyz))
        .route("/livez", get(health::livez))
        .route("/readyz", get(health::readyz))
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            global_rate_limit,
        ))
        .layer(middleware::from_fn(attach_request_id_context))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(trace)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(
            request_id_header,
            MakeRequestUuid,
        ))
        .layer(cors)
        .with_state(state)
}

fn seed_fixtures() -> Fixtures {
    let posted = |day: u32| {
        Utc.with_ymd_and_hms(2026, 9, day, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    };

    let mut frontend = JobPosting::new(
        "job-frontend",
        "Frontend Engineer",
        "emp-1",
        normalize(&["react", "typescript"]),
        "lagos",
        posted(20),
    )
    .with_preferred_rate(40.0);
    frontend.company_name = Some("Acme".into());

    let mut backend = JobPosting::new(
        "job-backend",
        "Backend Engineer",
        "emp-2",
        normalize(&["rust", "postgres"]),
        "berlin",
        posted(10),
    );
    backend.remote = true;

    let mut filled = JobPosting::new(
        "job-filled",
        "Designer",
        "emp-1",
        normalize(&["figma"]),
        "lagos",
        posted(25),
    );
    filled.close(JobStatus::Filled);

    let profile = |id: &str, skills: &[&str], rate: f64, location: &str| CandidateProfile {
        id: id.into(),
        display_name: Some(id.to_uppercase()),
        skills: normalize(skills),
        hourly_rate: rate,
        location: location.into(),
        available: true,
        reputation: Some(4.5),
        active: true,
    };

    let mut busy = profile("cand-rust", &["rust", "postgres", "tokio"], 60.0, "global");
    busy.available = false;
    let mut gone = profile("cand-gone", &["react"], 30.0, "lagos");
    gone.deactivate();

    Fixtures {
        candidates: vec![
            profile("cand-react", &["react", "typescript", "css"], 35.0, "lagos"),
            busy,
            gone,
        ],
        jobs: vec![frontend, backend, filled],
    }
}

/// State backed by a small seeded in-memory repository, for router tests.
pub fn test_state(api_key: &str) -> SharedState {
    let repository = InMemoryRepository::from_fixtures(seed_fixtures())
        .expect("seed fixtures should be valid");
    let config = AppConfig::for_tests(AuthConfig::api_key(api_key));
    let engine = MatchingEngine::new(
        config.engine.clone(),
        Arc::new(SynonymTable::new()),
        Arc::new(repository),
    )
    .expect("default ranker config should be valid");

    Arc::new(AppState {
        engine: Arc::new(engine),
        config,
        rate_limits: default_rate_limits(),
        readiness: Arc::new(AtomicBool::new(true)),
    })
}

async fn build_repository(config: &AppConfig) -> Result<Arc<dyn ProfileRepository>, ApiError> {
    if let Some(url) = config.database_url.as_deref() {
        let pool = migrate_url(url)
            .await
            .map_err(|err| ApiError::Repository(format!("failed to prepare database: {err}")))?;
        return Ok(Arc::new(PgProfileRepository::new(pool)));
    }

    match config.fixtures_path.as_deref() {
        Some(path) => Ok(Arc::new(InMemoryRepository::from_fixture_file(path)?)),
        None => {
            warn!("neither DATABASE_URL nor FM_FIXTURES_PATH is set; serving an empty repository");
            Ok(Arc::new(InMemoryRepository::new()))
        }
    }
}

fn load_synonyms(config: &AppConfig) -> Result<SynonymTable, ApiError> {
    match config.synonyms_path.as_deref() {
        Some(path) => {
            let table = SynonymTable::load(path)?;
            info!(path = %path.display(), skills = table.len(), "loaded skill synonyms");
            Ok(table)
        }
        None => Ok(SynonymTable::new()),
    }
}

pub async fn run() -> Result<(), ApiError> {
    dotenv().ok();
    init_tracing_subscriber(env!("CARGO_PKG_NAME"));
    install_tracing_panic_hook(env!("CARGO_PKG_NAME"));

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli)?;
    fm_metrics::init_metrics("FM_METRICS_PORT", DEFAULT_METRICS_PORT);

    let repository = build_repository(&config).await?;
    let synonyms = load_synonyms(&config)?;
    let engine = MatchingEngine::new(config.engine.clone(), Arc::new(synonyms), repository)
        .map_err(ApiError::from)?;

    let state = Arc::new(AppState {
        engine: Arc::new(engine),
        config: config.clone(),
        rate_limits: default_rate_limits(),
        readiness: Arc::new(AtomicBool::new(true)),
    });

    spawn_rate_limit_pruner(state.rate_limits.clone(), RATE_LIMIT_PRUNE_INTERVAL);

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let app = create_router(state.clone());

    info!(
        %addr,
        auth_mode = ?config.auth.mode,
        repository = state.engine.repository().name(),
        run_id = run_id::get(),
        "fm-api listening"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    let service = app.into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    Ok(())
}

async fn shutdown_signal(state: SharedState) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            let _ = sigterm.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    state.readiness.store(false, Ordering::SeqCst);

    // Load balancers need a moment to see /readyz fail before new
    // connections stop being accepted.
    tokio::time::sleep(SHUTDOWN_DRAIN_GRACE).await;
}

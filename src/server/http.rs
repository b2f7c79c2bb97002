//! HTTP server implementation
//!
//! hyper http1 with TokioIo for async handling; hand-rolled method/path
//! dispatch into the route modules.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::accounts::AccountService;
use crate::auth::JwtValidator;
use crate::config::Args;
use crate::hierarchy::{AccessPolicy, CollegeLocks, HierarchyGraph, SuccessionEngine};
use crate::notify::Notifier;
use crate::portfolio::ReviewService;
use crate::routes;
use crate::routes::FullBody;
use crate::store::EntityStore;
use crate::types::{Result, ScribeError};

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub jwt: JwtValidator,
    pub store: Arc<dyn EntityStore>,
    pub accounts: AccountService,
    pub succession: SuccessionEngine,
    pub review: ReviewService,
    pub access: AccessPolicy,
    pub graph: HierarchyGraph,
}

impl AppState {
    /// Wire the engine services over a store and a notifier
    pub fn new(
        args: Args,
        store: Arc<dyn EntityStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let jwt = match &args.jwt_secret {
            Some(secret) => JwtValidator::new(secret.clone(), args.jwt_expiry_seconds)?,
            None if args.dev_mode => JwtValidator::new_dev(),
            None => {
                return Err(ScribeError::Config(
                    "JWT_SECRET is required outside dev mode".into(),
                ))
            }
        };

        let locks = Arc::new(CollegeLocks::new());
        let accounts = AccountService::new(
            Arc::clone(&store),
            notifier,
            Arc::clone(&locks),
            jwt.clone(),
        );
        let succession = SuccessionEngine::new(Arc::clone(&store), locks);
        let review = ReviewService::new(Arc::clone(&store));
        let access = AccessPolicy::new(Arc::clone(&store));
        let graph = HierarchyGraph::new(Arc::clone(&store));

        Ok(Self {
            args,
            jwt,
            store,
            accounts,
            succession,
            review,
            access,
            graph,
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen)
        .await
        .map_err(|e| ScribeError::Config(format!("cannot bind {}: {e}", state.args.listen)))?;

    info!(
        "Scribe listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        debug!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<FullBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    let response = if path == "/health" && method == Method::GET {
        routes::health::health_check()
    } else if path.starts_with("/api/auth") {
        routes::auth_routes::handle_auth_request(req, state, &path).await
    } else if path.starts_with("/api/admin") {
        routes::admin::handle_admin_request(req, state, &path).await
    } else if path.starts_with("/api/faculty") {
        routes::faculty::handle_faculty_request(req, state, &path).await
    } else if path.starts_with("/api/profile") {
        routes::profile::handle_profile_request(req, state, &path).await
    } else {
        routes::not_found()
    };

    Ok(response)
}

//! Crewdeck - maritime job portal client

use clap::Parser;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crewdeck::{
    auth::{
        AuthContext, AuthStorage, FileStorage, HttpTokenValidator, JwtSessionProvider, LocalAuthStore,
        SessionProvider, SessionStatus,
    },
    config::{Args, Command},
    logging::AuthEventLogger,
    models::OtpLoginRequest,
    routes::{describe, required_access, GuardInput, HistoryNavigator, RouteGuard},
    subscription::{CompanyApi, SubscriptionContext},
    PortalClient,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Logs go to stderr; stdout carries command output
    let log_level = args.log_level.clone();
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("crewdeck={},warn", log_level).into()),
    );
    if args.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Crewdeck {}", crewdeck::version());
    info!("======================================");
    info!("API: {}", args.api_url);
    info!("Mode: {}", if args.production { "PRODUCTION" } else { "DEVELOPMENT" });
    info!("State: {}", args.state_file().display());
    info!("Session cookie: {}", args.cookie().name());
    info!("======================================");

    std::fs::create_dir_all(&args.state_dir)?;
    let storage: Arc<dyn AuthStorage> = Arc::new(FileStorage::new(args.state_file()));

    let (unauthorized_tx, mut unauthorized_rx) = mpsc::unbounded_channel();
    let client = PortalClient::new(args.client_config())?.with_unauthorized_notifier(unauthorized_tx);

    let session = Arc::new(
        JwtSessionProvider::new(args.cookie(), &args.session_secret()?, args.session_max_age())
            .with_cookie_jar(storage.clone()),
    );
    let navigator = Arc::new(HistoryNavigator::new());

    let events = match &args.event_log {
        Some(path) => {
            let logger = AuthEventLogger::new(hostname());
            logger.init_file(path.clone()).await?;
            Some(logger)
        }
        None => None,
    };

    let mut auth = AuthContext::new(
        session.clone(),
        Arc::new(HttpTokenValidator::new(client.clone())),
        LocalAuthStore::new(storage.clone()),
        navigator.clone(),
    );
    if let Some(events) = &events {
        auth = auth.with_events(events.clone());
    }
    let auth = Arc::new(auth);
    let watcher = auth.watch_session();

    session.hydrate_from_jar()?;

    let output = match args.command.clone() {
        Command::Login {
            email,
            mobile,
            otp,
            user_type,
        } => {
            let request = OtpLoginRequest {
                mobile_no: mobile,
                email,
                otp,
                user_type,
            };
            let new_session = client.otp_login(&request).await?;
            let set_cookie = session.establish(new_session.clone())?;
            let stored = auth
                .login(&new_session.access_token, Some(new_session.user.clone()))
                .await;
            auth.initialize().await?;
            json!({
                "stored": stored,
                "set_cookie": set_cookie,
                "identity": auth.identity().await,
            })
        }

        Command::Status => {
            let validation = auth.initialize().await?;
            let refreshed = match session.snapshot().status {
                SessionStatus::Authenticated => session.refresh()?,
                _ => None,
            };
            json!({
                "validation": validation,
                "session": session.snapshot().status.to_string(),
                "identity": auth.identity().await,
                "set_cookie": refreshed,
                "redirect": navigator.last(),
            })
        }

        Command::Validate => {
            let validation = auth.initialize().await?;
            json!({
                "validation": validation,
                "authenticated": auth.is_authenticated().await,
                "redirect": navigator.last(),
            })
        }

        Command::Logout => {
            auth.logout().await;
            json!({
                "set_cookie": session.cookie().clear_header(),
                "redirect": navigator.last(),
            })
        }

        Command::Subscription => {
            auth.initialize().await?;
            let subscriptions = subscription_context(&auth, &client, &navigator, &events);
            let outcome = subscriptions.load().await;
            json!({
                "outcome": outcome,
                "state": subscriptions.state().await,
                "redirect": navigator.last(),
            })
        }

        Command::Usage { kind } => {
            auth.initialize().await?;
            let subscriptions = subscription_context(&auth, &client, &navigator, &events);
            let outcome = subscriptions.load().await;
            let value = subscriptions.update_subscription_usage(kind).await?;
            json!({
                "outcome": outcome,
                "kind": kind,
                "value": value,
                "state": subscriptions.state().await,
            })
        }

        Command::Guard { path } => {
            auth.initialize().await?;
            let identity = auth.identity().await;
            let access = required_access(&path);
            let guard = RouteGuard::new();
            let decision = guard.evaluate(GuardInput::from_identity(&identity, &path), navigator.as_ref());
            json!({
                "path": path,
                "access": access,
                "area": describe(access),
                "decision": decision,
            })
        }
    };

    // 401/403 seen during the command are re-validated before exit
    while let Ok(status) = unauthorized_rx.try_recv() {
        let outcome = auth.handle_response_status(status).await;
        debug!(status, ?outcome, "Handled unauthorized response");
    }

    auth.teardown();
    watcher.abort();

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn subscription_context(
    auth: &Arc<AuthContext>,
    client: &PortalClient,
    navigator: &Arc<HistoryNavigator>,
    events: &Option<AuthEventLogger>,
) -> SubscriptionContext {
    let api: Arc<dyn CompanyApi> = Arc::new(client.clone());
    let ctx = SubscriptionContext::new(auth.clone(), api, navigator.clone());
    match events {
        Some(events) => ctx.with_events(events.clone()),
        None => ctx,
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| format!("crewdeck-{}", uuid::Uuid::new_v4()))
}

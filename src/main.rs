use std::{net::SocketAddr, process, sync::Arc, time::Duration};

use calamus::{
    application::{
        auth::{AuthService, JwtConfig},
        comments::CommentService,
        error::AppError,
        feed::FeedService,
        posts::PostService,
        repos::{
            CommentsRepo, EngagementRepo, FeedRepo, FollowsRepo, PostsRepo, PostsWriteRepo,
            SearchRepo, TagsRepo, UsersRepo,
        },
        search::SearchService,
        tags::TagService,
        users::UserService,
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState, api::ApiRateLimiter},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    // `serve` is the only subcommand; an absent command serves too.
    let _ = cli_args.command;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    run_serve(settings).await
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let state = build_api_state(repositories, &settings)?;

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "calamus::server",
        addr = %settings.server.addr,
        "listening"
    );

    let router = http::build_router(state);
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
    .await
    .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_api_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<ApiState, AppError> {
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let follows_repo: Arc<dyn FollowsRepo> = repositories.clone();
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
    let engagement_repo: Arc<dyn EngagementRepo> = repositories.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repositories.clone();
    let tags_repo: Arc<dyn TagsRepo> = repositories.clone();
    let feed_repo: Arc<dyn FeedRepo> = repositories.clone();
    let search_repo: Arc<dyn SearchRepo> = repositories.clone();

    let secret = settings
        .auth
        .secret
        .clone()
        .ok_or_else(|| InfraError::configuration("auth secret is not configured"))
        .map_err(AppError::from)?;

    let jwt = JwtConfig {
        issuer: settings.auth.issuer.clone(),
        audience: settings.auth.audience.clone(),
        secret,
        ttl_seconds: settings.auth.token_ttl.as_secs(),
    };

    let auth = Arc::new(AuthService::new(users_repo.clone(), jwt));
    let users = Arc::new(UserService::new(users_repo, follows_repo));
    let posts = Arc::new(PostService::new(
        posts_repo.clone(),
        posts_write_repo,
        engagement_repo.clone(),
        settings.engagement.view_dedup_window,
    ));
    let comments = Arc::new(CommentService::new(
        comments_repo,
        posts_repo,
        engagement_repo,
    ));
    let tags = Arc::new(TagService::new(tags_repo));
    let feed = Arc::new(FeedService::new(
        feed_repo,
        settings.feed.window_days.get(),
        settings.feed.default_page_size.get(),
    ));
    let search = Arc::new(SearchService::new(search_repo));

    let rate_limiter = Arc::new(ApiRateLimiter::new(
        Duration::from_secs(settings.api_rate_limit.window_seconds.get() as u64),
        settings.api_rate_limit.max_requests.get(),
    ));

    Ok(ApiState {
        auth,
        users,
        posts,
        comments,
        tags,
        feed,
        search,
        db: repositories,
        rate_limiter,
    })
}

async fn shutdown_signal(grace: Duration) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(target = "calamus::server", "shutdown signal received");

    // Bound connection draining; a wedged client must not hold the process.
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(
            target = "calamus::server",
            "graceful shutdown window elapsed, exiting"
        );
        process::exit(0);
    });
}

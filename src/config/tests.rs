use super::*;

fn settings_from(raw: RawSettings) -> Result<Settings, LoadError> {
    Settings::from_raw(raw)
}

#[test]
fn defaults_resolve() {
    let settings = settings_from(RawSettings::default()).expect("default settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(
        settings.database.max_connections.get(),
        DEFAULT_DB_MAX_CONNECTIONS
    );
    assert!(settings.database.url.is_none());
    assert!(settings.auth.secret.is_none());
    assert_eq!(
        settings.auth.token_ttl,
        Duration::from_secs(DEFAULT_TOKEN_TTL_SECS)
    );
    assert_eq!(
        settings.engagement.view_dedup_window,
        Duration::from_secs(DEFAULT_VIEW_DEDUP_WINDOW_SECS)
    );
    assert_eq!(settings.feed.window_days.get(), DEFAULT_FEED_WINDOW_DAYS);
}

#[test]
fn serve_overrides_take_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.apply_serve_overrides(&ServeOverrides {
        server_port: Some(5000),
        database_url: Some("postgres://db/calamus".to_string()),
        view_dedup_window_seconds: Some(120),
        ..ServeOverrides::default()
    });

    let settings = settings_from(raw).expect("settings");
    assert_eq!(settings.server.addr.port(), 5000);
    assert_eq!(
        settings.database.url.as_deref(),
        Some("postgres://db/calamus")
    );
    assert_eq!(
        settings.engagement.view_dedup_window,
        Duration::from_secs(120)
    );
}

#[test]
fn zero_port_is_rejected() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(0);
    assert!(matches!(
        settings_from(raw),
        Err(LoadError::Invalid { key, .. }) if key == "server.port"
    ));
}

#[test]
fn short_jwt_secret_is_rejected() {
    let mut raw = RawSettings::default();
    raw.auth.secret = Some("too-short".to_string());
    assert!(matches!(
        settings_from(raw),
        Err(LoadError::Invalid { key, .. }) if key == "auth.secret"
    ));
}

#[test]
fn blank_secret_counts_as_unset() {
    let mut raw = RawSettings::default();
    raw.auth.secret = Some("   ".to_string());
    let settings = settings_from(raw).expect("settings");
    assert!(settings.auth.secret.is_none());
}

#[test]
fn zero_dedup_window_is_rejected() {
    let mut raw = RawSettings::default();
    raw.engagement.view_dedup_window_seconds = Some(0);
    assert!(matches!(
        settings_from(raw),
        Err(LoadError::Invalid { key, .. }) if key == "engagement.view_dedup_window_seconds"
    ));
}

#[test]
fn cli_parsing_accepts_serve_overrides() {
    let cli = CliArgs::try_parse_from([
        "calamus",
        "serve",
        "--server-port",
        "8088",
        "--log-level",
        "debug",
        "--feed-window-days",
        "7",
    ])
    .expect("cli parses");

    let Some(Command::Serve(args)) = cli.command.as_ref() else {
        panic!("expected serve command");
    };
    assert_eq!(args.overrides.server_port, Some(8088));
    assert_eq!(args.overrides.log_level.as_deref(), Some("debug"));
    assert_eq!(args.overrides.feed_window_days, Some(7));
}

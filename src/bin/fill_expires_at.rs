use lib::{
    jobs::fill_expires_at::fill_expires_at,
    settings::get_settings,
    telemetry::{error, init_sentry, init_tracing, LogKey, StatsD, SERVICE_NAME},
};
use secrecy::ExposeSecret;
use sqlx::{Connection, PgConnection};

#[tokio::main]
async fn main() {
    let settings = match get_settings() {
        Ok(settings) => settings,
        Err(e) => {
            println!("Error loading settings: {}", e);
            return;
        }
    };
    // stdout belongs to the operator prompt
    init_tracing(SERVICE_NAME, &settings.log_level, std::io::stderr);
    let _sentry = init_sentry(&settings);
    let statsd = match StatsD::new(&settings) {
        Ok(statsd) => statsd,
        Err(e) => {
            error(&LogKey::StatsDError, "Metrics disabled", Some(&e));
            StatsD::noop()
        }
    };

    let conn = match PgConnection::connect(settings.database_url.expose_secret()).await {
        Ok(conn) => conn,
        Err(e) => {
            error(&LogKey::FillExpiresAtFailed, "Could not connect", Some(&e));
            println!("Error updating expires_at: {}", e);
            return;
        }
    };
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    fill_expires_at(conn, stdin.lock(), stdout.lock(), &statsd).await;
}

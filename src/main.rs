use daily_basket::logging::{LogFormat, init_logging};
use daily_basket::{Config, ReportService, run_with_shutdown};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; the environment may already be populated
    dotenvy::dotenv().ok();
    init_logging(LogFormat::from_env());

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "daily-basket exited with an error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> daily_basket::Result<()> {
    let config = Config::from_env()?;
    let service = Arc::new(ReportService::new(config).await?);

    tracing::info!(
        bind_address = %service.config.server.bind_address,
        sales_api = %service.fetcher.base_url(),
        "daily-basket started"
    );

    service.spawn_scheduler()?;
    let api = service.spawn_api_server();

    tokio::select! {
        result = run_with_shutdown(service.clone()) => result,
        joined = api => {
            // The server only returns early when it failed to bind or serve
            service.shutdown().await.ok();
            match joined {
                Ok(result) => result,
                Err(e) => Err(daily_basket::Error::ApiServerError(e.to_string())),
            }
        }
    }
}

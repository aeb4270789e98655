mod cli;
mod infra;
mod routes;
mod server;

use income_insight::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}

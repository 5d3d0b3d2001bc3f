//! OU Pairs - spread mean-reversion analyzer
//!
//! Fetches two price series, fits an OU model to their spread and replays the
//! optimal power-utility position along it.

use anyhow::Result;

use ou_pairs::adapters::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (OU_PAIRS_DATA_URL and RUST_LOG may live there)
    dotenvy::dotenv().ok();

    let app = cli::init();
    cli::execute(app).await
}

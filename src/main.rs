use anyhow::Result;
use clap::Parser;
use trend_shorts::config::Config;
use trend_shorts::init_tracing;
use trend_shorts::pipeline::run_pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cfg = Config::parse();
    let code = run_pipeline(&cfg).await?;
    std::process::exit(code);
}

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Walk a site with a declarative selector-tree sitemap and export the
/// extracted data as JSON, XML, or CSV.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the sitemap + settings JSON document.
    #[arg(short, long, default_value = "sitemap.json")]
    config: PathBuf,
    /// Directory where output.<ext> and the error log are written.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trawler=info".parse()?),
        )
        .init();

    let args = Args::parse();
    trawler::run(&args.config, &args.output_dir).await
}

use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = spraycast::cli::Cli::parse();
    if let Err(e) = spraycast::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

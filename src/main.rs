use clap::{Parser, Subcommand};
use retire_compare::api::{ProjectArgs, ServeArgs, run_http_server, run_project};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "retire-compare",
    about = "Compare retirement savings projections across named scenarios"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the projection and scenario API over HTTP
    Serve(ServeArgs),
    /// Project a single scenario and print it
    Project(ProjectArgs),
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Serve(args) => {
            if let Err(e) = run_http_server(args).await {
                tracing::error!(error = %e, "server error");
                std::process::exit(1);
            }
        }
        Command::Project(args) => match run_project(&args) {
            Ok(output) => print!("{output}"),
            Err(msg) => {
                eprintln!("{msg}");
                std::process::exit(2);
            }
        },
    }
}

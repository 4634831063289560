use clap::Parser;
use quick_nav::cli::commands::{cmd_locate, cmd_scan, cmd_toggle};
use quick_nav::cli::config::{Cli, Commands, load_config};
use tracing::Level;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Scan {
            snapshot,
            include_assistant,
            format,
        } => {
            let out = cmd_scan(&snapshot, include_assistant, &format, &config).await?;
            print!("{}", out);
        }
        Commands::Locate {
            snapshot,
            index,
            include_assistant,
        } => {
            let out = cmd_locate(&snapshot, index, include_assistant, &config).await?;
            print!("{}", out);
        }
        Commands::Toggle { state_file } => {
            print!("{}", cmd_toggle(state_file.as_deref(), &config));
        }
    }

    Ok(())
}

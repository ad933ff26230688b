use unsubscriber::app::App;
use unsubscriber::cli::Cli;
use unsubscriber::logging;
use unsubscriber::styled_output::StyledFormatter;

#[tokio::main]
async fn main() {
    // .env must be loaded before clap reads env-backed flags
    let _ = dotenvy::dotenv();

    let cli = Cli::from_args();
    logging::init(
        cli.verbose,
        !cli.no_color && StyledFormatter::should_use_colors(),
    );

    match App::run(&cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            if cli.error_enabled() {
                eprintln!("Error: {e}");
            }
            std::process::exit(1);
        }
    }
}

use clap::Parser;
use montepi::error::{self, EXIT_USAGE};
use montepi::simple::{run_with_progress, CliArgs};
use montepi::util::{format_rate, logging};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    if let Err(e) = logging::init(args.verbose) {
        eprintln!("{}", e);
    }

    let config = match args.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", error::user_friendly_message(&e));
            std::process::exit(EXIT_USAGE);
        }
    };

    match run_with_progress(config, !args.quiet).await {
        Ok(estimate) => {
            println!("{}", estimate.pi);
            if !args.quiet {
                eprintln!("{}", estimate.summary());
                eprintln!("Rate: {}", format_rate(estimate.samples_per_second()));
            }
        }
        Err(e) => {
            eprintln!("{}", error::user_friendly_message(&e));
            std::process::exit(error::exit_code(&e));
        }
    }
}

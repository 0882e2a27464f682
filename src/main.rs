use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use sublevel_kernel::config::{CliArgs, ProbeConfig};
use sublevel_kernel::session::Session;

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Init tracing
    let filter = if args.verbose {
        EnvFilter::new("sublevel_kernel=debug")
    } else {
        EnvFilter::new("sublevel_kernel=info")
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let config: ProbeConfig = args.into();

    match Session::run(&config) {
        Ok(outcome) => {
            if config.json {
                let text = serde_json::to_string_pretty(&outcome.report)
                    .context("Failed to encode report as JSON")?;
                println!("{text}");
            } else {
                print!("{}", outcome.report);
                println!(
                    "Done: {} in {:.3}ms",
                    outcome.level,
                    outcome.duration.as_secs_f64() * 1000.0
                );
            }
            Ok(())
        }
        Err(e) => {
            error!(%e, "Query failed");
            Err(anyhow::anyhow!(e)).context("sublevel-probe query failed")
        }
    }
}

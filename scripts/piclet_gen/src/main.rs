use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use piclet_gen::{generate, load_config, Overrides};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Verify student photonic designs and pair them into PIClet layouts"
)]
pub struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory of submitted layout files.
    #[arg(short, long)]
    submissions: Option<PathBuf>,
    /// Directory the PIClets and the error summary are written to.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Directory that also receives a copy of every PIClet.
    #[arg(long)]
    tapeout: Option<PathBuf>,
    /// Process at most this many submission files.
    #[arg(long)]
    max: Option<usize>,
    /// Skip GitHub lookups.
    #[arg(long)]
    offline: bool,
    /// Log filter, e.g. `debug` or `piclet=trace`. Defaults to `RUST_LOG`, then `info`.
    #[arg(long)]
    log_level: Option<String>,
}

pub fn main() -> ExitCode {
    let args = Args::parse();
    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = args.log_level.as_deref() {
        logger.parse_filters(level);
    }
    logger.init();

    let overrides = Overrides {
        submissions: args.submissions,
        output: args.output,
        tapeout: args.tapeout,
        max: args.max,
    };
    let result = load_config(args.config.as_ref(), overrides)
        .and_then(|config| generate(config, args.offline));
    match result {
        Ok(output) => {
            print!("{}", output.summary);
            info!(
                "{} PIClet(s) written, {} failed",
                output.artifacts.len(),
                output.failed.len()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

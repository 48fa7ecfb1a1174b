use clap::Parser;
use schemagen::builder::Builder;
use schemagen::config::{BuildOptions, Config};
use schemagen::error_chain;
use schemagen::target::Target;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Generate code and DDL from a schema configuration.
#[derive(Parser, Debug)]
#[command(name = "schemagen", version)]
struct Args {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Do not flag columns with a foreign key as primary key columns
    #[arg(long)]
    no_fk_implies_pk: bool,

    /// Output as TARGET or TARGET=FILE; repeatable. `-` or no file writes to stdout.
    #[arg(short, long = "target", value_name = "TARGET[=FILE]", required = true, value_parser = parse_output)]
    targets: Vec<Output>,

    /// JSON schema configuration
    config: PathBuf,
}

#[derive(Debug, Clone)]
struct Output {
    target: Target,
    file: Option<PathBuf>,
}

fn parse_output(arg: &str) -> Result<Output, String> {
    let (target, file) = match arg.split_once('=') {
        Some((target, file)) => (target, Some(file)),
        None => (arg, None),
    };
    let target = target.parse::<Target>().map_err(|e| e.to_string())?;
    let file = file.filter(|f| !f.is_empty() && *f != "-").map(PathBuf::from);
    Ok(Output { target, file })
}

fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    debug!(?args, "running");

    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), String> {
    let input = fs::read_to_string(&args.config)
        .map_err(|e| format!("Failed to read {}: {e}", args.config.display()))?;
    let config = Config::from_json(&input).map_err(|e| error_chain(&e))?;
    let options = BuildOptions {
        mark_fk_columns_pk: !args.no_fk_implies_pk,
    };

    for output in &args.targets {
        let model = Builder::new(&output.target)
            .with_options(options)
            .build(&config)
            .map_err(|e| format!("{}: {}", output.target, error_chain(&e)))?;
        let rendered = output
            .target
            .render(&model)
            .map_err(|e| format!("failed to render {}: {}", output.target, error_chain(&e)))?;

        match &output.file {
            Some(path) => {
                fs::write(path, &rendered)
                    .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
                info!(output = %output.target, path = %path.display(), "wrote output");
            }
            None => io::stdout()
                .write_all(rendered.as_bytes())
                .map_err(|e| format!("Failed to write stdout: {e}"))?,
        }
    }
    Ok(())
}

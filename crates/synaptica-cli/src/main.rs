mod app;
mod command;

use anyhow::{Context, Result};
use app::{App, Reply};
use clap::{value_parser, Arg, ArgAction, Command as Cli};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use synaptica_core::SynapticaConfig;
use synaptica_gemini::GeminiClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

fn cli() -> Cli {
    Cli::new("synaptica")
        .version(synaptica_core::VERSION)
        .about("Explore a concept as a lazily generated mind map")
        .arg(
            Arg::new("concept")
                .help("Concept to map right away")
                .num_args(1..)
                .trailing_var_arg(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_parser(value_parser!(PathBuf))
                .help("TOML settings file"),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .help("Override the generator model"),
        )
        .arg(
            Arg::new("ascii")
                .long("ascii")
                .action(ArgAction::SetTrue)
                .help("Draw the outline with ASCII connectors"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("Log more to stderr (-v debug, -vv trace)"),
        )
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_count("verbose"));

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => SynapticaConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SynapticaConfig::new(),
    };
    if let Some(model) = matches.get_one::<String>("model") {
        config.generator = config.generator.with_model(model);
    }
    if matches.get_flag("ascii") {
        config.display.ascii = true;
    }
    config.validate()?;

    let client = Arc::new(GeminiClient::from_env(config.generator.clone())?);
    tracing::info!(model = %client.config().model, "using Gemini backend");

    let mut app = App::new(client.clone(), client, config.display);
    let renderer = app.spawn_renderer();

    println!("{}", app.outline());
    if let Some(words) = matches.get_many::<String>("concept") {
        let concept = words.cloned().collect::<Vec<_>>().join(" ");
        app.handle(command::Command::Generate(concept));
    } else {
        println!("Type 'generate <concept>' to begin, 'help' for commands.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut quit = false;
    prompt();
    while let Some(line) = lines.next_line().await? {
        match command::parse(&line) {
            Ok(None) => {}
            Ok(Some(cmd)) => match app.handle(cmd) {
                Reply::Continue(Some(text)) => println!("{text}"),
                Reply::Continue(None) => {}
                Reply::Quit => {
                    quit = true;
                    break;
                }
            },
            Err(e) => println!("{e:#}"),
        }
        prompt();
    }

    if quit {
        app.shutdown();
    } else {
        // Input ended (e.g. a piped script); let in-flight requests land
        app.settle().await;
        println!("{}", app.outline());
    }
    renderer.abort();
    Ok(())
}

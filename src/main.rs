use clap::{Parser, Subcommand};
use pitch2midi::{validate_input, Config, Transcriber, TranscriptionMode};
use std::path::PathBuf;

/// Note & Harmony Extraction Engine
#[derive(Parser)]
#[command(name = "pitch2midi")]
#[command(about = "Transcribe pitched audio to MIDI with key and chord analysis")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an audio file and generate MIDI plus an analysis report
    Analyze {
        /// Input audio file (WAV)
        input: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Custom configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Tracking mode: monophonic or polyphonic
        #[arg(short, long)]
        mode: Option<String>,

        /// Disable beat-grid quantization
        #[arg(long)]
        no_quantize: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Quiet output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Validate a configuration file
    ValidateConfig {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show the default configuration
    ShowConfig,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            output,
            config,
            mode,
            no_quantize,
            verbose,
            quiet,
        } => {
            if verbose && quiet {
                anyhow::bail!("Cannot specify both --verbose and --quiet");
            }

            let mut config = if let Some(config_path) = config {
                pitch2midi::config::load_config(config_path)?
            } else {
                Config::default()
            };

            if let Some(mode) = mode {
                config.mode = match mode.as_str() {
                    "monophonic" | "mono" => TranscriptionMode::Monophonic,
                    "polyphonic" | "poly" => TranscriptionMode::Polyphonic,
                    other => anyhow::bail!("Unknown mode '{}'", other),
                };
            }
            if no_quantize {
                config.quantize.enabled = false;
            }

            validate_input(&input, &config)?;

            let transcriber = Transcriber::new(config);

            if !quiet {
                println!("Processing {}...", input.display());
            }

            transcriber.process(&input, &output)?;

            if !quiet {
                println!("Results saved to {}", output.display());
            }
        }
        Commands::ValidateConfig { config } => {
            let config = pitch2midi::config::load_config(config)?;
            println!("Configuration is valid");
            if let Ok(json) = serde_json::to_string_pretty(&config) {
                println!("{}", json);
            }
        }
        Commands::ShowConfig => {
            let config = Config::default();
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
    }

    Ok(())
}

use clap::{Parser, Subcommand};
use log::{info, warn};
use pulp_cafe::utils::default_validator_registry;
use pulp_cafe::{Generator, GeneratorConfig, Grammar, GrammarError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;
use std::path::{Path, PathBuf};

const EXAMPLE_GRAMMAR: &str = include_str!("../grammars/cafe.json");

/// Grammar-based short text generator
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON grammar file
    #[arg(help = "Path to the JSON grammar file")]
    grammar_file: Option<PathBuf>,

    /// Number of texts to generate
    #[arg(help = "Number of texts to generate", default_value = "1")]
    count: Option<usize>,

    /// Maximum length of each text, in characters
    #[arg(long, default_value_t = 140)]
    max_len: usize,

    /// Root draws per text before giving up
    #[arg(long, default_value_t = 100)]
    max_attempts: usize,

    /// Maximum expansion passes per draw
    #[arg(long, default_value_t = pulp_cafe::expand::DEFAULT_MAX_EXPANSION_PASSES)]
    max_passes: usize,

    /// Seed for the random number generator (for reproducible output)
    #[arg(long)]
    seed: Option<u64>,

    /// Post-processing fix to apply to expanded text (repeatable)
    #[arg(long = "fixer", value_name = "NAME", default_value = "possessive")]
    fixers: Vec<String>,

    /// Log level (trace, debug, info, warn, error); overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a grammar file and report lint findings
    Check {
        /// Path to the JSON grammar file
        grammar_file: PathBuf,
    },
    /// Write the bundled example grammar
    Example {
        /// Output file path
        #[arg(help = "Output file path")]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut logger_builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    );
    if let Some(level) = &cli.log_level {
        logger_builder.filter_level(level.parse().unwrap_or(log::LevelFilter::Warn));
    }
    logger_builder.init();

    if let Some(command) = cli.command {
        return match command {
            Commands::Check { grammar_file } => check_grammar(&grammar_file),
            Commands::Example { output } => {
                let output_path = output.unwrap_or_else(|| PathBuf::from("example_grammar.json"));
                fs::write(&output_path, EXAMPLE_GRAMMAR)?;
                println!("Created example grammar at: {}", output_path.display());
                Ok(())
            }
        };
    }

    let grammar_file = cli.grammar_file.ok_or("Grammar file path required")?;
    let count = cli.count.unwrap_or(1);

    let grammar = Grammar::from_file(&grammar_file)?;
    info!(
        "loaded {} categories from {}",
        grammar.rules().len(),
        grammar_file.display()
    );

    let fixer = default_validator_registry().chain_of(&cli.fixers)?;
    let config = GeneratorConfig {
        max_len: cli.max_len,
        max_attempts: cli.max_attempts,
        max_expansion_passes: cli.max_passes,
    };
    let generator = Generator::with_config(grammar, config).with_validator(Box::new(fixer));
    info!("post-processing with '{}'", generator.validator_name());

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    for i in 0..count {
        match generator.generate(&mut rng) {
            Ok(text) => println!("{}", text),
            Err(e @ GrammarError::GenerationFailure { .. }) => {
                warn!("skipping text {}: {}", i + 1, e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

fn check_grammar(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let grammar = Grammar::from_file(path)?;

    let findings = grammar.lint();
    for finding in &findings {
        println!("warning: {}", finding);
    }

    println!(
        "{}: {} categories, {} roots, {} warnings",
        path.display(),
        grammar.rules().len(),
        grammar.roots().map_or(0, |r| r.len()),
        findings.len()
    );
    Ok(())
}

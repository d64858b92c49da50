use clap::{Parser as ClapParser, Subcommand};
use std::io::{self, Read};
use tagexpr::cli::{self, CheckOptions, CheckResult, CliError, ValidateOptions, ValidateOutcome};

#[derive(ClapParser)]
#[command(name = "tagexpr")]
#[command(about = "tagexpr - Evaluate struct tag expressions against JSON documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile tag expressions and print each result
    Check {
        /// Field path and tag text, e.g. -e 'a=$>0;msg:"too small"'
        #[arg(short, long = "expr", required = true)]
        exprs: Vec<String>,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only validate syntax, don't evaluate
        #[arg(long)]
        syntax_only: bool,
    },

    /// Validate a JSON document against tag expressions
    Validate {
        /// Field path and tag text
        #[arg(short, long = "expr", required = true)]
        exprs: Vec<String>,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            exprs,
            input,
            pretty,
            syntax_only,
        } => run_check(exprs, input, pretty, syntax_only),
        Commands::Validate { exprs, input } => run_validate(exprs, input),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn read_input(input: Option<String>) -> Result<Option<String>, CliError> {
    match input {
        Some(s) => Ok(Some(s)),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map_err(CliError::Io)?;
            Ok(Some(buffer))
        }
        None => Ok(None),
    }
}

fn run_check(
    exprs: Vec<String>,
    input: Option<String>,
    pretty: bool,
    syntax_only: bool,
) -> Result<(), CliError> {
    let input = if syntax_only { input } else { read_input(input)? };

    let options = CheckOptions {
        exprs,
        input,
        pretty,
        syntax_only,
    };

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid => println!("Syntax is valid"),
        CheckResult::Success(output) => {
            let json = if pretty {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            }?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn run_validate(exprs: Vec<String>, input: Option<String>) -> Result<(), CliError> {
    let options = ValidateOptions {
        exprs,
        input: read_input(input)?,
    };

    match cli::execute_validate(&options)? {
        ValidateOutcome::Valid => println!("valid"),
        ValidateOutcome::Invalid(e) => {
            eprintln!("{} (at {})", e, e.fail_path);
            std::process::exit(1);
        }
    }
    Ok(())
}

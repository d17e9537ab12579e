//! Command-line interface for the `yalex` lexer generator.
//!
//! Compiles a rule file into a DFA, scans an input file with it and writes
//! the emitted tokens as one comma-separated line. Lexical errors are logged
//! and scanning continues.

#[cfg(feature = "cli")]
mod real {
    use anyhow::Context;
    use clap::Parser;
    use scanpar_gen::lexgen::{self, LexerOptions};
    use std::io::Write;
    use std::path::PathBuf;

    #[derive(Parser)]
    #[command(about = "Build a DFA scanner from a yalex rule file and tokenize an input")]
    struct Args {
        /// Path to the rule file
        #[arg(short = 's', long)]
        spec: PathBuf,

        /// Path to the text to tokenize
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// Where to write the token stream (stdout if omitted)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Keep the DFA as built, without pruning and minimization.
        #[arg(long)]
        no_minimize: bool,

        /// Enable debug logging (off by default).
        #[arg(short = 'd', long)]
        debug: bool,
    }

    pub fn main() -> anyhow::Result<()> {
        let args = Args::parse();
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if args.debug {
            "debug"
        } else {
            "warn"
        }))
        .init();

        let options = LexerOptions {
            minimize: !args.no_minimize,
        };
        let lexer = lexgen::generate(&args.spec, &options)?;
        let input = std::fs::read_to_string(&args.input)
            .with_context(|| format!("cannot read input {}", args.input.display()))?;
        let result = lexer.tokenize(&input)?;
        if !result.is_clean() {
            log::warn!(
                "{}: {} lexical errors",
                args.input.display(),
                result.errors.len()
            );
        }

        let line = result
            .tokens
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(",");
        match &args.output {
            Some(path) => std::fs::write(path, format!("{line}\n"))
                .with_context(|| format!("cannot write {}", path.display()))?,
            None => writeln!(std::io::stdout().lock(), "{line}")?,
        }
        Ok(())
    }
}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    real::main()
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("yalex disabled (compiled without `cli` feature)");
}

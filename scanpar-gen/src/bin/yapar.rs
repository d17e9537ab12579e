//! Command-line interface for the `yapar` parser generator.
//!
//! Builds the SLR(1) table of a grammar file, then parses a comma-separated
//! token stream with it and prints every step and the verdict. A grammar
//! that is not SLR(1) is reported with the conflicting state and symbol.

#[cfg(feature = "cli")]
mod real {
    use anyhow::Context;
    use clap::Parser;
    use scanpar_gen::pargen;
    use std::io::Write;
    use std::path::PathBuf;

    #[derive(Parser)]
    #[command(about = "Build an SLR(1) table from a yapar grammar and parse a token stream")]
    struct Args {
        /// Path to the grammar file
        #[arg(short = 'g', long)]
        grammar: PathBuf,

        /// Path to a file of comma-separated token names
        #[arg(short = 't', long)]
        tokens: PathBuf,

        /// Print the productions, item sets, FIRST/FOLLOW sets and table.
        #[arg(long)]
        dump: bool,

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

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        let table = if args.dump {
            pargen::generate(&args.grammar, Some(&mut out))?
        } else {
            pargen::generate(&args.grammar, None)?
        };

        let src = std::fs::read_to_string(&args.tokens)
            .with_context(|| format!("cannot read tokens {}", args.tokens.display()))?;
        let tokens: Vec<&str> = src
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();

        let mut parser = scanpar::Parser::new(&table);
        match parser.parse(&tokens) {
            Ok(steps) => {
                for step in &steps {
                    writeln!(out, "{}", step.render(&table))?;
                }
                writeln!(out, "ACCEPTED")?;
                Ok(())
            }
            Err(err) => {
                writeln!(out, "REJECTED: {err}")?;
                Err(err.into())
            }
        }
    }
}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    real::main()
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("yapar disabled (compiled without `cli` feature)");
}

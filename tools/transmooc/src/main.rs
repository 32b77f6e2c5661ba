// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

mod compile_args;
mod emit;

use crate::compile_args::CompileArgs;
use crate::emit::emit_textdump;
use clap::Parser;
use clap_derive::Parser;
use eyre::eyre;
use figment::Figment;
use figment::providers::{Format, Serialized, Yaml};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::fmt::format::FmtSpan;
use transmoo_compiler::CompileOptions;
use transmoo_textdump::read_textdump;

#[derive(Parser, Debug)]
#[command(name = "transmooc")]
#[command(about = "Compile the verbs of a LambdaMOO database to Python")]
#[command(version)]
pub struct Args {
    #[arg(long, help = "The LambdaMOO textdump to read verbs from")]
    db: PathBuf,

    #[arg(
        long,
        help = "YAML file of compile options. Flags given on the command line take precedence."
    )]
    config_file: Option<PathBuf>,

    #[command(flatten)]
    compile_args: CompileArgs,

    #[arg(long, help = "Enable debug logging")]
    debug: bool,
}

impl Args {
    /// Load the configuration file if we have it, and then merge the arguments into it.
    fn load_options(&self) -> Result<CompileOptions, eyre::Report> {
        let mut options = match &self.config_file {
            Some(config_path) => Figment::new()
                .merge(Serialized::defaults(CompileOptions::default()))
                .merge(Yaml::file(config_path))
                .extract::<CompileOptions>()
                .map_err(|e| {
                    eyre!(
                        "Failed to parse configuration from {:?}: {}",
                        config_path,
                        e
                    )
                })?,
            None => CompileOptions::default(),
        };
        self.compile_args.merge_config(&mut options);
        Ok(options)
    }
}

fn main() -> Result<(), eyre::Report> {
    color_eyre::install()?;
    let args: Args = Args::parse();

    // stdout carries only generated code.
    let main_subscriber = tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::NONE)
        .with_max_level(if args.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(main_subscriber).unwrap_or_else(|e| {
        eprintln!("Unable to set configure logging: {e}");
        std::process::exit(1);
    });

    let options = args.load_options()?;
    info!("transmooc {}", env!("CARGO_PKG_VERSION"));
    info!(?options, "Reading {}", args.db.display());

    let textdump = read_textdump(&args.db)
        .map_err(|e| eyre!("Could not load textdump {:?}: {}", args.db, e))?;
    info!(
        "Loaded {} objects and {} verb programs ({})",
        textdump.objects.len(),
        textdump.verbs.len(),
        textdump.version_string
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = emit_textdump(&textdump, &options, &mut out)?;
    out.flush()?;

    info!(
        compiled = summary.compiled,
        failed = summary.failed,
        skipped = summary.skipped,
        "Done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_and_flags() {
        let mut config = tempfile::NamedTempFile::new().unwrap();
        writeln!(config, "strict_error_codes: false").unwrap();
        writeln!(config, "scatter_arity_checks: false").unwrap();
        config.flush().unwrap();

        let args = Args::parse_from([
            "transmooc",
            "--db",
            "core.db",
            "--config-file",
            config.path().to_str().unwrap(),
            "--scatter-arity-checks",
            "true",
        ]);
        let options = args.load_options().unwrap();
        assert!(options.strict_lexing);
        assert!(!options.strict_error_codes);
        assert!(options.scatter_arity_checks);
    }

    #[test]
    fn test_defaults_without_config() {
        let args = Args::parse_from(["transmooc", "--db", "core.db"]);
        assert_eq!(args.load_options().unwrap(), CompileOptions::default());
    }
}

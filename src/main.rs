//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las diferentes fases del proceso de
//! compilación y expone una CLI.

use anyhow::{self, Context};
use clap::{self, crate_version, Arg, Command};
use log::info;

use c1::{
    error::Diagnostics,
    lex::Scanner,
    source::Source,
    target::{DataModel, Platform, Target},
    CompileError,
};

use std::{
    fs::File,
    io::{self, Write},
    process,
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Parsing de CLI
    let args = Command::new("c1")
        .version(crate_version!())
        .about("Compiles a C subset to LLVM textual IR")
        .arg(
            Arg::new("input")
                .required(true)
                .value_name("INPUT")
                .help("Source file"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .takes_value(true)
                .value_name("FILE")
                .help("Output file ('-' or absent for stdout)"),
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("data-model")
                .takes_value(true)
                .value_name("MODEL")
                .default_value("lp64")
                .ignore_case(true)
                .possible_values(DataModel::NAMES)
                .help("Data model"),
        )
        .arg(
            Arg::new("target")
                .short('t')
                .long("target")
                .takes_value(true)
                .value_name("PLATFORM")
                .default_value("native")
                .ignore_case(true)
                .possible_values(Platform::NAMES)
                .help("Target platform"),
        )
        .arg(
            Arg::new("tokens")
                .long("tokens")
                .help("Dump the token stream instead of compiling"),
        )
        .arg(
            Arg::new("scopes")
                .long("scopes")
                .help("Dump the scope tree instead of emitting IR"),
        )
        .get_matches();

    // Los valores posibles ya fueron validados por clap
    let model = args
        .value_of("model")
        .and_then(|model| model.parse().ok())
        .unwrap_or_default();

    let platform = args
        .value_of("target")
        .and_then(|platform| platform.parse().ok())
        .unwrap_or_default();

    let target = Target::new(model, platform);
    let path = args.value_of("input").context("Missing input file")?;

    let file = File::open(path).with_context(|| format!("Failed to open: {}", path))?;
    let source = Source::load(file, path).with_context(|| format!("Failed to read: {}", path))?;

    info!("compiling `{}` for {} on {:?}", path, target.model, target.platform);

    if args.is_present("tokens") {
        return match Scanner::new(source).try_exhaustive() {
            Ok(tokens) => {
                let mut stdout = io::stdout();
                for token in tokens {
                    writeln!(stdout, "{}: {}", token.location(), token.val())?;
                }

                Ok(())
            }

            Err(errors) => fail(Diagnostics::from(errors).kind("Lexical error")),
        };
    }

    if args.is_present("scopes") {
        return match c1::analyze(&source, target) {
            Ok(program) => {
                print!("{}", program.dump_scopes());
                Ok(())
            }

            Err(error) => fail(CompileError::from(error).diagnostics()?),
        };
    }

    let result = match args.value_of("output") {
        None | Some("-") => {
            let stdout = io::stdout();
            let mut stdout = stdout.lock();

            c1::compile_to(&source, target, &mut stdout)
        }

        Some(output) => {
            let mut file = File::create(output)
                .with_context(|| format!("Failed to open for writing: {}", output))?;

            c1::compile_to(&source, target, &mut file)
        }
    };

    match result {
        Ok(()) => {
            info!("done");
            Ok(())
        }

        Err(error) => {
            let diagnostics = error
                .diagnostics()
                .context("Failed to emit IR")?;

            fail(diagnostics)
        }
    }
}

fn fail(diagnostics: Diagnostics) -> ! {
    eprint!("{}", diagnostics);
    process::exit(1)
}

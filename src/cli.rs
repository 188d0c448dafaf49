use std::path::PathBuf;

use clap::{App, Arg, ArgMatches};
use log::LevelFilter;

use crate::compiler::config::{BitPacking, Dialect, GeneratorConfig, DEFAULT_IDENTIFIER};

// Exit Codes for different types of errors
pub const ERR_MODEL: i32 = 1;
pub const ERR_LAYOUT: i32 = 2;
pub const ERR_CODEGEN: i32 = 3;
pub const ERR_IO: i32 = 4;
pub const ERR_ARGUMENTS: i32 = 5;

pub fn print_errs(errs: &[String]) {
    for e in errs {
        eprintln!("{}", e);
    }
}

pub fn configure_cli() -> clap::App<'static, 'static> {
    let app = App::new("XPL Compiler")
        .version("0.1.0")
        .author("Erich Ess")
        .about("Translates XPL and XPL/I program models into C source for the XCOM-I runtime library")
        .arg(
            Arg::with_name("input")
                .short("i")
                .long("input")
                .takes_value(true)
                .required(true)
                .help("Program model to translate, as a .yaml, .yml or .json file"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .required(true)
                .help("Folder that the generated C files are written to"),
        )
        .arg(
            Arg::with_name("packing")
                .long("packing")
                .possible_values(&["1", "2"])
                .default_value("2")
                .takes_value(true)
                .help("How BIT values narrower than their storage are justified: 1 for right justified, 2 for left justified")
        )
        .arg(
            Arg::with_name("standard-xpl")
                .long("standard-xpl")
                .help("Translate standard XPL rather than XPL/I.  ADDR of a builtin is then 0.")
        )
        .arg(
            Arg::with_name("bfs")
                .long("bfs")
                .help("Generate for the Backup Flight System flavor of the runtime library rather than the Primary Flight System")
        )
        .arg(
            Arg::with_name("identifier")
                .long("identifier")
                .takes_value(true)
                .help("Compiler identification string returned by MONITOR(23)")
        )
        .arg(
            Arg::with_name("patches")
                .long("patches")
                .takes_value(true)
                .help("Folder holding the patchN.c files which replace the program's CALL INLINE statements")
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Annotate the generated code with the memory map and with the source text of each statement")
        )
        .arg(
            Arg::with_name("manifest")
                .long("manifest")
                .takes_value(false)
                .help("Write a manifest file describing the memory map of the translated program.")
        )
        .arg(
            Arg::with_name("log-level")
                .long("log-level")
                .possible_values(&["error", "warn", "info", "debug", "trace"])
                .default_value("warn")
                .takes_value(true)
                .help("Sets the level of the messages written to the console while translating")
        );
    app
}

pub fn get_log_level(args: &ArgMatches) -> Option<LevelFilter> {
    match args.value_of("log-level") {
        Some("error") => Some(LevelFilter::Error),
        Some("warn") => Some(LevelFilter::Warn),
        Some("info") => Some(LevelFilter::Info),
        Some("debug") => Some(LevelFilter::Debug),
        Some("trace") => Some(LevelFilter::Trace),
        _ => None,
    }
}

/// Builds the code generator's settings from the command line.  The time of
/// generation is left at 0 for the caller to fill in.
pub fn get_config(args: &ArgMatches) -> Result<GeneratorConfig, String> {
    let packing = args.value_of("packing").unwrap_or("2");
    let bit_packing = packing
        .parse::<u32>()
        .ok()
        .and_then(BitPacking::from_number)
        .ok_or_else(|| format!("Unsupported BIT packing: {}", packing))?;

    Ok(GeneratorConfig {
        bit_packing,
        dialect: if args.is_present("standard-xpl") {
            Dialect::Standard
        } else {
            Dialect::Extended
        },
        pfs: !args.is_present("bfs"),
        identifier: args
            .value_of("identifier")
            .unwrap_or(DEFAULT_IDENTIFIER)
            .into(),
        time_of_generation: 0,
        patch_dir: args.value_of("patches").map(PathBuf::from),
        verbose: args.is_present("verbose"),
    })
}

extern crate log;
extern crate simplelog;

use std::path::Path;
use std::process::exit;
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;
use xpl_lang::compiler::CompilerErrorDisplay;
use xpl_lang::*;

fn main() {
    if let Err(code) = run() {
        exit(code)
    }
}

fn run() -> Result<(), i32> {
    let args = configure_cli().get_matches();

    if let Some(level) = get_log_level(&args) {
        configure_logging(level).expect("Failed to configure logger.")
    }

    let input = args
        .value_of("input")
        .expect("Expected a program model to translate");
    let src_path = Path::new(input);
    let output = Path::new(args.value_of("output").unwrap_or("."));

    let program_name = match get_program_name(src_path) {
        Ok(name) => name,
        Err(msg) => {
            print_errs(&[msg]);
            return Err(ERR_IO);
        }
    };

    let mut config = match get_config(&args) {
        Ok(config) => config,
        Err(msg) => {
            print_errs(&[msg]);
            return Err(ERR_ARGUMENTS);
        }
    };
    config.time_of_generation = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let model = match read_model(src_path) {
        Ok(model) => model,
        Err(msg) => {
            print_errs(&[msg]);
            return Err(ERR_IO);
        }
    };

    let translation = match translate(&model, &config) {
        Ok(translation) => translation,
        Err(err) => {
            print_errs(&[err.format()]);
            return Err(match err {
                TranslationError::Model(_) => ERR_MODEL,
                TranslationError::Layout(_) => ERR_LAYOUT,
                TranslationError::Codegen(_) => ERR_CODEGEN,
            });
        }
    };
    info!(
        "Translated {}: {} procedures not generated",
        program_name,
        translation.removed.len()
    );

    if let Err(msg) = write_files(output, &translation.files) {
        print_errs(&[msg]);
        return Err(ERR_IO);
    }

    if args.is_present("manifest") {
        let manifest = Manifest::extract(program_name, &translation);
        if let Err(msg) = write_manifest(output, &manifest) {
            print_errs(&[msg]);
            return Err(ERR_IO);
        }
    }

    Ok(())
}

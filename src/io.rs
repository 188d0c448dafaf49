use std::path::Path;

use log::{debug, info};

use crate::{
    compiler::c::GeneratedFile,
    project::{Manifest, ScopeModel},
    result::Result,
};

pub const MODEL_FILE_EXTS: [&str; 3] = ["yaml", "yml", "json"];

/// Given the path to a program model, return the name that should be used
/// for the program: the file name without its extension.
pub fn get_program_name(src: &Path) -> Result<&str> {
    src.file_stem()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("Could not extract name from {}", src.display()))
}

/// Reads a program model, in YAML or JSON depending upon the file's
/// extension.
pub fn read_model(path: &Path) -> Result<ScopeModel> {
    let ext = path
        .extension()
        .and_then(|ex| ex.to_str())
        .map(|ex| ex.to_ascii_lowercase());
    let file = std::fs::File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    debug!("Reading program model from {}", path.display());
    match ext.as_deref() {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_reader(file).map_err(|e| format!("{}: {}", path.display(), e))
        }
        Some("json") => {
            serde_json::from_reader(file).map_err(|e| format!("{}: {}", path.display(), e))
        }
        ex => Err(format!(
            "{} is not a program model, expected one of the extensions {} but got {}",
            path.display(),
            MODEL_FILE_EXTS.join(", "),
            ex.unwrap_or("none")
        )),
    }
}

/// Writes every generated file into `folder`, creating it if needed.
pub fn write_files(folder: &Path, files: &[GeneratedFile]) -> Result<()> {
    std::fs::create_dir_all(folder).map_err(|e| format!("{}: {}", folder.display(), e))?;
    for f in files {
        let path = folder.join(&f.name);
        std::fs::write(&path, &f.contents).map_err(|e| format!("{}: {}", path.display(), e))?;
    }
    info!("Wrote {} files to {}", files.len(), folder.display());
    Ok(())
}

/// Writes `manifest` to `<folder>/<program>.manifest`.
pub fn write_manifest(folder: &Path, manifest: &Manifest) -> Result<()> {
    let path = folder.join(format!("{}.manifest", manifest.program));
    std::fs::File::create(&path)
        .map_err(|e| format!("{}", e))
        .and_then(|mut f| manifest.write(&mut f).map_err(|e| format!("{}", e)))
        .map_err(|e| format!("Failed to write manifest file {}: {}", path.display(), e))
}

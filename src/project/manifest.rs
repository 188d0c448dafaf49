use serde::{Deserialize, Serialize};

use crate::compiler::{memory::Layout, Translation};

/// A variable allocated in simulated memory, as listed in a manifest.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Symbol {
    pub address: u32,
    pub name: String,
    pub datatype: String,
    pub num_elements: u32,
    pub dir_width: u32,
    pub bit_width: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<RecordField>,
}

/// One field of the record shape of a BASED variable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: String,
    pub datatype: String,
    pub num_elements: u32,
    pub dir_width: u32,
    pub bit_width: u32,
}

/**
Describes the memory of a translated program: the partition boundaries and
every variable with its address and shape.  Tools which inspect or patch the
memory of a running program, or read its COMMON file, use the manifest
instead of parsing `memory.c`.
 */
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Manifest {
    pub program: String,
    pub common_base: u32,
    pub non_common_base: u32,
    pub free_base: u32,
    pub free_point: u32,
    pub free_limit: u32,
    pub symbols: Vec<Symbol>,
    #[serde(default)]
    pub removed: Vec<String>,
}

impl Manifest {
    pub fn extract(program: &str, translation: &Translation) -> Manifest {
        let mut manifest = Manifest::from_layout(program, &translation.layout);
        manifest.removed = translation.removed.clone();
        manifest
    }

    pub fn from_layout(program: &str, layout: &Layout) -> Manifest {
        let symbols = layout
            .map
            .variables()
            .map(|(address, entry)| Symbol {
                address,
                name: entry.mangled.clone(),
                datatype: entry.datatype.to_string(),
                num_elements: entry.num_elements,
                dir_width: entry.dir_width,
                bit_width: entry.bit_width,
                fields: entry
                    .fields
                    .iter()
                    .map(|f| RecordField {
                        name: f.name.clone(),
                        datatype: f.datatype.to_string(),
                        num_elements: f.num_elements,
                        dir_width: f.dir_width,
                        bit_width: f.bit_width,
                    })
                    .collect(),
            })
            .collect();

        Manifest {
            program: program.into(),
            common_base: layout.common_base,
            non_common_base: layout.non_common_base,
            free_base: layout.free_base,
            free_point: layout.free_point,
            free_limit: layout.free_limit(),
            symbols,
            removed: vec![],
        }
    }

    pub fn get_symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    /// Loads a manifest from the given file.
    pub fn read(file: &mut std::fs::File) -> Result<Manifest, serde_yaml::Error> {
        let manifest: Manifest = serde_yaml::from_reader(file)?;
        Ok(manifest)
    }

    /// Writes the Manifest to the given file
    pub fn write(&self, file: &mut std::fs::File) -> Result<(), serde_yaml::Error> {
        serde_yaml::to_writer(file, self)
    }
}

use log::info;

use crate::compiler::{
    config::GeneratorConfig,
    memory::{Layout, MapDatatype, MemoryMap, MEMORY_SIZE},
    semantics::symbol_table::{ScopeId, ScopeTree},
};

use super::{
    statement::{Counters, FunctionEmitter, QUANTUM},
    CodegenResult,
};

/// A file of generated C, named relative to the output folder.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedFile {
    pub name: String,
    pub contents: String,
}

impl GeneratedFile {
    fn new(name: &str, contents: String) -> GeneratedFile {
        GeneratedFile {
            name: name.into(),
            contents,
        }
    }
}

/// The C file for the root scope (`main.c`) or for one PROCEDURE.
pub fn function_file(
    tree: &ScopeTree,
    scope: ScopeId,
    layout: &Layout,
    config: &GeneratorConfig,
    counters: &mut Counters,
) -> CodegenResult<GeneratedFile> {
    let name = tree.function_name(scope);
    let mut out = format!(
        "/*\n  File {}.c generated by {}.\n*/\n\n#include \"runtimeC.h\"\n#include \"procedures.h\"\n\n",
        name, config.identifier
    );

    let mut emitter = FunctionEmitter::new(tree, config, counters);
    emitter.emit_function(scope)?;
    let body = emitter.finish();

    match tree.procedure_of(scope) {
        Some(proc) => {
            info!("Generating code for PROCEDURE {}", name);
            out.push_str(&format!("{}\n{}(void)\n{{\n\n", proc.return_type().c_type(), name));
            out.push_str(&body);
        }
        None => {
            if config.verbose {
                out.push_str(&memory_map_comment(&layout.map));
            }
            out.push_str("int\nmain(int argc, char *argv[])\n{\n\n");
            out.push_str("  if (parseCommandLine(argc, argv)) exit(0);\n\n");
            out.push_str(&body);
            out.push('\n');
            out.push_str(&epilogue(layout.has_common()));
        }
    }
    out.push_str("}\n");
    Ok(GeneratedFile::new(&format!("{}.c", name), out))
}

/// What `main` does once the program's own statements are done.
fn epilogue(has_common: bool) -> String {
    let q = QUANTUM;
    let mut out = String::new();
    if has_common {
        out.push_str(&format!("{}if (COMMON_OUT != NULL) {{\n", q));
        out.push_str(&format!("{0}{0}if (writeCOMMON(COMMON_OUT))\n", q));
        out.push_str(&format!(
            "{0}{0}{0}fprintf(stderr, \"Error writing COMMON file.\\n\");\n",
            q
        ));
        out.push_str(&format!("{0}{0}fclose(COMMON_OUT);\n", q));
        out.push_str(&format!("{0}{0}COMMON_OUT = NULL;\n", q));
        out.push_str(&format!("{}}}\n", q));
    }
    out.push_str(&format!("{}if (LINE_COUNT)\n", q));
    out.push_str(&format!(
        "{0}{0}printf(\"\\n\"); // Flush buffer for OUTPUT(0) and OUTPUT(1).\n",
        q
    ));
    out.push_str(&format!("{}return 0; // Just in case ...\n", q));
    out
}

/// A listing of the memory map, as a comment.
pub fn memory_map_comment(map: &MemoryMap) -> String {
    let mut out = String::from("/*\n  Memory Map:\n");
    out.push_str(&format!(
        "{:>24}        {:<16} {:<8}\n",
        "Address (Hex)", "Data Type", "Variable"
    ));
    out.push_str(&format!(
        "{:>24}        {:<16} {:<8}\n",
        "-------------", "---------", "--------"
    ));
    for (address, entry) in map.iter() {
        let datatype = match entry.datatype {
            MapDatatype::Bit => format!("BIT({})", entry.bit_width),
            d => d.to_string(),
        };
        let symbol = match entry.num_elements {
            0 => entry.mangled.clone(),
            n => format!("{}({})", entry.mangled, n - 1),
        };
        out.push_str(&format!(
            "       {:8} ({:06X})        {:<16} {}\n",
            address, address, datatype, symbol
        ));
    }
    out.push_str("*/\n\n");
    out
}

/// Prototypes of the functions generated for the PROCEDUREs.
pub fn procedures_h(tree: &ScopeTree, config: &GeneratorConfig) -> GeneratedFile {
    let mut out = format!(
        "/*\n  File procedures.h generated by {}.\n\
         \x20 Provides prototypes for the C functions corresponding to the\n\
         \x20 XPL/I PROCEDUREs.\n\n\
         \x20 Note: Due to the requirement for persistence, all function\n\
         \x20 parameters are passed via static addresses in the `memory`\n\
         \x20 array, rather than via parameter lists, so all parameter\n\
         \x20 lists are `void`.\n*/\n\n#include <stdint.h>\n",
        config.identifier
    );
    for scope in tree.functions() {
        if let Some(proc) = tree.procedure_of(scope) {
            out.push_str(&format!(
                "\n{}\n{}(void);\n",
                proc.return_type().c_type(),
                tree.function_name(scope)
            ));
        }
    }
    GeneratedFile::new("procedures.h", out)
}

/**
The initial contents of simulated memory, along with the memory map that
the runtime library uses to find variables by name.  Only the two regions
which can hold anything other than zeroes are listed: the bottom of memory
up to the allocation cursor, and the top of memory from just below the
lowest wide BIT value.
 */
pub fn memory_c(layout: &Layout) -> GeneratedFile {
    let bytes = layout.image.bytes();

    let mut out = String::from("// Memory data generated by XCOM-i\n\n");
    out.push_str("#include \"runtimeC.h\"\n\n");
    out.push_str("// Initial memory contents, prior to COMMON load ---------------\n\n");
    out.push_str("uint8_t memory[MEMORY_SIZE] = {\n");
    let mut end = 0;
    for (from, to) in dumped_regions(layout.image.cursor(), layout.free_limit()) {
        if from > end {
            if end > 0 {
                out.push(',');
            }
            out.push_str(&format!("  [0x{:X}]=0x00,\n", from - 1));
        }
        dump(&mut out, bytes, from, to);
        end = to;
    }
    out.push_str(&format!(
        "   // {:8} 0x{:06X}\n}};\n",
        MEMORY_SIZE - 8,
        MEMORY_SIZE - 8
    ));

    let map = &layout.map;
    out.push_str("\n// Lists of fields of BASED variables ------------------------\n\n");
    for (_, entry) in map.variables() {
        if entry.datatype != MapDatatype::Based {
            continue;
        }
        if entry.is_bare_based() {
            out.push_str(&format!("// Note that BASED {} has no RECORD\n", entry.mangled));
        }
        out.push_str(&format!(
            "basedField_t based_{}[{}] = {{\n",
            entry.mangled,
            entry.fields.len()
        ));
        for (i, field) in entry.fields.iter().enumerate() {
            out.push_str(&format!(
                "{}{{ \"{}\", \"{}\", {}, {}, {} }}{}\n",
                QUANTUM,
                field.name,
                field.datatype,
                field.num_elements,
                field.dir_width,
                field.bit_width,
                if i + 1 < entry.fields.len() { "," } else { "" }
            ));
        }
        out.push_str("};\n");
    }

    out.push_str("\n// Memory map, sorted by addresses in XPL memory -------------\n\n");
    out.push_str("memoryMapEntry_t memoryMap[NUM_SYMBOLS] = {\n");
    let count = map.num_symbols();
    for (i, (address, entry)) in map.variables().enumerate() {
        let (fields, num_fields, record_size) = match entry.datatype {
            MapDatatype::Based => (
                format!("based_{}", entry.mangled),
                entry.fields.len(),
                entry.record_size,
            ),
            _ => ("NULL".to_string(), 0, 0),
        };
        out.push_str(&format!(
            "  {{ {}, \"{}\", \"{}\", {}, 0, {}, {}, {}, {}, {} }}{}\n",
            address,
            entry.mangled,
            entry.datatype,
            entry.num_elements,
            fields,
            num_fields,
            record_size,
            entry.dir_width,
            entry.bit_width,
            if i + 1 < count { "," } else { "" }
        ));
    }
    out.push_str("};\n");

    out.push_str("\n// Memory map, sorted by symbol name -------------------------\n\n");
    out.push_str("// Note that the collation indicated below is that of the\n");
    out.push_str("// computer running XCOM-I, and may transparently change\n");
    out.push_str("// at runtime on computers with different collation.\n");
    out.push_str("memoryMapEntry_t *memoryMapBySymbol[NUM_SYMBOLS] = {\n");
    for i in map.by_symbol() {
        out.push_str(&format!("  &memoryMap[{}],\n", i));
    }
    out.push_str("};\n");
    GeneratedFile::new("memory.c", out)
}

/// Lists `bytes[from..to]`, eight to a line, each full line followed by the
/// address of its first byte.
/**
The regions of memory written out by [`memory_c`]: everything below the
allocation cursor, and the top of memory from the 8 byte boundary below
the wide BIT data.  When the two would touch or overlap they are written
as one region, so that no designator points back into bytes already listed.
 */
pub(super) fn dumped_regions(cursor: u32, limit: u32) -> Vec<(u32, u32)> {
    let restart = limit.saturating_sub(8 + limit % 8);
    if cursor >= restart {
        vec![(0, MEMORY_SIZE)]
    } else {
        vec![(0, cursor), (restart, MEMORY_SIZE)]
    }
}

fn dump(out: &mut String, bytes: &[u8], from: u32, to: u32) {
    for i in from..to {
        if i % 8 == 0 {
            out.push_str("  ");
        }
        out.push_str(&format!("0x{:02X}", bytes[i as usize]));
        if i + 1 < to {
            out.push_str(", ");
            if i % 8 == 7 {
                let j = i & !7;
                out.push_str(&format!(" // {:8} 0x{:06X}\n", j, j));
            }
        }
    }
}

/// Settings that the runtime library is compiled with.
pub fn configuration_h(layout: &Layout, config: &GeneratorConfig) -> GeneratedFile {
    let map = &layout.map;
    let mut lines = vec![
        "// Configuration settings, inferred from the XPL/I source.".to_string(),
        format!("#define XCOM_I_START_TIME {}", config.time_of_generation),
        if config.pfs { "#define PFS" } else { "#define BFS" }.to_string(),
    ];
    if config.is_standard() {
        lines.push("#define STANDARD_XPL".into());
    }
    lines.extend(vec![
        format!("#define BIT_PACKING {}", config.bit_packing.number()),
        format!("#define COMMON_BASE 0x{:06X}", layout.common_base),
        format!("#define NON_COMMON_BASE 0x{:06X}", layout.non_common_base),
        format!("#define FREE_BASE 0x{:06X}", layout.free_base),
        format!(
            "#define FREE_POINT 0x{:06X} // Initial value for `freepoint`",
            layout.free_point
        ),
        format!("#define FREE_LIMIT 0x{:07X}", layout.free_limit()),
        format!("#define NUM_SYMBOLS {}", map.num_symbols()),
        format!("#define MAX_SYMBOL_LENGTH {}", map.max_symbol_length()),
        format!("#define MAX_DATATYPE_LENGTH {}", "CHARACTER".len()),
        format!("#define MAX_RECORD_FIELDS {}", layout.max_record_fields),
        format!("#define MAX_RECORD_FIELD_NAME {}", layout.max_record_field_name),
        format!("#define WHERE_MONITOR_23 {}", layout.where_monitor_23),
        format!("#define WHERE_MONITOR_13 {}", layout.where_monitor_13),
        String::new(),
    ]);
    for line in &[
        "typedef char symbol_t[MAX_SYMBOL_LENGTH + 1];",
        "typedef char datatype_t[MAX_DATATYPE_LENGTH + 1];",
        "typedef struct {",
        "  symbol_t symbol;",
        "  datatype_t datatype;",
        "  int numElements;",
        "  int dirWidth;",
        "  int bitWidth;",
        "} basedField_t;",
        "typedef struct {",
        "  int address;",
        "  symbol_t symbol;",
        "  datatype_t datatype;",
        "  int numElements;",
        "  int allocated;",
        "  basedField_t *basedFields;",
        "  int numFieldsInRecord;",
        "  int recordSize;",
        "  int dirWidth;",
        "  int bitWidth;",
        "} memoryMapEntry_t;",
        "extern memoryMapEntry_t memoryMap[NUM_SYMBOLS]; // Sorted by address",
        "extern memoryMapEntry_t *memoryMapBySymbol[NUM_SYMBOLS]; // Sorted by symbol",
    ] {
        lines.push(line.to_string());
    }

    let mut out = lines.join("\n");
    out.push('\n');
    GeneratedFile::new("configuration.h", out)
}

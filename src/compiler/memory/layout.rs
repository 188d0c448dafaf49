use log::debug;

use crate::compiler::{
    ast::{Scalar, StorageClass, MAX_BIT_WIDTH},
    config::GeneratorConfig,
    semantics::symbol_table::{BasedTarget, Initial, ScopeTree, VarKind, Variable},
    CompilerError,
};

use super::{
    error::LayoutError,
    image::MemoryImage,
    memory_map::{MapEntry, MemoryMap},
    LayoutResult,
};

/// Bytes allowed for each string of the monitor call 13 option tables.
const LEN_NAME: u32 = 16;

/// Entries in each monitor call 13 option table.
const MAX_ENTRIES: u32 = 25;

/// Entries of the `VALS` table which hold string descriptors.
const VALS_STRINGS: [u32; 3] = [0, 8, 12];

/**
The result of laying out a program: the initialized memory image, the map of
everything allocated in it and the boundaries of its partitions.

```text
0                 non_common_base   free_base     free_point   free_limit
| COMMON | monitor | non-COMMON       | char data   | free ...   | wide BIT |
```
 */
pub struct Layout {
    pub image: MemoryImage,
    pub map: MemoryMap,
    pub common_base: u32,
    pub non_common_base: u32,
    pub free_base: u32,
    pub free_point: u32,
    pub where_monitor_23: u32,
    pub where_monitor_13: u32,
    pub max_record_fields: usize,
    pub max_record_field_name: usize,
}

impl Layout {
    pub fn free_limit(&self) -> u32 {
        self.image.free_limit()
    }

    pub fn has_common(&self) -> bool {
        self.non_common_base > self.common_base
    }
}

/**
Assigns an address to every variable reachable from the root of `tree` and
writes the initial values of FIXED, BIT and CHARACTER variables into a new
memory image.  Variables are visited in the same order in every pass:
scopes in pre-order, and declarations within a scope in declaration order.

The passes are:
1. COMMON variables, with FIXED and BIT initial values.
2. The reserved monitor area.
3. non-COMMON variables and parameters, with FIXED and BIT initial values.
4. Character data of initialized COMMON CHARACTER variables.
5. Character data of initialized non-COMMON CHARACTER variables.
 */
pub fn layout(tree: &mut ScopeTree, config: &GeneratorConfig) -> LayoutResult<Layout> {
    debug!("Laying out memory");
    let mut image = MemoryImage::new(config.bit_packing);
    let mut map = MemoryMap::new();

    let common_base = image.cursor();
    allocate_pass(tree, &mut image, &mut map, true)?;
    let non_common_base = image.cursor();

    let (where_monitor_23, where_monitor_13) =
        reserve_monitor_area(&mut image, &config.identifier)
            .map_err(|e| CompilerError::new(0, e))?;

    allocate_pass(tree, &mut image, &mut map, false)?;
    let free_base = image.cursor();

    character_pass(tree, &mut image, &mut map, true)?;
    character_pass(tree, &mut image, &mut map, false)?;
    let free_point = image.cursor();

    let (max_record_fields, max_record_field_name) = record_stats(tree);

    debug!(
        "Finished laying out memory: non-COMMON at 0x{:06X}, free from 0x{:06X} to 0x{:06X}",
        non_common_base,
        free_point,
        image.free_limit()
    );
    Ok(Layout {
        image,
        map,
        common_base,
        non_common_base,
        free_base,
        free_point,
        where_monitor_23,
        where_monitor_13,
        max_record_fields,
        max_record_field_name,
    })
}

fn in_pass(storage: StorageClass, common: bool) -> bool {
    storage.is_common() == common
}

fn allocate_pass(
    tree: &mut ScopeTree,
    image: &mut MemoryImage,
    map: &mut MemoryMap,
    common: bool,
) -> LayoutResult<()> {
    for id in tree.walk(tree.root()) {
        for var in tree.get_mut(id).table_mut().iter_mut() {
            if !in_pass(var.storage, common) {
                continue;
            }
            let entry = match MapEntry::for_variable(var) {
                Some(entry) => entry,
                None => continue,
            };
            let line = var.line;
            allocate(var, image).map_err(|e| CompilerError::new(line, e))?;
            if let Some(address) = var.address {
                map.insert(address, entry);
            }
        }
    }
    Ok(())
}

fn allocate(var: &mut Variable, image: &mut MemoryImage) -> Result<(), LayoutError> {
    check_widths(var)?;
    let address = image.allocate(var.slot_size())?;
    var.address = Some(address);

    if var.initial.is_empty() {
        return Ok(());
    }
    match var.kind {
        VarKind::Fixed | VarKind::Bit(_) => {
            if var.initial.len() > var.count() as usize {
                return Err(LayoutError::TooManyInitializers(var.name.clone()));
            }
            let stride = var.stride();
            for (i, initial) in var.initial.iter().enumerate() {
                let value = integer(&var.name, initial)?;
                let slot = address + stride * i as u32;
                match var.kind {
                    VarKind::Bit(w) => image.put_bit(slot, w, value)?,
                    _ => image.put_fixed(slot, value)?,
                }
            }
            Ok(())
        }
        VarKind::Based(_) => Err(LayoutError::InitialOnBased(var.name.clone())),
        _ => Ok(()),
    }
}

/// The value of a FIXED or BIT initializer.  Text is accepted when it is
/// the decimal form of an integer.
fn integer(name: &str, initial: &Initial) -> Result<i64, LayoutError> {
    match initial {
        Initial::Number(n) => Ok(*n),
        Initial::Text(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| LayoutError::InitializerNotInteger(name.into(), text.clone())),
    }
}

fn check_widths(var: &Variable) -> Result<(), LayoutError> {
    let check = |ty: &Scalar| match ty.bit_width() {
        Some(w) if w == 0 || w > MAX_BIT_WIDTH => {
            Err(LayoutError::BitWidth(var.name.clone(), w))
        }
        _ => Ok(()),
    };
    match &var.kind {
        VarKind::Bit(w) => check(&Scalar::Bit(*w)),
        VarKind::Based(BasedTarget::Element(s)) => check(s),
        VarKind::Based(BasedTarget::Record(r)) => {
            r.fields().iter().map(|f| check(&f.ty)).collect()
        }
        _ => Ok(()),
    }
}

fn character_pass(
    tree: &mut ScopeTree,
    image: &mut MemoryImage,
    map: &mut MemoryMap,
    common: bool,
) -> LayoutResult<()> {
    for id in tree.walk(tree.root()) {
        for var in tree.get(id).table().iter() {
            if !in_pass(var.storage, common)
                || var.kind != VarKind::Character
                || var.initial.is_empty()
            {
                continue;
            }
            map.insert(image.cursor(), MapEntry::for_character_data(var));
            initialize_characters(var, image).map_err(|e| CompilerError::new(var.line, e))?;
        }
    }
    Ok(())
}

fn initialize_characters(var: &Variable, image: &mut MemoryImage) -> Result<(), LayoutError> {
    if var.initial.len() > var.count() as usize {
        return Err(LayoutError::TooManyInitializers(var.name.clone()));
    }
    let address = var
        .address
        .ok_or(LayoutError::AddressOutOfRange(image.cursor()))?;
    for (i, initial) in var.initial.iter().enumerate() {
        let text = match initial {
            Initial::Text(text) => text.clone(),
            Initial::Number(n) => n.to_string(),
        };
        image.put_character(address + 4 * i as u32, &text)?;
    }
    Ok(())
}

/**
Reserves the memory which the runtime library fills in for the monitor
calls: the descriptor and text of the compiler identification returned by
call 23, then the six word option block returned by call 13 followed by its
`CON`, `TYPE2` and `VALS` tables.  Returns the addresses of the two areas.
 */
fn reserve_monitor_area(
    image: &mut MemoryImage,
    identifier: &str,
) -> Result<(u32, u32), LayoutError> {
    let where_23 = image.allocate(4)?;
    image.put_character(where_23, identifier)?;

    let where_13 = image.cursor();
    let table_size = (LEN_NAME + 4) * MAX_ENTRIES;
    let con = where_13 + 24;
    image.put_fixed(where_13, 0)?;
    image.put_fixed(where_13 + 4, con as i64)?;
    image.put_fixed(where_13 + 8, 0)?;
    image.put_fixed(where_13 + 12, (con + table_size) as i64)?;
    image.put_fixed(where_13 + 16, (con + 2 * table_size) as i64)?;
    image.put_fixed(where_13 + 20, 0)?;

    let type2 = string_table(image, con, |_| true)?;
    let vals = string_table(image, type2, |_| true)?;
    let end = string_table(image, vals, |i| VALS_STRINGS.contains(&i))?;

    image.allocate(end - where_13)?;
    Ok((where_23, where_13))
}

/// Writes a table of `MAX_ENTRIES` words at `at`, followed by the data of
/// the entries selected by `is_string`, whose words become descriptors.
/// Returns the address following the data.
fn string_table<F: Fn(u32) -> bool>(
    image: &mut MemoryImage,
    at: u32,
    is_string: F,
) -> Result<u32, LayoutError> {
    let mut data = at + 4 * MAX_ENTRIES;
    for i in 0..MAX_ENTRIES {
        if is_string(i) {
            image.put_fixed(at + 4 * i, (((LEN_NAME - 1) << 24) | data) as i64)?;
            data += LEN_NAME;
        } else {
            image.put_fixed(at + 4 * i, 0)?;
        }
    }
    Ok(data)
}

/// The largest number of fields and the longest field name over every
/// BASED RECORD in the program.
fn record_stats(tree: &ScopeTree) -> (usize, usize) {
    let mut max_fields = 0;
    let mut max_name = 0;
    for id in tree.walk(tree.root()) {
        for var in tree.get(id).table().iter() {
            if let Some(record) = var.get_record() {
                max_fields = max_fields.max(record.fields().len());
                for field in record.fields() {
                    max_name = max_name.max(field.name.len());
                }
            }
        }
    }
    (max_fields, max_name)
}

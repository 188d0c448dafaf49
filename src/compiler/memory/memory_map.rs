use std::collections::BTreeMap;

use serde::Serialize;

use crate::compiler::ast::{Datatype, Scalar};
use crate::compiler::semantics::symbol_table::{BasedTarget, VarKind, Variable};

/// The datatype tag of a memory map entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum MapDatatype {
    #[serde(rename = "FIXED")]
    Fixed,
    #[serde(rename = "BIT")]
    Bit,
    #[serde(rename = "CHARACTER")]
    Character,
    #[serde(rename = "BASED")]
    Based,
    /// Initial character data of a CHARACTER variable.
    #[serde(rename = "EBCDIC codes")]
    EbcdicCodes,
}

impl MapDatatype {
    /// Entries which describe a variable rather than a block of data.
    pub fn is_variable(&self) -> bool {
        *self != MapDatatype::EbcdicCodes
    }
}

impl std::fmt::Display for MapDatatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapDatatype::Fixed => f.write_str("FIXED"),
            MapDatatype::Bit => f.write_str("BIT"),
            MapDatatype::Character => f.write_str("CHARACTER"),
            MapDatatype::Based => f.write_str("BASED"),
            MapDatatype::EbcdicCodes => f.write_str("EBCDIC codes"),
        }
    }
}

/// One field of the record shape of a BASED variable.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MapField {
    pub name: String,
    pub datatype: Datatype,
    pub num_elements: u32,
    pub dir_width: u32,
    pub bit_width: u32,
}

impl MapField {
    fn new(name: &str, ty: Scalar, top: Option<u32>) -> MapField {
        MapField {
            name: name.into(),
            datatype: ty.datatype(),
            num_elements: top.map(|t| t + 1).unwrap_or(0),
            dir_width: ty.stride(),
            bit_width: ty.bit_width().unwrap_or(0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MapEntry {
    pub mangled: String,
    pub datatype: MapDatatype,
    pub num_elements: u32,
    pub fields: Vec<MapField>,
    pub record_size: u32,
    pub dir_width: u32,
    pub bit_width: u32,
}

impl MapEntry {
    /// The entry for a variable allocated at its own address.  Returns
    /// `None` for procedures, which occupy no memory.
    pub fn for_variable(var: &Variable) -> Option<MapEntry> {
        let (datatype, fields, bit_width) = match &var.kind {
            VarKind::Fixed => (MapDatatype::Fixed, vec![], 0),
            VarKind::Bit(w) => (MapDatatype::Bit, vec![], *w),
            VarKind::Character => (MapDatatype::Character, vec![], 0),
            VarKind::Based(BasedTarget::Element(s)) => (
                MapDatatype::Based,
                vec![MapField::new("", *s, var.top)],
                s.bit_width().unwrap_or(0),
            ),
            VarKind::Based(BasedTarget::Record(r)) => (
                MapDatatype::Based,
                r.fields()
                    .iter()
                    .map(|f| MapField::new(&f.name, f.ty, f.top))
                    .collect(),
                0,
            ),
            VarKind::Procedure(_) => return None,
        };
        let record_size = fields
            .iter()
            .map(|f| f.dir_width * f.num_elements.max(1))
            .sum();
        Some(MapEntry {
            mangled: var.mangled.clone(),
            datatype,
            num_elements: var.top.map(|t| t + 1).unwrap_or(0),
            fields,
            record_size,
            dir_width: var.stride(),
            bit_width,
        })
    }

    /// The entry marking the start of a variable's initial character data.
    pub fn for_character_data(var: &Variable) -> MapEntry {
        MapEntry {
            mangled: var.mangled.clone(),
            datatype: MapDatatype::EbcdicCodes,
            num_elements: var.top.map(|t| t + 1).unwrap_or(0),
            fields: vec![],
            record_size: 0,
            dir_width: 0,
            bit_width: 0,
        }
    }

    /// True for a BASED variable declared without a RECORD.
    pub fn is_bare_based(&self) -> bool {
        self.datatype == MapDatatype::Based && self.fields.len() == 1 && self.fields[0].name.is_empty()
    }
}

/**
Everything allocated in simulated memory, keyed and ordered by address.
Entries at the same address replace each other, so a variable's character
data entry can hide an earlier entry which allocated nothing.
 */
#[derive(Clone, Debug, PartialEq, Default, Serialize)]
pub struct MemoryMap {
    entries: BTreeMap<u32, MapEntry>,
}

impl MemoryMap {
    pub fn new() -> MemoryMap {
        MemoryMap {
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, address: u32, entry: MapEntry) {
        self.entries.insert(address, entry);
    }

    pub fn get(&self, address: u32) -> Option<&MapEntry> {
        self.entries.get(&address)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &MapEntry)> {
        self.entries.iter().map(|(a, e)| (*a, e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Variable entries in address order.
    pub fn variables(&self) -> impl Iterator<Item = (u32, &MapEntry)> {
        self.iter().filter(|(_, e)| e.datatype.is_variable())
    }

    pub fn num_symbols(&self) -> usize {
        self.variables().count()
    }

    pub fn max_symbol_length(&self) -> usize {
        self.variables()
            .map(|(_, e)| e.mangled.len())
            .max()
            .unwrap_or(0)
    }

    /// Indices into the address ordered variables, sorted by mangled name.
    pub fn by_symbol(&self) -> Vec<usize> {
        let mut index: Vec<(&str, usize)> = self
            .variables()
            .enumerate()
            .map(|(i, (_, e))| (e.mangled.as_str(), i))
            .collect();
        index.sort();
        index.into_iter().map(|(_, i)| i).collect()
    }
}

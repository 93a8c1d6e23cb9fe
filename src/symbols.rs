use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::SymbolError;

/// Declaration category of a documented symbol, using the DDOX tag vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Module,
    ClassDeclaration,
    FunctionDeclaration,
    StructDeclaration,
    EnumDeclaration,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 5] = [
        SymbolKind::Module,
        SymbolKind::ClassDeclaration,
        SymbolKind::FunctionDeclaration,
        SymbolKind::StructDeclaration,
        SymbolKind::EnumDeclaration,
    ];

    pub fn as_tag(self) -> &'static str {
        match self {
            SymbolKind::Module => "module",
            SymbolKind::ClassDeclaration => "classdeclaration",
            SymbolKind::FunctionDeclaration => "functiondeclaration",
            SymbolKind::StructDeclaration => "structdeclaration",
            SymbolKind::EnumDeclaration => "enumdeclaration",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown symbol kind `{0}`")]
pub struct ParseKindError(pub String);

impl FromStr for SymbolKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SymbolKind::ALL
            .into_iter()
            .find(|kind| kind.as_tag() == s)
            .ok_or_else(|| ParseKindError(s.to_string()))
    }
}

/// One documented symbol as listed in a DDOX symbol index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    /// Fully-qualified dotted name, e.g. `quill.database.Database.execute`.
    pub name: String,
    pub kind: SymbolKind,
    /// Documentation page relative to the docs root.
    pub path: String,
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl SymbolEntry {
    /// Last dotted component of the name.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Dotted name of the enclosing symbol, `None` for top-level names.
    pub fn parent_name(&self) -> Option<&str> {
        self.name.rsplit_once('.').map(|(parent, _)| parent)
    }
}

struct BuiltinSymbol {
    name: &'static str,
    kind: SymbolKind,
    path: &'static str,
    attributes: &'static [&'static str],
}

const fn sym(name: &'static str, kind: SymbolKind, path: &'static str) -> BuiltinSymbol {
    BuiltinSymbol {
        name,
        kind,
        path,
        attributes: &[],
    }
}

use SymbolKind::{
    ClassDeclaration as Class, EnumDeclaration as Enum, FunctionDeclaration as Function,
    Module, StructDeclaration as Struct,
};

const QUILL_SYMBOLS: &[BuiltinSymbol] = &[
    sym("quill.bind", Module, "./quill/bind.html"),
    sym("quill.bind.bind", Struct, "./quill/bind/bind.html"),
    sym("quill.database", Module, "./quill/database.html"),
    sym("quill.database.Database", Class, "./quill/database/Database.html"),
    sym("quill.database.Database.execute", Function, "./quill/database/Database.execute.html"),
    sym("quill.database.Database.list", Function, "./quill/database/Database.list.html"),
    sym("quill.database.Database.single", Function, "./quill/database/Database.single.html"),
    sym("quill.database.Database.sql", Function, "./quill/database/Database.sql.html"),
    sym("quill.database.Database.this", Function, "./quill/database/Database.this.html"),
    sym("quill.database_type", Module, "./quill/database_type.html"),
    sym("quill.database_type.DatabaseType", Enum, "./quill/database_type/DatabaseType.html"),
    sym("quill.mapper", Module, "./quill/mapper.html"),
    sym("quill.mapper.isSupportedType", Function, "./quill/mapper/isSupportedType.html"),
    sym("quill.mapper.Mapper", Class, "./quill/mapper/Mapper.html"),
    sym("quill.mapper.Mapper.map", Function, "./quill/mapper/Mapper.map.html"),
    sym("quill.mapper.Mapper.mapArray", Function, "./quill/mapper/Mapper.mapArray.html"),
    sym("quill.mapper.Mapper.mapOne", Function, "./quill/mapper/Mapper.mapOne.html"),
    sym("quill.mapper.Mapper.mapType", Function, "./quill/mapper/Mapper.mapType.html"),
    sym("quill.mapper_base", Module, "./quill/mapper_base.html"),
    sym("quill.mapper_base.MapperBase", Class, "./quill/mapper_base/MapperBase.html"),
    sym(
        "quill.mapper_base.MapperBase.findColumn",
        Function,
        "./quill/mapper_base/MapperBase.findColumn.html",
    ),
    sym("quill.variant_mapper", Module, "./quill/variant_mapper.html"),
    sym("quill.variant_mapper.VariantMapper", Class, "./quill/variant_mapper/VariantMapper.html"),
    sym(
        "quill.variant_mapper.VariantMapper.map",
        Function,
        "./quill/variant_mapper/VariantMapper.map.html",
    ),
];

static BUILTIN: Lazy<SymbolTable> = Lazy::new(|| {
    let entries = QUILL_SYMBOLS
        .iter()
        .map(|s| SymbolEntry {
            name: s.name.to_string(),
            kind: s.kind,
            path: s.path.to_string(),
            attributes: s.attributes.iter().map(|a| a.to_string()).collect(),
        })
        .collect();
    SymbolTable::from_entries(entries)
});

/// Ordered, read-only symbol table with a name index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
    by_name: HashMap<String, usize>,
}

impl SymbolTable {
    /// The symbol index of the quill library, built once per process.
    pub fn builtin() -> &'static SymbolTable {
        &BUILTIN
    }

    /// Build a table keeping the given order. On duplicate names the first
    /// entry wins for lookups; later ones stay listed.
    pub fn from_entries(entries: Vec<SymbolEntry>) -> Self {
        let mut by_name = HashMap::with_capacity(entries.len());
        for (pos, entry) in entries.iter().enumerate() {
            if by_name.contains_key(&entry.name) {
                warn!(name = %entry.name, "duplicate symbol name, keeping first occurrence");
                continue;
            }
            by_name.insert(entry.name.clone(), pos);
        }
        debug!(symbols = entries.len(), "symbol table built");
        Self { entries, by_name }
    }

    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SymbolEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, name: &str) -> Option<&SymbolEntry> {
        self.by_name.get(name).map(|&pos| &self.entries[pos])
    }

    pub fn require(&self, name: &str) -> Result<&SymbolEntry, SymbolError> {
        self.lookup(name).ok_or_else(|| SymbolError::NotFound(name.to_string()))
    }

    pub fn filter_by_kind(&self, kind: SymbolKind) -> Vec<&SymbolEntry> {
        self.entries.iter().filter(|e| e.kind == kind).collect()
    }

    /// Direct children of `parent`, e.g. the classes and free functions of a module.
    pub fn members_of(&self, parent: &str) -> Vec<&SymbolEntry> {
        self.entries
            .iter()
            .filter(|e| e.parent_name() == Some(parent))
            .collect()
    }
}

impl<'a> IntoIterator for &'a SymbolTable {
    type Item = &'a SymbolEntry;
    type IntoIter = std::slice::Iter<'a, SymbolEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

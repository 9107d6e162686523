//! Definition Model
//!
//! The closed-world program the generator works from: every constructor
//! symbol with its dense tag, argument sorts and result sort, every declared
//! sort with its hook, and the attribute set of every symbol.
//!
//! Definitions are normally loaded from a TOML file:
//!
//! ```toml
//! [[sort]]
//! name = "SortMap{}"
//! hook = "MAP.Map"
//! unit = "Lbl'Stop'Map{}"
//! element = "Lbl'UndsPipe'-'-GT-Unds'{}"
//! concat = "Lbl'Unds'Map'Unds'{}"
//!
//! [[symbol]]
//! tag = 0
//! name = "Lbl'Stop'Map{}"
//! arguments = []
//! sort = "SortMap{}"
//! attributes = ["function"]
//! hook = "MAP.unit"
//! ```
//!
//! The input is expected to have been validated by the frontend already.
//! `Definition::new` only re-checks the structural facts the generated
//! dispatch relies on (contiguous tags, unique names).

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// A sort, identified by its printed name (e.g. `SortInt{}`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct Sort(pub String);

impl Sort {
    pub fn new(name: impl Into<String>) -> Self {
        Sort(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Native representation class of a sort.
///
/// Decides how a value of the sort is laid out in a node, how it crosses
/// the one-word generic interface, and which visitor callback receives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortCategory {
    Int,
    Float,
    Bool,
    MInt,
    StringBuffer,
    Symbol,
    Map,
    List,
    Set,
    /// No declaration was found for the sort. Never valid at a dispatch point.
    Uncomputed,
}

impl SortCategory {
    /// Category selected by a sort's `hook` attribute.
    pub fn from_hook(hook: Option<&str>) -> Self {
        match hook {
            Some("INT.Int") => SortCategory::Int,
            Some("FLOAT.Float") => SortCategory::Float,
            Some("BOOL.Bool") => SortCategory::Bool,
            Some("MINT.MInt") => SortCategory::MInt,
            Some("BUFFER.StringBuffer") => SortCategory::StringBuffer,
            Some("MAP.Map") => SortCategory::Map,
            Some("LIST.List") => SortCategory::List,
            Some("SET.Set") => SortCategory::Set,
            _ => SortCategory::Symbol,
        }
    }

    pub fn is_collection(self) -> bool {
        matches!(
            self,
            SortCategory::Map | SortCategory::List | SortCategory::Set
        )
    }
}

impl fmt::Display for SortCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortCategory::Int => "Int",
            SortCategory::Float => "Float",
            SortCategory::Bool => "Bool",
            SortCategory::MInt => "MInt",
            SortCategory::StringBuffer => "StringBuffer",
            SortCategory::Symbol => "Symbol",
            SortCategory::Map => "Map",
            SortCategory::List => "List",
            SortCategory::Set => "Set",
            SortCategory::Uncomputed => "Uncomputed",
        };
        f.write_str(name)
    }
}

/// A declared sort.
///
/// Collection sorts additionally name their `unit`, `element` and `concat`
/// constructors; external traversal code rebuilds collections through them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SortDeclaration {
    pub name: String,
    #[serde(default)]
    pub hook: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub element: Option<String>,
    #[serde(default)]
    pub concat: Option<String>,
}

impl SortDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        SortDeclaration {
            name: name.into(),
            hook: None,
            unit: None,
            element: None,
            concat: None,
        }
    }

    pub fn with_hook(mut self, hook: impl Into<String>) -> Self {
        self.hook = Some(hook.into());
        self
    }

    pub fn category(&self) -> SortCategory {
        SortCategory::from_hook(self.hook.as_deref())
    }
}

/// Attributes attached to a symbol by its declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolDeclaration {
    pub name: String,
    pub attributes: BTreeSet<String>,
    /// Builtin implementation backing a function symbol, e.g. `INT.add`.
    pub hook: Option<String>,
}

impl SymbolDeclaration {
    pub fn is_function(&self) -> bool {
        self.attributes.contains("function")
    }
}

/// A constructor or function symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub tag: u32,
    pub name: String,
    pub arguments: Vec<Sort>,
    pub sort: Sort,
}

impl Symbol {
    pub fn new(tag: u32, name: impl Into<String>, arguments: Vec<Sort>, sort: Sort) -> Self {
        Symbol {
            tag,
            name: name.into(),
            arguments,
            sort,
        }
    }

    /// True for symbols with no children. Traversal routines have no case for them.
    pub fn is_leaf(&self) -> bool {
        self.arguments.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct SymbolEntry {
    tag: u32,
    name: String,
    #[serde(default)]
    arguments: Vec<Sort>,
    sort: Sort,
    #[serde(default)]
    attributes: BTreeSet<String>,
    #[serde(default)]
    hook: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DefinitionFile {
    #[serde(rename = "sort", default)]
    sorts: Vec<SortDeclaration>,
    #[serde(rename = "symbol", default)]
    symbols: Vec<SymbolEntry>,
}

/// A fully resolved program definition.
#[derive(Debug, Clone)]
pub struct Definition {
    symbols: BTreeMap<u32, Symbol>,
    sort_declarations: BTreeMap<String, SortDeclaration>,
    symbol_declarations: HashMap<String, SymbolDeclaration>,
}

impl Definition {
    /// Build a definition from its sorts and its symbols with their declarations.
    ///
    /// Tags must be unique and contiguous from 0; the generated switches
    /// assume a dense tag space.
    pub fn new(
        sorts: Vec<SortDeclaration>,
        symbols: Vec<(Symbol, SymbolDeclaration)>,
    ) -> Result<Self, String> {
        let mut sort_declarations = BTreeMap::new();
        for sort in sorts {
            if sort.name.trim().is_empty() {
                return Err("Sort declaration has empty name".to_string());
            }
            let name = sort.name.clone();
            if sort_declarations.insert(name.clone(), sort).is_some() {
                return Err(format!("Sort '{}' is declared more than once", name));
            }
        }

        let mut by_tag = BTreeMap::new();
        let mut symbol_declarations = HashMap::new();
        for (symbol, decl) in symbols {
            if symbol.name.trim().is_empty() {
                return Err(format!("Symbol with tag {} has empty name", symbol.tag));
            }
            if decl.name != symbol.name {
                return Err(format!(
                    "Declaration '{}' does not match symbol '{}'",
                    decl.name, symbol.name
                ));
            }
            if symbol_declarations
                .insert(symbol.name.clone(), decl)
                .is_some()
            {
                return Err(format!("Symbol '{}' is declared more than once", symbol.name));
            }
            let tag = symbol.tag;
            if let Some(previous) = by_tag.insert(tag, symbol) {
                return Err(format!(
                    "Tag {} is assigned to more than one symbol (first '{}')",
                    tag, previous.name
                ));
            }
        }

        for (expected, tag) in by_tag.keys().enumerate() {
            if *tag as usize != expected {
                return Err(format!(
                    "Symbol tags must be contiguous from 0: expected tag {}, found {}",
                    expected, tag
                ));
            }
        }

        Ok(Definition {
            symbols: by_tag,
            sort_declarations,
            symbol_declarations,
        })
    }

    /// Parse a definition from TOML content
    pub fn from_toml(content: &str) -> Result<Self, String> {
        let file: DefinitionFile =
            toml::from_str(content).map_err(|e| format!("Failed to parse definition: {}", e))?;

        let symbols = file
            .symbols
            .into_iter()
            .map(|entry| {
                let decl = SymbolDeclaration {
                    name: entry.name.clone(),
                    attributes: entry.attributes,
                    hook: entry.hook,
                };
                let symbol = Symbol::new(entry.tag, entry.name, entry.arguments, entry.sort);
                (symbol, decl)
            })
            .collect();

        Self::new(file.sorts, symbols)
    }

    /// Symbols in ascending tag order.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbol(&self, tag: u32) -> Option<&Symbol> {
        self.symbols.get(&tag)
    }

    /// Sort declarations in name order.
    pub fn sort_declarations(&self) -> impl Iterator<Item = &SortDeclaration> {
        self.sort_declarations.values()
    }

    pub fn sort_declaration(&self, sort: &Sort) -> Option<&SortDeclaration> {
        self.sort_declarations.get(sort.name())
    }

    pub fn symbol_declaration(&self, name: &str) -> Option<&SymbolDeclaration> {
        self.symbol_declarations.get(name)
    }

    /// Category of a sort; `Uncomputed` when the sort was never declared.
    pub fn category(&self, sort: &Sort) -> SortCategory {
        self.sort_declaration(sort)
            .map(SortDeclaration::category)
            .unwrap_or(SortCategory::Uncomputed)
    }

    /// Symbols carrying the `function` attribute, in tag order.
    pub fn function_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols().filter(|symbol| {
            self.symbol_declaration(&symbol.name)
                .is_some_and(SymbolDeclaration::is_function)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"
[[sort]]
name = "SortInt{}"
hook = "INT.Int"

[[sort]]
name = "SortKItem{}"

[[symbol]]
tag = 0
name = "Lbl'Plus'Int{}"
arguments = ["SortInt{}", "SortInt{}"]
sort = "SortInt{}"
attributes = ["function"]
hook = "INT.add"

[[symbol]]
tag = 1
name = "inj{SortInt{}, SortKItem{}}"
arguments = ["SortInt{}"]
sort = "SortKItem{}"
"#;

    #[test]
    fn test_parse_definition() {
        let def = Definition::from_toml(SMALL).unwrap();
        assert_eq!(def.symbol_count(), 2);
        let plus = def.symbol(0).unwrap();
        assert_eq!(plus.name, "Lbl'Plus'Int{}");
        assert_eq!(plus.arguments.len(), 2);
        let decl = def.symbol_declaration(&plus.name).unwrap();
        assert!(decl.is_function());
        assert_eq!(decl.hook.as_deref(), Some("INT.add"));
        assert!(!def.symbol_declaration("inj{SortInt{}, SortKItem{}}").unwrap().is_function());
    }

    #[test]
    fn test_categories_from_hooks() {
        let def = Definition::from_toml(SMALL).unwrap();
        assert_eq!(def.category(&Sort::new("SortInt{}")), SortCategory::Int);
        assert_eq!(def.category(&Sort::new("SortKItem{}")), SortCategory::Symbol);
        assert_eq!(
            def.category(&Sort::new("SortMissing{}")),
            SortCategory::Uncomputed
        );
        assert_eq!(SortCategory::from_hook(Some("LIST.List")), SortCategory::List);
        assert_eq!(SortCategory::from_hook(Some("STRING.String")), SortCategory::Symbol);
        assert!(SortCategory::Set.is_collection());
        assert!(!SortCategory::Bool.is_collection());
    }

    #[test]
    fn test_function_symbols_filter() {
        let def = Definition::from_toml(SMALL).unwrap();
        let names: Vec<&str> = def.function_symbols().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Lbl'Plus'Int{}"]);
    }

    #[test]
    fn test_rejects_gap_in_tags() {
        let err = Definition::from_toml(
            r#"
[[symbol]]
tag = 0
name = "a"
sort = "S"

[[symbol]]
tag = 2
name = "b"
sort = "S"
"#,
        )
        .unwrap_err();
        assert!(err.contains("contiguous"), "{}", err);
    }

    #[test]
    fn test_rejects_duplicate_tag() {
        let err = Definition::from_toml(
            r#"
[[symbol]]
tag = 0
name = "a"
sort = "S"

[[symbol]]
tag = 0
name = "b"
sort = "S"
"#,
        )
        .unwrap_err();
        assert!(err.contains("more than one symbol"), "{}", err);
    }

    #[test]
    fn test_rejects_duplicate_symbol_name() {
        let err = Definition::from_toml(
            r#"
[[symbol]]
tag = 0
name = "a"
sort = "S"

[[symbol]]
tag = 1
name = "a"
sort = "S"
"#,
        )
        .unwrap_err();
        assert!(err.contains("declared more than once"), "{}", err);
    }

    #[test]
    fn test_rejects_duplicate_sort() {
        let err = Definition::new(
            vec![SortDeclaration::new("S"), SortDeclaration::new("S")],
            vec![],
        )
        .unwrap_err();
        assert!(err.contains("Sort 'S'"), "{}", err);
    }

    #[test]
    fn test_empty_definition_is_valid() {
        let def = Definition::from_toml("").unwrap();
        assert_eq!(def.symbol_count(), 0);
        assert_eq!(def.sort_declarations().count(), 0);
    }

    #[test]
    fn test_malformed_toml_is_reported() {
        let err = Definition::from_toml("[[symbol]]\ntag = \"zero\"").unwrap_err();
        assert!(err.starts_with("Failed to parse definition"), "{}", err);
    }

    #[test]
    fn test_collection_attributes() {
        let def = Definition::from_toml(
            r#"
[[sort]]
name = "SortSet{}"
hook = "SET.Set"
unit = "Lbl'Stop'Set{}"
element = "LblSetItem{}"
concat = "Lbl'Unds'Set'Unds'{}"
"#,
        )
        .unwrap();
        let decl = def.sort_declarations().next().unwrap();
        assert_eq!(decl.category(), SortCategory::Set);
        assert_eq!(decl.element.as_deref(), Some("LblSetItem{}"));
    }
}

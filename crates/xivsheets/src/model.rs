//! Field mapping between logical model fields and wire field specifiers.
//!
//! A [`Model`] declares its sheet and a static [`FieldDescriptor`] table.
//! That table drives both directions of the exchange: it expands into the
//! `fields=` specifier list sent with each request, and it reshapes the
//! nested JSON that comes back into the flat logical names the model
//! deserializes from.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde::Deserialize;
//! use xivsheets::{FieldDescriptor, FieldMapping, Language, LocalizedText, Model};
//!
//! #[derive(Debug, Deserialize)]
//! struct Item {
//!     row_id: u32,
//!     name: LocalizedText,
//!     level: u32,
//! }
//!
//! impl Model for Item {
//!     const SHEET: &'static str = "Item";
//!     const FIELDS: &'static [FieldDescriptor] = &[
//!         FieldDescriptor::aliased("row_id", "row_id"),
//!         FieldDescriptor::mapped(
//!             "name",
//!             FieldMapping::Localized { base: "Name", languages: &Language::ALL },
//!         ),
//!         FieldDescriptor::aliased("level", "LevelItem"),
//!     ];
//! }
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{Result, XivError};

// ============================================================================
// Languages and localized text
// ============================================================================

/// Game data language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    En,
    De,
    Fr,
    Ja,
}

impl Language {
    /// Every language the service localizes, declaration order.
    pub const ALL: [Language; 4] = [Language::En, Language::De, Language::Fr, Language::Ja];

    /// Two-letter wire code used in `@lang()` specifiers.
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::De => "de",
            Language::Fr => "fr",
            Language::Ja => "ja",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Per-language text collected from `@lang()` specifiers.
///
/// Languages the request never asked for, or the service left out, stay
/// `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    #[serde(default)]
    pub en: Option<String>,
    #[serde(default)]
    pub de: Option<String>,
    #[serde(default)]
    pub fr: Option<String>,
    #[serde(default)]
    pub ja: Option<String>,
}

impl LocalizedText {
    pub fn get(&self, lang: Language) -> Option<&str> {
        match lang {
            Language::En => self.en.as_deref(),
            Language::De => self.de.as_deref(),
            Language::Fr => self.fr.as_deref(),
            Language::Ja => self.ja.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.en.is_none() && self.de.is_none() && self.fr.is_none() && self.ja.is_none()
    }
}

// ============================================================================
// Field descriptors
// ============================================================================

/// How one logical field travels on the wire.
///
/// Variants are mutually exclusive; a field carries at most one mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMapping {
    /// One `base@lang(code)` specifier per language, decoded into a
    /// [`LocalizedText`].
    Localized {
        base: &'static str,
        languages: &'static [Language],
    },
    /// `base@as(raw)`: the column's stored value, untransformed.
    Raw { base: &'static str },
    /// `base@as(html)`: formatted rich text.
    Html { base: &'static str },
    /// Literal specifier passed through verbatim.
    Custom { spec: &'static str },
    /// Dotted path walked through nested row-reference containers.
    Nested { path: &'static str },
}

impl FieldMapping {
    fn push_specs(&self, out: &mut Vec<String>) {
        match self {
            FieldMapping::Localized { base, languages } => {
                for lang in *languages {
                    out.push(format!("{}@lang({})", base, lang.code()));
                }
            }
            FieldMapping::Raw { base } => out.push(format!("{}@as(raw)", base)),
            FieldMapping::Html { base } => out.push(format!("{}@as(html)", base)),
            FieldMapping::Custom { spec } => out.push((*spec).to_owned()),
            FieldMapping::Nested { path } => out.push((*path).to_owned()),
        }
    }
}

/// One logical model field and its wire translation.
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    /// Logical name, as the model struct spells it.
    pub name: &'static str,
    /// Wire specifier override for fields without a mapping.
    pub alias: Option<&'static str>,
    pub mapping: Option<FieldMapping>,
}

impl FieldDescriptor {
    /// Unmapped field; the wire specifier is the name with its first
    /// letter upper-cased (`level` asks for `Level`).
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            alias: None,
            mapping: None,
        }
    }

    /// Unmapped field with an explicit wire specifier.
    pub const fn aliased(name: &'static str, alias: &'static str) -> Self {
        Self {
            name,
            alias: Some(alias),
            mapping: None,
        }
    }

    /// Field with a [`FieldMapping`].
    pub const fn mapped(name: &'static str, mapping: FieldMapping) -> Self {
        Self {
            name,
            alias: None,
            mapping: Some(mapping),
        }
    }

    /// Wire specifier used when no mapping is declared.
    pub fn wire_specifier(&self) -> String {
        match self.alias {
            Some(alias) => alias.to_owned(),
            None => capitalize_first(self.name),
        }
    }
}

fn capitalize_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Model trait
// ============================================================================

/// A typed view over one sheet's rows.
///
/// Everything the client needs is declared statically: the sheet name and
/// the descriptor table. Deserialization happens against the reshaped,
/// flat logical names, so the struct needs no serde renames of its own.
pub trait Model: DeserializeOwned {
    /// Sheet this model reads from.
    const SHEET: &'static str;

    /// Logical fields and their wire translations, request order.
    const FIELDS: &'static [FieldDescriptor];
}

/// Wire field specifiers for a model: descriptor order, duplicates removed
/// (first occurrence wins).
pub fn field_specifiers<M: Model>() -> Vec<String> {
    specifiers_from(M::FIELDS)
}

pub(crate) fn specifiers_from(fields: &[FieldDescriptor]) -> Vec<String> {
    let mut all = Vec::new();
    for desc in fields {
        match desc.mapping {
            Some(mapping) => mapping.push_specs(&mut all),
            None => all.push(desc.wire_specifier()),
        }
    }
    let mut specs: Vec<String> = Vec::with_capacity(all.len());
    for spec in all {
        if !specs.contains(&spec) {
            specs.push(spec);
        }
    }
    specs
}

// ============================================================================
// Row flattening and reshaping
// ============================================================================

/// Merge a row envelope's `fields` object with its `row_id` at top level.
///
/// `None` is the malformed signal: an envelope without a numeric `row_id`
/// cannot be addressed and is treated as absent.
pub fn flatten_row(envelope: Value) -> Option<Map<String, Value>> {
    let Value::Object(mut obj) = envelope else {
        return None;
    };
    let row_id = obj.remove("row_id")?;
    if !row_id.is_u64() {
        return None;
    }
    let mut flat = match obj.remove("fields") {
        Some(Value::Object(fields)) => fields,
        _ => Map::new(),
    };
    flat.insert("row_id".to_owned(), row_id);
    Some(flat)
}

/// Reshape a flattened row into the model's logical names and deserialize.
pub fn decode_row<M: Model>(flat: Map<String, Value>) -> Result<M> {
    let raw = Value::Object(reshape(M::FIELDS, flat));
    M::deserialize(&raw).map_err(|source| XivError::ModelValidation {
        model: std::any::type_name::<M>(),
        source,
        raw,
    })
}

fn reshape(fields: &[FieldDescriptor], mut flat: Map<String, Value>) -> Map<String, Value> {
    for desc in fields {
        match desc.mapping {
            Some(FieldMapping::Localized { base, languages }) => {
                let mut langs = Map::new();
                for lang in languages {
                    let key = format!("{}@lang({})", base, lang.code());
                    if let Some(value) = flat.remove(&key) {
                        langs.insert(lang.code().to_owned(), value);
                    }
                }
                if !langs.is_empty() {
                    flat.insert(desc.name.to_owned(), Value::Object(langs));
                }
            }
            Some(FieldMapping::Raw { base }) => {
                rename_key(&mut flat, &format!("{}@as(raw)", base), desc.name);
            }
            Some(FieldMapping::Html { base }) => {
                rename_key(&mut flat, &format!("{}@as(html)", base), desc.name);
            }
            Some(FieldMapping::Custom { spec }) => {
                rename_key(&mut flat, spec, desc.name);
            }
            Some(FieldMapping::Nested { path }) => {
                if let Some(value) = extract_nested(&mut flat, path) {
                    flat.insert(desc.name.to_owned(), value);
                }
            }
            None => {
                rename_key(&mut flat, &desc.wire_specifier(), desc.name);
            }
        }
    }
    flat
}

fn rename_key(flat: &mut Map<String, Value>, from: &str, to: &str) {
    if from == to {
        return;
    }
    if let Some(value) = flat.remove(from) {
        flat.insert(to.to_owned(), value);
    }
}

/// Walk a dotted path through nested row references.
///
/// Row references carry their own columns under a `fields` object, so each
/// intermediate segment descends into one when present. A scalar midway
/// yields absent; a container at the final segment is returned whole.
fn extract_nested(flat: &mut Map<String, Value>, path: &str) -> Option<Value> {
    let parts: Vec<&str> = path.split('.').collect();
    let (&first, rest) = parts.split_first()?;
    let mut value = flat.remove(first)?;
    for &part in rest {
        let Value::Object(mut obj) = value else {
            return None;
        };
        let mut container = match obj.remove("fields") {
            Some(Value::Object(fields)) => fields,
            Some(_) => return None,
            None => obj,
        };
        value = container.remove(part)?;
    }
    Some(value)
}

// ============================================================================
// Model sets
// ============================================================================

/// A set of models one search fans out over.
///
/// Implemented for every single [`Model`] and for the [`Either2`] /
/// [`Either3`] unions. Each hit dispatches on its sheet name; a hit from a
/// sheet outside the set decodes to `None` and is skipped.
pub trait ModelSet: Sized {
    /// Sheet names, declaration order.
    fn sheet_names() -> Vec<&'static str>;

    /// Wire specifier union across the set, deduped.
    fn field_specifiers() -> Vec<String>;

    /// Decode a flattened hit from `sheet`, or `None` if the sheet is not
    /// part of this set.
    fn decode_sheet_row(sheet: &str, flat: Map<String, Value>) -> Option<Result<Self>>;
}

impl<M: Model> ModelSet for M {
    fn sheet_names() -> Vec<&'static str> {
        vec![M::SHEET]
    }

    fn field_specifiers() -> Vec<String> {
        specifiers_from(M::FIELDS)
    }

    fn decode_sheet_row(sheet: &str, flat: Map<String, Value>) -> Option<Result<Self>> {
        (sheet == M::SHEET).then(|| decode_row::<M>(flat))
    }
}

/// Tagged result for a search spanning two sheets.
#[derive(Debug, Clone, PartialEq)]
pub enum Either2<A, B> {
    A(A),
    B(B),
}

impl<A: Model, B: Model> ModelSet for Either2<A, B> {
    fn sheet_names() -> Vec<&'static str> {
        vec![A::SHEET, B::SHEET]
    }

    fn field_specifiers() -> Vec<String> {
        merge_specs(vec![specifiers_from(A::FIELDS), specifiers_from(B::FIELDS)])
    }

    fn decode_sheet_row(sheet: &str, flat: Map<String, Value>) -> Option<Result<Self>> {
        if sheet == A::SHEET {
            Some(decode_row::<A>(flat).map(Either2::A))
        } else if sheet == B::SHEET {
            Some(decode_row::<B>(flat).map(Either2::B))
        } else {
            None
        }
    }
}

/// Tagged result for a search spanning three sheets.
#[derive(Debug, Clone, PartialEq)]
pub enum Either3<A, B, C> {
    A(A),
    B(B),
    C(C),
}

impl<A: Model, B: Model, C: Model> ModelSet for Either3<A, B, C> {
    fn sheet_names() -> Vec<&'static str> {
        vec![A::SHEET, B::SHEET, C::SHEET]
    }

    fn field_specifiers() -> Vec<String> {
        merge_specs(vec![
            specifiers_from(A::FIELDS),
            specifiers_from(B::FIELDS),
            specifiers_from(C::FIELDS),
        ])
    }

    fn decode_sheet_row(sheet: &str, flat: Map<String, Value>) -> Option<Result<Self>> {
        if sheet == A::SHEET {
            Some(decode_row::<A>(flat).map(Either3::A))
        } else if sheet == B::SHEET {
            Some(decode_row::<B>(flat).map(Either3::B))
        } else if sheet == C::SHEET {
            Some(decode_row::<C>(flat).map(Either3::C))
        } else {
            None
        }
    }
}

fn merge_specs(lists: Vec<Vec<String>>) -> Vec<String> {
    let mut specs = Vec::new();
    for list in lists {
        for spec in list {
            if !specs.contains(&spec) {
                specs.push(spec);
            }
        }
    }
    specs
}

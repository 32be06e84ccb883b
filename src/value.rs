//! Built-in parameter value adapters and the type dispatch table.
//!
//! Every bound leaf is seen by the rest of the crate through [`ParamValue`]:
//! a string-settable, string-renderable view of one schema field. This module
//! provides the implementations for the built-in semantic types (mirroring
//! the dispatch table a flag library would carry) and the adapters that turn
//! user extension types into the same shape.
//!
//! Dispatch precedence is fixed: a [`TypeRegistry`](crate::TypeRegistry)
//! entry wins over everything; then built-ins; extension capabilities and
//! record recursion are selected explicitly at the walker call site (see
//! [`Walker`](crate::Walker)); anything else is an unsupported-type schema
//! error.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Display;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use ipnet::IpNet;
use thiserror::Error;

use crate::error::SchemaError;
use crate::tags::{Encoding, ResolvedField};

/// A textual value failed to parse into a parameter's type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValueError(String);

impl ValueError {
    pub fn new(message: impl Display) -> Self {
        Self(message.to_string())
    }
}

/// String-settable view of a bound parameter.
///
/// Implement this on your own types to bind them directly (the walker's
/// `field_with` entry point); every built-in type is adapted to it
/// internally. `set_text` parses and stores, `text` renders the current
/// value, and `type_name` is the short value-type label shown in help.
pub trait ParamValue {
    fn set_text(&mut self, text: &str) -> Result<(), ValueError>;
    fn text(&self) -> String;
    fn type_name(&self) -> String;
}

impl<V: ParamValue + ?Sized> ParamValue for &mut V {
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        (**self).set_text(text)
    }

    fn text(&self) -> String {
        (**self).text()
    }

    fn type_name(&self) -> String {
        (**self).type_name()
    }
}

/// Display-type-name capability for `FromStr + Display` extension types.
///
/// Implementing this marks a text-codec type as intentionally bindable (the
/// walker's `field_text` entry point) and provides the value-type label for
/// help text. Without the marker, a type that merely happens to parse from a
/// string cannot become a parameter by accident.
pub trait TypeDesc {
    fn type_desc() -> &'static str;
}

/// How a parameter accepts input, for the CLI adapter's benefit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// One value per assignment (`--port 80`).
    Singular,
    /// Presence toggles true; an explicit `--flag=false` is allowed.
    Switch,
    /// Each bare occurrence increments (`-vvv`).
    Count,
    /// May be given several times; each occurrence feeds one `set_text`.
    Repeat,
}

/// A dispatched leaf: the erased value plus its input shape.
pub(crate) struct Leaf<'a> {
    pub value: Box<dyn ParamValue + 'a>,
    pub arity: Arity,
}

impl std::fmt::Debug for Leaf<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Leaf")
            .field("type_name", &self.value.type_name())
            .field("text", &self.value.text())
            .field("arity", &self.arity)
            .finish()
    }
}

impl<'a> Leaf<'a> {
    pub(crate) fn singular(value: impl ParamValue + 'a) -> Self {
        Self {
            value: Box::new(value),
            arity: Arity::Singular,
        }
    }
}

// --- Built-in adapters ------------------------------------------------------

/// Lenient boolean: accepts true/false, t/f, and 1/0, case-insensitively.
struct BoolValue<'a>(&'a mut bool);

impl ParamValue for BoolValue<'_> {
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        *self.0 = parse_bool(text)?;
        Ok(())
    }

    fn text(&self) -> String {
        self.0.to_string()
    }

    fn type_name(&self) -> String {
        "bool".to_string()
    }
}

fn parse_bool(text: &str) -> Result<bool, ValueError> {
    if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("t") || text == "1" {
        Ok(true)
    } else if text.eq_ignore_ascii_case("false") || text.eq_ignore_ascii_case("f") || text == "0" {
        Ok(false)
    } else {
        Err(ValueError::new(format!("invalid boolean value {text:?}")))
    }
}

/// Any `FromStr + Display` scalar with a fixed type label.
struct ScalarValue<'a, T: FromStr + Display> {
    target: &'a mut T,
    name: &'static str,
}

impl<T> ParamValue for ScalarValue<'_, T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        *self.target = text.parse().map_err(ValueError::new)?;
        Ok(())
    }

    fn text(&self) -> String {
        self.target.to_string()
    }

    fn type_name(&self) -> String {
        self.name.to_string()
    }
}

/// Integer types that can act as occurrence counters.
trait Countable {
    fn bump(&mut self);
}

macro_rules! countable {
    ($($ty:ty),+) => {
        $(impl Countable for $ty {
            fn bump(&mut self) {
                *self = self.wrapping_add(1);
            }
        })+
    };
}

countable!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Occurrence counter. A bare occurrence (empty text or `+1`) increments;
/// an explicit numeric value replaces the count.
struct CountValue<'a, T: Countable + FromStr + Display> {
    target: &'a mut T,
}

impl<T> ParamValue for CountValue<'_, T>
where
    T: Countable + FromStr + Display,
    T::Err: Display,
{
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        if text.is_empty() || text == "+1" {
            self.target.bump();
        } else {
            *self.target = text.parse().map_err(ValueError::new)?;
        }
        Ok(())
    }

    fn text(&self) -> String {
        self.target.to_string()
    }

    fn type_name(&self) -> String {
        "count".to_string()
    }
}

/// Comma-joined list. The first assignment replaces the compiled default,
/// later assignments append, so repeated flags accumulate while a single
/// environment string replaces.
struct ListValue<'a, T: FromStr + Display> {
    target: &'a mut Vec<T>,
    name: &'static str,
    replaced: bool,
}

impl<T> ParamValue for ListValue<'_, T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        let mut items = Vec::new();
        for part in text.split(',').filter(|p| !p.is_empty()) {
            items.push(part.parse::<T>().map_err(ValueError::new)?);
        }
        if !self.replaced {
            self.target.clear();
            self.replaced = true;
        }
        self.target.extend(items);
        Ok(())
    }

    fn text(&self) -> String {
        self.target
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    fn type_name(&self) -> String {
        self.name.to_string()
    }
}

/// Verbatim string list: each assignment is one element, commas included.
struct RawListValue<'a> {
    target: &'a mut Vec<String>,
    replaced: bool,
}

impl ParamValue for RawListValue<'_> {
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        if !self.replaced {
            self.target.clear();
            self.replaced = true;
        }
        self.target.push(text.to_string());
        Ok(())
    }

    fn text(&self) -> String {
        self.target.join(",")
    }

    fn type_name(&self) -> String {
        "stringArray".to_string()
    }
}

/// Byte sequence with a hex or base64 text form.
struct BytesValue<'a> {
    target: &'a mut Vec<u8>,
    encoding: Encoding,
}

impl ParamValue for BytesValue<'_> {
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        *self.target = match self.encoding {
            Encoding::Hex => hex::decode(text).map_err(ValueError::new)?,
            _ => BASE64.decode(text).map_err(ValueError::new)?,
        };
        Ok(())
    }

    fn text(&self) -> String {
        match self.encoding {
            Encoding::Hex => hex::encode(&self.target),
            _ => BASE64.encode(&self.target),
        }
    }

    fn type_name(&self) -> String {
        match self.encoding {
            Encoding::Hex => "bytesHex".to_string(),
            _ => "bytesBase64".to_string(),
        }
    }
}

/// String-keyed map, written as `key=value,key=value`. The first assignment
/// replaces the compiled default, later assignments merge.
struct MapValue<'a, V: FromStr + Display> {
    target: &'a mut HashMap<String, V>,
    name: &'static str,
    replaced: bool,
}

impl<V> ParamValue for MapValue<'_, V>
where
    V: FromStr + Display,
    V::Err: Display,
{
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        let mut entries = Vec::new();
        for part in text.split(',').filter(|p| !p.is_empty()) {
            let Some((key, value)) = part.split_once('=') else {
                return Err(ValueError::new(format!("expected key=value, got {part:?}")));
            };
            entries.push((key.to_string(), value.parse::<V>().map_err(ValueError::new)?));
        }
        if !self.replaced {
            self.target.clear();
            self.replaced = true;
        }
        self.target.extend(entries);
        Ok(())
    }

    fn text(&self) -> String {
        let mut pairs: Vec<String> = self
            .target
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        pairs.sort();
        pairs.join(",")
    }

    fn type_name(&self) -> String {
        self.name.to_string()
    }
}

/// `Duration` in humantime notation (`1h30m`, `250ms`).
struct DurationValue<'a>(&'a mut Duration);

impl ParamValue for DurationValue<'_> {
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        *self.0 = humantime::parse_duration(text).map_err(ValueError::new)?;
        Ok(())
    }

    fn text(&self) -> String {
        humantime::format_duration(*self.0).to_string()
    }

    fn type_name(&self) -> String {
        "duration".to_string()
    }
}

/// Comma-joined list of humantime durations.
struct DurationListValue<'a> {
    target: &'a mut Vec<Duration>,
    replaced: bool,
}

impl ParamValue for DurationListValue<'_> {
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        let mut items = Vec::new();
        for part in text.split(',').filter(|p| !p.is_empty()) {
            items.push(humantime::parse_duration(part).map_err(ValueError::new)?);
        }
        if !self.replaced {
            self.target.clear();
            self.replaced = true;
        }
        self.target.extend(items);
        Ok(())
    }

    fn text(&self) -> String {
        self.target
            .iter()
            .map(|d| humantime::format_duration(*d).to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn type_name(&self) -> String {
        "durationSlice".to_string()
    }
}

/// Adapter for `FromStr + Display + TypeDesc` extension types.
pub(crate) struct TextValue<'a, T: FromStr + Display + TypeDesc>(pub(crate) &'a mut T);

impl<T> ParamValue for TextValue<'_, T>
where
    T: FromStr + Display + TypeDesc,
    T::Err: Display,
{
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        *self.0 = text.parse().map_err(ValueError::new)?;
        Ok(())
    }

    fn text(&self) -> String {
        self.0.to_string()
    }

    fn type_name(&self) -> String {
        T::type_desc().to_string()
    }
}

// --- Dispatch ---------------------------------------------------------------

fn reject_encoding(f: &ResolvedField) -> Result<(), SchemaError> {
    match f.encoding {
        None => Ok(()),
        Some(enc) => Err(SchemaError::BadEncoding {
            name: f.name.clone(),
            expected: "no encoding",
            got: enc.as_str(),
        }),
    }
}

fn require_no_env(f: &ResolvedField, encoding: &'static str) -> Result<(), SchemaError> {
    if f.env.is_some() {
        return Err(SchemaError::EncodingNeedsNoEnv {
            name: f.name.clone(),
            encoding,
        });
    }
    Ok(())
}

fn int_leaf<'a, T>(
    f: &ResolvedField,
    target: &'a mut T,
    name: &'static str,
) -> Result<Leaf<'a>, SchemaError>
where
    T: Countable + FromStr + Display,
    T::Err: Display,
{
    match f.encoding {
        None => Ok(Leaf::singular(ScalarValue { target, name })),
        Some(Encoding::Count) => {
            require_no_env(f, "count")?;
            Ok(Leaf {
                value: Box::new(CountValue { target }),
                arity: Arity::Count,
            })
        }
        Some(enc) => Err(SchemaError::BadEncoding {
            name: f.name.clone(),
            expected: "no encoding or encoding \"count\"",
            got: enc.as_str(),
        }),
    }
}

fn list_leaf<'a, T>(
    f: &ResolvedField,
    target: &'a mut Vec<T>,
    name: &'static str,
) -> Result<Leaf<'a>, SchemaError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    reject_encoding(f)?;
    Ok(Leaf {
        value: Box::new(ListValue {
            target,
            name,
            replaced: false,
        }),
        arity: Arity::Repeat,
    })
}

fn string_list_leaf<'a>(
    f: &ResolvedField,
    target: &'a mut Vec<String>,
) -> Result<Leaf<'a>, SchemaError> {
    match f.encoding {
        None | Some(Encoding::Csv) => Ok(Leaf {
            value: Box::new(ListValue {
                target,
                name: "strings",
                replaced: false,
            }),
            arity: Arity::Repeat,
        }),
        Some(Encoding::Raw) => {
            require_no_env(f, "raw")?;
            Ok(Leaf {
                value: Box::new(RawListValue {
                    target,
                    replaced: false,
                }),
                arity: Arity::Repeat,
            })
        }
        Some(enc) => Err(SchemaError::BadEncoding {
            name: f.name.clone(),
            expected: "no encoding or encoding \"csv\" or \"raw\"",
            got: enc.as_str(),
        }),
    }
}

fn bytes_leaf<'a>(f: &ResolvedField, target: &'a mut Vec<u8>) -> Result<Leaf<'a>, SchemaError> {
    match f.encoding {
        Some(encoding @ (Encoding::Hex | Encoding::Base64)) => {
            Ok(Leaf::singular(BytesValue { target, encoding }))
        }
        other => Err(SchemaError::BadEncoding {
            name: f.name.clone(),
            expected: "encoding \"hex\" or \"base64\"",
            got: other.map_or("none", Encoding::as_str),
        }),
    }
}

fn map_leaf<'a, V>(
    f: &ResolvedField,
    target: &'a mut HashMap<String, V>,
    name: &'static str,
) -> Result<Leaf<'a>, SchemaError>
where
    V: FromStr + Display,
    V::Err: Display,
{
    reject_encoding(f)?;
    Ok(Leaf {
        value: Box::new(MapValue {
            target,
            name,
            replaced: false,
        }),
        arity: Arity::Repeat,
    })
}

fn downcast<'a, T: Any>(value: &'a mut dyn Any) -> &'a mut T {
    value
        .downcast_mut::<T>()
        .expect("type id was checked before downcast")
}

/// Match a field against the built-in dispatch table. `Ok(None)` means the
/// type has no built-in binding; encoding violations are schema errors.
pub(crate) fn builtin_leaf<'a>(
    f: &ResolvedField,
    value: &'a mut dyn Any,
) -> Result<Option<Leaf<'a>>, SchemaError> {
    let id = (*value).type_id();

    if id == TypeId::of::<bool>() {
        reject_encoding(f)?;
        return Ok(Some(Leaf {
            value: Box::new(BoolValue(downcast(value))),
            arity: Arity::Switch,
        }));
    }

    macro_rules! int_family {
        ($($ty:ty => $name:literal),+ $(,)?) => {
            $(if id == TypeId::of::<$ty>() {
                return int_leaf(f, downcast::<$ty>(value), $name).map(Some);
            })+
        };
    }
    int_family! {
        i8 => "int8", i16 => "int16", i32 => "int32", i64 => "int64", isize => "int",
        u8 => "uint8", u16 => "uint16", u32 => "uint32", u64 => "uint64", usize => "uint",
    }

    macro_rules! scalar_family {
        ($($ty:ty => $name:literal),+ $(,)?) => {
            $(if id == TypeId::of::<$ty>() {
                reject_encoding(f)?;
                return Ok(Some(Leaf::singular(ScalarValue {
                    target: downcast::<$ty>(value),
                    name: $name,
                })));
            })+
        };
    }
    scalar_family! {
        f32 => "float32", f64 => "float64", String => "string",
        IpAddr => "ip", Ipv4Addr => "ipv4", Ipv6Addr => "ipv6",
        SocketAddr => "socketAddr", IpNet => "ipNet",
    }

    if id == TypeId::of::<Vec<u8>>() {
        return bytes_leaf(f, downcast(value)).map(Some);
    }
    if id == TypeId::of::<Vec<String>>() {
        return string_list_leaf(f, downcast(value)).map(Some);
    }

    macro_rules! list_family {
        ($($ty:ty => $name:literal),+ $(,)?) => {
            $(if id == TypeId::of::<Vec<$ty>>() {
                return list_leaf(f, downcast::<Vec<$ty>>(value), $name).map(Some);
            })+
        };
    }
    list_family! {
        bool => "boolSlice", i32 => "int32Slice", i64 => "int64Slice",
        u32 => "uint32Slice", u64 => "uint64Slice", usize => "uintSlice",
        f32 => "float32Slice", f64 => "float64Slice",
    }

    macro_rules! map_family {
        ($($ty:ty => $name:literal),+ $(,)?) => {
            $(if id == TypeId::of::<HashMap<String, $ty>>() {
                return map_leaf(f, downcast::<HashMap<String, $ty>>(value), $name).map(Some);
            })+
        };
    }
    map_family! {
        String => "stringToString", i64 => "stringToInt64", u64 => "stringToUint64",
    }

    if id == TypeId::of::<Duration>() {
        reject_encoding(f)?;
        return Ok(Some(Leaf::singular(DurationValue(downcast(value)))));
    }
    if id == TypeId::of::<Vec<Duration>>() {
        reject_encoding(f)?;
        return Ok(Some(Leaf {
            value: Box::new(DurationListValue {
                target: downcast(value),
                replaced: false,
            }),
            arity: Arity::Repeat,
        }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, encoding: Option<Encoding>, env: Option<&str>) -> ResolvedField {
        ResolvedField {
            name: name.to_string(),
            abbrev: None,
            env: env.map(str::to_string),
            usage: String::new(),
            opts: crate::tags::FieldOpts::default(),
            encoding,
        }
    }

    fn make_leaf<'a>(f: &ResolvedField, value: &'a mut dyn Any) -> Leaf<'a> {
        builtin_leaf(f, value).unwrap().unwrap()
    }

    #[test]
    fn bool_accepts_lenient_spellings() {
        let f = field("debug", None, None);
        let mut debug = false;
        let mut leaf = make_leaf(&f, &mut debug);
        assert_eq!(leaf.arity, Arity::Switch);
        for (text, want) in [("true", true), ("0", false), ("T", true), ("FALSE", false)] {
            leaf.value.set_text(text).unwrap();
            assert_eq!(leaf.value.text(), want.to_string());
        }
        assert!(leaf.value.set_text("yes").is_err());
        assert_eq!(leaf.value.type_name(), "bool");
    }

    #[test]
    fn integer_scalars_round_trip() {
        let f = field("port", None, None);
        let mut port: u16 = 8080;
        let mut leaf = make_leaf(&f, &mut port);
        assert_eq!(leaf.value.text(), "8080");
        leaf.value.set_text("443").unwrap();
        drop(leaf);
        assert_eq!(port, 443);
    }

    #[test]
    fn integer_parse_error_is_reported() {
        let f = field("port", None, None);
        let mut port: u16 = 0;
        let mut leaf = make_leaf(&f, &mut port);
        assert!(leaf.value.set_text("eighty").is_err());
    }

    #[test]
    fn count_increments_and_accepts_totals() {
        let f = field("verbose", Some(Encoding::Count), None);
        let mut verbose: u8 = 0;
        let mut leaf = make_leaf(&f, &mut verbose);
        assert_eq!(leaf.arity, Arity::Count);
        assert_eq!(leaf.value.type_name(), "count");
        leaf.value.set_text("").unwrap();
        leaf.value.set_text("+1").unwrap();
        assert_eq!(leaf.value.text(), "2");
        leaf.value.set_text("5").unwrap();
        drop(leaf);
        assert_eq!(verbose, 5);
    }

    #[test]
    fn count_with_env_is_a_schema_error() {
        let f = field("verbose", Some(Encoding::Count), Some("APP_VERBOSE"));
        let mut verbose: u8 = 0;
        let err = builtin_leaf(&f, &mut verbose).unwrap_err();
        assert!(err.to_string().contains("suppressed environment name"));
    }

    #[test]
    fn bad_int_encoding_is_a_schema_error() {
        let f = field("port", Some(Encoding::Hex), None);
        let mut port: u16 = 0;
        let err = builtin_leaf(&f, &mut port).unwrap_err();
        assert!(err.to_string().contains("got encoding \"hex\""));
    }

    #[test]
    fn csv_list_replaces_then_appends() {
        let f = field("tags", None, None);
        let mut tags = vec!["default".to_string()];
        let mut leaf = make_leaf(&f, &mut tags);
        assert_eq!(leaf.arity, Arity::Repeat);
        leaf.value.set_text("a,b").unwrap();
        leaf.value.set_text("c").unwrap();
        drop(leaf);
        assert_eq!(tags, ["a", "b", "c"]);
    }

    #[test]
    fn int_list_parses_each_element() {
        let f = field("shards", None, None);
        let mut shards: Vec<i64> = vec![];
        let mut leaf = make_leaf(&f, &mut shards);
        leaf.value.set_text("1,2,3").unwrap();
        assert_eq!(leaf.value.text(), "1,2,3");
        assert!(leaf.value.set_text("1,x").is_err());
        drop(leaf);
        assert_eq!(shards, [1, 2, 3]);
    }

    #[test]
    fn raw_list_keeps_commas() {
        let f = field("filters", Some(Encoding::Raw), None);
        let mut filters = vec!["default".to_string()];
        let mut leaf = make_leaf(&f, &mut filters);
        leaf.value.set_text("a,b").unwrap();
        leaf.value.set_text("c").unwrap();
        drop(leaf);
        assert_eq!(filters, ["a,b", "c"]);
    }

    #[test]
    fn raw_list_with_env_is_a_schema_error() {
        let f = field("filters", Some(Encoding::Raw), Some("APP_FILTERS"));
        let mut filters: Vec<String> = vec![];
        let err = builtin_leaf(&f, &mut filters).unwrap_err();
        assert!(err.to_string().contains("requires a suppressed environment name"));
    }

    #[test]
    fn string_list_rejects_foreign_encodings() {
        let f = field("tags", Some(Encoding::Hex), None);
        let mut tags: Vec<String> = vec![];
        let err = builtin_leaf(&f, &mut tags).unwrap_err();
        assert!(err.to_string().contains("\"csv\" or \"raw\""));
    }

    #[test]
    fn bytes_hex_round_trip() {
        let f = field("key", Some(Encoding::Hex), None);
        let mut key: Vec<u8> = vec![];
        let mut leaf = make_leaf(&f, &mut key);
        leaf.value.set_text("deadbeef").unwrap();
        assert_eq!(leaf.value.text(), "deadbeef");
        assert_eq!(leaf.value.type_name(), "bytesHex");
        assert!(leaf.value.set_text("zz").is_err());
        drop(leaf);
        assert_eq!(key, [0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn bytes_base64_round_trip() {
        let f = field("key", Some(Encoding::Base64), None);
        let mut key: Vec<u8> = vec![];
        let mut leaf = make_leaf(&f, &mut key);
        leaf.value.set_text("aGVsbG8=").unwrap();
        drop(leaf);
        assert_eq!(key, b"hello");
    }

    #[test]
    fn bytes_require_an_encoding() {
        let f = field("key", None, None);
        let mut key: Vec<u8> = vec![];
        let err = builtin_leaf(&f, &mut key).unwrap_err();
        assert!(err.to_string().contains("\"hex\" or \"base64\""));
        assert!(err.to_string().contains("\"none\""));
    }

    #[test]
    fn map_parses_and_renders_sorted() {
        let f = field("labels", None, None);
        let mut labels: HashMap<String, String> = HashMap::new();
        let mut leaf = make_leaf(&f, &mut labels);
        leaf.value.set_text("b=2,a=1").unwrap();
        assert_eq!(leaf.value.text(), "a=1,b=2");
        assert!(leaf.value.set_text("missing-separator").is_err());
        drop(leaf);
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn typed_map_values_parse() {
        let f = field("weights", None, None);
        let mut weights: HashMap<String, i64> = HashMap::new();
        let mut leaf = make_leaf(&f, &mut weights);
        leaf.value.set_text("a=1,b=2").unwrap();
        assert!(leaf.value.set_text("a=x").is_err());
        drop(leaf);
        assert_eq!(weights["b"], 2);
    }

    #[test]
    fn duration_uses_humantime() {
        let f = field("timeout", None, None);
        let mut timeout = Duration::from_secs(30);
        let mut leaf = make_leaf(&f, &mut timeout);
        assert_eq!(leaf.value.text(), "30s");
        leaf.value.set_text("1h 30m").unwrap();
        assert!(leaf.value.set_text("soon").is_err());
        drop(leaf);
        assert_eq!(timeout, Duration::from_secs(5400));
    }

    #[test]
    fn duration_list() {
        let f = field("retries", None, None);
        let mut retries: Vec<Duration> = vec![];
        let mut leaf = make_leaf(&f, &mut retries);
        leaf.value.set_text("1s,2s").unwrap();
        drop(leaf);
        assert_eq!(retries, [Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[test]
    fn ip_types_parse() {
        let f = field("bind", None, None);
        let mut addr: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let mut leaf = make_leaf(&f, &mut addr);
        leaf.value.set_text("10.0.0.1").unwrap();
        assert_eq!(leaf.value.type_name(), "ip");
        drop(leaf);
        assert_eq!(addr, "10.0.0.1".parse::<IpAddr>().unwrap());

        let f = field("subnet", None, None);
        let mut net: IpNet = "0.0.0.0/0".parse().unwrap();
        let mut leaf = make_leaf(&f, &mut net);
        leaf.value.set_text("10.0.0.0/8").unwrap();
        assert_eq!(leaf.value.text(), "10.0.0.0/8");
    }

    #[test]
    fn unknown_types_are_not_builtin() {
        struct Custom;
        let f = field("custom", None, None);
        let mut custom = Custom;
        assert!(builtin_leaf(&f, &mut custom).unwrap().is_none());
    }
}

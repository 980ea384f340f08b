//! Attribute Codecs - typed views over string attribute values.
//!
//! Every attribute slot is declared with an [`AttributeSpec`] and accessed
//! through the matching [`AttributeCodec`]:
//!
//! | Spec         | Codec        | Value         | Stored as                 |
//! |--------------|--------------|---------------|---------------------------|
//! | `Text`       | [`Text`]     | `String`      | as is                     |
//! | `Number`     | [`Number`]   | `f64`         | numeric text              |
//! | `Flag`       | [`Flag`]     | `bool`        | key presence (`key=key`)  |
//! | `TextList`   | [`TextList`] | `Vec<String>` | comma separated           |
//! | `NumberList` | [`NumberList`]| `Vec<f64>`   | comma separated numbers   |
//! | `Custom`     | [`Custom<T>`]| `T`           | author's encode/decode    |
//!
//! Decoding never fails. Malformed numbers decode to `NaN` and are
//! propagated; callers that need validation supply a custom codec.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

// =============================================================================
// CODEC TRAIT
// =============================================================================

/// Decode/encode rules for one attribute type.
pub trait AttributeCodec: Clone + 'static {
    type Value: Clone + 'static;

    /// Type name shared with [`AttributeSpec::kind`], used in mismatch errors.
    fn kind() -> &'static str;

    /// Decode the stored string. `raw` is `None` when the key is absent.
    fn decode(&self, raw: Option<&str>) -> Option<Self::Value>;

    /// Encode for storage. `None` (or an empty string) removes the key.
    fn encode(&self, key: &str, value: &Self::Value) -> Option<String>;

    /// Recover the codec from a declaration, if the declaration is of this type.
    fn from_spec(spec: &AttributeSpec) -> Option<Self>;
}

// =============================================================================
// DECLARATIONS
// =============================================================================

/// Declared type of an attribute slot.
#[derive(Clone)]
pub enum AttributeSpec {
    Text,
    Number,
    Flag,
    TextList,
    NumberList,
    Custom(CustomSpec),
}

impl AttributeSpec {
    pub fn custom<T: 'static>(codec: Custom<T>) -> Self {
        AttributeSpec::Custom(CustomSpec {
            type_name: std::any::type_name::<T>(),
            codec: Rc::new(codec),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AttributeSpec::Text => "string",
            AttributeSpec::Number => "number",
            AttributeSpec::Flag => "boolean",
            AttributeSpec::TextList => "string[]",
            AttributeSpec::NumberList => "number[]",
            AttributeSpec::Custom(custom) => custom.type_name,
        }
    }
}

impl fmt::Debug for AttributeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeSpec::Custom(custom) => write!(f, "Custom({})", custom.type_name),
            other => f.write_str(other.kind()),
        }
    }
}

impl<T: 'static> From<Custom<T>> for AttributeSpec {
    fn from(codec: Custom<T>) -> Self {
        AttributeSpec::custom(codec)
    }
}

/// Type-erased custom codec held by a declaration.
#[derive(Clone)]
pub struct CustomSpec {
    type_name: &'static str,
    codec: Rc<dyn Any>,
}

// =============================================================================
// LITERAL CODECS
// =============================================================================

/// Plain string, stored as is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Text;

impl AttributeCodec for Text {
    type Value = String;

    fn kind() -> &'static str {
        "string"
    }

    fn decode(&self, raw: Option<&str>) -> Option<String> {
        raw.map(str::to_string)
    }

    fn encode(&self, _key: &str, value: &String) -> Option<String> {
        Some(value.clone())
    }

    fn from_spec(spec: &AttributeSpec) -> Option<Self> {
        matches!(spec, AttributeSpec::Text).then_some(Text)
    }
}

/// Number parsed with host numeric-parse semantics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Number;

impl AttributeCodec for Number {
    type Value = f64;

    fn kind() -> &'static str {
        "number"
    }

    fn decode(&self, raw: Option<&str>) -> Option<f64> {
        raw.map(parse_number)
    }

    fn encode(&self, _key: &str, value: &f64) -> Option<String> {
        Some(format_number(*value))
    }

    fn from_spec(spec: &AttributeSpec) -> Option<Self> {
        matches!(spec, AttributeSpec::Number).then_some(Number)
    }
}

/// Boolean backed by key presence. Absent is `false`, never `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flag;

impl AttributeCodec for Flag {
    type Value = bool;

    fn kind() -> &'static str {
        "boolean"
    }

    fn decode(&self, raw: Option<&str>) -> Option<bool> {
        // Stored value is ignored.
        Some(raw.is_some())
    }

    fn encode(&self, key: &str, value: &bool) -> Option<String> {
        value.then(|| key.to_string())
    }

    fn from_spec(spec: &AttributeSpec) -> Option<Self> {
        matches!(spec, AttributeSpec::Flag).then_some(Flag)
    }
}

/// Comma-separated strings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextList;

impl AttributeCodec for TextList {
    type Value = Vec<String>;

    fn kind() -> &'static str {
        "string[]"
    }

    fn decode(&self, raw: Option<&str>) -> Option<Vec<String>> {
        raw.map(|s| s.split(',').map(str::to_string).collect())
    }

    fn encode(&self, _key: &str, value: &Vec<String>) -> Option<String> {
        Some(value.join(","))
    }

    fn from_spec(spec: &AttributeSpec) -> Option<Self> {
        matches!(spec, AttributeSpec::TextList).then_some(TextList)
    }
}

/// Comma-separated numbers, each parsed like [`Number`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NumberList;

impl AttributeCodec for NumberList {
    type Value = Vec<f64>;

    fn kind() -> &'static str {
        "number[]"
    }

    fn decode(&self, raw: Option<&str>) -> Option<Vec<f64>> {
        raw.map(|s| s.split(',').map(parse_number).collect())
    }

    fn encode(&self, _key: &str, value: &Vec<f64>) -> Option<String> {
        let parts: Vec<String> = value.iter().map(|n| format_number(*n)).collect();
        Some(parts.join(","))
    }

    fn from_spec(spec: &AttributeSpec) -> Option<Self> {
        matches!(spec, AttributeSpec::NumberList).then_some(NumberList)
    }
}

// =============================================================================
// CUSTOM CODEC
// =============================================================================

/// Author-supplied decode/encode pair.
///
/// ```ignore
/// let point = Custom::new(
///     |s: &str| {
///         let (x, y) = s.split_once(':')?;
///         Some((x.parse().ok()?, y.parse().ok()?))
///     },
///     |(x, y): &(i32, i32)| Some(format!("{x}:{y}")),
/// );
/// ```
pub struct Custom<T> {
    decode: Rc<dyn Fn(&str) -> Option<T>>,
    encode: Rc<dyn Fn(&T) -> Option<String>>,
}

impl<T> Custom<T> {
    pub fn new(
        decode: impl Fn(&str) -> Option<T> + 'static,
        encode: impl Fn(&T) -> Option<String> + 'static,
    ) -> Self {
        Self {
            decode: Rc::new(decode),
            encode: Rc::new(encode),
        }
    }
}

impl<T> Clone for Custom<T> {
    fn clone(&self) -> Self {
        Self {
            decode: self.decode.clone(),
            encode: self.encode.clone(),
        }
    }
}

impl<T: Clone + 'static> AttributeCodec for Custom<T> {
    type Value = T;

    fn kind() -> &'static str {
        std::any::type_name::<T>()
    }

    fn decode(&self, raw: Option<&str>) -> Option<T> {
        raw.and_then(|s| (self.decode)(s))
    }

    fn encode(&self, _key: &str, value: &T) -> Option<String> {
        (self.encode)(value)
    }

    fn from_spec(spec: &AttributeSpec) -> Option<Self> {
        match spec {
            AttributeSpec::Custom(custom) => custom.codec.downcast_ref::<Custom<T>>().cloned(),
            _ => None,
        }
    }
}

// =============================================================================
// NUMBERS
// =============================================================================

/// Parse a number the way the host does.
///
/// Surrounding whitespace is ignored, empty input is `0`, `Infinity` and
/// `0x`/`0o`/`0b` literals are accepted. Anything else malformed is `NaN`.
pub fn parse_number(raw: &str) -> f64 {
    let s = raw.trim();
    if s.is_empty() {
        return 0.0;
    }

    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = s.strip_prefix(prefix) {
            if digits.is_empty() {
                return f64::NAN;
            }
            // No sign inside the literal; wide literals lose precision, never overflow.
            return digits
                .chars()
                .try_fold(0.0_f64, |acc, c| {
                    c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
                })
                .unwrap_or(f64::NAN);
        }
    }

    // Rust's float parser also takes "inf" and "nan"; the host does not.
    let decimal = s
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));
    if !decimal {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

/// Format a number for storage. Integral values have no fraction.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n == 0.0 {
        // Covers -0.
        "0".to_string()
    } else {
        n.to_string()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), 42.0);
        assert_eq!(parse_number(" 4.5 "), 4.5);
        assert_eq!(parse_number(""), 0.0);
        assert_eq!(parse_number("-1e3"), -1000.0);
        assert_eq!(parse_number("0x10"), 16.0);
        assert_eq!(parse_number("0b101"), 5.0);
        assert_eq!(parse_number("-Infinity"), f64::NEG_INFINITY);
        assert!(parse_number("abc").is_nan());
        assert!(parse_number("inf").is_nan());
        assert!(parse_number("0x").is_nan());
        assert!(parse_number("1,2").is_nan());
    }

    #[test]
    fn test_parse_prefixed_literals() {
        assert_eq!(parse_number("0XfF"), 255.0);
        assert_eq!(parse_number("0o17"), 15.0);
        assert!(parse_number("0x+1").is_nan());
        assert!(parse_number("0x-1").is_nan());
        assert!(parse_number("0b102").is_nan());
        // Wider than 64 bits stays finite.
        assert_eq!(parse_number("0x10000000000000000"), 18_446_744_073_709_551_616.0);
    }

    #[test]
    fn test_codec_kind_matches_declaration() {
        assert_eq!(Text::kind(), AttributeSpec::Text.kind());
        assert_eq!(Number::kind(), AttributeSpec::Number.kind());
        assert_eq!(Flag::kind(), AttributeSpec::Flag.kind());
        assert_eq!(TextList::kind(), AttributeSpec::TextList.kind());
        assert_eq!(NumberList::kind(), AttributeSpec::NumberList.kind());

        let spec = AttributeSpec::custom(Custom::new(
            |s: &str| s.parse::<u8>().ok(),
            |v: &u8| Some(v.to_string()),
        ));
        assert_eq!(Custom::<u8>::kind(), spec.kind());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
    }

    #[test]
    fn test_flag_codec() {
        assert_eq!(Flag.decode(None), Some(false));
        assert_eq!(Flag.decode(Some("")), Some(true));
        assert_eq!(Flag.decode(Some("false")), Some(true));
        assert_eq!(Flag.encode("open", &true).as_deref(), Some("open"));
        assert_eq!(Flag.encode("open", &false), None);
    }

    #[test]
    fn test_absent_is_none_for_non_flags() {
        assert_eq!(Text.decode(None), None);
        assert_eq!(Number.decode(None), None);
        assert_eq!(TextList.decode(None), None);
        assert_eq!(NumberList.decode(None), None);
    }

    #[test]
    fn test_lists() {
        assert_eq!(NumberList.encode("bar", &vec![4.0, 20.0]).as_deref(), Some("4,20"));
        assert_eq!(NumberList.decode(Some("4,20")), Some(vec![4.0, 20.0]));
        assert_eq!(
            TextList.decode(Some("a,,b")),
            Some(vec!["a".to_string(), String::new(), "b".to_string()])
        );
        let degraded = NumberList.decode(Some("1,x")).unwrap_or_default();
        assert_eq!(degraded[0], 1.0);
        assert!(degraded[1].is_nan());
    }

    #[test]
    fn test_spec_matching() {
        assert!(Text::from_spec(&AttributeSpec::Text).is_some());
        assert!(Text::from_spec(&AttributeSpec::Number).is_none());
        assert!(Flag::from_spec(&AttributeSpec::Flag).is_some());

        let spec = AttributeSpec::custom(Custom::new(
            |s: &str| s.parse::<u8>().ok(),
            |v: &u8| Some(v.to_string()),
        ));
        assert!(Custom::<u8>::from_spec(&spec).is_some());
        assert!(Custom::<u16>::from_spec(&spec).is_none());
        assert_eq!(spec.kind(), "u8");
    }

    proptest! {
        #[test]
        fn number_list_survives_storage(values in prop::collection::vec(-1.0e9f64..1.0e9, 1..8)) {
            let stored = NumberList.encode("n", &values).unwrap_or_default();
            prop_assert_eq!(NumberList.decode(Some(&stored)), Some(values));
        }

        #[test]
        fn text_list_without_commas_survives_storage(values in prop::collection::vec("[a-z ]{0,6}", 1..6)) {
            let stored = TextList.encode("t", &values).unwrap_or_default();
            prop_assert_eq!(TextList.decode(Some(&stored)), Some(values));
        }
    }
}

//! Built-in resolvers.
//!
//! | aliases | result |
//! |---|---|
//! | `string`, `String`, `java.lang.String` | [`TypedValue::String`] |
//! | `int`, `Integer`, `java.lang.Integer` | [`TypedValue::Integer`] |
//! | `int64`, `long`, `Long`, `java.lang.Long` | [`TypedValue::Long`] |
//! | `float`, `Float`, `java.lang.Float` | [`TypedValue::Float`] |
//! | `double`, `Double`, `java.lang.Double` | [`TypedValue::Double`] |
//! | `bool`, `Boolean`, `java.lang.Boolean` | [`TypedValue::Boolean`] |
//! | `map`, `Map`, `java.util.Map` | [`TypedValue::Map`] |
//! | `slice`, `List`, `java.util.List` | [`TypedValue::List`] |
//! | [`DEFAULT_RESOLVER_NAME`] | [`TypedValue::Unresolved`] |

use crate::form::json_bytes_from_query_string;
use crate::mime_value::{MIME_VALUE_OBJECT, MIME_VALUE_STRING_MAP, MIME_VALUE_TEXT};
use crate::resolver::{ValueResolversBuilder, describe};
use crate::{DEFAULT_RESOLVER_NAME, MimeValue, RawValue, ResolveError, TypedValue, ValueResolvers};
use crate::{cast, cast_resolver, resolver_fn};
use bytes::Bytes;
use serde_json::{Map, Value};

pub const JAVA_LANG_STRING: &str = "java.lang.String";
pub const JAVA_LANG_INTEGER: &str = "java.lang.Integer";
pub const JAVA_LANG_LONG: &str = "java.lang.Long";
pub const JAVA_LANG_FLOAT: &str = "java.lang.Float";
pub const JAVA_LANG_DOUBLE: &str = "java.lang.Double";
pub const JAVA_LANG_BOOLEAN: &str = "java.lang.Boolean";
pub const JAVA_UTIL_MAP: &str = "java.util.Map";
pub const JAVA_UTIL_LIST: &str = "java.util.List";

pub(crate) fn register(builder: ValueResolversBuilder) -> ValueResolversBuilder {
    builder
        .register(
            &["string", "String", JAVA_LANG_STRING],
            resolver_fn(|_, _, _, value| cast_decode_to_string(value).map(TypedValue::String)),
        )
        .register(&["int", "Integer", JAVA_LANG_INTEGER], cast_resolver(|raw| TypedValue::Integer(cast::to_i32(raw))))
        .register(&["int64", "long", "Long", JAVA_LANG_LONG], cast_resolver(|raw| TypedValue::Long(cast::to_i64(raw))))
        .register(&["float", "Float", JAVA_LANG_FLOAT], cast_resolver(|raw| TypedValue::Float(cast::to_f32(raw))))
        .register(&["double", "Double", JAVA_LANG_DOUBLE], cast_resolver(|raw| TypedValue::Double(cast::to_f64(raw))))
        .register(&["bool", "Boolean", JAVA_LANG_BOOLEAN], cast_resolver(|raw| TypedValue::Boolean(cast::to_bool(raw))))
        .register(
            &["map", "Map", JAVA_UTIL_MAP],
            resolver_fn(|_, _, _, value| cast_decode_to_string_map(value).map(TypedValue::Map)),
        )
        .register(
            &["slice", "List", JAVA_UTIL_LIST],
            resolver_fn(|registry, _, generic_types, value| {
                cast_to_list(registry, generic_types, value).map(TypedValue::List)
            }),
        )
        .register(
            &[DEFAULT_RESOLVER_NAME],
            resolver_fn(|_, type_class, generic_types, value| Ok(describe(type_class, generic_types, value))),
        )
}

/// Decodes a value to text on a best-effort basis.
///
/// Text is returned as it is and string maps are encoded as JSON. Anything else has its bytes
/// extracted (a stream is drained and closed) and decoded as UTF-8; values without a byte form,
/// such as JSON scalars, are cast instead.
pub fn cast_decode_to_string(value: MimeValue) -> Result<String, ResolveError> {
    let (mime_type, raw) = value.into_parts();
    match (mime_type.as_str(), raw) {
        (MIME_VALUE_TEXT, RawValue::Text(text)) => Ok(text),
        (MIME_VALUE_STRING_MAP, RawValue::Json(map)) => serde_json::to_string(&map).map_err(ResolveError::encode_json),
        (_, raw @ RawValue::Json(_)) => cast::to_string(&raw),
        (_, raw) => {
            let bytes = read_bytes(raw)?;
            String::from_utf8(bytes.to_vec()).map_err(ResolveError::malformed_text)
        }
    }
}

/// Decodes a value to a string keyed map.
///
/// In-memory maps are taken directly, text is decoded as JSON, objects are cast. Wire payloads
/// are decoded according to their content type: JSON as is, url encoded forms through
/// [`json_bytes_from_query_string`]. Any other content type gets a last structural cast.
pub fn cast_decode_to_string_map(value: MimeValue) -> Result<Map<String, Value>, ResolveError> {
    let (mime_type, raw) = value.into_parts();
    match mime_type.as_str() {
        MIME_VALUE_STRING_MAP => Ok(cast::to_string_map(raw).unwrap_or_default()),
        MIME_VALUE_TEXT => {
            let text = match raw {
                RawValue::Text(text) => text,
                other => String::from_utf8(read_bytes(other)?.to_vec()).map_err(ResolveError::malformed_text)?,
            };
            serde_json::from_str(&text).map_err(|e| ResolveError::decode_text(&text, e))
        }
        MIME_VALUE_OBJECT => cast::to_string_map(raw)
            .map_err(|raw| ResolveError::CastObject { object: format!("{raw:?}"), kind: raw.kind() }),
        wire if wire.contains(mime::APPLICATION_JSON.essence_str()) => {
            let bytes = read_bytes(raw)?;
            Ok(serde_json::from_slice(&bytes)?)
        }
        wire if wire.contains(mime::APPLICATION_WWW_FORM_URLENCODED.essence_str()) => {
            let bytes = read_bytes(raw)?;
            let json = json_bytes_from_query_string(&bytes)?;
            Ok(serde_json::from_slice(&json)?)
        }
        other => cast::to_string_map(raw).map_err(|raw| ResolveError::UnsupportedMimeType {
            value: format!("{raw:?}"),
            kind: raw.kind(),
            mime_type: other.to_owned(),
        }),
    }
}

/// Resolves a single value as a one element list.
///
/// The value is resolved with the resolver of the first generic type; without generic types the
/// raw value is wrapped as it is. A composite wire value is never split into several elements.
pub fn cast_to_list(
    registry: &ValueResolvers,
    generic_types: &[String],
    value: MimeValue,
) -> Result<Vec<TypedValue>, ResolveError> {
    match generic_types.first() {
        Some(element_type) => registry.resolve(element_type, &[], value).map(|element| vec![element]),
        None => Ok(vec![TypedValue::Raw(value.into_value())]),
    }
}

/// Extracts the bytes of a value. Streams are drained and closed.
pub fn read_bytes(raw: RawValue) -> Result<Bytes, ResolveError> {
    match raw {
        RawValue::Bytes(bytes) => Ok(bytes),
        RawValue::Text(text) => Ok(Bytes::from(text)),
        RawValue::Stream(stream) => match stream.drain() {
            Some(read) => Ok(Bytes::from(read?)),
            None => Err(ResolveError::StreamConsumed),
        },
        other @ RawValue::Json(_) => {
            Err(ResolveError::UnsupportedBytes { value: format!("{other:?}"), kind: other.kind() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ReadStream, TypeDescriptor};
    use indoc::indoc;
    use serde_json::json;
    use std::io::{self, Cursor, Read};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn resolve(type_class: &str, value: MimeValue) -> Result<TypedValue, ResolveError> {
        ValueResolvers::builtin().resolve(type_class, &[], value)
    }

    fn generics(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    struct DropFlag {
        inner: Cursor<Vec<u8>>,
        dropped: Arc<AtomicBool>,
    }

    impl Read for DropFlag {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    struct BrokenRead;

    impl Read for BrokenRead {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("connection reset"))
        }
    }

    #[test]
    fn primitive_aliases_resolve_identically() {
        for alias in ["int", "Integer", JAVA_LANG_INTEGER] {
            assert_eq!(resolve(alias, MimeValue::text("42")).unwrap(), TypedValue::Integer(42));
        }
        for alias in ["int64", "long", "Long", JAVA_LANG_LONG] {
            assert_eq!(resolve(alias, MimeValue::text("-7")).unwrap(), TypedValue::Long(-7));
        }
        for alias in ["bool", "Boolean", JAVA_LANG_BOOLEAN] {
            assert_eq!(resolve(alias, MimeValue::text("true")).unwrap(), TypedValue::Boolean(true));
        }
        assert_eq!(resolve("float", MimeValue::text("1.5")).unwrap(), TypedValue::Float(1.5));
        assert_eq!(resolve("Double", MimeValue::object(json!(2.25))).unwrap(), TypedValue::Double(2.25));
    }

    #[test]
    fn unparseable_numbers_do_not_fail() {
        assert_eq!(resolve("int", MimeValue::text("forty-two")).unwrap(), TypedValue::Integer(0));
        assert_eq!(resolve("long", MimeValue::object(json!({"a": 1}))).unwrap(), TypedValue::Long(0));
        assert_eq!(resolve("double", MimeValue::text("")).unwrap(), TypedValue::Double(0.0));
        assert_eq!(resolve("bool", MimeValue::text("maybe")).unwrap(), TypedValue::Boolean(false));
    }

    #[test]
    fn string_from_text_and_map() {
        assert_eq!(resolve("string", MimeValue::text("hello")).unwrap(), TypedValue::String("hello".into()));

        let mut map = Map::new();
        map.insert("k".into(), json!("v"));
        assert_eq!(resolve("String", MimeValue::string_map(map)).unwrap(), TypedValue::String(r#"{"k":"v"}"#.into()));
    }

    #[test]
    fn string_from_bytes() {
        let value = MimeValue::json(Bytes::from_static(br#"{"a":1}"#));
        assert_eq!(resolve(JAVA_LANG_STRING, value).unwrap(), TypedValue::String(r#"{"a":1}"#.into()));

        let invalid = MimeValue::new("text/plain", vec![0xff_u8, 0xfe]);
        assert!(matches!(resolve("string", invalid), Err(ResolveError::MalformedText { .. })));
    }

    #[test]
    fn string_from_stream_drains_and_closes() {
        let dropped = Arc::new(AtomicBool::new(false));
        let stream = ReadStream::new(DropFlag { inner: Cursor::new(b"streamed".to_vec()), dropped: Arc::clone(&dropped) });

        let resolved = resolve("string", MimeValue::new("text/plain", stream.clone())).unwrap();

        assert_eq!(resolved, TypedValue::String("streamed".into()));
        assert!(dropped.load(Ordering::SeqCst));
        assert!(matches!(resolve("string", MimeValue::new("text/plain", stream)), Err(ResolveError::StreamConsumed)));
    }

    #[test]
    fn string_from_failing_stream() {
        let value = MimeValue::new("text/plain", ReadStream::new(BrokenRead));
        assert!(matches!(resolve("string", value), Err(ResolveError::Io { .. })));
    }

    #[test]
    fn string_falls_back_to_cast() {
        assert_eq!(resolve("string", MimeValue::object(json!(12))).unwrap(), TypedValue::String("12".into()));
        assert!(matches!(resolve("string", MimeValue::object(json!([1, 2]))), Err(ResolveError::CastString { .. })));
    }

    #[test]
    fn map_from_string_map() {
        let mut map = Map::new();
        map.insert("a".into(), json!(1));
        assert_eq!(resolve("map", MimeValue::string_map(map.clone())).unwrap(), TypedValue::Map(map));
    }

    #[test]
    fn map_from_text() {
        let text = indoc! {r#"
            {
                "name": "flux",
                "tags": ["a", "b"]
            }
        "#};
        let resolved = resolve("Map", MimeValue::text(text)).unwrap();
        assert_eq!(resolved.as_map().unwrap().get("tags"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn map_from_bad_text_reports_the_text() {
        let err = resolve("map", MimeValue::text("{oops")).unwrap_err();
        assert!(matches!(err, ResolveError::DecodeText { .. }));
        assert!(err.to_string().contains("{oops"));
    }

    #[test]
    fn map_from_invalid_utf8_text() {
        let invalid = MimeValue::new(MIME_VALUE_TEXT, vec![b'{', 0xff_u8, b'}']);
        assert!(matches!(resolve("map", invalid), Err(ResolveError::MalformedText { .. })));
    }

    #[test]
    fn map_from_object() {
        let resolved = resolve(JAVA_UTIL_MAP, MimeValue::object(json!({"x": true}))).unwrap();
        assert_eq!(resolved, TypedValue::Map(json!({"x": true}).as_object().unwrap().clone()));

        let err = resolve("map", MimeValue::object(json!(5))).unwrap_err();
        assert!(matches!(err, ResolveError::CastObject { kind: "number", .. }));
    }

    #[test]
    fn map_from_json_content() {
        let resolved = resolve("map", MimeValue::new("application/json; charset=utf-8", r#"{"id":9}"#)).unwrap();
        assert_eq!(resolved.as_map().unwrap().get("id"), Some(&json!(9)));

        assert!(matches!(resolve("map", MimeValue::json("[1]")), Err(ResolveError::DecodeJson { .. })));
        assert!(matches!(
            resolve("map", MimeValue::json(json!({"a": 1}))),
            Err(ResolveError::UnsupportedBytes { kind: "object", .. })
        ));
    }

    #[test]
    fn map_from_form_content() {
        let resolved = resolve("map", MimeValue::form("a=1&a=2&b=3")).unwrap();
        assert_eq!(resolved, TypedValue::Map(json!({"a": ["1", "2"], "b": "3"}).as_object().unwrap().clone()));

        let streamed = MimeValue::form(ReadStream::new(Cursor::new(b"x=y".to_vec())));
        assert_eq!(resolve("map", streamed).unwrap().as_map().unwrap().get("x"), Some(&json!("y")));
    }

    #[test]
    fn map_from_other_content() {
        let resolved = resolve("map", MimeValue::new("application/octet-stream", json!({"k": 1}))).unwrap();
        assert_eq!(resolved.as_map().unwrap().get("k"), Some(&json!(1)));

        let err = resolve("map", MimeValue::new("text/plain", "k=v")).unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedMimeType { kind: "text", .. }));
        assert!(err.to_string().contains("text/plain"));
    }

    #[test]
    fn list_wraps_single_typed_value() {
        let resolved = ValueResolvers::builtin().resolve("slice", &generics(&["string"]), MimeValue::text("x")).unwrap();
        assert_eq!(resolved, TypedValue::List(vec![TypedValue::String("x".into())]));

        let resolved = ValueResolvers::builtin().resolve(JAVA_UTIL_LIST, &generics(&["int", "ignored"]), MimeValue::text("5"));
        assert_eq!(resolved.unwrap(), TypedValue::List(vec![TypedValue::Integer(5)]));
    }

    #[test]
    fn list_without_generics_wraps_raw() {
        let resolved = resolve("List", MimeValue::text("1,2,3")).unwrap();
        assert_eq!(resolved, TypedValue::List(vec![TypedValue::Raw(RawValue::from("1,2,3"))]));
    }

    #[test]
    fn list_element_errors_propagate() {
        let resolved = ValueResolvers::builtin().resolve("slice", &generics(&["map"]), MimeValue::text("nope"));
        assert!(matches!(resolved, Err(ResolveError::DecodeText { .. })));
    }

    #[test]
    fn unknown_type_is_described() {
        let value = MimeValue::json(r#"{"a":1}"#);
        let resolved = ValueResolvers::builtin().resolve("com.foo.Bar", &generics(&["T"]), value.clone()).unwrap();

        assert_eq!(
            resolved,
            TypedValue::Unresolved(TypeDescriptor { class: "com.foo.Bar".into(), generic: generics(&["T"]), value })
        );
    }

    #[test]
    fn list_of_unknown_type_is_described() {
        let resolved = ValueResolvers::builtin().resolve("slice", &generics(&["com.foo.Bar"]), MimeValue::text("z"));
        assert!(matches!(resolved.unwrap(), TypedValue::List(items) if matches!(items[0], TypedValue::Unresolved(_))));
    }
}

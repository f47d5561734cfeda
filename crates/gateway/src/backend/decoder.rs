use super::{BackendResponse, DecodedResponse, ResponseDecoder};
use crate::body::ResponseBody;
use crate::context::Context;
use crate::error::BoxError;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use micro_value::RawValue;
use micro_value::builtin::read_bytes;
use serde_json::Value;

/// Key of the status code in a map shaped RPC result.
pub const RESPONSE_KEY_STATUS: &str = "@net.bytepowered.flux.http-status";
/// Key of the response headers in a map shaped RPC result.
pub const RESPONSE_KEY_HEADERS: &str = "@net.bytepowered.flux.http-header";
/// Key of the response body in a map shaped RPC result.
pub const RESPONSE_KEY_BODY: &str = "@net.bytepowered.flux.http-body";

struct FnDecoder<F>(F);

impl<F> ResponseDecoder for FnDecoder<F>
where
    F: Fn(&Context, BackendResponse) -> Result<DecodedResponse, BoxError> + Send + Sync,
{
    fn decode(&self, ctx: &Context, response: BackendResponse) -> Result<DecodedResponse, BoxError> {
        (self.0)(ctx, response)
    }
}

pub fn decoder_fn<F>(f: F) -> impl ResponseDecoder
where
    F: Fn(&Context, BackendResponse) -> Result<DecodedResponse, BoxError> + Send + Sync,
{
    FnDecoder(f)
}

/// Passes status and headers through and writes the body as it was returned.
pub fn http_response_decoder() -> impl ResponseDecoder {
    decoder_fn(decode_http)
}

/// Decodes the result of an RPC call.
///
/// A map carrying [`RESPONSE_KEY_STATUS`] describes the whole response: status, optional
/// [`RESPONSE_KEY_HEADERS`] and optional [`RESPONSE_KEY_BODY`]. Any other result becomes the
/// body of a response with the status the backend reported.
pub fn rpc_response_decoder() -> impl ResponseDecoder {
    decoder_fn(decode_rpc)
}

fn decode_http(_: &Context, response: BackendResponse) -> Result<DecodedResponse, BoxError> {
    let BackendResponse { status, headers, body } = response;
    Ok(DecodedResponse { status, headers, body: response_body(body.into_value())? })
}

fn decode_rpc(_: &Context, response: BackendResponse) -> Result<DecodedResponse, BoxError> {
    let BackendResponse { status, mut headers, body } = response;
    match body.into_value() {
        RawValue::Json(Value::Object(mut map)) if map.contains_key(RESPONSE_KEY_STATUS) => {
            let status = status_code(map.remove(RESPONSE_KEY_STATUS).unwrap_or_default())?;
            if let Some(value) = map.remove(RESPONSE_KEY_HEADERS) {
                headers.extend(header_map(value)?);
            }
            let body = match map.remove(RESPONSE_KEY_BODY) {
                None | Some(Value::Null) => ResponseBody::empty(),
                Some(Value::String(text)) => ResponseBody::from(text),
                Some(value) => ResponseBody::json(value),
            };
            Ok(DecodedResponse { status, headers, body })
        }
        raw => Ok(DecodedResponse { status, headers, body: response_body(raw)? }),
    }
}

fn response_body(raw: RawValue) -> Result<ResponseBody, BoxError> {
    match raw {
        RawValue::Json(value) => Ok(ResponseBody::json(value)),
        other => Ok(read_bytes(other)?.into()),
    }
}

fn status_code(value: Value) -> Result<StatusCode, BoxError> {
    let code = match &value {
        Value::Number(number) => number.as_u64().and_then(|code| u16::try_from(code).ok()),
        Value::String(text) => text.trim().parse::<u16>().ok(),
        _ => None,
    };
    match code {
        Some(code) => Ok(StatusCode::from_u16(code)?),
        None => Err(format!("invalid response status: {value}").into()),
    }
}

fn header_map(value: Value) -> Result<HeaderMap, BoxError> {
    let Value::Object(entries) = value else {
        return Err(format!("response headers must be a map, got: {value}").into());
    };

    let mut headers = HeaderMap::new();
    for (name, values) in entries {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        for value in header_values(values) {
            headers.append(name.clone(), HeaderValue::from_str(&value)?);
        }
    }
    Ok(headers)
}

fn header_values(value: Value) -> Vec<String> {
    match value {
        Value::Array(values) => values.into_iter().flat_map(header_values).collect(),
        Value::String(text) => vec![text],
        Value::Null => vec![],
        other => vec![other.to_string()],
    }
}

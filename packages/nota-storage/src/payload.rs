//! Conversion between chunk records and Qdrant point payloads.

use std::collections::HashMap;

use qdrant_client::qdrant::{Value, value::Kind};
use serde_json::{Map, Number, Value as JsonValue};

use nota_domain::{ChunkMetadata, DocumentChunk};

pub const TEXT_KEY: &str = "text";

pub fn chunk_to_payload(chunk: &DocumentChunk) -> HashMap<String, Value> {
	let mut payload = HashMap::new();

	for (key, value) in chunk.metadata.clone().into_map() {
		payload.insert(key, Value::from(value));
	}

	payload.insert(TEXT_KEY.to_string(), Value::from(chunk.text.clone()));

	payload
}

/// Returns `None` when the payload has no string `text`; such points cannot be shown to a reader.
pub fn chunk_from_payload(payload: HashMap<String, Value>) -> Option<DocumentChunk> {
	let mut map = Map::with_capacity(payload.len());

	for (key, value) in payload {
		map.insert(key, value_to_json(value));
	}

	let text = match map.remove(TEXT_KEY) {
		Some(JsonValue::String(text)) => text,
		_ => return None,
	};

	Some(DocumentChunk { text, metadata: ChunkMetadata::from_map(map) })
}

fn value_to_json(value: Value) -> JsonValue {
	match value.kind {
		None | Some(Kind::NullValue(_)) => JsonValue::Null,
		Some(Kind::BoolValue(flag)) => JsonValue::Bool(flag),
		Some(Kind::IntegerValue(number)) => JsonValue::from(number),
		Some(Kind::DoubleValue(number)) =>
			Number::from_f64(number).map(JsonValue::Number).unwrap_or(JsonValue::Null),
		Some(Kind::StringValue(text)) => JsonValue::String(text),
		Some(Kind::ListValue(list)) =>
			JsonValue::Array(list.values.into_iter().map(value_to_json).collect()),
		Some(Kind::StructValue(object)) => JsonValue::Object(
			object.fields.into_iter().map(|(key, value)| (key, value_to_json(value))).collect(),
		),
	}
}

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

/// Sequence alphabet of a block, declared through `type` or inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeqType {
    Dna,
    Rna,
    Aminos,
    Unknown,
}

impl SeqType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeqType::Dna => "dna",
            SeqType::Rna => "rna",
            SeqType::Aminos => "aminos",
            SeqType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SeqType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeqType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dna" => Ok(SeqType::Dna),
            "rna" => Ok(SeqType::Rna),
            "aminos" | "amino" | "protein" => Ok(SeqType::Aminos),
            "unknown" => Ok(SeqType::Unknown),
            other => Err(format!(
                "unrecognized sequence type '{}' (expected dna, rna, aminos or unknown)",
                other
            )),
        }
    }
}

/// Block metadata parsed from the JSON object trailing a title.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    /// Every key other than `type` and `private`, in source order.
    pub fields: Map<String, Value>,
    pub seq_type: Option<SeqType>,
    pub private: bool,
}

impl Metadata {
    /// Build metadata from a title's JSON object.
    ///
    /// Objects carrying a `fastac` key use the versioned header form
    /// `{"fastac": 1, "type": "dna", "meta": {...}}`: `meta` is flattened
    /// into the block metadata.
    pub fn from_object(object: Map<String, Value>) -> Result<Self, String> {
        let mut fields = if object.contains_key("fastac") {
            flatten_versioned(object)?
        } else {
            object
        };

        let seq_type = match fields.shift_remove("type") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.parse::<SeqType>()?),
            Some(other) => {
                return Err(format!("metadata key 'type' must be a string, got {}", other));
            }
        };

        let private = match fields.shift_remove("private") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => b,
            Some(other) => {
                return Err(format!(
                    "metadata key 'private' must be a boolean, got {}",
                    other
                ));
            }
        };

        if let Some(comments) = fields.get("comments") {
            if !comments.is_array() {
                return Err("metadata key 'comments' must be an array".to_string());
            }
        }

        Ok(Metadata {
            fields,
            seq_type,
            private,
        })
    }
}

fn flatten_versioned(mut object: Map<String, Value>) -> Result<Map<String, Value>, String> {
    let mut fields = Map::new();
    if let Some(seq_type) = object.shift_remove("type") {
        fields.insert("type".to_string(), seq_type);
    }
    match object.shift_remove("meta") {
        None | Some(Value::Null) => {}
        Some(Value::Object(meta)) => {
            for (key, value) in meta {
                if fields.contains_key(&key) {
                    return Err(format!("metadata key '{}' is given twice", key));
                }
                fields.insert(key, value);
            }
        }
        Some(_) => return Err("versioned metadata key 'meta' must be an object".to_string()),
    }
    Ok(fields)
}

use serde_json::{Map, Value};

use crate::block::normalize_title;

/// Split the text after `>` into a normalized title and its optional
/// trailing JSON metadata object.
///
/// A title line ending in `}` must carry a decodable JSON object; the
/// earliest `{` that starts one wins, so nested objects stay intact.
pub fn split_title(text: &str) -> Result<(String, Option<Map<String, Value>>), String> {
    let text = text.trim();
    let mut metadata = None;
    let mut title_end = text.len();

    if text.ends_with('}') {
        let mut first_error = None;
        for (start, _) in text.match_indices('{') {
            match serde_json::from_str::<Value>(&text[start..]) {
                Ok(Value::Object(object)) => {
                    metadata = Some(object);
                    title_end = start;
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        if metadata.is_none() {
            return Err(match first_error {
                Some(e) => format!("malformed metadata JSON: {}", e),
                None => "malformed metadata JSON".to_string(),
            });
        }
    }

    let title = normalize_title(&text[..title_end]);
    if title.is_empty() {
        return Err("title line has no title".to_string());
    }
    Ok((title, metadata))
}

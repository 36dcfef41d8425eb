use serde_json::Value;

/// Substituted for an empty generation so a 200 never carries "".
pub const FALLBACK_REPLY: &str = "✨ 我听懂了，也许你需要一点时间放松。";

/// Pull the reply text out of whatever shape the inference endpoint answered
/// with. The body arrives as raw text; `Err` carries it back verbatim when it
/// is not JSON at all. Known shapes are tried in priority order, and anything
/// unrecognized is serialized whole so the caller still sees what came back.
pub fn extract_reply(raw: &str) -> Result<String, String> {
    let data: Value = serde_json::from_str(raw).map_err(|_| raw.to_string())?;

    let reply = from_generation_batch(&data)
        .or_else(|| from_bare_string(&data))
        .or_else(|| from_generation_object(&data))
        .or_else(|| from_chat_completion(&data))
        .unwrap_or_else(|| data.to_string());

    let reply = reply.trim();
    if reply.is_empty() {
        Ok(FALLBACK_REPLY.to_string())
    } else {
        Ok(reply.to_string())
    }
}

fn from_generation_batch(data: &Value) -> Option<String> {
    data.as_array()?
        .first()?
        .get("generated_text")?
        .as_str()
        .map(str::to_owned)
}

fn from_bare_string(data: &Value) -> Option<String> {
    data.as_str().map(str::to_owned)
}

fn from_generation_object(data: &Value) -> Option<String> {
    data.get("generated_text")?.as_str().map(str::to_owned)
}

fn from_chat_completion(data: &Value) -> Option<String> {
    data.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .map(str::to_owned)
}

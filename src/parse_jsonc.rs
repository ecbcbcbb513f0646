use anyhow::Context;
use serde::de::DeserializeOwned;

/// Parses a JSONC document (comments, trailing commas) by compacting it to
/// plain JSON first.
pub fn parse_jsonc<T: DeserializeOwned>(input: &str) -> Result<T, anyhow::Error> {
    let json = fjson::to_json_compact(input).context("invalid JSONC")?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_comments_and_trailing_commas() {
        let parsed: serde_json::Value = parse_jsonc(
            r#"{
                // a comment
                "a": 1,
            }"#,
        )
        .unwrap();
        assert_eq!(parsed, json!({"a": 1}));
    }
}

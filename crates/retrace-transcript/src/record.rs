use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Assistant,
    User,
    Other,
}

/// Classify a transcript JSONL record by its `type` field.
pub fn classify_record(json: &Value) -> RecordKind {
    match json.get("type").and_then(|v| v.as_str()).unwrap_or("") {
        "assistant" => RecordKind::Assistant,
        "user" => RecordKind::User,
        _ => RecordKind::Other,
    }
}

/// `message.content` of a record: either a plain string or a block sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Content<'a> {
    Text(&'a str),
    Blocks(&'a [Value]),
    Missing,
}

impl<'a> Content<'a> {
    pub fn of_message(message: Option<&'a Value>) -> Self {
        match message.and_then(|m| m.get("content")) {
            Some(Value::String(s)) => Content::Text(s),
            Some(Value::Array(blocks)) => Content::Blocks(blocks),
            _ => Content::Missing,
        }
    }

    /// Text fragments: the string itself, or every `text` block.
    pub fn texts(&self) -> Vec<&'a str> {
        match *self {
            Content::Text(s) => vec![s],
            Content::Blocks(blocks) => blocks
                .iter()
                .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
                .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                .collect(),
            Content::Missing => Vec::new(),
        }
    }

    /// True if any text fragment contains one of `markers` (case-insensitive).
    /// Markers must already be lower-case.
    pub fn contains_any(&self, markers: &[&str]) -> bool {
        self.texts().iter().any(|text| {
            let lower = text.to_lowercase();
            markers.iter().any(|m| lower.contains(m))
        })
    }
}

/// A `tool_use` block from an assistant message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolUse<'a> {
    pub name: &'a str,
    pub input: &'a Value,
}

impl<'a> ToolUse<'a> {
    pub fn input_str(&self, key: &str) -> Option<&'a str> {
        self.input.get(key).and_then(|v| v.as_str())
    }
}

/// Borrowed view over one decoded log record.
///
/// Expected shape per line:
/// ```json
/// {"type":"assistant","timestamp":"...","slug":"...","message":{"content":[{"type":"tool_use","name":"Bash","input":{"command":"..."}}]}}
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LogEntry<'a> {
    pub kind: RecordKind,
    pub timestamp: &'a str,
    pub slug: Option<&'a str>,
    pub message: Option<&'a Value>,
}

impl<'a> LogEntry<'a> {
    pub fn from_value(json: &'a Value) -> Self {
        Self {
            kind: classify_record(json),
            timestamp: json.get("timestamp").and_then(|v| v.as_str()).unwrap_or(""),
            slug: json
                .get("slug")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty()),
            message: json.get("message").filter(|m| m.is_object()),
        }
    }

    pub fn content(&self) -> Content<'a> {
        Content::of_message(self.message)
    }

    pub fn tool_uses(&self) -> Vec<ToolUse<'a>> {
        let Content::Blocks(blocks) = self.content() else {
            return Vec::new();
        };
        blocks
            .iter()
            .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("tool_use"))
            .map(|b| ToolUse {
                name: b.get("name").and_then(|n| n.as_str()).unwrap_or(""),
                input: b.get("input").unwrap_or(&Value::Null),
            })
            .collect()
    }
}

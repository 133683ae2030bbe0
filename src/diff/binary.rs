use content_inspector::{ContentType, inspect};

/// How much of a file is inspected when guessing whether it is binary.
const INSPECT_BYTES: usize = 8192;

/// Whether `content` looks like binary data. Empty content is text.
#[must_use]
pub fn is_binary(content: &[u8]) -> bool {
    let window = &content[..content.len().min(INSPECT_BYTES)];
    !window.is_empty() && matches!(inspect(window), ContentType::BINARY)
}

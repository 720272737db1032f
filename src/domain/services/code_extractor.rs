#[cfg(test)]
#[path = "code_extractor_test.rs"]
mod tests;

use once_cell::sync::Lazy;
use regex::Regex;

// An optional language hint is only taken as such when the fence line ends
// right after it, so "```print(1)```" keeps its body intact.
static FENCED_BLOCK: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| return Regex::new(r"(?s)```(?:[\w+#.-]*[ \t]*\r?\n)?(.*?)```"));

/// Returns the body of the first fenced block in a model response, or the
/// whole response when it has none. Both are trimmed.
pub fn extract(text: &str) -> String {
    if let Ok(re) = FENCED_BLOCK.as_ref() {
        if let Some(code) = re.captures(text).and_then(|captures| return captures.get(1)) {
            return code.as_str().trim().to_string();
        }
    }

    return text.trim().to_string();
}

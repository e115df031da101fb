use once_cell::sync::Lazy;
use regex::Regex;

static HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"#\w+").unwrap());

/// All hashtags in `text`, in order of appearance, including the `#`.
pub fn extract_hashtags(text: &str) -> Vec<&str> {
    HASHTAG.find_iter(text).map(|m| m.as_str()).collect()
}

/// The hashtag a message is filed under: the first one in it.
pub fn first_hashtag(text: &str) -> Option<&str> {
    HASHTAG.find(text).map(|m| m.as_str())
}

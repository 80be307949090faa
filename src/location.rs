//! JSON-Pointer locations
//!
//! Locations are written in fragment form (`#/channels/userSignedUp`). Segments
//! are escaped per RFC 6901: `~` becomes `~0` and `/` becomes `~1`.

use std::borrow::Cow;

/// Escape a single pointer segment
pub fn escape_segment(segment: &str) -> Cow<'_, str> {
    if segment.contains(['~', '/']) {
        Cow::Owned(segment.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(segment)
    }
}

/// Undo [`escape_segment`]
pub fn unescape_segment(segment: &str) -> Cow<'_, str> {
    if segment.contains('~') {
        Cow::Owned(segment.replace("~1", "/").replace("~0", "~"))
    } else {
        Cow::Borrowed(segment)
    }
}

/// Build `#/<a>/<b>/...` from raw segments
pub fn pointer<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::from("#");
    for segment in segments {
        out.push('/');
        out.push_str(&escape_segment(segment));
    }
    if out.len() == 1 {
        out.push('/');
    }
    out
}

/// Unescaped last segment of a location (`#/components/messages/a~1b` gives `a/b`)
pub fn last_segment(location: &str) -> String {
    let tail = location.rsplit('/').next().unwrap_or(location);
    let tail = tail.strip_prefix('#').unwrap_or(tail);
    unescape_segment(tail).into_owned()
}

/// Strict push/pop stack of location segments
///
/// Every `push` must be matched by exactly one `pop`; popping an empty stack is
/// a programming error and trips a debug assertion.
#[derive(Debug, Clone, Default)]
pub struct LocationStack {
    segments: Vec<String>,
}

impl LocationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    pub fn pop(&mut self) {
        let popped = self.segments.pop();
        debug_assert!(
            popped.is_some(),
            "location stack popped more often than it was pushed"
        );
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Current location as an escaped pointer
    pub fn pointer(&self) -> String {
        pointer(self.segments.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_rfc6901() {
        assert_eq!(escape_segment("user/signedup"), "user~1signedup");
        assert_eq!(escape_segment("a~b"), "a~0b");
        assert_eq!(escape_segment("plain"), "plain");
        assert_eq!(unescape_segment("a~0~1b"), "a~/b");
    }

    #[test]
    fn test_stack_builds_pointer() {
        let mut stack = LocationStack::new();
        assert_eq!(stack.pointer(), "#/");
        stack.push("channels");
        stack.push("user/signedup");
        assert_eq!(stack.pointer(), "#/channels/user~1signedup");
        stack.pop();
        assert_eq!(stack.pointer(), "#/channels");
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("#/components/messages/lightMeasured"), "lightMeasured");
        assert_eq!(last_segment("#/components/messages/a~1b"), "a/b");
        assert_eq!(last_segment("other.yaml#/messages/x"), "x");
    }

    #[test]
    #[should_panic(expected = "popped more often")]
    #[cfg(debug_assertions)]
    fn test_unbalanced_pop_asserts() {
        let mut stack = LocationStack::new();
        stack.pop();
    }
}

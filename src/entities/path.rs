//! Composite stream identifiers.
//!
//! A preview stream is keyed by the path of the node that produces it:
//! colon-joined segment ids, one per nested subgraph level
//! (`"sub1:sub2:n5"`). Every prefix of the path names an ancestor scope that
//! embeds the producer and therefore gets its own playback target.

use std::fmt;
use std::str::FromStr;

/// Parsed composite node path. Segments are kept verbatim; an empty segment
/// (`"a::b"`) is legal here and simply fails to resolve later.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamPath {
    segments: Vec<String>,
}

impl StreamPath {
    /// Parse a composite id. Returns None for an empty/blank id.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return None;
        }
        Some(Self {
            segments: raw.split(':').map(str::to_string).collect(),
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Last segment: the id of the producing node inside its own scope.
    pub fn leaf(&self) -> &str {
        self.segments
            .last()
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// All prefixes ending at a segment boundary, shortest first, the full
    /// path last. `"a:b:c"` yields `"a"`, `"a:b"`, `"a:b:c"`.
    pub fn prefixes(&self) -> impl Iterator<Item = StreamPath> + '_ {
        (1..=self.segments.len()).map(|n| StreamPath {
            segments: self.segments[..n].to_vec(),
        })
    }
}

impl fmt::Display for StreamPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join(":"))
    }
}

impl FromStr for StreamPath {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_roundtrip() {
        let p = StreamPath::parse("sub1:n5").unwrap();
        assert_eq!(p.segments(), ["sub1", "n5"]);
        assert_eq!(p.to_string(), "sub1:n5");
        assert_eq!(p.leaf(), "n5");
    }

    #[test]
    fn empty_id_rejected() {
        assert!(StreamPath::parse("").is_none());
        assert!(StreamPath::parse("   ").is_none());
    }

    #[test]
    fn single_segment_has_one_prefix() {
        let p = StreamPath::parse("n1").unwrap();
        let prefixes: Vec<String> = p.prefixes().map(|p| p.to_string()).collect();
        assert_eq!(prefixes, ["n1"]);
    }

    #[test]
    fn prefixes_shortest_first() {
        let p = StreamPath::parse("a:b:c").unwrap();
        let prefixes: Vec<String> = p.prefixes().map(|p| p.to_string()).collect();
        assert_eq!(prefixes, ["a", "a:b", "a:b:c"]);
    }

    #[test]
    fn empty_segments_kept_verbatim() {
        let p = StreamPath::parse("a::b").unwrap();
        assert_eq!(p.segments(), ["a", "", "b"]);
    }
}

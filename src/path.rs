use std::fmt;

/// A dotted document path such as `drafts.article.*`.
///
/// Two segments are treated as wildcards when the path is used as a pattern:
/// `*` matches exactly one remaining segment and `**` matches any remainder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Split a dotted string into a path.
    pub fn parse(spec: &str) -> Self {
        Path {
            segments: spec.split('.').map(str::to_string).collect(),
        }
    }

    pub fn from_segments(segments: Vec<String>) -> Self {
        Path { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Append every segment of `other` to this path.
    pub fn concat(&self, other: &Path) -> Path {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Path { segments }
    }

    /// Test whether `candidate` is covered by this path used as a pattern.
    ///
    /// Segments are compared pairwise from the front. The walk succeeds on a
    /// `**` pattern segment, or on a `*` that lines up with the candidate's
    /// last segment. A pattern without wildcards never contains a candidate,
    /// not even an identical one.
    ///
    /// ```
    /// use vellum::path::Path;
    ///
    /// assert!(Path::parse("a.*").contains(&Path::parse("a.b")));
    /// assert!(!Path::parse("a.*").contains(&Path::parse("a.b.c")));
    /// assert!(Path::parse("a.**").contains(&Path::parse("a.b.c.d")));
    /// ```
    pub fn contains(&self, candidate: &Path) -> bool {
        let mut pattern = self.segments.iter();
        let mut rest = candidate.segments.iter();
        loop {
            let p = pattern.next().map(String::as_str);
            let c = rest.next().map(String::as_str);
            match p {
                Some("**") => return true,
                Some("*") => return rest.len() == 0,
                _ => {}
            }
            if p != c {
                return false;
            }
            if pattern.len() == 0 || rest.len() == 0 {
                return false;
            }
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

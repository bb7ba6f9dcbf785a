//! Segmented paths into a configuration tree

use std::fmt;

/// Ordered list of key segments locating a node within a [`ConfigTree`](super::ConfigTree).
///
/// The dotted text form (`DB.Connections.Default.host`) is accepted wherever a
/// path is expected. Keys that themselves contain a dot are written with a
/// backslash escape: `SYS.features.felogin\.extbase`.
///
/// # Example
///
/// ```
/// use cfgtree::ConfigPath;
///
/// let path = ConfigPath::parse("SYS.features.felogin\\.extbase");
/// assert_eq!(path.segments(), ["SYS", "features", "felogin.extbase"]);
///
/// let same = ConfigPath::new(["SYS", "features", "felogin.extbase"]);
/// assert_eq!(path, same);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigPath {
    segments: Vec<String>,
}

impl ConfigPath {
    /// Build a path from explicit segments (no dot splitting).
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// The empty path.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse the dotted text form. An empty string yields the root path.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        if text.is_empty() {
            return Self::root();
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\\' if chars.peek() == Some(&'.') => {
                    current.push('.');
                    chars.next();
                }
                '.' => segments.push(std::mem::take(&mut current)),
                other => current.push(other),
            }
        }
        segments.push(current);

        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Final segment, if any
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// A new path with `segment` appended.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Path without its last segment; `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, parents) = self.segments.split_last()?;
        Some(Self {
            segments: parents.to_vec(),
        })
    }

    /// The first `len` segments of this path.
    #[must_use]
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }

    /// Whether `other` is this path or one of its ancestors.
    pub fn starts_with(&self, other: &ConfigPath) -> bool {
        self.segments.starts_with(&other.segments)
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&segment.replace('.', "\\."))?;
        }
        Ok(())
    }
}

impl From<&str> for ConfigPath {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl From<String> for ConfigPath {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl From<&ConfigPath> for ConfigPath {
    fn from(path: &ConfigPath) -> Self {
        path.clone()
    }
}

impl From<Vec<String>> for ConfigPath {
    fn from(segments: Vec<String>) -> Self {
        Self { segments }
    }
}

impl From<&[&str]> for ConfigPath {
    fn from(segments: &[&str]) -> Self {
        Self::new(segments.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for ConfigPath {
    fn from(segments: [&str; N]) -> Self {
        Self::new(segments)
    }
}

/// A path in the virtual filesystem: `/bucket/key/segments`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualPath {
    /// Path segments (e.g., ["bucket", "prefix", "file.txt"])
    segments: Vec<String>,
    /// Whether this is an absolute path (starts with /)
    is_absolute: bool,
}

impl VirtualPath {
    /// Parse a path string into a VirtualPath
    pub fn parse(path: &str) -> Self {
        let is_absolute = path.starts_with('/');
        let root = VirtualPath {
            segments: Vec::new(),
            is_absolute,
        };
        root.join(path)
    }

    /// The filesystem root, which lists buckets
    pub fn root() -> Self {
        VirtualPath {
            segments: Vec::new(),
            is_absolute: true,
        }
    }

    /// Path of a bucket root or a folder prefix
    pub fn from_listing(bucket: &str, prefix: &str) -> Self {
        Self::root().join(bucket).join(prefix)
    }

    /// Get the path segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Check if this is an absolute path
    pub fn is_absolute(&self) -> bool {
        self.is_absolute
    }

    /// Check if this path is empty (root)
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Bucket named by the first segment
    pub fn bucket(&self) -> Option<&str> {
        self.segments.first().map(|s| s.as_str())
    }

    /// Object key below the bucket ("" at the bucket root)
    pub fn key(&self) -> String {
        self.segments.iter().skip(1).cloned().collect::<Vec<_>>().join("/")
    }

    /// Listing prefix for this path treated as a directory
    pub fn dir_prefix(&self) -> String {
        let key = self.key();
        if key.is_empty() { key } else { format!("{key}/") }
    }

    /// Get the parent path
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            let mut parent_segments = self.segments.clone();
            parent_segments.pop();
            Some(VirtualPath {
                segments: parent_segments,
                is_absolute: self.is_absolute,
            })
        }
    }

    /// Get the last segment (filename)
    pub fn filename(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    /// Join this path with another; `..` pops, `.` and empty segments are skipped
    pub fn join(&self, other: &str) -> Self {
        let mut new_segments = self.segments.clone();

        for segment in other.split('/') {
            if segment.is_empty() || segment == "." {
                continue;
            } else if segment == ".." {
                new_segments.pop();
            } else {
                new_segments.push(segment.to_string());
            }
        }

        VirtualPath {
            segments: new_segments,
            is_absolute: self.is_absolute,
        }
    }

    /// Resolve `path` against this one: absolute paths replace it
    pub fn resolve(&self, path: &str) -> Self {
        if path.starts_with('/') {
            Self::root().join(path)
        } else {
            self.join(path)
        }
    }
}

/// Folder prefix containing `key` ("" for top-level keys)
pub fn parent_prefix(key: &str) -> &str {
    match key.trim_end_matches('/').rfind('/') {
        Some(pos) => &key[..=pos],
        None => "",
    }
}

impl std::fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            write!(f, "/")
        } else {
            write!(f, "/{}", self.segments.join("/"))
        }
    }
}

/// Lazy iterator that generates parent paths on-demand
///
/// For path `/a/b/c/d`, yields: `/a/b/c/d` → `/a/b/c` → `/a/b` → `/a` → `/`
///
/// Layout stacking walks the same prefixes in the opposite direction, see
/// [`PathHierarchy::root_first`].
///
/// # Examples
///
/// ```
/// use rssr_router::path::PathHierarchy;
///
/// let paths: Vec<&str> = PathHierarchy::new("/a/b/c").collect();
/// assert_eq!(paths, vec!["/a/b/c", "/a/b", "/a", "/"]);
/// ```
#[derive(Debug, Clone)]
pub struct PathHierarchy<'a> {
    current: Option<&'a str>,
}

impl<'a> PathHierarchy<'a> {
    /// Creates a new path hierarchy iterator starting from the given path
    pub fn new(path: &'a str) -> Self {
        let path = match path.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed,
            _ => path,
        };
        let current = if path.is_empty() { "/" } else { path };
        Self {
            current: Some(current),
        }
    }

    /// Collects the prefixes ordered from the root down to the full path
    pub fn root_first(self) -> Vec<&'a str> {
        let mut prefixes: Vec<&'a str> = self.collect();
        prefixes.reverse();
        prefixes
    }
}

impl<'a> Iterator for PathHierarchy<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;

        self.current = if current == "/" {
            None
        } else {
            match current.rfind('/') {
                Some(0) => Some("/"),
                Some(slash_pos) => Some(&current[..slash_pos]),
                None => None,
            }
        };

        Some(current)
    }
}

//! Path Templates
//!
//! Expands `{name}` placeholders in a storage class's path template into the
//! relative directory a volume lives in. Resolution is a pure function of the
//! template and the variables collected for one provision request.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Template used when a storage class does not set `pvPathTemplate`
pub const DEFAULT_PATH_TEMPLATE: &str = "{namespace}-{pvcName}-{pvName}";

/// Claim annotations with this prefix become template variables
pub const PATH_VARIABLE_PREFIX: &str = "pv-path-var/";

// =============================================================================
// Path Variables
// =============================================================================

/// Variables available to a path template, keyed case-sensitively.
///
/// Later insertions shadow earlier ones with the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathVariables {
    values: BTreeMap<String, String>,
}

impl PathVariables {
    /// Create an empty variable set
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Look up a variable's value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Add every annotation carrying [`PATH_VARIABLE_PREFIX`], prefix removed.
    ///
    /// Annotations whose key is exactly the prefix are ignored.
    pub fn extend_from_annotations<'a, I>(&mut self, annotations: I)
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (key, value) in annotations {
            match key.strip_prefix(PATH_VARIABLE_PREFIX) {
                Some(name) if !name.is_empty() => self.insert(name, value.clone()),
                _ => {}
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathVariables {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut vars = PathVariables::new();
        for (name, value) in iter {
            vars.insert(name, value);
        }
        vars
    }
}

// =============================================================================
// Path Template
// =============================================================================

/// A path template with zero or more `{name}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate(String);

/// One placeholder occurrence inside a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placeholder {
    /// Byte offset of the opening brace
    start: usize,
    /// Byte offset one past the closing brace
    end: usize,
}

impl PathTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Template from an optional class parameter, falling back to the default
    pub fn from_parameter(parameter: Option<&str>) -> Self {
        parameter.map(Self::new).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Distinct placeholder names in order of first appearance
    pub fn variable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for placeholder in self.placeholders() {
            let name = self.name_of(placeholder);
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Substitute every placeholder occurrence.
    ///
    /// Fails on the first placeholder whose variable is missing or empty, and
    /// when the substituted result is empty or would leave the storage root.
    pub fn resolve(&self, variables: &PathVariables) -> Result<ResolvedPath> {
        let placeholders = self.placeholders();

        for placeholder in &placeholders {
            let name = self.name_of(*placeholder);
            if variables.get(name).map_or(true, str::is_empty) {
                return Err(Error::UnresolvedVariable {
                    template: self.0.clone(),
                    variable: name.to_string(),
                });
            }
        }

        let mut resolved = String::with_capacity(self.0.len());
        let mut cursor = 0;
        for placeholder in placeholders {
            resolved.push_str(&self.0[cursor..placeholder.start]);
            resolved.push_str(variables.get(self.name_of(placeholder)).unwrap_or_default());
            cursor = placeholder.end;
        }
        resolved.push_str(&self.0[cursor..]);

        ResolvedPath::new(resolved).map_err(|e| match e {
            Error::EmptyPath { .. } => Error::EmptyPath {
                template: self.0.clone(),
            },
            other => other,
        })
    }

    fn name_of(&self, placeholder: Placeholder) -> &str {
        &self.0[placeholder.start + 1..placeholder.end - 1]
    }

    /// Scan for `{identifier}` where the identifier is one or more
    /// characters other than `}`
    fn placeholders(&self) -> Vec<Placeholder> {
        let mut found = Vec::new();
        let mut pos = 0;

        while let Some(offset) = self.0[pos..].find('{') {
            let start = pos + offset;
            match self.0[start + 1..].find('}') {
                Some(0) => pos = start + 1,
                Some(len) => {
                    let end = start + 1 + len + 1;
                    found.push(Placeholder { start, end });
                    pos = end;
                }
                None => break,
            }
        }

        found
    }
}

impl Default for PathTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_PATH_TEMPLATE)
    }
}

impl std::fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve a template string against a variable set
pub fn resolve(template: &str, variables: &PathVariables) -> Result<ResolvedPath> {
    PathTemplate::new(template).resolve(variables)
}

// =============================================================================
// Resolved Path
// =============================================================================

/// A volume directory relative to some root.
///
/// Never empty and never climbs above the root it is joined onto. Leading
/// separators are dropped, so `/a/b` and `a/b` name the same directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedPath(String);

impl ResolvedPath {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let mut has_component = false;

        for component in Path::new(&path).components() {
            match component {
                Component::Normal(_) => has_component = true,
                Component::ParentDir => {
                    return Err(Error::PathEscapesRoot { path: path.clone() })
                }
                Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            }
        }

        if !has_component {
            return Err(Error::EmptyPath { template: path });
        }
        Ok(Self(path))
    }

    /// The path exactly as resolved
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading directory name, ignoring separators and `.`
    pub fn first_component(&self) -> Option<&str> {
        Path::new(&self.0).components().find_map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
    }

    /// Absolute location of this path beneath `root`
    pub fn under(&self, root: &Path) -> PathBuf {
        let mut full = root.to_path_buf();
        for component in Path::new(&self.0).components() {
            if let Component::Normal(part) = component {
                full.push(part);
            }
        }
        full
    }
}

impl std::fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

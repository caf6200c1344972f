// SPDX-License-Identifier: AGPL-3.0
// SFTP Courier Core - Extension filtering
//
// A file qualifies when its extension, leading dot included, is exactly
// equal to one configured entry. No case folding, no suffix matching.

use std::path::Path;

/// The set of extensions a file must match to be uploaded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    entries: Vec<String>,
}

impl ExtensionSet {
    /// Build a set from raw entries, dropping empty ones
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        for entry in entries {
            let entry = entry.into();
            if !entry.is_empty() && !set.entries.contains(&entry) {
                set.entries.push(entry);
            }
        }
        set
    }

    /// Parse a comma-separated list such as `.cmf, .csv`
    pub fn parse_list(list: &str) -> Self {
        Self::new(list.split(',').map(str::trim))
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.entries.iter().any(|e| e == extension)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

/// Extension of the final path component, starting at its last dot.
///
/// Returns an empty string when the name has no dot. A leading-dot name
/// such as `.profile` is its own extension.
pub fn extension_of(file_name: &str) -> &str {
    let base = file_name
        .rsplit(std::path::is_separator)
        .next()
        .unwrap_or(file_name);

    match base.rfind('.') {
        Some(index) => &base[index..],
        None => "",
    }
}

/// True iff the file name's extension is exactly one of `extensions`
pub fn matches(file_name: &str, extensions: &ExtensionSet) -> bool {
    extensions.contains(extension_of(file_name))
}

/// Path form of [`matches`]; names that are not valid UTF-8 never match
pub fn path_matches(path: &Path, extensions: &ExtensionSet) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| matches(name, extensions))
        .unwrap_or(false)
}

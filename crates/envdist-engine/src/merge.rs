//! Concatenation of override files into a single in-memory document.

use std::fs;

use crate::source::{SourceError, SourceSet};

/// Raw lines of the concatenated override files, base first, most
/// specific last. Duplicate keys are not deduplicated here; later lines
/// win at resolution time.
#[derive(Debug, Clone, Default)]
pub struct MergedDocument {
    pub lines: Vec<String>,
}

/// Concatenate every contributing file of `sources` in precedence order.
///
/// Absent and template files contribute zero lines. The only failure mode
/// is a file that exists but cannot be read.
pub fn merge(sources: &SourceSet) -> Result<MergedDocument, SourceError> {
    let mut lines = Vec::new();
    for file in sources.contributing() {
        let content = fs::read_to_string(&file.path).map_err(|source| SourceError::Read {
            path: file.path.clone(),
            source,
        })?;
        lines.extend(content.lines().map(str::to_owned));
    }
    Ok(MergedDocument { lines })
}

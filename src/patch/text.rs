//! Plain text collaborators: literal replacement, manifest element values and
//! package-validation switches. None of these parse C#.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::PatchError;
use crate::guard::{pending_count, replace_pending, text_state, TextState};

/// A whole-file edit on raw text with its own idempotency marker.
pub trait TextPatch {
    fn is_applied(&self, content: &str) -> Result<bool, PatchError>;

    fn apply(&self, content: &str) -> Result<String, PatchError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

/// Replace every occurrence of each `from` with its `to`.
///
/// With `output` set, the result goes to that path (relative to the root)
/// and the source file is left alone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Retarget {
    pub replacements: Vec<Replacement>,
    #[serde(default)]
    pub output: Option<String>,
}

impl TextPatch for Retarget {
    fn is_applied(&self, content: &str) -> Result<bool, PatchError> {
        let mut applied = true;
        for r in &self.replacements {
            match text_state(content, &r.from, &r.to) {
                TextState::Applied => {}
                TextState::Pending => applied = false,
                TextState::Missing => return Err(PatchError::TextNotFound(r.from.clone())),
            }
        }
        Ok(applied)
    }

    fn apply(&self, content: &str) -> Result<String, PatchError> {
        let mut out = content.to_string();
        for r in &self.replacements {
            match text_state(&out, &r.from, &r.to) {
                TextState::Pending => {
                    let count = pending_count(&out, &r.from, &r.to);
                    debug!(from = %r.from, count, "replacing text");
                    out = replace_pending(&out, &r.from, &r.to);
                }
                TextState::Applied => debug!(to = %r.to, "replacement already present"),
                TextState::Missing => return Err(PatchError::TextNotFound(r.from.clone())),
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct XmlValue {
    pub element: String,
    pub value: String,
}

/// Set the text of the first `<element>` of each listed name. Elements the
/// manifest does not contain are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SetXmlElements {
    pub values: Vec<XmlValue>,
}

/// Byte range of the text between `<name ...>` and `</name>`.
fn element_text_range(content: &str, name: &str) -> Option<(usize, usize)> {
    let open = format!("<{name}");
    let mut from = 0;
    while let Some(found) = content[from..].find(&open) {
        let start = from + found;
        let after = start + open.len();
        match content[after..].chars().next() {
            Some('>') => {
                let text_start = after + 1;
                let end = content[text_start..].find(&format!("</{name}>"))?;
                return Some((text_start, text_start + end));
            }
            Some(c) if c.is_whitespace() => {
                let tag_end = after + content[after..].find('>')?;
                if content[..tag_end].ends_with('/') {
                    from = tag_end;
                    continue;
                }
                let text_start = tag_end + 1;
                let end = content[text_start..].find(&format!("</{name}>"))?;
                return Some((text_start, text_start + end));
            }
            _ => from = after,
        }
    }
    None
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn element_value<'a>(content: &'a str, name: &str) -> Option<&'a str> {
    element_text_range(content, name).map(|(s, e)| &content[s..e])
}

/// Replace the text of the first `<name>` element, if any.
pub fn set_element_text(content: &str, name: &str, value: &str) -> Option<String> {
    let (start, end) = element_text_range(content, name)?;
    let mut out = String::with_capacity(content.len() + value.len());
    out.push_str(&content[..start]);
    out.push_str(&escape_xml(value));
    out.push_str(&content[end..]);
    Some(out)
}

impl TextPatch for SetXmlElements {
    fn is_applied(&self, content: &str) -> Result<bool, PatchError> {
        Ok(self.values.iter().all(|v| match element_value(content, &v.element) {
            Some(current) => current == escape_xml(&v.value),
            None => true,
        }))
    }

    fn apply(&self, content: &str) -> Result<String, PatchError> {
        let mut out = content.to_string();
        for v in &self.values {
            match set_element_text(&out, &v.element, &v.value) {
                Some(next) => out = next,
                None => warn!(element = %v.element, "manifest has no such element, skipping"),
            }
        }
        Ok(out)
    }
}

/// Turn `<EnablePackageValidation>true</EnablePackageValidation>` off in
/// every project manifest under the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DisablePackageValidation {}

const PACKAGE_VALIDATION: &str = "EnablePackageValidation";

impl DisablePackageValidation {
    /// Every `*.csproj` below `root`, skipping build output and VCS folders.
    pub fn manifests(&self, root: &Path) -> Result<Vec<PathBuf>, PatchError> {
        let mut found = Vec::new();
        let walker = WalkDir::new(root).sort_by_file_name().into_iter().filter_entry(|e| {
            !(e.file_type().is_dir()
                && matches!(e.file_name().to_str(), Some("bin" | "obj" | ".git")))
        });
        for entry in walker {
            let entry = entry.map_err(|e| PatchError::Io(e.into()))?;
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "csproj")
            {
                found.push(entry.into_path());
            }
        }
        Ok(found)
    }
}

impl TextPatch for DisablePackageValidation {
    fn is_applied(&self, content: &str) -> Result<bool, PatchError> {
        Ok(element_value(content, PACKAGE_VALIDATION).is_none_or(|v| v.trim() != "true"))
    }

    fn apply(&self, content: &str) -> Result<String, PatchError> {
        if self.is_applied(content)? {
            return Ok(content.to_string());
        }
        Ok(set_element_text(content, PACKAGE_VALIDATION, "false").unwrap_or_else(|| content.to_string()))
    }
}

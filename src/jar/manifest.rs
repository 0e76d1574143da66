//! `META-INF/MANIFEST.MF` synthesis.

/// Directory holding the manifest.
pub const MANIFEST_DIR: &str = "META-INF/";

/// Reserved archive path of the manifest.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

pub const MANIFEST_VERSION: &str = "1.0";

/// Manifest lines may not exceed 72 bytes, excluding the line break.
const MAX_LINE_BYTES: usize = 72;

/// Options for [`ManifestArchive::build_manifest`](super::ManifestArchive::build_manifest).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestOptions {
    /// Emitted as `Main-Class` when set
    pub main_class: Option<String>,
}

impl ManifestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn main_class(mut self, class: impl Into<String>) -> Self {
        self.main_class = Some(class.into());
        self
    }
}

/// Render a manifest: the main section, then one section per class name.
///
/// Lines end in CRLF and sections are separated by a blank line. Per-entry
/// sections only name the entry; no digest attributes are written.
pub(crate) fn render<'a, I>(options: &ManifestOptions, class_names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    push_attribute(&mut out, "Manifest-Version", MANIFEST_VERSION);
    if let Some(main_class) = &options.main_class {
        push_attribute(&mut out, "Main-Class", main_class);
    }
    out.push_str("\r\n");

    for name in class_names {
        push_attribute(&mut out, "Name", name);
        out.push_str("\r\n");
    }
    out
}

/// Append `key: value`, folding onto continuation lines (leading space) past 72 bytes.
fn push_attribute(out: &mut String, key: &str, value: &str) {
    let line = format!("{key}: {value}");
    let mut rest = line.as_str();
    let mut limit = MAX_LINE_BYTES;

    while rest.len() > limit {
        let mut cut = limit;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        out.push_str(&rest[..cut]);
        out.push_str("\r\n ");
        rest = &rest[cut..];
        limit = MAX_LINE_BYTES - 1;
    }
    out.push_str(rest);
    out.push_str("\r\n");
}

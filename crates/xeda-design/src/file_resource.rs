use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::io;

/// An absolute path plus a lazily-computed SHA-256 content hash (spec §3).
///
/// Equality and the derived hash used for fingerprinting both incorporate
/// the content hash, not just the path: editing a source file invalidates
/// any cache keyed off it, matching `original_source/src/xeda/design.py`'s
/// `FileResource.__eq__`/`__hash__`.
#[derive(Debug, Clone)]
pub struct FileResource {
    file: Utf8PathBuf,
    content_hash: OnceCell<String>,
}

/// Serializes as the canonical path alone; the content hash is always
/// recomputed lazily on the deserializing side, since a `OnceCell` carries
/// no useful cached state across a process boundary.
impl Serialize for FileResource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.file.as_str().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FileResource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let file = Utf8PathBuf::from(String::deserialize(deserializer)?);
        Ok(Self {
            file,
            content_hash: OnceCell::new(),
        })
    }
}

impl FileResource {
    /// Resolve `path` against `root` (if relative) and canonicalize it.
    /// Fails if the file does not exist, mirroring `Path.resolve(strict=True)`.
    pub fn new(path: impl AsRef<Utf8Path>, root: &Utf8Path) -> io::Result<Self> {
        let path = path.as_ref();
        let joined = if path.is_absolute() {
            path.to_owned()
        } else {
            root.join(path)
        };
        let canonical = joined.canonicalize_utf8()?;
        Ok(Self {
            file: canonical,
            content_hash: OnceCell::new(),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.file
    }

    /// SHA-256 hex digest of the file's current contents, computed once
    /// and cached for the lifetime of this `FileResource`.
    pub fn hash(&self) -> io::Result<&str> {
        self.content_hash
            .get_or_try_init(|| {
                xeda_hash::file_content_sha256(self.file.as_std_path())
                    .map_err(|e| io::Error::other(e.to_string()))
            })
            .map(String::as_str)
    }
}

impl PartialEq for FileResource {
    fn eq(&self, other: &Self) -> bool {
        self.file == other.file && self.hash().ok() == other.hash().ok()
    }
}
impl Eq for FileResource {}

/// Design-source language kind, inferred from file extension unless given
/// explicitly (spec §3 `kind`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Vhdl,
    Verilog,
    SystemVerilog,
    Bsv,
    Bs,
    Cpp,
    Sdc,
    Xdc,
    Cocotb,
    Other,
}

impl SourceKind {
    /// Infer a kind from a file's extension, falling back to [`SourceKind::Other`].
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "vhd" | "vhdl" => SourceKind::Vhdl,
            "v" => SourceKind::Verilog,
            "sv" => SourceKind::SystemVerilog,
            "bsv" => SourceKind::Bsv,
            "bs" => SourceKind::Bs,
            "cpp" | "cc" | "cxx" => SourceKind::Cpp,
            "sdc" => SourceKind::Sdc,
            "xdc" => SourceKind::Xdc,
            "py" => SourceKind::Cocotb,
            _ => SourceKind::Other,
        }
    }
}

/// A single RTL/TB source file (spec §3): a [`FileResource`] plus language
/// metadata. Grounded on `original_source/src/xeda/design.py`'s `DesignSource`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignSource {
    pub resource: FileResource,
    pub kind: SourceKind,
    pub standard: Option<String>,
}

impl DesignSource {
    pub fn new(
        path: impl AsRef<Utf8Path>,
        root: &Utf8Path,
        kind: Option<SourceKind>,
        standard: Option<String>,
    ) -> io::Result<Self> {
        let resource = FileResource::new(path, root)?;
        let kind = kind.unwrap_or_else(|| {
            resource
                .path()
                .extension()
                .map(SourceKind::from_extension)
                .unwrap_or(SourceKind::Other)
        });
        let standard = standard.map(|s| normalize_standard(&s));
        Ok(Self {
            resource,
            kind,
            standard,
        })
    }

    pub fn path(&self) -> &Utf8Path {
        self.resource.path()
    }

    pub fn hash(&self) -> io::Result<&str> {
        self.resource.hash()
    }
}

impl PartialEq for DesignSource {
    fn eq(&self, other: &Self) -> bool {
        self.resource == other.resource
    }
}
impl Eq for DesignSource {}

/// Collapse a four-digit standard ("2008", "1993") to its two-digit form
/// ("08", "93"), matching `DesignSource.__init__`'s standard normalization.
pub fn normalize_standard(standard: &str) -> String {
    if standard.len() == 4 && (standard.starts_with("20") || standard.starts_with("19")) {
        standard[2..].to_string()
    } else {
        standard.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_kind_from_extension() {
        assert_eq!(SourceKind::from_extension("vhd"), SourceKind::Vhdl);
        assert_eq!(SourceKind::from_extension("SV"), SourceKind::SystemVerilog);
        assert_eq!(SourceKind::from_extension("unknown"), SourceKind::Other);
    }

    #[test]
    fn normalizes_four_digit_standard() {
        assert_eq!(normalize_standard("2008"), "08");
        assert_eq!(normalize_standard("1993"), "93");
        assert_eq!(normalize_standard("08"), "08");
    }

    #[test]
    fn file_resource_hash_reflects_content() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(root.join("a.vhd"), "entity a is end;").unwrap();
        let fr = FileResource::new("a.vhd", root).unwrap();
        let h1 = fr.hash().unwrap().to_string();
        std::fs::write(root.join("a.vhd"), "entity a is end; -- changed").unwrap();
        // hash is cached after first read
        assert_eq!(fr.hash().unwrap(), h1);
    }

    #[test]
    fn design_source_infers_kind_and_normalizes_standard() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(root.join("top.vhd"), "entity top is end;").unwrap();
        let src = DesignSource::new("top.vhd", root, None, Some("2008".to_string())).unwrap();
        assert_eq!(src.kind, SourceKind::Vhdl);
        assert_eq!(src.standard.as_deref(), Some("08"));
    }

    #[test]
    fn file_resource_errors_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        assert!(FileResource::new("missing.vhd", root).is_err());
    }
}

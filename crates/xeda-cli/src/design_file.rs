//! Loading Design and Xedaproject description files (spec §6). Grounded
//! on the observation that `xeda_design::Design` is already fully
//! `Deserialize` (so a design document deserializes straight into it) and
//! on `xchecker-config/src/config/discovery.rs`'s extension-dispatch idiom
//! for picking a format from a file's suffix.
//!
//! File-format readers are explicitly out of scope for the engine itself
//! (spec §1 Non-goals); this module is the CLI's own concern.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use serde_json::{Map, Value};
use xeda_design::{Design, Language, RtlSettings, TbSettings};

use crate::error::CliError;

/// Shape of a design document on disk: identical to [`Design`] plus the
/// optional `flow` table of per-flow default settings (spec §6), which is
/// not part of `Design` itself since it never participates in the design
/// fingerprint.
#[derive(Debug, Clone, Deserialize)]
struct DesignDocument {
    name: String,
    #[serde(default)]
    rtl: RtlSettings,
    #[serde(default)]
    tb: TbSettings,
    #[serde(default)]
    language: Language,
    #[serde(default)]
    flow: Map<String, Value>,
}

impl DesignDocument {
    fn into_design(self, root_path: Utf8PathBuf) -> (Design, Map<String, Value>) {
        (
            Design {
                name: self.name,
                rtl: self.rtl,
                tb: self.tb,
                language: self.language,
                root_path,
            },
            self.flow,
        )
    }
}

/// The optional aggregator file (spec §6): one or more designs plus a
/// `flows` map of flow-name → settings table shared across all of them.
#[derive(Debug, Clone)]
pub struct XedaProject {
    pub designs: Vec<(Design, Map<String, Value>)>,
    pub flows: Map<String, Value>,
}

impl XedaProject {
    /// The names of every design this project declares, in file order.
    pub fn design_names(&self) -> Vec<&str> {
        self.designs.iter().map(|(d, _)| d.name.as_str()).collect()
    }

    /// Resolve which design to operate on, matching `xedaproject.py`'s
    /// `XedaProject.get_design`: with a single design declared and no name
    /// given, that design is used regardless of its name; otherwise `name`
    /// must be given and must match exactly one design, or resolution
    /// fails listing the available names.
    pub fn resolve_design(&self, name: Option<&str>) -> Result<&(Design, Map<String, Value>), CliError> {
        match (name, self.designs.as_slice()) {
            (None, [only]) => Ok(only),
            (None, _) => Err(CliError::AmbiguousDesign {
                available: self.design_names().iter().map(ToString::to_string).collect(),
            }),
            (Some(name), _) => self.designs.iter().find(|(d, _)| d.name == name).ok_or_else(|| CliError::UnknownDesign {
                name: name.to_string(),
                available: self.design_names().iter().map(ToString::to_string).collect(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct XedaProjectDocument {
    #[serde(default)]
    designs: Vec<DesignDocument>,
    #[serde(default)]
    design: Option<DesignDocument>,
    #[serde(default)]
    flows: Map<String, Value>,
}

enum Format {
    Toml,
    Json,
    Yaml,
}

fn format_for(path: &Utf8Path) -> Result<Format, CliError> {
    match path.extension().map(str::to_ascii_lowercase).as_deref() {
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        Some("yaml" | "yml") => Ok(Format::Yaml),
        other => Err(CliError::UnsupportedExtension(
            other.unwrap_or_default().to_string(),
        )),
    }
}

fn read_document<T: for<'de> Deserialize<'de>>(path: &Utf8Path) -> Result<T, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_owned(),
        source,
    })?;
    match format_for(path)? {
        Format::Toml => toml::from_str(&text).map_err(|e| CliError::Parse {
            path: path.to_owned(),
            format: "toml",
            source: e.to_string(),
        }),
        Format::Json => serde_json::from_str(&text).map_err(|e| CliError::Parse {
            path: path.to_owned(),
            format: "json",
            source: e.to_string(),
        }),
        Format::Yaml => serde_yaml::from_str(&text).map_err(|e| CliError::Parse {
            path: path.to_owned(),
            format: "yaml",
            source: e.to_string(),
        }),
    }
}

fn root_path_for(path: &Utf8Path) -> Utf8PathBuf {
    path.parent().map(Utf8Path::to_owned).unwrap_or_else(|| Utf8PathBuf::from("."))
}

/// Load a standalone design description file (spec §6). Returns the
/// [`Design`] plus its embedded `flow.<name>` defaults table.
pub fn load_design_file(path: &Utf8Path) -> Result<(Design, Map<String, Value>), CliError> {
    let doc: DesignDocument = read_document(path)?;
    Ok(doc.into_design(root_path_for(path)))
}

/// Load an xedaproject aggregator file (spec §6).
pub fn load_xedaproject_file(path: &Utf8Path) -> Result<XedaProject, CliError> {
    let doc: XedaProjectDocument = read_document(path)?;
    let root_path = root_path_for(path);

    let mut designs: Vec<(Design, Map<String, Value>)> = doc
        .designs
        .into_iter()
        .map(|d| d.into_design(root_path.clone()))
        .collect();
    if let Some(single) = doc.design {
        designs.push(single.into_design(root_path));
    }
    if designs.is_empty() {
        return Err(CliError::NoDesignsDeclared(path.to_owned()));
    }

    Ok(XedaProject {
        designs,
        flows: doc.flows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml_design_with_embedded_flow_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(tmp.path().join("design.toml")).unwrap();
        std::fs::write(
            &path,
            r#"
            name = "mydesign"

            [flow.ghdl_sim]
            stop_time = "100us"
            "#,
        )
        .unwrap();

        let (design, flow_defaults) = load_design_file(&path).unwrap();
        assert_eq!(design.name, "mydesign");
        assert_eq!(
            flow_defaults["ghdl_sim"]["stop_time"],
            Value::String("100us".to_string())
        );
    }

    #[test]
    fn loads_json_xedaproject_with_single_design_table() {
        let tmp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(tmp.path().join("xedaproject.json")).unwrap();
        std::fs::write(
            &path,
            r#"{"design": {"name": "top"}, "flows": {"ghdl_sim": {"stop_time": "50us"}}}"#,
        )
        .unwrap();

        let project = load_xedaproject_file(&path).unwrap();
        assert_eq!(project.designs.len(), 1);
        assert_eq!(project.resolve_design(None).unwrap().0.name, "top");
        assert_eq!(
            project.flows["ghdl_sim"]["stop_time"],
            Value::String("50us".to_string())
        );
    }

    #[test]
    fn resolve_design_requires_a_name_when_ambiguous() {
        let tmp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(tmp.path().join("xedaproject.json")).unwrap();
        std::fs::write(
            &path,
            r#"{"designs": [{"name": "a"}, {"name": "b"}]}"#,
        )
        .unwrap();

        let project = load_xedaproject_file(&path).unwrap();
        assert!(matches!(
            project.resolve_design(None),
            Err(CliError::AmbiguousDesign { .. })
        ));
        assert_eq!(project.resolve_design(Some("b")).unwrap().0.name, "b");
        assert!(matches!(
            project.resolve_design(Some("c")),
            Err(CliError::UnknownDesign { .. })
        ));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(tmp.path().join("design.ini")).unwrap();
        std::fs::write(&path, "name = mydesign").unwrap();
        assert!(matches!(
            load_design_file(&path),
            Err(CliError::UnsupportedExtension(_))
        ));
    }

    #[test]
    fn xedaproject_without_any_design_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(tmp.path().join("xedaproject.toml")).unwrap();
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            load_xedaproject_file(&path),
            Err(CliError::NoDesignsDeclared(_))
        ));
    }
}

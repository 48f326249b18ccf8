use crate::clock::Clock;
use crate::file_resource::{DesignSource, SourceKind};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::io;

/// A scalar generic/define value: a plain value or a resolved file path
/// (spec §3 `parameters/generics (string→scalar|file)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum GenericValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    File(Utf8PathBuf),
}

impl GenericValue {
    fn to_json(&self) -> Value {
        match self {
            GenericValue::Bool(b) => Value::Bool(*b),
            GenericValue::Int(i) => Value::from(*i),
            GenericValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            GenericValue::Str(s) => Value::String(s.clone()),
            GenericValue::File(p) => Value::String(p.to_string()),
        }
    }
}

/// Optional cocotb sub-settings for a testbench (spec §3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocotbSettings {
    pub module: String,
    pub toplevel: String,
    pub testcase: Option<String>,
}

/// Shared shape of `rtl` and `tb` source groups (spec §3). Grounded on
/// `original_source/src/xeda/design.py`'s `DVSettings`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceGroup {
    pub sources: Vec<DesignSource>,
    /// Up to two toplevel module names (primary + optional secondary).
    pub top: Vec<String>,
    pub generics: BTreeMap<String, GenericValue>,
    pub defines: BTreeMap<String, GenericValue>,
}

impl SourceGroup {
    pub fn primary_top(&self) -> Option<&str> {
        self.top.first().map(String::as_str)
    }

    /// Canonical JSON view used for fingerprinting: file contents are
    /// represented by their content hash, never their path, so that moving
    /// a file without changing its content does not bust the cache, and
    /// editing it always does.
    fn to_fingerprint_value(&self) -> io::Result<Value> {
        let mut sources = Vec::with_capacity(self.sources.len());
        for src in &self.sources {
            sources.push(json!({
                "kind": format!("{:?}", src.kind),
                "standard": src.standard,
                "content_hash": src.hash()?,
            }));
        }
        Ok(json!({
            "sources": sources,
            "top": self.top,
            "generics": self.generics.iter().map(|(k, v)| (k.clone(), v.to_json())).collect::<BTreeMap<_, _>>(),
            "defines": self.defines.iter().map(|(k, v)| (k.clone(), v.to_json())).collect::<BTreeMap<_, _>>(),
        }))
    }
}

/// RTL-specific extension of [`SourceGroup`]: named clocks (spec §3
/// `rtl: ... primary clocks (name→port)`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RtlSettings {
    pub group: SourceGroup,
    pub clock: Clock,
    pub clocks: BTreeMap<String, Clock>,
}

/// Testbench extension of [`SourceGroup`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TbSettings {
    pub group: SourceGroup,
    pub uut: Option<String>,
    pub cocotb: Option<CocotbSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageSettings {
    pub standard: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VhdlSettings {
    pub standard: Option<String>,
    pub synopsys: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Language {
    pub vhdl: VhdlSettings,
    pub verilog: LanguageSettings,
}

/// Immutable-during-a-run hardware design description (spec §3).
///
/// Fully serializable so a [`Design`] can cross a process boundary (spec
/// §4.9's DSE worker pool hands one to each worker) without losing any
/// information needed to re-run a flow against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Design {
    pub name: String,
    pub rtl: RtlSettings,
    pub tb: TbSettings,
    pub language: Language,
    pub root_path: Utf8PathBuf,
}

impl Design {
    /// RTL + TB sources deduplicated for simulation: every RTL source plus
    /// any TB source not already present among the RTL sources, restricted
    /// to HDL file kinds. Grounded on `design.py::Design.sim_sources`.
    pub fn sim_sources(&self) -> Vec<&DesignSource> {
        let mut out: Vec<&DesignSource> = self.rtl.group.sources.iter().collect();
        for tb_src in &self.tb.group.sources {
            let is_hdl = matches!(tb_src.kind, SourceKind::Vhdl | SourceKind::Verilog);
            let already_present = self.rtl.group.sources.iter().any(|r| r == tb_src);
            if is_hdl && !already_present {
                out.push(tb_src);
            }
        }
        out
    }

    /// Effective simulation toplevel(s): the RTL top when the testbench is
    /// cocotb-based and an RTL top exists, otherwise the TB's own top.
    /// Grounded on `design.py::Design.sim_tops`.
    pub fn sim_tops(&self) -> &[String] {
        if self.tb.cocotb.is_some() && !self.rtl.group.top.is_empty() {
            &self.rtl.group.top
        } else {
            &self.tb.group.top
        }
    }

    /// Hash of the RTL source group's canonical, content-hash-substituted
    /// representation (spec §3 `design_hash` depends on this).
    pub fn rtl_hash(&self) -> io::Result<String> {
        let value = self.rtl.group.to_fingerprint_value()?;
        xeda_hash::fingerprint(&value).map_err(|e| io::Error::other(e.to_string()))
    }

    /// Hash of the TB source group, mirroring [`Design::rtl_hash`].
    pub fn tb_hash(&self) -> io::Result<String> {
        let value = self.tb.group.to_fingerprint_value()?;
        xeda_hash::fingerprint(&value).map_err(|e| io::Error::other(e.to_string()))
    }

    /// `design_hash` proper: `semantic_hash({rtl_hash, tb_hash})`, matching
    /// `default_runner.py::_launch_flow`'s `design_hash` computation exactly.
    pub fn design_hash(&self) -> io::Result<String> {
        let value = json!({
            "rtl_hash": self.rtl_hash()?,
            "tb_hash": self.tb_hash()?,
        });
        xeda_hash::fingerprint(&value).map_err(|e| io::Error::other(e.to_string()))
    }

    /// Hash of just the RTL source files' content hashes, in declaration
    /// order (spec §11 supplement): a narrower fingerprint than
    /// `rtl_hash`, used only for the `rtl_fingerprint` field recorded in
    /// `settings.json`.
    pub fn rtl_fingerprint(&self) -> io::Result<String> {
        let mut hashes = Vec::with_capacity(self.rtl.group.sources.len());
        for src in &self.rtl.group.sources {
            hashes.push(src.hash()?.to_string());
        }
        xeda_hash::fingerprint(&hashes).map_err(|e| io::Error::other(e.to_string()))
    }

    /// A JSON snapshot of the design suitable for embedding in
    /// `settings.json` (spec §6): everything needed to recognize this
    /// design on a later run, with file contents represented by their
    /// hash rather than their (possibly-moved) path.
    pub fn to_settings_json(&self) -> io::Result<Value> {
        Ok(json!({
            "name": self.name,
            "rtl": self.rtl.group.to_fingerprint_value()?,
            "tb": self.tb.group.to_fingerprint_value()?,
            "root_path": self.root_path.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn make_source(root: &Utf8Path, name: &str, kind: SourceKind) -> DesignSource {
        std::fs::write(root.join(name), format!("-- {name}")).unwrap();
        DesignSource::new(name, root, Some(kind), None).unwrap()
    }

    fn sample_design(root: &Utf8Path) -> Design {
        let rtl_src = make_source(root, "top.vhd", SourceKind::Vhdl);
        let tb_src = make_source(root, "tb.vhd", SourceKind::Vhdl);
        Design {
            name: "mydesign".to_string(),
            rtl: RtlSettings {
                group: SourceGroup {
                    sources: vec![rtl_src],
                    top: vec!["top".to_string()],
                    ..Default::default()
                },
                clock: Clock { port: Some("clk".to_string()) },
                clocks: BTreeMap::new(),
            },
            tb: TbSettings {
                group: SourceGroup {
                    sources: vec![tb_src],
                    top: vec!["tb_top".to_string()],
                    ..Default::default()
                },
                uut: None,
                cocotb: None,
            },
            language: Language::default(),
            root_path: Utf8PathBuf::from(root),
        }
    }

    #[test]
    fn sim_sources_includes_tb_sources_not_in_rtl() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let design = sample_design(root);
        let sim = design.sim_sources();
        assert_eq!(sim.len(), 2);
    }

    #[test]
    fn sim_tops_uses_tb_top_when_not_cocotb() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let design = sample_design(root);
        assert_eq!(design.sim_tops(), &["tb_top".to_string()]);
    }

    #[test]
    fn sim_tops_uses_rtl_top_when_cocotb() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let mut design = sample_design(root);
        design.tb.cocotb = Some(CocotbSettings {
            module: "tb".to_string(),
            toplevel: "top".to_string(),
            testcase: None,
        });
        assert_eq!(design.sim_tops(), &["top".to_string()]);
    }

    #[test]
    fn design_hash_is_deterministic_and_sensitive_to_content() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let design = sample_design(root);
        let h1 = design.design_hash().unwrap();
        let h2 = design.design_hash().unwrap();
        assert_eq!(h1, h2);

        let mut design2 = sample_design(root);
        std::fs::write(root.join("top.vhd"), "-- edited").unwrap();
        design2.rtl.group.sources[0] =
            DesignSource::new("top.vhd", root, Some(SourceKind::Vhdl), None).unwrap();
        let h3 = design2.design_hash().unwrap();
        assert_ne!(h1, h3);
    }

    #[test]
    fn design_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let design = sample_design(root);
        let json = serde_json::to_string(&design).unwrap();
        let restored: Design = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.name, design.name);
        assert_eq!(restored.rtl.group.top, design.rtl.group.top);
        assert_eq!(restored.design_hash().unwrap(), design.design_hash().unwrap());
    }

    #[test]
    fn rtl_fingerprint_depends_only_on_rtl_sources() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let design = sample_design(root);
        let fp1 = design.rtl_fingerprint().unwrap();
        let mut design2 = sample_design(root);
        std::fs::write(root.join("tb.vhd"), "-- tb changed").unwrap();
        design2.tb.group.sources[0] =
            DesignSource::new("tb.vhd", root, Some(SourceKind::Vhdl), None).unwrap();
        let fp2 = design2.rtl_fingerprint().unwrap();
        assert_eq!(fp1, fp2, "rtl_fingerprint must not depend on tb sources");
    }
}

use once_cell::sync::Lazy;
use regex::Regex;

/// A target FPGA device, derived from a free-form part string (spec §3).
/// Any field is left `None` if inference fails; the caller gets back what
/// could be determined rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fpga {
    pub part: String,
    pub vendor: Option<String>,
    pub family: Option<String>,
    pub device: Option<String>,
    pub speed: Option<String>,
    pub package: Option<String>,
    pub pins: Option<String>,
    pub grade: Option<String>,
    pub capacity: Option<String>,
}

// Xilinx 7-series / UltraScale(+): e.g. xc7a35tcsg324-1, xcku040-ffva1156-2-e,
// xczu9eg-ffvb1156-2-e
static XILINX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        ^(?P<vendor>xc)
         (?P<family>7[akvz]|ku|kus|zu|au)
         (?P<device>[0-9]+[a-z]*)
         -?
         (?P<package>[a-z]+)?
         (?P<pins>[0-9]+)?
         -?
         (?P<speed>[0-9])?
         -?
         (?P<grade>[a-z])?
        $",
    )
    .unwrap()
});

// Lattice ECP5: e.g. LFE5U-25F-6BG381C, LFE5UM-85F-8BG756I
static LATTICE_ECP5_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        ^(?P<family>LFE5U[M]?)
         -
         (?P<capacity>[0-9]+)
         F
         -
         (?P<speed>[0-9])
         (?P<package>[A-Z]+[0-9]+)
         (?P<grade>[A-Z])?
        $",
    )
    .unwrap()
});

impl Fpga {
    /// Attempt to recognise `part` as a Xilinx 7-series/UltraScale(+) or
    /// Lattice ECP5 part number. Unrecognised parts still produce an
    /// `Fpga` (with only `part` set) rather than an error.
    pub fn parse(part: &str) -> Self {
        if let Some(caps) = XILINX_RE.captures(part) {
            let family = match &caps["family"] {
                f if f.eq_ignore_ascii_case("7a") => "artix-7",
                f if f.eq_ignore_ascii_case("7k") => "kintex-7",
                f if f.eq_ignore_ascii_case("7v") => "virtex-7",
                f if f.eq_ignore_ascii_case("7z") => "zynq-7000",
                f if f.eq_ignore_ascii_case("ku") => "kintex-ultrascale",
                f if f.eq_ignore_ascii_case("kus") => "kintex-ultrascale+",
                f if f.eq_ignore_ascii_case("zu") => "zynq-ultrascale+",
                f if f.eq_ignore_ascii_case("au") => "artix-ultrascale+",
                other => other,
            };
            return Self {
                part: part.to_string(),
                vendor: Some("xilinx".to_string()),
                family: Some(family.to_string()),
                device: Some(caps["device"].to_string()),
                speed: caps.name("speed").map(|m| m.as_str().to_string()),
                package: caps.name("package").map(|m| m.as_str().to_string()),
                pins: caps.name("pins").map(|m| m.as_str().to_string()),
                grade: caps.name("grade").map(|m| m.as_str().to_string()),
                capacity: None,
            };
        }
        if let Some(caps) = LATTICE_ECP5_RE.captures(part) {
            return Self {
                part: part.to_string(),
                vendor: Some("lattice".to_string()),
                family: Some(caps["family"].to_string()),
                device: None,
                speed: Some(caps["speed"].to_string()),
                package: Some(caps["package"].to_string()),
                pins: None,
                grade: caps.name("grade").map(|m| m.as_str().to_string()),
                capacity: Some(caps["capacity"].to_string()),
            };
        }
        Self {
            part: part.to_string(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_xilinx_artix7() {
        let fpga = Fpga::parse("xc7a35tcsg324-1");
        assert_eq!(fpga.vendor.as_deref(), Some("xilinx"));
        assert_eq!(fpga.family.as_deref(), Some("artix-7"));
        assert_eq!(fpga.device.as_deref(), Some("35t"));
        assert_eq!(fpga.package.as_deref(), Some("csg"));
        assert_eq!(fpga.pins.as_deref(), Some("324"));
        assert_eq!(fpga.speed.as_deref(), Some("1"));
    }

    #[test]
    fn parses_zynq_ultrascale_plus() {
        let fpga = Fpga::parse("xczu9eg-ffvb1156-2-e");
        assert_eq!(fpga.vendor.as_deref(), Some("xilinx"));
        assert_eq!(fpga.family.as_deref(), Some("zynq-ultrascale+"));
        assert_eq!(fpga.grade.as_deref(), Some("e"));
    }

    #[test]
    fn parses_lattice_ecp5() {
        let fpga = Fpga::parse("LFE5U-25F-6BG381C");
        assert_eq!(fpga.vendor.as_deref(), Some("lattice"));
        assert_eq!(fpga.capacity.as_deref(), Some("25"));
        assert_eq!(fpga.speed.as_deref(), Some("6"));
        assert_eq!(fpga.package.as_deref(), Some("BG381"));
        assert_eq!(fpga.grade.as_deref(), Some("C"));
    }

    #[test]
    fn unrecognised_part_keeps_only_part_string() {
        let fpga = Fpga::parse("some-unknown-chip-42");
        assert_eq!(fpga.part, "some-unknown-chip-42");
        assert!(fpga.vendor.is_none());
    }
}

//! The design data model: sources, clocks, FPGA targets and the
//! fingerprints derived from them (spec §3).
//!
//! Grounded on `original_source/src/xeda/design.py` for the original
//! shape (`FileResource`, `DesignSource`, `DVSettings`, `RtlSettings`,
//! `Clock`); `PhysicalClock` and `Fpga` are richer than the original and
//! implemented directly from the specification, in the idiom of the
//! teacher's validated-record types (`xchecker-engine/src/packet/model.rs`).

mod clock;
mod design;
mod error;
mod file_resource;
mod fpga;

pub use clock::{Clock, ClockError, PhysicalClock};
pub use design::{
    CocotbSettings, Design, GenericValue, Language, LanguageSettings, RtlSettings, SourceGroup,
    TbSettings, VhdlSettings,
};
pub use error::{DesignErrorEntry, DesignValidationError};
pub use file_resource::{normalize_standard, DesignSource, FileResource, SourceKind};
pub use fpga::Fpga;

//! Vowel classes and the per-vowel stage machine.
//!
//! [`Vowel`] enumerates the calibration targets together with the prompt
//! each one is synthesized from.  [`VowelStage`] tracks how far a single
//! vowel has progressed through the runner.

use std::fmt;

// ---------------------------------------------------------------------------
// Vowel
// ---------------------------------------------------------------------------

/// Calibration vowel classes, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Vowel {
    Ah,
    Ee,
    Oo,
}

impl Vowel {
    /// Every vowel, in the order the runner processes them.
    pub const ALL: [Vowel; 3] = [Vowel::Ah, Vowel::Ee, Vowel::Oo];

    /// Upper-case name used for file names and report keys.
    pub fn name(&self) -> &'static str {
        match self {
            Vowel::Ah => "AH",
            Vowel::Ee => "EE",
            Vowel::Oo => "OO",
        }
    }

    /// Output file name, e.g. `AH.wav`.
    pub fn file_name(&self) -> String {
        format!("{}.wav", self.name())
    }

    /// Sentences dense in this vowel.  The engine produces natural speech,
    /// not sustained tones, so several sentences give the region selector
    /// more material to choose from.
    pub fn prompt(&self) -> &'static str {
        match self {
            Vowel::Ah => concat!(
                "The father called from afar across the calm dark garden. ",
                "His heart was large and his arms were sharp and strong. ",
                "The stars are bright above the barn on father's farm."
            ),
            Vowel::Ee => concat!(
                "She could see the green field clearly in her dream. ",
                "The breeze was easy and the trees leaned peacefully. ",
                "We believe in freedom and keeping the streets clean and free."
            ),
            Vowel::Oo => concat!(
                "The moon shone through the cool smooth pool of blue. ",
                "She knew the truth would bloom soon in the room. ",
                "A spoon was used to scoop the food into the groove."
            ),
        }
    }
}

impl fmt::Display for Vowel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// VowelStage
// ---------------------------------------------------------------------------

/// Progress of one vowel through the runner.
///
/// ```text
/// PromptReady ──synthesize──▶ Synthesized
///             ──select──────▶ RegionSelected
///             ──assemble────▶ Assembled
///             ──write───────▶ Written
/// ```
///
/// Any failure aborts the whole run; there is no error stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VowelStage {
    /// Prompt chosen, nothing synthesized yet.
    #[default]
    PromptReady,
    /// Engine returned a long-enough buffer.
    Synthesized,
    /// Stable region and its statistics are known.
    RegionSelected,
    /// Fixed-length output buffer is built.
    Assembled,
    /// WAV file is on disk and the report entry recorded.
    Written,
}

impl VowelStage {
    /// The stage that follows this one, `None` after [`VowelStage::Written`].
    ///
    /// ```
    /// use vowel_calib::pipeline::VowelStage;
    ///
    /// assert_eq!(VowelStage::PromptReady.next(), Some(VowelStage::Synthesized));
    /// assert_eq!(VowelStage::Written.next(), None);
    /// ```
    pub fn next(&self) -> Option<VowelStage> {
        match self {
            VowelStage::PromptReady => Some(VowelStage::Synthesized),
            VowelStage::Synthesized => Some(VowelStage::RegionSelected),
            VowelStage::RegionSelected => Some(VowelStage::Assembled),
            VowelStage::Assembled => Some(VowelStage::Written),
            VowelStage::Written => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self == VowelStage::Written
    }

    /// A short human-readable label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            VowelStage::PromptReady => "PromptReady",
            VowelStage::Synthesized => "Synthesized",
            VowelStage::RegionSelected => "RegionSelected",
            VowelStage::Assembled => "Assembled",
            VowelStage::Written => "Written",
        }
    }
}

impl fmt::Display for VowelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

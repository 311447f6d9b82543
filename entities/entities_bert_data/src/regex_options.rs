//! Regex Options Module
//!
//! Provides the option-name to bitmask table used by `{bert, regex, Source, Options}`.
//!
//! Bit values follow the PCRE compile option layout so the resolved mask can be
//! handed to a PCRE-compatible engine unchanged. Newline handling is not a single
//! flag but a 3-bit field selected by `{newline, Mode}` option tuples.

use bitflags::bitflags;

bitflags! {
    /// Bitmask of regex compile options
    ///
    /// The newline field is not a set of flags; it is read and written through
    /// [`NewlineMode`] and kept as retained bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RegexOptions: u32 {
        const CASELESS = 0x0000_0001;
        const MULTILINE = 0x0000_0002;
        const DOTALL = 0x0000_0004;
        const EXTENDED = 0x0000_0008;
        const ANCHORED = 0x0000_0010;
        const DOLLAR_ENDONLY = 0x0000_0020;
        const UNGREEDY = 0x0000_0200;
        const UNICODE = 0x0000_0800;
        const NO_AUTO_CAPTURE = 0x0000_1000;
        const FIRSTLINE = 0x0004_0000;
        const DUPNAMES = 0x0008_0000;
        const BSR_ANYCRLF = 0x0080_0000;
        const BSR_UNICODE = 0x0100_0000;
    }
}

impl RegexOptions {
    /// Bits occupied by the newline mode field
    pub const NEWLINE_MASK: u32 = 0x0070_0000;

    /// Named flags, in the order the encoder emits them
    const NAMED: [(&'static str, RegexOptions); 13] = [
        ("unicode", Self::UNICODE),
        ("anchored", Self::ANCHORED),
        ("caseless", Self::CASELESS),
        ("dollar_endonly", Self::DOLLAR_ENDONLY),
        ("dotall", Self::DOTALL),
        ("extended", Self::EXTENDED),
        ("firstline", Self::FIRSTLINE),
        ("multiline", Self::MULTILINE),
        ("no_auto_capture", Self::NO_AUTO_CAPTURE),
        ("dupnames", Self::DUPNAMES),
        ("ungreedy", Self::UNGREEDY),
        ("bsr_anycrlf", Self::BSR_ANYCRLF),
        ("bsr_unicode", Self::BSR_UNICODE),
    ];

    /// Newline mode selected by the newline field, if any
    ///
    /// Returns `Err(bits)` when the field holds a combination that names no mode.
    pub fn newline(self) -> Result<Option<NewlineMode>, u32> {
        let field = self.bits() & Self::NEWLINE_MASK;
        if field == 0 {
            return Ok(None);
        }
        NewlineMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.mask().bits() == field)
            .map(Some)
            .ok_or(field)
    }

    /// Names of the set flags, excluding the newline field
    ///
    /// Returns `Err(bits)` with the leftover bits if any set bit has no name.
    pub fn flag_names(self) -> Result<Vec<&'static str>, u32> {
        let unknown = self.bits() & !Self::NEWLINE_MASK & !Self::all().bits();
        if unknown != 0 {
            return Err(unknown);
        }
        Ok(Self::NAMED
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
            .collect())
    }
}

/// Look up the bitmask for a plain option atom such as `caseless`
pub fn option_mask(name: &[u8]) -> Option<RegexOptions> {
    RegexOptions::NAMED
        .iter()
        .find(|(n, _)| n.as_bytes() == name)
        .map(|(_, flag)| *flag)
}

/// Newline convention selected by a `{newline, Mode}` option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NewlineMode {
    Cr,
    Lf,
    Crlf,
    AnyCrlf,
    Any,
}

impl NewlineMode {
    pub const ALL: [NewlineMode; 5] = [
        NewlineMode::Cr,
        NewlineMode::Lf,
        NewlineMode::Crlf,
        NewlineMode::AnyCrlf,
        NewlineMode::Any,
    ];

    /// Parse the mode atom of a `{newline, Mode}` tuple
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"cr" => Some(NewlineMode::Cr),
            b"lf" => Some(NewlineMode::Lf),
            b"crlf" => Some(NewlineMode::Crlf),
            b"anycrlf" => Some(NewlineMode::AnyCrlf),
            b"any" => Some(NewlineMode::Any),
            _ => None,
        }
    }

    /// Atom name of the mode
    pub fn name(self) -> &'static str {
        match self {
            NewlineMode::Cr => "cr",
            NewlineMode::Lf => "lf",
            NewlineMode::Crlf => "crlf",
            NewlineMode::AnyCrlf => "anycrlf",
            NewlineMode::Any => "any",
        }
    }

    /// Bits this mode sets in the newline field
    pub fn mask(self) -> RegexOptions {
        match self {
            NewlineMode::Cr => RegexOptions::from_bits_retain(0x0010_0000),
            NewlineMode::Lf => RegexOptions::from_bits_retain(0x0020_0000),
            NewlineMode::Crlf => RegexOptions::from_bits_retain(0x0030_0000),
            NewlineMode::Any => RegexOptions::from_bits_retain(0x0040_0000),
            NewlineMode::AnyCrlf => RegexOptions::from_bits_retain(0x0050_0000),
        }
    }
}

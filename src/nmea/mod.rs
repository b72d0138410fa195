use tinyvec::ArrayVec;

pub mod fields;
pub mod parser;

pub use fields::{rules_for, Rule};
pub use parser::NmeaParser;

/// Longest sentence handled, including `$` and the CR LF trailer. Receivers in
/// the wild overrun the nominal 82 bytes, GGA reaching 86.
pub const NMEA_BUF_SIZE: usize = 90;

pub const DOLLAR: u8 = b'$';
pub const COMMA: u8 = b',';
pub const ASTERISK: u8 = b'*';
pub const CR: u8 = b'\r';
pub const LF: u8 = b'\n';

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Offset of the three character sentence code: `$` and a two character talker.
const TYPE_OFFSET: usize = 3;

/// Fixed-capacity sentence storage with the write cursor at `len()`.
#[derive(Default, Debug, Copy, Clone, PartialEq)]
pub struct NmeaBuf(pub ArrayVec<[u8; NMEA_BUF_SIZE]>);

#[cfg(feature = "defmt")]
impl defmt::Format for NmeaBuf {
    fn format(&self, fmt: defmt::Formatter) {
        match core::str::from_utf8(self.0.as_slice()) {
            Ok(s) => defmt::write!(fmt, "{=str}", s),
            Err(_) => defmt::write!(fmt, "{=[u8]}", self.0.as_slice()),
        }
    }
}

impl core::ops::Deref for NmeaBuf {
    type Target = ArrayVec<[u8; NMEA_BUF_SIZE]>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl core::ops::DerefMut for NmeaBuf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl NmeaBuf {
    pub fn new() -> Self {
        Self(ArrayVec::new())
    }

    pub fn is_full(&self) -> bool {
        self.0.len() == NMEA_BUF_SIZE
    }

    pub fn push_byte(&mut self, b: u8) -> Result<(), Discard> {
        match self.0.try_push(b) {
            None => Ok(()),
            Some(_) => Err(Discard::Overflow),
        }
    }

    /// Inserts `count` copies of `fill` at `at`, shifting the tail right.
    pub fn pad_at(&mut self, at: usize, count: usize, fill: u8) -> Result<(), Discard> {
        let len = self.0.len();
        if at > len || len + count > NMEA_BUF_SIZE {
            return Err(Discard::Overflow);
        }
        self.0.resize(len + count, fill);
        self.0[at..].rotate_right(count);
        Ok(())
    }

    /// Removes `count` bytes starting at `at`, shifting the tail left.
    pub fn cut_at(&mut self, at: usize, count: usize) {
        let end = (at + count).min(self.0.len());
        if at < end {
            self.0.drain(at..end).for_each(|_| ());
        }
    }

    /// Appends `count` copies of `fill`.
    pub fn pad_end(&mut self, count: usize, fill: u8) -> Result<(), Discard> {
        let len = self.0.len();
        self.pad_at(len, count, fill)
    }

    /// Sentence code of field 0, if enough of it has been received.
    pub fn sentence_code(&self) -> Option<&[u8]> {
        self.0.get(TYPE_OFFSET..TYPE_OFFSET + 3)
    }

    /// Checksum over everything between the leading `$` and the trailing `*`.
    /// Only meaningful once the `*` has been appended.
    pub fn body_checksum(&self) -> NmeaChecksum {
        match self.0.len() {
            0..=2 => NmeaChecksum::new(),
            len => NmeaChecksum::of(&self.0[1..len - 1]),
        }
    }
}

/// XOR fold over the sentence body.
#[derive(Default, Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NmeaChecksum(pub u8);

impl NmeaChecksum {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn next(self, byte: u8) -> Self {
        Self(self.0 ^ byte)
    }

    pub fn of(bytes: &[u8]) -> Self {
        bytes.iter().fold(Self::new(), |ck, &b| ck.next(b))
    }

    /// Upper case hex digits, high nibble first.
    pub fn to_hex(self) -> [u8; 2] {
        [
            HEX_DIGITS[(self.0 >> 4) as usize],
            HEX_DIGITS[(self.0 & 0x0f) as usize],
        ]
    }
}

impl PartialEq<u8> for NmeaChecksum {
    fn eq(&self, other: &u8) -> bool {
        self.0 == *other
    }
}

/// Value of one checksum digit. Letters sit 7 above `9` + 1 in ASCII, so
/// anything with bit 6 set is moved down before masking; lower case letters
/// land on the same nibble as upper case ones.
pub fn hex_nibble(b: u8) -> u8 {
    let b = if b & 0x40 != 0 { b.wrapping_sub(0x07) } else { b };
    b & 0x0f
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SentenceType {
    Unknown,
    Gga,
    Rmc,
    Zda,
}

impl SentenceType {
    pub fn from_code(code: &[u8]) -> Self {
        match code {
            b"GGA" => SentenceType::Gga,
            b"RMC" => SentenceType::Rmc,
            b"ZDA" => SentenceType::Zda,
            _ => SentenceType::Unknown,
        }
    }
}

/// Why a sentence was dropped instead of forwarded.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Discard {
    #[error("sentence restarted by `$` before it was complete")]
    StrayStart,
    #[error("sentence does not fit in {} bytes", NMEA_BUF_SIZE)]
    Overflow,
    #[error("sentence type is not GGA, RMC or ZDA")]
    UnknownSentence,
    #[error("required field {0} is empty")]
    EmptyField(u8),
    #[error("unexpected `{0}` in checksum")]
    StrayDelimiter(u8),
    #[error("checksum has {0} digits, expected 2")]
    MalformedChecksum(u8),
    #[error("checksum mismatch: computed {expect:02X}, received {saw:02X}")]
    BadChecksum { expect: u8, saw: u8 },
    #[error("line feed without a preceding carriage return")]
    MissingCr,
    #[error("carriage return not followed by a line feed")]
    MissingLf,
}

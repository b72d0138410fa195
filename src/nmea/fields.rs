//! Field normalization table.
//!
//! Target layout, field by field (field 0 is the sentence identifier):
//!
//! ```text
//! GGA: $GPGGA,hhmmss.sss,ddmm.ssss,N,dddmm.ssss,E,q,ss,dd.d,aaaaa.a,M,gggg.g,M,aaa.a,iiii*CS
//! RMC: $GPRMC,hhmmss.sss,A,ddmm.ssss,N,dddmm.ssss,E,ssss.ss,ddd.dd,ddmmyy,...*CS
//! ZDA: $GPZDA,hhmmss.sss,dd,mm,yyyy,,*CS
//! ```

use super::{Discard, NmeaBuf, SentenceType};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rule {
    PassThrough,
    /// Unsigned integer, left padded with zeros or trimmed from the left.
    FixedInteger { width: u8 },
    /// `<int>.<frac>`: the integer part is padded/trimmed on the left, the
    /// fraction padded/truncated on the right.
    FixedDecimal { int: u8, frac: u8 },
    DefaultIfEmpty(u8),
    /// An empty field drops the whole sentence.
    RejectIfEmpty,
}
use Rule::*;

const PASS: &[Rule] = &[PassThrough];
const TIME: &[Rule] = &[RejectIfEmpty, FixedDecimal { int: 6, frac: 3 }];
const LATITUDE: &[Rule] = &[FixedDecimal { int: 4, frac: 4 }];
const NORTH: &[Rule] = &[DefaultIfEmpty(b'N')];
const LONGITUDE: &[Rule] = &[FixedDecimal { int: 5, frac: 4 }];
const EAST: &[Rule] = &[DefaultIfEmpty(b'E')];
const METERS: &[Rule] = &[DefaultIfEmpty(b'M')];

/// Rules for closing `field` of a `kind` sentence, applied in order. Field 0
/// is never transformed; it only selects the sentence type.
pub fn rules_for(kind: SentenceType, field: u8) -> &'static [Rule] {
    use SentenceType::*;

    match (kind, field) {
        (Gga | Rmc | Zda, 1) => TIME,

        (Gga, 2) => LATITUDE,
        (Gga, 3) => NORTH,
        (Gga, 4) => LONGITUDE,
        (Gga, 5) => EAST,
        (Gga, 7) => &[FixedInteger { width: 2 }],
        (Gga, 8) => &[FixedDecimal { int: 2, frac: 1 }],
        (Gga, 9) => &[FixedDecimal { int: 5, frac: 1 }],
        (Gga, 10) => METERS,
        (Gga, 11) => &[FixedDecimal { int: 4, frac: 1 }],
        (Gga, 12) => METERS,
        (Gga, 13) => &[FixedDecimal { int: 3, frac: 1 }],
        (Gga, 14) => &[FixedInteger { width: 4 }],

        (Rmc, 3) => LATITUDE,
        (Rmc, 4) => NORTH,
        (Rmc, 5) => LONGITUDE,
        (Rmc, 6) => EAST,
        (Rmc, 7) => &[FixedDecimal { int: 4, frac: 2 }],
        (Rmc, 8) => &[FixedDecimal { int: 3, frac: 2 }],

        _ => PASS,
    }
}

impl Rule {
    /// Applies the rule to the field occupying `buf[start..]`, i.e. the bytes
    /// received since the last delimiter. `field` is only used for reporting.
    pub fn apply(self, buf: &mut NmeaBuf, start: usize, field: u8) -> Result<(), Discard> {
        let empty = buf.len() == start;
        match self {
            PassThrough => Ok(()),
            RejectIfEmpty if empty => Err(Discard::EmptyField(field)),
            RejectIfEmpty => Ok(()),
            DefaultIfEmpty(literal) if empty => buf.push_byte(literal),
            DefaultIfEmpty(_) => Ok(()),
            FixedInteger { width } => {
                let len = buf.len() - start;
                fit_left(buf, start, len, width as usize)
            }
            FixedDecimal { int, frac } => fix_decimal(buf, start, int as usize, frac as usize),
        }
    }
}

/// Resizes the `len` bytes at `start` to `width`. Shrinking drops the leading,
/// most significant, characters: a value wider than its slot comes out wrong
/// rather than rejected. No receiver we have seen produces one.
fn fit_left(buf: &mut NmeaBuf, start: usize, len: usize, width: usize) -> Result<(), Discard> {
    if len < width {
        buf.pad_at(start, width - len, b'0')
    } else {
        buf.cut_at(start, len - width);
        Ok(())
    }
}

fn fix_decimal(buf: &mut NmeaBuf, start: usize, int: usize, frac: usize) -> Result<(), Discard> {
    let int_len = match buf[start..].iter().position(|&b| b == b'.') {
        Some(p) => p,
        None => {
            // Covers the empty field too
            let p = buf.len() - start;
            buf.push_byte(b'.')?;
            p
        }
    };
    fit_left(buf, start, int_len, int)?;

    let frac_start = start + int + 1;
    let frac_len = buf.len() - frac_start;
    if frac_len < frac {
        buf.pad_end(frac - frac_len, b'0')
    } else {
        buf.truncate(frac_start + frac);
        Ok(())
    }
}

use super::{
    hex_nibble, rules_for, Discard, NmeaBuf, NmeaChecksum, SentenceType, ASTERISK, COMMA, CR,
    DOLLAR, LF,
};
use crate::status::Lamps;

// States are named for the portion of the sentence currently being received
#[derive(Copy, Clone, Debug, PartialEq)]
enum ParserState {
    Idle,
    Body {
        kind: SentenceType,
        field: u8,
        field_len: usize,
        checksum: NmeaChecksum,
    },
    Checksum {
        kind: SentenceType,
        expect: NmeaChecksum,
        found: u8,
        digits: u8,
    },
    // CR seen and checksum rewritten, waiting for LF
    LineEnd {
        kind: SentenceType,
    },
    // Complete sentence held until the transmitter takes it
    Pending {
        kind: SentenceType,
    },
}
use ParserState::*;

/// Reassembles one sentence at a time, normalizing each field as its
/// delimiter arrives so the buffer always holds the outgoing form.
pub struct NmeaParser {
    state: ParserState,
    buf: NmeaBuf,
    lamps: Lamps,
}

impl Default for NmeaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl NmeaParser {
    pub fn new() -> Self {
        Self {
            state: Idle,
            buf: NmeaBuf::new(),
            lamps: Lamps::default(),
        }
    }

    /// Feeds one received byte.
    ///
    /// Returns `Some(Ok(kind))` when a sentence has been completed; it then
    /// stays available from [`sentence`](Self::sentence) and every further
    /// byte is ignored until [`release`](Self::release) is called. Returns
    /// `Some(Err(_))` when the sentence in progress was thrown away.
    pub fn process_byte(&mut self, b: u8) -> Option<Result<SentenceType, Discard>> {
        match self.feed(b) {
            Ok(None) => None,
            Ok(Some(kind)) => Some(Ok(kind)),
            Err(e) => {
                self.reset();
                // The `$` that broke the last sentence starts the next one
                if e == Discard::StrayStart {
                    self.start();
                }
                Some(Err(e))
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, Pending { .. })
    }

    /// The completed sentence waiting for the transmitter, if any.
    pub fn sentence(&self) -> Option<&NmeaBuf> {
        match self.state {
            Pending { .. } => Some(&self.buf),
            _ => None,
        }
    }

    /// Drops the pending sentence and goes back to waiting for `$`.
    pub fn release(&mut self) {
        self.reset();
    }

    /// Fix indications gathered since they were last cleared.
    pub fn lamps(&self) -> Lamps {
        self.lamps
    }

    pub fn clear_lamps(&mut self) {
        self.lamps.clear();
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.state = Idle;
    }

    fn start(&mut self) {
        self.buf.clear();
        let _ = self.buf.push_byte(DOLLAR);
        self.state = Body {
            kind: SentenceType::Unknown,
            field: 0,
            field_len: 0,
            checksum: NmeaChecksum::new(),
        };
    }

    fn feed(&mut self, b: u8) -> Result<Option<SentenceType>, Discard> {
        match self.state {
            Idle => {
                if b == DOLLAR {
                    self.start();
                }
                Ok(None)
            }
            Body {
                kind,
                field,
                field_len,
                checksum,
            } => {
                if b == DOLLAR {
                    return Err(Discard::StrayStart);
                }
                if self.buf.is_full() {
                    return Err(Discard::Overflow);
                }

                let (kind, field, field_len) = if b == COMMA || b == ASTERISK {
                    (self.close_field(kind, field, field_len)?, field + 1, 0)
                } else {
                    (kind, field, field_len + 1)
                };
                self.buf.push_byte(b)?;

                // The asterisk itself is not part of the checksum
                self.state = if b == ASTERISK {
                    Checksum {
                        kind,
                        expect: checksum,
                        found: 0,
                        digits: 0,
                    }
                } else {
                    Body {
                        kind,
                        field,
                        field_len,
                        checksum: checksum.next(b),
                    }
                };
                Ok(None)
            }
            Checksum {
                kind,
                expect,
                found,
                digits,
            } => match b {
                DOLLAR => Err(Discard::StrayStart),
                ASTERISK => Err(Discard::StrayDelimiter(b)),
                _ if self.buf.is_full() => Err(Discard::Overflow),
                CR => {
                    if digits != 2 {
                        return Err(Discard::MalformedChecksum(digits));
                    }
                    if expect != found {
                        return Err(Discard::BadChecksum {
                            expect: expect.0,
                            saw: found,
                        });
                    }
                    // Fields may have changed size, so checksum what goes out
                    for digit in self.buf.body_checksum().to_hex() {
                        self.buf.push_byte(digit)?;
                    }
                    self.buf.push_byte(CR)?;
                    self.state = LineEnd { kind };
                    Ok(None)
                }
                LF => Err(Discard::MissingCr),
                _ => {
                    self.state = Checksum {
                        kind,
                        expect,
                        found: (found << 4) | hex_nibble(b),
                        digits: digits.saturating_add(1),
                    };
                    Ok(None)
                }
            },
            LineEnd { kind } => match b {
                LF => {
                    self.buf.push_byte(LF)?;
                    self.state = Pending { kind };
                    Ok(Some(kind))
                }
                DOLLAR => Err(Discard::StrayStart),
                _ => Err(Discard::MissingLf),
            },
            Pending { .. } => Ok(None),
        }
    }

    /// Applies the rules for the field ending at the cursor. Closing field 0
    /// decides the sentence type instead.
    fn close_field(
        &mut self,
        kind: SentenceType,
        field: u8,
        field_len: usize,
    ) -> Result<SentenceType, Discard> {
        if kind == SentenceType::Unknown {
            return match self.buf.sentence_code().map(SentenceType::from_code) {
                None | Some(SentenceType::Unknown) => Err(Discard::UnknownSentence),
                Some(kind) => Ok(kind),
            };
        }

        let empty = field_len == 0;
        match (kind, field) {
            (SentenceType::Gga, 1) | (SentenceType::Rmc, 1) if empty => {
                self.lamps.note_fix(kind, false)
            }
            (SentenceType::Gga, 2) | (SentenceType::Rmc, 3) => self.lamps.note_fix(kind, !empty),
            _ => (),
        }

        let start = self.buf.len() - field_len;
        for rule in rules_for(kind, field) {
            rule.apply(&mut self.buf, start, field)?;
        }
        Ok(kind)
    }
}

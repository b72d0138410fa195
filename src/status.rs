use embedded_hal::digital::v2::OutputPin;

use crate::nmea::SentenceType;

/// Advisory fix lamps. Lamps only ever turn on between clears, so a sentence
/// that shows both a good and a bad fix lights both.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Lamps(u8);

impl Lamps {
    pub const GGA_VALID: u8 = 0b1000;
    pub const GGA_INVALID: u8 = 0b0100;
    pub const RMC_VALID: u8 = 0b0010;
    pub const RMC_INVALID: u8 = 0b0001;

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_lit(self, mask: u8) -> bool {
        self.0 & mask == mask
    }

    pub fn light(&mut self, mask: u8) {
        self.0 |= mask & 0x0f;
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn note_fix(&mut self, kind: SentenceType, valid: bool) {
        match (kind, valid) {
            (SentenceType::Gga, true) => self.light(Self::GGA_VALID),
            (SentenceType::Gga, false) => self.light(Self::GGA_INVALID),
            (SentenceType::Rmc, true) => self.light(Self::RMC_VALID),
            (SentenceType::Rmc, false) => self.light(Self::RMC_INVALID),
            _ => (),
        }
    }
}

/// Four LEDs mirroring [`Lamps`], active high.
pub struct StatusLeds<GV, GI, RV, RI> {
    pub gga_valid: GV,
    pub gga_invalid: GI,
    pub rmc_valid: RV,
    pub rmc_invalid: RI,
}

impl<GV, GI, RV, RI, E> StatusLeds<GV, GI, RV, RI>
where
    GV: OutputPin<Error = E>,
    GI: OutputPin<Error = E>,
    RV: OutputPin<Error = E>,
    RI: OutputPin<Error = E>,
{
    pub fn show(&mut self, lamps: Lamps) -> Result<(), E> {
        set(&mut self.gga_valid, lamps.is_lit(Lamps::GGA_VALID))?;
        set(&mut self.gga_invalid, lamps.is_lit(Lamps::GGA_INVALID))?;
        set(&mut self.rmc_valid, lamps.is_lit(Lamps::RMC_VALID))?;
        set(&mut self.rmc_invalid, lamps.is_lit(Lamps::RMC_INVALID))
    }
}

fn set<P: OutputPin>(pin: &mut P, on: bool) -> Result<(), P::Error> {
    if on {
        pin.set_high()
    } else {
        pin.set_low()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    #[derive(Default)]
    struct Pin(bool);

    impl OutputPin for Pin {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0 = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0 = true;
            Ok(())
        }
    }

    #[test]
    fn lamps_latch_until_cleared() {
        let mut lamps = Lamps::default();
        lamps.note_fix(SentenceType::Gga, false);
        lamps.note_fix(SentenceType::Gga, true);
        lamps.note_fix(SentenceType::Zda, true);
        assert_eq!(lamps.bits(), Lamps::GGA_VALID | Lamps::GGA_INVALID);
        lamps.clear();
        assert_eq!(lamps.bits(), 0);
    }

    #[test]
    fn leds_mirror_lamps() {
        let mut leds = StatusLeds {
            gga_valid: Pin::default(),
            gga_invalid: Pin::default(),
            rmc_valid: Pin::default(),
            rmc_invalid: Pin::default(),
        };
        let mut lamps = Lamps::default();
        lamps.note_fix(SentenceType::Gga, true);
        lamps.note_fix(SentenceType::Rmc, false);
        leds.show(lamps).unwrap();
        assert!(leds.gga_valid.0 && !leds.gga_invalid.0);
        assert!(!leds.rmc_valid.0 && leds.rmc_invalid.0);

        leds.show(Lamps::default()).unwrap();
        assert!(!leds.gga_valid.0 && !leds.rmc_invalid.0);
    }
}

use std::convert::Infallible;

use embedded_hal::serial;
use gps_bridge::{
    status::Lamps,
    tx::{TxDrain, TxSlot},
    Bridge, Stats,
};

const GGA_NO_FIX: &str = "$GPGGA,125004.000,,,,,0,00,99.9,,,,,,0000*6D\r\n";
const RMC_NO_FIX: &str = "$GPRMC,125005.000,V,,,,,,,261215,,,N*4D\r\n";
const GGA_FIX: &str =
    "$GPGGA,142615.000,3226.0501,N,03454.8587,E,1,04,8.0,115.5,M,18.2,M,,0000*5B\r\n";
const ZDA_A: &str = "$GPZDA,125004.000,26,12,2015,,*55\r\n";
const ZDA_B: &str = "$GPZDA,125005.000,26,12,2015,,*54\r\n";

#[derive(Default)]
struct Radio {
    sent: Vec<u8>,
}

impl serial::Write<u8> for Radio {
    type Error = Infallible;

    fn write(&mut self, word: u8) -> nb::Result<(), Infallible> {
        self.sent.push(word);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Infallible> {
        Ok(())
    }
}

struct Rig {
    bridge: Bridge,
    drain: TxDrain,
    radio: Radio,
}

impl Rig {
    fn new(slot: &'static TxSlot) -> Self {
        let (load, drain) = slot.try_split().unwrap();
        Self {
            bridge: Bridge::new(load),
            drain,
            radio: Radio::default(),
        }
    }

    /// Feeds `input` without letting the transmitter run.
    fn receive(&mut self, input: &str) {
        for b in input.bytes() {
            self.bridge.poll(Some(b));
        }
    }

    /// Feeds `input` with the transmitter keeping up byte for byte.
    fn run(&mut self, input: &str) {
        for b in input.bytes() {
            self.bridge.poll(Some(b));
            self.drain.service(&mut self.radio);
        }
        self.flush();
    }

    fn flush(&mut self) {
        while self.drain.service(&mut self.radio) {}
    }

    fn output(&self) -> &str {
        std::str::from_utf8(&self.radio.sent).unwrap()
    }
}

fn checksum_is_consistent(line: &str) -> bool {
    let Some((body, tail)) = line.strip_prefix('$').and_then(|l| l.split_once('*')) else {
        return false;
    };
    let ck = body.bytes().fold(0u8, |ck, b| ck ^ b);
    tail == format!("{ck:02X}\r\n")
}

#[test]
fn gga_without_fix_gets_zero_filled() {
    static SLOT: TxSlot = TxSlot::new(None);
    let mut rig = Rig::new(&SLOT);

    rig.run(GGA_NO_FIX);
    assert_eq!(
        rig.output(),
        "$GPGGA,125004.000,0000.0000,N,00000.0000,E,0,00,99.9,00000.0,M,0000.0,M,000.0,0000*48\r\n"
    );
    assert!(checksum_is_consistent(rig.output()));
    assert_eq!(
        rig.bridge.stats(),
        Stats {
            forwarded: 1,
            ..Default::default()
        }
    );
}

#[test]
fn rmc_without_fix_gets_zero_filled() {
    static SLOT: TxSlot = TxSlot::new(None);
    let mut rig = Rig::new(&SLOT);

    rig.run(RMC_NO_FIX);
    assert_eq!(
        rig.output(),
        "$GPRMC,125005.000,V,0000.0000,N,00000.0000,E,0000.00,000.00,261215,,,N*46\r\n"
    );
}

#[test]
fn gga_with_fix_only_pads_short_fields() {
    static SLOT: TxSlot = TxSlot::new(None);
    let mut rig = Rig::new(&SLOT);

    rig.run(GGA_FIX);
    assert_eq!(
        rig.output(),
        "$GPGGA,142615.000,3226.0501,N,03454.8587,E,1,04,08.0,00115.5,M,0018.2,M,000.0,0000*45\r\n"
    );
}

#[test]
fn rejected_sentences_do_not_reach_the_radio() {
    static SLOT: TxSlot = TxSlot::new(None);
    let mut rig = Rig::new(&SLOT);

    let mut overlong = String::from("$GPZDA,125004.000,");
    overlong.extend(std::iter::repeat('1').take(120));

    // Interrupted by a new `$`, which then carries a good sentence
    rig.run("$GPGGA,1250");
    rig.run(ZDA_A);
    // Empty time
    rig.run("$GPGGA,,,,,,0,00,99.9,,,,,,0000*5D\r\n");
    // Checksum mismatch
    rig.run("$GPZDA,125005.000,26,12,2015,,*55\r\n");
    // Not one of ours
    rig.run("$GPGSV,1,1,00*79\r\n");
    rig.run(&overlong);
    rig.run(ZDA_B);

    assert_eq!(rig.output(), format!("{ZDA_A}{ZDA_B}"));
    assert_eq!(
        rig.bridge.stats(),
        Stats {
            forwarded: 2,
            discarded: 5,
            lost_bytes: 0,
        }
    );
}

#[test]
fn sentence_arriving_while_one_waits_is_lost() {
    static SLOT: TxSlot = TxSlot::new(None);
    let mut rig = Rig::new(&SLOT);

    // A goes straight to the transmitter, B waits behind it
    rig.receive(ZDA_A);
    rig.receive(ZDA_B);
    assert!(rig.bridge.is_waiting());

    // C arrives while B is still held
    let lost = "$GPZDA,125006.000,26,12,2015,,*57\r\n";
    rig.receive(lost);
    assert!(rig.bridge.is_waiting());

    rig.flush();
    rig.bridge.poll(None);
    assert!(!rig.bridge.is_waiting());
    rig.flush();

    assert_eq!(rig.output(), format!("{ZDA_A}{ZDA_B}"));
    assert_eq!(
        rig.bridge.stats(),
        Stats {
            forwarded: 2,
            discarded: 0,
            lost_bytes: lost.len() as u32,
        }
    );

    // Reception picks up again afterwards
    rig.run(ZDA_A);
    assert!(rig.output().ends_with(ZDA_A));
}

#[test]
fn lamps_track_the_sentence_being_received() {
    static SLOT: TxSlot = TxSlot::new(None);
    let mut rig = Rig::new(&SLOT);

    let (head, tail) = GGA_FIX.split_at(GGA_FIX.find(",N,").unwrap());
    rig.run(head);
    rig.run(",");
    assert!(rig.bridge.lamps().is_lit(Lamps::GGA_VALID));
    assert!(!rig.bridge.lamps().is_lit(Lamps::RMC_INVALID));

    // Cleared once the sentence is handed over
    rig.run(&tail[1..]);
    assert_eq!(rig.bridge.lamps(), Lamps::default());

    let (head, _) = RMC_NO_FIX.split_at(RMC_NO_FIX.find(",,,,,,").unwrap() + 2);
    rig.run(head);
    assert!(rig.bridge.lamps().is_lit(Lamps::RMC_INVALID));
    assert!(!rig.bridge.lamps().is_lit(Lamps::RMC_VALID));
}

#[test]
fn every_forwarded_line_carries_a_fresh_checksum() {
    static SLOT: TxSlot = TxSlot::new(None);
    let mut rig = Rig::new(&SLOT);

    for line in [GGA_NO_FIX, RMC_NO_FIX, GGA_FIX, ZDA_A] {
        rig.run(line);
    }
    let lines: Vec<_> = rig.output().split_inclusive('\n').collect();
    assert_eq!(lines.len(), 4);
    for line in lines {
        assert!(line.len() <= gps_bridge::nmea::NMEA_BUF_SIZE, "{line:?}");
        assert!(checksum_is_consistent(line), "{line:?}");
    }
}

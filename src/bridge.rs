use crate::{
    nmea::NmeaParser,
    status::Lamps,
    tx::TxLoader,
};

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    /// Sentences handed to the transmitter.
    pub forwarded: u32,
    /// Sentences thrown away by the parser.
    pub discarded: u32,
    /// Bytes which arrived while a finished sentence waited for the transmitter.
    pub lost_bytes: u32,
}

/// One GPS-to-radio pipeline. [`poll`](Self::poll) is the body of the main
/// loop and never blocks.
pub struct Bridge {
    parser: NmeaParser,
    tx: TxLoader,
    stats: Stats,
}

impl Bridge {
    pub fn new(tx: TxLoader) -> Self {
        Self {
            parser: NmeaParser::new(),
            tx,
            stats: Stats::default(),
        }
    }

    /// Runs one loop iteration with the byte taken from the receive mailbox,
    /// if there was one.
    pub fn poll(&mut self, byte: Option<u8>) {
        if self.parser.is_pending() {
            if byte.is_some() {
                self.stats.lost_bytes = self.stats.lost_bytes.wrapping_add(1);
                warn!("byte lost while waiting for transmitter");
            }
            self.try_handoff();
            return;
        }

        let Some(b) = byte else {
            return;
        };
        match self.parser.process_byte(b) {
            Some(Ok(kind)) => {
                trace!("sentence complete: {}", kind);
                self.try_handoff();
            }
            Some(Err(e)) => {
                self.stats.discarded = self.stats.discarded.wrapping_add(1);
                debug!("sentence discarded: {}", e);
            }
            None => (),
        }
    }

    fn try_handoff(&mut self) {
        let Some(sentence) = self.parser.sentence() else {
            return;
        };
        if self.tx.try_load(sentence).is_ok() {
            trace!("handed off {} bytes", sentence.len());
            self.parser.release();
            self.parser.clear_lamps();
            self.stats.forwarded = self.stats.forwarded.wrapping_add(1);
        }
    }

    /// True while a complete sentence is stalled behind the transmitter.
    pub fn is_waiting(&self) -> bool {
        self.parser.is_pending()
    }

    pub fn lamps(&self) -> Lamps {
        self.parser.lamps()
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }
}

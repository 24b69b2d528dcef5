use crate::clock::{ns_per_wire_tick, PLUTO_CLOCK_HZ};
use crate::error::SparSdrError;
use crate::nfft::Nfft;
use crate::sample::{AvgSample, FftSample, Sample};
use crate::wire::ByteReader;

const HDR_BIT: u32 = 1 << 31;
const AVG_BIT: u32 = 1 << 30;
const TIME_MASK: u32 = 0x3FFF_FFFF;
const TIME_WIDTH: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    Searching,
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    InFft,
    InAvg,
}

/// Decodes a V2 stream: a variable-length 4-byte little-endian word
/// stream framed by zero words, header words, and index-resync words.
///
/// Replaces the original script's flag soup (`in_FFT`, `in_avg`,
/// `after_hdr`, `after_zero`) with two explicit enums: [`SyncState`]
/// tracks whether the decoder has found its place in the stream at
/// all, [`Section`] tracks which kind of payload follows once locked.
/// A third flag, `after_header`, captures the one section-specific
/// quirk that doesn't fit either enum: an FFT header's very first
/// payload word is an index restatement, not data, while an avg
/// header sets its index to zero immediately. Any framing word that
/// doesn't fit the expected pattern drops the decoder back to
/// `Searching` rather than erroring the whole decode.
pub struct V2Decoder {
    nfft: Nfft,
    ns_per_tick: f64,
    sync: SyncState,
    section: Section,
    search_saw_zero: bool,
    after_zero: bool,
    after_header: bool,
    fft_index: u32,
    fft_time_offset: i64,
    avg_time_offset: i64,
    last_fft_time: u32,
    last_avg_time: u32,
    fixed_fft_time: f64,
    fixed_avg_time: f64,
    fft_window_id: u8,
}

impl V2Decoder {
    pub fn new(nfft: Nfft) -> Self {
        Self::with_clock_hz(nfft, PLUTO_CLOCK_HZ)
    }

    pub fn with_clock_hz(nfft: Nfft, clock_hz: f64) -> Self {
        Self {
            nfft,
            ns_per_tick: ns_per_wire_tick(clock_hz, nfft.get()),
            sync: SyncState::Searching,
            section: Section::InFft,
            search_saw_zero: false,
            after_zero: false,
            after_header: false,
            fft_index: 0,
            fft_time_offset: 0,
            avg_time_offset: 0,
            last_fft_time: 0,
            last_avg_time: 0,
            fixed_fft_time: 0.0,
            fixed_avg_time: 0.0,
            fft_window_id: 0,
        }
    }

    #[cfg(test)]
    fn sync_state(&self) -> SyncState {
        self.sync
    }

    /// Decode every word in `data`, in order. Unlike the V1 decoder, a
    /// word stream never hard-errors on framing trouble: loss of sync is
    /// recoverable and only logged.
    pub fn decode_all(&mut self, data: &[u8]) -> Result<Vec<Sample>, SparSdrError> {
        let mut reader = ByteReader::new(data);
        let mut out = Vec::new();
        while let Some(word) = reader.try_read_u32_le()? {
            self.step(word, &mut out);
        }
        Ok(out)
    }

    fn step(&mut self, word: u32, out: &mut Vec<Sample>) {
        match self.sync {
            SyncState::Searching => self.step_searching(word),
            SyncState::Locked => self.step_locked(word, out),
        }
    }

    fn step_searching(&mut self, word: u32) {
        if !self.search_saw_zero {
            if word == 0 {
                self.search_saw_zero = true;
            }
            return;
        }
        if word == 0 {
            return;
        }
        if word & HDR_BIT != 0 {
            self.lock_on_header(word);
        } else {
            log::debug!("sparsdr v2: non-header word while searching for sync, resetting");
            self.search_saw_zero = false;
        }
    }

    fn lock_on_header(&mut self, word: u32) {
        self.fft_time_offset = 0;
        self.avg_time_offset = 0;
        self.last_fft_time = 0;
        self.last_avg_time = 0;
        self.sync = SyncState::Locked;
        self.after_zero = false;
        self.search_saw_zero = false;
        self.apply_header(word);
    }

    /// Applies a header word: updates the section's wrap-corrected time
    /// and switches `section`. An avg header restarts `fft_index` at 0
    /// immediately, since avg sections carry no separate index word; an
    /// FFT header instead sets `after_header`, since its first payload
    /// word is itself an index restatement (see the state table in the
    /// decoder's design notes).
    fn apply_header(&mut self, word: u32) {
        let time = word & TIME_MASK;
        if word & AVG_BIT != 0 {
            if time < self.last_avg_time {
                self.avg_time_offset += 1i64 << TIME_WIDTH;
            }
            self.last_avg_time = time;
            let ticks = (time & !1u32) as i64 + self.avg_time_offset;
            self.fixed_avg_time = ticks as f64 * self.ns_per_tick;
            self.section = Section::InAvg;
            self.fft_index = 0;
            self.after_header = false;
        } else {
            if time < self.last_fft_time {
                self.fft_time_offset += 1i64 << TIME_WIDTH;
            }
            self.last_fft_time = time;
            let ticks = time as i64 + self.fft_time_offset;
            self.fixed_fft_time = ticks as f64 * self.ns_per_tick;
            self.fft_window_id = (time & 1) as u8;
            self.section = Section::InFft;
            self.after_header = true;
        }
    }

    /// Reads a 10-bit bin index out of a resync/index word and validates
    /// it against `nfft`. Returns `None` (and drops the decoder back to
    /// `Searching`) on an out-of-range index.
    fn read_index(&mut self, word: u32) -> Option<u32> {
        let idx = word & TIME_MASK;
        if (idx >> self.nfft.log2()) != 0 {
            log::warn!("sparsdr v2: bin index {} out of range, resyncing", idx);
            self.sync = SyncState::Searching;
            self.search_saw_zero = false;
            return None;
        }
        Some(idx)
    }

    fn step_locked(&mut self, word: u32, out: &mut Vec<Sample>) {
        if self.after_zero {
            self.after_zero = false;
            if word == 0 {
                log::warn!("sparsdr v2: consecutive zero words, resyncing");
                self.sync = SyncState::Searching;
                self.search_saw_zero = true;
                return;
            }
            if word & HDR_BIT != 0 {
                self.apply_header(word);
                return;
            }
            // Index resync: an explicit restatement of the current
            // section's bin index, not an error.
            if let Some(idx) = self.read_index(word) {
                self.fft_index = idx;
            }
            return;
        }

        // The first payload word after an FFT header is always an index
        // restatement, even when its value is 0 -- it must be checked
        // ahead of the generic "zero word ends a frame" rule below, or
        // bin 0 could never be represented as that first index.
        if self.section == Section::InFft && self.after_header {
            self.after_header = false;
            if let Some(idx) = self.read_index(word) {
                self.fft_index = idx;
            }
            return;
        }

        if word == 0 {
            self.after_zero = true;
            return;
        }

        match self.section {
            Section::InAvg => {
                out.push(Sample::Avg(AvgSample {
                    bin: self.fft_index,
                    time_ns: self.fixed_avg_time,
                    magnitude: word,
                }));
                self.fft_index += 1;
            }
            Section::InFft => {
                let imag = (word & 0xFFFF) as u16 as i16;
                let real = (word >> 16) as u16 as i16;
                out.push(Sample::Fft(FftSample {
                    window_id: self.fft_window_id,
                    bin: self.fft_index,
                    time_ns: self.fixed_fft_time,
                    re: real,
                    im: imag,
                }));
                self.fft_index += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ByteWriter;

    fn words(ws: &[u32]) -> Vec<u8> {
        let mut w = ByteWriter::new();
        for &word in ws {
            w.write_u32_le(word);
        }
        w.into_bytes()
    }

    #[test]
    fn syncs_and_decodes_one_fft_sample() {
        let nfft = Nfft::new(1024).unwrap();
        let mut dec = V2Decoder::new(nfft);
        // zero, FFT header, index restatement (bin 0), one data word.
        let bytes = words(&[0, 0x80000000, 0, (5u32 << 16) | 10u32]);
        let samples = dec.decode_all(&bytes).unwrap();
        assert_eq!(samples.len(), 1);
        let fft = samples[0].as_fft().unwrap();
        assert_eq!(fft.bin, 0);
        assert_eq!(fft.im, 10);
        assert_eq!(fft.re, 5);
        assert_eq!(fft.window_id, 0);
    }

    #[test]
    fn fft_window_id_tracks_low_bit_of_header_time() {
        let nfft = Nfft::new(1024).unwrap();
        let mut dec = V2Decoder::new(nfft);
        // header time=5 (odd) -> window_id=1.
        let bytes = words(&[0, 0x80000005, 0, (5u32 << 16) | 10u32]);
        let samples = dec.decode_all(&bytes).unwrap();
        assert_eq!(samples[0].as_fft().unwrap().window_id, 1);
    }

    #[test]
    fn decodes_a_full_avg_section() {
        let nfft = Nfft::new(1024).unwrap();
        let mut dec = V2Decoder::new(nfft);
        // avg header sets fft_index=0 immediately; no index word follows it.
        let mut ws = vec![0u32, 0xC0000000];
        for m in 1..=1024u32 {
            ws.push(m);
        }
        ws.push(0);
        let bytes = words(&ws);
        let samples = dec.decode_all(&bytes).unwrap();
        assert_eq!(samples.len(), 1024);
        for (i, s) in samples.iter().enumerate() {
            let avg = s.as_avg().unwrap();
            assert_eq!(avg.bin, i as u32);
            assert_eq!(avg.magnitude, i as u32 + 1);
        }
    }

    #[test]
    fn non_header_after_zero_is_an_index_resync_not_corruption() {
        let nfft = Nfft::new(1024).unwrap();
        let mut dec = V2Decoder::new(nfft);
        // zero, FFT header, index 0, one data word, closing zero, resync to bin 7, one data word.
        let bytes = words(&[0, 0x80000000, 0, (1u32 << 16) | 2u32, 0, 7, (3u32 << 16) | 4u32]);
        let samples = dec.decode_all(&bytes).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].as_fft().unwrap().bin, 0);
        let second = samples[1].as_fft().unwrap();
        assert_eq!(second.bin, 7);
        assert_eq!((second.re, second.im), (3, 4));
        assert_eq!(dec.sync_state(), SyncState::Locked);
    }

    #[test]
    fn double_zero_is_corruption_and_drops_to_searching() {
        let nfft = Nfft::new(1024).unwrap();
        let mut dec = V2Decoder::new(nfft);
        let bytes = words(&[0, 0x80000000, 0, 0, 0]);
        let samples = dec.decode_all(&bytes).unwrap();
        assert_eq!(samples.len(), 0);
        assert_eq!(dec.sync_state(), SyncState::Searching);
    }

    #[test]
    fn bad_resync_index_drops_back_to_searching() {
        let nfft = Nfft::new(1024).unwrap();
        let mut dec = V2Decoder::new(nfft);
        let bytes = words(&[0, 0x80000000, 0xFFFF_FFFF]);
        let samples = dec.decode_all(&bytes).unwrap();
        assert_eq!(samples.len(), 0);
        assert_eq!(dec.sync_state(), SyncState::Searching);
    }

    #[test]
    fn noise_before_sync_is_ignored() {
        let nfft = Nfft::new(1024).unwrap();
        let mut dec = V2Decoder::new(nfft);
        let bytes = words(&[0xDEADBEEF, 0, 0x80000000, 0, (5u32 << 16) | 10u32]);
        let samples = dec.decode_all(&bytes).unwrap();
        assert_eq!(samples.len(), 1);
    }
}

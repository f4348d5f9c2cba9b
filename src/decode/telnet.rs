//! Telnet reference decoder.
//!
//! Reconstructs a readable session transcript from a reassembled Telnet flow:
//! option-negotiation sequences are stripped, the remainder must look like
//! interactive text, and single-line noise (banners, probes) is rejected.

use super::Decoder;
use crate::flow::EngineConfig;

/// Telnet "Interpret As Command" escape byte.
const IAC: u8 = 255;

/// Default Telnet service port.
const TELNET_PORT: u16 = 23;

/// Decoder for Telnet session transcripts.
///
/// Applied in strict order: strip IAC negotiation triples, validate printable
/// ASCII, require a minimum line count, truncate to the output bound.
#[derive(Debug, Clone)]
pub struct TelnetDecoder {
    /// Minimum number of lines before a transcript is worth logging.
    min_lines: usize,
    /// Upper bound on normalized output length.
    max_output: usize,
}

impl TelnetDecoder {
    pub fn new(min_lines: usize, max_output: usize) -> Self {
        Self {
            min_lines,
            max_output,
        }
    }

    /// Build a decoder honoring the engine configuration's decode limits
    /// (`min_interesting_lines`, `max_output_bytes`).
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.min_interesting_lines, config.max_output_bytes)
    }

    /// Remove IAC-prefixed negotiation sequences (three bytes each: IAC,
    /// command, option). A truncated sequence at the end of the buffer is
    /// dropped.
    fn strip_options(raw: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == IAC {
                i += 3;
            } else {
                out.push(raw[i]);
                i += 1;
            }
        }
        out
    }

    /// Printable ASCII plus the control bytes an interactive session emits.
    fn is_acceptable(byte: u8) -> bool {
        matches!(byte, 0x20..=0x7e | b'\r' | b'\n' | b'\t' | 0x07 | 0x08)
    }

    fn count_lines(text: &[u8]) -> usize {
        text.iter().filter(|&&b| b == b'\n').count()
    }
}

impl Default for TelnetDecoder {
    fn default() -> Self {
        Self::new(2, 4096)
    }
}

impl Decoder for TelnetDecoder {
    fn name(&self) -> &'static str {
        "telnet"
    }

    fn default_port(&self) -> u16 {
        TELNET_PORT
    }

    fn decode(&self, raw: &[u8]) -> Option<Vec<u8>> {
        let mut text = Self::strip_options(raw);
        if text.is_empty() {
            return None;
        }

        if !text.iter().all(|&b| Self::is_acceptable(b)) {
            return None;
        }

        if Self::count_lines(&text) < self.min_lines {
            return None;
        }

        text.truncate(self.max_output);
        Some(text)
    }
}

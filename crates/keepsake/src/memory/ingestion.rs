//! Conversation transcript parsing
//!
//! Accepts the plain-text format of one turn per line, `Speaker: text`.
//! Blank lines, comment lines, and lines without a speaker prefix are
//! skipped with a warning; parsing itself never fails.

use tracing::warn;

use crate::memory::types::Utterance;

/// Parse a transcript into utterances with sequential turn indices
pub fn parse_transcript(raw: &str) -> Vec<Utterance> {
    let mut turns = Vec::new();
    let mut turn_index: u32 = 0;

    for (line_number, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((speaker, text)) = line.split_once(':') else {
            warn!("Skipping malformed line {}: no speaker prefix", line_number + 1);
            continue;
        };

        let speaker = speaker.trim();
        let text = text.trim();
        if speaker.is_empty() || speaker.contains(char::is_whitespace) {
            warn!("Skipping malformed line {}: bad speaker label", line_number + 1);
            continue;
        }

        turns.push(Utterance::new(turn_index, speaker, text));
        turn_index += 1;
    }

    turns
}

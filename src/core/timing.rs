/// Pacing formulas — per-character reveal delays and auto-advance timing.

/// Sentence-ending punctuation that earns the long pause.
const SENTENCE_ENDERS: &[char] = &['.', '!', '?'];
/// Clause punctuation that earns the short pause.
const CLAUSE_BREAKS: &[char] = &[',', ';', ':'];

const SENTENCE_PAUSE_MS: f64 = 180.0;
const CLAUSE_PAUSE_MS: f64 = 80.0;

/// Bounds on the per-character reveal delay.
const MIN_CHAR_DELAY_MS: f64 = 12.0;
const MAX_CHAR_DELAY_MS: f64 = 45.0;

/// Assumed reading speed for the auto-advance estimate.
const WORDS_PER_MINUTE: f64 = 200.0;
/// Read-time estimate for empty text.
const EMPTY_TEXT_READ_MS: u64 = 2000;

/// Bounds on the post-reveal auto-advance delay.
pub const MIN_AUTO_DELAY_MS: u64 = 2000;
pub const MAX_AUTO_DELAY_MS: u64 = 10_000;

/// Fixed short delay used the first time auto-advance is enabled mid-reveal.
pub const FALLBACK_ADVANCE_MS: u64 = 2000;

/// Interval of the skip-mode rapid-advance check.
pub const SKIP_POLL_INTERVAL_MS: u64 = 120;

/// Per-character delay before punctuation pauses. Longer lines type faster
/// so they don't take forever, clamped to [12, 45] ms per character:
/// `clamp(base − min(len/120, 1)·12, 12, 45)`.
pub fn per_char_delay_ms(base_rate: f64, text_len: usize) -> f64 {
    let length_factor = (text_len as f64 / 120.0).min(1.0);
    (base_rate - length_factor * 12.0).clamp(MIN_CHAR_DELAY_MS, MAX_CHAR_DELAY_MS)
}

/// Extra pause earned by the character just revealed.
pub fn punctuation_pause_ms(c: char) -> f64 {
    if SENTENCE_ENDERS.contains(&c) {
        SENTENCE_PAUSE_MS
    } else if CLAUSE_BREAKS.contains(&c) {
        CLAUSE_PAUSE_MS
    } else {
        0.0
    }
}

/// Estimated human read time in milliseconds, unclamped. Empty text gets a
/// fixed baseline.
pub fn read_time_ms(text: &str) -> u64 {
    let words = text.split_whitespace().count();
    if words == 0 {
        return EMPTY_TEXT_READ_MS;
    }
    (words as f64 * 60_000.0 / WORDS_PER_MINUTE).round() as u64
}

/// Post-reveal auto-advance delay: the estimated reading time not already
/// covered by the typing animation, clamped to [2s, 10s].
pub fn auto_delay_ms(read_ms: u64, typing_duration_ms: u64) -> u64 {
    read_ms
        .saturating_sub(typing_duration_ms)
        .clamp(MIN_AUTO_DELAY_MS, MAX_AUTO_DELAY_MS)
}

/// Auto-advance delay when no typing preceded it (auto-advance toggled on
/// while idle on a finished line).
pub fn auto_delay_without_typing(read_ms: u64) -> u64 {
    read_ms.clamp(MIN_AUTO_DELAY_MS, MAX_AUTO_DELAY_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_char_delay_short_text_uses_base() {
        assert_eq!(per_char_delay_ms(28.0, 0), 28.0);
    }

    #[test]
    fn per_char_delay_long_text_speeds_up() {
        // Length factor saturates at 1: 28 − 12 = 16.
        assert_eq!(per_char_delay_ms(28.0, 120), 16.0);
        assert_eq!(per_char_delay_ms(28.0, 500), 16.0);
    }

    #[test]
    fn per_char_delay_partial_length_factor() {
        // 60 chars → factor 0.5 → 28 − 6 = 22.
        assert_eq!(per_char_delay_ms(28.0, 60), 22.0);
    }

    #[test]
    fn per_char_delay_clamped() {
        assert_eq!(per_char_delay_ms(5.0, 0), 12.0);
        assert_eq!(per_char_delay_ms(90.0, 0), 45.0);
    }

    #[test]
    fn punctuation_pauses() {
        assert_eq!(punctuation_pause_ms('.'), 180.0);
        assert_eq!(punctuation_pause_ms('!'), 180.0);
        assert_eq!(punctuation_pause_ms('?'), 180.0);
        assert_eq!(punctuation_pause_ms(','), 80.0);
        assert_eq!(punctuation_pause_ms(';'), 80.0);
        assert_eq!(punctuation_pause_ms(':'), 80.0);
        assert_eq!(punctuation_pause_ms('a'), 0.0);
        assert_eq!(punctuation_pause_ms(' '), 0.0);
    }

    #[test]
    fn read_time_three_words() {
        // 3 words at 200 WPM = 900 ms.
        assert_eq!(read_time_ms("Hello there friend"), 900);
    }

    #[test]
    fn read_time_empty_text_baseline() {
        assert_eq!(read_time_ms(""), 2000);
        assert_eq!(read_time_ms("   "), 2000);
    }

    #[test]
    fn auto_delay_clamps_to_minimum() {
        // 900 ms of reading already covered by 500 ms of typing still
        // waits the 2 s floor.
        assert_eq!(auto_delay_ms(900, 500), 2000);
    }

    #[test]
    fn auto_delay_clamps_to_maximum() {
        assert_eq!(auto_delay_ms(60_000, 1000), 10_000);
    }

    #[test]
    fn auto_delay_in_band_passes_through() {
        assert_eq!(auto_delay_ms(9000, 4000), 5000);
    }

    #[test]
    fn auto_delay_typing_longer_than_read_saturates() {
        assert_eq!(auto_delay_ms(900, 5000), 2000);
    }

    #[test]
    fn auto_delay_without_typing_clamps() {
        assert_eq!(auto_delay_without_typing(900), 2000);
        assert_eq!(auto_delay_without_typing(3000), 3000);
        assert_eq!(auto_delay_without_typing(60_000), 10_000);
    }
}

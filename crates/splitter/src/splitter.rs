use crate::config::SplitterConfig;

const STRONG_TERMINATORS: &[char] = &['.', '!', '?', '。', '！', '？', '…', '\n'];
const WEAK_PUNCTUATION: &[char] = &[',', ';', ':', '、', '，', '；', '：'];

fn is_strong_terminator(c: char) -> bool {
    STRONG_TERMINATORS.contains(&c)
}

fn is_weak_breakpoint(c: char) -> bool {
    WEAK_PUNCTUATION.contains(&c) || c.is_whitespace()
}

fn char_byte_offset(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}

/// Stateful, single-writer splitter bound to one chat-completion stream.
///
/// `feed` appends characters and returns zero or more trimmed, non-empty
/// segments; `flush` drains whatever residual text remains at stream end.
#[derive(Debug, Clone)]
pub struct Splitter {
    config: SplitterConfig,
    buffer: String,
}

impl Splitter {
    pub fn new(config: SplitterConfig) -> Self {
        Self {
            config,
            buffer: String::new(),
        }
    }

    /// Appends `chunk` to the internal buffer and emits every segment that
    /// can now be cut, in text order.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        self.drain()
    }

    /// Emits the residual buffer as a final segment, if non-empty after
    /// trimming. Idempotent: a second call on an already-flushed splitter
    /// emits nothing.
    pub fn flush(&mut self) -> Vec<String> {
        let residual = std::mem::take(&mut self.buffer);
        let trimmed = residual.trim();
        if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        }
    }

    fn drain(&mut self) -> Vec<String> {
        let mut segments = Vec::new();
        while let Some(cut) = self.find_cut() {
            let byte_cut = char_byte_offset(&self.buffer, cut);
            let rest = self.buffer.split_off(byte_cut);
            let prefix = std::mem::replace(&mut self.buffer, rest);
            let trimmed = prefix.trim();
            if !trimmed.is_empty() {
                segments.push(trimmed.to_string());
            }
        }
        segments
    }

    /// Returns the char-count cut point for the current buffer, if one can
    /// be determined yet, per the strong-terminator / weak-breakpoint /
    /// hard-cut priority order.
    fn find_cut(&self) -> Option<usize> {
        let chars: Vec<char> = self.buffer.chars().collect();
        let len = chars.len();

        for (i, &c) in chars.iter().enumerate() {
            if is_strong_terminator(c) && i + 1 >= self.config.min_len {
                return Some(i + 1);
            }
        }

        if len < self.config.max_len {
            return None;
        }

        let limit = self.config.max_len.min(len);
        for i in (0..limit).rev() {
            if is_weak_breakpoint(chars[i]) {
                return Some(i + 1);
            }
        }

        Some(self.config.max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter() -> Splitter {
        Splitter::new(SplitterConfig {
            min_len: 5,
            max_len: 40,
        })
    }

    #[test]
    fn emits_sentences_on_strong_terminators() {
        let mut s = splitter();
        let mut out = s.feed("Hello world. How are you today? I am fine.");
        out.extend(s.flush());
        assert_eq!(
            out,
            vec!["Hello world.", "How are you today?", "I am fine."]
        );
    }

    #[test]
    fn flush_emits_residual_and_is_idempotent() {
        let mut s = splitter();
        let first = s.feed("Hi there");
        assert!(first.is_empty());
        assert_eq!(s.flush(), vec!["Hi there"]);
        assert!(s.flush().is_empty());
    }

    #[test]
    fn hard_cut_when_no_boundary_at_all() {
        let mut s = Splitter::new(SplitterConfig {
            min_len: 5,
            max_len: 10,
        });
        let out = s.feed("abcdefghijklmnop");
        assert_eq!(out, vec!["abcdefghij"]);
        assert_eq!(s.flush(), vec!["klmnop"]);
    }

    #[test]
    fn weak_breakpoint_used_before_hard_cut() {
        let mut s = Splitter::new(SplitterConfig {
            min_len: 5,
            max_len: 10,
        });
        let out = s.feed("abcde, fghijklmnop");
        assert_eq!(out, vec!["abcde,"]);
    }

    #[test]
    fn min_len_suppresses_premature_strong_cut() {
        let mut s = Splitter::new(SplitterConfig {
            min_len: 5,
            max_len: 40,
        });
        // "Hi." is only 3 chars, below min_len=5, so the first '.' is
        // skipped and the splitter keeps scanning.
        let out = s.feed("Hi. There.");
        assert_eq!(out, vec!["Hi. There."]);
    }

    #[test]
    fn feeding_one_char_at_a_time_matches_feeding_whole_string() {
        let text = "Hello world. How are you today? I am fine.";
        let mut whole = splitter();
        let mut expected = whole.feed(text);
        expected.extend(whole.flush());

        let mut incremental = splitter();
        let mut actual = Vec::new();
        for c in text.chars() {
            actual.extend(incremental.feed(&c.to_string()));
        }
        actual.extend(incremental.flush());

        assert_eq!(actual, expected);
    }

    #[test]
    fn flush_on_empty_buffer_emits_nothing() {
        let mut s = splitter();
        assert!(s.flush().is_empty());
    }
}

//! Caption parsing and timing resolution
//!
//! Input is line oriented, one caption per line:
//!
//! ```text
//! HH:MM:SS caption text
//! ```
//!
//! # Example
//!
//! ```rust
//! use capline_core::captions::{parse_captions, resolve_caption};
//!
//! let captions = parse_captions("00:01:00 Caption text\n00:01:05 Next line").unwrap();
//! assert_eq!(captions.len(), 2);
//! assert_eq!(resolve_caption(60.2, &captions), "Caption text");
//! assert_eq!(resolve_caption(62.0, &captions), "");
//! ```

use crate::error::{Error, Result, TimestampIssue};
use crate::types::{BlankLines, Caption, CaptionList};
use tracing::debug;

/// A caption is active while the clock is strictly within this many seconds
/// of its start time
pub const TOLERANCE_SECS: f64 = 0.5;

/// Parser for timestamped caption lines
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptionParser {
    blank_lines: BlankLines,
}

impl CaptionParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the blank line policy
    pub fn blank_lines(mut self, policy: BlankLines) -> Self {
        self.blank_lines = policy;
        self
    }

    /// Parse caption text into a list in input order.
    ///
    /// The first bad line aborts the parse; nothing is returned for the lines
    /// before it.
    pub fn parse(&self, input: &str) -> Result<CaptionList> {
        let mut captions = Vec::new();

        for (index, raw) in input.split('\n').enumerate() {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            // Leading and repeated whitespace is allowed.
            let mut words = line.split_whitespace();

            let token = match words.next() {
                Some(token) => token,
                None if self.blank_lines == BlankLines::Skip => continue,
                None => {
                    return Err(Error::caption_format(
                        index + 1,
                        "",
                        TimestampIssue::WrongComponentCount(1),
                    ))
                }
            };

            let time = Self::parse_timestamp(token)
                .map_err(|issue| Error::caption_format(index + 1, token, issue))?;
            let text = words.collect::<Vec<_>>().join(" ");

            captions.push(Caption { time, text });
        }

        debug!(count = captions.len(), "Parsed captions");
        Ok(CaptionList::from(captions))
    }

    /// Parse `HH:MM:SS` into seconds. Components are not range checked, so
    /// `00:75:00` is 4500 seconds.
    pub fn parse_timestamp(token: &str) -> std::result::Result<f64, TimestampIssue> {
        let parts: Vec<&str> = token.split(':').collect();
        if parts.len() != 3 {
            return Err(TimestampIssue::WrongComponentCount(parts.len()));
        }

        let mut values = [0u64; 3];
        for (value, part) in values.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(TimestampIssue::NotNumeric);
            }
            *value = part.parse().map_err(|_| TimestampIssue::OutOfRange)?;
        }

        let [hours, minutes, seconds] = values;
        hours
            .checked_mul(3600)
            .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
            .and_then(|hm| hm.checked_add(seconds))
            .map(|total| total as f64)
            .ok_or(TimestampIssue::OutOfRange)
    }
}

/// Parse caption text with the default (rejecting) blank line policy
pub fn parse_captions(input: &str) -> Result<CaptionList> {
    CaptionParser::new().parse(input)
}

/// Text of the caption active at `current_time`, or `""` when none is
pub fn resolve_caption(current_time: f64, captions: &CaptionList) -> &str {
    resolve_caption_within(current_time, captions, TOLERANCE_SECS)
}

/// Same as [`resolve_caption`] with an explicit tolerance window
pub fn resolve_caption_within(current_time: f64, captions: &CaptionList, tolerance: f64) -> &str {
    captions
        .iter()
        .find(|c| (current_time - c.time).abs() < tolerance)
        .map(|c| c.text.as_str())
        .unwrap_or("")
}

/// Format seconds as `HH:MM:SS`, dropping any fraction
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[(f64, &str)]) -> CaptionList {
        CaptionList::from(
            items
                .iter()
                .map(|(t, s)| Caption::new(*t, *s))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_parse_single_line() {
        let captions = parse_captions("00:01:00 Caption text").unwrap();
        assert_eq!(captions.as_slice(), &[Caption::new(60.0, "Caption text")]);
    }

    #[test]
    fn test_parse_collapses_whitespace() {
        let captions = parse_captions("01:02:03   several   spaced\twords  ").unwrap();
        assert_eq!(captions.as_slice()[0].time, 3723.0);
        assert_eq!(captions.as_slice()[0].text, "several spaced words");
    }

    #[test]
    fn test_parse_accepts_leading_whitespace() {
        let captions = parse_captions(" 00:00:01  two   words").unwrap();
        assert_eq!(captions.as_slice(), &[Caption::new(1.0, "two words")]);

        let captions = parse_captions("\t00:00:02\tindented").unwrap();
        assert_eq!(captions.as_slice()[0].time, 2.0);
    }

    #[test]
    fn test_parse_empty_text() {
        let captions = parse_captions("00:00:05").unwrap();
        assert_eq!(captions.as_slice()[0].text, "");
    }

    #[test]
    fn test_parse_keeps_input_order() {
        let captions = parse_captions("00:00:10 later\n00:00:01 earlier").unwrap();
        let times: Vec<f64> = captions.iter().map(|c| c.time).collect();
        assert_eq!(times, vec![10.0, 1.0]);
    }

    #[test]
    fn test_parse_crlf() {
        let captions = parse_captions("00:00:01 one\r\n00:00:02 two").unwrap();
        assert_eq!(captions.as_slice()[0].text, "one");
        assert_eq!(captions.as_slice()[1].text, "two");
    }

    #[test]
    fn test_minutes_not_range_checked() {
        assert_eq!(CaptionParser::parse_timestamp("00:75:00"), Ok(4500.0));
    }

    #[test]
    fn test_timestamp_component_count() {
        assert_eq!(
            CaptionParser::parse_timestamp("01:00"),
            Err(TimestampIssue::WrongComponentCount(2))
        );
        assert_eq!(
            CaptionParser::parse_timestamp("00:00:01:00"),
            Err(TimestampIssue::WrongComponentCount(4))
        );
    }

    #[test]
    fn test_timestamp_not_numeric() {
        assert_eq!(
            CaptionParser::parse_timestamp("00:aa:01"),
            Err(TimestampIssue::NotNumeric)
        );
        assert_eq!(
            CaptionParser::parse_timestamp("00::01"),
            Err(TimestampIssue::NotNumeric)
        );
        assert_eq!(
            CaptionParser::parse_timestamp("-1:00:01"),
            Err(TimestampIssue::NotNumeric)
        );
    }

    #[test]
    fn test_timestamp_overflow() {
        assert_eq!(
            CaptionParser::parse_timestamp("99999999999999999999:00:00"),
            Err(TimestampIssue::OutOfRange)
        );
        assert_eq!(
            CaptionParser::parse_timestamp("18446744073709551615:00:00"),
            Err(TimestampIssue::OutOfRange)
        );
    }

    #[test]
    fn test_bad_line_aborts_whole_parse() {
        let err = parse_captions("00:00:01 ok\n1:2 broken\n00:00:03 fine").unwrap_err();
        match err {
            Error::CaptionFormat { line, token, .. } => {
                assert_eq!(line, 2);
                assert_eq!(token, "1:2");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_trailing_newline_rejected_by_default() {
        let err = parse_captions("00:00:01 one\n").unwrap_err();
        assert!(matches!(err, Error::CaptionFormat { line: 2, .. }));
    }

    #[test]
    fn test_blank_lines_skipped_when_configured() {
        let parser = CaptionParser::new().blank_lines(BlankLines::Skip);
        let captions = parser.parse("00:00:01 one\n\n   \n00:00:02 two\n").unwrap();
        assert_eq!(captions.len(), 2);
    }

    #[test]
    fn test_resolve_empty_list() {
        assert_eq!(resolve_caption(0.0, &CaptionList::new()), "");
        assert_eq!(resolve_caption(1234.5, &CaptionList::new()), "");
    }

    #[test]
    fn test_resolve_window_bounds() {
        let captions = list(&[(65.0, "Hello")]);
        assert_eq!(resolve_caption(64.51, &captions), "Hello");
        assert_eq!(resolve_caption(65.0, &captions), "Hello");
        assert_eq!(resolve_caption(65.49, &captions), "Hello");
        assert_eq!(resolve_caption(64.5, &captions), "");
        assert_eq!(resolve_caption(65.5, &captions), "");
        assert_eq!(resolve_caption(66.0, &captions), "");
    }

    #[test]
    fn test_resolve_first_match_wins() {
        let captions = list(&[(10.0, "A"), (10.3, "B")]);
        assert_eq!(resolve_caption(10.2, &captions), "A");
        assert_eq!(resolve_caption(10.6, &captions), "B");
    }

    #[test]
    fn test_resolve_custom_tolerance() {
        let captions = list(&[(5.0, "wide")]);
        assert_eq!(resolve_caption_within(6.5, &captions, 2.0), "wide");
        assert_eq!(resolve_caption_within(6.5, &captions, 1.0), "");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00:00");
        assert_eq!(format_timestamp(3723.9), "01:02:03");
        assert_eq!(format_timestamp(-4.0), "00:00:00");
    }
}

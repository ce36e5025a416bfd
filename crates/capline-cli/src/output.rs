//! Output formatting for CLI

use capline_core::{format_timestamp, CaptionList, PlaybackSource};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// Pretty JSON for `--format json`
pub fn format_json<T: Serialize>(data: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

#[derive(Tabled)]
struct CaptionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Seconds")]
    seconds: f64,
    #[tabled(rename = "Caption")]
    text: String,
}

/// Render captions as a table
pub fn caption_table(captions: &CaptionList) -> String {
    let rows: Vec<CaptionRow> = captions
        .iter()
        .enumerate()
        .map(|(i, caption)| CaptionRow {
            index: i + 1,
            timestamp: format_timestamp(caption.time),
            seconds: caption.time,
            text: caption.text.clone(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Field/value pairs describing a classified URL
pub fn source_fields(source: &PlaybackSource) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("URL", source.url().to_string()),
        ("Kind", source.kind().to_string()),
    ];
    match source {
        PlaybackSource::DirectMedia { media_type, .. } => {
            fields.push(("MIME type", media_type.mime_type().to_string()));
        }
        PlaybackSource::Embedded { video_id, .. } => {
            let id = video_id.as_deref().unwrap_or("(not recognized)");
            fields.push(("Video ID", id.to_string()));
        }
    }
    fields
}

/// Render a classified URL as a two column table
pub fn source_table(source: &PlaybackSource) -> String {
    let rows: Vec<FieldRow> = source_fields(source)
        .into_iter()
        .map(|(field, value)| FieldRow { field, value })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use capline_core::{parse_captions, PlaybackSource};

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from("table"), OutputFormat::Table);
        assert_eq!(OutputFormat::from("anything"), OutputFormat::Text);
    }

    #[test]
    fn test_caption_table_lists_every_caption() {
        let captions = parse_captions("00:00:05 Hello\n00:01:00 World").unwrap();
        let table = caption_table(&captions);
        assert!(table.contains("00:00:05"));
        assert!(table.contains("Hello"));
        assert!(table.contains("World"));
    }

    #[test]
    fn test_source_fields() {
        let source = PlaybackSource::classify("https://youtu.be/dQw4w9WgXcQ").unwrap();
        let fields = source_fields(&source);
        assert_eq!(fields[1], ("Kind", "embedded".to_string()));
        assert_eq!(fields[2], ("Video ID", "dQw4w9WgXcQ".to_string()));

        let source = PlaybackSource::classify("clip.ogg").unwrap();
        assert_eq!(source_fields(&source)[2].1, "video/ogg");
    }
}

//! Caption parsing example
//!
//! Demonstrates parsing typed caption lines, resolving the active caption
//! and classifying video URLs.
//!
//! Run with: cargo run -p capline-core --example captions

use capline_core::{format_timestamp, parse_captions, resolve_caption, PlaybackSource};

fn main() {
    println!("Capline Core - Caption Parsing Example");
    println!("======================================\n");

    let input = "00:00:01 Welcome to the show\n\
                 00:00:04 This line arrives   a bit later\n\
                 00:01:30 Ninety seconds in";

    let captions = match parse_captions(input) {
        Ok(captions) => captions,
        Err(e) => {
            eprintln!("Failed to parse captions: {}", e);
            return;
        }
    };

    println!("Found {} captions:\n", captions.len());
    for caption in &captions {
        println!("  [{}] {}", format_timestamp(caption.time), caption.text);
    }

    println!("\nActive caption at specific times:");
    for time in [0.0, 1.2, 3.4, 4.49, 60.0, 90.1] {
        let text = resolve_caption(time, &captions);
        if text.is_empty() {
            println!("  At {:>6.2}s: (no caption)", time);
        } else {
            println!("  At {:>6.2}s: \"{}\"", time, text);
        }
    }

    println!("\n--------------------------------------\n");

    match parse_captions("00:00:01 fine\n1:30 not a timestamp") {
        Ok(_) => println!("Unexpectedly parsed malformed input"),
        Err(e) => println!("Malformed input rejected: {}", e),
    }

    println!("\n--------------------------------------\n");

    for url in [
        "https://cdn.example.com/talk.webm",
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        "https://youtu.be/abc123XYZ_",
    ] {
        if let Some(source) = PlaybackSource::classify(url) {
            println!(
                "{} -> {} (mime: {:?}, video id: {:?})",
                url,
                source.kind(),
                source.mime_type(),
                source.video_id()
            );
        }
    }
}

//! SRT subtitle text extraction.

/// Reduce an SRT document to its plain text.
///
/// Blocks are separated by blank lines; within a block the first line is the
/// cue number and the second the timestamp range, so everything after those
/// is text. Malformed blocks (fewer than three lines) are skipped.
pub fn extract_text(srt: &str) -> String {
    let mut full_text = String::new();

    for block in srt.split("\n\n") {
        if block.trim().is_empty() {
            continue;
        }
        let lines: Vec<&str> = block.lines().collect();
        if lines.len() < 3 {
            continue;
        }
        let text = lines[2..].join(" ");
        if !full_text.is_empty() {
            full_text.push(' ');
        }
        full_text.push_str(&text);
    }

    full_text
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:00,000 --> 00:00:04,000\nThe patient presented\n\n2\n00:00:04,000 --> 00:00:09,500\nwith lower back pain\nradiating to the left leg\n\n";

    #[test]
    fn joins_cue_text_with_spaces() {
        assert_eq!(
            extract_text(SAMPLE),
            "The patient presented with lower back pain radiating to the left leg"
        );
    }

    #[test]
    fn skips_malformed_blocks() {
        let srt = "1\nonly-two-lines\n\n2\n00:00:00,000 --> 00:00:01,000\nkept\n";
        assert_eq!(extract_text(srt), "kept");
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert_eq!(extract_text(""), "");
        assert_eq!(extract_text("\n\n\n\n"), "");
    }
}

//! Deterministic construction of single-input encode command lines.

use dictum_core::{AudioFormat, EncodeSettings};

/// Builder for one `-i <input> ... <output>` invocation.
///
/// The codec and bitrate applicability come from the [`AudioFormat`] tables;
/// a format that takes no bitrate never produces a `-b:a` flag, whatever the
/// settings say.
#[derive(Debug, Clone)]
pub struct EncodeCommand {
    input: String,
    output: String,
    format: AudioFormat,
    start: Option<f64>,
    duration: Option<f64>,
    sample_rate: Option<u32>,
    channels: Option<u8>,
    bitrate: Option<String>,
    strip_metadata: bool,
    clear_tag_fields: bool,
    bitexact: bool,
    container: Option<&'static str>,
}

impl EncodeCommand {
    /// Start from the job settings: codec, bitrate, sample rate, channels.
    pub fn new(input: impl Into<String>, output: impl Into<String>, settings: &EncodeSettings) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            format: settings.format,
            start: None,
            duration: None,
            sample_rate: Some(settings.sample_rate),
            channels: Some(settings.channels),
            bitrate: settings
                .format
                .uses_bitrate()
                .then(|| settings.bitrate.clone()),
            strip_metadata: false,
            clear_tag_fields: false,
            bitexact: false,
            container: None,
        }
    }

    /// A bare command for the format, without resampling flags.
    pub fn bare(input: impl Into<String>, output: impl Into<String>, format: AudioFormat) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            format,
            start: None,
            duration: None,
            sample_rate: None,
            channels: None,
            bitrate: None,
            strip_metadata: false,
            clear_tag_fields: false,
            bitexact: false,
            container: None,
        }
    }

    /// Extract only `[start, start + duration)` from the input.
    pub fn window(mut self, start: f64, duration: f64) -> Self {
        self.start = Some(start);
        self.duration = Some(duration);
        self
    }

    /// Override the bitrate. Ignored for formats without one.
    pub fn bitrate(mut self, bitrate: impl Into<String>) -> Self {
        if self.format.uses_bitrate() {
            self.bitrate = Some(bitrate.into());
        }
        self
    }

    /// Remove all metadata from the output (`-map_metadata -1`).
    pub fn strip_metadata(mut self) -> Self {
        self.strip_metadata = true;
        self
    }

    /// Clear the common tag fields individually in addition to
    /// `-map_metadata -1`; some muxers re-synthesize tags otherwise.
    pub fn clear_tag_fields(mut self) -> Self {
        self.clear_tag_fields = true;
        self.strip_metadata = true;
        self
    }

    /// Request bit-exact output (`-flags +bitexact`).
    pub fn bitexact(mut self) -> Self {
        self.bitexact = true;
        self
    }

    /// Force the output container (`-f <name>`), for intermediates whose
    /// name alone does not pin the muxer.
    pub fn container(mut self, container: &'static str) -> Self {
        self.container = Some(container);
        self
    }

    /// Render the argv.
    pub fn build(self) -> Vec<String> {
        let mut args: Vec<String> = vec!["-i".into(), self.input];

        if let Some(start) = self.start {
            args.push("-ss".into());
            args.push(format!("{start:.3}"));
        }
        if let Some(duration) = self.duration {
            args.push("-t".into());
            args.push(format!("{duration:.3}"));
        }
        if let Some(rate) = self.sample_rate {
            args.push("-ar".into());
            args.push(rate.to_string());
        }
        if let Some(channels) = self.channels {
            args.push("-ac".into());
            args.push(channels.to_string());
        }

        args.push("-c:a".into());
        args.push(self.format.codec_name().into());

        if let Some(bitrate) = self.bitrate {
            args.push("-b:a".into());
            args.push(bitrate);
        }

        if self.clear_tag_fields {
            for field in ["title", "artist", "album", "comment", "year"] {
                args.push("-metadata".into());
                args.push(format!("{field}="));
            }
        }
        if self.strip_metadata {
            args.push("-map_metadata".into());
            args.push("-1".into());
        }
        if self.bitexact {
            args.push("-flags".into());
            args.push("+bitexact".into());
        }

        if let Some(container) = self.container {
            args.push("-f".into());
            args.push(container.into());
        }

        args.push(self.output);
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(format: AudioFormat) -> EncodeSettings {
        EncodeSettings {
            format,
            bitrate: "128k".into(),
            sample_rate: 44_100,
            channels: 2,
        }
    }

    #[test]
    fn codec_selection_follows_format_table() {
        for (format, codec) in [
            (AudioFormat::Mp3, "libmp3lame"),
            (AudioFormat::M4a, "aac"),
            (AudioFormat::Opus, "libopus"),
            (AudioFormat::Wav, "pcm_s16le"),
        ] {
            let args = EncodeCommand::new("in", "out", &settings(format)).build();
            let pos = args.iter().position(|a| a == "-c:a").unwrap();
            assert_eq!(args[pos + 1], codec);
        }
    }

    #[test]
    fn wav_never_gets_a_bitrate_flag() {
        let args = EncodeCommand::new("in.wav", "out.wav", &settings(AudioFormat::Wav))
            .bitrate("320k")
            .build();
        assert!(!args.iter().any(|a| a == "-b:a"));
    }

    #[test]
    fn lossy_formats_get_the_bitrate_flag() {
        let args = EncodeCommand::new("in.wav", "out.mp3", &settings(AudioFormat::Mp3)).build();
        let pos = args.iter().position(|a| a == "-b:a").unwrap();
        assert_eq!(args[pos + 1], "128k");
    }

    #[test]
    fn window_flags_precede_resampling() {
        let args = EncodeCommand::new("in.mp3", "out.mp3", &settings(AudioFormat::Mp3))
            .window(597.0, 600.0)
            .build();
        assert_eq!(args[0], "-i");
        assert_eq!(args[1], "in.mp3");
        assert_eq!(args[2], "-ss");
        assert_eq!(args[3], "597.000");
        assert_eq!(args[4], "-t");
        assert_eq!(args[5], "600.000");
    }

    #[test]
    fn tag_clearing_includes_full_strip() {
        let args = EncodeCommand::new("in.mp3", "out.mp3", &settings(AudioFormat::Mp3))
            .clear_tag_fields()
            .bitexact()
            .build();
        assert!(args.iter().any(|a| a == "title="));
        let pos = args.iter().position(|a| a == "-map_metadata").unwrap();
        assert_eq!(args[pos + 1], "-1");
        assert!(args.iter().any(|a| a == "+bitexact"));
    }

    #[test]
    fn container_override_lands_before_output() {
        let args = EncodeCommand::new("in.m4a", "tmp/part.wav", &settings(AudioFormat::Wav))
            .container("wav")
            .build();
        let len = args.len();
        assert_eq!(args[len - 3], "-f");
        assert_eq!(args[len - 2], "wav");
        assert_eq!(args[len - 1], "tmp/part.wav");
    }

    #[test]
    fn output_is_always_last() {
        let args = EncodeCommand::new("a", "b", &settings(AudioFormat::Opus)).build();
        assert_eq!(args.last().unwrap(), "b");
    }
}

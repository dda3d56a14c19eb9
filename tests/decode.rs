// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use gst_conformance::backend::gstreamer::GstApi;
use gst_conformance::backend::gstreamer::GstDecoder;
use gst_conformance::backend::gstreamer::GstDecoderDescriptor;
use gst_conformance::checksum::md5_digest;
use gst_conformance::checksum::Md5Checksum;
use gst_conformance::process::CommandRunner;
use gst_conformance::process::ProcessOutput;
use gst_conformance::process::ProcessRunner;
use gst_conformance::process::RunError;
use gst_conformance::Api;
use gst_conformance::Codec;
use gst_conformance::DecodedFormat;
use gst_conformance::Decoder;
use gst_conformance::DecoderRegistry;
use gst_conformance::Error;

const FRAME_DATA: &[u8] = b"\x10\x20\x30\x40 fake I420 frame data \xeb\x80\x80";

/// Pretends to be `gst-launch`: writes `FRAME_DATA` wherever the last `location=` points to.
#[derive(Default)]
struct FakeLaunch {
    runs: AtomicUsize,
}

impl ProcessRunner for FakeLaunch {
    fn run(
        &self,
        argv: &[String],
        _timeout: Option<Duration>,
        _verbose: bool,
    ) -> Result<ProcessOutput, RunError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(output) = argv.iter().rev().find_map(|arg| arg.strip_prefix("location=")) {
            if argv.iter().any(|arg| arg == "filesink") {
                fs::write(output, FRAME_DATA)?;
            }
        }
        Ok(ProcessOutput { code: Some(0), ..Default::default() })
    }
}

#[test]
fn decode_returns_checksum_of_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.yuv");
    let runner = Arc::new(FakeLaunch::default());
    let registry = DecoderRegistry::with_gstreamer(runner.clone(), Arc::new(Md5Checksum)).unwrap();

    let decoder = registry.get("GStreamer-H.264-Libav-Gst1.0").unwrap();
    let checksum = decoder
        .decode(
            Path::new("vector.264"),
            &output,
            DecodedFormat::Yuv420p,
            Duration::from_secs(30),
            false,
        )
        .unwrap();

    assert_eq!(checksum, md5_digest(FRAME_DATA));
    assert_eq!(checksum, format!("{:x}", md5::compute(fs::read(&output).unwrap())));
    assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
}

#[test]
fn availability_through_registry() {
    let runner = Arc::new(FakeLaunch::default());
    let registry = DecoderRegistry::with_gstreamer(runner.clone(), Arc::new(Md5Checksum)).unwrap();

    for decoder in registry.by_codec(Codec::H265) {
        assert_eq!(registry.is_available(decoder.name(), false), Some(true));
    }
    let checked = runner.runs.load(Ordering::SeqCst);
    assert_eq!(checked, registry.by_codec(Codec::H265).count());

    for decoder in registry.by_codec(Codec::H265) {
        assert_eq!(registry.is_available(decoder.name(), false), Some(true));
    }
    assert_eq!(runner.runs.load(Ordering::SeqCst), checked);
}

#[cfg(unix)]
mod real_process {
    use super::*;

    /// Shell script standing in for `gst-launch`: writes its own argument list to the
    /// `location=` of the sink, after sleeping for `$FAKE_SLEEP` seconds if set.
    const FAKE_LAUNCH: &str = r#"
sleep "${FAKE_SLEEP:-0}"
for arg; do
    case "$arg" in
        location=*) out="${arg#location=}" ;;
    esac
done
printf '%s\n' "$@" > "$out"
"#;

    fn decoder(dir: &Path, gst_api: GstApi, sleep: u32) -> GstDecoder {
        let script = dir.join("fake-launch.sh");
        fs::write(&script, format!("FAKE_SLEEP={}\n{}", sleep, FAKE_LAUNCH)).unwrap();
        let descriptor = GstDecoderDescriptor::new(
            "GStreamer",
            Codec::H264,
            Api::Libav,
            gst_api,
            " h264parse ! avdec_h264 ",
            false,
        )
        .with_cmd(&format!("sh {}", script.display()));

        GstDecoder::new(descriptor, Arc::new(CommandRunner), Arc::new(Md5Checksum))
    }

    #[test]
    fn decode_with_subprocess() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.yuv");
        let decoder = decoder(dir.path(), GstApi::V1_0, 0);

        let checksum = decoder
            .decode(
                Path::new("in.264"),
                &output,
                DecodedFormat::Yuv420p,
                Duration::from_secs(30),
                false,
            )
            .unwrap();

        let written = fs::read_to_string(&output).unwrap();
        let sink = format!("location={}", output.display());
        assert_eq!(
            written.lines().collect::<Vec<_>>(),
            [
                "filesrc",
                "location=in.264",
                "!",
                "h264parse",
                "!",
                "avdec_h264",
                "!",
                "video/x-raw",
                "!",
                "videoconvert",
                "dither=none",
                "!",
                "video/x-raw,format=I420",
                "!",
                "filesink",
                sink.as_str(),
            ]
        );
        assert_eq!(checksum, md5_digest(written.as_bytes()));
    }

    #[test]
    fn legacy_decode_with_subprocess() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.yuv");
        let decoder = decoder(dir.path(), GstApi::V0_10, 0);

        decoder
            .decode(
                Path::new("in.264"),
                &output,
                DecodedFormat::Yuv444p,
                Duration::from_secs(30),
                false,
            )
            .unwrap();

        let written = fs::read_to_string(&output).unwrap();
        assert!(!written.contains("videoconvert"));
        assert!(written.lines().any(|line| line == "video/x-raw-yuv"));
    }

    #[test]
    fn decode_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.yuv");
        let decoder = decoder(dir.path(), GstApi::V1_0, 30);

        let err = decoder
            .decode(
                Path::new("in.264"),
                &output,
                DecodedFormat::Yuv420p,
                Duration::from_millis(300),
                false,
            )
            .unwrap_err();

        assert!(matches!(err, Error::Timeout { .. }), "{:?}", err);
        assert!(!output.exists());
    }

    #[test]
    fn decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        // The sink points to a directory that does not exist, so the script fails.
        let output = dir.path().join("missing").join("out.yuv");
        let decoder = decoder(dir.path(), GstApi::V1_0, 0);

        let err = decoder
            .decode(
                Path::new("in.264"),
                &output,
                DecodedFormat::Yuv420p,
                Duration::from_secs(30),
                false,
            )
            .unwrap_err();

        match err {
            Error::Process { code, output, .. } => {
                assert_ne!(code, Some(0));
                assert!(!output.is_empty());
            }
            e => panic!("unexpected error {:?}", e),
        }
    }
}

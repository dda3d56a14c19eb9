// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! GStreamer backend.
//!
//! Every decoder is a `gst-launch` pipeline reading the test vector with `filesrc`, feeding it
//! through a decoder bin and writing raw frames with `filesink`. Variants only differ by the
//! decoder bin and the GStreamer API version they target.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::checksum::FileChecksum;
use crate::decoder::Decoder;
use crate::decoder::Error;
use crate::decoder::Result;
use crate::process::normalize_binary_cmd;
use crate::process::split_command_line;
use crate::process::ProcessRunner;
use crate::process::RunError;
use crate::Api;
use crate::Codec;
use crate::DecodedFormat;

/// Upper bound for an availability check. Checks do not process any data, so a check running
/// for this long is stuck.
pub const CHECK_TIMEOUT: Duration = Duration::from_secs(30);

const GSTREAMER: &str = "GStreamer";
const FLUENDO: &str = "Fluendo";

/// GStreamer API version a decoder is built for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GstApi {
    V1_0,
    /// Legacy 0.10 API. Its pipelines have no format conversion stage, so frames are written in
    /// the decoder's native format.
    V0_10,
}

impl GstApi {
    pub fn version(&self) -> &'static str {
        match self {
            GstApi::V1_0 => "1.0",
            GstApi::V0_10 => "0.10",
        }
    }

    /// Name of the `gst-launch` binary for this version.
    fn launch_cmd(&self) -> &'static str {
        match self {
            GstApi::V1_0 => "gst-launch-1.0",
            GstApi::V0_10 => "gst-launch-0.10",
        }
    }

    /// Caps of raw video for this version.
    fn raw_caps(&self) -> &'static str {
        match self {
            GstApi::V1_0 => "video/x-raw",
            GstApi::V0_10 => "video/x-raw-yuv",
        }
    }
}

impl fmt::Display for GstApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.version())
    }
}

/// Static description of one GStreamer decoder variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GstDecoderDescriptor {
    /// `<provider>-<codec>-<api>-Gst<version>`. Test suites refer to decoders by this name.
    pub name: String,
    pub description: String,
    pub codec: Codec,
    /// Pipeline fragment doing the actual decoding, e.g. `h264parse ! avdec_h264`.
    pub decoder_bin: String,
    /// Command the pipeline is passed to.
    pub cmd: String,
    /// Caps forced on the output of `decoder_bin`.
    pub caps: String,
    pub gst_api: GstApi,
    pub provider: String,
    pub api: Api,
    pub hw_acceleration: bool,
}

impl GstDecoderDescriptor {
    pub fn new(
        provider: &str,
        codec: Codec,
        api: Api,
        gst_api: GstApi,
        decoder_bin: &str,
        hw_acceleration: bool,
    ) -> Self {
        Self {
            name: format!("{}-{}-{}-Gst{}", provider, codec, api, gst_api),
            description: format!(
                "{} {} {} decoder for GStreamer {}",
                provider, codec, api, gst_api
            ),
            codec,
            decoder_bin: decoder_bin.to_string(),
            cmd: normalize_binary_cmd(gst_api.launch_cmd()),
            caps: gst_api.raw_caps().to_string(),
            gst_api,
            provider: provider.to_string(),
            api,
            hw_acceleration,
        }
    }

    /// Replaces the command the decoding pipeline is passed to.
    pub fn with_cmd(mut self, cmd: &str) -> Self {
        self.cmd = normalize_binary_cmd(cmd);
        self
    }

    /// Replaces the caps forced on the output of the decoder bin.
    pub fn with_caps(mut self, caps: &str) -> Self {
        self.caps = caps.to_string();
        self
    }

    /// Generates the command line decoding `input` into `output`.
    ///
    /// `output_format` is only honored by GStreamer 1.0 decoders: 0.10 pipelines write whatever
    /// the decoder produces.
    pub fn gen_pipeline(
        &self,
        input: &Path,
        output: &Path,
        output_format: DecodedFormat,
    ) -> Result<String> {
        let caps = match self.gst_api {
            GstApi::V1_0 => Cow::Owned(format!(
                "{} ! videoconvert dither=none ! video/x-raw,format={}",
                self.caps,
                output_format.to_gst()?
            )),
            GstApi::V0_10 => Cow::Borrowed(self.caps.as_str()),
        };

        Ok(format!(
            "{} filesrc location={} ! {} ! {} ! filesink location={}",
            self.cmd,
            quote_path(input)?,
            self.decoder_bin.trim(),
            caps,
            quote_path(output)?
        ))
    }

    /// Command line checking that the decoder bin can be instantiated, without any input.
    pub fn check_pipeline(&self) -> String {
        format!(
            "{} appsrc num-buffers=0 ! {} ! fakesink",
            normalize_binary_cmd(self.gst_api.launch_cmd()),
            self.decoder_bin.trim()
        )
    }
}

/// Quotes `path` for the shell if needed. Plain paths are passed through unchanged.
///
/// Paths that are not valid UTF-8 are rejected rather than converted lossily.
fn quote_path(path: &Path) -> Result<String> {
    let path = path.to_str().ok_or_else(|| {
        Error::Configuration(format!("path {} is not valid UTF-8", path.display()))
    })?;
    shlex::try_quote(path)
        .map(|quoted| quoted.into_owned())
        .map_err(|e| Error::Configuration(format!("cannot use {:?} in a pipeline: {}", path, e)))
}

/// A [`Decoder`] running a GStreamer pipeline.
pub struct GstDecoder {
    descriptor: GstDecoderDescriptor,
    runner: Arc<dyn ProcessRunner>,
    checksum: Arc<dyn FileChecksum>,
}

impl GstDecoder {
    pub fn new(
        descriptor: GstDecoderDescriptor,
        runner: Arc<dyn ProcessRunner>,
        checksum: Arc<dyn FileChecksum>,
    ) -> Self {
        Self { descriptor, runner, checksum }
    }

    pub fn descriptor(&self) -> &GstDecoderDescriptor {
        &self.descriptor
    }

    fn split(pipeline: &str) -> Result<Vec<String>> {
        split_command_line(pipeline)
            .ok_or_else(|| Error::Configuration(format!("malformed pipeline `{}`", pipeline)))
    }
}

impl Decoder for GstDecoder {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn description(&self) -> &str {
        &self.descriptor.description
    }

    fn codec(&self) -> Codec {
        self.descriptor.codec
    }

    fn hw_acceleration(&self) -> bool {
        self.descriptor.hw_acceleration
    }

    fn api_version(&self) -> &str {
        self.descriptor.gst_api.version()
    }

    fn decode(
        &self,
        input: &Path,
        output: &Path,
        output_format: DecodedFormat,
        timeout: Duration,
        verbose: bool,
    ) -> Result<String> {
        let pipeline = self.descriptor.gen_pipeline(input, output, output_format)?;
        let argv = Self::split(&pipeline)?;

        match self.runner.run(&argv, Some(timeout), verbose) {
            Ok(out) if out.success() => (),
            Ok(out) => {
                return Err(Error::Process { pipeline, code: out.code, output: out.combined() })
            }
            Err(RunError::TimedOut(_)) => return Err(Error::Timeout { pipeline, timeout }),
            Err(RunError::EmptyCommand) => {
                return Err(Error::Configuration(format!("empty pipeline for {}", self.name())))
            }
            Err(RunError::Spawn { source, .. }) | Err(RunError::Io(source)) => {
                return Err(Error::Spawn { pipeline, source })
            }
        }

        self.checksum
            .file_checksum(output)
            .map_err(|source| Error::Io { path: output.to_path_buf(), source })
    }

    fn check(&self, verbose: bool) -> bool {
        let pipeline = self.descriptor.check_pipeline();
        let argv = match Self::split(&pipeline) {
            Ok(argv) => argv,
            Err(e) => {
                log::debug!("{}: {}", self.name(), e);
                return false;
            }
        };

        match self.runner.run(&argv, Some(CHECK_TIMEOUT), verbose) {
            Ok(out) if out.success() => true,
            Ok(out) => {
                log::debug!("{} is not available: {}", self.name(), out.combined().trim());
                false
            }
            Err(e) => {
                log::debug!("{} is not available: {}", self.name(), e);
                false
            }
        }
    }
}

/// Descriptors of all the GStreamer decoders we know of.
pub fn descriptors() -> Vec<GstDecoderDescriptor> {
    use Api::*;
    use Codec::*;
    use GstApi::*;

    vec![
        GstDecoderDescriptor::new(GSTREAMER, H264, Libav, V1_0, " h264parse ! avdec_h264 ", false),
        GstDecoderDescriptor::new(GSTREAMER, H265, Libav, V1_0, " h265parse ! avdec_h265 ", false),
        GstDecoderDescriptor::new(GSTREAMER, H265, Vaapi, V1_0, " h265parse ! vaapih265dec ", true),
        GstDecoderDescriptor::new(GSTREAMER, H265, Msdk, V1_0, " h265parse ! msdkh265dec ", true),
        GstDecoderDescriptor::new(GSTREAMER, H265, Nvdec, V1_0, " h265parse ! nvh265dec ", true),
        GstDecoderDescriptor::new(GSTREAMER, H265, D3d11, V1_0, " h265parse ! d3d11h265dec ", true),
        GstDecoderDescriptor::new(GSTREAMER, H264, Vaapi, V1_0, " h264parse ! vaapih264dec ", true),
        GstDecoderDescriptor::new(GSTREAMER, H264, Msdk, V1_0, " h264parse ! msdkh264dec ", true),
        GstDecoderDescriptor::new(GSTREAMER, H264, Nvdec, V1_0, " h264parse ! nvh264dec ", true),
        GstDecoderDescriptor::new(GSTREAMER, H264, D3d11, V1_0, " h264parse ! d3d11h264dec ", true),
        GstDecoderDescriptor::new(FLUENDO, H265, Sw, V1_0, " h265parse ! fluh265dec ", false),
        GstDecoderDescriptor::new(FLUENDO, H265, Sw, V0_10, " h265parse ! fluh265dec ", false),
        GstDecoderDescriptor::new(FLUENDO, H264, Sw, V1_0, " h264parse ! fluh264dec ", false),
        GstDecoderDescriptor::new(FLUENDO, H264, Sw, V0_10, " fluh264dec ", false),
        GstDecoderDescriptor::new(FLUENDO, H264, Hw, V1_0, " h264parse ! fluvadec ", true),
        GstDecoderDescriptor::new(FLUENDO, H265, Hw, V1_0, " h265parse ! fluvadec ", true),
    ]
}

/// Builds a decoder for every entry of [`descriptors`], all sharing `runner` and `checksum`.
pub fn decoders(
    runner: Arc<dyn ProcessRunner>,
    checksum: Arc<dyn FileChecksum>,
) -> Vec<GstDecoder> {
    descriptors()
        .into_iter()
        .map(|descriptor| GstDecoder::new(descriptor, Arc::clone(&runner), Arc::clone(&checksum)))
        .collect()
}

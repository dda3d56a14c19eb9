// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::path::PathBuf;

use argh::FromArgs;

use gst_conformance::Codec;
use gst_conformance::DecodedFormat;

/// Runs conformance test vectors through GStreamer decoders
#[derive(Debug, FromArgs)]
pub struct Args {
    /// input file to decode
    #[argh(positional)]
    pub input: Option<PathBuf>,

    /// list the known decoders and exit
    #[argh(switch)]
    pub list: bool,

    /// when listing, also check whether each decoder can run on this machine
    #[argh(switch)]
    pub check: bool,

    /// only consider decoders for this codec (h264, h265)
    #[argh(option)]
    pub codec: Option<Codec>,

    /// name of the decoder to use, as printed by --list
    #[argh(option)]
    pub decoder: Option<String>,

    /// output file to write the decoded frames to. Default: <input>.yuv
    #[argh(option)]
    pub output: Option<PathBuf>,

    /// pixel format to decode into. Default: yuv420p
    #[argh(option, default = "DecodedFormat::Yuv420p")]
    pub output_format: DecodedFormat,

    /// seconds after which the decoder is killed. Default: 30
    #[argh(option, default = "30")]
    pub timeout: u64,

    /// expected MD5 of the decoded output
    #[argh(option)]
    pub golden: Option<String>,

    /// show the output of the pipelines
    #[argh(switch, short = 'v')]
    pub verbose: bool,
}

/// Output path used when none is given: the input with a `.yuv` extension.
pub fn default_output(input: &std::path::Path) -> PathBuf {
    input.with_extension("yuv")
}

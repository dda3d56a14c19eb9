// Copyright 2022 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::Codec;
use crate::DecodedFormat;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("output format {0} is not supported by this decoder")]
    UnsupportedFormat(DecodedFormat),
    #[error("`{pipeline}` failed with {}:\n{output}", exit_description(.code))]
    Process {
        pipeline: String,
        /// Exit code, or `None` if the process was terminated by a signal.
        code: Option<i32>,
        /// Captured stdout followed by stderr.
        output: String,
    },
    #[error("`{pipeline}` timed out after {timeout:?}")]
    Timeout { pipeline: String, timeout: Duration },
    #[error("could not run `{pipeline}`: {source}")]
    Spawn {
        pipeline: String,
        #[source]
        source: std::io::Error,
    },
    #[error("error reading output {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

/// A decoder variant the conformance harness can run test vectors through.
///
/// Implementors are immutable once built, so a single instance can be shared between threads.
pub trait Decoder: Send + Sync {
    /// Unique name used by the harness to select this decoder.
    fn name(&self) -> &str;

    /// Human readable description.
    fn description(&self) -> &str;

    fn codec(&self) -> Codec;

    /// Whether this decoder relies on hardware acceleration.
    fn hw_acceleration(&self) -> bool;

    /// Version of the tool API this decoder targets, e.g. `1.0` for GStreamer 1.0.
    fn api_version(&self) -> &str;

    /// Decodes `input` into `output` using `output_format` for the raw frames, and returns the
    /// checksum of `output`.
    ///
    /// The decoding process is killed if it takes longer than `timeout`. When `verbose` is set
    /// the output of the process is forwarded to the caller's stdout and stderr.
    fn decode(
        &self,
        input: &Path,
        output: &Path,
        output_format: DecodedFormat,
        timeout: Duration,
        verbose: bool,
    ) -> Result<String>;

    /// Returns whether the decoder can run on this machine.
    ///
    /// This never fails: any error encountered while probing means the decoder is not
    /// available. The result is not cached, see [`crate::DecoderRegistry::is_available`] for
    /// that.
    fn check(&self, verbose: bool) -> bool;
}

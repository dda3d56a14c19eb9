// Copyright 2022 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Decoder backends for conformance testing.
//!
//! Each backend drives an external pipeline tool to decode a test vector into a raw file, and
//! returns the checksum of that file so a harness can compare it against a reference value.

pub mod backend;
pub mod checksum;
pub mod decoder;
pub mod process;
pub mod registry;

use std::fmt;
use std::str::FromStr;

pub use decoder::Decoder;
pub use decoder::Error;
pub use decoder::Result;
pub use registry::DecoderRegistry;

/// Coded format of a test vector.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Codec {
    H264,
    H265,
}

impl Codec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::H264 => "H.264",
            Codec::H265 => "H.265",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Codec {
    type Err = &'static str;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "h264" | "H264" | "h.264" | "H.264" => Ok(Codec::H264),
            "h265" | "H265" | "h.265" | "H.265" | "hevc" | "HEVC" => Ok(Codec::H265),
            _ => Err("unrecognized codec. Valid values: h264, h265"),
        }
    }
}

/// Acceleration API a decoder element is built on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Api {
    Libav,
    Vaapi,
    Msdk,
    Nvdec,
    D3d11,
    /// Vendor software implementation.
    Sw,
    /// Vendor hardware implementation.
    Hw,
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Api::Libav => "Libav",
            Api::Vaapi => "VAAPI",
            Api::Msdk => "MSDK",
            Api::Nvdec => "NVDEC",
            Api::D3d11 => "D3D11",
            Api::Sw => "SW",
            Api::Hw => "HW",
        })
    }
}

/// Pixel format the decoded frames are written in.
///
/// The names follow the ffmpeg `pix_fmt` spelling used by conformance suites to describe their
/// reference output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DecodedFormat {
    Yuv420p,
    Yuv422p,
    Yuv444p,
    Yuv420p10le,
    Yuv422p10le,
    Yuv444p10le,
    Yuv420p12le,
    Yuv422p12le,
    Yuv444p12le,
    Gray,
    Gray10le,
    Gray12le,
    Gray16le,
    Gbrp,
    Gbrp10le,
    Gbrp12le,
    NV12,
    Unknown,
}

impl DecodedFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodedFormat::Yuv420p => "yuv420p",
            DecodedFormat::Yuv422p => "yuv422p",
            DecodedFormat::Yuv444p => "yuv444p",
            DecodedFormat::Yuv420p10le => "yuv420p10le",
            DecodedFormat::Yuv422p10le => "yuv422p10le",
            DecodedFormat::Yuv444p10le => "yuv444p10le",
            DecodedFormat::Yuv420p12le => "yuv420p12le",
            DecodedFormat::Yuv422p12le => "yuv422p12le",
            DecodedFormat::Yuv444p12le => "yuv444p12le",
            DecodedFormat::Gray => "gray",
            DecodedFormat::Gray10le => "gray10le",
            DecodedFormat::Gray12le => "gray12le",
            DecodedFormat::Gray16le => "gray16le",
            DecodedFormat::Gbrp => "gbrp",
            DecodedFormat::Gbrp10le => "gbrp10le",
            DecodedFormat::Gbrp12le => "gbrp12le",
            DecodedFormat::NV12 => "nv12",
            DecodedFormat::Unknown => "unknown",
        }
    }

    /// Returns the GStreamer raw video format name for `self`.
    ///
    /// Fails with [`Error::UnsupportedFormat`] if GStreamer has no equivalent layout.
    pub fn to_gst(&self) -> Result<&'static str> {
        match self {
            DecodedFormat::Yuv420p => Ok("I420"),
            DecodedFormat::Yuv422p => Ok("Y42B"),
            DecodedFormat::Yuv444p => Ok("Y444"),
            DecodedFormat::Yuv420p10le => Ok("I420_10LE"),
            DecodedFormat::Yuv422p10le => Ok("I422_10LE"),
            DecodedFormat::Yuv444p10le => Ok("Y444_10LE"),
            DecodedFormat::Yuv420p12le => Ok("I420_12LE"),
            DecodedFormat::Yuv422p12le => Ok("I422_12LE"),
            DecodedFormat::Yuv444p12le => Ok("Y444_12LE"),
            DecodedFormat::Gray => Ok("GRAY8"),
            DecodedFormat::Gray16le => Ok("GRAY16_LE"),
            DecodedFormat::Gbrp => Ok("GBR"),
            DecodedFormat::Gbrp10le => Ok("GBR_10LE"),
            DecodedFormat::Gbrp12le => Ok("GBR_12LE"),
            DecodedFormat::NV12 => Ok("NV12"),
            DecodedFormat::Gray10le | DecodedFormat::Gray12le | DecodedFormat::Unknown => {
                Err(Error::UnsupportedFormat(*self))
            }
        }
    }
}

impl fmt::Display for DecodedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecodedFormat {
    type Err = &'static str;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "yuv420p" | "i420" | "I420" => Ok(DecodedFormat::Yuv420p),
            "yuv422p" => Ok(DecodedFormat::Yuv422p),
            "yuv444p" => Ok(DecodedFormat::Yuv444p),
            "yuv420p10le" => Ok(DecodedFormat::Yuv420p10le),
            "yuv422p10le" => Ok(DecodedFormat::Yuv422p10le),
            "yuv444p10le" => Ok(DecodedFormat::Yuv444p10le),
            "yuv420p12le" => Ok(DecodedFormat::Yuv420p12le),
            "yuv422p12le" => Ok(DecodedFormat::Yuv422p12le),
            "yuv444p12le" => Ok(DecodedFormat::Yuv444p12le),
            "gray" => Ok(DecodedFormat::Gray),
            "gray10le" => Ok(DecodedFormat::Gray10le),
            "gray12le" => Ok(DecodedFormat::Gray12le),
            "gray16le" => Ok(DecodedFormat::Gray16le),
            "gbrp" => Ok(DecodedFormat::Gbrp),
            "gbrp10le" => Ok(DecodedFormat::Gbrp10le),
            "gbrp12le" => Ok(DecodedFormat::Gbrp12le),
            "nv12" | "NV12" => Ok(DecodedFormat::NV12),
            "unknown" => Ok(DecodedFormat::Unknown),
            _ => Err("unrecognized output format. Valid values: yuv420p, yuv422p, yuv444p, nv12, \
                 gray, gbrp and their 10/12-bit variants"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gst_format_names() {
        assert_eq!(DecodedFormat::Yuv420p.to_gst().unwrap(), "I420");
        assert_eq!(DecodedFormat::Yuv422p10le.to_gst().unwrap(), "I422_10LE");
        assert_eq!(DecodedFormat::Gbrp.to_gst().unwrap(), "GBR");
    }

    #[test]
    fn unsupported_gst_format() {
        assert!(matches!(
            DecodedFormat::Gray10le.to_gst(),
            Err(Error::UnsupportedFormat(DecodedFormat::Gray10le))
        ));
        assert!(DecodedFormat::Unknown.to_gst().is_err());
    }

    #[test]
    fn parse_formats() {
        assert_eq!("i420".parse::<DecodedFormat>(), Ok(DecodedFormat::Yuv420p));
        assert_eq!("yuv444p12le".parse::<DecodedFormat>(), Ok(DecodedFormat::Yuv444p12le));
        assert!("rgb24".parse::<DecodedFormat>().is_err());
        for format in [DecodedFormat::Gray16le, DecodedFormat::NV12, DecodedFormat::Gbrp10le] {
            assert_eq!(format.as_str().parse::<DecodedFormat>(), Ok(format));
        }
    }

    #[test]
    fn parse_codecs() {
        assert_eq!("H.264".parse::<Codec>(), Ok(Codec::H264));
        assert_eq!("hevc".parse::<Codec>(), Ok(Codec::H265));
        assert!("vp9".parse::<Codec>().is_err());
        assert_eq!(Codec::H265.to_string(), "H.265");
    }
}

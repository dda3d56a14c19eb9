// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! gstdec, a simple conformance program using the GStreamer decoders. Lists the available
//! decoders, or decodes a test vector and checks the MD5 of the output against a golden value.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::anyhow;
use anyhow::bail;
use anyhow::Context;

use gst_conformance::Decoder;
use gst_conformance::DecoderRegistry;

use crate::util::default_output;
use crate::util::Args;

mod util;

fn list(registry: &DecoderRegistry, args: &Args) {
    let decoders: Box<dyn Iterator<Item = &dyn Decoder> + '_> = match args.codec {
        Some(codec) => Box::new(registry.by_codec(codec)),
        None => Box::new(registry.iter()),
    };

    for decoder in decoders {
        let hw = if decoder.hw_acceleration() { "HW" } else { "SW" };
        let status = if args.check {
            match registry.is_available(decoder.name(), args.verbose) {
                Some(true) => "available ",
                _ => "missing   ",
            }
        } else {
            ""
        };
        println!(
            "{}{} {:<4} {:<32} {}",
            status,
            hw,
            decoder.api_version(),
            decoder.name(),
            decoder.description()
        );
    }
}

fn decode(registry: &DecoderRegistry, args: &Args) -> anyhow::Result<bool> {
    let input = args.input.as_ref().ok_or_else(|| anyhow!("no input file given"))?;
    let name = args.decoder.as_deref().ok_or_else(|| anyhow!("no decoder given, see --list"))?;
    let decoder = registry.get(name).ok_or_else(|| anyhow!("unknown decoder {}", name))?;

    if let Some(codec) = args.codec {
        if decoder.codec() != codec {
            bail!("{} decodes {}, not {}", name, decoder.codec(), codec);
        }
    }

    let output = args.output.clone().unwrap_or_else(|| default_output(input));
    log::info!("Decoding {} with {} into {}", input.display(), name, output.display());

    let md5 = decoder
        .decode(
            input,
            &output,
            args.output_format,
            Duration::from_secs(args.timeout),
            args.verbose,
        )
        .with_context(|| format!("decoding {} failed", input.display()))?;

    println!("{}", md5);

    match &args.golden {
        Some(golden) if !golden.eq_ignore_ascii_case(&md5) => {
            log::error!("MD5 mismatch: expected {}, got {}", golden, md5);
            Ok(false)
        }
        _ => Ok(true),
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Args = argh::from_env();

    let registry = match DecoderRegistry::gstreamer() {
        Ok(registry) => registry,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.list {
        list(&registry, &args);
        return ExitCode::SUCCESS;
    }

    match decode(&registry, &args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

// Copyright 2022 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Catalog of the decoders a conformance run can select from.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::PoisonError;

use crate::backend::gstreamer;
use crate::checksum::FileChecksum;
use crate::checksum::Md5Checksum;
use crate::decoder::Decoder;
use crate::decoder::Error;
use crate::decoder::Result;
use crate::process::CommandRunner;
use crate::process::ProcessRunner;
use crate::Codec;

/// Availability results, keyed by decoder name and verbosity.
///
/// Each key gets its own cell, so concurrent callers check a given decoder at most once while
/// checks of different decoders proceed in parallel.
type AvailabilityCache = Mutex<HashMap<(String, bool), Arc<OnceLock<bool>>>>;

/// Set of decoders indexed by their unique name.
///
/// Decoders can be added but never removed. Iteration follows registration order.
#[derive(Default)]
pub struct DecoderRegistry {
    decoders: Vec<Box<dyn Decoder>>,
    by_name: HashMap<String, usize>,
    availability: AvailabilityCache,
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Builds a registry out of `decoders`, failing if two of them share a name.
    pub fn from_decoders<I, D>(decoders: I) -> Result<Self>
    where
        I: IntoIterator<Item = D>,
        D: Decoder + 'static,
    {
        let mut registry = Self::new();
        for decoder in decoders {
            registry.register(Box::new(decoder))?;
        }
        Ok(registry)
    }

    /// Registry of all the GStreamer decoders, running pipelines through `runner` and
    /// checksumming their output with `checksum`.
    pub fn with_gstreamer(
        runner: Arc<dyn ProcessRunner>,
        checksum: Arc<dyn FileChecksum>,
    ) -> Result<Self> {
        Self::from_decoders(gstreamer::decoders(runner, checksum))
    }

    /// Registry of all the GStreamer decoders, running real processes and using MD5 checksums.
    pub fn gstreamer() -> Result<Self> {
        Self::with_gstreamer(Arc::new(CommandRunner), Arc::new(Md5Checksum))
    }

    /// Adds `decoder` to the registry.
    ///
    /// Names are the lookup key of the harness, so a duplicate is a configuration error.
    pub fn register(&mut self, decoder: Box<dyn Decoder>) -> Result<()> {
        let name = decoder.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(Error::Configuration(format!("decoder {} registered twice", name)));
        }

        log::debug!("Registering decoder {}", name);
        self.by_name.insert(name, self.decoders.len());
        self.decoders.push(decoder);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Decoder> {
        self.by_name.get(name).map(|&index| self.decoders[index].as_ref())
    }

    /// Iterates over all decoders in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Decoder> {
        self.decoders.iter().map(|decoder| decoder.as_ref())
    }

    /// Iterates over the decoders of `codec` in registration order.
    pub fn by_codec(&self, codec: Codec) -> impl Iterator<Item = &dyn Decoder> {
        self.iter().filter(move |decoder| decoder.codec() == codec)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    /// Returns whether decoder `name` can run on this machine, or `None` if there is no such
    /// decoder.
    ///
    /// The decoder is only checked the first time a given (`name`, `verbose`) pair is asked for,
    /// later calls return the remembered answer.
    pub fn is_available(&self, name: &str, verbose: bool) -> Option<bool> {
        let decoder = self.get(name)?;

        let cell = {
            let mut cache = self.availability.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(cache.entry((name.to_string(), verbose)).or_default())
        };

        Some(*cell.get_or_init(|| {
            let available = decoder.check(verbose);
            log::debug!("Decoder {} available: {}", name, available);
            available
        }))
    }
}

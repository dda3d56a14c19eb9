// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Checksums of decoded output, compared by the harness against reference values.

use std::fs::File;
use std::io;
use std::io::Read;
use std::path::Path;

/// Size of the chunks fed to the digest when reading a file.
const CHUNK_SIZE: usize = 64 * 1024;

/// Computes the checksum of a decoded output file.
pub trait FileChecksum: Send + Sync {
    fn file_checksum(&self, path: &Path) -> io::Result<String>;
}

/// MD5 of the whole file, as a lowercase hex string.
#[derive(Debug, Default, Clone, Copy)]
pub struct Md5Checksum;

impl FileChecksum for Md5Checksum {
    fn file_checksum(&self, path: &Path) -> io::Result<String> {
        let mut file = File::open(path)?;
        let mut context = md5::Context::new();
        let mut buf = vec![0u8; CHUNK_SIZE];

        loop {
            let len = match file.read(&mut buf) {
                Ok(0) => break,
                Ok(len) => len,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            context.consume(&buf[..len]);
        }

        Ok(format!("{:x}", context.compute()))
    }
}

/// MD5 of `input`, as a lowercase hex string.
pub fn md5_digest(input: &[u8]) -> String {
    format!("{:x}", md5::compute(input))
}

// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Decoder backends.
//!
//! A backend is a family of decoders sharing the same way of invoking an external tool, most
//! likely a multimedia framework with pluggable, possibly hardware-accelerated, decoder elements.
//! Each variant of a backend is a plain descriptor; the invocation logic lives once per backend.

pub mod gstreamer;

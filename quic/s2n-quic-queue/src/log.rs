// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use tracing::level_filters::LevelFilter;

/// Maps a textual log level to a [`LevelFilter`]
///
/// Matching is case-insensitive. Anything other than `debug` or `info` only lets warnings and
/// errors through, including `error` itself.
pub fn level_filter(level: &str) -> LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        // "warning", "error" and anything unrecognized
        _ => LevelFilter::WARN,
    }
}

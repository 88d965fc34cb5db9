// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::Result;
use core::time::Duration;
use s2n_quic_queue::cancel::Cause;
use serde::Serialize;

#[derive(Debug, Default, Serialize)]
pub struct Report {
    /// Items the producers handed to the queue
    pub sent: u64,
    /// Items the consumers took out of the queue
    pub delivered: u64,
    /// Items rejected because the queue was full
    pub dropped: u64,
    /// Items never sent because the session was cancelled
    pub cancelled: u64,
    pub elapsed: String,
    /// Why the session ended early, if it did
    pub cause: Option<String>,
}

impl Report {
    pub fn finish(mut self, elapsed: Duration, cause: Option<Cause>) -> Result<Self> {
        anyhow::ensure!(
            self.sent == self.delivered,
            "{} items were sent but {} were delivered",
            self.sent,
            self.delivered
        );

        self.elapsed = humantime::format_duration(elapsed).to_string();
        self.cause = cause.map(|cause| cause.to_string());
        Ok(self)
    }

    pub fn print(&self) -> Result {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

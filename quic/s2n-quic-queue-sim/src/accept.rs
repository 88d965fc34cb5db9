// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{report::Report, Result};
use s2n_quic_queue::{accept::Queue, cancel::Token};
use std::sync::Arc;
use structopt::StructOpt;
use tokio::time::Instant;
use tracing::{debug, info};

/// Opens streams on a session and accepts them from several application tasks
#[derive(Debug, StructOpt)]
pub struct Accept {
    /// Number of tasks accepting streams
    #[structopt(long, default_value = "1")]
    consumers: usize,

    /// Number of streams the peer opens
    #[structopt(long, default_value = "1000")]
    streams: u64,

    /// How long the session may run before it's cancelled
    #[structopt(long, default_value = "10s")]
    timeout: humantime::Duration,
}

#[derive(Debug)]
struct Stream {
    id: u64,
}

impl Accept {
    pub async fn simulate(&self) -> Result<Report> {
        let start = Instant::now();
        let queue = Arc::new(Queue::<Stream>::new());
        let session = Token::new().with_timeout(*self.timeout);
        let drain = session.child();

        info!(
            consumers = self.consumers,
            streams = self.streams,
            "starting accept simulation"
        );

        let consumers: Vec<_> = (0..self.consumers)
            .map(|id| {
                let queue = queue.clone();
                let drain = drain.clone();

                tokio::spawn(async move {
                    let mut accepted = 0u64;

                    loop {
                        tokio::select! {
                            stream = queue.accept() => {
                                debug!(id, stream = stream.id, "accepted stream");
                                accepted += 1;
                            }
                            cause = drain.cancelled() => {
                                debug!(id, %cause, "acceptor stopping");
                                break;
                            }
                        }
                    }

                    while queue.pop().is_some() {
                        accepted += 1;
                    }

                    accepted
                })
            })
            .collect();

        let opener = tokio::spawn({
            let queue = queue.clone();
            let session = session.clone();
            let streams = self.streams;

            async move {
                let mut report = Report::default();

                for id in 0..streams {
                    if session.is_cancelled() {
                        report.cancelled = streams - id;
                        break;
                    }

                    queue.push(Stream { id });
                    report.sent += 1;

                    if id % 16 == 0 {
                        tokio::task::yield_now().await;
                    }
                }

                report
            }
        });

        let mut report = opener.await?;

        drain.cancel();

        for consumer in consumers {
            report.delivered += consumer.await?;
        }

        report.finish(start.elapsed(), session.cause())
    }
}

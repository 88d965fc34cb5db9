// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{report::Report, Result};
use bytes::Bytes;
use s2n_quic_queue::{cancel::Token, datagram::Queue};
use std::sync::Arc;
use structopt::StructOpt;
use tokio::time::Instant;
use tracing::{debug, info};

/// Pushes datagrams from several receive paths to several application readers
#[derive(Debug, StructOpt)]
pub struct Datagram {
    /// Number of tasks pushing datagrams
    #[structopt(long, default_value = "1")]
    producers: u8,

    /// Number of tasks popping datagrams
    #[structopt(long, default_value = "1")]
    consumers: usize,

    /// Maximum number of queued datagrams
    #[structopt(long, default_value = "64")]
    capacity: usize,

    /// Number of datagrams each producer sends
    #[structopt(long, default_value = "10000")]
    count: u64,

    /// Payload size of each datagram in bytes
    #[structopt(long, default_value = "1200")]
    size: usize,

    /// Wait for space instead of dropping datagrams when the queue is full
    #[structopt(long)]
    wait: bool,

    /// How long the session may run before it's cancelled
    #[structopt(long, default_value = "10s")]
    timeout: humantime::Duration,
}

impl Datagram {
    pub async fn simulate(&self) -> Result<Report> {
        let start = Instant::now();
        let queue = Arc::new(Queue::new(self.capacity));
        let session = Token::new().with_timeout(*self.timeout);
        // fired once the producers are done so the consumers can drain the queue and exit
        let drain = session.child();

        info!(
            producers = self.producers,
            consumers = self.consumers,
            capacity = queue.capacity(),
            wait = self.wait,
            "starting datagram simulation"
        );

        let producers: Vec<_> = (0..self.producers)
            .map(|id| {
                let queue = queue.clone();
                let session = session.clone();
                let payload = Bytes::from(vec![id; self.size]);
                let count = self.count;
                let wait = self.wait;

                tokio::spawn(async move {
                    let mut report = Report::default();

                    for sent in 0..count {
                        if wait {
                            if let Err(cause) = queue.wait_push(&session, payload.clone()).await {
                                debug!(id, %cause, "producer cancelled");
                                report.cancelled = count - sent;
                                break;
                            }
                        } else if session.is_cancelled() {
                            report.cancelled = count - sent;
                            break;
                        } else if !queue.push(payload.clone()) {
                            report.dropped += 1;
                            // give the consumers a chance to catch up
                            tokio::task::yield_now().await;
                            continue;
                        }

                        report.sent += 1;
                    }

                    report
                })
            })
            .collect();

        let consumers: Vec<_> = (0..self.consumers)
            .map(|id| {
                let queue = queue.clone();
                let drain = drain.clone();

                tokio::spawn(async move {
                    let mut delivered = 0u64;

                    while queue.wait_pop(&drain).await.is_ok() {
                        delivered += 1;
                    }

                    while queue.pop().is_some() {
                        delivered += 1;
                    }

                    debug!(id, delivered, "consumer finished");
                    delivered
                })
            })
            .collect();

        let mut report = Report::default();

        for producer in producers {
            let producer = producer.await?;
            report.sent += producer.sent;
            report.dropped += producer.dropped;
            report.cancelled += producer.cancelled;
        }

        drain.cancel();

        for consumer in consumers {
            report.delivered += consumer.await?;
        }

        report.finish(start.elapsed(), session.cause())
    }
}

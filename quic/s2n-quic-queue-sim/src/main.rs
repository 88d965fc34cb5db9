// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

pub use anyhow::Error;
use s2n_quic_queue::log::level_filter;
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

pub type Result<T = (), E = Error> = core::result::Result<T, E>;

mod accept;
mod datagram;
mod report;

#[derive(Debug, StructOpt)]
struct Args {
    /// Level used when `RUST_LOG` isn't set: debug, info, warning or error
    #[structopt(long, default_value = "warning")]
    log_level: String,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    Accept(accept::Accept),
    Datagram(datagram::Datagram),
}

impl Command {
    fn run(&self) -> Result {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        let report = match self {
            Self::Accept(args) => runtime.block_on(args.simulate())?,
            Self::Datagram(args) => runtime.block_on(args.simulate())?,
        };

        report.print()
    }
}

fn main() -> Result {
    let args = Args::from_args();

    let format = tracing_subscriber::fmt::format()
        .with_ansi(false)
        .compact(); // Use a less verbose output format.

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(level_filter(&args.log_level).into())
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(format)
        .init();

    args.command.run()
}

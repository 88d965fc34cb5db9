// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Queues which hand work from a session's receive path to the application
//!
//! * [`accept::Queue`] carries accepted streams, or any other item, with an edge-triggered
//!   signal for waiting consumers.
//! * [`datagram::Queue`] carries unreliable datagrams with a bounded capacity and cancellable
//!   waits driven by a [`cancel::Token`].

pub mod accept;
pub mod cancel;
pub mod datagram;
pub mod log;

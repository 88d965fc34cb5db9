// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! A bounded queue of unreliable datagrams
//!
//! Datagrams are delivered at most once and in the order they were accepted. The queue offers
//! two ways in and out: `push`/`pop` never block and fail fast when the queue is full or empty,
//! while `wait_push`/`wait_pop` wait for space or data until a [`Token`] fires.

use crate::cancel::{Cause, Token};
use async_channel::{Receiver, Sender};
use bytes::Bytes;
use core::pin::pin;
use futures::future::{self, Either};
use tracing::trace;

#[derive(Debug)]
pub struct Queue {
    sender: Sender<Bytes>,
    receiver: Receiver<Bytes>,
}

impl Queue {
    /// Creates a queue which holds up to `capacity` datagrams
    ///
    /// A `capacity` of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = async_channel::bounded(capacity.max(1));
        Self { sender, receiver }
    }

    /// Returns the maximum number of queued datagrams
    pub fn capacity(&self) -> usize {
        self.sender.capacity().unwrap_or(usize::MAX)
    }

    /// Returns the number of queued datagrams
    pub fn len(&self) -> usize {
        self.sender.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sender.is_empty()
    }

    /// Appends a datagram, returning `false` without blocking if the queue is full
    pub fn push(&self, datagram: Bytes) -> bool {
        match self.sender.try_send(datagram) {
            Ok(()) => true,
            Err(err) => {
                let datagram = err.into_inner();
                trace!(len = datagram.len(), "datagram queue full; dropping datagram");
                false
            }
        }
    }

    /// Appends a datagram, waiting for space until `token` fires
    ///
    /// On cancellation the datagram is discarded and the token's cause is returned.
    pub async fn wait_push(&self, token: &Token, datagram: Bytes) -> Result<(), Cause> {
        let send = pin!(self.sender.send(datagram));

        // `select` polls the token first, so an already fired token never touches the queue
        match future::select(token.cancelled(), send).await {
            Either::Left((cause, _)) => {
                trace!(%cause, "datagram push cancelled");
                Err(cause)
            }
            Either::Right((Ok(()), _)) => Ok(()),
            // the queue owns both halves of the channel so it can't be closed while we're sending
            Either::Right((Err(_), cancelled)) => Err(cancelled.await),
        }
    }

    /// Removes the oldest datagram, returning `None` without blocking if the queue is empty
    pub fn pop(&self) -> Option<Bytes> {
        self.receiver.try_recv().ok()
    }

    /// Removes the oldest datagram, waiting for one until `token` fires
    pub async fn wait_pop(&self, token: &Token) -> Result<Bytes, Cause> {
        let recv = pin!(self.receiver.recv());

        match future::select(token.cancelled(), recv).await {
            Either::Left((cause, _)) => {
                trace!(%cause, "datagram pop cancelled");
                Err(cause)
            }
            Either::Right((Ok(datagram), _)) => Ok(datagram),
            Either::Right((Err(_), cancelled)) => Err(cancelled.await),
        }
    }
}

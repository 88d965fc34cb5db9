// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Cancellation tokens which record why they were cancelled
//!
//! A [`Token`] is shared between the party that decides to stop waiting and any number of
//! waiters. Once fired, every clone of the token observes the same [`Cause`], which lets a caller
//! distinguish a session being aborted from a deadline elapsing.
//!
//! Tokens form a tree: a [`Token::child`] fires when its parent does, inheriting the parent's
//! cause, while cancelling the child leaves the parent untouched.

use core::{fmt, pin::pin, time::Duration};
use futures::future::{self, BoxFuture, Either, FutureExt};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tokio::{sync::Notify, time::Instant};

/// The reason a [`Token`] was fired
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Cause {
    /// The token was explicitly cancelled
    Cancelled,
    /// The token's deadline elapsed
    DeadlineExceeded,
    /// The token was cancelled with an application-defined code, e.g. a session close code
    Application { code: u64 },
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "operation was cancelled"),
            Self::DeadlineExceeded => write!(f, "deadline exceeded"),
            Self::Application { code } => write!(f, "cancelled by the application (code {code})"),
        }
    }
}

impl std::error::Error for Cause {}

#[derive(Debug)]
struct State {
    cause: OnceCell<Cause>,
    notify: Notify,
    deadline: Option<Instant>,
    parent: Option<Token>,
}

/// A cloneable handle to a shared cancellation state
#[derive(Clone, Debug)]
pub struct Token {
    state: Arc<State>,
}

impl Default for Token {
    fn default() -> Self {
        Self::new()
    }
}

impl Token {
    /// Creates a root token with no deadline
    pub fn new() -> Self {
        Self::with_parts(None, None)
    }

    fn with_parts(parent: Option<Token>, deadline: Option<Instant>) -> Self {
        Self {
            state: Arc::new(State {
                cause: OnceCell::new(),
                notify: Notify::new(),
                deadline,
                parent,
            }),
        }
    }

    /// Creates a token which fires when `self` fires or when it is cancelled itself
    pub fn child(&self) -> Self {
        Self::with_parts(Some(self.clone()), None)
    }

    /// Creates a child token which additionally fires with [`Cause::DeadlineExceeded`] at
    /// `deadline`
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Self::with_parts(Some(self.clone()), Some(deadline))
    }

    /// Creates a child token which additionally fires with [`Cause::DeadlineExceeded`] once
    /// `timeout` has elapsed
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns the deadline of this token, if it has one
    pub fn deadline(&self) -> Option<Instant> {
        self.state.deadline
    }

    /// Fires the token with [`Cause::Cancelled`]
    pub fn cancel(&self) {
        self.cancel_with(Cause::Cancelled);
    }

    /// Fires the token with the given cause
    ///
    /// Only the first cause is recorded; cancelling an already fired token has no effect.
    pub fn cancel_with(&self, cause: Cause) {
        self.fire(cause);
    }

    /// Returns the recorded cause, or `None` if the token hasn't fired
    pub fn cause(&self) -> Option<Cause> {
        if let Some(cause) = self.state.cause.get() {
            return Some(*cause);
        }

        if let Some(cause) = self.state.parent.as_ref().and_then(Token::cause) {
            return Some(self.fire(cause));
        }

        if self.deadline_elapsed() {
            return Some(self.fire(Cause::DeadlineExceeded));
        }

        None
    }

    /// Returns `true` if the token has fired
    pub fn is_cancelled(&self) -> bool {
        self.cause().is_some()
    }

    /// Waits for the token to fire and returns its cause
    ///
    /// Resolves immediately if the token has already fired.
    pub fn cancelled(&self) -> BoxFuture<'_, Cause> {
        async move {
            loop {
                // register before checking the state so a concurrent `cancel` wakes us
                let notified = self.state.notify.notified();

                if let Some(cause) = self.cause() {
                    return cause;
                }

                let parent = match &self.state.parent {
                    Some(parent) => parent.cancelled(),
                    None => future::pending::<Cause>().boxed(),
                };

                let deadline = match self.state.deadline {
                    Some(deadline) => Either::Left(tokio::time::sleep_until(deadline)),
                    None => Either::Right(future::pending::<()>()),
                };

                let notified = pin!(notified);
                let deadline = pin!(deadline);

                match future::select(notified, future::select(parent, deadline)).await {
                    Either::Left(_) => continue,
                    Either::Right((Either::Left((cause, _)), _)) => return self.fire(cause),
                    Either::Right((Either::Right(_), _)) => {
                        return self.fire(Cause::DeadlineExceeded)
                    }
                }
            }
        }
        .boxed()
    }

    fn deadline_elapsed(&self) -> bool {
        self.state
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Records `cause` if nothing was recorded yet and returns the cause that won
    fn fire(&self, cause: Cause) -> Cause {
        if self.state.cause.set(cause).is_ok() {
            self.state.notify.notify_waiters();
            return cause;
        }

        self.state.cause.get().copied().unwrap_or(cause)
    }
}

/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Single-value view over a confirm-mode write.

use crate::error::{BrokerError, Error};
use crate::transport::ConfirmCallback;
use futures::ready;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Result of a simplified `publish` / `send_to_queue`.
///
/// Awaiting it yields `Ok(())` once the broker acks the write, or
/// `Err(Error::Write(..))` when the broker nacks it. [`WriteOutcome::ok`] is
/// the underlying write's immediate return value: `false` means the write
/// buffer is saturated and the caller should wait for
/// [`ChannelEvent::Drain`](crate::ChannelEvent::Drain) before writing more. The
/// two are independent; a rejected write may still report `ok() == true`.
#[must_use = "a write outcome does nothing unless awaited or inspected"]
#[derive(Debug)]
pub struct WriteOutcome {
    ok: bool,
    confirmation: oneshot::Receiver<Result<(), BrokerError>>,
}

impl WriteOutcome {
    /// Wraps a callback-style write.
    ///
    /// `write` receives the confirm callback and returns the buffering hint;
    /// the hint is stored before the outcome is handed out, whether or not the
    /// callback already fired.
    pub(crate) fn from_write<W>(write: W) -> Self
    where
        W: FnOnce(ConfirmCallback) -> bool,
    {
        let (sender, confirmation) = oneshot::channel();
        let callback: ConfirmCallback = Box::new(move |result| {
            // The caller may have dropped the outcome; nobody is left to tell.
            let _ = sender.send(result);
        });
        let ok = write(callback);
        Self { ok, confirmation }
    }

    pub fn ok(&self) -> bool {
        self.ok
    }
}

impl Future for WriteOutcome {
    type Output = Result<(), Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let result = ready!(Pin::new(&mut self.confirmation).poll(cx));
        Poll::Ready(match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(Error::Write(err)),
            // Callback dropped unfired: the channel went away with the write pending.
            Err(_) => Err(Error::ChannelClosed),
        })
    }
}

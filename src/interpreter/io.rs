//! Input/output channel between a machine and its embedder
//!
//! A [`Channel`] pairs an optional [`InputProvider`] with an optional
//! [`OutputConsumer`]. The machine's own input backlog is always drained
//! first; the provider is only asked once the backlog is empty.
//!
//! A provider answers each request with an [`Input`]:
//! - [`Input::Value`]: execution continues with that value
//! - [`Input::NoValue`]: the machine writes its idle value (`-1` by default)
//!   and continues without waiting
//! - [`Input::Terminate`]: the machine halts immediately
//!
//! A provider may also block the calling thread until a value exists, as
//! [`LinkInput`] does. That is the only blocking point in the synchronous
//! driver.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Answer to an input request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Value(i64),
    NoValue,
    Terminate,
}

/// Failure reported by an input provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

impl From<String> for ProviderError {
    fn from(message: String) -> Self {
        ProviderError(message)
    }
}

impl From<&str> for ProviderError {
    fn from(message: &str) -> Self {
        ProviderError(message.to_string())
    }
}

/// Source of input values on demand
pub trait InputProvider {
    /// Answer the `request`-th input request (0-based, counting every input
    /// the machine has consumed so far, backlog included)
    fn provide(&mut self, request: usize) -> Result<Input, ProviderError>;
}

impl<F> InputProvider for F
where
    F: FnMut(usize) -> Result<Input, ProviderError>,
{
    fn provide(&mut self, request: usize) -> Result<Input, ProviderError> {
        self(request)
    }
}

/// Observer of output values at emission time
pub trait OutputConsumer {
    fn consume(&mut self, value: i64);
}

impl<F> OutputConsumer for F
where
    F: FnMut(i64),
{
    fn consume(&mut self, value: i64) {
        self(value)
    }
}

/// Provider/consumer pair attached to a single machine run
#[derive(Default)]
pub struct Channel<'a> {
    provider: Option<Box<dyn InputProvider + 'a>>,
    consumer: Option<Box<dyn OutputConsumer + 'a>>,
}

impl<'a> Channel<'a> {
    /// A channel with neither hook: input comes only from the backlog and
    /// output is only collected in the machine's output record
    pub fn buffered() -> Self {
        Channel::default()
    }

    pub fn with_provider(mut self, provider: impl InputProvider + 'a) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    pub fn with_consumer(mut self, consumer: impl OutputConsumer + 'a) -> Self {
        self.consumer = Some(Box::new(consumer));
        self
    }

    /// Ask the provider for input. `None` when no provider is attached.
    pub(crate) fn request(&mut self, index: usize) -> Option<Result<Input, ProviderError>> {
        self.provider.as_mut().map(|p| p.provide(index))
    }

    pub(crate) fn emit(&mut self, value: i64) {
        if let Some(consumer) = self.consumer.as_mut() {
            consumer.consume(value);
        }
    }
}

/// Feeds a text script one character code at a time, then terminates
#[derive(Debug, Clone)]
pub struct ScriptInput {
    codes: VecDeque<i64>,
}

impl ScriptInput {
    pub fn new(script: &str) -> Self {
        ScriptInput {
            codes: script.chars().map(|c| c as i64).collect(),
        }
    }

    /// Character codes not yet handed out
    pub fn remaining(&self) -> usize {
        self.codes.len()
    }
}

impl InputProvider for ScriptInput {
    fn provide(&mut self, _request: usize) -> Result<Input, ProviderError> {
        Ok(match self.codes.pop_front() {
            Some(code) => Input::Value(code),
            None => Input::Terminate,
        })
    }
}

/// Non-blocking provider over a queue shared with whoever fills it
///
/// An empty queue answers [`Input::NoValue`], so the machine reads its idle
/// value and keeps running.
#[derive(Debug, Clone, Default)]
pub struct QueueInput {
    queue: Arc<Mutex<VecDeque<i64>>>,
}

impl QueueInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for pushing values from outside the machine
    pub fn handle(&self) -> Arc<Mutex<VecDeque<i64>>> {
        Arc::clone(&self.queue)
    }
}

impl InputProvider for QueueInput {
    fn provide(&mut self, _request: usize) -> Result<Input, ProviderError> {
        let mut queue = self
            .queue
            .lock()
            .map_err(|_| ProviderError::from("input queue poisoned"))?;
        Ok(match queue.pop_front() {
            Some(value) => Input::Value(value),
            None => Input::NoValue,
        })
    }
}

/// Blocking provider reading from the receiving end of a link
///
/// Each request parks the calling thread until a value arrives. Once every
/// sender is gone and the link is drained the machine is told to terminate,
/// since no value can ever arrive. Must not be used from inside an async
/// runtime.
#[derive(Debug)]
pub struct LinkInput {
    receiver: UnboundedReceiver<i64>,
}

impl LinkInput {
    pub fn new(receiver: UnboundedReceiver<i64>) -> Self {
        LinkInput { receiver }
    }
}

impl InputProvider for LinkInput {
    fn provide(&mut self, _request: usize) -> Result<Input, ProviderError> {
        Ok(match self.receiver.blocking_recv() {
            Some(value) => Input::Value(value),
            None => Input::Terminate,
        })
    }
}

/// Consumer forwarding every output into a link
///
/// Values sent after the downstream machine has finished are discarded.
#[derive(Debug, Clone)]
pub struct LinkOutput {
    sender: UnboundedSender<i64>,
}

impl LinkOutput {
    pub fn new(sender: UnboundedSender<i64>) -> Self {
        LinkOutput { sender }
    }
}

impl OutputConsumer for LinkOutput {
    fn consume(&mut self, value: i64) {
        if self.sender.send(value).is_err() {
            tracing::trace!(value, "link closed, output discarded");
        }
    }
}

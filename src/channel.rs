//! Typed publish/subscribe channel between the scenes and the host
//!
//! Owned by the lifecycle manager and handed to each scene at construction.
//! Every subscriber gets its own mailbox; publishing only enqueues, so a
//! publisher is never re-entered by a subscriber. Scenes drain their mailbox
//! at the start of their update. Dropping (or disposing) a `Subscription`
//! removes its mailbox.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::sim::{CatKey, Direction};

/// Message categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Overlay button state changes
    VirtualInput,
    /// Narration / loading status for accessible announcements
    Status,
}

/// Status narration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Loading,
    Ready,
    LoadFailed,
    /// `cat` was hit; the player should go to `next`
    CatDown { cat: CatKey, next: CatKey },
    /// The player reached `cat`; its cycle is about to begin
    CatFound { cat: CatKey },
    /// A full B-then-A loop completed
    LoopCompleted { loops: u32 },
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Loading => write!(f, "Loading Quantum City..."),
            Status::Ready => write!(f, "Quantum City is ready. Use the arrows to walk."),
            Status::LoadFailed => write!(f, "Could not load Quantum City. Try again."),
            Status::CatDown { cat, next } => {
                write!(f, "Cat {cat} was hit by a car. Find cat {next}.")
            }
            Status::CatFound { cat } => write!(f, "You found cat {cat}."),
            Status::LoopCompleted { loops } => write!(f, "Loop {loops} complete."),
        }
    }
}

/// A message on the channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CityEvent {
    VirtualInput { direction: Direction, pressed: bool },
    Status(Status),
}

impl CityEvent {
    pub fn topic(&self) -> Topic {
        match self {
            CityEvent::VirtualInput { .. } => Topic::VirtualInput,
            CityEvent::Status(_) => Topic::Status,
        }
    }
}

struct Mailbox {
    id: u64,
    topic: Topic,
    queue: VecDeque<CityEvent>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    mailboxes: Vec<Mailbox>,
}

/// Shared, single-threaded channel handle (clones share the same channel)
#[derive(Clone, Default)]
pub struct EventChannel {
    inner: Rc<RefCell<Inner>>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `event` for every subscriber of its topic; returns how many received it
    pub fn publish(&self, event: CityEvent) -> usize {
        let topic = event.topic();
        let mut inner = self.inner.borrow_mut();
        let mut delivered = 0;
        for mailbox in inner.mailboxes.iter_mut().filter(|m| m.topic == topic) {
            mailbox.queue.push_back(event.clone());
            delivered += 1;
        }
        delivered
    }

    /// Convenience for status narration
    pub fn publish_status(&self, status: Status) -> usize {
        log::debug!("status: {status}");
        self.publish(CityEvent::Status(status))
    }

    pub fn subscribe(&self, topic: Topic) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.mailboxes.push(Mailbox {
            id,
            topic,
            queue: VecDeque::new(),
        });
        Subscription {
            id,
            topic,
            channel: Rc::downgrade(&self.inner),
        }
    }

    /// Live subscriptions across all topics
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().mailboxes.len()
    }
}

impl fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Disposer handle for one mailbox
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    topic: Topic,
    channel: Weak<RefCell<Inner>>,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Take every pending message, oldest first
    pub fn drain(&self) -> Vec<CityEvent> {
        let Some(inner) = self.channel.upgrade() else {
            return Vec::new();
        };
        let mut inner = inner.borrow_mut();
        inner
            .mailboxes
            .iter_mut()
            .find(|m| m.id == self.id)
            .map(|m| m.queue.drain(..).collect())
            .unwrap_or_default()
    }

    /// Remove the mailbox now (same as dropping the handle)
    pub fn dispose(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.channel.upgrade() {
            if let Ok(mut inner) = inner.try_borrow_mut() {
                inner.mailboxes.retain(|m| m.id != self.id);
            }
        }
    }
}

use super::ArrivalEvent;
use crate::event_log::EventLog;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::Level;
use std::ops::Deref;
use std::sync::{Arc, Weak};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What an [ArrivalSender] does with an arrival when the channel is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OverflowPolicy {
    /// Evict the oldest pending arrival to make room.
    #[default]
    DropOldest,
    /// Discard the new arrival.
    DropNewest,
}

/// The producer half of the bounded arrival hand-off.
///
/// Sending never blocks. When the channel is full, an arrival is discarded
/// according to the [OverflowPolicy] and a warning is logged.
#[derive(Clone)]
pub struct ArrivalSender {
    tx: Sender<ArrivalEvent>,
    /// Used to evict the oldest pending arrival.
    rx: Receiver<ArrivalEvent>,
    /// Alive while the [ArrivalReceiver] is.
    consumer: Weak<()>,
    policy: OverflowPolicy,
    log: Arc<dyn EventLog>,
}

/// The consumer half of the bounded arrival hand-off.
///
/// Dropping it disconnects every [ArrivalSender], even though the senders
/// keep their own handle on the queue for evictions.
#[derive(Debug)]
pub struct ArrivalReceiver {
    rx: Receiver<ArrivalEvent>,
    _alive: Arc<()>,
}

impl Deref for ArrivalReceiver {
    type Target = Receiver<ArrivalEvent>;

    fn deref(&self) -> &Self::Target {
        &self.rx
    }
}

/// Creates a bounded arrival channel holding up to `capacity` pending arrivals.
pub fn arrival_channel(
    capacity: usize,
    policy: OverflowPolicy,
    log: Arc<dyn EventLog>,
) -> (ArrivalSender, ArrivalReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    let alive = Arc::new(());
    let sender = ArrivalSender {
        tx,
        rx: rx.clone(),
        consumer: Arc::downgrade(&alive),
        policy,
        log,
    };
    (sender, ArrivalReceiver { rx, _alive: alive })
}

impl ArrivalSender {
    /// Offers an arrival to the scheduler.
    /// Returns the arrival that was discarded, if the channel was full.
    ///
    /// Once the receiver is gone every arrival is handed straight back.
    pub fn offer(&self, event: ArrivalEvent) -> Option<ArrivalEvent> {
        if self.is_disconnected() {
            return Some(event);
        }
        let event = match self.tx.try_send(event) {
            Ok(()) => return None,
            Err(TrySendError::Full(event)) | Err(TrySendError::Disconnected(event)) => event,
        };
        match self.policy {
            OverflowPolicy::DropNewest => {
                self.warn_dropped(&event);
                Some(event)
            }
            OverflowPolicy::DropOldest => {
                let oldest = self.rx.try_recv().ok();
                match self.tx.try_send(event) {
                    Ok(()) => {
                        if let Some(oldest) = &oldest {
                            self.warn_dropped(oldest);
                        }
                        oldest
                    }
                    Err(err) => {
                        let event = err.into_inner();
                        self.warn_dropped(&event);
                        Some(event)
                    }
                }
            }
        }
    }

    /// Whether the [ArrivalReceiver] has been dropped.
    pub fn is_disconnected(&self) -> bool {
        self.consumer.strong_count() == 0
    }

    /// The number of pending arrivals.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    fn warn_dropped(&self, event: &ArrivalEvent) {
        self.log.log(
            Level::Warn,
            &format!(
                "arrival channel full; dropped vehicle {} for lane {}",
                event.vehicle_id, event.lane
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::RecentLog;
    use crate::lane::LaneId;
    use crate::vehicle::Direction;

    fn event(id: u32) -> ArrivalEvent {
        ArrivalEvent::new(id, LaneId::AL2, Direction::Straight)
    }

    #[test]
    fn drop_oldest_keeps_newest() {
        let log = Arc::new(RecentLog::silent(10));
        let (tx, rx) = arrival_channel(2, OverflowPolicy::DropOldest, log.clone());
        assert_eq!(tx.offer(event(1)), None);
        assert_eq!(tx.offer(event(2)), None);
        assert_eq!(tx.offer(event(3)), Some(event(1)));
        assert_eq!(rx.try_iter().map(|e| e.vehicle_id).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(log.count(Level::Warn), 1);
    }

    #[test]
    fn drop_newest_keeps_oldest() {
        let log = Arc::new(RecentLog::silent(10));
        let (tx, rx) = arrival_channel(2, OverflowPolicy::DropNewest, log.clone());
        tx.offer(event(1));
        tx.offer(event(2));
        assert_eq!(tx.len(), 2);
        assert_eq!(tx.offer(event(3)), Some(event(3)));
        assert_eq!(rx.try_iter().map(|e| e.vehicle_id).collect::<Vec<_>>(), vec![1, 2]);
        assert!(tx.is_empty());
        assert_eq!(log.count(Level::Warn), 1);
    }

    #[test]
    fn dropping_the_receiver_disconnects() {
        let log = Arc::new(RecentLog::silent(10));
        let (tx, rx) = arrival_channel(1, OverflowPolicy::DropOldest, log.clone());
        let other = tx.clone();
        tx.offer(event(1));
        assert!(!tx.is_disconnected());

        drop(rx);
        assert!(tx.is_disconnected());
        assert!(other.is_disconnected());
        // No eviction and no warning once nobody is listening.
        assert_eq!(tx.offer(event(2)), Some(event(2)));
        assert_eq!(log.count(Level::Warn), 0);
    }
}

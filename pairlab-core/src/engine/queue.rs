//! FIFO event queue owned by the engine.
//!
//! Every stage pushes into the queue; only the engine dispatcher pops from it.
//! `pop` never blocks: an empty queue ends the current tick's drain.

use std::collections::VecDeque;

use crate::domain::Event;

#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    /// Next event in arrival order, or `None` when drained.
    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SignalDirection, SignalEvent};
    use chrono::NaiveDate;

    #[test]
    fn pops_in_arrival_order() {
        let mut queue = EventQueue::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        queue.push(Event::MarketAdvance);
        queue.push(Event::Signal(SignalEvent::new("XOM", date, SignalDirection::Long)));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop(), Some(Event::MarketAdvance));
        assert!(matches!(queue.pop(), Some(Event::Signal(_))));
        assert_eq!(queue.pop(), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn empty_pop_does_not_block() {
        let mut queue = EventQueue::new();
        assert!(queue.pop().is_none());
        assert!(queue.pop().is_none());
    }
}

/// An event stamped with its position in the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<E> {
    pub seq: u64,
    pub event: E,
}

/// FIFO queue of host events, processed one at a time on the event thread.
///
/// Sequence numbers are assigned at emit time and never reused, so traces
/// stay ordered across drains.
#[derive(Debug)]
pub struct EventBus<E> {
    next_seq: u64,
    events: Vec<Envelope<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            next_seq: 0,
            events: Vec::new(),
        }
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: E) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Envelope { seq, event });
        seq
    }

    pub fn events(&self) -> &[Envelope<E>] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Envelope<E>> {
        std::mem::take(&mut self.events)
    }
}

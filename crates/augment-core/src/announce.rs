//! Screen-reader announcement queue: a bounded FIFO of short messages
//!.

use std::collections::VecDeque;

const MAX_PENDING: usize = 4;
const MAX_MESSAGE_LEN: usize = 8192;

#[derive(Debug, Default)]
pub struct AnnounceQueue {
 pending: VecDeque<String>,
}

impl AnnounceQueue {
 pub fn new() -> Self {
 Self {
 pending: VecDeque::with_capacity(MAX_PENDING),
 }
 }

 /// Enqueue an announcement, truncating to the max length and dropping
 /// it silently if the queue is already full.
 pub fn push(&mut self, message: impl Into<String>) {
 if self.pending.len() >= MAX_PENDING {
 return;
 }
 let mut message = message.into();
 if message.len() > MAX_MESSAGE_LEN {
 message.truncate(MAX_MESSAGE_LEN);
 }
 self.pending.push_back(message);
 }

 pub fn pop(&mut self) -> Option<String> {
 self.pending.pop_front()
 }

 pub fn len(&self) -> usize {
 self.pending.len()
 }

 pub fn is_empty(&self) -> bool {
 self.pending.is_empty()
 }
}

#[cfg(test)]
mod tests {
 use super::*;

 #[test]
 fn drops_newest_when_full() {
 let mut queue = AnnounceQueue::new();
 for i in 0..6 {
 queue.push(format!("msg{i}"));
 }
 assert_eq!(queue.len(), 4);
 assert_eq!(queue.pop().unwrap(), "msg0");
 }

 #[test]
 fn truncates_overlong_messages() {
 let mut queue = AnnounceQueue::new();
 queue.push("x".repeat(9000));
 assert_eq!(queue.pop().unwrap().len(), MAX_MESSAGE_LEN);
 }

 #[test]
 fn fifo_order() {
 let mut queue = AnnounceQueue::new();
 queue.push("first");
 queue.push("second");
 assert_eq!(queue.pop().as_deref(), Some("first"));
 assert_eq!(queue.pop().as_deref(), Some("second"));
 assert!(queue.pop().is_none());
 }
}

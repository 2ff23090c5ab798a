//! In-process team channel.
//!
//! Players push envelopes while sensing and ticking; `deliver` hands them
//! out once the whole round has run.  Replies produced while delivering
//! (a `Hello` answer, say) are queued again and go out in the same call.

use pd_core::{AgentId, Timestamp};
use pd_player::{Envelope, Messenger, Player, PlayerResult};

#[derive(Default)]
pub struct Bus {
    /// `None` addressee means broadcast.
    queue: Vec<(Option<AgentId>, Envelope)>,
    sent:  usize,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total envelopes handed to a player so far.
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Drain the queue into `players` until nobody has anything left to say.
    pub fn deliver(&mut self, players: &mut [Player], now: Timestamp) -> PlayerResult<()> {
        while !self.queue.is_empty() {
            let batch = std::mem::take(&mut self.queue);
            for (to, envelope) in batch {
                for player in players.iter_mut() {
                    if player.id() == &envelope.sender {
                        continue;
                    }
                    if to.as_ref().is_some_and(|id| id != player.id()) {
                        continue;
                    }
                    player.handle_message(envelope.clone(), now, self)?;
                    self.sent += 1;
                }
            }
        }
        Ok(())
    }
}

impl Messenger for Bus {
    fn send(&mut self, to: &AgentId, envelope: Envelope) {
        self.queue.push((Some(to.clone()), envelope));
    }

    fn broadcast(&mut self, envelope: Envelope) {
        self.queue.push((None, envelope));
    }
}

//! In-memory doubles for driving the engine in tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::Result;
use super::echo::Echo;
use super::serial::SerialChannel;

/// One open/close cycle seen by the scripted channel
#[derive(Debug, Clone, Default)]
pub(crate) struct Session {
    pub bit_rate: u32,
    pub written: Vec<u8>,
    pub closed: bool,
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Vec<u8>>,
    /// Reply of the open session, not yet readable
    held: Option<Vec<u8>>,
    rx: VecDeque<u8>,
    /// Polls since the last write
    idle_polls: u32,
    sessions: Vec<Session>,
}

/// Serial channel that answers each transaction with the next scripted reply.
///
/// The reply is taken when the channel opens and becomes readable once the
/// request has been written in full, seen as two polls in a row with no write
/// between them. Clones share state.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedChannel {
    script: Arc<Mutex<Script>>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    /// Queues the reply for the next transaction
    pub fn reply(&self, bytes: &[u8]) -> &Self {
        self.lock().replies.push_back(bytes.to_vec());
        self
    }

    /// Queues a transaction that gets no reply at all
    pub fn silence(&self) -> &Self {
        self.reply(&[])
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.lock().sessions.clone()
    }

    /// Bytes written in every session, in order
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.sessions().into_iter().map(|s| s.written).collect()
    }

    /// Writes rendered as text, for AT-style commands
    pub fn written_text(&self) -> Vec<String> {
        self.written()
            .into_iter()
            .map(|w| String::from_utf8_lossy(&w).into_owned())
            .collect()
    }

    pub fn pending_replies(&self) -> usize {
        self.lock().replies.len()
    }
}

impl SerialChannel for ScriptedChannel {
    fn open(&mut self, bit_rate: u32) -> Result<()> {
        let mut script = self.lock();
        let reply = script.replies.pop_front().unwrap_or_default();
        script.held = Some(reply);
        script.rx.clear();
        script.idle_polls = 0;
        script.sessions.push(Session {
            bit_rate,
            ..Default::default()
        });
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        let mut script = self.lock();
        script.idle_polls = 0;
        if let Some(session) = script.sessions.last_mut() {
            session.written.push(byte);
        }
        Ok(())
    }

    fn available(&mut self) -> Result<usize> {
        let mut script = self.lock();
        script.idle_polls += 1;
        if script.idle_polls >= 2 {
            if let Some(reply) = script.held.take() {
                script.rx.extend(reply);
            }
        }
        Ok(script.rx.len())
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        Ok(self.lock().rx.pop_front())
    }

    fn close(&mut self) {
        let mut script = self.lock();
        script.rx.clear();
        script.held = None;
        if let Some(session) = script.sessions.last_mut() {
            session.closed = true;
        }
    }
}

/// Echo sink that keeps every line
#[derive(Debug, Default)]
pub(crate) struct RecordingEcho {
    lines: Mutex<Vec<String>>,
}

impl RecordingEcho {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl Echo for RecordingEcho {
    fn echo(&self, text: &str) {
        self.lines.lock().unwrap().push(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_held_until_request_written() {
        let mut channel = ScriptedChannel::new();
        channel.reply(b"OK\r");
        channel.open(9600).unwrap();

        for &b in b"AT$I=10\r" {
            channel.write_byte(b).unwrap();
            assert_eq!(channel.available().unwrap(), 0);
        }
        assert_eq!(channel.available().unwrap(), 3);
        assert_eq!(channel.read_byte().unwrap(), Some(b'O'));
        channel.close();
        assert_eq!(channel.available().unwrap(), 0);
        assert_eq!(channel.written_text(), vec!["AT$I=10\r".to_string()]);
    }
}

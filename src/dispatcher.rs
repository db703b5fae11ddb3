use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::assembly::AssemblyKind;
use crate::error::Result;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

/// Patch sent to the editing UI after a property change
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UiCommand {
    #[serde(rename_all = "camelCase")]
    RefreshAssembly {
        name: String,
        kind: AssemblyKind,
        revision: u64,
    },
    #[serde(rename_all = "camelCase")]
    RenameAssembly { old_name: String, new_name: String },
    #[serde(rename_all = "camelCase")]
    RemoveAssembly { name: String },
    #[serde(rename_all = "camelCase")]
    RefreshChartArea { name: String },
    #[serde(rename_all = "camelCase")]
    SetRuntimeMessage {
        level: MessageLevel,
        message: String,
    },
}

/// Write-only sink for UI commands; order of sends is preserved
pub trait CommandDispatcher {
    fn send_command(&self, command: UiCommand) -> Result<()>;
}

/// Commands produced while serving one request
#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: Mutex<Vec<UiCommand>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Result<Vec<UiCommand>> {
        Ok(self.commands.lock()?.clone())
    }

    pub fn into_commands(self) -> Result<Vec<UiCommand>> {
        Ok(self.commands.into_inner()?)
    }
}

impl CommandDispatcher for CommandQueue {
    fn send_command(&self, command: UiCommand) -> Result<()> {
        self.commands.lock()?.push(command);
        Ok(())
    }
}

#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct SequencedCommand {
    pub seq: u64,
    pub command: UiCommand,
}

/// Bounded per-document command log polled by every attached client
#[derive(Debug)]
pub struct DocumentChannel {
    log: Mutex<ChannelLog>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct ChannelLog {
    next_seq: u64,
    entries: VecDeque<SequencedCommand>,
}

impl DocumentChannel {
    pub fn new(capacity: usize) -> Self {
        DocumentChannel {
            log: Mutex::new(ChannelLog {
                next_seq: 1,
                entries: VecDeque::new(),
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn publish(&self, commands: &[UiCommand]) -> Result<u64> {
        let mut log = self.log.lock()?;
        for command in commands {
            let seq = log.next_seq;
            log.next_seq += 1;
            log.entries.push_back(SequencedCommand {
                seq,
                command: command.clone(),
            });
            while log.entries.len() > self.capacity {
                log.entries.pop_front();
            }
        }
        Ok(log.next_seq - 1)
    }

    /// Commands with a sequence number greater than `since`
    pub fn since(&self, since: u64) -> Result<Vec<SequencedCommand>> {
        let log = self.log.lock()?;
        Ok(log
            .entries
            .iter()
            .filter(|entry| entry.seq > since)
            .cloned()
            .collect())
    }

    pub fn last_seq(&self) -> Result<u64> {
        Ok(self.log.lock()?.next_seq - 1)
    }
}

impl CommandDispatcher for DocumentChannel {
    fn send_command(&self, command: UiCommand) -> Result<()> {
        self.publish(std::slice::from_ref(&command)).map(|_| ())
    }
}

/// Collects a request's commands and publishes each one to the document
/// channel as it is sent, while the caller still holds the document lock
pub struct Broadcast<'a> {
    queue: CommandQueue,
    channel: &'a DocumentChannel,
    seq: Mutex<u64>,
}

impl<'a> Broadcast<'a> {
    pub fn new(channel: &'a DocumentChannel) -> Self {
        Broadcast {
            queue: CommandQueue::new(),
            channel,
            seq: Mutex::new(0),
        }
    }

    /// Sequence number of the last published command, 0 when nothing was sent
    pub fn last_seq(&self) -> Result<u64> {
        Ok(*self.seq.lock()?)
    }

    pub fn into_commands(self) -> Result<Vec<UiCommand>> {
        self.queue.into_commands()
    }
}

impl CommandDispatcher for Broadcast<'_> {
    fn send_command(&self, command: UiCommand) -> Result<()> {
        let seq = self.channel.publish(std::slice::from_ref(&command))?;
        *self.seq.lock()? = seq;
        self.queue.send_command(command)
    }
}

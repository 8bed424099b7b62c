// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Pending-callback registry with generational handle reuse

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One-shot continuation stored until the host answers
pub type Continuation<P> = Box<dyn FnOnce(P) + Send>;

/// Identifies a pending request on both sides of the bridge
///
/// `callback_id` is the slot index and is reused once the slot frees up.
/// `generation` counts reuses of that slot, so a delivery that targets an
/// earlier occupant is told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackHandle {
    pub callback_id: u32,
    pub generation: u32,
}

impl CallbackHandle {
    /// Create a handle from its wire parts
    pub fn new(callback_id: u32, generation: u32) -> Self {
        Self {
            callback_id,
            generation,
        }
    }

    /// Slot index
    pub fn id(&self) -> u32 {
        self.callback_id
    }
}

impl std::fmt::Display for CallbackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.callback_id, self.generation)
    }
}

enum SlotState<P> {
    Pending(Continuation<P>),
    /// Continuation taken out and running; the id is not yet free
    Running,
    Free,
}

struct Slot<P> {
    generation: u32,
    state: SlotState<P>,
}

/// Registry of continuations keyed by reusable handles
pub struct CallbackRegistry<P> {
    slots: Vec<Slot<P>>,
    /// LIFO: the most recently freed id is reused first
    free: Vec<u32>,
}

impl<P> Default for CallbackRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> CallbackRegistry<P> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Install a continuation and return the handle that addresses it
    pub fn register(&mut self, continuation: Continuation<P>) -> CallbackHandle {
        if let Some(id) = self.free.pop() {
            let slot = &mut self.slots[id as usize];
            debug_assert!(matches!(slot.state, SlotState::Free));
            slot.generation = slot.generation.wrapping_add(1);
            slot.state = SlotState::Pending(continuation);
            return CallbackHandle::new(id, slot.generation);
        }

        let id = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            state: SlotState::Pending(continuation),
        });
        CallbackHandle::new(id, 0)
    }

    /// Invoke the continuation for `handle` and free its id
    pub fn invoke(&mut self, handle: CallbackHandle, payload: P) -> Result<()> {
        let continuation = self.take(handle)?;
        continuation(payload);
        self.release(handle)
    }

    /// Remove the continuation so it can be run outside any lock
    ///
    /// The slot stays reserved until [`release`](Self::release) is called.
    pub fn take(&mut self, handle: CallbackHandle) -> Result<Continuation<P>> {
        let slot = self.slot_mut(handle)?;
        match std::mem::replace(&mut slot.state, SlotState::Running) {
            SlotState::Pending(continuation) => Ok(continuation),
            other => {
                slot.state = other;
                Err(Error::AlreadySettled {
                    callback_id: handle.callback_id,
                })
            }
        }
    }

    /// Return a taken handle's id to the free list
    pub fn release(&mut self, handle: CallbackHandle) -> Result<()> {
        let slot = self.slot_mut(handle)?;
        match slot.state {
            SlotState::Running => {
                slot.state = SlotState::Free;
                self.free.push(handle.callback_id);
                Ok(())
            }
            _ => Err(Error::AlreadySettled {
                callback_id: handle.callback_id,
            }),
        }
    }

    /// Whether `handle` still addresses a continuation awaiting delivery
    pub fn is_pending(&self, handle: CallbackHandle) -> bool {
        self.slots
            .get(handle.callback_id as usize)
            .map(|slot| {
                slot.generation == handle.generation && matches!(slot.state, SlotState::Pending(_))
            })
            .unwrap_or(false)
    }

    /// Number of continuations awaiting delivery
    pub fn pending(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.state, SlotState::Pending(_)))
            .count()
    }

    /// Number of slots ever allocated
    pub fn slots(&self) -> usize {
        self.slots.len()
    }

    fn slot_mut(&mut self, handle: CallbackHandle) -> Result<&mut Slot<P>> {
        let slot = self
            .slots
            .get_mut(handle.callback_id as usize)
            .ok_or(Error::UnknownHandle {
                callback_id: handle.callback_id,
            })?;

        if slot.generation != handle.generation {
            return Err(Error::StaleHandle {
                callback_id: handle.callback_id,
                generation: handle.generation,
                current: slot.generation,
            });
        }

        Ok(slot)
    }
}

use std::fmt;

/// Fire-and-forget beat cue. Implementations must never fail; an unavailable
/// sound simply produces nothing.
pub trait AudioCue: fmt::Debug {
    fn play_cue(&mut self);
}

/// Cue used when no sound asset is configured or none could be opened.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentCue;

impl AudioCue for SilentCue {
    fn play_cue(&mut self) {}
}

//! The interactions owned by one test.
//!
//! A recording session starts empty and accumulates interactions. A playback
//! session is loaded from a stored [Recording] and hands out each recorded
//! interaction at most once, in recorded order among those a matcher accepts.
//! Once sealed at teardown a session rejects every further call.

use std::collections::BTreeMap;
use std::sync::Mutex;

use log::{debug, warn};

use crate::interaction::{Interaction, Recording};
use crate::matcher::Matcher;
use crate::normalizer::NormalizedRequest;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Recording,
    Playback,
}

#[derive(Debug)]
pub struct Session {
    test_id: String,
    mode: SessionMode,
    state: Mutex<SessionState>,
}

#[derive(Debug, Default)]
struct SessionState {
    interactions: Vec<Interaction>,
    // consumed[i] is set once interactions[i] has been replayed.
    consumed: Vec<bool>,
    variables: BTreeMap<String, String>,
    new_content: bool,
    sealed: bool,
    flushed: bool,
}

impl Session {
    pub(crate) fn recording(test_id: &str) -> Self {
        Self {
            test_id: test_id.to_string(),
            mode: SessionMode::Recording,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub(crate) fn playback(test_id: &str, recording: Recording) -> Self {
        let consumed = vec![false; recording.interactions.len()];
        Self {
            test_id: test_id.to_string(),
            mode: SessionMode::Playback,
            state: Mutex::new(SessionState {
                interactions: recording.interactions,
                consumed,
                variables: recording.variables,
                ..Default::default()
            }),
        }
    }

    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Appends a newly captured interaction.
    pub fn record(&self, interaction: Interaction) -> Result<(), Error> {
        if self.mode == SessionMode::Playback {
            return Err(Error::RecordDuringPlayback(self.test_id.clone()));
        }

        let mut state = self.state.lock()?;
        if state.sealed {
            return Err(Error::SessionSealed(self.test_id.clone()));
        }

        debug!("recorded {} -> {} in '{}'", interaction.debug_key(), interaction.status_code, self.test_id);
        state.interactions.push(interaction);
        state.consumed.push(false);
        state.new_content = true;
        Ok(())
    }

    /// Consumes the first unreplayed interaction accepted by `matcher`.
    pub fn next_match(&self, request: &NormalizedRequest, matcher: &dyn Matcher) -> Result<Interaction, Error> {
        let mut state = self.state.lock()?;
        if state.sealed {
            return Err(Error::SessionSealed(self.test_id.clone()));
        }

        let mut already_consumed = 0;
        let mut next = None;
        for (index, interaction) in state.interactions.iter().enumerate() {
            if !matcher.matches(request, interaction) {
                continue;
            }
            if state.consumed[index] {
                already_consumed += 1;
            } else {
                next = Some(index);
                break;
            }
        }

        if let Some(index) = next {
            state.consumed[index] = true;
            debug!("replaying [{index}] {} in '{}'", request.debug_key(), self.test_id);
            return Ok(state.interactions[index].clone());
        }

        warn!("no recorded interaction for {} in '{}'", request.debug_key(), self.test_id);

        if already_consumed > 0 {
            return Err(Error::CursorExhausted {
                test_id: self.test_id.clone(),
                method: request.method.clone(),
                path: request.canonical_path.clone(),
                consumed: already_consumed,
            });
        }

        Err(Error::NoMatchFound {
            test_id: self.test_id.clone(),
            method: request.method.clone(),
            path: request.canonical_path.clone(),
            recorded: state
                .interactions
                .iter()
                .enumerate()
                .map(|(index, interaction)| format!("[{index}] {}", interaction.debug_key()))
                .collect(),
        })
    }

    /// Number of interactions accepted by `matcher` that were already replayed.
    pub fn consumed(&self, request: &NormalizedRequest, matcher: &dyn Matcher) -> Result<usize, Error> {
        let state = self.state.lock()?;
        Ok(state
            .interactions
            .iter()
            .zip(&state.consumed)
            .filter(|(interaction, consumed)| **consumed && matcher.matches(request, interaction))
            .count())
    }

    /// Returns a value that stays stable between recording and playback.
    ///
    /// While recording, `generate` produces the value the first time `name` is
    /// asked for. During playback the recorded value is returned.
    pub fn variable<F>(&self, name: &str, generate: F) -> Result<String, Error>
    where
        F: FnOnce() -> String,
    {
        let mut state = self.state.lock()?;
        if state.sealed {
            return Err(Error::SessionSealed(self.test_id.clone()));
        }

        if let Some(value) = state.variables.get(name) {
            return Ok(value.clone());
        }

        match self.mode {
            SessionMode::Playback => Err(Error::VariableMissing {
                test_id: self.test_id.clone(),
                name: name.to_string(),
            }),
            SessionMode::Recording => {
                let value = generate();
                state.variables.insert(name.to_string(), value.clone());
                state.new_content = true;
                Ok(value)
            }
        }
    }

    pub fn interactions(&self) -> Result<Vec<Interaction>, Error> {
        Ok(self.state.lock()?.interactions.clone())
    }

    pub fn has_new_content(&self) -> Result<bool, Error> {
        Ok(self.state.lock()?.new_content)
    }

    pub(crate) fn mark_flushed(&self) -> Result<(), Error> {
        self.state.lock()?.flushed = true;
        Ok(())
    }

    pub fn is_sealed(&self) -> Result<bool, Error> {
        Ok(self.state.lock()?.sealed)
    }

    /// Freezes the session. Returns the recording to persist while a recording
    /// session with new content has not been marked flushed.
    pub(crate) fn seal(&self) -> Result<Option<Recording>, Error> {
        let mut state = self.state.lock()?;
        state.sealed = true;

        if self.mode == SessionMode::Recording && state.new_content && !state.flushed {
            return Ok(Some(Recording::new(&self.test_id, state.interactions.clone(), state.variables.clone())));
        }
        Ok(None)
    }
}

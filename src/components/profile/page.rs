use futures::future::{AbortHandle, AbortRegistration};
use std::mem;

use crate::auth::Identity;
use crate::components::profile::editor::{Draft, EditorState, Field};
use crate::errors::{Error, Notice};
use crate::models::profile::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  Load,
  Save,
}

struct InFlight {
  ticket: u64,
  operation: Operation,
  handle: AbortHandle,
}

/// The profile screen of one signed-in surface.
///
/// Store calls run outside of the surface lock. `begin_*` records the
/// operation under a ticket and `finish_*` only applies a result whose
/// ticket is still the one in flight, so a response that arrives after a
/// sign-out, a new sign-in or a cancellation is dropped. At most one
/// operation runs at a time and user actions are ignored while it does.
pub struct ProfilePage {
  identity: Identity,
  state: EditorState,
  in_flight: Option<InFlight>,
}

impl ProfilePage {
  pub fn new(identity: Identity) -> Self {
    Self {
      identity,
      state: EditorState::Loading,
      in_flight: None,
    }
  }

  pub fn identity(&self) -> &Identity {
    &self.identity
  }

  pub fn state(&self) -> &EditorState {
    &self.state
  }

  pub fn busy(&self) -> Option<Operation> {
    self.in_flight.as_ref().map(|in_flight| in_flight.operation)
  }

  pub fn begin_load(&mut self, ticket: u64) -> Option<AbortRegistration> {
    if self.in_flight.is_some() || self.state != EditorState::Loading {
      return None;
    }
    Some(self.track(ticket, Operation::Load))
  }

  pub fn finish_load(&mut self, ticket: u64, result: Result<Profile, Error>) -> bool {
    if !self.settle(ticket) {
      return false;
    }

    match result {
      Ok(profile) => self.transition(|state| state.loaded(profile)),
      Err(err) => {
        warn!("Failed to load profile for {}: {}", self.identity.email, err);
        self.transition(|state| state.load_failed(Notice::from(err)));
      }
    }
    true
  }

  /// Takes the submitted field values as the draft and returns the record
  /// to persist.
  pub fn begin_save(&mut self, ticket: u64, draft: Draft) -> Option<(Profile, AbortRegistration)> {
    if self.in_flight.is_some() || !self.state.is_editing() {
      return None;
    }

    self.transition(|state| {
      state
        .input(Field::FullName, draft.full_name)
        .input(Field::AvatarUrl, draft.avatar_url)
        .input(Field::Phone, draft.phone)
    });

    let pending = self.state.pending_save()?;
    Some((pending, self.track(ticket, Operation::Save)))
  }

  pub fn finish_save(&mut self, ticket: u64, result: Result<Profile, Error>) -> bool {
    if !self.settle(ticket) {
      return false;
    }

    match result {
      Ok(profile) => {
        info!("Saved profile for {}", self.identity.email);
        self.transition(|state| state.saved(profile));
      }
      Err(err) => {
        warn!("Failed to save profile for {}: {}", self.identity.email, err);
        self.transition(|state| state.save_failed(Notice::from(err)));
      }
    }
    true
  }

  pub fn edit(&mut self) {
    if self.in_flight.is_none() {
      self.transition(EditorState::edit);
    }
  }

  pub fn cancel(&mut self) {
    if self.in_flight.is_none() {
      self.transition(EditorState::cancel);
    }
  }

  pub fn retry(&mut self) {
    if self.in_flight.is_none() {
      self.transition(EditorState::retry);
    }
  }

  pub fn abort(&mut self) {
    if let Some(in_flight) = self.in_flight.take() {
      debug!("Aborting {:?} for {}", in_flight.operation, self.identity.email);
      in_flight.handle.abort();
    }
  }

  /// Clears an operation whose caller went away before `finish_*` ran.
  /// A dropped load stays in Loading so the next request runs it again; a
  /// dropped save keeps the draft and reports the cancellation.
  pub fn abandon(&mut self, ticket: u64) {
    let operation = match self.in_flight {
      Some(ref in_flight) if in_flight.ticket == ticket => in_flight.operation,
      _ => return,
    };

    self.abort();
    if operation == Operation::Save {
      self.transition(|state| state.save_failed(Notice::from(Error::Cancelled)));
    }
  }

  fn track(&mut self, ticket: u64, operation: Operation) -> AbortRegistration {
    let (handle, registration) = AbortHandle::new_pair();
    self.in_flight = Some(InFlight {
      ticket,
      operation,
      handle,
    });
    registration
  }

  fn settle(&mut self, ticket: u64) -> bool {
    match self.in_flight {
      Some(ref in_flight) if in_flight.ticket == ticket => {
        self.in_flight = None;
        true
      }
      _ => {
        debug!("Dropping stale result for ticket {}", ticket);
        false
      }
    }
  }

  fn transition<F: FnOnce(EditorState) -> EditorState>(&mut self, f: F) {
    let state = mem::take(&mut self.state);
    self.state = f(state);
  }
}

impl Drop for ProfilePage {
  fn drop(&mut self) {
    self.abort();
  }
}

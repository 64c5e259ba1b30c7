//! Authentication state machine for Warden.
//!
//! This crate is the pure core of session handling:
//!
//! 1. **State**: [`AuthState`], the single record of "who is signed in"
//! 2. **Events**: [`Action`], everything that can happen to a session
//! 3. **Transitions**: [`reduce`], a total, side-effect free function
//!    from `(state, action)` to the next state, plus [`selectors`]
//! 4. **Seams**: the [`Authenticator`] and [`Authorizer`] traits that
//!    protocol implementations plug into
//!
//! # How it fits in the stack
//!
//! ```text
//! Store layer (above)  ← drives restore/authenticate/fetch, persists changes
//!     ↕
//! Session layer (this crate)  ← knows what each event does to the state
//!     ↕
//! Protocol layer (below)  ← provides SessionData, Credentials, PersistedSession
//! ```
//!
//! Nothing here touches the network, a timer, or storage, so every
//! transition can be tested without mocking I/O.

mod action;
mod auth;
mod error;
mod reducer;
pub mod selectors;
mod state;

pub use action::Action;
pub use auth::{Authenticator, Authorizer};
pub use error::SessionError;
pub use reducer::reduce;
pub use state::AuthState;

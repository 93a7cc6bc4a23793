//! # Event Streams
//!
//! Describes which log events register and deregister a subject against an
//! entity, and how to read the subject's live state.
//!
//! ## Predefined Streams
//!
//! | Stream | Register | Deregister | Subject | Live check |
//! |--------|----------|------------|---------|------------|
//! | `schemes` | `RegisterScheme` | `UnregisterScheme` | `_scheme` | `isSchemeRegistered` |
//! | `globalConstraints` | `AddGlobalConstraint` | `RemoveGlobalConstraint` | `_globalConstraint` | `isGlobalConstraintRegistered` |
//! | `organizations` | `NewOrg` | - | `_avatar` | - |

use serde::{Deserialize, Serialize};

/// A register/deregister event pair and the arguments to read from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStream {
    /// Stream name used in logs and errors.
    pub name: String,
    /// Event that registers a subject.
    pub register_event: String,
    /// Event that removes a subject, if the stream has one.
    pub deregister_event: Option<String>,
    /// Event argument carrying the subject address.
    pub subject_arg: String,
    /// Event argument carrying the registration parameters hash.
    pub params_hash_arg: Option<String>,
    /// View method on the entity answering "is this subject registered".
    pub is_registered_method: Option<String>,
}

impl EventStream {
    /// Register-only stream.
    pub fn new(
        name: impl Into<String>,
        register_event: impl Into<String>,
        subject_arg: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            register_event: register_event.into(),
            deregister_event: None,
            subject_arg: subject_arg.into(),
            params_hash_arg: None,
            is_registered_method: None,
        }
    }

    #[must_use]
    pub fn deregistered_by(mut self, event: impl Into<String>) -> Self {
        self.deregister_event = Some(event.into());
        self
    }

    #[must_use]
    pub fn with_params_hash(mut self, arg: impl Into<String>) -> Self {
        self.params_hash_arg = Some(arg.into());
        self
    }

    /// Filter replayed subjects by live state with `method(subject) -> bool`.
    #[must_use]
    pub fn verified_by(mut self, method: impl Into<String>) -> Self {
        self.is_registered_method = Some(method.into());
        self
    }

    /// Schemes registered with an organization.
    #[must_use]
    pub fn schemes() -> Self {
        Self::new("schemes", "RegisterScheme", "_scheme")
            .deregistered_by("UnregisterScheme")
            .with_params_hash("_paramsHash")
            .verified_by("isSchemeRegistered")
    }

    /// Global constraints registered with an organization.
    #[must_use]
    pub fn global_constraints() -> Self {
        Self::new("globalConstraints", "AddGlobalConstraint", "_globalConstraint")
            .deregistered_by("RemoveGlobalConstraint")
            .with_params_hash("_params")
            .verified_by("isGlobalConstraintRegistered")
    }

    /// Organizations created by a factory.
    #[must_use]
    pub fn organizations() -> Self {
        Self::new("organizations", "NewOrg", "_avatar")
    }

    /// Every event name the stream reads.
    #[must_use]
    pub fn event_names(&self) -> Vec<String> {
        let mut names = vec![self.register_event.clone()];
        names.extend(self.deregister_event.iter().cloned());
        names
    }

    /// True if `event_name` registers a subject.
    #[must_use]
    pub fn is_register(&self, event_name: &str) -> bool {
        self.register_event == event_name
    }

    /// True if `event_name` removes a subject.
    #[must_use]
    pub fn is_deregister(&self, event_name: &str) -> bool {
        self.deregister_event.as_deref() == Some(event_name)
    }
}

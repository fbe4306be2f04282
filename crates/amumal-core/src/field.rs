use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::{CheckError, FieldError};
use crate::validation::FieldValidator;

/// Answer from the remote service about a well-formed candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Available,
    Taken,
    /// The server considers the candidate malformed; overrides the local rule.
    Rejected(FieldError),
}

/// Asks an external service whether a candidate value is already claimed.
#[async_trait]
pub trait AvailabilityChecker: Send + Sync {
    async fn check(&self, candidate: &str) -> Result<CheckOutcome, CheckError>;
}

/// Receives a call after every mutation of an observed field.
pub trait FieldObserver: Send + Sync {
    fn field_changed(&self);
}

/// What a field currently reports to the view and to gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldStatus {
    /// Never committed.
    Untouched,
    Invalid(FieldError),
    /// Availability check in flight.
    Pending,
    /// Value changed since the last commit or check.
    Stale,
    Taken,
    /// Check could not be completed; distinct from `Taken`.
    CheckFailed,
    Valid,
}

/// Tri-state reduction of [`FieldStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid,
    Pending,
}

impl FieldStatus {
    /// Only a definitive pass counts.
    pub fn is_pass(&self) -> bool {
        matches!(self, FieldStatus::Valid)
    }

    pub fn verdict(&self) -> Verdict {
        match self {
            FieldStatus::Valid => Verdict::Valid,
            FieldStatus::Untouched | FieldStatus::Pending | FieldStatus::Stale => Verdict::Pending,
            FieldStatus::Invalid(_) | FieldStatus::Taken | FieldStatus::CheckFailed => {
                Verdict::Invalid
            }
        }
    }

    /// Helper text for the view, if any.
    pub fn message(&self) -> Option<String> {
        match self {
            FieldStatus::Invalid(reason) => Some(reason.to_string()),
            FieldStatus::Taken => Some("This value is already in use.".to_string()),
            FieldStatus::CheckFailed => {
                Some("Something went wrong while checking availability.".to_string())
            }
            _ => None,
        }
    }
}

enum Rule {
    Format(Box<dyn FieldValidator>),
    /// Must equal the sibling's current raw value.
    Confirms(Arc<ValidationField>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SyncState {
    Unchecked,
    /// Edited after a commit; the last verdict no longer describes the value.
    Edited,
    Valid,
    Invalid(FieldError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Availability {
    Unchecked,
    Pending,
    Available,
    Taken,
    CheckFailed,
    Stale,
}

struct FieldState {
    raw: String,
    sync: SyncState,
    availability: Availability,
    last_checked: Option<String>,
    known_good: Option<String>,
    /// Bumped on every commit and override; a check result applies only
    /// while its token is still current.
    generation: u64,
}

/// One input: a format rule, an optional availability checker, and the
/// current verdict.
pub struct ValidationField {
    name: String,
    rule: Rule,
    checker: Option<Arc<dyn AvailabilityChecker>>,
    state: Mutex<FieldState>,
    status_tx: watch::Sender<FieldStatus>,
    observers: Mutex<Vec<Weak<dyn FieldObserver>>>,
}

impl ValidationField {
    fn build(name: String, rule: Rule, checker: Option<Arc<dyn AvailabilityChecker>>) -> Self {
        let (status_tx, _) = watch::channel(FieldStatus::Untouched);
        Self {
            name,
            rule,
            checker,
            state: Mutex::new(FieldState {
                raw: String::new(),
                sync: SyncState::Unchecked,
                availability: Availability::Unchecked,
                last_checked: None,
                known_good: None,
                generation: 0,
            }),
            status_tx,
            observers: Mutex::new(Vec::new()),
        }
    }

    /// A field checked only by its format rule.
    pub fn new(name: impl Into<String>, validator: impl FieldValidator + 'static) -> Self {
        Self::build(name.into(), Rule::Format(Box::new(validator)), None)
    }

    /// A field that must also be confirmed available by `checker`.
    pub fn with_checker(
        name: impl Into<String>,
        validator: impl FieldValidator + 'static,
        checker: Arc<dyn AvailabilityChecker>,
    ) -> Self {
        Self::build(name.into(), Rule::Format(Box::new(validator)), Some(checker))
    }

    /// A confirmation field that must match `sibling`. It re-evaluates
    /// whenever the sibling changes.
    pub fn confirming(name: impl Into<String>, sibling: &Arc<ValidationField>) -> Arc<Self> {
        let field = Arc::new(Self::build(
            name.into(),
            Rule::Confirms(Arc::clone(sibling)),
            None,
        ));
        let observer: Arc<dyn FieldObserver> = field.clone();
        sibling.observe(Arc::downgrade(&observer));
        field
    }

    /// Prefill with a value already known to be valid and owned by the
    /// user, e.g. the current nickname on the profile page. Committing that
    /// value again passes without a check.
    pub fn with_known_good(self, value: impl Into<String>) -> Self {
        let value = value.into();
        {
            let mut state = self.lock();
            state.raw = value.clone();
            state.sync = SyncState::Valid;
            state.availability = Availability::Available;
            state.last_checked = Some(value.clone());
            state.known_good = Some(value);
        }
        self.publish();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_checker(&self) -> bool {
        self.checker.is_some()
    }

    /// Current raw input.
    pub fn value(&self) -> String {
        self.lock().raw.clone()
    }

    /// Normalized input, as it would be submitted.
    pub fn normalized_value(&self) -> String {
        let raw = self.value();
        match &self.rule {
            Rule::Format(validator) => validator.normalize(&raw).to_string(),
            Rule::Confirms(_) => raw,
        }
    }

    /// Last value the checker answered for.
    pub fn last_checked(&self) -> Option<String> {
        self.lock().last_checked.clone()
    }

    pub fn status(&self) -> FieldStatus {
        let state = self.lock();
        self.derive_status(&state)
    }

    pub fn subscribe(&self) -> watch::Receiver<FieldStatus> {
        self.status_tx.subscribe()
    }

    /// Register an observer; dropped observers are pruned lazily.
    pub fn observe(&self, observer: Weak<dyn FieldObserver>) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Replace the known-good value, e.g. after a successful profile save.
    pub fn set_known_good(&self, value: Option<String>) {
        self.lock().known_good = value;
    }

    /// Record a new raw value. Neither the format verdict nor an
    /// availability result for a different value can be trusted, so a
    /// committed field becomes stale until it is committed again.
    pub fn set_value(&self, value: impl Into<String>) {
        let value = value.into();
        {
            let mut state = self.lock();
            if state.raw == value {
                return;
            }
            state.raw = value;
            if state.sync != SyncState::Unchecked {
                state.sync = SyncState::Edited;
            }
            if self.checker.is_some() && state.availability != Availability::Unchecked {
                state.availability = Availability::Stale;
            }
        }
        self.changed();
    }

    /// Run the format rule and, when it passes, the availability check.
    /// Returns the status once the commit settles.
    pub async fn commit(&self) -> FieldStatus {
        let (candidate, token, checker) = {
            let mut state = self.lock();
            state.generation += 1;

            let verdict = match &self.rule {
                Rule::Format(validator) => {
                    let normalized = validator.normalize(&state.raw);
                    validator.validate(normalized).map(|()| normalized.to_string())
                }
                Rule::Confirms(sibling) => {
                    confirm_matches(&state.raw, &sibling.value()).map(|()| state.raw.clone())
                }
            };

            let candidate = match verdict {
                Ok(candidate) => candidate,
                Err(reason) => {
                    tracing::debug!(field = %self.name, %reason, "format check failed");
                    state.sync = SyncState::Invalid(reason);
                    state.availability = Availability::Unchecked;
                    drop(state);
                    self.changed();
                    return self.status();
                }
            };
            state.sync = SyncState::Valid;

            let Some(checker) = self.checker.clone() else {
                drop(state);
                self.changed();
                return self.status();
            };

            if state.known_good.as_deref() == Some(candidate.as_str()) {
                tracing::debug!(field = %self.name, "unchanged known value, skipping check");
                state.availability = Availability::Available;
                state.last_checked = Some(candidate);
                drop(state);
                self.changed();
                return self.status();
            }

            state.availability = Availability::Pending;
            (candidate, state.generation, checker)
        };
        self.changed();

        tracing::debug!(field = %self.name, %candidate, "checking availability");
        let result = checker.check(&candidate).await;

        {
            let mut state = self.lock();
            let current = match &self.rule {
                Rule::Format(validator) => validator.normalize(&state.raw) == candidate,
                Rule::Confirms(_) => state.raw == candidate,
            };
            if state.generation != token || !current {
                tracing::debug!(field = %self.name, %candidate, "discarding superseded check");
                return self.derive_status(&state);
            }

            // The value is back to the committed candidate, whose format passed.
            state.sync = SyncState::Valid;
            match result {
                Ok(CheckOutcome::Available) => {
                    state.availability = Availability::Available;
                    state.last_checked = Some(candidate);
                }
                Ok(CheckOutcome::Taken) => {
                    state.availability = Availability::Taken;
                    state.last_checked = Some(candidate);
                }
                Ok(CheckOutcome::Rejected(reason)) => {
                    state.sync = SyncState::Invalid(reason);
                    state.availability = Availability::Unchecked;
                }
                Err(e) => {
                    tracing::warn!(field = %self.name, error = %e, "availability check failed");
                    state.availability = Availability::CheckFailed;
                }
            }
        }
        self.changed();
        self.status()
    }

    /// Mark the field invalid on the server's word, e.g. a wrong current
    /// password. Any in-flight check is superseded.
    pub fn reject(&self, reason: FieldError) {
        {
            let mut state = self.lock();
            state.generation += 1;
            state.sync = SyncState::Invalid(reason);
            state.availability = Availability::Unchecked;
        }
        self.changed();
    }

    fn lock(&self) -> MutexGuard<'_, FieldState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn derive_status(&self, state: &FieldState) -> FieldStatus {
        // Once committed, a confirmation is always judged against both
        // current values; its stored verdict is never final.
        if let Rule::Confirms(sibling) = &self.rule {
            if state.sync == SyncState::Unchecked {
                return FieldStatus::Untouched;
            }
            return match confirm_matches(&state.raw, &sibling.value()) {
                Ok(()) => FieldStatus::Valid,
                Err(reason) => FieldStatus::Invalid(reason),
            };
        }

        match &state.sync {
            SyncState::Unchecked => return FieldStatus::Untouched,
            SyncState::Edited => return FieldStatus::Stale,
            SyncState::Invalid(reason) => return FieldStatus::Invalid(reason.clone()),
            SyncState::Valid => {}
        }

        if self.checker.is_none() {
            return FieldStatus::Valid;
        }
        match state.availability {
            Availability::Available => FieldStatus::Valid,
            Availability::Pending => FieldStatus::Pending,
            Availability::Taken => FieldStatus::Taken,
            Availability::CheckFailed => FieldStatus::CheckFailed,
            Availability::Unchecked | Availability::Stale => FieldStatus::Stale,
        }
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.status());
    }

    fn changed(&self) {
        self.publish();
        let observers: Vec<Arc<dyn FieldObserver>> = {
            let mut observers = self
                .observers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            observers.retain(|o| o.strong_count() > 0);
            observers.iter().filter_map(Weak::upgrade).collect()
        };
        for observer in observers {
            observer.field_changed();
        }
    }
}

impl FieldObserver for ValidationField {
    fn field_changed(&self) {
        // Only confirmation fields observe another field.
        let touched = self.lock().sync != SyncState::Unchecked;
        if touched {
            self.changed();
        }
    }
}

impl std::fmt::Debug for ValidationField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationField")
            .field("name", &self.name)
            .field("status", &self.status())
            .finish()
    }
}

fn confirm_matches(value: &str, sibling: &str) -> Result<(), FieldError> {
    if value.is_empty() {
        Err(FieldError::EmptyPassword)
    } else if value != sibling {
        Err(FieldError::PasswordMismatch)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{EmailFormat, NicknameFormat, PasswordStrength};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Answers from a fixed table; optionally parks until released.
    struct MockChecker {
        answers: HashMap<String, Result<CheckOutcome, CheckError>>,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl MockChecker {
        fn new(answers: Vec<(&str, Result<CheckOutcome, CheckError>)>) -> Self {
            Self {
                answers: answers
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn parked(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }
    }

    #[async_trait]
    impl AvailabilityChecker for MockChecker {
        async fn check(&self, candidate: &str) -> Result<CheckOutcome, CheckError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.answers
                .get(candidate)
                .cloned()
                .unwrap_or(Ok(CheckOutcome::Available))
        }
    }

    #[tokio::test]
    async fn test_format_failure_skips_checker() {
        let checker = Arc::new(MockChecker::new(vec![]));
        let field = ValidationField::with_checker("email", EmailFormat, checker.clone());

        field.set_value("not-an-email");
        let status = field.commit().await;

        assert_eq!(status, FieldStatus::Invalid(FieldError::InvalidEmail));
        assert_eq!(checker.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_available_value_passes() {
        let checker = Arc::new(MockChecker::new(vec![(
            "a@b.co",
            Ok(CheckOutcome::Available),
        )]));
        let field = ValidationField::with_checker("email", EmailFormat, checker);

        field.set_value("  a@b.co ");
        assert_eq!(field.commit().await, FieldStatus::Valid);
        assert_eq!(field.last_checked().as_deref(), Some("a@b.co"));
        assert_eq!(field.normalized_value(), "a@b.co");
    }

    #[tokio::test]
    async fn test_taken_keeps_format_valid() {
        let checker = Arc::new(MockChecker::new(vec![("taken", Ok(CheckOutcome::Taken))]));
        let field = ValidationField::with_checker("nickname", NicknameFormat, checker);

        field.set_value("taken");
        let status = field.commit().await;

        assert_eq!(status, FieldStatus::Taken);
        assert_eq!(status.verdict(), Verdict::Invalid);
    }

    #[tokio::test]
    async fn test_rejected_overrides_local_format() {
        let checker = Arc::new(MockChecker::new(vec![(
            "odd",
            Ok(CheckOutcome::Rejected(FieldError::InvalidNickname)),
        )]));
        let field = ValidationField::with_checker("nickname", NicknameFormat, checker);

        field.set_value("odd");
        assert_eq!(
            field.commit().await,
            FieldStatus::Invalid(FieldError::InvalidNickname)
        );
    }

    #[tokio::test]
    async fn test_check_error_is_distinct_from_taken() {
        let checker = Arc::new(MockChecker::new(vec![(
            "a@b.co",
            Err(CheckError::Status(500)),
        )]));
        let field = ValidationField::with_checker("email", EmailFormat, checker);

        field.set_value("a@b.co");
        let status = field.commit().await;

        assert_eq!(status, FieldStatus::CheckFailed);
        assert_ne!(status, FieldStatus::Taken);
        assert!(status.message().is_some());
    }

    #[tokio::test]
    async fn test_pending_while_check_in_flight() {
        let release = Arc::new(Notify::new());
        let checker = Arc::new(MockChecker::new(vec![]).parked(release.clone()));
        let field = Arc::new(ValidationField::with_checker(
            "email",
            EmailFormat,
            checker,
        ));
        field.set_value("a@b.co");

        let task = {
            let field = field.clone();
            tokio::spawn(async move { field.commit().await })
        };
        tokio::task::yield_now().await;
        while field.status() != FieldStatus::Pending {
            tokio::task::yield_now().await;
        }
        assert_eq!(field.status().verdict(), Verdict::Pending);

        release.notify_one();
        assert_eq!(task.await.unwrap(), FieldStatus::Valid);
    }

    #[tokio::test]
    async fn test_value_change_during_check_discards_result() {
        let release = Arc::new(Notify::new());
        let checker = Arc::new(MockChecker::new(vec![]).parked(release.clone()));
        let field = Arc::new(ValidationField::with_checker(
            "nickname",
            NicknameFormat,
            checker,
        ));
        field.set_value("first");

        let task = {
            let field = field.clone();
            tokio::spawn(async move { field.commit().await })
        };
        while field.status() != FieldStatus::Pending {
            tokio::task::yield_now().await;
        }

        field.set_value("second");
        release.notify_one();

        assert_eq!(task.await.unwrap(), FieldStatus::Stale);
        assert_eq!(field.status(), FieldStatus::Stale);
        assert_eq!(field.last_checked(), None);
    }

    #[tokio::test]
    async fn test_result_applies_when_value_restored_before_arrival() {
        let release = Arc::new(Notify::new());
        let checker = Arc::new(MockChecker::new(vec![]).parked(release.clone()));
        let field = Arc::new(ValidationField::with_checker(
            "nickname",
            NicknameFormat,
            checker,
        ));
        field.set_value("first");

        let task = {
            let field = field.clone();
            tokio::spawn(async move { field.commit().await })
        };
        while field.status() != FieldStatus::Pending {
            tokio::task::yield_now().await;
        }

        field.set_value("other");
        field.set_value("first");
        release.notify_one();

        assert_eq!(task.await.unwrap(), FieldStatus::Valid);
    }

    #[tokio::test]
    async fn test_known_good_value_skips_check() {
        let checker = Arc::new(MockChecker::new(vec![]));
        let field = ValidationField::with_checker("nickname", NicknameFormat, checker.clone())
            .with_known_good("alice");

        assert_eq!(field.status(), FieldStatus::Valid);

        field.set_value("bob");
        assert_eq!(field.status(), FieldStatus::Stale);
        field.set_value("alice");
        assert_eq!(field.commit().await, FieldStatus::Valid);
        assert_eq!(checker.calls.load(Ordering::SeqCst), 0);

        field.set_value("bob");
        assert_eq!(field.commit().await, FieldStatus::Valid);
        assert_eq!(checker.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_confirmation_tracks_sibling() {
        let password = Arc::new(ValidationField::new("password", PasswordStrength));
        let confirm = ValidationField::confirming("password_confirm", &password);

        password.set_value("Abc123!@");
        password.commit().await;
        confirm.set_value("Abc123!@");
        assert_eq!(confirm.commit().await, FieldStatus::Valid);

        let mut rx = confirm.subscribe();
        rx.mark_unchanged();
        password.set_value("Xyz789#$");
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            confirm.status(),
            FieldStatus::Invalid(FieldError::PasswordMismatch)
        );

        confirm.set_value("Xyz789#$");
        assert_eq!(confirm.status(), FieldStatus::Valid);
    }

    #[tokio::test]
    async fn test_failed_confirmation_recovers_when_sibling_matches() {
        let password = Arc::new(ValidationField::new("password", PasswordStrength));
        let confirm = ValidationField::confirming("password_confirm", &password);

        password.set_value("Abc123!@");
        password.commit().await;
        confirm.set_value("Abc123!X");
        assert_eq!(
            confirm.commit().await,
            FieldStatus::Invalid(FieldError::PasswordMismatch)
        );

        password.set_value("Abc123!X");
        assert_eq!(password.commit().await, FieldStatus::Valid);
        assert_eq!(confirm.status(), FieldStatus::Valid);
    }

    #[tokio::test]
    async fn test_edit_after_commit_is_not_a_pass() {
        let field = ValidationField::new("password", PasswordStrength);
        field.set_value("Abc123!@");
        assert_eq!(field.commit().await, FieldStatus::Valid);

        field.set_value("weak");
        assert_eq!(field.status(), FieldStatus::Stale);
        assert!(!field.status().is_pass());

        assert_eq!(
            field.commit().await,
            FieldStatus::Invalid(FieldError::WeakPassword)
        );
    }

    #[tokio::test]
    async fn test_empty_confirmation() {
        let password = Arc::new(ValidationField::new("password", PasswordStrength));
        let confirm = ValidationField::confirming("password_confirm", &password);

        assert_eq!(
            confirm.commit().await,
            FieldStatus::Invalid(FieldError::EmptyPassword)
        );
    }

    #[tokio::test]
    async fn test_reject_marks_invalid() {
        let field = ValidationField::new("current", crate::validation::Required);
        field.set_value("secret");
        assert_eq!(field.commit().await, FieldStatus::Valid);

        field.reject(FieldError::Rejected("wrong".to_string()));
        assert_eq!(
            field.status(),
            FieldStatus::Invalid(FieldError::Rejected("wrong".to_string()))
        );
    }

    #[test]
    fn test_untouched_is_pending_verdict() {
        let field = ValidationField::new("email", EmailFormat);
        assert_eq!(field.status(), FieldStatus::Untouched);
        assert!(!field.status().is_pass());
        assert_eq!(field.status().verdict(), Verdict::Pending);
    }
}

use std::sync::{Arc, Weak};

use tokio::sync::watch;

use crate::field::{FieldObserver, FieldStatus, ValidationField};

/// Derives a single "can submit" signal from a set of required fields.
///
/// The gate is registered as an observer on every field, so the signal is
/// recomputed synchronously inside each field mutation. Only a definitive
/// pass counts: a field that is pending, stale, untouched or failed keeps
/// the gate closed.
pub struct FormGate {
    inner: Arc<GateInner>,
}

struct GateInner {
    fields: Vec<Arc<ValidationField>>,
    tx: watch::Sender<bool>,
}

impl GateInner {
    fn compute(&self) -> bool {
        self.fields.iter().all(|f| f.status().is_pass())
    }
}

impl FieldObserver for GateInner {
    fn field_changed(&self) {
        let open = self.compute();
        self.tx.send_if_modified(|current| {
            if *current == open {
                false
            } else {
                tracing::debug!(open, "submit gate changed");
                *current = open;
                true
            }
        });
    }
}

impl FormGate {
    pub fn new(fields: impl IntoIterator<Item = Arc<ValidationField>>) -> Self {
        let fields: Vec<_> = fields.into_iter().collect();
        let (tx, _) = watch::channel(false);
        let inner = Arc::new(GateInner { fields, tx });

        let observer: Arc<dyn FieldObserver> = inner.clone();
        let weak: Weak<dyn FieldObserver> = Arc::downgrade(&observer);
        for field in &inner.fields {
            field.observe(weak.clone());
        }
        inner.field_changed();

        Self { inner }
    }

    /// Fold over the fields right now.
    pub fn can_submit(&self) -> bool {
        self.inner.compute()
    }

    /// Receiver that sees every change of the derived signal.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.tx.subscribe()
    }

    pub fn fields(&self) -> &[Arc<ValidationField>] {
        &self.inner.fields
    }

    /// Fields that currently keep the gate closed, with their status.
    pub fn blocking(&self) -> Vec<(&str, FieldStatus)> {
        self.inner
            .fields
            .iter()
            .map(|f| (f.name(), f.status()))
            .filter(|(_, status)| !status.is_pass())
            .collect()
    }
}

impl std::fmt::Debug for FormGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormGate")
            .field("fields", &self.inner.fields)
            .field("can_submit", &self.can_submit())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckError;
    use crate::field::{AvailabilityChecker, CheckOutcome};
    use crate::validation::{EmailFormat, PasswordStrength};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    struct ParkedChecker(Arc<Notify>);

    #[async_trait]
    impl AvailabilityChecker for ParkedChecker {
        async fn check(&self, _candidate: &str) -> Result<CheckOutcome, CheckError> {
            self.0.notified().await;
            Ok(CheckOutcome::Available)
        }
    }

    #[tokio::test]
    async fn test_gate_opens_when_all_pass() {
        let email = Arc::new(ValidationField::new("email", EmailFormat));
        let password = Arc::new(ValidationField::new("password", PasswordStrength));
        let gate = FormGate::new([email.clone(), password.clone()]);
        let rx = gate.subscribe();

        assert!(!gate.can_submit());

        email.set_value("a@b.co");
        email.commit().await;
        assert!(!gate.can_submit());

        password.set_value("Abc123!@");
        password.commit().await;
        assert!(gate.can_submit());
        assert!(*rx.borrow());

        password.set_value("weak");
        assert!(!gate.can_submit());
        password.commit().await;
        assert!(!gate.can_submit());
        assert!(!*rx.borrow());
        assert_eq!(gate.blocking().len(), 1);
    }

    #[tokio::test]
    async fn test_gate_closed_while_check_pending() {
        let release = Arc::new(Notify::new());
        let email = Arc::new(ValidationField::with_checker(
            "email",
            EmailFormat,
            Arc::new(ParkedChecker(release.clone())),
        ));
        let password = Arc::new(ValidationField::new("password", PasswordStrength));
        let gate = FormGate::new([email.clone(), password.clone()]);
        let rx = gate.subscribe();

        password.set_value("Abc123!@");
        password.commit().await;
        email.set_value("a@b.co");

        let task = {
            let email = email.clone();
            tokio::spawn(async move { email.commit().await })
        };
        while email.status() != FieldStatus::Pending {
            tokio::task::yield_now().await;
        }
        assert!(!gate.can_submit());
        assert!(!*rx.borrow());

        release.notify_one();
        task.await.unwrap();
        assert!(gate.can_submit());
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_gate_follows_confirmation_sibling() {
        let password = Arc::new(ValidationField::new("password", PasswordStrength));
        let confirm = ValidationField::confirming("confirm", &password);
        let gate = FormGate::new([password.clone(), confirm.clone()]);

        password.set_value("Abc123!@");
        password.commit().await;
        confirm.set_value("Abc123!@");
        confirm.commit().await;
        assert!(gate.can_submit());

        password.set_value("Abc123!#");
        assert!(!*gate.subscribe().borrow());
    }
}

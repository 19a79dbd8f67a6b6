use crate::error::{MotionError, MotionResult};

/// Contact form fields as submitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ContactPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub details: String,
}

impl ContactPayload {
    pub fn validate(&self) -> MotionResult<()> {
        if self.name.trim().is_empty() {
            return Err(MotionError::validation("name is required"));
        }
        let email = self.email.trim();
        if email.is_empty() {
            return Err(MotionError::validation("email is required"));
        }
        if !email.contains('@') {
            return Err(MotionError::validation("email must contain '@'"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
    Idle,
    Processing { remaining: f64 },
    Success { remaining: f64 },
}

/// Externally visible submission phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitPhase {
    Idle,
    Processing,
    Success,
}

/// Submission state machine for the contact form: idle until a valid submit,
/// then a fixed processing interval, then a success interval, then back to
/// idle with the fields cleared.
#[derive(Clone, Debug)]
pub struct ContactForm {
    payload: ContactPayload,
    phase: Phase,
    processing_secs: f64,
    success_secs: f64,
}

impl Default for ContactForm {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactForm {
    pub fn new() -> Self {
        Self {
            payload: ContactPayload::default(),
            phase: Phase::Idle,
            processing_secs: 1.5,
            success_secs: 2.5,
        }
    }

    /// Same machine with custom phase durations.
    pub fn with_durations(processing_secs: f64, success_secs: f64) -> MotionResult<Self> {
        if !(processing_secs > 0.0) || !(success_secs > 0.0) {
            return Err(MotionError::validation("phase durations must be > 0"));
        }
        Ok(Self {
            processing_secs,
            success_secs,
            ..Self::new()
        })
    }

    pub fn payload(&self) -> &ContactPayload {
        &self.payload
    }

    /// Fields stay editable in every phase; edits during processing/success
    /// are kept but discarded when the cycle completes.
    pub fn payload_mut(&mut self) -> &mut ContactPayload {
        &mut self.payload
    }

    pub fn phase(&self) -> SubmitPhase {
        match self.phase {
            Phase::Idle => SubmitPhase::Idle,
            Phase::Processing { .. } => SubmitPhase::Processing,
            Phase::Success { .. } => SubmitPhase::Success,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.phase() != SubmitPhase::Idle
    }

    /// Validates and starts the submission cycle. Re-submitting while a cycle
    /// is in flight is rejected without touching the current payload.
    pub fn submit(&mut self, payload: ContactPayload) -> MotionResult<()> {
        if self.is_busy() {
            return Err(MotionError::validation("submission already in progress"));
        }
        payload.validate()?;
        self.payload = payload;
        self.phase = Phase::Processing {
            remaining: self.processing_secs,
        };
        Ok(())
    }

    /// Advances the phase timers. Leftover time rolls into the next phase so
    /// a large delta cannot stall the cycle.
    pub fn tick(&mut self, dt: f64) {
        let mut dt = dt.max(0.0);
        loop {
            match self.phase {
                Phase::Idle => return,
                Phase::Processing { remaining } => {
                    if dt < remaining {
                        self.phase = Phase::Processing {
                            remaining: remaining - dt,
                        };
                        return;
                    }
                    dt -= remaining;
                    self.phase = Phase::Success {
                        remaining: self.success_secs,
                    };
                }
                Phase::Success { remaining } => {
                    if dt < remaining {
                        self.phase = Phase::Success {
                            remaining: remaining - dt,
                        };
                        return;
                    }
                    dt -= remaining;
                    self.phase = Phase::Idle;
                    self.payload = ContactPayload::default();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> ContactPayload {
        ContactPayload {
            name: "Avery".to_owned(),
            email: "avery@example.com".to_owned(),
            company: String::new(),
            details: "Need 200 patches.".to_owned(),
        }
    }

    #[test]
    fn validation_requires_name_and_plausible_email() {
        assert!(ContactPayload::default().validate().is_err());
        let mut p = payload();
        p.email = "not-an-email".to_owned();
        assert!(p.validate().is_err());
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn full_cycle_processing_then_success_then_idle() {
        let mut form = ContactForm::new();
        form.submit(payload()).unwrap();
        assert_eq!(form.phase(), SubmitPhase::Processing);

        form.tick(1.0);
        assert_eq!(form.phase(), SubmitPhase::Processing);
        form.tick(0.5);
        assert_eq!(form.phase(), SubmitPhase::Success);

        form.tick(2.4);
        assert_eq!(form.phase(), SubmitPhase::Success);
        // Accumulated float error can leave a sliver of the success window, so
        // overshoot the remaining 0.1s slightly.
        form.tick(0.2);
        assert_eq!(form.phase(), SubmitPhase::Idle);
        assert_eq!(form.payload(), &ContactPayload::default());
    }

    #[test]
    fn large_delta_rolls_through_both_phases() {
        let mut form = ContactForm::new();
        form.submit(payload()).unwrap();
        form.tick(10.0);
        assert_eq!(form.phase(), SubmitPhase::Idle);
    }

    #[test]
    fn resubmit_while_busy_is_rejected_and_payload_untouched() {
        let mut form = ContactForm::new();
        form.submit(payload()).unwrap();

        let mut other = payload();
        other.name = "Intruder".to_owned();
        assert!(form.submit(other).is_err());
        assert_eq!(form.payload().name, "Avery");

        form.tick(1.6);
        assert_eq!(form.phase(), SubmitPhase::Success);
        assert!(form.submit(payload()).is_err());
    }

    #[test]
    fn payload_clears_only_at_final_idle() {
        let mut form = ContactForm::new();
        form.submit(payload()).unwrap();
        form.tick(1.5);
        assert_eq!(form.phase(), SubmitPhase::Success);
        assert_eq!(form.payload().name, "Avery");
        form.tick(2.5);
        assert!(form.payload().name.is_empty());
    }

    #[test]
    fn custom_durations_are_validated_and_honored() {
        assert!(ContactForm::with_durations(0.0, 1.0).is_err());
        let mut form = ContactForm::with_durations(0.1, 0.1).unwrap();
        form.submit(payload()).unwrap();
        form.tick(0.3);
        assert_eq!(form.phase(), SubmitPhase::Idle);
    }

    #[test]
    fn invalid_submit_leaves_form_idle() {
        let mut form = ContactForm::new();
        assert!(form.submit(ContactPayload::default()).is_err());
        assert_eq!(form.phase(), SubmitPhase::Idle);
    }
}

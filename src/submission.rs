use std::ops::{Deref, DerefMut};

use crate::delivery::{DeliveryError, DeliveryReceipt, LeadSink};
use crate::domain::{
    LeadPayload, RequestContext, SubmissionInput, ValidSubmission, ValidationError,
};

/// Label the submit button shows while a lead is in flight.
pub const BUSY_LABEL: &str = "Enviando...";

/// Shown for every delivery failure; the actual cause only goes to the logs.
pub const FAILURE_MESSAGE: &str =
    "Hubo un error al enviar tu solicitud. Por favor intentá de nuevo en unos minutos.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

/// The contact form as the controller sees it.
pub trait FormView {
    /// Called on every transition of the submission state machine.
    fn state_changed(&mut self, _state: SubmissionState) {}

    fn alert(&mut self, message: &str);

    /// Disable the submit button and swap its label for `busy_label`.
    fn disable_submit(&mut self, busy_label: &str);

    /// Re-enable the submit button with its original label.
    fn restore_submit(&mut self);

    fn reset_form(&mut self);

    /// Hide the form, reveal the success message and bring it into view.
    fn show_success(&mut self);
}

/// How a single submission ended.
#[derive(Debug)]
pub enum SubmissionOutcome {
    Delivered(DeliveryReceipt),
    /// The honeypot was filled: the visitor saw a success, nothing was delivered.
    Discarded,
    Invalid(ValidationError),
    Failed(DeliveryError),
}

impl SubmissionOutcome {
    /// The terminal state the submission reached before the form went back to idle.
    pub fn state(&self) -> SubmissionState {
        match self {
            SubmissionOutcome::Delivered(_) | SubmissionOutcome::Discarded => {
                SubmissionState::Succeeded
            }
            SubmissionOutcome::Invalid(_) => SubmissionState::Idle,
            SubmissionOutcome::Failed(_) => SubmissionState::Failed,
        }
    }
}

/// Keeps the submit button busy for as long as it lives; dropping it restores the button,
/// whether the submission finished, failed or panicked.
struct BusySubmit<'a, V: FormView + ?Sized> {
    view: &'a mut V,
}

impl<'a, V: FormView + ?Sized> BusySubmit<'a, V> {
    fn engage(view: &'a mut V) -> Self {
        view.disable_submit(BUSY_LABEL);
        Self { view }
    }
}

impl<V: FormView + ?Sized> Deref for BusySubmit<'_, V> {
    type Target = V;

    fn deref(&self) -> &V {
        &*self.view
    }
}

impl<V: FormView + ?Sized> DerefMut for BusySubmit<'_, V> {
    fn deref_mut(&mut self) -> &mut V {
        &mut *self.view
    }
}

impl<V: FormView + ?Sized> Drop for BusySubmit<'_, V> {
    fn drop(&mut self) {
        self.view.restore_submit();
    }
}

pub struct SubmissionController {
    sink: Box<dyn LeadSink>,
}

impl SubmissionController {
    pub fn new(sink: impl LeadSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }

    /// Runs one submission from the submit trigger back to idle.
    ///
    /// `honeypot` is the value of the hidden `website` field; anything in it marks the
    /// submitter as a bot.
    #[tracing::instrument(
        name = "Handling contact form submission",
        skip(self, input, honeypot, context, view),
        fields(lead_email = %input.email, lead_name = %input.nombre)
    )]
    pub async fn submit<V: FormView + ?Sized>(
        &self,
        input: SubmissionInput,
        honeypot: &str,
        context: RequestContext,
        view: &mut V,
    ) -> SubmissionOutcome {
        if !honeypot.is_empty() {
            tracing::info!("Honeypot field was filled, discarding the submission");
            view.show_success();
            view.state_changed(SubmissionState::Succeeded);
            view.state_changed(SubmissionState::Idle);
            return SubmissionOutcome::Discarded;
        }

        view.state_changed(SubmissionState::Validating);
        let submission = match ValidSubmission::try_from(input) {
            Ok(submission) => submission,
            Err(e) => {
                tracing::info!(reason = e.reason(), "Rejected an invalid submission");
                view.alert(e.user_message());
                view.state_changed(SubmissionState::Idle);
                return SubmissionOutcome::Invalid(e);
            }
        };

        let payload = LeadPayload::build(submission, &context);
        view.state_changed(SubmissionState::Submitting);
        let outcome = {
            let mut busy = BusySubmit::engage(&mut *view);
            match self.sink.deliver(&payload).await {
                Ok(receipt) => {
                    tracing::info!(?receipt, "Lead delivered");
                    busy.reset_form();
                    busy.show_success();
                    busy.state_changed(SubmissionState::Succeeded);
                    SubmissionOutcome::Delivered(receipt)
                }
                Err(e) => {
                    tracing::error!(
                        error.cause_chain = ?e,
                        error.message = %e,
                        "Failed to deliver lead"
                    );
                    busy.alert(FAILURE_MESSAGE);
                    busy.state_changed(SubmissionState::Failed);
                    SubmissionOutcome::Failed(e)
                }
            }
        };
        view.state_changed(SubmissionState::Idle);
        outcome
    }
}

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

use crate::domain::ValidSubmission;

/// Label attached to every lead so the backend can route it.
pub const LEAD_SUBJECT: &str = "Solicitud de diagnóstico";

/// Ambient facts about the request a submission arrived with.
#[derive(Debug, Clone)]
pub struct RequestContext {
    source_url: String,
    user_agent: String,
    submitted_at: DateTime<Utc>,
}

impl RequestContext {
    /// The instant is truncated to whole milliseconds, the precision the payload timestamp carries.
    pub fn new(source_url: String, user_agent: String, submitted_at: DateTime<Utc>) -> Self {
        Self {
            source_url,
            user_agent,
            submitted_at: submitted_at.trunc_subsecs(3),
        }
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

/// The normalized record delivered to the backend (or the local log) for one lead.
///
/// Built once per submission and sent verbatim on every attempt, so there are no setters.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LeadPayload {
    name: String,
    email: String,
    phone: String,
    message: String,
    subject: String,
    source_url: String,
    user_agent: String,
    timestamp: String,
}

impl LeadPayload {
    pub fn build(submission: ValidSubmission, context: &RequestContext) -> Self {
        Self {
            name: submission.name,
            email: submission.email.as_ref().to_string(),
            phone: submission.phone,
            message: submission.message,
            subject: LEAD_SUBJECT.to_string(),
            source_url: context.source_url.clone(),
            user_agent: context.user_agent.clone(),
            timestamp: context
                .submitted_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

use crate::domain::LeadEmail;

/// Raw contact-form values as read at submit time.
#[derive(Debug, Clone, Default)]
pub struct SubmissionInput {
    pub nombre: String,
    pub email: String,
    pub telefono: String,
    pub mensaje: String,
    pub privacy_accepted: bool,
}

/// A submission that passed every check. All fields are trimmed.
#[derive(Debug, Clone)]
pub struct ValidSubmission {
    pub name: String,
    pub email: LeadEmail,
    pub phone: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing_required_fields")]
    MissingRequiredFields,
    #[error("invalid_email")]
    InvalidEmail,
    #[error("consent_required")]
    ConsentRequired,
}

impl ValidationError {
    /// Stable reason code, suitable for logs and API responses.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::MissingRequiredFields => "missing_required_fields",
            ValidationError::InvalidEmail => "invalid_email",
            ValidationError::ConsentRequired => "consent_required",
        }
    }

    /// What the visitor is told.
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::MissingRequiredFields => {
                "Por favor completá todos los campos obligatorios."
            }
            ValidationError::InvalidEmail => "Por favor ingresá un email válido.",
            ValidationError::ConsentRequired => {
                "Debes aceptar la Política de Privacidad y los Términos de Uso."
            }
        }
    }
}

impl TryFrom<SubmissionInput> for ValidSubmission {
    type Error = ValidationError;

    /// Checks run in a fixed order and stop at the first failure:
    /// required fields, then email shape, then consent.
    fn try_from(input: SubmissionInput) -> Result<Self, Self::Error> {
        let name = input.nombre.trim();
        let email = input.email.trim();
        let phone = input.telefono.trim();
        let message = input.mensaje.trim();

        if [name, email, phone, message].iter().any(|f| f.is_empty()) {
            return Err(ValidationError::MissingRequiredFields);
        }
        let email =
            LeadEmail::parse(email.to_string()).map_err(|_| ValidationError::InvalidEmail)?;
        if !input.privacy_accepted {
            return Err(ValidationError::ConsentRequired);
        }

        Ok(ValidSubmission {
            name: name.to_string(),
            email,
            phone: phone.to_string(),
            message: message.to_string(),
        })
    }
}

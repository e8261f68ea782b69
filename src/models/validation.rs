use crate::error::NotificationError;

pub fn validate_email_fields(
    email_destinatary: Option<&str>,
    email_message: Option<&str>,
) -> Result<(String, String), NotificationError> {
    let destinatary = email_destinatary
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| NotificationError::BadRequest("emailDestinatary is required".to_string()))?;

    let message = email_message
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| NotificationError::BadRequest("emailMessage is required".to_string()))?;

    Ok((destinatary.to_string(), message.to_string()))
}

use lettre::message::{header, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("mail server rejected the message: {0}")]
    DeliveryFailed(String),
    #[error("could not reach the mail server: {0}")]
    NetworkError(String),
    #[error("bad email configuration: {0}")]
    Config(String),
}

fn smtp_env(key: &str) -> Result<String, EmailError> {
    env::var(key).map_err(|_| EmailError::Config(format!("{} must be set", key)))
}

/// Sends the verification code. Every call sends a fresh message; the
/// resend path goes through here too.
pub async fn send_code_email(email: &str, code: &str) -> Result<(), EmailError> {
    let smtp_user = smtp_env("SMTP_EMAIL")?;
    let smtp_pass = smtp_env("SMTP_PASSWORD")?;
    let smtp_host = smtp_env("SMTP_SERVER")?;
    let smtp_port: u16 = smtp_env("SMTP_PORT")?
        .parse()
        .map_err(|_| EmailError::Config("Invalid SMTP_PORT".to_string()))?;

    let html_body = format!(
        r#"
    <div style="background-color:#E0F2FF;padding:50px 0">
        <div style="max-width:500px;margin:0 auto;background:#fff;padding:40px;border-radius:8px;text-align:center;font-family:Arial,sans-serif;">
            <h1 style="color:#000">Verify your email</h1>
            <p style="margin:20px 0;font-size:16px;color:#333">
                Use this code to finish creating your Vibes account
            </p>
            <h2 style="font-size:40px;letter-spacing:5px;color:#9A89FF;margin:30px 0">{}</h2>
            <p style="color:#333">The code expires in 10 minutes and was requested for<br>
            <a style="color:#3b82f6;text-decoration:none;">{}</a>
        </div>
    </div>
    "#,
        code, email
    );

    let email_message = Message::builder()
        .from(
            smtp_user
                .parse()
                .map_err(|e| EmailError::Config(format!("bad sender address: {}", e)))?,
        )
        .to(email
            .parse()
            .map_err(|e| EmailError::Config(format!("bad recipient address: {}", e)))?)
        .subject("Your Vibes verification code")
        .multipart(
            MultiPart::alternative()
                .singlepart(SinglePart::plain(format!(
                    "Your verification code is: {}",
                    code
                )))
                .singlepart(
                    SinglePart::builder()
                        .header(header::ContentType::TEXT_HTML)
                        .body(html_body),
                ),
        )
        .map_err(|e| EmailError::Config(e.to_string()))?;

    let creds = Credentials::new(smtp_user, smtp_pass);

    let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp_host)
        .map_err(|e| EmailError::NetworkError(e.to_string()))?
        .port(smtp_port)
        .credentials(creds)
        .build();

    match mailer.send(email_message).await {
        Ok(_) => Ok(()),
        // a response from the server means the send itself was refused;
        // anything else is transport trouble and worth a plain retry
        Err(e) if e.is_permanent() || e.is_transient() => {
            Err(EmailError::DeliveryFailed(e.to_string()))
        }
        Err(e) => Err(EmailError::NetworkError(e.to_string())),
    }
}

//! Outgoing mail
//!
//! Delivery is delegated: the service hands messages to a [`Mailer`]. The
//! production implementation spools each message as an `.eml` file for an
//! external MTA to pick up; tests use [`MemoryMailer`].
//!
//! Send failures are reported to the caller, which logs them and carries on.
//! A failed e-mail never rolls back the operation that triggered it.

use crate::config::MailConfig;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Mail delivery errors
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail spool I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mail transport unavailable: {0}")]
    Unavailable(String),
}

/// A message ready to hand to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from_name: String,
    pub from_address: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    /// Render as an RFC 5322 style message
    pub fn to_rfc5322(&self, message_id: &str) -> String {
        format!(
            "From: {} <{}>\r\nTo: {}\r\nSubject: {}\r\nDate: {}\r\nMessage-ID: <{}@suzuani>\r\nMIME-Version: 1.0\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}\r\n",
            self.from_name,
            self.from_address,
            self.to,
            self.subject,
            Utc::now().to_rfc2822(),
            message_id,
            self.body.replace('\n', "\r\n"),
        )
    }
}

/// Mail transport seam
pub trait Mailer: Send + Sync {
    fn send(&self, message: &OutgoingMail) -> Result<(), MailError>;
}

/// Writes every message into a spool directory, one file per message
#[derive(Debug, Clone)]
pub struct SpoolMailer {
    spool_dir: PathBuf,
}

impl SpoolMailer {
    pub fn new(spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            spool_dir: spool_dir.into(),
        }
    }

    pub fn spool_dir(&self) -> &Path {
        &self.spool_dir
    }
}

impl Mailer for SpoolMailer {
    fn send(&self, message: &OutgoingMail) -> Result<(), MailError> {
        std::fs::create_dir_all(&self.spool_dir)?;

        let message_id = Uuid::new_v4().to_string();
        let file_name = format!("{}-{}.eml", Utc::now().format("%Y%m%dT%H%M%S"), message_id);
        let path = self.spool_dir.join(file_name);

        std::fs::write(&path, message.to_rfc5322(&message_id))?;
        info!("Spooled mail '{}' for {} at {}", message.subject, message.to, path.display());
        Ok(())
    }
}

/// Captures messages in memory (tests, dry runs)
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    fail: bool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose every send fails
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn last_to(&self, address: &str) -> Option<OutgoingMail> {
        self.sent().into_iter().rev().find(|m| m.to == address)
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, message: &OutgoingMail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Unavailable("memory mailer configured to fail".to_string()));
        }
        let mut sent = self
            .sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sent.push(message.clone());
        Ok(())
    }
}

/// Verification e-mail carrying the OTP
pub fn otp_email(config: &MailConfig, username: &str, email: &str, otp: &str) -> OutgoingMail {
    OutgoingMail {
        from_name: config.sender_name.clone(),
        from_address: config.sender_address.clone(),
        to: email.to_string(),
        subject: "SuzuAni - Verify Your Email Address".to_string(),
        body: format!(
            "Hello {},\n\nYour SuzuAni verification code is: {}\n\nEnter it on the verification page to activate your account.\nIf you did not create an account, you can ignore this message.\n",
            username, otp
        ),
    }
}

/// Password reset e-mail carrying the reset link; `max_age_secs` is the
/// token lifetime the link is valid for
pub fn reset_email(config: &MailConfig, username: &str, email: &str, token: &str, max_age_secs: i64) -> OutgoingMail {
    let link = format!("{}/reset_password/{}", config.public_url.trim_end_matches('/'), token);
    OutgoingMail {
        from_name: config.sender_name.clone(),
        from_address: config.sender_address.clone(),
        to: email.to_string(),
        subject: "SuzuAni - Password Reset Request".to_string(),
        body: format!(
            "Hello {},\n\nTo reset your password, visit the following link:\n{}\n\nThe link expires in {}.\nIf you did not make this request, simply ignore this message and nothing will change.\n",
            username,
            link,
            describe_lifetime(max_age_secs)
        ),
    }
}

/// "30 minutes", "1 hour", "90 seconds"
fn describe_lifetime(secs: i64) -> String {
    let (count, unit) = if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_email_contents() {
        let mail = otp_email(&MailConfig::default(), "suzu", "suzu@example.com", "123456");
        assert_eq!(mail.to, "suzu@example.com");
        assert_eq!(mail.subject, "SuzuAni - Verify Your Email Address");
        assert!(mail.body.contains("123456"));
        assert_eq!(mail.from_name, "SuzuAni");
    }

    #[test]
    fn test_reset_email_link() {
        let config = MailConfig {
            public_url: "https://suzuani.example/".to_string(),
            ..MailConfig::default()
        };
        let mail = reset_email(&config, "suzu", "suzu@example.com", "tok.en", 1800);
        assert!(mail
            .body
            .contains("https://suzuani.example/reset_password/tok.en"));
        assert!(mail.body.contains("expires in 30 minutes"));
    }

    #[test]
    fn test_reset_email_follows_configured_lifetime() {
        let mail = reset_email(&MailConfig::default(), "suzu", "suzu@example.com", "t", 7200);
        assert!(mail.body.contains("expires in 2 hours"));

        assert_eq!(describe_lifetime(60), "1 minute");
        assert_eq!(describe_lifetime(90), "90 seconds");
        assert_eq!(describe_lifetime(3600), "1 hour");
    }

    #[test]
    fn test_spool_mailer_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = SpoolMailer::new(dir.path().join("spool"));
        let mail = otp_email(&MailConfig::default(), "suzu", "suzu@example.com", "654321");

        mailer.send(&mail).unwrap();

        let files: Vec<_> = std::fs::read_dir(mailer.spool_dir()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let content = std::fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
        assert!(content.contains("To: suzu@example.com"));
        assert!(content.contains("654321"));
    }

    #[test]
    fn test_memory_mailer_failing() {
        let mailer = MemoryMailer::failing();
        let mail = otp_email(&MailConfig::default(), "a", "a@b.c", "111111");
        assert!(mailer.send(&mail).is_err());
        assert!(mailer.sent().is_empty());
    }
}

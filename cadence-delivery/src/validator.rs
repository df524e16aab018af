//! Recipient list validation.
//!
//! Pure filtering: the registries are read, never written. Running the
//! same input twice yields the same partition, which the engine relies
//! on when a create request is replayed.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use cadence_common::{EmailAddress, Recipient, RecipientInput};
use cadence_health::{SuppressionList, SuppressionReason};

/// Domains from throwaway-address providers. Matched exactly or as a
/// parent domain (`mail.tempmail.com` is still disposable).
const DISPOSABLE_DOMAINS: &[&str] = &[
    "10minutemail.com",
    "getnada.com",
    "guerrillamail.com",
    "mailinator.com",
    "sharklasers.com",
    "temp-mail.org",
    "tempmail.com",
    "throwaway.email",
    "trashmail.com",
    "yopmail.com",
];

/// Consumer mailbox providers. Not rejected — tagged as higher
/// reputation risk for the health counters, since B2B lists heavy on
/// free-mail domains correlate with stale data.
const FREE_MAIL_DOMAINS: &[&str] = &[
    "aol.com",
    "gmail.com",
    "gmx.com",
    "hotmail.com",
    "icloud.com",
    "mail.com",
    "outlook.com",
    "proton.me",
    "yahoo.com",
    "zoho.com",
];

/// A recipient excluded from the sendable set, with the reason reported
/// back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecipient {
    /// The email as submitted (pre-normalization), for display.
    pub email: String,
    pub reason: String,
}

/// Outcome of validating a raw recipient list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// The sendable set, in input order, first occurrence of each
    /// address.
    pub valid: Vec<Recipient>,
    pub invalid: Vec<RejectedRecipient>,
    /// In-batch duplicates; counted separately from `invalid`.
    pub duplicates: usize,
    /// Accepted recipients on free-mail domains.
    pub high_risk: usize,
}

/// Filter and deduplicate a raw recipient list into a sendable set.
#[must_use]
pub fn validate(inputs: &[RecipientInput], suppression: &SuppressionList) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut seen: AHashSet<EmailAddress> = AHashSet::with_capacity(inputs.len());

    for input in inputs {
        let Ok(email) = EmailAddress::parse(&input.email) else {
            report.invalid.push(RejectedRecipient {
                email: input.email.clone(),
                reason: "Invalid email address".to_string(),
            });
            continue;
        };

        // First occurrence wins; later submissions of the same address
        // are counted but not reported as invalid.
        if !seen.insert(email.clone()) {
            report.duplicates += 1;
            continue;
        }

        if let Some(reason) = suppression.check(&email) {
            report.invalid.push(RejectedRecipient {
                email: input.email.clone(),
                reason: suppression_reason_text(reason).to_string(),
            });
            continue;
        }

        if is_disposable(email.domain()) {
            report.invalid.push(RejectedRecipient {
                email: input.email.clone(),
                reason: "Disposable email address".to_string(),
            });
            continue;
        }

        if is_free_mail(email.domain()) {
            report.high_risk += 1;
        }

        report.valid.push(input.clone().into_recipient(email));
    }

    report
}

const fn suppression_reason_text(reason: SuppressionReason) -> &'static str {
    match reason {
        SuppressionReason::Bounced => "Email address previously bounced",
        SuppressionReason::Unsubscribed => "Recipient has unsubscribed",
        SuppressionReason::Complained => "Recipient filed a spam complaint",
    }
}

fn is_disposable(domain: &str) -> bool {
    DISPOSABLE_DOMAINS
        .iter()
        .any(|d| domain == *d || domain.ends_with(&format!(".{d}")))
}

fn is_free_mail(domain: &str) -> bool {
    FREE_MAIL_DOMAINS.contains(&domain)
}

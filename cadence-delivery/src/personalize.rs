//! Per-recipient template rendering.
//!
//! Rendering is deterministic and side-effect-free: the same template,
//! recipient, and settings always produce the same output. The scheduler
//! depends on that for idempotent retries — re-rendering on a retry
//! cannot produce a different message.

use cadence_campaign::{CampaignId, CampaignSettings};
use cadence_common::{Recipient, Template};

/// A rendered message for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub html_body: String,
    pub text_body: Option<String>,
}

/// Render a template for one recipient, appending tracking
/// instrumentation and the unsubscribe footer per the campaign settings.
#[must_use]
pub fn render(
    template: &Template,
    recipient: &Recipient,
    campaign_id: &CampaignId,
    settings: &CampaignSettings,
) -> RenderedMessage {
    let subject = merge(&template.subject, recipient);
    let mut html_body = merge(&template.html_body, recipient);
    let mut text_body = template.text_body.as_deref().map(|t| merge(t, recipient));

    if settings.track_opens {
        html_body.push_str(&open_pixel(
            &settings.tracking_base_url,
            campaign_id,
            &recipient.id,
        ));
    }

    if settings.include_unsubscribe {
        let url = unsubscribe_url(&settings.tracking_base_url, campaign_id, &recipient.id);
        html_body.push_str(&format!(
            "\n<p style=\"font-size:12px;color:#888\"><a href=\"{url}\">Unsubscribe</a></p>"
        ));
        if let Some(text) = text_body.as_mut() {
            text.push_str(&format!("\n\nUnsubscribe: {url}"));
        }
    }

    RenderedMessage {
        subject,
        html_body,
        text_body,
    }
}

/// Substitute `{{key}}` placeholders.
///
/// Well-known keys fall back to safe defaults rather than failing;
/// unknown keys resolve from the custom-field map, and anything still
/// unmatched renders as an empty string. An unterminated `{{` is copied
/// through literally.
fn merge(input: &str, recipient: &Recipient) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);

        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            output.push_str(&rest[start..]);
            return output;
        };

        let key = after[..end].trim();
        output.push_str(resolve(recipient, key));

        rest = &after[end + 2..];
    }

    output.push_str(rest);
    output
}

fn resolve<'a>(recipient: &'a Recipient, key: &str) -> &'a str {
    match recipient.merge_value(key) {
        Some(value) => value,
        None => match key {
            "firstName" => "there",
            "company" => "your company",
            _ => "",
        },
    }
}

fn open_pixel(base: &str, campaign_id: &CampaignId, recipient_id: &str) -> String {
    format!(
        "\n<img src=\"{base}/o/{campaign_id}/{recipient_id}\" width=\"1\" height=\"1\" \
         alt=\"\" style=\"display:none\">"
    )
}

fn unsubscribe_url(base: &str, campaign_id: &CampaignId, recipient_id: &str) -> String {
    let token = unsubscribe_token(campaign_id, recipient_id);
    format!("{base}/u/{campaign_id}/{recipient_id}?t={token:016x}")
}

/// Deterministic token binding an unsubscribe link to
/// `(campaign, recipient)` so a forwarded mail cannot unsubscribe an
/// arbitrary address. FNV-1a over both ids: stable across processes,
/// which a keyed hasher would not be.
fn unsubscribe_token(campaign_id: &CampaignId, recipient_id: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET;
    for byte in campaign_id
        .to_string()
        .bytes()
        .chain([b'/'])
        .chain(recipient_id.bytes())
    {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cadence_common::EmailAddress;
    use pretty_assertions::assert_eq;

    use super::*;

    fn recipient() -> Recipient {
        let mut r = Recipient::new(
            "r-1",
            EmailAddress::parse("dana@corp.example.com").unwrap(),
        );
        r.first_name = Some("Dana".to_string());
        r.company = Some("Initech".to_string());
        r.custom_fields
            .insert("plan".to_string(), "enterprise".to_string());
        r
    }

    fn bare_settings() -> CampaignSettings {
        CampaignSettings {
            track_opens: false,
            include_unsubscribe: false,
            ..Default::default()
        }
    }

    #[test]
    fn substitutes_known_fields() {
        let template = Template::new("Hi {{firstName}}", "<p>{{firstName}} at {{company}}</p>");
        let rendered = render(&template, &recipient(), &CampaignId::generate(), &bare_settings());

        assert_eq!(rendered.subject, "Hi Dana");
        assert_eq!(rendered.html_body, "<p>Dana at Initech</p>");
    }

    #[test]
    fn falls_back_for_missing_well_known_fields() {
        let template = Template::new("Hi {{firstName}}", "{{company}} / {{lastName}}");
        let anonymous = Recipient::new(
            "r-2",
            EmailAddress::parse("anon@example.com").unwrap(),
        );
        let rendered = render(&template, &anonymous, &CampaignId::generate(), &bare_settings());

        assert_eq!(rendered.subject, "Hi there");
        assert_eq!(rendered.html_body, "your company / ");
    }

    #[test]
    fn custom_fields_checked_last_and_default_empty() {
        let template = Template::new("{{plan}}", "{{plan}} {{nonexistent}}");
        let rendered = render(&template, &recipient(), &CampaignId::generate(), &bare_settings());

        assert_eq!(rendered.subject, "enterprise");
        assert_eq!(rendered.html_body, "enterprise ");
    }

    #[test]
    fn unterminated_placeholder_is_literal() {
        let template = Template::new("Hi {{firstName", "ok");
        let rendered = render(&template, &recipient(), &CampaignId::generate(), &bare_settings());
        assert_eq!(rendered.subject, "Hi {{firstName");
    }

    #[test]
    fn tracking_pixel_appended_when_enabled() {
        let template = Template::new("s", "<p>body</p>");
        let settings = CampaignSettings {
            track_opens: true,
            include_unsubscribe: false,
            ..Default::default()
        };
        let id = CampaignId::generate();
        let rendered = render(&template, &recipient(), &id, &settings);

        assert!(rendered.html_body.contains(&format!("/o/{id}/r-1")));
        assert!(rendered.html_body.contains("width=\"1\""));
    }

    #[test]
    fn unsubscribe_footer_scoped_to_campaign_and_recipient() {
        let template = Template::new("s", "<p>body</p>");
        let mut settings = bare_settings();
        settings.include_unsubscribe = true;
        let id = CampaignId::generate();
        let rendered = render(&template, &recipient(), &id, &settings);

        assert!(rendered.html_body.contains(&format!("/u/{id}/r-1?t=")));
    }

    #[test]
    fn rendering_is_deterministic() {
        let template = Template::new("Hi {{firstName}}", "<p>{{company}}</p>");
        let settings = CampaignSettings::default();
        let id = CampaignId::generate();
        let r = recipient();

        let first = render(&template, &r, &id, &settings);
        let second = render(&template, &r, &id, &settings);
        assert_eq!(first, second);
    }

    #[test]
    fn token_differs_per_recipient() {
        let id = CampaignId::generate();
        assert_ne!(
            unsubscribe_token(&id, "r-1"),
            unsubscribe_token(&id, "r-2")
        );
    }
}

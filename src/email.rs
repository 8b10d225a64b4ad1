// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Email templates.

use crate::providers::{EmailMessage, SignedDownloadUrl};

pub const FULFILLMENT_SUBJECT: &str = "Your Digital Print Download";

/// Download email sent after a successful purchase.
pub fn fulfillment_email(
    from: &str,
    to: &str,
    print_title: &str,
    download: &SignedDownloadUrl,
) -> EmailMessage {
    let html = format!(
        r#"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; color: #2A2A2A;">
<h1 style="font-weight: 300;">Thank you for your purchase!</h1>
<p>Here is the link to download your high-resolution print of <strong>{title}</strong>:</p>
<p><a href="{url}" style="padding: 10px 20px; background-color: #2A2A2A; color: white; text-decoration: none; border-radius: 5px;">Download Print</a></p>
<p style="color: #666;">This link expires in {hours} hours.</p>
<p>If you ordered a physical print, you will receive another email with shipping details soon.</p>
</div>"#,
        title = escape_html(print_title),
        url = escape_html(&download.url),
        hours = download.expires_in_hours(),
    );

    EmailMessage {
        from: from.to_string(),
        to: to.to_string(),
        subject: FULFILLMENT_SUBJECT.to_string(),
        html,
        reply_to: None,
    }
}

/// Contact form inquiry relayed to the site owner.
pub struct ContactInquiry<'a> {
    pub name: &'a str,
    pub inquiry_type: &'a str,
    pub message: &'a str,
}

pub fn contact_email(
    from: &str,
    to: &str,
    reply_to: Option<&str>,
    inquiry: &ContactInquiry<'_>,
) -> EmailMessage {
    let html = format!(
        r#"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; color: #2A2A2A;">
<h2 style="font-weight: 300; border-bottom: 1px solid #eee; padding-bottom: 10px;">New Contact Inquiry</h2>
<p><strong>Name:</strong> {name}</p>
<p><strong>Inquiry Type:</strong> {inquiry_type}</p>
<div style="margin-top: 20px; padding: 15px; background-color: #f9f9f9; border-left: 4px solid #7D7259;">
<p style="margin: 0; white-space: pre-wrap;">{message}</p>
</div>
</div>"#,
        name = escape_html(inquiry.name),
        inquiry_type = escape_html(inquiry.inquiry_type),
        message = escape_html(inquiry.message),
    );

    EmailMessage {
        from: from.to_string(),
        to: to.to_string(),
        // Subject is plain text; strip line breaks so it stays one header line
        subject: format!(
            "New Inquiry: {} from {}",
            single_line(inquiry.inquiry_type),
            single_line(inquiry.name)
        ),
        html,
        reply_to: reply_to.map(str::to_string),
    }
}

fn single_line(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fulfillment_email_links_download() {
        let download = SignedDownloadUrl {
            url: "https://prints-bucket.s3.amazonaws.com/Denver%20Skyline.jpg?X-Amz-Expires=43200&a=b"
                .to_string(),
            storage_key: "Denver Skyline.jpg".to_string(),
            expires_in: Duration::from_secs(43_200),
        };
        let message = fulfillment_email(
            "Prints <p@example.com>",
            "a@b.com",
            "City Skyline",
            &download,
        );

        assert_eq!(message.to, "a@b.com");
        assert_eq!(message.subject, FULFILLMENT_SUBJECT);
        // & in the query string is entity-encoded inside the attribute
        assert!(message
            .html
            .contains("Denver%20Skyline.jpg?X-Amz-Expires=43200&amp;a=b"));
        assert!(message.html.contains("City Skyline"));
        assert!(message.html.contains("expires in 12 hours"));
    }

    #[test]
    fn contact_email_escapes_user_input() {
        let inquiry = ContactInquiry {
            name: "Eve <script>",
            inquiry_type: "Licensing\r\nBcc: x@y.z",
            message: "Hi & \"bye\"",
        };
        let message = contact_email(
            "Contact Form <onboarding@resend.dev>",
            "owner@example.com",
            Some("contact@example.com"),
            &inquiry,
        );

        assert!(message.html.contains("Eve &lt;script&gt;"));
        assert!(message.html.contains("Hi &amp; &quot;bye&quot;"));
        assert!(!message.subject.contains('\n'));
        assert_eq!(
            message.subject,
            "New Inquiry: Licensing  Bcc: x@y.z from Eve <script>"
        );
        assert_eq!(message.reply_to.as_deref(), Some("contact@example.com"));
    }
}

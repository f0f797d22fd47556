/// E-mail templates
///
/// Every value interpolated into a template is HTML-escaped. Links point at
/// the configured site URL.

use super::OutgoingMail;

pub const VERIFICATION_SUBJECT: &str = "Nutrition Habit Challenge: E-Mail Verification Required";
pub const REGISTRATION_SUBJECT: &str = "Nutrition Habit Challenge: Registration Confirmation";
pub const RESET_PASSWORD_SUBJECT: &str = "Nutrition Habit Challenge: Reset Password Request";

const YSB_DONATION_URL: &str = "http://ccysb.com/?page_id=1197";
const CVIM_DONATION_URL: &str =
    "https://cvim.ejoinme.org/MyPages/CVIMNHC/tabid/524126/Default.aspx";
const FACEBOOK_PAGE_URL: &str = "https://facebook.com/NHC2017";

/// Escapes text for inclusion in HTML content or attribute values
///
/// # Example
///
/// ```
/// use nhc_shared::mail::templates::escape_html;
///
/// assert_eq!(escape_html("<b>\"Tom\" & Jerry's</b>"),
///            "&lt;b&gt;&quot;Tom&quot; &amp; Jerry&#39;s&lt;/b&gt;");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
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

/// Renders the campaign's e-mails
#[derive(Debug, Clone)]
pub struct MailTemplates {
    site_url: String,
}

impl MailTemplates {
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn link(&self, path: &str) -> String {
        let url = escape_html(&format!("{}{}", self.site_url, path));
        format!(r#"<a href="{url}">{url}</a>"#)
    }

    /// Asks a new account holder to confirm their e-mail address
    pub fn verification(&self, to: &str, first_name: &str, code: &str) -> OutgoingMail {
        let html_body = format!(
            "<p>Hi {name},</p>\n\
             <p>Thank you for creating an account at {site}!</p>\n\
             <p>Before you can register, you need to verify your e-mail address.<br />\n\
             To do so, just click this link or paste the URL into your browser: {verify}</p>\n\
             <p>Sincerely,<br />\nThe NHC Team</p>\n",
            name = escape_html(first_name),
            site = self.link(""),
            verify = self.link(&format!("/verify/{}", code)),
        );

        OutgoingMail {
            to: to.to_string(),
            subject: VERIFICATION_SUBJECT.to_string(),
            html_body,
        }
    }

    /// Confirms a completed registration
    ///
    /// Includes the family code when there is one and a donation link for
    /// the chosen charity.
    pub fn registration_confirmation(
        &self,
        to: &str,
        first_name: &str,
        family_code: Option<&str>,
        donation: &str,
    ) -> OutgoingMail {
        let family = family_code
            .filter(|code| !code.is_empty())
            .map(|code| {
                format!(
                    "<p>Here is your family code to share with members of your family, \
                     they'll need it when they register: <strong>{}</strong></p>\n",
                    escape_html(code)
                )
            })
            .unwrap_or_default();

        let donation = match donation {
            "ysb" => format!(
                "<p>To donate to the Youth Service Bureau, follow \
                 <strong><a href=\"{}\" target=\"_blank\">this link</a></strong>.</p>\n",
                YSB_DONATION_URL
            ),
            "cvim" => format!(
                "<p>To donate to the Centre Volunteers in Medicine, follow \
                 <a href=\"{}\" target=\"_blank\">this link</a>.</p>\n",
                CVIM_DONATION_URL
            ),
            _ => String::new(),
        };

        let html_body = format!(
            "<p>Hi {name},</p>\n\
             <p>Congratulations! You are now registered for the Nutrition Habit Challenge. \
             Your participation benefits both you and our community.</p>\n\
             {family}\
             <p>We'll be sending you an email as we get closer to the event. In the meantime, \
             check out the <a href=\"{resources}\">Resource Page</a> for great information and \
             insights to help you be successful with the Challenge.</p>\n\
             <p>Stay connected with us and be \"in-the-know\" about special NHC promotional \
             events by following us on <a href=\"{facebook}\">Facebook</a>.</p>\n\
             {donation}\
             <p><small>If you would like a physical scorecard to track your challenge progress \
             with, download and print the <a href=\"{scorecard}\">PDF scorecard.</a></small></p>\n\
             <p>Sincerely,<br />The NHC Team</p>\n",
            name = escape_html(first_name),
            family = family,
            resources = escape_html(&format!("{}/resources", self.site_url)),
            facebook = FACEBOOK_PAGE_URL,
            donation = donation,
            scorecard = escape_html(&format!("{}/downloads/scorecard.pdf", self.site_url)),
        );

        OutgoingMail {
            to: to.to_string(),
            subject: REGISTRATION_SUBJECT.to_string(),
            html_body,
        }
    }

    /// Sends a password reset link
    pub fn password_reset(&self, to: &str, first_name: &str, code: &str) -> OutgoingMail {
        let html_body = format!(
            "<p>Hi {name},</p>\n\
             <p>We received a request to reset the password on this account at {site}</p>\n\
             <p>To reset your password, use the following link: {reset}</p>\n\
             <p>If you did not make this request, please ignore this e-mail.</p>\n\
             <p>Sincerely,<br />\nThe NHC Team</p>\n",
            name = escape_html(first_name),
            site = self.link(""),
            reset = self.link(&format!("/reset-password/{}", code)),
        );

        OutgoingMail {
            to: to.to_string(),
            subject: RESET_PASSWORD_SUBJECT.to_string(),
            html_body,
        }
    }

    /// Administrator message to many recipients
    ///
    /// The body is plain text; line breaks become `<br />`.
    pub fn admin_message(&self, recipients: &[String], subject: &str, body: &str) -> Vec<OutgoingMail> {
        let html_body = format!(
            "<p>{}</p>\n",
            escape_html(body).replace("\r\n", "\n").replace('\n', "<br />\n")
        );

        recipients
            .iter()
            .map(|to| OutgoingMail {
                to: to.clone(),
                subject: subject.to_string(),
                html_body: html_body.clone(),
            })
            .collect()
    }
}

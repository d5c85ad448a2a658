/// Branded HTML body for the account confirmation email. Inline styles only;
/// email clients ignore external stylesheets.
const CONFIRMATION_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Confirm Your Account</title>
  </head>
  <body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    <div style="text-align: center; margin-bottom: 30px; padding: 20px; background: linear-gradient(135deg, #8b5cf6 0%, #a855f7 100%); border-radius: 12px; color: white;">
      <div style="font-size: 32px; font-weight: bold; margin-bottom: 10px;">Remi</div>
      <p>Your AI clone is waiting</p>
    </div>
    <p>Hi {greeting},</p>
    <p>Thanks for signing up for Remi. Confirm your email address to start
    uploading chats and talking to your clone.</p>
    <p style="text-align: center;">
      <a href="{confirmation_url}" style="display: inline-block; padding: 16px 32px; background: linear-gradient(135deg, #8b5cf6 0%, #a855f7 100%); color: white; text-decoration: none; border-radius: 8px; font-weight: 600; margin: 20px 0;">Confirm Your Account</a>
    </p>
    <p>If the button does not work, paste this link into your browser:<br>
    <a href="{confirmation_url}">{confirmation_url}</a></p>
    <div style="margin-top: 40px; padding-top: 20px; border-top: 1px solid #eee; font-size: 14px; color: #666; text-align: center;">
      <p>You received this email because an account was created with this
      address. If that wasn't you, you can safely ignore it.</p>
    </div>
  </body>
</html>
"#;

pub fn render_confirmation(name: Option<&str>, confirmation_url: &str) -> String {
    let greeting = name.filter(|n| !n.trim().is_empty()).unwrap_or("there");
    CONFIRMATION_TEMPLATE
        .replace("{greeting}", greeting)
        .replace("{confirmation_url}", confirmation_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_url_and_name() {
        let html = render_confirmation(Some("Alex"), "https://remi.app/confirm?t=abc");
        assert!(html.contains("Hi Alex,"));
        assert!(html.contains("https://remi.app/confirm?t=abc"));
        assert!(!html.contains("{confirmation_url}"));
    }

    #[test]
    fn test_render_falls_back_to_generic_greeting() {
        let html = render_confirmation(None, "https://remi.app/confirm");
        assert!(html.contains("Hi there,"));
        let blank = render_confirmation(Some("  "), "https://remi.app/confirm");
        assert!(blank.contains("Hi there,"));
    }
}

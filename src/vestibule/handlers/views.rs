//! Minimal HTML views. Markup is intentionally bare; only the form contract
//! (field names `username`, `password`, `_csrf`) matters to clients.

use crate::vestibule::auth::{Reply, View};

pub(super) fn render(reply: &Reply) -> String {
    match reply {
        Reply::Render(View::Home) => page(
            "Home",
            r#"<h1>Welcome</h1><p><a href="/login">Log in</a></p>"#,
        ),
        Reply::Render(View::Login { csrf }) => {
            let mut body = String::from(r#"<h1>Log in</h1><form method="post" action="/login">"#);
            body.push_str(&format!(
                r#"<input type="hidden" name="_csrf" value="{}">"#,
                escape(csrf.as_str())
            ));
            body.push_str(concat!(
                r#"<label>Username <input type="text" name="username" autocomplete="username"></label>"#,
                r#"<label>Password <input type="password" name="password" autocomplete="current-password"></label>"#,
                r#"<button type="submit">Log in</button></form>"#,
            ));
            page("Log in", &body)
        }
        Reply::Render(View::Profile { user_id }) => page(
            "Profile",
            &format!(
                r#"<h1>Profile</h1><p>Signed in as {}</p><p><a href="/logout">Log out</a></p>"#,
                escape(&user_id.to_string())
            ),
        ),
        Reply::Render(View::Error) => page(
            "Login failed",
            r#"<h1>Login failed</h1><p>Unknown username or wrong password.</p><p><a href="/login">Try again</a></p>"#,
        ),
        Reply::Redirect(location) => page(
            "Redirecting",
            &format!(
                r#"<p>Redirecting to <a href="{0}">{0}</a>.</p>"#,
                escape(location)
            ),
        ),
        Reply::Forbidden => page("Forbidden", "<h1>Forbidden</h1>"),
    }
}

pub(super) fn server_error() -> String {
    page("Server error", "<h1>Internal Server Error</h1>")
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title></head><body>{body}</body></html>",
        escape(title)
    )
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vestibule::auth::CsrfToken;

    #[test]
    fn escape_handles_markup() {
        assert_eq!(
            escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn redirect_body_links_location() {
        let html = render(&Reply::Redirect("/profile"));
        assert!(html.contains(r#"<a href="/profile">/profile</a>"#));
    }

    #[test]
    fn login_form_embeds_escaped_token() {
        let html = render(&Reply::Render(View::Login {
            csrf: CsrfToken::from_raw("a\"b"),
        }));
        assert!(html.contains(r#"<input type="hidden" name="_csrf" value="a&quot;b">"#));
        assert!(html.contains(r#"name="username""#));
        assert!(html.contains(r#"name="password""#));
    }

    #[test]
    fn forbidden_page() {
        assert!(render(&Reply::Forbidden).contains("<h1>Forbidden</h1>"));
    }
}

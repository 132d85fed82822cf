//! Redirecting form submission
//!
//! The provider answers a failed login with HTTP 200 and an in-page error,
//! so the status code says nothing. What does change on success is the
//! location: a good submission redirects away from the form's action URL.
//! This module is the only place that relies on that behaviour.

use crate::error::{HydroError, Result};
use crate::form::FormDescriptor;
use crate::http::{HttpSession, Page};
use crate::logging::get_logger;
use reqwest::Url;

/// Whether the response ended somewhere other than the submitted URL
fn redirected(action: &Url, landed: &Url) -> bool {
    let mut action = action.clone();
    let mut landed = landed.clone();
    action.set_fragment(None);
    landed.set_fragment(None);
    action != landed
}

/// Submit `form` through `session` and require a redirect
///
/// The form is consumed: descriptors are single-use. The session keeps any
/// cookies set along the way.
pub async fn submit_redirect_form<S>(session: &mut S, form: FormDescriptor) -> Result<Page>
where
    S: HttpSession + ?Sized,
{
    let logger = get_logger("submit");
    let page = session
        .send_form(form.method(), form.action(), form.fields())
        .await?;

    if !redirected(form.action(), &page.url) {
        logger.warn(&format!(
            "{} {} answered {} without redirecting",
            form.method(),
            form.action(),
            page.status
        ));
        return Err(HydroError::rejected(form.action().as_str()));
    }

    logger.debug(&format!("{} redirected to {}", form.action(), page.url));
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn fragment_only_difference_is_not_a_redirect() {
        let a = Url::parse("https://x.example/login.aspx").unwrap();
        let b = Url::parse("https://x.example/login.aspx#error").unwrap();
        assert!(!redirected(&a, &b));
    }

    #[test]
    fn query_difference_is_a_redirect() {
        let a = Url::parse("https://x.example/login.aspx").unwrap();
        let b = Url::parse("https://x.example/login.aspx?ok=1").unwrap();
        assert!(redirected(&a, &b));
    }

    struct Echo {
        land_on: Url,
        status: u16,
        sent: Vec<(String, BTreeMap<String, String>)>,
    }

    #[async_trait::async_trait]
    impl HttpSession for Echo {
        async fn get(&mut self, url: &Url) -> Result<Page> {
            Ok(Page::new(url.clone(), 200, ""))
        }

        async fn send_form(
            &mut self,
            method: &str,
            _url: &Url,
            fields: &BTreeMap<String, String>,
        ) -> Result<Page> {
            self.sent.push((method.to_string(), fields.clone()));
            Ok(Page::new(self.land_on.clone(), self.status, "<html></html>"))
        }
    }

    fn login_form() -> FormDescriptor {
        let page = Page::new(
            Url::parse("https://x.example/login.aspx").unwrap(),
            200,
            r#"<form method="post"><input name="u" value="alice"></form>"#,
        );
        crate::form::extract_form(&page, "form").unwrap()
    }

    #[tokio::test]
    async fn same_url_with_ok_status_is_rejected() {
        let mut session = Echo {
            land_on: Url::parse("https://x.example/login.aspx").unwrap(),
            status: 200,
            sent: Vec::new(),
        };
        let err = submit_redirect_form(&mut session, login_form())
            .await
            .unwrap_err();
        assert!(matches!(err, HydroError::SubmissionRejected { ref url } if url == "https://x.example/login.aspx"));
        assert_eq!(session.sent.len(), 1);
    }

    #[tokio::test]
    async fn different_url_with_error_status_still_succeeds() {
        let mut session = Echo {
            land_on: Url::parse("https://x.example/home").unwrap(),
            status: 500,
            sent: Vec::new(),
        };
        let page = submit_redirect_form(&mut session, login_form())
            .await
            .unwrap();
        assert_eq!(page.url.as_str(), "https://x.example/home");
        assert_eq!(session.sent[0].0, "POST");
        assert_eq!(
            session.sent[0].1.get("u").map(String::as_str),
            Some("alice")
        );
    }
}

use hydro_usage::error::HydroError;
use hydro_usage::form::{FieldPredicate, extract_form, extract_form_with_fields, is_text_input};
use hydro_usage::http::Page;
use reqwest::Url;

fn page(body: &str) -> Page {
    Page::new(
        Url::parse("https://portal.example.com/selfserve/pages/login.aspx").unwrap(),
        200,
        body,
    )
}

#[test]
fn absolute_action_is_kept() {
    let p = page(r#"<form name="form" method="post" action="https://data.example.com/token"></form>"#);
    let form = extract_form(&p, "form[name='form']").unwrap();
    assert_eq!(form.action().as_str(), "https://data.example.com/token");
}

#[test]
fn root_relative_action_is_made_absolute() {
    let p = page(r#"<form id="f" action="/Pages/Redirect.aspx"></form>"#);
    let form = extract_form(&p, "#f").unwrap();
    assert_eq!(
        form.action().as_str(),
        "https://portal.example.com/Pages/Redirect.aspx"
    );
}

#[test]
fn zero_or_two_forms_are_structural_mismatches() {
    let none = page("<html><body>maintenance</body></html>");
    assert!(matches!(
        extract_form(&none, "form").unwrap_err(),
        HydroError::StructuralMismatch { .. }
    ));

    let two = page(r#"<form name="a"></form><form name="b"></form>"#);
    assert!(matches!(
        extract_form(&two, "form").unwrap_err(),
        HydroError::StructuralMismatch { .. }
    ));
    assert!(extract_form(&two, "form[name='b']").is_ok());
}

#[test]
fn fields_follow_browser_submission_rules() {
    let p = page(
        r#"<form id="f" method="post">
             <input type="hidden" name="token" value="abc">
             <input name="empty">
             <input type="checkbox" name="off" value="1">
             <input type="checkbox" name="on" checked>
             <input type="radio" name="pick" value="b" checked>
             <input value="unnamed">
           </form>
           <input type="text" name="outside" value="x">"#,
    );
    let form = extract_form(&p, "#f").unwrap();
    let fields = form.fields();
    assert_eq!(fields["token"], "abc");
    assert_eq!(fields["empty"], "");
    assert_eq!(fields["on"], "on");
    assert_eq!(fields["pick"], "b");
    assert!(!fields.contains_key("off"));
    assert!(!fields.contains_key("outside"));
    assert_eq!(fields.len(), 4);
}

#[test]
fn role_predicates_search_the_whole_document() {
    let p = page(
        r#"<form id="f"><input type="text" name="user"></form>
           <input type="text" name="search">"#,
    );
    let text: FieldPredicate<'_> = &is_text_input;
    let (_, selection) = extract_form_with_fields(&p, "#f", &[("text", text)]).unwrap();
    assert_eq!(selection.get("text").len(), 2);
    assert!(matches!(
        selection.require_single("text").unwrap_err(),
        HydroError::StructuralMismatch { .. }
    ));
    assert!(selection.get("unknown").is_empty());
}

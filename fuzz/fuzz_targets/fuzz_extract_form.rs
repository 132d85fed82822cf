#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(url) = reqwest::Url::parse("https://portal.example.com/selfserve/pages/login.aspx")
    else {
        return;
    };
    let page = hydro_usage::http::Page::new(url, 200, String::from_utf8_lossy(data));

    // Arbitrary markup must only ever yield a form or a structural error
    let _ = hydro_usage::form::extract_form(&page, "form[name='aspnetForm']");
    let _ = hydro_usage::form::extract_form(&page, "form");
    let _ = hydro_usage::auth::prepare_login_form(
        &page,
        "form",
        &hydro_usage::auth::Credentials::new("user", "pass"),
    );
});

use hydro_usage::config::ProviderConfig;
use hydro_usage::error::{ErrorKind, HydroError};
use hydro_usage::http::ReqwestSession;
use hydro_usage::trust::TrustBundle;
use std::fs;
use std::path::Path;

#[test]
fn loads_fixture_bundle() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/ca_bundle.pem");
    let bundle = TrustBundle::load(&path).unwrap();
    assert_eq!(bundle.len(), 2);
    assert_eq!(bundle.path(), path.as_path());
    assert!(ReqwestSession::new(&ProviderConfig::default(), &bundle).is_ok());
}

#[test]
fn missing_bundle_is_a_trust_error() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let err = TrustBundle::load(tmp_dir.path().join("nope.pem")).unwrap_err();
    assert!(matches!(err, HydroError::TrustValidation { .. }));
    assert_eq!(err.kind(), ErrorKind::TrustBroken);
}

#[test]
fn bundle_without_certificates_is_a_trust_error() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("empty.pem");
    fs::write(&path, "# no certificates here\n").unwrap();
    let err = TrustBundle::load(&path).unwrap_err();
    assert!(matches!(err, HydroError::TrustValidation { .. }));
}

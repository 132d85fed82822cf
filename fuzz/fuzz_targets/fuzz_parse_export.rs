#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let classifier = hydro_usage::tariff::TouClassifier::ontario();
    if let Ok(records) = hydro_usage::usage::parse_export(&text, &classifier) {
        let _ = hydro_usage::usage::summarize(&records);
        let _ = hydro_usage::usage::summarize_by(&records, hydro_usage::usage::Binning::Hourly);
    }
});

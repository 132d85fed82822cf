use super::*;

/// Toronto Hydro self-serve login page
pub const DEFAULT_LOGIN_URL: &str = "https://css.torontohydro.com/selfserve/pages/login.aspx?ReturnUrl=%2f_layouts%2fAuthenticate.aspx%3fSource%3d%252f&Source=%2f";

/// Usage overview page that answers with the script-driven redirect form
pub const DEFAULT_USAGE_URL: &str =
    "https://css.torontohydro.com/Pages/ICFRedirect.aspx?Controller=myenergy&Action=billhistory";

/// Full-history CSV export
pub const DEFAULT_EXPORT_URL: &str =
    "https://myusage.torontohydro.com/cassandra/getfile/period/all/format/csv";

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            usage_url: DEFAULT_USAGE_URL.to_string(),
            export_url: DEFAULT_EXPORT_URL.to_string(),
            login_form_selector: "form[name='aspnetForm']".to_string(),
            secondary_form_selector: "form[name='form']".to_string(),
            ca_bundle: "torontohydro_cert_bundle.pem".to_string(),
            request_timeout_secs: 30,
            user_agent: format!(
                "Mozilla/5.0 (X11; Linux x86_64) hydro-usage/{}",
                env!("APP_VERSION")
            ),
        }
    }
}

impl Default for TariffConfig {
    fn default() -> Self {
        Self {
            timezone: "America/Toronto".to_string(),
            ambiguous_time: AmbiguityPolicy::Standard,
            winter_months: vec![11, 12, 1, 2, 3, 4],
            ontario_holidays: true,
            extra_holidays: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/hydro-usage.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            tariff: TariffConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

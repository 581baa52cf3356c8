//! GNOME-family desktops: system proxy through `gsettings`.

use super::{run_command, ProxyBackend};
use crate::core::applier::ProxyConfig;

const SCHEMA: &str = "org.gnome.system.proxy";

pub struct GnomeProxy;

impl GnomeProxy {
    pub fn is_available() -> bool {
        let desktop = std::env::var("XDG_CURRENT_DESKTOP").unwrap_or_default();
        desktop.split(':').any(|d| {
            matches!(
                d,
                "GNOME" | "Unity" | "Cinnamon" | "X-Cinnamon" | "MATE" | "Budgie" | "Pantheon"
            )
        })
    }

    fn gset(schema: &str, key: &str, value: &str) -> Result<(), String> {
        run_command("gsettings", &["set", schema, key, value]).map(|_| ())
    }
}

/// Formats hosts as a GVariant string array: `['a', 'b']`.
fn gvariant_list(items: &[String]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|item| format!("'{}'", item.replace('\'', "\\'")))
        .collect();
    format!("[{}]", quoted.join(", "))
}

impl ProxyBackend for GnomeProxy {
    fn name(&self) -> &str {
        "gsettings"
    }

    fn set(&self, config: &ProxyConfig) -> Result<(), String> {
        let port = config.port.to_string();
        let http = format!("{SCHEMA}.http");
        let https = format!("{SCHEMA}.https");

        Self::gset(&http, "host", &config.server)?;
        Self::gset(&http, "port", &port)?;
        Self::gset(&https, "host", &config.server)?;
        Self::gset(&https, "port", &port)?;

        match &config.auth {
            Some(auth) => {
                Self::gset(&http, "use-authentication", "true")?;
                Self::gset(&http, "authentication-user", &auth.username)?;
                Self::gset(&http, "authentication-password", &auth.password)?;
            }
            None => Self::gset(&http, "use-authentication", "false")?,
        }

        Self::gset(
            SCHEMA,
            "ignore-hosts",
            &gvariant_list(&config.expanded_bypass_list()),
        )?;
        Self::gset(SCHEMA, "mode", "manual")?;

        log::info!(
            "[proxy] GSettings: manual HTTP proxy {}:{}",
            config.server,
            config.port
        );
        Ok(())
    }

    fn clear(&self) -> Result<(), String> {
        Self::gset(SCHEMA, "mode", "none")?;
        let http = format!("{SCHEMA}.http");
        // Credentials should not linger once the proxy is off.
        Self::gset(&http, "use-authentication", "false")?;
        Self::gset(&http, "authentication-password", "")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gvariant_list() {
        let hosts = vec!["localhost".to_string(), "127.0.0.0/8".to_string()];
        assert_eq!(gvariant_list(&hosts), "['localhost', '127.0.0.0/8']");
        assert_eq!(gvariant_list(&[]), "[]");
    }
}

//! macOS: system proxy through `networksetup` for one network service.

use super::{run_command, ProxyBackend};
use crate::core::applier::ProxyConfig;

pub struct NetworkSetupProxy {
    service: String,
}

impl NetworkSetupProxy {
    pub fn new(service: String) -> Self {
        Self { service }
    }

    fn run(&self, verb: &str, extra: &[&str]) -> Result<(), String> {
        let mut args = vec![verb, self.service.as_str()];
        args.extend_from_slice(extra);
        run_command("networksetup", &args).map(|_| ())
    }
}

impl ProxyBackend for NetworkSetupProxy {
    fn name(&self) -> &str {
        "networksetup"
    }

    fn set(&self, config: &ProxyConfig) -> Result<(), String> {
        let port = config.port.to_string();
        let mut server_args = vec![config.server.as_str(), port.as_str()];
        if let Some(auth) = &config.auth {
            server_args.extend_from_slice(&["on", auth.username.as_str(), auth.password.as_str()]);
        }

        self.run("-setwebproxy", &server_args)?;
        self.run("-setsecurewebproxy", &server_args)?;

        let bypass = config.expanded_bypass_list();
        let bypass: Vec<&str> = bypass.iter().map(String::as_str).collect();
        self.run("-setproxybypassdomains", &bypass)?;

        log::info!(
            "[proxy] networksetup: web proxy {}:{} on '{}'",
            config.server,
            config.port,
            self.service
        );
        Ok(())
    }

    fn clear(&self) -> Result<(), String> {
        self.run("-setwebproxystate", &["off"])?;
        self.run("-setsecurewebproxystate", &["off"])
    }
}

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use serde::Serialize;
use xapi::acsapi::{CapId, DriveId, LsmId};
use xapi::config::vars;
use xapi::XapiConfig;

/// Server and identity flags; anything omitted falls back to `XAPI_*`.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectArgs {
    /// XAPI server host name or address
    #[arg(long, global = true)]
    pub host: Option<String>,
    /// XAPI server TCP port
    #[arg(long, global = true)]
    pub port: Option<u16>,
    #[arg(long, global = true)]
    pub tapeplex: Option<String>,
    #[arg(long, global = true)]
    pub subsystem: Option<String>,
    /// Authorization user id
    #[arg(long, global = true)]
    pub user: Option<String>,
    /// Authorization group id
    #[arg(long, global = true)]
    pub group: Option<String>,
}

impl ConnectArgs {
    fn overrides(&self) -> Vec<(&'static str, String)> {
        [
            (vars::HOSTNAME, self.host.clone()),
            (vars::PORT, self.port.map(|port| port.to_string())),
            (vars::TAPEPLEX, self.tapeplex.clone()),
            (vars::SUBSYSTEM, self.subsystem.clone()),
            (vars::USER, self.user.clone()),
            (vars::GROUP, self.group.clone()),
        ]
        .into_iter()
        .filter_map(|(var, value)| value.map(|value| (var, value)))
        .collect()
    }
}

/// Resolve the configuration from `args` layered over `lookup`.
pub fn build_config_with(
    args: &ConnectArgs,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<XapiConfig> {
    let overrides = args.overrides();
    XapiConfig::from_lookup(|var| {
        overrides
            .iter()
            .find(|(name, _)| *name == var)
            .map(|(_, value)| value.clone())
            .or_else(|| lookup(var))
    })
    .context("resolve XAPI configuration (pass --host or set XAPI_HOSTNAME)")
}

pub fn build_config(args: &ConnectArgs) -> Result<XapiConfig> {
    build_config_with(args, |var| std::env::var(var).ok())
}

fn parts(text: &str, expected: usize, what: &str) -> Result<Vec<u16>> {
    let parts = text
        .split([':', ',', '-'])
        .map(|part| {
            part.trim()
                .parse::<u16>()
                .map_err(|err| anyhow!("invalid {what} {text:?}: {err}"))
        })
        .collect::<Result<Vec<_>>>()?;
    if parts.len() != expected {
        bail!("{what} {text:?} needs {expected} numbers separated by ':'");
    }
    Ok(parts)
}

/// Parse `AA`.
pub fn parse_acs(text: &str) -> Result<u16> {
    Ok(parts(text, 1, "ACS")?[0])
}

/// Parse `AA:LL`.
pub fn parse_lsm(text: &str) -> Result<LsmId> {
    let parts = parts(text, 2, "LSM id")?;
    Ok(LsmId {
        acs: parts[0],
        lsm: parts[1],
    })
}

/// Parse `AA:LL:CC`.
pub fn parse_cap(text: &str) -> Result<CapId> {
    let parts = parts(text, 3, "CAP id")?;
    Ok(CapId::new(parts[0], parts[1], parts[2]))
}

/// Parse `AA:LL:PP:DD`.
pub fn parse_drive(text: &str) -> Result<DriveId> {
    let parts = parts(text, 4, "drive id")?;
    Ok(DriveId::new(parts[0], parts[1], parts[2], parts[3]))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialise JSON output")?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse() {
        assert_eq!(parse_acs("3").expect("acs"), 3);
        assert_eq!(parse_lsm("0:12").expect("lsm"), LsmId { acs: 0, lsm: 12 });
        assert_eq!(parse_cap("1:2:3").expect("cap"), CapId::new(1, 2, 3));
        assert!(parse_cap("1:2").is_err());
        assert!(parse_lsm("a:b").is_err());
        assert_eq!(parse_drive("0:1:10:2").expect("drive"), DriveId::new(0, 1, 10, 2));
        assert!(parse_drive("0:1:10").is_err());
    }

    #[test]
    fn flags_override_environment() {
        let args = ConnectArgs {
            host: Some("mvs2".into()),
            tapeplex: Some("hscx".into()),
            ..ConnectArgs::default()
        };
        let config = build_config_with(&args, |var| match var {
            "XAPI_HOSTNAME" => Some("mvs1".into()),
            "XAPI_PORT" => Some("9000".into()),
            _ => None,
        })
        .expect("config");
        assert_eq!(config.hostname, "mvs2");
        assert_eq!(config.port, 9000);
        assert_eq!(config.tapeplex, "HSCX");
        assert_eq!(config.subsystem, "HSCX");
    }

    #[test]
    fn missing_host_is_reported() {
        let err = build_config_with(&ConnectArgs::default(), |_| None).expect_err("no host");
        assert!(format!("{err:#}").contains("XAPI_HOSTNAME"));
    }
}

use anyhow::{Context, Result};
use xapi::acsapi::QueryCriteria;
use xapi::{render_query, XapiConfig};

/// Print the request document a query would send.
pub fn run(config: &XapiConfig, criteria: &QueryCriteria) -> Result<()> {
    let xml = render_query(config, 1, config.user.as_deref(), criteria)
        .context("build request document")?;
    let text = std::str::from_utf8(&xml).context("request is not UTF-8")?;
    println!("{text}");
    Ok(())
}

//! Common `<libtrans>` prologue of every outbound request.

use xapi_xml::{Document, ElementId, XmlError};

use crate::config::XapiConfig;
use crate::names::{self, content};

const TASK_TOKEN_LEN: usize = 16;

/// Host prefix plus the 8 digit sequence number, blanks replaced by `'0'`.
pub fn task_token(client_host: &str, seq: u32) -> String {
    let host: String = client_host.chars().take(8).collect();
    let token = format!("{host:<8}{:08}", seq % 100_000_000);
    token
        .chars()
        .take(TASK_TOKEN_LEN)
        .map(|c| if c == ' ' { '0' } else { c })
        .collect()
}

fn add_if_present(
    doc: &mut Document,
    parent: ElementId,
    name: &str,
    value: &str,
) -> Result<(), XmlError> {
    if !value.trim().is_empty() {
        doc.add_element(Some(parent), name, Some(value))?;
    }
    Ok(())
}

/// Start a request document: `<libtrans>`, `<header>`, control elements,
/// `<job_info>`, and an empty `<command>`. Returns the document and the
/// `<command>` element the handler fills in.
pub fn start_request(
    config: &XapiConfig,
    seq: u32,
    user: Option<&str>,
) -> Result<(Document, ElementId), XmlError> {
    let mut doc = Document::new();
    let root = doc.add_element(None, names::LIBTRANS, None)?;

    let header = doc.add_element(Some(root), names::HEADER, None)?;
    add_if_present(&mut doc, header, names::ELS_VERSION, &config.version)?;
    add_if_present(&mut doc, header, names::HOST_NAME, &config.hostname)?;
    doc.add_element(Some(header), names::CLIENT_TYPE, Some(content::CLIENT_TYPE))?;
    add_if_present(&mut doc, header, names::CLIENT_NAME, &config.client_host)?;
    add_if_present(&mut doc, header, names::LIBRARY_NAME, &config.tapeplex)?;
    add_if_present(&mut doc, header, names::SUBSYSTEM_NAME, &config.subsystem)?;
    doc.add_element(
        Some(header),
        names::TASK_TOKEN,
        Some(&task_token(&config.client_host, seq)),
    )?;
    doc.add_element(Some(header), names::TRACE_FLAG, Some(content::YES))?;

    if let Some(user) = &config.user {
        add_if_present(&mut doc, root, names::RACF_USER_ID, user)?;
    }
    if let Some(group) = &config.group {
        add_if_present(&mut doc, root, names::RACF_GROUP_ID, group)?;
    }
    doc.add_element(Some(root), names::XML_RESPONSE_FLAG, Some(content::YES))?;
    doc.add_element(Some(root), names::XML_DATE_FORMAT, Some("3"))?;
    doc.add_element(Some(root), names::XML_CASE, Some(content::CASE_UPPER))?;

    let job = doc.add_element(Some(root), names::JOB_INFO, None)?;
    add_if_present(&mut doc, job, names::HOST_NAME, &config.client_host)?;
    let user = user
        .map(str::trim)
        .filter(|user| !user.is_empty())
        .unwrap_or(content::DEFAULT_USER);
    doc.add_element(Some(job), names::USER_NAME, Some(user))?;
    doc.add_element(Some(job), names::JOBNAME, Some(content::JOBNAME))?;
    doc.add_element(Some(job), names::STEPNAME, Some(content::STEPNAME))?;

    let command = doc.add_element(Some(root), names::COMMAND, None)?;
    Ok((doc, command))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> XapiConfig {
        let mut config = XapiConfig::new("mvs1.example.com", 8080).with_tapeplex("hscq");
        config.client_host = "clienthost01".into();
        config.user = Some("OPER".into());
        config
    }

    #[test]
    fn task_token_pads_and_truncates() {
        assert_eq!(task_token("clienthost01", 42), "clientho00000042");
        assert_eq!(task_token("ab", 7), "ab00000000000007");
        assert_eq!(task_token("a b", 123_456_789), "a0b0000023456789");
    }

    #[test]
    fn header_layout() {
        let (doc, command) = start_request(&config(), 42, None).expect("header");
        let root = doc.root().expect("root");
        let names: Vec<&str> = doc
            .children(root)
            .iter()
            .filter_map(|id| doc.name(*id))
            .collect();
        assert_eq!(
            names,
            vec![
                "header",
                "racf_user_id",
                "xml_response_flag",
                "xml_date_format",
                "xml_case",
                "job_info",
                "command"
            ]
        );
        assert_eq!(doc.name(command), Some("command"));
        let token = doc.find_first_by_name(None, "task_token").expect("token");
        assert_eq!(doc.content(token), Some("clientho00000042"));
        let library = doc.find_first_by_name(None, "library_name").expect("library");
        assert_eq!(doc.content(library), Some("HSCQ"));
        let user = doc.find_first_by_name(None, "user_name").expect("user");
        assert_eq!(doc.content(user), Some("XAPIUSER"));
    }

    #[test]
    fn request_user_overrides_default() {
        let (doc, _) = start_request(&config(), 1, Some("ACSSA ")).expect("header");
        let user = doc.find_first_by_name(None, "user_name").expect("user");
        assert_eq!(doc.content(user), Some("ACSSA"));
    }
}

//! Header and trailer fields common to every XAPI reply.

use acsapi::Status;
use serde::Serialize;
use tracing::{debug, warn};
use xapi_xml::{move_elements_to_fields, Document, FieldDescriptor, FillPolicy};

use crate::names::*;
use crate::raw::{self, raw_record};

/// UUI return and reason codes.
pub mod uui {
    pub const CMD_ERROR: u32 = 8;
    pub const CMD_FATAL: u32 = 12;
    pub const CMD_ABEND: u32 = 16;

    pub const PARSE_ERROR: u32 = 12;
    pub const INCOMPATIBLE_RELEASE: u32 = 28;
    pub const NOT_SUPPORTED: u32 = 304;
    pub const XAPI_NOT_SUPPORTED: u32 = 305;
    pub const UNKNOWN_ERROR: u32 = 996;
}

/// HSC message numbers with a dedicated meaning.
pub mod hsc {
    pub const UNRECOGNIZED_XML: u32 = 106;
    /// Reported when a reason line carries no digits.
    pub const NO_NUMBER: u32 = 9999;
}

/// Most `<reason>` lines kept from `<exceptions>`.
pub const MAX_REASONS: usize = 4;
const REASON_WIDTH: usize = 124;

raw_record! {
    /// Raw header and trailer fields.
    pub struct RawCommon, field RawCommonField {
        ReturnCode => return_code: 8,
        ReasonCode => reason_code: 8,
        Version => version: 5,
        Tapeplex => tapeplex: 8,
        Host => host: 8,
        Subsystem => subsystem: 4,
        ServerType => server_type: 3,
        ConfigToken => config_token: 16,
        Date => date: 11,
        Time => time: 8,
    }
}

const COMMON_FIELDS: &[FieldDescriptor<RawCommonField>] = &[
    FieldDescriptor::new(LIBREPLY, UUI_RETURN_CODE, RawCommonField::ReturnCode, FillPolicy::None),
    FieldDescriptor::new(LIBREPLY, UUI_REASON_CODE, RawCommonField::ReasonCode, FillPolicy::None),
    FieldDescriptor::new(HEADER, ELS_VERSION, RawCommonField::Version, FillPolicy::None),
    FieldDescriptor::new(HEADER, LIBRARY_NAME, RawCommonField::Tapeplex, FillPolicy::Blank),
    FieldDescriptor::new(HEADER, TAPEPLEX_NAME, RawCommonField::Tapeplex, FillPolicy::Blank),
    FieldDescriptor::new(HEADER, HOST_NAME, RawCommonField::Host, FillPolicy::Blank),
    FieldDescriptor::new(HEADER, SUBSYSTEM_NAME, RawCommonField::Subsystem, FillPolicy::Blank),
    FieldDescriptor::new(HEADER, SERVER_TYPE, RawCommonField::ServerType, FillPolicy::Blank),
    FieldDescriptor::new(HEADER, CONFIGURATION_TOKEN, RawCommonField::ConfigToken, FillPolicy::None),
    FieldDescriptor::new(HEADER, DATE, RawCommonField::Date, FillPolicy::None),
    FieldDescriptor::new(HEADER, TIME, RawCommonField::Time, FillPolicy::None),
];

/// Layout of the reply `<date>`/`<time>` values, implied from their shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DateFormat {
    /// A date without a recognisable separator.
    Plain,
    /// Date with `-` at offset 8.
    Dash8,
    /// Date with `-` at offset 7.
    Dash7,
    /// No date; the time is a store clock value.
    Stck,
    Indeterminate,
}

impl DateFormat {
    fn detect(date: &[u8], time: &[u8]) -> Self {
        if raw::present(date) {
            match (date.get(8), date.get(7)) {
                (Some(b'-'), _) => DateFormat::Dash8,
                (_, Some(b'-')) => DateFormat::Dash7,
                _ => DateFormat::Plain,
            }
        } else if raw::present(time) {
            DateFormat::Stck
        } else {
            DateFormat::Indeterminate
        }
    }

    pub const fn code(self) -> u8 {
        match self {
            DateFormat::Plain => 0,
            DateFormat::Dash8 => 1,
            DateFormat::Dash7 => 2,
            DateFormat::Stck => 3,
            DateFormat::Indeterminate => 4,
        }
    }
}

/// One `<exceptions><reason>` line and its HSC message number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionReason {
    pub msg_num: u32,
    pub text: String,
}

impl ExceptionReason {
    fn new(text: &str) -> Self {
        let text: String = text.chars().take(REASON_WIDTH).collect();
        Self {
            msg_num: message_number(&text),
            text: text.trim_end().to_string(),
        }
    }
}

/// First run of digits after the leading character, e.g. `SLS0010I` -> 10.
fn message_number(text: &str) -> u32 {
    let digits: String = text
        .chars()
        .skip(1)
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    if digits.is_empty() {
        hsc::NO_NUMBER
    } else {
        digits.parse().unwrap_or(hsc::NO_NUMBER)
    }
}

/// Parsed header and trailer of one reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyHeader {
    pub return_code: u32,
    pub reason_code: u32,
    /// The return code reports a real error.
    pub escalated: bool,
    /// `els_version` normalised, e.g. `7.1.0` -> 710; 0 when absent.
    pub release: u32,
    pub tapeplex: String,
    pub server_host: String,
    pub subsystem: String,
    pub server_type: String,
    pub config_token: String,
    pub date: String,
    pub time: String,
    pub date_format: DateFormat,
    pub reasons: Vec<ExceptionReason>,
    /// Most significant reason.
    pub headline: Option<ExceptionReason>,
}

fn normalize_release(version: &[u8]) -> u32 {
    if !raw::present(version) {
        return 0;
    }
    let digits: String = [0usize, 2, 4]
        .iter()
        .filter_map(|at| version.get(*at).copied())
        .take_while(u8::is_ascii_digit)
        .map(char::from)
        .collect();
    digits.parse().unwrap_or(0)
}

fn collect_reasons(doc: &Document) -> Vec<ExceptionReason> {
    let Some(exceptions) = doc.find_first_by_name(None, EXCEPTIONS) else {
        return Vec::new();
    };
    let mut reasons = Vec::new();
    let mut next = doc.find_first_by_name(Some(exceptions), REASON);
    while let Some(reason) = next {
        if reasons.len() == MAX_REASONS {
            break;
        }
        reasons.push(ExceptionReason::new(doc.content(reason).unwrap_or_default()));
        next = doc.find_next_sibling_by_name(exceptions, Some(reason), REASON);
    }
    reasons
}

fn pick_headline(reasons: &[ExceptionReason]) -> Option<ExceptionReason> {
    let mut headline = reasons.first()?.clone();
    for reason in reasons {
        if reason.msg_num == hsc::UNRECOGNIZED_XML {
            warn!(reason = %reason.text, "XAPI server did not recognise request XML");
        } else if headline.msg_num == hsc::UNRECOGNIZED_XML && reason.msg_num > 0 {
            headline = reason.clone();
        }
    }
    Some(headline)
}

impl ReplyHeader {
    pub fn parse(doc: &Document) -> Self {
        let mut raw = RawCommon::default();
        move_elements_to_fields(doc, COMMON_FIELDS, &mut raw);

        let (return_code, mut reason_code, escalated) = if raw::present(&raw.return_code) {
            let rc = raw::number(&raw.return_code);
            (rc, 0, rc >= uui::CMD_ERROR)
        } else {
            debug!("reply has no uui_return_code; assuming fatal");
            (uui::CMD_FATAL, uui::UNKNOWN_ERROR, false)
        };
        if raw::present(&raw.reason_code) {
            reason_code = raw::number(&raw.reason_code);
        }
        if reason_code == 0 && return_code == uui::CMD_ERROR {
            reason_code = uui::PARSE_ERROR;
        } else if reason_code == 0 && return_code > uui::CMD_ERROR {
            reason_code = uui::UNKNOWN_ERROR;
        }

        let reasons = collect_reasons(doc);
        let headline = pick_headline(&reasons);

        Self {
            return_code,
            reason_code,
            escalated,
            release: normalize_release(&raw.version),
            tapeplex: raw::text(&raw.tapeplex),
            server_host: raw::text(&raw.host),
            subsystem: raw::text(&raw.subsystem),
            server_type: raw::text(&raw.server_type),
            config_token: raw::text(&raw.config_token),
            date: raw::text(&raw.date),
            time: raw::text(&raw.time),
            date_format: DateFormat::detect(&raw.date, &raw.time),
            reasons,
            headline,
        }
    }

    /// ACSAPI status implied by the header; success unless escalated.
    pub fn status(&self) -> Status {
        if !self.escalated {
            return Status::Success;
        }
        match self.reason_code {
            uui::INCOMPATIBLE_RELEASE | uui::NOT_SUPPORTED | uui::XAPI_NOT_SUPPORTED => {
                Status::IncompatibleServer
            }
            _ => self
                .headline
                .as_ref()
                .filter(|headline| headline.msg_num > 0)
                .map_or(Status::ProcessFailure, |headline| {
                    hsc_status(headline.msg_num, &headline.text)
                }),
        }
    }

    /// Short description of the return code class.
    pub fn error_text(&self) -> &'static str {
        match self.return_code {
            uui::CMD_ERROR => "XAPI response error",
            uui::CMD_FATAL => "XAPI fatal error",
            uui::CMD_ABEND => "XAPI command abend",
            _ => "XAPI unknown error",
        }
    }

    /// Headline reason text, or the description of the reason code.
    pub fn reason_text(&self) -> String {
        match &self.headline {
            Some(headline) => headline.text.clone(),
            None => uui_reason_text(self.reason_code).to_string(),
        }
    }
}

/// Refine a process failure by HSC message number and message keywords.
fn hsc_status(msg_num: u32, text: &str) -> Status {
    let status = match msg_num {
        10 | 50 => Status::InvalidValue,
        163 | 603 => Status::VolumeNotInLibrary,
        332 => Status::NoDrivesFound,
        5079 | 5080 => Status::VolumeInDrive,
        _ => Status::ProcessFailure,
    };
    if status != Status::InvalidValue {
        return status;
    }
    const KEYWORDS: [(&str, Status); 6] = [
        ("ACS", Status::AcsNotInLibrary),
        ("LSM", Status::LsmNotInLibrary),
        ("CAP", Status::CapNotInLibrary),
        ("DEVICE", Status::DriveNotInLibrary),
        ("LOCK_ID", Status::LockIdNotFound),
        ("UNIT", Status::DriveNotInLibrary),
    ];
    KEYWORDS
        .iter()
        .find(|(keyword, _)| text.contains(keyword))
        .map_or(status, |(_, refined)| *refined)
}

/// Description of a UUI reason code.
pub fn uui_reason_text(reason: u32) -> &'static str {
    match reason {
        4 => "Request length error",
        8 => "No exits for server UUI",
        12 => "Command parse error",
        16 => "UUI request not found",
        20 => "Command origin error",
        24 => "LOADLIB not authorized",
        28 => "Server release incompatible",
        36 => "Request cancelled",
        40 => "Malformed XML from server",
        48 => "Invalid parameter value",
        84 => "Transaction timeout occurred",
        304 => "UUI unsupported by server release",
        305 => "XAPI unsupported by server release",
        372 => "XML response parse error",
        392 => "No response received",
        424 => "No data returned for request",
        _ => "Unknown UUI reason",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xapi_xml::parse;

    fn header(xml: &str) -> ReplyHeader {
        ReplyHeader::parse(&parse(xml.as_bytes()).expect("parse"))
    }

    #[test]
    fn success_reply_fields() {
        let h = header(
            "<libreply><header><els_version>7.1.0</els_version>\
             <library_name>HSCQ</library_name><host_name>MVS1</host_name>\
             <subsystem_name>HSCQ</subsystem_name><server_type>HSC</server_type>\
             <configuration_token>00D5A1B2C3D4E5F6</configuration_token>\
             <date>2024-01-15</date><time>10:11:12</time></header>\
             <uui_return_code>0</uui_return_code></libreply>",
        );
        assert_eq!(h.return_code, 0);
        assert!(!h.escalated);
        assert_eq!(h.release, 710);
        assert_eq!(h.tapeplex, "HSCQ");
        assert_eq!(h.server_host, "MVS1");
        assert_eq!(h.server_type, "HSC");
        assert_eq!(h.config_token, "00D5A1B2C3D4E5F6");
        assert_eq!(h.date_format, DateFormat::Dash7);
        assert_eq!(h.status(), Status::Success);
    }

    #[test]
    fn missing_return_code_defaults_without_escalation() {
        let h = header("<libreply><header><time>D5A1B2C3</time></header></libreply>");
        assert_eq!(h.return_code, 12);
        assert_eq!(h.reason_code, 996);
        assert!(!h.escalated);
        assert_eq!(h.status(), Status::Success);
        assert_eq!(h.date_format, DateFormat::Stck);
    }

    #[test]
    fn zero_reason_codes_are_defaulted() {
        let h = header("<libreply><uui_return_code>8</uui_return_code></libreply>");
        assert_eq!(h.reason_code, 12);
        assert_eq!(h.error_text(), "XAPI response error");
        assert_eq!(h.reason_text(), "Command parse error");
        assert_eq!(h.status(), Status::ProcessFailure);

        let h = header("<libreply><uui_return_code>16</uui_return_code></libreply>");
        assert_eq!(h.reason_code, 996);
        assert_eq!(h.error_text(), "XAPI command abend");
        assert_eq!(h.date_format, DateFormat::Indeterminate);
    }

    #[test]
    fn incompatible_release_reasons() {
        for reason in [28, 304, 305] {
            let h = header(&format!(
                "<libreply><uui_return_code>12</uui_return_code>\
                 <uui_reason_code>{reason}</uui_reason_code></libreply>"
            ));
            assert_eq!(h.status(), Status::IncompatibleServer);
        }
    }

    #[test]
    fn unrecognized_xml_headline_is_replaced() {
        let h = header(
            "<libreply><uui_return_code>8</uui_return_code><uui_reason_code>48</uui_reason_code>\
             <exceptions><reason>SLS0106I Unrecognized XML tag</reason>\
             <reason>SLS0163I Volume VOL001 not in library</reason></exceptions></libreply>",
        );
        assert_eq!(h.reasons.len(), 2);
        assert_eq!(h.reasons[0].msg_num, 106);
        let headline = h.headline.as_ref().expect("headline");
        assert_eq!(headline.msg_num, 163);
        assert_eq!(h.status(), Status::VolumeNotInLibrary);
    }

    #[test]
    fn invalid_value_is_refined_by_keyword() {
        let h = header(
            "<libreply><uui_return_code>8</uui_return_code><uui_reason_code>48</uui_reason_code>\
             <exceptions><reason>SLS0010I Invalid LSM id 00:09</reason></exceptions></libreply>",
        );
        assert_eq!(h.status(), Status::LsmNotInLibrary);
        assert_eq!(hsc_status(50, "bad value"), Status::InvalidValue);
        assert_eq!(hsc_status(50, "UNIT 0A10"), Status::DriveNotInLibrary);
        assert_eq!(hsc_status(332, ""), Status::NoDrivesFound);
        assert_eq!(hsc_status(5080, ""), Status::VolumeInDrive);
        assert_eq!(hsc_status(1, ""), Status::ProcessFailure);
    }

    #[test]
    fn reasons_are_capped_and_numbered() {
        let h = header(
            "<libreply><exceptions><reason>A</reason><reason>S12X34</reason>\
             <reason>3</reason><reason>9SLS22</reason><reason>SLS0001</reason></exceptions></libreply>",
        );
        assert_eq!(h.reasons.len(), MAX_REASONS);
        let nums: Vec<u32> = h.reasons.iter().map(|r| r.msg_num).collect();
        assert_eq!(nums, vec![9999, 12, 9999, 22]);
    }

    #[test]
    fn date_formats() {
        assert_eq!(DateFormat::detect(b"2024Jan1-15", b""), DateFormat::Dash8);
        assert_eq!(DateFormat::detect(b"2024Jan1-15", b"").code(), 1);
        assert_eq!(DateFormat::detect(b"2024015-10", b""), DateFormat::Dash7);
        assert_eq!(DateFormat::detect(b"15JAN2024", b""), DateFormat::Plain);
        assert_eq!(DateFormat::detect(b"", b"D5A1B2C3"), DateFormat::Stck);
        assert_eq!(DateFormat::detect(b"", b""), DateFormat::Indeterminate);
        assert_eq!(DateFormat::Stck.code(), 3);
    }
}

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use xapi::acsapi::Status;
use xapi::tl_xapi::session::decode_reply;
use xapi::xapi_xml::{Document, ElementId};
use xapi::ReplyHeader;

#[derive(Serialize)]
struct ParsedReply {
    status: Status,
    header: ReplyHeader,
    elements: usize,
}

/// Indented outline of the element tree, one element per line.
pub fn outline(doc: &Document) -> String {
    fn walk(doc: &Document, id: ElementId, depth: usize, out: &mut String) {
        let name = doc.name(id).unwrap_or("?");
        let _ = write!(out, "{:indent$}{name}", "", indent = depth * 2);
        for attr in doc.attributes(id) {
            let _ = write!(out, " {}=\"{}\"", attr.keyword(), attr.value());
        }
        if let Some(content) = doc.content(id).filter(|content| !content.trim().is_empty()) {
            let _ = write!(out, " = {}", content.trim());
        }
        out.push('\n');
        for child in doc.children(id) {
            walk(doc, *child, depth + 1, out);
        }
    }

    let mut out = String::new();
    if let Some(root) = doc.root() {
        walk(doc, root, 0, &mut out);
    }
    out
}

/// Decode a captured `<libreply>` file and print its header and tree.
pub fn run(path: &Path, json: bool) -> Result<()> {
    let raw = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let doc = decode_reply(&raw).with_context(|| format!("decode reply {}", path.display()))?;
    let header = ReplyHeader::parse(&doc);
    let status = header.status();

    if json {
        return crate::common::print_json(&ParsedReply {
            status,
            header,
            elements: doc.len(),
        });
    }

    println!("status:       {status}");
    println!(
        "return code:  {} reason {} ({})",
        header.return_code,
        header.reason_code,
        header.reason_text()
    );
    println!("release:      {}", header.release);
    println!("tapeplex:     {}", header.tapeplex);
    println!("server:       {} {}", header.server_host, header.server_type);
    println!("config token: {}", header.config_token);
    println!(
        "date/time:    {} {} (format {})",
        header.date,
        header.time,
        header.date_format.code()
    );
    for reason in &header.reasons {
        println!("reason {:>4}:  {}", reason.msg_num, reason.text);
    }
    println!();
    print!("{}", outline(&doc));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use xapi::xapi_xml::parse;

    #[test]
    fn outline_indents_children() {
        let doc = parse(br#"<libreply><cap_data id="1"><acs>00</acs></cap_data></libreply>"#)
            .expect("parse");
        assert_eq!(
            outline(&doc),
            "libreply\n  cap_data id=\"1\"\n    acs = 00\n"
        );
    }
}

//! Multipart form-data parsing for the upload route.
//!
//! A synchronous parser over the already-collected body bytes. An upload
//! submission carries at most one file part (the field named `file`, or the
//! first part with a filename) plus optional plain fields such as
//! `object_name`.

use std::collections::HashMap;

use bytes::Bytes;

/// The file part of a multipart submission.
#[derive(Debug)]
pub struct FilePart {
    /// Client-provided file name, when one was sent.
    pub filename: Option<String>,
    /// Declared content type of the part.
    pub content_type: Option<String>,
    /// Raw file bytes.
    pub data: Bytes,
}

/// A parsed multipart submission: plain fields plus an optional file.
#[derive(Debug)]
pub struct UploadForm {
    /// Non-file form fields, name to value.
    pub fields: HashMap<String, String>,
    /// The file part, when one was present.
    pub file: Option<FilePart>,
}

/// Extract the boundary from a `multipart/form-data; boundary=...` header.
///
/// # Errors
///
/// Returns a message suitable for the response body when the Content-Type is
/// not multipart or carries no usable boundary.
pub fn extract_boundary(content_type: &str) -> Result<String, String> {
    if !content_type
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
    {
        return Err(format!(
            "Upload requires Content-Type multipart/form-data, got: {content_type}"
        ));
    }

    for parameter in content_type.split(';') {
        if let Some(value) = parameter.trim().strip_prefix("boundary=") {
            let boundary = value.trim_matches('"');
            if boundary.is_empty() {
                return Err("Empty boundary in Content-Type".to_owned());
            }
            return Ok(boundary.to_owned());
        }
    }

    Err("Missing boundary in Content-Type".to_owned())
}

/// Parse a multipart body into plain fields and an optional file part.
///
/// When several parts qualify as the file, the first one wins. Parts without
/// a Content-Disposition name are skipped.
#[must_use]
pub fn parse_form(body: &[u8], boundary: &str) -> UploadForm {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut file: Option<FilePart> = None;

    for part in split_parts(body, boundary) {
        let Some((header_block, content)) = split_part(part) else {
            continue;
        };
        let headers = String::from_utf8_lossy(header_block);

        let Some(name) = disposition_param(&headers, "name") else {
            continue;
        };
        let filename = disposition_param(&headers, "filename");

        if name == "file" || filename.is_some() {
            if file.is_none() {
                file = Some(FilePart {
                    filename,
                    content_type: part_content_type(&headers),
                    data: Bytes::copy_from_slice(content),
                });
            }
        } else {
            fields.insert(name, String::from_utf8_lossy(content).into_owned());
        }
    }

    UploadForm { fields, file }
}

/// Split the body into part slices delimited by `--boundary` markers.
fn split_parts<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();

    let mut cursor = match find(body, delimiter.as_bytes()) {
        Some(pos) => pos + delimiter.len(),
        None => return parts,
    };

    loop {
        // A "--" right after a delimiter closes the body.
        if body[cursor..].starts_with(b"--") {
            break;
        }
        let rest = strip_leading_crlf(&body[cursor..]);
        match find(rest, delimiter.as_bytes()) {
            Some(pos) => {
                parts.push(strip_trailing_crlf(&rest[..pos]));
                cursor = body.len() - rest.len() + pos + delimiter.len();
            }
            None => {
                // Unterminated body, keep whatever came after the delimiter.
                let tail = strip_trailing_crlf(rest);
                if !tail.is_empty() {
                    parts.push(tail);
                }
                break;
            }
        }
    }

    parts
}

/// Split one part into its header block and content at the first blank line.
fn split_part(part: &[u8]) -> Option<(&[u8], &[u8])> {
    let separator = b"\r\n\r\n";
    find(part, separator).map(|pos| (&part[..pos], &part[pos + separator.len()..]))
}

/// Read a parameter off the Content-Disposition line of a header block.
fn disposition_param(headers: &str, param: &str) -> Option<String> {
    let line = headers
        .split("\r\n")
        .find(|line| line.to_ascii_lowercase().starts_with("content-disposition:"))?;
    header_param(line, param)
}

/// Extract `param="value"` or `param=value` from a header line.
fn header_param(line: &str, param: &str) -> Option<String> {
    let lower = line.to_ascii_lowercase();

    let quoted = format!("{param}=\"");
    if let Some(pos) = lower.find(&quoted) {
        let rest = &line[pos + quoted.len()..];
        return rest.find('"').map(|end| rest[..end].to_owned());
    }

    let unquoted = format!("{param}=");
    if let Some(pos) = lower.find(&unquoted) {
        let rest = &line[pos + unquoted.len()..];
        let end = rest.find(';').unwrap_or(rest.len());
        let value = rest[..end].trim();
        if !value.is_empty() {
            return Some(value.to_owned());
        }
    }

    None
}

/// Read the Content-Type line of a part's header block.
fn part_content_type(headers: &str) -> Option<String> {
    headers.split("\r\n").find_map(|line| {
        if line.to_ascii_lowercase().starts_with("content-type:") {
            Some(line["content-type:".len()..].trim().to_owned())
        } else {
            None
        }
    })
}

/// Find the position of a needle in a haystack.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn strip_leading_crlf(data: &[u8]) -> &[u8] {
    data.strip_prefix(b"\r\n").unwrap_or(data)
}

fn strip_trailing_crlf(data: &[u8]) -> &[u8] {
    data.strip_suffix(b"\r\n").unwrap_or(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_extract_boundary() {
        let ct = "multipart/form-data; boundary=----WebKitFormBoundaryA1B2C3";
        let boundary = extract_boundary(ct).expect("should extract boundary");
        assert_eq!(boundary, "----WebKitFormBoundaryA1B2C3");
    }

    #[test]
    fn test_should_extract_quoted_boundary() {
        let ct = r#"multipart/form-data; boundary="abc123""#;
        let boundary = extract_boundary(ct).expect("should extract boundary");
        assert_eq!(boundary, "abc123");
    }

    #[test]
    fn test_should_reject_non_multipart_content_type() {
        assert!(extract_boundary("application/json").is_err());
    }

    #[test]
    fn test_should_reject_missing_boundary() {
        assert!(extract_boundary("multipart/form-data").is_err());
    }

    #[test]
    fn test_should_parse_file_and_fields() {
        let body = "--xyzzy\r\n\
             Content-Disposition: form-data; name=\"object_name\"\r\n\
             \r\n\
             reports/latest.csv\r\n\
             --xyzzy\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"data.csv\"\r\n\
             Content-Type: text/csv\r\n\
             \r\n\
             id,value\r\n\
             --xyzzy--\r\n";

        let form = parse_form(body.as_bytes(), "xyzzy");
        assert_eq!(
            form.fields.get("object_name").map(String::as_str),
            Some("reports/latest.csv")
        );
        let file = form.file.expect("should have a file part");
        assert_eq!(file.filename.as_deref(), Some("data.csv"));
        assert_eq!(file.content_type.as_deref(), Some("text/csv"));
        assert_eq!(file.data.as_ref(), b"id,value");
    }

    #[test]
    fn test_should_parse_form_without_file() {
        let body = "--abc\r\n\
             Content-Disposition: form-data; name=\"object_name\"\r\n\
             \r\n\
             note.txt\r\n\
             --abc--\r\n";

        let form = parse_form(body.as_bytes(), "abc");
        assert!(form.file.is_none());
        assert_eq!(
            form.fields.get("object_name").map(String::as_str),
            Some("note.txt")
        );
    }

    #[test]
    fn test_should_treat_named_file_part_without_filename_as_file() {
        let body = "--abc\r\n\
             Content-Disposition: form-data; name=\"file\"\r\n\
             \r\n\
             payload\r\n\
             --abc--\r\n";

        let form = parse_form(body.as_bytes(), "abc");
        let file = form.file.expect("should have a file part");
        assert!(file.filename.is_none());
        assert_eq!(file.data.as_ref(), b"payload");
    }

    #[test]
    fn test_should_keep_first_file_part() {
        let body = "--abc\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"one.bin\"\r\n\
             \r\n\
             first\r\n\
             --abc\r\n\
             Content-Disposition: form-data; name=\"other\"; filename=\"two.bin\"\r\n\
             \r\n\
             second\r\n\
             --abc--\r\n";

        let form = parse_form(body.as_bytes(), "abc");
        let file = form.file.expect("should have a file part");
        assert_eq!(file.filename.as_deref(), Some("one.bin"));
        assert_eq!(file.data.as_ref(), b"first");
    }

    #[test]
    fn test_should_preserve_binary_content() {
        let mut body = Vec::new();
        body.extend_from_slice(b"--b1\r\n");
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"raw.bin\"\r\n",
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(&[0x00, 0x01, 0xFF, 0xFE]);
        body.extend_from_slice(b"\r\n--b1--\r\n");

        let form = parse_form(&body, "b1");
        let file = form.file.expect("should have a file part");
        assert_eq!(file.data.as_ref(), &[0x00, 0x01, 0xFF, 0xFE]);
    }

    #[test]
    fn test_should_skip_parts_without_disposition() {
        let body = "--abc\r\n\
             Content-Type: text/plain\r\n\
             \r\n\
             orphan\r\n\
             --abc--\r\n";

        let form = parse_form(body.as_bytes(), "abc");
        assert!(form.file.is_none());
        assert!(form.fields.is_empty());
    }
}

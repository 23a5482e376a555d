use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_EXTENSION: &str = "txt";

const CONTENT_TYPE_EXTENSIONS: &[(&str, &str)] = &[
    ("application/pdf", "pdf"),
    ("application/msword", "doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
    ("application/vnd.ms-excel", "xls"),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsx",
    ),
    ("application/vnd.ms-powerpoint", "ppt"),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "pptx",
    ),
    ("application/rtf", "rtf"),
    ("application/xml", "xml"),
    ("text/xml", "xml"),
    ("text/plain", "txt"),
    ("image/tiff", "tif"),
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
];

/// How the archived file name is derived from the manifest's output name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingPolicy {
    /// Always append the resolved extension.
    #[default]
    Append,
    /// Use the output name verbatim when it already carries an extension.
    KeepExisting,
}

/// Maps a declared media type to a file extension, ignoring parameters.
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let Some(content_type) = content_type else {
        return DEFAULT_EXTENSION;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim();

    CONTENT_TYPE_EXTENSIONS
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
        .unwrap_or(DEFAULT_EXTENSION)
}

pub fn file_name(output_name: &str, content_type: Option<&str>, policy: NamingPolicy) -> String {
    if policy == NamingPolicy::KeepExisting && Path::new(output_name).extension().is_some() {
        return output_name.to_string();
    }
    format!("{}.{}", output_name, extension_for(content_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_map_to_extensions() {
        assert_eq!(extension_for(Some("application/pdf")), "pdf");
        assert_eq!(extension_for(Some("text/xml")), "xml");
        assert_eq!(extension_for(Some("image/jpeg")), "jpg");
    }

    #[test]
    fn parameters_and_case_are_ignored() {
        assert_eq!(extension_for(Some("Text/Plain; charset=utf-8")), "txt");
        assert_eq!(extension_for(Some("application/PDF ;q=1")), "pdf");
    }

    #[test]
    fn unknown_or_missing_types_fall_back() {
        assert_eq!(extension_for(Some("text/html")), DEFAULT_EXTENSION);
        assert_eq!(extension_for(None), DEFAULT_EXTENSION);
    }

    #[test]
    fn naming_policy() {
        assert_eq!(
            file_name("report", Some("application/pdf"), NamingPolicy::Append),
            "report.pdf"
        );
        assert_eq!(
            file_name("report.v2", Some("application/pdf"), NamingPolicy::Append),
            "report.v2.pdf"
        );
        assert_eq!(
            file_name("scan.tiff", Some("image/tiff"), NamingPolicy::KeepExisting),
            "scan.tiff"
        );
        assert_eq!(
            file_name("scan", Some("image/tiff"), NamingPolicy::KeepExisting),
            "scan.tif"
        );
    }
}

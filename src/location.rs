use std::fmt;
use std::path::PathBuf;

use percent_encoding::percent_decode_str;

/// Where a requested resource lives, classified once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLocation {
    /// `http://` or `https://`, answered with a redirect.
    RemoteUrl(String),
    /// `s3://bucket/key`
    ObjectStoreRef { bucket: String, key: String },
    /// Anything else, including schemes nothing here understands.
    LocalPath(PathBuf),
}

impl ResourceLocation {
    /// Classifies the `filepath` query parameter.
    ///
    /// The query extractor has already decoded the parameter once; it is
    /// percent-decoded again here so doubly encoded locations resolve.
    /// Strings without `%` escapes pass through unchanged.
    pub fn parse(raw: &str) -> ResourceLocation {
        let location = percent_decode_str(raw).decode_utf8_lossy().into_owned();

        if location.starts_with("http://") || location.starts_with("https://") {
            return ResourceLocation::RemoteUrl(location);
        }

        if let Some(rest) = strip_prefix_ignore_case(&location, "s3://") {
            // query and fragment are not part of the key
            let rest = rest.split(['?', '#']).next().unwrap_or_default();
            let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
            return ResourceLocation::ObjectStoreRef {
                bucket: bucket.to_string(),
                key: key.trim_start_matches('/').to_string(),
            };
        }

        ResourceLocation::LocalPath(PathBuf::from(location))
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceLocation::RemoteUrl(url) => f.write_str(url),
            ResourceLocation::ObjectStoreRef { bucket, key } => write!(f, "s3://{bucket}/{key}"),
            ResourceLocation::LocalPath(path) => write!(f, "{}", path.display()),
        }
    }
}

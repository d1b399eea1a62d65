// Parsed connect-time request parameters, derived from a `connect` packet's
// `commandObject` + optional `arguments`.
//
// Grounded on the teacher's `utils/query_string.rs::parse_query_string_simple`
// for the param-map half of this; the `...`-pairwise-rewrite and vhost
// override rule are carried over from the tc_url handling in the original
// Go source this core was distilled from.

use crate::amf::AmfObject;
use crate::error::RtmpError;
use crate::utils::parse_query_string_simple;

const DEFAULT_RTMP_PORT: u16 = 1935;

/// Parsed connect parameters
#[derive(Clone, Debug, Default)]
pub struct Request {
    pub tc_url: String,
    pub page_url: String,
    pub swf_url: String,
    pub object_encoding: f64,
    pub schema: String,
    pub host: String,
    pub vhost: String,
    pub port: u16,
    pub app: String,
    pub param: String,
    pub stream: String,
    pub duration: f64,
    pub args: Option<AmfObject>,
}

impl Request {
    /// Validates the tc_url-derived fields (4.7) live in non-empty/positive
    /// ranges, per the Request invariant in §3.
    pub fn validate(&self) -> Result<(), RtmpError> {
        if self.schema.is_empty() {
            return Err(RtmpError::RequestInvalid("missing schema".to_string()));
        }
        if self.vhost.is_empty() {
            return Err(RtmpError::RequestInvalid("missing vhost".to_string()));
        }
        if self.app.is_empty() {
            return Err(RtmpError::RequestInvalid("missing app".to_string()));
        }
        if self.port == 0 {
            return Err(RtmpError::RequestInvalid("non-positive port".to_string()));
        }
        Ok(())
    }
}

/// Rewrites legacy `...`-separated query encoding into standard `key=value&...`
/// pairs: the first `...` becomes `&`, the second becomes `=`, alternating.
fn rewrite_legacy_query_separators(tc_url: &str) -> String {
    if !tc_url.contains("...") {
        return tc_url.to_string();
    }

    let parts: Vec<&str> = tc_url.split("...").collect();
    let mut out = String::new();

    for (i, part) in parts.iter().enumerate() {
        out.push_str(part);
        if i + 1 < parts.len() {
            out.push(if i % 2 == 0 { '&' } else { '=' });
        }
    }

    out
}

/// `discover_tc_url(tc_url) -> (schema, host, vhost, app, port, param)`
pub fn discover_tc_url(tc_url: &str) -> Result<(String, String, String, String, u16, String), RtmpError> {
    let rewritten = rewrite_legacy_query_separators(tc_url);

    let parsed = url::Url::parse(&rewritten)
        .map_err(|e| RtmpError::RequestInvalid(format!("invalid tcUrl: {e}")))?;

    let schema = parsed.scheme().to_string();
    let host = parsed.host_str().unwrap_or("").to_string();
    let port = parsed.port().unwrap_or(DEFAULT_RTMP_PORT);
    let app = parsed.path().trim_matches('/').to_string();
    let param = parsed.query().unwrap_or("").to_string();

    let params = parse_query_string_simple(&param);
    let vhost = params.get("vhost").cloned().unwrap_or_else(|| host.clone());

    Ok((schema, host, vhost, app, port, param))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovers_schema_host_app_and_default_port() {
        let (schema, host, vhost, app, port, param) = discover_tc_url("rtmp://example.com/live").unwrap();
        assert_eq!(schema, "rtmp");
        assert_eq!(host, "example.com");
        assert_eq!(vhost, "example.com");
        assert_eq!(app, "live");
        assert_eq!(port, DEFAULT_RTMP_PORT);
        assert_eq!(param, "");
    }

    #[test]
    fn an_explicit_port_overrides_the_default() {
        let (_, _, _, _, port, _) = discover_tc_url("rtmp://example.com:19350/live").unwrap();
        assert_eq!(port, 19350);
    }

    #[test]
    fn a_vhost_query_parameter_overrides_the_host() {
        let (_, host, vhost, _, _, _) = discover_tc_url("rtmp://example.com/live?vhost=other.com").unwrap();
        assert_eq!(host, "example.com");
        assert_eq!(vhost, "other.com");
    }

    #[test]
    fn legacy_triple_dot_separators_are_rewritten_before_parsing() {
        let (_, _, _, app, _, param) = discover_tc_url("rtmp://example.com/live...vhost...other.com").unwrap();
        assert_eq!(app, "live");
        assert_eq!(param, "vhost=other.com");
    }

    #[test]
    fn an_unparseable_tc_url_is_rejected() {
        assert!(discover_tc_url("not a url").is_err());
    }

    #[test]
    fn validate_rejects_an_empty_vhost() {
        let request = Request {
            schema: "rtmp".to_string(),
            vhost: "".to_string(),
            app: "live".to_string(),
            port: 1935,
            ..Request::default()
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn validate_accepts_a_fully_populated_request() {
        let request = Request {
            schema: "rtmp".to_string(),
            vhost: "example.com".to_string(),
            app: "live".to_string(),
            port: 1935,
            ..Request::default()
        };
        assert!(request.validate().is_ok());
    }
}

//! ARN helpers.

use std::sync::LazyLock;

use regex::Regex;

static ARN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^arn:aws[a-z-]*:[a-z0-9-]+:[a-z0-9-]*:\d{12}:.+$").expect("arn regex")
});

static ROLE_ARN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^arn:aws[a-z-]*:iam::\d{12}:role/[\w+=,.@/-]+$").expect("role arn regex")
});

pub fn is_arn(s: &str) -> bool {
    ARN_RE.is_match(s)
}

pub fn is_role_arn(s: &str) -> bool {
    ROLE_ARN_RE.is_match(s)
}

/// Account id segment of an ARN (`arn:partition:service:region:account:...`).
pub fn account_id(arn: &str) -> Option<&str> {
    let field = arn.split(':').nth(4)?;
    (field.len() == 12 && field.bytes().all(|b| b.is_ascii_digit())).then_some(field)
}

/// Region segment of an ARN. May be empty for global services.
pub fn region(arn: &str) -> Option<&str> {
    arn.split(':').nth(3).filter(|r| !r.is_empty())
}

/// Extract the trailing resource id from an ARN whose resource path ends
/// with `<prefix>/<id>`.
///
/// Splits on the last `/` and verifies the preceding path segment, rather
/// than scanning for `"<prefix>/"` anywhere in the string — a substring
/// scan can match inside an account id or region.
pub fn extract_resource_id<'a>(arn: &'a str, prefix: &str) -> Option<&'a str> {
    let (head, id) = arn.rsplit_once('/')?;
    if id.is_empty() {
        return None;
    }
    let segment = head.rsplit([':', '/']).next()?;
    (segment == prefix).then_some(id)
}

//! Helpers for the colon-delimited ARN format
//! (`arn:partition:service:region:account:resource`).

const ARN_FIELDS: usize = 6;
const SERVICE_FIELD: usize = 2;
const REGION_FIELD: usize = 3;
const ACCOUNT_FIELD: usize = 4;

/// The account placeholder used by every resource the engine produces
pub const ACCOUNT_WILDCARD: &str = "*";

fn fields(arn: &str) -> Option<Vec<&str>> {
    let parts: Vec<&str> = arn.splitn(ARN_FIELDS, ':').collect();
    if parts.len() < ARN_FIELDS || parts[0] != "arn" {
        return None;
    }
    Some(parts)
}

fn non_empty_field(arn: &str, index: usize) -> Option<&str> {
    let parts = fields(arn)?;
    let value = parts[index];
    (!value.is_empty()).then_some(value)
}

/// Extract the service name (e.g. `dynamodb`) from an ARN
pub fn service_from_arn(arn: &str) -> Option<&str> {
    non_empty_field(arn, SERVICE_FIELD)
}

/// Extract the region from an ARN. Global resources (S3, IAM) have none.
pub fn region_from_arn(arn: &str) -> Option<&str> {
    non_empty_field(arn, REGION_FIELD)
}

/// Extract the account id from an ARN
pub fn account_from_arn(arn: &str) -> Option<&str> {
    non_empty_field(arn, ACCOUNT_FIELD)
}

/// Extract the trailing resource name, i.e. everything after the last `:` or `/`
pub fn resource_name_from_arn(arn: &str) -> Option<&str> {
    let parts = fields(arn)?;
    let resource = parts[ARN_FIELDS - 1];
    let name = resource.rsplit([':', '/']).next().unwrap_or(resource);
    (!name.is_empty()).then_some(name)
}

/// Replace a concrete account id with [`ACCOUNT_WILDCARD`].
///
/// Values that are not ARNs, and ARNs with an empty account field such as
/// `arn:aws:s3:::bucket`, are returned unchanged.
pub fn wildcard_account(arn: &str) -> String {
    match fields(arn) {
        Some(mut parts) if !parts[ACCOUNT_FIELD].is_empty() => {
            parts[ACCOUNT_FIELD] = ACCOUNT_WILDCARD;
            parts.join(":")
        }
        _ => arn.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("arn:aws:lambda:us-east-1:112233445566:function:java-test-dev-hello", Some("us-east-1"))]
    #[case("arn:aws:dynamodb:eu-west-1:*:table/test", Some("eu-west-1"))]
    #[case("arn:aws:s3:::my-bucket", None)]
    #[case("not-an-arn", None)]
    #[case("arn:aws:lambda", None)]
    fn test_region_from_arn(#[case] arn: &str, #[case] expected: Option<&str>) {
        assert_eq!(region_from_arn(arn), expected);
    }

    #[rstest]
    #[case("arn:aws:dynamodb:us-east-1:*:table/test", Some("dynamodb"))]
    #[case("arn:aws:s3:::my-bucket/*", Some("s3"))]
    #[case("arn:aws::us-east-1:*:x", None)]
    #[case("*", None)]
    fn test_service_from_arn(#[case] arn: &str, #[case] expected: Option<&str>) {
        assert_eq!(service_from_arn(arn), expected);
    }

    #[rstest]
    #[case(
        "arn:aws:dynamodb:us-east-1:123456789012:table/T",
        "arn:aws:dynamodb:us-east-1:*:table/T"
    )]
    #[case(
        "arn:aws:lambda:us-east-1:123456789012:function:my-fn",
        "arn:aws:lambda:us-east-1:*:function:my-fn"
    )]
    #[case("arn:aws:s3:::test-bucket/*", "arn:aws:s3:::test-bucket/*")]
    #[case("arn:aws:sqs:us-east-1:*:queue", "arn:aws:sqs:us-east-1:*:queue")]
    #[case("*", "*")]
    fn test_wildcard_account(#[case] arn: &str, #[case] expected: &str) {
        assert_eq!(wildcard_account(arn), expected);
    }

    #[test]
    fn test_resource_name_from_arn() {
        assert_eq!(
            resource_name_from_arn("arn:aws:sns:us-east-1:123456789012:test-topic"),
            Some("test-topic")
        );
        assert_eq!(
            resource_name_from_arn("arn:aws:lambda:us-east-1:1:function:hello"),
            Some("hello")
        );
        assert_eq!(resource_name_from_arn("arn:aws:sns:us-east-1:1:"), None);
    }

    #[test]
    fn test_account_from_arn() {
        assert_eq!(
            account_from_arn("arn:aws:iam::123456789012:role/MyRole"),
            Some("123456789012")
        );
        assert_eq!(account_from_arn("arn:aws:s3:::bucket"), None);
    }
}

//! Integration test for the trace to policy flow
//!
//! Decodes traces in the `BatchGetTraces` shape, walks them, synthesizes the
//! per-function policies and compares them with an over-broad role policy,
//! using only the public API.

use xray_privilege_scan_core::{
    generate_from_traces, ExtractorRegistry, IamPolicyDocument, PolicyComparator, Trace,
};

const FUNCTION_ARN: &str = "arn:aws:lambda:us-east-1:123456789012:function:orders-handler";

/// A Lambda segment and its function subsegment calling four services
fn function_document() -> String {
    serde_json::json!({
        "id": "1a2b3c4d5e6f7a8b",
        "name": "orders-handler",
        "origin": "AWS::Lambda::Function",
        "aws": {"function_arn": FUNCTION_ARN, "resource_names": ["orders-handler"]},
        "subsegments": [{
            "id": "2b3c4d5e6f7a8b9c",
            "name": "Invocation",
            "subsegments": [
                {
                    "id": "3c4d5e6f7a8b9c0d",
                    "name": "DynamoDB",
                    "namespace": "aws",
                    "aws": {"operation": "PutItem", "region": "us-east-1", "table_name": "orders"}
                },
                {
                    "id": "4d5e6f7a8b9c0d1e",
                    "name": "DynamoDB",
                    "namespace": "aws",
                    "aws": {"operation": "GetItem", "table_name": "orders"}
                },
                {
                    "id": "5e6f7a8b9c0d1e2f",
                    "name": "S3",
                    "namespace": "aws",
                    "aws": {"operation": "ListObjectsV2", "bucket_name": "order-archive"}
                },
                {
                    "id": "6f7a8b9c0d1e2f3a",
                    "name": "SQS",
                    "namespace": "aws",
                    "aws": {
                        "operation": "SendMessage",
                        "queue_url": "https://sqs.us-east-1.amazonaws.com/123456789012/order-events"
                    }
                },
                {
                    "id": "7a8b9c0d1e2f3a4b",
                    "name": "SNS",
                    "namespace": "aws",
                    "aws": {
                        "operation": "Publish",
                        "topic_arn": "arn:aws:sns:us-east-1:123456789012:order-notifications"
                    }
                },
                {
                    "id": "8b9c0d1e2f3a4b5c",
                    "name": "Lambda",
                    "namespace": "aws",
                    "aws": {"operation": "Invoke", "function_name": "billing"}
                }
            ]
        }]
    })
    .to_string()
}

fn batch_get_traces_json() -> String {
    serde_json::json!([
        {
            "Id": "1-5a4f3b2c-0123456789abcdef01234567",
            "Duration": 0.82,
            "Segments": [
                {"Id": "1a2b3c4d5e6f7a8b", "Document": function_document()},
                {"Id": "ffffffffffffffff", "Document": ""}
            ]
        },
        {"Id": "1-5a4f3b2c-fedcba9876543210fedcba98", "Segments": []}
    ])
    .to_string()
}

#[test]
fn test_recorded_traces_to_policy() {
    let traces = Trace::list_from_json(&batch_get_traces_json()).unwrap();
    assert_eq!(traces.len(), 2);

    let policies = generate_from_traces(&ExtractorRegistry::new(), &traces, None);
    assert_eq!(policies.len(), 1);
    assert_eq!(policies[0].arn, FUNCTION_ARN);

    let document = &policies[0].document;
    let mut granted: Vec<(String, String)> = document
        .statement
        .iter()
        .flat_map(|statement| {
            statement.actions().into_iter().flat_map(move |action| {
                statement
                    .resources()
                    .into_iter()
                    .map(move |resource| (action.to_string(), resource.to_string()))
            })
        })
        .collect();
    granted.sort();

    let expected: Vec<(String, String)> = [
        ("dynamodb:GetItem", "arn:aws:dynamodb:us-east-1:*:table/orders"),
        ("dynamodb:PutItem", "arn:aws:dynamodb:us-east-1:*:table/orders"),
        ("lambda:InvokeFunction", "arn:aws:lambda:us-east-1:*:function:billing"),
        ("s3:ListBucket", "arn:aws:s3:::order-archive"),
        ("sns:Publish", "arn:aws:sns:us-east-1:*:order-notifications"),
        ("sqs:SendMessage", "arn:aws:sqs:us-east-1:*:order-events"),
    ]
    .iter()
    .map(|(action, resource)| ((*action).to_string(), (*resource).to_string()))
    .collect();
    assert_eq!(granted, expected);

    // The document written to disk must decode back through the IAM document model
    let written = document.to_json_pretty().unwrap();
    assert_eq!(&IamPolicyDocument::from_json(&written).unwrap(), document);
}

#[test]
fn test_generated_policy_against_broad_role() {
    let traces = Trace::list_from_json(&batch_get_traces_json()).unwrap();
    let policies = generate_from_traces(&ExtractorRegistry::new(), &traces, None);

    let role_policy = IamPolicyDocument::from_json(
        r#"{
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Effect": "Allow",
                    "Action": ["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"],
                    "Resource": "*"
                },
                {
                    "Effect": "Allow",
                    "Action": ["dynamodb:PutItem", "dynamodb:GetItem", "dynamodb:DeleteItem"],
                    "Resource": "arn:aws:dynamodb:us-east-1:123456789012:table/orders"
                },
                {
                    "Effect": "Allow",
                    "Action": "sqs:SendMessage",
                    "Resource": "arn:aws:sqs:us-east-1:123456789012:order-events"
                },
                {
                    "Effect": "Allow",
                    "Action": "s3:*",
                    "Resource": ["arn:aws:s3:::order-archive", "arn:aws:s3:::order-archive/*"]
                }
            ]
        }"#,
    )
    .unwrap();

    let comparator = PolicyComparator::for_registry(&ExtractorRegistry::new());
    let excess = comparator
        .compare(&role_policy.statement, &policies[0].document.statement)
        .unwrap();

    assert_eq!(excess.len(), 2);
    assert!(excess.iter().any(|s| s.actions() == vec!["s3:*"]
        && s.resources() == vec!["arn:aws:s3:::order-archive", "arn:aws:s3:::order-archive/*"]));
    assert!(excess.iter().any(|s| s.actions() == vec!["dynamodb:DeleteItem"]
        && s.resources() == vec!["arn:aws:dynamodb:us-east-1:123456789012:table/orders"]));
}

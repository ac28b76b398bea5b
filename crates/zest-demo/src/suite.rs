//! Sample suites, one per scenario

use crate::sample::{canonical_query, format_amz_date, parse_json_field, Credentials};
use clap::ValueEnum;
use std::collections::HashMap;
use zest::{expect, expect_equal, skip, Failure, TestCase};

const METADATA: &str = r#"{ "region": "eu-west-1", "instanceId": "i-0abc123", "accountId": "123456789012" }"#;

/// Which suite to run
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scenario {
    /// Every test passes or skips
    #[default]
    Passing,
    /// One assertion fails
    Failing,
    /// A test keeps an allocation alive past its end
    Leak,
    /// A test logs at error level
    LogError,
    /// A module's beforeAll hook fails
    SetupFailure,
}

pub fn tests(scenario: Scenario) -> Vec<TestCase> {
    let mut tests = baseline();
    match scenario {
        Scenario::Passing => {}
        Scenario::Failing => tests.push(TestCase::new("imds.test.region", |_| {
            let region = parse_json_field(METADATA, "region")?;
            expect_equal("us-east-1".to_string(), region)
        })),
        Scenario::Leak => tests.push(TestCase::new("imds.test.cached document", |scope| {
            let cached = scope.alloc(METADATA.to_string());
            expect(cached.contains("instanceId"))?;
            cached.leak();
            Ok(())
        })),
        Scenario::LogError => tests.push(TestCase::new("imds.test.token refresh", |_| {
            tracing::error!(status = 401, "metadata token rejected");
            Ok(())
        })),
        Scenario::SetupFailure => tests.extend(database()),
    }
    tests
}

fn lookup<'a>(vars: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
    move |name: &str| vars.get(name).map(|v| v.to_string())
}

fn baseline() -> Vec<TestCase> {
    vec![
        TestCase::new("credentials.test.zest.beforeAll", |_| {
            tracing::info!("loading credential fixtures");
            Ok(())
        }),
        TestCase::new("credentials.test.static credentials", |_| {
            let vars = HashMap::from([
                ("ACCESS_KEY_ID", "AKIDEXAMPLE"),
                ("SECRET_ACCESS_KEY", "wJalrXUtnFEMI/K7MDENG"),
            ]);
            let creds = Credentials::from_vars(lookup(&vars))?;
            expect_equal("AKIDEXAMPLE", creds.access_key_id.as_str())?;
            expect(creds.session_token.is_none())
        }),
        TestCase::new("credentials.test.missing secret is rejected", |_| {
            let vars = HashMap::from([("ACCESS_KEY_ID", "AKIDEXAMPLE")]);
            expect(Credentials::from_vars(lookup(&vars)).is_err())
        }),
        TestCase::new("signing.test.zest.beforeEach", |scope| {
            tracing::debug!(test = scope.name(), "resetting signer clock");
            Ok(())
        }),
        TestCase::new("signing.test.formatAmzDate", |_| {
            expect_equal("20150830T123600Z".to_string(), format_amz_date(1_440_938_160)?)
        }),
        TestCase::new("signing.test.canonical query sorts keys", |scope| {
            let params = scope.alloc(vec![("Version", "2010-05-08"), ("Action", "ListUsers")]);
            expect_equal(
                "Action=ListUsers&Version=2010-05-08".to_string(),
                canonical_query(&params),
            )
        }),
        TestCase::new("imds.test.parseJsonField", |_| {
            let instance = parse_json_field(METADATA, "instanceId")?;
            expect_equal("i-0abc123".to_string(), instance)
        }),
        TestCase::new("network.test.requires interface", |_| skip()),
        TestCase::new("network.test.zest.afterAll", |_| {
            tracing::debug!("releasing network fixtures");
            Ok(())
        }),
    ]
}

fn database() -> Vec<TestCase> {
    vec![
        TestCase::new("db.test.zest.beforeAll", |_| {
            Err(Failure::new("ConnectionRefused")
                .with_message("could not reach 127.0.0.1:5432")
                .into())
        }),
        TestCase::new("db.test.zest.afterAll", |_| Ok(())),
        TestCase::new("db.test.select", |_| Ok(())),
        TestCase::new("db.test.insert", |_| Ok(())),
    ]
}

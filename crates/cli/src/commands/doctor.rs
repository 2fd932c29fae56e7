use std::time::Duration;

use netscout_agent::llm::client_from_config;
use netscout_collectors::{HttpQueryTransport, PanosHttpClient};
use netscout_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use crate::commands::CommandResult;

const SKIPPED: &str = "skipped because configuration did not load";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Exit code 2 when configuration does not load, 1 when any other check fails.
pub async fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let (report, config_loaded) = build_report(options).await;
    let exit_code = match (config_loaded, report.overall_status) {
        (false, _) => 2,
        (true, CheckStatus::Pass) => 0,
        (true, _) => 1,
    };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult::text(exit_code, output);
    }

    CommandResult::text(exit_code, render_human(&report))
}

async fn build_report(options: &LoadOptions) -> (DoctorReport, bool) {
    let mut checks = Vec::new();

    let config_loaded = match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_aws_credentials(&config));
            checks.push(check_firewall_api(&config).await);
            checks.push(check_llm_credentials(&config));
            true
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["aws_credentials", "firewall_api", "llm_credentials"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: SKIPPED.to_string(),
                });
            }
            false
        }
    };

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    (DoctorReport { overall_status, summary, checks }, config_loaded)
}

fn check_aws_credentials(config: &AppConfig) -> DoctorCheck {
    match HttpQueryTransport::from_config(&config.aws) {
        Ok(_) => DoctorCheck {
            name: "aws_credentials",
            status: CheckStatus::Pass,
            details: format!(
                "credentials resolved for region `{}`{}",
                config.aws.region,
                if config.aws.session_token.is_some() { " (with session token)" } else { "" }
            ),
        },
        Err(error) => DoctorCheck {
            name: "aws_credentials",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

/// Generates an API key, which proves reachability and that the credentials are accepted.
async fn check_firewall_api(config: &AppConfig) -> DoctorCheck {
    let client = match PanosHttpClient::from_config(&config.firewall) {
        Ok(client) => client,
        Err(error) => {
            return DoctorCheck {
                name: "firewall_api",
                status: CheckStatus::Fail,
                details: error.to_string(),
            };
        }
    };

    let host = config.firewall.host.as_deref().unwrap_or("<unset>");
    let deadline = Duration::from_secs(config.firewall.timeout_secs.saturating_add(5));
    match tokio::time::timeout(deadline, client.api_key()).await {
        Ok(Ok(_)) => DoctorCheck {
            name: "firewall_api",
            status: CheckStatus::Pass,
            details: format!("API key generated by `{host}`"),
        },
        Ok(Err(error)) => DoctorCheck {
            name: "firewall_api",
            status: CheckStatus::Fail,
            details: format!("keygen against `{host}` failed: {error}"),
        },
        Err(_) => DoctorCheck {
            name: "firewall_api",
            status: CheckStatus::Fail,
            details: format!("keygen against `{host}` did not finish within {deadline:?}"),
        },
    }
}

fn check_llm_credentials(config: &AppConfig) -> DoctorCheck {
    match client_from_config(config) {
        Ok(_) => DoctorCheck {
            name: "llm_credentials",
            status: CheckStatus::Pass,
            details: format!(
                "{} client ready for model `{}` at `{}`",
                config.llm.provider.as_str(),
                config.llm.model,
                config.llm_base_url()
            ),
        },
        Err(error) => DoctorCheck {
            name: "llm_credentials",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
